use crate::models::{ArmorType, EngineType, MissileType, RadarType, RobotAction, RobotBuild, RobotState};
use crate::service::local::DEFAULT_WALL_DISTANCE;
use crate::service::{BrainContext, RobotBrain};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// 走り回りながら四方八方に撃つロボット
pub struct YosemiteSam {
    rng: StdRng,
}

impl YosemiteSam {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    pub fn with_rng(rng: StdRng) -> Self {
        Self { rng }
    }
}

impl Default for YosemiteSam {
    fn default() -> Self {
        Self::new()
    }
}

impl RobotBrain for YosemiteSam {
    fn get_build(&mut self, state: &mut RobotState) -> RobotBuild {
        state.initialized = true;
        RobotBuild::new(
            "YosemiteSam",
            RadarType::UltraShortRange,
            EngineType::ExtraLarge,
            ArmorType::Light,
            MissileType::Dart,
        )
    }

    fn get_action(&mut self, context: &BrainContext<'_>, _state: &mut RobotState) -> RobotAction {
        let robot = context.robot;
        let speed = if robot.speed == 0.0 {
            robot.max_turn_speed
        } else {
            self.rng.gen_range(0.0..1.0) * robot.max_speed()
        };
        let heading = context.new_heading(&mut self.rng, DEFAULT_WALL_DISTANCE);
        let action = RobotAction::new(speed, heading);

        if robot.can_fire() {
            let fire_heading = self.rng.gen_range(0.0..360.0);
            let distance = 50.0 + self.rng.gen_range(0.0..1.0) * robot.missile.range;
            action.fire_missile(fire_heading, distance)
        } else {
            action
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{GameInfo, Robot};

    #[test]
    fn test_starts_at_turn_speed_and_fires() {
        let mut brain = YosemiteSam::with_rng(StdRng::seed_from_u64(11));
        let robot = Robot {
            x: 500.0,
            y: 500.0,
            heading: 45.0,
            engine: EngineType::ExtraLarge.spec(),
            armor: ArmorType::Light.spec(),
            missile: MissileType::Dart.spec(),
            ..Default::default()
        };
        let info = GameInfo::default();
        let context = BrainContext::new(&robot, &info, "g", None);
        let action = brain.get_action(&context, &mut RobotState::default());
        assert_eq!(action.speed, robot.max_turn_speed);
        assert_eq!(action.heading, 45.0);
        assert!(action.fired);
        assert!(action.fire_missile_distance >= 50.0);
        assert!(action.fire_missile_distance <= 50.0 + robot.missile.range);
    }

    #[test]
    fn test_holds_fire_while_reloading() {
        let mut brain = YosemiteSam::with_rng(StdRng::seed_from_u64(3));
        let robot = Robot {
            x: 500.0,
            y: 500.0,
            speed: 40.0,
            reload_cool_down: 1.0,
            engine: EngineType::ExtraLarge.spec(),
            armor: ArmorType::Light.spec(),
            ..Default::default()
        };
        let info = GameInfo::default();
        let context = BrainContext::new(&robot, &info, "g", None);
        let action = brain.get_action(&context, &mut RobotState::default());
        assert!(!action.fired);
        assert!(action.speed >= 0.0 && action.speed <= robot.max_speed());
    }
}
