use crate::models::{ArmorType, EngineType, MissileType, RadarType, RobotAction, RobotBuild, RobotState};
use crate::service::{BrainContext, RobotBrain};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// 狙い撃ちする最短・最長距離（m）
const AIM_MIN_DISTANCE: f64 = 20.0;
const AIM_MAX_DISTANCE: f64 = 300.0;
/// 壁から離れ始める距離（m）
const WALL_DISTANCE: f64 = 20.0;

/// 正面を走査し、見つけた相手に向かって撃つロボット
///
/// 何も見つからなければ進行方向のランダムな距離に撃ちます。
pub struct RoboDog {
    rng: StdRng,
}

impl RoboDog {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    pub fn with_rng(rng: StdRng) -> Self {
        Self { rng }
    }
}

impl Default for RoboDog {
    fn default() -> Self {
        Self::new()
    }
}

impl RobotBrain for RoboDog {
    fn get_build(&mut self, state: &mut RobotState) -> RobotBuild {
        state.initialized = true;
        RobotBuild::new(
            "RoboDog",
            RadarType::UltraShortRange,
            EngineType::Standard,
            ArmorType::Light,
            MissileType::Cannon,
        )
    }

    fn get_action(&mut self, context: &BrainContext<'_>, _state: &mut RobotState) -> RobotAction {
        let robot = context.robot;
        let speed = if robot.speed == 0.0 {
            robot.max_turn_speed
        } else {
            self.rng.gen_range(0.0..1.0) * robot.max_speed()
        };

        let scan = context.scan(robot.heading, robot.radar.max_resolution);
        let heading = context.new_heading(&mut self.rng, WALL_DISTANCE);
        let scan_heading = if scan.found { scan.heading } else { heading };
        let action = RobotAction::new(speed, scan_heading);

        if robot.can_fire() {
            let distance = if scan.distance > AIM_MIN_DISTANCE && scan.distance < AIM_MAX_DISTANCE {
                scan.distance
            } else {
                50.0 + self.rng.gen_range(0.0..1.0) * (robot.missile.range - 10.0)
            };
            action.fire_missile(scan_heading, distance)
        } else {
            action
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{GameInfo, Robot};
    use crate::scan::ScanEnemiesResponse;
    use crate::service::Scanner;

    struct FixedScanner(ScanEnemiesResponse);

    impl Scanner for FixedScanner {
        fn scan(&self, _: &str, _: &str, _: f64, _: f64) -> ScanEnemiesResponse {
            self.0.clone()
        }
    }

    fn robot() -> Robot {
        Robot {
            x: 500.0,
            y: 500.0,
            heading: 10.0,
            radar: RadarType::UltraShortRange.spec(),
            engine: EngineType::Standard.spec(),
            armor: ArmorType::Light.spec(),
            missile: MissileType::Cannon.spec(),
            ..Default::default()
        }
    }

    #[test]
    fn test_fires_at_detected_target() {
        let scanner = FixedScanner(ScanEnemiesResponse {
            found: true,
            distance: 150.0,
            heading: 12.5,
        });
        let robot = robot();
        let info = GameInfo::default();
        let context = BrainContext::new(&robot, &info, "g", Some(&scanner));
        let mut brain = RoboDog::with_rng(StdRng::seed_from_u64(1));
        let action = brain.get_action(&context, &mut RobotState::default());
        assert!(action.fired);
        assert_eq!(action.heading, 12.5);
        assert_eq!(action.fire_missile_heading, 12.5);
        assert_eq!(action.fire_missile_distance, 150.0);
    }

    #[test]
    fn test_fires_ahead_when_nothing_found() {
        let robot = robot();
        let info = GameInfo::default();
        let context = BrainContext::new(&robot, &info, "g", None);
        let mut brain = RoboDog::with_rng(StdRng::seed_from_u64(2));
        let action = brain.get_action(&context, &mut RobotState::default());
        assert!(action.fired);
        assert_eq!(action.heading, 10.0);
        assert!(action.fire_missile_distance >= 50.0);
        assert!(action.fire_missile_distance <= 50.0 + robot.missile.range - 10.0);
    }
}
