use crate::models::{ArmorType, EngineType, MissileType, RadarType, RobotAction, RobotBuild, RobotState};
use crate::service::{BrainContext, RobotBrain};

/// 動かず撃たない標的ロボット
#[derive(Debug, Default)]
pub struct TargetRobot;

impl TargetRobot {
    pub fn new() -> Self {
        Self
    }
}

impl RobotBrain for TargetRobot {
    fn get_build(&mut self, state: &mut RobotState) -> RobotBuild {
        state.initialized = true;
        RobotBuild::new(
            "TargetRobot",
            RadarType::UltraShortRange,
            EngineType::Economy,
            ArmorType::Heavy,
            MissileType::Dart,
        )
    }

    fn get_action(&mut self, _context: &BrainContext<'_>, _state: &mut RobotState) -> RobotAction {
        RobotAction::default()
    }
}
