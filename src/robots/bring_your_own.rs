use crate::models::{ArmorType, EngineType, MissileType, RadarType, RobotAction, RobotBuild, RobotState};
use crate::service::{BrainContext, RobotBrain};

/// 自作ロボットのひな形
///
/// `get_action` に独自の戦術を実装してください。
#[derive(Debug, Default)]
pub struct BringYourOwnRobot;

impl BringYourOwnRobot {
    pub fn new() -> Self {
        Self
    }
}

impl RobotBrain for BringYourOwnRobot {
    fn get_build(&mut self, state: &mut RobotState) -> RobotBuild {
        state.initialized = true;
        RobotBuild::new(
            "BringYourOwnRobot",
            RadarType::UltraShortRange,
            EngineType::Economy,
            ArmorType::UltraHeavy,
            MissileType::Dart,
        )
    }

    fn get_action(&mut self, _context: &BrainContext<'_>, _state: &mut RobotState) -> RobotAction {
        RobotAction::default()
    }
}
