use crate::models::{
    ArmorType, EngineType, MissileType, RadarType, RobotAction, RobotBuild, RobotState, math_utils,
};
use crate::service::{BrainContext, RobotBrain};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::trace;

/// 走査分解能の下限（度）
const MIN_SCAN_RESOLUTION: f64 = 0.1;
/// 移動を始めるまでの空振り走査角（度）
const FULL_SWEEP: f64 = 360.0;

/// 扇状に走査して狙い撃つロボット
///
/// 左右交互に走査し、命中可能な距離に相手を見つけると分解能を半分にして
/// 追尾します。被弾したとき、または一周走査しても何も見つからないときは
/// ランダムな地点へ移動します。
pub struct HotShot {
    rng: StdRng,
}

impl HotShot {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    pub fn with_rng(rng: StdRng) -> Self {
        Self { rng }
    }

    fn random_destination(&mut self, context: &BrainContext<'_>) -> (f64, f64) {
        let info = context.game_info;
        let margin = info.collision_range;
        (
            margin + self.rng.gen_range(0.0..1.0) * (info.board_width - 2.0 * margin),
            margin + self.rng.gen_range(0.0..1.0) * (info.board_height - 2.0 * margin),
        )
    }
}

impl Default for HotShot {
    fn default() -> Self {
        Self::new()
    }
}

impl RobotBrain for HotShot {
    fn get_build(&mut self, _state: &mut RobotState) -> RobotBuild {
        RobotBuild::new(
            "HotShot",
            RadarType::ShortRange,
            EngineType::Large,
            ArmorType::Medium,
            MissileType::Javelin,
        )
    }

    fn get_action(&mut self, context: &BrainContext<'_>, state: &mut RobotState) -> RobotAction {
        let robot = context.robot;
        let info = context.game_info;

        if !state.initialized {
            state.initialized = true;
            state.no_hit_sweep = 0.0;
            state.scan_resolution = robot.radar.max_resolution;
            state.scan_heading = context.angle_to_xy(info.board_width / 2.0, info.board_height / 2.0);
        }

        let in_range = |distance: f64| distance > info.far_hit_range && distance <= robot.missile.range;

        let left = context.scan(state.scan_heading - state.scan_resolution, state.scan_resolution);
        let scan = if left.found && in_range(left.distance) {
            trace!(robot_id = %robot.id, heading = state.scan_heading, range = left.distance, "HOTSHOT_TARGET: 左で発見");
            state.scan_heading = math_utils::normalize_angle_180(state.scan_heading - state.scan_resolution);
            state.scan_resolution = (state.scan_resolution / 2.0).max(MIN_SCAN_RESOLUTION);
            state.target_range = left.distance;
            left
        } else {
            let right = context.scan(state.scan_heading + state.scan_resolution, state.scan_resolution);
            if right.found && in_range(right.distance) {
                trace!(robot_id = %robot.id, heading = state.scan_heading, range = right.distance, "HOTSHOT_TARGET: 右で発見");
                state.scan_heading = math_utils::normalize_angle_180(state.scan_heading + state.scan_resolution);
                state.scan_resolution = (state.scan_resolution / 2.0).max(MIN_SCAN_RESOLUTION);
                state.target_range = right.distance;
                right
            } else {
                // 隣の領域へ
                state.scan_heading =
                    math_utils::normalize_angle_180(state.scan_heading + 3.0 * robot.radar.max_resolution);
                state.scan_resolution = robot.radar.max_resolution;
                state.no_hit_sweep += 2.0 * robot.radar.max_resolution;
                right
            }
        };

        let action = if scan.found && in_range(scan.distance) && robot.can_fire() {
            state.no_hit_sweep = 0.0;
            RobotAction::default().fire_missile(scan.heading, scan.distance)
        } else {
            RobotAction::default()
        };

        if state.goto_x == 0.0 || state.goto_y == 0.0 {
            let was_hurt = robot.damage > state.last_damage;
            if was_hurt || state.no_hit_sweep >= FULL_SWEEP {
                trace!(robot_id = %robot.id, was_hurt, "HOTSHOT_RELOCATE: 移動開始");
                let (x, y) = self.random_destination(context);
                state.goto_x = x;
                state.goto_y = y;
            }
        }
        state.last_damage = robot.damage;

        if state.goto_x != 0.0 || state.goto_y != 0.0 {
            state.no_hit_sweep = 0.0;
            let action = context.move_to_xy(action, state.goto_x, state.goto_y);
            if action.arrived_at_destination {
                state.goto_x = 0.0;
                state.goto_y = 0.0;
            }
            action
        } else {
            action
        }
    }
}
