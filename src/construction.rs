//! ロボットの構築と初期配置
//!
//! ビルド要求の検証（装備名の解決とポイント予算）と、盤面上への
//! ランダム配置を扱います。

use crate::models::{
    ArmorType, EngineType, GameInfo, MissileType, RadarType, Robot, RobotBuild, RobotStatus,
    UnknownEquipment, math_utils,
};
use rand::Rng;
use tracing::{debug, warn};

/// 配置のやり直し上限
pub const MAX_PLACEMENT_ATTEMPTS: u32 = 100;

/// 盤面端から確保する余白の割合
const PLACEMENT_MARGIN_RATIO: f64 = 0.1;

/// 構築結果
#[derive(Debug, Clone)]
pub struct Construction {
    pub robot: Robot,
    /// 生存時は装備の説明、失格時は失格理由
    pub description: String,
}

impl Construction {
    pub fn is_disqualified(&self) -> bool {
        !self.robot.is_alive()
    }
}

/// ビルド要求からロボットを構築します
///
/// 未知の装備名、またはポイント合計が予算を超える場合は失格（死亡状態）の
/// ロボットを返します。失格したロボットも枠を占有し続けます。
///
/// # 引数
///
/// * `index` - 参加順のインデックス
/// * `game_id` - ロボットIDの生成に使うゲームID
/// * `arn` - 意思決定関数のリソース名
/// * `build` - ロボットが要求した装備構成
/// * `info` - ゲーム設定（`max_build_points` を参照）
pub fn construct_robot(
    index: u32,
    game_id: &str,
    arn: &str,
    build: &RobotBuild,
    info: &GameInfo,
) -> Construction {
    let robot = Robot {
        index,
        id: Robot::generate_id(index, game_id),
        name: build.name.clone(),
        arn: arn.to_string(),
        ..Default::default()
    };

    let parts = match resolve_equipment(build) {
        Ok(parts) => parts,
        Err(e) => return disqualify(robot, e.to_string()),
    };
    let (radar, engine, armor, missile) = parts;

    let total_points = radar.points + engine.points + armor.points + missile.points;
    if total_points > info.max_build_points {
        return disqualify(
            robot,
            format!(
                "Total points {total_points}, maxed allowed {}",
                info.max_build_points
            ),
        );
    }

    let description = format!(
        "radar: {}, engine: {}, armor: {}, missile: {} ({total_points} points)",
        radar.name, engine.name, armor.name, missile.name
    );
    let robot = Robot {
        status: RobotStatus::Alive,
        radar,
        engine,
        armor,
        missile,
        ..robot
    };
    debug!(robot_id = %robot.id, total_points, "ROBOT_CONSTRUCTED: {}", robot);
    Construction { robot, description }
}

/// 意思決定関数からビルドを得られなかったロボットを失格として構築
pub fn disqualified_robot(index: u32, game_id: &str, arn: &str, reason: String) -> Construction {
    let robot = Robot {
        index,
        id: Robot::generate_id(index, game_id),
        arn: arn.to_string(),
        ..Default::default()
    };
    disqualify(robot, reason)
}

fn disqualify(robot: Robot, reason: String) -> Construction {
    warn!(robot_id = %robot.id, reason = %reason, "ROBOT_DISQUALIFIED: {}", robot);
    Construction {
        robot: Robot {
            status: RobotStatus::Dead,
            ..robot
        },
        description: reason,
    }
}

type Equipment = (
    crate::models::Radar,
    crate::models::Engine,
    crate::models::Armor,
    crate::models::MissileWeapon,
);

fn resolve_equipment(build: &RobotBuild) -> Result<Equipment, UnknownEquipment> {
    let radar: RadarType = build.radar.parse()?;
    let engine: EngineType = build.engine.parse()?;
    let armor: ArmorType = build.armor.parse()?;
    let missile: MissileType = build.missile.parse()?;
    Ok((radar.spec(), engine.spec(), armor.spec(), missile.spec()))
}

/// 生存ロボットを盤面にランダム配置します
///
/// 盤面端から各辺10%の余白を除いた領域に一様配置し、全ペアの距離が
/// `min_robot_start_distance` 以上になるまでやり直します。上限に達した場合は
/// 最後の配置をそのまま採用します。失格ロボットの位置は変更しません。
///
/// # 戻り値
///
/// 配置済みのロボット列（順序は入力と同じ）
pub fn place_on_game_board<R: Rng>(
    info: &GameInfo,
    robots: Vec<Robot>,
    rng: &mut R,
) -> Vec<Robot> {
    let margin_x = info.board_width * PLACEMENT_MARGIN_RATIO;
    let margin_y = info.board_height * PLACEMENT_MARGIN_RATIO;
    let span_x = info.board_width - 2.0 * margin_x;
    let span_y = info.board_height - 2.0 * margin_y;

    let mut attempt = 0;
    loop {
        attempt += 1;
        let placed: Vec<Robot> = robots
            .iter()
            .cloned()
            .map(|robot| {
                if robot.is_alive() {
                    Robot {
                        x: margin_x + rng.gen_range(0.0..1.0) * span_x,
                        y: margin_y + rng.gen_range(0.0..1.0) * span_y,
                        ..robot
                    }
                } else {
                    robot
                }
            })
            .collect();

        let satisfied = too_close_pair(&placed, info.min_robot_start_distance).is_none();
        if satisfied || attempt >= MAX_PLACEMENT_ATTEMPTS {
            if satisfied {
                debug!(attempt, "ROBOTS_PLACED: 配置完了");
            } else {
                warn!(
                    attempt,
                    min_distance = info.min_robot_start_distance,
                    "ROBOTS_PLACED: 最小距離を満たす配置が見つからず、最後の配置を採用"
                );
            }
            return placed;
        }
    }
}

/// 最小距離を下回る生存ロボットの組を探す
fn too_close_pair(robots: &[Robot], min_distance: f64) -> Option<(usize, usize)> {
    let alive: Vec<(usize, &Robot)> = robots
        .iter()
        .enumerate()
        .filter(|(_, r)| r.is_alive())
        .collect();
    for (i, (a_index, a)) in alive.iter().enumerate() {
        for (b_index, b) in alive.iter().skip(i + 1) {
            if math_utils::distance_to_xy(a.x, a.y, b.x, b.y) < min_distance {
                return Some((*a_index, *b_index));
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn build(radar: &str, engine: &str, armor: &str, missile: &str) -> RobotBuild {
        RobotBuild {
            name: "Tester".to_string(),
            radar: radar.to_string(),
            engine: engine.to_string(),
            armor: armor.to_string(),
            missile: missile.to_string(),
        }
    }

    #[test]
    fn test_build_at_budget_is_accepted() {
        // 2 + 3 + 1 + 2 = 8
        let result = construct_robot(
            0,
            "g",
            "hot-shot",
            &build("shortRange", "large", "medium", "javelin"),
            &GameInfo::default(),
        );
        assert!(!result.is_disqualified());
        let robot = result.robot;
        assert_eq!(robot.id, "g:Robot0");
        assert_eq!(robot.arn, "hot-shot");
        assert_eq!(robot.radar.range, 400.0);
        assert_eq!(robot.engine.max_speed, 120.0);
        assert_eq!(robot.missile.velocity, 150.0);
        assert!(result.description.contains("8 points"));
    }

    #[test]
    fn test_build_over_budget_is_disqualified() {
        // 4 + 4 + 4 + 4 = 16
        let result = construct_robot(
            1,
            "g",
            "greedy",
            &build("ultraLongRange", "extraLarge", "ultraHeavy", "BFG"),
            &GameInfo::default(),
        );
        assert!(result.is_disqualified());
        assert_eq!(result.robot.status, RobotStatus::Dead);
        assert_eq!(result.description, "Total points 16, maxed allowed 8");
        assert_eq!(result.robot.id, "g:Robot1");
    }

    #[test]
    fn test_unknown_equipment_is_disqualified() {
        let result = construct_robot(
            0,
            "g",
            "odd",
            &build("shortRange", "warp", "medium", "dart"),
            &GameInfo::default(),
        );
        assert!(result.is_disqualified());
        assert!(result.description.contains("warp"));
    }

    #[test]
    fn test_disqualified_robot_keeps_slot() {
        let result = disqualified_robot(2, "g", "missing", "robot call timed out".to_string());
        assert_eq!(result.robot.id, "g:Robot2");
        assert_eq!(result.robot.index, 2);
        assert!(!result.robot.is_alive());
    }

    fn alive_robots(count: u32) -> Vec<Robot> {
        (0..count)
            .map(|index| Robot {
                index,
                id: Robot::generate_id(index, "g"),
                ..Default::default()
            })
            .collect()
    }

    #[test]
    fn test_placement_respects_margin_and_distance() {
        let info = GameInfo::default();
        let mut rng = StdRng::seed_from_u64(7);
        let placed = place_on_game_board(&info, alive_robots(3), &mut rng);
        assert_eq!(placed.len(), 3);
        for robot in &placed {
            assert!(robot.x >= 100.0 && robot.x <= 900.0);
            assert!(robot.y >= 100.0 && robot.y <= 900.0);
        }
        assert!(too_close_pair(&placed, info.min_robot_start_distance).is_none());
    }

    #[test]
    fn test_infeasible_placement_terminates() {
        let info = GameInfo {
            min_robot_start_distance: 10_000.0,
            ..Default::default()
        };
        let mut rng = StdRng::seed_from_u64(1);
        let placed = place_on_game_board(&info, alive_robots(4), &mut rng);
        assert_eq!(placed.len(), 4);
        assert!(too_close_pair(&placed, info.min_robot_start_distance).is_some());
    }

    #[test]
    fn test_dead_robots_are_not_placed() {
        let mut robots = alive_robots(2);
        robots[1].status = RobotStatus::Dead;
        let mut rng = StdRng::seed_from_u64(3);
        let placed = place_on_game_board(&GameInfo::default(), robots, &mut rng);
        assert_ne!((placed[0].x, placed[0].y), (0.0, 0.0));
        assert_eq!((placed[1].x, placed[1].y), (0.0, 0.0));
    }
}
