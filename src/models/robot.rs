use crate::models::{
    common::MoveData,
    equipment::{Armor, Engine, MissileWeapon, Radar},
    traits::Locatable,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// ロボットの生存状態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RobotStatus {
    #[default]
    Undefined,
    Alive,
    Dead,
}

/// 戦闘ロボット
///
/// 外部の意思決定関数（`arn`で識別）により操縦されるエージェントです。
/// 毎ターン丸ごと置き換えられ、試合中に削除されることはありません。
/// 死亡したロボットは以降の解決処理から除外されますが、集計のため残ります。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Robot {
    /// 参加順のインデックス（0始まり、タイブレークとID生成に使用）
    pub index: u32,
    /// ゲーム内で一意なID
    pub id: String,
    /// 表示名
    pub name: String,
    /// 意思決定関数のリソース名
    pub arn: String,

    // 現在状態
    pub status: RobotStatus,
    pub x: f64,
    pub y: f64,
    /// 速度（m/s）、0〜最大速度
    pub speed: f64,
    /// 方位（度）
    pub heading: f64,
    /// 累積ダメージ、0〜最大ダメージ
    pub damage: f64,
    /// 次弾発射までの残り秒数
    pub reload_cool_down: f64,

    // 目標状態
    pub target_speed: f64,
    pub target_heading: f64,

    // 戦績（スコア計算用、単調増加）
    pub total_travel_distance: f64,
    pub total_missile_fired_count: u32,
    pub total_missile_hit_count: u32,
    pub total_kills: u32,
    pub total_damage_dealt: f64,
    pub total_collisions: u32,
    /// 死亡したターン、生存中は-1
    pub time_of_death_game_turn: i32,

    // 性能
    pub engine: Engine,
    /// 急停止せずに方位を変えられる最大速度（m/s）
    pub max_turn_speed: f64,
    pub radar: Radar,
    /// 破壊されるまでの最大ダメージ
    pub max_damage: f64,
    pub armor: Armor,
    pub missile: MissileWeapon,
}

impl Default for Robot {
    fn default() -> Self {
        Self {
            index: 0,
            id: String::new(),
            name: String::new(),
            arn: String::new(),
            status: RobotStatus::Alive,
            x: 0.0,
            y: 0.0,
            speed: 0.0,
            heading: 0.0,
            damage: 0.0,
            reload_cool_down: 0.0,
            target_speed: 0.0,
            target_heading: 0.0,
            total_travel_distance: 0.0,
            total_missile_fired_count: 0,
            total_missile_hit_count: 0,
            total_kills: 0,
            total_damage_dealt: 0.0,
            total_collisions: 0,
            time_of_death_game_turn: -1,
            engine: Engine::default(),
            max_turn_speed: 50.0,
            radar: Radar::default(),
            max_damage: 100.0,
            armor: Armor::default(),
            missile: MissileWeapon::default(),
        }
    }
}

impl Robot {
    /// ゲームIDとインデックスからロボットIDを生成
    pub fn generate_id(index: u32, game_id: &str) -> String {
        format!("{game_id}:Robot{index}")
    }

    pub fn is_alive(&self) -> bool {
        self.status == RobotStatus::Alive
    }

    /// エンジンと装甲から決まる最大速度（m/s）
    pub fn max_speed(&self) -> f64 {
        self.engine.max_speed + self.armor.speed_modifier
    }

    /// 装甲で決まる減速度（m/s²）
    pub fn deceleration(&self) -> f64 {
        self.armor.deceleration
    }

    pub fn can_fire(&self) -> bool {
        self.reload_cool_down == 0.0
    }

    /// ダメージを加えたコピーを返す
    ///
    /// 累積ダメージは最大ダメージでクリップされ、到達したターンで死亡に遷移します。
    /// 既に死亡しているロボットは変化しません。
    pub fn do_damage(self, damage: f64, turn: i32, is_collision: bool) -> Self {
        if !self.is_alive() {
            return self;
        }
        let total_collisions = if is_collision {
            self.total_collisions + 1
        } else {
            self.total_collisions
        };
        let new_damage = self.damage + damage.max(0.0);
        if new_damage >= self.max_damage {
            Self {
                damage: self.max_damage,
                status: RobotStatus::Dead,
                time_of_death_game_turn: turn,
                total_collisions,
                ..self
            }
        } else {
            Self {
                damage: new_damage,
                total_collisions,
                ..self
            }
        }
    }

    /// 位置と累積移動距離を更新したコピーを返す
    pub fn do_move(self, move_data: MoveData) -> Self {
        Self {
            x: move_data.x,
            y: move_data.y,
            total_travel_distance: move_data.distance,
            ..self
        }
    }

    /// 与ダメージを加算したコピーを返す
    pub fn add_damage_dealt(self, damage: f64) -> Self {
        Self {
            total_damage_dealt: self.total_damage_dealt + damage,
            ..self
        }
    }

    /// 命中数を1加算したコピーを返す
    pub fn add_hit(self) -> Self {
        Self {
            total_missile_hit_count: self.total_missile_hit_count + 1,
            ..self
        }
    }

    /// 撃破数を1加算したコピーを返す
    pub fn add_kill(self) -> Self {
        Self {
            total_kills: self.total_kills + 1,
            ..self
        }
    }
}

impl fmt::Display for Robot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (R{})", self.name, self.index)
    }
}

impl Locatable for Robot {
    fn id(&self) -> &str {
        &self.id
    }

    fn x(&self) -> f64 {
        self.x
    }

    fn y(&self) -> f64 {
        self.y
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::equipment::{ArmorType, EngineType};

    #[test]
    fn test_generate_id_and_display() {
        let robot = Robot {
            index: 2,
            id: Robot::generate_id(2, "abc"),
            name: "HotShot".to_string(),
            ..Default::default()
        };
        assert_eq!(robot.id, "abc:Robot2");
        assert_eq!(robot.to_string(), "HotShot (R2)");
    }

    #[test]
    fn test_max_speed_includes_armor_modifier() {
        let robot = Robot {
            engine: EngineType::Large.spec(),
            armor: ArmorType::Heavy.spec(),
            ..Default::default()
        };
        assert_eq!(robot.max_speed(), 95.0);
        assert_eq!(robot.deceleration(), 15.0);
    }

    #[test]
    fn test_damage_accumulates_and_kills_once() {
        let robot = Robot::default();
        let hurt = robot.do_damage(40.0, 3, false);
        assert_eq!(hurt.damage, 40.0);
        assert!(hurt.is_alive());
        assert_eq!(hurt.time_of_death_game_turn, -1);

        let dead = hurt.do_damage(70.0, 5, true);
        assert_eq!(dead.damage, 100.0);
        assert_eq!(dead.status, RobotStatus::Dead);
        assert_eq!(dead.time_of_death_game_turn, 5);
        assert_eq!(dead.total_collisions, 1);

        let still_dead = dead.do_damage(10.0, 9, true);
        assert_eq!(still_dead.damage, 100.0);
        assert_eq!(still_dead.time_of_death_game_turn, 5);
        assert_eq!(still_dead.total_collisions, 1);
    }

    #[test]
    fn test_damage_is_monotonic() {
        let mut robot = Robot::default();
        let mut previous = robot.damage;
        for (turn, amount) in [3.0, 0.0, 12.5, 50.0, 50.0, 1.0].into_iter().enumerate() {
            robot = robot.do_damage(amount, turn as i32, false);
            assert!(robot.damage >= previous);
            assert!(robot.damage <= robot.max_damage);
            previous = robot.damage;
        }
        assert!(!robot.is_alive());
        assert_eq!(robot.time_of_death_game_turn, 4);
    }

    #[test]
    fn test_exact_max_damage_is_fatal() {
        let robot = Robot::default().do_damage(100.0, 1, false);
        assert_eq!(robot.status, RobotStatus::Dead);
    }

    #[test]
    fn test_stat_helpers() {
        let robot = Robot::default()
            .add_damage_dealt(12.0)
            .add_hit()
            .add_kill()
            .add_damage_dealt(3.5);
        assert_eq!(robot.total_damage_dealt, 15.5);
        assert_eq!(robot.total_missile_hit_count, 1);
        assert_eq!(robot.total_kills, 1);
    }

    #[test]
    fn test_do_move_updates_travel_distance() {
        let moved = Robot::default().do_move(MoveData {
            x: 3.0,
            y: 4.0,
            distance: 5.0,
            collision: false,
        });
        assert_eq!((moved.x, moved.y), (3.0, 4.0));
        assert_eq!(moved.total_travel_distance, 5.0);
    }
}
