use crate::models::{
    missile::{Missile, MissileStatus},
    robot::Robot,
};
use serde::{Deserialize, Serialize};

/// ゲームの状態（ターン状態機械）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GameStatus {
    #[default]
    Undefined,
    /// 初期化待ち
    Start,
    /// 次ターンの解決待ち
    NextTurn,
    /// 終了
    Finished,
    Error,
}

impl GameStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, GameStatus::Finished | GameStatus::Error)
    }
}

/// ゲームの力学設定
///
/// 試合開始時に固定され、進行中に変化するのは `game_turn` のみです。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GameInfo {
    /// 盤面の幅（m）
    pub board_width: f64,
    /// 盤面の高さ（m）
    pub board_height: f64,
    /// 1ターンの経過秒数
    pub seconds_per_turn: f64,
    /// 直撃とみなす距離（m）
    pub direct_hit_range: f64,
    /// 近接爆発とみなす距離（m）
    pub near_hit_range: f64,
    /// 遠隔爆発とみなす距離（m）
    pub far_hit_range: f64,
    /// ロボット同士の衝突とみなす距離（m）
    pub collision_range: f64,
    /// 現在のターン（初期化が0、以降1から）
    pub game_turn: i32,
    /// 引き分けとなる最大ターン数
    pub max_game_turns: i32,
    /// ロボット1体が使える最大ビルドポイント
    pub max_build_points: u32,
    /// スキャンAPIのURL（リモートロボット向け）
    pub api_url: String,
    /// ロボット呼び出しのタイムアウト（秒）
    pub robot_timeout_seconds: f64,
    /// 開始時のロボット間最小距離（m）
    pub min_robot_start_distance: f64,
}

impl Default for GameInfo {
    fn default() -> Self {
        Self {
            board_width: 1000.0,
            board_height: 1000.0,
            seconds_per_turn: 0.5,
            direct_hit_range: 5.0,
            near_hit_range: 20.0,
            far_hit_range: 40.0,
            collision_range: 8.0,
            game_turn: 0,
            max_game_turns: 300,
            max_build_points: 8,
            api_url: String::new(),
            robot_timeout_seconds: 15.0,
            min_robot_start_distance: 300.0,
        }
    }
}

/// 観戦者向けのターンごとのメッセージ
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub game_turn: i32,
    pub text: String,
}

impl Message {
    pub fn new(game_turn: i32, text: impl Into<String>) -> Self {
        Self {
            game_turn,
            text: text.into(),
        }
    }
}

/// 1試合分のゲーム状態
///
/// 更新はすべてコピーを返す形で行い、ターン開始時に読んだ状態と
/// ターン終了時に確定する状態が共有されることはありません。
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Game {
    pub id: String,
    pub status: GameStatus,
    pub missiles: Vec<Missile>,
    pub robots: Vec<Robot>,
    pub messages: Vec<Message>,
    pub info: GameInfo,
}

impl Game {
    /// 初期化待ちのゲームを作成
    pub fn new(id: impl Into<String>, info: GameInfo) -> Self {
        Self {
            id: id.into(),
            status: GameStatus::Start,
            info,
            ..Default::default()
        }
    }

    /// 生存しているロボット数
    pub fn alive_count(&self) -> usize {
        self.robots.iter().filter(|r| r.is_alive()).count()
    }

    pub fn alive_robots(&self) -> impl Iterator<Item = &Robot> {
        self.robots.iter().filter(|r| r.is_alive())
    }

    pub fn robot(&self, id: &str) -> Option<&Robot> {
        self.robots.iter().find(|r| r.id == id)
    }

    /// ロボットを置き換えたコピーを返す
    ///
    /// 同じIDのロボットがいればその位置を保ったまま置き換え、いなければ末尾に追加します。
    pub fn update_robot(mut self, robot: Robot) -> Self {
        match self.robots.iter_mut().find(|r| r.id == robot.id) {
            Some(slot) => *slot = robot,
            None => self.robots.push(robot),
        }
        self
    }

    /// ミサイルを置き換えたコピーを返す（存在しなければ追加）
    pub fn update_missile(mut self, missile: Missile) -> Self {
        match self.missiles.iter_mut().find(|m| m.id == missile.id) {
            Some(slot) => *slot = missile,
            None => self.missiles.push(missile),
        }
        self
    }

    /// 消滅したミサイルを除去したコピーを返す
    pub fn cleanup_missiles(mut self) -> Self {
        self.missiles
            .retain(|m| m.status != MissileStatus::Destroyed);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::robot::RobotStatus;

    fn robot(id: &str, index: u32) -> Robot {
        Robot {
            id: id.to_string(),
            index,
            ..Default::default()
        }
    }

    #[test]
    fn test_update_robot_keeps_position() {
        let game = Game::new("g", GameInfo::default())
            .update_robot(robot("a", 0))
            .update_robot(robot("b", 1))
            .update_robot(robot("c", 2));
        let moved = Robot {
            x: 42.0,
            ..robot("b", 1)
        };
        let game = game.update_robot(moved);
        let ids: Vec<&str> = game.robots.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert_eq!(game.robot("b").map(|r| r.x), Some(42.0));
    }

    #[test]
    fn test_alive_count() {
        let dead = Robot {
            status: RobotStatus::Dead,
            ..robot("b", 1)
        };
        let game = Game::new("g", GameInfo::default())
            .update_robot(robot("a", 0))
            .update_robot(dead);
        assert_eq!(game.alive_count(), 1);
        assert_eq!(game.alive_robots().count(), 1);
    }

    #[test]
    fn test_cleanup_missiles() {
        let flying = Missile {
            id: "m1".to_string(),
            status: MissileStatus::Flying,
            ..Default::default()
        };
        let destroyed = Missile {
            id: "m2".to_string(),
            status: MissileStatus::Destroyed,
            ..Default::default()
        };
        let game = Game::new("g", GameInfo::default())
            .update_missile(flying)
            .update_missile(destroyed)
            .cleanup_missiles();
        assert_eq!(game.missiles.len(), 1);
        assert_eq!(game.missiles[0].id, "m1");
    }

    #[test]
    fn test_game_serializes_camel_case() {
        let game = Game::new("g", GameInfo::default());
        let json = serde_json::to_value(&game).unwrap();
        assert_eq!(json["status"], "start");
        assert_eq!(json["info"]["maxGameTurns"], 300);
        assert_eq!(json["info"]["minRobotStartDistance"], 300.0);
    }
}
