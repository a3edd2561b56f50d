//! # ロボット呼び出しサービス
//!
//! 各ロボットの意思決定関数を呼び出す唯一の窓口です。エンジンは
//! [`RobotService`] のみに依存し、転送方式ごとにアダプタを実装します。
//!
//! - [`local::LocalRobotService`]: プロセス内のブレイン登録簿
//! - [`remote::HttpRobotService`]: HTTP(JSON)経由のリモート呼び出し

pub mod local;
pub mod remote;

use crate::error::ProviderError;
use crate::models::{GameInfo, Robot, RobotAction, RobotBuild, RobotState};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Mutex;

pub use local::{BrainContext, LocalRobotService, RobotBrain, Scanner};
pub use remote::HttpRobotService;

/// サーバーからロボットへのコマンド種別
///
/// 試合開始時は `GetBuild`、以降のターンは `GetAction` を送ります。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RobotCommand {
    #[default]
    GetBuild,
    GetAction,
}

/// ロボットへのリクエスト
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RobotRequest {
    pub command: RobotCommand,
    pub robot: Robot,
    pub game_info: GameInfo,
    pub index: u32,
    pub game_id: String,
    /// 前ターンにロボットが返した状態
    pub state: RobotState,
}

impl RobotRequest {
    /// ビルド要求（ロボット未生成のためスナップショットは既定値）
    pub fn get_build(game_info: &GameInfo, index: u32, game_id: &str) -> Self {
        Self {
            command: RobotCommand::GetBuild,
            robot: Robot::default(),
            game_info: game_info.clone(),
            index,
            game_id: game_id.to_string(),
            state: RobotState::default(),
        }
    }

    /// 行動要求
    pub fn get_action(robot: &Robot, game_info: &GameInfo, game_id: &str) -> Self {
        Self {
            command: RobotCommand::GetAction,
            robot: robot.clone(),
            game_info: game_info.clone(),
            index: robot.index,
            game_id: game_id.to_string(),
            state: RobotState::default(),
        }
    }

    pub fn with_state(self, state: RobotState) -> Self {
        Self { state, ..self }
    }

    /// リクエスト対象のロボットID
    pub fn robot_id(&self) -> String {
        if self.robot.id.is_empty() {
            Robot::generate_id(self.index, &self.game_id)
        } else {
            self.robot.id.clone()
        }
    }
}

/// ロボットからのレスポンス
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RobotResponse {
    pub build: RobotBuild,
    pub action: RobotAction,
    /// ロボットが次ターンへ持ち越す状態
    pub state: RobotState,
    pub has_error: bool,
    pub error_message: String,
}

impl RobotResponse {
    /// `has_error` が立っているレスポンスをエラーに変換
    pub fn into_result(self) -> Result<Self, ProviderError> {
        if self.has_error {
            let message = if self.error_message.is_empty() {
                "no error message provided".to_string()
            } else {
                self.error_message
            };
            Err(ProviderError::Robot(message))
        } else {
            Ok(self)
        }
    }
}

/// ロボット呼び出し能力
///
/// `arn` で識別されるロボットにリクエストを送り、レスポンスを返します。
/// タイムアウトは呼び出し側（エンジン）で課します。
pub trait RobotService: Send + Sync + 'static {
    fn call_robot(
        &self,
        arn: &str,
        request: RobotRequest,
    ) -> impl Future<Output = Result<RobotResponse, ProviderError>> + Send;

    /// 試合終了時にロボットごとの状態を破棄する
    fn end_game(&self, _game_id: &str) {}
}

/// ロボットIDごとの持ち越し状態
///
/// 状態を自分で保持しないリモートロボット向けに、アダプタ側で往復させます。
#[derive(Debug, Default)]
pub struct StateCache {
    states: Mutex<HashMap<String, RobotState>>,
}

impl StateCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, robot_id: &str) -> RobotState {
        let states = self.states.lock().unwrap_or_else(|e| e.into_inner());
        states.get(robot_id).cloned().unwrap_or_default()
    }

    pub fn put(&self, robot_id: &str, state: RobotState) {
        let mut states = self.states.lock().unwrap_or_else(|e| e.into_inner());
        states.insert(robot_id.to_string(), state);
    }

    /// 指定ゲームのロボットの状態をすべて破棄
    pub fn forget_game(&self, game_id: &str) {
        let prefix = format!("{game_id}:");
        let mut states = self.states.lock().unwrap_or_else(|e| e.into_inner());
        states.retain(|robot_id, _| !robot_id.starts_with(&prefix));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_wire_format() {
        let info = GameInfo::default();
        let request = RobotRequest::get_build(&info, 3, "game-1");
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["command"], "getBuild");
        assert_eq!(json["index"], 3);
        assert_eq!(json["gameId"], "game-1");
        assert_eq!(json["gameInfo"]["secondsPerTurn"], 0.5);
        assert_eq!(request.robot_id(), "game-1:Robot3");
    }

    #[test]
    fn test_response_error_flag() {
        let response: RobotResponse =
            serde_json::from_str(r#"{"hasError": true, "errorMessage": "boom"}"#).unwrap();
        assert_eq!(
            response.into_result(),
            Err(ProviderError::Robot("boom".to_string()))
        );

        let ok: RobotResponse = serde_json::from_str(
            r#"{"action": {"speed": 5.0, "heading": 10.0, "fired": false}}"#,
        )
        .unwrap();
        let ok = ok.into_result().unwrap();
        assert_eq!(ok.action.speed, 5.0);
    }

    #[test]
    fn test_state_cache_round_trip() {
        let cache = StateCache::new();
        assert_eq!(cache.get("r1"), RobotState::default());
        let state = RobotState {
            scan_heading: 30.0,
            ..Default::default()
        }
        .initialize();
        cache.put("r1", state.clone());
        assert_eq!(cache.get("r1"), state);
        assert_eq!(cache.get("r2"), RobotState::default());
    }

    #[test]
    fn test_state_cache_forget_game() {
        let cache = StateCache::new();
        let state = RobotState::default().initialize();
        cache.put("g1:Robot0", state.clone());
        cache.put("g2:Robot0", state.clone());
        cache.forget_game("g1");
        assert_eq!(cache.get("g1:Robot0"), RobotState::default());
        assert_eq!(cache.get("g2:Robot0"), state);
    }
}
