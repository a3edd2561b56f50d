//! エラー型
//!
//! シミュレーション上の問題（通信失敗や不正なビルド）はエラーではなく
//! ゲームのメッセージログに記録されます。ここで定義するのは基盤側の失敗です。

use thiserror::Error;

/// 結果型エイリアス
pub type Result<T> = std::result::Result<T, SimError>;

/// シミュレーション全体のエラー
#[derive(Debug, Error)]
pub enum SimError {
    /// ゲームレコードが見つからない
    #[error("game {0} not found")]
    GameNotFound(String),

    /// ゲーム内にロボットが見つからない
    #[error("robot {robot_id} not found in game {game_id}")]
    RobotNotFound { game_id: String, robot_id: String },

    #[error(transparent)]
    Scenario(#[from] crate::scenario::ScenarioError),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// 意思決定関数の呼び出しエラー
///
/// いずれもそのロボットの1ターン分が劣化するだけで、試合は継続します。
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ProviderError {
    #[error("robot call timed out after {0}s")]
    Timeout(f64),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("malformed robot response: {0}")]
    Malformed(String),

    #[error("no robot registered for '{0}'")]
    UnknownRobot(String),

    /// ロボット自身が返したエラー
    #[error("robot reported an error: {0}")]
    Robot(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_message_keeps_sub_decisecond_precision() {
        assert_eq!(
            ProviderError::Timeout(0.05).to_string(),
            "robot call timed out after 0.05s"
        );
        assert_eq!(
            ProviderError::Timeout(15.0).to_string(),
            "robot call timed out after 15s"
        );
    }
}
