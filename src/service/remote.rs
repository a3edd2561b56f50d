//! HTTP経由のリモートロボット呼び出し
//!
//! ロボットの `arn` をエンドポイントURLとして扱い、リクエストをJSONでPOSTします。

use super::{RobotRequest, RobotResponse, RobotService, StateCache};
use crate::error::ProviderError;
use reqwest::Client;
use tracing::trace;

/// リモートロボットの呼び出しアダプタ
///
/// リモート側が状態を保持しない前提で、ロボットごとの状態をこちらで往復させます。
pub struct HttpRobotService {
    client: Client,
    states: StateCache,
}

impl HttpRobotService {
    pub fn new() -> Self {
        Self::with_client(Client::new())
    }

    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            states: StateCache::new(),
        }
    }
}

impl Default for HttpRobotService {
    fn default() -> Self {
        Self::new()
    }
}

impl RobotService for HttpRobotService {
    async fn call_robot(
        &self,
        arn: &str,
        request: RobotRequest,
    ) -> Result<RobotResponse, ProviderError> {
        let robot_id = request.robot_id();
        let request = request.with_state(self.states.get(&robot_id));
        trace!(arn = %arn, robot_id = %robot_id, command = ?request.command, "REMOTE_ROBOT_CALL: 呼び出し");

        let response = self
            .client
            .post(arn)
            .json(&request)
            .send()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(ProviderError::Transport(format!("{status}: {error_text}")));
        }

        let body: RobotResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Malformed(e.to_string()))?;

        if !body.has_error {
            self.states.put(&robot_id, body.state.clone());
        }
        Ok(body)
    }

    fn end_game(&self, game_id: &str) {
        self.states.forget_game(game_id);
    }
}
