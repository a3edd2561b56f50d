//! レーダー走査の問い合わせ窓口
//!
//! ロボットがターン中に行う走査要求に、保存済みのゲーム状態をもとに答えます。
//! ターン解決エンジンからは呼ばれません。

use crate::engine::scan_robots;
use crate::error::{Result, SimError};
use crate::models::{Game, Robot, math_utils};
use crate::store::GameRepository;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::trace;

/// 走査要求
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScanEnemiesRequest {
    pub game_id: String,
    pub robot_id: String,
    /// 走査方位（度）
    pub heading: f64,
    /// 走査の半角（度）
    pub resolution: f64,
}

/// 走査結果
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScanEnemiesResponse {
    pub found: bool,
    /// 目標までの距離（m）
    pub distance: f64,
    /// 観測者から目標への方位（度）
    pub heading: f64,
}

impl ScanEnemiesResponse {
    pub fn not_found() -> Self {
        Self::default()
    }
}

/// ゲーム状態に対する走査を行う
pub fn scan_game(game: &Game, observer: &Robot, heading: f64, resolution: f64) -> ScanEnemiesResponse {
    match scan_robots(game, observer, heading, resolution) {
        Some((target, distance)) => ScanEnemiesResponse {
            found: true,
            distance,
            heading: math_utils::angle_to_xy(target.x, target.y, observer.x, observer.y),
        },
        None => ScanEnemiesResponse::not_found(),
    }
}

/// 保存済みゲームに対する走査サービス
#[derive(Clone)]
pub struct ScanService {
    repository: Arc<dyn GameRepository>,
}

impl ScanService {
    pub fn new(repository: Arc<dyn GameRepository>) -> Self {
        Self { repository }
    }

    /// 走査要求に答えます
    ///
    /// ゲームまたはロボットが見つからない場合はエラーを返します。
    pub fn scan(&self, request: &ScanEnemiesRequest) -> Result<ScanEnemiesResponse> {
        let record = self
            .repository
            .find_by_primary_key(&request.game_id)
            .ok_or_else(|| SimError::GameNotFound(request.game_id.clone()))?;
        let observer = record
            .game
            .robot(&request.robot_id)
            .ok_or_else(|| SimError::RobotNotFound {
                game_id: request.game_id.clone(),
                robot_id: request.robot_id.clone(),
            })?;
        let response = scan_game(&record.game, observer, request.heading, request.resolution);
        trace!(
            game_id = %request.game_id,
            robot_id = %request.robot_id,
            heading = request.heading,
            found = response.found,
            "SCAN: 走査"
        );
        Ok(response)
    }
}
