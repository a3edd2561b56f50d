//! # Scenario モジュール
//!
//! YAMLで書かれた試合シナリオを読み込み、検証します。
//!
//! ## セクション
//!
//! - `meta`: シナリオ名・説明・バージョン
//! - `sim`: 乱数シード、実時間ペース調整、ロボットの呼び出し方式
//! - `game`: 盤面や判定距離など `GameInfo` の上書き値（省略時は既定値）
//! - `robots`: 参加ロボットのハンドル（ローカル名またはURL）
//! - `logging`: ログ出力設定

use crate::models::GameInfo;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// シナリオメタデータ
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ScenarioMeta {
    pub version: String,
    pub name: String,
    pub description: String,
}

/// ロボットの呼び出し方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RobotType {
    /// プロセス内の組み込みロボット
    #[default]
    Local,
    /// HTTPエンドポイント
    Remote,
}

/// 実行設定
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SimConfig {
    /// 配置用乱数のシード（省略時は毎回異なる）
    pub seed: Option<u64>,
    /// 1ターンの秒数に合わせて待機するか
    pub real_time: bool,
    pub robot_type: RobotType,
    /// ターンごとのスナップショットを追記するJSON Linesファイル
    pub snapshot_file: Option<PathBuf>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: None,
            real_time: true,
            robot_type: RobotType::Local,
            snapshot_file: None,
        }
    }
}

/// `GameInfo` の上書き値
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct GameConfig {
    pub board_width_m: Option<f64>,
    pub board_height_m: Option<f64>,
    pub seconds_per_turn: Option<f64>,
    pub direct_hit_range_m: Option<f64>,
    pub near_hit_range_m: Option<f64>,
    pub far_hit_range_m: Option<f64>,
    pub collision_range_m: Option<f64>,
    pub max_game_turns: Option<i32>,
    pub max_build_points: Option<u32>,
    pub robot_timeout_s: Option<f64>,
    pub min_robot_start_distance_m: Option<f64>,
    pub api_url: Option<String>,
}

impl GameConfig {
    /// 既定値に上書き値を適用した `GameInfo` を作成
    pub fn to_game_info(&self) -> GameInfo {
        let defaults = GameInfo::default();
        GameInfo {
            board_width: self.board_width_m.unwrap_or(defaults.board_width),
            board_height: self.board_height_m.unwrap_or(defaults.board_height),
            seconds_per_turn: self.seconds_per_turn.unwrap_or(defaults.seconds_per_turn),
            direct_hit_range: self.direct_hit_range_m.unwrap_or(defaults.direct_hit_range),
            near_hit_range: self.near_hit_range_m.unwrap_or(defaults.near_hit_range),
            far_hit_range: self.far_hit_range_m.unwrap_or(defaults.far_hit_range),
            collision_range: self.collision_range_m.unwrap_or(defaults.collision_range),
            max_game_turns: self.max_game_turns.unwrap_or(defaults.max_game_turns),
            max_build_points: self.max_build_points.unwrap_or(defaults.max_build_points),
            robot_timeout_seconds: self.robot_timeout_s.unwrap_or(defaults.robot_timeout_seconds),
            min_robot_start_distance: self
                .min_robot_start_distance_m
                .unwrap_or(defaults.min_robot_start_distance),
            api_url: self.api_url.clone().unwrap_or(defaults.api_url),
            game_turn: 0,
        }
    }
}

/// ログ出力設定
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub output: String,
    pub dir: String,
    pub file_prefix: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            output: "console".to_string(),
            dir: "logs".to_string(),
            file_prefix: "robosim".to_string(),
        }
    }
}

/// 完全なシナリオ設定
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ScenarioConfig {
    #[serde(default)]
    pub meta: ScenarioMeta,
    #[serde(default)]
    pub sim: SimConfig,
    #[serde(default)]
    pub game: GameConfig,
    pub robots: Vec<String>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl ScenarioConfig {
    /// YAMLファイルからシナリオ設定を読み込み
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ScenarioError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ScenarioError::FileNotFound(path.to_path_buf()));
        }

        let contents =
            fs::read_to_string(path).map_err(|e| ScenarioError::Io(path.to_path_buf(), e))?;
        let config: ScenarioConfig = serde_yaml::from_str(&contents)
            .map_err(|e| ScenarioError::Parse(path.display().to_string(), e))?;

        config.validate()?;
        Ok(config)
    }

    /// YAML文字列からシナリオ設定を読み込み
    pub fn from_yaml_str(contents: &str) -> Result<Self, ScenarioError> {
        let config: ScenarioConfig = serde_yaml::from_str(contents)
            .map_err(|e| ScenarioError::Parse("<inline>".to_string(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// 設定の基本的な検証
    pub fn validate(&self) -> Result<(), ScenarioError> {
        let info = self.game.to_game_info();

        if info.board_width <= 0.0 || info.board_height <= 0.0 {
            return Err(ScenarioError::Validation(
                "board dimensions must be positive".to_string(),
            ));
        }
        if info.seconds_per_turn <= 0.0 {
            return Err(ScenarioError::Validation(
                "seconds_per_turn must be positive".to_string(),
            ));
        }
        if !(info.direct_hit_range <= info.near_hit_range
            && info.near_hit_range <= info.far_hit_range)
        {
            return Err(ScenarioError::Validation(format!(
                "hit ranges must ascend: direct {} <= near {} <= far {}",
                info.direct_hit_range, info.near_hit_range, info.far_hit_range
            )));
        }
        if info.max_game_turns < 1 {
            return Err(ScenarioError::Validation(
                "max_game_turns must be at least 1".to_string(),
            ));
        }
        if info.robot_timeout_seconds <= 0.0 {
            return Err(ScenarioError::Validation(
                "robot_timeout_s must be positive".to_string(),
            ));
        }

        if self.robots.is_empty() {
            return Err(ScenarioError::Validation(
                "at least one robot is required".to_string(),
            ));
        }
        if self.sim.robot_type == RobotType::Remote {
            if let Some(handle) = self
                .robots
                .iter()
                .find(|h| !(h.starts_with("http://") || h.starts_with("https://")))
            {
                return Err(ScenarioError::Validation(format!(
                    "remote robot {handle} is not an http(s) URL"
                )));
            }
        }

        Ok(())
    }

    /// シナリオの概要を表示
    pub fn print_summary(&self) {
        let info = self.game.to_game_info();

        println!("=== シナリオ情報 ===");
        println!("名前: {}", self.meta.name);
        println!("説明: {}", self.meta.description);
        println!("バージョン: {}", self.meta.version);
        println!();

        println!("=== 実行設定 ===");
        match self.sim.seed {
            Some(seed) => println!("シード値: {}", seed),
            None => println!("シード値: (ランダム)"),
        }
        println!("実時間モード: {}", if self.sim.real_time { "有効" } else { "無効" });
        println!("ロボット種別: {:?}", self.sim.robot_type);
        if let Some(path) = &self.sim.snapshot_file {
            println!("スナップショット出力: {}", path.display());
        }
        println!();

        println!("=== 盤面設定 ===");
        println!("盤面: {:.0}m x {:.0}m", info.board_width, info.board_height);
        println!(
            "1ターン: {:.2}秒 / 最大ターン数: {} ({:.1}秒)",
            info.seconds_per_turn,
            info.max_game_turns,
            info.seconds_per_turn * f64::from(info.max_game_turns)
        );
        println!(
            "命中判定: 直撃 {:.0}m / 近接 {:.0}m / 遠隔 {:.0}m",
            info.direct_hit_range, info.near_hit_range, info.far_hit_range
        );
        println!("衝突判定: {:.0}m", info.collision_range);
        println!("ビルドポイント上限: {}", info.max_build_points);
        println!("開始時最小距離: {:.0}m", info.min_robot_start_distance);
        println!();

        println!("=== 参加ロボット ===");
        println!("ロボット数: {}体", self.robots.len());
        for (index, handle) in self.robots.iter().enumerate() {
            println!("  R{}: {}", index, handle);
        }
    }
}

/// シナリオ読み込みエラー
#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("シナリオファイルが見つかりません: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("ファイル読み込みエラー {}: {}", .0.display(), .1)]
    Io(PathBuf, #[source] std::io::Error),

    #[error("YAML解析エラー {0}: {1}")]
    Parse(String, #[source] serde_yaml::Error),

    #[error("設定検証エラー: {0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEMO: &str = r#"
meta:
  version: "1.0"
  name: "demo"
  description: "two built-in robots"
sim:
  seed: 42
  real_time: false
game:
  board_width_m: 800
  max_game_turns: 120
robots:
  - hot-shot
  - robo-dog
"#;

    #[test]
    fn test_parse_with_overrides() {
        let config = ScenarioConfig::from_yaml_str(DEMO).unwrap();
        assert_eq!(config.meta.name, "demo");
        assert_eq!(config.sim.seed, Some(42));
        assert!(!config.sim.real_time);
        assert_eq!(config.sim.robot_type, RobotType::Local);
        assert_eq!(config.robots, vec!["hot-shot", "robo-dog"]);

        let info = config.game.to_game_info();
        assert_eq!(info.board_width, 800.0);
        assert_eq!(info.board_height, 1000.0);
        assert_eq!(info.max_game_turns, 120);
        assert_eq!(info.seconds_per_turn, 0.5);
        assert_eq!(info.game_turn, 0);

        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.file_prefix, "robosim");
    }

    #[test]
    fn test_minimal_scenario_uses_defaults() {
        let config = ScenarioConfig::from_yaml_str("robots: [target]").unwrap();
        assert!(config.sim.real_time);
        assert_eq!(config.sim.seed, None);
        assert_eq!(config.game.to_game_info(), GameInfo::default());
    }

    #[test]
    fn test_validation_errors() {
        let no_robots = ScenarioConfig::from_yaml_str("robots: []");
        assert!(matches!(no_robots, Err(ScenarioError::Validation(_))));

        let bad_ranges = ScenarioConfig::from_yaml_str(
            "robots: [target]\ngame:\n  near_hit_range_m: 50\n",
        );
        assert!(matches!(bad_ranges, Err(ScenarioError::Validation(_))));

        let bad_board =
            ScenarioConfig::from_yaml_str("robots: [target]\ngame:\n  board_width_m: 0\n");
        assert!(matches!(bad_board, Err(ScenarioError::Validation(_))));

        let bad_remote = ScenarioConfig::from_yaml_str(
            "robots: [target]\nsim:\n  robot_type: remote\n",
        );
        assert!(matches!(bad_remote, Err(ScenarioError::Validation(_))));
    }

    #[test]
    fn test_unknown_robot_type_is_parse_error() {
        let result =
            ScenarioConfig::from_yaml_str("robots: [target]\nsim:\n  robot_type: grpc\n");
        assert!(matches!(result, Err(ScenarioError::Parse(_, _))));
    }

    #[test]
    fn test_missing_file() {
        let result = ScenarioConfig::from_file("does/not/exist.yaml");
        assert!(matches!(result, Err(ScenarioError::FileNotFound(_))));
    }
}
