use crate::models::equipment::{ArmorType, EngineType, MissileType, RadarType};
use serde::{Deserialize, Serialize};

/// ロボットが要求する装備構成
///
/// 装備名は通信上は文字列のまま扱い、未知の名前は構築時に失格理由となります。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RobotBuild {
    pub name: String,
    pub radar: String,
    pub engine: String,
    pub armor: String,
    pub missile: String,
}

impl Default for RobotBuild {
    fn default() -> Self {
        Self::new(
            "",
            RadarType::UltraShortRange,
            EngineType::Economy,
            ArmorType::UltraLight,
            MissileType::Dart,
        )
    }
}

impl RobotBuild {
    pub fn new(
        name: impl Into<String>,
        radar: RadarType,
        engine: EngineType,
        armor: ArmorType,
        missile: MissileType,
    ) -> Self {
        Self {
            name: name.into(),
            radar: radar.as_str().to_string(),
            engine: engine.as_str().to_string(),
            armor: armor.as_str().to_string(),
            missile: missile.as_str().to_string(),
        }
    }
}

/// ロボットが1ターンに要求する行動
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RobotAction {
    /// 目標速度（m/s）
    pub speed: f64,
    /// 目標方位（度）
    pub heading: f64,
    pub fire_missile_heading: f64,
    pub fire_missile_distance: f64,
    /// 発射要求の有無
    pub fired: bool,
    pub arrived_at_destination: bool,
}

impl RobotAction {
    pub fn new(speed: f64, heading: f64) -> Self {
        Self {
            speed,
            heading,
            ..Default::default()
        }
    }

    /// 指定方位・距離への発射要求を付けたコピーを返す
    pub fn fire_missile(self, heading: f64, distance: f64) -> Self {
        Self {
            fire_missile_heading: heading,
            fire_missile_distance: distance,
            fired: true,
            ..self
        }
    }
}

/// ロボット側のターン間状態
///
/// 意思決定関数が次のターンへ持ち越すための作業領域です。
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RobotState {
    pub initialized: bool,
    pub scan_heading: f64,
    pub last_damage: f64,
    pub target_range: f64,
    pub no_hit_sweep: f64,
    pub scan_resolution: f64,
    pub goto_x: f64,
    pub goto_y: f64,
}

impl RobotState {
    pub fn initialize(self) -> Self {
        Self {
            initialized: true,
            ..self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_uses_wire_names() {
        let build = RobotBuild::new(
            "HotShot",
            RadarType::ShortRange,
            EngineType::Large,
            ArmorType::Medium,
            MissileType::Javelin,
        );
        assert_eq!(build.radar, "shortRange");
        assert_eq!(build.engine, "large");
        assert_eq!(build.armor, "medium");
        assert_eq!(build.missile, "javelin");
    }

    #[test]
    fn test_action_deserializes_with_missing_fields() {
        let action: RobotAction = serde_json::from_str(r#"{"speed": 20.0, "fired": true}"#).unwrap();
        assert_eq!(action.speed, 20.0);
        assert!(action.fired);
        assert_eq!(action.fire_missile_distance, 0.0);
    }

    #[test]
    fn test_fire_missile_sets_request() {
        let action = RobotAction::new(10.0, 90.0).fire_missile(45.0, 300.0);
        assert!(action.fired);
        assert_eq!(action.fire_missile_heading, 45.0);
        assert_eq!(action.fire_missile_distance, 300.0);
        assert_eq!(action.speed, 10.0);
    }
}
