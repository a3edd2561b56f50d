//! # 装備カタログ
//!
//! ロボットが選択できるレーダー・エンジン・装甲・ミサイルの固定テーブルです。
//! 各カテゴリは閉じた列挙型で、種別ごとにポイントコストと物理定数を持ちます。
//! 値はプロセスの生存期間中不変で、参照以外の振る舞いはありません。

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 装備名の解析エラー
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("unknown {category} type '{value}'")]
pub struct UnknownEquipment {
    pub category: &'static str,
    pub value: String,
}

/// レーダー性能
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Radar {
    pub name: String,
    pub points: u32,
    /// 敵を探知できる最大距離（m）
    pub range: f64,
    /// 指定方位からスキャンできる最大の半角（度）
    pub max_resolution: f64,
}

impl Default for Radar {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            points: 0,
            range: 600.0,
            max_resolution: 10.0,
        }
    }
}

/// エンジン性能
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Engine {
    pub name: String,
    pub points: u32,
    /// 最大速度（m/s）
    pub max_speed: f64,
    /// 加速度（m/s²）
    pub acceleration: f64,
}

impl Default for Engine {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            points: 0,
            max_speed: 100.0,
            acceleration: 10.0,
        }
    }
}

/// 装甲性能
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Armor {
    pub name: String,
    pub points: u32,
    /// 衝突時のダメージ
    pub collision_damage: f64,
    /// 直撃時のダメージ
    pub direct_hit_damage: f64,
    /// 近接爆発時のダメージ
    pub near_hit_damage: f64,
    /// 遠隔爆発時のダメージ
    pub far_hit_damage: f64,
    /// 減速度（m/s²）
    pub deceleration: f64,
    /// 最大速度への補正（m/s）
    pub speed_modifier: f64,
}

impl Default for Armor {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            points: 0,
            collision_damage: 2.0,
            direct_hit_damage: 8.0,
            near_hit_damage: 4.0,
            far_hit_damage: 2.0,
            deceleration: 20.0,
            speed_modifier: 0.0,
        }
    }
}

/// ミサイル（武装）性能
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MissileWeapon {
    pub name: String,
    pub points: u32,
    /// 再装填時間（s）
    pub reload_cooldown: f64,
    /// 飛翔速度（m/s）
    pub velocity: f64,
    /// 最大射程（m）
    pub range: f64,
    pub direct_hit_damage_bonus: f64,
    pub near_hit_damage_bonus: f64,
    pub far_hit_damage_bonus: f64,
}

impl Default for MissileWeapon {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            points: 0,
            reload_cooldown: 2.0,
            velocity: 150.0,
            range: 700.0,
            direct_hit_damage_bonus: 3.0,
            near_hit_damage_bonus: 2.1,
            far_hit_damage_bonus: 1.0,
        }
    }
}

/// レーダー種別
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RadarType {
    UltraShortRange,
    ShortRange,
    MidRange,
    LongRange,
    UltraLongRange,
}

impl RadarType {
    pub const ALL: [RadarType; 5] = [
        RadarType::UltraShortRange,
        RadarType::ShortRange,
        RadarType::MidRange,
        RadarType::LongRange,
        RadarType::UltraLongRange,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RadarType::UltraShortRange => "ultraShortRange",
            RadarType::ShortRange => "shortRange",
            RadarType::MidRange => "midRange",
            RadarType::LongRange => "longRange",
            RadarType::UltraLongRange => "ultraLongRange",
        }
    }

    /// 種別に対応する性能値
    pub fn spec(self) -> Radar {
        let (name, points, range, max_resolution) = match self {
            RadarType::UltraShortRange => ("ultra short range", 0, 200.0, 45.0),
            RadarType::ShortRange => ("short range", 1, 400.0, 20.0),
            RadarType::MidRange => ("mid range", 2, 600.0, 10.0),
            RadarType::LongRange => ("long range", 3, 800.0, 8.0),
            RadarType::UltraLongRange => ("ultra long range", 4, 1000.0, 5.0),
        };
        Radar {
            name: name.to_string(),
            points,
            range,
            max_resolution,
        }
    }
}

/// エンジン種別
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EngineType {
    Economy,
    Compact,
    Standard,
    Large,
    ExtraLarge,
}

impl EngineType {
    pub const ALL: [EngineType; 5] = [
        EngineType::Economy,
        EngineType::Compact,
        EngineType::Standard,
        EngineType::Large,
        EngineType::ExtraLarge,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EngineType::Economy => "economy",
            EngineType::Compact => "compact",
            EngineType::Standard => "standard",
            EngineType::Large => "large",
            EngineType::ExtraLarge => "extraLarge",
        }
    }

    pub fn spec(self) -> Engine {
        let (name, points, max_speed, acceleration) = match self {
            EngineType::Economy => ("economy", 0, 60.0, 7.0),
            EngineType::Compact => ("compact", 1, 80.0, 8.0),
            EngineType::Standard => ("standard", 2, 100.0, 10.0),
            EngineType::Large => ("large", 3, 120.0, 12.0),
            EngineType::ExtraLarge => ("extra large", 4, 140.0, 13.0),
        };
        Engine {
            name: name.to_string(),
            points,
            max_speed,
            acceleration,
        }
    }
}

/// 装甲種別
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ArmorType {
    UltraLight,
    Light,
    Medium,
    Heavy,
    UltraHeavy,
}

impl ArmorType {
    pub const ALL: [ArmorType; 5] = [
        ArmorType::UltraLight,
        ArmorType::Light,
        ArmorType::Medium,
        ArmorType::Heavy,
        ArmorType::UltraHeavy,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ArmorType::UltraLight => "ultraLight",
            ArmorType::Light => "light",
            ArmorType::Medium => "medium",
            ArmorType::Heavy => "heavy",
            ArmorType::UltraHeavy => "ultraHeavy",
        }
    }

    pub fn spec(self) -> Armor {
        // (名前, pt, 直撃, 近接, 遠隔, 衝突, 速度補正, 減速度)
        let (name, points, direct, near, far, collision, speed_modifier, deceleration) = match self
        {
            ArmorType::UltraLight => ("ultra light", 0, 50.0, 25.0, 12.0, 10.0, 35.0, 30.0),
            ArmorType::Light => ("light", 1, 16.0, 8.0, 4.0, 3.0, 25.0, 25.0),
            ArmorType::Medium => ("medium", 2, 8.0, 4.0, 2.0, 2.0, 0.0, 20.0),
            ArmorType::Heavy => ("heavy", 3, 4.0, 2.0, 1.0, 1.0, -25.0, 15.0),
            ArmorType::UltraHeavy => ("ultra heavy", 4, 2.0, 1.0, 0.0, 1.0, -45.0, 10.0),
        };
        Armor {
            name: name.to_string(),
            points,
            collision_damage: collision,
            direct_hit_damage: direct,
            near_hit_damage: near,
            far_hit_damage: far,
            deceleration,
            speed_modifier,
        }
    }
}

/// ミサイル種別
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MissileType {
    Dart,
    Arrow,
    Javelin,
    Cannon,
    #[serde(rename = "BFG")]
    Bfg,
    SniperRifle,
}

impl MissileType {
    pub const ALL: [MissileType; 6] = [
        MissileType::Dart,
        MissileType::Arrow,
        MissileType::Javelin,
        MissileType::Cannon,
        MissileType::Bfg,
        MissileType::SniperRifle,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MissileType::Dart => "dart",
            MissileType::Arrow => "arrow",
            MissileType::Javelin => "javelin",
            MissileType::Cannon => "cannon",
            MissileType::Bfg => "BFG",
            MissileType::SniperRifle => "sniperRifle",
        }
    }

    pub fn spec(self) -> MissileWeapon {
        // (名前, pt, 射程, 速度, 直撃, 近接, 遠隔, 再装填)
        let (name, points, range, velocity, direct, near, far, reload) = match self {
            MissileType::Dart => ("dart", 0, 1200.0, 250.0, 0.0, 0.0, 0.0, 0.0),
            MissileType::Arrow => ("arrow", 1, 900.0, 200.0, 1.0, 1.0, 0.0, 1.0),
            MissileType::Javelin => ("javelin", 2, 700.0, 150.0, 3.0, 2.0, 1.0, 2.0),
            MissileType::Cannon => ("cannon", 3, 500.0, 100.0, 6.0, 4.0, 2.0, 3.0),
            MissileType::Bfg => ("BFG", 4, 350.0, 75.0, 12.0, 8.0, 4.0, 5.0),
            // 独自追加の最上位装備。数値は他の段階から外挿した値
            MissileType::SniperRifle => ("sniper rifle", 5, 1200.0, 1750.0, 30.0, 15.0, 0.0, 4.0),
        };
        MissileWeapon {
            name: name.to_string(),
            points,
            reload_cooldown: reload,
            velocity,
            range,
            direct_hit_damage_bonus: direct,
            near_hit_damage_bonus: near,
            far_hit_damage_bonus: far,
        }
    }
}

macro_rules! impl_equipment_str {
    ($ty:ident, $category:literal) => {
        impl FromStr for $ty {
            type Err = UnknownEquipment;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                $ty::ALL
                    .iter()
                    .copied()
                    .find(|variant| variant.as_str() == s)
                    .ok_or_else(|| UnknownEquipment {
                        category: $category,
                        value: s.to_string(),
                    })
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

impl_equipment_str!(RadarType, "radar");
impl_equipment_str!(EngineType, "engine");
impl_equipment_str!(ArmorType, "armor");
impl_equipment_str!(MissileType, "missile");
