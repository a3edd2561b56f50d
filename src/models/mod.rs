// 基本的なデータ型と幾何ユーティリティ
pub mod common;

// 盤面上のオブジェクトの共通インターフェース（trait）定義
pub mod traits;

// 装備カタログ
pub mod equipment;

// 各エージェントモデルとゲーム集約
pub mod actions;
pub mod game;
pub mod missile;
pub mod robot;

// 便利な re-export
pub use actions::{RobotAction, RobotBuild, RobotState};
pub use common::*;
pub use equipment::{
    Armor, ArmorType, Engine, EngineType, MissileType, MissileWeapon, Radar, RadarType,
    UnknownEquipment,
};
pub use game::{Game, GameInfo, GameStatus, Message};
pub use missile::{Missile, MissileStatus};
pub use robot::{Robot, RobotStatus};
pub use traits::*;
