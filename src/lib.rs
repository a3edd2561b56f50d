//! # robosim
//!
//! 2次元アリーナでロボット同士が戦うターン制シミュレーションエンジンです。
//!
//! 各ロボットは外部の意思決定関数（プロセス内ブレインまたはHTTPエンドポイント）
//! により操縦され、エンジンは毎ターンその要求を物理・戦闘ルールに従って解決します。

pub mod construction;
pub mod engine;
pub mod error;
pub mod logging;
pub mod models;
pub mod registry;
pub mod robots;
pub mod scan;
pub mod scenario;
pub mod service;
pub mod simulation;
pub mod store;

pub use error::{ProviderError, Result, SimError};
