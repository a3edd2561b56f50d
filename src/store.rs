//! ゲーム状態の永続化と配信
//!
//! ターンループは毎ターン、確定したゲームを [`GameRepository`] に保存し、
//! [`GamePublisher`] に配信します。どちらもトレイトで抽象化されており、
//! 保存先や配信先の実体にエンジンは依存しません。

use crate::models::Game;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Mutex;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// 保存されるゲームレコード
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameRecord {
    /// ゲームID
    pub primary_key: String,
    pub game: Game,
    /// 参加ロボットの意思決定関数（インデックス順）
    pub robot_arns: Vec<String>,
}

impl GameRecord {
    pub fn new(game: Game, robot_arns: Vec<String>) -> Self {
        Self {
            primary_key: game.id.clone(),
            game,
            robot_arns,
        }
    }
}

/// ゲームレコードの保存先
pub trait GameRepository: Send + Sync {
    fn find_by_primary_key(&self, primary_key: &str) -> Option<GameRecord>;
    fn save(&self, record: GameRecord);
    fn delete_by_id(&self, primary_key: &str);
}

/// プロセス内メモリの保存先
#[derive(Debug, Default)]
pub struct InMemoryGameRepository {
    records: Mutex<HashMap<String, GameRecord>>,
}

impl InMemoryGameRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl GameRepository for InMemoryGameRepository {
    fn find_by_primary_key(&self, primary_key: &str) -> Option<GameRecord> {
        let records = self.records.lock().unwrap_or_else(|e| e.into_inner());
        records.get(primary_key).cloned()
    }

    fn save(&self, record: GameRecord) {
        let mut records = self.records.lock().unwrap_or_else(|e| e.into_inner());
        records.insert(record.primary_key.clone(), record);
    }

    fn delete_by_id(&self, primary_key: &str) {
        let mut records = self.records.lock().unwrap_or_else(|e| e.into_inner());
        if records.remove(primary_key).is_some() {
            debug!(game_id = %primary_key, "GAME_RECORD_DELETED: レコード削除");
        }
    }
}

/// ターンごとのゲーム配信先
pub trait GamePublisher: Send + Sync {
    fn publish(&self, game: &Game);
}

/// ターン要約をログに出力する配信先
#[derive(Debug, Default)]
pub struct TracingPublisher;

impl GamePublisher for TracingPublisher {
    fn publish(&self, game: &Game) {
        info!(
            game_id = %game.id,
            turn = game.info.game_turn,
            status = ?game.status,
            alive = game.alive_count(),
            robots = game.robots.len(),
            missiles = game.missiles.len(),
            "GAME_PUBLISHED: ターン配信"
        );
    }
}

/// `tokio::sync::broadcast` で購読者に配信する
///
/// 購読者がいない場合や遅れている場合も送信側は待ちません。
#[derive(Debug, Clone)]
pub struct BroadcastPublisher {
    sender: broadcast::Sender<Game>,
}

impl BroadcastPublisher {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Game> {
        self.sender.subscribe()
    }
}

impl GamePublisher for BroadcastPublisher {
    fn publish(&self, game: &Game) {
        // 購読者がいなければ送信は失敗するが問題ない
        let _ = self.sender.send(game.clone());
    }
}

/// 1ターン1行のJSONとしてファイルに追記する
#[derive(Debug)]
pub struct JsonLinesPublisher {
    writer: Mutex<BufWriter<File>>,
}

impl JsonLinesPublisher {
    pub fn create(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path.as_ref())?;
        Ok(Self {
            writer: Mutex::new(BufWriter::new(file)),
        })
    }

    fn write_line(&self, game: &Game) -> Result<(), crate::error::SimError> {
        let mut writer = self.writer.lock().unwrap_or_else(|e| e.into_inner());
        serde_json::to_writer(&mut *writer, game)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(())
    }
}

impl GamePublisher for JsonLinesPublisher {
    fn publish(&self, game: &Game) {
        if let Err(e) = self.write_line(game) {
            warn!(game_id = %game.id, error = %e, "SNAPSHOT_WRITE_FAILED: スナップショット書き込み失敗");
        }
    }
}

/// 複数の配信先に順に配信する
#[derive(Default)]
pub struct FanoutPublisher {
    publishers: Vec<Box<dyn GamePublisher>>,
}

impl FanoutPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, publisher: impl GamePublisher + 'static) -> Self {
        self.publishers.push(Box::new(publisher));
        self
    }
}

impl GamePublisher for FanoutPublisher {
    fn publish(&self, game: &Game) {
        for publisher in &self.publishers {
            publisher.publish(game);
        }
    }
}
