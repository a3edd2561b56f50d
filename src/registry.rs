//! # Registry モジュール
//!
//! 進行中の試合を管理し、ゲームループの開始と中断を受け付けます。
//!
//! 試合ごとにゲームループを Tokio タスクとして起動し、中断用の
//! `watch` チャネルとタスクのハンドルを保持します。試合が自然終了すると
//! タスク自身が登録を外します。

use crate::models::{Game, GameInfo, GameStatus};
use crate::service::RobotService;
use crate::simulation::{GameLoop, LoopOutcome};
use crate::store::{GamePublisher, GameRecord, GameRepository};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use uuid::Uuid;

struct GameJob {
    stop: watch::Sender<bool>,
    handle: JoinHandle<Option<Game>>,
}

/// 試合の開始・中断窓口
pub struct GameRegistry<S> {
    robot_service: Arc<S>,
    repository: Arc<dyn GameRepository>,
    publisher: Arc<dyn GamePublisher>,
    real_time: bool,
    seed: Option<u64>,
    jobs: Mutex<HashMap<String, GameJob>>,
}

impl<S: RobotService> GameRegistry<S> {
    pub fn new(
        robot_service: Arc<S>,
        repository: Arc<dyn GameRepository>,
        publisher: Arc<dyn GamePublisher>,
    ) -> Self {
        Self {
            robot_service,
            repository,
            publisher,
            real_time: true,
            seed: None,
            jobs: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_real_time(self, real_time: bool) -> Self {
        Self { real_time, ..self }
    }

    pub fn with_seed(self, seed: Option<u64>) -> Self {
        Self { seed, ..self }
    }

    /// 試合を開始します
    ///
    /// 進行中の試合がある場合は新しい試合を作らず、その試合を返します。
    /// Tokio ランタイム上から呼び出す必要があります。
    ///
    /// # 引数
    ///
    /// * `robot_arns` - 参加ロボットの意思決定関数（インデックス順）
    /// * `info` - 試合の力学設定
    ///
    /// # 戻り値
    ///
    /// 初期化待ち（`Start`）のゲーム、または進行中のゲーム
    pub fn start(self: &Arc<Self>, robot_arns: Vec<String>, info: GameInfo) -> Game {
        let mut jobs = self.jobs.lock().unwrap_or_else(|e| e.into_inner());

        let running = jobs
            .iter()
            .filter(|(_, job)| !job.handle.is_finished())
            .find_map(|(id, _)| self.repository.find_by_primary_key(id));
        if let Some(record) = running {
            info!(game_id = %record.primary_key, "GAME_ALREADY_RUNNING: 進行中の試合を返却");
            return record.game;
        }

        let game = Game::new(Uuid::new_v4().to_string(), info);
        self.repository
            .save(GameRecord::new(game.clone(), robot_arns.clone()));

        let (stop_tx, stop_rx) = watch::channel(false);
        let game_loop = self.game_loop();
        let registry = Arc::clone(self);
        let game_id = game.id.clone();
        let handle = tokio::spawn(async move {
            let outcome = game_loop.run(&game_id, stop_rx).await;
            registry.forget(&game_id);
            match outcome {
                Ok(LoopOutcome::Finished(game)) => Some(game),
                Ok(LoopOutcome::Cancelled(game)) => game,
                Err(e) => {
                    error!(game_id = %game_id, error = %e, "GAME_TASK_FAILED: ゲームタスク異常終了");
                    None
                }
            }
        });

        info!(
            game_id = %game.id,
            robots = robot_arns.len(),
            "GAME_STARTED: 試合開始"
        );
        jobs.insert(
            game.id.clone(),
            GameJob {
                stop: stop_tx,
                handle,
            },
        );
        game
    }

    /// 試合を中断します
    ///
    /// ゲームループは進行中のターンを終えてから停止します。
    ///
    /// # 戻り値
    ///
    /// 最後に確定した状態を `Finished` にしたゲーム。
    /// 1ターンも確定していなければIDだけを持つ `Finished` のゲーム
    pub async fn stop(&self, game_id: &str) -> Game {
        let job = {
            let mut jobs = self.jobs.lock().unwrap_or_else(|e| e.into_inner());
            jobs.remove(game_id)
        };

        let last = match job {
            Some(job) => {
                let _ = job.stop.send(true);
                match job.handle.await {
                    Ok(last) => last,
                    Err(e) => {
                        warn!(game_id = %game_id, error = %e, "GAME_TASK_JOIN_FAILED: タスク待機失敗");
                        None
                    }
                }
            }
            None => self
                .repository
                .find_by_primary_key(game_id)
                .map(|record| record.game),
        };
        self.repository.delete_by_id(game_id);
        info!(game_id = %game_id, "GAME_STOPPED: 試合中断");

        let last = last.unwrap_or_else(|| Game {
            id: game_id.to_string(),
            ..Default::default()
        });
        Game {
            status: GameStatus::Finished,
            ..last
        }
    }

    /// 試合が進行中か
    pub fn is_active(&self, game_id: &str) -> bool {
        let jobs = self.jobs.lock().unwrap_or_else(|e| e.into_inner());
        jobs.get(game_id)
            .is_some_and(|job| !job.handle.is_finished())
    }

    /// 進行中の試合のID一覧
    pub fn active_games(&self) -> Vec<String> {
        let jobs = self.jobs.lock().unwrap_or_else(|e| e.into_inner());
        let mut ids: Vec<String> = jobs
            .iter()
            .filter(|(_, job)| !job.handle.is_finished())
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        ids
    }

    fn game_loop(&self) -> GameLoop<S> {
        let game_loop = GameLoop::new(
            Arc::clone(&self.robot_service),
            Arc::clone(&self.repository),
            Arc::clone(&self.publisher),
        )
        .with_real_time(self.real_time);
        match self.seed {
            Some(seed) => game_loop.with_seed(seed),
            None => game_loop,
        }
    }

    fn forget(&self, game_id: &str) {
        let mut jobs = self.jobs.lock().unwrap_or_else(|e| e.into_inner());
        jobs.remove(game_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::robots::builtin_service;
    use crate::service::LocalRobotService;
    use crate::store::{BroadcastPublisher, InMemoryGameRepository};
    use std::time::Duration;

    fn registry(
        real_time: bool,
    ) -> (
        Arc<GameRegistry<LocalRobotService>>,
        Arc<InMemoryGameRepository>,
        BroadcastPublisher,
    ) {
        let repository = Arc::new(InMemoryGameRepository::new());
        let publisher = BroadcastPublisher::new(1024);
        let registry = GameRegistry::new(
            Arc::new(builtin_service()),
            repository.clone(),
            Arc::new(publisher.clone()),
        )
        .with_real_time(real_time)
        .with_seed(Some(3));
        (Arc::new(registry), repository, publisher)
    }

    fn arns() -> Vec<String> {
        vec!["target".to_string(), "target".to_string()]
    }

    #[tokio::test]
    async fn test_game_runs_to_completion() {
        let (registry, repository, publisher) = registry(false);
        let mut snapshots = publisher.subscribe();
        let info = GameInfo {
            max_game_turns: 3,
            ..Default::default()
        };

        let game = registry.start(arns(), info);
        assert_eq!(game.status, GameStatus::Start);

        let last = loop {
            let snapshot = snapshots.recv().await.unwrap();
            if snapshot.status.is_terminal() {
                break snapshot;
            }
        };
        assert_eq!(last.id, game.id);
        assert_eq!(last.status, GameStatus::Finished);
        assert_eq!(last.info.game_turn, 3);

        for _ in 0..100 {
            if !registry.is_active(&game.id) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(!registry.is_active(&game.id));
        assert!(registry.active_games().is_empty());
        assert!(repository.find_by_primary_key(&game.id).is_none());
    }

    #[tokio::test]
    async fn test_start_returns_running_game() {
        let (registry, _repository, _publisher) = registry(true);
        let first = registry.start(arns(), GameInfo::default());
        let second = registry.start(arns(), GameInfo::default());
        assert_eq!(first.id, second.id);
        assert_eq!(registry.active_games(), vec![first.id.clone()]);

        let stopped = registry.stop(&first.id).await;
        assert_eq!(stopped.id, first.id);
        assert_eq!(stopped.status, GameStatus::Finished);
        assert!(!registry.is_active(&first.id));
    }

    #[tokio::test]
    async fn test_stop_keeps_last_committed_state() {
        let (registry, repository, publisher) = registry(true);
        let mut snapshots = publisher.subscribe();
        let game = registry.start(arns(), GameInfo::default());

        // 初期化ターンの確定を待つ
        let initialized = snapshots.recv().await.unwrap();
        assert_eq!(initialized.status, GameStatus::NextTurn);

        let stopped = registry.stop(&game.id).await;
        assert_eq!(stopped.status, GameStatus::Finished);
        assert_eq!(stopped.robots.len(), 2);
        assert!(repository.find_by_primary_key(&game.id).is_none());
    }

    #[tokio::test]
    async fn test_stop_unknown_game() {
        let (registry, _repository, _publisher) = registry(false);
        let stopped = registry.stop("missing").await;
        assert_eq!(stopped.id, "missing");
        assert_eq!(stopped.status, GameStatus::Finished);
        assert!(stopped.robots.is_empty());
    }
}
