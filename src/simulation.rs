//! # Simulation モジュール
//!
//! 1試合分のターンループを駆動します。
//!
//! ループは毎ターン、保存済みのゲームレコードを読み込み、状態に応じて
//! 初期化または1ターンの解決を行い、結果を配信・保存します。
//!
//! ## ターンの流れ
//!
//! 1. **読み込み**: ゲームレコードを取得（見つからなければループ終了）
//! 2. **解決**: `Start` なら初期化、`NextTurn` なら1ターン解決、それ以外は終了
//! 3. **配信**: メッセージをログに出力し、ゲームを配信
//! 4. **保存**: ターン番号を進めたゲームを保存
//! 5. **ペース調整**: 実時間モードでは1ターンの秒数に満たない分だけ待機
//!
//! 中断要求はターンの合間にのみ反映され、ターンの途中で止まることはありません。
//! ループを抜けるとゲームレコードは削除されます。
//!
//! ## 使用例
//!
//! ```rust,ignore
//! use robosim::simulation::GameLoop;
//!
//! let (stop_tx, stop_rx) = tokio::sync::watch::channel(false);
//! let outcome = GameLoop::new(service, repository, publisher)
//!     .with_real_time(false)
//!     .run(&game_id, stop_rx)
//!     .await?;
//! ```

use crate::engine::GameLogic;
use crate::error::{Result, SimError};
use crate::models::{Game, GameInfo, GameStatus, Message};
use crate::service::RobotService;
use crate::store::{GamePublisher, GameRecord, GameRepository};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// 進捗をログに出す間隔（ターン）
const PROGRESS_INTERVAL: i32 = 50;

/// ループの終わり方
#[derive(Debug, Clone, PartialEq)]
pub enum LoopOutcome {
    /// 試合が終了した（最終スナップショット）
    Finished(Game),
    /// 中断された（最後に確定したスナップショット、未確定なら `None`）
    Cancelled(Option<Game>),
}

/// 1試合分のターンループ
pub struct GameLoop<S> {
    logic: GameLogic<S>,
    robot_service: Arc<S>,
    repository: Arc<dyn GameRepository>,
    publisher: Arc<dyn GamePublisher>,
    real_time: bool,
    rng: StdRng,
}

impl<S: RobotService> GameLoop<S> {
    pub fn new(
        robot_service: Arc<S>,
        repository: Arc<dyn GameRepository>,
        publisher: Arc<dyn GamePublisher>,
    ) -> Self {
        Self {
            logic: GameLogic::new(Arc::clone(&robot_service)),
            robot_service,
            repository,
            publisher,
            real_time: true,
            rng: StdRng::from_entropy(),
        }
    }

    /// 実時間に合わせたペース調整の有無
    pub fn with_real_time(self, real_time: bool) -> Self {
        Self { real_time, ..self }
    }

    /// 配置用乱数のシードを固定する
    pub fn with_seed(self, seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            ..self
        }
    }

    /// ターンループを実行します
    ///
    /// # 引数
    ///
    /// * `game_id` - 保存済みゲームレコードのID
    /// * `stop` - `true` が送られるとターンの合間で中断する
    ///
    /// # 戻り値
    ///
    /// 終了の仕方と最後のスナップショット。ゲームレコードが見つからない場合はエラー
    pub async fn run(mut self, game_id: &str, mut stop: watch::Receiver<bool>) -> Result<LoopOutcome> {
        info!(game_id = %game_id, real_time = self.real_time, "=== ゲームループ開始 ===");

        let result = self.run_turns(game_id, &mut stop).await;

        self.repository.delete_by_id(game_id);
        self.robot_service.end_game(game_id);

        match &result {
            Ok(LoopOutcome::Finished(game)) => info!(
                game_id = %game_id,
                turn = game.info.game_turn,
                alive = game.alive_count(),
                "=== ゲームループ終了 ==="
            ),
            Ok(LoopOutcome::Cancelled(_)) => info!(game_id = %game_id, "=== ゲームループ中断 ==="),
            Err(e) => error!(game_id = %game_id, error = %e, "GAME_LOOP_FAILED: ゲームループ異常終了"),
        }
        result
    }

    async fn run_turns(
        &mut self,
        game_id: &str,
        stop: &mut watch::Receiver<bool>,
    ) -> Result<LoopOutcome> {
        let max_game_turns = self.load(game_id)?.game.info.max_game_turns;
        let mut last: Option<Game> = None;

        for turn_number in 0..=max_game_turns {
            if *stop.borrow() {
                info!(game_id = %game_id, turn = turn_number, "GAME_LOOP_CANCELLED: 中断要求を受信");
                return Ok(LoopOutcome::Cancelled(last));
            }

            let started = Instant::now();
            let game = self.turn(game_id, turn_number).await?;
            if game.status.is_terminal() {
                return Ok(LoopOutcome::Finished(game));
            }

            if turn_number > 0 && turn_number % PROGRESS_INTERVAL == 0 {
                info!(
                    game_id = %game_id,
                    "進行状況: ターン {}/{} (生存: {}体)",
                    turn_number,
                    max_game_turns,
                    game.alive_count()
                );
            }

            if self.real_time {
                pace(game.info.seconds_per_turn, started, stop).await;
            }
            last = Some(game);
        }

        let last = match last {
            Some(game) => game,
            None => self.load(game_id)?.game,
        };
        let game = Game {
            status: GameStatus::Finished,
            missiles: Vec::new(),
            messages: vec![Message::new(max_game_turns, "Max turns exceeded, Game Over.")],
            ..last
        };
        warn!(game_id = %game_id, max_game_turns, "MAX_TURNS_EXCEEDED: 最大ターン数を超過");
        self.publisher.publish(&game);
        Ok(LoopOutcome::Finished(game))
    }

    /// 1ターン分を解決して配信・保存する
    async fn turn(&mut self, game_id: &str, turn_number: i32) -> Result<Game> {
        let record = self.load(game_id)?;
        let game = match record.game.status {
            GameStatus::Start => {
                self.logic
                    .initialize(record.game.clone(), &record.robot_arns, &mut self.rng)
                    .await
            }
            GameStatus::NextTurn => self.logic.next_turn(record.game.clone()).await,
            GameStatus::Finished | GameStatus::Error => {
                debug!(game_id = %game_id, status = ?record.game.status, "GAME_ALREADY_OVER: 終了済み");
                return Ok(record.game);
            }
            GameStatus::Undefined => {
                warn!(game_id = %game_id, "GAME_STATUS_UNDEFINED: 状態が未定義のため終了");
                return Ok(Game {
                    status: GameStatus::Error,
                    ..record.game
                });
            }
        };

        for message in &game.messages {
            info!(game_id = %game_id, turn = message.game_turn, "{}", message.text);
        }
        self.publisher.publish(&game);

        let committed = Game {
            info: GameInfo {
                game_turn: turn_number + 1,
                ..game.info.clone()
            },
            ..game.clone()
        };
        self.repository.save(GameRecord {
            game: committed,
            ..record
        });
        Ok(game)
    }

    fn load(&self, game_id: &str) -> Result<GameRecord> {
        self.repository
            .find_by_primary_key(game_id)
            .ok_or_else(|| SimError::GameNotFound(game_id.to_string()))
    }
}

/// 1ターンの秒数に満たない分だけ待つ（中断要求で打ち切る）
async fn pace(seconds_per_turn: f64, started: Instant, stop: &mut watch::Receiver<bool>) {
    let Ok(turn_duration) = Duration::try_from_secs_f64(seconds_per_turn) else {
        return;
    };
    let Some(remaining) = turn_duration.checked_sub(started.elapsed()) else {
        return;
    };
    tokio::select! {
        _ = tokio::time::sleep(remaining) => {}
        Ok(()) = stop.changed() => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::robots::builtin_service;
    use crate::service::LocalRobotService;
    use crate::store::{BroadcastPublisher, InMemoryGameRepository};

    fn setup(
        arns: &[&str],
        info: GameInfo,
    ) -> (
        GameLoop<LocalRobotService>,
        Arc<InMemoryGameRepository>,
        BroadcastPublisher,
        String,
    ) {
        let repository = Arc::new(InMemoryGameRepository::new());
        let publisher = BroadcastPublisher::new(1024);
        let game = Game::new("game-1", info);
        let game_id = game.id.clone();
        repository.save(GameRecord::new(
            game,
            arns.iter().map(|a| a.to_string()).collect(),
        ));
        let game_loop = GameLoop::new(
            Arc::new(builtin_service()),
            repository.clone(),
            Arc::new(publisher.clone()),
        )
        .with_real_time(false)
        .with_seed(17);
        (game_loop, repository, publisher, game_id)
    }

    #[tokio::test]
    async fn test_runs_to_max_turns() {
        let info = GameInfo {
            max_game_turns: 5,
            ..Default::default()
        };
        let (game_loop, repository, publisher, game_id) = setup(&["target", "target"], info);
        let mut snapshots = publisher.subscribe();
        let (_stop_tx, stop_rx) = watch::channel(false);

        let outcome = game_loop.run(&game_id, stop_rx).await.unwrap();
        let LoopOutcome::Finished(game) = outcome else {
            panic!("expected finished game");
        };
        assert_eq!(game.status, GameStatus::Finished);
        assert_eq!(game.info.game_turn, 5);
        assert_eq!(
            game.messages.last().map(|m| m.text.as_str()),
            Some("Reached max turns. 2 robots are left. Game Over.")
        );
        assert!(repository.find_by_primary_key(&game_id).is_none());

        let mut turns = Vec::new();
        while let Ok(snapshot) = snapshots.try_recv() {
            turns.push(snapshot.info.game_turn);
        }
        assert_eq!(turns, vec![0, 1, 2, 3, 4, 5]);
    }

    #[tokio::test]
    async fn test_single_survivor_wins() {
        let (game_loop, _repository, _publisher, game_id) =
            setup(&["target"], GameInfo::default());
        let (_stop_tx, stop_rx) = watch::channel(false);
        let outcome = game_loop.run(&game_id, stop_rx).await.unwrap();
        let LoopOutcome::Finished(game) = outcome else {
            panic!("expected finished game");
        };
        assert_eq!(game.info.game_turn, 1);
        assert_eq!(game.messages[0].text, "TargetRobot (R0) is victorious! Game Over.");
    }

    #[tokio::test]
    async fn test_cancel_before_first_turn() {
        let (game_loop, repository, _publisher, game_id) =
            setup(&["target", "target"], GameInfo::default());
        let (stop_tx, stop_rx) = watch::channel(false);
        stop_tx.send(true).unwrap();
        let outcome = game_loop.run(&game_id, stop_rx).await.unwrap();
        assert_eq!(outcome, LoopOutcome::Cancelled(None));
        assert!(repository.is_empty());
    }

    #[tokio::test]
    async fn test_cancel_interrupts_pacing() {
        let (game_loop, repository, _publisher, game_id) =
            setup(&["target", "target"], GameInfo::default());
        let game_loop = game_loop.with_real_time(true);
        let (stop_tx, stop_rx) = watch::channel(false);

        let handle = tokio::spawn(async move { game_loop.run(&game_id, stop_rx).await });
        tokio::time::sleep(Duration::from_millis(100)).await;
        stop_tx.send(true).unwrap();

        let outcome = handle.await.unwrap().unwrap();
        let LoopOutcome::Cancelled(Some(game)) = outcome else {
            panic!("expected cancelled game with a committed turn");
        };
        assert_eq!(game.status, GameStatus::NextTurn);
        assert_eq!(game.info.game_turn, 0);
        assert!(repository.is_empty());
    }

    #[tokio::test]
    async fn test_missing_record_is_an_error() {
        let (game_loop, _repository, _publisher, _game_id) =
            setup(&["target"], GameInfo::default());
        let (_stop_tx, stop_rx) = watch::channel(false);
        let result = game_loop.run("unknown", stop_rx).await;
        assert!(matches!(result, Err(SimError::GameNotFound(_))));
    }
}
