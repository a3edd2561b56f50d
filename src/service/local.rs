//! プロセス内ロボットの呼び出し
//!
//! ハンドル名ごとにブレインの生成関数を登録しておき、ロボットIDごとに
//! 1つのブレインと持ち越し状態を保持します。

use super::{RobotCommand, RobotRequest, RobotResponse, RobotService};
use crate::error::ProviderError;
use crate::models::{GameInfo, Robot, RobotAction, RobotBuild, RobotState, math_utils};
use crate::scan::{ScanEnemiesRequest, ScanEnemiesResponse, ScanService};
use rand::Rng;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use tracing::{debug, trace};

/// 壁から離れる判定の既定距離（m）
pub const DEFAULT_WALL_DISTANCE: f64 = 100.0;

/// ブレインから使えるレーダー走査
pub trait Scanner: Send + Sync {
    fn scan(&self, game_id: &str, robot_id: &str, heading: f64, resolution: f64)
    -> ScanEnemiesResponse;
}

impl Scanner for ScanService {
    fn scan(
        &self,
        game_id: &str,
        robot_id: &str,
        heading: f64,
        resolution: f64,
    ) -> ScanEnemiesResponse {
        let request = ScanEnemiesRequest {
            game_id: game_id.to_string(),
            robot_id: robot_id.to_string(),
            heading,
            resolution,
        };
        ScanService::scan(self, &request).unwrap_or_else(|e| {
            debug!(game_id = %game_id, robot_id = %robot_id, error = %e, "SCAN_FAILED: 走査失敗");
            ScanEnemiesResponse::not_found()
        })
    }
}

/// ブレインに渡される1ターン分の文脈
///
/// 自分自身のスナップショットとゲーム設定、走査手段を提供します。
pub struct BrainContext<'a> {
    pub robot: &'a Robot,
    pub game_info: &'a GameInfo,
    pub game_id: &'a str,
    scanner: Option<&'a dyn Scanner>,
}

impl<'a> BrainContext<'a> {
    pub fn new(
        robot: &'a Robot,
        game_info: &'a GameInfo,
        game_id: &'a str,
        scanner: Option<&'a dyn Scanner>,
    ) -> Self {
        Self {
            robot,
            game_info,
            game_id,
            scanner,
        }
    }

    /// 指定方位を走査する（走査手段がなければ常に未発見）
    pub fn scan(&self, heading: f64, resolution: f64) -> ScanEnemiesResponse {
        match self.scanner {
            Some(scanner) => scanner.scan(self.game_id, &self.robot.id, heading, resolution),
            None => ScanEnemiesResponse::not_found(),
        }
    }

    /// 自分から見た指定座標の方位（度）
    pub fn angle_to_xy(&self, x: f64, y: f64) -> f64 {
        math_utils::angle_to_xy(x, y, self.robot.x, self.robot.y)
    }

    /// 自分から指定座標までの距離（m）
    pub fn distance_to_xy(&self, x: f64, y: f64) -> f64 {
        math_utils::distance_to_xy(x, y, self.robot.x, self.robot.y)
    }

    /// 指定座標に着弾するよう発射要求を付ける
    pub fn fire_missile_to_xy(&self, action: RobotAction, x: f64, y: f64) -> RobotAction {
        action.fire_missile(self.angle_to_xy(x, y), self.distance_to_xy(x, y))
    }

    /// 指定座標へ向かう行動を作る
    ///
    /// 減速距離から速度を決め、衝突距離以内なら停止して到着とします。
    /// 旋回が必要な場合は `max_turn_speed` に制限し、それより速く走行中なら
    /// 方位は変えずに減速だけ行います。
    pub fn move_to_xy(&self, action: RobotAction, x: f64, y: f64) -> RobotAction {
        let heading = self.angle_to_xy(x, y);
        let distance = self.distance_to_xy(x, y);
        let (speed, arrived) = if distance <= self.game_info.collision_range {
            (0.0, true)
        } else {
            (
                (distance * 2.0 * self.robot.deceleration()).sqrt()
                    * self.game_info.seconds_per_turn,
                false,
            )
        };

        if math_utils::normalize_angle_180(self.robot.heading - heading).abs() > 0.1 {
            let speed = speed.min(self.robot.max_turn_speed);
            if self.robot.speed <= self.robot.max_turn_speed {
                RobotAction {
                    heading,
                    speed,
                    arrived_at_destination: arrived,
                    ..action
                }
            } else {
                RobotAction {
                    speed,
                    arrived_at_destination: arrived,
                    ..action
                }
            }
        } else {
            RobotAction {
                heading,
                speed,
                arrived_at_destination: arrived,
                ..action
            }
        }
    }

    /// 壁に近づいたら盤面中央寄りに向きを変える
    ///
    /// 壁から `min_distance_to_wall` 以上離れていれば現在の方位を維持します。
    pub fn new_heading<R: Rng>(&self, rng: &mut R, min_distance_to_wall: f64) -> f64 {
        let robot = self.robot;
        let info = self.game_info;
        let near_wall = robot.x < min_distance_to_wall
            || robot.x > info.board_width - min_distance_to_wall
            || robot.y < min_distance_to_wall
            || robot.y > info.board_height - min_distance_to_wall;
        if near_wall {
            let to_center = self.angle_to_xy(info.board_width / 2.0, info.board_height / 2.0);
            math_utils::normalize_angle_180(to_center + rng.gen_range(-45.0..45.0))
        } else {
            robot.heading
        }
    }
}

/// プロセス内で動くロボットの意思決定
pub trait RobotBrain: Send {
    /// 装備構成を返す（状態の初期化もここで行う）
    fn get_build(&mut self, state: &mut RobotState) -> RobotBuild;

    /// 1ターン分の行動を返す
    fn get_action(&mut self, context: &BrainContext<'_>, state: &mut RobotState) -> RobotAction;
}

type BrainFactory = Box<dyn Fn() -> Box<dyn RobotBrain> + Send + Sync>;

struct BrainSlot {
    brain: Box<dyn RobotBrain>,
    state: RobotState,
}

/// プロセス内ロボットの呼び出しアダプタ
///
/// `arn` を登録済みのハンドル名として解決します。
#[derive(Default)]
pub struct LocalRobotService {
    factories: HashMap<String, BrainFactory>,
    slots: Mutex<HashMap<String, Arc<Mutex<BrainSlot>>>>,
    scanner: Option<Arc<dyn Scanner>>,
}

impl LocalRobotService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_scanner(self, scanner: Arc<dyn Scanner>) -> Self {
        Self {
            scanner: Some(scanner),
            ..self
        }
    }

    /// ハンドル名にブレインの生成関数を登録
    pub fn register<F, B>(&mut self, handle: &str, factory: F)
    where
        F: Fn() -> B + Send + Sync + 'static,
        B: RobotBrain + 'static,
    {
        self.factories.insert(
            handle.to_string(),
            Box::new(move || Box::new(factory()) as Box<dyn RobotBrain>),
        );
    }

    pub fn contains(&self, handle: &str) -> bool {
        self.factories.contains_key(handle)
    }

    /// 登録済みのハンドル名（辞書順）
    pub fn handles(&self) -> Vec<String> {
        let mut handles: Vec<String> = self.factories.keys().cloned().collect();
        handles.sort();
        handles
    }

    fn slot(&self, arn: &str, robot_id: &str) -> Result<Arc<Mutex<BrainSlot>>, ProviderError> {
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(slot) = slots.get(robot_id) {
            return Ok(Arc::clone(slot));
        }
        let factory = self
            .factories
            .get(arn)
            .ok_or_else(|| ProviderError::UnknownRobot(arn.to_string()))?;
        let slot = Arc::new(Mutex::new(BrainSlot {
            brain: factory(),
            state: RobotState::default(),
        }));
        slots.insert(robot_id.to_string(), Arc::clone(&slot));
        debug!(arn = %arn, robot_id = %robot_id, "BRAIN_CREATED: ブレイン生成");
        Ok(slot)
    }
}

/// ブレインを1回呼び出す
///
/// ブレインの処理は同期的なため、ブロッキング用スレッドから呼ばれます。
fn run_brain(
    slot: &Mutex<BrainSlot>,
    scanner: Option<&dyn Scanner>,
    request: RobotRequest,
) -> Result<RobotResponse, ProviderError> {
    let robot_id = request.robot_id();
    let mut slot = slot.lock().unwrap_or_else(|e| e.into_inner());
    let BrainSlot { brain, state } = &mut *slot;

    let response = match request.command {
        RobotCommand::GetBuild => RobotResponse {
            build: brain.get_build(state),
            ..Default::default()
        },
        RobotCommand::GetAction => {
            let context =
                BrainContext::new(&request.robot, &request.game_info, &request.game_id, scanner);
            RobotResponse {
                action: brain.get_action(&context, state),
                ..Default::default()
            }
        }
    };
    trace!(robot_id = %robot_id, command = ?request.command, "LOCAL_ROBOT_CALL: 呼び出し完了");
    Ok(RobotResponse {
        state: state.clone(),
        ..response
    })
}

impl RobotService for LocalRobotService {
    fn call_robot(
        &self,
        arn: &str,
        request: RobotRequest,
    ) -> impl Future<Output = Result<RobotResponse, ProviderError>> + Send {
        let slot = self.slot(arn, &request.robot_id());
        let scanner = self.scanner.clone();
        // ブロッキング用スレッドで動かし、呼び出し側のタイムアウトが効くようにする
        async move {
            let slot = slot?;
            tokio::task::spawn_blocking(move || run_brain(&slot, scanner.as_deref(), request))
                .await
                .map_err(|e| ProviderError::Transport(format!("robot brain failed: {e}")))?
        }
    }

    fn end_game(&self, game_id: &str) {
        let prefix = format!("{game_id}:");
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        slots.retain(|robot_id, _| !robot_id.starts_with(&prefix));
    }
}
