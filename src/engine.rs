//! # Engine モジュール
//!
//! ゲーム状態を1ターン分解決するルールエンジンです。
//!
//! ## ターン解決の順序
//!
//! 各ターンは以下の順序で処理され、各段階は前段階の出力を入力とします。
//!
//! 1. **行動収集**: 生存ロボットの意思決定関数を並行に呼び出す
//! 2. **行動適用**: 冷却時間・目標速度・目標方位の更新とミサイル発射
//! 3. **ロボット移動**: 台形積分による移動、壁衝突と接近衝突のダメージ
//! 4. **ミサイル処理**: 飛翔・爆発ダメージ・爆発段階の遷移
//! 5. **終了判定**: 生存数と最大ターン数による終了
//!
//! 状態はすべて値として受け渡され、各段階は新しい [`Game`] を返します。
//! 外部呼び出しの失敗はそのロボットの1ターンを劣化させるだけで、
//! ゲームのメッセージログに記録されます。

use crate::construction::{Construction, construct_robot, disqualified_robot, place_on_game_board};
use crate::error::ProviderError;
use crate::models::{
    Game, GameInfo, GameStatus, Locatable, Message, Missile, MissileStatus, MoveData, Robot,
    RobotAction, math_utils,
};
use crate::service::{RobotRequest, RobotResponse, RobotService};
use rand::Rng;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;
use tracing::{debug, trace, warn};

/// ターン中のメッセージを溜める
#[derive(Debug)]
struct TurnLog {
    game_turn: i32,
    messages: Vec<Message>,
}

impl TurnLog {
    fn new(game_turn: i32) -> Self {
        Self {
            game_turn,
            messages: Vec::new(),
        }
    }

    fn push(&mut self, text: impl Into<String>) {
        self.messages.push(Message::new(self.game_turn, text));
    }
}

/// ルールエンジン
///
/// 意思決定関数の呼び出しは [`RobotService`] に委譲し、それ以外の
/// 解決処理はすべて純粋な関数として実装されています。
pub struct GameLogic<S> {
    robot_service: Arc<S>,
}

impl<S> Clone for GameLogic<S> {
    fn clone(&self) -> Self {
        Self {
            robot_service: Arc::clone(&self.robot_service),
        }
    }
}

impl<S: RobotService> GameLogic<S> {
    pub fn new(robot_service: Arc<S>) -> Self {
        Self { robot_service }
    }

    /// 試合を初期化します
    ///
    /// 各ロボットにビルドを問い合わせて構築し、生存ロボットを盤面に配置して
    /// `NextTurn` 状態のゲームを返します。
    ///
    /// # 引数
    ///
    /// * `game` - `Start` 状態のゲーム
    /// * `arns` - 参加ロボットの意思決定関数（並び順がインデックスになる）
    /// * `rng` - 配置用の乱数生成器
    pub async fn initialize<R: Rng + Send>(&self, game: Game, arns: &[String], rng: &mut R) -> Game {
        let mut log = TurnLog::new(game.info.game_turn);

        let started = Instant::now();
        let constructions = self.build_robots(&game, arns).await;
        debug!(
            game_id = %game.id,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "STAGE_BUILD_ROBOTS: ビルド取得完了"
        );

        for construction in &constructions {
            let robot = &construction.robot;
            if construction.is_disqualified() {
                log.push(format!(
                    "{robot} was disqualified due to bad configuration: {}",
                    construction.description
                ));
            } else {
                log.push(format!(
                    "{robot} has joined the battle with the following config: {}",
                    construction.description
                ));
            }
        }

        let robots = constructions.into_iter().map(|c| c.robot).collect();
        let robots = place_on_game_board(&game.info, robots, rng);

        Game {
            status: GameStatus::NextTurn,
            robots,
            missiles: Vec::new(),
            messages: log.messages,
            ..game
        }
    }

    /// 1ターン分を解決します
    ///
    /// 戻り値のメッセージログはこのターンのメッセージのみを含みます。
    pub async fn next_turn(&self, game: Game) -> Game {
        let mut log = TurnLog::new(game.info.game_turn);
        let game_id = game.id.clone();

        let started = Instant::now();
        let actions = self.get_actions(&game, &mut log).await;
        debug!(
            game_id = %game_id,
            turn = log.game_turn,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "STAGE_GET_ACTIONS: 行動収集完了"
        );

        let started = Instant::now();
        let game = apply_all_actions(game, actions);
        let game = move_all_robots(game, &mut log);
        let game = update_all_missiles(game, &mut log);
        let game = update_game_status(game, &mut log);
        debug!(
            game_id = %game_id,
            turn = log.game_turn,
            elapsed_ms = started.elapsed().as_millis() as u64,
            alive = game.alive_count(),
            missiles = game.missiles.len(),
            "STAGE_RESOLVE: ターン解決完了"
        );

        Game {
            messages: log.messages,
            ..game
        }
    }

    /// 全ロボットのビルドを並行に取得し、インデックス順に構築する
    async fn build_robots(&self, game: &Game, arns: &[String]) -> Vec<Construction> {
        let timeout = robot_timeout(&game.info);
        let mut calls = JoinSet::new();
        for (index, arn) in arns.iter().enumerate() {
            let index = index as u32;
            let request = RobotRequest::get_build(&game.info, index, &game.id);
            let service = Arc::clone(&self.robot_service);
            let arn = arn.clone();
            calls.spawn(async move {
                let result = call_with_timeout(&*service, &arn, request, timeout).await;
                (index, result)
            });
        }
        let mut responses = collect_responses(calls).await;

        arns.iter()
            .enumerate()
            .map(|(index, arn)| {
                let index = index as u32;
                match responses.remove(&index) {
                    Some(Ok(response)) => {
                        construct_robot(index, &game.id, arn, &response.build, &game.info)
                    }
                    Some(Err(e)) => disqualified_robot(index, &game.id, arn, e.to_string()),
                    None => disqualified_robot(
                        index,
                        &game.id,
                        arn,
                        ProviderError::Transport("robot call aborted".to_string()).to_string(),
                    ),
                }
            })
            .collect()
    }

    /// 生存ロボットの行動を並行に取得し、ロボットIDで対応付けて返す
    ///
    /// 失敗したロボットには現在の速度と方位を維持する行動を代用します。
    async fn get_actions(&self, game: &Game, log: &mut TurnLog) -> Vec<(String, RobotAction)> {
        let timeout = robot_timeout(&game.info);
        let mut calls = JoinSet::new();
        for robot in game.alive_robots() {
            let request = RobotRequest::get_action(robot, &game.info, &game.id);
            let service = Arc::clone(&self.robot_service);
            let arn = robot.arn.clone();
            let robot_id = robot.id.clone();
            calls.spawn(async move {
                let result = call_with_timeout(&*service, &arn, request, timeout).await;
                (robot_id, result)
            });
        }
        let mut responses = collect_responses(calls).await;

        game.alive_robots()
            .map(|robot| {
                let result = responses.remove(&robot.id).unwrap_or_else(|| {
                    Err(ProviderError::Transport("robot call aborted".to_string()))
                });
                let action = match result {
                    Ok(response) => response.action,
                    Err(e) => {
                        warn!(
                            game_id = %game.id,
                            robot_id = %robot.id,
                            error = %e,
                            "ACTION_ERROR: 行動取得に失敗、速度と方位を維持"
                        );
                        log.push(format!(
                            "🚨 ACTION ERROR: {robot}, will maintain speed and heading. Error: {e}"
                        ));
                        RobotAction::new(robot.speed, robot.heading)
                    }
                };
                (robot.id.clone(), action)
            })
            .collect()
    }
}

fn robot_timeout(info: &GameInfo) -> Duration {
    Duration::try_from_secs_f64(info.robot_timeout_seconds).unwrap_or(Duration::from_secs(15))
}

async fn call_with_timeout<S: RobotService>(
    service: &S,
    arn: &str,
    request: RobotRequest,
    timeout: Duration,
) -> Result<RobotResponse, ProviderError> {
    match tokio::time::timeout(timeout, service.call_robot(arn, request)).await {
        Ok(result) => result.and_then(RobotResponse::into_result),
        Err(_) => Err(ProviderError::Timeout(timeout.as_secs_f64())),
    }
}

/// 完了順に届く結果をキーで引けるようにまとめる
///
/// パニックしたタスクの結果は欠落し、呼び出し側で失敗として扱われます。
async fn collect_responses<K>(
    mut calls: JoinSet<(K, Result<RobotResponse, ProviderError>)>,
) -> HashMap<K, Result<RobotResponse, ProviderError>>
where
    K: std::hash::Hash + Eq + Send + 'static,
{
    let mut responses = HashMap::new();
    while let Some(joined) = calls.join_next().await {
        match joined {
            Ok((key, result)) => {
                responses.insert(key, result);
            }
            Err(e) => warn!(error = %e, "ROBOT_CALL_PANICKED: ロボット呼び出しタスクが異常終了"),
        }
    }
    responses
}

/// 全ロボットの行動を順に適用する
pub fn apply_all_actions(game: Game, actions: Vec<(String, RobotAction)>) -> Game {
    actions
        .into_iter()
        .fold(game, |game, (robot_id, action)| {
            apply_robot_action(game, &robot_id, &action)
        })
}

/// 1体のロボットに行動を適用します
///
/// 冷却時間を1ターン分減らし、目標速度を `[0, max_speed]` にクリップ、
/// 目標方位を正規化します。冷却が終わっていれば発射要求に応じてミサイルを
/// 生成し、冷却中の発射要求は無視されます。
pub fn apply_robot_action(game: Game, robot_id: &str, action: &RobotAction) -> Game {
    let Some(robot) = game.robot(robot_id).filter(|r| r.is_alive()).cloned() else {
        return game;
    };
    let seconds_per_turn = game.info.seconds_per_turn;

    let robot = Robot {
        reload_cool_down: (robot.reload_cool_down - seconds_per_turn).max(0.0),
        target_speed: action.speed.min(robot.max_speed()).max(0.0),
        target_heading: math_utils::normalize_angle_180(action.heading),
        ..robot
    };

    if !action.fired {
        return game.update_robot(robot);
    }
    if !robot.can_fire() {
        trace!(
            robot_id = %robot.id,
            cool_down = robot.reload_cool_down,
            "FIRE_IGNORED: 冷却中の発射要求を無視"
        );
        return game.update_robot(robot);
    }

    let fired_count = robot.total_missile_fired_count + 1;
    let missile = Missile::fire(
        &robot.id,
        fired_count,
        (robot.x, robot.y),
        &robot.missile,
        action.fire_missile_heading,
        action.fire_missile_distance,
    );
    debug!(
        robot_id = %robot.id,
        missile_id = %missile.id,
        heading = missile.heading,
        range = missile.range,
        "MISSILE_FIRED: ミサイル発射"
    );
    let robot = Robot {
        total_missile_fired_count: fired_count,
        reload_cool_down: robot.missile.reload_cooldown,
        ..robot
    };
    game.update_robot(robot).update_missile(missile)
}

/// 全生存ロボットを移動させる
///
/// 段階開始時に生存していたロボットを順に処理し、途中で破壊された
/// ロボットは移動しません。
fn move_all_robots(game: Game, log: &mut TurnLog) -> Game {
    let robot_ids: Vec<String> = game.alive_robots().map(|r| r.id.clone()).collect();
    robot_ids.iter().fold(game, |game, robot_id| {
        match game.robot(robot_id).filter(|r| r.is_alive()).cloned() {
            Some(robot) => move_robot(game, robot, log),
            None => game,
        }
    })
}

fn move_robot(game: Game, robot: Robot, log: &mut TurnLog) -> Game {
    let info = game.info.clone();
    let turn = info.game_turn;
    let seconds_per_turn = info.seconds_per_turn;

    let old_speed = robot.speed;
    let new_speed = if robot.target_speed > old_speed {
        (old_speed + robot.engine.acceleration * seconds_per_turn).min(robot.target_speed)
    } else if robot.target_speed < old_speed {
        (old_speed - robot.deceleration() * seconds_per_turn).max(robot.target_speed)
    } else {
        old_speed
    };
    let heading = robot.target_heading;
    let effective_speed = (old_speed + new_speed) / 2.0;

    let move_data = move_object(
        &info,
        robot.x,
        robot.y,
        robot.total_travel_distance,
        effective_speed,
        heading,
        f64::MAX,
    );
    let robot = Robot {
        speed: new_speed,
        heading,
        ..robot
    }
    .do_move(move_data);

    let robot = if move_data.collision {
        let damage = robot.armor.collision_damage;
        let robot = robot.do_damage(damage, turn, true);
        if robot.is_alive() {
            log.push(format!("💥 {robot} received {damage} damage by wall collision"));
        } else {
            log.push(format!("💥 {robot} was destroyed by wall collision"));
        }
        robot
    } else {
        robot
    };

    let mut game = game.update_robot(robot.clone());
    if !robot.is_alive() {
        return game;
    }

    let nearby: Vec<String> = find_robots_by_distance(&game, &robot)
        .into_iter()
        .filter(|(_, distance)| *distance < info.collision_range)
        .map(|(other, _)| other.id.clone())
        .collect();
    for other_id in nearby {
        let Some(other) = game.robot(&other_id).filter(|r| r.is_alive()).cloned() else {
            continue;
        };
        let damage = robot.armor.collision_damage;
        let other = other.do_damage(damage, turn, true);
        if other.is_alive() {
            log.push(format!(
                "💥 {other} was damaged {damage} by collision with {robot}"
            ));
        } else {
            log.push(format!("💥 {other} was destroyed by collision with {robot}"));
        }
        game = game.update_robot(other);
    }
    game
}

/// 全ミサイルを処理し、消滅したものを除去する
fn update_all_missiles(game: Game, log: &mut TurnLog) -> Game {
    let missile_ids: Vec<String> = game.missiles.iter().map(|m| m.id.clone()).collect();
    let game = missile_ids.iter().fold(game, |game, missile_id| {
        let Some(missile) = game.missiles.iter().find(|m| &m.id == missile_id).cloned() else {
            return game;
        };
        match missile.status {
            MissileStatus::Flying => move_missile(game, missile),
            status if status.is_exploding() => assess_missile_damage(game, missile, log),
            _ => game.update_missile(Missile {
                status: MissileStatus::Destroyed,
                ..missile
            }),
        }
    });
    game.cleanup_missiles()
}

fn move_missile(game: Game, missile: Missile) -> Game {
    let move_data = move_object(
        &game.info,
        missile.x,
        missile.y,
        missile.distance,
        missile.speed,
        missile.heading,
        missile.range,
    );
    let missile = if move_data.collision {
        let missile = missile.explode_at(move_data);
        debug!(
            missile_id = %missile.id,
            x = missile.x,
            y = missile.y,
            "MISSILE_EXPLODED: 着弾"
        );
        missile
    } else {
        missile.do_move(move_data)
    };
    game.update_missile(missile)
}

/// 爆発中ミサイルのダメージを距離の近い順に解決する
///
/// 発射したロボット自身も対象に含まれます。
fn assess_missile_damage(game: Game, missile: Missile, log: &mut TurnLog) -> Game {
    let info = game.info.clone();
    let targets: Vec<(String, f64)> = find_robots_by_distance(&game, &missile)
        .into_iter()
        .map(|(robot, distance)| (robot.id.clone(), distance))
        .collect();

    let mut game = game;
    for (robot_id, distance) in targets {
        let Some(robot) = game.robot(&robot_id).filter(|r| r.is_alive()).cloned() else {
            continue;
        };
        let (damage, kind) = match missile.status {
            MissileStatus::ExplodingDirect if distance <= info.direct_hit_range => (
                robot.armor.direct_hit_damage + missile.direct_hit_damage_bonus,
                "direct",
            ),
            MissileStatus::ExplodingNear if distance <= info.near_hit_range => (
                robot.armor.near_hit_damage + missile.near_hit_damage_bonus,
                "near",
            ),
            MissileStatus::ExplodingFar if distance <= info.far_hit_range => (
                robot.armor.far_hit_damage + missile.far_hit_damage_bonus,
                "far",
            ),
            _ => (0.0, ""),
        };
        if damage <= 0.0 {
            continue;
        }

        let damaged = robot.do_damage(damage, info.game_turn, false);
        game = game.update_robot(damaged.clone());

        let self_hit = damaged.id == missile.robot_id;
        match game.robot(&missile.robot_id).cloned() {
            Some(owner) => {
                let owner = owner.add_damage_dealt(damage).add_hit();
                let owner = if !damaged.is_alive() && !self_hit {
                    owner.add_kill()
                } else {
                    owner
                };
                log.push(hit_message(&damaged, &owner, damage, kind, self_hit));
                game = game.update_robot(owner);
            }
            None => log.push(format!("🦾 {damaged} received {damage} {kind} damage")),
        }
    }
    game.update_missile(missile.update_explode_status())
}

fn hit_message(damaged: &Robot, owner: &Robot, damage: f64, kind: &str, self_hit: bool) -> String {
    match (self_hit, damaged.is_alive()) {
        (true, false) => format!("🤦 {damaged}, killed itself"),
        (true, true) => format!("🤦 {damaged}, caused {damage} damage to itself"),
        (false, false) => format!("🦾 {damaged} was killed by {owner}"),
        (false, true) => format!("🦾 {damaged} received {damage} {kind} damage from {owner}"),
    }
}

/// 終了条件を評価する
///
/// 終了時は残っているミサイルを取り除きます。
fn update_game_status(game: Game, log: &mut TurnLog) -> Game {
    let alive: Vec<String> = game.alive_robots().map(|r| r.to_string()).collect();
    let text = match alive.as_slice() {
        [] => "All robots have perished. Game Over.".to_string(),
        [winner] => format!("{winner} is victorious! Game Over."),
        survivors if game.info.game_turn >= game.info.max_game_turns => format!(
            "Reached max turns. {} robots are left. Game Over.",
            survivors.len()
        ),
        _ => return game,
    };
    debug!(game_id = %game.id, turn = game.info.game_turn, "GAME_FINISHED: {}", text);
    log.push(text);
    Game {
        status: GameStatus::Finished,
        missiles: Vec::new(),
        ..game
    }
}

/// 盤面上の1ターン分の移動を計算します
///
/// 累積距離が `range` に達した場合は `range` で打ち切り、盤面端を越える場合は
/// 端で打ち切ります。どちらの場合も `collision` が立ちます。
///
/// # 引数
///
/// * `start_x`, `start_y` - 開始位置
/// * `start_distance` - 開始時の累積移動距離
/// * `speed` - このターンの実効速度（m/s）
/// * `heading` - 進行方位（度）
/// * `range` - 累積移動距離の上限
pub fn move_object(
    info: &GameInfo,
    start_x: f64,
    start_y: f64,
    start_distance: f64,
    speed: f64,
    heading: f64,
    range: f64,
) -> MoveData {
    let mut distance = start_distance + speed * info.seconds_per_turn;
    let mut collision = false;
    if distance >= range {
        distance = range;
        collision = true;
    }

    let radians = heading.to_radians();
    let sin_heading = snap_to_zero(radians.sin());
    let cos_heading = snap_to_zero(radians.cos());
    let delta = distance - start_distance;
    let x = start_x + delta * sin_heading;
    let y = start_y + delta * cos_heading;

    // 盤面端を越える場合は最も手前の端までの移動量に縮める
    let mut clipped = delta;
    if x < 0.0 {
        clipped = clipped.min((0.0 - start_x) / sin_heading);
    }
    if x > info.board_width {
        clipped = clipped.min((info.board_width - start_x) / sin_heading);
    }
    if y < 0.0 {
        clipped = clipped.min((0.0 - start_y) / cos_heading);
    }
    if y > info.board_height {
        clipped = clipped.min((info.board_height - start_y) / cos_heading);
    }

    if clipped != delta {
        let clipped = clipped.max(0.0);
        return MoveData {
            x: (start_x + clipped * sin_heading).clamp(0.0, info.board_width),
            y: (start_y + clipped * cos_heading).clamp(0.0, info.board_height),
            distance: start_distance + clipped,
            collision: true,
        };
    }
    MoveData {
        x,
        y,
        distance,
        collision,
    }
}

fn snap_to_zero(value: f64) -> f64 {
    if value.abs() < 1e-12 { 0.0 } else { value }
}

/// 対象以外の生存ロボットを距離の近い順に返す
///
/// 等距離の場合はゲーム内の並び順（インデックス順）を保ちます。
pub fn find_robots_by_distance<'a, L: Locatable>(game: &'a Game, object: &L) -> Vec<(&'a Robot, f64)> {
    let mut robots: Vec<(&Robot, f64)> = game
        .alive_robots()
        .filter(|r| r.id != object.id())
        .map(|r| {
            let distance = math_utils::distance_to_xy(r.x, r.y, object.x(), object.y());
            (r, distance)
        })
        .collect();
    robots.sort_by(|a, b| a.1.total_cmp(&b.1));
    robots
}

/// レーダー走査
///
/// 分解能を `[0.01, radar.max_resolution]` にクリップし、レーダー範囲内の
/// 生存ロボットを近い順に調べて、観測者からの方位が `heading ± resolution`
/// に入る最初のロボットを返します。
pub fn scan_robots<'a>(
    game: &'a Game,
    observer: &Robot,
    heading: f64,
    resolution: f64,
) -> Option<(&'a Robot, f64)> {
    let resolution = resolution.min(observer.radar.max_resolution).max(0.01);
    find_robots_by_distance(game, observer)
        .into_iter()
        .filter(|(_, distance)| *distance <= observer.radar.range)
        .find(|(other, _)| {
            let bearing = math_utils::angle_to_xy(other.x, other.y, observer.x, observer.y);
            math_utils::normalize_angle_180(heading - bearing).abs() <= resolution
        })
}
