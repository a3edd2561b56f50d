use clap::{Arg, ArgAction, Command};
use robosim::logging::{LogConfig, LogOutput, init_logging, parse_log_level};
use robosim::models::{Game, GameStatus};
use robosim::registry::GameRegistry;
use robosim::robots::{BUILTIN_HANDLES, builtin_service};
use robosim::scan::ScanService;
use robosim::scenario::{RobotType, ScenarioConfig};
use robosim::service::{HttpRobotService, RobotService};
use robosim::store::{
    BroadcastPublisher, FanoutPublisher, GamePublisher, InMemoryGameRepository, JsonLinesPublisher,
    TracingPublisher,
};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// 試合終了を確認する間隔
const WATCH_INTERVAL: Duration = Duration::from_millis(200);

fn main() {
    let matches = Command::new("robosim")
        .version("0.1.0")
        .about("ロボット対戦シミュレーション (Robot Combat Simulation)")
        .long_about("2次元アリーナでロボット同士が戦うターン制シミュレーション\n\
                     シナリオファイルに従って1試合を実行し、最終成績を表示します。")
        .arg(
            Arg::new("scenario")
                .short('s')
                .long("scenario")
                .value_name("FILE")
                .help("シナリオファイル(.yaml)のパスを指定"),
        )
        .arg(
            Arg::new("info")
                .short('i')
                .long("info")
                .action(ArgAction::SetTrue)
                .help("シナリオの情報のみ表示して終了"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::Count)
                .help("詳細出力レベル (-v: DEBUG, -vv: TRACE)"),
        )
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .value_name("LEVEL")
                .help("ログレベル (trace, debug, info, warn, error)"),
        )
        .arg(
            Arg::new("log-output")
                .long("log-output")
                .value_name("OUTPUT")
                .help("ログ出力先 (console, file, both)"),
        )
        .arg(
            Arg::new("no-pacing")
                .long("no-pacing")
                .action(ArgAction::SetTrue)
                .help("1ターンの秒数を待たずに最速で実行"),
        )
        .arg(
            Arg::new("list-robots")
                .long("list-robots")
                .action(ArgAction::SetTrue)
                .help("組み込みロボットの一覧を表示して終了")
                .conflicts_with("info"),
        )
        .get_matches();

    if matches.get_flag("list-robots") {
        println!("組み込みロボット:");
        for handle in BUILTIN_HANDLES {
            println!("  {}", handle);
        }
        return;
    }

    let Some(scenario_path) = matches.get_one::<String>("scenario") else {
        show_default_help();
        return;
    };

    let scenario = match ScenarioConfig::from_file(scenario_path) {
        Ok(scenario) => scenario,
        Err(e) => {
            eprintln!("エラー: {}", e);
            std::process::exit(1);
        }
    };

    if matches.get_flag("info") {
        scenario.print_summary();
        return;
    }

    let mut log_config = LogConfig::from(&scenario.logging);
    if let Some(level) = matches.get_one::<String>("log-level") {
        log_config.level = parse_log_level(level);
    }
    if let Some(output) = matches.get_one::<String>("log-output") {
        match LogOutput::from_str(output) {
            Ok(output) => log_config.output = output,
            Err(e) => eprintln!("警告: {}", e),
        }
    }
    let log_config = log_config.with_verbosity(matches.get_count("verbose"));
    let _guard = match init_logging(log_config) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("エラー: ログ初期化に失敗しました: {}", e);
            std::process::exit(1);
        }
    };

    let real_time = scenario.sim.real_time && !matches.get_flag("no-pacing");
    match run_scenario(scenario, real_time) {
        Ok(game) => print_standings(&game),
        Err(e) => {
            eprintln!("エラー: {}", e);
            std::process::exit(1);
        }
    }
}

/// シナリオの試合を1つ実行し、最終状態を返す
fn run_scenario(scenario: ScenarioConfig, real_time: bool) -> Result<Game, Box<dyn std::error::Error>> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(play(scenario, real_time))
}

async fn play(scenario: ScenarioConfig, real_time: bool) -> Result<Game, Box<dyn std::error::Error>> {
    let repository = Arc::new(InMemoryGameRepository::new());
    let broadcast = BroadcastPublisher::new(256);
    let snapshots = broadcast.subscribe();

    let mut publisher = FanoutPublisher::new().with(TracingPublisher).with(broadcast);
    if let Some(path) = &scenario.sim.snapshot_file {
        publisher = publisher.with(JsonLinesPublisher::create(path)?);
        info!(path = %path.display(), "SNAPSHOT_FILE: スナップショット出力を有効化");
    }
    let publisher: Arc<dyn GamePublisher> = Arc::new(publisher);

    match scenario.sim.robot_type {
        RobotType::Local => {
            let service = builtin_service()
                .with_scanner(Arc::new(ScanService::new(repository.clone())));
            for handle in scenario.robots.iter().filter(|h| !service.contains(h)) {
                warn!(handle = %handle, "UNKNOWN_ROBOT: 未登録のロボットは失格になります");
            }
            run_game(service, repository, publisher, snapshots, &scenario, real_time).await
        }
        RobotType::Remote => {
            let service = HttpRobotService::new();
            run_game(service, repository, publisher, snapshots, &scenario, real_time).await
        }
    }
}

async fn run_game<S: RobotService>(
    service: S,
    repository: Arc<InMemoryGameRepository>,
    publisher: Arc<dyn GamePublisher>,
    mut snapshots: broadcast::Receiver<Game>,
    scenario: &ScenarioConfig,
    real_time: bool,
) -> Result<Game, Box<dyn std::error::Error>> {
    let registry = Arc::new(
        GameRegistry::new(Arc::new(service), repository, publisher)
            .with_real_time(real_time)
            .with_seed(scenario.sim.seed),
    );

    let game = registry.start(scenario.robots.clone(), scenario.game.to_game_info());
    info!(game_id = %game.id, name = %scenario.meta.name, "=== 試合開始 ===");

    let finished = tokio::select! {
        finished = wait_for_finish(&registry, &mut snapshots, &game.id) => finished,
        signal = tokio::signal::ctrl_c() => {
            if let Err(e) = signal {
                warn!(error = %e, "SIGNAL_FAILED: シグナル待機に失敗");
            }
            warn!(game_id = %game.id, "INTERRUPTED: 中断要求を受信、試合を停止します");
            Some(registry.stop(&game.id).await)
        }
    };

    finished.ok_or_else(|| format!("試合 {} の最終結果を取得できませんでした", game.id).into())
}

/// 試合の最終スナップショットを待つ
///
/// ゲームループが最終スナップショットを配信せずに終わった場合は `None`。
async fn wait_for_finish<S: RobotService>(
    registry: &GameRegistry<S>,
    snapshots: &mut broadcast::Receiver<Game>,
    game_id: &str,
) -> Option<Game> {
    loop {
        match tokio::time::timeout(WATCH_INTERVAL, snapshots.recv()).await {
            Ok(Ok(game)) if game.id == game_id && game.status.is_terminal() => return Some(game),
            Ok(Ok(_)) => {}
            Ok(Err(broadcast::error::RecvError::Lagged(skipped))) => {
                debug!(skipped, "SNAPSHOT_LAGGED: スナップショットを読み飛ばしました");
            }
            Ok(Err(broadcast::error::RecvError::Closed)) => return None,
            Err(_) => {
                if !registry.is_active(game_id) {
                    return None;
                }
            }
        }
    }
}

/// 最終成績を表示
fn print_standings(game: &Game) {
    println!();
    println!("=== 試合結果 ===");
    println!("ゲームID: {}", game.id);
    println!("終了ターン: {}", game.info.game_turn);
    if game.status != GameStatus::Finished {
        println!("状態: {:?}", game.status);
    }
    for message in &game.messages {
        println!("{}", message.text);
    }
    println!();

    println!("=== ロボット成績 ===");
    let mut robots: Vec<_> = game.robots.iter().collect();
    robots.sort_by(|a, b| {
        b.is_alive()
            .cmp(&a.is_alive())
            .then(b.total_kills.cmp(&a.total_kills))
            .then(b.total_damage_dealt.total_cmp(&a.total_damage_dealt))
    });
    for robot in robots {
        let fate = if robot.is_alive() {
            "生存".to_string()
        } else {
            format!("撃破 (ターン {})", robot.time_of_death_game_turn)
        };
        println!(
            "  {}: {} / 被ダメージ {:.1} / 撃破数 {} / 命中 {}/{} / 与ダメージ {:.1} / 走行距離 {:.0}m",
            robot,
            fate,
            robot.damage,
            robot.total_kills,
            robot.total_missile_hit_count,
            robot.total_missile_fired_count,
            robot.total_damage_dealt,
            robot.total_travel_distance
        );
    }
}

/// デフォルトヘルプを表示
fn show_default_help() {
    println!("ロボット対戦シミュレーション (Robot Combat Simulation) - robosim v0.1.0");
    println!();
    println!("使用方法:");
    println!("  robosim [オプション]");
    println!();
    println!("オプション:");
    println!("  -s, --scenario <FILE>  シナリオファイルを指定して実行");
    println!("  -i, --info             シナリオ情報のみ表示");
    println!("  -v, --verbose          詳細出力 (複数指定で詳細レベル上昇)");
    println!("      --log-level <LV>   ログレベルを指定");
    println!("      --log-output <OUT> ログ出力先を指定 (console, file, both)");
    println!("      --no-pacing        待機なしで最速実行");
    println!("      --list-robots      組み込みロボットの一覧を表示");
    println!("  -h, --help             このヘルプを表示");
    println!();
    println!("利用可能なシナリオファイル:");
    println!("  scenarios/demo.yaml       - 組み込みロボット4体の乱戦");
    println!("  scenarios/duel.yaml       - 1対1の短期戦（待機なし）");
    println!("  scenarios/remote.yaml     - HTTPロボットとの対戦");
    println!();
    println!("例:");
    println!("  robosim -s scenarios/demo.yaml");
    println!("  robosim -s scenarios/duel.yaml -v");
    println!("  robosim -s scenarios/demo.yaml -i");
}
