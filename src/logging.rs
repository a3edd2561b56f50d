//! # Logging モジュール
//!
//! 対戦シミュレーションのログ出力を初期化します。
//!
//! ターンループは各ターンのゲームメッセージを `info!` で出力するため、
//! ファイル出力を有効にすると試合の全経過が1行1イベントのJSONで残ります。
//! ファイルは tracing-appender の非同期ライタで日ごとに切り替わります。
//!
//! ## 出力先
//!
//! | 指定 | コンソール | ファイル (`<dir>/<prefix>.YYYY-MM-DD`) |
//! |---|---|---|
//! | `console` | compact | - |
//! | `file` | - | JSON |
//! | `both` | compact | JSON |
//!
//! 環境変数 `RUST_LOG` が設定されていれば、設定ファイルのレベルより優先されます。

use crate::scenario::LoggingConfig;
use std::fmt;
use std::str::FromStr;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{EnvFilter, Registry, layer::SubscriberExt, util::SubscriberInitExt};

/// ログの出力先
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogOutput {
    Console,
    File,
    Both,
}

impl LogOutput {
    fn to_console(self) -> bool {
        self != LogOutput::File
    }

    fn to_file(self) -> bool {
        self != LogOutput::Console
    }
}

impl FromStr for LogOutput {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "console" | "stdout" => Ok(Self::Console),
            "file" => Ok(Self::File),
            "both" | "all" => Ok(Self::Both),
            other => Err(format!("unknown log output '{other}' (console, file, both)")),
        }
    }
}

impl fmt::Display for LogOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Console => "console",
            Self::File => "file",
            Self::Both => "both",
        };
        f.write_str(name)
    }
}

/// ログ設定
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub level: Level,
    pub output: LogOutput,
    /// ファイル出力先ディレクトリ
    pub log_dir: String,
    pub file_prefix: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self::from(&LoggingConfig::default())
    }
}

impl From<&LoggingConfig> for LogConfig {
    /// シナリオの `logging` セクションから作成（不正な値は既定値に戻す）
    fn from(section: &LoggingConfig) -> Self {
        Self {
            level: parse_log_level(&section.level),
            output: section.output.parse().unwrap_or_else(|e| {
                eprintln!("警告: {e}. consoleを使用します");
                LogOutput::Console
            }),
            log_dir: section.dir.clone(),
            file_prefix: section.file_prefix.clone(),
        }
    }
}

impl LogConfig {
    /// `-v` の指定回数でレベルを引き上げる（1回でDEBUG、2回以上でTRACE）
    pub fn with_verbosity(self, verbose: u8) -> Self {
        let level = match verbose {
            0 => self.level,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        };
        Self { level, ..self }
    }
}

/// ログ出力を初期化します
///
/// # 引数
///
/// * `config` - ログ設定
///
/// # 戻り値
///
/// ファイル出力時は非同期ライタのガード。破棄した時点で残りが書き出されるため、
/// プログラム終了まで保持してください。グローバルなsubscriberが既に
/// 設定されている場合はエラー。
///
/// # 例
///
/// ```rust,no_run
/// use robosim::logging::{LogConfig, LogOutput, init_logging};
///
/// let config = LogConfig {
///     output: LogOutput::Both,
///     ..Default::default()
/// }
/// .with_verbosity(1);
/// let _guard = init_logging(config).expect("ログ初期化に失敗");
/// ```
pub fn init_logging(config: LogConfig) -> Result<Option<WorkerGuard>, Box<dyn std::error::Error>> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::new(config.level.to_string()),
    };

    let console = config.output.to_console().then(|| {
        tracing_subscriber::fmt::layer()
            .compact()
            .with_target(true)
            .with_thread_ids(false)
    });

    let mut guard = None;
    let file = if config.output.to_file() {
        std::fs::create_dir_all(&config.log_dir)?;
        let (writer, file_guard) =
            non_blocking(rolling::daily(&config.log_dir, &config.file_prefix));
        guard = Some(file_guard);
        Some(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(writer)
                .with_target(true)
                .with_current_span(false),
        )
    } else {
        None
    };

    Registry::default()
        .with(filter)
        .with(console)
        .with(file)
        .try_init()?;

    Ok(guard)
}

/// ログレベル名を解析します（大文字小文字は区別しない）
///
/// 解析できない場合は警告を出してINFOを返します。
pub fn parse_log_level(level_str: &str) -> Level {
    level_str.trim().parse().unwrap_or_else(|_| {
        eprintln!("警告: 無効なログレベル '{level_str}'. INFOを使用します");
        Level::INFO
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_output_parse_and_display() {
        assert_eq!(LogOutput::from_str("console"), Ok(LogOutput::Console));
        assert_eq!(LogOutput::from_str(" FILE "), Ok(LogOutput::File));
        assert_eq!(LogOutput::from_str("all"), Ok(LogOutput::Both));
        assert!(LogOutput::from_str("syslog").is_err());
        assert_eq!(LogOutput::Both.to_string(), "both");
        assert!(LogOutput::Both.to_console() && LogOutput::Both.to_file());
        assert!(!LogOutput::File.to_console());
    }

    #[test]
    fn test_parse_log_level() {
        assert_eq!(parse_log_level("debug"), Level::DEBUG);
        assert_eq!(parse_log_level("WARN"), Level::WARN);
        assert_eq!(parse_log_level("loud"), Level::INFO);
    }

    #[test]
    fn test_config_from_scenario_section() {
        let section = LoggingConfig {
            level: "error".to_string(),
            output: "both".to_string(),
            dir: "out".to_string(),
            file_prefix: "duel".to_string(),
        };
        let config = LogConfig::from(&section);
        assert_eq!(config.level, Level::ERROR);
        assert_eq!(config.output, LogOutput::Both);
        assert_eq!(config.log_dir, "out");

        let fallback = LogConfig::from(&LoggingConfig {
            output: "syslog".to_string(),
            ..LoggingConfig::default()
        });
        assert_eq!(fallback.output, LogOutput::Console);
        assert_eq!(fallback.file_prefix, "robosim");
    }

    #[test]
    fn test_verbosity_raises_level() {
        let config = LogConfig::default();
        assert_eq!(config.level, Level::INFO);
        assert_eq!(config.clone().with_verbosity(0).level, Level::INFO);
        assert_eq!(config.clone().with_verbosity(1).level, Level::DEBUG);
        assert_eq!(config.with_verbosity(4).level, Level::TRACE);
    }
}
