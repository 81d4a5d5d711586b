//! CRT 신호 파이프라인 CLI.

use clap::{Parser, Subcommand};
use crt_cli::{replay, FeedFormat, ReplayOptions};
use crt_core::{init_logging, AppConfig, LogConfig, LogFormat, Timeframe};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "crt")]
#[command(about = "CRT signal pipeline replay tool", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// 설정 파일 경로 (없으면 기본값 사용)
    #[arg(long, default_value = "config/default.toml")]
    config: PathBuf,

    /// 로그 레벨 (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// 로그 형식 (pretty, json, compact)
    #[arg(long)]
    log_format: Option<LogFormat>,
}

#[derive(Subcommand)]
enum Commands {
    /// 기록된 시세 파일을 재생해 신호를 출력
    Replay {
        /// 입력 파일 (.csv 또는 .jsonl)
        #[arg(long)]
        input: PathBuf,

        /// 입력 형식 (생략 시 확장자로 추정)
        #[arg(long, value_enum)]
        format: Option<FeedFormat>,

        /// CSV 입력의 심볼
        #[arg(long, default_value = "R_75")]
        symbol: String,

        /// 추적할 타임프레임 (쉼표로 구분, 예: "1m,1h")
        #[arg(long, value_delimiter = ',')]
        timeframes: Vec<Timeframe>,

        /// 레코드 사이 대기 시간 (밀리초)
        #[arg(long)]
        interval_ms: Option<u64>,

        /// 파이프라인 이벤트를 JSON 줄로 출력
        #[arg(long)]
        json: bool,
    },

    /// 지원하는 타임프레임 목록 출력
    Timeframes,

    /// 적용될 설정을 TOML로 출력
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let mut config = if cli.config.exists() {
        AppConfig::load(&cli.config)?
    } else {
        AppConfig::default()
    };

    let mut log_config = LogConfig::from(&config.logging);
    if let Some(level) = &cli.log_level {
        log_config = log_config.with_explicit_level(level.clone());
    }
    if let Some(format) = cli.log_format {
        log_config.format = format;
    }
    init_logging(log_config).map_err(|e| anyhow::anyhow!("로깅 초기화 실패: {}", e))?;

    match cli.command {
        Commands::Replay {
            input,
            format,
            symbol,
            timeframes,
            interval_ms,
            json,
        } => {
            // 명령줄 타임프레임이 있거나 설정에 심볼이 없으면 재생 심볼을 등록
            if !timeframes.is_empty() || !config.symbols.contains_key(&symbol) {
                let timeframes = if timeframes.is_empty() {
                    vec![Timeframe::M1]
                } else {
                    timeframes
                };
                config.symbols.insert(symbol.clone(), timeframes);
            }

            tracing::info!(
                config = %cli.config.display(),
                symbols = config.symbols.len(),
                rule = ?config.pipeline.rule,
                "CRT replay 시작"
            );

            let options = ReplayOptions {
                input,
                format,
                symbol,
                interval: interval_ms.map(Duration::from_millis),
                json,
            };
            let stats = replay::run(config, options).await?;
            stats.log_summary("replay");
        }
        Commands::Timeframes => {
            for timeframe in Timeframe::all() {
                println!("{:>4}  {:>8}s", timeframe.label(), timeframe.as_secs());
            }
        }
        Commands::Config => {
            print!("{}", config.to_toml_string()?);
        }
    }

    Ok(())
}
