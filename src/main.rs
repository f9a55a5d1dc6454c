//! Weather bot entry point.
//!
//! Startup sequence:
//!   1. Load .env (if present)
//!   2. Parse CLI flags
//!   3. Load config
//!   4. Init logger at the effective level (CLI `-v` flags > env > config)
//!   5. Build the bot runtime (services, storage, bot)
//!   6. Spawn Ctrl-C → shutdown signal watcher
//!   7. Run comms channels until they exit or shutdown fires

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;

use weather_bot::bot_runtime::BotRuntime;
use weather_bot::config::{self, Config};
use weather_bot::error::AppError;
use weather_bot::logger;
use weather_bot::subsystems::comms;

struct CliArgs {
    log_level: Option<&'static str>,
    config_path: Option<String>,
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), AppError> {
    // Optional file.
    let _ = dotenvy::dotenv();

    let args = parse_cli_args();
    let config = config::load(args.config_path.as_deref())?;

    let effective_log_level = args.log_level.unwrap_or(config.log_level.as_str());
    logger::init(effective_log_level, args.log_level.is_some(), config.log_file.as_deref())?;

    info!(
        bot_name = %config.bot_name,
        bot = config.bot.as_str(),
        work_dir = %config.work_dir.display(),
        effective_log_level = %effective_log_level,
        "config loaded"
    );

    let runtime = Arc::new(BotRuntime::from_config(&config)?);
    print_startup_summary(&config);

    let shutdown = CancellationToken::new();
    let ctrlc_token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("ctrl-c received, shutting down");
            ctrlc_token.cancel();
        }
    });

    let handle = comms::start(&config, runtime, shutdown.clone());
    handle.join().await?;

    // Channels may have ended on EOF rather than Ctrl-C.
    shutdown.cancel();
    info!("bye");
    Ok(())
}

fn print_startup_summary(config: &Config) {
    let pty = if config.comms_pty_should_load() { "enabled" } else { "disabled" };
    let http = if config.comms_http_should_load() {
        config.comms.http.bind.clone()
    } else {
        "disabled".to_string()
    };
    eprintln!("bot:      {} ({})", config.bot_name, config.bot.as_str());
    eprintln!("storage:  {:?}", config.storage);
    eprintln!("services: luis={} maps={} weather={}", config.luis.provider, config.maps.provider, config.weather.provider);
    eprintln!("comms:    pty={pty} http={http}");
}

fn parse_cli_args() -> CliArgs {
    let mut verbosity = 0u8;
    let mut config_path = None;

    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-h" | "--help" => {
                println!("Usage: weather-bot [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -h, --help                 Print help");
                println!("  -f, --config <PATH>        Path to configuration file (default: config/default.toml)");
                println!("  -v, -vv, -vvv, -vvvv       Set logging verbosity (warn, info, debug, trace)");
                std::process::exit(0);
            }
            "-f" | "--config" => match iter.next() {
                Some(path) => config_path = Some(path),
                None => {
                    eprintln!("error: -f/--config requires a path argument");
                    std::process::exit(1);
                }
            },
            "--verbose" => verbosity = verbosity.saturating_add(1),
            a if a.len() > 1 && a.starts_with('-') && a.chars().skip(1).all(|c| c == 'v') => {
                verbosity = verbosity.saturating_add((a.len() - 1) as u8);
            }
            _ => {}
        }
    }

    let log_level = match verbosity {
        0 => None,
        1 => Some("warn"),
        2 => Some("info"),
        3 => Some("debug"),
        _ => Some("trace"),
    };

    CliArgs { log_level, config_path }
}
