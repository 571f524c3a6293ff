//! src/main.rs
//! Replays recorded activities (JSON lines) through the stock handler set.
//!
//! Usage: `turnflow [activities.jsonl]`; reads stdin when no path is given.
//! Records go to stdout, logs to stderr and the configured log directory.

use std::panic::PanicHookInfo;
use std::path::PathBuf;

use anyhow::{Context, Result};
use tokio::io::{self, AsyncBufRead, BufReader};
use tracing::{error, info, warn};

use turnflow_core::{
    ActivityRouter, Config, HandlerRegistry, LoggerBuilder,
    controller::handlers::register_default_handlers, replay::replay_jsonl,
};

#[tokio::main(flavor = "multi_thread", worker_threads = 2)]
async fn main() -> Result<()> {
    setup_panic_handler();

    let config: Config = Config::load().await.unwrap_or_else(|e| {
        eprintln!("Failed to load config, using defaults: {e}");
        Config::default()
    });

    let _log_guard = LoggerBuilder::new()
        .with_config(config.logging.clone())
        .build()
        .await
        .context("Failed to initialize logging")?;

    info!("Starting turnflow replay");

    let router: ActivityRouter = build_router(&config);
    let input: Option<PathBuf> = std::env::args_os().nth(1).map(PathBuf::from);
    let reader: Box<dyn AsyncBufRead + Unpin + Send> = match &input {
        Some(path) => {
            let file = tokio::fs::File::open(path)
                .await
                .with_context(|| format!("Failed to open {}", path.display()))?;
            Box::new(BufReader::new(file))
        }

        None => Box::new(BufReader::new(io::stdin())),
    };

    let mut stdout = io::stdout();
    let summary = replay_jsonl(&router, reader, &mut stdout)
        .await
        .context("Replay aborted")?;

    let metrics = router.metrics().snapshot();
    info!(
        dispatched = summary.dispatched,
        malformed = summary.malformed,
        failed = summary.failed,
        short_circuited = metrics.short_circuited_turns,
        avg_latency_us = metrics.avg_latency_us(),
        "Replay complete"
    );

    if summary.malformed + summary.failed > 0 {
        warn!("Some lines were not dispatched");
    }

    Ok(())
}

fn build_router(config: &Config) -> ActivityRouter {
    let mut registry = HandlerRegistry::new();
    register_default_handlers(&mut registry);

    registry.freeze().with_config(config.dispatch.clone())
}

fn setup_panic_handler() {
    let original_hook = std::panic::take_hook();

    std::panic::set_hook(Box::new(move |panic_info: &PanicHookInfo<'_>| {
        error!("Application panicked: {}", panic_info);
        original_hook(panic_info);
    }));
}
