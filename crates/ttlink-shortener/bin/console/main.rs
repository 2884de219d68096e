mod cli;
mod console;

use crate::cli::{LogFormat, CLI};
use crate::console::{Console, Flow};
use clap::Parser;
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use tracing_subscriber::EnvFilter;
use ttlink_generator::RandomKeyGenerator;
use ttlink_shortener::{ExpirySweeper, LinkService, SessionIdentity};
use ttlink_storage::InMemoryLinkStore;

const DEFAULT_LOG_FILTER: &str = "ttlink=info";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = CLI::parse();
    init_tracing(config.log_format);

    let settings = config.settings();
    info!(
        ttl_seconds = settings.ttl_seconds,
        default_max_clicks = settings.default_max_clicks,
        key_lengths = %format!("{}..={}", settings.initial_key_length, settings.max_key_length),
        cleanup_interval_seconds = settings.cleanup_interval_seconds,
        "starting ttlink console"
    );

    let store = Arc::new(InMemoryLinkStore::new());
    let service = LinkService::new(store.clone(), RandomKeyGenerator::new(), settings)?;
    let sweeper = ExpirySweeper::new(store, service.settings().cleanup_interval()).spawn();

    let console = Console::new(service, Arc::new(SessionIdentity::new()));
    let result = run_console(&console).await;

    sweeper.shutdown().await;
    result
}

fn init_tracing(format: LogFormat) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

async fn run_console<R, G>(console: &Console<R, G>) -> anyhow::Result<()>
where
    R: ttlink_core::LinkRepository,
    G: ttlink_generator::KeyGenerator,
{
    let mut stdout = std::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    console.banner(&mut stdout)?;

    loop {
        write!(stdout, "> ")?;
        stdout.flush()?;

        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => {
                writeln!(stdout)?;
                None
            }
        };

        let Some(line) = line else {
            info!("input closed, shutting down");
            break;
        };

        if console.handle_line(&line, &mut stdout).await? == Flow::Exit {
            break;
        }
    }

    Ok(())
}
