//! Affiliate Bridge: replays recorded analytics dispatcher calls through the
//! Curebit integration and prints the resulting command queue.
//!
//! Input is JSON lines (`{"type":"identify","userId":...}`) from a file or
//! stdin; output is one `[name, payload]` tuple per line, in queue order.

mod replay;

use std::fs::File;
use std::io::{self, BufReader, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use affiliate_core::Settings;
use affiliate_web_sdk::adaptors::curebit::{NAMESPACE_GLOBAL, QUEUE_GLOBAL};
use affiliate_web_sdk::{CurebitIntegration, IdentifiedUser, Integration, MemoryEnvironment, TaskLoader};
use anyhow::Context;
use clap::Parser;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "affiliate-bridge")]
#[command(about = "Replay analytics dispatcher calls through the Curebit integration")]
#[command(version)]
struct Cli {
    /// Settings file (JSON or TOML); environment variables prefixed
    /// `CUREBIT__` take precedence
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Curebit site id (overrides settings)
    #[arg(long, env = "CUREBIT__SITE_ID")]
    site_id: Option<String>,

    /// Curebit server (overrides settings)
    #[arg(long, env = "CUREBIT__SERVER")]
    server: Option<String>,

    /// JSON-lines file of host calls; reads stdin when omitted
    #[arg(long)]
    input: Option<PathBuf>,

    /// Simulated script load latency in milliseconds
    #[arg(long, default_value_t = 0)]
    load_delay_ms: u64,

    /// Fail when the settings would be rejected by Curebit
    #[arg(long, default_value_t = false)]
    strict: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "affiliate_bridge=info,affiliate_web_sdk=info".into()),
        )
        .json()
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let mut settings = Settings::load_from(cli.settings.as_deref()).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Failed to load settings, using defaults");
        Settings::default()
    });
    if let Some(site_id) = cli.site_id {
        settings.site_id = site_id;
    }
    if let Some(server) = cli.server {
        settings.server = server;
    }
    if cli.strict {
        settings.validate()?;
    }

    info!(site_id = %settings.site_id, server = %settings.server, "Settings loaded");

    // The simulated provider script installs its namespace after the delay.
    let env = Arc::new(MemoryEnvironment::new());
    let script_env = env.clone();
    let delay = Duration::from_millis(cli.load_delay_ms);
    let loader = TaskLoader::new(move |src: String| {
        let env = script_env.clone();
        async move {
            tokio::time::sleep(delay).await;
            env.set_global(NAMESPACE_GLOBAL, serde_json::json!({ "src": src }));
        }
    });

    let user = Arc::new(IdentifiedUser::new());
    let curebit = CurebitIntegration::new(settings, env.clone())
        .with_loader(Arc::new(loader))
        .with_user(user.clone());

    let stats = match cli.input {
        Some(path) => {
            let file = File::open(&path).with_context(|| format!("cannot open {}", path.display()))?;
            replay::replay(BufReader::new(file), &curebit, &user)?
        }
        None => replay::replay(io::stdin().lock(), &curebit, &user)?,
    };

    // Give the detached load a chance to finish before reporting.
    tokio::time::sleep(delay + Duration::from_millis(10)).await;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    if let Some(queue) = env.queue(QUEUE_GLOBAL) {
        for command in queue.snapshot() {
            writeln!(out, "{}", serde_json::to_string(&command)?)?;
        }
    }

    info!(
        site_id = %curebit.settings().site_id,
        calls = stats.calls,
        skipped = stats.skipped,
        loaded = curebit.is_loaded(),
        "Replay finished"
    );

    Ok(())
}
