//! Zentinel Stubby - CLI Entry Point

use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;
use zentinel_stubby::{IncomingRequest, StubResponder, StubStore, StubWatcher};

#[derive(Parser, Debug)]
#[command(
    name = "zentinel-stubby",
    about = "Stubby-style stub configuration loader and responder",
    version
)]
struct Args {
    /// Path to stub configuration file
    #[arg(short, long, default_value = "stubs.yaml")]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'L', long, default_value = "info")]
    log_level: Level,

    /// Validate configuration and exit
    #[arg(long)]
    validate: bool,

    /// Print the loaded configuration as JSON and exit
    #[arg(long)]
    print: bool,

    /// Answer one request, e.g. "GET /invoice?status=active", and exit
    #[arg(long, value_name = "REQUEST")]
    request: Option<String>,

    /// Reload the configuration whenever the file changes
    #[arg(long)]
    watch: bool,

    /// Poll interval for --watch in milliseconds, used where file events
    /// are polled
    #[arg(long, default_value_t = 2000)]
    poll_interval_ms: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(args.log_level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    // Load configuration
    let store = StubStore::from_file(&args.config)
        .with_context(|| format!("Failed to load {}", args.config.display()))?;
    let snapshot = store.load();

    if args.validate {
        let config = &snapshot.config;
        println!(
            "{} lifecycles loaded, {} diagnostics",
            config.len(),
            config.diagnostics.len()
        );
        for diagnostic in &config.diagnostics {
            println!("  line {}: {}", diagnostic.line, diagnostic.message);
        }
        if config.is_empty() {
            anyhow::bail!("No stub lifecycles in {}", args.config.display());
        }
        return Ok(());
    }

    if args.print {
        println!("{}", serde_json::to_string_pretty(&snapshot.config)?);
        return Ok(());
    }
    drop(snapshot);

    let responder = StubResponder::new(Arc::new(store));

    if let Some(request) = &args.request {
        let (method, target) = request
            .trim()
            .split_once(char::is_whitespace)
            .context("Request must look like \"<METHOD> <target>\"")?;
        let reply = responder.respond(&IncomingRequest::new(method, target.trim()));

        println!("{}", reply.status);
        for (name, value) in &reply.headers {
            println!("{name}: {value}");
        }
        println!();
        println!("{}", String::from_utf8_lossy(&reply.body));
        return Ok(());
    }

    if args.watch {
        watch(&responder, &args.config, args.poll_interval_ms).await?;
    } else {
        info!(
            lifecycles = responder.store().load().config.len(),
            "Configuration loaded, use --watch to keep it live"
        );
    }

    Ok(())
}

/// Reload the configuration on every file change until Ctrl-C.
async fn watch(responder: &StubResponder, path: &Path, poll_interval_ms: u64) -> Result<()> {
    let poll_interval = Duration::from_millis(poll_interval_ms.max(1));
    let (watcher, mut changes) = StubWatcher::new(path, poll_interval);
    let _watcher = watcher.run()?;

    loop {
        tokio::select! {
            Some(()) = changes.recv() => {
                // One save often fires several events
                while changes.try_recv().is_ok() {}

                match responder.store().reload() {
                    Ok(lifecycles) => info!(lifecycles, "Stub configuration reloaded"),
                    Err(e) => warn!(error = %e, "Reload failed, keeping previous configuration"),
                }
            }
            result = tokio::signal::ctrl_c() => {
                result?;
                info!(
                    requests = responder.total_requests(),
                    matched = responder.total_matched(),
                    unmatched = responder.total_unmatched(),
                    "Shutting down"
                );
                return Ok(());
            }
        }
    }
}
