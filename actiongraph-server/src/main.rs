use actiongraph_core::ActionGraphConfig;
use actiongraph_server::{http, Lifecycle};
use clap::Parser;
use tokio::sync::broadcast;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Optional TOML file layered between defaults and the environment
    #[arg(short, long, default_value = "actiongraph.toml")]
    config: String,

    /// Initialize the graph backend, report, and exit
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Optional .env for local runs
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let config = match ActionGraphConfig::load(&args.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config from {}: {}", args.config, e);
            std::process::exit(1);
        }
    };

    // Init logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.service.log_level));
    fmt().with_env_filter(filter).init();

    // Backend must be ready before any traffic is served
    let lifecycle = match Lifecycle::start_neo4j(&config).await {
        Ok(l) => l,
        Err(e) => {
            eprintln!("Failed to initialize graph backend: {}", e);
            std::process::exit(1);
        }
    };

    if args.check {
        println!("✅ Graph backend ready at {}", config.graph.uri);
        lifecycle.shutdown().await;
        return Ok(());
    }

    let (tx, rx) = broadcast::channel(1);
    tokio::spawn(async move {
        wait_for_signal().await;
        tracing::info!("Shutdown signal received");
        let _ = tx.send(());
    });

    let served = http::start_http_server(&config.http, lifecycle.tracker(), rx).await;

    lifecycle.shutdown().await;
    served?;

    Ok(())
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = match signal(SignalKind::terminate()) {
        Ok(s) => s,
        Err(e) => {
            tracing::warn!(error = %e, "SIGTERM handler unavailable, listening for Ctrl+C only");
            let _ = tokio::signal::ctrl_c().await;
            return;
        }
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = terminate.recv() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl+C");
    }
}
