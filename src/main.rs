#![cfg_attr(not(test), deny(clippy::panic))]

use clap::Parser;
use codeduel_server::config;
use codeduel_server::logging;
use codeduel_server::server::DuelServer;
use codeduel_server::websocket;
use std::net::SocketAddr;

/// CodeDuel -- real-time head-to-head coding duel server
#[derive(Parser, Debug)]
#[command(name = "codeduel-server")]
#[command(about = "Real-time session server for head-to-head competitive coding")]
#[command(version)]
struct Cli {
    /// Validate configuration and exit without starting the server.
    #[arg(long, short = 'c', conflicts_with = "print_config")]
    validate_config: bool,

    /// Print the loaded configuration to stdout (as JSON) and exit.
    #[arg(long, conflicts_with = "validate_config")]
    print_config: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let cfg = config::load();

    if cli.print_config {
        let json = serde_json::to_string_pretty(&cfg)
            .map_err(|e| anyhow::anyhow!("Failed to serialize config: {e}"))?;
        println!("{json}");
        return Ok(());
    }

    let validation_result = config::validate_config(&cfg);

    if cli.validate_config {
        match validation_result {
            Ok(()) => {
                println!("Configuration validation passed");
                println!();
                println!("Configuration summary:");
                println!("  Port: {}", cfg.port);
                println!(
                    "  Judge: {}",
                    cfg.judge.base_url.as_deref().unwrap_or("<not configured>")
                );
                println!("  Catalog questions: {}", cfg.catalog.questions.len());
                println!("  Relay cadence: {} ms", cfg.duel.relay_cadence_ms);
                println!("  Disconnect grace: {} s", cfg.server.disconnect_grace_secs);
                println!("  Join timeout: {} s", cfg.server.join_timeout_secs);
                return Ok(());
            }
            Err(e) => {
                eprintln!("Configuration validation failed:\n{e}");
                std::process::exit(1);
            }
        }
    }

    validation_result?;

    logging::init_with_config(&cfg.logging);

    let addr = SocketAddr::from(([0, 0, 0, 0], cfg.port));
    let cors_origins = cfg.security.cors_origins.clone();
    tracing::info!(%addr, "Starting CodeDuel server");

    let server = DuelServer::new(cfg)?;

    let maintenance = server.clone();
    tokio::spawn(async move {
        maintenance.maintenance_task().await;
    });

    let app = websocket::create_router(&cors_origins)
        .fallback(|| async {
            "CodeDuel Server. Use /v1/ws for the duel protocol, /metrics for metrics."
        })
        .with_state(server.clone());

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, %cors_origins, "Server started over HTTP - duel protocol: /v1/ws");

    let shutdown_server = server.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::error!(%err, "Failed to listen for shutdown signal");
            }
            tracing::info!("Shutdown signal received, draining");
            shutdown_server.drain().await;
        })
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}
