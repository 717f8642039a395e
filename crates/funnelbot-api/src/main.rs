//! funnelbot CLI and HTTP entry point.
//!
//! Binary name: `funnelbot`
//!
//! Parses CLI arguments, sets up tracing, then runs the HTTP server, the
//! console simulator or a config subcommand.

mod cli;
mod http;
mod state;

use std::sync::Arc;

use clap::Parser;
use console::style;
use tokio_util::sync::CancellationToken;

use cli::{Cli, Commands};
use funnelbot_infra::config::resolve_data_dir;
use funnelbot_observe::tracing_setup::{default_filter, init_tracing, shutdown_tracing};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.otel, default_filter(cli.verbose, cli.quiet))
        .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))?;

    let data_dir = resolve_data_dir(cli.data_dir.clone());

    let result = match cli.command {
        Commands::Serve { bind } => serve(data_dir, bind, cli.quiet).await,
        Commands::Simulate { user, seed, no_delay } => {
            cli::simulate::run(&data_dir, user, seed, no_delay, cli.json).await
        }
        Commands::Config { action } => cli::config::run(&data_dir, action, cli.json).await,
    };

    shutdown_tracing();
    result
}

async fn serve(data_dir: std::path::PathBuf, bind: Option<String>, quiet: bool) -> anyhow::Result<()> {
    let (state, events) = AppState::init(data_dir).await?;
    let addr = bind.unwrap_or_else(|| state.service.dispatcher().config().transport.bind.clone());
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    let shutdown = CancellationToken::new();
    let runner = tokio::spawn(Arc::clone(&state.service).run(events, shutdown.clone()));

    if !quiet {
        println!(
            "  {} funnelbot listening on {}",
            style("⚡").bold(),
            style(format!("http://{addr}")).cyan()
        );
        println!("  {}", style(format!("data dir: {}", state.data_dir.display())).dim());
        println!("  {}", style("Press Ctrl+C to stop").dim());
    }

    let router = http::router::build_router(state);
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    shutdown.cancel();
    if let Err(e) = runner.await {
        tracing::warn!(error = %e, "funnel run loop ended abnormally");
    }

    if !quiet {
        println!("\n  Server stopped.");
    }
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received");
}
