mod api;
mod cli;
mod router;
mod startup;
mod state;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};

use crate::cli::{Cli, Command, ServeArgs};

async fn serve(config: &doordont_core::Config, args: ServeArgs) -> anyhow::Result<()> {
    config.log_summary();
    let state = startup::build_state(config).await?;

    if args.no_restore {
        info!("Skipping evaluation job restore (--no-restore)");
    } else {
        state
            .scheduler
            .restore()
            .await
            .context("failed to schedule persisted goals")?;
    }

    let app = router::build_router(state.clone(), &config.server.cors_origin);

    let host = args.host.as_deref().unwrap_or(&config.server.host);
    let port = args.port.unwrap_or(config.server.port);
    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    state.scheduler.shutdown().await;
    Ok(())
}

async fn evaluate(config: &doordont_core::Config, goal_id: i64) -> anyhow::Result<()> {
    let state = startup::build_state(config).await?;
    let outcome = state.scheduler.run_now(goal_id).await;
    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_level(true)
        .init();

    let cli = Cli::parse();
    let config = startup::load_config(cli.profile.as_deref());

    match cli.command {
        None => serve(&config, ServeArgs::default()).await?,
        Some(Command::Serve(args)) => serve(&config, args).await?,
        Some(Command::Evaluate { goal_id }) => evaluate(&config, goal_id).await?,
        Some(Command::Config) => {
            println!("{}", serde_json::to_string_pretty(&config.redacted_summary())?);
        }
    }

    Ok(())
}
