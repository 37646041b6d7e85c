//! # Saorsa Tiles CLI
//!
//! Headless host for the tiled canvas engine.

use canvas_cli::CliArgs;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "canvas_cli=info,canvas_renderer=info,canvas_core=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = CliArgs::parse();
    tracing::info!(
        "Starting Saorsa Tiles CLI ({}x{} viewport)",
        args.width,
        args.height
    );

    canvas_cli::run(&args)
}
