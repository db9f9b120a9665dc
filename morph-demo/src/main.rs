//! # Saorsa Morph Demo
//!
//! Runs a list-to-detail shared element transition and prints a JSON report.

use clap::Parser;
use morph_demo::{run_demo, CliArgs, DemoConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize tracing with optional JSON format.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,morph_core=debug,morph_bridge=debug"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .with_writer(std::io::stderr);

    // Use JSON format in production (RUST_LOG_FORMAT=json)
    if std::env::var("RUST_LOG_FORMAT").as_deref() == Ok("json") {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer.json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    tracing::info!("Starting Saorsa Morph demo v{}", morph_core::VERSION);

    let args = CliArgs::parse();
    let config = DemoConfig::try_from(args)?;

    tracing::info!(
        "Transition config: {}ms {} ({}), backend {}",
        config.transition.duration_ms,
        config.transition.easing,
        config.transition.mode,
        config.backend
    );

    let report = run_demo(&config).await?;
    println!("{}", serde_json::to_string_pretty(&report)?);

    tracing::info!("Saorsa Morph demo exited");
    Ok(())
}
