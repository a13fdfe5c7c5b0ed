use datacheck_telemetry::tracing::init_tracing;

mod config;
mod core;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    core::start_checker().await
}
