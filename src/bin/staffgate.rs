use anyhow::Result;
use staffgate::cli;

// Main function
#[tokio::main]
async fn main() -> Result<()> {
    let action = cli::start()?;

    let result = action.execute().await;

    // Flush pending spans before exit
    cli::telemetry::shutdown_tracer();

    result
}
