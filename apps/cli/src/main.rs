mod config;
mod main_lib;
mod store;

use config::Config;
use main_lib::{init_tracing, run};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    init_tracing();
    tracing::info!(
        "Processing {} with address book {}",
        config.transactions_path.display(),
        config.address_book_path.display()
    );
    let summary = run(&config).await?;
    tracing::info!(
        "Done: {} transactions, {} events, {} capital gains written to {}",
        summary.transactions,
        summary.events,
        summary.gains,
        config.output_dir.display()
    );
    Ok(())
}
