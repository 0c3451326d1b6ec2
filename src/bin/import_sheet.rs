use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use sqlx::postgres::PgPoolOptions;
use tracing::{error, info};

use moto_inventory_service::db::VehicleRepository;
use moto_inventory_service::importers::SheetExtractor;
use moto_inventory_service::services::RecordSync;

#[derive(Parser)]
#[command(name = "import-sheet")]
#[command(about = "Import a supplier delivery sheet straight into the inventory", long_about = None)]
struct Cli {
    /// Database connection string
    #[arg(long, env)]
    database_url: String,

    /// Path to the .xlsx/.xls/.ods delivery sheet
    #[arg(long)]
    file: PathBuf,

    /// Print the extracted batch without storing it
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let extractor = SheetExtractor::standard()?;
    let file = cli.file.clone();
    let batch = tokio::task::spawn_blocking(move || extractor.extract_path(&file)).await??;

    info!(
        "Extracted {} vehicles from {} (invoice {:?}, model {:?}, brand {:?}, arrival {:?})",
        batch.len(),
        cli.file.display(),
        batch.invoice_ref,
        batch.model,
        batch.brand,
        batch.arrival_date
    );

    if cli.dry_run {
        println!("{}", serde_json::to_string_pretty(&batch)?);
        return Ok(());
    }

    let pool = PgPoolOptions::new()
        .max_connections(1)
        .connect(&cli.database_url)
        .await?;

    let sync = RecordSync::new(Arc::new(VehicleRepository::new(pool)));
    match sync.sync(&batch).await {
        Ok(report) => {
            info!("Stored {} vehicles", report.accepted_count);
            Ok(())
        }
        Err(e) => {
            error!("Import stopped: {}", e);
            Err(e.into())
        }
    }
}
