use clap::Parser;
use sqlx::postgres::PgPoolOptions;
use tracing::info;

use moto_inventory_service::auth::{hash_password, Role};
use moto_inventory_service::db::{UserAccount, UserRepository, UserStore};

#[derive(Parser)]
#[command(name = "create-user")]
#[command(about = "Create or replace an inventory user account", long_about = None)]
struct Cli {
    /// Database connection string
    #[arg(long, env)]
    database_url: String,

    #[arg(long)]
    login: String,

    /// Name shown in the session
    #[arg(long)]
    name: String,

    #[arg(long, env = "NEW_USER_PASSWORD")]
    password: String,

    /// Access right; "consul" gives read/export-only access
    #[arg(long, default_value = "admin")]
    droit: String,
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

    let pool = PgPoolOptions::new()
        .max_connections(1)
        .connect(&cli.database_url)
        .await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    let password_hash =
        hash_password(&cli.password).map_err(|e| format!("Failed to hash password: {e}"))?;

    let account = UserAccount {
        login: cli.login.trim().to_string(),
        display_name: cli.name,
        password_hash,
        droit: cli.droit,
    };
    UserRepository::new(pool).save(&account).await?;

    info!(
        "Saved user {} with {} access",
        account.login,
        Role::from_droit(&account.droit)
    );
    Ok(())
}
