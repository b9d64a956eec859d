//! Recipebox API Server
//!
//! Serves the recipe API over HTTP, backed by a SQLite database.
//!
//! # Configuration
//!
//! Environment variables:
//! - `RECIPEBOX_PORT`: Port to listen on (default: 8000)
//! - `RECIPEBOX_DATABASE_PATH`: SQLite file (default: ~/.local/share/recipebox/recipebox.db)
//! - `RECIPEBOX_TOKEN_TTL_HOURS`: Token lifetime; tokens never expire when unset
//! - `RECIPEBOX_MIN_PASSWORD_LENGTH`: Minimum password length for sign-up (default: 5)
//! - `RUST_LOG`: Log filter (default: `recipebox=info,tower_http=info`)
//!
//! # Config File Format
//!
//! ```yaml
//! port: 8000
//! database_path: /var/lib/recipebox/recipebox.db
//! token_ttl_hours: 720
//! min_password_length: 5
//! argon2:
//!   memory_kib: 19456
//!   iterations: 2
//!   parallelism: 1
//! ```
//!
//! # Endpoints
//!
//! - `GET /health`: Health check endpoint (no auth required)
//! - `POST /user/create`, `POST /user/token`: sign-up and login (no auth required)
//! - `/user/me`, `/recipe/recipes`, `/recipe/tags`, `/recipe/ingredients`: auth required

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use recipebox::db::{init_db, wait_for_db};
use recipebox::server::{self, AppState};
use recipebox::Config;

/// Attempts made to reach the database before giving up
const DB_CONNECT_ATTEMPTS: u32 = 30;

#[derive(Parser)]
#[command(name = "recipebox-server")]
#[command(version)]
#[command(about = "Recipebox API server")]
struct Cli {
    /// Path to config file (default: ~/.config/recipebox/config.yaml)
    #[arg(long, short)]
    config: Option<PathBuf>,
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load(cli.config)?;
    tracing::info!("Database: {}", config.database_path.display());

    let pool = wait_for_db(DB_CONNECT_ATTEMPTS, Duration::from_secs(1), || {
        init_db(&config.database_path)
    })
    .await?;
    tracing::info!("Database available");

    let state = AppState::new(pool, &config)?;
    let app = server::router(state).layer(TraceLayer::new_for_http());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "recipebox=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = run(Cli::parse()).await {
        tracing::error!("Server failed: {}", e);
        std::process::exit(1);
    }
}
