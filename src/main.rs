//! Application entry point for the `fieldwise-advisor` service.
//!
//! This binary orchestrates the full startup sequence for the soil health
//! and fertilizer recommendation API, including:
//! - Loading configuration from environment variables or `.env`
//! - Initializing structured logging/tracing
//! - Building the ML backend client, when `ML_API_URL` is set
//! - Connecting to PostgreSQL and creating the schema, when `DATABASE_URL` is set
//! - Mounting all API routes via the `routes` gateway (EMBP pattern)
//! - Binding the Axum HTTP server and serving requests
//!
//! # Environment Variables
//! - `DATABASE_URL` (optional) – PostgreSQL connection string for history
//! - `ML_API_URL` (optional) – fertilizer prediction backend
//! - `ADVISOR_LOG_LEVEL` (optional) – log verbosity (default: `debug`)
//! - `ADVISOR_SPAN_EVENTS` (optional) – span event mode for tracing
//!
//! The scoring core (`normalize`, `scoring`, `fallback`, `recommend`) is
//! synchronous and free of I/O; only `ml_client` and the routes touch the
//! network or the database.
use std::{env, net::SocketAddr, time::Duration};

use axum::Router;
use dotenvy::dotenv;
use is_terminal::IsTerminal;
use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;

use anyhow::Result;

mod config;
mod error;
mod fallback;
mod ml_client;
mod models;
mod normalize;
mod recommend;
mod routes;
mod schema;
mod scoring;

pub use config::Config;
pub use error::AdvisorError;
pub use ml_client::MlClient;

// Re-exported for routes/*.rs so they only depend on their parent module
pub use models::{SensorReading, SoilHealthResult};

/// Shared state handed to every route.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub pool: Option<PgPool>,
    pub ml: Option<MlClient>,
}

// ---

#[tokio::main]
async fn main() -> Result<()> {
    // ---
    init_tracing();
    dotenv().ok();

    let cfg = config::load_from_env()?;
    cfg.log_config();

    let ml = match &cfg.ml_api_url {
        Some(url) => Some(MlClient::new(
            url,
            Duration::from_millis(u64::from(cfg.ml_timeout_ms)),
        )?),
        None => None,
    };

    let pool = match &cfg.db_url {
        Some(db_url) => Some(connect_db(db_url, cfg.db_pool_max).await?),
        None => {
            tracing::warn!("DATABASE_URL not set, recommendation history is disabled");
            None
        }
    };

    let addr = SocketAddr::from(([0, 0, 0, 0], cfg.bind_port));

    // Build app from routes gateway (EMBP)
    let state = AppState {
        config: cfg,
        pool,
        ml,
    };
    let app: Router = routes::router(state);

    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn connect_db(db_url: &str, max_connections: u32) -> Result<PgPool> {
    // ---
    tracing::info!("Attempting to connect to history database");

    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(db_url)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to connect to history database: {}", e))?;

    tracing::info!("Successfully connected to database");

    schema::create_schema(&pool).await?;
    Ok(pool)
}

// ---

/// Install the global `tracing` subscriber. Call once, before any logging.
///
/// `RUST_LOG` wins when set; otherwise `ADVISOR_LOG_LEVEL` picks the level
/// for this crate (default `debug`) while HTTP client and SQL chatter stay
/// quieter. `ADVISOR_SPAN_EVENTS` and `FORCE_COLOR` are read by the helpers
/// below.
fn init_tracing() {
    // ---
    tracing_subscriber::fmt()
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_span_events(span_events_from_env())
        .with_env_filter(env_filter_from_env())
        .with_ansi(color_from_env())
        .compact()
        .init();
}

/// `full` logs enter/exit/close, `enter_exit` skips close, anything else
/// logs close only.
fn span_events_from_env() -> FmtSpan {
    match env::var("ADVISOR_SPAN_EVENTS").as_deref() {
        Ok("full") => FmtSpan::FULL,
        Ok("enter_exit") => FmtSpan::ENTER | FmtSpan::EXIT,
        _ => FmtSpan::CLOSE,
    }
}

/// `FORCE_COLOR` overrides terminal detection on stdout.
fn color_from_env() -> bool {
    match env::var("FORCE_COLOR").as_deref() {
        Ok("1" | "true" | "yes") => true,
        Ok("0" | "false" | "no") => false,
        _ => std::io::stdout().is_terminal(),
    }
}

fn env_filter_from_env() -> EnvFilter {
    // ---
    if env::var("RUST_LOG").is_ok() {
        return EnvFilter::from_default_env();
    }

    let level = match env::var("ADVISOR_LOG_LEVEL").ok().as_deref() {
        Some(level @ ("trace" | "debug" | "info" | "warn" | "error")) => level.to_string(),
        _ => "debug".to_string(),
    };
    EnvFilter::new(format!("{level},sqlx::query=warn,hyper=info,reqwest=info"))
}
