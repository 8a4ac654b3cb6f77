//! Configuration loader for the `fieldwise-advisor` service.
//!
//! This module centralizes all runtime configuration values and their defaults,
//! loading from environment variables (with optional `.env` file support
//! provided by the caller). Business constants used by the recommendation
//! composer live here too, so that pricing and dosage can be tuned per
//! deployment without touching the scoring code.
//!
use std::env;

use anyhow::{anyhow, Result};

/// Confidence reported by the rule-based selector.
pub const DEFAULT_FALLBACK_CONFIDENCE: f64 = 92.0;

/// Parse an optional integer environment variable with a default value.
macro_rules! parse_env_u32 {
    ($var_name:expr, $default:expr) => {
        env::var($var_name)
            .ok()
            .map(|v| v.parse::<u32>())
            .transpose()
            .map_err(|e| anyhow!("Invalid {}: {}", $var_name, e))?
            .unwrap_or($default)
    };
}

/// Parse an optional non-negative float environment variable with a default value.
macro_rules! parse_env_f64 {
    ($var_name:expr, $default:expr) => {{
        let value = env::var($var_name)
            .ok()
            .map(|v| v.parse::<f64>())
            .transpose()
            .map_err(|e| anyhow!("Invalid {}: {}", $var_name, e))?
            .unwrap_or($default);
        if !value.is_finite() || value < 0.0 {
            return Err(anyhow!("Invalid {}: must be a non-negative number", $var_name));
        }
        value
    }};
}

/// Parse an optional string environment variable; empty values count as unset.
macro_rules! optional_env {
    ($var_name:expr) => {
        env::var($var_name).ok().filter(|v| !v.trim().is_empty())
    };
}

/// Per-hectare dosage and pricing plus the fallback confidence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdvisorConstants {
    // ---
    pub fallback_confidence: f64,
    pub primary_kg_per_ha: f64,
    pub secondary_kg_per_ha: f64,
    pub primary_cost_per_ha: f64,
    pub secondary_cost_per_ha: f64,
    pub organic_cost_per_ha: f64,
}

impl Default for AdvisorConstants {
    fn default() -> Self {
        Self {
            fallback_confidence: DEFAULT_FALLBACK_CONFIDENCE,
            primary_kg_per_ha: 100.0,
            secondary_kg_per_ha: 50.0,
            primary_cost_per_ha: 4000.0,
            secondary_cost_per_ha: 2500.0,
            organic_cost_per_ha: 2000.0,
        }
    }
}

/// Strongly typed application configuration.
///
/// All fields are immutable after loading, ensuring a consistent configuration
/// snapshot for the lifetime of the application.
#[derive(Debug, Clone)]
pub struct Config {
    // ---
    /// PostgreSQL connection string; history is disabled without it.
    pub db_url: Option<String>,

    /// Maximum number of database connections in the pool.
    pub db_pool_max: u32,

    /// ML prediction backend base URL; every request falls back without it.
    pub ml_api_url: Option<String>,

    /// Per-attempt timeout for the ML backend, in milliseconds.
    pub ml_timeout_ms: u32,

    /// HTTP listen port.
    pub bind_port: u16,

    pub constants: AdvisorConstants,
}

/// Load configuration from environment variables with defaults.
///
/// Optional:
/// - `DATABASE_URL` – PostgreSQL connection string (enables history)
/// - `DB_POOL_MAX` – max DB connections (default: 5)
/// - `ML_API_URL` – fertilizer prediction backend base URL
/// - `ML_TIMEOUT_MS` – per-attempt timeout (default: 5000)
/// - `BIND_PORT` – listen port (default: 8080)
/// - `FALLBACK_CONFIDENCE`, `PRIMARY_KG_PER_HA`, `SECONDARY_KG_PER_HA`,
///   `PRIMARY_COST_PER_HA`, `SECONDARY_COST_PER_HA`, `ORGANIC_COST_PER_HA`
///
/// Returns an error if any variable is present but invalid.
pub fn load_from_env() -> Result<Config> {
    // ---
    let db_url = optional_env!("DATABASE_URL");
    let ml_api_url = optional_env!("ML_API_URL").map(|u| u.trim_end_matches('/').to_string());
    let db_pool_max = parse_env_u32!("DB_POOL_MAX", 5);
    let ml_timeout_ms = parse_env_u32!("ML_TIMEOUT_MS", 5000);
    let bind_port = u16::try_from(parse_env_u32!("BIND_PORT", 8080))
        .map_err(|e| anyhow!("Invalid BIND_PORT: {}", e))?;

    let defaults = AdvisorConstants::default();
    let constants = AdvisorConstants {
        fallback_confidence: parse_env_f64!("FALLBACK_CONFIDENCE", defaults.fallback_confidence),
        primary_kg_per_ha: parse_env_f64!("PRIMARY_KG_PER_HA", defaults.primary_kg_per_ha),
        secondary_kg_per_ha: parse_env_f64!("SECONDARY_KG_PER_HA", defaults.secondary_kg_per_ha),
        primary_cost_per_ha: parse_env_f64!("PRIMARY_COST_PER_HA", defaults.primary_cost_per_ha),
        secondary_cost_per_ha: parse_env_f64!(
            "SECONDARY_COST_PER_HA",
            defaults.secondary_cost_per_ha
        ),
        organic_cost_per_ha: parse_env_f64!("ORGANIC_COST_PER_HA", defaults.organic_cost_per_ha),
    };

    Ok(Config {
        db_url,
        db_pool_max,
        ml_api_url,
        ml_timeout_ms,
        bind_port,
        constants,
    })
}

/// Replace the password portion of a connection URL with `****`.
fn mask_db_url(db_url: &str) -> String {
    // ---
    if let Some(at_pos) = db_url.rfind('@') {
        if let Some(colon_pos) = db_url[..at_pos].rfind(':') {
            // scheme separator is not a password
            if !db_url[colon_pos..].starts_with("://") {
                return format!("{}:****{}", &db_url[..colon_pos], &db_url[at_pos..]);
            }
        }
    }
    db_url.to_string()
}

impl Config {
    /// Log the loaded configuration for debugging purposes.
    ///
    /// Masks the database password while showing all configuration values
    /// that were loaded.
    pub fn log_config(&self) {
        // ---
        let masked_db_url = self
            .db_url
            .as_deref()
            .map_or_else(|| "(unset, history disabled)".to_string(), mask_db_url);
        let ml_api_url = self
            .ml_api_url
            .as_deref()
            .unwrap_or("(unset, fallback only)");
        let c = &self.constants;

        tracing::info!("Configuration loaded:");
        tracing::info!("  DATABASE_URL          : {}", masked_db_url);
        tracing::info!("  DB_POOL_MAX           : {}", self.db_pool_max);
        tracing::info!("  ML_API_URL            : {}", ml_api_url);
        tracing::info!("  ML_TIMEOUT_MS         : {}", self.ml_timeout_ms);
        tracing::info!("  BIND_PORT             : {}", self.bind_port);
        tracing::info!("  FALLBACK_CONFIDENCE   : {}", c.fallback_confidence);
        tracing::info!("  PRIMARY_KG_PER_HA     : {}", c.primary_kg_per_ha);
        tracing::info!("  SECONDARY_KG_PER_HA   : {}", c.secondary_kg_per_ha);
        tracing::info!("  PRIMARY_COST_PER_HA   : {}", c.primary_cost_per_ha);
        tracing::info!("  SECONDARY_COST_PER_HA : {}", c.secondary_cost_per_ha);
        tracing::info!("  ORGANIC_COST_PER_HA   : {}", c.organic_cost_per_ha);
    }
}
