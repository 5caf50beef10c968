use std::env;
use std::str::FromStr;

use crate::engine::EngineConfig;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub store_backend: StoreBackend,
    pub database_url: Option<String>,
    pub port: u16,
    pub settings_cache_ttl_secs: u64,
    pub engine: EngineConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, String> {
        let store_backend = match env::var("STORE_BACKEND")
            .unwrap_or_else(|_| "postgres".to_string())
            .as_str()
        {
            "postgres" => StoreBackend::Postgres,
            "memory" => StoreBackend::Memory,
            other => return Err(format!("STORE_BACKEND must be 'postgres' or 'memory', got '{}'", other)),
        };

        let database_url = env::var("DATABASE_URL").ok();
        if store_backend == StoreBackend::Postgres && database_url.is_none() {
            return Err("DATABASE_URL must be set when STORE_BACKEND=postgres".to_string());
        }

        let defaults = EngineConfig::default();
        let engine = EngineConfig {
            default_max_blocked_days_per_month: env_or(
                "DEFAULT_MAX_BLOCKED_DAYS_PER_MONTH",
                defaults.default_max_blocked_days_per_month,
            )?,
            default_swap_request_expiry_hours: env_or(
                "DEFAULT_SWAP_REQUEST_EXPIRY_HOURS",
                defaults.default_swap_request_expiry_hours,
            )?,
            service_history_window_days: env_or(
                "SERVICE_HISTORY_WINDOW_DAYS",
                defaults.service_history_window_days,
            )?,
            suggestion_multiplier: env_or("SUGGESTION_MULTIPLIER", defaults.suggestion_multiplier)?,
        };

        Ok(Self {
            store_backend,
            database_url,
            port: env_or("PORT", 8080)?,
            settings_cache_ttl_secs: env_or("SETTINGS_CACHE_TTL_SECS", 30)?,
            engine,
        })
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> Result<T, String> {
    match env::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| format!("{} must be a valid number, got '{}'", key, raw)),
        Err(_) => Ok(default),
    }
}
