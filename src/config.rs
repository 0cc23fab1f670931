use std::env;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub database: DatabaseConfig,
    pub seed: SeedConfig,
    pub rate_limit: RateLimitConfig,
    pub calendar: CalendarConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Allowed CORS origin. Read from env var `FRONTEND_URL`; when unset no CORS
    /// layer is installed.
    pub frontend_url: Option<String>,
    /// Enables `POST /api/calendar/debug/reset-data` (loopback clients only).
    pub debug_endpoints: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Sqlite,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub backend: StorageBackend,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedConfig {
    /// Replace all data with the demo office dataset on startup.
    pub demo_data: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    /// Allowed requests per second (per IP) for reservation writes
    pub write_per_second: u32,
    /// Burst size for reservation writes
    pub write_burst: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CalendarConfig {
    /// Largest span (days) a calendar query may request before normalization.
    pub max_range_days: i64,
}

fn parse_bool(name: &str, default: bool) -> bool {
    match env::var(name) {
        Ok(v) => match v.to_lowercase().as_str() {
            "1" | "true" | "yes" => true,
            "0" | "false" | "no" => false,
            _ => default,
        },
        Err(_) => default,
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let backend = match env::var("STORAGE_BACKEND")
            .unwrap_or_else(|_| "sqlite".to_string())
            .to_lowercase()
            .as_str()
        {
            "sqlite" => StorageBackend::Sqlite,
            "memory" => StorageBackend::Memory,
            _ => return Err(ConfigError::InvalidValue("STORAGE_BACKEND".to_string())),
        };

        Ok(Config {
            server: ServerConfig {
                host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: env::var("PORT")
                    .unwrap_or_else(|_| "8080".to_string())
                    .parse()
                    .map_err(|_| ConfigError::InvalidValue("PORT".to_string()))?,
                frontend_url: env::var("FRONTEND_URL").ok().filter(|v| !v.is_empty()),
                debug_endpoints: parse_bool("DEBUG_ENDPOINTS", false),
            },
            storage: StorageConfig { backend },
            database: DatabaseConfig {
                url: env::var("DATABASE_URL")
                    .unwrap_or_else(|_| "sqlite://data/reservations.db".to_string()),
                max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                    .unwrap_or_else(|_| "5".to_string())
                    .parse()
                    .unwrap_or(5),
            },
            seed: SeedConfig {
                demo_data: parse_bool("SEED_DEMO_DATA", true),
            },
            rate_limit: RateLimitConfig {
                write_per_second: env::var("RATE_LIMIT_WRITE_PER_SECOND")
                    .unwrap_or_else(|_| "5".to_string())
                    .parse()
                    .unwrap_or(5),
                write_burst: env::var("RATE_LIMIT_WRITE_BURST")
                    .unwrap_or_else(|_| "20".to_string())
                    .parse()
                    .unwrap_or(20),
            },
            calendar: CalendarConfig {
                max_range_days: env::var("CALENDAR_MAX_RANGE_DAYS")
                    .unwrap_or_else(|_| "31".to_string())
                    .parse()
                    .unwrap_or(31),
            },
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
                frontend_url: None,
                debug_endpoints: false,
            },
            storage: StorageConfig {
                backend: StorageBackend::Sqlite,
            },
            database: DatabaseConfig {
                url: "sqlite://data/reservations.db".to_string(),
                max_connections: 5,
            },
            seed: SeedConfig { demo_data: true },
            rate_limit: RateLimitConfig {
                write_per_second: 5,
                write_burst: 20,
            },
            calendar: CalendarConfig { max_range_days: 31 },
        }
    }
}
