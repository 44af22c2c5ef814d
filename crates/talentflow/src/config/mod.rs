use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use crate::mock_api::ChaosConfig;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub storage: StorageConfig,
    pub cache: CacheConfig,
    pub chaos: ChaosConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let data_path = env::var("APP_DATA_PATH")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from);
        let seed_on_start = parse_flag("APP_SEED_ON_START", true)?;

        let ttl_secs = parse_number::<u64>("APP_CACHE_TTL_SECS", 300)?;

        let defaults = ChaosConfig::default();
        let chaos = ChaosConfig {
            latency_min_ms: parse_number("APP_MOCK_LATENCY_MIN_MS", defaults.latency_min_ms)?,
            latency_max_ms: parse_number("APP_MOCK_LATENCY_MAX_MS", defaults.latency_max_ms)?,
            read_failure_rate: parse_rate(
                "APP_MOCK_READ_FAILURE_RATE",
                defaults.read_failure_rate,
            )?,
            write_failure_rate: parse_rate(
                "APP_MOCK_WRITE_FAILURE_RATE",
                defaults.write_failure_rate,
            )?,
            reorder_failure_rate: parse_rate(
                "APP_MOCK_REORDER_FAILURE_RATE",
                defaults.reorder_failure_rate,
            )?,
            rng_seed: match env::var("APP_MOCK_RNG_SEED") {
                Ok(raw) if !raw.trim().is_empty() => Some(raw.trim().parse::<u64>().map_err(
                    |_| ConfigError::InvalidNumber {
                        key: "APP_MOCK_RNG_SEED",
                        value: raw.clone(),
                    },
                )?),
                _ => None,
            },
        };

        if chaos.latency_min_ms > chaos.latency_max_ms {
            return Err(ConfigError::InvalidLatencyRange {
                min: chaos.latency_min_ms,
                max: chaos.latency_max_ms,
            });
        }

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            storage: StorageConfig {
                data_path,
                seed_on_start,
            },
            cache: CacheConfig {
                ttl: Duration::from_secs(ttl_secs),
            },
            chaos,
        })
    }
}

fn parse_number<T: std::str::FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidNumber { key, value: raw }),
        Err(_) => Ok(default),
    }
}

fn parse_rate(key: &'static str, default: f64) -> Result<f64, ConfigError> {
    let rate = parse_number::<f64>(key, default)?;
    if (0.0..=1.0).contains(&rate) {
        Ok(rate)
    } else {
        Err(ConfigError::InvalidRate { key, value: rate })
    }
}

fn parse_flag(key: &'static str, default: bool) -> Result<bool, ConfigError> {
    match env::var(key) {
        Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::InvalidFlag { key, value: raw }),
        },
        Err(_) => Ok(default),
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Where the local document store keeps its snapshot, if anywhere.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub data_path: Option<PathBuf>,
    pub seed_on_start: bool,
}

#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub ttl: Duration,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidNumber { key: &'static str, value: String },
    InvalidRate { key: &'static str, value: f64 },
    InvalidFlag { key: &'static str, value: String },
    InvalidLatencyRange { min: u64, max: u64 },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidNumber { key, value } => {
                write!(f, "{key} must be numeric (got '{value}')")
            }
            ConfigError::InvalidRate { key, value } => {
                write!(f, "{key} must be between 0 and 1 (got {value})")
            }
            ConfigError::InvalidFlag { key, value } => {
                write!(f, "{key} must be true or false (got '{value}')")
            }
            ConfigError::InvalidLatencyRange { min, max } => write!(
                f,
                "APP_MOCK_LATENCY_MIN_MS ({min}) must not exceed APP_MOCK_LATENCY_MAX_MS ({max})"
            ),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            _ => None,
        }
    }
}
