use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use crate::discovery::criteria::PriceBounds;
use crate::discovery::listing::Coordinates;

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
    pub discovery: DiscoveryConfig,
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

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            discovery: DiscoveryConfig::from_env()?,
        })
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

/// Knobs for the discovery engine: price slider bounds, map centre, label currency.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscoveryConfig {
    pub price_bounds: PriceBounds,
    /// Centre used when a record arrives without any coordinates.
    pub map_center: Coordinates,
    pub currency_symbol: String,
    /// JSON export backing the listing source; `None` serves the bundled catalog.
    pub listings_path: Option<PathBuf>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            price_bounds: PriceBounds::default(),
            map_center: Coordinates::new(12.9716, 77.5946),
            currency_symbol: "₹".to_string(),
            listings_path: None,
        }
    }
}

impl DiscoveryConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let floor = env_number("APP_PRICE_FLOOR", defaults.price_bounds.floor)?;
        let ceiling = env_number("APP_PRICE_CEILING", defaults.price_bounds.ceiling)?;
        let step = env_number("APP_PRICE_STEP", defaults.price_bounds.step)?;
        let price_bounds = PriceBounds::new(floor, ceiling, step)
            .ok_or(ConfigError::InvalidPriceBounds { floor, ceiling, step })?;

        let latitude = env_number("APP_MAP_CENTER_LAT", defaults.map_center.latitude)?;
        let longitude = env_number("APP_MAP_CENTER_LNG", defaults.map_center.longitude)?;
        let map_center = Coordinates::new(latitude, longitude);
        if !map_center.is_valid() {
            return Err(ConfigError::InvalidMapCenter {
                latitude,
                longitude,
            });
        }

        let currency_symbol =
            env::var("APP_CURRENCY_SYMBOL").unwrap_or(defaults.currency_symbol);
        let listings_path = env::var("APP_LISTINGS_PATH")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from);

        Ok(Self {
            price_bounds,
            map_center,
            currency_symbol,
            listings_path,
        })
    }
}

fn env_number<T: std::str::FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidNumber { key, value: raw }),
        Err(_) => Ok(default),
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost {
        source: std::net::AddrParseError,
    },
    InvalidNumber {
        key: &'static str,
        value: String,
    },
    InvalidPriceBounds {
        floor: u32,
        ceiling: u32,
        step: u32,
    },
    InvalidMapCenter {
        latitude: f64,
        longitude: f64,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidNumber { key, value } => {
                write!(f, "{key} must be numeric, got '{value}'")
            }
            ConfigError::InvalidPriceBounds {
                floor,
                ceiling,
                step,
            } => write!(
                f,
                "price bounds need floor < ceiling and a non-zero step (floor {floor}, ceiling {ceiling}, step {step})"
            ),
            ConfigError::InvalidMapCenter {
                latitude,
                longitude,
            } => write!(
                f,
                "map centre ({latitude}, {longitude}) is not a valid latitude/longitude pair"
            ),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidNumber { .. }
            | ConfigError::InvalidPriceBounds { .. }
            | ConfigError::InvalidMapCenter { .. } => None,
        }
    }
}
