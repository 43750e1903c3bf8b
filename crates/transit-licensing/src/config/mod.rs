use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

use crate::workflows::licensing::applications::issuance::{
    IssuanceConfig, DEFAULT_MAX_ATTEMPTS, DEFAULT_VALIDITY_YEARS,
};

const MAX_LICENSE_NUMBER_ATTEMPTS: u8 = 20;
pub const MAX_LICENSE_VALIDITY_YEARS: u32 = 10;

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

/// Top-level configuration for the licensing service.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub licensing: LicensingConfig,
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

        let license_number_attempts = match env::var("APP_LICENSE_NUMBER_ATTEMPTS") {
            Ok(raw) => raw
                .trim()
                .parse::<u8>()
                .ok()
                .filter(|attempts| (1..=MAX_LICENSE_NUMBER_ATTEMPTS).contains(attempts))
                .ok_or(ConfigError::InvalidLicenseNumberAttempts { value: raw })?,
            Err(_) => DEFAULT_MAX_ATTEMPTS,
        };

        let license_validity_years = match env::var("APP_LICENSE_VALIDITY_YEARS") {
            Ok(raw) => raw
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|years| (1..=MAX_LICENSE_VALIDITY_YEARS).contains(years))
                .ok_or(ConfigError::InvalidLicenseValidity { value: raw })?,
            Err(_) => DEFAULT_VALIDITY_YEARS,
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            licensing: LicensingConfig {
                license_number_attempts,
                license_validity_years,
            },
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

/// License issuance dials.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LicensingConfig {
    pub license_number_attempts: u8,
    pub license_validity_years: u32,
}

impl From<&LicensingConfig> for IssuanceConfig {
    fn from(config: &LicensingConfig) -> Self {
        IssuanceConfig {
            max_attempts: config.license_number_attempts,
            validity_years: config.license_validity_years,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidLicenseNumberAttempts { value: String },
    InvalidLicenseValidity { value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidLicenseNumberAttempts { value } => write!(
                f,
                "APP_LICENSE_NUMBER_ATTEMPTS must be between 1 and {MAX_LICENSE_NUMBER_ATTEMPTS} (found '{value}')"
            ),
            ConfigError::InvalidLicenseValidity { value } => write!(
                f,
                "APP_LICENSE_VALIDITY_YEARS must be between 1 and {MAX_LICENSE_VALIDITY_YEARS} years (found '{value}')"
            ),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidLicenseNumberAttempts { .. }
            | ConfigError::InvalidLicenseValidity { .. } => None,
        }
    }
}
