use std::env;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use tracing_subscriber::EnvFilter;
use wipeout_core::AppError;
use wipeout_infrastructure::{
    CloudClientSettings, DEFAULT_BIGQUERY_BASE_URL, DEFAULT_STORAGE_BASE_URL,
};

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub api_host: String,
    pub api_port: u16,
    pub brands_file: Option<PathBuf>,
    pub cloud: CloudClientSettings,
}

impl ApiConfig {
    pub fn load() -> Result<Self, AppError> {
        let api_host = env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_owned());
        let api_port = match optional_env("API_PORT").or_else(|| optional_env("PORT")) {
            Some(value) => value.parse::<u16>().map_err(|error| {
                AppError::Validation(format!("invalid API_PORT value '{value}': {error}"))
            })?,
            None => 8080,
        };
        let brands_file = optional_env("WIPEOUT_BRANDS_FILE").map(PathBuf::from);

        Ok(Self {
            api_host,
            api_port,
            brands_file,
            cloud: load_cloud_settings()?,
        })
    }

    pub fn socket_address(&self) -> Result<SocketAddr, AppError> {
        let host = IpAddr::from_str(&self.api_host).map_err(|error| {
            AppError::Internal(format!("invalid API_HOST '{}': {error}", self.api_host))
        })?;
        Ok(SocketAddr::from((host, self.api_port)))
    }
}

fn load_cloud_settings() -> Result<CloudClientSettings, AppError> {
    let project_id = optional_env("WIPEOUT_PROJECT_ID")
        .or_else(|| optional_env("GOOGLE_CLOUD_PROJECT"))
        .ok_or_else(|| {
            AppError::Validation(
                "WIPEOUT_PROJECT_ID or GOOGLE_CLOUD_PROJECT is required".to_owned(),
            )
        })?;

    let http_timeout_seconds = parse_env_u64("WIPEOUT_HTTP_TIMEOUT_SECONDS", 60)?;
    if http_timeout_seconds == 0 {
        return Err(AppError::Validation(
            "WIPEOUT_HTTP_TIMEOUT_SECONDS must be greater than zero".to_owned(),
        ));
    }
    let lookback_minutes = parse_env_u32("WIPEOUT_LOOKBACK_MINUTES", 60)?;
    if lookback_minutes == 0 {
        return Err(AppError::Validation(
            "WIPEOUT_LOOKBACK_MINUTES must be greater than zero".to_owned(),
        ));
    }

    Ok(CloudClientSettings {
        project_id,
        http_timeout: Duration::from_secs(http_timeout_seconds),
        bigquery_base_url: optional_env("BIGQUERY_BASE_URL")
            .unwrap_or_else(|| DEFAULT_BIGQUERY_BASE_URL.to_owned()),
        storage_base_url: optional_env("STORAGE_BASE_URL")
            .unwrap_or_else(|| DEFAULT_STORAGE_BASE_URL.to_owned()),
        static_access_token: optional_env("GOOGLE_ACCESS_TOKEN"),
        lookback_minutes,
    })
}

pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

fn optional_env(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

fn parse_env_u32(name: &str, default: u32) -> Result<u32, AppError> {
    match optional_env(name) {
        Some(value) => value.parse::<u32>().map_err(|error| {
            AppError::Validation(format!("invalid {name} value '{value}': {error}"))
        }),
        None => Ok(default),
    }
}

fn parse_env_u64(name: &str, default: u64) -> Result<u64, AppError> {
    match optional_env(name) {
        Some(value) => value.parse::<u64>().map_err(|error| {
            AppError::Validation(format!("invalid {name} value '{value}': {error}"))
        }),
        None => Ok(default),
    }
}
