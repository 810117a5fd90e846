//! One-shot audio wipeout runner for scheduled container jobs.

#![forbid(unsafe_code)]

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use wipeout_core::{AppError, AppResult};
use wipeout_domain::{BrandConfig, BrandRegistry};
use wipeout_infrastructure::{
    CloudClientSettings, DEFAULT_BIGQUERY_BASE_URL, DEFAULT_STORAGE_BASE_URL,
    connect_wipeout_service, load_brand_registry,
};

#[derive(Debug, Clone)]
struct WorkerConfig {
    requested_brands: Vec<String>,
    brands_file: Option<PathBuf>,
    cloud: CloudClientSettings,
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = WorkerConfig::load()?;
    let registry = load_brand_registry(config.brands_file.as_deref())?;
    let brands = select_brands(&registry, &config.requested_brands)?;
    let service = connect_wipeout_service(&config.cloud, &registry).await?;
    service.check_ready().await?;

    info!(
        brands = ?brands.iter().map(|brand| brand.name()).collect::<Vec<_>>(),
        lookback_minutes = config.cloud.lookback_minutes,
        "wipeout-worker started"
    );

    let mut failed_brands = Vec::new();
    for brand in &brands {
        match service.run_for_brand(brand).await {
            Ok(summary) => info!(run_id = %summary.run_id, "{summary}"),
            Err(run_error) => {
                error!(
                    brand = %brand.name(),
                    error = %run_error,
                    "Job failed for brand '{}' with error: {run_error}",
                    brand.name()
                );
                failed_brands.push(brand.name().to_owned());
            }
        }
    }

    if failed_brands.is_empty() {
        return Ok(());
    }

    Err(AppError::Internal(format!(
        "{} of {} brand jobs failed: {}",
        failed_brands.len(),
        brands.len(),
        failed_brands.join(", ")
    )))
}

impl WorkerConfig {
    fn load() -> AppResult<Self> {
        let requested_brands = requested_brands(
            env::args().skip(1).collect(),
            optional_env("WIPEOUT_BRANDS"),
        );
        let brands_file = optional_env("WIPEOUT_BRANDS_FILE").map(PathBuf::from);

        let project_id = optional_env("WIPEOUT_PROJECT_ID")
            .or_else(|| optional_env("GOOGLE_CLOUD_PROJECT"))
            .ok_or_else(|| {
                AppError::Validation(
                    "WIPEOUT_PROJECT_ID or GOOGLE_CLOUD_PROJECT is required".to_owned(),
                )
            })?;
        let http_timeout_seconds = parse_env_u64("WIPEOUT_HTTP_TIMEOUT_SECONDS", 60)?;
        let lookback_minutes = parse_env_u32("WIPEOUT_LOOKBACK_MINUTES", 60)?;

        if http_timeout_seconds == 0 {
            return Err(AppError::Validation(
                "WIPEOUT_HTTP_TIMEOUT_SECONDS must be greater than zero".to_owned(),
            ));
        }

        if lookback_minutes == 0 {
            return Err(AppError::Validation(
                "WIPEOUT_LOOKBACK_MINUTES must be greater than zero".to_owned(),
            ));
        }

        Ok(Self {
            requested_brands,
            brands_file,
            cloud: CloudClientSettings {
                project_id,
                http_timeout: Duration::from_secs(http_timeout_seconds),
                bigquery_base_url: optional_env("BIGQUERY_BASE_URL")
                    .unwrap_or_else(|| DEFAULT_BIGQUERY_BASE_URL.to_owned()),
                storage_base_url: optional_env("STORAGE_BASE_URL")
                    .unwrap_or_else(|| DEFAULT_STORAGE_BASE_URL.to_owned()),
                static_access_token: optional_env("GOOGLE_ACCESS_TOKEN"),
                lookback_minutes,
            },
        })
    }
}

/// Positional arguments win over `WIPEOUT_BRANDS`.
fn requested_brands(args: Vec<String>, from_env: Option<String>) -> Vec<String> {
    let raw = if args.is_empty() {
        from_env
            .map(|value| value.split(',').map(str::to_owned).collect())
            .unwrap_or_default()
    } else {
        args
    };

    raw.into_iter()
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
        .collect()
}

/// Resolves requested brands, or every configured brand when none are named.
fn select_brands<'a>(
    registry: &'a BrandRegistry,
    requested: &[String],
) -> AppResult<Vec<&'a BrandConfig>> {
    if requested.is_empty() {
        return Ok(registry.iter().collect());
    }

    let mut selected: Vec<&BrandConfig> = Vec::with_capacity(requested.len());
    for selector in requested {
        let brand = registry.resolve(selector.as_str())?;
        if !selected.iter().any(|existing| existing.name() == brand.name()) {
            selected.push(brand);
        }
    }

    Ok(selected)
}

fn init_tracing() {
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

fn parse_env_u32(name: &str, default: u32) -> AppResult<u32> {
    match optional_env(name) {
        Some(value) => value.parse::<u32>().map_err(|error| {
            AppError::Validation(format!("invalid {name} value '{value}': {error}"))
        }),
        None => Ok(default),
    }
}

fn parse_env_u64(name: &str, default: u64) -> AppResult<u64> {
    match optional_env(name) {
        Some(value) => value.parse::<u64>().map_err(|error| {
            AppError::Validation(format!("invalid {name} value '{value}': {error}"))
        }),
        None => Ok(default),
    }
}
