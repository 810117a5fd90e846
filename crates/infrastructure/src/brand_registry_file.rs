use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use tracing::{info, warn};
use wipeout_core::{AppError, AppResult};
use wipeout_domain::{BrandConfigInput, BrandRegistry};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct BrandsFile {
    brands: BTreeMap<String, BrandConfigInput>,
}

/// Loads the brand registry from a JSON brands file, or the built-in
/// registry when no path is given.
///
/// The file has the shape `{"brands": {"<name>": {"transcripts_table": ...}}}`.
pub fn load_brand_registry(path: Option<&Path>) -> AppResult<BrandRegistry> {
    let registry = match path {
        Some(path) => {
            let contents = std::fs::read_to_string(path).map_err(|error| {
                AppError::Validation(format!(
                    "failed to read brands file '{}': {error}",
                    path.display()
                ))
            })?;
            let registry = parse_brand_registry(contents.as_str()).map_err(|error| {
                AppError::Validation(format!(
                    "invalid brands file '{}': {error}",
                    path.display()
                ))
            })?;
            info!(path = %path.display(), "loaded brands file");
            registry
        }
        None => BrandRegistry::builtin()?,
    };

    for brand in registry.iter() {
        if brand.storage().is_none() {
            warn!(
                brand = %brand.name(),
                "brand has no bucket or path template; sessions will be logged but not deleted"
            );
        }
    }
    info!(brands = ?registry.brand_names(), "brand registry ready");

    Ok(registry)
}

fn parse_brand_registry(contents: &str) -> AppResult<BrandRegistry> {
    let file: BrandsFile = serde_json::from_str(contents)
        .map_err(|error| AppError::Validation(format!("malformed JSON: {error}")))?;

    BrandRegistry::from_inputs(file.brands)
}
