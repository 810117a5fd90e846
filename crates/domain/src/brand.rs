//! Brand configuration and the registry that resolves brand selectors.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{Display, Formatter};

use serde::Deserialize;
use wipeout_core::{AppError, AppResult, NonEmptyString};

use crate::path_template::PathTemplate;

/// Normalizes a brand selector for registry lookups.
#[must_use]
pub fn normalize_brand(value: &str) -> String {
    value.trim().to_lowercase()
}

/// Fully qualified `project.dataset.table` identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TablePath {
    project: String,
    dataset: String,
    table: String,
}

impl TablePath {
    /// Parses a dotted table path.
    ///
    /// Each segment must be non-empty and limited to ASCII letters, digits,
    /// `_` and `-` because the path is embedded in query text.
    pub fn parse(value: &str) -> AppResult<Self> {
        let segments: Vec<&str> = value.trim().split('.').collect();
        let [project, dataset, table] = segments.as_slice() else {
            return Err(AppError::Validation(format!(
                "table path '{value}' must have the form project.dataset.table"
            )));
        };

        for segment in [project, dataset, table] {
            let valid = !segment.is_empty()
                && segment
                    .chars()
                    .all(|character| character.is_ascii_alphanumeric() || matches!(character, '_' | '-'));
            if !valid {
                return Err(AppError::Validation(format!(
                    "table path '{value}' has invalid segment '{segment}'"
                )));
            }
        }

        Ok(Self {
            project: (*project).to_owned(),
            dataset: (*dataset).to_owned(),
            table: (*table).to_owned(),
        })
    }

    /// Returns the project segment.
    #[must_use]
    pub fn project(&self) -> &str {
        self.project.as_str()
    }

    /// Returns the dataset segment.
    #[must_use]
    pub fn dataset(&self) -> &str {
        self.dataset.as_str()
    }

    /// Returns the table segment.
    #[must_use]
    pub fn table(&self) -> &str {
        self.table.as_str()
    }
}

impl Display for TablePath {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}.{}.{}", self.project, self.dataset, self.table)
    }
}

/// Bucket and object layout used to locate a session's audio.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageTarget {
    bucket: NonEmptyString,
    path_template: PathTemplate,
}

impl StorageTarget {
    /// Creates a storage target.
    #[must_use]
    pub fn new(bucket: NonEmptyString, path_template: PathTemplate) -> Self {
        Self {
            bucket,
            path_template,
        }
    }

    /// Returns the bucket name.
    #[must_use]
    pub fn bucket(&self) -> &str {
        self.bucket.as_str()
    }

    /// Returns the object path template.
    #[must_use]
    pub fn path_template(&self) -> &PathTemplate {
        &self.path_template
    }
}

/// Raw brand settings as written in a brands file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BrandConfigInput {
    /// Transcript table scanned for redacted sessions. Mandatory.
    pub transcripts_table: Option<String>,
    /// Audio bucket. Deletion is skipped without it.
    pub bucket: Option<String>,
    /// Wipeout log table used for exclusion and audit records.
    pub wipeout_log_table: Option<String>,
    /// Object path template. Deletion is skipped without it.
    pub path_template: Option<String>,
}

/// Validated per-brand configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrandConfig {
    name: String,
    transcripts_table: TablePath,
    storage: Option<StorageTarget>,
    wipeout_log_table: Option<TablePath>,
}

impl BrandConfig {
    /// Validates raw settings for one brand.
    pub fn new(name: &str, input: BrandConfigInput) -> AppResult<Self> {
        let name = normalize_brand(name);
        if name.is_empty() {
            return Err(AppError::Validation(
                "brand name must not be empty".to_owned(),
            ));
        }

        let transcripts_table = non_blank(input.transcripts_table).ok_or_else(|| {
            AppError::MisconfiguredBrand(format!(
                "'transcripts_table' not set for brand '{name}'."
            ))
        })?;
        let transcripts_table = TablePath::parse(transcripts_table.as_str())?;

        let wipeout_log_table = non_blank(input.wipeout_log_table)
            .map(|value| TablePath::parse(value.as_str()))
            .transpose()?;

        let storage = match (non_blank(input.bucket), non_blank(input.path_template)) {
            (Some(bucket), Some(path_template)) => Some(StorageTarget::new(
                NonEmptyString::new(bucket)?,
                PathTemplate::parse(path_template)?,
            )),
            _ => None,
        };

        Ok(Self {
            name,
            transcripts_table,
            storage,
            wipeout_log_table,
        })
    }

    /// Returns the normalized brand name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Returns the transcript table scanned for candidates.
    #[must_use]
    pub fn transcripts_table(&self) -> &TablePath {
        &self.transcripts_table
    }

    /// Returns the storage target, if deletion is enabled for the brand.
    #[must_use]
    pub fn storage(&self) -> Option<&StorageTarget> {
        self.storage.as_ref()
    }

    /// Returns the wipeout log table, if configured.
    #[must_use]
    pub fn wipeout_log_table(&self) -> Option<&TablePath> {
        self.wipeout_log_table.as_ref()
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

/// Immutable lookup of brand configurations by normalized name.
#[derive(Debug, Clone)]
pub struct BrandRegistry {
    brands: BTreeMap<String, BrandConfig>,
}

impl BrandRegistry {
    /// Builds a registry from validated configurations.
    pub fn new(brands: impl IntoIterator<Item = BrandConfig>) -> AppResult<Self> {
        let mut registry = BTreeMap::new();
        for brand in brands {
            let name = brand.name().to_owned();
            if registry.insert(name.clone(), brand).is_some() {
                return Err(AppError::Validation(format!(
                    "brand '{name}' is configured more than once"
                )));
            }
        }

        if registry.is_empty() {
            return Err(AppError::Validation(
                "at least one brand must be configured".to_owned(),
            ));
        }

        Ok(Self { brands: registry })
    }

    /// Validates raw inputs keyed by brand name and builds a registry.
    pub fn from_inputs(inputs: BTreeMap<String, BrandConfigInput>) -> AppResult<Self> {
        let brands = inputs
            .into_iter()
            .map(|(name, input)| BrandConfig::new(name.as_str(), input))
            .collect::<AppResult<Vec<_>>>()?;

        Self::new(brands)
    }

    /// Returns the brands compiled into the service.
    pub fn builtin() -> AppResult<Self> {
        Self::from_inputs(BTreeMap::from([(
            "mcdonalds".to_owned(),
            BrandConfigInput {
                transcripts_table: Some("mcdonalds-ttm.transcripts_decibel.prod".to_owned()),
                bucket: Some("mcdonalds-ttm-audio".to_owned()),
                wipeout_log_table: Some(
                    "foodai-analytics.audio_wipeout_dataset.mcdonalds_prod_log".to_owned(),
                ),
                path_template: Some(
                    "mcdonalds-ttm/{agent_id}/{date_str}/{session_id}/".to_owned(),
                ),
            },
        )]))
    }

    /// Resolves a case-insensitive brand selector.
    pub fn resolve(&self, selector: &str) -> AppResult<&BrandConfig> {
        let brand = normalize_brand(selector);
        self.brands
            .get(brand.as_str())
            .ok_or_else(|| AppError::UnknownBrand {
                brand,
                available: self.brand_names(),
            })
    }

    /// Lists configured brand names in sorted order.
    #[must_use]
    pub fn brand_names(&self) -> Vec<String> {
        self.brands.keys().cloned().collect()
    }

    /// Iterates configured brands in name order.
    pub fn iter(&self) -> impl Iterator<Item = &BrandConfig> {
        self.brands.values()
    }

    /// Distinct buckets of brands with deletion enabled, sorted.
    #[must_use]
    pub fn buckets(&self) -> Vec<String> {
        self.brands
            .values()
            .filter_map(BrandConfig::storage)
            .map(|storage| storage.bucket().to_owned())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}
