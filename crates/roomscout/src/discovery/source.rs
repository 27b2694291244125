use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use super::listing::{ListingStatus, RawListing};

/// Identifies one fetch; only the most recently issued token may apply its result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct FetchToken(pub(crate) u64);

impl FetchToken {
    pub fn generation(self) -> u64 {
        self.0
    }
}

/// Error returned when the property data source cannot deliver listings.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("failed to read listings from {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("listings payload is malformed: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("listing source unavailable: {0}")]
    Unavailable(String),
}

/// Supplier of active listings; the only asynchronous boundary of the discovery core.
#[async_trait]
pub trait ListingSource: Send + Sync {
    /// Rows whose status is active. Inactive and pending rows never leave the source.
    async fn fetch_active_listings(&self) -> Result<Vec<RawListing>, SourceError>;

    fn name(&self) -> &str;
}

/// Reads a JSON array of listing rows from disk on every fetch.
///
/// Rows are decoded one at a time; a row that does not fit [`RawListing`] is logged
/// and dropped without failing the rest of the export.
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ListingSource for JsonFileSource {
    async fn fetch_active_listings(&self) -> Result<Vec<RawListing>, SourceError> {
        let bytes = tokio::fs::read(&self.path)
            .await
            .map_err(|source| SourceError::Io {
                path: self.path.clone(),
                source,
            })?;
        let values: Vec<Value> = serde_json::from_slice(&bytes)?;
        Ok(values
            .into_iter()
            .enumerate()
            .filter_map(|(index, value)| decode_row(index, value))
            .filter(RawListing::is_active)
            .collect())
    }

    fn name(&self) -> &str {
        "json-file"
    }
}

fn decode_row(index: usize, value: Value) -> Option<RawListing> {
    match serde_json::from_value::<RawListing>(value) {
        Ok(row) => {
            if row.status == Some(ListingStatus::Unrecognized) {
                warn!(listing = %row.id, "dropping row with unrecognised status");
            }
            Some(row)
        }
        Err(err) => {
            warn!(row = index, error = %err, "dropping malformed listing row");
            None
        }
    }
}

/// Fixed in-memory rows, used for the bundled catalog and in tests.
#[derive(Debug, Clone, Default)]
pub struct StaticListingSource {
    rows: Vec<RawListing>,
}

impl StaticListingSource {
    pub fn new(rows: Vec<RawListing>) -> Self {
        Self { rows }
    }
}

#[async_trait]
impl ListingSource for StaticListingSource {
    async fn fetch_active_listings(&self) -> Result<Vec<RawListing>, SourceError> {
        Ok(self
            .rows
            .iter()
            .filter(|row| row.is_active())
            .cloned()
            .collect())
    }

    fn name(&self) -> &str {
        "static"
    }
}
