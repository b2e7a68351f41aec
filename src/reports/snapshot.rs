use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::Value;

use super::fallback::{self, CAMPAIGN_FIELDS, CHANNEL_FIELDS, MONTHLY_FIELDS};
use crate::models::{CampaignAggregate, ChannelAggregate, MonthlyAggregate, SummaryTotals};

/// Precomputed JSON document produced by the offline data preparation step.
///
/// Sections are kept as raw JSON and reshaped on access, so a malformed
/// section only affects the report that reads it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    overall: Option<Value>,
    #[serde(default)]
    channels: Option<Value>,
    #[serde(default)]
    monthly: Option<Value>,
    #[serde(default)]
    campaigns: Option<Value>,
    #[serde(default)]
    insights: Option<Value>,
    #[serde(default)]
    generated_at: Option<String>,
}

impl Snapshot {
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    /// The `overall` section, as-is.
    pub fn overall(&self) -> Option<SummaryTotals> {
        let overall = self.overall.as_ref().filter(|v| v.is_object())?;
        serde_json::from_value(overall.clone()).ok()
    }

    /// `overall.overall_cpc`, or 0 when absent.
    pub fn overall_cpc(&self) -> f64 {
        self.overall().map(|o| o.overall_cpc).unwrap_or(0.0)
    }

    pub fn channels(&self) -> Vec<ChannelAggregate> {
        fallback::reshape(section(&self.channels), &CHANNEL_FIELDS)
    }

    pub fn monthly(&self) -> Vec<MonthlyAggregate> {
        fallback::reshape(section(&self.monthly), &MONTHLY_FIELDS)
    }

    pub fn campaigns(&self) -> Vec<CampaignAggregate> {
        fallback::reshape(section(&self.campaigns), &CAMPAIGN_FIELDS)
    }

    /// Insight strings. Non-string entries are skipped.
    pub fn insights(&self) -> Option<Vec<String>> {
        let items = self.insights.as_ref()?.as_array()?;
        Some(
            items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect(),
        )
    }

    pub fn generated_at(&self) -> Option<&str> {
        self.generated_at.as_deref()
    }
}

fn section(value: &Option<Value>) -> &[Value] {
    value
        .as_ref()
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// Reads the snapshot file on demand.
///
/// The file is re-read on each call so an out-of-band rewrite is seen by the
/// next request. Nothing is cached and the file is never written.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load and parse the snapshot. A missing or unparsable file yields `None`.
    pub async fn load(&self) -> Option<Snapshot> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "Snapshot file not found");
                return None;
            }
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Failed to read snapshot file");
                return None;
            }
        };

        match Snapshot::from_json(&raw) {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Snapshot file is not valid JSON");
                None
            }
        }
    }
}
