use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Location of the precomputed JSON snapshot used as a fallback data source.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SnapshotConfig {
    /// Path to the snapshot file. Relative paths resolve against the working
    /// directory. The file may be absent; reports then have no fallback.
    #[serde(default = "default_snapshot_path")]
    pub path: PathBuf,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            path: default_snapshot_path(),
        }
    }
}

impl SnapshotConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.path.as_os_str().is_empty() {
            return Err(ConfigError::Validation(
                "snapshot.path cannot be empty".into(),
            ));
        }
        Ok(())
    }
}

fn default_snapshot_path() -> PathBuf {
    PathBuf::from("data/summary_data.json")
}
