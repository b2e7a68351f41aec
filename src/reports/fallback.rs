//! Reshaping snapshot rows into the live report contract.
//!
//! The snapshot uses the data preparation step's column names (`channel`,
//! `spend`, ...). Each report has an explicit [`FieldMap`] translating them to
//! the names the live path emits. Keys without an entry are kept verbatim.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// Snapshot key to canonical key renames for one report type.
#[derive(Debug, Clone, Copy)]
pub struct FieldMap {
    pub report: &'static str,
    pub renames: &'static [(&'static str, &'static str)],
}

impl FieldMap {
    pub fn canonical<'a>(&self, key: &'a str) -> &'a str {
        self.renames
            .iter()
            .find(|(from, _)| *from == key)
            .map(|(_, to)| *to)
            .unwrap_or(key)
    }

    /// Rename the keys of one snapshot row.
    pub fn rename(&self, row: &Map<String, Value>) -> Map<String, Value> {
        let mut out = Map::with_capacity(row.len());
        for (key, value) in row {
            let canonical = self.canonical(key);
            // A canonical key present verbatim in the source wins over a rename
            if canonical != key && row.contains_key(canonical) {
                continue;
            }
            out.insert(canonical.to_string(), value.clone());
        }
        out
    }
}

pub const CHANNEL_FIELDS: FieldMap = FieldMap {
    report: "channels",
    renames: &[
        ("channel", "name"),
        ("spend", "total_spend"),
        ("revenue", "total_revenue"),
        ("conversions", "total_conversions"),
    ],
};

pub const MONTHLY_FIELDS: FieldMap = FieldMap {
    report: "monthly",
    renames: &[
        ("spend", "total_spend"),
        ("revenue", "total_revenue"),
        ("conversions", "total_conversions"),
    ],
};

pub const CAMPAIGN_FIELDS: FieldMap = FieldMap {
    report: "campaigns",
    renames: &[
        ("campaign", "campaign_name"),
        ("channel", "channel_name"),
        ("spend", "total_spend"),
        ("revenue", "total_revenue"),
    ],
};

/// Rename and decode every object in `rows`. Entries that are not objects, or
/// that lack the row's identifying field, are skipped.
pub fn reshape<T: DeserializeOwned>(rows: &[Value], map: &FieldMap) -> Vec<T> {
    rows.iter()
        .filter_map(|row| {
            let Some(object) = row.as_object() else {
                tracing::debug!(report = map.report, "Skipping non-object snapshot row");
                return None;
            };
            match serde_json::from_value(Value::Object(map.rename(object))) {
                Ok(decoded) => Some(decoded),
                Err(e) => {
                    tracing::debug!(report = map.report, error = %e, "Skipping malformed snapshot row");
                    None
                }
            }
        })
        .collect()
}
