//! Query-string parsing for report endpoints.
//!
//! Every parameter arrives as an optional string. Values that fail to parse
//! are dropped, so a bad `min_roas` behaves exactly like an absent one.

use serde::Deserialize;

use super::filter::{ReportFilter, SortColumn, SortOrder, SortSpec};
use crate::models::{Month, ReportScope};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReportParams {
    pub month: Option<String>,
    pub channel: Option<String>,
    pub sort_by: Option<String>,
    pub order: Option<String>,
    pub min_roas: Option<String>,
    pub max_roas: Option<String>,
}

impl ReportParams {
    pub fn scope(&self) -> ReportScope {
        ReportScope {
            month: parse_month(self.month.as_deref()),
            channel: parse_text(self.channel.as_deref()),
        }
    }

    pub fn filter(&self) -> ReportFilter {
        ReportFilter {
            channel: parse_text(self.channel.as_deref()),
            min_roas: parse_number(self.min_roas.as_deref()),
            max_roas: parse_number(self.max_roas.as_deref()),
        }
    }

    pub fn sort(&self) -> SortSpec {
        SortSpec {
            column: SortColumn::parse(self.sort_by.as_deref()),
            order: SortOrder::parse(self.order.as_deref()),
        }
    }
}

/// Trimmed, non-empty text.
pub fn parse_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// A finite floating point number.
pub fn parse_number(value: Option<&str>) -> Option<f64> {
    value
        .and_then(|s| s.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

pub fn parse_month(value: Option<&str>) -> Option<Month> {
    let raw = parse_text(value)?;
    let month = Month::parse(&raw);
    if month.is_none() {
        tracing::debug!(month = %raw, "Ignoring month filter that is not YYYY-MM");
    }
    month
}
