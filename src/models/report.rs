use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

use crate::reports::derive;

/// A single imported spend row. Source of truth for every live aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    pub date: NaiveDate,
    pub channel: String,
    pub campaign_name: String,
    pub spend: f64,
    pub impressions: i64,
    pub clicks: i64,
    pub conversions: i64,
    pub revenue: f64,
}

/// Calendar month in `YYYY-MM` form.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Month(String);

impl Month {
    /// Parse a `YYYY-MM` string. Anything else (including `2024-1` or
    /// `2024-13`) is rejected.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        if value.len() != 7 || value.as_bytes()[4] != b'-' {
            return None;
        }
        NaiveDate::parse_from_str(&format!("{value}-01"), "%Y-%m-%d")
            .ok()
            .map(|_| Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Month/channel scope applied to a report. Both filters are optional and
/// combine with AND.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportScope {
    pub month: Option<Month>,
    pub channel: Option<String>,
}

impl ReportScope {
    pub fn is_filtered(&self) -> bool {
        self.month.is_some() || self.channel.is_some()
    }
}

/// Summed raw columns for one group (channel, campaign, month, or everything).
///
/// `key` holds the group value: the channel name, campaign name or `YYYY-MM`.
/// It is empty for the overall aggregate.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregateRow {
    pub key: String,
    /// Channel of a campaign group; `None` for every other dimension.
    pub channel: Option<String>,
    pub total_spend: f64,
    pub total_revenue: f64,
    pub total_conversions: i64,
    pub total_clicks: i64,
    /// Number of source rows folded into this group.
    pub record_count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelAggregate {
    pub name: String,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub total_spend: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub total_revenue: f64,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub total_conversions: i64,
    /// Only known on the live path; used to derive `cpc` and never serialized,
    /// so live and snapshot payloads carry the same fields.
    #[serde(skip)]
    pub total_clicks: i64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub roas: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub cpa: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub cpc: f64,
}

impl From<AggregateRow> for ChannelAggregate {
    fn from(row: AggregateRow) -> Self {
        Self {
            roas: derive::roas(row.total_revenue, row.total_spend),
            cpa: derive::cpa(row.total_spend, row.total_conversions as f64),
            cpc: derive::cpc(row.total_spend, row.total_clicks as f64),
            name: row.key,
            total_spend: derive::round2(row.total_spend),
            total_revenue: derive::round2(row.total_revenue),
            total_conversions: row.total_conversions,
            total_clicks: row.total_clicks,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyAggregate {
    pub month: String,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub total_spend: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub total_revenue: f64,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub total_conversions: i64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub roas: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub mom_spend_growth: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub mom_revenue_growth: f64,
}

impl From<AggregateRow> for MonthlyAggregate {
    fn from(row: AggregateRow) -> Self {
        Self {
            roas: derive::roas(row.total_revenue, row.total_spend),
            month: row.key,
            total_spend: derive::round2(row.total_spend),
            total_revenue: derive::round2(row.total_revenue),
            total_conversions: row.total_conversions,
            mom_spend_growth: 0.0,
            mom_revenue_growth: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignAggregate {
    pub campaign_name: String,
    pub channel_name: String,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub total_spend: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub total_revenue: f64,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub conversions: i64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub roas: f64,
}

impl From<AggregateRow> for CampaignAggregate {
    fn from(row: AggregateRow) -> Self {
        Self {
            roas: derive::roas(row.total_revenue, row.total_spend),
            campaign_name: row.key,
            channel_name: row.channel.unwrap_or_default(),
            total_spend: derive::round2(row.total_spend),
            total_revenue: derive::round2(row.total_revenue),
            conversions: row.total_conversions,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryTotals {
    #[serde(default, deserialize_with = "lenient_f64")]
    pub total_spend: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub total_revenue: f64,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub total_conversions: i64,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub total_clicks: i64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub overall_roas: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub overall_cpa: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub overall_cpc: f64,
}

/// Months standing out in a monthly series.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MonthHighlights {
    pub highest_spend_month: Option<String>,
    pub best_roas_month: Option<String>,
    pub best_roas_value: Option<f64>,
    pub worst_roas_month: Option<String>,
    pub worst_roas_value: Option<f64>,
}

/// Accepts a JSON number, a numeric string, or null. Anything non-numeric
/// (including NaN and infinities) becomes 0.
fn lenient_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(coerce_f64(&value))
}

fn lenient_i64<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match &value {
        serde_json::Value::Number(n) => n.as_i64().unwrap_or_else(|| coerce_f64(&value) as i64),
        _ => coerce_f64(&value) as i64,
    })
}

pub(crate) fn coerce_f64(value: &serde_json::Value) -> f64 {
    let parsed = match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite()).unwrap_or(0.0)
}
