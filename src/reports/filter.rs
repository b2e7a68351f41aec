//! In-memory filtering and sorting shared by live and snapshot results.

use std::cmp::Ordering;

use crate::models::{CampaignAggregate, ChannelAggregate};

/// Post-aggregation filters. All bounds are inclusive.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportFilter {
    pub channel: Option<String>,
    pub min_roas: Option<f64>,
    pub max_roas: Option<f64>,
}

impl ReportFilter {
    pub fn matches<R: ReportRow>(&self, row: &R) -> bool {
        if let Some(channel) = &self.channel
            && row.channel() != channel
        {
            return false;
        }
        let roas = row.roas();
        if let Some(min) = self.min_roas
            && roas < min
        {
            return false;
        }
        if let Some(max) = self.max_roas
            && roas > max
        {
            return false;
        }
        true
    }

    pub fn apply<R: ReportRow>(&self, rows: Vec<R>) -> Vec<R> {
        rows.into_iter().filter(|row| self.matches(row)).collect()
    }
}

/// Allow-listed sort columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortColumn {
    Name,
    TotalSpend,
    TotalRevenue,
    TotalConversions,
    #[default]
    Roas,
    Cpa,
    Cpc,
}

impl SortColumn {
    /// Unknown or missing column names fall back to `roas`.
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            Some("name") => Self::Name,
            Some("total_spend") => Self::TotalSpend,
            Some("total_revenue") => Self::TotalRevenue,
            Some("total_conversions") => Self::TotalConversions,
            Some("roas") => Self::Roas,
            Some("cpa") => Self::Cpa,
            Some("cpc") => Self::Cpc,
            _ => Self::Roas,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            Some("asc") => Self::Asc,
            _ => Self::Desc,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SortSpec {
    pub column: SortColumn,
    pub order: SortOrder,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SortKey {
    Text(String),
    Number(f64),
}

impl SortKey {
    fn compare(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Text(a), Self::Text(b)) => a.cmp(b),
            (Self::Number(a), Self::Number(b)) => a.total_cmp(b),
            (Self::Text(_), Self::Number(_)) => Ordering::Greater,
            (Self::Number(_), Self::Text(_)) => Ordering::Less,
        }
    }
}

/// A report row the engine can filter and sort.
pub trait ReportRow {
    fn channel(&self) -> &str;
    fn roas(&self) -> f64;
    fn sort_key(&self, column: SortColumn) -> SortKey;
}

fn number(value: f64) -> SortKey {
    SortKey::Number(if value.is_finite() { value } else { 0.0 })
}

impl ReportRow for ChannelAggregate {
    fn channel(&self) -> &str {
        &self.name
    }

    fn roas(&self) -> f64 {
        self.roas
    }

    fn sort_key(&self, column: SortColumn) -> SortKey {
        match column {
            SortColumn::Name => SortKey::Text(self.name.to_lowercase()),
            SortColumn::TotalSpend => number(self.total_spend),
            SortColumn::TotalRevenue => number(self.total_revenue),
            SortColumn::TotalConversions => number(self.total_conversions as f64),
            SortColumn::Roas => number(self.roas),
            SortColumn::Cpa => number(self.cpa),
            SortColumn::Cpc => number(self.cpc),
        }
    }
}

impl ReportRow for CampaignAggregate {
    fn channel(&self) -> &str {
        &self.channel_name
    }

    fn roas(&self) -> f64 {
        self.roas
    }

    fn sort_key(&self, column: SortColumn) -> SortKey {
        match column {
            SortColumn::Name => SortKey::Text(self.campaign_name.to_lowercase()),
            SortColumn::TotalSpend => number(self.total_spend),
            SortColumn::TotalRevenue => number(self.total_revenue),
            SortColumn::TotalConversions => number(self.conversions as f64),
            SortColumn::Roas => number(self.roas),
            // Campaign rows carry no cost-per metrics
            SortColumn::Cpa | SortColumn::Cpc => SortKey::Number(0.0),
        }
    }
}

/// Stable sort: rows with equal keys keep their incoming order in either
/// direction.
pub fn sort_rows<R: ReportRow>(rows: &mut [R], spec: SortSpec) {
    rows.sort_by(|a, b| {
        let ordering = a
            .sort_key(spec.column)
            .compare(&b.sort_key(spec.column));
        match spec.order {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    });
}
