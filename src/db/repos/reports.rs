use async_trait::async_trait;

use crate::{
    db::{error::DbResult, query::Dimension},
    models::{
        AggregateRow, CampaignAggregate, ChannelAggregate, MonthlyAggregate, RawRecord,
        ReportScope,
    },
};

/// Row counts written by [`ReportRepo::rebuild_summaries`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SummaryCounts {
    pub channels: usize,
    pub months: usize,
    pub campaigns: usize,
}

#[async_trait]
pub trait ReportRepo: Send + Sync {
    /// Totals over every raw record in `scope`. Always returns a row; an empty
    /// scope sums to zero with `record_count == 0`.
    async fn totals(&self, scope: &ReportScope) -> DbResult<AggregateRow>;

    /// Raw records in `scope` summed per `dimension` group.
    async fn aggregate(
        &self,
        dimension: Dimension,
        scope: &ReportScope,
    ) -> DbResult<Vec<AggregateRow>>;

    /// Totals from the precomputed `channels` table, optionally for one channel.
    async fn precomputed_totals(&self, channel: Option<&str>) -> DbResult<AggregateRow>;

    async fn precomputed_channels(&self) -> DbResult<Vec<ChannelAggregate>>;

    /// Precomputed monthly rows, oldest first. Growth columns are left at 0.
    async fn precomputed_monthly(&self) -> DbResult<Vec<MonthlyAggregate>>;

    async fn precomputed_campaigns(&self, channel: Option<&str>)
    -> DbResult<Vec<CampaignAggregate>>;

    /// Append raw records in a single transaction. Returns the number inserted.
    async fn insert_records(&self, records: &[RawRecord]) -> DbResult<usize>;

    /// Recompute the `channels`, `monthly_performance` and `campaigns` tables
    /// from `marketing_data`, replacing their contents atomically.
    async fn rebuild_summaries(&self) -> DbResult<SummaryCounts>;
}

/// Summary rows derived from the raw aggregates, ready to be written.
pub(crate) struct SummaryRows {
    pub channels: Vec<ChannelAggregate>,
    pub monthly: Vec<MonthlyAggregate>,
    pub campaigns: Vec<CampaignAggregate>,
}

impl SummaryRows {
    /// Read every unfiltered aggregate through `repo`.
    pub(crate) async fn collect(repo: &dyn ReportRepo) -> DbResult<Self> {
        let scope = ReportScope::default();
        Ok(Self {
            channels: repo
                .aggregate(Dimension::Channel, &scope)
                .await?
                .into_iter()
                .map(ChannelAggregate::from)
                .collect(),
            monthly: repo
                .aggregate(Dimension::Month, &scope)
                .await?
                .into_iter()
                .map(MonthlyAggregate::from)
                .collect(),
            campaigns: repo
                .aggregate(Dimension::Campaign, &scope)
                .await?
                .into_iter()
                .map(CampaignAggregate::from)
                .collect(),
        })
    }

    pub(crate) fn counts(&self) -> SummaryCounts {
        SummaryCounts {
            channels: self.channels.len(),
            months: self.monthly.len(),
            campaigns: self.campaigns.len(),
        }
    }
}
