use std::{sync::Arc, time::Instant};

use super::{
    derive,
    error::{ReportError, ReportResult},
    filter::sort_rows,
    highlights::month_highlights,
    params::ReportParams,
    simulate,
    snapshot::{Snapshot, SnapshotStore},
};
use crate::{
    db::{DbError, ReportRepo, query::Dimension},
    models::{
        AggregateRow, BudgetSimulation, CampaignAggregate, ChannelAggregate, MonthHighlights,
        MonthlyAggregate, ReportScope, SimulationRequest, SummaryTotals,
    },
    observability::metrics,
};

/// Returned by `/api/insights` when the snapshot carries no insights.
pub const NO_INSIGHTS: &str =
    "No insights generated. Run the data preparation step to build the snapshot.";

/// Where a report's rows came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportSource {
    /// Aggregated from raw records.
    Live,
    /// Read from a maintained summary table.
    Precomputed,
    Snapshot,
    /// Nothing could produce data.
    Empty,
}

impl ReportSource {
    pub fn as_str(self) -> &'static str {
        match self {
            ReportSource::Live => "live",
            ReportSource::Precomputed => "precomputed",
            ReportSource::Snapshot => "snapshot",
            ReportSource::Empty => "none",
        }
    }
}

/// Why a report left the database path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FallbackReason {
    NoDatabase,
    QueryFailed,
    /// An unfiltered summary table read returned nothing.
    Empty,
}

impl FallbackReason {
    fn as_str(self) -> &'static str {
        match self {
            FallbackReason::NoDatabase => "no_database",
            FallbackReason::QueryFailed => "query_failed",
            FallbackReason::Empty => "empty",
        }
    }
}

/// A report value tagged with its source.
#[derive(Debug, Clone, PartialEq)]
pub struct Sourced<T> {
    pub data: T,
    pub source: ReportSource,
}

impl<T> Sourced<T> {
    fn new(data: T, source: ReportSource) -> Self {
        Self { data, source }
    }
}

/// Outcome of the database leg of a pipeline.
type LiveOutcome<T> = Result<Sourced<T>, FallbackReason>;

/// Per-endpoint report pipelines.
///
/// Each report tries the database first and falls back to the snapshot when
/// no database is configured, a query fails, or an unfiltered summary table
/// is empty. Filtering and sorting run after the source is chosen, so both
/// paths produce identical shapes.
#[derive(Clone)]
pub struct ReportService {
    repo: Option<Arc<dyn ReportRepo>>,
    snapshot: SnapshotStore,
}

impl ReportService {
    pub fn new(repo: Option<Arc<dyn ReportRepo>>, snapshot: SnapshotStore) -> Self {
        Self { repo, snapshot }
    }

    pub fn snapshot_store(&self) -> &SnapshotStore {
        &self.snapshot
    }

    /// Overall totals for `scope`.
    ///
    /// `overall_cpc` is derived from live clicks only for a filtered scope
    /// with a positive click total. Otherwise it is taken from the snapshot.
    pub async fn summary(&self, scope: &ReportScope) -> ReportResult<Sourced<SummaryTotals>> {
        let start = Instant::now();
        let result = self.summary_inner(scope).await;
        let source = result
            .as_ref()
            .map(|s| s.source)
            .unwrap_or(ReportSource::Empty);
        record("summary", source, start);
        result
    }

    async fn summary_inner(&self, scope: &ReportScope) -> ReportResult<Sourced<SummaryTotals>> {
        let reason = match self.repo.as_deref() {
            None => FallbackReason::NoDatabase,
            Some(repo) => {
                let live = if scope.is_filtered() {
                    repo.totals(scope).await
                } else {
                    repo.precomputed_totals(None).await
                };

                match live {
                    Ok(row) if scope.is_filtered() => {
                        let cpc = self.summary_cpc(&row).await;
                        return Ok(Sourced::new(totals(&row, cpc), ReportSource::Live));
                    }
                    Ok(row) if row.record_count > 0 => {
                        let cpc = self.summary_cpc(&row).await;
                        return Ok(Sourced::new(totals(&row, cpc), ReportSource::Precomputed));
                    }
                    Ok(_) => FallbackReason::Empty,
                    Err(e) => {
                        log_query_failure("summary", &e);
                        match self.summary_single_channel(repo, scope).await {
                            Some(partial) => return Ok(partial),
                            None => FallbackReason::QueryFailed,
                        }
                    }
                }
            }
        };

        note_fallback("summary", reason);
        self.snapshot
            .load()
            .await
            .and_then(|s| s.overall())
            .map(|overall| Sourced::new(overall, ReportSource::Snapshot))
            .ok_or(ReportError::NoData { report: "summary" })
    }

    /// Channel-only summary from the `channels` table, tried after the raw
    /// query fails and before the snapshot.
    async fn summary_single_channel(
        &self,
        repo: &dyn ReportRepo,
        scope: &ReportScope,
    ) -> Option<Sourced<SummaryTotals>> {
        let channel = scope.channel.as_deref().filter(|_| scope.month.is_none())?;
        match repo.precomputed_totals(Some(channel)).await {
            Ok(row) if row.record_count > 0 => {
                tracing::info!(report = "summary", channel, "Serving channel summary from summary table");
                // The summary table has no clicks and the snapshot CPC is company-wide
                Some(Sourced::new(totals(&row, 0.0), ReportSource::Precomputed))
            }
            Ok(_) => None,
            Err(e) => {
                log_query_failure("summary", &e);
                None
            }
        }
    }

    async fn summary_cpc(&self, row: &AggregateRow) -> f64 {
        if row.total_clicks > 0 {
            return derive::cpc(row.total_spend, row.total_clicks as f64);
        }
        self.snapshot
            .load()
            .await
            .map(|s| s.overall_cpc())
            .unwrap_or(0.0)
    }

    /// Per-channel aggregates, filtered and sorted.
    pub async fn channels(&self, params: &ReportParams) -> Sourced<Vec<ChannelAggregate>> {
        let start = Instant::now();
        let scope = params.scope();

        let Sourced { data, source } = match self.live_channels(&scope).await {
            Ok(live) => live,
            Err(reason) => {
                note_fallback("channels", reason);
                self.from_snapshot(Snapshot::channels).await
            }
        };

        let mut rows = params.filter().apply(data);
        sort_rows(&mut rows, params.sort());

        record("channels", source, start);
        Sourced::new(rows, source)
    }

    async fn live_channels(&self, scope: &ReportScope) -> LiveOutcome<Vec<ChannelAggregate>> {
        let repo = self.repo.as_deref().ok_or(FallbackReason::NoDatabase)?;

        if scope.month.is_some() {
            let rows = repo
                .aggregate(Dimension::Channel, scope)
                .await
                .map_err(|e| query_failed("channels", &e))?;
            return Ok(Sourced::new(
                rows.into_iter().map(ChannelAggregate::from).collect(),
                ReportSource::Live,
            ));
        }

        let rows = repo
            .precomputed_channels()
            .await
            .map_err(|e| query_failed("channels", &e))?;
        if rows.is_empty() {
            return Err(FallbackReason::Empty);
        }
        Ok(Sourced::new(rows, ReportSource::Precomputed))
    }

    /// Monthly series, oldest first, with month-over-month growth.
    ///
    /// Growth is computed over the whole series before the month filter is
    /// applied, so a single filtered month still reports growth against its
    /// predecessor.
    pub async fn monthly(&self, scope: &ReportScope) -> Sourced<Vec<MonthlyAggregate>> {
        let start = Instant::now();
        let result = self.monthly_series(scope.channel.as_deref()).await;

        let Sourced { mut data, source } = result;
        if let Some(month) = &scope.month {
            data.retain(|row| row.month == month.as_str());
        }

        record("monthly", source, start);
        Sourced::new(data, source)
    }

    async fn monthly_series(&self, channel: Option<&str>) -> Sourced<Vec<MonthlyAggregate>> {
        let Sourced { mut data, source } = match self.live_monthly(channel).await {
            Ok(live) => live,
            Err(reason) => {
                note_fallback("monthly", reason);
                if channel.is_some() {
                    tracing::debug!(
                        report = "monthly",
                        "Snapshot has no per-channel monthly data; channel filter ignored"
                    );
                }
                self.from_snapshot(Snapshot::monthly).await
            }
        };

        derive::apply_mom_growth(&mut data);
        Sourced::new(data, source)
    }

    async fn live_monthly(&self, channel: Option<&str>) -> LiveOutcome<Vec<MonthlyAggregate>> {
        let repo = self.repo.as_deref().ok_or(FallbackReason::NoDatabase)?;

        if let Some(channel) = channel {
            let scope = ReportScope {
                month: None,
                channel: Some(channel.to_string()),
            };
            let rows = repo
                .aggregate(Dimension::Month, &scope)
                .await
                .map_err(|e| query_failed("monthly", &e))?;
            return Ok(Sourced::new(
                rows.into_iter().map(MonthlyAggregate::from).collect(),
                ReportSource::Live,
            ));
        }

        let rows = repo
            .precomputed_monthly()
            .await
            .map_err(|e| query_failed("monthly", &e))?;
        if rows.is_empty() {
            return Err(FallbackReason::Empty);
        }
        Ok(Sourced::new(rows, ReportSource::Precomputed))
    }

    /// Standout months of the (optionally per-channel) monthly series.
    pub async fn highlights(&self, channel: Option<&str>) -> Sourced<MonthHighlights> {
        let start = Instant::now();
        let Sourced { data, source } = self.monthly_series(channel).await;
        record("highlights", source, start);
        Sourced::new(month_highlights(&data), source)
    }

    /// Per-campaign aggregates, filtered and sorted.
    pub async fn campaigns(&self, params: &ReportParams) -> Sourced<Vec<CampaignAggregate>> {
        let start = Instant::now();
        let scope = params.scope();

        let Sourced { data, source } = match self.live_campaigns(&scope).await {
            Ok(live) => live,
            Err(reason) => {
                note_fallback("campaigns", reason);
                self.from_snapshot(Snapshot::campaigns).await
            }
        };

        let mut rows = params.filter().apply(data);
        sort_rows(&mut rows, params.sort());

        record("campaigns", source, start);
        Sourced::new(rows, source)
    }

    async fn live_campaigns(&self, scope: &ReportScope) -> LiveOutcome<Vec<CampaignAggregate>> {
        let repo = self.repo.as_deref().ok_or(FallbackReason::NoDatabase)?;

        if scope.month.is_some() {
            let rows = repo
                .aggregate(Dimension::Campaign, scope)
                .await
                .map_err(|e| query_failed("campaigns", &e))?;
            return Ok(Sourced::new(
                rows.into_iter().map(CampaignAggregate::from).collect(),
                ReportSource::Live,
            ));
        }

        let channel = scope.channel.as_deref();
        let rows = repo
            .precomputed_campaigns(channel)
            .await
            .map_err(|e| query_failed("campaigns", &e))?;
        // A channel with no campaigns is a real answer; only an empty
        // unfiltered table means nothing was imported.
        if rows.is_empty() && channel.is_none() {
            return Err(FallbackReason::Empty);
        }
        Ok(Sourced::new(rows, ReportSource::Precomputed))
    }

    /// Insight strings from the snapshot, or a single placeholder.
    pub async fn insights(&self) -> Sourced<Vec<String>> {
        let start = Instant::now();
        let result = match self.snapshot.load().await.and_then(|s| s.insights()) {
            Some(insights) => Sourced::new(insights, ReportSource::Snapshot),
            None => Sourced::new(vec![NO_INSIGHTS.to_string()], ReportSource::Empty),
        };
        record("insights", result.source, start);
        result
    }

    /// Project revenue for proposed spend against the unfiltered channel report.
    pub async fn simulate(
        &self,
        request: &SimulationRequest,
    ) -> ReportResult<Sourced<BudgetSimulation>> {
        let Sourced { data, source } = self.channels(&ReportParams::default()).await;
        let simulation = simulate::simulate(&data, &request.allocations)?;
        Ok(Sourced::new(simulation, source))
    }

    async fn from_snapshot<T>(&self, section: fn(&Snapshot) -> Vec<T>) -> Sourced<Vec<T>> {
        match self.snapshot.load().await {
            Some(snapshot) => Sourced::new(section(&snapshot), ReportSource::Snapshot),
            None => Sourced::new(Vec::new(), ReportSource::Empty),
        }
    }
}

fn totals(row: &AggregateRow, cpc: f64) -> SummaryTotals {
    SummaryTotals {
        total_spend: derive::round2(row.total_spend),
        total_revenue: derive::round2(row.total_revenue),
        total_conversions: row.total_conversions,
        total_clicks: row.total_clicks,
        overall_roas: derive::roas(row.total_revenue, row.total_spend),
        overall_cpa: derive::cpa(row.total_spend, row.total_conversions as f64),
        overall_cpc: cpc,
    }
}

fn log_query_failure(report: &'static str, error: &DbError) {
    tracing::warn!(report, error = %error, kind = error.kind(), "Report query failed");
}

fn query_failed(report: &'static str, error: &DbError) -> FallbackReason {
    log_query_failure(report, error);
    FallbackReason::QueryFailed
}

fn note_fallback(report: &'static str, reason: FallbackReason) {
    tracing::warn!(report, reason = reason.as_str(), "Falling back to snapshot");
    metrics::record_report_fallback(report, reason.as_str());
}

fn record(report: &'static str, source: ReportSource, start: Instant) {
    tracing::debug!(report, source = source.as_str(), "Report served");
    metrics::record_report_request(report, source.as_str(), start.elapsed().as_secs_f64());
}
