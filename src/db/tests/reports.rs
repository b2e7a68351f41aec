//! Shared tests for ReportRepo implementations
//!
//! Each test seeds its own rows through `insert_records` so the same
//! assertions hold for SQLite and PostgreSQL.

use chrono::NaiveDate;

use crate::{
    db::{
        query::Dimension,
        repos::{ReportRepo, SummaryCounts},
    },
    models::{Month, RawRecord, ReportScope},
};

// ============================================================================
// Test Input Helpers
// ============================================================================

fn record(
    date: &str,
    channel: &str,
    campaign: &str,
    spend: f64,
    clicks: i64,
    conversions: i64,
    revenue: f64,
) -> RawRecord {
    RawRecord {
        date: NaiveDate::parse_from_str(date, "%Y-%m-%d").expect("valid date"),
        channel: channel.to_string(),
        campaign_name: campaign.to_string(),
        spend,
        impressions: clicks * 10,
        clicks,
        conversions,
        revenue,
    }
}

/// Two channels over two months, one campaign each.
fn seed_records() -> Vec<RawRecord> {
    vec![
        record("2024-01-05", "SEO", "Brand", 400.0, 200, 10, 1600.0),
        record("2024-01-20", "Paid Search", "Generic", 600.0, 300, 6, 900.0),
        record("2024-02-03", "SEO", "Brand", 600.0, 300, 10, 2400.0),
        record("2024-02-14", "Paid Search", "Generic", 900.0, 450, 9, 1800.0),
    ]
}

fn scope(month: Option<&str>, channel: Option<&str>) -> ReportScope {
    ReportScope {
        month: month.and_then(Month::parse),
        channel: channel.map(str::to_string),
    }
}

async fn seed(repo: &dyn ReportRepo) {
    let inserted = repo
        .insert_records(&seed_records())
        .await
        .expect("Failed to seed records");
    assert_eq!(inserted, 4);
}

// ============================================================================
// Raw Aggregate Tests
// ============================================================================

pub async fn test_totals_empty(repo: &dyn ReportRepo) {
    let totals = repo
        .totals(&ReportScope::default())
        .await
        .expect("Failed to read totals");

    assert_eq!(totals.record_count, 0);
    assert_eq!(totals.total_spend, 0.0);
    assert_eq!(totals.total_revenue, 0.0);
    assert_eq!(totals.total_conversions, 0);
    assert_eq!(totals.total_clicks, 0);
}

pub async fn test_totals_unfiltered(repo: &dyn ReportRepo) {
    seed(repo).await;

    let totals = repo.totals(&ReportScope::default()).await.unwrap();

    assert_eq!(totals.record_count, 4);
    assert_eq!(totals.total_spend, 2500.0);
    assert_eq!(totals.total_revenue, 6700.0);
    assert_eq!(totals.total_conversions, 35);
    assert_eq!(totals.total_clicks, 1250);
}

pub async fn test_totals_month_and_channel_scope(repo: &dyn ReportRepo) {
    seed(repo).await;

    let totals = repo
        .totals(&scope(Some("2024-01"), Some("SEO")))
        .await
        .unwrap();

    assert_eq!(totals.record_count, 1);
    assert_eq!(totals.total_spend, 400.0);
    assert_eq!(totals.total_revenue, 1600.0);
    assert_eq!(totals.total_clicks, 200);
}

pub async fn test_totals_unknown_channel_is_zero(repo: &dyn ReportRepo) {
    seed(repo).await;

    let totals = repo.totals(&scope(None, Some("TikTok"))).await.unwrap();

    assert_eq!(totals.record_count, 0);
    assert_eq!(totals.total_spend, 0.0);
}

pub async fn test_aggregate_by_channel(repo: &dyn ReportRepo) {
    seed(repo).await;

    let rows = repo
        .aggregate(Dimension::Channel, &ReportScope::default())
        .await
        .unwrap();

    let keys: Vec<&str> = rows.iter().map(|r| r.key.as_str()).collect();
    assert_eq!(keys, vec!["Paid Search", "SEO"]);
    assert_eq!(rows[0].total_spend, 1500.0);
    assert_eq!(rows[0].total_conversions, 15);
    assert_eq!(rows[1].total_revenue, 4000.0);
    assert_eq!(rows[1].total_clicks, 500);
    assert!(rows.iter().all(|r| r.channel.is_none()));
}

pub async fn test_aggregate_by_month(repo: &dyn ReportRepo) {
    seed(repo).await;

    let rows = repo
        .aggregate(Dimension::Month, &ReportScope::default())
        .await
        .unwrap();

    let keys: Vec<&str> = rows.iter().map(|r| r.key.as_str()).collect();
    assert_eq!(keys, vec!["2024-01", "2024-02"]);
    assert_eq!(rows[0].total_spend, 1000.0);
    assert_eq!(rows[1].total_revenue, 4200.0);
}

pub async fn test_aggregate_by_month_channel_scope(repo: &dyn ReportRepo) {
    seed(repo).await;

    let rows = repo
        .aggregate(Dimension::Month, &scope(None, Some("Paid Search")))
        .await
        .unwrap();

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].total_spend, 600.0);
    assert_eq!(rows[1].total_spend, 900.0);
}

pub async fn test_aggregate_by_campaign_carries_channel(repo: &dyn ReportRepo) {
    seed(repo).await;

    let rows = repo
        .aggregate(Dimension::Campaign, &scope(Some("2024-02"), None))
        .await
        .unwrap();

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].key, "Brand");
    assert_eq!(rows[0].channel.as_deref(), Some("SEO"));
    assert_eq!(rows[0].total_spend, 600.0);
    assert_eq!(rows[1].key, "Generic");
    assert_eq!(rows[1].channel.as_deref(), Some("Paid Search"));
}

pub async fn test_aggregate_empty_scope(repo: &dyn ReportRepo) {
    seed(repo).await;

    let rows = repo
        .aggregate(Dimension::Channel, &scope(Some("2023-12"), None))
        .await
        .unwrap();

    assert!(rows.is_empty());
}

pub async fn test_filter_values_are_bound(repo: &dyn ReportRepo) {
    seed(repo).await;

    let totals = repo
        .totals(&scope(None, Some("SEO' OR '1'='1")))
        .await
        .unwrap();
    assert_eq!(totals.record_count, 0);

    let rows = repo
        .aggregate(
            Dimension::Campaign,
            &scope(None, Some("x'; DROP TABLE marketing_data; --")),
        )
        .await
        .unwrap();
    assert!(rows.is_empty());

    let totals = repo.totals(&ReportScope::default()).await.unwrap();
    assert_eq!(totals.record_count, 4);
}

pub async fn test_insert_records_empty(repo: &dyn ReportRepo) {
    let inserted = repo.insert_records(&[]).await.unwrap();
    assert_eq!(inserted, 0);
}

// ============================================================================
// Precomputed Summary Tests
// ============================================================================

pub async fn test_precomputed_empty_before_rebuild(repo: &dyn ReportRepo) {
    seed(repo).await;

    let totals = repo.precomputed_totals(None).await.unwrap();
    assert_eq!(totals.record_count, 0);
    assert_eq!(totals.total_spend, 0.0);

    assert!(repo.precomputed_channels().await.unwrap().is_empty());
    assert!(repo.precomputed_monthly().await.unwrap().is_empty());
    assert!(repo.precomputed_campaigns(None).await.unwrap().is_empty());
}

pub async fn test_rebuild_summaries_counts(repo: &dyn ReportRepo) {
    seed(repo).await;

    let counts = repo.rebuild_summaries().await.unwrap();

    assert_eq!(
        counts,
        SummaryCounts {
            channels: 2,
            months: 2,
            campaigns: 2,
        }
    );
}

pub async fn test_rebuild_summaries_empty_source(repo: &dyn ReportRepo) {
    let counts = repo.rebuild_summaries().await.unwrap();

    assert_eq!(counts, SummaryCounts::default());
    assert!(repo.precomputed_channels().await.unwrap().is_empty());
}

pub async fn test_precomputed_channels_derived(repo: &dyn ReportRepo) {
    seed(repo).await;
    repo.rebuild_summaries().await.unwrap();

    let channels = repo.precomputed_channels().await.unwrap();

    assert_eq!(channels.len(), 2);
    let paid = &channels[0];
    assert_eq!(paid.name, "Paid Search");
    assert_eq!(paid.total_spend, 1500.0);
    assert_eq!(paid.total_revenue, 2700.0);
    assert_eq!(paid.roas, 1.8);
    assert_eq!(paid.cpa, 100.0);
    assert_eq!(paid.cpc, 2.0);

    let seo = &channels[1];
    assert_eq!(seo.name, "SEO");
    assert_eq!(seo.roas, 4.0);
    assert_eq!(seo.cpa, 50.0);
}

pub async fn test_precomputed_totals(repo: &dyn ReportRepo) {
    seed(repo).await;
    repo.rebuild_summaries().await.unwrap();

    let totals = repo.precomputed_totals(None).await.unwrap();

    // One row per channel, clicks are not kept in the summary table
    assert_eq!(totals.record_count, 2);
    assert_eq!(totals.total_spend, 2500.0);
    assert_eq!(totals.total_revenue, 6700.0);
    assert_eq!(totals.total_conversions, 35);
    assert_eq!(totals.total_clicks, 0);
}

pub async fn test_precomputed_totals_single_channel(repo: &dyn ReportRepo) {
    seed(repo).await;
    repo.rebuild_summaries().await.unwrap();

    let seo = repo.precomputed_totals(Some("SEO")).await.unwrap();
    assert_eq!(seo.record_count, 1);
    assert_eq!(seo.total_spend, 1000.0);
    assert_eq!(seo.total_revenue, 4000.0);

    let missing = repo.precomputed_totals(Some("Email")).await.unwrap();
    assert_eq!(missing.record_count, 0);
}

pub async fn test_precomputed_monthly_ordered(repo: &dyn ReportRepo) {
    seed(repo).await;
    repo.rebuild_summaries().await.unwrap();

    let months = repo.precomputed_monthly().await.unwrap();

    assert_eq!(months.len(), 2);
    assert_eq!(months[0].month, "2024-01");
    assert_eq!(months[0].roas, 2.5);
    assert_eq!(months[1].month, "2024-02");
    assert_eq!(months[1].total_conversions, 19);
    assert!(months.iter().all(|m| m.mom_spend_growth == 0.0));
}

pub async fn test_precomputed_campaigns_by_channel(repo: &dyn ReportRepo) {
    seed(repo).await;
    repo.rebuild_summaries().await.unwrap();

    let all = repo.precomputed_campaigns(None).await.unwrap();
    assert_eq!(all.len(), 2);

    let seo = repo.precomputed_campaigns(Some("SEO")).await.unwrap();
    assert_eq!(seo.len(), 1);
    assert_eq!(seo[0].campaign_name, "Brand");
    assert_eq!(seo[0].channel_name, "SEO");
    assert_eq!(seo[0].conversions, 20);
    assert_eq!(seo[0].roas, 4.0);

    let none = repo.precomputed_campaigns(Some("Display")).await.unwrap();
    assert!(none.is_empty());
}

pub async fn test_rebuild_summaries_replaces_contents(repo: &dyn ReportRepo) {
    seed(repo).await;
    repo.rebuild_summaries().await.unwrap();
    repo.rebuild_summaries().await.unwrap();
    assert_eq!(repo.precomputed_channels().await.unwrap().len(), 2);

    repo.insert_records(&[record(
        "2024-03-02", "Email", "Newsletter", 100.0, 50, 2, 300.0,
    )])
    .await
    .unwrap();
    let counts = repo.rebuild_summaries().await.unwrap();

    assert_eq!(counts.channels, 3);
    assert_eq!(counts.months, 3);
    let totals = repo.precomputed_totals(None).await.unwrap();
    assert_eq!(totals.total_spend, 2600.0);
}

// ============================================================================
// SQLite Tests - Fast, in-memory
// ============================================================================

#[cfg(all(test, feature = "database-sqlite"))]
mod sqlite_tests {
    use super::*;
    use crate::db::{
        sqlite::SqliteReportRepo,
        tests::harness::{create_sqlite_pool, run_sqlite_migrations},
    };

    async fn create_repo() -> SqliteReportRepo {
        let pool = create_sqlite_pool().await;
        run_sqlite_migrations(&pool).await;
        SqliteReportRepo::new(pool)
    }

    macro_rules! sqlite_test {
        ($name:ident) => {
            #[tokio::test]
            async fn $name() {
                let repo = create_repo().await;
                super::$name(&repo).await;
            }
        };
    }

    // Raw aggregates
    sqlite_test!(test_totals_empty);
    sqlite_test!(test_totals_unfiltered);
    sqlite_test!(test_totals_month_and_channel_scope);
    sqlite_test!(test_totals_unknown_channel_is_zero);
    sqlite_test!(test_aggregate_by_channel);
    sqlite_test!(test_aggregate_by_month);
    sqlite_test!(test_aggregate_by_month_channel_scope);
    sqlite_test!(test_aggregate_by_campaign_carries_channel);
    sqlite_test!(test_aggregate_empty_scope);
    sqlite_test!(test_filter_values_are_bound);
    sqlite_test!(test_insert_records_empty);

    // Precomputed summaries
    sqlite_test!(test_precomputed_empty_before_rebuild);
    sqlite_test!(test_rebuild_summaries_counts);
    sqlite_test!(test_rebuild_summaries_empty_source);
    sqlite_test!(test_precomputed_channels_derived);
    sqlite_test!(test_precomputed_totals);
    sqlite_test!(test_precomputed_totals_single_channel);
    sqlite_test!(test_precomputed_monthly_ordered);
    sqlite_test!(test_precomputed_campaigns_by_channel);
    sqlite_test!(test_rebuild_summaries_replaces_contents);
}

// ============================================================================
// PostgreSQL Tests - Require Docker, run with `cargo test -- --ignored`
// ============================================================================

#[cfg(all(test, feature = "database-postgres"))]
mod postgres_tests {
    use super::*;
    use crate::db::{
        postgres::PostgresReportRepo,
        tests::harness::postgres::{create_isolated_postgres_pool, run_postgres_migrations},
    };

    macro_rules! postgres_test {
        ($name:ident) => {
            #[tokio::test]
            #[ignore = "Requires Docker - run with `cargo test -- --ignored`"]
            async fn $name() {
                let pool = create_isolated_postgres_pool().await;
                run_postgres_migrations(&pool).await;
                let repo = PostgresReportRepo::new(pool, None);
                super::$name(&repo).await;
            }
        };
    }

    // Raw aggregates
    postgres_test!(test_totals_empty);
    postgres_test!(test_totals_unfiltered);
    postgres_test!(test_totals_month_and_channel_scope);
    postgres_test!(test_totals_unknown_channel_is_zero);
    postgres_test!(test_aggregate_by_channel);
    postgres_test!(test_aggregate_by_month);
    postgres_test!(test_aggregate_by_month_channel_scope);
    postgres_test!(test_aggregate_by_campaign_carries_channel);
    postgres_test!(test_aggregate_empty_scope);
    postgres_test!(test_filter_values_are_bound);
    postgres_test!(test_insert_records_empty);

    // Precomputed summaries
    postgres_test!(test_precomputed_empty_before_rebuild);
    postgres_test!(test_rebuild_summaries_counts);
    postgres_test!(test_rebuild_summaries_empty_source);
    postgres_test!(test_precomputed_channels_derived);
    postgres_test!(test_precomputed_totals);
    postgres_test!(test_precomputed_totals_single_channel);
    postgres_test!(test_precomputed_monthly_ordered);
    postgres_test!(test_precomputed_campaigns_by_channel);
    postgres_test!(test_rebuild_summaries_replaces_contents);
}
