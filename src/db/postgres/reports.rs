use async_trait::async_trait;
use sqlx::{PgPool, Row, postgres::PgRow};

use crate::{
    db::{
        error::DbResult,
        query::{BuiltQuery, Dialect, Dimension, QueryBuilder},
        repos::{ReportRepo, SummaryCounts, SummaryRows},
    },
    models::{
        AggregateRow, CampaignAggregate, ChannelAggregate, MonthlyAggregate, RawRecord,
        ReportScope,
    },
};

pub struct PostgresReportRepo {
    write_pool: PgPool,
    read_pool: PgPool,
    queries: QueryBuilder,
}

impl PostgresReportRepo {
    pub fn new(write_pool: PgPool, read_pool: Option<PgPool>) -> Self {
        let read_pool = read_pool.unwrap_or_else(|| write_pool.clone());
        Self {
            write_pool,
            read_pool,
            queries: QueryBuilder::new(Dialect::Postgres),
        }
    }

    async fn fetch_all(&self, built: &BuiltQuery) -> DbResult<Vec<PgRow>> {
        let mut query = sqlx::query(&built.sql);
        for param in &built.params {
            query = query.bind(param);
        }
        Ok(query.fetch_all(&self.read_pool).await?)
    }

    async fn fetch_one(&self, built: &BuiltQuery) -> DbResult<PgRow> {
        let mut query = sqlx::query(&built.sql);
        for param in &built.params {
            query = query.bind(param);
        }
        Ok(query.fetch_one(&self.read_pool).await?)
    }

    fn aggregate_row(row: &PgRow, dimension: Dimension) -> Result<AggregateRow, sqlx::Error> {
        let key = match dimension {
            Dimension::Overall => String::new(),
            _ => row.try_get("group_key")?,
        };
        let channel = match dimension {
            Dimension::Campaign => Some(row.try_get("channel_key")?),
            _ => None,
        };
        Ok(AggregateRow {
            key,
            channel,
            total_spend: row.try_get("total_spend")?,
            total_revenue: row.try_get("total_revenue")?,
            total_conversions: row.try_get("total_conversions")?,
            total_clicks: row.try_get("total_clicks")?,
            record_count: row.try_get("record_count")?,
        })
    }
}

#[async_trait]
impl ReportRepo for PostgresReportRepo {
    async fn totals(&self, scope: &ReportScope) -> DbResult<AggregateRow> {
        let built = self.queries.aggregate(Dimension::Overall, scope);
        let row = self.fetch_one(&built).await?;
        Ok(Self::aggregate_row(&row, Dimension::Overall)?)
    }

    async fn aggregate(
        &self,
        dimension: Dimension,
        scope: &ReportScope,
    ) -> DbResult<Vec<AggregateRow>> {
        let built = self.queries.aggregate(dimension, scope);
        let rows = self.fetch_all(&built).await?;
        rows.iter()
            .map(|row| Self::aggregate_row(row, dimension).map_err(Into::into))
            .collect()
    }

    async fn precomputed_totals(&self, channel: Option<&str>) -> DbResult<AggregateRow> {
        let built = self.queries.precomputed_totals(channel);
        let row = self.fetch_one(&built).await?;
        Ok(Self::aggregate_row(&row, Dimension::Overall)?)
    }

    async fn precomputed_channels(&self) -> DbResult<Vec<ChannelAggregate>> {
        let rows = self.fetch_all(&self.queries.precomputed_channels()).await?;
        rows.iter()
            .map(|row| -> DbResult<ChannelAggregate> {
                Ok(ChannelAggregate {
                    name: row.try_get("name")?,
                    total_spend: row.try_get("total_spend")?,
                    total_revenue: row.try_get("total_revenue")?,
                    total_conversions: row.try_get("total_conversions")?,
                    total_clicks: 0,
                    roas: row.try_get("roas")?,
                    cpa: row.try_get("cpa")?,
                    cpc: row.try_get("cpc")?,
                })
            })
            .collect()
    }

    async fn precomputed_monthly(&self) -> DbResult<Vec<MonthlyAggregate>> {
        let rows = self.fetch_all(&self.queries.precomputed_monthly()).await?;
        rows.iter()
            .map(|row| -> DbResult<MonthlyAggregate> {
                Ok(MonthlyAggregate {
                    month: row.try_get("month")?,
                    total_spend: row.try_get("total_spend")?,
                    total_revenue: row.try_get("total_revenue")?,
                    total_conversions: row.try_get("total_conversions")?,
                    roas: row.try_get("roas")?,
                    mom_spend_growth: 0.0,
                    mom_revenue_growth: 0.0,
                })
            })
            .collect()
    }

    async fn precomputed_campaigns(
        &self,
        channel: Option<&str>,
    ) -> DbResult<Vec<CampaignAggregate>> {
        let rows = self
            .fetch_all(&self.queries.precomputed_campaigns(channel))
            .await?;
        rows.iter()
            .map(|row| -> DbResult<CampaignAggregate> {
                Ok(CampaignAggregate {
                    campaign_name: row.try_get("campaign_name")?,
                    channel_name: row.try_get("channel_name")?,
                    total_spend: row.try_get("total_spend")?,
                    total_revenue: row.try_get("total_revenue")?,
                    conversions: row.try_get("conversions")?,
                    roas: row.try_get("roas")?,
                })
            })
            .collect()
    }

    async fn insert_records(&self, records: &[RawRecord]) -> DbResult<usize> {
        if records.is_empty() {
            return Ok(0);
        }

        let mut tx = self.write_pool.begin().await?;
        for record in records {
            sqlx::query(
                r#"
                INSERT INTO marketing_data (
                    date, channel, campaign_name, spend, impressions, clicks, conversions, revenue
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                "#,
            )
            .bind(record.date)
            .bind(&record.channel)
            .bind(&record.campaign_name)
            .bind(record.spend)
            .bind(record.impressions)
            .bind(record.clicks)
            .bind(record.conversions)
            .bind(record.revenue)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        Ok(records.len())
    }

    async fn rebuild_summaries(&self) -> DbResult<SummaryCounts> {
        let rows = SummaryRows::collect(self).await?;

        let mut tx = self.write_pool.begin().await?;
        sqlx::query("TRUNCATE channels, monthly_performance, campaigns RESTART IDENTITY")
            .execute(&mut *tx)
            .await?;

        for channel in &rows.channels {
            sqlx::query(
                r#"
                INSERT INTO channels (
                    name, total_spend, total_revenue, total_conversions, roas, cpa, cpc
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(&channel.name)
            .bind(channel.total_spend)
            .bind(channel.total_revenue)
            .bind(channel.total_conversions)
            .bind(channel.roas)
            .bind(channel.cpa)
            .bind(channel.cpc)
            .execute(&mut *tx)
            .await?;
        }

        for month in &rows.monthly {
            sqlx::query(
                r#"
                INSERT INTO monthly_performance (
                    month, total_spend, total_revenue, total_conversions, roas
                )
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(&month.month)
            .bind(month.total_spend)
            .bind(month.total_revenue)
            .bind(month.total_conversions)
            .bind(month.roas)
            .execute(&mut *tx)
            .await?;
        }

        for campaign in &rows.campaigns {
            sqlx::query(
                r#"
                INSERT INTO campaigns (
                    campaign_name, channel_name, total_spend, total_revenue, conversions, roas
                )
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(&campaign.campaign_name)
            .bind(&campaign.channel_name)
            .bind(campaign.total_spend)
            .bind(campaign.total_revenue)
            .bind(campaign.conversions)
            .bind(campaign.roas)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(rows.counts())
    }
}
