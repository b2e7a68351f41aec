//! Aggregate SQL generation.
//!
//! Filter values never appear in the SQL text. They are returned alongside
//! the statement and bound positionally by the repository.

use crate::models::ReportScope;

/// SQL dialect differences that matter to the report queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Sqlite,
    Postgres,
}

impl Dialect {
    /// Positional placeholder for the 1-based parameter `index`.
    pub fn placeholder(self, index: usize) -> String {
        match self {
            Dialect::Sqlite => "?".to_string(),
            Dialect::Postgres => format!("${index}"),
        }
    }

    /// Expression yielding `YYYY-MM` for a date column.
    pub fn month_expr(self, column: &str) -> String {
        match self {
            Dialect::Sqlite => format!("strftime('%Y-%m', {column})"),
            Dialect::Postgres => format!("to_char({column}, 'YYYY-MM')"),
        }
    }

    fn float_sum(self, column: &str) -> String {
        format!("COALESCE(SUM({column}), 0.0)")
    }

    /// Postgres widens `SUM(bigint)` to numeric, so cast back.
    fn int_sum(self, column: &str) -> String {
        match self {
            Dialect::Sqlite => format!("COALESCE(SUM({column}), 0)"),
            Dialect::Postgres => format!("COALESCE(SUM({column}), 0)::BIGINT"),
        }
    }
}

/// Grouping applied to `marketing_data`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimension {
    Overall,
    Channel,
    Campaign,
    Month,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltQuery {
    pub sql: String,
    pub params: Vec<String>,
}

/// Conditionally built `WHERE` clause with positional parameters.
struct WhereClause {
    dialect: Dialect,
    conditions: Vec<String>,
    params: Vec<String>,
}

impl WhereClause {
    fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            conditions: Vec::new(),
            params: Vec::new(),
        }
    }

    fn eq(&mut self, expr: &str, value: Option<&str>) {
        if let Some(value) = value {
            let placeholder = self.dialect.placeholder(self.params.len() + 1);
            self.conditions.push(format!("{expr} = {placeholder}"));
            self.params.push(value.to_string());
        }
    }

    fn render(&self) -> String {
        if self.conditions.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.conditions.join(" AND "))
        }
    }
}

/// Builds every report query for one dialect.
#[derive(Debug, Clone, Copy)]
pub struct QueryBuilder {
    dialect: Dialect,
}

impl QueryBuilder {
    pub fn new(dialect: Dialect) -> Self {
        Self { dialect }
    }

    fn measures(&self) -> String {
        let d = self.dialect;
        format!(
            "{} AS total_spend, {} AS total_revenue, {} AS total_conversions, {} AS total_clicks, COUNT(*) AS record_count",
            d.float_sum("spend"),
            d.float_sum("revenue"),
            d.int_sum("conversions"),
            d.int_sum("clicks"),
        )
    }

    /// `SUM ... GROUP BY` over the raw records for `dimension`, scoped by
    /// month and channel equality.
    ///
    /// Every statement selects `total_spend`, `total_revenue`,
    /// `total_conversions`, `total_clicks` and `record_count`. Grouped
    /// statements add `group_key` and, for campaigns, `channel_key`.
    pub fn aggregate(&self, dimension: Dimension, scope: &ReportScope) -> BuiltQuery {
        let month_expr = self.dialect.month_expr("date");
        let mut clause = WhereClause::new(self.dialect);
        clause.eq(&month_expr, scope.month.as_ref().map(|m| m.as_str()));
        clause.eq("channel", scope.channel.as_deref());

        let measures = self.measures();
        let filter = clause.render();
        let sql = match dimension {
            Dimension::Overall => format!("SELECT {measures} FROM marketing_data{filter}"),
            Dimension::Channel => format!(
                "SELECT channel AS group_key, {measures} FROM marketing_data{filter} \
                 GROUP BY channel ORDER BY channel"
            ),
            Dimension::Campaign => format!(
                "SELECT campaign_name AS group_key, channel AS channel_key, {measures} \
                 FROM marketing_data{filter} \
                 GROUP BY campaign_name, channel ORDER BY campaign_name, channel"
            ),
            Dimension::Month => format!(
                "SELECT {month_expr} AS group_key, {measures} FROM marketing_data{filter} \
                 GROUP BY {month_expr} ORDER BY group_key"
            ),
        };

        BuiltQuery {
            sql,
            params: clause.params,
        }
    }

    /// Totals summed from the precomputed `channels` table, optionally for a
    /// single channel. Selects the same columns as [`Self::aggregate`] with
    /// `total_clicks` fixed at 0.
    pub fn precomputed_totals(&self, channel: Option<&str>) -> BuiltQuery {
        let d = self.dialect;
        let mut clause = WhereClause::new(d);
        clause.eq("name", channel);

        let sql = format!(
            "SELECT {} AS total_spend, {} AS total_revenue, {} AS total_conversions, \
             CAST(0 AS BIGINT) AS total_clicks, COUNT(*) AS record_count FROM channels{}",
            d.float_sum("total_spend"),
            d.float_sum("total_revenue"),
            d.int_sum("total_conversions"),
            clause.render(),
        );

        BuiltQuery {
            sql,
            params: clause.params,
        }
    }

    pub fn precomputed_channels(&self) -> BuiltQuery {
        BuiltQuery {
            sql: "SELECT name, total_spend, total_revenue, total_conversions, roas, cpa, cpc \
                  FROM channels ORDER BY id"
                .to_string(),
            params: Vec::new(),
        }
    }

    pub fn precomputed_monthly(&self) -> BuiltQuery {
        BuiltQuery {
            sql: "SELECT month, total_spend, total_revenue, total_conversions, roas \
                  FROM monthly_performance ORDER BY month"
                .to_string(),
            params: Vec::new(),
        }
    }

    pub fn precomputed_campaigns(&self, channel: Option<&str>) -> BuiltQuery {
        let mut clause = WhereClause::new(self.dialect);
        clause.eq("channel_name", channel);

        BuiltQuery {
            sql: format!(
                "SELECT campaign_name, channel_name, total_spend, total_revenue, conversions, roas \
                 FROM campaigns{} ORDER BY id",
                clause.render()
            ),
            params: clause.params,
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::models::Month;

    fn scope(month: Option<&str>, channel: Option<&str>) -> ReportScope {
        ReportScope {
            month: month.and_then(Month::parse),
            channel: channel.map(str::to_string),
        }
    }

    #[rstest]
    #[case(Dimension::Overall)]
    #[case(Dimension::Channel)]
    #[case(Dimension::Campaign)]
    #[case(Dimension::Month)]
    fn test_unfiltered_has_no_where(#[case] dimension: Dimension) {
        let query = QueryBuilder::new(Dialect::Sqlite).aggregate(dimension, &scope(None, None));
        assert!(!query.sql.contains("WHERE"));
        assert!(query.params.is_empty());
    }

    #[test]
    fn test_sqlite_filters_bind_values() {
        let query = QueryBuilder::new(Dialect::Sqlite)
            .aggregate(Dimension::Channel, &scope(Some("2024-02"), Some("SEO'; --")));
        assert!(query.sql.contains("WHERE strftime('%Y-%m', date) = ? AND channel = ?"));
        assert!(!query.sql.contains("2024-02"));
        assert!(!query.sql.contains("SEO"));
        assert_eq!(query.params, ["2024-02", "SEO'; --"]);
        assert!(query.sql.contains("GROUP BY channel"));
    }

    #[test]
    fn test_postgres_numbers_placeholders() {
        let query = QueryBuilder::new(Dialect::Postgres)
            .aggregate(Dimension::Campaign, &scope(Some("2024-02"), Some("Email")));
        assert!(
            query
                .sql
                .contains("WHERE to_char(date, 'YYYY-MM') = $1 AND channel = $2")
        );
        assert!(query.sql.contains("::BIGINT"));
        assert!(query.sql.contains("GROUP BY campaign_name, channel"));
        assert_eq!(query.params, ["2024-02", "Email"]);
    }

    #[test]
    fn test_postgres_channel_only_starts_at_one() {
        let query = QueryBuilder::new(Dialect::Postgres)
            .aggregate(Dimension::Month, &scope(None, Some("Email")));
        assert!(query.sql.contains("WHERE channel = $1"));
        assert!(query.sql.contains("GROUP BY to_char(date, 'YYYY-MM')"));
        assert_eq!(query.params, ["Email"]);
    }

    #[test]
    fn test_precomputed_queries() {
        let builder = QueryBuilder::new(Dialect::Postgres);

        let totals = builder.precomputed_totals(Some("SEO"));
        assert!(totals.sql.contains("FROM channels WHERE name = $1"));
        assert_eq!(totals.params, ["SEO"]);

        assert!(builder.precomputed_totals(None).params.is_empty());
        assert!(builder.precomputed_channels().sql.contains("FROM channels"));
        assert!(
            builder
                .precomputed_monthly()
                .sql
                .contains("FROM monthly_performance")
        );

        let campaigns = QueryBuilder::new(Dialect::Sqlite).precomputed_campaigns(Some("SEO"));
        assert!(campaigns.sql.contains("WHERE channel_name = ?"));
        assert_eq!(campaigns.params, ["SEO"]);
    }
}
