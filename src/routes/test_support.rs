//! Shared harness for HTTP route tests.

use axum::{Router, body::Body};
use chrono::NaiveDate;
use http::{Request, StatusCode, header};
use serde_json::Value;
use tower::ServiceExt;

use crate::{AppState, build_app, config::DashboardConfig, models::RawRecord};

/// Snapshot document used by fallback tests.
pub const SNAPSHOT: &str = r#"{
    "overall": {
        "total_spend": 5000.0,
        "total_revenue": 15000.0,
        "total_conversions": 100,
        "total_clicks": 2500,
        "overall_roas": 3.0,
        "overall_cpa": 50.0,
        "overall_cpc": 2.0
    },
    "channels": [
        {"channel": "SEO", "spend": 1000, "revenue": 4000, "conversions": 20, "roas": 4.0, "cpa": 50, "cpc": 2},
        {"channel": "Email", "spend": 500, "revenue": 600, "conversions": 5, "roas": 1.2, "cpa": 100, "cpc": 1}
    ],
    "monthly": [
        {"month": "2024-01", "spend": 1000, "revenue": 3000, "conversions": 20, "roas": 3.0},
        {"month": "2024-02", "spend": 1500, "revenue": 3000, "conversions": 30, "roas": 2.0}
    ],
    "campaigns": [
        {"campaign": "Brand", "channel": "SEO", "spend": 400, "revenue": 2000, "conversions": 8, "roas": 5.0}
    ],
    "insights": ["SEO has the best ROAS"],
    "generated_at": "2024-03-01T00:00:00Z"
}"#;

/// A router plus the state behind it. Holds the snapshot directory open for
/// the lifetime of the test.
pub struct TestApp {
    pub app: Router,
    pub state: AppState,
    _dir: tempfile::TempDir,
}

/// Database section of a test config.
pub enum TestDb {
    None,
    /// Fresh in-memory SQLite database.
    #[cfg(feature = "database-sqlite")]
    Sqlite { migrate: bool },
}

pub async fn test_app(db: TestDb, snapshot: Option<&str>) -> TestApp {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    let dir = tempfile::tempdir().unwrap();
    let snapshot_path = dir.path().join("summary_data.json");
    if let Some(contents) = snapshot {
        std::fs::write(&snapshot_path, contents).unwrap();
    }

    let database = match db {
        TestDb::None => String::new(),
        #[cfg(feature = "database-sqlite")]
        TestDb::Sqlite { migrate } => {
            use std::sync::atomic::{AtomicU64, Ordering};

            static COUNTER: AtomicU64 = AtomicU64::new(0);
            let db_id = COUNTER.fetch_add(1, Ordering::SeqCst);
            format!(
                r#"
[database]
type = "sqlite"
path = "file:test_routes_db_{db_id}?mode=memory&cache=shared"
create_if_missing = true
run_migrations = {migrate}
wal_mode = false
"#
            )
        }
    };
    let config_str = format!(
        r#"
{database}
[snapshot]
path = "{}"
"#,
        snapshot_path.display()
    );

    let config = DashboardConfig::from_str(&config_str).expect("Failed to parse test config");
    let state = AppState::new(config.clone())
        .await
        .expect("Failed to create AppState");
    TestApp {
        app: build_app(&config, state.clone()),
        state,
        _dir: dir,
    }
}

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
        date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
        channel: channel.into(),
        campaign_name: campaign.into(),
        spend,
        impressions: clicks * 10,
        clicks,
        conversions,
        revenue,
    }
}

/// Raw records spanning two months and two channels.
///
/// | month   | channel     | spend | revenue | clicks | conv |
/// |---------|-------------|-------|---------|--------|------|
/// | 2024-01 | SEO         | 400   | 1600    | 200    | 10   |
/// | 2024-01 | Paid Search | 600   | 900     | 300    | 6    |
/// | 2024-02 | SEO         | 600   | 2400    | 300    | 10   |
/// | 2024-02 | Paid Search | 900   | 1800    | 450    | 9    |
pub fn sample_records() -> Vec<RawRecord> {
    vec![
        record("2024-01-05", "SEO", "Brand", 400.0, 200, 10, 1600.0),
        record("2024-01-20", "Paid Search", "Generic", 600.0, 300, 6, 900.0),
        record("2024-02-03", "SEO", "Brand", 600.0, 300, 10, 2400.0),
        record("2024-02-14", "Paid Search", "Generic", 900.0, 450, 9, 1800.0),
    ]
}

pub async fn get_json(app: &Router, uri: &str) -> (StatusCode, Value) {
    let (status, _, body) = get_with_headers(app, uri).await;
    (status, body)
}

pub async fn get_with_headers(app: &Router, uri: &str) -> (StatusCode, http::HeaderMap, Value) {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, headers, json)
}

pub async fn post_json(app: &Router, uri: &str, body: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

pub async fn get_raw(app: &Router, uri: &str) -> (StatusCode, String) {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, String::from_utf8_lossy(&body).to_string())
}
