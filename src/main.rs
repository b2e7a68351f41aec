use std::{net::SocketAddr, path::PathBuf, sync::Arc, time::Duration};

use axum::{
    Router,
    extract::Request,
    response::{IntoResponse, Response},
    routing::get,
};
use clap::Parser;
use http::StatusCode;
use tower_http::{
    catch_panic::CatchPanicLayer,
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

mod config;
mod db;
mod middleware;
mod models;
mod observability;
mod reports;
mod routes;

use crate::{
    config::DashboardConfig,
    reports::{ReportService, SnapshotStore},
    routes::ApiError,
};

const DEFAULT_CONFIG_FILE: &str = "spendboard.toml";

#[derive(Clone)]
pub struct AppState {
    /// Absent when no database is configured; every report then comes from
    /// the snapshot.
    pub db: Option<Arc<db::DbPool>>,
    pub reports: ReportService,
}

impl AppState {
    pub async fn new(config: DashboardConfig) -> Result<Self, db::DbError> {
        let db = if config.database.is_none() {
            tracing::info!("No database configured, serving reports from the snapshot");
            None
        } else {
            let pool = db::DbPool::from_config(&config.database).await?;
            if config.database.run_migrations()
                && let Err(e) = pool.run_migrations().await
            {
                // Reports fall back to the snapshot until the schema exists
                tracing::error!(error = %e, "Database migrations failed");
            }
            Some(Arc::new(pool))
        };

        let reports = ReportService::new(
            db.as_ref().map(|db| db.reports()),
            SnapshotStore::new(config.snapshot.path.clone()),
        );

        Ok(Self { db, reports })
    }
}

/// CLI arguments for spendboard
#[derive(Parser, Debug)]
#[command(version, about = "Marketing spend reporting API", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to config file (defaults to ./spendboard.toml if it exists,
    /// otherwise built-in defaults)
    #[arg(short, long, global = true)]
    config: Option<String>,
}

#[derive(clap::Subcommand, Debug)]
enum Command {
    /// Start the API server (default)
    Serve,
    /// Run database migrations and exit
    ///
    /// Useful for init containers or CI/CD pipelines.
    Migrate,
    /// Recompute the channel, monthly and campaign summary tables from the
    /// raw records and exit
    RebuildSummaries,
    /// Parse and validate the configuration, then exit
    CheckConfig,
}

/// Resolve and load the configuration.
///
/// An explicit path must exist. Without one, `spendboard.toml` in the working
/// directory is used when present, otherwise the built-in defaults.
fn load_config(explicit_path: Option<&str>) -> Result<(DashboardConfig, Option<PathBuf>), String> {
    if let Some(path) = explicit_path {
        let path = PathBuf::from(path);
        if !path.exists() {
            return Err(format!("Config file not found: {}", path.display()));
        }
        let config = DashboardConfig::from_file(&path).map_err(|e| e.to_string())?;
        return Ok((config, Some(path)));
    }

    let cwd_config = PathBuf::from(DEFAULT_CONFIG_FILE);
    if cwd_config.exists() {
        let config = DashboardConfig::from_file(&cwd_config).map_err(|e| e.to_string())?;
        return Ok((config, Some(cwd_config)));
    }

    Ok((DashboardConfig::default(), None))
}

fn load_config_or_exit(explicit_path: Option<&str>) -> (DashboardConfig, Option<PathBuf>) {
    match load_config(explicit_path) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}

fn init_tracing_or_exit(config: &DashboardConfig) {
    if let Err(e) = observability::init_tracing(&config.observability) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn config_source(path: &Option<PathBuf>) -> String {
    path.as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "<built-in defaults>".to_string())
}

pub fn build_app(config: &DashboardConfig, state: AppState) -> Router {
    let mut app = Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/health/live", get(routes::health::liveness))
        .route("/health/ready", get(routes::health::readiness))
        .nest("/api", routes::report_routes());

    if config.observability.metrics.enabled {
        app = app.route(
            &config.observability.metrics.path,
            get(routes::health::metrics),
        );
    }

    app = app.layer(axum::middleware::from_fn(
        middleware::http_metrics_middleware,
    ));

    // Apply CORS layer if enabled
    if let Some(cors_layer) = config.server.cors.clone().into_layer() {
        app = app.layer(cors_layer);
    }

    // Layers run outermost-last: the request ID is assigned before the
    // trace span opens, so every log line for the request carries it.
    app.layer(TimeoutLayer::with_status_code(
        StatusCode::REQUEST_TIMEOUT,
        Duration::from_secs(config.server.timeout_secs),
    ))
    .layer(RequestBodyLimitLayer::new(config.server.body_limit_bytes))
    .layer(CatchPanicLayer::custom(handle_panic))
    .layer(PropagateRequestIdLayer::x_request_id())
    .layer(TraceLayer::new_for_http().make_span_with(|request: &Request| {
        let request_id = request
            .headers()
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("-");
        tracing::info_span!(
            "request",
            request_id,
            method = %request.method(),
            path = %request.uri().path(),
        )
    }))
    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    .with_state(state)
}

fn handle_panic(err: Box<dyn std::any::Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic payload".to_string()
    };
    ApiError::Internal(format!("handler panicked: {detail}")).into_response()
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    match args.command {
        Some(Command::Migrate) => run_migrate(args.config.as_deref()).await,
        Some(Command::RebuildSummaries) => run_rebuild_summaries(args.config.as_deref()).await,
        Some(Command::CheckConfig) => run_check_config(args.config.as_deref()),
        Some(Command::Serve) | None => run_server(args.config.as_deref()).await,
    }
}

async fn run_server(explicit_config_path: Option<&str>) {
    let (config, config_path) = load_config_or_exit(explicit_config_path);
    init_tracing_or_exit(&config);

    if let Err(e) = observability::metrics::init_metrics(&config.observability.metrics) {
        tracing::warn!(error = %e, "Failed to initialize metrics");
    }

    tracing::info!(
        config_file = %config_source(&config_path),
        snapshot = %config.snapshot.path.display(),
        "Starting spendboard"
    );

    let state = match AppState::new(config.clone()).await {
        Ok(state) => state,
        Err(e) => {
            tracing::error!(error = %e, "Failed to initialize application state");
            std::process::exit(1);
        }
    };
    let db = state.db.clone();
    let app = build_app(&config, state);

    let bind_addr = SocketAddr::new(config.server.host, config.server.port);
    let listener = match tokio::net::TcpListener::bind(bind_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(error = %e, address = %bind_addr, "Failed to bind to address");
            std::process::exit(1);
        }
    };

    tracing::info!("Server listening on http://{}", bind_addr);

    // Graceful shutdown: wait for SIGINT/SIGTERM, then drain in-flight requests
    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!(error = %e, "Server error");
    }

    if let Some(db) = db {
        db.close().await;
    }
    tracing::info!("Shutdown complete");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, draining in-flight requests");
}

/// Connect to the configured database or exit with a message.
async fn connect_or_exit(config: &DashboardConfig, action: &str) -> db::DbPool {
    if config.database.is_none() {
        eprintln!("Error: Database is not configured. Nothing to {action}.");
        std::process::exit(1);
    }

    match db::DbPool::from_config(&config.database).await {
        Ok(pool) => pool,
        Err(e) => {
            tracing::error!(error = %e, "Failed to connect to database");
            eprintln!("Error: Failed to connect to database: {e}");
            std::process::exit(1);
        }
    }
}

async fn run_migrate(explicit_config_path: Option<&str>) {
    let (config, config_path) = load_config_or_exit(explicit_config_path);
    init_tracing_or_exit(&config);

    tracing::info!(
        config_file = %config_source(&config_path),
        "Running database migrations"
    );

    let pool = connect_or_exit(&config, "migrate").await;
    match pool.run_migrations().await {
        Ok(()) => {
            tracing::info!("Database migrations completed successfully");
        }
        Err(e) => {
            tracing::error!(error = %e, "Database migrations failed");
            eprintln!("Error: Database migrations failed: {e}");
            std::process::exit(1);
        }
    }
}

async fn run_rebuild_summaries(explicit_config_path: Option<&str>) {
    let (config, config_path) = load_config_or_exit(explicit_config_path);
    init_tracing_or_exit(&config);

    tracing::info!(
        config_file = %config_source(&config_path),
        "Rebuilding summary tables"
    );

    let pool = connect_or_exit(&config, "rebuild").await;
    match pool.reports().rebuild_summaries().await {
        Ok(counts) => {
            tracing::info!(
                channels = counts.channels,
                months = counts.months,
                campaigns = counts.campaigns,
                "Summary tables rebuilt"
            );
            println!("{}", rebuild_report(&counts));
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to rebuild summary tables");
            eprintln!("Error: Failed to rebuild summary tables: {e}");
            std::process::exit(1);
        }
    }
}

fn rebuild_report(counts: &db::SummaryCounts) -> String {
    format!(
        "Summary tables rebuilt\n  channels:  {}\n  months:    {}\n  campaigns: {}",
        counts.channels, counts.months, counts.campaigns
    )
}

fn run_check_config(explicit_config_path: Option<&str>) {
    let (config, config_path) = load_config_or_exit(explicit_config_path);

    println!("Configuration OK: {}", config_source(&config_path));
    println!(
        "  listen:   {}:{}",
        config.server.host, config.server.port
    );
    println!("  database: {}", config.database.kind());
    println!("  snapshot: {}", config.snapshot.path.display());
}
