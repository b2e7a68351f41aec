//! Report endpoints served under `/api`.
//!
//! Every handler delegates to [`ReportService`](crate::reports::ReportService)
//! and tags the response with an `X-Report-Source` header naming the source
//! that produced it (`live`, `precomputed`, `snapshot` or `none`).

use axum::{
    Json, Router,
    extract::{Query, State, rejection::JsonRejection},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use http::HeaderValue;
use serde::Serialize;

use super::error::ApiError;
use crate::{
    AppState,
    models::SimulationRequest,
    reports::{ReportParams, Sourced},
};

pub const REPORT_SOURCE_HEADER: &str = "x-report-source";

pub fn report_routes() -> Router<AppState> {
    Router::new()
        .route("/summary", get(summary))
        .route("/channels", get(channels))
        .route("/monthly", get(monthly))
        .route("/monthly/highlights", get(monthly_highlights))
        .route("/campaigns", get(campaigns))
        .route("/insights", get(insights))
        .route("/simulate", post(simulate))
}

fn sourced<T: Serialize>(report: Sourced<T>) -> Response {
    let mut response = Json(report.data).into_response();
    response.headers_mut().insert(
        REPORT_SOURCE_HEADER,
        HeaderValue::from_static(report.source.as_str()),
    );
    response
}

/// Overall totals, optionally scoped to a month and/or channel.
#[tracing::instrument(name = "reports.summary", skip(state))]
pub async fn summary(
    State(state): State<AppState>,
    Query(params): Query<ReportParams>,
) -> Result<Response, ApiError> {
    let report = state.reports.summary(&params.scope()).await?;
    Ok(sourced(report))
}

#[tracing::instrument(name = "reports.channels", skip(state))]
pub async fn channels(
    State(state): State<AppState>,
    Query(params): Query<ReportParams>,
) -> Response {
    sourced(state.reports.channels(&params).await)
}

#[tracing::instrument(name = "reports.monthly", skip(state))]
pub async fn monthly(
    State(state): State<AppState>,
    Query(params): Query<ReportParams>,
) -> Response {
    sourced(state.reports.monthly(&params.scope()).await)
}

#[tracing::instrument(name = "reports.monthly_highlights", skip(state))]
pub async fn monthly_highlights(
    State(state): State<AppState>,
    Query(params): Query<ReportParams>,
) -> Response {
    let scope = params.scope();
    sourced(state.reports.highlights(scope.channel.as_deref()).await)
}

#[tracing::instrument(name = "reports.campaigns", skip(state))]
pub async fn campaigns(
    State(state): State<AppState>,
    Query(params): Query<ReportParams>,
) -> Response {
    sourced(state.reports.campaigns(&params).await)
}

/// Insight strings from the snapshot, or a placeholder when there are none.
#[tracing::instrument(name = "reports.insights", skip(state))]
pub async fn insights(State(state): State<AppState>) -> Response {
    sourced(state.reports.insights().await)
}

/// Project revenue for a proposed per-channel budget.
#[tracing::instrument(name = "reports.simulate", skip(state, payload))]
pub async fn simulate(
    State(state): State<AppState>,
    payload: Result<Json<SimulationRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = payload?;
    let simulation = state.reports.simulate(&request).await?;
    Ok(sourced(simulation))
}
