//! Read-only schedule checks for the presentation layer.
//!
//! Results are advisory; submit and approve re-validate.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Query, State};
use chrono::{NaiveDate, NaiveTime};
use common::{ReservationId, SpaceId};
use domain::{AvailabilityReport, ElementLine, StockReport, TimeWindow};
use reservation_store::{CatalogStore, ReservationStore};
use serde::Deserialize;

use crate::error::ApiError;
use crate::routes::reservations::AppState;

#[derive(Debug, Deserialize)]
pub struct AvailabilityParams {
    pub space_id: SpaceId,
    pub date: NaiveDate,
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub exclude: Option<ReservationId>,
}

#[derive(Deserialize)]
pub struct StockRequest {
    pub date: NaiveDate,
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub lines: Vec<ElementLine>,
    pub exclude: Option<ReservationId>,
}

/// GET /availability?space_id&date&start&end[&exclude]
#[tracing::instrument(skip(state))]
pub async fn space<S: ReservationStore + CatalogStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Query(params): Query<AvailabilityParams>,
) -> Result<Json<AvailabilityReport>, ApiError> {
    let window = TimeWindow::new(params.date, params.start, params.end)?;
    let report = state
        .engine
        .check_availability(params.space_id, window, params.exclude)
        .await?;
    Ok(Json(report))
}

/// POST /availability/stock: body `{date, start, end, lines, exclude?}`.
#[tracing::instrument(skip(state, req))]
pub async fn stock<S: ReservationStore + CatalogStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<StockRequest>,
) -> Result<Json<StockReport>, ApiError> {
    let window = TimeWindow::new(req.date, req.start, req.end)?;
    let report = state
        .engine
        .check_stock(&req.lines, window, req.exclude)
        .await?;
    Ok(Json(report))
}
