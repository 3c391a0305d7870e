//! Catalog read endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Query, State};
use domain::{Element, Space};
use reservation_store::{CatalogStore, ReservationStore};
use serde::Deserialize;

use crate::error::ApiError;
use crate::routes::reservations::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct SpaceParams {
    /// Only spaces currently accepting reservations.
    #[serde(default)]
    pub available: bool,
}

/// GET /spaces
#[tracing::instrument(skip(state))]
pub async fn spaces<S: ReservationStore + CatalogStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Query(params): Query<SpaceParams>,
) -> Result<Json<Vec<Space>>, ApiError> {
    Ok(Json(state.engine.spaces(params.available).await?))
}

/// GET /elements
#[tracing::instrument(skip(state))]
pub async fn elements<S: ReservationStore + CatalogStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<Element>>, ApiError> {
    Ok(Json(state.engine.elements().await?))
}
