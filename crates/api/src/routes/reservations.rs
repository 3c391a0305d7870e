//! Reservation lifecycle endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use common::{ReservationId, SpaceId, UserId};
use domain::{
    Amendment, ElementLine, Reservation, ReservationEvent, ReservationStatus, TimeWindow,
};
use engine::{InMemoryRoleDirectory, ReservationEngine, SubmitReservation};
use reservation_store::{CatalogStore, ReservationQuery, ReservationStore};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::extract::ActorId;

/// Shared application state accessible from all handlers.
pub struct AppState<S>
where
    S: ReservationStore + CatalogStore,
{
    pub engine: ReservationEngine<S, InMemoryRoleDirectory>,
}

// -- Request types --

#[derive(Deserialize)]
pub struct SubmitRequest {
    pub space_id: SpaceId,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub motive: String,
    #[serde(default)]
    pub lines: Vec<ElementLine>,
}

/// Partial edit of a pending reservation. A new window needs all of
/// `date`, `start_time` and `end_time`.
#[derive(Deserialize)]
pub struct AmendRequest {
    pub date: Option<NaiveDate>,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub motive: Option<String>,
    pub lines: Option<Vec<ElementLine>>,
}

#[derive(Deserialize)]
pub struct RejectRequest {
    #[serde(default)]
    pub reason: String,
}

#[derive(Deserialize, Default)]
pub struct CancelRequest {
    #[serde(default)]
    pub force: bool,
}

#[derive(Deserialize)]
pub struct ListParams {
    pub space_id: Option<SpaceId>,
    pub status: Option<ReservationStatus>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

// -- Response types --

#[derive(Serialize)]
pub struct ReservationResponse {
    pub id: ReservationId,
    pub space_id: SpaceId,
    pub requester_id: UserId,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub motive: String,
    pub status: ReservationStatus,
    pub rejection_reason: Option<String>,
    pub lines: Vec<ElementLine>,
    pub reviewed_by: Option<UserId>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub cancelled_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub version: i64,
}

impl From<&Reservation> for ReservationResponse {
    fn from(r: &Reservation) -> Self {
        let window = r.window();
        Self {
            id: r.id(),
            space_id: r.space_id(),
            requester_id: r.requester_id(),
            date: window.date(),
            start_time: window.start(),
            end_time: window.end(),
            motive: r.motive().to_string(),
            status: r.status(),
            rejection_reason: r.rejection_reason().map(String::from),
            lines: r.lines().to_vec(),
            reviewed_by: r.reviewed_by(),
            reviewed_at: r.reviewed_at(),
            cancelled_by: r.cancelled_by(),
            created_at: r.created_at(),
            updated_at: r.updated_at(),
            version: r.version().as_i64(),
        }
    }
}

/// One history entry.
#[derive(Serialize)]
pub struct EventResponse {
    pub sequence: i64,
    pub event_type: String,
    pub actor: UserId,
    pub occurred_at: String,
    pub payload: serde_json::Value,
}

impl TryFrom<&ReservationEvent> for EventResponse {
    type Error = serde_json::Error;

    fn try_from(e: &ReservationEvent) -> Result<Self, Self::Error> {
        Ok(Self {
            sequence: e.sequence.as_i64(),
            event_type: e.event_type().to_string(),
            actor: e.actor,
            occurred_at: e.occurred_at.to_rfc3339(),
            payload: serde_json::to_value(&e.kind)?,
        })
    }
}

fn respond(reservation: &Reservation) -> Json<ReservationResponse> {
    Json(ReservationResponse::from(reservation))
}

fn respond_all(reservations: &[Reservation]) -> Json<Vec<ReservationResponse>> {
    Json(reservations.iter().map(ReservationResponse::from).collect())
}

// -- Handlers --

/// POST /reservations: submit a reservation for the calling user.
#[tracing::instrument(skip(state, req))]
pub async fn submit<S: ReservationStore + CatalogStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    ActorId(actor): ActorId,
    Json(req): Json<SubmitRequest>,
) -> Result<(StatusCode, Json<ReservationResponse>), ApiError> {
    let command = SubmitReservation {
        space_id: req.space_id,
        requester_id: actor,
        date: req.date,
        start_time: req.start_time,
        end_time: req.end_time,
        motive: req.motive,
        lines: req.lines,
    };
    let reservation = state.engine.submit(command).await?;
    Ok((StatusCode::CREATED, respond(&reservation)))
}

/// GET /reservations: list reservations visible to the caller.
#[tracing::instrument(skip(state, params))]
pub async fn list<S: ReservationStore + CatalogStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    ActorId(actor): ActorId,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<ReservationResponse>>, ApiError> {
    let query = ReservationQuery {
        space_id: params.space_id,
        requester_id: None,
        statuses: params.status.map(|s| vec![s]),
        from_date: params.from,
        to_date: params.to,
        limit: params.limit,
        offset: params.offset,
    };
    let reservations = state.engine.list_reservations(actor, query).await?;
    Ok(respond_all(&reservations))
}

/// GET /reservations/pending: the approval queue.
#[tracing::instrument(skip(state))]
pub async fn pending<S: ReservationStore + CatalogStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    ActorId(actor): ActorId,
) -> Result<Json<Vec<ReservationResponse>>, ApiError> {
    let queue = state.engine.pending(actor).await?;
    Ok(respond_all(&queue))
}

/// GET /reservations/{id}
#[tracing::instrument(skip(state))]
pub async fn get<S: ReservationStore + CatalogStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    ActorId(actor): ActorId,
    Path(id): Path<ReservationId>,
) -> Result<Json<ReservationResponse>, ApiError> {
    let reservation = state.engine.get(id, actor).await?;
    Ok(respond(&reservation))
}

/// PATCH /reservations/{id}: amend a pending reservation.
#[tracing::instrument(skip(state, req))]
pub async fn amend<S: ReservationStore + CatalogStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    ActorId(actor): ActorId,
    Path(id): Path<ReservationId>,
    Json(req): Json<AmendRequest>,
) -> Result<Json<ReservationResponse>, ApiError> {
    let window = match (req.date, req.start_time, req.end_time) {
        (None, None, None) => None,
        (Some(date), Some(start), Some(end)) => Some(TimeWindow::new(date, start, end)?),
        _ => {
            return Err(ApiError::BadRequest(
                "date, start_time and end_time must be changed together".to_string(),
            ));
        }
    };
    let amendment = Amendment {
        window,
        motive: req.motive,
        lines: req.lines,
    };
    let reservation = state.engine.amend(id, actor, amendment).await?;
    Ok(respond(&reservation))
}

/// GET /reservations/{id}/history: the event trail.
#[tracing::instrument(skip(state))]
pub async fn history<S: ReservationStore + CatalogStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    ActorId(actor): ActorId,
    Path(id): Path<ReservationId>,
) -> Result<Json<Vec<EventResponse>>, ApiError> {
    let events = state.engine.history(id, actor).await?;
    let responses = events
        .iter()
        .map(EventResponse::try_from)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok(Json(responses))
}

/// POST /reservations/{id}/approve
#[tracing::instrument(skip(state))]
pub async fn approve<S: ReservationStore + CatalogStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    ActorId(actor): ActorId,
    Path(id): Path<ReservationId>,
) -> Result<Json<ReservationResponse>, ApiError> {
    let reservation = state.engine.approve(id, actor).await?;
    Ok(respond(&reservation))
}

/// POST /reservations/{id}/reject: body `{"reason": "..."}`.
#[tracing::instrument(skip(state, req))]
pub async fn reject<S: ReservationStore + CatalogStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    ActorId(actor): ActorId,
    Path(id): Path<ReservationId>,
    Json(req): Json<RejectRequest>,
) -> Result<Json<ReservationResponse>, ApiError> {
    let reservation = state.engine.reject(id, actor, &req.reason).await?;
    Ok(respond(&reservation))
}

/// POST /reservations/{id}/cancel: optional body `{"force": true}`.
#[tracing::instrument(skip(state, req))]
pub async fn cancel<S: ReservationStore + CatalogStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    ActorId(actor): ActorId,
    Path(id): Path<ReservationId>,
    req: Option<Json<CancelRequest>>,
) -> Result<Json<ReservationResponse>, ApiError> {
    let force = req.map(|Json(r)| r.force).unwrap_or_default();
    let reservation = state.engine.cancel(id, actor, force).await?;
    Ok(respond(&reservation))
}
