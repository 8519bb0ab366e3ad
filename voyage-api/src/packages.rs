use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use voyage_booking::{AvailabilityOutcome, BookingDraft, CartItem, DraftEvent, DraftStage};
use voyage_catalog::{PackageOption, PriceBreakdown, SlotTime};
use crate::error::AppError;
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct DateQuery {
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
pub struct OptionsResponse {
    pub package_id: Uuid,
    pub date: Option<NaiveDate>,
    pub options: Vec<PackageOption>,
}

#[derive(Debug, Serialize)]
pub struct TimesResponse {
    pub option_id: Uuid,
    pub date: Option<NaiveDate>,
    pub times: Vec<SlotTime>,
}

#[derive(Debug, Serialize)]
pub struct AvailabilityResponse {
    pub outcome: AvailabilityOutcome,
    pub draft: BookingDraft,
    pub stage: DraftStage,
}

#[derive(Debug, Deserialize)]
pub struct DraftEventsRequest {
    #[serde(default)]
    pub draft: BookingDraft,
    pub events: Vec<DraftEvent>,
}

#[derive(Debug, Serialize)]
pub struct DraftResponse {
    pub draft: BookingDraft,
    pub stage: DraftStage,
}

// ============================================================================
// Handlers
// ============================================================================

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/packages/{id}/options", get(list_options))
        .route("/v1/packages/{id}/options/{option_id}/times", get(list_times))
        .route("/v1/packages/{id}/availability", post(check_availability))
        .route("/v1/packages/{id}/price", post(price_draft))
        .route("/v1/packages/{id}/cart", post(add_to_cart))
        .route("/v1/drafts/events", post(apply_draft_events))
}

/// GET /v1/packages/{id}/options?date=
/// Options orderable on the date; every option when no date is given.
pub async fn list_options(
    State(state): State<AppState>,
    Path(package_id): Path<Uuid>,
    Query(query): Query<DateQuery>,
) -> Result<Json<OptionsResponse>, AppError> {
    let options = state
        .engine
        .visible_options(package_id, query.date, state.today())
        .await?;

    Ok(Json(OptionsResponse {
        package_id,
        date: query.date,
        options,
    }))
}

/// GET /v1/packages/{id}/options/{option_id}/times?date=
pub async fn list_times(
    State(state): State<AppState>,
    Path((package_id, option_id)): Path<(Uuid, Uuid)>,
    Query(query): Query<DateQuery>,
) -> Result<Json<TimesResponse>, AppError> {
    let times = state
        .engine
        .candidate_times(package_id, option_id, query.date, state.today())
        .await?;

    Ok(Json(TimesResponse {
        option_id,
        date: query.date,
        times,
    }))
}

/// POST /v1/packages/{id}/availability
/// Checks the draft's selection. The returned draft is confirmed only when
/// the outcome is available.
pub async fn check_availability(
    State(state): State<AppState>,
    Path(package_id): Path<Uuid>,
    Json(draft): Json<BookingDraft>,
) -> Result<Json<AvailabilityResponse>, AppError> {
    let check = state
        .engine
        .check_availability(package_id, draft, state.today())
        .await?;

    tracing::debug!(%package_id, available = check.outcome.is_available(), "availability checked");

    let stage = check.draft.stage();
    Ok(Json(AvailabilityResponse {
        outcome: check.outcome,
        draft: check.draft,
        stage,
    }))
}

/// POST /v1/packages/{id}/price
pub async fn price_draft(
    State(state): State<AppState>,
    Path(package_id): Path<Uuid>,
    Json(draft): Json<BookingDraft>,
) -> Result<Json<PriceBreakdown>, AppError> {
    let price = state
        .engine
        .price_draft(package_id, &draft, state.today())
        .await?;
    Ok(Json(price))
}

/// POST /v1/packages/{id}/cart
/// Reserves the seats of a confirmed draft.
pub async fn add_to_cart(
    State(state): State<AppState>,
    Path(package_id): Path<Uuid>,
    Json(draft): Json<BookingDraft>,
) -> Result<(StatusCode, Json<CartItem>), AppError> {
    let item = state
        .engine
        .commit(package_id, &draft, state.today())
        .await?;
    Ok((StatusCode::CREATED, Json(item)))
}

/// POST /v1/drafts/events
/// Replays selection changes on a draft without touching inventory.
pub async fn apply_draft_events(
    Json(req): Json<DraftEventsRequest>,
) -> Result<Json<DraftResponse>, AppError> {
    let draft = req.draft.apply_all(req.events)?;
    let stage = draft.stage();
    Ok(Json(DraftResponse { draft, stage }))
}
