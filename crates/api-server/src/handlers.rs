//! Axum REST handlers for the pacing report API.

use crate::models::*;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{NaiveDate, Utc};
use pacing_core::config::AppConfig;
use pacing_core::config::EngineSettings;
use pacing_core::PacingError;
use pacing_engine::report::{OpportunityFilter, PacingReport};
use pacing_engine::snapshot::AllocationRange;
use pacing_store::HierarchyStore;
use std::sync::Arc;
use uuid::Uuid;

/// Shared API state.
#[derive(Clone)]
pub struct PacingState {
    pub store: Arc<HierarchyStore>,
    pub settings: EngineSettings,
    pub token: String,
}

impl PacingState {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            store: Arc::new(HierarchyStore::new()),
            settings: config.engine.clone(),
            token: config.api.token.clone(),
        }
    }
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn into_api_error(err: PacingError) -> ApiError {
    let (status, code) = match &err {
        PacingError::InvalidPeriod(_) => (StatusCode::BAD_REQUEST, "invalid_period"),
        PacingError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_failed"),
        PacingError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
        PacingError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "unauthorized"),
        _ => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
    };
    (
        status,
        Json(ErrorResponse {
            error: code.to_string(),
            message: err.to_string(),
        }),
    )
}

fn report_for(state: &PacingState, today: Option<NaiveDate>) -> PacingReport {
    // The engine never reads the clock; the edge supplies today.
    let today = today.unwrap_or_else(|| Utc::now().date_naive());
    PacingReport::new(today, state.settings.clone())
}

// ─── Health ─────────────────────────────────────────────────────────────────

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        service: "pacing-report",
    })
}

// ─── Reports ────────────────────────────────────────────────────────────────

pub async fn list_opportunities(
    State(state): State<PacingState>,
    Query(query): Query<OpportunitiesQuery>,
) -> Result<Json<Vec<pacing_engine::OpportunitySummary>>, ApiError> {
    let mut filter = OpportunityFilter {
        start: query.start,
        end: query.end,
        search: query.search,
        ..OpportunityFilter::default()
    };
    if let Some(period) = &query.period {
        filter.period = Some(period.parse().map_err(into_api_error)?);
    }
    if let Some(ids) = &query.ids {
        let parsed: Result<Vec<Uuid>, _> =
            ids.split(',').map(|s| Uuid::parse_str(s.trim())).collect();
        filter.ids = Some(parsed.map_err(|_| {
            into_api_error(PacingError::validation("ids must be a comma-separated uuid list"))
        })?);
    }
    if let Some(status) = &query.status {
        filter.status = Some(status.parse().map_err(into_api_error)?);
    }

    let report = report_for(&state, query.today);
    report
        .get_opportunities(state.store.as_ref(), &filter)
        .map(Json)
        .map_err(into_api_error)
}

pub async fn list_placements(
    State(state): State<PacingState>,
    Path(id): Path<Uuid>,
    Query(query): Query<ReportQuery>,
) -> Result<Json<Vec<pacing_engine::PlacementSummary>>, ApiError> {
    let report = report_for(&state, query.today);
    report
        .get_placements(state.store.as_ref(), id)
        .map(Json)
        .map_err(into_api_error)
}

pub async fn list_flights(
    State(state): State<PacingState>,
    Path(id): Path<Uuid>,
    Query(query): Query<ReportQuery>,
) -> Result<Json<Vec<pacing_engine::FlightSummary>>, ApiError> {
    let report = report_for(&state, query.today);
    report
        .get_flights(state.store.as_ref(), id)
        .map(Json)
        .map_err(into_api_error)
}

pub async fn list_campaigns(
    State(state): State<PacingState>,
    Path(id): Path<Uuid>,
    Query(query): Query<ReportQuery>,
) -> Result<Json<Vec<pacing_engine::CampaignSummary>>, ApiError> {
    let report = report_for(&state, query.today);
    report
        .get_campaigns(state.store.as_ref(), id)
        .map(Json)
        .map_err(into_api_error)
}

// ─── Mutations ──────────────────────────────────────────────────────────────

pub async fn update_campaign_allocations(
    State(state): State<PacingState>,
    Path(id): Path<Uuid>,
    Json(body): Json<CampaignAllocationsBody>,
) -> Result<(StatusCode, Json<Vec<pacing_core::types::Campaign>>), ApiError> {
    let (allocations, flight_budget) = body.parse().map_err(into_api_error)?;
    let updated = state
        .store
        .update_campaign_allocations(id, &allocations, flight_budget, &state.settings)
        .map_err(into_api_error)?;
    metrics::counter!("pacing.campaign_allocations.updated").increment(1);
    // Accepted for downstream ad-platform sync.
    Ok((StatusCode::ACCEPTED, Json(updated)))
}

pub async fn update_pacing_allocation(
    State(state): State<PacingState>,
    Path(id): Path<Uuid>,
    Query(query): Query<ReportQuery>,
    Json(body): Json<Vec<PacingAllocationRangeBody>>,
) -> Result<Json<Vec<AllocationRange>>, ApiError> {
    let today = query.today.unwrap_or_else(|| Utc::now().date_naive());
    let ranges = body
        .into_iter()
        .map(|r| AllocationRange {
            start: r.start,
            end: r.end,
            allocation: r.allocation,
        })
        .collect();
    let stored = state
        .store
        .update_flight_pacing_allocation(id, ranges, today)
        .map_err(into_api_error)?;
    metrics::counter!("pacing.flight_allocations.updated").increment(1);
    Ok(Json(stored))
}

pub async fn update_buffers(
    State(state): State<PacingState>,
    Path(id): Path<Uuid>,
    Json(body): Json<BuffersBody>,
) -> Result<Json<pacing_core::types::Opportunity>, ApiError> {
    let updated = state
        .store
        .update_opportunity_buffer(id, body.cpm_buffer, body.cpv_buffer)
        .map_err(into_api_error)?;
    metrics::counter!("pacing.opportunity_buffers.updated").increment(1);
    Ok(Json(updated))
}
