use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;

use crate::{
    extractors::{permissions, CallerContext},
    models::{MinistryRole, RecordFromScaleSummary, ScaleGenerationResult, ScaleId, SwapCandidate},
    AppResult, AppState,
};

/// POST /api/scales/{id}/suggestions - Ranked volunteer suggestions per role
#[utoipa::path(
    post,
    path = "/api/scales/{id}/suggestions",
    params(
        ("id" = String, Path, description = "Scale ID")
    ),
    responses(
        (status = 200, description = "Suggestions; the scale itself is not modified", body = ScaleGenerationResult),
        (status = 403, description = "Not allowed to manage scales"),
        (status = 404, description = "Scale not found")
    ),
    tag = "scales"
)]
pub async fn generate_suggestions(
    State(state): State<Arc<AppState>>,
    caller: CallerContext,
    Path(scale_id): Path<ScaleId>,
) -> AppResult<Json<ScaleGenerationResult>> {
    let scale = state.scales.find(caller.tenant_id, scale_id).await?;
    permissions::require_capability(
        state.directory.as_ref(),
        &caller,
        scale.ministry_id,
        MinistryRole::can_manage_scales,
        "generate scale suggestions",
    )
    .await?;

    let result = state.scales.generate_suggestions(&scale).await?;
    Ok(Json(result))
}

/// POST /api/scales/{id}/service-history - Record service for every assigned member
#[utoipa::path(
    post,
    path = "/api/scales/{id}/service-history",
    params(
        ("id" = String, Path, description = "Scale ID")
    ),
    responses(
        (status = 200, description = "Records created; existing ones skipped", body = RecordFromScaleSummary),
        (status = 400, description = "Scale is cancelled"),
        (status = 403, description = "Not allowed to manage scales"),
        (status = 404, description = "Scale not found")
    ),
    tag = "scales"
)]
pub async fn record_service_from_scale(
    State(state): State<Arc<AppState>>,
    caller: CallerContext,
    Path(scale_id): Path<ScaleId>,
) -> AppResult<Json<RecordFromScaleSummary>> {
    let scale = state.scales.find(caller.tenant_id, scale_id).await?;
    permissions::require_capability(
        state.directory.as_ref(),
        &caller,
        scale.ministry_id,
        MinistryRole::can_manage_scales,
        "record service",
    )
    .await?;

    let summary = state
        .service_history
        .record_from_scale(caller.tenant_id, scale_id, caller.member_id)
        .await?;
    Ok(Json(summary))
}

/// GET /api/scales/{id}/swap-candidates - Who could take over the caller's slot
#[utoipa::path(
    get,
    path = "/api/scales/{id}/swap-candidates",
    params(
        ("id" = String, Path, description = "Scale ID")
    ),
    responses(
        (status = 200, description = "Candidates, available first", body = Vec<SwapCandidate>),
        (status = 400, description = "Caller has no assignment on the scale"),
        (status = 404, description = "Scale not found")
    ),
    tag = "scales"
)]
pub async fn get_swap_candidates(
    State(state): State<Arc<AppState>>,
    caller: CallerContext,
    Path(scale_id): Path<ScaleId>,
) -> AppResult<Json<Vec<SwapCandidate>>> {
    let candidates = state
        .substitutions
        .find_candidates(caller.tenant_id, scale_id, caller.member_id)
        .await?;

    tracing::debug!(scale_id = %scale_id, count = candidates.len(), "Fetched swap candidates");
    Ok(Json(candidates))
}
