use axum::{
    extract::{Path, Query, State},
    Json,
};
use std::sync::Arc;

use crate::{
    extractors::{permissions, CallerContext},
    models::{
        CreateSwapRequestInput, ExpireSweepResponse, ListSwapRequestsQuery, MinistryRole, RespondSwapRequestInput,
        SubstitutionRequest, SubstitutionStatus, SwapMutationResponse, SwapOutcome, SwapRequestId,
    },
    AppError, AppResult, AppState,
};

/// GET /api/swap-requests - List swap requests of the caller
#[utoipa::path(
    get,
    path = "/api/swap-requests",
    params(ListSwapRequestsQuery),
    responses(
        (status = 200, description = "Swap requests", body = Vec<SubstitutionRequest>),
        (status = 400, description = "Unknown view"),
        (status = 403, description = "Not allowed to list every request of the scale")
    ),
    tag = "swap-requests"
)]
pub async fn list_swap_requests(
    State(state): State<Arc<AppState>>,
    caller: CallerContext,
    Query(query): Query<ListSwapRequestsQuery>,
) -> AppResult<Json<Vec<SubstitutionRequest>>> {
    let requests = match query.view.as_deref().unwrap_or("my") {
        "my" => {
            state
                .substitutions
                .list_mine(caller.tenant_id, caller.member_id, query.scale_id)
                .await?
        }
        "incoming" => {
            state
                .substitutions
                .list_incoming(caller.tenant_id, caller.member_id, query.scale_id)
                .await?
        }
        "scale" => {
            let scale_id = query
                .scale_id
                .ok_or_else(|| AppError::BadRequest("scaleId is required for view=scale".to_string()))?;
            let scale = state.scales.find(caller.tenant_id, scale_id).await?;
            permissions::require_capability(
                state.directory.as_ref(),
                &caller,
                scale.ministry_id,
                MinistryRole::can_manage_scales,
                "list every swap request of a scale",
            )
            .await?;
            state.substitutions.list_for_scale(caller.tenant_id, scale_id).await?
        }
        other => {
            return Err(AppError::BadRequest(format!(
                "view must be 'my', 'incoming' or 'scale', got '{}'",
                other
            )))
        }
    };

    tracing::debug!(count = requests.len(), "Fetched swap requests");
    Ok(Json(requests))
}

/// POST /api/swap-requests - Ask another volunteer to take over the caller's slot
#[utoipa::path(
    post,
    path = "/api/swap-requests",
    request_body = CreateSwapRequestInput,
    responses(
        (status = 200, description = "Outcome; refusals carry success=false and a message", body = SwapOutcome),
        (status = 400, description = "Missing reason"),
        (status = 404, description = "Scale not found")
    ),
    tag = "swap-requests"
)]
pub async fn create_swap_request(
    State(state): State<Arc<AppState>>,
    caller: CallerContext,
    Json(input): Json<CreateSwapRequestInput>,
) -> AppResult<Json<SwapOutcome>> {
    let outcome = state
        .substitutions
        .create(caller.tenant_id, caller.member_id, &input)
        .await?;
    Ok(Json(outcome))
}

/// GET /api/swap-requests/{id} - Swap request by ID
#[utoipa::path(
    get,
    path = "/api/swap-requests/{id}",
    params(
        ("id" = String, Path, description = "Swap request ID")
    ),
    responses(
        (status = 200, description = "Swap request found", body = SubstitutionRequest),
        (status = 404, description = "Swap request not found")
    ),
    tag = "swap-requests"
)]
pub async fn get_swap_request(
    State(state): State<Arc<AppState>>,
    caller: CallerContext,
    Path(id): Path<SwapRequestId>,
) -> AppResult<Json<SubstitutionRequest>> {
    let request = state.substitutions.get(caller.tenant_id, id, caller.member_id).await?;
    Ok(Json(request))
}

/// POST /api/swap-requests/{id}/respond - Accept or reject a swap request
#[utoipa::path(
    post,
    path = "/api/swap-requests/{id}/respond",
    params(
        ("id" = String, Path, description = "Swap request ID")
    ),
    request_body = RespondSwapRequestInput,
    responses(
        (status = 200, description = "Request answered", body = SwapMutationResponse),
        (status = 400, description = "Request expired or already responded to"),
        (status = 403, description = "Only the target may respond"),
        (status = 404, description = "Swap request not found"),
        (status = 409, description = "Scale changed underneath the swap")
    ),
    tag = "swap-requests"
)]
pub async fn respond_swap_request(
    State(state): State<Arc<AppState>>,
    caller: CallerContext,
    Path(id): Path<SwapRequestId>,
    Json(input): Json<RespondSwapRequestInput>,
) -> AppResult<Json<SwapMutationResponse>> {
    let request = state
        .substitutions
        .respond(caller.tenant_id, id, caller.member_id, input)
        .await?;

    let message = match request.status {
        SubstitutionStatus::Accepted => "Swap request accepted and scale updated",
        _ => "Swap request rejected",
    };
    Ok(Json(SwapMutationResponse {
        success: true,
        message: Some(message.to_string()),
    }))
}

/// DELETE /api/swap-requests/{id} - Cancel a pending swap request
#[utoipa::path(
    delete,
    path = "/api/swap-requests/{id}",
    params(
        ("id" = String, Path, description = "Swap request ID")
    ),
    responses(
        (status = 200, description = "Request cancelled", body = SwapMutationResponse),
        (status = 400, description = "Request is no longer pending"),
        (status = 403, description = "Only the requester may cancel"),
        (status = 404, description = "Swap request not found")
    ),
    tag = "swap-requests"
)]
pub async fn cancel_swap_request(
    State(state): State<Arc<AppState>>,
    caller: CallerContext,
    Path(id): Path<SwapRequestId>,
) -> AppResult<Json<SwapMutationResponse>> {
    state.substitutions.cancel(caller.tenant_id, id, caller.member_id).await?;
    Ok(Json(SwapMutationResponse {
        success: true,
        message: Some("Swap request cancelled".to_string()),
    }))
}

/// POST /api/swap-requests/expire - Expire every stale pending request of the tenant
#[utoipa::path(
    post,
    path = "/api/swap-requests/expire",
    responses(
        (status = 200, description = "Number of requests expired", body = ExpireSweepResponse)
    ),
    tag = "swap-requests"
)]
pub async fn expire_swap_requests(
    State(state): State<Arc<AppState>>,
    caller: CallerContext,
) -> AppResult<Json<ExpireSweepResponse>> {
    let expired = state.substitutions.expire_stale(caller.tenant_id).await?;
    Ok(Json(ExpireSweepResponse { expired }))
}
