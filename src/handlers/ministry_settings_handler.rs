use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;

use crate::{
    extractors::{permissions, CallerContext},
    models::{MinistryId, MinistryRole, MinistrySettings, UpdateMinistrySettingsInput},
    AppResult, AppState,
};

/// GET /api/ministries/{id}/settings - Scheduling settings of a ministry
#[utoipa::path(
    get,
    path = "/api/ministries/{id}/settings",
    params(
        ("id" = String, Path, description = "Ministry ID")
    ),
    responses(
        (status = 200, description = "Ministry settings, defaults on first access", body = MinistrySettings),
        (status = 403, description = "Not a member of the ministry")
    ),
    tag = "ministries"
)]
pub async fn get_settings(
    State(state): State<Arc<AppState>>,
    caller: CallerContext,
    Path(ministry_id): Path<MinistryId>,
) -> AppResult<Json<MinistrySettings>> {
    permissions::require_member(state.directory.as_ref(), &caller, ministry_id).await?;

    let settings = state.ministry_settings.get(caller.tenant_id, ministry_id).await?;
    Ok(Json(settings))
}

/// PUT /api/ministries/{id}/settings - Update scheduling settings
#[utoipa::path(
    put,
    path = "/api/ministries/{id}/settings",
    params(
        ("id" = String, Path, description = "Ministry ID")
    ),
    request_body = UpdateMinistrySettingsInput,
    responses(
        (status = 200, description = "Settings updated", body = MinistrySettings),
        (status = 403, description = "Not allowed to configure the ministry"),
        (status = 422, description = "Negative values")
    ),
    tag = "ministries"
)]
pub async fn update_settings(
    State(state): State<Arc<AppState>>,
    caller: CallerContext,
    Path(ministry_id): Path<MinistryId>,
    Json(input): Json<UpdateMinistrySettingsInput>,
) -> AppResult<Json<MinistrySettings>> {
    permissions::require_capability(
        state.directory.as_ref(),
        &caller,
        ministry_id,
        MinistryRole::can_configure_ministry,
        "configure the ministry",
    )
    .await?;

    let settings = state
        .ministry_settings
        .update(caller.tenant_id, ministry_id, &input)
        .await?;
    Ok(Json(settings))
}
