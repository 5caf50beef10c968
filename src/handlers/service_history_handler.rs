use axum::{
    extract::{Path, Query, State},
    Json,
};
use std::sync::Arc;

use crate::{
    extractors::{permissions, CallerContext},
    models::{
        CreateServiceHistoryInput, MinistryId, MinistryRole, MinistryServiceStats, ServiceHistoryFilter,
        ServiceHistoryId, ServiceHistoryQuery, ServiceHistoryRecord, StatsQuery, UpdateServiceHistoryInput,
        VolunteerId, VolunteerServiceStats,
    },
    AppError, AppResult, AppState,
};

/// GET /api/service-history - List service history records
#[utoipa::path(
    get,
    path = "/api/service-history",
    params(ServiceHistoryQuery),
    responses(
        (status = 200, description = "Records, newest service first", body = Vec<ServiceHistoryRecord>),
        (status = 400, description = "ministryId is required to list other volunteers"),
        (status = 403, description = "Not allowed to view ministry reports")
    ),
    tag = "service-history"
)]
pub async fn list_service_history(
    State(state): State<Arc<AppState>>,
    caller: CallerContext,
    Query(query): Query<ServiceHistoryQuery>,
) -> AppResult<Json<Vec<ServiceHistoryRecord>>> {
    if query.volunteer_id != Some(caller.member_id) {
        let ministry_id = query.ministry_id.ok_or_else(|| {
            AppError::BadRequest("ministryId is required unless listing your own history".to_string())
        })?;
        permissions::require_capability(
            state.directory.as_ref(),
            &caller,
            ministry_id,
            MinistryRole::can_view_reports,
            "view service history of other volunteers",
        )
        .await?;
    }

    let filter = ServiceHistoryFilter::from(query);
    let records = state.service_history.list(caller.tenant_id, &filter).await?;

    tracing::debug!(count = records.len(), "Fetched service history");
    Ok(Json(records))
}

/// POST /api/service-history - Record one service
#[utoipa::path(
    post,
    path = "/api/service-history",
    request_body = CreateServiceHistoryInput,
    responses(
        (status = 200, description = "Service recorded", body = ServiceHistoryRecord),
        (status = 400, description = "Scale belongs to another ministry"),
        (status = 403, description = "Not allowed to manage scales"),
        (status = 404, description = "Scale not found"),
        (status = 409, description = "Service already recorded for the volunteer on this scale")
    ),
    tag = "service-history"
)]
pub async fn create_service_history(
    State(state): State<Arc<AppState>>,
    caller: CallerContext,
    Json(input): Json<CreateServiceHistoryInput>,
) -> AppResult<Json<ServiceHistoryRecord>> {
    permissions::require_capability(
        state.directory.as_ref(),
        &caller,
        input.ministry_id,
        MinistryRole::can_manage_scales,
        "record service",
    )
    .await?;

    let record = state
        .service_history
        .create(caller.tenant_id, caller.member_id, &input)
        .await?;
    Ok(Json(record))
}

/// PUT /api/service-history/{id} - Update status or notes of a record
#[utoipa::path(
    put,
    path = "/api/service-history/{id}",
    params(
        ("id" = String, Path, description = "Service history ID")
    ),
    request_body = UpdateServiceHistoryInput,
    responses(
        (status = 200, description = "Record updated", body = ServiceHistoryRecord),
        (status = 403, description = "Not allowed to manage scales"),
        (status = 404, description = "Record not found")
    ),
    tag = "service-history"
)]
pub async fn update_service_history(
    State(state): State<Arc<AppState>>,
    caller: CallerContext,
    Path(id): Path<ServiceHistoryId>,
    Json(input): Json<UpdateServiceHistoryInput>,
) -> AppResult<Json<ServiceHistoryRecord>> {
    let existing = state.service_history.find(caller.tenant_id, id).await?;
    permissions::require_capability(
        state.directory.as_ref(),
        &caller,
        existing.ministry_id,
        MinistryRole::can_manage_scales,
        "update service history",
    )
    .await?;

    let record = state.service_history.update(caller.tenant_id, id, &input).await?;
    Ok(Json(record))
}

/// GET /api/service-history/volunteers/{id}/stats - Attendance of one volunteer
#[utoipa::path(
    get,
    path = "/api/service-history/volunteers/{id}/stats",
    params(
        ("id" = String, Path, description = "Volunteer ID"),
        StatsQuery
    ),
    responses(
        (status = 200, description = "Volunteer stats", body = VolunteerServiceStats),
        (status = 400, description = "ministryId is required for other volunteers"),
        (status = 403, description = "Not allowed to view ministry reports")
    ),
    tag = "service-history"
)]
pub async fn get_volunteer_stats(
    State(state): State<Arc<AppState>>,
    caller: CallerContext,
    Path(volunteer_id): Path<VolunteerId>,
    Query(query): Query<StatsQuery>,
) -> AppResult<Json<VolunteerServiceStats>> {
    if volunteer_id != caller.member_id {
        let ministry_id = query.ministry_id.ok_or_else(|| {
            AppError::BadRequest("ministryId is required unless reading your own stats".to_string())
        })?;
        permissions::require_capability(
            state.directory.as_ref(),
            &caller,
            ministry_id,
            MinistryRole::can_view_reports,
            "view stats of other volunteers",
        )
        .await?;
    }

    let stats = state
        .service_history
        .volunteer_stats(caller.tenant_id, volunteer_id, query.ministry_id, query.from, query.to)
        .await?;
    Ok(Json(stats))
}

/// GET /api/service-history/ministries/{id}/stats - Attendance across a ministry
#[utoipa::path(
    get,
    path = "/api/service-history/ministries/{id}/stats",
    params(
        ("id" = String, Path, description = "Ministry ID"),
        StatsQuery
    ),
    responses(
        (status = 200, description = "Ministry stats", body = MinistryServiceStats),
        (status = 403, description = "Not allowed to view ministry reports")
    ),
    tag = "service-history"
)]
pub async fn get_ministry_stats(
    State(state): State<Arc<AppState>>,
    caller: CallerContext,
    Path(ministry_id): Path<MinistryId>,
    Query(query): Query<StatsQuery>,
) -> AppResult<Json<MinistryServiceStats>> {
    permissions::require_capability(
        state.directory.as_ref(),
        &caller,
        ministry_id,
        MinistryRole::can_view_reports,
        "view ministry reports",
    )
    .await?;

    let stats = state
        .service_history
        .ministry_stats(caller.tenant_id, ministry_id, query.from, query.to)
        .await?;
    Ok(Json(stats))
}
