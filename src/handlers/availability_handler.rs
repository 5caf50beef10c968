use axum::{
    extract::{Query, State},
    Json,
};
use std::sync::Arc;

use crate::{
    extractors::{permissions, CallerContext},
    models::{
        parse_calendar_date, BlockDateInput, CheckDateQuery, DateBlockStatus, FreeVolunteersQuery,
        ListAvailabilityQuery, MinistryRole, MonthlyBlockedDaysInfo, MonthlyInfoQuery, UnavailabilitiesQuery,
        Unavailability, UnblockDateInput, VolunteerAvailability, VolunteerId,
    },
    AppError, AppResult, AppState,
};

/// GET /api/availability - List availability records
#[utoipa::path(
    get,
    path = "/api/availability",
    params(ListAvailabilityQuery),
    responses(
        (status = 200, description = "Availability records", body = Vec<VolunteerAvailability>),
        (status = 400, description = "ministryId is required to list other volunteers"),
        (status = 403, description = "Not allowed to view other volunteers")
    ),
    tag = "availability"
)]
pub async fn list_availability(
    State(state): State<Arc<AppState>>,
    caller: CallerContext,
    Query(query): Query<ListAvailabilityQuery>,
) -> AppResult<Json<Vec<VolunteerAvailability>>> {
    if query.volunteer_id != Some(caller.member_id) {
        let ministry_id = query.ministry_id.ok_or_else(|| {
            AppError::BadRequest("ministryId is required unless listing your own availability".to_string())
        })?;
        permissions::require_capability(
            state.directory.as_ref(),
            &caller,
            ministry_id,
            MinistryRole::can_view_reports,
            "view other volunteers' availability",
        )
        .await?;
    }

    let records = state
        .availability
        .list(caller.tenant_id, query.ministry_id, query.volunteer_id)
        .await?;

    tracing::debug!(count = records.len(), "Fetched availability records");
    Ok(Json(records))
}

/// GET /api/availability/unavailabilities - Blocked days of a ministry in a date range
#[utoipa::path(
    get,
    path = "/api/availability/unavailabilities",
    params(UnavailabilitiesQuery),
    responses(
        (status = 200, description = "Blocked days sorted by date, then volunteer", body = Vec<Unavailability>),
        (status = 400, description = "Invalid date range"),
        (status = 403, description = "Not allowed to view ministry reports")
    ),
    tag = "availability"
)]
pub async fn get_unavailabilities(
    State(state): State<Arc<AppState>>,
    caller: CallerContext,
    Query(query): Query<UnavailabilitiesQuery>,
) -> AppResult<Json<Vec<Unavailability>>> {
    permissions::require_capability(
        state.directory.as_ref(),
        &caller,
        query.ministry_id,
        MinistryRole::can_view_reports,
        "view ministry unavailabilities",
    )
    .await?;

    let from = parse_calendar_date(&query.from)?;
    let to = parse_calendar_date(&query.to)?;
    let days = state
        .availability
        .unavailabilities(caller.tenant_id, query.ministry_id, from, to)
        .await?;

    Ok(Json(days))
}

/// POST /api/availability/block - Block a date
#[utoipa::path(
    post,
    path = "/api/availability/block",
    request_body = BlockDateInput,
    responses(
        (status = 200, description = "Date blocked (or already blocked)", body = VolunteerAvailability),
        (status = 400, description = "Past date, quota reached or invalid date"),
        (status = 403, description = "Not allowed to block dates for this volunteer"),
        (status = 409, description = "Concurrent update, retry")
    ),
    tag = "availability"
)]
pub async fn block_date(
    State(state): State<Arc<AppState>>,
    caller: CallerContext,
    Json(input): Json<BlockDateInput>,
) -> AppResult<Json<VolunteerAvailability>> {
    let volunteer_id = input.volunteer_id.unwrap_or(caller.member_id);
    permissions::require_self_or(
        state.directory.as_ref(),
        &caller,
        input.ministry_id,
        volunteer_id,
        MinistryRole::can_manage_scales,
        "block dates for other volunteers",
    )
    .await?;

    let date = parse_calendar_date(&input.date)?;
    let record = state
        .availability
        .block_date(caller.tenant_id, input.ministry_id, volunteer_id, date, input.reason)
        .await?;

    Ok(Json(record))
}

/// POST /api/availability/unblock - Remove a blocked date
#[utoipa::path(
    post,
    path = "/api/availability/unblock",
    request_body = UnblockDateInput,
    responses(
        (status = 200, description = "Date unblocked", body = VolunteerAvailability),
        (status = 400, description = "Date is not blocked"),
        (status = 403, description = "Not allowed to unblock dates for this volunteer"),
        (status = 409, description = "Concurrent update, retry")
    ),
    tag = "availability"
)]
pub async fn unblock_date(
    State(state): State<Arc<AppState>>,
    caller: CallerContext,
    Json(input): Json<UnblockDateInput>,
) -> AppResult<Json<VolunteerAvailability>> {
    let volunteer_id = input.volunteer_id.unwrap_or(caller.member_id);
    permissions::require_self_or(
        state.directory.as_ref(),
        &caller,
        input.ministry_id,
        volunteer_id,
        MinistryRole::can_manage_scales,
        "unblock dates for other volunteers",
    )
    .await?;

    let date = parse_calendar_date(&input.date)?;
    let record = state
        .availability
        .unblock_date(caller.tenant_id, input.ministry_id, volunteer_id, date)
        .await?;

    Ok(Json(record))
}

/// GET /api/availability/check - Whether one date is blocked
#[utoipa::path(
    get,
    path = "/api/availability/check",
    params(CheckDateQuery),
    responses(
        (status = 200, description = "Block status of the date", body = DateBlockStatus),
        (status = 400, description = "Invalid date")
    ),
    tag = "availability"
)]
pub async fn check_date(
    State(state): State<Arc<AppState>>,
    caller: CallerContext,
    Query(query): Query<CheckDateQuery>,
) -> AppResult<Json<DateBlockStatus>> {
    let volunteer_id = query.volunteer_id.unwrap_or(caller.member_id);
    permissions::require_self_or(
        state.directory.as_ref(),
        &caller,
        query.ministry_id,
        volunteer_id,
        MinistryRole::can_view_reports,
        "check dates of other volunteers",
    )
    .await?;

    let date = parse_calendar_date(&query.date)?;
    let status = state
        .availability
        .check_date(caller.tenant_id, query.ministry_id, volunteer_id, date)
        .await?;

    Ok(Json(status))
}

/// GET /api/availability/monthly - Blocked days and remaining quota for a month
#[utoipa::path(
    get,
    path = "/api/availability/monthly",
    params(MonthlyInfoQuery),
    responses(
        (status = 200, description = "Monthly blocked days", body = MonthlyBlockedDaysInfo),
        (status = 400, description = "Invalid month")
    ),
    tag = "availability"
)]
pub async fn get_monthly_info(
    State(state): State<Arc<AppState>>,
    caller: CallerContext,
    Query(query): Query<MonthlyInfoQuery>,
) -> AppResult<Json<MonthlyBlockedDaysInfo>> {
    let volunteer_id = query.volunteer_id.unwrap_or(caller.member_id);
    permissions::require_self_or(
        state.directory.as_ref(),
        &caller,
        query.ministry_id,
        volunteer_id,
        MinistryRole::can_view_reports,
        "view other volunteers' quota",
    )
    .await?;

    let info = state
        .availability
        .monthly_info(caller.tenant_id, query.ministry_id, volunteer_id, query.year, query.month)
        .await?;

    Ok(Json(info))
}

/// GET /api/availability/free - Volunteers free on a date
#[utoipa::path(
    get,
    path = "/api/availability/free",
    params(FreeVolunteersQuery),
    responses(
        (status = 200, description = "Ids of volunteers free on the date", body = Vec<String>),
        (status = 400, description = "Invalid date or exclude list"),
        (status = 403, description = "Not allowed to manage scales")
    ),
    tag = "availability"
)]
pub async fn get_free_volunteers(
    State(state): State<Arc<AppState>>,
    caller: CallerContext,
    Query(query): Query<FreeVolunteersQuery>,
) -> AppResult<Json<Vec<VolunteerId>>> {
    permissions::require_capability(
        state.directory.as_ref(),
        &caller,
        query.ministry_id,
        MinistryRole::can_manage_scales,
        "look up free volunteers",
    )
    .await?;

    let date = parse_calendar_date(&query.date)?;
    let exclude = query.exclude_ids()?;
    let free = state
        .availability
        .free_volunteers(caller.tenant_id, query.ministry_id, date, &exclude)
        .await?;

    Ok(Json(free))
}
