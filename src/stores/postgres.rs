use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{types::Json, FromRow, PgPool};
use std::collections::HashMap;
use uuid::Uuid;

use super::{
    AvailabilityStore, MembershipDirectory, MinistrySettingsStore, QualificationDirectory, ScaleStore,
    ServiceHistoryStore, SubstitutionStore, SwapRequestFilter, ensure_transition,
};
use crate::models::{
    Assignment, AvailabilityId, BlockedDate, BranchId, EventId, FunctionId, Member, MinistryId, MinistryRole,
    MinistrySettings, Qualification, Scale, ScaleId, ServiceHistoryFilter, ServiceHistoryId, ServiceHistoryRecord,
    StatusChange, SubstitutionRequest, SubstitutionStatus, SwapRequestId, TenantId, VolunteerAvailability,
    VolunteerId,
};
use crate::{AppError, AppResult};

fn decode<T: std::str::FromStr<Err = String>>(raw: &str) -> AppResult<T> {
    raw.parse::<T>().map_err(AppError::Internal)
}

#[derive(Debug, FromRow)]
struct AvailabilityRow {
    id: AvailabilityId,
    tenant_id: TenantId,
    ministry_id: MinistryId,
    volunteer_id: VolunteerId,
    blocked_dates: Json<Vec<BlockedDate>>,
    max_blocked_days_per_month: i32,
    is_active: bool,
    version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<AvailabilityRow> for VolunteerAvailability {
    fn from(row: AvailabilityRow) -> Self {
        VolunteerAvailability {
            id: row.id,
            tenant_id: row.tenant_id,
            ministry_id: row.ministry_id,
            volunteer_id: row.volunteer_id,
            blocked_dates: row.blocked_dates.0,
            max_blocked_days_per_month: row.max_blocked_days_per_month,
            is_active: row.is_active,
            version: row.version,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

pub struct PgAvailabilityStore {
    pool: PgPool,
}

impl PgAvailabilityStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AvailabilityStore for PgAvailabilityStore {
    async fn find(
        &self,
        tenant_id: TenantId,
        ministry_id: MinistryId,
        volunteer_id: VolunteerId,
    ) -> AppResult<Option<VolunteerAvailability>> {
        let row = sqlx::query_as::<_, AvailabilityRow>(
            "SELECT * FROM volunteer_availability WHERE tenant_id = $1 AND ministry_id = $2 AND volunteer_id = $3",
        )
        .bind(tenant_id)
        .bind(ministry_id)
        .bind(volunteer_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    async fn get_or_create(
        &self,
        tenant_id: TenantId,
        ministry_id: MinistryId,
        volunteer_id: VolunteerId,
        max_blocked_days_per_month: i32,
    ) -> AppResult<VolunteerAvailability> {
        // Losing the insert race is fine: the unique key turns it into a no-op.
        sqlx::query(
            r#"
            INSERT INTO volunteer_availability
                (id, tenant_id, ministry_id, volunteer_id, blocked_dates, max_blocked_days_per_month)
            VALUES ($1, $2, $3, $4, '[]'::jsonb, $5)
            ON CONFLICT (tenant_id, ministry_id, volunteer_id) DO NOTHING
            "#,
        )
        .bind(AvailabilityId::new())
        .bind(tenant_id)
        .bind(ministry_id)
        .bind(volunteer_id)
        .bind(max_blocked_days_per_month)
        .execute(&self.pool)
        .await?;

        self.find(tenant_id, ministry_id, volunteer_id)
            .await?
            .ok_or_else(|| AppError::Internal(format!("Availability for volunteer {} vanished after insert", volunteer_id)))
    }

    async fn save_blocked_dates(
        &self,
        id: AvailabilityId,
        expected_version: i64,
        blocked_dates: &[BlockedDate],
    ) -> AppResult<VolunteerAvailability> {
        let updated = sqlx::query_as::<_, AvailabilityRow>(
            r#"
            UPDATE volunteer_availability
            SET blocked_dates = $3, version = version + 1, updated_at = NOW()
            WHERE id = $1 AND version = $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(expected_version)
        .bind(Json(blocked_dates))
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = updated {
            return Ok(row.into());
        }

        let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM volunteer_availability WHERE id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        if exists {
            Err(AppError::Conflict(format!(
                "Availability {} was modified concurrently (expected version {})",
                id, expected_version
            )))
        } else {
            Err(AppError::NotFound(format!("Availability {} not found", id)))
        }
    }

    async fn list(
        &self,
        tenant_id: TenantId,
        ministry_id: Option<MinistryId>,
        volunteer_id: Option<VolunteerId>,
    ) -> AppResult<Vec<VolunteerAvailability>> {
        let rows = sqlx::query_as::<_, AvailabilityRow>(
            r#"
            SELECT * FROM volunteer_availability
            WHERE tenant_id = $1
              AND is_active
              AND ($2::uuid IS NULL OR ministry_id = $2)
              AND ($3::uuid IS NULL OR volunteer_id = $3)
            ORDER BY ministry_id, volunteer_id
            "#,
        )
        .bind(tenant_id)
        .bind(ministry_id)
        .bind(volunteer_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }
}

#[derive(Debug, FromRow)]
struct SettingsRow {
    tenant_id: TenantId,
    ministry_id: MinistryId,
    max_blocked_days_per_month: i32,
    advance_notice_days: i32,
    require_leader_approval: bool,
    swap_request_expiry_hours: i32,
    max_swap_requests_per_month: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<SettingsRow> for MinistrySettings {
    fn from(row: SettingsRow) -> Self {
        MinistrySettings {
            tenant_id: row.tenant_id,
            ministry_id: row.ministry_id,
            max_blocked_days_per_month: row.max_blocked_days_per_month,
            advance_notice_days: row.advance_notice_days,
            require_leader_approval: row.require_leader_approval,
            swap_request_expiry_hours: row.swap_request_expiry_hours,
            max_swap_requests_per_month: row.max_swap_requests_per_month,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

pub struct PgSettingsStore {
    pool: PgPool,
}

impl PgSettingsStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MinistrySettingsStore for PgSettingsStore {
    async fn find(&self, tenant_id: TenantId, ministry_id: MinistryId) -> AppResult<Option<MinistrySettings>> {
        let row = sqlx::query_as::<_, SettingsRow>(
            "SELECT * FROM ministry_settings WHERE tenant_id = $1 AND ministry_id = $2",
        )
        .bind(tenant_id)
        .bind(ministry_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    async fn get_or_create(&self, defaults: MinistrySettings) -> AppResult<MinistrySettings> {
        sqlx::query(
            r#"
            INSERT INTO ministry_settings
                (tenant_id, ministry_id, max_blocked_days_per_month, advance_notice_days,
                 require_leader_approval, swap_request_expiry_hours, max_swap_requests_per_month)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (tenant_id, ministry_id) DO NOTHING
            "#,
        )
        .bind(defaults.tenant_id)
        .bind(defaults.ministry_id)
        .bind(defaults.max_blocked_days_per_month)
        .bind(defaults.advance_notice_days)
        .bind(defaults.require_leader_approval)
        .bind(defaults.swap_request_expiry_hours)
        .bind(defaults.max_swap_requests_per_month)
        .execute(&self.pool)
        .await?;

        self.find(defaults.tenant_id, defaults.ministry_id)
            .await?
            .ok_or_else(|| AppError::Internal(format!("Settings for ministry {} vanished after insert", defaults.ministry_id)))
    }

    async fn upsert(&self, settings: &MinistrySettings) -> AppResult<MinistrySettings> {
        let row = sqlx::query_as::<_, SettingsRow>(
            r#"
            INSERT INTO ministry_settings
                (tenant_id, ministry_id, max_blocked_days_per_month, advance_notice_days,
                 require_leader_approval, swap_request_expiry_hours, max_swap_requests_per_month)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (tenant_id, ministry_id) DO UPDATE SET
                max_blocked_days_per_month = EXCLUDED.max_blocked_days_per_month,
                advance_notice_days = EXCLUDED.advance_notice_days,
                require_leader_approval = EXCLUDED.require_leader_approval,
                swap_request_expiry_hours = EXCLUDED.swap_request_expiry_hours,
                max_swap_requests_per_month = EXCLUDED.max_swap_requests_per_month,
                updated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(settings.tenant_id)
        .bind(settings.ministry_id)
        .bind(settings.max_blocked_days_per_month)
        .bind(settings.advance_notice_days)
        .bind(settings.require_leader_approval)
        .bind(settings.swap_request_expiry_hours)
        .bind(settings.max_swap_requests_per_month)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }
}

#[derive(Debug, FromRow)]
struct ScaleRow {
    id: ScaleId,
    tenant_id: TenantId,
    branch_id: Option<BranchId>,
    event_id: EventId,
    ministry_id: MinistryId,
    name: String,
    event_date: NaiveDate,
    event_time: String,
    status: String,
    version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
struct AssignmentRow {
    scale_id: ScaleId,
    function_id: FunctionId,
    function_name: String,
    required_slots: i32,
    assigned_members: Vec<Uuid>,
    is_required: bool,
}

impl ScaleRow {
    fn into_scale(self, assignments: Vec<Assignment>) -> AppResult<Scale> {
        Ok(Scale {
            id: self.id,
            tenant_id: self.tenant_id,
            branch_id: self.branch_id,
            event_id: self.event_id,
            ministry_id: self.ministry_id,
            name: self.name,
            event_date: self.event_date,
            event_time: self.event_time,
            assignments,
            status: decode(&self.status)?,
            version: self.version,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

pub struct PgScaleStore {
    pool: PgPool,
}

impl PgScaleStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn attach_assignments(&self, rows: Vec<ScaleRow>) -> AppResult<Vec<Scale>> {
        let ids: Vec<Uuid> = rows.iter().map(|row| row.id.as_uuid()).collect();
        let assignment_rows = sqlx::query_as::<_, AssignmentRow>(
            r#"
            SELECT scale_id, function_id, function_name, required_slots, assigned_members, is_required
            FROM scale_assignments
            WHERE scale_id = ANY($1)
            ORDER BY scale_id, position
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut by_scale: HashMap<ScaleId, Vec<Assignment>> = HashMap::new();
        for row in assignment_rows {
            by_scale.entry(row.scale_id).or_default().push(Assignment {
                function_id: row.function_id,
                function_name: row.function_name,
                required_slots: row.required_slots,
                assigned_members: row.assigned_members.into_iter().map(VolunteerId).collect(),
                is_required: row.is_required,
            });
        }

        rows.into_iter()
            .map(|row| {
                let assignments = by_scale.remove(&row.id).unwrap_or_default();
                row.into_scale(assignments)
            })
            .collect()
    }
}

#[async_trait]
impl ScaleStore for PgScaleStore {
    async fn insert(&self, scale: &Scale) -> AppResult<Scale> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO scales
                (id, tenant_id, branch_id, event_id, ministry_id, name, event_date, event_time, status, version)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(scale.id)
        .bind(scale.tenant_id)
        .bind(scale.branch_id)
        .bind(scale.event_id)
        .bind(scale.ministry_id)
        .bind(&scale.name)
        .bind(scale.event_date)
        .bind(&scale.event_time)
        .bind(scale.status.as_str())
        .bind(scale.version)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::from_write(e, format!("Scale {} already exists", scale.id)))?;

        for (position, assignment) in scale.assignments.iter().enumerate() {
            let members: Vec<Uuid> = assignment.assigned_members.iter().map(VolunteerId::as_uuid).collect();
            sqlx::query(
                r#"
                INSERT INTO scale_assignments
                    (scale_id, position, function_id, function_name, required_slots, assigned_members, is_required)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(scale.id)
            .bind(position as i32)
            .bind(assignment.function_id)
            .bind(&assignment.function_name)
            .bind(assignment.required_slots)
            .bind(&members)
            .bind(assignment.is_required)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(scale.clone())
    }

    async fn find_by_id(&self, tenant_id: TenantId, id: ScaleId) -> AppResult<Option<Scale>> {
        let row = sqlx::query_as::<_, ScaleRow>("SELECT * FROM scales WHERE tenant_id = $1 AND id = $2")
            .bind(tenant_id)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(self.attach_assignments(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn list_occupying_on(&self, tenant_id: TenantId, date: NaiveDate) -> AppResult<Vec<Scale>> {
        let rows = sqlx::query_as::<_, ScaleRow>(
            r#"
            SELECT * FROM scales
            WHERE tenant_id = $1 AND event_date = $2 AND status IN ('published', 'completed')
            "#,
        )
        .bind(tenant_id)
        .bind(date)
        .fetch_all(&self.pool)
        .await?;

        self.attach_assignments(rows).await
    }

    async fn replace_assigned_member(
        &self,
        tenant_id: TenantId,
        scale_id: ScaleId,
        function_id: FunctionId,
        from: VolunteerId,
        to: VolunteerId,
    ) -> AppResult<bool> {
        let mut tx = self.pool.begin().await?;

        // The membership predicates make the replacement conditional on the
        // list still holding `from`, so a concurrent swap cannot be overwritten.
        let result = sqlx::query(
            r#"
            UPDATE scale_assignments sa
            SET assigned_members = array_replace(sa.assigned_members, $4, $5)
            FROM scales s
            WHERE sa.scale_id = s.id
              AND s.tenant_id = $1
              AND sa.scale_id = $2
              AND sa.function_id = $3
              AND $4 = ANY(sa.assigned_members)
              AND NOT ($5 = ANY(sa.assigned_members))
            "#,
        )
        .bind(tenant_id)
        .bind(scale_id)
        .bind(function_id)
        .bind(from)
        .bind(to)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        sqlx::query("UPDATE scales SET version = version + 1, updated_at = NOW() WHERE id = $1")
            .bind(scale_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(true)
    }
}

#[derive(Debug, FromRow)]
struct ServiceHistoryRow {
    id: ServiceHistoryId,
    tenant_id: TenantId,
    volunteer_id: VolunteerId,
    scale_id: ScaleId,
    function_id: FunctionId,
    ministry_id: MinistryId,
    service_date: NaiveDate,
    status: String,
    notes: Option<String>,
    original_user_id: Option<VolunteerId>,
    substitution_request_id: Option<SwapRequestId>,
    recorded_by: Option<VolunteerId>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ServiceHistoryRow> for ServiceHistoryRecord {
    type Error = AppError;

    fn try_from(row: ServiceHistoryRow) -> AppResult<Self> {
        Ok(ServiceHistoryRecord {
            id: row.id,
            tenant_id: row.tenant_id,
            volunteer_id: row.volunteer_id,
            scale_id: row.scale_id,
            function_id: row.function_id,
            ministry_id: row.ministry_id,
            service_date: row.service_date,
            status: decode(&row.status)?,
            notes: row.notes,
            original_user_id: row.original_user_id,
            substitution_request_id: row.substitution_request_id,
            recorded_by: row.recorded_by,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

pub struct PgServiceHistoryStore {
    pool: PgPool,
}

impl PgServiceHistoryStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ServiceHistoryStore for PgServiceHistoryStore {
    async fn create(&self, record: &ServiceHistoryRecord) -> AppResult<ServiceHistoryRecord> {
        let row = sqlx::query_as::<_, ServiceHistoryRow>(
            r#"
            INSERT INTO service_history
                (id, tenant_id, volunteer_id, scale_id, function_id, ministry_id, service_date, status,
                 notes, original_user_id, substitution_request_id, recorded_by, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            RETURNING *
            "#,
        )
        .bind(record.id)
        .bind(record.tenant_id)
        .bind(record.volunteer_id)
        .bind(record.scale_id)
        .bind(record.function_id)
        .bind(record.ministry_id)
        .bind(record.service_date)
        .bind(record.status.as_str())
        .bind(&record.notes)
        .bind(record.original_user_id)
        .bind(record.substitution_request_id)
        .bind(record.recorded_by)
        .bind(record.created_at)
        .bind(record.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            AppError::from_write(
                e,
                format!(
                    "Service history already exists for volunteer {} on scale {}",
                    record.volunteer_id, record.scale_id
                ),
            )
        })?;
        row.try_into()
    }

    async fn find_by_id(&self, tenant_id: TenantId, id: ServiceHistoryId) -> AppResult<Option<ServiceHistoryRecord>> {
        sqlx::query_as::<_, ServiceHistoryRow>("SELECT * FROM service_history WHERE tenant_id = $1 AND id = $2")
            .bind(tenant_id)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(TryInto::try_into)
            .transpose()
    }

    async fn find_for(
        &self,
        tenant_id: TenantId,
        volunteer_id: VolunteerId,
        scale_id: ScaleId,
    ) -> AppResult<Option<ServiceHistoryRecord>> {
        sqlx::query_as::<_, ServiceHistoryRow>(
            "SELECT * FROM service_history WHERE tenant_id = $1 AND volunteer_id = $2 AND scale_id = $3",
        )
        .bind(tenant_id)
        .bind(volunteer_id)
        .bind(scale_id)
        .fetch_optional(&self.pool)
        .await?
        .map(TryInto::try_into)
        .transpose()
    }

    async fn update(&self, record: &ServiceHistoryRecord) -> AppResult<ServiceHistoryRecord> {
        sqlx::query_as::<_, ServiceHistoryRow>(
            r#"
            UPDATE service_history
            SET status = $3, notes = $4, updated_at = NOW()
            WHERE tenant_id = $1 AND id = $2
            RETURNING *
            "#,
        )
        .bind(record.tenant_id)
        .bind(record.id)
        .bind(record.status.as_str())
        .bind(&record.notes)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Service history {} not found", record.id)))?
        .try_into()
    }

    async fn list(&self, tenant_id: TenantId, filter: &ServiceHistoryFilter) -> AppResult<Vec<ServiceHistoryRecord>> {
        let rows = sqlx::query_as::<_, ServiceHistoryRow>(
            r#"
            SELECT * FROM service_history
            WHERE tenant_id = $1
              AND ($2::uuid IS NULL OR volunteer_id = $2)
              AND ($3::uuid IS NULL OR ministry_id = $3)
              AND ($4::uuid IS NULL OR scale_id = $4)
              AND ($5::uuid IS NULL OR function_id = $5)
              AND ($6::text IS NULL OR status = $6)
              AND ($7::date IS NULL OR service_date >= $7)
              AND ($8::date IS NULL OR service_date <= $8)
            ORDER BY service_date DESC, created_at DESC
            "#,
        )
        .bind(tenant_id)
        .bind(filter.volunteer_id)
        .bind(filter.ministry_id)
        .bind(filter.scale_id)
        .bind(filter.function_id)
        .bind(filter.status.map(|s| s.as_str()))
        .bind(filter.from)
        .bind(filter.to)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }
}

#[derive(Debug, FromRow)]
struct SubstitutionRow {
    id: SwapRequestId,
    tenant_id: TenantId,
    scale_id: ScaleId,
    ministry_id: MinistryId,
    function_id: FunctionId,
    requester_id: VolunteerId,
    target_id: VolunteerId,
    reason: String,
    status: String,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    rejection_reason: Option<String>,
    responded_by: Option<VolunteerId>,
    responded_at: Option<DateTime<Utc>>,
}

impl TryFrom<SubstitutionRow> for SubstitutionRequest {
    type Error = AppError;

    fn try_from(row: SubstitutionRow) -> AppResult<Self> {
        Ok(SubstitutionRequest {
            id: row.id,
            tenant_id: row.tenant_id,
            scale_id: row.scale_id,
            ministry_id: row.ministry_id,
            function_id: row.function_id,
            requester_id: row.requester_id,
            target_id: row.target_id,
            reason: row.reason,
            status: decode(&row.status)?,
            created_at: row.created_at,
            expires_at: row.expires_at,
            rejection_reason: row.rejection_reason,
            responded_by: row.responded_by,
            responded_at: row.responded_at,
        })
    }
}

pub struct PgSubstitutionStore {
    pool: PgPool,
}

impl PgSubstitutionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SubstitutionStore for PgSubstitutionStore {
    async fn create(&self, request: &SubstitutionRequest) -> AppResult<SubstitutionRequest> {
        sqlx::query_as::<_, SubstitutionRow>(
            r#"
            INSERT INTO substitution_requests
                (id, tenant_id, scale_id, ministry_id, function_id, requester_id, target_id, reason,
                 status, created_at, expires_at, rejection_reason, responded_by, responded_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            RETURNING *
            "#,
        )
        .bind(request.id)
        .bind(request.tenant_id)
        .bind(request.scale_id)
        .bind(request.ministry_id)
        .bind(request.function_id)
        .bind(request.requester_id)
        .bind(request.target_id)
        .bind(&request.reason)
        .bind(request.status.as_str())
        .bind(request.created_at)
        .bind(request.expires_at)
        .bind(&request.rejection_reason)
        .bind(request.responded_by)
        .bind(request.responded_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::from_write(e, "A pending swap request already exists for this volunteer and scale"))?
        .try_into()
    }

    async fn find_by_id(&self, tenant_id: TenantId, id: SwapRequestId) -> AppResult<Option<SubstitutionRequest>> {
        sqlx::query_as::<_, SubstitutionRow>("SELECT * FROM substitution_requests WHERE tenant_id = $1 AND id = $2")
            .bind(tenant_id)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(TryInto::try_into)
            .transpose()
    }

    async fn list(&self, tenant_id: TenantId, filter: &SwapRequestFilter) -> AppResult<Vec<SubstitutionRequest>> {
        let rows = sqlx::query_as::<_, SubstitutionRow>(
            r#"
            SELECT * FROM substitution_requests
            WHERE tenant_id = $1
              AND ($2::uuid IS NULL OR scale_id = $2)
              AND ($3::uuid IS NULL OR requester_id = $3)
              AND ($4::uuid IS NULL OR target_id = $4)
              AND ($5::text IS NULL OR status = $5)
            ORDER BY created_at DESC
            "#,
        )
        .bind(tenant_id)
        .bind(filter.scale_id)
        .bind(filter.requester_id)
        .bind(filter.target_id)
        .bind(filter.status.map(|s| s.as_str()))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn count_created_since(
        &self,
        tenant_id: TenantId,
        requester_id: VolunteerId,
        since: DateTime<Utc>,
    ) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM substitution_requests WHERE tenant_id = $1 AND requester_id = $2 AND created_at >= $3",
        )
        .bind(tenant_id)
        .bind(requester_id)
        .bind(since)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn transition(
        &self,
        tenant_id: TenantId,
        id: SwapRequestId,
        from: SubstitutionStatus,
        change: &StatusChange,
    ) -> AppResult<Option<SubstitutionRequest>> {
        ensure_transition(from, change)?;
        sqlx::query_as::<_, SubstitutionRow>(
            r#"
            UPDATE substitution_requests
            SET status = $4,
                rejection_reason = COALESCE($5, rejection_reason),
                responded_by = COALESCE($6, responded_by),
                responded_at = COALESCE($7, responded_at)
            WHERE tenant_id = $1 AND id = $2 AND status = $3
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(id)
        .bind(from.as_str())
        .bind(change.status.as_str())
        .bind(&change.rejection_reason)
        .bind(change.responded_by)
        .bind(change.responded_at)
        .fetch_optional(&self.pool)
        .await?
        .map(TryInto::try_into)
        .transpose()
    }

    async fn list_overdue(&self, tenant_id: TenantId, now: DateTime<Utc>) -> AppResult<Vec<SubstitutionRequest>> {
        let rows = sqlx::query_as::<_, SubstitutionRow>(
            r#"
            SELECT * FROM substitution_requests
            WHERE tenant_id = $1 AND status = 'pending' AND expires_at <= $2
            ORDER BY expires_at
            "#,
        )
        .bind(tenant_id)
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }
}

#[derive(Debug, FromRow)]
struct MemberRow {
    volunteer_id: VolunteerId,
    name: String,
    email: String,
    role: String,
}

impl TryFrom<MemberRow> for Member {
    type Error = AppError;

    fn try_from(row: MemberRow) -> AppResult<Self> {
        Ok(Member {
            volunteer_id: row.volunteer_id,
            name: row.name,
            email: row.email,
            role: decode(&row.role)?,
        })
    }
}

#[derive(Debug, FromRow)]
struct QualificationRow {
    volunteer_id: VolunteerId,
    ministry_id: MinistryId,
    function_id: FunctionId,
    level: String,
    priority: i32,
}

impl TryFrom<QualificationRow> for Qualification {
    type Error = AppError;

    fn try_from(row: QualificationRow) -> AppResult<Self> {
        Ok(Qualification {
            volunteer_id: row.volunteer_id,
            ministry_id: row.ministry_id,
            function_id: row.function_id,
            level: decode(&row.level)?,
            priority: row.priority,
        })
    }
}

/// Reads the membership subsystem's tables.
pub struct PgDirectory {
    pool: PgPool,
}

impl PgDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MembershipDirectory for PgDirectory {
    async fn active_members(
        &self,
        tenant_id: TenantId,
        ministry_id: MinistryId,
        roles: &[MinistryRole],
    ) -> AppResult<Vec<Member>> {
        let roles: Vec<&str> = roles.iter().map(MinistryRole::as_str).collect();
        let rows = sqlx::query_as::<_, MemberRow>(
            r#"
            SELECT volunteer_id, name, email, role
            FROM ministry_memberships
            WHERE tenant_id = $1 AND ministry_id = $2 AND is_active AND role = ANY($3)
            ORDER BY name
            "#,
        )
        .bind(tenant_id)
        .bind(ministry_id)
        .bind(&roles)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn member(
        &self,
        tenant_id: TenantId,
        ministry_id: MinistryId,
        volunteer_id: VolunteerId,
    ) -> AppResult<Option<Member>> {
        sqlx::query_as::<_, MemberRow>(
            r#"
            SELECT volunteer_id, name, email, role
            FROM ministry_memberships
            WHERE tenant_id = $1 AND ministry_id = $2 AND volunteer_id = $3 AND is_active
            "#,
        )
        .bind(tenant_id)
        .bind(ministry_id)
        .bind(volunteer_id)
        .fetch_optional(&self.pool)
        .await?
        .map(TryInto::try_into)
        .transpose()
    }
}

#[async_trait]
impl QualificationDirectory for PgDirectory {
    async fn approved_qualification(
        &self,
        volunteer_id: VolunteerId,
        ministry_id: MinistryId,
        function_id: FunctionId,
    ) -> AppResult<Option<Qualification>> {
        sqlx::query_as::<_, QualificationRow>(
            r#"
            SELECT volunteer_id, ministry_id, function_id, level, priority
            FROM member_functions
            WHERE volunteer_id = $1 AND ministry_id = $2 AND function_id = $3 AND status = 'approved'
            "#,
        )
        .bind(volunteer_id)
        .bind(ministry_id)
        .bind(function_id)
        .fetch_optional(&self.pool)
        .await?
        .map(TryInto::try_into)
        .transpose()
    }

    async fn qualified_for(&self, ministry_id: MinistryId, function_id: FunctionId) -> AppResult<Vec<Qualification>> {
        let rows = sqlx::query_as::<_, QualificationRow>(
            r#"
            SELECT volunteer_id, ministry_id, function_id, level, priority
            FROM member_functions
            WHERE ministry_id = $1 AND function_id = $2 AND status = 'approved'
            "#,
        )
        .bind(ministry_id)
        .bind(function_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }
}
