//! Persistence and collaborator seams.
//!
//! Engines and services only see these traits. Each mutation is atomic at
//! single-document granularity; there are no cross-entity transactions.

pub mod cached;
pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use crate::models::{
    AvailabilityId, BlockedDate, FunctionId, Member, MinistryId, MinistryRole, MinistrySettings, Qualification,
    Scale, ScaleId, ServiceHistoryFilter, ServiceHistoryId, ServiceHistoryRecord, StatusChange,
    SubstitutionRequest, SubstitutionStatus, SwapRequestId, TenantId, VolunteerAvailability, VolunteerId,
};
use crate::{AppError, AppResult};

pub use cached::CachedSettingsStore;
pub use memory::{
    MemoryAvailabilityStore, MemoryDirectory, MemoryScaleStore, MemoryServiceHistoryStore, MemorySettingsStore,
    MemorySubstitutionStore,
};
pub use postgres::{
    PgAvailabilityStore, PgDirectory, PgScaleStore, PgServiceHistoryStore, PgSettingsStore, PgSubstitutionStore,
};

#[async_trait]
pub trait AvailabilityStore: Send + Sync {
    async fn find(
        &self,
        tenant_id: TenantId,
        ministry_id: MinistryId,
        volunteer_id: VolunteerId,
    ) -> AppResult<Option<VolunteerAvailability>>;

    /// Inserts an empty record unless one already exists for the owner; returns the stored record.
    async fn get_or_create(
        &self,
        tenant_id: TenantId,
        ministry_id: MinistryId,
        volunteer_id: VolunteerId,
        max_blocked_days_per_month: i32,
    ) -> AppResult<VolunteerAvailability>;

    /// Replaces the blocked dates if the stored version still equals `expected_version`.
    async fn save_blocked_dates(
        &self,
        id: AvailabilityId,
        expected_version: i64,
        blocked_dates: &[BlockedDate],
    ) -> AppResult<VolunteerAvailability>;

    /// Active records of the tenant, optionally narrowed by ministry and volunteer.
    async fn list(
        &self,
        tenant_id: TenantId,
        ministry_id: Option<MinistryId>,
        volunteer_id: Option<VolunteerId>,
    ) -> AppResult<Vec<VolunteerAvailability>>;
}

#[async_trait]
pub trait MinistrySettingsStore: Send + Sync {
    async fn find(&self, tenant_id: TenantId, ministry_id: MinistryId) -> AppResult<Option<MinistrySettings>>;

    /// Inserts `defaults` unless settings already exist for the ministry.
    async fn get_or_create(&self, defaults: MinistrySettings) -> AppResult<MinistrySettings>;

    async fn upsert(&self, settings: &MinistrySettings) -> AppResult<MinistrySettings>;
}

#[async_trait]
pub trait ScaleStore: Send + Sync {
    async fn insert(&self, scale: &Scale) -> AppResult<Scale>;

    async fn find_by_id(&self, tenant_id: TenantId, id: ScaleId) -> AppResult<Option<Scale>>;

    /// Published or completed scales of the tenant dated `date`.
    async fn list_occupying_on(&self, tenant_id: TenantId, date: NaiveDate) -> AppResult<Vec<Scale>>;

    /// Swaps `from` for `to` inside one assignment's member list in a single step.
    ///
    /// Returns `false` when `from` is no longer assigned to that function or
    /// `to` already is; nothing is written in that case.
    async fn replace_assigned_member(
        &self,
        tenant_id: TenantId,
        scale_id: ScaleId,
        function_id: FunctionId,
        from: VolunteerId,
        to: VolunteerId,
    ) -> AppResult<bool>;
}

#[async_trait]
pub trait ServiceHistoryStore: Send + Sync {
    /// Fails with `Conflict` when (volunteer, scale) already has a record.
    async fn create(&self, record: &ServiceHistoryRecord) -> AppResult<ServiceHistoryRecord>;

    async fn find_by_id(&self, tenant_id: TenantId, id: ServiceHistoryId) -> AppResult<Option<ServiceHistoryRecord>>;

    async fn find_for(
        &self,
        tenant_id: TenantId,
        volunteer_id: VolunteerId,
        scale_id: ScaleId,
    ) -> AppResult<Option<ServiceHistoryRecord>>;

    async fn update(&self, record: &ServiceHistoryRecord) -> AppResult<ServiceHistoryRecord>;

    /// Matching records, newest service date first.
    async fn list(&self, tenant_id: TenantId, filter: &ServiceHistoryFilter) -> AppResult<Vec<ServiceHistoryRecord>>;
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SwapRequestFilter {
    pub scale_id: Option<ScaleId>,
    pub requester_id: Option<VolunteerId>,
    pub target_id: Option<VolunteerId>,
    pub status: Option<SubstitutionStatus>,
}

impl SwapRequestFilter {
    pub fn matches(&self, request: &SubstitutionRequest) -> bool {
        self.scale_id.is_none_or(|id| request.scale_id == id)
            && self.requester_id.is_none_or(|id| request.requester_id == id)
            && self.target_id.is_none_or(|id| request.target_id == id)
            && self.status.is_none_or(|status| request.status == status)
    }
}

/// Refuses a status write that leaves a terminal state or stays in `pending`.
pub(crate) fn ensure_transition(from: SubstitutionStatus, change: &StatusChange) -> AppResult<()> {
    if from.can_transition_to(change.status) {
        Ok(())
    } else {
        Err(AppError::Internal(format!(
            "Swap request cannot move from {} to {}",
            from, change.status
        )))
    }
}

#[async_trait]
pub trait SubstitutionStore: Send + Sync {
    async fn create(&self, request: &SubstitutionRequest) -> AppResult<SubstitutionRequest>;

    async fn find_by_id(&self, tenant_id: TenantId, id: SwapRequestId) -> AppResult<Option<SubstitutionRequest>>;

    /// Matching requests, newest first.
    async fn list(&self, tenant_id: TenantId, filter: &SwapRequestFilter) -> AppResult<Vec<SubstitutionRequest>>;

    async fn count_created_since(
        &self,
        tenant_id: TenantId,
        requester_id: VolunteerId,
        since: DateTime<Utc>,
    ) -> AppResult<i64>;

    /// Applies `change` only if the request is still in `from`; `None` means another writer got there first.
    async fn transition(
        &self,
        tenant_id: TenantId,
        id: SwapRequestId,
        from: SubstitutionStatus,
        change: &StatusChange,
    ) -> AppResult<Option<SubstitutionRequest>>;

    /// Pending requests whose deadline is at or before `now`.
    async fn list_overdue(&self, tenant_id: TenantId, now: DateTime<Utc>) -> AppResult<Vec<SubstitutionRequest>>;
}

/// Active memberships, owned by the tenant/membership subsystem.
#[async_trait]
pub trait MembershipDirectory: Send + Sync {
    async fn active_members(
        &self,
        tenant_id: TenantId,
        ministry_id: MinistryId,
        roles: &[MinistryRole],
    ) -> AppResult<Vec<Member>>;

    async fn member(
        &self,
        tenant_id: TenantId,
        ministry_id: MinistryId,
        volunteer_id: VolunteerId,
    ) -> AppResult<Option<Member>>;
}

/// Approved function qualifications, owned by the membership subsystem.
#[async_trait]
pub trait QualificationDirectory: Send + Sync {
    async fn approved_qualification(
        &self,
        volunteer_id: VolunteerId,
        ministry_id: MinistryId,
        function_id: FunctionId,
    ) -> AppResult<Option<Qualification>>;

    async fn qualified_for(&self, ministry_id: MinistryId, function_id: FunctionId) -> AppResult<Vec<Qualification>>;
}
