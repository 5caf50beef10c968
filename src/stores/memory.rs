//! In-process stores for tests and `STORE_BACKEND=memory`.
//!
//! Every trait method takes the write lock for its whole read-check-write,
//! which gives the same per-document atomicity the Postgres stores get from
//! conditional updates.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::{
    AvailabilityStore, MembershipDirectory, MinistrySettingsStore, QualificationDirectory, ScaleStore,
    ServiceHistoryStore, SubstitutionStore, SwapRequestFilter,
    ensure_transition,
};
use crate::models::{
    AvailabilityId, BlockedDate, FunctionId, Member, MinistryId, MinistryRole, MinistrySettings, Qualification,
    Scale, ScaleId, ServiceHistoryFilter, ServiceHistoryId, ServiceHistoryRecord, StatusChange,
    SubstitutionRequest, SubstitutionStatus, SwapRequestId, TenantId, VolunteerAvailability, VolunteerId,
};
use crate::{AppError, AppResult};

#[derive(Default)]
pub struct MemoryAvailabilityStore {
    records: RwLock<HashMap<AvailabilityId, VolunteerAvailability>>,
}

impl MemoryAvailabilityStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AvailabilityStore for MemoryAvailabilityStore {
    async fn find(
        &self,
        tenant_id: TenantId,
        ministry_id: MinistryId,
        volunteer_id: VolunteerId,
    ) -> AppResult<Option<VolunteerAvailability>> {
        let records = self.records.read().await;
        Ok(records
            .values()
            .find(|r| r.tenant_id == tenant_id && r.ministry_id == ministry_id && r.volunteer_id == volunteer_id)
            .cloned())
    }

    async fn get_or_create(
        &self,
        tenant_id: TenantId,
        ministry_id: MinistryId,
        volunteer_id: VolunteerId,
        max_blocked_days_per_month: i32,
    ) -> AppResult<VolunteerAvailability> {
        let mut records = self.records.write().await;
        if let Some(existing) = records
            .values()
            .find(|r| r.tenant_id == tenant_id && r.ministry_id == ministry_id && r.volunteer_id == volunteer_id)
        {
            return Ok(existing.clone());
        }

        let record = VolunteerAvailability::new(tenant_id, ministry_id, volunteer_id, max_blocked_days_per_month);
        records.insert(record.id, record.clone());
        Ok(record)
    }

    async fn save_blocked_dates(
        &self,
        id: AvailabilityId,
        expected_version: i64,
        blocked_dates: &[BlockedDate],
    ) -> AppResult<VolunteerAvailability> {
        let mut records = self.records.write().await;
        let record = records
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Availability {} not found", id)))?;

        if record.version != expected_version {
            return Err(AppError::Conflict(format!(
                "Availability {} was modified concurrently (expected version {}, found {})",
                id, expected_version, record.version
            )));
        }

        record.blocked_dates = blocked_dates.to_vec();
        record.version += 1;
        record.updated_at = Utc::now();
        Ok(record.clone())
    }

    async fn list(
        &self,
        tenant_id: TenantId,
        ministry_id: Option<MinistryId>,
        volunteer_id: Option<VolunteerId>,
    ) -> AppResult<Vec<VolunteerAvailability>> {
        let records = self.records.read().await;
        let mut matching: Vec<VolunteerAvailability> = records
            .values()
            .filter(|r| {
                r.is_active
                    && r.tenant_id == tenant_id
                    && ministry_id.is_none_or(|id| r.ministry_id == id)
                    && volunteer_id.is_none_or(|id| r.volunteer_id == id)
            })
            .cloned()
            .collect();
        matching.sort_by_key(|r| (r.ministry_id, r.volunteer_id));
        Ok(matching)
    }
}

#[derive(Default)]
pub struct MemorySettingsStore {
    settings: RwLock<HashMap<(TenantId, MinistryId), MinistrySettings>>,
}

impl MemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MinistrySettingsStore for MemorySettingsStore {
    async fn find(&self, tenant_id: TenantId, ministry_id: MinistryId) -> AppResult<Option<MinistrySettings>> {
        Ok(self.settings.read().await.get(&(tenant_id, ministry_id)).cloned())
    }

    async fn get_or_create(&self, defaults: MinistrySettings) -> AppResult<MinistrySettings> {
        let mut settings = self.settings.write().await;
        Ok(settings
            .entry((defaults.tenant_id, defaults.ministry_id))
            .or_insert(defaults)
            .clone())
    }

    async fn upsert(&self, settings: &MinistrySettings) -> AppResult<MinistrySettings> {
        let mut stored = settings.clone();
        stored.updated_at = Utc::now();
        self.settings
            .write()
            .await
            .insert((settings.tenant_id, settings.ministry_id), stored.clone());
        Ok(stored)
    }
}

#[derive(Default)]
pub struct MemoryScaleStore {
    scales: RwLock<HashMap<ScaleId, Scale>>,
}

impl MemoryScaleStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ScaleStore for MemoryScaleStore {
    async fn insert(&self, scale: &Scale) -> AppResult<Scale> {
        let mut scales = self.scales.write().await;
        if scales.contains_key(&scale.id) {
            return Err(AppError::Conflict(format!("Scale {} already exists", scale.id)));
        }
        scales.insert(scale.id, scale.clone());
        Ok(scale.clone())
    }

    async fn find_by_id(&self, tenant_id: TenantId, id: ScaleId) -> AppResult<Option<Scale>> {
        Ok(self
            .scales
            .read()
            .await
            .get(&id)
            .filter(|scale| scale.tenant_id == tenant_id)
            .cloned())
    }

    async fn list_occupying_on(&self, tenant_id: TenantId, date: NaiveDate) -> AppResult<Vec<Scale>> {
        let scales = self.scales.read().await;
        Ok(scales
            .values()
            .filter(|s| s.tenant_id == tenant_id && s.event_date == date && s.status.occupies_volunteers())
            .cloned()
            .collect())
    }

    async fn replace_assigned_member(
        &self,
        tenant_id: TenantId,
        scale_id: ScaleId,
        function_id: FunctionId,
        from: VolunteerId,
        to: VolunteerId,
    ) -> AppResult<bool> {
        let mut scales = self.scales.write().await;
        let Some(scale) = scales.get_mut(&scale_id).filter(|s| s.tenant_id == tenant_id) else {
            return Ok(false);
        };
        let Some(assignment) = scale
            .assignments
            .iter_mut()
            .find(|a| a.function_id == function_id)
        else {
            return Ok(false);
        };
        if assignment.has_member(to) {
            return Ok(false);
        }
        let Some(slot) = assignment.assigned_members.iter_mut().find(|m| **m == from) else {
            return Ok(false);
        };

        *slot = to;
        scale.version += 1;
        scale.updated_at = Utc::now();
        Ok(true)
    }
}

#[derive(Default)]
pub struct MemoryServiceHistoryStore {
    records: RwLock<HashMap<ServiceHistoryId, ServiceHistoryRecord>>,
}

impl MemoryServiceHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ServiceHistoryStore for MemoryServiceHistoryStore {
    async fn create(&self, record: &ServiceHistoryRecord) -> AppResult<ServiceHistoryRecord> {
        let mut records = self.records.write().await;
        if records
            .values()
            .any(|r| r.volunteer_id == record.volunteer_id && r.scale_id == record.scale_id)
        {
            return Err(AppError::Conflict(format!(
                "Service history already exists for volunteer {} on scale {}",
                record.volunteer_id, record.scale_id
            )));
        }
        records.insert(record.id, record.clone());
        Ok(record.clone())
    }

    async fn find_by_id(&self, tenant_id: TenantId, id: ServiceHistoryId) -> AppResult<Option<ServiceHistoryRecord>> {
        Ok(self
            .records
            .read()
            .await
            .get(&id)
            .filter(|r| r.tenant_id == tenant_id)
            .cloned())
    }

    async fn find_for(
        &self,
        tenant_id: TenantId,
        volunteer_id: VolunteerId,
        scale_id: ScaleId,
    ) -> AppResult<Option<ServiceHistoryRecord>> {
        let records = self.records.read().await;
        Ok(records
            .values()
            .find(|r| r.tenant_id == tenant_id && r.volunteer_id == volunteer_id && r.scale_id == scale_id)
            .cloned())
    }

    async fn update(&self, record: &ServiceHistoryRecord) -> AppResult<ServiceHistoryRecord> {
        let mut records = self.records.write().await;
        let stored = records
            .get_mut(&record.id)
            .filter(|r| r.tenant_id == record.tenant_id)
            .ok_or_else(|| AppError::NotFound(format!("Service history {} not found", record.id)))?;

        stored.status = record.status;
        stored.notes = record.notes.clone();
        stored.updated_at = Utc::now();
        Ok(stored.clone())
    }

    async fn list(&self, tenant_id: TenantId, filter: &ServiceHistoryFilter) -> AppResult<Vec<ServiceHistoryRecord>> {
        let records = self.records.read().await;
        let mut matching: Vec<ServiceHistoryRecord> = records
            .values()
            .filter(|r| r.tenant_id == tenant_id && filter.matches(r))
            .cloned()
            .collect();
        matching.sort_by(|a, b| {
            b.service_date
                .cmp(&a.service_date)
                .then_with(|| b.created_at.cmp(&a.created_at))
        });
        Ok(matching)
    }
}

#[derive(Default)]
pub struct MemorySubstitutionStore {
    requests: RwLock<HashMap<SwapRequestId, SubstitutionRequest>>,
}

impl MemorySubstitutionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SubstitutionStore for MemorySubstitutionStore {
    async fn create(&self, request: &SubstitutionRequest) -> AppResult<SubstitutionRequest> {
        self.requests.write().await.insert(request.id, request.clone());
        Ok(request.clone())
    }

    async fn find_by_id(&self, tenant_id: TenantId, id: SwapRequestId) -> AppResult<Option<SubstitutionRequest>> {
        Ok(self
            .requests
            .read()
            .await
            .get(&id)
            .filter(|r| r.tenant_id == tenant_id)
            .cloned())
    }

    async fn list(&self, tenant_id: TenantId, filter: &SwapRequestFilter) -> AppResult<Vec<SubstitutionRequest>> {
        let requests = self.requests.read().await;
        let mut matching: Vec<SubstitutionRequest> = requests
            .values()
            .filter(|r| r.tenant_id == tenant_id && filter.matches(r))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(matching)
    }

    async fn count_created_since(
        &self,
        tenant_id: TenantId,
        requester_id: VolunteerId,
        since: DateTime<Utc>,
    ) -> AppResult<i64> {
        let requests = self.requests.read().await;
        Ok(requests
            .values()
            .filter(|r| r.tenant_id == tenant_id && r.requester_id == requester_id && r.created_at >= since)
            .count() as i64)
    }

    async fn transition(
        &self,
        tenant_id: TenantId,
        id: SwapRequestId,
        from: SubstitutionStatus,
        change: &StatusChange,
    ) -> AppResult<Option<SubstitutionRequest>> {
        ensure_transition(from, change)?;
        let mut requests = self.requests.write().await;
        match requests
            .get_mut(&id)
            .filter(|r| r.tenant_id == tenant_id && r.status == from)
        {
            Some(request) => {
                change.apply(request);
                Ok(Some(request.clone()))
            }
            None => Ok(None),
        }
    }

    async fn list_overdue(&self, tenant_id: TenantId, now: DateTime<Utc>) -> AppResult<Vec<SubstitutionRequest>> {
        let requests = self.requests.read().await;
        Ok(requests
            .values()
            .filter(|r| r.tenant_id == tenant_id && r.status == SubstitutionStatus::Pending && r.is_expired_at(now))
            .cloned()
            .collect())
    }
}

#[derive(Clone)]
struct Membership {
    tenant_id: TenantId,
    ministry_id: MinistryId,
    member: Member,
    active: bool,
}

/// Membership and qualification lookups backed by seeded data.
#[derive(Default)]
pub struct MemoryDirectory {
    memberships: RwLock<Vec<Membership>>,
    qualifications: RwLock<Vec<Qualification>>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_member(&self, tenant_id: TenantId, ministry_id: MinistryId, member: Member) {
        self.memberships.write().await.push(Membership {
            tenant_id,
            ministry_id,
            member,
            active: true,
        });
    }

    pub async fn deactivate_member(&self, tenant_id: TenantId, ministry_id: MinistryId, volunteer_id: VolunteerId) {
        for membership in self.memberships.write().await.iter_mut() {
            if membership.tenant_id == tenant_id
                && membership.ministry_id == ministry_id
                && membership.member.volunteer_id == volunteer_id
            {
                membership.active = false;
            }
        }
    }

    pub async fn add_qualification(&self, qualification: Qualification) {
        self.qualifications.write().await.push(qualification);
    }
}

#[async_trait]
impl MembershipDirectory for MemoryDirectory {
    async fn active_members(
        &self,
        tenant_id: TenantId,
        ministry_id: MinistryId,
        roles: &[MinistryRole],
    ) -> AppResult<Vec<Member>> {
        let memberships = self.memberships.read().await;
        Ok(memberships
            .iter()
            .filter(|m| {
                m.active && m.tenant_id == tenant_id && m.ministry_id == ministry_id && roles.contains(&m.member.role)
            })
            .map(|m| m.member.clone())
            .collect())
    }

    async fn member(
        &self,
        tenant_id: TenantId,
        ministry_id: MinistryId,
        volunteer_id: VolunteerId,
    ) -> AppResult<Option<Member>> {
        let memberships = self.memberships.read().await;
        Ok(memberships
            .iter()
            .find(|m| {
                m.active
                    && m.tenant_id == tenant_id
                    && m.ministry_id == ministry_id
                    && m.member.volunteer_id == volunteer_id
            })
            .map(|m| m.member.clone()))
    }
}

#[async_trait]
impl QualificationDirectory for MemoryDirectory {
    async fn approved_qualification(
        &self,
        volunteer_id: VolunteerId,
        ministry_id: MinistryId,
        function_id: FunctionId,
    ) -> AppResult<Option<Qualification>> {
        let qualifications = self.qualifications.read().await;
        Ok(qualifications
            .iter()
            .find(|q| q.volunteer_id == volunteer_id && q.ministry_id == ministry_id && q.function_id == function_id)
            .cloned())
    }

    async fn qualified_for(&self, ministry_id: MinistryId, function_id: FunctionId) -> AppResult<Vec<Qualification>> {
        let qualifications = self.qualifications.read().await;
        Ok(qualifications
            .iter()
            .filter(|q| q.ministry_id == ministry_id && q.function_id == function_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Assignment, EventId, ScaleStatus};

    fn scale_with(members: Vec<VolunteerId>, function_id: FunctionId, tenant_id: TenantId) -> Scale {
        let now = Utc::now();
        Scale {
            id: ScaleId::new(),
            tenant_id,
            branch_id: None,
            event_id: EventId::new(),
            ministry_id: MinistryId::new(),
            name: "Sunday service".to_string(),
            event_date: NaiveDate::from_ymd_opt(2030, 1, 6).unwrap(),
            event_time: "10:00".to_string(),
            assignments: vec![Assignment {
                function_id,
                function_name: "Sound".to_string(),
                required_slots: 2,
                assigned_members: members,
                is_required: true,
            }],
            status: ScaleStatus::Published,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn get_or_create_returns_the_same_record() {
        let store = MemoryAvailabilityStore::new();
        let (tenant, ministry, volunteer) = (TenantId::new(), MinistryId::new(), VolunteerId::new());

        let first = store.get_or_create(tenant, ministry, volunteer, 3).await.unwrap();
        let second = store.get_or_create(tenant, ministry, volunteer, 9).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.max_blocked_days_per_month, 3);
        assert_eq!(store.list(tenant, None, None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn stale_version_is_a_conflict() {
        let store = MemoryAvailabilityStore::new();
        let record = store
            .get_or_create(TenantId::new(), MinistryId::new(), VolunteerId::new(), 3)
            .await
            .unwrap();
        let entry = BlockedDate {
            date: NaiveDate::from_ymd_opt(2030, 2, 1).unwrap(),
            reason: "trip".to_string(),
            is_blocked: true,
        };

        let saved = store
            .save_blocked_dates(record.id, record.version, &[entry.clone()])
            .await
            .unwrap();
        assert_eq!(saved.version, record.version + 1);

        let err = store
            .save_blocked_dates(record.id, record.version, &[entry])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn member_replacement_is_conditional() {
        let store = MemoryScaleStore::new();
        let tenant = TenantId::new();
        let function = FunctionId::new();
        let (a, b, c) = (VolunteerId::new(), VolunteerId::new(), VolunteerId::new());
        let scale = store.insert(&scale_with(vec![a, c], function, tenant)).await.unwrap();

        assert!(store.replace_assigned_member(tenant, scale.id, function, a, b).await.unwrap());
        // a is gone now, and c cannot replace b into a list already holding it
        assert!(!store.replace_assigned_member(tenant, scale.id, function, a, b).await.unwrap());
        assert!(!store.replace_assigned_member(tenant, scale.id, function, c, b).await.unwrap());
        // other tenants cannot touch the scale
        assert!(!store.replace_assigned_member(TenantId::new(), scale.id, function, b, a).await.unwrap());

        let stored = store.find_by_id(tenant, scale.id).await.unwrap().unwrap();
        assert_eq!(stored.assignments[0].assigned_members, vec![b, c]);
        assert_eq!(stored.version, 1);
    }

    #[tokio::test]
    async fn settled_requests_refuse_further_transitions() {
        let store = MemorySubstitutionStore::new();
        let now = Utc::now();
        let request = store
            .create(&SubstitutionRequest {
                id: SwapRequestId::new(),
                tenant_id: TenantId::new(),
                scale_id: ScaleId::new(),
                ministry_id: MinistryId::new(),
                function_id: FunctionId::new(),
                requester_id: VolunteerId::new(),
                target_id: VolunteerId::new(),
                reason: "trip".to_string(),
                status: SubstitutionStatus::Pending,
                created_at: now,
                expires_at: now + chrono::Duration::hours(24),
                rejection_reason: None,
                responded_by: None,
                responded_at: None,
            })
            .await
            .unwrap();

        let reopened = store
            .transition(
                request.tenant_id,
                request.id,
                SubstitutionStatus::Accepted,
                &StatusChange::to(SubstitutionStatus::Pending),
            )
            .await;
        assert!(matches!(reopened, Err(AppError::Internal(_))));

        let cancelled = store
            .transition(
                request.tenant_id,
                request.id,
                SubstitutionStatus::Pending,
                &StatusChange::to(SubstitutionStatus::Cancelled),
            )
            .await
            .unwrap();
        assert_eq!(cancelled.map(|r| r.status), Some(SubstitutionStatus::Cancelled));

        let again = store
            .transition(
                request.tenant_id,
                request.id,
                SubstitutionStatus::Pending,
                &StatusChange::to(SubstitutionStatus::Expired),
            )
            .await
            .unwrap();
        assert!(again.is_none());
    }
}
