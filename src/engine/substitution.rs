use chrono::{DateTime, Duration, Utc};
use metrics::counter;
use std::cmp::Reverse;
use std::collections::HashMap;
use std::sync::Arc;

use super::{settings_or_default, start_of_month, today, AvailabilityValidator, EngineConfig};
use crate::models::{
    Member, MinistryRole, Scale, ScaleStatus, StatusChange, SubstitutionRequest, SubstitutionStatus,
    SwapCandidate, SwapDecision, SwapOutcome, SwapRequestId, TenantId, VolunteerId,
};
use crate::stores::{
    MembershipDirectory, MinistrySettingsStore, QualificationDirectory, ScaleStore, SubstitutionStore,
    SwapRequestFilter,
};
use crate::{AppError, AppResult};

/// Swap requests between volunteers and their execution against the scale.
///
/// `pending` is the only non-terminal state. Every status write is a
/// compare-and-set from `pending`, so a request turns terminal exactly once
/// even when two callers race.
pub struct SubstitutionEngine {
    validator: Arc<AvailabilityValidator>,
    members: Arc<dyn MembershipDirectory>,
    qualifications: Arc<dyn QualificationDirectory>,
    scales: Arc<dyn ScaleStore>,
    requests: Arc<dyn SubstitutionStore>,
    settings: Arc<dyn MinistrySettingsStore>,
    config: EngineConfig,
}

impl SubstitutionEngine {
    pub fn new(
        validator: Arc<AvailabilityValidator>,
        members: Arc<dyn MembershipDirectory>,
        qualifications: Arc<dyn QualificationDirectory>,
        scales: Arc<dyn ScaleStore>,
        requests: Arc<dyn SubstitutionStore>,
        settings: Arc<dyn MinistrySettingsStore>,
        config: EngineConfig,
    ) -> Self {
        Self {
            validator,
            members,
            qualifications,
            scales,
            requests,
            settings,
            config,
        }
    }

    pub async fn find_swap_candidates(&self, scale: &Scale, requester_id: VolunteerId) -> AppResult<Vec<SwapCandidate>> {
        let assignment = scale.assignment_of(requester_id).ok_or_else(|| {
            AppError::BadRequest(format!("Volunteer {} has no assignment on scale {}", requester_id, scale.id))
        })?;

        let members: HashMap<VolunteerId, Member> = self
            .members
            .active_members(scale.tenant_id, scale.ministry_id, &MinistryRole::SERVING)
            .await?
            .into_iter()
            .map(|member| (member.volunteer_id, member))
            .collect();

        let qualified: Vec<_> = self
            .qualifications
            .qualified_for(scale.ministry_id, assignment.function_id)
            .await?
            .into_iter()
            .filter(|q| q.volunteer_id != requester_id && !assignment.has_member(q.volunteer_id))
            .filter(|q| members.contains_key(&q.volunteer_id))
            .collect();

        let ids: Vec<VolunteerId> = qualified.iter().map(|q| q.volunteer_id).collect();
        let availability = self
            .validator
            .check_many(scale.tenant_id, scale.ministry_id, &ids, scale.event_date)
            .await?;
        let same_day = self.scales.list_occupying_on(scale.tenant_id, scale.event_date).await?;

        let mut candidates: Vec<SwapCandidate> = qualified
            .into_iter()
            .filter_map(|q| {
                let member = members.get(&q.volunteer_id)?;
                let check = availability.get(&q.volunteer_id);
                let has_conflict = same_day.iter().any(|other| {
                    other.id != scale.id && other.event_time == scale.event_time && other.has_member(q.volunteer_id)
                });
                Some(SwapCandidate {
                    volunteer_id: q.volunteer_id,
                    name: member.name.clone(),
                    email: member.email.clone(),
                    level: q.level,
                    priority: q.priority,
                    is_available: check.is_some_and(|c| c.is_available),
                    has_conflict,
                    unavailable_reason: check.and_then(|c| c.reason.clone()),
                })
            })
            .collect();

        candidates.sort_by(|a, b| {
            let key = |c: &SwapCandidate| (!c.is_available, c.priority, Reverse(c.level.weight()));
            key(a).cmp(&key(b)).then_with(|| a.name.cmp(&b.name))
        });

        tracing::debug!(
            scale_id = %scale.id,
            requester_id = %requester_id,
            function_id = %assignment.function_id,
            count = candidates.len(),
            "Found swap candidates"
        );
        Ok(candidates)
    }

    /// Business refusals come back as `success: false`; only store failures are errors.
    pub async fn create_swap_request(
        &self,
        scale: &Scale,
        requester_id: VolunteerId,
        target_id: VolunteerId,
        reason: &str,
    ) -> AppResult<SwapOutcome> {
        let outcome = self.try_create(scale, requester_id, target_id, reason).await?;

        let label = if outcome.success { "created" } else { "refused" };
        counter!("swap_requests_total", "outcome" => label).increment(1);
        if outcome.success {
            tracing::info!(
                scale_id = %scale.id,
                requester_id = %requester_id,
                target_id = %target_id,
                swap_request_id = ?outcome.swap_request_id,
                "Swap request created"
            );
        } else {
            tracing::warn!(
                scale_id = %scale.id,
                requester_id = %requester_id,
                target_id = %target_id,
                reason = %outcome.message,
                "Swap request refused"
            );
        }
        Ok(outcome)
    }

    async fn try_create(
        &self,
        scale: &Scale,
        requester_id: VolunteerId,
        target_id: VolunteerId,
        reason: &str,
    ) -> AppResult<SwapOutcome> {
        if !matches!(scale.status, ScaleStatus::Draft | ScaleStatus::Published) {
            return Ok(SwapOutcome::refused(format!(
                "Swaps are not possible on a {} scale",
                scale.status
            )));
        }
        let today = today();
        if scale.event_date < today {
            return Ok(SwapOutcome::refused("The event of this scale has already happened"));
        }
        if requester_id == target_id {
            return Ok(SwapOutcome::refused("A volunteer cannot swap with themselves"));
        }

        let Some(assignment) = scale.assignment_of(requester_id) else {
            return Ok(SwapOutcome::refused("You have no assignment on this scale"));
        };

        let target = self.members.member(scale.tenant_id, scale.ministry_id, target_id).await?;
        if !target.is_some_and(|member| member.role.can_serve()) {
            return Ok(SwapOutcome::refused("Target is not an active serving member of this ministry"));
        }
        if assignment.has_member(target_id) {
            return Ok(SwapOutcome::refused(format!(
                "Target already serves in function '{}' on this scale",
                assignment.function_name
            )));
        }

        let qualification = self
            .qualifications
            .approved_qualification(target_id, scale.ministry_id, assignment.function_id)
            .await?;
        if qualification.is_none() {
            return Ok(SwapOutcome::refused(format!(
                "Target is not qualified for the function '{}'",
                assignment.function_name
            )));
        }

        let check = self
            .validator
            .check_availability(scale.tenant_id, scale.ministry_id, target_id, scale.event_date)
            .await?;
        if !check.is_available {
            return Ok(SwapOutcome::refused(
                check.reason.unwrap_or_else(|| "Target is not available on this date".to_string()),
            ));
        }

        let settings =
            settings_or_default(self.settings.as_ref(), &self.config, scale.tenant_id, scale.ministry_id).await?;

        if settings.advance_notice_days > 0 {
            let days_left = (scale.event_date - today).num_days();
            if days_left < settings.advance_notice_days as i64 {
                return Ok(SwapOutcome::refused(format!(
                    "Swap requests need at least {} days of advance notice",
                    settings.advance_notice_days
                )));
            }
        }

        let duplicates = self
            .requests
            .list(
                scale.tenant_id,
                &SwapRequestFilter {
                    scale_id: Some(scale.id),
                    requester_id: Some(requester_id),
                    target_id: Some(target_id),
                    status: Some(SubstitutionStatus::Pending),
                },
            )
            .await?;
        if !duplicates.is_empty() {
            return Ok(duplicate_refusal());
        }

        let now = Utc::now();
        if settings.max_swap_requests_per_month > 0 {
            let created = self
                .requests
                .count_created_since(scale.tenant_id, requester_id, start_of_month(now))
                .await?;
            if created >= settings.max_swap_requests_per_month as i64 {
                return Ok(SwapOutcome::refused(format!(
                    "Monthly swap request quota of {} reached",
                    settings.max_swap_requests_per_month
                )));
            }
        }

        let request = SubstitutionRequest {
            id: SwapRequestId::new(),
            tenant_id: scale.tenant_id,
            scale_id: scale.id,
            ministry_id: scale.ministry_id,
            function_id: assignment.function_id,
            requester_id,
            target_id,
            reason: reason.to_string(),
            status: SubstitutionStatus::Pending,
            created_at: now,
            expires_at: now + Duration::hours(settings.swap_request_expiry_hours as i64),
            rejection_reason: None,
            responded_by: None,
            responded_at: None,
        };

        match self.requests.create(&request).await {
            Ok(stored) => Ok(SwapOutcome::created(stored.id)),
            Err(AppError::Conflict(_)) => Ok(duplicate_refusal()),
            Err(e) => Err(e),
        }
    }

    /// Answer of the target. Accepting executes the swap before the request turns terminal.
    pub async fn respond(
        &self,
        tenant_id: TenantId,
        request_id: SwapRequestId,
        responder_id: VolunteerId,
        decision: SwapDecision,
        rejection_reason: Option<String>,
    ) -> AppResult<SubstitutionRequest> {
        let request = self.load(tenant_id, request_id).await?;

        if request.target_id != responder_id {
            return Err(AppError::Forbidden("Only the target of a swap request can respond to it".to_string()));
        }
        ensure_pending(&request)?;

        let now = Utc::now();
        if request.is_expired_at(now) {
            self.requests
                .transition(tenant_id, request_id, SubstitutionStatus::Pending, &StatusChange::to(SubstitutionStatus::Expired))
                .await?;
            tracing::warn!(
                swap_request_id = %request_id,
                expires_at = %request.expires_at,
                "Response attempted on expired swap request"
            );
            return Err(expired_error());
        }

        let updated = match decision {
            SwapDecision::Accept => self.execute_swap(&request, responder_id, now).await?,
            SwapDecision::Reject => {
                let change = StatusChange::responded(SubstitutionStatus::Rejected, responder_id, now, rejection_reason);
                let rejected = self
                    .requests
                    .transition(tenant_id, request_id, SubstitutionStatus::Pending, &change)
                    .await?
                    .ok_or_else(|| already_responded(request_id))?;
                tracing::info!(swap_request_id = %request_id, target_id = %responder_id, "Swap request rejected");
                rejected
            }
        };

        let label = match decision {
            SwapDecision::Accept => "accept",
            SwapDecision::Reject => "reject",
        };
        counter!("swap_responses_total", "decision" => label).increment(1);
        Ok(updated)
    }

    /// Replaces the requester with the target in the scale, then marks the request accepted.
    ///
    /// The member replacement is a single conditional store operation; if it
    /// does not apply the request stays pending. Should another writer settle
    /// the request between the two steps, the replacement is rolled back.
    pub async fn execute_swap(
        &self,
        request: &SubstitutionRequest,
        responder_id: VolunteerId,
        now: DateTime<Utc>,
    ) -> AppResult<SubstitutionRequest> {
        let scale = self
            .scales
            .find_by_id(request.tenant_id, request.scale_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Scale {} no longer exists", request.scale_id)))?;
        if scale.assignment_for(request.function_id).is_none() {
            return Err(AppError::Conflict(format!(
                "Scale {} no longer has an assignment for function {}",
                scale.id, request.function_id
            )));
        }

        let swapped = self
            .scales
            .replace_assigned_member(
                request.tenant_id,
                request.scale_id,
                request.function_id,
                request.requester_id,
                request.target_id,
            )
            .await?;
        if !swapped {
            tracing::warn!(
                swap_request_id = %request.id,
                scale_id = %request.scale_id,
                "Requester no longer holds the assignment, swap not executed"
            );
            return Err(AppError::Conflict(
                "The requester is no longer assigned to this function on the scale".to_string(),
            ));
        }

        let change = StatusChange::responded(SubstitutionStatus::Accepted, responder_id, now, None);
        match self
            .requests
            .transition(request.tenant_id, request.id, SubstitutionStatus::Pending, &change)
            .await
        {
            Ok(Some(accepted)) => {
                tracing::info!(
                    swap_request_id = %request.id,
                    scale_id = %request.scale_id,
                    requester_id = %request.requester_id,
                    target_id = %request.target_id,
                    "Swap executed"
                );
                Ok(accepted)
            }
            Ok(None) => {
                self.revert(request).await;
                Err(AppError::Conflict(format!(
                    "Swap request {} was settled concurrently",
                    request.id
                )))
            }
            Err(e) => {
                self.revert(request).await;
                Err(e)
            }
        }
    }

    async fn revert(&self, request: &SubstitutionRequest) {
        let restored = self
            .scales
            .replace_assigned_member(
                request.tenant_id,
                request.scale_id,
                request.function_id,
                request.target_id,
                request.requester_id,
            )
            .await;
        if !matches!(restored, Ok(true)) {
            tracing::error!(
                swap_request_id = %request.id,
                scale_id = %request.scale_id,
                result = ?restored,
                "Failed to roll back member replacement"
            );
        }
    }

    pub async fn cancel_swap_request(
        &self,
        tenant_id: TenantId,
        request_id: SwapRequestId,
        requester_id: VolunteerId,
    ) -> AppResult<SubstitutionRequest> {
        let request = self.load(tenant_id, request_id).await?;
        if request.requester_id != requester_id {
            return Err(AppError::Forbidden("Only the requester can cancel a swap request".to_string()));
        }
        ensure_pending(&request)?;

        let cancelled = self
            .requests
            .transition(tenant_id, request_id, SubstitutionStatus::Pending, &StatusChange::to(SubstitutionStatus::Cancelled))
            .await?
            .ok_or_else(|| already_responded(request_id))?;

        tracing::info!(swap_request_id = %request_id, requester_id = %requester_id, "Swap request cancelled");
        Ok(cancelled)
    }

    /// Moves every overdue pending request of the tenant to `expired`.
    pub async fn expire_stale_requests(&self, tenant_id: TenantId) -> AppResult<usize> {
        let now = Utc::now();
        let overdue = self.requests.list_overdue(tenant_id, now).await?;

        let mut expired = 0;
        for request in &overdue {
            let change = StatusChange::to(SubstitutionStatus::Expired);
            if self
                .requests
                .transition(tenant_id, request.id, SubstitutionStatus::Pending, &change)
                .await?
                .is_some()
            {
                expired += 1;
            }
        }

        tracing::info!(tenant_id = %tenant_id, overdue = overdue.len(), expired, "Expired stale swap requests");
        Ok(expired)
    }

    async fn load(&self, tenant_id: TenantId, request_id: SwapRequestId) -> AppResult<SubstitutionRequest> {
        self.requests
            .find_by_id(tenant_id, request_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Swap request {} not found", request_id)))
    }
}

fn ensure_pending(request: &SubstitutionRequest) -> AppResult<()> {
    match request.status {
        SubstitutionStatus::Pending => Ok(()),
        SubstitutionStatus::Expired => Err(expired_error()),
        other => Err(AppError::BadRequest(format!(
            "Swap request was already responded to (status: {})",
            other
        ))),
    }
}

fn already_responded(request_id: SwapRequestId) -> AppError {
    AppError::BadRequest(format!("Swap request {} was already responded to", request_id))
}

fn expired_error() -> AppError {
    AppError::BadRequest("Swap request has expired".to_string())
}

fn duplicate_refusal() -> SwapOutcome {
    SwapOutcome::refused("A pending swap request to this volunteer already exists for this scale (duplicate)")
}
