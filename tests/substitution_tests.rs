mod common;

use chrono::{Duration, Utc};
use common::{next_month, TestApp};
use ministry_scales::{
    models::{
        CreateSwapRequestInput, FunctionId, MinistryRole, QualificationLevel, RespondSwapRequestInput, Scale,
        ScaleStatus, SubstitutionRequest, SubstitutionStatus, SwapRequestId, UpdateMinistrySettingsInput,
        VolunteerId,
    },
    AppError,
};

struct SwapFixture {
    app: TestApp,
    scale: Scale,
    function: FunctionId,
    requester: VolunteerId,
    target: VolunteerId,
}

async fn fixture(qualify_target: bool) -> SwapFixture {
    let app = TestApp::new();
    let function = FunctionId::new();
    let requester = app.add_member("Alice", MinistryRole::Volunteer).await;
    let target = app.add_member("Bruno", MinistryRole::Volunteer).await;
    app.qualify(requester, function, QualificationLevel::Advanced, 1).await;
    if qualify_target {
        app.qualify(target, function, QualificationLevel::Intermediate, 1).await;
    }
    let scale = app
        .scale_on(next_month(15), ScaleStatus::Published, &[(function, 2, vec![requester])])
        .await;

    SwapFixture {
        app,
        scale,
        function,
        requester,
        target,
    }
}

impl SwapFixture {
    fn input(&self) -> CreateSwapRequestInput {
        CreateSwapRequestInput {
            scale_id: self.scale.id,
            target_id: self.target,
            reason: "Work trip".to_string(),
        }
    }

    async fn create_pending(&self) -> SwapRequestId {
        let outcome = self
            .app
            .state
            .substitutions
            .create(self.app.tenant, self.requester, &self.input())
            .await
            .unwrap();
        assert!(outcome.success, "{}", outcome.message);
        outcome.swap_request_id.unwrap()
    }

    async fn respond(&self, id: SwapRequestId, accept: bool) -> Result<SubstitutionRequest, AppError> {
        self.app
            .state
            .substitutions
            .respond(
                self.app.tenant,
                id,
                self.target,
                RespondSwapRequestInput {
                    accept,
                    rejection_reason: (!accept).then(|| "Busy".to_string()),
                },
            )
            .await
    }
}

#[tokio::test]
async fn unqualified_target_is_refused_naming_the_function() {
    let f = fixture(false).await;

    let outcome = f
        .app
        .state
        .substitutions
        .create(f.app.tenant, f.requester, &f.input())
        .await
        .unwrap();

    assert!(!outcome.success);
    assert!(outcome.message.contains("function"), "unexpected message: {}", outcome.message);
    assert!(outcome.swap_request_id.is_none());
}

#[tokio::test]
async fn accepted_swap_replaces_member_and_cannot_be_answered_twice() {
    let f = fixture(true).await;
    let id = f.create_pending().await;

    let accepted = f.respond(id, true).await.unwrap();
    assert_eq!(accepted.status, SubstitutionStatus::Accepted);
    assert_eq!(accepted.responded_by, Some(f.target));

    let scale = f.app.state.scales.find(f.app.tenant, f.scale.id).await.unwrap();
    let assignment = scale.assignment_for(f.function).unwrap();
    assert!(!assignment.has_member(f.requester));
    assert!(assignment.has_member(f.target));

    let second = f.respond(id, true).await;
    match second {
        Err(AppError::BadRequest(msg)) => assert!(msg.contains("already responded"), "unexpected: {}", msg),
        other => panic!("expected already responded, got {:?}", other),
    }
}

#[tokio::test]
async fn rejection_keeps_the_scale_untouched() {
    let f = fixture(true).await;
    let id = f.create_pending().await;

    let rejected = f.respond(id, false).await.unwrap();
    assert_eq!(rejected.status, SubstitutionStatus::Rejected);
    assert_eq!(rejected.rejection_reason.as_deref(), Some("Busy"));

    let scale = f.app.state.scales.find(f.app.tenant, f.scale.id).await.unwrap();
    assert!(scale.assignment_for(f.function).unwrap().has_member(f.requester));
}

#[tokio::test]
async fn only_the_target_may_respond() {
    let f = fixture(true).await;
    let id = f.create_pending().await;

    let result = f
        .app
        .state
        .substitutions
        .respond(
            f.app.tenant,
            id,
            f.requester,
            RespondSwapRequestInput {
                accept: true,
                rejection_reason: None,
            },
        )
        .await;
    assert!(matches!(result, Err(AppError::Forbidden(_))));
}

#[tokio::test]
async fn expired_request_stays_pending_until_a_response_surfaces_it() {
    let f = fixture(true).await;
    let now = Utc::now();
    let stale = SubstitutionRequest {
        id: SwapRequestId::new(),
        tenant_id: f.app.tenant,
        scale_id: f.scale.id,
        ministry_id: f.app.ministry,
        function_id: f.function,
        requester_id: f.requester,
        target_id: f.target,
        reason: "Work trip".to_string(),
        status: SubstitutionStatus::Pending,
        created_at: now - Duration::hours(30),
        expires_at: now - Duration::hours(6),
        rejection_reason: None,
        responded_by: None,
        responded_at: None,
    };
    f.app.stores.requests.create(&stale).await.unwrap();

    let before = f.app.state.substitutions.get(f.app.tenant, stale.id, f.target).await.unwrap();
    assert_eq!(before.status, SubstitutionStatus::Pending);

    let result = f.respond(stale.id, true).await;
    match result {
        Err(AppError::BadRequest(msg)) => assert!(msg.contains("expired"), "unexpected: {}", msg),
        other => panic!("expected expired failure, got {:?}", other),
    }

    let after = f.app.state.substitutions.get(f.app.tenant, stale.id, f.target).await.unwrap();
    assert_eq!(after.status, SubstitutionStatus::Expired);
    let scale = f.app.state.scales.find(f.app.tenant, f.scale.id).await.unwrap();
    assert!(scale.assignment_for(f.function).unwrap().has_member(f.requester));
}

#[tokio::test]
async fn sweep_expires_only_overdue_requests() {
    let f = fixture(true).await;
    let fresh = f.create_pending().await;

    let now = Utc::now();
    let overdue = SubstitutionRequest {
        id: SwapRequestId::new(),
        tenant_id: f.app.tenant,
        scale_id: f.scale.id,
        ministry_id: f.app.ministry,
        function_id: f.function,
        requester_id: f.requester,
        target_id: VolunteerId::new(),
        reason: "Sick".to_string(),
        status: SubstitutionStatus::Pending,
        created_at: now - Duration::days(2),
        expires_at: now - Duration::days(1),
        rejection_reason: None,
        responded_by: None,
        responded_at: None,
    };
    f.app.stores.requests.create(&overdue).await.unwrap();

    let expired = f.app.state.substitutions.expire_stale(f.app.tenant).await.unwrap();
    assert_eq!(expired, 1);
    assert_eq!(f.app.state.substitutions.expire_stale(f.app.tenant).await.unwrap(), 0);

    let still_pending = f.app.state.substitutions.get(f.app.tenant, fresh, f.target).await.unwrap();
    assert_eq!(still_pending.status, SubstitutionStatus::Pending);
}

#[tokio::test]
async fn duplicate_pending_request_is_refused() {
    let f = fixture(true).await;
    f.create_pending().await;

    let again = f
        .app
        .state
        .substitutions
        .create(f.app.tenant, f.requester, &f.input())
        .await
        .unwrap();
    assert!(!again.success);
    assert!(again.message.contains("duplicate"));
}

#[tokio::test]
async fn blocked_target_is_refused_with_block_reason() {
    let f = fixture(true).await;
    f.app
        .state
        .availability
        .block_date(f.app.tenant, f.app.ministry, f.target, f.scale.event_date, Some("Vacation".to_string()))
        .await
        .unwrap();

    let outcome = f
        .app
        .state
        .substitutions
        .create(f.app.tenant, f.requester, &f.input())
        .await
        .unwrap();
    assert!(!outcome.success);
    assert_eq!(outcome.message, "Vacation");
}

#[tokio::test]
async fn monthly_swap_quota_is_enforced() {
    let f = fixture(true).await;
    f.app
        .state
        .ministry_settings
        .update(
            f.app.tenant,
            f.app.ministry,
            &UpdateMinistrySettingsInput {
                max_swap_requests_per_month: Some(1),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    f.create_pending().await;

    let other = f.app.add_member("Carla", MinistryRole::Volunteer).await;
    f.app.qualify(other, f.function, QualificationLevel::Beginner, 2).await;
    let outcome = f
        .app
        .state
        .substitutions
        .create(
            f.app.tenant,
            f.requester,
            &CreateSwapRequestInput {
                scale_id: f.scale.id,
                target_id: other,
                reason: "Work trip".to_string(),
            },
        )
        .await
        .unwrap();
    assert!(!outcome.success);
    assert!(outcome.message.contains("quota of 1"));
}

#[tokio::test]
async fn cancelled_scale_cannot_be_swapped() {
    let f = fixture(true).await;
    let cancelled = f
        .app
        .scale_on(next_month(20), ScaleStatus::Cancelled, &[(f.function, 1, vec![f.requester])])
        .await;

    let outcome = f
        .app
        .state
        .substitutions
        .create(
            f.app.tenant,
            f.requester,
            &CreateSwapRequestInput {
                scale_id: cancelled.id,
                target_id: f.target,
                reason: "Work trip".to_string(),
            },
        )
        .await
        .unwrap();
    assert!(!outcome.success);
}

#[tokio::test]
async fn requester_can_cancel_only_while_pending() {
    let f = fixture(true).await;
    let id = f.create_pending().await;

    let forbidden = f.app.state.substitutions.cancel(f.app.tenant, id, f.target).await;
    assert!(matches!(forbidden, Err(AppError::Forbidden(_))));

    let cancelled = f.app.state.substitutions.cancel(f.app.tenant, id, f.requester).await.unwrap();
    assert_eq!(cancelled.status, SubstitutionStatus::Cancelled);

    let again = f.app.state.substitutions.cancel(f.app.tenant, id, f.requester).await;
    assert!(matches!(again, Err(AppError::BadRequest(_))));
    assert!(matches!(f.respond(id, true).await, Err(AppError::BadRequest(_))));
}

#[tokio::test]
async fn candidates_list_available_members_first() {
    let f = fixture(true).await;
    let busy = f.app.add_member("Carla", MinistryRole::Volunteer).await;
    f.app.qualify(busy, f.function, QualificationLevel::Specialist, 1).await;
    f.app
        .state
        .availability
        .block_date(f.app.tenant, f.app.ministry, busy, f.scale.event_date, Some("Away".to_string()))
        .await
        .unwrap();

    let candidates = f
        .app
        .state
        .substitutions
        .find_candidates(f.app.tenant, f.scale.id, f.requester)
        .await
        .unwrap();

    let ids: Vec<VolunteerId> = candidates.iter().map(|c| c.volunteer_id).collect();
    assert_eq!(ids, vec![f.target, busy]);
    assert!(candidates[0].is_available);
    assert!(!candidates[1].is_available);
    assert_eq!(candidates[1].unavailable_reason.as_deref(), Some("Away"));

    let stranger = f
        .app
        .state
        .substitutions
        .find_candidates(f.app.tenant, f.scale.id, f.target)
        .await;
    assert!(matches!(stranger, Err(AppError::BadRequest(_))));
}

#[tokio::test]
async fn unavailable_candidates_rank_by_priority_regardless_of_conflicts() {
    let f = fixture(true).await;
    let booked = f.app.add_member("Xavier", MinistryRole::Volunteer).await;
    let away = f.app.add_member("Yara", MinistryRole::Volunteer).await;
    f.app.qualify(booked, f.function, QualificationLevel::Beginner, 1).await;
    f.app.qualify(away, f.function, QualificationLevel::Specialist, 5).await;
    f.app
        .scale_on(f.scale.event_date, ScaleStatus::Published, &[(FunctionId::new(), 1, vec![booked])])
        .await;
    f.app
        .state
        .availability
        .block_date(f.app.tenant, f.app.ministry, away, f.scale.event_date, Some("Retreat".to_string()))
        .await
        .unwrap();

    let candidates = f
        .app
        .state
        .substitutions
        .find_candidates(f.app.tenant, f.scale.id, f.requester)
        .await
        .unwrap();

    let ids: Vec<VolunteerId> = candidates.iter().map(|c| c.volunteer_id).collect();
    assert_eq!(ids, vec![f.target, booked, away]);
    assert!(!candidates[1].is_available);
    assert!(candidates[1].has_conflict);
    assert!(!candidates[2].is_available);
    assert!(!candidates[2].has_conflict);
    assert_eq!(candidates[2].unavailable_reason.as_deref(), Some("Retreat"));
}

#[tokio::test]
async fn second_acceptance_fails_once_requester_was_swapped_out() {
    let f = fixture(true).await;
    let other = f.app.add_member("Carla", MinistryRole::Volunteer).await;
    f.app.qualify(other, f.function, QualificationLevel::Advanced, 2).await;

    let first = f.create_pending().await;
    let outcome = f
        .app
        .state
        .substitutions
        .create(
            f.app.tenant,
            f.requester,
            &CreateSwapRequestInput {
                scale_id: f.scale.id,
                target_id: other,
                reason: "Work trip".to_string(),
            },
        )
        .await
        .unwrap();
    assert!(outcome.success, "{}", outcome.message);
    let second = outcome.swap_request_id.unwrap();

    f.respond(first, true).await.unwrap();

    let late = f
        .app
        .state
        .substitutions
        .respond(
            f.app.tenant,
            second,
            other,
            RespondSwapRequestInput {
                accept: true,
                rejection_reason: None,
            },
        )
        .await;
    assert!(matches!(late, Err(AppError::Conflict(_))), "got {:?}", late);

    let still_pending = f.app.state.substitutions.get(f.app.tenant, second, other).await.unwrap();
    assert_eq!(still_pending.status, SubstitutionStatus::Pending);
    assert!(still_pending.responded_at.is_none());

    let scale = f.app.state.scales.find(f.app.tenant, f.scale.id).await.unwrap();
    let assignment = scale.assignment_for(f.function).unwrap();
    assert_eq!(assignment.assigned_members, vec![f.target]);
}

#[tokio::test]
async fn listings_split_mine_and_incoming() {
    let f = fixture(true).await;
    let id = f.create_pending().await;
    let subs = &f.app.state.substitutions;

    let mine = subs.list_mine(f.app.tenant, f.requester, None).await.unwrap();
    assert_eq!(mine.len(), 1);
    assert!(subs.list_mine(f.app.tenant, f.target, None).await.unwrap().is_empty());

    let incoming = subs.list_incoming(f.app.tenant, f.target, Some(f.scale.id)).await.unwrap();
    assert_eq!(incoming.iter().map(|r| r.id).collect::<Vec<_>>(), vec![id]);

    f.respond(id, false).await.unwrap();
    assert!(subs.list_incoming(f.app.tenant, f.target, None).await.unwrap().is_empty());
    assert_eq!(subs.list_for_scale(f.app.tenant, f.scale.id).await.unwrap().len(), 1);

    let outsider = subs.get(f.app.tenant, id, VolunteerId::new()).await;
    assert!(matches!(outsider, Err(AppError::NotFound(_))));
}
