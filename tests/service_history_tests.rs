mod common;

use common::{next_month, TestApp};
use ministry_scales::{
    models::{
        CreateServiceHistoryInput, CreateSwapRequestInput, FunctionId, MinistryId, MinistryRole, QualificationLevel,
        RespondSwapRequestInput, ScaleStatus, ServiceHistoryFilter, ServiceStatus, UpdateServiceHistoryInput,
    },
    AppError,
};

#[tokio::test]
async fn closing_a_scale_records_every_member_once() {
    let app = TestApp::new();
    let leader = app.add_member("Lia", MinistryRole::Leader).await;
    let sound = FunctionId::new();
    let music = FunctionId::new();
    let a = app.add_member("Ana", MinistryRole::Volunteer).await;
    let b = app.add_member("Bruno", MinistryRole::Volunteer).await;
    let c = app.add_member("Carla", MinistryRole::Volunteer).await;
    let scale = app
        .scale_on(next_month(4), ScaleStatus::Published, &[(sound, 1, vec![a]), (music, 2, vec![b, c])])
        .await;

    let first = app
        .state
        .service_history
        .record_from_scale(app.tenant, scale.id, leader)
        .await
        .unwrap();
    assert_eq!(first.created, 3);
    assert_eq!(first.skipped, 0);
    assert!(first
        .records
        .iter()
        .all(|r| r.status == ServiceStatus::Completed && r.service_date == scale.event_date));

    let second = app
        .state
        .service_history
        .record_from_scale(app.tenant, scale.id, leader)
        .await
        .unwrap();
    assert_eq!(second.created, 0);
    assert_eq!(second.skipped, 3);
}

#[tokio::test]
async fn cancelled_scales_are_not_recorded() {
    let app = TestApp::new();
    let leader = app.add_member("Lia", MinistryRole::Leader).await;
    let scale = app
        .scale_on(next_month(4), ScaleStatus::Cancelled, &[(FunctionId::new(), 1, vec![leader])])
        .await;

    let result = app.state.service_history.record_from_scale(app.tenant, scale.id, leader).await;
    assert!(matches!(result, Err(AppError::BadRequest(_))));
}

#[tokio::test]
async fn accepted_swap_flows_into_history() {
    let app = TestApp::new();
    let leader = app.add_member("Lia", MinistryRole::Leader).await;
    let function = FunctionId::new();
    let requester = app.add_member("Ana", MinistryRole::Volunteer).await;
    let target = app.add_member("Bruno", MinistryRole::Volunteer).await;
    app.qualify(target, function, QualificationLevel::Advanced, 1).await;
    let scale = app
        .scale_on(next_month(8), ScaleStatus::Published, &[(function, 1, vec![requester])])
        .await;

    // Requester was recorded before the swap happened
    app.state
        .service_history
        .create(
            app.tenant,
            leader,
            &CreateServiceHistoryInput {
                scale_id: scale.id,
                volunteer_id: requester,
                function_id: function,
                ministry_id: app.ministry,
                service_date: None,
                status: None,
                notes: None,
            },
        )
        .await
        .unwrap();

    let outcome = app
        .state
        .substitutions
        .create(
            app.tenant,
            requester,
            &CreateSwapRequestInput {
                scale_id: scale.id,
                target_id: target,
                reason: "Exam week".to_string(),
            },
        )
        .await
        .unwrap();
    let request_id = outcome.swap_request_id.unwrap();
    app.state
        .substitutions
        .respond(
            app.tenant,
            request_id,
            target,
            RespondSwapRequestInput {
                accept: true,
                rejection_reason: None,
            },
        )
        .await
        .unwrap();

    let requester_history = app
        .state
        .service_history
        .list(
            app.tenant,
            &ServiceHistoryFilter {
                volunteer_id: Some(requester),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(requester_history[0].status, ServiceStatus::Replaced);

    let summary = app
        .state
        .service_history
        .record_from_scale(app.tenant, scale.id, leader)
        .await
        .unwrap();
    assert_eq!(summary.created, 1);
    let record = &summary.records[0];
    assert_eq!(record.volunteer_id, target);
    assert_eq!(record.original_user_id, Some(requester));
    assert_eq!(record.substitution_request_id, Some(request_id));
}

#[tokio::test]
async fn duplicate_and_foreign_ministry_records_are_rejected() {
    let app = TestApp::new();
    let leader = app.add_member("Lia", MinistryRole::Leader).await;
    let volunteer = app.add_member("Ana", MinistryRole::Volunteer).await;
    let function = FunctionId::new();
    let scale = app
        .scale_on(next_month(2), ScaleStatus::Published, &[(function, 1, vec![volunteer])])
        .await;
    let input = CreateServiceHistoryInput {
        scale_id: scale.id,
        volunteer_id: volunteer,
        function_id: function,
        ministry_id: app.ministry,
        service_date: None,
        status: Some(ServiceStatus::Missed),
        notes: Some("No show".to_string()),
    };

    let created = app.state.service_history.create(app.tenant, leader, &input).await.unwrap();
    assert_eq!(created.status, ServiceStatus::Missed);
    assert_eq!(created.recorded_by, Some(leader));

    let duplicate = app.state.service_history.create(app.tenant, leader, &input).await;
    assert!(matches!(duplicate, Err(AppError::Conflict(_))));

    let foreign = CreateServiceHistoryInput {
        ministry_id: MinistryId::new(),
        ..input
    };
    let mismatch = app.state.service_history.create(app.tenant, leader, &foreign).await;
    assert!(matches!(mismatch, Err(AppError::BadRequest(_))));
}

#[tokio::test]
async fn corrections_feed_attendance_stats() {
    let app = TestApp::new();
    let leader = app.add_member("Lia", MinistryRole::Leader).await;
    let a = app.add_member("Ana", MinistryRole::Volunteer).await;
    let b = app.add_member("Bruno", MinistryRole::Volunteer).await;
    let function = FunctionId::new();

    for day in [3, 10, 17] {
        let scale = app
            .scale_on(next_month(day), ScaleStatus::Published, &[(function, 2, vec![a, b])])
            .await;
        app.state
            .service_history
            .record_from_scale(app.tenant, scale.id, leader)
            .await
            .unwrap();
    }

    let missed = app
        .state
        .service_history
        .list(
            app.tenant,
            &ServiceHistoryFilter {
                volunteer_id: Some(b),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    let corrected = app
        .state
        .service_history
        .update(
            app.tenant,
            missed[0].id,
            &UpdateServiceHistoryInput {
                status: Some(ServiceStatus::Missed),
                notes: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(corrected.status, ServiceStatus::Missed);

    let stats_b = app
        .state
        .service_history
        .volunteer_stats(app.tenant, b, Some(app.ministry), None, None)
        .await
        .unwrap();
    assert_eq!(stats_b.total, 3);
    assert_eq!(stats_b.completed, 2);
    assert_eq!(stats_b.missed, 1);
    assert_eq!(stats_b.attendance_rate, 66.67);

    let ministry = app
        .state
        .service_history
        .ministry_stats(app.tenant, app.ministry, None, None)
        .await
        .unwrap();
    assert_eq!(ministry.total_services, 6);
    assert_eq!(ministry.volunteers[0].volunteer_id, a);
    assert_eq!(ministry.volunteers[0].attendance_rate, 100.0);

    let narrowed = app
        .state
        .service_history
        .volunteer_stats(app.tenant, a, None, Some(next_month(10)), Some(next_month(10)))
        .await
        .unwrap();
    assert_eq!(narrowed.total, 1);
    assert_eq!(narrowed.last_service_date, Some(next_month(10)));
}
