mod common;

use common::{next_month, TestApp};
use ministry_scales::models::{FunctionId, MinistryRole, QualificationLevel, ScaleStatus, VolunteerId};

#[tokio::test]
async fn least_recently_used_volunteers_come_first() {
    let app = TestApp::new();
    let function = FunctionId::new();

    let mut volunteers: Vec<(VolunteerId, i64)> = Vec::new();
    for (name, services) in [("Ana", 0), ("Bruno", 2), ("Carla", 1)] {
        let id = app.add_member(name, MinistryRole::Volunteer).await;
        app.qualify(id, function, QualificationLevel::Intermediate, 1).await;
        for days_ago in 0..services {
            app.past_service(id, function, 7 + days_ago * 7).await;
        }
        volunteers.push((id, services));
    }
    let scale = app.scale_on(next_month(6), ScaleStatus::Draft, &[(function, 2, vec![])]).await;

    let result = app.state.scales.generate_suggestions(&scale).await.unwrap();
    let role = &result.suggestions[0];
    let counts: Vec<i64> = role.suggestions.iter().map(|s| s.service_count).collect();
    assert_eq!(counts, vec![0, 1, 2]);
    assert_eq!(role.suggestions[0].volunteer_id, volunteers[0].0);
    assert_eq!(role.available_count, 3);

    assert_eq!(result.total_volunteers_needed, 2);
    assert_eq!(result.total_volunteers_available, 3);
    assert_eq!(result.coverage, 100.0);
    assert!(result.requires_approval);

    let again = app.state.scales.generate_suggestions(&scale).await.unwrap();
    assert_eq!(again.suggestions, result.suggestions);
}

#[tokio::test]
async fn blocked_unqualified_and_admin_members_are_not_suggested() {
    let app = TestApp::new();
    let function = FunctionId::new();
    let date = next_month(6);

    let free = app.add_member("Ana", MinistryRole::Volunteer).await;
    let blocked = app.add_member("Bruno", MinistryRole::Volunteer).await;
    let unqualified = app.add_member("Carla", MinistryRole::Leader).await;
    let admin = app.add_member("Davi", MinistryRole::Admin).await;
    for id in [free, blocked, admin] {
        app.qualify(id, function, QualificationLevel::Advanced, 1).await;
    }
    app.state
        .availability
        .block_date(app.tenant, app.ministry, blocked, date, None)
        .await
        .unwrap();

    let scale = app.scale_on(date, ScaleStatus::Draft, &[(function, 4, vec![])]).await;
    let result = app.state.scales.generate_suggestions(&scale).await.unwrap();

    let ids: Vec<VolunteerId> = result.suggestions[0].suggestions.iter().map(|s| s.volunteer_id).collect();
    assert_eq!(ids, vec![free]);
    assert!(!ids.contains(&unqualified));
    assert_eq!(result.coverage, 25.0);
}

#[tokio::test]
async fn priority_then_level_break_ties() {
    let app = TestApp::new();
    let function = FunctionId::new();

    let low_priority = app.add_member("Ana", MinistryRole::Volunteer).await;
    let beginner = app.add_member("Bruno", MinistryRole::Volunteer).await;
    let specialist = app.add_member("Carla", MinistryRole::Volunteer).await;
    app.qualify(low_priority, function, QualificationLevel::Specialist, 3).await;
    app.qualify(beginner, function, QualificationLevel::Beginner, 1).await;
    app.qualify(specialist, function, QualificationLevel::Specialist, 1).await;

    let scale = app.scale_on(next_month(6), ScaleStatus::Draft, &[(function, 2, vec![])]).await;
    let result = app.state.scales.generate_suggestions(&scale).await.unwrap();

    let ids: Vec<VolunteerId> = result.suggestions[0].suggestions.iter().map(|s| s.volunteer_id).collect();
    assert_eq!(ids, vec![specialist, beginner, low_priority]);
}

#[tokio::test]
async fn suggestions_are_capped_and_skip_assigned_members() {
    let app = TestApp::new();
    let function = FunctionId::new();

    let assigned = app.add_member("Zeca", MinistryRole::Volunteer).await;
    app.qualify(assigned, function, QualificationLevel::Advanced, 1).await;
    for name in ["Ana", "Bia", "Caio", "Duda"] {
        let id = app.add_member(name, MinistryRole::Volunteer).await;
        app.qualify(id, function, QualificationLevel::Advanced, 1).await;
    }

    let scale = app
        .scale_on(next_month(6), ScaleStatus::Draft, &[(function, 1, vec![assigned])])
        .await;
    let result = app.state.scales.generate_suggestions(&scale).await.unwrap();
    let role = &result.suggestions[0];

    assert_eq!(role.already_assigned, vec![assigned]);
    assert_eq!(role.suggestions.len(), 2);
    assert!(role.suggestions.iter().all(|s| s.volunteer_id != assigned));
    assert_eq!(role.suggestions[0].name, "Ana");
}
