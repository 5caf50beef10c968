mod common;

use common::{next_month, TestApp};
use ministry_scales::models::{FunctionId, MinistryRole, QualificationLevel, ScaleId, ScaleStatus};
use serde_json::json;

#[tokio::test]
async fn health_and_docs_need_no_caller() {
    let app = TestApp::new();

    let (status, body) = app.call("GET", "/health", None, None).await;
    assert_eq!(status, 200);
    assert_eq!(body["status"], "ok");

    let (status, body) = app.call("GET", "/api-docs/openapi.json", None, None).await;
    assert_eq!(status, 200);
    assert!(body["paths"]["/api/swap-requests/{id}/respond"].is_object());
}

#[tokio::test]
async fn missing_caller_headers_are_unauthorized() {
    let app = TestApp::new();
    let (status, body) = app
        .call("GET", &format!("/api/ministries/{}/settings", app.ministry), None, None)
        .await;
    assert_eq!(status, 401);
    assert!(body["error"].as_str().unwrap().contains("X-Tenant-Id"));
}

#[tokio::test]
async fn volunteer_blocks_own_date_but_not_others() {
    let app = TestApp::new();
    let vera = app.add_member("Vera", MinistryRole::Volunteer).await;
    let other = app.add_member("Otto", MinistryRole::Volunteer).await;
    let date = next_month(11).to_string();

    let (status, body) = app
        .call(
            "POST",
            "/api/availability/block",
            Some(vera),
            Some(json!({ "ministry_id": app.ministry, "date": date, "reason": "Travel" })),
        )
        .await;
    assert_eq!(status, 200, "{}", body);
    assert_eq!(body["blocked_dates"][0]["reason"], "Travel");

    let (status, body) = app
        .call(
            "GET",
            &format!("/api/availability/check?ministryId={}&date={}", app.ministry, date),
            Some(vera),
            None,
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["is_blocked"], true);

    let (status, _) = app
        .call(
            "POST",
            "/api/availability/block",
            Some(vera),
            Some(json!({ "ministry_id": app.ministry, "volunteer_id": other, "date": date })),
        )
        .await;
    assert_eq!(status, 403);
}

#[tokio::test]
async fn only_leaders_change_settings() {
    let app = TestApp::new();
    let leader = app.add_member("Lia", MinistryRole::Leader).await;
    let volunteer = app.add_member("Vera", MinistryRole::Volunteer).await;
    let uri = format!("/api/ministries/{}/settings", app.ministry);

    let (status, body) = app.call("GET", &uri, Some(volunteer), None).await;
    assert_eq!(status, 200);
    assert_eq!(body["max_blocked_days_per_month"], 30);

    let (status, _) = app
        .call("PUT", &uri, Some(volunteer), Some(json!({ "max_blocked_days_per_month": 3 })))
        .await;
    assert_eq!(status, 403);

    let (status, body) = app
        .call("PUT", &uri, Some(leader), Some(json!({ "max_blocked_days_per_month": 3 })))
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["max_blocked_days_per_month"], 3);

    let (status, _) = app
        .call("PUT", &uri, Some(leader), Some(json!({ "advance_notice_days": -1 })))
        .await;
    assert_eq!(status, 422);
}

#[tokio::test]
async fn swap_round_trip_over_http() {
    let app = TestApp::new();
    let function = FunctionId::new();
    let requester = app.add_member("Ana", MinistryRole::Volunteer).await;
    let target = app.add_member("Bruno", MinistryRole::Volunteer).await;
    app.qualify(target, function, QualificationLevel::Advanced, 1).await;
    let scale = app
        .scale_on(next_month(9), ScaleStatus::Published, &[(function, 1, vec![requester])])
        .await;

    let (status, body) = app
        .call(
            "POST",
            "/api/swap-requests",
            Some(requester),
            Some(json!({ "scale_id": scale.id, "target_id": target, "reason": "Conference" })),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["success"], true);
    let id = body["swap_request_id"].as_str().unwrap().to_string();

    let (status, body) = app
        .call("GET", "/api/swap-requests?view=incoming", Some(target), None)
        .await;
    assert_eq!(status, 200);
    assert_eq!(body.as_array().unwrap().len(), 1);

    let respond = format!("/api/swap-requests/{}/respond", id);
    let (status, body) = app
        .call("POST", &respond, Some(target), Some(json!({ "accept": true })))
        .await;
    assert_eq!(status, 200, "{}", body);
    assert_eq!(body["success"], true);

    let (status, body) = app
        .call("POST", &respond, Some(target), Some(json!({ "accept": true })))
        .await;
    assert_eq!(status, 400);
    assert!(body["error"].as_str().unwrap().contains("already responded"));

    let (status, _) = app
        .call("GET", "/api/swap-requests?view=everything", Some(target), None)
        .await;
    assert_eq!(status, 400);
}

#[tokio::test]
async fn suggestions_require_scale_management() {
    let app = TestApp::new();
    let leader = app.add_member("Lia", MinistryRole::Leader).await;
    let volunteer = app.add_member("Vera", MinistryRole::Volunteer).await;
    let scale = app
        .scale_on(next_month(9), ScaleStatus::Draft, &[(FunctionId::new(), 1, vec![])])
        .await;
    let uri = format!("/api/scales/{}/suggestions", scale.id);

    let (status, _) = app.call("POST", &uri, Some(volunteer), None).await;
    assert_eq!(status, 403);

    let (status, body) = app.call("POST", &uri, Some(leader), None).await;
    assert_eq!(status, 200);
    assert_eq!(body["total_volunteers_needed"], 1);

    let (status, _) = app
        .call("POST", &format!("/api/scales/{}/suggestions", ScaleId::new()), Some(leader), None)
        .await;
    assert_eq!(status, 404);
}

#[tokio::test]
async fn responses_carry_a_request_id() {
    let app = TestApp::new();
    let response = {
        use axum::{body::Body, http::Request};
        use tower::ServiceExt;
        app.router
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .header("X-Request-ID", "trace-123")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap()
    };
    assert_eq!(response.headers()["x-request-id"], "trace-123");
}
