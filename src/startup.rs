use axum::{
    http::{header, HeaderName, Method},
    middleware,
    response::Html,
    routing::{get, post, put},
    Json, Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;

use crate::{
    handlers,
    middleware::{metrics_middleware, request_id_middleware},
    openapi::ApiDoc,
};

pub fn build_router(state: Arc<crate::AppState>) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            header::CONTENT_TYPE,
            header::ACCEPT,
            HeaderName::from_static("x-tenant-id"),
            HeaderName::from_static("x-member-id"),
            HeaderName::from_static("x-request-id"),
        ])
        .expose_headers([HeaderName::from_static("x-request-id")]);

    // Availability routes
    let availability_routes = Router::new()
        .route("/", get(handlers::availability_handler::list_availability))
        .route("/unavailabilities", get(handlers::availability_handler::get_unavailabilities))
        .route("/block", post(handlers::availability_handler::block_date))
        .route("/unblock", post(handlers::availability_handler::unblock_date))
        .route("/check", get(handlers::availability_handler::check_date))
        .route("/monthly", get(handlers::availability_handler::get_monthly_info))
        .route("/free", get(handlers::availability_handler::get_free_volunteers));

    // Ministry routes
    let ministry_routes = Router::new().route(
        "/{id}/settings",
        get(handlers::ministry_settings_handler::get_settings)
            .put(handlers::ministry_settings_handler::update_settings),
    );

    // Scale routes
    let scale_routes = Router::new()
        .route("/{id}/suggestions", post(handlers::scales_handler::generate_suggestions))
        .route("/{id}/service-history", post(handlers::scales_handler::record_service_from_scale))
        .route("/{id}/swap-candidates", get(handlers::scales_handler::get_swap_candidates));

    // Swap request routes; /expire must come before /{id}
    let swap_request_routes = Router::new()
        .route(
            "/",
            get(handlers::swap_requests_handler::list_swap_requests)
                .post(handlers::swap_requests_handler::create_swap_request),
        )
        .route("/expire", post(handlers::swap_requests_handler::expire_swap_requests))
        .route(
            "/{id}",
            get(handlers::swap_requests_handler::get_swap_request)
                .delete(handlers::swap_requests_handler::cancel_swap_request),
        )
        .route("/{id}/respond", post(handlers::swap_requests_handler::respond_swap_request));

    // Service history routes
    let service_history_routes = Router::new()
        .route(
            "/",
            get(handlers::service_history_handler::list_service_history)
                .post(handlers::service_history_handler::create_service_history),
        )
        .route("/{id}", put(handlers::service_history_handler::update_service_history))
        .route(
            "/volunteers/{id}/stats",
            get(handlers::service_history_handler::get_volunteer_stats),
        )
        .route(
            "/ministries/{id}/stats",
            get(handlers::service_history_handler::get_ministry_stats),
        );

    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/metrics", get(handlers::metrics_handler))
        .nest("/api/availability", availability_routes)
        .nest("/api/ministries", ministry_routes)
        .nest("/api/scales", scale_routes)
        .nest("/api/swap-requests", swap_request_routes)
        .nest("/api/service-history", service_history_routes)
        .route("/api-docs/openapi.json", get(|| async { Json(ApiDoc::openapi()) }))
        .route("/swagger-ui", get(swagger_ui))
        .route_layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http().make_span_with(|request: &axum::extract::Request| {
            tracing::info_span!(
                "http_request",
                method = %request.method(),
                uri = %request.uri(),
                request_id = tracing::field::Empty,
            )
        }))
        .layer(cors)
        .with_state(state)
}

async fn swagger_ui() -> Html<&'static str> {
    Html(r#"
<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Ministry Scales API Documentation</title>
    <link rel="stylesheet" type="text/css" href="https://unpkg.com/swagger-ui-dist@5/swagger-ui.css" />
</head>
<body>
    <div id="swagger-ui"></div>
    <script src="https://unpkg.com/swagger-ui-dist@5/swagger-ui-bundle.js"></script>
    <script src="https://unpkg.com/swagger-ui-dist@5/swagger-ui-standalone-preset.js"></script>
    <script>
        window.onload = () => {
            window.ui = SwaggerUIBundle({
                url: '/api-docs/openapi.json',
                dom_id: '#swagger-ui',
                presets: [
                    SwaggerUIBundle.presets.apis,
                    SwaggerUIStandalonePreset
                ],
                layout: "StandaloneLayout"
            });
        };
    </script>
</body>
</html>
    "#)
}
