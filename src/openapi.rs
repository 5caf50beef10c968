use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::Modify;
use utoipa::OpenApi;

use crate::extractors::{MEMBER_HEADER, TENANT_HEADER};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Ministry Scales API",
        version = "0.1.0",
        description = "Volunteer availability, scale suggestions, swap requests and service history for church ministries"
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development server"),
    ),
    paths(
        // Health
        crate::handlers::health::health_check,

        // Availability
        crate::handlers::availability_handler::list_availability,
        crate::handlers::availability_handler::get_unavailabilities,
        crate::handlers::availability_handler::block_date,
        crate::handlers::availability_handler::unblock_date,
        crate::handlers::availability_handler::check_date,
        crate::handlers::availability_handler::get_monthly_info,
        crate::handlers::availability_handler::get_free_volunteers,

        // Ministries
        crate::handlers::ministry_settings_handler::get_settings,
        crate::handlers::ministry_settings_handler::update_settings,

        // Scales
        crate::handlers::scales_handler::generate_suggestions,
        crate::handlers::scales_handler::record_service_from_scale,
        crate::handlers::scales_handler::get_swap_candidates,

        // Swap requests
        crate::handlers::swap_requests_handler::list_swap_requests,
        crate::handlers::swap_requests_handler::create_swap_request,
        crate::handlers::swap_requests_handler::get_swap_request,
        crate::handlers::swap_requests_handler::respond_swap_request,
        crate::handlers::swap_requests_handler::cancel_swap_request,
        crate::handlers::swap_requests_handler::expire_swap_requests,

        // Service history
        crate::handlers::service_history_handler::list_service_history,
        crate::handlers::service_history_handler::create_service_history,
        crate::handlers::service_history_handler::update_service_history,
        crate::handlers::service_history_handler::get_volunteer_stats,
        crate::handlers::service_history_handler::get_ministry_stats,
    ),
    components(
        schemas(
            // Availability
            crate::models::VolunteerAvailability,
            crate::models::BlockedDate,
            crate::models::AvailabilityCheck,
            crate::models::BlockCheck,
            crate::models::MonthlyBlockedDaysInfo,
            crate::models::DateBlockStatus,
            crate::models::Unavailability,
            crate::models::BlockDateInput,
            crate::models::UnblockDateInput,

            // Ministries
            crate::models::MinistrySettings,
            crate::models::MinistryRole,
            crate::models::Member,
            crate::models::Qualification,
            crate::models::QualificationLevel,
            crate::models::UpdateMinistrySettingsInput,

            // Scales
            crate::models::Scale,
            crate::models::ScaleStatus,
            crate::models::Assignment,
            crate::models::ScaleGenerationResult,
            crate::models::RoleSuggestions,
            crate::models::VolunteerSuggestion,

            // Swap requests
            crate::models::SubstitutionRequest,
            crate::models::SubstitutionStatus,
            crate::models::SwapCandidate,
            crate::models::SwapDecision,
            crate::models::SwapOutcome,
            crate::models::CreateSwapRequestInput,
            crate::models::RespondSwapRequestInput,
            crate::models::SwapMutationResponse,
            crate::models::ExpireSweepResponse,

            // Service history
            crate::models::ServiceHistoryRecord,
            crate::models::ServiceStatus,
            crate::models::VolunteerServiceStats,
            crate::models::MinistryServiceStats,
            crate::models::RecordFromScaleSummary,
            crate::models::CreateServiceHistoryInput,
            crate::models::UpdateServiceHistoryInput,
        )
    ),
    tags(
        (name = "health", description = "Health check"),
        (name = "availability", description = "Volunteer blocked dates and availability checks"),
        (name = "ministries", description = "Ministry scheduling settings"),
        (name = "scales", description = "Scale suggestions and close-out"),
        (name = "swap-requests", description = "Volunteer swap requests"),
        (name = "service-history", description = "Service history and attendance stats"),
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "tenant_header",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new(TENANT_HEADER))),
            );
            components.add_security_scheme(
                "member_header",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new(MEMBER_HEADER))),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn documents_every_route_group() {
        let doc = ApiDoc::openapi();
        for path in [
            "/api/availability/block",
            "/api/ministries/{id}/settings",
            "/api/scales/{id}/suggestions",
            "/api/swap-requests/{id}/respond",
            "/api/service-history/ministries/{id}/stats",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {}", path);
        }
    }
}
