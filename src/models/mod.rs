pub mod availability;
pub mod availability_input;
pub mod ids;
pub mod ministry;
pub mod ministry_input;
pub mod scale;
pub mod service_history;
pub mod service_history_input;
pub mod substitution;
pub mod substitution_input;
pub mod suggestion;

pub use availability::{
    AvailabilityCheck, BlockCheck, BlockedDate, DateBlockStatus, MonthlyBlockedDaysInfo, Unavailability,
    VolunteerAvailability,
};
pub use availability_input::{
    parse_calendar_date, BlockDateInput, CheckDateQuery, FreeVolunteersQuery, ListAvailabilityQuery,
    MonthlyInfoQuery, UnavailabilitiesQuery, UnblockDateInput,
};
pub use ids::{
    AvailabilityId, BranchId, EventId, FunctionId, MinistryId, ScaleId, ServiceHistoryId, SwapRequestId, TenantId,
    VolunteerId,
};
pub use ministry::{Member, MinistryRole, MinistrySettings, Qualification, QualificationLevel};
pub use ministry_input::UpdateMinistrySettingsInput;
pub use scale::{Assignment, Scale, ScaleStatus};
pub use service_history::{
    MinistryServiceStats, RecordFromScaleSummary, ServiceHistoryFilter, ServiceHistoryRecord, ServiceStatus,
    VolunteerServiceStats,
};
pub use service_history_input::{
    CreateServiceHistoryInput, ServiceHistoryQuery, StatsQuery, UpdateServiceHistoryInput,
};
pub use substitution::{
    StatusChange, SubstitutionRequest, SubstitutionStatus, SwapCandidate, SwapDecision, SwapOutcome,
};
pub use substitution_input::{
    CreateSwapRequestInput, ExpireSweepResponse, ListSwapRequestsQuery, RespondSwapRequestInput,
    SwapMutationResponse,
};
pub use suggestion::{RoleSuggestions, ScaleGenerationResult, VolunteerSuggestion};
