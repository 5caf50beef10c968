//! Request-scoped coordinators: resolve entities, call the engines, persist.

pub mod availability;
pub mod ministry_settings;
pub mod scales;
pub mod service_history;
pub mod substitution;

pub use availability::VolunteerAvailabilityService;
pub use ministry_settings::MinistrySettingsService;
pub use scales::ScaleService;
pub use service_history::ServiceHistoryService;
pub use substitution::SubstitutionService;
