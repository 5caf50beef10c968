//! Scheduling decision logic: availability, suggestion ranking and swaps.
//!
//! Engines read and write only through the injected store traits and never
//! hold state of their own beyond configuration.

pub mod availability_validator;
pub mod scale_assignment;
pub mod substitution;

use chrono::{DateTime, Datelike, Local, NaiveDate, Utc};

use crate::config::AppConfig;
use crate::models::{MinistryId, MinistrySettings, TenantId};
use crate::stores::MinistrySettingsStore;
use crate::AppResult;

pub use availability_validator::AvailabilityValidator;
pub use scale_assignment::ScaleAssignmentEngine;
pub use substitution::SubstitutionEngine;

/// Tunables shared by the engines.
#[derive(Clone, Debug, PartialEq)]
pub struct EngineConfig {
    /// Quota applied while a ministry has no stored settings.
    pub default_max_blocked_days_per_month: i32,
    pub default_swap_request_expiry_hours: i32,
    /// Trailing window used to count recent services when ranking suggestions.
    pub service_history_window_days: i64,
    /// Suggestions emitted per role, as a multiple of its required slots.
    pub suggestion_multiplier: i32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_max_blocked_days_per_month: 30,
            default_swap_request_expiry_hours: 24,
            service_history_window_days: 90,
            suggestion_multiplier: 2,
        }
    }
}

impl From<&AppConfig> for EngineConfig {
    fn from(config: &AppConfig) -> Self {
        config.engine.clone()
    }
}

/// Stored settings of the ministry, or the defaults when none were saved yet.
/// Read paths never create the settings row.
pub(crate) async fn settings_or_default(
    store: &dyn MinistrySettingsStore,
    config: &EngineConfig,
    tenant_id: TenantId,
    ministry_id: MinistryId,
) -> AppResult<MinistrySettings> {
    Ok(store
        .find(tenant_id, ministry_id)
        .await?
        .unwrap_or_else(|| MinistrySettings::defaults(tenant_id, ministry_id, config)))
}

/// Calendar "today" in server-local time.
pub(crate) fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Midnight UTC on the first day of `now`'s month.
pub(crate) fn start_of_month(now: DateTime<Utc>) -> DateTime<Utc> {
    NaiveDate::from_ymd_opt(now.year(), now.month(), 1)
        .and_then(|first| first.and_hms_opt(0, 0, 0))
        .map(|midnight| midnight.and_utc())
        .unwrap_or(now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn month_start_truncates_to_first_midnight() {
        let now = Utc.with_ymd_and_hms(2025, 7, 19, 15, 42, 7).unwrap();
        assert_eq!(start_of_month(now), Utc.with_ymd_and_hms(2025, 7, 1, 0, 0, 0).unwrap());
    }
}
