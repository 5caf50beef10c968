use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::ministry::MinistrySettings;

/// Input for updating ministry settings; omitted fields keep their value
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdateMinistrySettingsInput {
    pub max_blocked_days_per_month: Option<i32>,
    pub advance_notice_days: Option<i32>,
    pub require_leader_approval: Option<bool>,
    pub swap_request_expiry_hours: Option<i32>,
    pub max_swap_requests_per_month: Option<i32>,
}

impl UpdateMinistrySettingsInput {
    pub fn apply_to(&self, settings: &mut MinistrySettings) {
        if let Some(value) = self.max_blocked_days_per_month {
            settings.max_blocked_days_per_month = value;
        }
        if let Some(value) = self.advance_notice_days {
            settings.advance_notice_days = value;
        }
        if let Some(value) = self.require_leader_approval {
            settings.require_leader_approval = value;
        }
        if let Some(value) = self.swap_request_expiry_hours {
            settings.swap_request_expiry_hours = value;
        }
        if let Some(value) = self.max_swap_requests_per_month {
            settings.max_swap_requests_per_month = value;
        }
    }
}
