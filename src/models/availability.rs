use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::ids::{AvailabilityId, MinistryId, TenantId, VolunteerId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct BlockedDate {
    pub date: NaiveDate,
    pub reason: String,
    pub is_blocked: bool,
}

/// A volunteer's self-declared blocked dates within one ministry.
///
/// Exactly one record exists per (tenant, ministry, volunteer). `version` is
/// bumped on every write of `blocked_dates` and guards concurrent updates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct VolunteerAvailability {
    pub id: AvailabilityId,
    pub tenant_id: TenantId,
    pub ministry_id: MinistryId,
    pub volunteer_id: VolunteerId,
    pub blocked_dates: Vec<BlockedDate>,
    pub max_blocked_days_per_month: i32,
    pub is_active: bool,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl VolunteerAvailability {
    pub fn new(
        tenant_id: TenantId,
        ministry_id: MinistryId,
        volunteer_id: VolunteerId,
        max_blocked_days_per_month: i32,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: AvailabilityId::new(),
            tenant_id,
            ministry_id,
            volunteer_id,
            blocked_dates: Vec::new(),
            max_blocked_days_per_month,
            is_active: true,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Active block covering `date`, if any.
    pub fn block_on(&self, date: NaiveDate) -> Option<&BlockedDate> {
        self.blocked_dates
            .iter()
            .find(|entry| entry.is_blocked && entry.date == date)
    }

    /// Blocked dates in the given calendar month, ascending.
    pub fn blocked_in_month(&self, year: i32, month: u32) -> Vec<NaiveDate> {
        let mut dates: Vec<NaiveDate> = self
            .blocked_dates
            .iter()
            .filter(|entry| entry.is_blocked && entry.date.year() == year && entry.date.month() == month)
            .map(|entry| entry.date)
            .collect();
        dates.sort();
        dates.dedup();
        dates
    }

    pub fn all_blocked(&self) -> Vec<NaiveDate> {
        let mut dates: Vec<NaiveDate> = self
            .blocked_dates
            .iter()
            .filter(|entry| entry.is_blocked)
            .map(|entry| entry.date)
            .collect();
        dates.sort();
        dates
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AvailabilityCheck {
    pub is_available: bool,
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blocked_dates: Option<Vec<NaiveDate>>,
}

impl AvailabilityCheck {
    pub fn available() -> Self {
        Self {
            is_available: true,
            reason: None,
            blocked_dates: None,
        }
    }

    pub fn unavailable(reason: impl Into<String>, blocked_dates: Option<Vec<NaiveDate>>) -> Self {
        Self {
            is_available: false,
            reason: Some(reason.into()),
            blocked_dates,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct BlockCheck {
    pub can_block: bool,
    pub reason: Option<String>,
}

impl BlockCheck {
    pub fn allowed() -> Self {
        Self {
            can_block: true,
            reason: None,
        }
    }

    pub fn denied(reason: impl Into<String>) -> Self {
        Self {
            can_block: false,
            reason: Some(reason.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct MonthlyBlockedDaysInfo {
    pub year: i32,
    pub current_month: u32,
    pub max_allowed: i32,
    pub blocked_dates: Vec<NaiveDate>,
    pub can_block_more: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DateBlockStatus {
    pub date: NaiveDate,
    pub is_blocked: bool,
    pub reason: Option<String>,
}

/// One blocked day of one volunteer, flattened for ministry-wide views.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Unavailability {
    pub volunteer_id: VolunteerId,
    pub date: NaiveDate,
    pub reason: String,
}
