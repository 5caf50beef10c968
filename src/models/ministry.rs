use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

use super::ids::{FunctionId, MinistryId, TenantId, VolunteerId};
use crate::engine::EngineConfig;

/// Per-ministry scheduling policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct MinistrySettings {
    pub tenant_id: TenantId,
    pub ministry_id: MinistryId,
    pub max_blocked_days_per_month: i32,
    /// Minimum days between a swap request and the event (0 disables the check).
    pub advance_notice_days: i32,
    pub require_leader_approval: bool,
    pub swap_request_expiry_hours: i32,
    /// Swap requests a volunteer may open per calendar month (0 = unlimited).
    pub max_swap_requests_per_month: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MinistrySettings {
    pub fn defaults(tenant_id: TenantId, ministry_id: MinistryId, config: &EngineConfig) -> Self {
        let now = Utc::now();
        Self {
            tenant_id,
            ministry_id,
            max_blocked_days_per_month: config.default_max_blocked_days_per_month,
            advance_notice_days: 0,
            require_leader_approval: true,
            swap_request_expiry_hours: config.default_swap_request_expiry_hours,
            max_swap_requests_per_month: 10,
            created_at: now,
            updated_at: now,
        }
    }

    /// Rejects negative numeric fields.
    pub fn validate(&self) -> Result<(), String> {
        let fields = [
            ("max_blocked_days_per_month", self.max_blocked_days_per_month),
            ("advance_notice_days", self.advance_notice_days),
            ("swap_request_expiry_hours", self.swap_request_expiry_hours),
            ("max_swap_requests_per_month", self.max_swap_requests_per_month),
        ];

        match fields.iter().find(|(_, value)| *value < 0) {
            Some((name, value)) => Err(format!("{} must be >= 0, got {}", name, value)),
            None => Ok(()),
        }
    }
}

/// Role of a member inside a ministry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum MinistryRole {
    Admin,
    Leader,
    Volunteer,
}

impl MinistryRole {
    pub const SERVING: [MinistryRole; 2] = [MinistryRole::Volunteer, MinistryRole::Leader];

    pub fn as_str(&self) -> &'static str {
        match self {
            MinistryRole::Admin => "admin",
            MinistryRole::Leader => "leader",
            MinistryRole::Volunteer => "volunteer",
        }
    }

    /// Eligible to be placed on a scale or to take over someone's slot.
    pub fn can_serve(&self) -> bool {
        matches!(self, MinistryRole::Leader | MinistryRole::Volunteer)
    }

    pub fn can_manage_scales(&self) -> bool {
        matches!(self, MinistryRole::Admin | MinistryRole::Leader)
    }

    pub fn can_configure_ministry(&self) -> bool {
        matches!(self, MinistryRole::Admin | MinistryRole::Leader)
    }

    pub fn can_view_reports(&self) -> bool {
        matches!(self, MinistryRole::Admin | MinistryRole::Leader)
    }
}

impl fmt::Display for MinistryRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MinistryRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(MinistryRole::Admin),
            "leader" => Ok(MinistryRole::Leader),
            "volunteer" => Ok(MinistryRole::Volunteer),
            other => Err(format!("Unknown ministry role: {}", other)),
        }
    }
}

/// Active membership as resolved by the membership directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Member {
    pub volunteer_id: VolunteerId,
    pub name: String,
    pub email: String,
    pub role: MinistryRole,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum QualificationLevel {
    Beginner,
    Intermediate,
    Advanced,
    Specialist,
}

impl QualificationLevel {
    pub fn weight(&self) -> u8 {
        match self {
            QualificationLevel::Beginner => 1,
            QualificationLevel::Intermediate => 2,
            QualificationLevel::Advanced => 3,
            QualificationLevel::Specialist => 4,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            QualificationLevel::Beginner => "beginner",
            QualificationLevel::Intermediate => "intermediate",
            QualificationLevel::Advanced => "advanced",
            QualificationLevel::Specialist => "specialist",
        }
    }
}

impl FromStr for QualificationLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "beginner" => Ok(QualificationLevel::Beginner),
            "intermediate" => Ok(QualificationLevel::Intermediate),
            "advanced" => Ok(QualificationLevel::Advanced),
            "specialist" => Ok(QualificationLevel::Specialist),
            other => Err(format!("Unknown qualification level: {}", other)),
        }
    }
}

/// Approved qualification of a volunteer for one function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Qualification {
    pub volunteer_id: VolunteerId,
    pub ministry_id: MinistryId,
    pub function_id: FunctionId,
    pub level: QualificationLevel,
    /// Lower is preferred.
    pub priority: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_leaders_and_volunteers_serve() {
        assert!(MinistryRole::Volunteer.can_serve());
        assert!(MinistryRole::Leader.can_serve());
        assert!(!MinistryRole::Admin.can_serve());
        assert!(!MinistryRole::Volunteer.can_manage_scales());
        assert!(MinistryRole::Admin.can_configure_ministry());
    }

    #[test]
    fn level_weights_are_ordered() {
        assert!(QualificationLevel::Specialist.weight() > QualificationLevel::Advanced.weight());
        assert!(QualificationLevel::Advanced.weight() > QualificationLevel::Intermediate.weight());
        assert!(QualificationLevel::Intermediate.weight() > QualificationLevel::Beginner.weight());
        assert_eq!("advanced".parse::<QualificationLevel>(), Ok(QualificationLevel::Advanced));
    }

    #[test]
    fn negative_settings_are_rejected() {
        let mut settings =
            MinistrySettings::defaults(TenantId::new(), MinistryId::new(), &EngineConfig::default());
        assert!(settings.validate().is_ok());

        settings.swap_request_expiry_hours = -1;
        let err = settings.validate().unwrap_err();
        assert!(err.contains("swap_request_expiry_hours"));
    }
}
