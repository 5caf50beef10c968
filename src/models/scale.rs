use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

use super::ids::{BranchId, EventId, FunctionId, MinistryId, ScaleId, TenantId, VolunteerId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ScaleStatus {
    Draft,
    Published,
    Completed,
    Cancelled,
}

impl ScaleStatus {
    /// Whether members assigned on a scale in this status count as booked.
    pub fn occupies_volunteers(&self) -> bool {
        matches!(self, ScaleStatus::Published | ScaleStatus::Completed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ScaleStatus::Draft => "draft",
            ScaleStatus::Published => "published",
            ScaleStatus::Completed => "completed",
            ScaleStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for ScaleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScaleStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(ScaleStatus::Draft),
            "published" => Ok(ScaleStatus::Published),
            "completed" => Ok(ScaleStatus::Completed),
            "cancelled" => Ok(ScaleStatus::Cancelled),
            other => Err(format!("Unknown scale status: {}", other)),
        }
    }
}

/// One function to fill on a scale. Under- and over-booking are allowed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Assignment {
    pub function_id: FunctionId,
    pub function_name: String,
    pub required_slots: i32,
    pub assigned_members: Vec<VolunteerId>,
    pub is_required: bool,
}

impl Assignment {
    pub fn has_member(&self, volunteer_id: VolunteerId) -> bool {
        self.assigned_members.contains(&volunteer_id)
    }
}

/// A dated event occurrence of a ministry with the functions it needs filled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Scale {
    pub id: ScaleId,
    pub tenant_id: TenantId,
    pub branch_id: Option<BranchId>,
    pub event_id: EventId,
    pub ministry_id: MinistryId,
    pub name: String,
    pub event_date: NaiveDate,
    /// Local start time, `HH:MM`.
    pub event_time: String,
    pub assignments: Vec<Assignment>,
    pub status: ScaleStatus,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Scale {
    /// First assignment holding `volunteer_id`.
    pub fn assignment_of(&self, volunteer_id: VolunteerId) -> Option<&Assignment> {
        self.assignments
            .iter()
            .find(|assignment| assignment.has_member(volunteer_id))
    }

    pub fn assignment_for(&self, function_id: FunctionId) -> Option<&Assignment> {
        self.assignments
            .iter()
            .find(|assignment| assignment.function_id == function_id)
    }

    pub fn has_member(&self, volunteer_id: VolunteerId) -> bool {
        self.assignment_of(volunteer_id).is_some()
    }
}
