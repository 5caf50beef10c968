use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

use super::ids::{FunctionId, MinistryId, ScaleId, SwapRequestId, TenantId, VolunteerId};
use super::ministry::QualificationLevel;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SubstitutionStatus {
    Pending,
    Accepted,
    Rejected,
    Cancelled,
    Expired,
}

impl SubstitutionStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, SubstitutionStatus::Pending)
    }

    /// Only `pending` has outgoing edges; every terminal state is final.
    pub fn can_transition_to(&self, next: SubstitutionStatus) -> bool {
        matches!(self, SubstitutionStatus::Pending) && next.is_terminal()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SubstitutionStatus::Pending => "pending",
            SubstitutionStatus::Accepted => "accepted",
            SubstitutionStatus::Rejected => "rejected",
            SubstitutionStatus::Cancelled => "cancelled",
            SubstitutionStatus::Expired => "expired",
        }
    }
}

impl fmt::Display for SubstitutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubstitutionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(SubstitutionStatus::Pending),
            "accepted" => Ok(SubstitutionStatus::Accepted),
            "rejected" => Ok(SubstitutionStatus::Rejected),
            "cancelled" => Ok(SubstitutionStatus::Cancelled),
            "expired" => Ok(SubstitutionStatus::Expired),
            other => Err(format!("Unknown substitution status: {}", other)),
        }
    }
}

/// Proposal that `target` takes over `requester`'s slot for one function on a scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SubstitutionRequest {
    pub id: SwapRequestId,
    pub tenant_id: TenantId,
    pub scale_id: ScaleId,
    pub ministry_id: MinistryId,
    pub function_id: FunctionId,
    pub requester_id: VolunteerId,
    pub target_id: VolunteerId,
    pub reason: String,
    pub status: SubstitutionStatus,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub rejection_reason: Option<String>,
    pub responded_by: Option<VolunteerId>,
    pub responded_at: Option<DateTime<Utc>>,
}

impl SubstitutionRequest {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Terminal write applied to a pending request by a compare-and-set.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusChange {
    pub status: SubstitutionStatus,
    pub rejection_reason: Option<String>,
    pub responded_by: Option<VolunteerId>,
    pub responded_at: Option<DateTime<Utc>>,
}

impl StatusChange {
    pub fn to(status: SubstitutionStatus) -> Self {
        Self {
            status,
            rejection_reason: None,
            responded_by: None,
            responded_at: None,
        }
    }

    pub fn responded(
        status: SubstitutionStatus,
        responder: VolunteerId,
        at: DateTime<Utc>,
        rejection_reason: Option<String>,
    ) -> Self {
        Self {
            status,
            rejection_reason,
            responded_by: Some(responder),
            responded_at: Some(at),
        }
    }

    pub fn apply(&self, request: &mut SubstitutionRequest) {
        request.status = self.status;
        if self.rejection_reason.is_some() {
            request.rejection_reason = self.rejection_reason.clone();
        }
        if self.responded_by.is_some() {
            request.responded_by = self.responded_by;
        }
        if self.responded_at.is_some() {
            request.responded_at = self.responded_at;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SwapDecision {
    Accept,
    Reject,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SwapCandidate {
    pub volunteer_id: VolunteerId,
    pub name: String,
    pub email: String,
    pub level: QualificationLevel,
    pub priority: i32,
    pub is_available: bool,
    pub has_conflict: bool,
    pub unavailable_reason: Option<String>,
}

/// Business-level result of creating a swap request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SwapOutcome {
    pub success: bool,
    pub message: String,
    pub swap_request_id: Option<SwapRequestId>,
}

impl SwapOutcome {
    pub fn created(id: SwapRequestId) -> Self {
        Self {
            success: true,
            message: "Swap request created".to_string(),
            swap_request_id: Some(id),
        }
    }

    pub fn refused(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            swap_request_id: None,
        }
    }
}
