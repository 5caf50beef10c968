use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::ids::{FunctionId, ScaleId, VolunteerId};
use super::ministry::QualificationLevel;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct VolunteerSuggestion {
    pub volunteer_id: VolunteerId,
    pub name: String,
    pub email: String,
    pub level: QualificationLevel,
    pub priority: i32,
    /// Services of this function in the trailing window.
    pub service_count: i64,
    pub last_service_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RoleSuggestions {
    pub function_id: FunctionId,
    pub function_name: String,
    pub required_slots: i32,
    pub already_assigned: Vec<VolunteerId>,
    pub available_count: usize,
    pub suggestions: Vec<VolunteerSuggestion>,
}

/// Advisory output of scale generation; nothing is written to the scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ScaleGenerationResult {
    pub scale_id: ScaleId,
    pub suggestions: Vec<RoleSuggestions>,
    pub requires_approval: bool,
    pub total_volunteers_needed: i64,
    pub total_volunteers_available: i64,
    /// Percentage, capped at 100.
    pub coverage: f64,
}
