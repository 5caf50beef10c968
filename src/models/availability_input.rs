use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::ids::{MinistryId, VolunteerId};
use crate::{AppError, AppResult};

/// Input for blocking a date. `volunteer_id` defaults to the caller.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BlockDateInput {
    pub ministry_id: MinistryId,
    pub volunteer_id: Option<VolunteerId>,
    /// `YYYY-MM-DD` or RFC 3339; time of day is ignored.
    pub date: String,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UnblockDateInput {
    pub ministry_id: MinistryId,
    pub volunteer_id: Option<VolunteerId>,
    pub date: String,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct CheckDateQuery {
    #[serde(rename = "ministryId")]
    pub ministry_id: MinistryId,
    #[serde(rename = "volunteerId")]
    pub volunteer_id: Option<VolunteerId>,
    pub date: String,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct MonthlyInfoQuery {
    #[serde(rename = "ministryId")]
    pub ministry_id: MinistryId,
    #[serde(rename = "volunteerId")]
    pub volunteer_id: Option<VolunteerId>,
    pub year: Option<i32>,
    pub month: Option<u32>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ListAvailabilityQuery {
    #[serde(rename = "ministryId")]
    pub ministry_id: Option<MinistryId>,
    #[serde(rename = "volunteerId")]
    pub volunteer_id: Option<VolunteerId>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct UnavailabilitiesQuery {
    #[serde(rename = "ministryId")]
    pub ministry_id: MinistryId,
    pub from: String,
    pub to: String,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct FreeVolunteersQuery {
    #[serde(rename = "ministryId")]
    pub ministry_id: MinistryId,
    pub date: String,
    /// Comma-separated volunteer ids to leave out.
    pub exclude: Option<String>,
}

impl FreeVolunteersQuery {
    pub fn exclude_ids(&self) -> AppResult<Vec<VolunteerId>> {
        match self.exclude.as_deref() {
            None | Some("") => Ok(Vec::new()),
            Some(raw) => raw
                .split(',')
                .map(|part| {
                    part.trim()
                        .parse::<VolunteerId>()
                        .map_err(|e| AppError::BadRequest(format!("Invalid volunteer id '{}': {}", part, e)))
                })
                .collect(),
        }
    }
}

/// Parses a calendar date, accepting a bare date or a full timestamp.
pub fn parse_calendar_date(raw: &str) -> AppResult<NaiveDate> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(date);
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.date_naive())
        .map_err(|e| AppError::BadRequest(format!("Invalid date format '{}': {}", raw, e)))
}
