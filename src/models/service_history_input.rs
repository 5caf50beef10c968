use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::ids::{FunctionId, MinistryId, ScaleId, VolunteerId};
use super::service_history::{ServiceHistoryFilter, ServiceStatus};

/// Input for recording one service
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateServiceHistoryInput {
    pub scale_id: ScaleId,
    pub volunteer_id: VolunteerId,
    pub function_id: FunctionId,
    pub ministry_id: MinistryId,
    /// Defaults to the scale's event date
    pub service_date: Option<NaiveDate>,
    pub status: Option<ServiceStatus>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdateServiceHistoryInput {
    pub status: Option<ServiceStatus>,
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct ServiceHistoryQuery {
    #[serde(rename = "volunteerId")]
    pub volunteer_id: Option<VolunteerId>,
    #[serde(rename = "ministryId")]
    pub ministry_id: Option<MinistryId>,
    #[serde(rename = "scaleId")]
    pub scale_id: Option<ScaleId>,
    pub status: Option<ServiceStatus>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl From<ServiceHistoryQuery> for ServiceHistoryFilter {
    fn from(query: ServiceHistoryQuery) -> Self {
        ServiceHistoryFilter {
            volunteer_id: query.volunteer_id,
            ministry_id: query.ministry_id,
            scale_id: query.scale_id,
            function_id: None,
            status: query.status,
            from: query.from,
            to: query.to,
        }
    }
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct StatsQuery {
    #[serde(rename = "ministryId")]
    pub ministry_id: Option<MinistryId>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}
