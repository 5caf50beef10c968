use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::ids::{ScaleId, VolunteerId};

/// Input for asking another volunteer to take over the caller's slot
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateSwapRequestInput {
    pub scale_id: ScaleId,
    pub target_id: VolunteerId,
    pub reason: String,
}

/// Input for the target's answer to a swap request
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RespondSwapRequestInput {
    pub accept: bool,
    pub rejection_reason: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ListSwapRequestsQuery {
    /// `my` (created by the caller, default) or `incoming` (pending, addressed to the caller)
    pub view: Option<String>,
    #[serde(rename = "scaleId")]
    pub scale_id: Option<ScaleId>,
}

/// Response for swap mutations that have no entity to return
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SwapMutationResponse {
    pub success: bool,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ExpireSweepResponse {
    pub expired: usize,
}
