use std::sync::Arc;

use crate::engine::SubstitutionEngine;
use crate::models::{
    CreateSwapRequestInput, RespondSwapRequestInput, ScaleId, ServiceStatus, SubstitutionRequest,
    SubstitutionStatus, SwapCandidate, SwapDecision, SwapOutcome, SwapRequestId, TenantId, VolunteerId,
};
use crate::stores::{ScaleStore, ServiceHistoryStore, SubstitutionStore, SwapRequestFilter};
use crate::{AppError, AppResult};

pub struct SubstitutionService {
    engine: Arc<SubstitutionEngine>,
    scales: Arc<dyn ScaleStore>,
    requests: Arc<dyn SubstitutionStore>,
    history: Arc<dyn ServiceHistoryStore>,
}

impl SubstitutionService {
    pub fn new(
        engine: Arc<SubstitutionEngine>,
        scales: Arc<dyn ScaleStore>,
        requests: Arc<dyn SubstitutionStore>,
        history: Arc<dyn ServiceHistoryStore>,
    ) -> Self {
        Self {
            engine,
            scales,
            requests,
            history,
        }
    }

    pub async fn find_candidates(
        &self,
        tenant_id: TenantId,
        scale_id: ScaleId,
        requester_id: VolunteerId,
    ) -> AppResult<Vec<SwapCandidate>> {
        let scale = self
            .scales
            .find_by_id(tenant_id, scale_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Scale {} not found", scale_id)))?;
        self.engine.find_swap_candidates(&scale, requester_id).await
    }

    pub async fn create(
        &self,
        tenant_id: TenantId,
        requester_id: VolunteerId,
        input: &CreateSwapRequestInput,
    ) -> AppResult<SwapOutcome> {
        let reason = input.reason.trim();
        if reason.is_empty() {
            return Err(AppError::BadRequest("A reason is required for a swap request".to_string()));
        }

        let scale = self
            .scales
            .find_by_id(tenant_id, input.scale_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Scale {} not found", input.scale_id)))?;
        self.engine
            .create_swap_request(&scale, requester_id, input.target_id, reason)
            .await
    }

    /// Records the answer of the target. On acceptance any history already
    /// recorded for the requester on the scale is marked `replaced`.
    pub async fn respond(
        &self,
        tenant_id: TenantId,
        request_id: SwapRequestId,
        responder_id: VolunteerId,
        input: RespondSwapRequestInput,
    ) -> AppResult<SubstitutionRequest> {
        let decision = if input.accept {
            SwapDecision::Accept
        } else {
            SwapDecision::Reject
        };
        let request = self
            .engine
            .respond(tenant_id, request_id, responder_id, decision, input.rejection_reason)
            .await?;

        if request.status == SubstitutionStatus::Accepted {
            self.mark_requester_replaced(&request).await?;
        }
        Ok(request)
    }

    async fn mark_requester_replaced(&self, request: &SubstitutionRequest) -> AppResult<()> {
        let Some(mut record) = self
            .history
            .find_for(request.tenant_id, request.requester_id, request.scale_id)
            .await?
        else {
            return Ok(());
        };

        record.status = ServiceStatus::Replaced;
        record.notes = Some(format!("Replaced through swap request {}", request.id));
        self.history.update(&record).await?;
        tracing::info!(
            swap_request_id = %request.id,
            service_history_id = %record.id,
            "Requester history marked as replaced"
        );
        Ok(())
    }

    pub async fn cancel(
        &self,
        tenant_id: TenantId,
        request_id: SwapRequestId,
        requester_id: VolunteerId,
    ) -> AppResult<SubstitutionRequest> {
        self.engine.cancel_swap_request(tenant_id, request_id, requester_id).await
    }

    /// Visible to the two volunteers it involves.
    pub async fn get(
        &self,
        tenant_id: TenantId,
        request_id: SwapRequestId,
        caller_id: VolunteerId,
    ) -> AppResult<SubstitutionRequest> {
        self.requests
            .find_by_id(tenant_id, request_id)
            .await?
            .filter(|r| r.requester_id == caller_id || r.target_id == caller_id)
            .ok_or_else(|| AppError::NotFound(format!("Swap request {} not found", request_id)))
    }

    pub async fn list_mine(
        &self,
        tenant_id: TenantId,
        requester_id: VolunteerId,
        scale_id: Option<ScaleId>,
    ) -> AppResult<Vec<SubstitutionRequest>> {
        self.requests
            .list(
                tenant_id,
                &SwapRequestFilter {
                    scale_id,
                    requester_id: Some(requester_id),
                    ..Default::default()
                },
            )
            .await
    }

    pub async fn list_incoming(
        &self,
        tenant_id: TenantId,
        target_id: VolunteerId,
        scale_id: Option<ScaleId>,
    ) -> AppResult<Vec<SubstitutionRequest>> {
        self.requests
            .list(
                tenant_id,
                &SwapRequestFilter {
                    scale_id,
                    target_id: Some(target_id),
                    status: Some(SubstitutionStatus::Pending),
                    ..Default::default()
                },
            )
            .await
    }

    pub async fn list_for_scale(&self, tenant_id: TenantId, scale_id: ScaleId) -> AppResult<Vec<SubstitutionRequest>> {
        self.requests
            .list(
                tenant_id,
                &SwapRequestFilter {
                    scale_id: Some(scale_id),
                    ..Default::default()
                },
            )
            .await
    }

    pub async fn expire_stale(&self, tenant_id: TenantId) -> AppResult<usize> {
        self.engine.expire_stale_requests(tenant_id).await
    }
}
