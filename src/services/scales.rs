use std::sync::Arc;

use crate::engine::ScaleAssignmentEngine;
use crate::models::{Scale, ScaleGenerationResult, ScaleId, TenantId};
use crate::stores::ScaleStore;
use crate::{AppError, AppResult};

/// Scale lookups and suggestion generation.
pub struct ScaleService {
    scales: Arc<dyn ScaleStore>,
    engine: Arc<ScaleAssignmentEngine>,
}

impl ScaleService {
    pub fn new(scales: Arc<dyn ScaleStore>, engine: Arc<ScaleAssignmentEngine>) -> Self {
        Self { scales, engine }
    }

    pub async fn find(&self, tenant_id: TenantId, scale_id: ScaleId) -> AppResult<Scale> {
        self.scales
            .find_by_id(tenant_id, scale_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Scale {} not found", scale_id)))
    }

    pub async fn generate_suggestions(&self, scale: &Scale) -> AppResult<ScaleGenerationResult> {
        self.engine.generate_scale_assignments(scale).await
    }
}
