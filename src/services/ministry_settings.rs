use std::sync::Arc;

use crate::engine::EngineConfig;
use crate::models::{MinistryId, MinistrySettings, TenantId, UpdateMinistrySettingsInput};
use crate::stores::MinistrySettingsStore;
use crate::{AppError, AppResult};

pub struct MinistrySettingsService {
    settings: Arc<dyn MinistrySettingsStore>,
    config: EngineConfig,
}

impl MinistrySettingsService {
    pub fn new(settings: Arc<dyn MinistrySettingsStore>, config: EngineConfig) -> Self {
        Self { settings, config }
    }

    /// Stored settings, created with defaults on first access.
    pub async fn get(&self, tenant_id: TenantId, ministry_id: MinistryId) -> AppResult<MinistrySettings> {
        self.settings
            .get_or_create(MinistrySettings::defaults(tenant_id, ministry_id, &self.config))
            .await
    }

    pub async fn update(
        &self,
        tenant_id: TenantId,
        ministry_id: MinistryId,
        input: &UpdateMinistrySettingsInput,
    ) -> AppResult<MinistrySettings> {
        let mut settings = self.get(tenant_id, ministry_id).await?;
        input.apply_to(&mut settings);
        settings.validate().map_err(AppError::Validation)?;

        let saved = self.settings.upsert(&settings).await?;
        tracing::info!(
            ministry_id = %ministry_id,
            max_blocked_days_per_month = saved.max_blocked_days_per_month,
            swap_request_expiry_hours = saved.swap_request_expiry_hours,
            "Ministry settings updated"
        );
        Ok(saved)
    }
}
