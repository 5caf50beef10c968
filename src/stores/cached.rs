use async_trait::async_trait;
use moka::future::Cache;
use std::sync::Arc;
use std::time::Duration;

use super::MinistrySettingsStore;
use crate::models::{MinistryId, MinistrySettings, TenantId};
use crate::AppResult;

/// Read-through cache over a settings store. Settings are read on every
/// engine call but change rarely; writes through this wrapper invalidate.
pub struct CachedSettingsStore {
    inner: Arc<dyn MinistrySettingsStore>,
    cache: Cache<(TenantId, MinistryId), MinistrySettings>,
}

impl CachedSettingsStore {
    pub fn new(inner: Arc<dyn MinistrySettingsStore>, ttl: Duration) -> Self {
        let cache = Cache::builder().time_to_live(ttl).max_capacity(1_000).build();
        Self { inner, cache }
    }
}

#[async_trait]
impl MinistrySettingsStore for CachedSettingsStore {
    async fn find(&self, tenant_id: TenantId, ministry_id: MinistryId) -> AppResult<Option<MinistrySettings>> {
        if let Some(cached) = self.cache.get(&(tenant_id, ministry_id)).await {
            return Ok(Some(cached));
        }

        let found = self.inner.find(tenant_id, ministry_id).await?;
        if let Some(settings) = &found {
            self.cache.insert((tenant_id, ministry_id), settings.clone()).await;
        }
        Ok(found)
    }

    async fn get_or_create(&self, defaults: MinistrySettings) -> AppResult<MinistrySettings> {
        let key = (defaults.tenant_id, defaults.ministry_id);
        if let Some(cached) = self.cache.get(&key).await {
            return Ok(cached);
        }

        let settings = self.inner.get_or_create(defaults).await?;
        self.cache.insert(key, settings.clone()).await;
        Ok(settings)
    }

    async fn upsert(&self, settings: &MinistrySettings) -> AppResult<MinistrySettings> {
        let key = (settings.tenant_id, settings.ministry_id);
        self.cache.invalidate(&key).await;
        let stored = self.inner.upsert(settings).await?;
        self.cache.insert(key, stored.clone()).await;
        Ok(stored)
    }
}
