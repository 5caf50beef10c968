pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod openapi;
pub mod services;
pub mod startup;
pub mod stores;

use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;

pub use config::AppConfig;
pub use error::{AppError, AppResult};
pub use handlers::MetricsState;

use engine::{AvailabilityValidator, EngineConfig, ScaleAssignmentEngine, SubstitutionEngine};
use services::{
    MinistrySettingsService, ScaleService, ServiceHistoryService, SubstitutionService, VolunteerAvailabilityService,
};
use stores::{
    AvailabilityStore, CachedSettingsStore, MembershipDirectory, MemoryAvailabilityStore, MemoryDirectory,
    MemoryScaleStore, MemoryServiceHistoryStore, MemorySettingsStore, MemorySubstitutionStore, MinistrySettingsStore,
    PgAvailabilityStore, PgDirectory, PgScaleStore, PgServiceHistoryStore, PgSettingsStore, PgSubstitutionStore,
    QualificationDirectory, ScaleStore, ServiceHistoryStore, SubstitutionStore,
};

/// Every persistence seam the services need, behind trait objects.
#[derive(Clone)]
pub struct Stores {
    pub availability: Arc<dyn AvailabilityStore>,
    pub settings: Arc<dyn MinistrySettingsStore>,
    pub scales: Arc<dyn ScaleStore>,
    pub history: Arc<dyn ServiceHistoryStore>,
    pub requests: Arc<dyn SubstitutionStore>,
    pub members: Arc<dyn MembershipDirectory>,
    pub qualifications: Arc<dyn QualificationDirectory>,
}

impl Stores {
    pub fn postgres(pool: PgPool) -> Self {
        let directory = Arc::new(PgDirectory::new(pool.clone()));
        Self {
            availability: Arc::new(PgAvailabilityStore::new(pool.clone())),
            settings: Arc::new(PgSettingsStore::new(pool.clone())),
            scales: Arc::new(PgScaleStore::new(pool.clone())),
            history: Arc::new(PgServiceHistoryStore::new(pool.clone())),
            requests: Arc::new(PgSubstitutionStore::new(pool)),
            members: directory.clone(),
            qualifications: directory,
        }
    }

    /// In-process stores; `directory` stays with the caller for seeding members.
    pub fn memory(directory: Arc<MemoryDirectory>) -> Self {
        Self {
            availability: Arc::new(MemoryAvailabilityStore::new()),
            settings: Arc::new(MemorySettingsStore::new()),
            scales: Arc::new(MemoryScaleStore::new()),
            history: Arc::new(MemoryServiceHistoryStore::new()),
            requests: Arc::new(MemorySubstitutionStore::new()),
            members: directory.clone(),
            qualifications: directory,
        }
    }
}

pub struct AppState {
    pub config: AppConfig,
    pub directory: Arc<dyn MembershipDirectory>,
    pub availability: VolunteerAvailabilityService,
    pub ministry_settings: MinistrySettingsService,
    pub scales: ScaleService,
    pub substitutions: SubstitutionService,
    pub service_history: ServiceHistoryService,
    pub metrics: Arc<MetricsState>,
}

impl AppState {
    pub fn new(config: AppConfig, stores: Stores, metrics: Arc<MetricsState>) -> Self {
        let engine_config = EngineConfig::from(&config);
        let settings: Arc<dyn MinistrySettingsStore> = Arc::new(CachedSettingsStore::new(
            stores.settings.clone(),
            Duration::from_secs(config.settings_cache_ttl_secs),
        ));

        let validator = Arc::new(AvailabilityValidator::new(
            stores.availability.clone(),
            settings.clone(),
            stores.scales.clone(),
            engine_config.clone(),
        ));
        let assignment = Arc::new(ScaleAssignmentEngine::new(
            validator.clone(),
            stores.members.clone(),
            stores.qualifications.clone(),
            stores.history.clone(),
            settings.clone(),
            engine_config.clone(),
        ));
        let substitution = Arc::new(SubstitutionEngine::new(
            validator.clone(),
            stores.members.clone(),
            stores.qualifications.clone(),
            stores.scales.clone(),
            stores.requests.clone(),
            settings.clone(),
            engine_config.clone(),
        ));

        Self {
            directory: stores.members.clone(),
            availability: VolunteerAvailabilityService::new(
                validator,
                stores.availability.clone(),
                settings.clone(),
                engine_config.clone(),
            ),
            ministry_settings: MinistrySettingsService::new(settings, engine_config),
            scales: ScaleService::new(stores.scales.clone(), assignment),
            substitutions: SubstitutionService::new(
                substitution,
                stores.scales.clone(),
                stores.requests.clone(),
                stores.history.clone(),
            ),
            service_history: ServiceHistoryService::new(stores.history, stores.scales, stores.requests),
            config,
            metrics,
        }
    }
}
