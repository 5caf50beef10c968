#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Request},
    Router,
};
use chrono::{Datelike, Duration, Local, NaiveDate, Utc};
use ministry_scales::{
    config::StoreBackend,
    engine::EngineConfig,
    extractors::{MEMBER_HEADER, TENANT_HEADER},
    handlers::setup_metrics_recorder,
    models::{
        Assignment, EventId, FunctionId, Member, MinistryId, MinistryRole, Qualification, QualificationLevel, Scale,
        ScaleId, ScaleStatus, ServiceHistoryId, ServiceHistoryRecord, ServiceStatus, TenantId, VolunteerId,
    },
    startup::build_router,
    stores::MemoryDirectory,
    AppConfig, AppState, Stores,
};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

pub struct TestApp {
    pub state: Arc<AppState>,
    pub stores: Stores,
    pub directory: Arc<MemoryDirectory>,
    pub router: Router,
    pub tenant: TenantId,
    pub ministry: MinistryId,
}

pub fn test_config() -> AppConfig {
    AppConfig {
        store_backend: StoreBackend::Memory,
        database_url: None,
        port: 0,
        settings_cache_ttl_secs: 30,
        engine: EngineConfig::default(),
    }
}

impl TestApp {
    pub fn new() -> Self {
        let directory = Arc::new(MemoryDirectory::new());
        let stores = Stores::memory(directory.clone());
        let metrics = Arc::new(setup_metrics_recorder().expect("metrics recorder"));
        let state = Arc::new(AppState::new(test_config(), stores.clone(), metrics));
        let router = build_router(state.clone());

        Self {
            state,
            stores,
            directory,
            router,
            tenant: TenantId::new(),
            ministry: MinistryId::new(),
        }
    }

    pub async fn add_member(&self, name: &str, role: MinistryRole) -> VolunteerId {
        let id = VolunteerId::new();
        self.directory
            .add_member(
                self.tenant,
                self.ministry,
                Member {
                    volunteer_id: id,
                    name: name.to_string(),
                    email: format!("{}@example.org", name.to_lowercase()),
                    role,
                },
            )
            .await;
        id
    }

    pub async fn qualify(&self, volunteer_id: VolunteerId, function_id: FunctionId, level: QualificationLevel, priority: i32) {
        self.directory
            .add_qualification(Qualification {
                volunteer_id,
                ministry_id: self.ministry,
                function_id,
                level,
                priority,
            })
            .await;
    }

    /// Stores a scale with one assignment per `(function, slots, members)` entry.
    pub async fn scale_on(
        &self,
        date: NaiveDate,
        status: ScaleStatus,
        assignments: &[(FunctionId, i32, Vec<VolunteerId>)],
    ) -> Scale {
        let now = Utc::now();
        let scale = Scale {
            id: ScaleId::new(),
            tenant_id: self.tenant,
            branch_id: None,
            event_id: EventId::new(),
            ministry_id: self.ministry,
            name: format!("Sunday service {}", date),
            event_date: date,
            event_time: "19:00".to_string(),
            assignments: assignments
                .iter()
                .enumerate()
                .map(|(i, (function_id, slots, members))| Assignment {
                    function_id: *function_id,
                    function_name: format!("function-{}", i + 1),
                    required_slots: *slots,
                    assigned_members: members.clone(),
                    is_required: true,
                })
                .collect(),
            status,
            version: 0,
            created_at: now,
            updated_at: now,
        };
        self.stores.scales.insert(&scale).await.expect("insert scale")
    }

    /// Records a past completed service without going through a scale.
    pub async fn past_service(&self, volunteer_id: VolunteerId, function_id: FunctionId, days_ago: i64) {
        let now = Utc::now();
        let record = ServiceHistoryRecord {
            id: ServiceHistoryId::new(),
            tenant_id: self.tenant,
            volunteer_id,
            scale_id: ScaleId::new(),
            function_id,
            ministry_id: self.ministry,
            service_date: today() - Duration::days(days_ago),
            status: ServiceStatus::Completed,
            notes: None,
            original_user_id: None,
            substitution_request_id: None,
            recorded_by: None,
            created_at: now,
            updated_at: now,
        };
        self.stores.history.create(&record).await.expect("insert history");
    }

    pub async fn call(&self, method: &str, uri: &str, caller: Option<VolunteerId>, body: Option<Value>) -> (u16, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(member) = caller {
            builder = builder
                .header(TENANT_HEADER, self.tenant.to_string())
                .header(MEMBER_HEADER, member.to_string());
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status().as_u16();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }
}

pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Day `day` of next month, always in the future.
pub fn next_month(day: u32) -> NaiveDate {
    let first = today().with_day(1).unwrap();
    let next = if first.month() == 12 {
        NaiveDate::from_ymd_opt(first.year() + 1, 1, 1).unwrap()
    } else {
        NaiveDate::from_ymd_opt(first.year(), first.month() + 1, 1).unwrap()
    };
    next.with_day(day).unwrap()
}
