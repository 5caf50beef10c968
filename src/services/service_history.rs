use chrono::{NaiveDate, Utc};
use std::collections::HashMap;
use std::sync::Arc;

use crate::models::{
    CreateServiceHistoryInput, FunctionId, MinistryId, MinistryServiceStats, RecordFromScaleSummary, ScaleId,
    ScaleStatus, ServiceHistoryFilter, ServiceHistoryId, ServiceHistoryRecord, ServiceStatus, SubstitutionRequest,
    SubstitutionStatus, TenantId, UpdateServiceHistoryInput, VolunteerId, VolunteerServiceStats,
};
use crate::stores::{ScaleStore, ServiceHistoryStore, SubstitutionStore, SwapRequestFilter};
use crate::{AppError, AppResult};

pub struct ServiceHistoryService {
    history: Arc<dyn ServiceHistoryStore>,
    scales: Arc<dyn ScaleStore>,
    requests: Arc<dyn SubstitutionStore>,
}

impl ServiceHistoryService {
    pub fn new(
        history: Arc<dyn ServiceHistoryStore>,
        scales: Arc<dyn ScaleStore>,
        requests: Arc<dyn SubstitutionStore>,
    ) -> Self {
        Self {
            history,
            scales,
            requests,
        }
    }

    pub async fn create(
        &self,
        tenant_id: TenantId,
        recorded_by: VolunteerId,
        input: &CreateServiceHistoryInput,
    ) -> AppResult<ServiceHistoryRecord> {
        let scale = self
            .scales
            .find_by_id(tenant_id, input.scale_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Scale {} not found", input.scale_id)))?;
        if scale.ministry_id != input.ministry_id {
            return Err(AppError::BadRequest(format!(
                "Scale {} does not belong to ministry {}",
                scale.id, input.ministry_id
            )));
        }

        if self
            .history
            .find_for(tenant_id, input.volunteer_id, input.scale_id)
            .await?
            .is_some()
        {
            return Err(AppError::Conflict(format!(
                "Service history already exists for volunteer {} on scale {}",
                input.volunteer_id, input.scale_id
            )));
        }

        let now = Utc::now();
        let record = ServiceHistoryRecord {
            id: ServiceHistoryId::new(),
            tenant_id,
            volunteer_id: input.volunteer_id,
            scale_id: input.scale_id,
            function_id: input.function_id,
            ministry_id: input.ministry_id,
            service_date: input.service_date.unwrap_or(scale.event_date),
            status: input.status.unwrap_or(ServiceStatus::Completed),
            notes: input.notes.clone(),
            original_user_id: None,
            substitution_request_id: None,
            recorded_by: Some(recorded_by),
            created_at: now,
            updated_at: now,
        };

        let created = self.history.create(&record).await?;
        tracing::info!(
            service_history_id = %created.id,
            volunteer_id = %created.volunteer_id,
            scale_id = %created.scale_id,
            status = %created.status,
            "Service history recorded"
        );
        Ok(created)
    }

    pub async fn find(&self, tenant_id: TenantId, id: ServiceHistoryId) -> AppResult<ServiceHistoryRecord> {
        self.history
            .find_by_id(tenant_id, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Service history {} not found", id)))
    }

    pub async fn update(
        &self,
        tenant_id: TenantId,
        id: ServiceHistoryId,
        input: &UpdateServiceHistoryInput,
    ) -> AppResult<ServiceHistoryRecord> {
        let mut record = self.find(tenant_id, id).await?;
        if let Some(status) = input.status {
            record.status = status;
        }
        if input.notes.is_some() {
            record.notes = input.notes.clone();
        }

        let updated = self.history.update(&record).await?;
        tracing::info!(service_history_id = %id, status = %updated.status, "Service history updated");
        Ok(updated)
    }

    /// Closes out a scale: one `completed` record per assigned member.
    ///
    /// Members that already have a record are skipped, so running it twice
    /// is harmless. Members who took the slot through an accepted swap carry
    /// the original volunteer and the request.
    pub async fn record_from_scale(
        &self,
        tenant_id: TenantId,
        scale_id: ScaleId,
        recorded_by: VolunteerId,
    ) -> AppResult<RecordFromScaleSummary> {
        let scale = self
            .scales
            .find_by_id(tenant_id, scale_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Scale {} not found", scale_id)))?;
        if scale.status == ScaleStatus::Cancelled {
            return Err(AppError::BadRequest(format!("Scale {} is cancelled", scale_id)));
        }

        let swaps: HashMap<(VolunteerId, FunctionId), SubstitutionRequest> = self
            .requests
            .list(
                tenant_id,
                &SwapRequestFilter {
                    scale_id: Some(scale_id),
                    status: Some(SubstitutionStatus::Accepted),
                    ..Default::default()
                },
            )
            .await?
            .into_iter()
            .map(|request| ((request.target_id, request.function_id), request))
            .collect();

        let mut summary = RecordFromScaleSummary {
            scale_id,
            created: 0,
            skipped: 0,
            records: Vec::new(),
        };

        for assignment in &scale.assignments {
            for volunteer_id in &assignment.assigned_members {
                if self.history.find_for(tenant_id, *volunteer_id, scale_id).await?.is_some() {
                    summary.skipped += 1;
                    continue;
                }

                let swap = swaps.get(&(*volunteer_id, assignment.function_id));
                let now = Utc::now();
                let record = ServiceHistoryRecord {
                    id: ServiceHistoryId::new(),
                    tenant_id,
                    volunteer_id: *volunteer_id,
                    scale_id,
                    function_id: assignment.function_id,
                    ministry_id: scale.ministry_id,
                    service_date: scale.event_date,
                    status: ServiceStatus::Completed,
                    notes: None,
                    original_user_id: swap.map(|s| s.requester_id),
                    substitution_request_id: swap.map(|s| s.id),
                    recorded_by: Some(recorded_by),
                    created_at: now,
                    updated_at: now,
                };

                match self.history.create(&record).await {
                    Ok(created) => {
                        summary.created += 1;
                        summary.records.push(created);
                    }
                    // recorded concurrently
                    Err(AppError::Conflict(_)) => summary.skipped += 1,
                    Err(e) => return Err(e),
                }
            }
        }

        tracing::info!(
            scale_id = %scale_id,
            created = summary.created,
            skipped = summary.skipped,
            "Recorded service from scale"
        );
        Ok(summary)
    }

    pub async fn list(&self, tenant_id: TenantId, filter: &ServiceHistoryFilter) -> AppResult<Vec<ServiceHistoryRecord>> {
        self.history.list(tenant_id, filter).await
    }

    pub async fn volunteer_stats(
        &self,
        tenant_id: TenantId,
        volunteer_id: VolunteerId,
        ministry_id: Option<MinistryId>,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> AppResult<VolunteerServiceStats> {
        let records = self
            .history
            .list(
                tenant_id,
                &ServiceHistoryFilter {
                    volunteer_id: Some(volunteer_id),
                    ministry_id,
                    from,
                    to,
                    ..Default::default()
                },
            )
            .await?;
        Ok(VolunteerServiceStats::from_records(volunteer_id, &records))
    }

    pub async fn ministry_stats(
        &self,
        tenant_id: TenantId,
        ministry_id: MinistryId,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> AppResult<MinistryServiceStats> {
        let records = self
            .history
            .list(
                tenant_id,
                &ServiceHistoryFilter {
                    ministry_id: Some(ministry_id),
                    from,
                    to,
                    ..Default::default()
                },
            )
            .await?;
        Ok(MinistryServiceStats::from_records(ministry_id, &records))
    }
}
