use chrono::NaiveDate;
use metrics::counter;
use std::sync::Arc;

use crate::engine::{settings_or_default, AvailabilityValidator, EngineConfig};
use crate::models::{
    BlockedDate, DateBlockStatus, MinistryId, MonthlyBlockedDaysInfo, TenantId, Unavailability,
    VolunteerAvailability, VolunteerId,
};
use crate::stores::{AvailabilityStore, MinistrySettingsStore};
use crate::{AppError, AppResult};

const DEFAULT_BLOCK_REASON: &str = "Unavailable";

pub struct VolunteerAvailabilityService {
    validator: Arc<AvailabilityValidator>,
    availability: Arc<dyn AvailabilityStore>,
    settings: Arc<dyn MinistrySettingsStore>,
    config: EngineConfig,
}

impl VolunteerAvailabilityService {
    pub fn new(
        validator: Arc<AvailabilityValidator>,
        availability: Arc<dyn AvailabilityStore>,
        settings: Arc<dyn MinistrySettingsStore>,
        config: EngineConfig,
    ) -> Self {
        Self {
            validator,
            availability,
            settings,
            config,
        }
    }

    /// Blocks `date` for the volunteer.
    ///
    /// Re-blocking with the same reason returns the record untouched; a new
    /// reason replaces the old one without adding an entry. The write is
    /// guarded by the version read before validation, so a concurrent block
    /// surfaces as `Conflict` instead of overrunning the quota.
    pub async fn block_date(
        &self,
        tenant_id: TenantId,
        ministry_id: MinistryId,
        volunteer_id: VolunteerId,
        date: NaiveDate,
        reason: Option<String>,
    ) -> AppResult<VolunteerAvailability> {
        let reason = reason
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty())
            .unwrap_or_else(|| DEFAULT_BLOCK_REASON.to_string());

        let settings = settings_or_default(self.settings.as_ref(), &self.config, tenant_id, ministry_id).await?;
        let record = self
            .availability
            .get_or_create(tenant_id, ministry_id, volunteer_id, settings.max_blocked_days_per_month)
            .await?;

        if let Some(existing) = record.block_on(date) {
            if existing.reason == reason {
                tracing::debug!(volunteer_id = %volunteer_id, date = %date, "Date already blocked with same reason");
                return Ok(record);
            }

            let blocked_dates: Vec<BlockedDate> = record
                .blocked_dates
                .iter()
                .cloned()
                .map(|mut entry| {
                    if entry.is_blocked && entry.date == date {
                        entry.reason = reason.clone();
                    }
                    entry
                })
                .collect();
            let saved = self
                .availability
                .save_blocked_dates(record.id, record.version, &blocked_dates)
                .await?;
            tracing::info!(volunteer_id = %volunteer_id, date = %date, "Updated reason of blocked date");
            return Ok(saved);
        }

        let check = self
            .validator
            .can_block_date(tenant_id, ministry_id, volunteer_id, date)
            .await?;
        if !check.can_block {
            let message = check.reason.unwrap_or_else(|| format!("Cannot block {}", date));
            tracing::warn!(volunteer_id = %volunteer_id, date = %date, reason = %message, "Block refused");
            return Err(AppError::BadRequest(message));
        }

        let mut blocked_dates: Vec<BlockedDate> = record
            .blocked_dates
            .iter()
            .filter(|entry| entry.date != date)
            .cloned()
            .collect();
        blocked_dates.push(BlockedDate {
            date,
            reason,
            is_blocked: true,
        });
        blocked_dates.sort_by_key(|entry| entry.date);

        let saved = self
            .availability
            .save_blocked_dates(record.id, record.version, &blocked_dates)
            .await?;

        counter!("availability_blocks_total").increment(1);
        tracing::info!(
            volunteer_id = %volunteer_id,
            ministry_id = %ministry_id,
            date = %date,
            "Date blocked"
        );
        Ok(saved)
    }

    pub async fn unblock_date(
        &self,
        tenant_id: TenantId,
        ministry_id: MinistryId,
        volunteer_id: VolunteerId,
        date: NaiveDate,
    ) -> AppResult<VolunteerAvailability> {
        let record = self
            .availability
            .find(tenant_id, ministry_id, volunteer_id)
            .await?
            .filter(|record| record.block_on(date).is_some())
            .ok_or_else(|| AppError::BadRequest(format!("{} is not blocked", date)))?;

        let remaining: Vec<BlockedDate> = record
            .blocked_dates
            .iter()
            .filter(|entry| entry.date != date)
            .cloned()
            .collect();
        let saved = self
            .availability
            .save_blocked_dates(record.id, record.version, &remaining)
            .await?;

        tracing::info!(volunteer_id = %volunteer_id, ministry_id = %ministry_id, date = %date, "Date unblocked");
        Ok(saved)
    }

    pub async fn check_date(
        &self,
        tenant_id: TenantId,
        ministry_id: MinistryId,
        volunteer_id: VolunteerId,
        date: NaiveDate,
    ) -> AppResult<DateBlockStatus> {
        let block = self
            .availability
            .find(tenant_id, ministry_id, volunteer_id)
            .await?
            .and_then(|record| record.block_on(date).cloned());

        Ok(DateBlockStatus {
            date,
            is_blocked: block.is_some(),
            reason: block.map(|entry| entry.reason),
        })
    }

    pub async fn list(
        &self,
        tenant_id: TenantId,
        ministry_id: Option<MinistryId>,
        volunteer_id: Option<VolunteerId>,
    ) -> AppResult<Vec<VolunteerAvailability>> {
        self.availability.list(tenant_id, ministry_id, volunteer_id).await
    }

    /// Every blocked day in the ministry within `[from, to]`, by date then volunteer.
    pub async fn unavailabilities(
        &self,
        tenant_id: TenantId,
        ministry_id: MinistryId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> AppResult<Vec<Unavailability>> {
        if from > to {
            return Err(AppError::BadRequest(format!("Range start {} is after its end {}", from, to)));
        }

        let records = self.availability.list(tenant_id, Some(ministry_id), None).await?;
        let mut days: Vec<Unavailability> = records
            .iter()
            .flat_map(|record| {
                record
                    .blocked_dates
                    .iter()
                    .filter(|entry| entry.is_blocked && entry.date >= from && entry.date <= to)
                    .map(|entry| Unavailability {
                        volunteer_id: record.volunteer_id,
                        date: entry.date,
                        reason: entry.reason.clone(),
                    })
            })
            .collect();
        days.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.volunteer_id.cmp(&b.volunteer_id)));
        Ok(days)
    }

    pub async fn monthly_info(
        &self,
        tenant_id: TenantId,
        ministry_id: MinistryId,
        volunteer_id: VolunteerId,
        year: Option<i32>,
        month: Option<u32>,
    ) -> AppResult<MonthlyBlockedDaysInfo> {
        self.validator
            .get_monthly_blocked_days_info(tenant_id, ministry_id, volunteer_id, year, month)
            .await
    }

    pub async fn free_volunteers(
        &self,
        tenant_id: TenantId,
        ministry_id: MinistryId,
        date: NaiveDate,
        exclude: &[VolunteerId],
    ) -> AppResult<Vec<VolunteerId>> {
        self.validator
            .find_available_volunteers(tenant_id, ministry_id, date, exclude)
            .await
    }
}
