use chrono::{Datelike, NaiveDate};
use std::collections::HashMap;
use std::sync::Arc;

use super::{settings_or_default, today, EngineConfig};
use crate::models::{
    AvailabilityCheck, BlockCheck, MinistryId, MonthlyBlockedDaysInfo, Scale, TenantId, VolunteerAvailability,
    VolunteerId,
};
use crate::stores::{AvailabilityStore, MinistrySettingsStore, ScaleStore};
use crate::{AppError, AppResult};

/// Read-only availability decisions. Nothing here mutates state, and a
/// blocked or booked volunteer is an ordinary result rather than an error.
pub struct AvailabilityValidator {
    availability: Arc<dyn AvailabilityStore>,
    settings: Arc<dyn MinistrySettingsStore>,
    scales: Arc<dyn ScaleStore>,
    config: EngineConfig,
}

impl AvailabilityValidator {
    pub fn new(
        availability: Arc<dyn AvailabilityStore>,
        settings: Arc<dyn MinistrySettingsStore>,
        scales: Arc<dyn ScaleStore>,
        config: EngineConfig,
    ) -> Self {
        Self {
            availability,
            settings,
            scales,
            config,
        }
    }

    pub async fn check_availability(
        &self,
        tenant_id: TenantId,
        ministry_id: MinistryId,
        volunteer_id: VolunteerId,
        date: NaiveDate,
    ) -> AppResult<AvailabilityCheck> {
        let record = self.availability.find(tenant_id, ministry_id, volunteer_id).await?;
        let occupying = self.scales.list_occupying_on(tenant_id, date).await?;
        Ok(evaluate(record.as_ref(), &occupying, volunteer_id, date))
    }

    /// Availability of many volunteers on one date with two store reads.
    pub async fn check_many(
        &self,
        tenant_id: TenantId,
        ministry_id: MinistryId,
        volunteers: &[VolunteerId],
        date: NaiveDate,
    ) -> AppResult<HashMap<VolunteerId, AvailabilityCheck>> {
        let records: HashMap<VolunteerId, VolunteerAvailability> = self
            .availability
            .list(tenant_id, Some(ministry_id), None)
            .await?
            .into_iter()
            .map(|record| (record.volunteer_id, record))
            .collect();
        let occupying = self.scales.list_occupying_on(tenant_id, date).await?;

        Ok(volunteers
            .iter()
            .map(|id| (*id, evaluate(records.get(id), &occupying, *id, date)))
            .collect())
    }

    pub async fn can_block_date(
        &self,
        tenant_id: TenantId,
        ministry_id: MinistryId,
        volunteer_id: VolunteerId,
        date: NaiveDate,
    ) -> AppResult<BlockCheck> {
        let info = self
            .get_monthly_blocked_days_info(tenant_id, ministry_id, volunteer_id, Some(date.year()), Some(date.month()))
            .await?;
        Ok(block_decision(&info, date, today()))
    }

    pub async fn get_monthly_blocked_days_info(
        &self,
        tenant_id: TenantId,
        ministry_id: MinistryId,
        volunteer_id: VolunteerId,
        year: Option<i32>,
        month: Option<u32>,
    ) -> AppResult<MonthlyBlockedDaysInfo> {
        let now = today();
        let year = year.unwrap_or(now.year());
        let month = month.unwrap_or(now.month());
        if !(1..=12).contains(&month) {
            return Err(AppError::BadRequest(format!("Invalid month: {}", month)));
        }

        let settings =
            settings_or_default(self.settings.as_ref(), &self.config, tenant_id, ministry_id).await?;
        let blocked_dates = self
            .availability
            .find(tenant_id, ministry_id, volunteer_id)
            .await?
            .map(|record| record.blocked_in_month(year, month))
            .unwrap_or_default();

        let max_allowed = settings.max_blocked_days_per_month;
        Ok(MonthlyBlockedDaysInfo {
            year,
            current_month: month,
            max_allowed,
            can_block_more: (blocked_dates.len() as i64) < max_allowed as i64,
            blocked_dates,
        })
    }

    /// Volunteers with an active availability record in the ministry who are free on `date`.
    pub async fn find_available_volunteers(
        &self,
        tenant_id: TenantId,
        ministry_id: MinistryId,
        date: NaiveDate,
        exclude: &[VolunteerId],
    ) -> AppResult<Vec<VolunteerId>> {
        let records = self.availability.list(tenant_id, Some(ministry_id), None).await?;
        let occupying = self.scales.list_occupying_on(tenant_id, date).await?;

        let free: Vec<VolunteerId> = records
            .iter()
            .filter(|record| !exclude.contains(&record.volunteer_id))
            .filter(|record| evaluate(Some(record), &occupying, record.volunteer_id, date).is_available)
            .map(|record| record.volunteer_id)
            .collect();

        tracing::debug!(
            ministry_id = %ministry_id,
            date = %date,
            scanned = records.len(),
            free = free.len(),
            "Resolved available volunteers"
        );
        Ok(free)
    }
}

/// Blocks take precedence over bookings so the stored reason is reported.
pub(crate) fn evaluate(
    record: Option<&VolunteerAvailability>,
    occupying: &[Scale],
    volunteer_id: VolunteerId,
    date: NaiveDate,
) -> AvailabilityCheck {
    if let Some(record) = record {
        if let Some(block) = record.block_on(date) {
            return AvailabilityCheck::unavailable(block.reason.clone(), Some(record.all_blocked()));
        }
    }

    match occupying
        .iter()
        .find(|scale| scale.event_date == date && scale.status.occupies_volunteers() && scale.has_member(volunteer_id))
    {
        Some(scale) => AvailabilityCheck::unavailable(
            format!("Volunteer is already scheduled on '{}' for {}", scale.name, date),
            None,
        ),
        None => AvailabilityCheck::available(),
    }
}

pub(crate) fn block_decision(info: &MonthlyBlockedDaysInfo, date: NaiveDate, today: NaiveDate) -> BlockCheck {
    if date < today {
        return BlockCheck::denied(format!("Cannot block {}: the date is in the past", date));
    }
    if info.blocked_dates.len() as i64 >= info.max_allowed as i64 {
        return BlockCheck::denied(format!(
            "Monthly quota of {} blocked days reached for {}-{:02}",
            info.max_allowed, info.year, info.current_month
        ));
    }
    if info.blocked_dates.contains(&date) {
        return BlockCheck::denied(format!("{} is already blocked", date));
    }
    BlockCheck::allowed()
}
