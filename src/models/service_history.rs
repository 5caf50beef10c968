use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

use super::ids::{
    FunctionId, MinistryId, ScaleId, ServiceHistoryId, SwapRequestId, TenantId, VolunteerId,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ServiceStatus {
    Completed,
    Missed,
    Cancelled,
    Replaced,
}

impl ServiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceStatus::Completed => "completed",
            ServiceStatus::Missed => "missed",
            ServiceStatus::Cancelled => "cancelled",
            ServiceStatus::Replaced => "replaced",
        }
    }
}

impl fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServiceStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "completed" => Ok(ServiceStatus::Completed),
            "missed" => Ok(ServiceStatus::Missed),
            "cancelled" => Ok(ServiceStatus::Cancelled),
            "replaced" => Ok(ServiceStatus::Replaced),
            other => Err(format!("Unknown service status: {}", other)),
        }
    }
}

/// Whether a volunteer served a given assignment. Unique per (volunteer, scale).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ServiceHistoryRecord {
    pub id: ServiceHistoryId,
    pub tenant_id: TenantId,
    pub volunteer_id: VolunteerId,
    pub scale_id: ScaleId,
    pub function_id: FunctionId,
    pub ministry_id: MinistryId,
    pub service_date: NaiveDate,
    pub status: ServiceStatus,
    pub notes: Option<String>,
    /// Member originally assigned when this volunteer came in through a swap.
    pub original_user_id: Option<VolunteerId>,
    pub substitution_request_id: Option<SwapRequestId>,
    pub recorded_by: Option<VolunteerId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServiceHistoryFilter {
    pub volunteer_id: Option<VolunteerId>,
    pub ministry_id: Option<MinistryId>,
    pub scale_id: Option<ScaleId>,
    pub function_id: Option<FunctionId>,
    pub status: Option<ServiceStatus>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl ServiceHistoryFilter {
    pub fn matches(&self, record: &ServiceHistoryRecord) -> bool {
        self.volunteer_id.is_none_or(|id| record.volunteer_id == id)
            && self.ministry_id.is_none_or(|id| record.ministry_id == id)
            && self.scale_id.is_none_or(|id| record.scale_id == id)
            && self.function_id.is_none_or(|id| record.function_id == id)
            && self.status.is_none_or(|status| record.status == status)
            && self.from.is_none_or(|from| record.service_date >= from)
            && self.to.is_none_or(|to| record.service_date <= to)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct VolunteerServiceStats {
    pub volunteer_id: VolunteerId,
    pub total: i64,
    pub completed: i64,
    pub missed: i64,
    pub cancelled: i64,
    pub replaced: i64,
    /// completed / total as a percentage, two decimals.
    pub attendance_rate: f64,
    pub last_service_date: Option<NaiveDate>,
}

impl VolunteerServiceStats {
    pub fn from_records<'a>(
        volunteer_id: VolunteerId,
        records: impl IntoIterator<Item = &'a ServiceHistoryRecord>,
    ) -> Self {
        let mut stats = Self {
            volunteer_id,
            total: 0,
            completed: 0,
            missed: 0,
            cancelled: 0,
            replaced: 0,
            attendance_rate: 0.0,
            last_service_date: None,
        };

        for record in records {
            stats.total += 1;
            match record.status {
                ServiceStatus::Completed => {
                    stats.completed += 1;
                    stats.last_service_date = stats.last_service_date.max(Some(record.service_date));
                }
                ServiceStatus::Missed => stats.missed += 1,
                ServiceStatus::Cancelled => stats.cancelled += 1,
                ServiceStatus::Replaced => stats.replaced += 1,
            }
        }

        if stats.total > 0 {
            let rate = stats.completed as f64 / stats.total as f64 * 100.0;
            stats.attendance_rate = (rate * 100.0).round() / 100.0;
        }
        stats
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct MinistryServiceStats {
    pub ministry_id: MinistryId,
    pub total_services: i64,
    pub volunteers: Vec<VolunteerServiceStats>,
}

impl MinistryServiceStats {
    /// Groups records by volunteer; busiest volunteers first.
    pub fn from_records(ministry_id: MinistryId, records: &[ServiceHistoryRecord]) -> Self {
        let mut grouped: BTreeMap<VolunteerId, Vec<&ServiceHistoryRecord>> = BTreeMap::new();
        for record in records {
            grouped.entry(record.volunteer_id).or_default().push(record);
        }

        let mut volunteers: Vec<VolunteerServiceStats> = grouped
            .into_iter()
            .map(|(volunteer_id, records)| VolunteerServiceStats::from_records(volunteer_id, records))
            .collect();
        volunteers.sort_by(|a, b| {
            b.completed
                .cmp(&a.completed)
                .then_with(|| a.volunteer_id.cmp(&b.volunteer_id))
        });

        Self {
            ministry_id,
            total_services: records.len() as i64,
            volunteers,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RecordFromScaleSummary {
    pub scale_id: ScaleId,
    pub created: usize,
    pub skipped: usize,
    pub records: Vec<ServiceHistoryRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(volunteer_id: VolunteerId, status: ServiceStatus, day: u32) -> ServiceHistoryRecord {
        let now = Utc::now();
        ServiceHistoryRecord {
            id: ServiceHistoryId::new(),
            tenant_id: TenantId::new(),
            volunteer_id,
            scale_id: ScaleId::new(),
            function_id: FunctionId::new(),
            ministry_id: MinistryId::new(),
            service_date: NaiveDate::from_ymd_opt(2025, 5, day).unwrap(),
            status,
            notes: None,
            original_user_id: None,
            substitution_request_id: None,
            recorded_by: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn attendance_rate_counts_only_completed() {
        let volunteer = VolunteerId::new();
        let records = vec![
            record(volunteer, ServiceStatus::Completed, 4),
            record(volunteer, ServiceStatus::Completed, 11),
            record(volunteer, ServiceStatus::Missed, 18),
        ];

        let stats = VolunteerServiceStats::from_records(volunteer, &records);
        assert_eq!(stats.total, 3);
        assert_eq!(stats.completed, 2);
        assert_eq!(stats.missed, 1);
        assert_eq!(stats.attendance_rate, 66.67);
        assert_eq!(stats.last_service_date, NaiveDate::from_ymd_opt(2025, 5, 11));
    }

    #[test]
    fn empty_history_has_zero_rate() {
        let stats = VolunteerServiceStats::from_records(VolunteerId::new(), &[]);
        assert_eq!(stats.total, 0);
        assert_eq!(stats.attendance_rate, 0.0);
        assert!(stats.last_service_date.is_none());
    }

    #[test]
    fn ministry_stats_group_by_volunteer() {
        let busy = VolunteerId::new();
        let quiet = VolunteerId::new();
        let records = vec![
            record(quiet, ServiceStatus::Completed, 1),
            record(busy, ServiceStatus::Completed, 2),
            record(busy, ServiceStatus::Completed, 9),
            record(busy, ServiceStatus::Replaced, 16),
        ];

        let stats = MinistryServiceStats::from_records(MinistryId::new(), &records);
        assert_eq!(stats.total_services, 4);
        assert_eq!(stats.volunteers.len(), 2);
        assert_eq!(stats.volunteers[0].volunteer_id, busy);
        assert_eq!(stats.volunteers[0].replaced, 1);
        assert_eq!(stats.volunteers[1].volunteer_id, quiet);
    }
}
