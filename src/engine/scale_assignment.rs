use chrono::{Duration, NaiveDate};
use metrics::counter;
use std::cmp::{Ordering, Reverse};
use std::collections::HashMap;
use std::sync::Arc;

use super::{settings_or_default, today, AvailabilityValidator, EngineConfig};
use crate::models::{
    Assignment, Member, MinistryRole, Qualification, RoleSuggestions, Scale, ScaleGenerationResult,
    ServiceHistoryFilter, VolunteerId, VolunteerSuggestion,
};
use crate::stores::{MembershipDirectory, MinistrySettingsStore, QualificationDirectory, ServiceHistoryStore};
use crate::AppResult;

/// Ranks volunteers per role of a scale. Advisory only: the scale is never written.
pub struct ScaleAssignmentEngine {
    validator: Arc<AvailabilityValidator>,
    members: Arc<dyn MembershipDirectory>,
    qualifications: Arc<dyn QualificationDirectory>,
    history: Arc<dyn ServiceHistoryStore>,
    settings: Arc<dyn MinistrySettingsStore>,
    config: EngineConfig,
}

impl ScaleAssignmentEngine {
    pub fn new(
        validator: Arc<AvailabilityValidator>,
        members: Arc<dyn MembershipDirectory>,
        qualifications: Arc<dyn QualificationDirectory>,
        history: Arc<dyn ServiceHistoryStore>,
        settings: Arc<dyn MinistrySettingsStore>,
        config: EngineConfig,
    ) -> Self {
        Self {
            validator,
            members,
            qualifications,
            history,
            settings,
            config,
        }
    }

    pub async fn generate_scale_assignments(&self, scale: &Scale) -> AppResult<ScaleGenerationResult> {
        let tenant_id = scale.tenant_id;
        let ministry_id = scale.ministry_id;

        let eligible: Vec<Member> = self
            .members
            .active_members(tenant_id, ministry_id, &MinistryRole::SERVING)
            .await?
            .into_iter()
            .filter(|member| member.role.can_serve())
            .collect();
        let ids: Vec<VolunteerId> = eligible.iter().map(|member| member.volunteer_id).collect();
        let availability = self
            .validator
            .check_many(tenant_id, ministry_id, &ids, scale.event_date)
            .await?;

        let available: Vec<&Member> = eligible
            .iter()
            .filter(|member| {
                availability
                    .get(&member.volunteer_id)
                    .is_some_and(|check| check.is_available)
            })
            .collect();

        let window_end = today();
        let window_start = window_end - Duration::days(self.config.service_history_window_days);

        let mut suggestions = Vec::with_capacity(scale.assignments.len());
        for assignment in &scale.assignments {
            let role = self
                .suggest_for_role(scale, assignment, &available, window_start, window_end)
                .await?;
            suggestions.push(role);
        }

        let total_volunteers_needed: i64 = scale
            .assignments
            .iter()
            .map(|assignment| assignment.required_slots.max(0) as i64)
            .sum();
        let total_volunteers_available: i64 = suggestions.iter().map(|role| role.available_count as i64).sum();

        let settings = settings_or_default(self.settings.as_ref(), &self.config, tenant_id, ministry_id).await?;

        counter!("scale_suggestions_generated_total").increment(1);
        tracing::info!(
            scale_id = %scale.id,
            ministry_id = %ministry_id,
            roles = suggestions.len(),
            needed = total_volunteers_needed,
            available = total_volunteers_available,
            "Generated scale suggestions"
        );

        Ok(ScaleGenerationResult {
            scale_id: scale.id,
            suggestions,
            requires_approval: settings.require_leader_approval,
            total_volunteers_needed,
            total_volunteers_available,
            coverage: coverage(total_volunteers_available, total_volunteers_needed),
        })
    }

    async fn suggest_for_role(
        &self,
        scale: &Scale,
        assignment: &Assignment,
        available: &[&Member],
        window_start: NaiveDate,
        window_end: NaiveDate,
    ) -> AppResult<RoleSuggestions> {
        let qualified: HashMap<VolunteerId, Qualification> = self
            .qualifications
            .qualified_for(scale.ministry_id, assignment.function_id)
            .await?
            .into_iter()
            .map(|q| (q.volunteer_id, q))
            .collect();

        let recent = self
            .history
            .list(
                scale.tenant_id,
                &ServiceHistoryFilter {
                    function_id: Some(assignment.function_id),
                    from: Some(window_start),
                    to: Some(window_end),
                    ..Default::default()
                },
            )
            .await?;
        let mut load: HashMap<VolunteerId, (i64, Option<NaiveDate>)> = HashMap::new();
        for record in &recent {
            let entry = load.entry(record.volunteer_id).or_insert((0, None));
            entry.0 += 1;
            entry.1 = entry.1.max(Some(record.service_date));
        }

        let mut candidates: Vec<VolunteerSuggestion> = available
            .iter()
            .filter(|member| !assignment.has_member(member.volunteer_id))
            .filter_map(|member| {
                let qualification = qualified.get(&member.volunteer_id)?;
                let (service_count, last_service_date) =
                    load.get(&member.volunteer_id).copied().unwrap_or((0, None));
                Some(VolunteerSuggestion {
                    volunteer_id: member.volunteer_id,
                    name: member.name.clone(),
                    email: member.email.clone(),
                    level: qualification.level,
                    priority: qualification.priority,
                    service_count,
                    last_service_date,
                })
            })
            .collect();

        let available_count = candidates.len();
        candidates.sort_by(rank);

        let limit = (assignment.required_slots.max(0) as usize)
            .saturating_mul(self.config.suggestion_multiplier.max(0) as usize);
        candidates.truncate(limit);

        tracing::debug!(
            scale_id = %scale.id,
            function_id = %assignment.function_id,
            available_count,
            suggested = candidates.len(),
            "Ranked role candidates"
        );

        Ok(RoleSuggestions {
            function_id: assignment.function_id,
            function_name: assignment.function_name.clone(),
            required_slots: assignment.required_slots,
            already_assigned: assignment.assigned_members.clone(),
            available_count,
            suggestions: candidates,
        })
    }
}

/// Fewer recent services, then lower priority number, then higher level, then name.
pub(crate) fn rank(a: &VolunteerSuggestion, b: &VolunteerSuggestion) -> Ordering {
    let key = |s: &VolunteerSuggestion| (s.service_count, s.priority, Reverse(s.level.weight()));
    key(a)
        .cmp(&key(b))
        .then_with(|| a.name.cmp(&b.name))
        .then_with(|| a.volunteer_id.cmp(&b.volunteer_id))
}

/// Percentage of needed slots the available pool could fill, capped at 100.
pub(crate) fn coverage(available: i64, needed: i64) -> f64 {
    if needed <= 0 {
        return 100.0;
    }
    let pct = (available as f64 / needed as f64 * 100.0).min(100.0);
    (pct * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::QualificationLevel;

    fn suggestion(name: &str, service_count: i64, priority: i32, level: QualificationLevel) -> VolunteerSuggestion {
        VolunteerSuggestion {
            volunteer_id: VolunteerId::new(),
            name: name.to_string(),
            email: format!("{}@example.org", name.to_lowercase()),
            level,
            priority,
            service_count,
            last_service_date: None,
        }
    }

    fn names(mut list: Vec<VolunteerSuggestion>) -> Vec<String> {
        list.sort_by(rank);
        list.into_iter().map(|s| s.name).collect()
    }

    #[test]
    fn load_balancing_comes_first() {
        let ranked = names(vec![
            suggestion("Ana", 2, 1, QualificationLevel::Specialist),
            suggestion("Bruno", 0, 5, QualificationLevel::Beginner),
            suggestion("Carla", 1, 1, QualificationLevel::Advanced),
        ]);
        assert_eq!(ranked, vec!["Bruno", "Carla", "Ana"]);
    }

    #[test]
    fn priority_then_level_then_name_break_ties() {
        let ranked = names(vec![
            suggestion("Zoe", 1, 2, QualificationLevel::Specialist),
            suggestion("Yan", 1, 1, QualificationLevel::Beginner),
            suggestion("Xia", 1, 1, QualificationLevel::Advanced),
            suggestion("Abe", 1, 1, QualificationLevel::Advanced),
        ]);
        assert_eq!(ranked, vec!["Abe", "Xia", "Yan", "Zoe"]);
    }

    #[test]
    fn coverage_is_capped() {
        assert_eq!(coverage(3, 2), 100.0);
        assert_eq!(coverage(1, 3), 33.33);
        assert_eq!(coverage(0, 4), 0.0);
        assert_eq!(coverage(0, 0), 100.0);
    }
}
