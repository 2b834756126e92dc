//! Allocation mutations. Every path validates the full payload before
//! touching any state and commits under the flight's write lock, so a
//! rejected update leaves no partial writes behind.

use crate::store::{DayAllocation, HierarchyStore};
use chrono::{NaiveDate, Utc};
use pacing_core::config::EngineSettings;
use pacing_core::types::{AllocationHistoryEntry, Campaign, Opportunity};
use pacing_core::{PacingError, PacingResult};
use pacing_engine::snapshot::{AllocationRange, HierarchyReader};
use std::collections::{BTreeMap, HashMap, HashSet};
use uuid::Uuid;

impl HierarchyStore {
    /// Rewrite the goal allocations of every campaign under a flight's
    /// placement. The campaign id set must match exactly, every value
    /// must be a finite non-negative percentage, and the sum must fall
    /// inside the configured tolerance band. One history record is
    /// appended per campaign, ordered by campaign id.
    pub fn update_campaign_allocations(
        &self,
        flight_id: Uuid,
        allocations: &HashMap<Uuid, f64>,
        flight_budget: Option<f64>,
        settings: &EngineSettings,
    ) -> PacingResult<Vec<Campaign>> {
        let flight = self
            .flights
            .get(&flight_id)
            .map(|f| f.clone())
            .ok_or_else(|| PacingError::not_found(format!("flight {flight_id}")))?;

        let lock = self.flight_lock(flight_id);
        let _guard = lock.lock();

        let mut campaigns: Vec<Campaign> = self
            .campaigns
            .iter()
            .filter(|c| c.placement_id == flight.placement_id)
            .map(|c| c.clone())
            .collect();
        if campaigns.is_empty() {
            return Err(PacingError::validation(
                "flight has no campaigns to allocate",
            ));
        }

        let expected: HashSet<Uuid> = campaigns.iter().map(|c| c.id).collect();
        let given: HashSet<Uuid> = allocations.keys().copied().collect();
        if expected != given {
            return Err(PacingError::validation(
                "allocation campaign set does not match the flight's campaigns",
            ));
        }

        let mut sum = 0.0;
        for (id, value) in allocations {
            if !value.is_finite() || *value < 0.0 {
                return Err(PacingError::validation(format!(
                    "invalid allocation value for campaign {id}"
                )));
            }
            sum += value;
        }
        if sum < settings.min_allocation_sum || sum > settings.max_allocation_sum {
            return Err(PacingError::validation(format!(
                "total allocation must be between {} and {}, got {sum}",
                settings.min_allocation_sum, settings.max_allocation_sum
            )));
        }

        // Validated; commit.
        campaigns.sort_by_key(|c| c.id);
        let changed_at = Utc::now();
        let mut history = self.allocation_history.lock();
        for campaign in &mut campaigns {
            let value = allocations[&campaign.id];
            campaign.goal_allocation = value;
            if let Some(mut stored) = self.campaigns.get_mut(&campaign.id) {
                stored.goal_allocation = value;
            }
            history.push(AllocationHistoryEntry {
                id: Uuid::new_v4(),
                flight_id,
                campaign_id: campaign.id,
                budget: value,
                changed_at,
            });
        }
        drop(history);

        if let Some(budget) = flight_budget {
            if let Some(mut stored) = self.flights.get_mut(&flight_id) {
                stored.budget = budget;
            }
        }

        tracing::info!(
            flight_id = %flight_id,
            campaigns = campaigns.len(),
            "campaign allocations updated"
        );
        campaigns.sort_by(|a, b| (&a.name, a.id).cmp(&(&b.name, b.id)));
        Ok(campaigns)
    }

    /// Replace a flight's date-range pacing allocations. Ranges must be
    /// sorted, non-overlapping, consecutive, cover exactly the flight
    /// span, and sum to exactly 100. Past ranges cannot change, and a
    /// first-time allocation must open with a range containing today.
    pub fn update_flight_pacing_allocation(
        &self,
        flight_id: Uuid,
        mut ranges: Vec<AllocationRange>,
        today: NaiveDate,
    ) -> PacingResult<Vec<AllocationRange>> {
        let flight = self
            .flights
            .get(&flight_id)
            .map(|f| f.clone())
            .ok_or_else(|| PacingError::not_found(format!("flight {flight_id}")))?;

        let lock = self.flight_lock(flight_id);
        let _guard = lock.lock();

        if ranges.is_empty() {
            return Err(PacingError::validation("no allocation ranges given"));
        }
        ranges.sort_by_key(|r| r.start);

        let total: f64 = ranges.iter().map(|r| r.allocation).sum();
        if (total - 100.0).abs() > 1e-9 {
            return Err(PacingError::validation(format!(
                "total allocation must be exactly 100, got {total}"
            )));
        }

        let mut table: BTreeMap<NaiveDate, DayAllocation> = self
            .pacing_allocations
            .get(&flight_id)
            .map(|t| t.clone())
            .unwrap_or_default();
        let first_time = table.values().all(|d| d.allocation == 100.0);

        let mut all_dates: Vec<NaiveDate> = Vec::new();
        for (i, range) in ranges.iter().enumerate() {
            if range.start > range.end {
                return Err(PacingError::validation(format!(
                    "range start must not be after its end: {} - {}",
                    range.start, range.end
                )));
            }
            if first_time && i == 0 && range.end < today {
                return Err(PacingError::validation(
                    "first-time allocation must start with a range containing today",
                ));
            }

            let mut date = range.start;
            while date <= range.end {
                let day = table.get_mut(&date).ok_or_else(|| {
                    PacingError::validation(format!("date not in flight duration: {date}"))
                })?;
                if range.allocation != day.allocation && range.end < today {
                    return Err(PacingError::validation(
                        "cannot modify an allocation in a past date range",
                    ));
                }
                day.allocation = range.allocation;
                day.is_end = date == range.end;
                all_dates.push(date);
                date += chrono::Duration::days(1);
            }

            if let Some(next) = ranges.get(i + 1) {
                let latest_start = range.start.max(next.start);
                let earliest_end = range.end.min(next.end);
                if (earliest_end - latest_start).num_days() + 1 > 0 {
                    return Err(PacingError::validation("allocation ranges must not overlap"));
                }
            }
        }

        let min = all_dates.iter().min().copied().unwrap_or(today);
        let max = all_dates.iter().max().copied().unwrap_or(today);
        if (max - min).num_days() as usize != all_dates.len() - 1 {
            return Err(PacingError::validation(
                "allocation ranges must be consecutive",
            ));
        }

        let first = ranges.first().map(|r| r.start);
        let last = ranges.last().map(|r| r.end);
        if first != Some(flight.start) || last != Some(flight.end) {
            return Err(PacingError::validation(
                "allocation ranges must cover exactly the flight span",
            ));
        }

        self.pacing_allocations.insert(flight_id, table);
        tracing::info!(flight_id = %flight_id, ranges = ranges.len(), "pacing allocation updated");
        Ok(self.pacing_allocation_ranges(flight_id))
    }

    /// Set an opportunity's goal-factor buffer overrides (percent).
    pub fn update_opportunity_buffer(
        &self,
        opportunity_id: Uuid,
        cpm_buffer: Option<f64>,
        cpv_buffer: Option<f64>,
    ) -> PacingResult<Opportunity> {
        for buffer in [cpm_buffer, cpv_buffer].into_iter().flatten() {
            if !buffer.is_finite() || !(0.0..=100.0).contains(&buffer) {
                return Err(PacingError::validation(format!(
                    "buffer must be a percentage between 0 and 100, got {buffer}"
                )));
            }
        }

        let mut opportunity = self
            .opportunities
            .get_mut(&opportunity_id)
            .ok_or_else(|| PacingError::not_found(format!("opportunity {opportunity_id}")))?;
        if cpm_buffer.is_some() {
            opportunity.cpm_buffer = cpm_buffer;
        }
        if cpv_buffer.is_some() {
            opportunity.cpv_buffer = cpv_buffer;
        }
        Ok(opportunity.clone())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
