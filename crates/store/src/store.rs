//! In-memory hierarchy store. DashMap collections per entity, reads
//! clone out, and the engine-facing `HierarchyReader` is implemented by
//! joining flights with their placement/opportunity fields plus the
//! per-campaign daily statistic rows inside the flight span.

use chrono::NaiveDate;
use dashmap::DashMap;
use pacing_core::types::{
    AllocationHistoryEntry, Campaign, CampaignStatistic, Flight, Opportunity, Placement,
};
use pacing_engine::snapshot::{AllocationRange, DailyDelivery, FlightRow, HierarchyReader};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;
use uuid::Uuid;

/// One calendar day of a flight's pacing allocation. `is_end` marks
/// the last day of a user-defined range so ranges can be reassembled.
#[derive(Debug, Clone, Copy)]
pub struct DayAllocation {
    pub allocation: f64,
    pub is_end: bool,
}

#[derive(Default)]
pub struct HierarchyStore {
    pub(crate) opportunities: DashMap<Uuid, Opportunity>,
    pub(crate) placements: DashMap<Uuid, Placement>,
    pub(crate) flights: DashMap<Uuid, Flight>,
    pub(crate) campaigns: DashMap<Uuid, Campaign>,
    /// Statistic facts per campaign, append-style.
    pub(crate) statistics: DashMap<Uuid, Vec<CampaignStatistic>>,
    /// Per-date pacing allocation table per flight.
    pub(crate) pacing_allocations: DashMap<Uuid, BTreeMap<NaiveDate, DayAllocation>>,
    pub(crate) allocation_history: Mutex<Vec<AllocationHistoryEntry>>,
    /// One write lock per flight for allocation mutations.
    pub(crate) flight_locks: DashMap<Uuid, Arc<Mutex<()>>>,
}

impl HierarchyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_opportunity(&self, opportunity: Opportunity) {
        self.opportunities.insert(opportunity.id, opportunity);
    }

    pub fn insert_placement(&self, placement: Placement) {
        self.placements.insert(placement.id, placement);
    }

    /// Inserting a flight seeds its per-date allocation table at 100%
    /// across the whole span, with the last day marked as a range end.
    pub fn insert_flight(&self, flight: Flight) {
        let mut table = BTreeMap::new();
        let mut date = flight.start;
        while date <= flight.end {
            table.insert(
                date,
                DayAllocation {
                    allocation: 100.0,
                    is_end: date == flight.end,
                },
            );
            date += chrono::Duration::days(1);
        }
        self.pacing_allocations.insert(flight.id, table);
        self.flights.insert(flight.id, flight);
    }

    pub fn insert_campaign(&self, campaign: Campaign) {
        self.campaigns.insert(campaign.id, campaign);
    }

    pub fn record_statistic(&self, statistic: CampaignStatistic) {
        self.statistics
            .entry(statistic.campaign_id)
            .or_default()
            .push(statistic);
    }

    pub fn allocation_history(&self, flight_id: Uuid) -> Vec<AllocationHistoryEntry> {
        self.allocation_history
            .lock()
            .iter()
            .filter(|e| e.flight_id == flight_id)
            .cloned()
            .collect()
    }

    pub(crate) fn flight_lock(&self, flight_id: Uuid) -> Arc<Mutex<()>> {
        self.flight_locks
            .entry(flight_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    fn placement_campaigns(&self, placement_id: Uuid) -> Vec<Campaign> {
        self.campaigns
            .iter()
            .filter(|c| c.placement_id == placement_id)
            .map(|c| c.clone())
            .collect()
    }

    /// Per-campaign, per-day delivery within the flight span, summed
    /// over duplicate statistic rows.
    fn daily_delivery_for(&self, placement_id: Uuid, flight: &Flight) -> Vec<DailyDelivery> {
        let mut by_key: BTreeMap<(Uuid, NaiveDate), DailyDelivery> = BTreeMap::new();
        for campaign in self.placement_campaigns(placement_id) {
            let Some(rows) = self.statistics.get(&campaign.id) else {
                continue;
            };
            for row in rows.iter() {
                if row.date < flight.start || row.date > flight.end {
                    continue;
                }
                let entry = by_key
                    .entry((campaign.id, row.date))
                    .or_insert_with(|| DailyDelivery {
                        campaign_id: campaign.id,
                        date: row.date,
                        impressions: 0.0,
                        video_views: 0.0,
                        clicks: 0.0,
                        cost: 0.0,
                    });
                entry.impressions += row.impressions as f64;
                entry.video_views += row.video_views as f64;
                entry.clicks += row.clicks as f64;
                entry.cost += row.cost;
            }
        }
        by_key.into_values().collect()
    }

    fn flight_row(&self, flight: &Flight) -> Option<FlightRow> {
        let placement = self.placements.get(&flight.placement_id)?.clone();
        let opportunity = self.opportunities.get(&placement.opportunity_id)?.clone();
        Some(FlightRow {
            id: flight.id,
            name: flight.name.clone(),
            placement_id: placement.id,
            opportunity_id: opportunity.id,
            start: flight.start,
            end: flight.end,
            ordered_units: flight.ordered_units,
            total_cost: flight.total_cost,
            cost: flight.cost,
            budget: flight.budget,
            goal_type: placement.goal_type,
            dynamic_placement: placement.dynamic_placement,
            placement_kind: placement.kind,
            ordered_rate: placement.ordered_rate,
            tech_fee: placement.tech_fee,
            opportunity_budget: opportunity.budget,
            cannot_roll_over: opportunity.cannot_roll_over,
            cpm_buffer: opportunity.cpm_buffer,
            cpv_buffer: opportunity.cpv_buffer,
            daily_delivery: self.daily_delivery_for(placement.id, flight),
        })
    }

    fn flight_rows(&self, mut keep: impl FnMut(&Placement) -> bool) -> Vec<FlightRow> {
        let placement_ids: Vec<Uuid> = self
            .placements
            .iter()
            .filter(|p| keep(p.value()))
            .map(|p| p.id)
            .collect();
        self.flights
            .iter()
            .filter(|f| placement_ids.contains(&f.placement_id))
            .filter_map(|f| self.flight_row(f.value()))
            .collect()
    }
}

impl HierarchyReader for HierarchyStore {
    fn opportunities(&self) -> Vec<Opportunity> {
        self.opportunities.iter().map(|o| o.clone()).collect()
    }

    fn opportunity(&self, id: Uuid) -> Option<Opportunity> {
        self.opportunities.get(&id).map(|o| o.clone())
    }

    fn placements(&self, opportunity_id: Uuid) -> Vec<Placement> {
        self.placements
            .iter()
            .filter(|p| p.opportunity_id == opportunity_id)
            .map(|p| p.clone())
            .collect()
    }

    fn placement(&self, id: Uuid) -> Option<Placement> {
        self.placements.get(&id).map(|p| p.clone())
    }

    fn flight(&self, id: Uuid) -> Option<Flight> {
        self.flights.get(&id).map(|f| f.clone())
    }

    fn campaigns(&self, placement_id: Uuid) -> Vec<Campaign> {
        self.placement_campaigns(placement_id)
    }

    fn flight_rows_for_opportunity(&self, opportunity_id: Uuid) -> Vec<FlightRow> {
        self.flight_rows(|p| p.opportunity_id == opportunity_id)
    }

    fn flight_rows_for_placement(&self, placement_id: Uuid) -> Vec<FlightRow> {
        self.flight_rows(|p| p.id == placement_id)
    }

    fn pacing_allocation_ranges(&self, flight_id: Uuid) -> Vec<AllocationRange> {
        let Some(table) = self.pacing_allocations.get(&flight_id) else {
            return Vec::new();
        };
        let mut ranges = Vec::new();
        let mut range_start: Option<NaiveDate> = None;
        let last = table.keys().next_back().copied();
        for (date, day) in table.iter() {
            if range_start.is_none() {
                range_start = Some(*date);
            }
            if day.is_end || Some(*date) == last {
                ranges.push(AllocationRange {
                    start: range_start.take().unwrap_or(*date),
                    end: *date,
                    allocation: day.allocation,
                });
            }
        }
        ranges
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{seed_hierarchy, stat};

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_flight_rows_join_hierarchy_fields() {
        let store = HierarchyStore::new();
        let ids = seed_hierarchy(&store, d(2017, 1, 1), d(2017, 1, 10));
        store.record_statistic(stat(ids.campaign, d(2017, 1, 3), 1000, 250, 5, 12.5));
        // Out-of-span rows are ignored.
        store.record_statistic(stat(ids.campaign, d(2017, 2, 1), 99, 99, 99, 99.0));

        let rows = store.flight_rows_for_placement(ids.placement);
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.placement_id, ids.placement);
        assert_eq!(row.opportunity_id, ids.opportunity);
        assert_eq!(row.daily_delivery.len(), 1);
        assert_eq!(row.daily_delivery[0].video_views, 250.0);
        assert_eq!(row.daily_delivery[0].cost, 12.5);
    }

    #[test]
    fn test_same_day_statistics_are_summed() {
        let store = HierarchyStore::new();
        let ids = seed_hierarchy(&store, d(2017, 1, 1), d(2017, 1, 10));
        store.record_statistic(stat(ids.campaign, d(2017, 1, 3), 100, 10, 1, 1.0));
        store.record_statistic(stat(ids.campaign, d(2017, 1, 3), 200, 20, 2, 2.0));

        let rows = store.flight_rows_for_placement(ids.placement);
        assert_eq!(rows[0].daily_delivery.len(), 1);
        assert_eq!(rows[0].daily_delivery[0].impressions, 300.0);
        assert_eq!(rows[0].daily_delivery[0].video_views, 30.0);
    }

    #[test]
    fn test_new_flight_is_fully_allocated() {
        let store = HierarchyStore::new();
        let ids = seed_hierarchy(&store, d(2017, 1, 1), d(2017, 1, 10));

        let ranges = store.pacing_allocation_ranges(ids.flight);
        assert_eq!(ranges.len(), 1);
        assert_eq!(ranges[0].start, d(2017, 1, 1));
        assert_eq!(ranges[0].end, d(2017, 1, 10));
        assert_eq!(ranges[0].allocation, 100.0);
    }
}
