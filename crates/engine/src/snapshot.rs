//! Engine-facing read model. The engine never queries a database: a
//! `HierarchyReader` hands it pre-joined flight rows with their daily
//! delivery facts, and everything downstream is a pure function of
//! those rows plus an explicit "today".

use chrono::NaiveDate;
use pacing_core::types::{
    Campaign, DynamicPlacementType, Flight, GoalType, Opportunity, Placement, PlacementKind,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One day of delivered metrics for one campaign within a flight span.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyDelivery {
    pub campaign_id: Uuid,
    pub date: NaiveDate,
    pub impressions: f64,
    pub video_views: f64,
    pub clicks: f64,
    pub cost: f64,
}

/// Rolled-up delivery metrics. The `video_*` fields only count days on
/// which views were actually delivered, mirroring how video-capable
/// traffic is segmented out of mixed campaigns.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct DeliveryTotals {
    pub impressions: f64,
    pub video_impressions: f64,
    pub video_views: f64,
    pub clicks: f64,
    pub video_clicks: f64,
    pub cost: f64,
    pub video_cost: f64,
}

impl DeliveryTotals {
    pub fn absorb(&mut self, row: &DailyDelivery) {
        self.impressions += row.impressions;
        self.video_views += row.video_views;
        self.clicks += row.clicks;
        self.cost += row.cost;
        if row.video_views > 0.0 {
            self.video_impressions += row.impressions;
            self.video_clicks += row.clicks;
            self.video_cost += row.cost;
        }
    }
}

/// A flight joined with the placement and opportunity fields the plan
/// computation needs, plus its delivery facts.
#[derive(Debug, Clone)]
pub struct FlightRow {
    pub id: Uuid,
    pub name: String,
    pub placement_id: Uuid,
    pub opportunity_id: Uuid,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub ordered_units: f64,
    pub total_cost: f64,
    pub cost: f64,
    pub budget: f64,

    pub goal_type: GoalType,
    pub dynamic_placement: Option<DynamicPlacementType>,
    pub placement_kind: PlacementKind,
    pub ordered_rate: f64,
    pub tech_fee: Option<f64>,

    pub opportunity_budget: f64,
    pub cannot_roll_over: bool,
    pub cpm_buffer: Option<f64>,
    pub cpv_buffer: Option<f64>,

    /// Per-campaign, per-day statistic rows within `[start, end]`.
    pub daily_delivery: Vec<DailyDelivery>,
}

/// A contiguous date range of one flight-pacing allocation percentage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub allocation: f64,
}

/// Read access to the planning hierarchy. Implemented by the store;
/// the engine stays persistence-agnostic.
pub trait HierarchyReader {
    fn opportunities(&self) -> Vec<Opportunity>;
    fn opportunity(&self, id: Uuid) -> Option<Opportunity>;
    fn placements(&self, opportunity_id: Uuid) -> Vec<Placement>;
    fn placement(&self, id: Uuid) -> Option<Placement>;
    fn flight(&self, id: Uuid) -> Option<Flight>;
    fn campaigns(&self, placement_id: Uuid) -> Vec<Campaign>;
    fn flight_rows_for_opportunity(&self, opportunity_id: Uuid) -> Vec<FlightRow>;
    fn flight_rows_for_placement(&self, placement_id: Uuid) -> Vec<FlightRow>;
    /// Date-range pacing allocations for a flight, sorted by start.
    fn pacing_allocation_ranges(&self, flight_id: Uuid) -> Vec<AllocationRange>;
}
