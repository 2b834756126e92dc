//! Pacing computation engine. Pure functions of a snapshot of the
//! planning hierarchy plus an explicit "today": flight plans with
//! roll-over, delivery roll-ups, pacing, margin, quality buckets,
//! charts, and the report assembly on top of them.

pub mod charts;
pub mod delivery;
pub mod margin;
pub mod period;
pub mod plan;
pub mod quality;
pub mod report;
pub mod snapshot;

pub use charts::{
    Chart, ChartData, ChartId, ChartPoint, GoalTypeChartData, HistoricalChart, HistoricalPacing,
    HistoricalSpendPoint, HistoricalUnitsPoint,
};
pub use delivery::{delivery_stats_from_flights, DeliveryStats};
pub use margin::margin_from_flights;
pub use period::Period;
pub use plan::{
    build_flight_plans, pacing_from_flights, plan_stats_from_flights, FlightPlan, PlanStats,
};
pub use quality::{quality_fields, QualityFields};
pub use report::{
    normalize_campaign_allocations, Alert, CampaignSummary, FlightSummary, OpportunityFilter,
    OpportunityStatus, OpportunitySummary, PacingReport, PlacementSummary,
};
pub use snapshot::{AllocationRange, DailyDelivery, DeliveryTotals, FlightRow, HierarchyReader};
