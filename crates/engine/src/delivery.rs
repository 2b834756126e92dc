//! Delivered-side roll-up across flights: raw sums plus the derived
//! rates the report surfaces.

use crate::plan::FlightPlan;
use pacing_core::stats;
use pacing_core::types::GoalType;
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Default, Serialize)]
pub struct DeliveryStats {
    pub impressions: f64,
    pub video_views: f64,
    pub clicks: f64,
    pub cost: f64,
    pub cpv: Option<f64>,
    pub cpm: Option<f64>,
    pub ctr: Option<f64>,
    pub video_view_rate: Option<f64>,
    /// Human-facing label of the goal types in play, e.g. "CPM & CPV".
    pub goal_type: Option<String>,
}

pub fn delivery_stats_from_flights(
    plans: &[&FlightPlan],
    campaign_id: Option<Uuid>,
) -> DeliveryStats {
    let mut out = DeliveryStats::default();
    let mut video_impressions = 0.0;
    let mut video_clicks = 0.0;
    let mut video_cost = 0.0;
    let mut has_cpv = false;
    let mut has_cpm = false;

    for plan in plans {
        let totals = plan.totals_for(campaign_id);
        out.impressions += totals.impressions;
        out.video_views += totals.video_views;
        out.clicks += totals.clicks;
        out.cost += totals.cost;
        video_impressions += totals.video_impressions;
        video_clicks += totals.video_clicks;
        video_cost += totals.video_cost;
        match plan.row.goal_type {
            GoalType::Cpv => has_cpv = true,
            GoalType::Cpm => has_cpm = true,
            GoalType::HardCost => {}
        }
    }

    out.cpv = stats::average_cpv(video_cost, out.video_views);
    out.cpm = stats::average_cpm(out.cost, out.impressions);
    out.video_view_rate = stats::video_view_rate(out.video_views, video_impressions);
    // CPV flights in the mix measure clicks against delivered views.
    out.ctr = if has_cpv {
        stats::ctr_v(video_clicks, out.video_views)
    } else {
        stats::ctr(out.clicks, out.impressions)
    };
    out.goal_type = match (has_cpm, has_cpv) {
        (true, true) => Some(format!("{} & {}", GoalType::Cpm.as_str(), GoalType::Cpv.as_str())),
        (true, false) => Some(GoalType::Cpm.as_str().to_string()),
        (false, true) => Some(GoalType::Cpv.as_str().to_string()),
        (false, false) => None,
    };
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
