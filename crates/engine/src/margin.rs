//! Client-cost accumulation and margin across a set of flights.

use crate::plan::FlightPlan;
use pacing_core::stats;
use pacing_core::types::{DynamicPlacementType, GoalType, PlacementKind};
use uuid::Uuid;

/// Billable client cost for one flight, given its delivery to date.
///
/// Outgoing-fee flights never bill the client (their booked cost is
/// apportioned on the spend side instead). Rate-and-tech-fee placements
/// bill realized rate plus the tech fee per delivered unit; dynamic
/// budget and service-fee placements bill actual spend capped at the
/// booked cost; hard-cost bills the booked cost; plain CPV/CPM bill the
/// ordered rate per delivered unit.
fn client_cost_for_flight(plan: &FlightPlan, campaign_id: Option<Uuid>) -> f64 {
    if plan.row.placement_kind == PlacementKind::OutgoingFee {
        return 0.0;
    }
    let totals = plan.totals_for(campaign_id);
    match plan.row.dynamic_placement {
        Some(DynamicPlacementType::RateAndTechFee) => {
            let tech_fee = plan.row.tech_fee.unwrap_or(0.0);
            match plan.row.goal_type {
                GoalType::Cpv => {
                    let cpv = stats::average_cpv(totals.cost, totals.video_views).unwrap_or(0.0);
                    totals.video_views * (cpv + tech_fee)
                }
                GoalType::Cpm => {
                    let cpm = stats::average_cpm(totals.cost, totals.impressions).unwrap_or(0.0);
                    totals.impressions / 1000.0 * (cpm + tech_fee)
                }
                GoalType::HardCost => 0.0,
            }
        }
        Some(DynamicPlacementType::Budget) | Some(DynamicPlacementType::ServiceFee) => {
            totals.cost.min(plan.row.total_cost)
        }
        None => match plan.row.goal_type {
            GoalType::Cpv => plan.row.ordered_rate * totals.video_views,
            GoalType::Cpm => plan.row.ordered_rate * totals.impressions / 1000.0,
            GoalType::HardCost => plan.row.total_cost,
        },
    }
}

/// Margin for a set of flights: `1 - cost / client_cost`, with the
/// aggregate client cost capped at `current_cost_limit` (the booked
/// cost of flights that have already started).
pub fn margin_from_flights(
    plans: &[&FlightPlan],
    cost: f64,
    current_cost_limit: f64,
    campaign_id: Option<Uuid>,
) -> f64 {
    let client_cost: f64 = plans
        .iter()
        .map(|plan| client_cost_for_flight(plan, campaign_id))
        .sum();
    stats::margin(Some(current_cost_limit), cost, client_cost)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::{build_flight_plans, plan_stats_from_flights};
    use crate::snapshot::{DailyDelivery, FlightRow};
    use chrono::NaiveDate;
    use pacing_core::config::EngineSettings;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn row(goal_type: GoalType, start: NaiveDate, end: NaiveDate) -> FlightRow {
        FlightRow {
            id: Uuid::new_v4(),
            name: "f".to_string(),
            placement_id: Uuid::new_v4(),
            opportunity_id: Uuid::new_v4(),
            start,
            end,
            ordered_units: 0.0,
            total_cost: 0.0,
            cost: 0.0,
            budget: 0.0,
            goal_type,
            dynamic_placement: None,
            placement_kind: PlacementKind::Regular,
            ordered_rate: 0.0,
            tech_fee: None,
            opportunity_budget: 50_000.0,
            cannot_roll_over: false,
            cpm_buffer: None,
            cpv_buffer: None,
            daily_delivery: Vec::new(),
        }
    }

    fn delivery(date: NaiveDate, video_views: f64, impressions: f64, cost: f64) -> DailyDelivery {
        DailyDelivery {
            campaign_id: Uuid::new_v4(),
            date,
            impressions,
            video_views,
            clicks: 0.0,
            cost,
        }
    }

    fn margin_of(rows: Vec<FlightRow>, today: NaiveDate) -> f64 {
        let settings = EngineSettings::default();
        let plans = build_flight_plans(rows, today, &settings);
        let refs: Vec<&FlightPlan> = plans.iter().collect();
        let stats = plan_stats_from_flights(&refs, 1.0, None, today);
        margin_from_flights(&refs, stats.cost, stats.current_cost_limit, None)
    }

    #[test]
    fn test_margin_is_full_when_nothing_spent() {
        let today = d(2017, 1, 1);
        let mut cpv = row(GoalType::Cpv, today, today);
        cpv.ordered_units = 1000.0;
        cpv.ordered_rate = 0.5;
        cpv.total_cost = 500.0;
        cpv.daily_delivery = vec![delivery(today, 100.0, 0.0, 0.0)];
        assert!((margin_of(vec![cpv], today) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_margin_hard_cost_and_cpv_mix() {
        // Hard cost bills 500 against 400 actual; CPV bills
        // 0.8 * 500 = 400 against 100 spend. Margin = 1 - 500/900.
        let today = d(2017, 1, 1);
        let mut hc = row(GoalType::HardCost, today, today);
        hc.total_cost = 500.0;
        hc.cost = 400.0;
        let mut cpv = row(GoalType::Cpv, today, today);
        cpv.ordered_rate = 0.8;
        cpv.total_cost = 600.0;
        cpv.daily_delivery = vec![delivery(today, 500.0, 0.0, 100.0)];

        let m = margin_of(vec![hc, cpv], today);
        assert!((m - (1.0 - 500.0 / 900.0)).abs() < 1e-9);
    }

    #[test]
    fn test_margin_dynamic_budget_caps_client_cost_at_contract() {
        // Spend beyond the booked cost bills only the booked cost, so
        // the margin goes negative.
        let today = d(2017, 1, 1);
        let mut budget = row(GoalType::Cpv, today, today);
        budget.dynamic_placement = Some(DynamicPlacementType::Budget);
        budget.total_cost = 200.0;
        budget.daily_delivery = vec![delivery(today, 0.0, 0.0, 250.0)];

        let m = margin_of(vec![budget], today);
        assert!((m - (1.0 - 250.0 / 200.0)).abs() < 1e-9);
    }

    #[test]
    fn test_margin_dynamic_budget_under_delivery_is_zero() {
        let today = d(2017, 1, 1);
        let mut budget = row(GoalType::Cpv, today, today);
        budget.dynamic_placement = Some(DynamicPlacementType::Budget);
        budget.total_cost = 200.0;
        budget.daily_delivery = vec![delivery(today, 0.0, 0.0, 140.0)];

        let m = margin_of(vec![budget], today);
        assert!(m.abs() < 1e-9);
    }

    #[test]
    fn test_margin_rate_and_tech_fee() {
        // Realized CPV 0.05 plus fee 0.02: client cost = views * 0.07,
        // spend = views * 0.05, margin = fee / (cpv + fee).
        let today = d(2017, 1, 1);
        let mut rtf = row(GoalType::Cpv, today, today);
        rtf.dynamic_placement = Some(DynamicPlacementType::RateAndTechFee);
        rtf.tech_fee = Some(0.02);
        rtf.total_cost = 10_000.0;
        rtf.daily_delivery = vec![delivery(today, 1000.0, 0.0, 50.0)];

        let m = margin_of(vec![rtf], today);
        assert!((m - 0.02 / 0.07).abs() < 1e-9);
    }

    #[test]
    fn test_not_started_flight_does_not_cap_margin() {
        // Only the started flight's booked cost enters the cap, so the
        // future flight's billing potential is ignored.
        let today = d(2017, 1, 10);
        let mut live = row(GoalType::Cpv, d(2017, 1, 1), d(2017, 1, 20));
        live.ordered_rate = 0.5;
        live.total_cost = 500.0;
        live.daily_delivery = vec![delivery(d(2017, 1, 5), 400.0, 0.0, 100.0)];
        let mut future = row(GoalType::Cpv, d(2017, 2, 1), d(2017, 2, 20));
        future.ordered_rate = 0.5;
        future.total_cost = 500.0;

        // client cost 200, spend 100.
        let m = margin_of(vec![live, future], today);
        assert!((m - 0.5).abs() < 1e-9);
    }
}
