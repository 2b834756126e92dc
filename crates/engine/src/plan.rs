//! Flight plan assembly: goal-factor buffering, plan-unit targets, and
//! the over/under-delivery roll-over pass that redistributes delivery
//! between flights of the same placement.

use crate::snapshot::{DeliveryTotals, FlightRow};
use chrono::{Duration, NaiveDate};
use pacing_core::config::EngineSettings;
use pacing_core::stats;
use pacing_core::types::{DynamicPlacementType, GoalType, PlacementKind};
use serde::Serialize;
use std::collections::HashMap;
use uuid::Uuid;

/// What a flight's delivered units are measured in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryField {
    Cost,
    Impressions,
    VideoViews,
}

/// A flight with its computed plan. `plan_units` is the buffered
/// nominal target; `recalculated_plan_units` is what remains after
/// roll-over and is what every plan-facing output reports.
#[derive(Debug, Clone)]
pub struct FlightPlan {
    pub row: FlightRow,
    pub days: i64,
    pub goal_factor: f64,
    pub plan_units: f64,
    pub sf_ordered_units: f64,
    pub recalculated_plan_units: f64,
    pub totals: DeliveryTotals,
    pub campaign_totals: HashMap<Uuid, DeliveryTotals>,
}

impl FlightPlan {
    pub fn is_dynamic(&self) -> bool {
        self.row.dynamic_placement.is_some()
    }

    /// The statistic field this flight's delivered units come from.
    /// Hard-cost flights without a dynamic placement deliver nothing.
    pub fn delivery_field(&self) -> Option<DeliveryField> {
        if self.is_dynamic() {
            return Some(DeliveryField::Cost);
        }
        match self.row.goal_type {
            GoalType::Cpm => Some(DeliveryField::Impressions),
            GoalType::Cpv => Some(DeliveryField::VideoViews),
            GoalType::HardCost => None,
        }
    }

    /// Delivery totals, optionally narrowed to a single campaign.
    pub fn totals_for(&self, campaign_id: Option<Uuid>) -> DeliveryTotals {
        match campaign_id {
            Some(id) => self.campaign_totals.get(&id).copied().unwrap_or_default(),
            None => self.totals,
        }
    }

    pub fn delivered_units(&self) -> f64 {
        self.delivered_units_for(None)
    }

    pub fn delivered_units_for(&self, campaign_id: Option<Uuid>) -> f64 {
        let totals = self.totals_for(campaign_id);
        match self.delivery_field() {
            Some(DeliveryField::Cost) => totals.cost,
            Some(DeliveryField::Impressions) => totals.impressions,
            Some(DeliveryField::VideoViews) => totals.video_views,
            None => 0.0,
        }
    }

    /// Inclusive days run through `today` (clamped to the flight span)
    /// and the flight's total day count.
    pub fn run_and_total_days(&self, today: NaiveDate) -> (i64, i64) {
        if today < self.row.start {
            return (0, self.days);
        }
        let run = (today.min(self.row.end) - self.row.start).num_days() + 1;
        (run, self.days)
    }
}

/// Plan buffer multiplier for one flight: the budget tier picks the
/// base factor, an opportunity buffer override wins for its goal type.
fn goal_factor_for(row: &FlightRow, settings: &EngineSettings) -> f64 {
    let base = if row.opportunity_budget > settings.big_budget_border {
        settings.big_goal_factor
    } else {
        settings.goal_factor
    };
    let buffer = match row.goal_type {
        GoalType::Cpv => row.cpv_buffer,
        GoalType::Cpm => row.cpm_buffer,
        GoalType::HardCost => None,
    };
    match buffer {
        Some(buffer) => 1.0 + buffer / 100.0,
        None => base,
    }
}

/// Build plans for a set of flight rows: compute buffered targets, then
/// redistribute over-delivery within each placement.
///
/// Flights are processed in ascending start-date order. Roll-over only
/// applies to CPV/CPM placements and is disabled entirely when the
/// opportunity is flagged `cannot_roll_over`.
pub fn build_flight_plans(
    mut rows: Vec<FlightRow>,
    today: NaiveDate,
    settings: &EngineSettings,
) -> Vec<FlightPlan> {
    rows.sort_by(|a, b| (a.start, &a.name).cmp(&(b.start, &b.name)));
    let yesterday = today - Duration::days(1);

    let mut plans: Vec<FlightPlan> = rows
        .into_iter()
        .map(|row| {
            let days = (row.end - row.start).num_days() + 1;
            let goal_factor = goal_factor_for(&row, settings);

            let mut totals = DeliveryTotals::default();
            let mut campaign_totals: HashMap<Uuid, DeliveryTotals> = HashMap::new();
            for daily in &row.daily_delivery {
                totals.absorb(daily);
                campaign_totals.entry(daily.campaign_id).or_default().absorb(daily);
            }

            let (plan_units, sf_ordered_units) = if row.dynamic_placement.is_some() {
                (row.total_cost, row.total_cost)
            } else if row.goal_type == GoalType::HardCost {
                (0.0, 0.0)
            } else {
                (row.ordered_units * goal_factor, row.ordered_units)
            };

            FlightPlan {
                days,
                goal_factor,
                plan_units,
                sf_ordered_units,
                recalculated_plan_units: plan_units,
                totals,
                campaign_totals,
                row,
            }
        })
        .collect();

    // Group indices per placement, keeping the ascending start order.
    let mut by_placement: HashMap<Uuid, Vec<usize>> = HashMap::new();
    for (i, plan) in plans.iter().enumerate() {
        by_placement.entry(plan.row.placement_id).or_default().push(i);
    }

    for group in by_placement.values() {
        let first = &plans[group[0]];
        if first.row.cannot_roll_over
            || !matches!(first.row.goal_type, GoalType::Cpv | GoalType::Cpm)
        {
            continue;
        }

        // Collect the over-delivery pool; ended under-delivered flights
        // absorb from it first.
        let mut over_delivery = 0.0;
        for &i in group {
            plans[i].recalculated_plan_units = plans[i].plan_units;
            let diff = plans[i].delivered_units() - plans[i].recalculated_plan_units;
            if diff > 0.0 {
                over_delivery += diff;
            } else if diff < 0.0 && plans[i].row.end <= yesterday {
                let reallocate = (-diff).min(over_delivery);
                over_delivery -= reallocate;
                plans[i].recalculated_plan_units -= reallocate;
            }
        }

        if over_delivery <= 0.0 {
            continue;
        }

        // Spread the remainder over unfinished flights by day-count
        // share; no flight consumes more than plan - delivered, and no
        // plan drops below zero.
        let unfinished: Vec<usize> = group
            .iter()
            .copied()
            .filter(|&i| plans[i].row.end > yesterday)
            .collect();
        for &i in &unfinished {
            let can_consume = plans[i].recalculated_plan_units - plans[i].delivered_units();
            if can_consume <= 0.0 {
                continue;
            }
            let total_days: i64 = unfinished
                .iter()
                .filter(|&&j| plans[j].row.start >= plans[i].row.start)
                .map(|&j| plans[j].days)
                .sum();
            if total_days == 0 {
                continue;
            }
            let assigned = (over_delivery / total_days as f64 * plans[i].days as f64)
                .min(can_consume);
            plans[i].recalculated_plan_units -= assigned;
            over_delivery -= assigned;
        }
    }

    plans
}

// ─── Plan stats ─────────────────────────────────────────────────────────────

/// Planned-side roll-up for a set of flights, optionally scaled by a
/// campaign allocation share and narrowed to one campaign's delivery.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PlanStats {
    pub plan_impressions: Option<f64>,
    pub plan_video_views: Option<f64>,
    pub plan_cpv: Option<f64>,
    pub plan_cpm: Option<f64>,
    /// Client-facing spend to date, with hard-cost and outgoing-fee
    /// flights contributing their booked cost time-apportioned.
    pub cost: f64,
    pub plan_cost: f64,
    /// Total cost of flights that have already started; margin caps
    /// billable client cost here.
    pub current_cost_limit: f64,
}

pub fn plan_stats_from_flights(
    plans: &[&FlightPlan],
    allocation_ko: f64,
    campaign_id: Option<Uuid>,
    today: NaiveDate,
) -> PlanStats {
    let mut out = PlanStats::default();
    let mut ordered_impressions = 0.0;
    let mut ordered_views = 0.0;
    let mut cpm_cost = 0.0;
    let mut cpv_cost = 0.0;

    for plan in plans {
        let plan_units = plan.recalculated_plan_units * allocation_ko;
        let ordered_units = plan.row.ordered_units * allocation_ko;
        let total_cost = plan.row.total_cost * allocation_ko;
        let stats = plan.totals_for(campaign_id);

        if plan.is_dynamic() {
            out.cost += stats.cost;
        } else if plan.row.placement_kind == PlacementKind::OutgoingFee {
            let (run, total) = plan.run_and_total_days(today);
            if run > 0 && total > 0 && plan.row.cost > 0.0 {
                out.cost += plan.row.cost * run as f64 / total as f64;
            }
        } else {
            match plan.row.goal_type {
                GoalType::Cpv => {
                    out.plan_video_views = Some(out.plan_video_views.unwrap_or(0.0) + plan_units);
                    ordered_views += ordered_units;
                    cpv_cost += total_cost;
                    out.cost += stats.cost;
                }
                GoalType::Cpm => {
                    out.plan_impressions = Some(out.plan_impressions.unwrap_or(0.0) + plan_units);
                    ordered_impressions += ordered_units;
                    cpm_cost += total_cost;
                    out.cost += stats.cost;
                }
                GoalType::HardCost => {
                    let (run, total) = plan.run_and_total_days(today);
                    if run > 0 && total > 0 {
                        out.cost += plan.row.cost * run as f64 / total as f64;
                    }
                }
            }
        }

        out.plan_cost += total_cost;
        if plan.row.start <= today {
            out.current_cost_limit += total_cost;
        }
    }

    out.plan_cpv = if ordered_views > 0.0 {
        Some(cpv_cost / ordered_views)
    } else {
        None
    };
    out.plan_cpm = stats::average_cpm(cpm_cost, ordered_impressions);
    out
}

// ─── Pacing ─────────────────────────────────────────────────────────────────

/// Delivered-to-date over plan-to-date across a set of flights.
///
/// Outgoing-fee flights are excluded entirely; pure service-fee
/// placements pace at exactly 1.0. `None` when nothing is planned yet
/// (e.g. no flight has started).
pub fn pacing_from_flights(
    plans: &[&FlightPlan],
    allocation_ko: f64,
    campaign_id: Option<Uuid>,
    today: NaiveDate,
) -> Option<f64> {
    let service_fee_only = !plans.is_empty()
        && plans.iter().all(|p| {
            p.row.goal_type == GoalType::HardCost
                && p.row.dynamic_placement == Some(DynamicPlacementType::ServiceFee)
        });
    if service_fee_only {
        return Some(1.0);
    }

    let mut total_planned = 0.0;
    let mut delivered = 0.0;
    for plan in plans {
        if plan.row.placement_kind == PlacementKind::OutgoingFee {
            continue;
        }
        delivered += plan.delivered_units_for(campaign_id);
        let (run, total) = plan.run_and_total_days(today);
        if run > 0 && total > 0 {
            let plan_units = plan.recalculated_plan_units * allocation_ko;
            total_planned += plan_units * run as f64 / total as f64;
        }
    }

    if total_planned > 0.0 {
        Some(delivered / total_planned)
    } else {
        None
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::DailyDelivery;
    use chrono::NaiveDate;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn cpv_row(
        placement_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
        ordered_units: f64,
        opportunity_budget: f64,
    ) -> FlightRow {
        FlightRow {
            id: Uuid::new_v4(),
            name: format!("flight-{start}"),
            placement_id,
            opportunity_id: Uuid::new_v4(),
            start,
            end,
            ordered_units,
            total_cost: 0.0,
            cost: 0.0,
            budget: 0.0,
            goal_type: GoalType::Cpv,
            dynamic_placement: None,
            placement_kind: PlacementKind::Regular,
            ordered_rate: 0.0,
            tech_fee: None,
            opportunity_budget,
            cannot_roll_over: false,
            cpm_buffer: None,
            cpv_buffer: None,
            daily_delivery: Vec::new(),
        }
    }

    fn views_on(campaign_id: Uuid, date: NaiveDate, video_views: f64) -> DailyDelivery {
        DailyDelivery {
            campaign_id,
            date,
            impressions: 0.0,
            video_views,
            clicks: 0.0,
            cost: 0.0,
        }
    }

    // 1. Budget-tier buffer -------------------------------------------------

    #[test]
    fn test_small_budget_gets_two_percent_buffer() {
        let settings = EngineSettings::default();
        let row = cpv_row(Uuid::new_v4(), d(2017, 1, 1), d(2017, 1, 10), 1000.0, 50_000.0);
        let plans = build_flight_plans(vec![row], d(2017, 1, 5), &settings);
        assert!((plans[0].plan_units - 1020.0).abs() < 1e-9);
        assert!((plans[0].recalculated_plan_units - 1020.0).abs() < 1e-9);
    }

    #[test]
    fn test_big_budget_gets_one_percent_buffer() {
        let settings = EngineSettings::default();
        let row = cpv_row(Uuid::new_v4(), d(2017, 1, 1), d(2017, 1, 10), 1000.0, 500_001.0);
        let plans = build_flight_plans(vec![row], d(2017, 1, 5), &settings);
        assert!((plans[0].plan_units - 1010.0).abs() < 1e-9);
    }

    #[test]
    fn test_opportunity_buffer_overrides_goal_factor() {
        let settings = EngineSettings::default();
        let mut row = cpv_row(Uuid::new_v4(), d(2017, 1, 1), d(2017, 1, 10), 1000.0, 50_000.0);
        row.cpv_buffer = Some(10.0);
        let plans = build_flight_plans(vec![row], d(2017, 1, 5), &settings);
        assert!((plans[0].plan_units - 1100.0).abs() < 1e-9);
    }

    // 2. Roll-over ----------------------------------------------------------

    #[test]
    fn test_over_delivery_fully_absorbs_next_flight_plan() {
        // Earlier flight ordered 500 and delivered 1530 views; the
        // later flight's entire 1020-unit plan is consumed. Floor at 0.
        let settings = EngineSettings::default();
        let placement_id = Uuid::new_v4();
        let campaign_id = Uuid::new_v4();
        let today = d(2017, 1, 20);

        let mut first = cpv_row(placement_id, d(2017, 1, 1), d(2017, 1, 10), 500.0, 50_000.0);
        first.daily_delivery = vec![views_on(campaign_id, d(2017, 1, 5), 1530.0)];
        let second = cpv_row(placement_id, d(2017, 1, 15), d(2017, 1, 25), 1000.0, 50_000.0);

        let plans = build_flight_plans(vec![second, first], today, &settings);
        assert!((plans[0].plan_units - 510.0).abs() < 1e-9);
        assert!((plans[1].recalculated_plan_units - 0.0).abs() < 1e-9);
        assert!(plans[1].recalculated_plan_units >= 0.0);
    }

    #[test]
    fn test_over_delivery_consumed_placement_plan_is_remaining_nominal() {
        // A 20-day flight ordered 400 over-delivers by exactly the next
        // flight's 1020-unit plan; the placement-level CPV plan is the
        // earlier flight's own 408.
        let settings = EngineSettings::default();
        let placement_id = Uuid::new_v4();
        let campaign_id = Uuid::new_v4();
        let today = d(2017, 2, 1);

        let mut pre = cpv_row(placement_id, d(2017, 1, 1), d(2017, 1, 20), 400.0, 50_000.0);
        pre.daily_delivery = vec![views_on(campaign_id, d(2017, 1, 10), 408.0 + 1020.0)];
        let current = cpv_row(placement_id, d(2017, 2, 1), d(2017, 2, 1), 1000.0, 50_000.0);

        let plans = build_flight_plans(vec![pre, current], today, &settings);
        let refs: Vec<&FlightPlan> = plans.iter().collect();
        let stats = plan_stats_from_flights(&refs, 1.0, None, today);
        assert!((stats.plan_video_views.unwrap() - 408.0).abs() < 1e-9);
    }

    #[test]
    fn test_cannot_roll_over_keeps_plans_nominal() {
        let settings = EngineSettings::default();
        let placement_id = Uuid::new_v4();
        let campaign_id = Uuid::new_v4();
        let today = d(2017, 1, 20);

        let mut first = cpv_row(placement_id, d(2017, 1, 1), d(2017, 1, 10), 500.0, 50_000.0);
        first.daily_delivery = vec![views_on(campaign_id, d(2017, 1, 5), 1530.0)];
        first.cannot_roll_over = true;
        let mut second = cpv_row(placement_id, d(2017, 1, 15), d(2017, 1, 25), 1000.0, 50_000.0);
        second.cannot_roll_over = true;

        let plans = build_flight_plans(vec![first, second], today, &settings);
        assert!((plans[1].recalculated_plan_units - 1020.0).abs() < 1e-9);
    }

    #[test]
    fn test_ended_under_delivered_flight_absorbs_pool_first() {
        // Flight A over-delivers by 100; flight B ended 60 short and
        // absorbs 60; flight C only sees the remaining 40.
        let settings = EngineSettings::default();
        let placement_id = Uuid::new_v4();
        let campaign_id = Uuid::new_v4();
        let today = d(2017, 2, 1);

        let mut a = cpv_row(placement_id, d(2017, 1, 1), d(2017, 1, 5), 500.0, 50_000.0);
        a.daily_delivery = vec![views_on(campaign_id, d(2017, 1, 2), 610.0)]; // plan 510, +100
        let mut b = cpv_row(placement_id, d(2017, 1, 6), d(2017, 1, 10), 500.0, 50_000.0);
        b.daily_delivery = vec![views_on(campaign_id, d(2017, 1, 7), 450.0)]; // plan 510, -60
        let c = cpv_row(placement_id, d(2017, 2, 1), d(2017, 2, 10), 500.0, 50_000.0);

        let plans = build_flight_plans(vec![a, b, c], today, &settings);
        assert!((plans[1].recalculated_plan_units - 450.0).abs() < 1e-9);
        assert!((plans[2].recalculated_plan_units - 470.0).abs() < 1e-9);
    }

    #[test]
    fn test_roll_over_split_by_day_count_share() {
        // 100 over-delivered units split across two unfinished flights:
        // the earlier one (8 days) sees 100/10*8 = 80, the later 1-day
        // tail consumes what remains, capped by its own headroom.
        let settings = EngineSettings::default();
        let placement_id = Uuid::new_v4();
        let campaign_id = Uuid::new_v4();
        let today = d(2017, 1, 10);

        let mut a = cpv_row(placement_id, d(2017, 1, 1), d(2017, 1, 5), 500.0, 50_000.0);
        a.daily_delivery = vec![views_on(campaign_id, d(2017, 1, 2), 610.0)]; // +100
        let b = cpv_row(placement_id, d(2017, 1, 11), d(2017, 1, 18), 500.0, 50_000.0);
        let c = cpv_row(placement_id, d(2017, 1, 19), d(2017, 1, 20), 500.0, 50_000.0);

        let plans = build_flight_plans(vec![a, b, c], today, &settings);
        let b_days = 8.0;
        let total_days = 10.0;
        let b_assigned = 100.0 / total_days * b_days;
        assert!((plans[1].recalculated_plan_units - (510.0 - b_assigned)).abs() < 1e-9);
        assert!((plans[2].recalculated_plan_units - (510.0 - (100.0 - b_assigned))).abs() < 1e-9);
    }

    // 3. Plan stats & pacing ------------------------------------------------

    #[test]
    fn test_plan_stats_single_cpv_flight() {
        let settings = EngineSettings::default();
        let mut row = cpv_row(Uuid::new_v4(), d(2017, 1, 1), d(2017, 1, 10), 1000.0, 50_000.0);
        row.total_cost = 200.0;
        let today = d(2017, 1, 5);
        let plans = build_flight_plans(vec![row], today, &settings);
        let refs: Vec<&FlightPlan> = plans.iter().collect();
        let stats = plan_stats_from_flights(&refs, 1.0, None, today);

        assert!((stats.plan_video_views.unwrap() - 1020.0).abs() < 1e-9);
        assert_eq!(stats.plan_impressions, None);
        assert!((stats.plan_cpv.unwrap() - 0.2).abs() < 1e-9);
        assert!((stats.plan_cost - 200.0).abs() < 1e-9);
        assert!((stats.current_cost_limit - 200.0).abs() < 1e-9);
    }

    #[test]
    fn test_pacing_on_schedule_is_one() {
        let settings = EngineSettings::default();
        let campaign_id = Uuid::new_v4();
        let mut row = cpv_row(Uuid::new_v4(), d(2017, 1, 1), d(2017, 1, 10), 1000.0, 50_000.0);
        // Half the span elapsed; deliver exactly half of the plan.
        row.daily_delivery = vec![views_on(campaign_id, d(2017, 1, 3), 510.0)];
        let today = d(2017, 1, 5);
        let plans = build_flight_plans(vec![row], today, &settings);
        let refs: Vec<&FlightPlan> = plans.iter().collect();
        let pacing = pacing_from_flights(&refs, 1.0, None, today).unwrap();
        assert!((pacing - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_pacing_none_before_flight_starts() {
        let settings = EngineSettings::default();
        let row = cpv_row(Uuid::new_v4(), d(2017, 2, 1), d(2017, 2, 10), 1000.0, 50_000.0);
        let today = d(2017, 1, 5);
        let plans = build_flight_plans(vec![row], today, &settings);
        let refs: Vec<&FlightPlan> = plans.iter().collect();
        assert_eq!(pacing_from_flights(&refs, 1.0, None, today), None);
    }

    #[test]
    fn test_service_fee_only_paces_at_one() {
        let settings = EngineSettings::default();
        let mut row = cpv_row(Uuid::new_v4(), d(2017, 1, 1), d(2017, 1, 10), 0.0, 50_000.0);
        row.goal_type = GoalType::HardCost;
        row.dynamic_placement = Some(DynamicPlacementType::ServiceFee);
        let today = d(2017, 1, 5);
        let plans = build_flight_plans(vec![row], today, &settings);
        let refs: Vec<&FlightPlan> = plans.iter().collect();
        assert_eq!(pacing_from_flights(&refs, 1.0, None, today), Some(1.0));
    }

    #[test]
    fn test_campaign_allocation_scales_plan() {
        let settings = EngineSettings::default();
        let row = cpv_row(Uuid::new_v4(), d(2017, 1, 1), d(2017, 1, 10), 1000.0, 50_000.0);
        let today = d(2017, 1, 5);
        let plans = build_flight_plans(vec![row], today, &settings);
        let refs: Vec<&FlightPlan> = plans.iter().collect();
        let stats = plan_stats_from_flights(&refs, 0.3, None, today);
        assert!((stats.plan_video_views.unwrap() - 306.0).abs() < 1e-9);
    }
}
