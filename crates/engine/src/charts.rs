//! Trend charts and day-level goals. Daily goals answer "what must
//! this flight deliver on this date to finish its remaining plan"; the
//! cumulative curves chart ideal versus actual delivery over the
//! combined flight span.

use crate::plan::{DeliveryField, FlightPlan};
use crate::snapshot::AllocationRange;
use chrono::{Duration, NaiveDate};
use pacing_core::config::EngineSettings;
use pacing_core::stats;
use pacing_core::types::{DynamicPlacementType, GoalType};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartId {
    IdealPacing,
    DailyDeviation,
    PlannedDelivery,
    HistoricalGoal,
}

impl ChartId {
    pub fn title(&self) -> &'static str {
        match self {
            ChartId::IdealPacing => "Ideal Pacing",
            ChartId::DailyDeviation => "Daily Deviation",
            ChartId::PlannedDelivery => "Planned delivery",
            ChartId::HistoricalGoal => "Historical Goal",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ChartPoint {
    pub label: NaiveDate,
    pub value: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Chart {
    pub id: ChartId,
    pub title: &'static str,
    pub data: Vec<ChartPoint>,
}

/// Targeting-level delivery aggregates surfaced next to the charts.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Targeting {
    pub impressions: f64,
    pub video_views: f64,
    pub clicks: f64,
    pub video_impressions: f64,
    pub ctr: Option<f64>,
    pub ctr_v: Option<f64>,
    pub video_view_rate: Option<f64>,
}

/// Chart payload for one flight set: today/yesterday scalars, the
/// nominal goal, and the cumulative curves. `charts` is `None` for
/// hard-cost-only sets, as are the unit-based scalars.
#[derive(Debug, Clone, Serialize)]
pub struct ChartData {
    pub today_goal: Option<f64>,
    pub today_goal_views: f64,
    pub today_goal_impressions: f64,
    pub today_budget: Option<f64>,
    pub yesterday_budget: f64,
    pub yesterday_delivered: Option<f64>,
    pub yesterday_delivered_views: f64,
    pub yesterday_delivered_impressions: f64,
    pub goal: f64,
    pub charts: Option<Vec<Chart>>,
    pub targeting: Targeting,
}

/// Opportunity-level chart data split per goal type.
#[derive(Debug, Clone, Serialize)]
pub struct GoalTypeChartData {
    pub cpv: Option<ChartData>,
    pub cpm: Option<ChartData>,
}

// ─── Window stats ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default)]
struct WindowStats {
    cost: f64,
    impressions: f64,
    video_views: f64,
}

impl WindowStats {
    fn cpv(&self) -> Option<f64> {
        stats::average_cpv(self.cost, self.video_views)
    }

    fn cpm(&self) -> Option<f64> {
        stats::average_cpm(self.cost, self.impressions)
    }
}

fn window_stats(
    plan: &FlightPlan,
    campaign_id: Option<Uuid>,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> WindowStats {
    let mut out = WindowStats::default();
    for row in &plan.row.daily_delivery {
        if campaign_id.is_some_and(|id| row.campaign_id != id) {
            continue;
        }
        if start.is_some_and(|s| row.date < s) || end.is_some_and(|e| row.date > e) {
            continue;
        }
        out.cost += row.cost;
        out.impressions += row.impressions;
        out.video_views += row.video_views;
    }
    out
}

// ─── Daily goals ────────────────────────────────────────────────────────────

/// Remaining plan spread evenly over the days left, floored at zero.
fn today_goal(goal_items: f64, delivered_items: f64, end: NaiveDate, today: NaiveDate) -> f64 {
    let days_left = (end - today).num_days() + 1;
    if days_left > 0 {
        ((goal_items - delivered_items) / days_left as f64).max(0.0)
    } else {
        0.0
    }
}

/// Unit and budget goal for one flight on `date`. Dynamic placements
/// express their goal as budget directly; CPV/CPM goals convert to a
/// budget via the previous day's realized rate or the default rate.
pub fn pacing_goal_for_date(
    plan: &FlightPlan,
    date: NaiveDate,
    today: NaiveDate,
    allocation_ko: f64,
    campaign_id: Option<Uuid>,
    settings: &EngineSettings,
) -> (f64, f64) {
    let stats_total = window_stats(plan, campaign_id, None, Some(date - Duration::days(1)));
    let last_day = date.min(today).max(plan.row.start);
    let total_cost = plan.row.total_cost;

    if plan.is_dynamic() {
        let budget = today_goal(
            total_cost * allocation_ko,
            stats_total.cost,
            plan.row.end,
            last_day,
        );
        return (0.0, budget);
    }

    match plan.row.goal_type {
        GoalType::Cpv | GoalType::Cpm => {
            let delivered = match plan.row.goal_type {
                GoalType::Cpv => stats_total.video_views,
                _ => stats_total.impressions,
            };
            let units = today_goal(
                plan.recalculated_plan_units * allocation_ko,
                delivered,
                plan.row.end,
                last_day,
            );

            let yesterday = last_day - Duration::days(1);
            let yesterdays = window_stats(plan, campaign_id, Some(yesterday), Some(yesterday));
            let budget = match plan.row.goal_type {
                GoalType::Cpv => yesterdays.cpv().unwrap_or(settings.default_cpv_rate) * units,
                _ => yesterdays.cpm().unwrap_or(settings.default_cpm_rate) * units / 1000.0,
            };
            (units, budget)
        }
        GoalType::HardCost => (0.0, 0.0),
    }
}

/// Today's budget for a rate-and-tech-fee flight: the remaining client
/// cost spread over the days left, discounted by the media share of the
/// client rate realized over the trailing three days.
fn rate_and_tech_fee_today_goal(
    plan: &FlightPlan,
    today: NaiveDate,
    allocation_ko: f64,
    campaign_id: Option<Uuid>,
    settings: &EngineSettings,
) -> (f64, f64) {
    let yesterday = today - Duration::days(1);
    let stats_total = window_stats(plan, campaign_id, None, Some(yesterday));
    let stats_3days = window_stats(plan, campaign_id, Some(today - Duration::days(3)), Some(yesterday));
    let tech_fee = plan.row.tech_fee.unwrap_or(0.0);

    let (client_cost_spent, spend_kf) = match plan.row.goal_type {
        GoalType::Cpv => {
            let total_cpv = stats_total.cpv().unwrap_or(settings.default_cpv_rate);
            let three_days_cpv = stats_3days.cpv().unwrap_or(settings.default_cpv_rate);
            (
                stats_total.video_views * (total_cpv + tech_fee),
                three_days_cpv / (three_days_cpv + tech_fee),
            )
        }
        GoalType::Cpm => {
            let total_cpm = stats_total.cpm().unwrap_or(settings.default_cpm_rate);
            let three_days_cpm = stats_3days.cpm().unwrap_or(settings.default_cpm_rate);
            (
                stats_total.impressions / 1000.0 * (total_cpm + tech_fee),
                three_days_cpm / (three_days_cpm + tech_fee),
            )
        }
        GoalType::HardCost => (0.0, 0.0),
    };

    let client_cost_remaining = plan.row.total_cost * allocation_ko - client_cost_spent;
    let days_remain = (plan.row.end - today).num_days() + 1;
    let today_budget = if days_remain > 0 {
        spend_kf * client_cost_remaining / days_remain as f64
    } else {
        0.0
    };
    (0.0, today_budget)
}

pub fn pacing_goal_for_today(
    plan: &FlightPlan,
    today: NaiveDate,
    allocation_ko: f64,
    campaign_id: Option<Uuid>,
    settings: &EngineSettings,
) -> (f64, f64) {
    if plan.row.dynamic_placement == Some(DynamicPlacementType::RateAndTechFee) {
        rate_and_tech_fee_today_goal(plan, today, allocation_ko, campaign_id, settings)
    } else {
        pacing_goal_for_date(plan, today, today, allocation_ko, campaign_id, settings)
    }
}

// ─── Cumulative curves ──────────────────────────────────────────────────────

fn dates_range(start: NaiveDate, end: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    start.iter_days().take_while(move |d| *d <= end)
}

fn delivered_on(plan: &FlightPlan, date: NaiveDate, campaign_id: Option<Uuid>) -> f64 {
    let Some(field) = plan.delivery_field() else {
        return 0.0;
    };
    plan.row
        .daily_delivery
        .iter()
        .filter(|row| row.date == date)
        .filter(|row| campaign_id.map_or(true, |id| row.campaign_id == id))
        .map(|row| match field {
            DeliveryField::Cost => row.cost,
            DeliveryField::Impressions => row.impressions,
            DeliveryField::VideoViews => row.video_views,
        })
        .sum()
}

/// Time-proportional share of every started flight's nominal plan as
/// of `date`.
fn ideal_delivery_for_date(plans: &[&FlightPlan], date: NaiveDate) -> f64 {
    plans
        .iter()
        .filter(|p| p.row.start <= date)
        .map(|p| {
            let passed = (date.min(p.row.end) - p.row.start).num_days() + 1;
            p.plan_units / p.days as f64 * passed as f64
        })
        .sum()
}

/// What the total goal would have shrunk to on `date`, had roll-over
/// consumed later flights' plans with the delivery known by then.
fn historical_goal(
    plans: &[&FlightPlan],
    date: NaiveDate,
    total_goal: f64,
    delivered: f64,
) -> f64 {
    let current_max_goal: f64 = plans
        .iter()
        .filter(|p| p.row.start <= date)
        .map(|p| p.plan_units)
        .sum();
    let can_consume: f64 = plans
        .iter()
        .filter(|p| p.row.start > date)
        .map(|p| p.plan_units)
        .sum();
    let over_delivered = (delivered - current_max_goal).max(0.0);
    total_goal - over_delivered.min(can_consume)
}

/// Build the cumulative curves for a flight set.
pub fn flight_charts(
    plans: &[&FlightPlan],
    today: NaiveDate,
    allocation_ko: f64,
    campaign_id: Option<Uuid>,
    settings: &EngineSettings,
) -> Vec<Chart> {
    let mut charts = Vec::new();
    if plans.is_empty() {
        return charts;
    }

    let min_start = plans.iter().map(|p| p.row.start).min().unwrap_or(today);
    let max_end = plans.iter().map(|p| p.row.end).max().unwrap_or(today);

    // Daily goal per flight per date, budget-valued for dynamic
    // placements.
    let daily_goals: Vec<Vec<f64>> = plans
        .iter()
        .map(|plan| {
            dates_range(plan.row.start, plan.row.end)
                .map(|date| {
                    let (units, budget) =
                        pacing_goal_for_date(plan, date, today, allocation_ko, campaign_id, settings);
                    if plan.is_dynamic() {
                        budget
                    } else {
                        units
                    }
                })
                .collect()
        })
        .collect();

    let total_goal: f64 = plans.iter().map(|p| p.plan_units).sum();
    let recalculated_total_goal: f64 = plans.iter().map(|p| p.recalculated_plan_units).sum();

    let mut pacing_chart = Vec::new();
    let mut delivered_chart = Vec::new();
    let mut delivery_plan_chart = Vec::new();
    let mut historical_goal_chart = Vec::new();
    let mut total_pacing = 0.0;
    let mut total_delivered = 0.0;

    for date in dates_range(min_start, max_end) {
        let mut goal_for_today = 0.0;
        for (i, plan) in plans.iter().enumerate() {
            if plan.row.start <= date && date <= plan.row.end {
                let offset = (date - plan.row.start).num_days() as usize;
                goal_for_today += daily_goals[i].get(offset).copied().unwrap_or(0.0);
            }
        }

        total_pacing = if date <= today {
            total_delivered + goal_for_today
        } else {
            total_pacing + goal_for_today
        };
        pacing_chart.push(ChartPoint {
            label: date,
            value: total_pacing.min(recalculated_total_goal),
        });

        delivery_plan_chart.push(ChartPoint {
            label: date,
            value: ideal_delivery_for_date(plans, date) * allocation_ko,
        });

        if date <= today {
            historical_goal_chart.push(ChartPoint {
                label: date,
                value: historical_goal(plans, date, total_goal, total_delivered) * allocation_ko,
            });
        }

        let delivered: f64 = plans
            .iter()
            .filter(|p| p.row.start <= date && date <= p.row.end)
            .map(|p| delivered_on(p, date, campaign_id))
            .sum();
        if delivered > 0.0 {
            total_delivered += delivered;
            delivered_chart.push(ChartPoint {
                label: date,
                value: total_delivered,
            });
        }
    }

    for (id, data) in [
        (ChartId::IdealPacing, pacing_chart),
        (ChartId::DailyDeviation, delivered_chart),
        (ChartId::PlannedDelivery, delivery_plan_chart),
        (ChartId::HistoricalGoal, historical_goal_chart),
    ] {
        if !data.is_empty() {
            charts.push(Chart {
                id,
                title: id.title(),
                data,
            });
        }
    }
    charts
}

// ─── Historical pacing ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct HistoricalUnitsPoint {
    pub label: NaiveDate,
    pub goal: f64,
    pub actual: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct HistoricalSpendPoint {
    pub label: NaiveDate,
    pub goal: f64,
    pub actual: f64,
    /// Margin percent realized on this day's delivery.
    pub margin: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct HistoricalChart<T> {
    pub id: &'static str,
    pub title: &'static str,
    pub data: Vec<T>,
}

/// Per-day goal-versus-actual history of one flight, plus today's
/// allocation-derived goals.
#[derive(Debug, Clone, Serialize)]
pub struct HistoricalPacing {
    pub historical_units_chart: HistoricalChart<HistoricalUnitsPoint>,
    pub historical_spend_chart: HistoricalChart<HistoricalSpendPoint>,
    pub today_goal_units: Option<f64>,
    pub today_goal_units_percent: Option<f64>,
    pub today_goal_spend: Option<f64>,
    pub today_goal_spend_percent: Option<f64>,
}

fn daily_margin(rate: f64, goal_type: GoalType, units: f64, cost: f64) -> f64 {
    let client_cost = match goal_type {
        GoalType::Cpm => rate * units / 1000.0,
        _ => rate * units,
    };
    if client_cost == 0.0 {
        0.0
    } else {
        (client_cost - cost) / client_cost * 100.0
    }
}

/// Daily goal-versus-actual history for one flight, driven by its
/// pacing allocations. Each day's goal is the plan share of its
/// allocation value spread over the days carrying that value; today's
/// goals are reported separately and never charted.
pub fn flight_historical_pacing(
    plan: &FlightPlan,
    allocations: &[AllocationRange],
    projected_budget: f64,
    today: NaiveDate,
) -> HistoricalPacing {
    let mut day_allocation: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for range in allocations {
        for date in dates_range(range.start, range.end) {
            day_allocation.insert(date, range.allocation);
        }
    }
    // Days are pooled per allocation value, so two ranges at the same
    // percentage share one goal denominator.
    let mut days_per_allocation: HashMap<u64, f64> = HashMap::new();
    for allocation in day_allocation.values() {
        *days_per_allocation.entry(allocation.to_bits()).or_insert(0.0) += 1.0;
    }

    #[derive(Default, Clone, Copy)]
    struct DayDelivered {
        impressions: f64,
        video_views: f64,
        cost: f64,
    }
    let mut delivered: BTreeMap<NaiveDate, DayDelivered> = BTreeMap::new();
    for row in &plan.row.daily_delivery {
        let entry = delivered.entry(row.date).or_default();
        entry.impressions += row.impressions;
        entry.video_views += row.video_views;
        entry.cost += row.cost;
    }

    let mut units_chart = HistoricalChart {
        id: "historical_units",
        title: "Historical Units",
        data: Vec::new(),
    };
    let mut spend_chart = HistoricalChart {
        id: "historical_spend",
        title: "Historical Spend",
        data: Vec::new(),
    };
    let mut today_goal_units = None;
    let mut today_goal_spend = None;

    let end = plan.row.end.min(today);
    for date in dates_range(plan.row.start, end) {
        let Some(allocation) = day_allocation.get(&date).copied() else {
            continue;
        };
        let share_days = days_per_allocation
            .get(&allocation.to_bits())
            .copied()
            .unwrap_or(1.0);
        let goal_units = (plan.plan_units * allocation / share_days / 100.0).round();
        let goal_spend = (projected_budget * allocation / share_days / 100.0).round();

        if date == today {
            today_goal_units = Some(goal_units);
            today_goal_spend = Some(goal_spend);
            break;
        }

        let day = delivered.get(&date).copied().unwrap_or_default();
        let actual_units = match plan.row.goal_type {
            GoalType::Cpm => day.impressions,
            _ => day.video_views,
        };
        units_chart.data.push(HistoricalUnitsPoint {
            label: date,
            goal: goal_units,
            actual: actual_units,
        });
        spend_chart.data.push(HistoricalSpendPoint {
            label: date,
            goal: goal_spend,
            actual: day.cost,
            margin: daily_margin(plan.row.ordered_rate, plan.row.goal_type, actual_units, day.cost),
        });
    }

    let percent_of = |total: f64, goal: Option<f64>| {
        goal.and_then(|g| if g != 0.0 { Some(total / g * 100.0) } else { None })
    };
    HistoricalPacing {
        today_goal_units_percent: percent_of(plan.plan_units, today_goal_units),
        today_goal_spend_percent: percent_of(projected_budget, today_goal_spend),
        today_goal_units,
        today_goal_spend,
        historical_units_chart: units_chart,
        historical_spend_chart: spend_chart,
    }
}

// ─── Chart data ─────────────────────────────────────────────────────────────

pub fn chart_data(
    plans: &[&FlightPlan],
    today: NaiveDate,
    allocation_ko: f64,
    campaign_id: Option<Uuid>,
    settings: &EngineSettings,
) -> ChartData {
    let yesterday = today - Duration::days(1);
    let mut targeting = Targeting::default();
    let mut video_clicks = 0.0;
    let mut has_cpv = false;

    let mut goal = 0.0;
    let mut today_goal_views = 0.0;
    let mut today_goal_impressions = 0.0;
    let mut sum_today_budget = 0.0;
    let mut yesterday_views = 0.0;
    let mut yesterday_impressions = 0.0;
    let mut yesterday_cost = 0.0;

    for plan in plans {
        goal += plan.sf_ordered_units * allocation_ko;
        let totals = plan.totals_for(campaign_id);

        if plan.row.start <= today && today <= plan.row.end {
            let (today_units, today_budget) =
                pacing_goal_for_today(plan, today, allocation_ko, campaign_id, settings);
            match plan.row.goal_type {
                GoalType::Cpv => today_goal_views += today_units,
                GoalType::Cpm => today_goal_impressions += today_units,
                GoalType::HardCost => {}
            }
            sum_today_budget += today_budget;
        }

        let yesterdays = window_stats(plan, campaign_id, Some(yesterday), Some(yesterday));
        match plan.row.goal_type {
            GoalType::Cpv => yesterday_views += yesterdays.video_views,
            GoalType::Cpm => yesterday_impressions += yesterdays.impressions,
            GoalType::HardCost => {}
        }
        yesterday_cost += yesterdays.cost;

        targeting.impressions += totals.impressions;
        targeting.video_views += totals.video_views;
        targeting.clicks += totals.clicks;
        targeting.video_impressions += totals.video_impressions;
        video_clicks += totals.video_clicks;
        if plan.row.goal_type == GoalType::Cpv {
            has_cpv = true;
        }
    }

    targeting.ctr = if has_cpv {
        stats::ctr_v(video_clicks, targeting.video_views)
    } else {
        stats::ctr(targeting.clicks, targeting.impressions)
    };
    targeting.ctr_v = stats::ctr_v(video_clicks, targeting.video_views);
    targeting.video_view_rate =
        stats::video_view_rate(targeting.video_views, targeting.video_impressions);

    let hard_cost_only =
        !plans.is_empty() && plans.iter().all(|p| p.row.goal_type == GoalType::HardCost);

    if hard_cost_only {
        ChartData {
            today_goal: None,
            today_goal_views,
            today_goal_impressions,
            today_budget: None,
            yesterday_budget: yesterday_cost,
            yesterday_delivered: None,
            yesterday_delivered_views: yesterday_views,
            yesterday_delivered_impressions: yesterday_impressions,
            goal,
            charts: None,
            targeting,
        }
    } else {
        ChartData {
            today_goal: Some(today_goal_views + today_goal_impressions),
            today_goal_views,
            today_goal_impressions,
            today_budget: Some(sum_today_budget),
            yesterday_budget: yesterday_cost,
            yesterday_delivered: Some(yesterday_views + yesterday_impressions),
            yesterday_delivered_views: yesterday_views,
            yesterday_delivered_impressions: yesterday_impressions,
            goal,
            charts: Some(flight_charts(plans, today, allocation_ko, campaign_id, settings)),
            targeting,
        }
    }
}

/// Opportunity-level chart data, one subtree per unit goal type.
pub fn goal_type_chart_data(
    plans: &[&FlightPlan],
    today: NaiveDate,
    campaign_id: Option<Uuid>,
    settings: &EngineSettings,
) -> GoalTypeChartData {
    let cpv: Vec<&FlightPlan> = plans
        .iter()
        .copied()
        .filter(|p| p.row.goal_type == GoalType::Cpv)
        .collect();
    let cpm: Vec<&FlightPlan> = plans
        .iter()
        .copied()
        .filter(|p| p.row.goal_type == GoalType::Cpm)
        .collect();
    GoalTypeChartData {
        cpv: if cpv.is_empty() {
            None
        } else {
            Some(chart_data(&cpv, today, 1.0, campaign_id, settings))
        },
        cpm: if cpm.is_empty() {
            None
        } else {
            Some(chart_data(&cpm, today, 1.0, campaign_id, settings))
        },
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::build_flight_plans;
    use crate::snapshot::{DailyDelivery, FlightRow};
    use pacing_core::types::PlacementKind;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn cpv_row(start: NaiveDate, end: NaiveDate, ordered_units: f64) -> FlightRow {
        FlightRow {
            id: Uuid::new_v4(),
            name: "f".to_string(),
            placement_id: Uuid::new_v4(),
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
            opportunity_budget: 50_000.0,
            cannot_roll_over: false,
            cpm_buffer: None,
            cpv_buffer: None,
            daily_delivery: Vec::new(),
        }
    }

    fn views_on(date: NaiveDate, video_views: f64, cost: f64) -> DailyDelivery {
        DailyDelivery {
            campaign_id: Uuid::new_v4(),
            date,
            impressions: 0.0,
            video_views,
            clicks: 0.0,
            cost,
        }
    }

    fn plans_of(rows: Vec<FlightRow>, today: NaiveDate) -> Vec<FlightPlan> {
        build_flight_plans(rows, today, &EngineSettings::default())
    }

    #[test]
    fn test_today_goal_spreads_remaining_plan() {
        // Plan 1020, delivered 420, 5 days left including today.
        assert!((today_goal(1020.0, 420.0, d(2017, 1, 10), d(2017, 1, 6)) - 120.0).abs() < 1e-9);
        // Over-delivery floors at zero.
        assert_eq!(today_goal(100.0, 150.0, d(2017, 1, 10), d(2017, 1, 6)), 0.0);
        // Past the end there is no goal.
        assert_eq!(today_goal(100.0, 0.0, d(2017, 1, 10), d(2017, 1, 11)), 0.0);
    }

    #[test]
    fn test_unit_goal_converts_to_budget_at_default_rate() {
        let settings = EngineSettings::default();
        let today = d(2017, 1, 1);
        let plans = plans_of(vec![cpv_row(today, d(2017, 1, 10), 1000.0)], today);
        let (units, budget) = pacing_goal_for_date(&plans[0], today, today, 1.0, None, &settings);
        assert!((units - 102.0).abs() < 1e-9);
        // No delivery yesterday, so the default CPV rate converts.
        assert!((budget - 102.0 * settings.default_cpv_rate).abs() < 1e-9);
    }

    #[test]
    fn test_ideal_pacing_final_point_is_recalculated_goal() {
        let today = d(2017, 1, 5);
        let mut row = cpv_row(d(2017, 1, 1), d(2017, 1, 10), 1000.0);
        row.daily_delivery = vec![views_on(d(2017, 1, 2), 300.0, 3.0)];
        let plans = plans_of(vec![row], today);
        let refs: Vec<&FlightPlan> = plans.iter().collect();
        let settings = EngineSettings::default();

        let charts = flight_charts(&refs, today, 1.0, None, &settings);
        let pacing = charts.iter().find(|c| c.id == ChartId::IdealPacing).unwrap();
        assert_eq!(pacing.data.len(), 10);
        let last = pacing.data.last().unwrap();
        assert!((last.value - 1020.0).abs() < 1e-6);
    }

    #[test]
    fn test_daily_deviation_is_cumulative_on_delivery_days() {
        let today = d(2017, 1, 10);
        let mut row = cpv_row(d(2017, 1, 1), d(2017, 1, 10), 1000.0);
        row.daily_delivery = vec![
            views_on(d(2017, 1, 2), 300.0, 3.0),
            views_on(d(2017, 1, 5), 200.0, 2.0),
        ];
        let plans = plans_of(vec![row], today);
        let refs: Vec<&FlightPlan> = plans.iter().collect();

        let charts = flight_charts(&refs, today, 1.0, None, &EngineSettings::default());
        let deviation = charts.iter().find(|c| c.id == ChartId::DailyDeviation).unwrap();
        let values: Vec<f64> = deviation.data.iter().map(|p| p.value).collect();
        assert_eq!(values, vec![300.0, 500.0]);
        assert_eq!(deviation.data[0].label, d(2017, 1, 2));
        assert_eq!(deviation.data[1].label, d(2017, 1, 5));
    }

    #[test]
    fn test_hard_cost_only_has_no_charts_or_goals() {
        let today = d(2017, 1, 5);
        let mut row = cpv_row(d(2017, 1, 1), d(2017, 1, 10), 0.0);
        row.goal_type = GoalType::HardCost;
        let plans = plans_of(vec![row], today);
        let refs: Vec<&FlightPlan> = plans.iter().collect();

        let data = chart_data(&refs, today, 1.0, None, &EngineSettings::default());
        assert!(data.charts.is_none());
        assert_eq!(data.today_goal, None);
        assert_eq!(data.today_budget, None);
        assert_eq!(data.yesterday_delivered, None);
    }

    #[test]
    fn test_chart_data_scalars() {
        let settings = EngineSettings::default();
        let today = d(2017, 1, 6);
        let mut row = cpv_row(d(2017, 1, 1), d(2017, 1, 10), 1000.0);
        row.daily_delivery = vec![views_on(d(2017, 1, 5), 420.0, 8.4)];
        let plans = plans_of(vec![row], today);
        let refs: Vec<&FlightPlan> = plans.iter().collect();

        let data = chart_data(&refs, today, 1.0, None, &settings);
        assert!((data.goal - 1000.0).abs() < 1e-9);
        // Remaining 600 over 5 days including today.
        assert!((data.today_goal.unwrap() - 120.0).abs() < 1e-9);
        // Yesterday realized CPV 0.02 converts the goal to budget.
        assert!((data.today_budget.unwrap() - 120.0 * 0.02).abs() < 1e-9);
        assert!((data.yesterday_delivered.unwrap() - 420.0).abs() < 1e-9);
        assert!((data.yesterday_budget - 8.4).abs() < 1e-9);
    }

    #[test]
    fn test_historical_pacing_spreads_allocation_over_its_days() {
        // 1000 ordered units (plan 1020), split 30% over 3 days and 70%
        // over 7 days: both ranges work out to a 102-unit daily goal.
        let today = d(2017, 1, 5);
        let mut row = cpv_row(d(2017, 1, 1), d(2017, 1, 10), 1000.0);
        row.ordered_rate = 0.05;
        // 90 views at half the client rate: 50% margin on the day.
        row.daily_delivery = vec![views_on(d(2017, 1, 2), 90.0, 2.25)];
        let plans = plans_of(vec![row], today);
        let allocations = vec![
            AllocationRange {
                start: d(2017, 1, 1),
                end: d(2017, 1, 3),
                allocation: 30.0,
            },
            AllocationRange {
                start: d(2017, 1, 4),
                end: d(2017, 1, 10),
                allocation: 70.0,
            },
        ];

        let history = flight_historical_pacing(&plans[0], &allocations, 204.0, today);

        // Chart history stops before today.
        let units = &history.historical_units_chart.data;
        assert_eq!(units.len(), 4);
        assert!(units.iter().all(|p| p.goal == 102.0));
        assert_eq!(units[1].actual, 90.0);
        assert_eq!(units[0].actual, 0.0);

        let spend = &history.historical_spend_chart.data;
        assert!((spend[1].margin - 50.0).abs() < 1e-9);
        assert_eq!(spend[0].margin, 0.0);
        assert!((spend[1].actual - 2.25).abs() < 1e-9);

        assert_eq!(history.today_goal_units, Some(102.0));
        assert!((history.today_goal_units_percent.unwrap() - 1000.0).abs() < 1e-9);
        assert_eq!(history.today_goal_spend, Some(20.0));
    }

    #[test]
    fn test_historical_pacing_for_ended_flight_has_no_today_goal() {
        let today = d(2017, 2, 1);
        let row = cpv_row(d(2017, 1, 1), d(2017, 1, 10), 1000.0);
        let plans = plans_of(vec![row], today);
        let allocations = vec![AllocationRange {
            start: d(2017, 1, 1),
            end: d(2017, 1, 10),
            allocation: 100.0,
        }];

        let history = flight_historical_pacing(&plans[0], &allocations, 0.0, today);
        assert_eq!(history.historical_units_chart.data.len(), 10);
        assert_eq!(history.today_goal_units, None);
        assert_eq!(history.today_goal_units_percent, None);
    }

    #[test]
    fn test_goal_type_chart_data_buckets() {
        let today = d(2017, 1, 5);
        let cpv = cpv_row(d(2017, 1, 1), d(2017, 1, 10), 1000.0);
        let mut cpm = cpv_row(d(2017, 1, 1), d(2017, 1, 10), 2000.0);
        cpm.goal_type = GoalType::Cpm;
        let plans = plans_of(vec![cpv, cpm], today);
        let refs: Vec<&FlightPlan> = plans.iter().collect();

        let data = goal_type_chart_data(&refs, today, None, &EngineSettings::default());
        assert!((data.cpv.unwrap().goal - 1000.0).abs() < 1e-9);
        assert!((data.cpm.unwrap().goal - 2000.0).abs() < 1e-9);
    }
}
