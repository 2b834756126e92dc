//! Report assembly: opportunity, placement, flight, and campaign
//! summaries with plan, delivery, pacing, margin, quality buckets,
//! charts, and alerts. Every roll-up is recomputed at its own level
//! rather than averaged from below.

use crate::charts::{self, ChartData, GoalTypeChartData, HistoricalPacing};
use crate::delivery::delivery_stats_from_flights;
use crate::margin::margin_from_flights;
use crate::period::Period;
use crate::plan::{build_flight_plans, pacing_from_flights, plan_stats_from_flights, FlightPlan};
use crate::quality::quality_fields;
use crate::snapshot::{AllocationRange, HierarchyReader};
use chrono::{Duration, NaiveDate};
use pacing_core::config::EngineSettings;
use pacing_core::stats;
use pacing_core::types::{Campaign, CampaignStatus, DynamicPlacementType, GoalType, Opportunity};
use pacing_core::{PacingError, PacingResult};
use serde::Serialize;
use std::str::FromStr;
use uuid::Uuid;

// ─── Filter ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OpportunityStatus {
    Active,
    Upcoming,
    Completed,
    Undefined,
}

impl FromStr for OpportunityStatus {
    type Err = PacingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "upcoming" => Ok(Self::Upcoming),
            "completed" => Ok(Self::Completed),
            "undefined" => Ok(Self::Undefined),
            other => Err(PacingError::validation(format!(
                "unknown status filter: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct OpportunityFilter {
    pub period: Option<Period>,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub ids: Option<Vec<Uuid>>,
    pub search: Option<String>,
    pub status: Option<OpportunityStatus>,
}

impl OpportunityFilter {
    /// Date range the filter narrows to, if any. Every named period,
    /// `custom` included, goes through the resolver; without a period
    /// the explicit bounds filter only when both are present.
    fn resolve_range(&self, today: NaiveDate) -> PacingResult<Option<(NaiveDate, NaiveDate)>> {
        match self.period {
            None => Ok(self.start.zip(self.end)),
            Some(period) => period.resolve(today, self.start, self.end).map(Some),
        }
    }
}

// ─── Output rows ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct Alert {
    pub short: String,
    pub detail: String,
}

/// The metric block every summary level shares. Unit-denominated
/// fields are `Option` so hard-cost entities can null them out.
#[derive(Debug, Clone, Serialize)]
pub struct Performance {
    pub impressions: Option<f64>,
    pub video_views: Option<f64>,
    pub cpv: Option<f64>,
    pub cpm: Option<f64>,
    pub ctr: Option<f64>,
    pub video_view_rate: Option<f64>,
    pub goal_type: Option<String>,
    pub plan_impressions: Option<f64>,
    pub plan_video_views: Option<f64>,
    pub plan_cpv: Option<f64>,
    pub plan_cpm: Option<f64>,
    pub cost: f64,
    pub plan_cost: f64,
    pub current_cost_limit: f64,
    pub pacing: Option<f64>,
    pub margin: f64,
    pub margin_quality: u8,
    pub margin_direction: i8,
    pub pacing_quality: Option<u8>,
    pub pacing_direction: Option<i8>,
    pub video_view_rate_quality: Option<u8>,
    pub ctr_quality: Option<u8>,
}

impl Performance {
    /// Hard-cost placements have no unit delivery; everything
    /// unit-denominated reads as missing rather than zero.
    fn null_unit_metrics(&mut self) {
        self.impressions = None;
        self.video_views = None;
        self.cpv = None;
        self.cpm = None;
        self.ctr = None;
        self.ctr_quality = None;
        self.video_view_rate = None;
        self.video_view_rate_quality = None;
        self.plan_impressions = None;
        self.plan_video_views = None;
        self.plan_cpv = None;
        self.plan_cpm = None;
        self.pacing = None;
        self.pacing_quality = None;
        self.pacing_direction = None;
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OpportunitySummary {
    pub id: Uuid,
    pub name: String,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub status: OpportunityStatus,
    pub budget: f64,
    pub cannot_roll_over: bool,
    pub goal_types: Vec<GoalType>,
    /// Buffers echo the effective goal factor when no override is set.
    pub cpm_buffer: f64,
    pub cpv_buffer: f64,
    pub dynamic_placements: Vec<DynamicPlacementType>,
    pub has_dynamic_placements: bool,
    #[serde(flatten)]
    pub performance: Performance,
    pub is_completed: Option<bool>,
    pub is_upcoming: Option<bool>,
    pub chart_data: GoalTypeChartData,
    pub alerts: Vec<Alert>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlacementSummary {
    pub id: Uuid,
    pub name: String,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub dynamic_placement: Option<DynamicPlacementType>,
    pub tech_fee: Option<f64>,
    #[serde(flatten)]
    pub performance: Performance,
    #[serde(flatten)]
    pub chart: ChartData,
    pub is_completed: Option<bool>,
    pub is_upcoming: Option<bool>,
    pub alerts: Vec<Alert>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FlightSummary {
    pub id: Uuid,
    pub name: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub dynamic_placement: Option<DynamicPlacementType>,
    pub tech_fee: Option<f64>,
    pub plan_units: f64,
    pub recalculated_plan_units: f64,
    /// Delivered units in the flight's own denomination.
    pub delivery: f64,
    pub budget: f64,
    pub projected_budget: f64,
    pub pacing_allocations: Vec<AllocationRange>,
    #[serde(flatten)]
    pub performance: Performance,
    #[serde(flatten)]
    pub chart: ChartData,
    #[serde(flatten)]
    pub historical: HistoricalPacing,
    pub is_completed: bool,
    pub is_upcoming: bool,
    pub alerts: Vec<Alert>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CampaignSummary {
    pub id: Uuid,
    pub name: String,
    pub status: CampaignStatus,
    pub goal_allocation: f64,
    pub flight_budget: f64,
    pub flight_daily_budget: f64,
    #[serde(flatten)]
    pub performance: Performance,
    #[serde(flatten)]
    pub chart: ChartData,
}

// ─── Report ─────────────────────────────────────────────────────────────────

/// One report run, pinned to an explicit `today`. All derived dates
/// (yesterday, period bounds, flight day counts) flow from it.
pub struct PacingReport {
    pub today: NaiveDate,
    pub yesterday: NaiveDate,
    settings: EngineSettings,
}

impl PacingReport {
    pub fn new(today: NaiveDate, settings: EngineSettings) -> Self {
        Self {
            today,
            yesterday: today - Duration::days(1),
            settings,
        }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    fn performance(
        &self,
        plans: &[&FlightPlan],
        allocation_ko: f64,
        campaign_id: Option<Uuid>,
    ) -> Performance {
        let delivery = delivery_stats_from_flights(plans, campaign_id);
        let plan = plan_stats_from_flights(plans, allocation_ko, campaign_id, self.today);
        let pacing = pacing_from_flights(plans, allocation_ko, campaign_id, self.today);
        let margin = margin_from_flights(plans, plan.cost, plan.current_cost_limit, campaign_id);
        let quality = quality_fields(
            Some(margin),
            pacing,
            delivery.video_view_rate,
            delivery.ctr,
            &self.settings,
        );

        Performance {
            impressions: Some(delivery.impressions),
            video_views: Some(delivery.video_views),
            cpv: delivery.cpv,
            cpm: delivery.cpm,
            ctr: delivery.ctr,
            video_view_rate: delivery.video_view_rate,
            goal_type: delivery.goal_type,
            plan_impressions: plan.plan_impressions,
            plan_video_views: plan.plan_video_views,
            plan_cpv: plan.plan_cpv,
            plan_cpm: plan.plan_cpm,
            cost: plan.cost,
            plan_cost: plan.plan_cost,
            current_cost_limit: plan.current_cost_limit,
            pacing,
            margin,
            margin_quality: quality.margin_quality,
            margin_direction: quality.margin_direction,
            pacing_quality: Some(quality.pacing_quality),
            pacing_direction: Some(quality.pacing_direction),
            video_view_rate_quality: Some(quality.video_view_rate_quality),
            ctr_quality: Some(quality.ctr_quality),
        }
    }

    fn opportunity_status(&self, opportunity: &Opportunity) -> OpportunityStatus {
        match (opportunity.start, opportunity.end) {
            (Some(start), _) if start > self.today => OpportunityStatus::Upcoming,
            (_, Some(end)) if end < self.today => OpportunityStatus::Completed,
            (Some(_), Some(_)) => OpportunityStatus::Active,
            _ => OpportunityStatus::Undefined,
        }
    }

    // ── Opportunities ──

    pub fn get_opportunities(
        &self,
        reader: &impl HierarchyReader,
        filter: &OpportunityFilter,
    ) -> PacingResult<Vec<OpportunitySummary>> {
        let range = filter.resolve_range(self.today)?;
        let search = filter.search.as_deref().map(str::to_lowercase);

        let mut opportunities: Vec<Opportunity> = reader
            .opportunities()
            .into_iter()
            .filter(|o| o.probability == 100)
            .filter(|o| match range {
                Some((from, to)) => match (o.start, o.end) {
                    (Some(start), Some(end)) => start <= to && end >= from,
                    _ => false,
                },
                None => true,
            })
            .filter(|o| match &filter.ids {
                Some(ids) => ids.contains(&o.id),
                None => true,
            })
            .filter(|o| match &search {
                Some(needle) => o.name.to_lowercase().contains(needle.trim()),
                None => true,
            })
            .collect();
        opportunities.sort_by(|a, b| (&a.name, a.id).cmp(&(&b.name, b.id)));

        let mut out = Vec::with_capacity(opportunities.len());
        for opportunity in opportunities {
            let status = self.opportunity_status(&opportunity);
            if filter.status.is_some_and(|wanted| wanted != status) {
                continue;
            }

            let rows = reader.flight_rows_for_opportunity(opportunity.id);
            let plans = build_flight_plans(rows, self.today, &self.settings);
            let refs: Vec<&FlightPlan> = plans.iter().collect();
            let performance = self.performance(&refs, 1.0, None);

            let placements = reader.placements(opportunity.id);
            let mut goal_types: Vec<GoalType> =
                placements.iter().map(|p| p.goal_type).collect();
            goal_types.sort_by_key(|g| g.as_str());
            goal_types.dedup();
            let mut dynamic_placements: Vec<DynamicPlacementType> = placements
                .iter()
                .filter_map(|p| p.dynamic_placement)
                .collect();
            dynamic_placements.sort_by_key(|d| format!("{d:?}"));
            dynamic_placements.dedup();
            let has_dynamic_placements = !dynamic_placements.is_empty();

            let default_buffer = if opportunity.budget > self.settings.big_budget_border {
                (self.settings.big_goal_factor - 1.0) * 100.0
            } else {
                (self.settings.goal_factor - 1.0) * 100.0
            };

            let mut alerts = Vec::new();
            if let Some(end) = opportunity.end {
                let margin = performance.margin;
                if margin != 0.0 && margin < 0.1 && self.today <= end - Duration::days(7) {
                    alerts.push(Alert {
                        short: "Campaign Under Margin".to_string(),
                        detail: format!(
                            "{} is under margin at {margin:.2}. Please adjust immediately.",
                            opportunity.name
                        ),
                    });
                }
            }
            if let Some(pacing) = performance.pacing {
                let direction = if pacing > 1.1 {
                    Some("over pacing")
                } else if pacing < 0.9 {
                    Some("under pacing")
                } else {
                    None
                };
                if let Some(direction) = direction {
                    alerts.push(Alert {
                        short: "Campaign Under / Overpacing".to_string(),
                        detail: format!(
                            "{} is {direction} at {pacing:.2}. Please check and adjust.",
                            opportunity.name
                        ),
                    });
                }
            }

            let chart_data =
                charts::goal_type_chart_data(&refs, self.today, None, &self.settings);

            out.push(OpportunitySummary {
                id: opportunity.id,
                name: opportunity.name,
                start: opportunity.start,
                end: opportunity.end,
                status,
                budget: opportunity.budget,
                cannot_roll_over: opportunity.cannot_roll_over,
                goal_types,
                cpm_buffer: opportunity.cpm_buffer.unwrap_or(default_buffer),
                cpv_buffer: opportunity.cpv_buffer.unwrap_or(default_buffer),
                dynamic_placements,
                has_dynamic_placements,
                is_completed: opportunity.end.map(|end| end < self.today),
                is_upcoming: opportunity.start.map(|start| start > self.today),
                performance,
                chart_data,
                alerts,
            });
        }
        Ok(out)
    }

    // ── Placements ──

    pub fn get_placements(
        &self,
        reader: &impl HierarchyReader,
        opportunity_id: Uuid,
    ) -> PacingResult<Vec<PlacementSummary>> {
        let opportunity = reader
            .opportunity(opportunity_id)
            .ok_or_else(|| PacingError::not_found(format!("opportunity {opportunity_id}")))?;

        let mut placements = reader.placements(opportunity.id);
        placements.sort_by(|a, b| (&a.name, a.start).cmp(&(&b.name, b.start)));

        let rows = reader.flight_rows_for_opportunity(opportunity.id);
        let plans = build_flight_plans(rows, self.today, &self.settings);

        let mut out = Vec::with_capacity(placements.len());
        for placement in placements {
            let refs: Vec<&FlightPlan> = plans
                .iter()
                .filter(|p| p.row.placement_id == placement.id)
                .collect();

            let mut performance = self.performance(&refs, 1.0, None);
            performance.goal_type = Some(placement.goal_type.as_str().to_string());
            let chart = charts::chart_data(&refs, self.today, 1.0, None, &self.settings);

            if placement.goal_type == GoalType::HardCost {
                performance.null_unit_metrics();
            }

            out.push(PlacementSummary {
                id: placement.id,
                name: placement.name,
                start: placement.start,
                end: placement.end,
                dynamic_placement: placement.dynamic_placement,
                tech_fee: placement.tech_fee,
                is_completed: placement.end.map(|end| end < self.today),
                is_upcoming: placement.start.map(|start| start > self.today),
                performance,
                chart,
                alerts: Vec::new(),
            });
        }
        Ok(out)
    }

    // ── Flights ──

    pub fn get_flights(
        &self,
        reader: &impl HierarchyReader,
        placement_id: Uuid,
    ) -> PacingResult<Vec<FlightSummary>> {
        let placement = reader
            .placement(placement_id)
            .ok_or_else(|| PacingError::not_found(format!("placement {placement_id}")))?;

        let rows = reader.flight_rows_for_placement(placement.id);
        let plans = build_flight_plans(rows, self.today, &self.settings);

        let mut out = Vec::with_capacity(plans.len());
        for plan in &plans {
            let single = [plan];
            let performance = self.performance(&single, 1.0, None);
            let chart = charts::chart_data(&single, self.today, 1.0, None, &self.settings);

            // Projected spend to finish the nominal goal at the
            // realized rate.
            let projected_budget = match placement.goal_type {
                GoalType::Cpm => performance
                    .cpm
                    .map(|cpm| chart.goal / 1000.0 * cpm)
                    .unwrap_or(0.0),
                _ => performance.cpv.map(|cpv| chart.goal * cpv).unwrap_or(0.0),
            };

            let pacing_allocations = reader.pacing_allocation_ranges(plan.row.id);
            let historical = charts::flight_historical_pacing(
                plan,
                &pacing_allocations,
                projected_budget,
                self.today,
            );

            let delivery = plan.delivered_units();
            let mut alerts = Vec::new();
            if plan.plan_units > 0.0 && plan.row.end >= self.today {
                let delivery_percentage = delivery / plan.plan_units;
                let milestone = if delivery_percentage >= 1.0 {
                    Some("100%")
                } else if delivery_percentage >= 0.8 {
                    Some("80%")
                } else {
                    None
                };
                if let Some(milestone) = milestone {
                    alerts.push(Alert {
                        short: format!("Unit Progress at {milestone}"),
                        detail: format!(
                            "{} has delivered {milestone} of its ordered units",
                            plan.row.name
                        ),
                    });
                }
            }
            if let Some(pacing) = performance.pacing {
                let direction = if pacing > 1.1 {
                    Some("over pacing by 10%")
                } else if pacing < 0.9 {
                    Some("under pacing by 10%")
                } else {
                    None
                };
                if let Some(direction) = direction {
                    alerts.push(Alert {
                        short: "Campaign Under / Overpacing".to_string(),
                        detail: format!(
                            "The flight {} is {direction} and ends on {}. Please check and adjust immediately.",
                            plan.row.name, plan.row.end
                        ),
                    });
                }
            }

            out.push(FlightSummary {
                id: plan.row.id,
                name: plan.row.name.clone(),
                start: plan.row.start,
                end: plan.row.end,
                dynamic_placement: plan.row.dynamic_placement,
                tech_fee: plan.row.tech_fee,
                plan_units: plan.plan_units,
                recalculated_plan_units: plan.recalculated_plan_units,
                delivery,
                budget: plan.row.budget,
                projected_budget,
                pacing_allocations,
                is_completed: plan.row.end < self.today,
                is_upcoming: plan.row.start > self.today,
                performance,
                chart,
                historical,
                alerts,
            });
        }
        Ok(out)
    }

    // ── Campaigns ──

    pub fn get_campaigns(
        &self,
        reader: &impl HierarchyReader,
        flight_id: Uuid,
    ) -> PacingResult<Vec<CampaignSummary>> {
        let flight = reader
            .flight(flight_id)
            .ok_or_else(|| PacingError::not_found(format!("flight {flight_id}")))?;

        // Build across the whole placement so roll-over is in effect,
        // then report against the one flight.
        let rows = reader.flight_rows_for_placement(flight.placement_id);
        let plans = build_flight_plans(rows, self.today, &self.settings);
        let refs: Vec<&FlightPlan> = plans.iter().filter(|p| p.row.id == flight.id).collect();
        let flight_plan = refs
            .first()
            .copied()
            .ok_or_else(|| PacingError::not_found(format!("flight {flight_id}")))?;

        let campaigns = normalize_campaign_allocations(reader.campaigns(flight.placement_id));
        let flight_daily_budget = self.flight_daily_budget(reader, flight_plan);

        let mut out = Vec::with_capacity(campaigns.len());
        for campaign in campaigns {
            let allocation_ko = campaign.goal_allocation / 100.0;
            let performance = self.performance(&refs, allocation_ko, Some(campaign.id));
            let chart = charts::chart_data(
                &refs,
                self.today,
                allocation_ko,
                Some(campaign.id),
                &self.settings,
            );

            out.push(CampaignSummary {
                id: campaign.id,
                name: campaign.name,
                status: campaign.status,
                goal_allocation: campaign.goal_allocation,
                flight_budget: flight.budget,
                flight_daily_budget,
                performance,
                chart,
            });
        }
        Ok(out)
    }

    /// Today's share of the flight's projected budget, per the pacing
    /// allocation range containing today.
    fn flight_daily_budget(&self, reader: &impl HierarchyReader, plan: &FlightPlan) -> f64 {
        let ranges = reader.pacing_allocation_ranges(plan.row.id);
        let Some(today_range) = ranges
            .iter()
            .find(|r| r.start <= self.today && self.today <= r.end)
        else {
            return 0.0;
        };
        let days_count = (today_range.end - today_range.start).num_days();
        if days_count <= 0 {
            return 0.0;
        }

        let totals = plan.totals_for(None);
        let projected_budget = match plan.row.goal_type {
            GoalType::Cpm => stats::average_cpm(totals.cost, totals.impressions)
                .map(|cpm| plan.row.ordered_units / 1000.0 * cpm),
            _ => stats::average_cpv(totals.cost, totals.video_views)
                .map(|cpv| plan.row.ordered_units * cpv),
        };
        match projected_budget {
            Some(projected) => projected * today_range.allocation / 100.0 / days_count as f64,
            None => 0.0,
        }
    }
}

/// Campaigns with a zero allocation share the unallocated remainder
/// equally; explicit allocations are left untouched.
pub fn normalize_campaign_allocations(mut campaigns: Vec<Campaign>) -> Vec<Campaign> {
    campaigns.sort_by(|a, b| (&a.name, a.id).cmp(&(&b.name, b.id)));
    let total: f64 = campaigns.iter().map(|c| c.goal_allocation).sum();
    if campaigns.is_empty() || total >= 100.0 {
        return campaigns;
    }
    let unallocated: Vec<usize> = campaigns
        .iter()
        .enumerate()
        .filter(|(_, c)| c.goal_allocation == 0.0)
        .map(|(i, _)| i)
        .collect();
    if unallocated.is_empty() {
        return campaigns;
    }
    let split = (100.0 - total) / unallocated.len() as f64;
    for i in unallocated {
        campaigns[i].goal_allocation = split;
    }
    campaigns
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
