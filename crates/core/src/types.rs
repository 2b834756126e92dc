//! Planning hierarchy entities — Opportunity → Placement → Flight →
//! Campaign — plus the daily statistic fact rows the engine consumes.
//! All of these are plain data; ownership of persistence and mutation
//! lives in `pacing-store`.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ─── Enums ──────────────────────────────────────────────────────────────────

/// Sales goal type of a placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalType {
    Cpv,
    Cpm,
    HardCost,
}

impl GoalType {
    pub fn as_str(&self) -> &'static str {
        match self {
            GoalType::Cpv => "CPV",
            GoalType::Cpm => "CPM",
            GoalType::HardCost => "Hard Cost",
        }
    }
}

/// Dynamic placements plan against cost rather than ordered units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DynamicPlacementType {
    Budget,
    ServiceFee,
    RateAndTechFee,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlacementKind {
    Regular,
    /// Pass-through fee placements: costed but never paced.
    OutgoingFee,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CampaignStatus {
    Serving,
    Paused,
    Ended,
}

impl Default for CampaignStatus {
    fn default() -> Self {
        Self::Serving
    }
}

// ─── Entities ───────────────────────────────────────────────────────────────

/// A sales-booked advertising deal; root of the planning hierarchy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Opportunity {
    pub id: Uuid,
    pub name: String,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    /// Close probability percent; reports only consider 100.
    pub probability: u8,
    pub budget: f64,
    /// When set, over-delivery never reduces later flights' plans.
    pub cannot_roll_over: bool,
    /// Optional plan-buffer overrides (percent) per goal type.
    pub cpm_buffer: Option<f64>,
    pub cpv_buffer: Option<f64>,
}

/// A goal-typed budget line within an opportunity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Placement {
    pub id: Uuid,
    pub opportunity_id: Uuid,
    pub name: String,
    pub goal_type: GoalType,
    pub dynamic_placement: Option<DynamicPlacementType>,
    pub kind: PlacementKind,
    /// Client-facing rate per unit (per view for CPV, per mille for CPM).
    pub ordered_rate: f64,
    pub total_cost: f64,
    /// Tech fee per unit for rate-and-tech-fee placements.
    pub tech_fee: Option<f64>,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

/// A date-bounded slice of a placement's ordered units and cost.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Flight {
    pub id: Uuid,
    pub placement_id: Uuid,
    pub name: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub ordered_units: f64,
    pub total_cost: f64,
    /// Booked spend, used by hard-cost and outgoing-fee flights.
    pub cost: f64,
    pub budget: f64,
}

impl Flight {
    /// Inclusive day count of the flight span.
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}

/// An ad-platform campaign delivering against a placement's flights.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Campaign {
    pub id: Uuid,
    pub placement_id: Uuid,
    pub name: String,
    pub status: CampaignStatus,
    /// Percentage of the flight plan assigned to this campaign (0-100).
    pub goal_allocation: f64,
}

/// One day of delivered metrics for one campaign. Append-style facts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignStatistic {
    pub campaign_id: Uuid,
    pub date: NaiveDate,
    pub impressions: u64,
    pub video_views: u64,
    pub clicks: u64,
    pub cost: f64,
}

/// Append-only record of a campaign allocation change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationHistoryEntry {
    pub id: Uuid,
    pub flight_id: Uuid,
    pub campaign_id: Uuid,
    /// The allocation percentage that was written.
    pub budget: f64,
    pub changed_at: chrono::DateTime<chrono::Utc>,
}
