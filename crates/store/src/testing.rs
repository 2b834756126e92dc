//! Shared fixtures for store tests.

use crate::store::HierarchyStore;
use chrono::NaiveDate;
use pacing_core::types::{
    Campaign, CampaignStatistic, CampaignStatus, Flight, GoalType, Opportunity, Placement,
    PlacementKind,
};
use uuid::Uuid;

pub(crate) struct SeededIds {
    pub opportunity: Uuid,
    pub placement: Uuid,
    pub flight: Uuid,
    pub campaign: Uuid,
}

/// One opportunity with a single CPV placement, flight, and campaign.
pub(crate) fn seed_hierarchy(
    store: &HierarchyStore,
    start: NaiveDate,
    end: NaiveDate,
) -> SeededIds {
    let opportunity_id = Uuid::new_v4();
    let placement_id = Uuid::new_v4();
    let flight_id = Uuid::new_v4();
    let campaign_id = Uuid::new_v4();

    store.insert_opportunity(Opportunity {
        id: opportunity_id,
        name: "opportunity".to_string(),
        start: Some(start),
        end: Some(end),
        probability: 100,
        budget: 50_000.0,
        cannot_roll_over: false,
        cpm_buffer: None,
        cpv_buffer: None,
    });
    store.insert_placement(Placement {
        id: placement_id,
        opportunity_id,
        name: "placement".to_string(),
        goal_type: GoalType::Cpv,
        dynamic_placement: None,
        kind: PlacementKind::Regular,
        ordered_rate: 0.05,
        total_cost: 500.0,
        tech_fee: None,
        start: Some(start),
        end: Some(end),
    });
    store.insert_flight(Flight {
        id: flight_id,
        placement_id,
        name: "flight".to_string(),
        start,
        end,
        ordered_units: 10_000.0,
        total_cost: 500.0,
        cost: 0.0,
        budget: 0.0,
    });
    store.insert_campaign(Campaign {
        id: campaign_id,
        placement_id,
        name: "campaign 1".to_string(),
        status: CampaignStatus::Serving,
        goal_allocation: 100.0,
    });

    SeededIds {
        opportunity: opportunity_id,
        placement: placement_id,
        flight: flight_id,
        campaign: campaign_id,
    }
}

pub(crate) fn add_campaign(store: &HierarchyStore, placement_id: Uuid, name: &str) -> Uuid {
    let id = Uuid::new_v4();
    store.insert_campaign(Campaign {
        id,
        placement_id,
        name: name.to_string(),
        status: CampaignStatus::Serving,
        goal_allocation: 0.0,
    });
    id
}

pub(crate) fn stat(
    campaign_id: Uuid,
    date: NaiveDate,
    impressions: u64,
    video_views: u64,
    clicks: u64,
    cost: f64,
) -> CampaignStatistic {
    CampaignStatistic {
        campaign_id,
        date,
        impressions,
        video_views,
        clicks,
        cost,
    }
}
