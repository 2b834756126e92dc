//! Request and response payloads for the pacing API.

use chrono::NaiveDate;
use pacing_core::{PacingError, PacingResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
}

/// Query parameters for the opportunities listing. `today` pins the
/// report date for reproducible output; it defaults at the edge.
#[derive(Debug, Default, Deserialize)]
pub struct OpportunitiesQuery {
    pub period: Option<String>,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    /// Comma-separated opportunity ids.
    pub ids: Option<String>,
    pub search: Option<String>,
    pub status: Option<String>,
    pub today: Option<NaiveDate>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ReportQuery {
    pub today: Option<NaiveDate>,
}

/// Body of a campaign allocation update: campaign ids mapped to
/// percentages, plus an optional `flight_budget`. Values arrive as JSON
/// numbers or numeric strings; anything else is rejected.
#[derive(Debug, Deserialize)]
pub struct CampaignAllocationsBody(pub HashMap<String, Value>);

impl CampaignAllocationsBody {
    pub fn parse(self) -> PacingResult<(HashMap<Uuid, f64>, Option<f64>)> {
        let mut allocations = HashMap::new();
        let mut flight_budget = None;
        for (key, value) in self.0 {
            let number = parse_number(&value).ok_or_else(|| {
                PacingError::validation(format!("value for {key} is not a number"))
            })?;
            if key == "flight_budget" {
                flight_budget = Some(number);
            } else {
                let id = Uuid::parse_str(&key).map_err(|_| {
                    PacingError::validation(format!("{key} is not a campaign id"))
                })?;
                allocations.insert(id, number);
            }
        }
        Ok((allocations, flight_budget))
    }
}

fn parse_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

#[derive(Debug, Deserialize)]
pub struct PacingAllocationRangeBody {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub allocation: f64,
}

#[derive(Debug, Deserialize)]
pub struct BuffersBody {
    pub cpm_buffer: Option<f64>,
    pub cpv_buffer: Option<f64>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
