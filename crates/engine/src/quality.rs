//! Traffic-light quality buckets derived from margin, pacing, and the
//! delivered rates. Quality 2 is healthy, 1 borderline, 0 critical;
//! direction points at which way the metric is off (+1 under, -1 over).

use pacing_core::config::EngineSettings;
use serde::Serialize;

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct QualityFields {
    pub margin_quality: u8,
    pub margin_direction: i8,
    pub pacing_quality: u8,
    pub pacing_direction: i8,
    pub video_view_rate_quality: u8,
    pub ctr_quality: u8,
}

/// Missing values bucket as healthy: nothing measurable is not a
/// problem yet.
pub fn quality_fields(
    margin: Option<f64>,
    pacing: Option<f64>,
    video_view_rate: Option<f64>,
    ctr: Option<f64>,
    settings: &EngineSettings,
) -> QualityFields {
    let (high, low) = settings.margin_borders;
    let (margin_quality, margin_direction) = match margin {
        None => (2, 0),
        Some(m) if m >= high => (2, 0),
        Some(m) if m >= low => (1, 1),
        Some(_) => (0, 1),
    };

    let ((under_low, under_high), (over_low, over_high)) = settings.pacing_borders;
    let (pacing_quality, pacing_direction) = match pacing {
        None => (2, 0),
        Some(p) if p >= under_high && p <= over_low => (2, 0),
        Some(p) if (p > under_low && p < under_high) || (p > over_low && p < over_high) => {
            (1, if p < under_high { 1 } else { -1 })
        }
        Some(p) => (0, if p <= under_low { 1 } else { -1 }),
    };

    QualityFields {
        margin_quality,
        margin_direction,
        pacing_quality,
        pacing_direction,
        video_view_rate_quality: rate_quality(video_view_rate, settings.video_view_rate_borders),
        ctr_quality: rate_quality(ctr, settings.ctr_borders),
    }
}

fn rate_quality(value: Option<f64>, borders: (f64, f64)) -> u8 {
    let (low, high) = borders;
    match value {
        None => 2,
        Some(v) if v < low => 0,
        Some(v) if v < high => 1,
        Some(_) => 2,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
