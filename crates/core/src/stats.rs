//! Guarded ratio math. Every ratio degrades to `None` on a zero
//! denominator instead of raising or silently reporting 0 — zero is a
//! legitimate value elsewhere (e.g. zero pacing deviation).

/// Average cost per view: `cost / video_views`.
pub fn average_cpv(cost: f64, video_views: f64) -> Option<f64> {
    if video_views > 0.0 {
        Some(cost / video_views)
    } else {
        None
    }
}

/// Average cost per mille: `cost / impressions * 1000`.
pub fn average_cpm(cost: f64, impressions: f64) -> Option<f64> {
    if impressions > 0.0 {
        Some(cost / impressions * 1000.0)
    } else {
        None
    }
}

/// Click-through rate against impressions.
pub fn ctr(clicks: f64, impressions: f64) -> Option<f64> {
    if impressions > 0.0 {
        Some(clicks / impressions)
    } else {
        None
    }
}

/// Click-through rate against delivered views, used whenever a
/// CPV-goal flight participates in the roll-up.
pub fn ctr_v(clicks: f64, video_views: f64) -> Option<f64> {
    if video_views > 0.0 {
        Some(clicks / video_views)
    } else {
        None
    }
}

/// `video_views / video_impressions`.
pub fn video_view_rate(video_views: f64, video_impressions: f64) -> Option<f64> {
    if video_impressions > 0.0 {
        Some(video_views / video_impressions)
    } else {
        None
    }
}

/// Margin as a fraction: `1 - cost / client_cost`.
///
/// The client cost is capped at `plan_cost` when one is given (actual
/// spend below contract bills at actuals, above contract bills the
/// contracted budget). A zero client cost yields 0 when nothing was
/// spent and -1 when money went out with nothing billable.
pub fn margin(plan_cost: Option<f64>, cost: f64, client_cost: f64) -> f64 {
    let mut client_cost = client_cost;
    if let Some(plan_cost) = plan_cost {
        if client_cost > plan_cost {
            client_cost = plan_cost;
        }
    }
    if client_cost == 0.0 {
        return if cost == 0.0 { 0.0 } else { -1.0 };
    }
    1.0 - cost / client_cost
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ratios_guard_zero_denominator() {
        assert_eq!(average_cpv(10.0, 0.0), None);
        assert_eq!(average_cpm(10.0, 0.0), None);
        assert_eq!(ctr(1.0, 0.0), None);
        assert_eq!(ctr_v(1.0, 0.0), None);
        assert_eq!(video_view_rate(1.0, 0.0), None);
    }

    #[test]
    fn test_ratio_values() {
        assert_eq!(average_cpv(5.0, 1000.0), Some(0.005));
        assert_eq!(average_cpm(5.0, 1000.0), Some(5.0));
        assert_eq!(ctr(5.0, 1000.0), Some(0.005));
        assert_eq!(ctr_v(12.0, 110.0), Some(12.0 / 110.0));
        assert_eq!(video_view_rate(35.0, 100.0), Some(0.35));
    }

    #[test]
    fn test_margin_basic() {
        // CPV: ordered_rate=0.01, 1000 views delivered at cost 5.
        let client_cost = 0.01 * 1000.0;
        assert!((margin(None, 5.0, client_cost) - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_margin_zero_client_cost() {
        assert_eq!(margin(None, 0.0, 0.0), 0.0);
        assert_eq!(margin(None, 1.0, 0.0), -1.0);
    }

    #[test]
    fn test_margin_caps_client_cost_at_plan() {
        // Over-delivery: client cost 150 against a 100 contract.
        let m = margin(Some(100.0), 80.0, 150.0);
        assert!((m - 0.2).abs() < f64::EPSILON);
    }
}
