//! Risk classification and confidence scoring for forecasts.

use serde::Serialize;

use crate::fields::{Confidence, RiskTier};
use crate::forecast::DayRange;

/// Classify schedule-slip risk from the forecast delta.
///
/// The ratio `delta / estimate` is taken as 0 when there is no estimate.
pub fn classify_risk(delta: i64, estimate_days: u32) -> RiskTier {
    let ratio = if estimate_days > 0 {
        delta as f64 / estimate_days as f64
    } else {
        0.0
    };
    if delta >= 4 || ratio >= 0.30 {
        RiskTier::High
    } else if delta >= 1 || ratio >= 0.10 {
        RiskTier::Medium
    } else {
        RiskTier::Low
    }
}

/// Numeric confidence (0..=100) and its tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ConfidenceScore {
    pub score: u8,
    pub level: Confidence,
}

/// Score trust in a forecast: narrower ranges and closer historical matches score higher.
pub fn score_confidence(range: DayRange, forecast_days: u32, similarity: f64) -> ConfidenceScore {
    let width = range.high.abs_diff(forecast_days) as f64;
    let raw = (100.0 - width * 3.0 + similarity * 20.0).round();
    let score = if raw.is_nan() { 0 } else { raw.clamp(0.0, 100.0) as u8 };
    let level = if score >= 70 {
        Confidence::High
    } else if score >= 45 {
        Confidence::Medium
    } else {
        Confidence::Low
    };
    ConfidenceScore { score, level }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_risk_thresholds() {
        assert_eq!(classify_risk(4, 10), RiskTier::High);
        assert_eq!(classify_risk(3, 10), RiskTier::High); // ratio 0.3
        assert_eq!(classify_risk(2, 10), RiskTier::Medium);
        assert_eq!(classify_risk(1, 100), RiskTier::Medium);
        assert_eq!(classify_risk(0, 5), RiskTier::Low);
        assert_eq!(classify_risk(-2, 5), RiskTier::Low);
    }

    #[test]
    fn test_zero_estimate_guards_ratio() {
        assert_eq!(classify_risk(1, 0), RiskTier::Medium);
        assert_eq!(classify_risk(0, 0), RiskTier::Low);
        assert_eq!(classify_risk(5, 0), RiskTier::High);
    }

    #[test]
    fn test_risk_is_monotonic_in_delta() {
        for estimate in [0u32, 1, 2, 3, 7, 10, 30, 100] {
            let mut prev = RiskTier::Low;
            for delta in -20i64..60 {
                let tier = classify_risk(delta, estimate);
                assert!(tier >= prev, "estimate {} delta {}", estimate, delta);
                prev = tier;
            }
        }
    }

    #[test]
    fn test_confidence_scenario() {
        let c = score_confidence(DayRange { low: 10, high: 18 }, 14, 0.5);
        assert_eq!(c, ConfidenceScore { score: 98, level: Confidence::High });
    }

    #[test]
    fn test_similarity_adds_twenty_points_per_unit() {
        let range = DayRange { low: 10, high: 30 };
        let high = score_confidence(range, 20, 0.8);
        let low = score_confidence(range, 20, 0.4);
        assert_eq!(high.score, 86);
        assert_eq!(low.score, 78);
        assert_eq!(high.score - low.score, 8);
    }

    #[test]
    fn test_confidence_is_clamped_and_tiered() {
        assert_eq!(score_confidence(DayRange { low: 1, high: 1 }, 1, 1.0).score, 100);
        let wide = score_confidence(DayRange { low: 1, high: 60 }, 20, 0.0);
        assert_eq!(wide.score, 0);
        assert_eq!(wide.level, Confidence::Low);
        let mid = score_confidence(DayRange { low: 1, high: 35 }, 20, 0.5);
        assert_eq!(mid.score, 65);
        assert_eq!(mid.level, Confidence::Medium);
    }
}
