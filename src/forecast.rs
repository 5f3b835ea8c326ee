//! Heuristic forecast engine.
//!
//! A task's estimate is scaled by a multiplier built from its categorical
//! factors and flags, then bracketed by a confidence range whose width grows
//! with the factors' combined uncertainty. The engine is a pure function of
//! the task: same input, same forecast, no failure cases.

use serde::Serialize;

use crate::fields::Level;
use crate::task::{Flags, Task};

/// Similarity at or above which the historical-match discount applies.
pub const SIMILARITY_DISCOUNT_THRESHOLD: f64 = 0.7;
const SIMILARITY_DISCOUNT: f64 = 0.05;
const MAX_UNCERTAINTY: f64 = 8.0;

/// Multiplier increments and explanation text for one categorical factor.
struct TierIncrement {
    medium: (f64, &'static str),
    high: (f64, &'static str),
}

impl TierIncrement {
    fn for_level(&self, level: Level) -> Option<(f64, &'static str)> {
        match level {
            Level::Low => None,
            Level::Medium => Some(self.medium),
            Level::High => Some(self.high),
        }
    }
}

const COMPLEXITY: TierIncrement = TierIncrement {
    medium: (0.10, "Medium complexity: +10%"),
    high: (0.25, "High complexity: +25%"),
};
const DEPENDENCIES: TierIncrement = TierIncrement {
    medium: (0.07, "Moderate dependencies: +7%"),
    high: (0.20, "Many dependencies: +20%"),
};
const NOVELTY: TierIncrement = TierIncrement {
    medium: (0.08, "Moderate novelty: +8%"),
    high: (0.18, "High novelty: +18%"),
};

/// Forecast inputs with every default resolved.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FactorSet {
    pub estimate_days: u32,
    pub complexity: Level,
    pub dependencies: Level,
    pub novelty: Level,
    pub flags: Flags,
    pub similarity: f64,
}

impl FactorSet {
    pub fn from_task(task: &Task) -> Self {
        let factors = task.factors.clone().unwrap_or_default();
        FactorSet {
            estimate_days: task.estimate_days,
            complexity: factors.complexity.unwrap_or_default(),
            dependencies: factors.dependencies.unwrap_or_default(),
            novelty: factors.novelty.unwrap_or_default(),
            flags: factors.flags,
            similarity: task.similarity_or_default(),
        }
    }

    /// Flag increments in their fixed evaluation order.
    fn flag_increments(&self) -> [(bool, f64, &'static str); 5] {
        let f = self.flags;
        [
            (f.external_api, 0.10, "External API: +10%"),
            (f.integration, 0.08, "Integration: +8%"),
            (f.regulatory, 0.12, "Regulatory: +12%"),
            (f.mobile, 0.06, "Mobile platform: +6%"),
            (f.web, 0.03, "Web interface: +3%"),
        ]
    }

    /// Weighted uncertainty score, independent of the multiplier.
    pub fn uncertainty(&self) -> f64 {
        let f = self.flags;
        let weight = |on: bool, w: f64| if on { w } else { 0.0 };
        tier_weight(self.complexity)
            + tier_weight(self.dependencies)
            + tier_weight(self.novelty)
            + weight(f.external_api, 1.0)
            + weight(f.integration, 1.0)
            + weight(f.regulatory, 2.0)
            + weight(f.mobile, 1.0)
            + weight(f.web, 0.5)
    }
}

fn tier_weight(level: Level) -> f64 {
    match level {
        Level::Low => 0.0,
        Level::Medium => 1.0,
        Level::High => 2.0,
    }
}

/// Inclusive range of days around a forecast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DayRange {
    pub low: u32,
    pub high: u32,
}

/// Result of forecasting one task.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Forecast {
    pub days: u32,
    pub range: DayRange,
    /// One entry per contributing factor, in evaluation order.
    pub reasons: Vec<String>,
    pub multiplier: f64,
}

impl Forecast {
    /// Distance from the forecast to the top of its range.
    pub fn spread(&self) -> u32 {
        self.range.high.abs_diff(self.days)
    }
}

/// Forecast a stored task.
pub fn predict(task: &Task) -> Forecast {
    predict_factors(&FactorSet::from_task(task))
}

/// Forecast from resolved inputs.
pub fn predict_factors(input: &FactorSet) -> Forecast {
    let mut multiplier = 1.0_f64;
    let mut reasons = Vec::new();

    let tiers = [
        (&COMPLEXITY, input.complexity),
        (&DEPENDENCIES, input.dependencies),
        (&NOVELTY, input.novelty),
    ];
    for (table, level) in tiers {
        if let Some((inc, reason)) = table.for_level(level) {
            multiplier += inc;
            reasons.push(reason.to_string());
        }
    }

    for (on, inc, reason) in input.flag_increments() {
        if on {
            multiplier += inc;
            reasons.push(reason.to_string());
        }
    }

    if input.similarity >= SIMILARITY_DISCOUNT_THRESHOLD {
        multiplier -= SIMILARITY_DISCOUNT;
        reasons.push("High similarity with history: -5%".to_string());
    }

    let scaled = (input.estimate_days as f64 * multiplier).round();
    let days = if scaled >= 1.0 { scaled.min(u32::MAX as f64) as u32 } else { 1 };

    let uncertainty = input.uncertainty().clamp(0.0, MAX_UNCERTAINTY);
    let spread = (uncertainty * 0.6 + days as f64 * 0.06).ceil() as u32;
    let range = DayRange {
        low: days.saturating_sub(spread).max(1),
        high: days.saturating_add(spread),
    };

    Forecast { days, range, reasons, multiplier }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn factors(estimate: u32, c: Level, d: Level, n: Level) -> FactorSet {
        FactorSet {
            estimate_days: estimate,
            complexity: c,
            dependencies: d,
            novelty: n,
            flags: Flags::default(),
            similarity: 0.5,
        }
    }

    #[test]
    fn test_high_complexity_scenario() {
        let f = predict_factors(&factors(10, Level::High, Level::Medium, Level::Medium));
        assert_eq!(f.days, 14);
        assert_eq!(f.range, DayRange { low: 10, high: 18 });
        assert_eq!(f.spread(), 4);
        assert_eq!(
            f.reasons,
            vec![
                "High complexity: +25%",
                "Moderate dependencies: +7%",
                "Moderate novelty: +8%",
            ]
        );
    }

    #[test]
    fn test_all_low_keeps_estimate_and_gives_no_reasons() {
        let f = predict_factors(&factors(5, Level::Low, Level::Low, Level::Low));
        assert_eq!(f.days, 5);
        assert!(f.reasons.is_empty());
        // spread = ceil(0 + 5 * 0.06) = 1
        assert_eq!(f.range, DayRange { low: 4, high: 6 });
    }

    #[test]
    fn test_zero_estimate_floors_at_one_day() {
        let f = predict_factors(&factors(0, Level::Medium, Level::Medium, Level::Medium));
        assert_eq!(f.days, 1);
        assert_eq!(f.range.low, 1);
        assert!(f.range.high >= 1);
    }

    #[test]
    fn test_flags_apply_in_fixed_order() {
        let mut input = factors(10, Level::Low, Level::Low, Level::Low);
        input.flags = Flags { external_api: true, integration: true, regulatory: true, mobile: true, web: true };
        input.similarity = 0.9;
        let f = predict_factors(&input);
        assert_eq!(
            f.reasons,
            vec![
                "External API: +10%",
                "Integration: +8%",
                "Regulatory: +12%",
                "Mobile platform: +6%",
                "Web interface: +3%",
                "High similarity with history: -5%",
            ]
        );
        assert!((f.multiplier - 1.34).abs() < 1e-9);
        assert_eq!(f.days, 13);
    }

    #[test]
    fn test_similarity_discount_is_exactly_five_points() {
        let mut high = factors(20, Level::High, Level::High, Level::Medium);
        high.similarity = 0.8;
        let mut low = high;
        low.similarity = 0.4;
        let a = predict_factors(&high);
        let b = predict_factors(&low);
        assert!((b.multiplier - a.multiplier - 0.05).abs() < 1e-9);
        assert!(a.days <= b.days);
    }

    #[test]
    fn test_uncertainty_is_capped() {
        let mut input = factors(3, Level::High, Level::High, Level::High);
        input.flags = Flags { external_api: true, integration: true, regulatory: true, mobile: true, web: true };
        assert_eq!(input.uncertainty(), 11.5);
        let f = predict_factors(&input);
        // ceil(8 * 0.6 + days * 0.06) with days = round(3 * 2.02) = 6
        assert_eq!(f.days, 6);
        assert_eq!(f.spread(), 6);
        assert_eq!(f.range.low, 1);
    }

    #[test]
    fn test_range_invariant_over_factor_grid() {
        let levels = [Level::Low, Level::Medium, Level::High];
        for estimate in [0, 1, 2, 5, 13, 40, 250] {
            for c in levels {
                for d in levels {
                    for n in levels {
                        for bits in 0u8..32 {
                            let mut input = factors(estimate, c, d, n);
                            input.flags = Flags {
                                external_api: bits & 1 != 0,
                                integration: bits & 2 != 0,
                                regulatory: bits & 4 != 0,
                                mobile: bits & 8 != 0,
                                web: bits & 16 != 0,
                            };
                            let f = predict_factors(&input);
                            assert!(f.days >= 1);
                            assert!(1 <= f.range.low && f.range.low <= f.days && f.days <= f.range.high);
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn test_missing_factors_default_to_medium() {
        let task: Task = serde_json::from_str(r#"{"key": "X", "title": "Y", "estimateDays": 10}"#).unwrap();
        let resolved = FactorSet::from_task(&task);
        assert_eq!(resolved.complexity, Level::Medium);
        assert_eq!(resolved.dependencies, Level::Medium);
        assert_eq!(resolved.novelty, Level::Medium);
        assert_eq!(resolved.similarity, 0.5);
        let explicit = factors(10, Level::Medium, Level::Medium, Level::Medium);
        assert_eq!(predict(&task), predict_factors(&explicit));
    }
}
