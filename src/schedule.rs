//! Calendar projection of forecasts.
//!
//! Turns a forecast into an expected development-completion date and a
//! "reliable delivery" window. The reference date is always passed in so
//! projections are reproducible.

use chrono::{Datelike, Days, NaiveDate};
use serde::Serialize;

use crate::fields::Stage;
use crate::forecast::{DayRange, Forecast};

/// Fixed buffer after development before anything can ship.
const DELIVERY_BASE_BUFFER: u32 = 2;
/// Extra slack added on top of the scaled uncertainty.
const DELIVERY_TAIL_BUFFER: u32 = 2;

/// Development milestone for a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Development {
    /// The task's stage is at or beyond "ready for test".
    Completed,
    Expected { date: NaiveDate, days: u32 },
}

/// Inclusive calendar window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateWindow {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

/// Projected milestones for one task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Projection {
    pub development: Development,
    pub delivery_days: DayRange,
    pub delivery: DateWindow,
}

/// Delivery window in days from the reference date.
pub fn delivery_range(forecast: &Forecast) -> DayRange {
    let uncertainty = forecast.spread() as f64;
    let pad = DELIVERY_BASE_BUFFER + (uncertainty * 0.6).ceil() as u32 + DELIVERY_TAIL_BUFFER;
    DayRange {
        low: forecast.days.saturating_add(DELIVERY_BASE_BUFFER),
        high: forecast.days.saturating_add(pad),
    }
}

/// Project a forecast onto the calendar starting at `today`.
pub fn project(forecast: &Forecast, stage: Stage, today: NaiveDate) -> Projection {
    let development = if stage.is_dev_completed() {
        Development::Completed
    } else {
        Development::Expected {
            date: add_days(today, forecast.days),
            days: forecast.days,
        }
    };
    let delivery_days = delivery_range(forecast);
    Projection {
        development,
        delivery_days,
        delivery: DateWindow {
            from: add_days(today, delivery_days.low),
            to: add_days(today, delivery_days.high),
        },
    }
}

/// Add calendar days, saturating at the latest representable date.
pub fn add_days(date: NaiveDate, days: u32) -> NaiveDate {
    date.checked_add_days(Days::new(days as u64)).unwrap_or(NaiveDate::MAX)
}

/// Short day-month form, e.g. "5 Mar".
pub fn format_date(d: NaiveDate) -> String {
    d.format("%-d %b").to_string()
}

/// Compact window: "5–9 Mar" inside one month, "28 Feb – 3 Mar" across months.
pub fn format_date_range(w: DateWindow) -> String {
    if w.from.year() == w.to.year() && w.from.month() == w.to.month() {
        format!("{}–{} {}", w.from.day(), w.to.day(), w.from.format("%b"))
    } else {
        format!("{} – {}", format_date(w.from), format_date(w.to))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forecast::{predict_factors, FactorSet};
    use crate::fields::Level;
    use crate::task::Flags;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn forecast_14() -> Forecast {
        predict_factors(&FactorSet {
            estimate_days: 10,
            complexity: Level::High,
            dependencies: Level::Medium,
            novelty: Level::Medium,
            flags: Flags::default(),
            similarity: 0.5,
        })
    }

    #[test]
    fn test_delivery_range_padding() {
        // spread 4 -> pad = 2 + ceil(2.4) + 2 = 7
        let f = forecast_14();
        assert_eq!(delivery_range(&f), DayRange { low: 16, high: 21 });
    }

    #[test]
    fn test_projection_in_progress() {
        let p = project(&forecast_14(), Stage::InProgress, day(2026, 3, 1));
        assert_eq!(p.development, Development::Expected { date: day(2026, 3, 15), days: 14 });
        assert_eq!(p.delivery, DateWindow { from: day(2026, 3, 17), to: day(2026, 3, 22) });
    }

    #[test]
    fn test_projection_after_ready_for_test_reports_completion() {
        let today = day(2026, 3, 1);
        for stage in [Stage::ReadyForTest, Stage::Testing, Stage::AwaitingAcceptance, Stage::Done] {
            let p = project(&forecast_14(), stage, today);
            assert_eq!(p.development, Development::Completed);
            // delivery is still projected
            assert_eq!(p.delivery.from, day(2026, 3, 17));
        }
        let backlog = project(&forecast_14(), Stage::Backlog, today);
        assert!(matches!(backlog.development, Development::Expected { .. }));
    }

    #[test]
    fn test_date_formatting() {
        assert_eq!(format_date(day(2026, 3, 5)), "5 Mar");
        assert_eq!(
            format_date_range(DateWindow { from: day(2026, 3, 5), to: day(2026, 3, 9) }),
            "5–9 Mar"
        );
        assert_eq!(
            format_date_range(DateWindow { from: day(2026, 2, 28), to: day(2026, 3, 3) }),
            "28 Feb – 3 Mar"
        );
    }

    #[test]
    fn test_add_days_saturates() {
        assert_eq!(add_days(NaiveDate::MAX, 5), NaiveDate::MAX);
        assert_eq!(add_days(day(2026, 12, 30), 3), day(2027, 1, 2));
    }
}
