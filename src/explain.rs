//! Forecast explanation for a single task.

use chrono::NaiveDate;
use serde::Serialize;

use crate::fields::{RiskTier, Stage};
use crate::forecast::DayRange;
use crate::schedule::{self, Projection};
use crate::scoring::ConfidenceScore;
use crate::view::EnrichedTask;

/// Everything shown when a row is expanded, as data.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Explanation {
    pub key: String,
    /// `bt → ft → key` trace; `None` when the task references neither.
    pub chain: Option<[String; 3]>,
    pub stage: Stage,
    pub estimate_days: u32,
    pub forecast_days: u32,
    pub delta: i64,
    pub range: DayRange,
    pub risk: RiskTier,
    pub confidence: ConfidenceScore,
    /// The "double the estimate" rule of thumb, for comparison.
    pub doubled_estimate: u64,
    pub projection: Projection,
    pub reasons: Vec<String>,
}

pub fn explain(row: &EnrichedTask, today: NaiveDate) -> Explanation {
    let task = &row.task;
    let chain = if task.bt.is_some() || task.ft.is_some() {
        Some([
            task.bt.clone().unwrap_or_else(|| "BT?".to_string()),
            task.ft.clone().unwrap_or_else(|| "FT?".to_string()),
            task.key.clone(),
        ])
    } else {
        None
    };
    let stage = task.stage_or_default();
    Explanation {
        key: task.key.clone(),
        chain,
        stage,
        estimate_days: task.estimate_days,
        forecast_days: row.forecast.days,
        delta: row.delta,
        range: row.forecast.range,
        risk: row.risk,
        confidence: row.confidence,
        doubled_estimate: task.estimate_days as u64 * 2,
        projection: schedule::project(&row.forecast, stage, today),
        reasons: row.forecast.reasons.clone(),
    }
}
