//! Enumerations and field types for forecasting and board views.
//!
//! This module defines the closed categorical types used across the crate:
//! factor tiers, lifecycle stages, the task-type taxonomy, risk and confidence
//! tiers, and the sort/filter/view selectors driven from the CLI and the board.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Three-step tier used by the complexity, dependencies and novelty factors.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq, PartialOrd, Ord, Default)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Low,
    #[default]
    Medium,
    High,
}

impl Level {
    /// Parse a persisted tier. `None` means the value is not a known tier.
    pub fn from_key(s: &str) -> Option<Level> {
        match s.trim().to_lowercase().as_str() {
            "low" => Some(Level::Low),
            "medium" => Some(Level::Medium),
            "high" => Some(Level::High),
            _ => None,
        }
    }

    pub fn key(self) -> &'static str {
        match self {
            Level::Low => "low",
            Level::Medium => "medium",
            Level::High => "high",
        }
    }
}

/// Lifecycle stage of a task, in ascending order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Backlog,
    #[default]
    InProgress,
    ReadyForTest,
    Testing,
    AwaitingAcceptance,
    Done,
}

impl Stage {
    pub const ALL: [Stage; 6] = [
        Stage::Backlog,
        Stage::InProgress,
        Stage::ReadyForTest,
        Stage::Testing,
        Stage::AwaitingAcceptance,
        Stage::Done,
    ];

    /// Parse a persisted stage key; unknown keys are `None`.
    pub fn from_key(s: &str) -> Option<Stage> {
        match s.trim() {
            "backlog" => Some(Stage::Backlog),
            "in_progress" => Some(Stage::InProgress),
            "ready_for_test" => Some(Stage::ReadyForTest),
            "testing" => Some(Stage::Testing),
            "awaiting_acceptance" => Some(Stage::AwaitingAcceptance),
            "done" => Some(Stage::Done),
            _ => None,
        }
    }

    pub fn key(self) -> &'static str {
        match self {
            Stage::Backlog => "backlog",
            Stage::InProgress => "in_progress",
            Stage::ReadyForTest => "ready_for_test",
            Stage::Testing => "testing",
            Stage::AwaitingAcceptance => "awaiting_acceptance",
            Stage::Done => "done",
        }
    }

    /// Development counts as finished from "ready for test" onwards.
    pub fn is_dev_completed(self) -> bool {
        self >= Stage::ReadyForTest
    }
}

/// Known task types. Persisted values outside this set are kept verbatim on
/// the task and displayed through the `Task` fallback.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TaskType {
    #[default]
    Feature,
    Task,
    Bug,
    Improvement,
    Spike,
    Doc,
    Epic,
    Bt,
    Ft,
}

impl TaskType {
    pub fn from_key(s: &str) -> Option<TaskType> {
        match s.trim() {
            "feature" => Some(TaskType::Feature),
            "task" => Some(TaskType::Task),
            "bug" => Some(TaskType::Bug),
            "improvement" => Some(TaskType::Improvement),
            "spike" => Some(TaskType::Spike),
            "doc" => Some(TaskType::Doc),
            "epic" => Some(TaskType::Epic),
            "bt" => Some(TaskType::Bt),
            "ft" => Some(TaskType::Ft),
            _ => None,
        }
    }

    pub fn key(self) -> &'static str {
        match self {
            TaskType::Feature => "feature",
            TaskType::Task => "task",
            TaskType::Bug => "bug",
            TaskType::Improvement => "improvement",
            TaskType::Spike => "spike",
            TaskType::Doc => "doc",
            TaskType::Epic => "epic",
            TaskType::Bt => "bt",
            TaskType::Ft => "ft",
        }
    }
}

/// Schedule-slip severity. Ordering follows the rank used for sorting.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum RiskTier {
    Low,
    Medium,
    High,
}

impl RiskTier {
    pub fn rank(self) -> u8 {
        match self {
            RiskTier::Low => 0,
            RiskTier::Medium => 1,
            RiskTier::High => 2,
        }
    }

    pub fn key(self) -> &'static str {
        match self {
            RiskTier::Low => "low",
            RiskTier::Medium => "medium",
            RiskTier::High => "high",
        }
    }
}

/// Trust in a forecast, derived from its spread and historical similarity.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl Confidence {
    pub fn key(self) -> &'static str {
        match self {
            Confidence::Low => "low",
            Confidence::Medium => "medium",
            Confidence::High => "high",
        }
    }
}

/// Risk selector for the board and `list`; `All` keeps every row.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq, Default)]
pub enum RiskFilter {
    #[default]
    All,
    Low,
    Medium,
    High,
}

impl RiskFilter {
    pub fn matches(self, tier: RiskTier) -> bool {
        match self {
            RiskFilter::All => true,
            RiskFilter::Low => tier == RiskTier::Low,
            RiskFilter::Medium => tier == RiskTier::Medium,
            RiskFilter::High => tier == RiskTier::High,
        }
    }

    /// Next selector in the board's cycle order.
    pub fn cycle(self) -> RiskFilter {
        match self {
            RiskFilter::All => RiskFilter::Low,
            RiskFilter::Low => RiskFilter::Medium,
            RiskFilter::Medium => RiskFilter::High,
            RiskFilter::High => RiskFilter::All,
        }
    }
}

/// Columns the view can be sorted by.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq, Default)]
pub enum SortField {
    #[default]
    Key,
    Title,
    Estimate,
    Forecast,
    Delta,
    Risk,
    Confidence,
    Stage,
    Type,
}

impl SortField {
    /// Numeric fields compare by value; the rest compare as natural strings.
    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            SortField::Estimate
                | SortField::Forecast
                | SortField::Delta
                | SortField::Risk
                | SortField::Confidence
        )
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDir {
    #[default]
    Asc,
    Desc,
}

/// How the forecast column is presented.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq, Default)]
pub enum ViewMode {
    #[default]
    Days,
    Dates,
}

impl ViewMode {
    pub fn toggle(self) -> ViewMode {
        match self {
            ViewMode::Days => ViewMode::Dates,
            ViewMode::Dates => ViewMode::Days,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_order_and_dev_completion() {
        assert!(Stage::Backlog < Stage::InProgress);
        assert!(Stage::AwaitingAcceptance < Stage::Done);
        assert!(!Stage::Backlog.is_dev_completed());
        assert!(!Stage::InProgress.is_dev_completed());
        for stage in [Stage::ReadyForTest, Stage::Testing, Stage::AwaitingAcceptance, Stage::Done] {
            assert!(stage.is_dev_completed(), "{:?}", stage);
        }
    }

    #[test]
    fn test_stage_keys_round_trip() {
        for stage in Stage::ALL {
            assert_eq!(Stage::from_key(stage.key()), Some(stage));
        }
        assert_eq!(Stage::from_key("shipping"), None);
    }

    #[test]
    fn test_risk_filter_cycle_visits_every_tier() {
        let mut f = RiskFilter::All;
        let mut seen = Vec::new();
        for _ in 0..4 {
            f = f.cycle();
            seen.push(f);
        }
        assert_eq!(seen, vec![RiskFilter::Low, RiskFilter::Medium, RiskFilter::High, RiskFilter::All]);
        assert!(RiskFilter::All.matches(RiskTier::High));
        assert!(!RiskFilter::Low.matches(RiskTier::Medium));
    }

    #[test]
    fn test_level_parsing() {
        assert_eq!(Level::from_key("HIGH"), Some(Level::High));
        assert_eq!(Level::from_key(" low "), Some(Level::Low));
        assert_eq!(Level::from_key("extreme"), None);
        assert_eq!(Level::default(), Level::Medium);
    }
}
