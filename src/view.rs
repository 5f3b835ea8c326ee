//! View pipeline: enrich, search, filter and sort.
//!
//! Every recomputation starts from the raw task list. Tasks are enriched with
//! their forecast, risk and confidence, then narrowed by the free-text search
//! and the risk selector, and finally stably sorted by the selected column.

use std::cmp::Ordering;
use std::iter::Peekable;
use std::str::Chars;

use serde::Serialize;

use crate::fields::*;
use crate::forecast::{self, Forecast};
use crate::scoring::{classify_risk, score_confidence, ConfidenceScore};
use crate::task::Task;

/// A task together with everything derived from it. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedTask {
    pub task: Task,
    pub forecast: Forecast,
    /// Forecast minus estimate; positive means the forecast runs longer.
    pub delta: i64,
    pub risk: RiskTier,
    pub confidence: ConfidenceScore,
}

impl EnrichedTask {
    pub fn risk_rank(&self) -> u8 {
        self.risk.rank()
    }
}

/// Run one task through the forecast engine, risk classifier and confidence scorer.
pub fn enrich(task: &Task) -> EnrichedTask {
    let forecast = forecast::predict(task);
    let delta = forecast.days as i64 - task.estimate_days as i64;
    let risk = classify_risk(delta, task.estimate_days);
    let confidence = score_confidence(forecast.range, forecast.days, task.similarity_or_default());
    EnrichedTask {
        task: task.clone(),
        forecast,
        delta,
        risk,
        confidence,
    }
}

/// Active sort column and direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SortState {
    pub field: SortField,
    pub dir: SortDir,
}

impl SortState {
    /// Clicking the active column flips the direction; a new column starts ascending.
    pub fn click(self, field: SortField) -> SortState {
        if self.field == field {
            let dir = match self.dir {
                SortDir::Asc => SortDir::Desc,
                SortDir::Desc => SortDir::Asc,
            };
            SortState { field, dir }
        } else {
            SortState { field, dir: SortDir::Asc }
        }
    }
}

/// Search text, risk selector and sort applied to a view.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewQuery {
    pub search: String,
    pub risk: RiskFilter,
    pub sort: SortState,
}

/// Build the ordered list of rows to display.
pub fn compute_view(tasks: &[Task], query: &ViewQuery) -> Vec<EnrichedTask> {
    let needle = query.search.trim().to_lowercase();

    let mut rows: Vec<EnrichedTask> = tasks
        .iter()
        .map(enrich)
        .filter(|t| matches_search(&t.task, &needle))
        .filter(|t| query.risk.matches(t.risk))
        .collect();

    let SortState { field, dir } = query.sort;
    rows.sort_by(|a, b| {
        let ord = compare_by(a, b, field);
        match dir {
            SortDir::Asc => ord,
            SortDir::Desc => ord.reverse(),
        }
    });
    rows
}

/// Case-insensitive substring match on key and title. `needle` is already
/// trimmed and lowercased; an empty needle matches everything.
fn matches_search(task: &Task, needle: &str) -> bool {
    needle.is_empty()
        || task.key.to_lowercase().contains(needle)
        || task.title.to_lowercase().contains(needle)
}

fn numeric_value(t: &EnrichedTask, field: SortField) -> i64 {
    match field {
        SortField::Estimate => t.task.estimate_days as i64,
        SortField::Forecast => t.forecast.days as i64,
        SortField::Delta => t.delta,
        SortField::Risk => t.risk_rank() as i64,
        SortField::Confidence => t.confidence.score as i64,
        _ => 0,
    }
}

fn text_value(t: &EnrichedTask, field: SortField) -> &str {
    match field {
        SortField::Title => &t.task.title,
        SortField::Stage => t.task.stage_or_default().key(),
        SortField::Type => t.task.type_key(),
        _ => &t.task.key,
    }
}

fn compare_by(a: &EnrichedTask, b: &EnrichedTask, field: SortField) -> Ordering {
    if field.is_numeric() {
        numeric_value(a, field).cmp(&numeric_value(b, field))
    } else {
        natural_cmp(text_value(a, field), text_value(b, field))
    }
}

/// Case-insensitive string order that compares digit runs by value,
/// so "MORT-2" sorts before "MORT-10". Strings equal under that order are
/// split by case, lowercase first, then by code point.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut ai = a.chars().peekable();
    let mut bi = b.chars().peekable();
    loop {
        let (ca, cb) = match (ai.peek().copied(), bi.peek().copied()) {
            (None, None) => break,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(ca), Some(cb)) => (ca, cb),
        };
        if ca.is_ascii_digit() && cb.is_ascii_digit() {
            let na = take_digits(&mut ai);
            let nb = take_digits(&mut bi);
            let ord = cmp_digit_runs(&na, &nb);
            if ord != Ordering::Equal {
                return ord;
            }
        } else {
            let ord = ca.to_lowercase().cmp(cb.to_lowercase());
            if ord != Ordering::Equal {
                return ord;
            }
            ai.next();
            bi.next();
        }
    }
    tie_break(a, b)
}

fn tie_break(a: &str, b: &str) -> Ordering {
    for (ca, cb) in a.chars().zip(b.chars()) {
        if ca != cb {
            return match (ca.is_lowercase(), cb.is_lowercase()) {
                (true, false) if ca.to_uppercase().eq(cb.to_uppercase()) => Ordering::Less,
                (false, true) if ca.to_uppercase().eq(cb.to_uppercase()) => Ordering::Greater,
                _ => ca.cmp(&cb),
            };
        }
    }
    a.len().cmp(&b.len())
}

fn take_digits(it: &mut Peekable<Chars<'_>>) -> String {
    let mut run = String::new();
    while let Some(c) = it.peek().copied() {
        if !c.is_ascii_digit() {
            break;
        }
        run.push(c);
        it.next();
    }
    run
}

fn cmp_digit_runs(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}
