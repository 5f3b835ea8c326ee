//! Task storage and display helpers.
//!
//! This module provides the `TaskStore` that loads and saves the task
//! collection as a JSON file (falling back to the demo dataset whenever the
//! file is missing or unusable), the "last updated" sidecar timestamp, and the
//! label and table formatting shared by the CLI and the board.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde_json::Value;

use crate::error::StoreResult;
use crate::explain::Explanation;
use crate::fields::*;
use crate::schedule::{self, format_date, format_date_range, Development};
use crate::task::{Factors, Flags, Task};
use crate::view::EnrichedTask;

/// File-backed task collection.
#[derive(Debug, Clone)]
pub struct TaskStore {
    path: PathBuf,
}

impl TaskStore {
    pub fn new(path: &Path) -> Self {
        TaskStore { path: path.to_path_buf() }
    }

    /// Load the collection. Missing, unreadable, non-list or unparsable data
    /// yields the demo dataset instead of an error.
    pub fn load(&self) -> Vec<Task> {
        if !self.path.exists() {
            tracing::info!("No task file at {}, using demo data", self.path.display());
            return demo_tasks();
        }
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!("Error reading {}, using demo data: {}", self.path.display(), e);
                return demo_tasks();
            }
        };
        if raw.trim().is_empty() {
            return demo_tasks();
        }
        match serde_json::from_str::<Value>(&raw) {
            Ok(value @ Value::Array(_)) => match serde_json::from_value(value) {
                Ok(tasks) => tasks,
                Err(e) => {
                    tracing::warn!("Malformed task entries in {}, using demo data: {}", self.path.display(), e);
                    demo_tasks()
                }
            },
            Ok(_) => {
                tracing::warn!("{} does not hold a task list, using demo data", self.path.display());
                demo_tasks()
            }
            Err(e) => {
                tracing::warn!("Error parsing {}, using demo data: {}", self.path.display(), e);
                demo_tasks()
            }
        }
    }

    /// Save the collection using an atomic write (temp file + rename).
    pub fn save(&self, tasks: &[Task]) -> StoreResult<()> {
        let data = serde_json::to_string_pretty(tasks)?;
        write_atomic(&self.path, data.as_bytes())?;
        tracing::debug!("Saved {} tasks to {}", tasks.len(), self.path.display());
        Ok(())
    }

    fn updated_path(&self) -> PathBuf {
        self.path.with_extension("updated")
    }

    /// When the collection was last changed. Unreadable values count as absent.
    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        let raw = fs::read_to_string(self.updated_path()).ok()?;
        let millis = raw.trim().parse::<i64>().ok()?;
        Utc.timestamp_millis_opt(millis).single()
    }

    /// Record a change at `at`.
    pub fn touch(&self, at: DateTime<Utc>) -> StoreResult<()> {
        write_atomic(&self.updated_path(), at.timestamp_millis().to_string().as_bytes())?;
        Ok(())
    }

    /// Return the recorded timestamp, recording `now` first if there is none.
    pub fn ensure_last_updated(&self, now: DateTime<Utc>) -> StoreResult<DateTime<Utc>> {
        match self.last_updated() {
            Some(ts) => Ok(ts),
            None => {
                self.touch(now)?;
                Ok(now)
            }
        }
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut tmp_name = path.as_os_str().to_os_string();
    tmp_name.push(".tmp");
    let tmp = PathBuf::from(tmp_name);
    let mut f = File::create(&tmp)?;
    f.write_all(bytes)?;
    f.flush()?;
    fs::rename(tmp, path)?;
    Ok(())
}

fn demo(
    key: &str,
    title: &str,
    estimate_days: u32,
    kind: &str,
    similarity: f64,
    levels: [Level; 3],
    flags: Flags,
) -> Task {
    Task {
        key: key.to_string(),
        title: title.to_string(),
        url: None,
        estimate_days,
        kind: Some(kind.to_string()),
        similarity: Some(similarity),
        factors: Some(Factors {
            complexity: Some(levels[0]),
            dependencies: Some(levels[1]),
            novelty: Some(levels[2]),
            flags,
        }),
        stage: None,
        bt: None,
        ft: None,
    }
}

/// The fixed demo dataset used when no usable task file exists.
pub fn demo_tasks() -> Vec<Task> {
    use Level::*;
    let none = Flags::default();
    vec![
        demo("MORT-101", "State-backed mortgage: update rate conditions", 3, "improvement", 0.6,
             [Medium, Medium, Medium], Flags { regulatory: true, web: true, ..none }),
        demo("MORT-102", "Payment calculation integration in the mobile app", 8, "feature", 0.55,
             [High, High, Medium], Flags { integration: true, mobile: true, ..none }),
        demo("MORT-103", "Connect insurance calculator (partner API) to the application form", 5, "ft", 0.7,
             [Medium, High, Low], Flags { external_api: true, integration: true, ..none }),
        demo("MORT-104", "Family mortgage: add tariffs and restrictions", 10, "epic", 0.45,
             [High, Medium, High], Flags { regulatory: true, web: true, ..none }),
        demo("MORT-105", "Migrate regional reference data for subsidies", 4, "task", 0.8,
             [Medium, Medium, Low], Flags { web: true, ..none }),
        demo("MORT-106", "Generate PDF offer with dynamic parameters", 6, "doc", 0.5,
             [Medium, Medium, Medium], Flags { web: true, ..none }),
        demo("MORT-107", "Pre-approval via credit bureau (external API)", 7, "bt", 0.65,
             [Medium, High, Medium], Flags { external_api: true, ..none }),
        demo("MORT-108", "Rework the rate showcase on the website (A/B)", 5, "improvement", 0.75,
             [Low, Medium, Medium], Flags { web: true, ..none }),
        demo("MORT-109", "Agree changes with the legal department", 2, "task", 0.4,
             [Low, High, Medium], Flags { regulatory: true, ..none }),
        demo("MORT-110", "Update the scoring model for sole proprietors", 12, "spike", 0.35,
             [High, High, High], Flags { external_api: false, integration: true, ..none }),
        demo("MORT-111", "Fix interest rate calculation error", 2, "bug", 0.6,
             [Low, Medium, Low], Flags { web: true, ..none }),
    ]
}

/// Format a stage for display.
pub fn format_stage(s: Stage) -> &'static str {
    match s {
        Stage::Backlog => "Backlog",
        Stage::InProgress => "In development",
        Stage::ReadyForTest => "Ready for test",
        Stage::Testing => "Testing",
        Stage::AwaitingAcceptance => "Awaiting acceptance",
        Stage::Done => "Done",
    }
}

/// Format a stored type key for display; unknown keys read as "Task".
pub fn format_type(key: &str) -> &'static str {
    match TaskType::from_key(key) {
        Some(TaskType::Feature) => "Feature",
        Some(TaskType::Task) | None => "Task",
        Some(TaskType::Bug) => "Bug",
        Some(TaskType::Improvement) => "Improvement",
        Some(TaskType::Spike) => "Spike",
        Some(TaskType::Doc) => "Documentation",
        Some(TaskType::Epic) => "Epic",
        Some(TaskType::Bt) => "Business requirement",
        Some(TaskType::Ft) => "Functional requirement",
    }
}

/// Single-glyph icon for a stored type key.
pub fn type_glyph(key: &str) -> &'static str {
    match TaskType::from_key(key) {
        Some(TaskType::Feature) => "★",
        Some(TaskType::Task) => "☑",
        Some(TaskType::Bug) => "✱",
        Some(TaskType::Improvement) => "▲",
        Some(TaskType::Spike) => "◆",
        Some(TaskType::Doc) => "≡",
        Some(TaskType::Epic) => "✦",
        Some(TaskType::Bt) => "■",
        Some(TaskType::Ft) => "☰",
        None => "↑",
    }
}

/// Format a risk tier for display.
pub fn format_risk(r: RiskTier) -> &'static str {
    match r {
        RiskTier::Low => "Low",
        RiskTier::Medium => "Medium",
        RiskTier::High => "High",
    }
}

/// Format a confidence tier for display.
pub fn format_confidence(c: Confidence) -> &'static str {
    match c {
        Confidence::Low => "Low",
        Confidence::Medium => "Medium",
        Confidence::High => "High",
    }
}

/// Format a forecast delta: "0", "▴3" or "▾2".
pub fn format_delta(delta: i64) -> String {
    match delta {
        0 => "0".into(),
        d if d > 0 => format!("▴{}", d),
        d => format!("▾{}", d.unsigned_abs()),
    }
}

/// Relative age of the last update ("just now", "5 min ago", "3 h ago", "2 d ago").
pub fn format_time_ago(ts: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    let Some(ts) = ts else {
        return "—".into();
    };
    let sec = (now - ts).num_seconds();
    if sec < 30 {
        return "just now".into();
    }
    let min = sec / 60;
    if min < 60 {
        return format!("{} min ago", min);
    }
    let hr = min / 60;
    if hr < 24 {
        return format!("{} h ago", hr);
    }
    format!("{} d ago", hr / 24)
}

/// Forecast cell text in either days or calendar form.
pub fn format_forecast_cell(row: &EnrichedTask, mode: ViewMode, today: NaiveDate) -> String {
    match mode {
        ViewMode::Days => row.forecast.days.to_string(),
        ViewMode::Dates => {
            let p = schedule::project(&row.forecast, row.task.stage_or_default(), today);
            let dev = match p.development {
                Development::Completed => "done".to_string(),
                Development::Expected { date, .. } => format_date(date),
            };
            format!("dev {} | ship {}", dev, format_date_range(p.delivery))
        }
    }
}

/// Print enriched rows as a table.
pub fn print_table(rows: &[EnrichedTask], mode: ViewMode, today: NaiveDate) {
    println!(
        "{:<10} {:<13} {:<20} {:>4} {:<30} {:>6} {:<7} {:<12} {}",
        "Key", "Type", "Stage", "Est", "Forecast", "Δ", "Risk", "Confidence", "Title"
    );
    for r in rows {
        let confidence = format!("{} ({}%)", format_confidence(r.confidence.level), r.confidence.score);
        println!(
            "{:<10} {:<13} {:<20} {:>4} {:<30} {:>6} {:<7} {:<12} {}",
            truncate(&r.task.key, 10),
            truncate(format_type(r.task.type_key()), 13),
            format_stage(r.task.stage_or_default()),
            r.task.estimate_days,
            format_forecast_cell(r, mode, today),
            format_delta(r.delta),
            format_risk(r.risk),
            confidence,
            r.task.title
        );
    }
}

/// Render an explanation as plain text lines.
pub fn format_explanation(e: &Explanation) -> Vec<String> {
    let mut lines = vec![format!("{} - forecast explanation", e.key)];
    if let Some([bt, ft, key]) = &e.chain {
        lines.push(format!("Chain: {} → {} → {}", bt, ft, key));
    }
    lines.push(format!("Current stage: {}", format_stage(e.stage)));
    lines.push(format!(
        "Forecast: {} d  risk {}  confidence {} ({}%)",
        e.forecast_days,
        format_risk(e.risk),
        format_confidence(e.confidence.level),
        e.confidence.score
    ));
    lines.push(format!("Confidence range: {}–{} d", e.range.low, e.range.high));
    lines.push(format!("Rule of ×2: {} d", e.doubled_estimate));
    lines.push(match e.projection.development {
        Development::Completed => "Development: completed".to_string(),
        Development::Expected { date, days } => {
            format!("Development (expected): {} ({} d)", format_date(date), days)
        }
    });
    lines.push(format!("Delivery (≈80%): {}", format_date_range(e.projection.delivery)));
    for reason in &e.reasons {
        lines.push(format!("  • {}", reason));
    }
    lines.push(format!(
        "Estimate vs forecast: {} → {} (Δ {} d)",
        e.estimate_days, e.forecast_days, e.delta
    ));
    lines
}

/// Quote a CSV field when it contains a separator, quote or newline.
pub fn escape_csv(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

/// CSV export of enriched rows, header included.
pub fn rows_to_csv(rows: &[EnrichedTask]) -> String {
    let mut csv = String::from(
        "key,title,type,stage,estimate_days,forecast_days,range_low,range_high,delta,risk,confidence,conf_score\n",
    );
    for r in rows {
        csv.push_str(&format!(
            "{},{},{},{},{},{},{},{},{},{},{},{}\n",
            escape_csv(&r.task.key),
            escape_csv(&r.task.title),
            escape_csv(r.task.type_key()),
            r.task.stage_or_default().key(),
            r.task.estimate_days,
            r.forecast.days,
            r.forecast.range.low,
            r.forecast.range.high,
            r.delta,
            r.risk.key(),
            r.confidence.level.key(),
            r.confidence.score
        ));
    }
    csv
}

/// Truncate a string to a maximum width, adding ellipsis if needed.
pub fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        s.to_string()
    } else {
        let mut out = String::new();
        for (i, ch) in s.chars().enumerate() {
            if i + 1 >= width {
                out.push('…');
                break;
            }
            out.push(ch);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_loads_demo_data() {
        let dir = tempdir().unwrap();
        let store = TaskStore::new(&dir.path().join("tasks.json"));
        assert_eq!(store.load(), demo_tasks());
    }

    #[test]
    fn test_invalid_payloads_fall_back_to_demo_data() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tasks.json");
        let store = TaskStore::new(&path);
        for payload in ["{not json", r#"{"tasks": []}"#, "42", "[1, 2]", ""] {
            fs::write(&path, payload).unwrap();
            assert_eq!(store.load(), demo_tasks(), "payload {:?}", payload);
        }
    }

    #[test]
    fn test_empty_list_is_kept() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tasks.json");
        fs::write(&path, "[]").unwrap();
        assert!(TaskStore::new(&path).load().is_empty());
    }

    #[test]
    fn test_save_load_round_trip() {
        let dir = tempdir().unwrap();
        let store = TaskStore::new(&dir.path().join("nested").join("tasks.json"));
        let mut tasks = demo_tasks();
        tasks[0].stage = Some(Stage::Testing);
        tasks[1].bt = Some("BT-7".into());
        tasks[2].factors = None;
        tasks[3].similarity = None;
        store.save(&tasks).unwrap();
        assert_eq!(store.load(), tasks);
    }

    #[test]
    fn test_saved_json_uses_camel_case_keys() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tasks.json");
        TaskStore::new(&path).save(&demo_tasks()[..1]).unwrap();
        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"estimateDays\": 3"));
        assert!(raw.contains("\"type\": \"improvement\""));
        assert!(raw.contains("\"regulatory\": true"));
    }

    #[test]
    fn test_last_updated_sidecar() {
        let dir = tempdir().unwrap();
        let store = TaskStore::new(&dir.path().join("tasks.json"));
        assert_eq!(store.last_updated(), None);
        let now = Utc.timestamp_millis_opt(1_760_000_000_000).unwrap();
        assert_eq!(store.ensure_last_updated(now).unwrap(), now);
        let later = now + Duration::hours(1);
        assert_eq!(store.ensure_last_updated(later).unwrap(), now);
        store.touch(later).unwrap();
        assert_eq!(store.last_updated(), Some(later));

        fs::write(dir.path().join("tasks.updated"), "garbage").unwrap();
        assert_eq!(store.last_updated(), None);
    }

    #[test]
    fn test_format_time_ago() {
        let now = Utc.timestamp_millis_opt(1_760_000_000_000).unwrap();
        assert_eq!(format_time_ago(None, now), "—");
        assert_eq!(format_time_ago(Some(now - Duration::seconds(10)), now), "just now");
        assert_eq!(format_time_ago(Some(now - Duration::minutes(5)), now), "5 min ago");
        assert_eq!(format_time_ago(Some(now - Duration::hours(3)), now), "3 h ago");
        assert_eq!(format_time_ago(Some(now - Duration::hours(50)), now), "2 d ago");
    }

    #[test]
    fn test_labels_and_delta() {
        assert_eq!(format_delta(0), "0");
        assert_eq!(format_delta(4), "▴4");
        assert_eq!(format_delta(-2), "▾2");
        assert_eq!(format_type("spike"), "Spike");
        assert_eq!(format_type("mystery"), "Task");
        assert_eq!(type_glyph("mystery"), "↑");
        assert_eq!(format_stage(Stage::default()), "In development");
    }

    #[test]
    fn test_csv_export() {
        let mut tasks = demo_tasks();
        tasks.truncate(1);
        tasks[0].title = "Rates, \"special\" case".into();
        let rows = crate::view::compute_view(&tasks, &Default::default());
        let csv = rows_to_csv(&rows);
        let mut lines = csv.lines();
        assert!(lines.next().unwrap().starts_with("key,title,type"));
        assert_eq!(
            lines.next().unwrap(),
            "MORT-101,\"Rates, \"\"special\"\" case\",improvement,in_progress,3,4,1,8,1,high,high,100"
        );
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn test_explanation_text() {
        let mut task = demo_tasks()[0].clone();
        task.bt = Some("BT-1".into());
        let row = crate::view::enrich(&task);
        let today = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        let lines = format_explanation(&crate::explain::explain(&row, today));
        assert_eq!(lines[0], "MORT-101 - forecast explanation");
        assert_eq!(lines[1], "Chain: BT-1 → FT? → MORT-101");
        assert!(lines.iter().any(|l| l == "  • Regulatory: +12%"));
        assert_eq!(lines.last().unwrap(), "Estimate vs forecast: 3 → 4 (Δ 1 d)");
    }

    #[test]
    fn test_demo_keys_are_unique() {
        let tasks = demo_tasks();
        let mut keys: Vec<&str> = tasks.iter().map(|t| t.key.as_str()).collect();
        keys.sort_unstable();
        keys.dedup();
        assert_eq!(keys.len(), tasks.len());
    }
}
