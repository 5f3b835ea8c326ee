//! Board state and event handling.
//!
//! `BoardState` is an immutable snapshot of everything a view depends on: the
//! task collection, the query, the presentation mode and the expanded row.
//! Each event produces a new snapshot; `Board` owns the current one, persists
//! the changes that touch the collection, and bumps a revision counter that
//! renderers watch to know when to recompute.

use chrono::{DateTime, Utc};

use crate::db::{demo_tasks, TaskStore};
use crate::error::{AddRejection, StoreResult};
use crate::fields::*;
use crate::task::{NewTask, Task};
use crate::view::{compute_view, EnrichedTask, ViewQuery};

/// Something the user did.
#[derive(Debug, Clone)]
pub enum BoardEvent {
    Search(String),
    SortClick(SortField),
    FilterRisk(RiskFilter),
    ToggleViewMode,
    /// Expand the row with this key, or collapse it if it is already open.
    ToggleDetails(String),
    AddTask(NewTask),
    Reset,
}

/// Snapshot of the board.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoardState {
    pub tasks: Vec<Task>,
    pub query: ViewQuery,
    pub view_mode: ViewMode,
    pub expanded_key: Option<String>,
    pub last_updated: Option<DateTime<Utc>>,
}

/// Result of applying an event to a snapshot.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// Query or presentation changed; nothing to persist.
    View(BoardState),
    /// The collection changed and must be saved.
    Collection(BoardState),
    Rejected(AddRejection),
}

impl BoardState {
    pub fn new(tasks: Vec<Task>, last_updated: Option<DateTime<Utc>>) -> Self {
        BoardState {
            tasks,
            last_updated,
            ..BoardState::default()
        }
    }

    /// Ordered rows for the current query.
    pub fn view(&self) -> Vec<EnrichedTask> {
        compute_view(&self.tasks, &self.query)
    }

    /// Compute the snapshot that follows `event`. `self` is left untouched.
    pub fn apply(&self, event: BoardEvent, now: DateTime<Utc>) -> Transition {
        let mut next = self.clone();
        match event {
            BoardEvent::Search(text) => next.query.search = text,
            BoardEvent::SortClick(field) => next.query.sort = next.query.sort.click(field),
            BoardEvent::FilterRisk(risk) => next.query.risk = risk,
            BoardEvent::ToggleViewMode => next.view_mode = next.view_mode.toggle(),
            BoardEvent::ToggleDetails(key) => {
                next.expanded_key = if next.expanded_key.as_deref() == Some(key.as_str()) {
                    None
                } else {
                    Some(key)
                };
            }
            BoardEvent::AddTask(req) => {
                let task = match req.into_task() {
                    Ok(task) => task,
                    Err(rejection) => return Transition::Rejected(rejection),
                };
                next.tasks.push(task);
                next.last_updated = Some(now);
                return Transition::Collection(next);
            }
            BoardEvent::Reset => {
                next.tasks = demo_tasks();
                next.expanded_key = None;
                next.last_updated = Some(now);
                return Transition::Collection(next);
            }
        }
        Transition::View(next)
    }
}

/// Outcome of dispatching an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    Applied,
    Rejected(AddRejection),
}

/// Owner of the current snapshot and its persistence.
#[derive(Debug)]
pub struct Board {
    store: TaskStore,
    state: BoardState,
    revision: u64,
}

impl Board {
    /// Load the collection and make sure a "last updated" time is recorded.
    /// Never fails: an unwritable timestamp only costs the recorded time.
    pub fn open(store: TaskStore, now: DateTime<Utc>) -> Self {
        let tasks = store.load();
        let last_updated = match store.ensure_last_updated(now) {
            Ok(ts) => ts,
            Err(e) => {
                tracing::warn!("Could not record last-updated time: {}", e);
                now
            }
        };
        Board {
            store,
            state: BoardState::new(tasks, Some(last_updated)),
            revision: 0,
        }
    }

    pub fn state(&self) -> &BoardState {
        &self.state
    }

    /// Incremented every time the snapshot is replaced.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Apply an event, saving the collection first when it changed.
    /// A rejected add or a failed save leaves both the snapshot and the files
    /// untouched; a failed timestamp write does not stop the change.
    pub fn dispatch(&mut self, event: BoardEvent, now: DateTime<Utc>) -> StoreResult<Dispatch> {
        let next = match self.state.apply(event, now) {
            Transition::View(next) => next,
            Transition::Collection(next) => {
                self.store.save(&next.tasks)?;
                // The collection is on disk from here on; the state must follow it.
                if let Err(e) = self.store.touch(now) {
                    tracing::warn!("Could not record last-updated time: {}", e);
                }
                next
            }
            Transition::Rejected(rejection) => {
                tracing::warn!("Add request rejected: {}", rejection);
                return Ok(Dispatch::Rejected(rejection));
            }
        };
        self.state = next;
        self.revision += 1;
        Ok(Dispatch::Applied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::fs;
    use tempfile::tempdir;

    fn now() -> DateTime<Utc> {
        Utc.timestamp_millis_opt(1_760_000_000_000).unwrap()
    }

    fn request(key: &str, title: &str, estimate: i64) -> NewTask {
        NewTask {
            key: key.into(),
            title: title.into(),
            estimate_days: estimate,
            ..NewTask::default()
        }
    }

    #[test]
    fn test_apply_does_not_mutate_current_state() {
        let state = BoardState::new(demo_tasks(), None);
        let before = state.clone();
        let next = state.apply(BoardEvent::Search("mort".into()), now());
        assert_eq!(state, before);
        match next {
            Transition::View(s) => assert_eq!(s.query.search, "mort"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_toggle_details_opens_one_row_at_a_time() {
        let s = BoardState::new(demo_tasks(), None);
        let Transition::View(s) = s.apply(BoardEvent::ToggleDetails("MORT-101".into()), now()) else {
            panic!("expected view transition");
        };
        assert_eq!(s.expanded_key.as_deref(), Some("MORT-101"));
        let Transition::View(s) = s.apply(BoardEvent::ToggleDetails("MORT-102".into()), now()) else {
            panic!("expected view transition");
        };
        assert_eq!(s.expanded_key.as_deref(), Some("MORT-102"));
        let Transition::View(s) = s.apply(BoardEvent::ToggleDetails("MORT-102".into()), now()) else {
            panic!("expected view transition");
        };
        assert_eq!(s.expanded_key, None);
    }

    #[test]
    fn test_add_persists_and_bumps_revision() {
        let dir = tempdir().unwrap();
        let store = TaskStore::new(&dir.path().join("tasks.json"));
        let mut board = Board::open(store.clone(), now());
        let count = board.state().tasks.len();

        let later = now() + chrono::Duration::minutes(2);
        let out = board.dispatch(BoardEvent::AddTask(request("MORT-200", "Escrow", 4)), later).unwrap();
        assert_eq!(out, Dispatch::Applied);
        assert_eq!(board.revision(), 1);
        assert_eq!(board.state().tasks.len(), count + 1);
        assert_eq!(board.state().last_updated, Some(later));
        assert_eq!(store.load(), board.state().tasks);
        assert_eq!(store.last_updated(), Some(later));
    }

    #[test]
    fn test_rejected_add_is_a_no_op() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tasks.json");
        let store = TaskStore::new(&path);
        let mut board = Board::open(store, now());
        let before = board.state().clone();

        let out = board.dispatch(BoardEvent::AddTask(request("MORT-200", "", 4)), now()).unwrap();
        assert_eq!(out, Dispatch::Rejected(AddRejection::EmptyTitle));
        let out = board.dispatch(BoardEvent::AddTask(request("MORT-200", "Escrow", 0)), now()).unwrap();
        assert_eq!(out, Dispatch::Rejected(AddRejection::NonPositiveEstimate(0)));

        assert_eq!(board.state(), &before);
        assert_eq!(board.revision(), 0);
        assert!(!path.exists());
    }

    #[test]
    fn test_reset_restores_demo_data() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tasks.json");
        fs::write(&path, r#"[{"key": "X-1", "title": "Only", "estimateDays": 1}]"#).unwrap();
        let mut board = Board::open(TaskStore::new(&path), now());
        assert_eq!(board.state().tasks.len(), 1);

        board.dispatch(BoardEvent::ToggleDetails("X-1".into()), now()).unwrap();
        board.dispatch(BoardEvent::Reset, now()).unwrap();
        assert_eq!(board.state().tasks, demo_tasks());
        assert_eq!(board.state().expanded_key, None);
        assert_eq!(TaskStore::new(&path).load(), demo_tasks());
    }

    #[test]
    fn test_view_reflects_query_events() {
        let dir = tempdir().unwrap();
        let mut board = Board::open(TaskStore::new(&dir.path().join("t.json")), now());
        board.dispatch(BoardEvent::FilterRisk(RiskFilter::High), now()).unwrap();
        board.dispatch(BoardEvent::SortClick(SortField::Delta), now()).unwrap();
        let rows = board.state().view();
        assert!(!rows.is_empty());
        assert!(rows.iter().all(|r| r.risk == RiskTier::High));
        assert!(rows.windows(2).all(|w| w[0].delta <= w[1].delta));
    }

    #[test]
    fn test_open_survives_unwritable_timestamp() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        fs::write(&blocker, "plain file").unwrap();
        let store = TaskStore::new(&blocker.join("tasks.json"));

        let board = Board::open(store, now());
        assert_eq!(board.state().tasks, demo_tasks());
        assert_eq!(board.state().last_updated, Some(now()));
        assert_eq!(board.revision(), 0);
    }

    #[test]
    fn test_add_commits_when_timestamp_write_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tasks.json");
        let sidecar = dir.path().join("tasks.updated");
        fs::create_dir(&sidecar).unwrap();
        fs::write(sidecar.join("keep"), "x").unwrap();

        let store = TaskStore::new(&path);
        let mut board = Board::open(store.clone(), now());
        let count = board.state().tasks.len();

        let later = now() + chrono::Duration::minutes(5);
        let out = board.dispatch(BoardEvent::AddTask(request("MORT-300", "Escrow", 2)), later).unwrap();
        assert_eq!(out, Dispatch::Applied);
        assert_eq!(board.revision(), 1);
        assert_eq!(board.state().tasks.len(), count + 1);
        assert_eq!(store.load(), board.state().tasks);
        assert_eq!(board.state().last_updated, Some(later));
    }
}
