//! Add-task form for the terminal user interface.
//!
//! Field positions are fixed; text fields are edited in place, selectors cycle
//! with the arrow keys and flag checkboxes toggle with Space or the arrows.

use crate::fields::{Level, Stage, TaskType};
use crate::task::{Flags, NewTask};
use crate::tui::input::InputField;

/// Global order constants for the add form fields.
pub const KEY_GLOBAL_ORDER: usize = 0;
pub const TITLE_GLOBAL_ORDER: usize = 1;
pub const ESTIMATE_GLOBAL_ORDER: usize = 2;
pub const URL_GLOBAL_ORDER: usize = 3;
pub const COMPLEXITY_GLOBAL_ORDER: usize = 4;
pub const DEPENDENCIES_GLOBAL_ORDER: usize = 5;
pub const NOVELTY_GLOBAL_ORDER: usize = 6;
pub const EXTERNAL_API_GLOBAL_ORDER: usize = 7;
pub const INTEGRATION_GLOBAL_ORDER: usize = 8;
pub const REGULATORY_GLOBAL_ORDER: usize = 9;
pub const MOBILE_GLOBAL_ORDER: usize = 10;
pub const WEB_GLOBAL_ORDER: usize = 11;
pub const STAGE_GLOBAL_ORDER: usize = 12;
pub const TYPE_GLOBAL_ORDER: usize = 13;
pub const BT_GLOBAL_ORDER: usize = 14;
pub const FT_GLOBAL_ORDER: usize = 15;

const FIELD_COUNT: usize = 16;

pub const LEVELS: [Level; 3] = [Level::Low, Level::Medium, Level::High];
pub const TYPES: [TaskType; 9] = [
    TaskType::Feature,
    TaskType::Task,
    TaskType::Bug,
    TaskType::Improvement,
    TaskType::Spike,
    TaskType::Doc,
    TaskType::Epic,
    TaskType::Bt,
    TaskType::Ft,
];

/// Add form state.
pub struct TaskForm {
    pub key: InputField,
    pub title: InputField,
    pub estimate: InputField,
    pub url: InputField,
    pub bt: InputField,
    pub ft: InputField,
    pub complexity: usize,
    pub dependencies: usize,
    pub novelty: usize,
    pub flags: Flags,
    pub stage: usize,
    pub kind: usize,
    pub current_field: usize,
}

impl Default for TaskForm {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskForm {
    /// Empty form: medium tiers, no flags, in progress, feature.
    pub fn new() -> Self {
        let medium = LEVELS.iter().position(|&l| l == Level::Medium).unwrap_or(0);
        let mut form = Self {
            key: InputField::new(),
            title: InputField::new(),
            estimate: InputField::new(),
            url: InputField::new(),
            bt: InputField::new(),
            ft: InputField::new(),
            complexity: medium,
            dependencies: medium,
            novelty: medium,
            flags: Flags::default(),
            stage: Stage::ALL.iter().position(|&s| s == Stage::InProgress).unwrap_or(0),
            kind: 0,
            current_field: KEY_GLOBAL_ORDER,
        };
        form.update_active_field();
        form
    }

    fn text_field_mut(&mut self, field: usize) -> Option<&mut InputField> {
        match field {
            KEY_GLOBAL_ORDER => Some(&mut self.key),
            TITLE_GLOBAL_ORDER => Some(&mut self.title),
            ESTIMATE_GLOBAL_ORDER => Some(&mut self.estimate),
            URL_GLOBAL_ORDER => Some(&mut self.url),
            BT_GLOBAL_ORDER => Some(&mut self.bt),
            FT_GLOBAL_ORDER => Some(&mut self.ft),
            _ => None,
        }
    }

    fn flag_mut(&mut self, field: usize) -> Option<&mut bool> {
        match field {
            EXTERNAL_API_GLOBAL_ORDER => Some(&mut self.flags.external_api),
            INTEGRATION_GLOBAL_ORDER => Some(&mut self.flags.integration),
            REGULATORY_GLOBAL_ORDER => Some(&mut self.flags.regulatory),
            MOBILE_GLOBAL_ORDER => Some(&mut self.flags.mobile),
            WEB_GLOBAL_ORDER => Some(&mut self.flags.web),
            _ => None,
        }
    }

    pub fn next_field(&mut self) {
        self.current_field = (self.current_field + 1) % FIELD_COUNT;
        self.update_active_field();
    }

    pub fn prev_field(&mut self) {
        self.current_field = if self.current_field == 0 {
            FIELD_COUNT - 1
        } else {
            self.current_field - 1
        };
        self.update_active_field();
    }

    /// Mark only the focused text field as active.
    pub fn update_active_field(&mut self) {
        for f in [
            &mut self.key,
            &mut self.title,
            &mut self.estimate,
            &mut self.url,
            &mut self.bt,
            &mut self.ft,
        ] {
            f.active = false;
        }
        let current = self.current_field;
        if let Some(f) = self.text_field_mut(current) {
            f.active = true;
        }
    }

    /// Type into the focused text field; Space toggles a focused flag.
    pub fn handle_char(&mut self, c: char) {
        let current = self.current_field;
        if let Some(f) = self.text_field_mut(current) {
            f.handle_char(c);
        } else if c == ' ' {
            if let Some(flag) = self.flag_mut(current) {
                *flag = !*flag;
            }
        }
    }

    pub fn handle_backspace(&mut self) {
        let current = self.current_field;
        if let Some(f) = self.text_field_mut(current) {
            f.handle_backspace();
        }
    }

    pub fn handle_delete(&mut self) {
        let current = self.current_field;
        if let Some(f) = self.text_field_mut(current) {
            f.handle_delete();
        }
    }

    /// Move the cursor, cycle a selector, or toggle a flag.
    pub fn handle_left_right(&mut self, right: bool) {
        let current = self.current_field;
        if let Some(f) = self.text_field_mut(current) {
            if right { f.move_cursor_right() } else { f.move_cursor_left() }
            return;
        }
        if let Some(flag) = self.flag_mut(current) {
            *flag = !*flag;
            return;
        }
        match current {
            COMPLEXITY_GLOBAL_ORDER => self.complexity = step(self.complexity, LEVELS.len(), right),
            DEPENDENCIES_GLOBAL_ORDER => self.dependencies = step(self.dependencies, LEVELS.len(), right),
            NOVELTY_GLOBAL_ORDER => self.novelty = step(self.novelty, LEVELS.len(), right),
            STAGE_GLOBAL_ORDER => self.stage = step(self.stage, Stage::ALL.len(), right),
            TYPE_GLOBAL_ORDER => self.kind = step(self.kind, TYPES.len(), right),
            _ => {}
        }
    }

    pub fn complexity(&self) -> Level {
        LEVELS[self.complexity % LEVELS.len()]
    }

    pub fn dependencies(&self) -> Level {
        LEVELS[self.dependencies % LEVELS.len()]
    }

    pub fn novelty(&self) -> Level {
        LEVELS[self.novelty % LEVELS.len()]
    }

    pub fn stage(&self) -> Stage {
        Stage::ALL[self.stage % Stage::ALL.len()]
    }

    pub fn kind(&self) -> TaskType {
        TYPES[self.kind % TYPES.len()]
    }

    /// Build the add request. Validation happens when the board applies it;
    /// an unparsable estimate becomes 0 and is rejected there.
    pub fn to_request(&self) -> NewTask {
        NewTask {
            key: self.key.value.clone(),
            title: self.title.value.clone(),
            estimate_days: parse_estimate(&self.estimate.value),
            url: Some(self.url.value.clone()),
            complexity: self.complexity(),
            dependencies: self.dependencies(),
            novelty: self.novelty(),
            flags: self.flags,
            bt: Some(self.bt.value.clone()),
            ft: Some(self.ft.value.clone()),
            stage: Some(self.stage()),
            kind: Some(self.kind()),
        }
    }
}

fn step(index: usize, len: usize, forward: bool) -> usize {
    if forward {
        (index + 1) % len
    } else if index == 0 {
        len - 1
    } else {
        index - 1
    }
}

/// Whole days from the estimate text; fractions are floored.
fn parse_estimate(text: &str) -> i64 {
    let text = text.trim();
    if let Ok(n) = text.parse::<i64>() {
        return n;
    }
    match text.parse::<f64>() {
        Ok(f) if f.is_finite() => f.floor() as i64,
        _ => 0,
    }
}
