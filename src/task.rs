//! Task data structure and related functionality.
//!
//! This module defines the persisted `Task` record, its optional forecasting
//! factors, and the `NewTask` request used by the add operations. Persisted
//! data is read leniently: every field has a documented default and a value of
//! the wrong JSON type degrades to that default instead of failing the load.

use serde::{Deserialize, Serialize};

use crate::error::AddRejection;
use crate::fields::*;

/// Similarity assumed when a task carries none.
pub const DEFAULT_SIMILARITY: f64 = 0.5;
/// Similarity given to tasks created through the add operations.
pub const NEW_TASK_SIMILARITY: f64 = 0.6;

/// A work item as stored on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    #[serde(default, deserialize_with = "lenient::string")]
    pub key: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient::opt_string")]
    pub url: Option<String>,
    #[serde(default, deserialize_with = "lenient::estimate")]
    pub estimate_days: u32,
    /// Raw type key; unknown keys are preserved and displayed as plain tasks.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient::opt_string")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient::similarity")]
    pub similarity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient::factors")]
    pub factors: Option<Factors>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient::stage")]
    pub stage: Option<Stage>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient::opt_string")]
    pub bt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient::opt_string")]
    pub ft: Option<String>,
}

/// Categorical forecasting inputs. `None` tiers resolve to `Level::Medium`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Factors {
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient::level")]
    pub complexity: Option<Level>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient::level")]
    pub dependencies: Option<Level>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient::level")]
    pub novelty: Option<Level>,
    #[serde(default, deserialize_with = "lenient::flags")]
    pub flags: Flags,
}

/// Boolean risk flags. An absent flag and a flag set to `false` are the same.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flags {
    #[serde(default, skip_serializing_if = "is_false", deserialize_with = "lenient::flag")]
    pub external_api: bool,
    #[serde(default, skip_serializing_if = "is_false", deserialize_with = "lenient::flag")]
    pub integration: bool,
    #[serde(default, skip_serializing_if = "is_false", deserialize_with = "lenient::flag")]
    pub regulatory: bool,
    #[serde(default, skip_serializing_if = "is_false", deserialize_with = "lenient::flag")]
    pub mobile: bool,
    #[serde(default, skip_serializing_if = "is_false", deserialize_with = "lenient::flag")]
    pub web: bool,
}

fn is_false(b: &bool) -> bool {
    !*b
}

impl Task {
    /// Stage with the `in_progress` default applied.
    pub fn stage_or_default(&self) -> Stage {
        self.stage.unwrap_or_default()
    }

    /// Similarity with the neutral default applied.
    pub fn similarity_or_default(&self) -> f64 {
        self.similarity.unwrap_or(DEFAULT_SIMILARITY)
    }

    /// Stored type key, `task` when none is recorded.
    pub fn type_key(&self) -> &str {
        self.kind.as_deref().unwrap_or("task")
    }
}

/// A request to append a task to the collection.
#[derive(Debug, Clone, Default)]
pub struct NewTask {
    pub key: String,
    pub title: String,
    pub estimate_days: i64,
    pub url: Option<String>,
    pub complexity: Level,
    pub dependencies: Level,
    pub novelty: Level,
    pub flags: Flags,
    pub bt: Option<String>,
    pub ft: Option<String>,
    pub stage: Option<Stage>,
    pub kind: Option<TaskType>,
}

impl NewTask {
    /// Validate and build the stored task.
    ///
    /// Key and title are trimmed and must be non-empty; the estimate must be a
    /// positive number of days. Blank optional strings are dropped.
    pub fn into_task(self) -> Result<Task, AddRejection> {
        let key = self.key.trim().to_string();
        let title = self.title.trim().to_string();
        if key.is_empty() {
            return Err(AddRejection::EmptyKey);
        }
        if title.is_empty() {
            return Err(AddRejection::EmptyTitle);
        }
        if self.estimate_days <= 0 {
            return Err(AddRejection::NonPositiveEstimate(self.estimate_days));
        }
        let estimate_days = u32::try_from(self.estimate_days)
            .map_err(|_| AddRejection::EstimateTooLarge(self.estimate_days))?;

        Ok(Task {
            key,
            title,
            url: non_blank(self.url),
            estimate_days,
            kind: Some(self.kind.unwrap_or_default().key().to_string()),
            similarity: Some(NEW_TASK_SIMILARITY),
            factors: Some(Factors {
                complexity: Some(self.complexity),
                dependencies: Some(self.dependencies),
                novelty: Some(self.novelty),
                flags: self.flags,
            }),
            stage: Some(self.stage.unwrap_or_default()),
            bt: non_blank(self.bt),
            ft: non_blank(self.ft),
        })
    }
}

fn non_blank(s: Option<String>) -> Option<String> {
    s.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Field deserializers that coerce malformed values to their defaults.
mod lenient {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    use super::{Factors, Flags};
    use crate::fields::{Level, Stage};

    pub fn string<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::String(s) => s,
            Value::Number(n) => n.to_string(),
            _ => String::new(),
        })
    }

    pub fn opt_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::String(s) if !s.is_empty() => Some(s),
            _ => None,
        })
    }

    pub fn estimate<'de, D: Deserializer<'de>>(d: D) -> Result<u32, D::Error> {
        let raw = match Value::deserialize(d)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        Ok(match raw {
            Some(v) if v.is_finite() && v > 0.0 => v.floor().min(u32::MAX as f64) as u32,
            _ => 0,
        })
    }

    pub fn similarity<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::Number(n) => n.as_f64().filter(|v| v.is_finite()),
            _ => None,
        })
    }

    pub fn stage<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Stage>, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::String(s) => Stage::from_key(&s),
            _ => None,
        })
    }

    /// Empty or missing tiers mean the default; anything unrecognised has no
    /// effect on the forecast, which is exactly what `Low` does.
    pub fn level<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Level>, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::Null => None,
            Value::String(s) if s.is_empty() => None,
            Value::String(s) => Some(Level::from_key(&s).unwrap_or(Level::Low)),
            Value::Bool(false) => None,
            Value::Number(n) if n.as_f64() == Some(0.0) => None,
            _ => Some(Level::Low),
        })
    }

    pub fn flag<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
        Ok(truthy(&Value::deserialize(d)?))
    }

    pub fn flags<'de, D: Deserializer<'de>>(d: D) -> Result<Flags, D::Error> {
        let v = Value::deserialize(d)?;
        if !v.is_object() {
            return Ok(Flags::default());
        }
        Ok(serde_json::from_value(v).unwrap_or_default())
    }

    pub fn factors<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Factors>, D::Error> {
        let v = Value::deserialize(d)?;
        if !v.is_object() {
            return Ok(None);
        }
        Ok(serde_json::from_value(v).ok())
    }

    fn truthy(v: &Value) -> bool {
        match v {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => n.as_f64().map_or(false, |f| f != 0.0 && !f.is_nan()),
            Value::String(s) => !s.is_empty(),
            Value::Array(_) | Value::Object(_) => true,
        }
    }
}
