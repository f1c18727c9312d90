//! Request bodies accepted by the task API.
//!
//! Field aliases (`task_name`, `is_completed`) and integer completion flags are
//! accepted so that older clients sending `{"is_completed": 1}` keep working.

use serde::{Deserialize, Deserializer, Serialize};

/// Body of `POST /api/tasks`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTask {
    #[serde(default, alias = "task_name")]
    pub name: Option<String>,
}

impl NewTask {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
        }
    }
}

/// Body of `PATCH /api/tasks/:id`: a sparse set of updatable fields.
///
/// Only `completed` and `name` are recognised; any other JSON key is dropped
/// during deserialization and can never reach the UPDATE statement.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskPatch {
    #[serde(
        default,
        alias = "is_completed",
        deserialize_with = "deserialize_flag",
        skip_serializing_if = "Option::is_none"
    )]
    pub completed: Option<bool>,
    #[serde(default, alias = "task_name", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl TaskPatch {
    pub fn completed(completed: bool) -> Self {
        Self {
            completed: Some(completed),
            name: None,
        }
    }

    pub fn renamed(name: impl Into<String>) -> Self {
        Self {
            completed: None,
            name: Some(name.into()),
        }
    }

    /// True when no updatable field was supplied.
    pub fn is_empty(&self) -> bool {
        self.completed.is_none() && self.name.is_none()
    }
}

/// Accepts `true`/`false` as well as integers, where any non-zero value means completed.
fn deserialize_flag<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Int(i64),
    }

    Ok(Option::<Flag>::deserialize(deserializer)?.map(|flag| match flag {
        Flag::Bool(b) => b,
        Flag::Int(n) => n != 0,
    }))
}
