//! The four task operations.
//!
//! Each operation validates its input first and then issues exactly one
//! statement against the store. Nothing is cached between calls.

use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set};

use crate::Task;
use crate::entity as task;
use crate::error::{TaskError, TaskResult};
use crate::messages::{NewTask, TaskPatch};
use crate::store::TaskStore;

/// Stateless request handling over a shared [`TaskStore`].
#[derive(Debug, Clone)]
pub struct TaskService {
    store: TaskStore,
}

impl TaskService {
    pub fn new(store: TaskStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &TaskStore {
        &self.store
    }

    fn db(&self) -> &DatabaseConnection {
        self.store.connection()
    }

    /// All tasks, most recently created first.
    pub async fn list(&self) -> TaskResult<Vec<Task>> {
        let tasks = task::Entity::find()
            .order_by_desc(task::Column::Id)
            .all(self.db())
            .await?;
        Ok(tasks)
    }

    /// Insert a task and return it with the id the store assigned.
    pub async fn create(&self, body: NewTask) -> TaskResult<Task> {
        let name = validate_name(body.name.as_deref(), "Task name is required.")?;

        let row = task::ActiveModel {
            name: Set(name.clone()),
            completed: Set(false),
            ..Default::default()
        };
        let inserted = task::Entity::insert(row).exec(self.db()).await?;

        Ok(Task {
            id: inserted.last_insert_id,
            name,
            completed: false,
        })
    }

    /// Apply the supplied fields to one row. Fields left out of `patch` are not written.
    pub async fn update(&self, id: i32, patch: TaskPatch) -> TaskResult<()> {
        if patch.is_empty() {
            return Err(TaskError::InvalidInput(
                "No fields provided for update.".to_string(),
            ));
        }

        let mut changes = task::ActiveModel::default();
        if let Some(completed) = patch.completed {
            changes.completed = Set(completed);
        }
        if let Some(name) = patch.name.as_deref() {
            changes.name = Set(validate_name(Some(name), "Task name cannot be empty.")?);
        }

        let result = task::Entity::update_many()
            .set(changes)
            .filter(task::Column::Id.eq(id))
            .exec(self.db())
            .await?;

        if result.rows_affected == 0 {
            return Err(TaskError::NotFound(id.to_string()));
        }
        Ok(())
    }

    /// Permanently remove one row.
    pub async fn delete(&self, id: i32) -> TaskResult<()> {
        let result = task::Entity::delete_by_id(id).exec(self.db()).await?;
        if result.rows_affected == 0 {
            return Err(TaskError::NotFound(id.to_string()));
        }
        Ok(())
    }
}

/// Trimmed name, or `InvalidInput` when missing or blank.
fn validate_name(name: Option<&str>, message: &str) -> TaskResult<String> {
    match name.map(str::trim) {
        Some(trimmed) if !trimmed.is_empty() => Ok(trimmed.to_string()),
        _ => Err(TaskError::InvalidInput(message.to_string())),
    }
}
