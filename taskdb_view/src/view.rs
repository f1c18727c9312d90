//! The client-side task mirror.
//!
//! Every entry follows `absent -> visible(false) <-> visible(true) -> absent`,
//! and each transition is applied only after the server confirms the call that
//! caused it. The lock around the mirror is never held across a call, so two
//! overlapping actions on the same task race against the server and the
//! mirror ends up reflecting whichever response arrives last.
//!
//! Confirmed transitions and reported failures are published as
//! [`ViewChange`] events; a renderer subscribes with [`TaskView::subscribe()`]
//! and redraws only the affected item.

use std::fmt;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use thiserror::Error;
use tokio::sync::broadcast;

use crate::api::{ApiError, Task, TaskApi};

/// Text of the inert indicator shown when the startup load fails.
pub const LOAD_FAILED_MESSAGE: &str = "Could not connect to the API to load tasks.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadState {
    /// `load()` has not completed yet.
    Pending,
    Ready,
    /// The startup fetch failed; the mirror is empty and shows this message.
    Failed(String),
}

/// How [`TaskView::rename()`] treats the server.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EditMode {
    /// Change only the local entry, showing the text as typed, and make no
    /// call. The store keeps the old name, so the next `load()` brings it back.
    #[default]
    LocalOnly,
    /// Send `PATCH {name}` and apply the new name once the server confirms,
    /// the same way a completion toggle works.
    Persisted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Add,
    Toggle,
    Rename,
    Remove,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Action::Add => "add",
            Action::Toggle => "toggle",
            Action::Rename => "rename",
            Action::Remove => "remove",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewChange {
    /// The whole list was replaced by a startup load.
    Loaded(Vec<Task>),
    LoadFailed(String),
    /// A created task was put at the front.
    Inserted(Task),
    /// A task's completion flag or name changed.
    Updated(Task),
    Removed(i32),
    /// A call failed; the mirror kept its last known good state.
    Failed {
        action: Action,
        id: Option<i32>,
        message: String,
    },
}

#[derive(Error, Debug)]
pub enum ViewError {
    #[error(transparent)]
    Api(#[from] ApiError),

    /// The id is not in the mirror, so no call was made.
    #[error("Task {0} is not in the list")]
    UnknownTask(i32),

    #[error("Task name cannot be empty")]
    EmptyName,
}

struct Mirror {
    tasks: Vec<Task>,
    state: LoadState,
}

impl Mirror {
    fn get_mut(&mut self, id: i32) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|t| t.id == id)
    }

    fn remove(&mut self, id: i32) -> bool {
        let before = self.tasks.len();
        self.tasks.retain(|t| t.id != id);
        self.tasks.len() != before
    }
}

pub struct TaskView<A> {
    api: A,
    edit_mode: EditMode,
    mirror: RwLock<Mirror>,
    change_tx: broadcast::Sender<ViewChange>,
}

impl<A: TaskApi> TaskView<A> {
    pub fn new(api: A) -> Self {
        let (change_tx, _) = broadcast::channel(256);
        Self {
            api,
            edit_mode: EditMode::default(),
            mirror: RwLock::new(Mirror {
                tasks: Vec::new(),
                state: LoadState::Pending,
            }),
            change_tx,
        }
    }

    pub fn with_edit_mode(mut self, mode: EditMode) -> Self {
        self.edit_mode = mode;
        self
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn edit_mode(&self) -> EditMode {
        self.edit_mode
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ViewChange> {
        self.change_tx.subscribe()
    }

    /// Snapshot of the mirror, most recently created first.
    pub fn tasks(&self) -> Vec<Task> {
        self.read().tasks.clone()
    }

    pub fn task(&self, id: i32) -> Option<Task> {
        self.read().tasks.iter().find(|t| t.id == id).cloned()
    }

    pub fn load_state(&self) -> LoadState {
        self.read().state.clone()
    }

    pub fn len(&self) -> usize {
        self.read().tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().tasks.is_empty()
    }

    /// Startup load: replace the mirror with the server's list.
    ///
    /// On failure the mirror is emptied and the state becomes
    /// [`LoadState::Failed`]. There is no retry.
    pub async fn load(&self) -> Result<(), ViewError> {
        match self.api.list().await {
            Ok(tasks) => {
                {
                    let mut mirror = self.write();
                    mirror.tasks = tasks.clone();
                    mirror.state = LoadState::Ready;
                }
                log::debug!("Loaded {} tasks", tasks.len());
                self.notify(ViewChange::Loaded(tasks));
                Ok(())
            }
            Err(err) => {
                log::error!("Could not load tasks: {err}");
                {
                    let mut mirror = self.write();
                    mirror.tasks.clear();
                    mirror.state = LoadState::Failed(LOAD_FAILED_MESSAGE.to_string());
                }
                self.notify(ViewChange::LoadFailed(LOAD_FAILED_MESSAGE.to_string()));
                Err(err.into())
            }
        }
    }

    /// Create a task and put the server's copy at the front.
    ///
    /// Blank input is dropped without a call.
    pub async fn add(&self, name: &str) -> Result<Task, ViewError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ViewError::EmptyName);
        }

        match self.api.create(name).await {
            Ok(task) => {
                {
                    let mut mirror = self.write();
                    mirror.remove(task.id);
                    mirror.tasks.insert(0, task.clone());
                }
                self.notify(ViewChange::Inserted(task.clone()));
                Ok(task)
            }
            Err(err) => Err(self.fail(Action::Add, None, err)),
        }
    }

    /// Flip a task's completion flag once the server accepts the new value.
    ///
    /// Returns the confirmed flag.
    pub async fn toggle(&self, id: i32) -> Result<bool, ViewError> {
        let current = self.task(id).ok_or(ViewError::UnknownTask(id))?;
        let requested = !current.completed;

        if let Err(err) = self.api.set_completed(id, requested).await {
            return Err(self.fail(Action::Toggle, Some(id), err));
        }

        self.apply(id, |task| task.completed = requested);
        Ok(requested)
    }

    /// Edit a task's name according to the view's [`EditMode`].
    pub async fn rename(&self, id: i32, name: &str) -> Result<(), ViewError> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(ViewError::EmptyName);
        }
        if self.task(id).is_none() {
            return Err(ViewError::UnknownTask(id));
        }

        // A local edit shows exactly what was typed; a persisted one shows
        // what the server stores.
        let shown = match self.edit_mode {
            EditMode::LocalOnly => name.to_string(),
            EditMode::Persisted => {
                if let Err(err) = self.api.rename(id, trimmed).await {
                    return Err(self.fail(Action::Rename, Some(id), err));
                }
                trimmed.to_string()
            }
        };

        self.apply(id, |task| task.name = shown);
        Ok(())
    }

    /// Delete a task; the entry disappears only once the server confirms.
    pub async fn remove(&self, id: i32) -> Result<(), ViewError> {
        if self.task(id).is_none() {
            return Err(ViewError::UnknownTask(id));
        }

        if let Err(err) = self.api.delete(id).await {
            return Err(self.fail(Action::Remove, Some(id), err));
        }

        if self.write().remove(id) {
            self.notify(ViewChange::Removed(id));
        }
        Ok(())
    }

    /// Mutate one entry if it is still in the mirror and announce the result.
    fn apply(&self, id: i32, change: impl FnOnce(&mut Task)) {
        let updated = {
            let mut mirror = self.write();
            mirror.get_mut(id).map(|task| {
                change(task);
                task.clone()
            })
        };
        // A racing delete may have removed it while the call was in flight.
        if let Some(task) = updated {
            self.notify(ViewChange::Updated(task));
        }
    }

    /// Report a failed call. A 404 means the row is gone, so the stale entry is dropped.
    fn fail(&self, action: Action, id: Option<i32>, err: ApiError) -> ViewError {
        match id {
            Some(id) => log::error!("Failed to {action} task {id}: {err}"),
            None => log::error!("Failed to {action} task: {err}"),
        }

        if let Some(id) = id.filter(|_| err.is_not_found()) {
            if self.write().remove(id) {
                self.notify(ViewChange::Removed(id));
            }
        }

        self.notify(ViewChange::Failed {
            action,
            id,
            message: err.to_string(),
        });
        err.into()
    }

    fn notify(&self, change: ViewChange) {
        let _ = self.change_tx.send(change);
    }

    fn read(&self) -> RwLockReadGuard<'_, Mirror> {
        self.mirror.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Mirror> {
        self.mirror.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;

    /// In-process stand-in for the server. `fail_with` makes the next call fail.
    #[derive(Default)]
    struct FakeApi {
        rows: Mutex<Vec<Task>>,
        next_id: Mutex<i32>,
        fail_with: Mutex<Option<u16>>,
        calls: Mutex<Vec<&'static str>>,
    }

    impl FakeApi {
        fn with_rows(rows: Vec<Task>) -> Self {
            let next_id = rows.iter().map(|t| t.id).max().unwrap_or(0);
            Self {
                rows: Mutex::new(rows),
                next_id: Mutex::new(next_id),
                ..Default::default()
            }
        }

        fn fail_next(&self, status: u16) {
            *self.fail_with.lock().unwrap() = Some(status);
        }

        fn calls(&self) -> Vec<&'static str> {
            self.calls.lock().unwrap().clone()
        }

        fn row(&self, id: i32) -> Option<Task> {
            self.rows.lock().unwrap().iter().find(|t| t.id == id).cloned()
        }

        fn begin(&self, call: &'static str) -> Result<(), ApiError> {
            self.calls.lock().unwrap().push(call);
            match self.fail_with.lock().unwrap().take() {
                Some(status) => Err(ApiError::Status {
                    status,
                    message: format!("fake failure {status}"),
                }),
                None => Ok(()),
            }
        }

        fn with_row<T>(&self, id: i32, f: impl FnOnce(&mut Task) -> T) -> Result<T, ApiError> {
            let mut rows = self.rows.lock().unwrap();
            match rows.iter_mut().find(|t| t.id == id) {
                Some(task) => Ok(f(task)),
                None => Err(ApiError::Status {
                    status: 404,
                    message: format!("Task {id} not found."),
                }),
            }
        }
    }

    #[async_trait]
    impl TaskApi for FakeApi {
        async fn list(&self) -> Result<Vec<Task>, ApiError> {
            self.begin("list")?;
            let mut rows = self.rows.lock().unwrap().clone();
            rows.sort_by(|a, b| b.id.cmp(&a.id));
            Ok(rows)
        }

        async fn create(&self, name: &str) -> Result<Task, ApiError> {
            self.begin("create")?;
            let mut next_id = self.next_id.lock().unwrap();
            *next_id += 1;
            let task = Task {
                id: *next_id,
                name: name.to_string(),
                completed: false,
            };
            self.rows.lock().unwrap().push(task.clone());
            Ok(task)
        }

        async fn set_completed(&self, id: i32, completed: bool) -> Result<(), ApiError> {
            self.begin("set_completed")?;
            self.with_row(id, |t| t.completed = completed)
        }

        async fn rename(&self, id: i32, name: &str) -> Result<(), ApiError> {
            self.begin("rename")?;
            self.with_row(id, |t| t.name = name.to_string())
        }

        async fn delete(&self, id: i32) -> Result<(), ApiError> {
            self.begin("delete")?;
            self.with_row(id, |_| ())?;
            self.rows.lock().unwrap().retain(|t| t.id != id);
            Ok(())
        }
    }

    fn task(id: i32, name: &str, completed: bool) -> Task {
        Task {
            id,
            name: name.to_string(),
            completed,
        }
    }

    async fn loaded_view(rows: Vec<Task>) -> TaskView<FakeApi> {
        let view = TaskView::new(FakeApi::with_rows(rows));
        view.load().await.expect("load should succeed");
        view
    }

    #[tokio::test]
    async fn test_load_replaces_mirror_newest_first() {
        let view = loaded_view(vec![task(1, "a", false), task(2, "b", true)]).await;
        assert_eq!(view.load_state(), LoadState::Ready);
        assert_eq!(view.tasks(), vec![task(2, "b", true), task(1, "a", false)]);
    }

    #[tokio::test]
    async fn test_load_failure_shows_indicator_and_empties_mirror() {
        let view = loaded_view(vec![task(1, "a", false)]).await;
        view.api().fail_next(500);

        assert!(view.load().await.is_err());
        assert!(view.is_empty());
        assert_eq!(
            view.load_state(),
            LoadState::Failed(LOAD_FAILED_MESSAGE.to_string())
        );
    }

    #[tokio::test]
    async fn test_add_inserts_server_copy_at_front() {
        let view = loaded_view(vec![task(1, "a", false)]).await;
        let mut rx = view.subscribe();

        let created = view.add("  Buy milk ").await.unwrap();
        assert_eq!(created, task(2, "Buy milk", false));
        assert_eq!(view.tasks()[0], created);
        assert_eq!(rx.try_recv().unwrap(), ViewChange::Inserted(created));
    }

    #[tokio::test]
    async fn test_add_blank_makes_no_call() {
        let view = loaded_view(vec![]).await;
        assert!(matches!(view.add("   ").await, Err(ViewError::EmptyName)));
        assert_eq!(view.api().calls(), vec!["list"]);
        assert!(view.is_empty());
    }

    #[tokio::test]
    async fn test_add_failure_leaves_mirror_untouched() {
        let view = loaded_view(vec![task(1, "a", false)]).await;
        view.api().fail_next(500);

        assert!(view.add("Buy milk").await.is_err());
        assert_eq!(view.tasks(), vec![task(1, "a", false)]);
    }

    #[tokio::test]
    async fn test_toggle_applies_after_confirmation() {
        let view = loaded_view(vec![task(1, "a", false)]).await;
        let mut rx = view.subscribe();

        assert!(view.toggle(1).await.unwrap());
        assert!(view.task(1).unwrap().completed);
        assert!(view.api().row(1).unwrap().completed);
        assert_eq!(rx.try_recv().unwrap(), ViewChange::Updated(task(1, "a", true)));

        assert!(!view.toggle(1).await.unwrap());
        assert!(!view.task(1).unwrap().completed);
    }

    #[tokio::test]
    async fn test_toggle_failure_keeps_state() {
        let view = loaded_view(vec![task(1, "a", false)]).await;
        let mut rx = view.subscribe();
        view.api().fail_next(500);

        assert!(view.toggle(1).await.is_err());
        assert!(!view.task(1).unwrap().completed);
        assert!(matches!(
            rx.try_recv().unwrap(),
            ViewChange::Failed { action: Action::Toggle, id: Some(1), .. }
        ));
    }

    #[tokio::test]
    async fn test_unknown_id_makes_no_call() {
        let view = loaded_view(vec![task(1, "a", false)]).await;

        assert!(matches!(view.toggle(9).await, Err(ViewError::UnknownTask(9))));
        assert!(matches!(view.remove(9).await, Err(ViewError::UnknownTask(9))));
        assert!(matches!(view.rename(9, "x").await, Err(ViewError::UnknownTask(9))));
        assert_eq!(view.api().calls(), vec!["list"]);
    }

    #[tokio::test]
    async fn test_remove_after_confirmation() {
        let view = loaded_view(vec![task(1, "a", false), task(2, "b", false)]).await;
        view.api().fail_next(500);

        assert!(view.remove(1).await.is_err());
        assert_eq!(view.len(), 2);

        view.remove(1).await.unwrap();
        assert_eq!(view.tasks(), vec![task(2, "b", false)]);
    }

    #[tokio::test]
    async fn test_not_found_drops_stale_entry() {
        let view = loaded_view(vec![task(1, "a", false), task(2, "b", false)]).await;
        // Someone else deleted row 1 behind the view's back.
        view.api().rows.lock().unwrap().retain(|t| t.id != 1);
        let mut rx = view.subscribe();

        let err = view.toggle(1).await.unwrap_err();
        assert!(matches!(err, ViewError::Api(ref e) if e.is_not_found()));
        assert_eq!(view.tasks(), vec![task(2, "b", false)]);
        assert_eq!(rx.try_recv().unwrap(), ViewChange::Removed(1));
    }

    #[tokio::test]
    async fn test_local_only_rename_diverges_until_reload() {
        let view = loaded_view(vec![task(1, "a", false)]).await;
        assert_eq!(view.edit_mode(), EditMode::LocalOnly);

        view.rename(1, "edited").await.unwrap();
        assert_eq!(view.task(1).unwrap().name, "edited");
        assert_eq!(view.api().row(1).unwrap().name, "a");
        assert_eq!(view.api().calls(), vec!["list"]);

        view.load().await.unwrap();
        assert_eq!(view.task(1).unwrap().name, "a");
    }

    #[tokio::test]
    async fn test_persisted_rename_waits_for_server() {
        let view =
            TaskView::new(FakeApi::with_rows(vec![task(1, "a", false)])).with_edit_mode(EditMode::Persisted);
        assert_eq!(view.edit_mode(), EditMode::Persisted);
        view.load().await.unwrap();

        view.api().fail_next(500);
        assert!(view.rename(1, "edited").await.is_err());
        assert_eq!(view.task(1).unwrap().name, "a");

        view.rename(1, "edited").await.unwrap();
        assert_eq!(view.task(1).unwrap().name, "edited");
        assert_eq!(view.api().row(1).unwrap().name, "edited");

        view.rename(1, "  walk dog ").await.unwrap();
        assert_eq!(view.task(1).unwrap().name, "walk dog");
        assert_eq!(view.api().row(1).unwrap().name, "walk dog");
    }

    #[tokio::test]
    async fn test_local_only_rename_keeps_typed_text() {
        let view = loaded_view(vec![task(1, "a", false)]).await;

        view.rename(1, "  walk dog ").await.unwrap();
        assert_eq!(view.task(1).unwrap().name, "  walk dog ");
        assert_eq!(view.api().row(1).unwrap().name, "a");
    }

    #[tokio::test]
    async fn test_rename_rejects_blank_name() {
        let view = loaded_view(vec![task(1, "a", false)]).await;
        assert!(matches!(view.rename(1, " ").await, Err(ViewError::EmptyName)));
        assert_eq!(view.task(1).unwrap().name, "a");
    }
}
