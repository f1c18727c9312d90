//! Client-side mirror for the TaskDB REST API.
//!
//! - [`HttpTaskApi`]: `reqwest` client for `/api/tasks`, behind the [`TaskApi`] trait.
//! - [`TaskView`]: in-memory list of tasks that applies each change only after
//!   the server confirms it, and publishes [`ViewChange`] events for rendering.
//!
//! ## Example
//!
//! ```ignore
//! let view = TaskView::new(HttpTaskApi::new("http://localhost:3000/api/tasks"));
//! let mut changes = view.subscribe();
//!
//! view.load().await?;
//! let task = view.add("Buy milk").await?;
//! view.toggle(task.id).await?;
//! view.remove(task.id).await?;
//! ```

pub mod api;
pub mod view;

pub use api::{ApiError, DEFAULT_API_URL, HttpTaskApi, Task, TaskApi};
pub use view::{Action, EditMode, LOAD_FAILED_MESSAGE, LoadState, TaskView, ViewChange, ViewError};
