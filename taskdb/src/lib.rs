//! # TaskDB
//!
//! Storage and REST API for a single-table task list.
//!
//! A [`TaskStore`] owns the SeaORM connection pool for the `tasks` table,
//! [`TaskService`] implements the four operations (list, create, update,
//! delete) with exactly one statement each, and [`http::router`] exposes them
//! as JSON endpoints under `/api/tasks`.
//!
//! ## Quick start
//!
//! ```ignore
//! use taskdb::{TaskService, TaskStoreBuilder};
//!
//! let store = TaskStoreBuilder::new("sqlite:./tasks.db?mode=rwc")
//!     .with_max_connections(10)
//!     .build()
//!     .await?;
//!
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:3000").await?;
//! taskdb::http::serve(listener, TaskService::new(store), std::future::pending()).await?;
//! ```

pub mod entity;
pub mod error;
pub mod http;
pub mod messages;
pub mod service;
pub mod store;

pub use entity::Model as Task;
pub use error::{MessageBody, TaskError, TaskResult};
pub use messages::{NewTask, TaskPatch};
pub use service::TaskService;
pub use store::{TaskStore, TaskStoreBuilder};

// Re-export sea-orm for users of the library
pub use sea_orm;
