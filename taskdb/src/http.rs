//! REST API over [`TaskService`].
//!
//! | Method | Path              | Success                 |
//! |--------|-------------------|-------------------------|
//! | GET    | `/api/tasks`      | 200, tasks by id desc   |
//! | POST   | `/api/tasks`      | 201, the created task   |
//! | PATCH  | `/api/tasks/:id`  | 200, `{"message": ..}`  |
//! | DELETE | `/api/tasks/:id`  | 204, empty body         |
//!
//! Every failure is answered with `{"message": ..}` and the status from
//! [`TaskError::status`]. Malformed bodies count as invalid input. An id that
//! is not an integer names no row, so it is answered like any other missing task.

use std::future::Future;

use axum::{
    Json, Router,
    extract::{
        Path, State,
        rejection::JsonRejection,
    },
    http::StatusCode,
    routing::{get, patch},
};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;

use crate::Task;
use crate::error::{MessageBody, TaskError, TaskResult};
use crate::messages::{NewTask, TaskPatch};
use crate::service::TaskService;

/// Build the API router with `service` as shared state.
pub fn router(service: TaskService) -> Router {
    Router::new()
        .route("/api/tasks", get(list_tasks).post(create_task))
        .route("/api/tasks/:id", patch(update_task).delete(delete_task))
        .layer(CorsLayer::permissive())
        .with_state(service)
}

/// Serve the API on `listener` until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, service: TaskService, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        log::info!("Task API listening on http://{addr}");
    }
    axum::serve(listener, router(service))
        .with_graceful_shutdown(shutdown)
        .await
}

async fn list_tasks(State(service): State<TaskService>) -> TaskResult<Json<Vec<Task>>> {
    let tasks = service
        .list()
        .await
        .map_err(|e| report("fetching tasks", e))?;
    Ok(Json(tasks))
}

async fn create_task(
    State(service): State<TaskService>,
    body: Result<Json<NewTask>, JsonRejection>,
) -> TaskResult<(StatusCode, Json<Task>)> {
    let Json(body) = body.map_err(|r| report("creating task", invalid_body(r)))?;
    let task = service
        .create(body)
        .await
        .map_err(|e| report("creating task", e))?;
    log::debug!("Created task {}", task.id);
    Ok((StatusCode::CREATED, Json(task)))
}

async fn update_task(
    State(service): State<TaskService>,
    Path(raw_id): Path<String>,
    body: Result<Json<TaskPatch>, JsonRejection>,
) -> TaskResult<Json<MessageBody>> {
    let id = parse_id(&raw_id).map_err(|e| report("updating task", e))?;
    let Json(patch) = body.map_err(|r| report("updating task", invalid_body(r)))?;
    service
        .update(id, patch)
        .await
        .map_err(|e| report("updating task", e))?;
    log::debug!("Updated task {id}");
    Ok(Json(MessageBody::new("Task updated successfully.")))
}

async fn delete_task(
    State(service): State<TaskService>,
    Path(raw_id): Path<String>,
) -> TaskResult<StatusCode> {
    let id = parse_id(&raw_id).map_err(|e| report("deleting task", e))?;
    service
        .delete(id)
        .await
        .map_err(|e| report("deleting task", e))?;
    log::debug!("Deleted task {id}");
    Ok(StatusCode::NO_CONTENT)
}

fn invalid_body(rejection: JsonRejection) -> TaskError {
    TaskError::InvalidInput(format!("Invalid request body: {}", rejection.body_text()))
}

/// Ids outside `i32` cannot name a row, so they are `NotFound` rather than invalid input.
fn parse_id(raw: &str) -> TaskResult<i32> {
    raw.parse().map_err(|_| TaskError::NotFound(raw.to_string()))
}

/// Log a failed request at a level matching its cause.
fn report(action: &str, err: TaskError) -> TaskError {
    match &err {
        TaskError::StoreUnavailable(db) => log::error!("Error {action}: {db}"),
        other => log::debug!("Rejected {action}: {other}"),
    }
    err
}
