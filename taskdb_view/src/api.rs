//! HTTP client for the task API.

use async_trait::async_trait;
use reqwest::Response;
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

/// Where the server listens by default.
pub const DEFAULT_API_URL: &str = "http://localhost:3000/api/tasks";

/// A task as the server reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: i32,
    pub name: String,
    pub completed: bool,
}

#[derive(Error, Debug)]
pub enum ApiError {
    /// The request never produced a response (connection refused, reset, bad body).
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("Server answered {status}: {message}")]
    Status { status: u16, message: String },
}

impl ApiError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::Status { status: 404, .. })
    }
}

/// The calls the view makes against the server, one per user action.
#[async_trait]
pub trait TaskApi: Send + Sync {
    async fn list(&self) -> Result<Vec<Task>, ApiError>;
    async fn create(&self, name: &str) -> Result<Task, ApiError>;
    async fn set_completed(&self, id: i32, completed: bool) -> Result<(), ApiError>;
    async fn rename(&self, id: i32, name: &str) -> Result<(), ApiError>;
    async fn delete(&self, id: i32) -> Result<(), ApiError>;
}

/// [`TaskApi`] over HTTP with `reqwest`. No timeout is set beyond the client's own.
#[derive(Debug, Clone)]
pub struct HttpTaskApi {
    base_url: String,
    client: reqwest::Client,
}

impl Default for HttpTaskApi {
    fn default() -> Self {
        Self::new(DEFAULT_API_URL)
    }
}

impl HttpTaskApi {
    /// `base_url` is the collection URL, e.g. `http://localhost:3000/api/tasks`.
    pub fn new(base_url: &str) -> Self {
        Self::with_client(base_url, reqwest::Client::new())
    }

    pub fn with_client(base_url: &str, client: reqwest::Client) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn task_url(&self, id: i32) -> String {
        format!("{}/{}", self.base_url, id)
    }
}

#[derive(Deserialize)]
struct MessageBody {
    message: String,
}

/// Turn a non-success response into [`ApiError::Status`], keeping the server's message.
async fn check(res: Response) -> Result<Response, ApiError> {
    let status = res.status();
    if status.is_success() {
        return Ok(res);
    }
    let message = match res.json::<MessageBody>().await {
        Ok(body) => body.message,
        Err(_) => status
            .canonical_reason()
            .unwrap_or("Request failed")
            .to_string(),
    };
    Err(ApiError::Status {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl TaskApi for HttpTaskApi {
    async fn list(&self) -> Result<Vec<Task>, ApiError> {
        let res = self.client.get(&self.base_url).send().await?;
        Ok(check(res).await?.json().await?)
    }

    async fn create(&self, name: &str) -> Result<Task, ApiError> {
        let res = self
            .client
            .post(&self.base_url)
            .json(&json!({ "name": name }))
            .send()
            .await?;
        Ok(check(res).await?.json().await?)
    }

    async fn set_completed(&self, id: i32, completed: bool) -> Result<(), ApiError> {
        let res = self
            .client
            .patch(self.task_url(id))
            .json(&json!({ "completed": completed }))
            .send()
            .await?;
        check(res).await?;
        Ok(())
    }

    async fn rename(&self, id: i32, name: &str) -> Result<(), ApiError> {
        let res = self
            .client
            .patch(self.task_url(id))
            .json(&json!({ "name": name }))
            .send()
            .await?;
        check(res).await?;
        Ok(())
    }

    async fn delete(&self, id: i32) -> Result<(), ApiError> {
        let res = self.client.delete(self.task_url(id)).send().await?;
        check(res).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urls() {
        let api = HttpTaskApi::new("http://localhost:3000/api/tasks/");
        assert_eq!(api.base_url(), "http://localhost:3000/api/tasks");
        assert_eq!(api.task_url(42), "http://localhost:3000/api/tasks/42");
        assert_eq!(HttpTaskApi::default().base_url(), DEFAULT_API_URL);
    }

    #[test]
    fn test_not_found_detection() {
        let err = ApiError::Status {
            status: 404,
            message: "Task 9 not found.".into(),
        };
        assert!(err.is_not_found());

        let err = ApiError::Status {
            status: 500,
            message: "Task store is unavailable.".into(),
        };
        assert!(!err.is_not_found());
    }
}
