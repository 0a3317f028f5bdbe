use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client as HttpClient, Method, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;
use taskdeck_shared::{Task, TaskDraft, TaskId, TaskPatch};
use tracing::{debug, instrument, warn};
use url::Url;

use crate::error::{StoreError, StoreResult};

/// Remote source of truth for tasks.
///
/// Every call is a single attempt: failures surface to the caller as-is and
/// the caller decides whether local state changes.
#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn list_tasks(&self) -> StoreResult<Vec<Task>>;

    async fn create_task(&self, draft: &TaskDraft) -> StoreResult<Task>;

    /// Unknown ids are not checked locally; the remote reports them.
    async fn update_task(&self, id: &TaskId, patch: &TaskPatch) -> StoreResult<Task>;

    async fn delete_task(&self, id: &TaskId) -> StoreResult<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UpdateMethod {
    #[default]
    Put,
    Patch,
}

impl UpdateMethod {
    fn as_method(self) -> Method {
        match self {
            Self::Put => Method::PUT,
            Self::Patch => Method::PATCH,
        }
    }
}

impl FromStr for UpdateMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "put" => Ok(Self::Put),
            "patch" => Ok(Self::Patch),
            other => Err(format!("unsupported update method: {other} (expected put or patch)")),
        }
    }
}

impl fmt::Display for UpdateMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Put => f.write_str("put"),
            Self::Patch => f.write_str("patch"),
        }
    }
}

/// Everything the HTTP store needs, injected at construction.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub base_url: Url,
    pub update_method: UpdateMethod,
    pub timeout: Option<Duration>,
}

impl StoreConfig {
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            update_method: UpdateMethod::default(),
            timeout: None,
        }
    }

    pub fn from_url(base_url: &str) -> StoreResult<Self> {
        Ok(Self::new(Url::parse(base_url)?))
    }
}

/// `TaskStore` backed by the `/api/tasks` REST endpoints.
#[derive(Debug, Clone)]
pub struct HttpTaskStore {
    http: HttpClient,
    tasks_url: Url,
    update_method: UpdateMethod,
}

impl HttpTaskStore {
    pub fn new(config: StoreConfig) -> StoreResult<Self> {
        let mut builder =
            HttpClient::builder().user_agent(concat!("taskdeck/", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build()?;
        let tasks_url = tasks_collection_url(&config.base_url)?;

        debug!(
            tasks_url = %tasks_url,
            update_method = %config.update_method,
            timeout = ?config.timeout,
            "created task store client"
        );

        Ok(Self {
            http,
            tasks_url,
            update_method: config.update_method,
        })
    }

    pub fn tasks_url(&self) -> &Url {
        &self.tasks_url
    }

    fn task_url(&self, id: &TaskId) -> StoreResult<Url> {
        let mut url = self.tasks_url.clone();
        url.path_segments_mut()
            .map_err(|()| StoreError::CannotBeABase(self.tasks_url.to_string()))?
            .push(id.as_str());
        Ok(url)
    }

    async fn send<B>(&self, method: Method, url: Url, body: Option<&B>) -> StoreResult<Response>
    where
        B: Serialize + ?Sized,
    {
        debug!(method = %method, url = %url, "sending request");
        let mut request = self.http.request(method.clone(), url.clone());
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await?;
        let message = remote_message(&text).unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string()
        });
        warn!(
            method = %method,
            url = %url,
            status = status.as_u16(),
            message = %message,
            "task store returned non-success status"
        );
        Err(StoreError::remote(status.as_u16(), message))
    }
}

#[async_trait]
impl TaskStore for HttpTaskStore {
    #[instrument(skip(self))]
    async fn list_tasks(&self) -> StoreResult<Vec<Task>> {
        let response = self
            .send::<()>(Method::GET, self.tasks_url.clone(), None)
            .await?;
        let tasks: Vec<Task> = decode(response).await?;
        debug!(count = tasks.len(), "listed tasks");
        Ok(tasks)
    }

    #[instrument(skip(self, draft))]
    async fn create_task(&self, draft: &TaskDraft) -> StoreResult<Task> {
        let response = self
            .send(Method::POST, self.tasks_url.clone(), Some(draft))
            .await?;
        let task: Task = decode(response).await?;
        debug!(id = %task.id, "created task");
        Ok(task)
    }

    #[instrument(skip(self, patch), fields(id = %id))]
    async fn update_task(&self, id: &TaskId, patch: &TaskPatch) -> StoreResult<Task> {
        let url = self.task_url(id)?;
        let response = self
            .send(self.update_method.as_method(), url, Some(patch))
            .await?;
        decode(response).await
    }

    #[instrument(skip(self), fields(id = %id))]
    async fn delete_task(&self, id: &TaskId) -> StoreResult<()> {
        let url = self.task_url(id)?;
        self.send::<()>(Method::DELETE, url, None).await?;
        Ok(())
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> StoreResult<T> {
    let text = response.text().await?;
    serde_json::from_str(&text).map_err(StoreError::from)
}

fn tasks_collection_url(base: &Url) -> StoreResult<Url> {
    let mut url = base.clone();
    url.set_query(None);
    url.set_fragment(None);
    url.path_segments_mut()
        .map_err(|()| StoreError::CannotBeABase(base.to_string()))?
        .pop_if_empty()
        .extend(["api", "tasks"]);
    Ok(url)
}

/// Pulls a human message out of an error body: `{"message": ..}`,
/// `{"error": ..}`, or the raw text.
fn remote_message(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(serde_json::Value::Object(map)) = serde_json::from_str(trimmed) {
        for key in ["message", "error"] {
            if let Some(serde_json::Value::String(text)) = map.get(key) {
                return Some(text.clone());
            }
        }
    }

    Some(trimmed.to_string())
}
