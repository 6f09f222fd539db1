use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use focusflow_shared::{
    AuthTokens, Credentials, TaskCreate, TaskDto, TaskId, TaskPatch, TasksListArgs,
};
use reqwest::{StatusCode, Url, header};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};

use crate::error::ClientError;
use crate::session::{ACCESS_TOKEN_KEY, SessionStore};

const MAX_ERROR_BODY_CHARS: usize = 512;

#[async_trait]
pub trait TaskApi: Send + Sync {
    async fn list_tasks(&self, args: &TasksListArgs) -> Result<Vec<TaskDto>, ClientError>;
    async fn create_task(&self, create: &TaskCreate) -> Result<TaskDto, ClientError>;
    async fn update_task(&self, id: TaskId, patch: &TaskPatch) -> Result<TaskDto, ClientError>;
    async fn delete_task(&self, id: TaskId) -> Result<(), ClientError>;
}

#[async_trait]
pub trait AuthApi: Send + Sync {
    async fn login(&self, credentials: &Credentials) -> Result<AuthTokens, ClientError>;
    async fn register(&self, credentials: &Credentials) -> Result<(), ClientError>;
}

#[async_trait]
impl<T: TaskApi + ?Sized> TaskApi for Arc<T> {
    async fn list_tasks(&self, args: &TasksListArgs) -> Result<Vec<TaskDto>, ClientError> {
        (**self).list_tasks(args).await
    }

    async fn create_task(&self, create: &TaskCreate) -> Result<TaskDto, ClientError> {
        (**self).create_task(create).await
    }

    async fn update_task(&self, id: TaskId, patch: &TaskPatch) -> Result<TaskDto, ClientError> {
        (**self).update_task(id, patch).await
    }

    async fn delete_task(&self, id: TaskId) -> Result<(), ClientError> {
        (**self).delete_task(id).await
    }
}

#[async_trait]
impl<T: AuthApi + ?Sized> AuthApi for Arc<T> {
    async fn login(&self, credentials: &Credentials) -> Result<AuthTokens, ClientError> {
        (**self).login(credentials).await
    }

    async fn register(&self, credentials: &Credentials) -> Result<(), ClientError> {
        (**self).register(credentials).await
    }
}

/// Task API over HTTP. Attaches the stored access token to every task request.
pub struct HttpApi {
    client: reqwest::Client,
    base_url: Url,
    session: Arc<dyn SessionStore>,
}

impl HttpApi {
    pub fn new(
        base_url: &str,
        timeout: Duration,
        session: Arc<dyn SessionStore>,
    ) -> Result<Self, ClientError> {
        let base_url = Url::parse(base_url)
            .map_err(|err| ClientError::validation(format!("invalid API url '{base_url}': {err}")))?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::validation(format!(
                "API url '{base_url}' cannot carry a path"
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| ClientError::Transport(format!("failed building HTTP client: {err}")))?;

        debug!(base_url = %base_url, timeout_ms = timeout.as_millis() as u64, "created API client");
        Ok(Self {
            client,
            base_url,
            session,
        })
    }

    fn url(&self, segments: &[&str]) -> Url {
        endpoint(&self.base_url, segments)
    }

    async fn execute(
        &self,
        request: reqwest::RequestBuilder,
        authenticated: bool,
    ) -> Result<Vec<u8>, ClientError> {
        let request = match self.session.get(ACCESS_TOKEN_KEY) {
            Some(token) if authenticated => request.bearer_auth(token),
            _ => request,
        };

        let response = request.send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            warn!(status = status.as_u16(), "request rejected by API");
            return Err(ClientError::Unauthorized {
                status: status.as_u16(),
            });
        }
        if !status.is_success() {
            let text: String = String::from_utf8_lossy(&body)
                .chars()
                .take(MAX_ERROR_BODY_CHARS)
                .collect();
            warn!(status = status.as_u16(), body = %text, "API returned error status");
            return Err(ClientError::Http {
                status: status.as_u16(),
                body: text,
            });
        }

        Ok(body.to_vec())
    }
}

fn endpoint(base: &Url, segments: &[&str]) -> Url {
    let mut url = base.clone();
    if let Ok(mut path) = url.path_segments_mut() {
        path.pop_if_empty().extend(segments);
    }
    url
}

/// `GET /tasks` URL with `search`/`status` only when set.
pub fn tasks_url(base: &Url, args: &TasksListArgs) -> Url {
    let mut url = endpoint(base, &["tasks"]);
    if args.search.is_some() || args.status.is_some() {
        let mut pairs = url.query_pairs_mut();
        if let Some(search) = args.search.as_deref() {
            pairs.append_pair("search", search);
        }
        if let Some(status) = args.status {
            pairs.append_pair("status", if status { "true" } else { "false" });
        }
    }
    url
}

fn with_json<T: Serialize + ?Sized>(
    request: reqwest::RequestBuilder,
    body: &T,
) -> Result<reqwest::RequestBuilder, ClientError> {
    let bytes = serde_json::to_vec(body)?;
    Ok(request
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::ACCEPT, "application/json")
        .body(bytes))
}

fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T, ClientError> {
    Ok(serde_json::from_slice(body)?)
}

#[async_trait]
impl TaskApi for HttpApi {
    #[instrument(skip(self), fields(search = ?args.search, status = ?args.status))]
    async fn list_tasks(&self, args: &TasksListArgs) -> Result<Vec<TaskDto>, ClientError> {
        let url = tasks_url(&self.base_url, args);
        let body = self
            .execute(
                self.client.get(url).header(header::ACCEPT, "application/json"),
                true,
            )
            .await?;
        let tasks: Vec<TaskDto> = decode(&body)?;
        debug!(count = tasks.len(), "listed tasks");
        Ok(tasks)
    }

    #[instrument(skip(self, create), fields(title_len = create.title.len()))]
    async fn create_task(&self, create: &TaskCreate) -> Result<TaskDto, ClientError> {
        let request = with_json(self.client.post(self.url(&["tasks"])), create)?;
        let body = self.execute(request, true).await?;
        decode(&body)
    }

    #[instrument(skip(self, patch), fields(task_id = id))]
    async fn update_task(&self, id: TaskId, patch: &TaskPatch) -> Result<TaskDto, ClientError> {
        let id = id.to_string();
        let request = with_json(self.client.put(self.url(&["tasks", &id])), patch)?;
        let body = self.execute(request, true).await?;
        decode(&body)
    }

    #[instrument(skip(self), fields(task_id = id))]
    async fn delete_task(&self, id: TaskId) -> Result<(), ClientError> {
        let id = id.to_string();
        self.execute(self.client.delete(self.url(&["tasks", &id])), true)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl AuthApi for HttpApi {
    #[instrument(skip(self, credentials), fields(email = %credentials.email))]
    async fn login(&self, credentials: &Credentials) -> Result<AuthTokens, ClientError> {
        let request = with_json(self.client.post(self.url(&["auth", "login"])), credentials)?;
        let body = self.execute(request, false).await?;
        decode(&body)
    }

    #[instrument(skip(self, credentials), fields(email = %credentials.email))]
    async fn register(&self, credentials: &Credentials) -> Result<(), ClientError> {
        let request = with_json(
            self.client.post(self.url(&["auth", "register"])),
            credentials,
        )?;
        self.execute(request, false).await?;
        Ok(())
    }
}
