//! HTTP implementation of the authority session.
//!
//! Wire protocol: every response is a `{success, result}` envelope.
//! Login exchanges the node's permanent `Login-Token` for a temporary
//! session token carried in a `Room-Token` header on every subsequent
//! request. On a 401 the client transparently re-authenticates and
//! retries the request exactly once, then gives up with
//! [`Error::Unauthorized`].

use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::authority::MainNode;
use crate::error::{Error, Result};
use crate::types::{AccessCheck, Descriptor, Task, TaskResult, User, Visit};

const LOGIN_TOKEN_HEADER: &str = "Login-Token";
const ROOM_TOKEN_HEADER: &str = "Room-Token";

/// The authority's `{success, result}` response envelope.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    success: bool,
    #[serde(default = "Option::default")]
    result: Option<T>,
}

impl<T> Envelope<T> {
    /// The payload of a successful response, `None` otherwise.
    fn into_result(self) -> Option<T> {
        if self.success {
            self.result
        } else {
            None
        }
    }
}

#[derive(Debug, Deserialize)]
struct AuthPayload {
    temp_token: String,
}

#[derive(Debug, Deserialize)]
struct AccessCheckPayload {
    is_known: bool,
    have_access: bool,
    #[serde(default)]
    user: Option<User>,
}

impl From<AccessCheckPayload> for AccessCheck {
    fn from(payload: AccessCheckPayload) -> Self {
        Self {
            is_known: payload.is_known,
            accessed: payload.have_access,
            user: payload.user,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TasksPayload {
    tasks: Vec<Task>,
}

/// [`MainNode`] over HTTP.
///
/// # Examples
///
/// ```
/// use gatenode::authority::HttpMainNode;
///
/// let authority = HttpMainNode::new("192.168.1.11:8080", "c6646b52...");
/// ```
pub struct HttpMainNode {
    http: reqwest::Client,
    base_url: String,
    login_token: String,
    room_token: RwLock<Option<String>>,
    auth_retry: Duration,
}

impl HttpMainNode {
    /// Creates a client for the authority at `host` (host:port, no
    /// scheme) holding the node's permanent login token.
    pub fn new(host: &str, login_token: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: format!("http://{host}/"),
            login_token: login_token.into(),
            room_token: RwLock::new(None),
            auth_retry: Duration::from_secs(5),
        }
    }

    /// Overrides the delay between failed initialization attempts.
    pub fn with_auth_retry(mut self, delay: Duration) -> Self {
        self.auth_retry = delay;
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn with_token(&self, request: RequestBuilder) -> RequestBuilder {
        match self.room_token.read().clone() {
            Some(token) => request.header(ROOM_TOKEN_HEADER, token),
            None => request,
        }
    }

    /// One login round trip. `Ok(None)` means the authority answered
    /// and rejected the login token.
    async fn authorize(&self) -> Result<Option<String>> {
        let response = self
            .http
            .post(self.url("authorization/room_login"))
            .header(LOGIN_TOKEN_HEADER, &self.login_token)
            .send()
            .await?;
        let envelope: Envelope<AuthPayload> = response.json().await?;
        Ok(envelope.into_result().map(|payload| payload.temp_token))
    }

    /// Sends a request, re-authenticating and retrying exactly once on
    /// a 401, then propagating [`Error::Unauthorized`].
    async fn send(
        &self,
        build: impl Fn(&reqwest::Client) -> RequestBuilder,
    ) -> Result<reqwest::Response> {
        let response = self.with_token(build(&self.http)).send().await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        tracing::warn!("session token rejected, re-authenticating");
        let Some(token) = self.authorize().await? else {
            return Err(Error::Unauthorized);
        };
        *self.room_token.write() = Some(token);

        let retried = self.with_token(build(&self.http)).send().await?;
        if retried.status() == StatusCode::UNAUTHORIZED {
            return Err(Error::Unauthorized);
        }
        Ok(retried)
    }

    async fn post_json<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &impl Serialize,
    ) -> Result<Envelope<T>> {
        let url = self.url(path);
        let response = self.send(|http| http.post(&url).json(body)).await?;
        Ok(response.json().await?)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<Envelope<T>> {
        let url = self.url(path);
        let response = self.send(|http| http.get(&url)).await?;
        Ok(response.json().await?)
    }
}

#[async_trait]
impl MainNode for HttpMainNode {
    async fn initialize(&self) -> Result<()> {
        loop {
            match self.authorize().await {
                Ok(Some(token)) => {
                    *self.room_token.write() = Some(token);
                    tracing::info!("authority session initialized");
                    return Ok(());
                }
                Ok(None) => tracing::error!("authority rejected the login token"),
                Err(e) => tracing::error!(error = %e, "authority login failed"),
            }
            tokio::time::sleep(self.auth_retry).await;
        }
    }

    async fn check_access_by_descriptor(
        &self,
        descriptor: &Descriptor,
    ) -> Result<Option<AccessCheck>> {
        let body = json!({ "features": descriptor.as_slice() });
        let envelope: Envelope<AccessCheckPayload> =
            self.post_json("access/check_by_descriptor", &body).await?;
        Ok(envelope.into_result().map(AccessCheck::from))
    }

    async fn report_visit(&self, visit: &Visit) -> Result<()> {
        let body = json!({
            "user_id": visit.user_id,
            "datetime": visit.at.to_rfc3339(),
        });
        let envelope: Envelope<serde_json::Value> =
            self.post_json("access/report_visit", &body).await?;
        tracing::debug!(user_id = visit.user_id, reported = envelope.success, "visit reported");
        Ok(())
    }

    async fn pending_tasks(&self) -> Result<Vec<Task>> {
        let envelope: Envelope<TasksPayload> = self.get_json("tasks/undone").await?;
        Ok(envelope
            .into_result()
            .map(|payload| payload.tasks)
            .unwrap_or_default())
    }

    async fn report_task_result(&self, result: &TaskResult) -> Result<()> {
        let body = json!({
            "task_id": result.task_id,
            "new_status": result.status,
        });
        let envelope: Envelope<serde_json::Value> = self.post_json("task/report", &body).await?;
        tracing::debug!(
            task_id = result.task_id,
            reported = envelope.success,
            "task result reported"
        );
        Ok(())
    }
}
