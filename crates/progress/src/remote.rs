//! Remote progress authority.
//!
//! The server keeps one progress document per user and answers
//! `GET {prefix}/progress`, `GET {prefix}/progress/{topic}` and
//! `POST {prefix}/progress`.

use async_trait::async_trait;
use reqwest::{Client, ClientBuilder, RequestBuilder, Response, Url};
use serde::Deserialize;
use skillpath_core::{ProgressMap, ProgressUpdate, SyncConfig, TopicId, TopicProgress};
use tracing::debug;

/// Errors talking to the remote authority.
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    /// Transport failure or timeout
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-2xx response
    #[error("Server returned {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body, possibly empty
        body: String,
    },

    /// Response body did not have the expected shape
    #[error("Unexpected response: {0}")]
    Decode(String),

    /// Configured URL is unusable
    #[error("Invalid URL: {0}")]
    Url(String),
}

impl RemoteError {
    /// Whether retrying the same request may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            RemoteError::Http(_) => true,
            RemoteError::Status { status, .. } => *status >= 500 || *status == 408 || *status == 429,
            RemoteError::Decode(_) | RemoteError::Url(_) => false,
        }
    }
}

/// The server-held copy of a learner's progress.
#[async_trait]
pub trait RemoteProgress: Send + Sync {
    /// Fetch every topic record.
    async fn fetch_all(&self) -> Result<ProgressMap, RemoteError>;

    /// Fetch one topic record. Unknown topics come back empty.
    async fn fetch_topic(&self, topic: &TopicId) -> Result<TopicProgress, RemoteError>;

    /// Push an update. Returns the server's record for the topic when the
    /// response carries one.
    async fn push(&self, update: &ProgressUpdate) -> Result<Option<TopicProgress>, RemoteError>;
}

#[async_trait]
impl<T: RemoteProgress + ?Sized> RemoteProgress for std::sync::Arc<T> {
    async fn fetch_all(&self) -> Result<ProgressMap, RemoteError> {
        (**self).fetch_all().await
    }

    async fn fetch_topic(&self, topic: &TopicId) -> Result<TopicProgress, RemoteError> {
        (**self).fetch_topic(topic).await
    }

    async fn push(&self, update: &ProgressUpdate) -> Result<Option<TopicProgress>, RemoteError> {
        (**self).push(update).await
    }
}

#[derive(Deserialize)]
struct ProgressEnvelope {
    progress: UserProgress,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserProgress {
    #[serde(default)]
    topic_progress: ProgressMap,
}

#[derive(Deserialize)]
struct TopicEnvelope {
    status: TopicProgress,
}

/// HTTP+JSON client for the progress API.
#[derive(Clone)]
pub struct HttpProgressClient {
    /// HTTP client
    client: Client,

    /// `api_url` joined with `api_prefix`
    base: String,

    /// Bearer token
    token: Option<String>,
}

impl HttpProgressClient {
    /// Create a client from sync settings.
    pub fn new(config: &SyncConfig) -> Self {
        let base = format!(
            "{}/{}",
            config.api_url.trim_end_matches('/'),
            config.api_prefix.trim_matches('/')
        );
        Self {
            client: ClientBuilder::new()
                .timeout(config.timeout())
                .build()
                .unwrap_or_default(),
            base: base.trim_end_matches('/').to_string(),
            token: config.token.clone(),
        }
    }

    fn progress_url(&self) -> Result<Url, RemoteError> {
        Url::parse(&format!("{}/progress", self.base)).map_err(|e| RemoteError::Url(e.to_string()))
    }

    fn topic_url(&self, topic: &TopicId) -> Result<Url, RemoteError> {
        let mut url = self.progress_url()?;
        url.path_segments_mut()
            .map_err(|_| RemoteError::Url(self.base.clone()))?
            .push(topic.as_str());
        Ok(url)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn check(response: Response) -> Result<Response, RemoteError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        Err(RemoteError::Status { status, body })
    }

    async fn decode<T: serde::de::DeserializeOwned>(response: Response) -> Result<T, RemoteError> {
        response
            .json()
            .await
            .map_err(|e| RemoteError::Decode(e.to_string()))
    }
}

#[async_trait]
impl RemoteProgress for HttpProgressClient {
    async fn fetch_all(&self) -> Result<ProgressMap, RemoteError> {
        let url = self.progress_url()?;
        debug!("Fetching progress from {}", url);

        let response = self.authorize(self.client.get(url)).send().await?;
        let envelope: ProgressEnvelope = Self::decode(Self::check(response).await?).await?;
        Ok(envelope.progress.topic_progress)
    }

    async fn fetch_topic(&self, topic: &TopicId) -> Result<TopicProgress, RemoteError> {
        let url = self.topic_url(topic)?;
        debug!("Fetching progress for '{}'", topic);

        let response = self.authorize(self.client.get(url)).send().await?;
        let envelope: TopicEnvelope = Self::decode(Self::check(response).await?).await?;
        Ok(envelope.status)
    }

    async fn push(&self, update: &ProgressUpdate) -> Result<Option<TopicProgress>, RemoteError> {
        let url = self.progress_url()?;
        debug!(
            "Pushing progress for '{}' (viewed={}, completed={})",
            update.topic, update.viewed, update.completed
        );

        let response = self
            .authorize(self.client.post(url))
            .json(update)
            .send()
            .await?;
        let envelope: ProgressEnvelope = Self::decode(Self::check(response).await?).await?;
        Ok(envelope.progress.topic_progress.get(update.topic.as_str()).cloned())
    }
}
