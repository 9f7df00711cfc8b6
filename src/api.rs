//! HTTP client for the QAChat server API
//!
//! Wraps the server's enveloped endpoints and the chat reply stream.
//! Every non-streaming endpoint answers with a `{code, data, message}`
//! envelope; `code == 200` means success regardless of what the
//! transport status said.

use crate::config::ServerConfig;
use crate::error::{QaChatError, Result};
use anyhow::Context;
use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Response envelope shared by all QAChat endpoints
#[derive(Debug, Clone, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct Envelope<T> {
    /// Application-level status code (200 on success)
    pub code: i64,

    /// Payload, absent on some failures
    #[serde(default)]
    pub data: Option<T>,

    /// Human-readable status message
    #[serde(default)]
    pub message: String,
}

/// Knowledge base record as returned by the create endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeBaseRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Serialize)]
struct CreateKnowledgeBaseRequest<'a> {
    name: &'a str,
    description: &'a str,
}

#[derive(Debug, Serialize)]
struct UpdateSessionRequest<'a> {
    title: &'a str,
}

/// Server-side record of an uploaded file
///
/// `processing` and `task_id` are only present when the server kicked
/// off background processing (PDF conversion) for the upload.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadRecord {
    #[serde(rename = "originalName")]
    pub original_name: String,

    #[serde(rename = "savedName")]
    pub saved_name: String,

    #[serde(rename = "filePath")]
    pub file_path: String,

    pub size: u64,

    #[serde(default)]
    pub processing: bool,

    #[serde(rename = "taskId", default)]
    pub task_id: Option<i64>,
}

/// Status of a background processing task
///
/// The server answers `status: "not_found"` (with an envelope code of
/// 404 inside an HTTP 200) once a task has finished and its thread is
/// gone, so that state is an answer here, not an error.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskStatusRecord {
    #[serde(rename = "taskId")]
    pub task_id: i64,

    pub status: String,

    #[serde(rename = "isAlive", default)]
    pub is_alive: bool,
}

/// Remote knowledge base operations consumed by the knowledge store
///
/// Split out as a trait so store logic can be exercised against a
/// scripted implementation without a server.
#[async_trait]
pub trait KnowledgeApi: Send + Sync {
    /// Create a knowledge base on the server
    async fn create_knowledge_base(
        &self,
        name: &str,
        description: &str,
    ) -> Result<KnowledgeBaseRecord>;

    /// Delete a knowledge base on the server
    async fn delete_knowledge_base(&self, id: &str) -> Result<()>;
}

/// HTTP client bound to one QAChat server
pub struct ApiClient {
    http: Client,
    origin: String,
    timeout: Duration,
}

impl ApiClient {
    /// Create a client for the configured server
    ///
    /// # Errors
    ///
    /// Returns `QaChatError::Api` if the underlying HTTP client cannot
    /// be constructed
    pub fn new(config: &ServerConfig) -> Result<Self> {
        let http = Client::builder()
            .user_agent("qachat/0.1.0")
            .build()
            .map_err(|e| QaChatError::Api(format!("Failed to create HTTP client: {}", e)))?;

        let origin = config.origin.trim_end_matches('/').to_string();
        tracing::debug!("API client ready: origin={}", origin);

        Ok(Self {
            http,
            origin,
            timeout: Duration::from_secs(config.timeout_seconds),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.origin, path)
    }

    /// Server origin with any trailing slash removed
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Open the SSE reply stream for one outgoing chat message
    ///
    /// Returns the raw byte stream; [`crate::stream::consume_stream`]
    /// does the framing and decoding. No overall timeout is applied,
    /// replies legitimately take as long as they take.
    ///
    /// # Errors
    ///
    /// Returns `QaChatError::Stream` if the request fails or the server
    /// answers with a non-success status
    pub async fn open_chat_stream(
        &self,
        session_id: &str,
        message: &str,
        kb_id: &str,
    ) -> Result<impl Stream<Item = reqwest::Result<Bytes>>> {
        let response = self
            .http
            .get(self.endpoint("/api/chat/stream"))
            .query(&[
                ("session_id", session_id),
                ("message", message),
                ("kb_id", kb_id),
            ])
            .header("Accept", "text/event-stream")
            .send()
            .await
            .map_err(|e| QaChatError::Stream(format!("Chat stream request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(
                QaChatError::Stream(format!("Chat stream returned HTTP {}", status)).into(),
            );
        }

        Ok(response.bytes_stream())
    }

    /// Best-effort sync of a session title to the server
    ///
    /// # Errors
    ///
    /// Returns `QaChatError::NotFound` if the server does not know the
    /// session, `QaChatError::Api` for other failures
    pub async fn update_session_title(&self, session_id: &str, title: &str) -> Result<()> {
        let response = self
            .http
            .put(self.endpoint(&format!("/api/session/{}", session_id)))
            .timeout(self.timeout)
            .json(&UpdateSessionRequest { title })
            .send()
            .await
            .map_err(|e| QaChatError::Api(format!("Session update request failed: {}", e)))?;

        let envelope: Envelope<serde_json::Value> =
            self.decode_envelope(response, "session update").await?;

        if envelope.code != 200 {
            return Err(
                QaChatError::Api(format!("Session update failed: {}", envelope.message)).into(),
            );
        }

        Ok(())
    }

    /// Upload a file to the server
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, the request fails,
    /// or the server rejects the upload
    pub async fn upload_file(&self, path: &Path) -> Result<UploadRecord> {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|s| s.to_string())
            .ok_or_else(|| QaChatError::Api(format!("Invalid file name: {}", path.display())))?;

        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;

        let part = reqwest::multipart::Part::bytes(bytes).file_name(file_name);
        let form = reqwest::multipart::Form::new().part("file", part);

        let response = self
            .http
            .post(self.endpoint("/api/upload"))
            .timeout(self.timeout)
            .multipart(form)
            .send()
            .await
            .map_err(|e| QaChatError::Api(format!("Upload request failed: {}", e)))?;

        let envelope: Envelope<UploadRecord> = self.decode_envelope(response, "upload").await?;

        if envelope.code != 200 {
            return Err(QaChatError::Api(format!("Upload failed: {}", envelope.message)).into());
        }

        envelope
            .data
            .ok_or_else(|| QaChatError::Api("Upload response missing data".to_string()).into())
    }

    /// Delete an uploaded file by its saved name
    ///
    /// # Errors
    ///
    /// Returns `QaChatError::NotFound` if the file is gone already,
    /// `QaChatError::Api` for other failures
    pub async fn delete_file(&self, saved_name: &str) -> Result<()> {
        let response = self
            .http
            .delete(self.endpoint(&format!("/api/delete/{}", saved_name)))
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| QaChatError::Api(format!("File delete request failed: {}", e)))?;

        let envelope: Envelope<serde_json::Value> =
            self.decode_envelope(response, "file delete").await?;

        if envelope.code != 200 {
            return Err(
                QaChatError::Api(format!("File delete failed: {}", envelope.message)).into(),
            );
        }

        Ok(())
    }

    /// Query the status of a background processing task
    ///
    /// # Errors
    ///
    /// Returns `QaChatError::Api` if the request fails or the response
    /// carries no task record
    pub async fn task_status(&self, task_id: i64) -> Result<TaskStatusRecord> {
        let response = self
            .http
            .get(self.endpoint(&format!("/api/task/status/{}", task_id)))
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| QaChatError::Api(format!("Task status request failed: {}", e)))?;

        let envelope: Envelope<TaskStatusRecord> =
            self.decode_envelope(response, "task status").await?;

        // A 404 envelope code means "finished or unknown"; the record's
        // status field already says so.
        envelope
            .data
            .ok_or_else(|| QaChatError::Api("Task status response missing data".to_string()).into())
    }

    async fn decode_envelope<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
        what: &str,
    ) -> Result<Envelope<T>> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(map_status_error(status, what, &body).into());
        }

        response.json().await.map_err(|e| {
            tracing::error!("Failed to parse {} response: {}", what, e);
            QaChatError::Api(format!("Failed to parse {} response: {}", what, e)).into()
        })
    }
}

#[async_trait]
impl KnowledgeApi for ApiClient {
    async fn create_knowledge_base(
        &self,
        name: &str,
        description: &str,
    ) -> Result<KnowledgeBaseRecord> {
        let response = self
            .http
            .post(self.endpoint("/api/knowledge_base/create"))
            .timeout(self.timeout)
            .json(&CreateKnowledgeBaseRequest { name, description })
            .send()
            .await
            .map_err(|e| {
                QaChatError::Api(format!("Knowledge base create request failed: {}", e))
            })?;

        let envelope: Envelope<KnowledgeBaseRecord> = self
            .decode_envelope(response, "knowledge base create")
            .await?;

        if envelope.code != 200 {
            return Err(QaChatError::Api(format!(
                "Knowledge base creation failed: {}",
                envelope.message
            ))
            .into());
        }

        envelope.data.ok_or_else(|| {
            QaChatError::Api("Knowledge base create response missing data".to_string()).into()
        })
    }

    async fn delete_knowledge_base(&self, id: &str) -> Result<()> {
        let response = self
            .http
            .delete(self.endpoint(&format!("/api/knowledge_base/delete/{}", id)))
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| {
                QaChatError::Api(format!("Knowledge base delete request failed: {}", e))
            })?;

        let envelope: Envelope<serde_json::Value> = self
            .decode_envelope(response, "knowledge base delete")
            .await?;

        if envelope.code != 200 {
            return Err(QaChatError::Api(format!(
                "Knowledge base deletion failed: {}",
                envelope.message
            ))
            .into());
        }

        Ok(())
    }
}

fn map_status_error(status: reqwest::StatusCode, what: &str, body: &str) -> QaChatError {
    if status == reqwest::StatusCode::NOT_FOUND {
        QaChatError::NotFound(format!("{}: {}", what, body))
    } else if status.is_server_error() {
        QaChatError::Api(format!("Server error during {} ({}): {}", what, status, body))
    } else {
        QaChatError::Api(format!("{} returned HTTP {}: {}", what, status, body))
    }
}
