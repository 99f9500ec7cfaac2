use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart;
use tracing::{debug, warn};

use crate::config::ApiConfig;
use crate::error::{CoreError, Result};
use crate::schema::{
    Acknowledgment, ChatReply, ChatRequest, DashboardEntry, Reminder, UploadResponse,
};

/// Backend calls used by the reminder subsystem.
#[async_trait]
pub trait ReminderApi: Send + Sync + 'static {
    /// Fetch the reminders that are currently due.
    /// A non-success status is an error so the caller can skip the cycle.
    async fn fetch_due(&self) -> Result<Vec<Reminder>>;

    /// Send an acknowledgment. Resolves once the backend has answered,
    /// whatever the status; only transport failures are errors.
    async fn acknowledge(&self, ack: &Acknowledgment) -> Result<()>;
}

/// Backend calls used by the chat session.
#[async_trait]
pub trait ChatApi: Send + Sync + 'static {
    async fn send_chat(&self, request: &ChatRequest) -> Result<ChatReply>;

    async fn dashboard(&self) -> Result<Vec<DashboardEntry>>;

    async fn upload(&self, path: &Path) -> Result<UploadResponse>;

    async fn delete_data(&self) -> Result<()>;

    /// Absolute URL of the export download.
    fn export_url(&self) -> String;

    /// Resolve a possibly relative URL returned by the backend.
    fn resolve_url(&self, url: &str) -> String;
}

/// Which upload endpoint a file goes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    Image,
    Document,
}

impl UploadKind {
    /// Images are routed by MIME type guessed from the file extension.
    pub fn for_path(path: &Path) -> Self {
        let mime = mime_guess::from_path(path).first_or_octet_stream();
        if mime.type_().as_str() == "image" {
            UploadKind::Image
        } else {
            UploadKind::Document
        }
    }

    pub fn endpoint(self) -> &'static str {
        match self {
            UploadKind::Image => "/upload-image",
            UploadKind::Document => "/upload-doc",
        }
    }
}

/// reqwest-backed client for the chat backend.
pub struct HttpClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpClient {
    pub fn new(config: &ApiConfig) -> Self {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_seconds))
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Check if the backend is reachable.
    pub async fn health_check(&self) -> bool {
        matches!(
            self.client.get(self.url("/health")).send().await,
            Ok(r) if r.status().is_success()
        )
    }
}

#[async_trait]
impl ReminderApi for HttpClient {
    async fn fetch_due(&self) -> Result<Vec<Reminder>> {
        let response = self.client.get(self.url("/reminders-due")).send().await?;

        if !response.status().is_success() {
            return Err(CoreError::Status(response.status().as_u16()));
        }

        let due: Vec<Reminder> = response.json().await?;
        Ok(due)
    }

    async fn acknowledge(&self, ack: &Acknowledgment) -> Result<()> {
        let response = self
            .client
            .post(self.url("/reminders-ack"))
            .json(ack)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            debug!(id = %ack.id, snooze = ?ack.snooze_minutes, "reminder acknowledged");
        } else {
            warn!(id = %ack.id, status = status.as_u16(), "acknowledgment not accepted");
        }
        Ok(())
    }
}

#[async_trait]
impl ChatApi for HttpClient {
    async fn send_chat(&self, request: &ChatRequest) -> Result<ChatReply> {
        let response = self
            .client
            .post(self.url("/chat"))
            .json(request)
            .send()
            .await?;

        // Error bodies still carry `{error}`, so parse regardless of status.
        let status = response.status();
        let body = response.text().await?;
        match serde_json::from_str::<ChatReply>(&body) {
            Ok(reply) => Ok(reply),
            Err(_) if !status.is_success() => Err(CoreError::Status(status.as_u16())),
            Err(e) => Err(CoreError::Backend(format!("parse chat reply: {e}"))),
        }
    }

    async fn dashboard(&self) -> Result<Vec<DashboardEntry>> {
        let response = self.client.get(self.url("/dashboard")).send().await?;

        if !response.status().is_success() {
            return Err(CoreError::Status(response.status().as_u16()));
        }

        let value: serde_json::Value = response.json().await?;
        // Anything that isn't a list renders as an empty dashboard.
        let entries: Vec<DashboardEntry> = match value {
            serde_json::Value::Array(items) => items
                .into_iter()
                .map(|item| serde_json::from_value(item).unwrap_or_default())
                .collect(),
            _ => Vec::new(),
        };
        Ok(entries)
    }

    async fn upload(&self, path: &Path) -> Result<UploadResponse> {
        let bytes = tokio::fs::read(path).await?;
        let kind = UploadKind::for_path(path);
        let mime = mime_guess::from_path(path).first_or_octet_stream();
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());

        let part = multipart::Part::bytes(bytes)
            .file_name(file_name)
            .mime_str(mime.essence_str())
            .map_err(|e| CoreError::Upload(format!("failed to create multipart: {e}")))?;
        let form = multipart::Form::new().part("file", part);

        debug!(path = %path.display(), endpoint = kind.endpoint(), "uploading file");

        let response = self
            .client
            .post(self.url(kind.endpoint()))
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        match serde_json::from_str::<UploadResponse>(&body) {
            Ok(parsed) => Ok(parsed),
            Err(_) if !status.is_success() => Err(CoreError::Status(status.as_u16())),
            Err(e) => Err(CoreError::Upload(format!("parse upload response: {e}"))),
        }
    }

    async fn delete_data(&self) -> Result<()> {
        let response = self.client.delete(self.url("/delete-data")).send().await?;
        if !response.status().is_success() {
            return Err(CoreError::Status(response.status().as_u16()));
        }
        Ok(())
    }

    fn export_url(&self) -> String {
        self.url("/export-data")
    }

    fn resolve_url(&self, url: &str) -> String {
        if url.starts_with("http://") || url.starts_with("https://") {
            url.to_string()
        } else if url.starts_with('/') {
            self.url(url)
        } else {
            format!("{}/{}", self.base_url, url)
        }
    }
}
