use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};

use recordedit_core::services::{AttachmentService, FileFolder, RecordService, UploadService};
use recordedit_core::{Attachment, AttachmentDraft, AttachmentPatch, FileHandle, ServiceError};

use crate::config::ClientConfig;

#[derive(Clone)]
pub struct ApiClient {
    base_url: String,
    token: Option<String>,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    path: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    message: String,
}

/// Decides how a failed call is reported to the save coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Endpoint {
    Files,
    Attachments,
    Records,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::from_config(&ClientConfig::new(base_url))
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        let base_url = sanitize_base_url(config.api_url.clone())?;
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            base_url,
            token: config.token.clone(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Appends `segments` to the base URL, percent-encoding each one.
    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)
            .with_context(|| format!("invalid base URL {}", self.base_url))?;
        url.path_segments_mut()
            .map_err(|_| anyhow!("base URL {} cannot carry a path", self.base_url))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(
        &self,
        method: Method,
        segments: &[&str],
        endpoint: Endpoint,
    ) -> Result<RequestBuilder, ServiceError> {
        let url = self.url(segments).map_err(|err| endpoint.transport_error(&err))?;
        let builder = self.client.request(method, url);
        Ok(match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        })
    }

    async fn send(&self, request: RequestBuilder, endpoint: Endpoint) -> Result<Response, ServiceError> {
        let response = request
            .send()
            .await
            .map_err(|err| endpoint.transport_error(&anyhow::Error::new(err)))?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorResponse>(&body)
            .map(|err| err.message)
            .unwrap_or_else(|_| {
                if body.trim().is_empty() {
                    status.to_string()
                } else {
                    body
                }
            });
        tracing::debug!(%status, ?endpoint, %message, "request rejected");
        Err(endpoint.status_error(status, message))
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        endpoint: Endpoint,
    ) -> Result<T, ServiceError> {
        let response = self.send(request, endpoint).await?;
        response
            .json::<T>()
            .await
            .map_err(|err| endpoint.transport_error(&anyhow::Error::new(err).context("malformed response body")))
    }
}

impl Endpoint {
    fn status_error(self, status: StatusCode, message: String) -> ServiceError {
        match (self, status) {
            (_, StatusCode::NOT_FOUND) => ServiceError::NotFound(message),
            (Endpoint::Files, _) => ServiceError::Upload(message),
            (_, StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY) => {
                ServiceError::Validation(message)
            }
            _ => ServiceError::Unavailable(format!("{status}: {message}")),
        }
    }

    fn transport_error(self, err: &anyhow::Error) -> ServiceError {
        let message = format!("{err:#}");
        match self {
            Endpoint::Files => ServiceError::Upload(message),
            Endpoint::Attachments | Endpoint::Records => ServiceError::Unavailable(message),
        }
    }
}

#[async_trait]
impl UploadService for ApiClient {
    async fn upload(&self, file: &FileHandle, folder: FileFolder) -> Result<String, ServiceError> {
        let mut part = Part::bytes(file.bytes.to_vec()).file_name(file.name.clone());
        if let Some(mime) = &file.mime {
            part = part
                .mime_str(mime)
                .map_err(|err| ServiceError::Upload(format!("invalid mime type {mime}: {err}")))?;
        }
        let form = Form::new()
            .text("fileFolder", folder.as_str())
            .part("file", part);
        let request = self
            .request(Method::POST, &["files"], Endpoint::Files)?
            .multipart(form);
        let response: UploadResponse = self.send_json(request, Endpoint::Files).await?;
        tracing::debug!(name = %file.name, path = %response.path, "uploaded file");
        Ok(response.path)
    }
}

#[async_trait]
impl AttachmentService for ApiClient {
    async fn create(&self, draft: AttachmentDraft) -> Result<Attachment, ServiceError> {
        let request = self
            .request(Method::POST, &["attachments"], Endpoint::Attachments)?
            .json(&draft);
        self.send_json(request, Endpoint::Attachments).await
    }

    async fn update(&self, id: &str, patch: AttachmentPatch) -> Result<Attachment, ServiceError> {
        let request = self
            .request(Method::PATCH, &["attachments", id], Endpoint::Attachments)?
            .json(&patch);
        self.send_json(request, Endpoint::Attachments).await
    }

    async fn delete(&self, id: &str) -> Result<(), ServiceError> {
        let request =
            self.request(Method::DELETE, &["attachments", id], Endpoint::Attachments)?;
        self.send(request, Endpoint::Attachments).await?;
        Ok(())
    }
}

#[async_trait]
impl RecordService for ApiClient {
    async fn update(
        &self,
        object_name_singular: &str,
        record_id: &str,
        fields: Map<String, Value>,
    ) -> Result<Map<String, Value>, ServiceError> {
        let request = self
            .request(
                Method::PATCH,
                &["records", object_name_singular, record_id],
                Endpoint::Records,
            )?
            .json(&fields);
        self.send_json(request, Endpoint::Records).await
    }
}

fn sanitize_base_url(mut base: String) -> Result<String> {
    base = base.trim().to_string();
    if !base.starts_with("http://") && !base.starts_with("https://") {
        base = format!("http://{base}");
    }
    while base.ends_with('/') {
        base.pop();
    }
    let _ = Url::parse(&base).context("invalid base URL")?;
    Ok(base)
}
