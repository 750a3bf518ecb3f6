use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{multipart, Client, Response};
use serde::Deserialize;
use tracing::debug;

use crate::{
    config::HttpControlPlaneConfig,
    store::{ControlPlane, PresignRequest, PresignedUpload, ProxiedUpload},
    Credential, UploadError, UploadResult,
};

/// Control plane reached over HTTP
#[derive(Debug, Clone)]
pub struct HttpControlPlane {
    client: Client,
    config: HttpControlPlaneConfig,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    url: Option<String>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: Option<String>,
    message: Option<String>,
}

impl HttpControlPlane {
    pub fn new(config: HttpControlPlaneConfig) -> UploadResult<Self> {
        let client = Client::builder().timeout(config.request_timeout).build()?;
        Ok(Self { client, config })
    }

    /// Reuse an existing client (its timeout settings win)
    pub fn with_client(client: Client, config: HttpControlPlaneConfig) -> Self {
        Self { client, config }
    }

    pub fn from_env() -> UploadResult<Self> {
        Self::new(HttpControlPlaneConfig::from_env()?)
    }

    pub fn config(&self) -> &HttpControlPlaneConfig {
        &self.config
    }

    /// Turn a non-2xx response into `UploadError::Rejected`, preferring the
    /// `{error}` field of a JSON body
    async fn ensure_success(response: Response) -> UploadResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorResponse>(&body)
            .ok()
            .and_then(|e| e.error.or(e.message))
            .unwrap_or_else(|| {
                if body.trim().is_empty() {
                    status.canonical_reason().unwrap_or("request failed").to_string()
                } else {
                    body.trim().to_string()
                }
            });
        Err(UploadError::rejected(status.as_u16(), message))
    }
}

#[async_trait]
impl ControlPlane for HttpControlPlane {
    async fn upload(&self, request: ProxiedUpload, credential: &Credential) -> UploadResult<String> {
        let file_part = multipart::Part::bytes(request.data.to_vec())
            .file_name(request.file_name.clone())
            .mime_str(&request.mime_type)?;
        let form = multipart::Form::new()
            .part("file", file_part)
            .text("folder", request.folder)
            .text("fileName", request.file_name);

        let url = self.config.url(&self.config.upload_path);
        debug!(%url, "proxied upload");
        let response = credential
            .apply(self.client.post(&url))
            .multipart(form)
            .send()
            .await?;
        let body: UploadResponse = Self::ensure_success(response).await?.json().await?;

        match (body.url, body.error) {
            (_, Some(error)) => Err(UploadError::upload_failed(error)),
            (Some(url), None) if !url.is_empty() => Ok(url),
            _ => Err(UploadError::upload_failed("control plane returned no URL")),
        }
    }

    async fn presign(&self, request: PresignRequest, credential: &Credential) -> UploadResult<PresignedUpload> {
        let url = self.config.url(&self.config.presign_path);
        debug!(%url, file_name = %request.file_name, "requesting pre-signed URL");
        let response = credential
            .apply(self.client.post(&url))
            .json(&request)
            .send()
            .await?;
        let presigned: PresignedUpload = Self::ensure_success(response).await?.json().await?;
        if presigned.upload_url.is_empty() || presigned.final_url.is_empty() {
            return Err(UploadError::upload_failed("control plane returned an empty pre-signed URL"));
        }
        Ok(presigned)
    }

    async fn put_presigned(&self, upload_url: &str, mime_type: &str, data: Bytes) -> UploadResult<()> {
        let response = self
            .client
            .put(upload_url)
            .header(reqwest::header::CONTENT_TYPE, mime_type)
            .body(data)
            .send()
            .await?;
        Self::ensure_success(response).await?;
        Ok(())
    }

    async fn delete(&self, url: &str, credential: &Credential) -> UploadResult<()> {
        let endpoint = self.config.url(&self.config.delete_path);
        let response = credential
            .apply(self.client.post(&endpoint))
            .json(&serde_json::json!({ "url": url }))
            .send()
            .await?;
        Self::ensure_success(response).await?;
        Ok(())
    }
}
