use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use futures::stream;
use reqwest::{
    header::ACCEPT,
    multipart::{Form, Part},
    Body, Client, Response,
};
use serde::de::DeserializeOwned;
use shared::{
    domain::{Action, HistoryEntry},
    error::ApiError,
    protocol::{HistoryResponse, PredictRequest, PredictResponse, UploadResponse},
};
use tracing::{debug, info};

use crate::{
    config::{ClientSettings, Endpoints},
    error::ClientError,
    types::{UploadOutcome, VideoSelection},
    upload::ProgressReporter,
};

/// Multipart form field the backend reads the video from.
pub const UPLOAD_FIELD: &str = "video";
const UPLOAD_CHUNK_SIZE: usize = 64 * 1024;

/// The remote recognition service. Implementations normalize transport-level
/// outcomes into [`ClientError`].
#[async_trait]
pub trait RecognitionGateway: Send + Sync {
    async fn upload_video(
        &self,
        selection: &VideoSelection,
        progress: ProgressReporter,
    ) -> Result<UploadOutcome, ClientError>;
    async fn predict(&self, video_url: &str) -> Result<Vec<Action>, ClientError>;
    async fn list_history(&self) -> Result<Vec<HistoryEntry>, ClientError>;
    async fn clear_history(&self) -> Result<(), ClientError>;
}

pub struct HttpGateway {
    http: Client,
    endpoints: Endpoints,
}

impl HttpGateway {
    pub fn new(settings: &ClientSettings) -> anyhow::Result<Self> {
        let endpoints = settings.endpoints()?;
        let mut builder = Client::builder().connect_timeout(settings.connect_timeout());
        if let Some(timeout) = settings.request_timeout() {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().context("failed to build http client")?;
        Ok(Self::with_client(http, endpoints))
    }

    pub fn with_client(http: Client, endpoints: Endpoints) -> Self {
        Self { http, endpoints }
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }
}

#[async_trait]
impl RecognitionGateway for HttpGateway {
    async fn upload_video(
        &self,
        selection: &VideoSelection,
        progress: ProgressReporter,
    ) -> Result<UploadOutcome, ClientError> {
        let part = Part::stream_with_length(
            chunked_body(selection.data(), progress),
            selection.size(),
        )
        .file_name(selection.file_name().to_string())
        .mime_str(selection.media_type())
        .map_err(|err| {
            ClientError::validation(format!(
                "invalid media type '{}': {err}",
                selection.media_type()
            ))
        })?;
        let form = Form::new().part(UPLOAD_FIELD, part);

        info!(
            url = %self.endpoints.files,
            file = selection.file_name(),
            size = selection.size(),
            "uploading video"
        );
        let response = self
            .http
            .post(self.endpoints.files.clone())
            .multipart(form)
            .send()
            .await?;
        let body: UploadResponse = decode_json(response).await?;
        Ok(UploadOutcome::new(body.message))
    }

    async fn predict(&self, video_url: &str) -> Result<Vec<Action>, ClientError> {
        info!(url = %self.endpoints.predict, video_url, "requesting prediction");
        let response = self
            .http
            .post(self.endpoints.predict.clone())
            .header(ACCEPT, "application/json")
            .json(&PredictRequest {
                video_url: video_url.to_string(),
            })
            .send()
            .await?;
        let body: PredictResponse = decode_json(response).await?;
        Ok(body.into_actions())
    }

    async fn list_history(&self) -> Result<Vec<HistoryEntry>, ClientError> {
        debug!(url = %self.endpoints.actions, "fetching history");
        let response = self
            .http
            .get(self.endpoints.actions.clone())
            .header(ACCEPT, "application/json")
            .send()
            .await?;
        let body: HistoryResponse = decode_json(response).await?;
        Ok(body.actions)
    }

    async fn clear_history(&self) -> Result<(), ClientError> {
        info!(url = %self.endpoints.actions, "clearing history");
        let response = self
            .http
            .delete(self.endpoints.actions.clone())
            .send()
            .await?;
        let body = checked_body(response).await?;
        if !body.iter().all(u8::is_ascii_whitespace) {
            serde_json::from_slice::<serde_json::Value>(&body)?;
        }
        Ok(())
    }
}

/// Streams the video in fixed-size chunks, reporting the running byte count as
/// each chunk is handed to the transport.
fn chunked_body(data: Arc<Vec<u8>>, progress: ProgressReporter) -> Body {
    let total = data.len();
    let chunks = (0..total).step_by(UPLOAD_CHUNK_SIZE).map(move |start| {
        let end = (start + UPLOAD_CHUNK_SIZE).min(total);
        progress.report(end as u64, total as u64);
        Ok::<_, std::io::Error>(data[start..end].to_vec())
    });
    Body::wrap_stream(stream::iter(chunks))
}

async fn checked_body(response: Response) -> Result<Vec<u8>, ClientError> {
    let status = response.status();
    let body = response.bytes().await?;
    if !status.is_success() {
        return Err(ClientError::Server {
            status: status.as_u16(),
            message: ApiError::message_from_body(&body),
        });
    }
    Ok(body.to_vec())
}

async fn decode_json<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    let body = checked_body(response).await?;
    Ok(serde_json::from_slice(&body)?)
}

#[cfg(test)]
#[path = "tests/gateway_tests.rs"]
mod tests;
