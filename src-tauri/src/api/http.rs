use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::time::Duration;
use url::Url;

use super::{
    ApiError, AudioResponse, FileStats, HealthStatus, StoryBackend, UploadRequest, UploadResponse,
};

/// Fixed request timeout. AI endpoints are slow; anything past this is
/// reported as `ApiError::Timeout`, never swallowed.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP implementation of [`StoryBackend`] over the StoryLens REST API.
pub struct HttpBackend {
    base_url: String,
    client: Client,
}

impl HttpBackend {
    /// Build a client for `base_url` (e.g. `http://localhost:8000`).
    /// The URL is validated up front so a typo fails loudly at startup,
    /// not on the first upload.
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        let trimmed = base_url.trim_end_matches('/').to_string();
        Url::parse(&trimmed)
            .map_err(|e| ApiError::Validation(format!("Invalid backend URL '{}': {}", trimmed, e)))?;
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ApiError::Connection(e.to_string()))?;
        Ok(Self {
            base_url: trimmed,
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        log::info!("API request: GET {}", path);
        let response = self
            .client
            .get(self.endpoint(path))
            .send()
            .await
            .map_err(|e| map_send_error(path, e))?;
        read_json(path, response).await
    }
}

#[async_trait]
impl StoryBackend for HttpBackend {
    async fn upload_image(&self, request: UploadRequest) -> Result<UploadResponse, ApiError> {
        let path = "/api/upload";
        log::info!(
            "API request: POST {} ({}, {} bytes, kind={})",
            path,
            request.filename,
            request.bytes.len(),
            request.kind.as_str()
        );

        let part = reqwest::multipart::Part::bytes(request.bytes)
            .file_name(request.filename)
            .mime_str(&request.mime)
            .map_err(|e| ApiError::Validation(format!("Bad upload content type: {}", e)))?;
        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("story_type", request.kind.as_str());

        let response = self
            .client
            .post(self.endpoint(path))
            .multipart(form)
            .send()
            .await
            .map_err(|e| map_send_error(path, e))?;
        read_json(path, response).await
    }

    async fn generate_audio(&self, text: &str, voice: &str) -> Result<AudioResponse, ApiError> {
        let path = "/api/audio/generate";
        log::info!(
            "API request: POST {} ({} chars, voice={})",
            path,
            text.len(),
            voice
        );
        let response = self
            .client
            .post(self.endpoint(path))
            .json(&json!({ "text": text, "voice": voice }))
            .send()
            .await
            .map_err(|e| map_send_error(path, e))?;
        read_json(path, response).await
    }

    async fn health(&self) -> Result<HealthStatus, ApiError> {
        self.get_json("/health").await
    }

    async fn upload_status(&self) -> Result<Value, ApiError> {
        self.get_json("/api/upload/status").await
    }

    async fn tts_status(&self) -> Result<Value, ApiError> {
        self.get_json("/api/audio/status/tts").await
    }

    async fn file_stats(&self) -> Result<FileStats, ApiError> {
        self.get_json("/api/stories/stats/summary").await
    }

    async fn delete_audio(&self, filename: &str) -> Result<Value, ApiError> {
        let path = format!("/api/audio/{}", filename);
        log::info!("API request: DELETE {}", path);
        let response = self
            .client
            .delete(self.endpoint(&path))
            .send()
            .await
            .map_err(|e| map_send_error(&path, e))?;
        read_json(&path, response).await
    }

    async fn fetch_audio(&self, filename: &str) -> Result<Vec<u8>, ApiError> {
        let path = format!("/api/audio/{}", filename);
        log::info!("API request: GET {}", path);
        let response = self
            .client
            .get(self.endpoint(&path))
            .send()
            .await
            .map_err(|e| map_send_error(&path, e))?;
        let status = response.status();
        if !status.is_success() {
            return Err(read_error(&path, status, response).await);
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ApiError::Connection(e.to_string()))?;
        log::info!("API response: {} {} ({} bytes)", status, path, bytes.len());
        Ok(bytes.to_vec())
    }

    fn image_url(&self, filename: &str) -> String {
        format!("{}/uploads/images/{}", self.base_url, filename)
    }

    fn audio_url(&self, filename: &str) -> String {
        format!("{}/api/audio/{}", self.base_url, filename)
    }
}

fn map_send_error(path: &str, e: reqwest::Error) -> ApiError {
    if e.is_timeout() {
        log::error!("API timeout on {}", path);
        ApiError::Timeout
    } else {
        log::error!("API connection error on {}: {}", path, e);
        ApiError::Connection(e.to_string())
    }
}

/// Parse a 2xx body as `T`, or turn a non-2xx into `ApiError::Backend` with
/// the body's `detail` field surfaced verbatim when present.
async fn read_json<T: DeserializeOwned>(path: &str, response: Response) -> Result<T, ApiError> {
    let status = response.status();
    if !status.is_success() {
        return Err(read_error(path, status, response).await);
    }
    log::info!("API response: {} {}", status, path);
    response
        .json::<T>()
        .await
        .map_err(|e| ApiError::InvalidResponse(e.to_string()))
}

async fn read_error(path: &str, status: StatusCode, response: Response) -> ApiError {
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "failed to read error body".into());
    log::error!("API response: {} {} — {}", status, path, body);
    let detail = extract_detail(&body)
        .unwrap_or_else(|| format!("Backend request failed (HTTP {})", status.as_u16()));
    ApiError::Backend {
        status: status.as_u16(),
        detail,
    }
}

/// Pull the human-readable `detail` field out of a JSON error body.
fn extract_detail(body: &str) -> Option<String> {
    let v: Value = serde_json::from_str(body).ok()?;
    v.get("detail")?.as_str().map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_url_composes_fixed_prefix() {
        let backend = HttpBackend::new("http://localhost:8000").unwrap();
        assert_eq!(
            backend.image_url("cat.png"),
            "http://localhost:8000/uploads/images/cat.png"
        );
    }

    #[test]
    fn audio_url_composes_fixed_prefix() {
        let backend = HttpBackend::new("http://localhost:8000").unwrap();
        assert_eq!(
            backend.audio_url("cat.mp3"),
            "http://localhost:8000/api/audio/cat.mp3"
        );
    }

    #[test]
    fn trailing_slash_in_base_url_is_trimmed() {
        let backend = HttpBackend::new("http://192.168.1.20:8000/").unwrap();
        assert_eq!(
            backend.audio_url("a.wav"),
            "http://192.168.1.20:8000/api/audio/a.wav"
        );
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        assert!(matches!(
            HttpBackend::new("not a url"),
            Err(e) if e.is_validation()
        ));
    }

    #[test]
    fn extract_detail_reads_backend_message() {
        assert_eq!(
            extract_detail(r#"{"detail": "Image too dark"}"#),
            Some("Image too dark".to_string())
        );
    }

    #[test]
    fn extract_detail_handles_non_json_bodies() {
        assert_eq!(extract_detail("<html>502 Bad Gateway</html>"), None);
        assert_eq!(extract_detail(r#"{"error": "no detail key"}"#), None);
    }
}
