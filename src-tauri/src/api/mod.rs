use async_trait::async_trait;
use serde_json::Value;

pub mod http;
pub mod types;
pub use types::*;

/// The seam between the UI session and the StoryLens backend. One method per
/// REST operation; `HttpBackend` is the real implementation, tests supply
/// mocks.
#[async_trait]
pub trait StoryBackend: Send + Sync {
    /// POST /api/upload — multipart image + story_type. The single
    /// story-generating call.
    async fn upload_image(&self, request: UploadRequest) -> Result<UploadResponse, ApiError>;

    /// POST /api/audio/generate — synthesize narration for `text`.
    async fn generate_audio(&self, text: &str, voice: &str) -> Result<AudioResponse, ApiError>;

    /// GET /health.
    async fn health(&self) -> Result<HealthStatus, ApiError>;

    /// GET /api/upload/status — implementation-defined payload.
    async fn upload_status(&self) -> Result<Value, ApiError>;

    /// GET /api/audio/status/tts — implementation-defined payload.
    async fn tts_status(&self) -> Result<Value, ApiError>;

    /// GET /api/stories/stats/summary.
    async fn file_stats(&self) -> Result<FileStats, ApiError>;

    /// DELETE /api/audio/{filename}.
    async fn delete_audio(&self, filename: &str) -> Result<Value, ApiError>;

    /// GET /api/audio/{filename} — raw bytes, for the download affordance.
    async fn fetch_audio(&self, filename: &str) -> Result<Vec<u8>, ApiError>;

    /// URL of an uploaded image asset. Pure string composition.
    fn image_url(&self, filename: &str) -> String;

    /// URL of a generated audio asset. Pure string composition.
    fn audio_url(&self, filename: &str) -> String;
}
