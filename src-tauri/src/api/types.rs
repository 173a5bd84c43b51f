use serde::{Deserialize, Serialize};

/// Error type for backend operations. Every expected failure path is a
/// variant here; commands stringify it for the webview.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Rejected before any network call (bad file, no selection, busy).
    #[error("{0}")]
    Validation(String),
    /// The fixed 30 s client timeout elapsed.
    #[error("Request timed out — the backend may still be generating")]
    Timeout,
    /// Transport-level failure (refused connection, DNS, TLS).
    #[error("Connection failed: {0}")]
    Connection(String),
    /// Non-2xx response. `detail` is the backend's own message when the
    /// body carried one, else a generic fallback.
    #[error("{detail}")]
    Backend { status: u16, detail: String },
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl ApiError {
    pub fn is_validation(&self) -> bool {
        matches!(self, ApiError::Validation(_))
    }
}

/// Requested generation mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoryKind {
    Story,
    Poem,
}

impl StoryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoryKind::Story => "story",
            StoryKind::Poem => "poem",
        }
    }
}

impl Default for StoryKind {
    fn default() -> Self {
        StoryKind::Story
    }
}

/// One image ready to be sent: raw bytes plus the metadata the multipart
/// form needs. Transient — consumed by a single upload call.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub filename: String,
    pub mime: String,
    pub bytes: Vec<u8>,
    pub kind: StoryKind,
}

/// Wire shape of POST /api/upload's success body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub story_type: StoryKind,
    pub image_filename: String,
    pub image_path: String,
    pub generation_time: f64,
    pub model_used: String,
    pub created_at: String,
    pub message: String,
}

/// Wire shape of POST /api/audio/generate's success body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioResponse {
    pub audio_filename: String,
    pub audio_path: String,
    pub generation_time: f64,
    pub duration: f64,
    pub model_used: String,
    pub message: String,
}

/// The generated text artifact plus its provenance. Immutable once created;
/// lives for one session at most.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoryRecord {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub story_type: StoryKind,
    pub image_filename: String,
    pub generation_time: f64,
    pub model_used: String,
    pub created_at: String,
}

impl From<UploadResponse> for StoryRecord {
    fn from(r: UploadResponse) -> Self {
        StoryRecord {
            id: r.id,
            title: r.title,
            content: r.content,
            story_type: r.story_type,
            image_filename: r.image_filename,
            generation_time: r.generation_time,
            model_used: r.model_used,
            created_at: r.created_at,
        }
    }
}

/// The narration artifact for one story record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioRecord {
    pub audio_filename: String,
    pub generation_time: f64,
    pub duration: f64,
    pub model_used: String,
}

impl From<AudioResponse> for AudioRecord {
    fn from(r: AudioResponse) -> Self {
        AudioRecord {
            audio_filename: r.audio_filename,
            generation_time: r.generation_time,
            duration: r.duration,
            model_used: r.model_used,
        }
    }
}

/// GET /health.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub kosmos_model_loaded: bool,
    #[serde(default)]
    pub tts_model_loaded: bool,
    #[serde(default)]
    pub upload_dir_exists: bool,
    #[serde(default)]
    pub error: Option<String>,
}

/// GET /api/stories/stats/summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileStats {
    pub total_images: u64,
    pub total_audio_files: u64,
    pub total_size_mb: f64,
    pub upload_dir: String,
    #[serde(default)]
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn story_kind_round_trips_lowercase() {
        assert_eq!(serde_json::to_string(&StoryKind::Poem).unwrap(), "\"poem\"");
        let k: StoryKind = serde_json::from_str("\"story\"").unwrap();
        assert_eq!(k, StoryKind::Story);
    }

    #[test]
    fn upload_response_maps_to_record() {
        let body = r#"{
            "id": 1723456789,
            "title": "The Quiet Harbor",
            "content": "Line one.\nLine two.",
            "story_type": "poem",
            "image_filename": "img_1723456789.png",
            "image_path": "./uploads/images/img_1723456789.png",
            "generation_time": 4.21,
            "model_used": "microsoft/kosmos-2-patch14-224",
            "created_at": "2025-08-12 10:39:49",
            "message": "Story generated successfully!"
        }"#;
        let resp: UploadResponse = serde_json::from_str(body).unwrap();
        let record = StoryRecord::from(resp);
        assert_eq!(record.story_type, StoryKind::Poem);
        assert_eq!(record.content, "Line one.\nLine two.");
        assert_eq!(record.image_filename, "img_1723456789.png");
    }

    #[test]
    fn backend_error_displays_detail_verbatim() {
        let e = ApiError::Backend {
            status: 400,
            detail: "Image too dark".into(),
        };
        assert_eq!(e.to_string(), "Image too dark");
    }
}
