// session.rs — Owns the one piece of mutable state in the app: which screen
// is showing, the active story, its narration, and the in-flight flags.
//
// Commands in lib.rs are thin wrappers over this manager, so the whole flow
// is testable against a mock backend without an AppHandle.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::api::{ApiError, AudioRecord, StoryBackend, StoryKind, StoryRecord};
use crate::upload::{PendingImage, SelectedImage};

/// The only voice the backend currently exposes.
const DEFAULT_VOICE: &str = "default";

/// The screen the webview should show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum View {
    Upload,
    Story,
}

/// A story on display plus everything attached to it. At most one narration
/// per story; it is never rebuilt and never survives "create another".
#[derive(Debug, Clone)]
pub struct ActiveStory {
    pub story: StoryRecord,
    pub audio: Option<AudioRecord>,
    generating_audio: bool,
}

impl ActiveStory {
    fn new(story: StoryRecord) -> Self {
        Self {
            story,
            audio: None,
            generating_audio: false,
        }
    }
}

/// Enum-tagged view state: the story screen cannot exist without a record.
/// The upload screen may still hold the last record so the header tab can
/// jump back to it without losing generated audio.
#[derive(Debug)]
enum ViewState {
    Upload { last: Option<ActiveStory> },
    Story { active: ActiveStory },
}

#[derive(Debug)]
struct SessionState {
    view: ViewState,
    pending: Option<PendingImage>,
    kind: StoryKind,
    uploading: bool,
}

impl SessionState {
    fn active(&self) -> Option<&ActiveStory> {
        match &self.view {
            ViewState::Upload { last } => last.as_ref(),
            ViewState::Story { active } => Some(active),
        }
    }

    fn active_mut(&mut self) -> Option<&mut ActiveStory> {
        match &mut self.view {
            ViewState::Upload { last } => last.as_mut(),
            ViewState::Story { active } => Some(active),
        }
    }
}

/// Result of a "generate audio" action. `Existing` means the request was
/// short-circuited — no network call happened.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AudioOutcome {
    Generated { record: AudioRecord },
    Existing { record: AudioRecord },
}

/// Everything the webview needs to render, in one payload.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub view: View,
    pub story: Option<StoryRecord>,
    pub audio: Option<AudioRecord>,
    pub generating_audio: bool,
    pub uploading: bool,
    pub kind: StoryKind,
    pub selected: Option<SelectedImage>,
    pub image_url: Option<String>,
    pub audio_url: Option<String>,
}

pub struct SessionManager {
    backend: Arc<dyn StoryBackend>,
    state: Mutex<SessionState>,
}

impl SessionManager {
    pub fn new(backend: Arc<dyn StoryBackend>) -> Self {
        Self {
            backend,
            state: Mutex::new(SessionState {
                view: ViewState::Upload { last: None },
                pending: None,
                kind: StoryKind::default(),
                uploading: false,
            }),
        }
    }

    pub fn backend(&self) -> Arc<dyn StoryBackend> {
        Arc::clone(&self.backend)
    }

    /// Read + validate a file and make it the pending selection. Replacing a
    /// selection drops the previous one's bytes.
    pub fn select_image(&self, path: &Path) -> Result<SelectedImage, Vec<String>> {
        {
            let s = self.state.lock().unwrap();
            if s.uploading {
                return Err(vec![
                    "An upload is in progress — wait for it to finish".to_string()
                ]);
            }
        }
        // File read happens outside the lock; large images take a moment.
        let image = PendingImage::from_path(path)?;
        log::info!(
            "Selected {} ({} bytes, {})",
            image.filename,
            image.bytes.len(),
            image.mime
        );
        let info = SelectedImage::describe(&image);
        let mut s = self.state.lock().unwrap();
        if s.uploading {
            return Err(vec![
                "An upload is in progress — wait for it to finish".to_string()
            ]);
        }
        s.pending = Some(image);
        Ok(info)
    }

    /// Drop the pending selection, releasing its bytes.
    pub fn clear_selected(&self) {
        let mut s = self.state.lock().unwrap();
        if s.pending.take().is_some() {
            log::info!("Selection cleared");
        }
    }

    /// Choose story vs poem. Locked while an upload is in flight.
    pub fn set_kind(&self, kind: StoryKind) -> Result<(), ApiError> {
        let mut s = self.state.lock().unwrap();
        if s.uploading {
            return Err(ApiError::Validation(
                "Cannot change the generation kind during an upload".into(),
            ));
        }
        s.kind = kind;
        Ok(())
    }

    /// Upload the pending image and, on success, switch to the story screen.
    /// Only one upload may be outstanding; a second call is rejected before
    /// any network activity. Success and failure both consume the selection.
    pub async fn upload(&self) -> Result<StoryRecord, ApiError> {
        let request = {
            let mut s = self.state.lock().unwrap();
            if s.uploading {
                return Err(ApiError::Validation("An upload is already in progress".into()));
            }
            let pending = s
                .pending
                .take()
                .ok_or_else(|| ApiError::Validation("No image selected".into()))?;
            s.uploading = true;
            pending.into_request(s.kind)
        };

        let result = self.backend.upload_image(request).await;

        let mut s = self.state.lock().unwrap();
        s.uploading = false;
        match result {
            Ok(response) => {
                let record: StoryRecord = response.into();
                log::info!(
                    "Story {} generated by {} in {:.2}s",
                    record.id,
                    record.model_used,
                    record.generation_time
                );
                s.view = ViewState::Story {
                    active: ActiveStory::new(record.clone()),
                };
                Ok(record)
            }
            Err(e) => {
                log::error!("Upload failed: {}", e);
                Err(e)
            }
        }
    }

    /// Narrate the active story. Reuse-only: once a record exists the call
    /// returns it without touching the network, and only one generation may
    /// be in flight at a time.
    pub async fn generate_audio(&self) -> Result<AudioOutcome, ApiError> {
        let (story_id, text) = {
            let mut s = self.state.lock().unwrap();
            let active = s
                .active_mut()
                .ok_or_else(|| ApiError::Validation("No active story to narrate".into()))?;
            if let Some(record) = &active.audio {
                log::info!("Audio for story {} already exists, reusing", active.story.id);
                return Ok(AudioOutcome::Existing {
                    record: record.clone(),
                });
            }
            if active.generating_audio {
                return Err(ApiError::Validation(
                    "Audio generation is already in progress".into(),
                ));
            }
            active.generating_audio = true;
            (active.story.id, active.story.content.clone())
        };

        let result = self.backend.generate_audio(&text, DEFAULT_VOICE).await;

        let mut s = self.state.lock().unwrap();
        match s.active_mut() {
            Some(active) if active.story.id == story_id => {
                active.generating_audio = false;
                let response = result?;
                let record = AudioRecord::from(response);
                log::info!(
                    "Audio {} generated by {} in {:.2}s",
                    record.audio_filename,
                    record.model_used,
                    record.generation_time
                );
                active.audio = Some(record.clone());
                Ok(AudioOutcome::Generated { record })
            }
            _ => {
                // The story was replaced or discarded mid-flight; never
                // attach narration to a record it was not generated for.
                log::warn!("Discarding audio result: story {} no longer active", story_id);
                result?;
                Err(ApiError::Validation(
                    "The story was closed before narration finished".into(),
                ))
            }
        }
    }

    /// "Create another": back to the upload screen with nothing retained.
    pub fn create_another(&self) -> View {
        let mut s = self.state.lock().unwrap();
        if let Some(active) = s.active() {
            log::info!("Discarding story {} and its audio", active.story.id);
        }
        s.view = ViewState::Upload { last: None };
        View::Upload
    }

    /// Header-tab navigation. Moves the active record between the two view
    /// variants without mutating it, so audio survives the round trip.
    pub fn navigate_to(&self, target: View) -> Result<View, ApiError> {
        let mut s = self.state.lock().unwrap();
        let current = std::mem::replace(&mut s.view, ViewState::Upload { last: None });
        s.view = match (current, target) {
            (ViewState::Story { active }, View::Upload) => ViewState::Upload { last: Some(active) },
            (ViewState::Upload { last: Some(active) }, View::Story) => ViewState::Story { active },
            (ViewState::Upload { last: None }, View::Story) => {
                return Err(ApiError::Validation("No story to show yet".into()));
            }
            (unchanged, _) => unchanged,
        };
        Ok(target)
    }

    pub fn active_story(&self) -> Option<StoryRecord> {
        self.state.lock().unwrap().active().map(|a| a.story.clone())
    }

    pub fn active_audio(&self) -> Option<AudioRecord> {
        self.state.lock().unwrap().active().and_then(|a| a.audio.clone())
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let s = self.state.lock().unwrap();
        let (view, active) = match &s.view {
            ViewState::Upload { last } => (View::Upload, last.as_ref()),
            ViewState::Story { active } => (View::Story, Some(active)),
        };
        SessionSnapshot {
            view,
            story: active.map(|a| a.story.clone()),
            audio: active.and_then(|a| a.audio.clone()),
            generating_audio: active.map(|a| a.generating_audio).unwrap_or(false),
            uploading: s.uploading,
            kind: s.kind,
            selected: s.pending.as_ref().map(SelectedImage::describe),
            image_url: active.map(|a| self.backend.image_url(&a.story.image_filename)),
            audio_url: active
                .and_then(|a| a.audio.as_ref())
                .map(|r| self.backend.audio_url(&r.audio_filename)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{
        AudioResponse, FileStats, HealthStatus, UploadRequest, UploadResponse,
    };
    use async_trait::async_trait;
    use serde_json::Value;

    /// Backend that must never be reached; pure state-machine tests only.
    struct UnreachableBackend;

    #[async_trait]
    impl StoryBackend for UnreachableBackend {
        async fn upload_image(&self, _: UploadRequest) -> Result<UploadResponse, ApiError> {
            panic!("network call in a state-machine test")
        }
        async fn generate_audio(&self, _: &str, _: &str) -> Result<AudioResponse, ApiError> {
            panic!("network call in a state-machine test")
        }
        async fn health(&self) -> Result<HealthStatus, ApiError> {
            panic!("network call in a state-machine test")
        }
        async fn upload_status(&self) -> Result<Value, ApiError> {
            panic!("network call in a state-machine test")
        }
        async fn tts_status(&self) -> Result<Value, ApiError> {
            panic!("network call in a state-machine test")
        }
        async fn file_stats(&self) -> Result<FileStats, ApiError> {
            panic!("network call in a state-machine test")
        }
        async fn delete_audio(&self, _: &str) -> Result<Value, ApiError> {
            panic!("network call in a state-machine test")
        }
        async fn fetch_audio(&self, _: &str) -> Result<Vec<u8>, ApiError> {
            panic!("network call in a state-machine test")
        }
        fn image_url(&self, filename: &str) -> String {
            format!("http://test/uploads/images/{}", filename)
        }
        fn audio_url(&self, filename: &str) -> String {
            format!("http://test/api/audio/{}", filename)
        }
    }

    fn manager() -> SessionManager {
        SessionManager::new(Arc::new(UnreachableBackend))
    }

    #[test]
    fn starts_on_upload_with_no_story() {
        let snapshot = manager().snapshot();
        assert_eq!(snapshot.view, View::Upload);
        assert!(snapshot.story.is_none());
        assert!(!snapshot.uploading);
        assert_eq!(snapshot.kind, StoryKind::Story);
    }

    #[test]
    fn story_view_is_unreachable_without_a_record() {
        let m = manager();
        let err = m.navigate_to(View::Story).unwrap_err();
        assert!(err.is_validation());
        assert_eq!(m.snapshot().view, View::Upload);
    }

    #[test]
    fn kind_toggle_persists() {
        let m = manager();
        m.set_kind(StoryKind::Poem).unwrap();
        assert_eq!(m.snapshot().kind, StoryKind::Poem);
    }

    #[tokio::test]
    async fn upload_without_selection_is_rejected_locally() {
        let m = manager();
        let err = m.upload().await.unwrap_err();
        assert!(err.is_validation());
    }

    #[tokio::test]
    async fn audio_without_story_is_rejected_locally() {
        let m = manager();
        let err = m.generate_audio().await.unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn create_another_resets_to_empty_upload() {
        let m = manager();
        assert_eq!(m.create_another(), View::Upload);
        assert!(m.active_story().is_none());
        assert!(m.active_audio().is_none());
    }
}
