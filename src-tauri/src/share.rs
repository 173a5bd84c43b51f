// share.rs — text composition for the share affordance and destination
// resolution for audio downloads.

use std::path::{Path, PathBuf};

use crate::api::{ApiError, StoryRecord};

/// The clipboard fallback payload: title, blank line, body.
pub fn share_text(story: &StoryRecord) -> String {
    format!("{}\n\n{}", story.title, story.content)
}

/// Where a downloaded narration lands: the user's Downloads directory,
/// falling back to the home directory when the platform has none.
pub fn download_destination(filename: &str) -> Result<PathBuf, ApiError> {
    let dir = dirs::download_dir()
        .or_else(dirs::home_dir)
        .ok_or_else(|| ApiError::Validation("No download directory available".into()))?;
    Ok(unique_destination(&dir, filename))
}

/// Never clobber an existing file; append " (n)" before the extension the
/// way browsers do.
fn unique_destination(dir: &Path, filename: &str) -> PathBuf {
    let candidate = dir.join(filename);
    if !candidate.exists() {
        return candidate;
    }
    let (stem, ext) = match filename.rsplit_once('.') {
        Some((stem, ext)) => (stem.to_string(), format!(".{}", ext)),
        None => (filename.to_string(), String::new()),
    };
    for n in 1.. {
        let candidate = dir.join(format!("{} ({}){}", stem, n, ext));
        if !candidate.exists() {
            return candidate;
        }
    }
    unreachable!()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::StoryKind;

    fn story(title: &str, content: &str) -> StoryRecord {
        StoryRecord {
            id: 1,
            title: title.into(),
            content: content.into(),
            story_type: StoryKind::Story,
            image_filename: "img.png".into(),
            generation_time: 1.0,
            model_used: "test-model".into(),
            created_at: "2025-08-12 10:00:00".into(),
        }
    }

    #[test]
    fn share_text_is_title_blank_line_body() {
        let s = story("The Quiet Harbor", "Waves came in.\nWaves went out.");
        assert_eq!(
            share_text(&s),
            "The Quiet Harbor\n\nWaves came in.\nWaves went out."
        );
    }

    #[test]
    fn destination_keeps_name_when_free() {
        let dir = std::env::temp_dir().join("storylens-share-test-free");
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        assert_eq!(
            unique_destination(&dir, "audio_1.wav"),
            dir.join("audio_1.wav")
        );
    }

    #[test]
    fn destination_dedupes_like_a_browser() {
        let dir = std::env::temp_dir().join("storylens-share-test-dedupe");
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("audio_1.wav"), b"x").unwrap();
        assert_eq!(
            unique_destination(&dir, "audio_1.wav"),
            dir.join("audio_1 (1).wav")
        );
        std::fs::write(dir.join("audio_1 (1).wav"), b"x").unwrap();
        assert_eq!(
            unique_destination(&dir, "audio_1.wav"),
            dir.join("audio_1 (2).wav")
        );
    }
}
