// upload.rs — client-side image validation and the in-memory pending image.
//
// Validation happens before any byte leaves the machine: a file that is not
// an accepted image type, or is over the size cap, is rejected with one
// message per violation, each naming the file.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::api::{StoryKind, UploadRequest};

/// Accepted image extensions, matching the backend's allow-list.
pub const ALLOWED_EXTENSIONS: [&str; 4] = ["jpeg", "jpg", "png", "webp"];

/// 10 MiB size cap, matching the backend's `max_file_size`.
pub const MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// An image the user has picked but not yet uploaded. Holds the raw bytes so
/// the preview needs no network round-trip; dropping it (replace / clear /
/// consume-on-upload) releases the memory.
#[derive(Debug, Clone)]
pub struct PendingImage {
    pub filename: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// A drop may carry any number of files, but a submission accepts exactly
/// one. More than one rejects the whole drop, with one message per file.
pub fn single_dropped_file(paths: &[PathBuf]) -> Result<&Path, Vec<String>> {
    match paths {
        [single] => Ok(single),
        [] => Err(vec!["No file was dropped".to_string()]),
        many => Err(many
            .iter()
            .map(|p| {
                format!(
                    "{}: only one image can be uploaded at a time",
                    display_name(p)
                )
            })
            .collect()),
    }
}

impl PendingImage {
    /// Read and validate a file from disk. All violations are reported
    /// together, not just the first.
    pub fn from_path(path: &Path) -> Result<Self, Vec<String>> {
        let filename = display_name(path);

        let size = std::fs::metadata(path)
            .map(|m| m.len())
            .map_err(|e| vec![format!("{}: cannot read file ({})", filename, e)])?;

        validate_image(&filename, size)?;

        let bytes = std::fs::read(path)
            .map_err(|e| vec![format!("{}: cannot read file ({})", filename, e)])?;
        let mime = mime_guess::from_path(path)
            .first_or_octet_stream()
            .essence_str()
            .to_string();

        Ok(Self {
            filename,
            mime,
            bytes,
        })
    }

    /// Data URL for an instant local preview, derived from the raw bytes.
    pub fn preview_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime, BASE64.encode(&self.bytes))
    }

    pub fn into_request(self, kind: StoryKind) -> UploadRequest {
        UploadRequest {
            filename: self.filename,
            mime: self.mime,
            bytes: self.bytes,
            kind,
        }
    }
}

/// Serialized to the webview after a successful selection.
#[derive(Debug, Clone, Serialize)]
pub struct SelectedImage {
    pub filename: String,
    pub size: u64,
    pub mime: String,
    pub preview: String,
}

impl SelectedImage {
    pub fn describe(image: &PendingImage) -> Self {
        Self {
            filename: image.filename.clone(),
            size: image.bytes.len() as u64,
            mime: image.mime.clone(),
            preview: image.preview_data_url(),
        }
    }
}

/// Check extension and size. Returns every violation, each naming the file.
pub fn validate_image(filename: &str, size: u64) -> Result<(), Vec<String>> {
    let mut violations = Vec::new();

    let extension = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    if !ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
        violations.push(format!(
            "{}: unsupported file type — accepted formats are jpeg, jpg, png, webp",
            filename
        ));
    }

    if size > MAX_FILE_SIZE {
        violations.push(format!(
            "{}: file is {:.1} MiB, larger than the 10 MiB limit",
            filename,
            size as f64 / (1024.0 * 1024.0)
        ));
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(violations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_each_allowed_extension() {
        for ext in ALLOWED_EXTENSIONS {
            assert!(validate_image(&format!("photo.{}", ext), 1024).is_ok());
        }
    }

    #[test]
    fn extension_check_is_case_insensitive() {
        assert!(validate_image("HOLIDAY.JPG", 1024).is_ok());
    }

    #[test]
    fn rejects_wrong_type_naming_the_file() {
        let violations = validate_image("notes.pdf", 1024).unwrap_err();
        assert_eq!(violations.len(), 1);
        assert!(violations[0].contains("notes.pdf"));
        assert!(violations[0].contains("unsupported file type"));
    }

    #[test]
    fn rejects_oversize_naming_the_file() {
        let violations = validate_image("big.png", MAX_FILE_SIZE + 1).unwrap_err();
        assert_eq!(violations.len(), 1);
        assert!(violations[0].contains("big.png"));
        assert!(violations[0].contains("10 MiB"));
    }

    #[test]
    fn exactly_at_the_cap_is_allowed() {
        assert!(validate_image("edge.webp", MAX_FILE_SIZE).is_ok());
    }

    #[test]
    fn reports_both_violations_together() {
        let violations = validate_image("huge.gif", MAX_FILE_SIZE * 2).unwrap_err();
        assert_eq!(violations.len(), 2);
        assert!(violations.iter().all(|v| v.contains("huge.gif")));
    }

    #[test]
    fn rejects_extensionless_names() {
        assert!(validate_image("photo", 1024).is_err());
    }

    #[test]
    fn single_file_drop_is_accepted() {
        let paths = vec![PathBuf::from("/photos/pier.png")];
        assert_eq!(
            single_dropped_file(&paths).unwrap(),
            Path::new("/photos/pier.png")
        );
    }

    #[test]
    fn multi_file_drop_is_rejected_naming_every_file() {
        let paths = vec![
            PathBuf::from("/photos/one.png"),
            PathBuf::from("/photos/two.jpg"),
            PathBuf::from("/photos/three.webp"),
        ];
        let violations = single_dropped_file(&paths).unwrap_err();
        assert_eq!(violations.len(), 3);
        assert!(violations[0].contains("one.png"));
        assert!(violations[1].contains("two.jpg"));
        assert!(violations[2].contains("three.webp"));
        assert!(violations
            .iter()
            .all(|v| v.contains("only one image can be uploaded at a time")));
    }

    #[test]
    fn empty_drop_is_rejected() {
        assert!(single_dropped_file(&[]).is_err());
    }

    #[test]
    fn preview_is_a_data_url_of_the_bytes() {
        let image = PendingImage {
            filename: "dot.png".into(),
            mime: "image/png".into(),
            bytes: vec![0x89, 0x50, 0x4e, 0x47],
        };
        let url = image.preview_data_url();
        assert!(url.starts_with("data:image/png;base64,"));
        assert!(url.ends_with(&BASE64.encode([0x89u8, 0x50, 0x4e, 0x47])));
    }
}
