use std::path::Path;

use crate::domain::{BackendFailure, DomainError};

/// Where the rendered preview lives: inline bytes or a URI served by the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageRef {
    Inline { mime_type: String, data: Vec<u8> },
    Uri(String),
}

impl ImageRef {
    pub fn png(data: Vec<u8>) -> Self {
        Self::Inline {
            mime_type: "image/png".to_string(),
            data,
        }
    }

    pub fn uri(&self) -> Option<&str> {
        match self {
            Self::Uri(uri) => Some(uri),
            Self::Inline { .. } => None,
        }
    }

    pub fn bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Inline { data, .. } => Some(data),
            Self::Uri(_) => None,
        }
    }

    /// Short human-readable description for status lines.
    pub fn describe(&self) -> String {
        match self {
            Self::Inline { mime_type, data } => format!("{} ({} bytes)", mime_type, data.len()),
            Self::Uri(uri) => uri.clone(),
        }
    }

    /// Write inline image bytes to `path`. URI references have nothing to write.
    pub fn save_to(&self, path: &Path) -> Result<bool, DomainError> {
        match self {
            Self::Inline { data, .. } => {
                std::fs::write(path, data)?;
                Ok(true)
            }
            Self::Uri(_) => Ok(false),
        }
    }
}

/// Outcome of one preview render. Failures are carried as data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewResult {
    image: Option<ImageRef>,
    success: bool,
    error_detail: Option<String>,
    failure: Option<BackendFailure>,
}

impl PreviewResult {
    pub fn success(image: ImageRef) -> Self {
        Self {
            image: Some(image),
            success: true,
            error_detail: None,
            failure: None,
        }
    }

    pub fn failure(failure: BackendFailure, detail: impl Into<String>) -> Self {
        Self {
            image: None,
            success: false,
            error_detail: Some(detail.into()),
            failure: Some(failure),
        }
    }

    pub fn timeout() -> Self {
        Self::failure(BackendFailure::Timeout, "timeout")
    }

    pub fn image(&self) -> Option<&ImageRef> {
        self.image.as_ref()
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn error_detail(&self) -> Option<&str> {
        self.error_detail.as_deref()
    }

    pub fn failure_kind(&self) -> Option<&BackendFailure> {
        self.failure.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_inline_image() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("preview.png");

        let image = ImageRef::png(vec![0x89, b'P', b'N', b'G']);
        assert!(image.save_to(&path).unwrap());
        assert_eq!(std::fs::read(&path).unwrap(), vec![0x89, b'P', b'N', b'G']);
    }

    #[test]
    fn test_uri_image_is_not_saved() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("preview.png");

        let image = ImageRef::Uri("http://127.0.0.1:8188/view?filename=a.png".to_string());
        assert!(!image.save_to(&path).unwrap());
        assert!(!path.exists());
    }

    #[test]
    fn test_failure_result() {
        let result = PreviewResult::failure(BackendFailure::Unreachable, "connection refused");
        assert!(!result.is_success());
        assert!(result.image().is_none());
        assert_eq!(result.error_detail(), Some("connection refused"));
    }
}
