//! Upload validation rules.

use mime_guess::mime::Mime;

use crate::config::UploadConfig;
use crate::{FiledropError, Result};

/// Content types accepted for upload.
///
/// Declared types are trusted as sent; nothing inspects the bytes.
#[derive(Debug, Clone)]
pub struct AllowList {
    essences: Vec<String>,
}

/// Normalize a content type to its lowercase essence (`type/subtype`).
fn essence(content_type: &str) -> String {
    match content_type.trim().parse::<Mime>() {
        Ok(mime) => mime.essence_str().to_ascii_lowercase(),
        Err(_) => content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase(),
    }
}

impl AllowList {
    /// Build an allow-list from configured content types.
    pub fn new<I, S>(types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            essences: types.into_iter().map(|t| essence(t.as_ref())).collect(),
        }
    }

    /// Whether the declared content type is accepted.
    pub fn permits(&self, content_type: &str) -> bool {
        let wanted = essence(content_type);
        !wanted.is_empty() && self.essences.iter().any(|e| *e == wanted)
    }
}

/// Limits applied to every upload batch.
#[derive(Debug, Clone)]
pub struct UploadLimits {
    /// Maximum bytes per file.
    pub max_file_size: u64,
    /// Maximum files per batch.
    pub max_files: usize,
    /// Accepted content types.
    pub allowed_types: AllowList,
}

impl UploadLimits {
    /// Limits from the `[upload]` configuration section.
    pub fn from_config(config: &UploadConfig) -> Self {
        Self {
            max_file_size: config.max_file_size_bytes(),
            max_files: config.max_files,
            allowed_types: AllowList::new(&config.allowed_types),
        }
    }

    /// Resolve the content type of an incoming file.
    ///
    /// The declared type wins; without one, the type is guessed from the
    /// filename extension.
    pub fn resolve_content_type(name: &str, declared: Option<&str>) -> String {
        match declared.map(str::trim).filter(|d| !d.is_empty()) {
            Some(declared) => declared.to_string(),
            None => mime_guess::from_path(name)
                .first_or_octet_stream()
                .to_string(),
        }
    }

    /// Reject a file whose content type is not allow-listed.
    pub fn check_type(&self, name: &str, content_type: &str) -> Result<()> {
        if self.allowed_types.permits(content_type) {
            Ok(())
        } else {
            Err(FiledropError::UnsupportedType {
                name: name.to_string(),
                mime_type: content_type.to_string(),
            })
        }
    }

    /// Reject the `count`-th file of a batch if it exceeds the limit.
    pub fn check_count(&self, count: usize) -> Result<()> {
        if count > self.max_files {
            Err(FiledropError::TooManyFiles(self.max_files))
        } else {
            Ok(())
        }
    }

    /// Reject a file that would grow past the size limit.
    pub fn check_size(&self, name: &str, size: u64) -> Result<()> {
        if size > self.max_file_size {
            Err(FiledropError::TooLarge {
                name: name.to_string(),
                limit: self.max_file_size,
            })
        } else {
            Ok(())
        }
    }
}

impl Default for UploadLimits {
    fn default() -> Self {
        Self::from_config(&UploadConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_allow_list() {
        let limits = UploadLimits::default();
        let allowed = &limits.allowed_types;

        assert!(allowed.permits("application/msword"));
        assert!(allowed.permits(
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
        ));
        assert!(allowed.permits("application/pdf"));
        assert!(allowed.permits("application/vnd.ms-excel"));
        assert!(allowed.permits(
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
        ));
        assert!(allowed.permits("image/jpeg"));
        assert!(allowed.permits("image/png"));
        assert!(allowed.permits("text/plain"));

        assert!(!allowed.permits("application/zip"));
        assert!(!allowed.permits("image/gif"));
        assert!(!allowed.permits("text/html"));
        assert!(!allowed.permits(""));
    }

    #[test]
    fn test_permits_ignores_case_and_parameters() {
        let allowed = AllowList::new(["text/plain"]);

        assert!(allowed.permits("TEXT/Plain"));
        assert!(allowed.permits("text/plain; charset=utf-8"));
        assert!(allowed.permits("  text/plain  "));
        assert!(!allowed.permits("text/plainx"));
    }

    #[test]
    fn test_resolve_content_type() {
        assert_eq!(
            UploadLimits::resolve_content_type("a.bin", Some("image/png")),
            "image/png"
        );
        assert_eq!(UploadLimits::resolve_content_type("a.pdf", None), "application/pdf");
        assert_eq!(UploadLimits::resolve_content_type("a.txt", Some("  ")), "text/plain");
        assert_eq!(
            UploadLimits::resolve_content_type("noext", None),
            "application/octet-stream"
        );
    }

    #[test]
    fn test_check_type() {
        let limits = UploadLimits::default();

        assert!(limits.check_type("a.pdf", "application/pdf").is_ok());
        let err = limits.check_type("a.zip", "application/zip").unwrap_err();
        assert!(matches!(
            err,
            FiledropError::UnsupportedType { ref mime_type, .. } if mime_type == "application/zip"
        ));
    }

    #[test]
    fn test_check_count() {
        let limits = UploadLimits::default();

        assert!(limits.check_count(10).is_ok());
        assert!(matches!(
            limits.check_count(11),
            Err(FiledropError::TooManyFiles(10))
        ));
    }

    #[test]
    fn test_check_size() {
        let limits = UploadLimits {
            max_file_size: 100,
            ..UploadLimits::default()
        };

        assert!(limits.check_size("a.txt", 100).is_ok());
        assert!(matches!(
            limits.check_size("a.txt", 101),
            Err(FiledropError::TooLarge { limit: 100, .. })
        ));
    }

    #[test]
    fn test_from_config() {
        let config = UploadConfig {
            max_file_size_mb: 2,
            max_files: 3,
            allowed_types: vec!["image/png".to_string()],
        };

        let limits = UploadLimits::from_config(&config);

        assert_eq!(limits.max_file_size, 2 * 1024 * 1024);
        assert_eq!(limits.max_files, 3);
        assert!(limits.allowed_types.permits("image/png"));
        assert!(!limits.allowed_types.permits("text/plain"));
    }
}
