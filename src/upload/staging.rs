//! Validation and copying of incoming files into the uploads directory.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::UploadConfig;

// ---------------------------------------------------------------------------
// UploadError
// ---------------------------------------------------------------------------

/// Reasons an upload is refused before transcription starts.
///
/// Every variant is the caller's fault except [`UploadError::Staging`].
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("File not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Invalid file type. Please upload {allowed} files.")]
    UnsupportedType { name: String, allowed: String },

    #[error("File too large. Maximum size is {} MB.", .max / (1024 * 1024))]
    TooLarge { name: String, size: u64, max: u64 },

    #[error("could not stage upload in {}: {source}", .dir.display())]
    Staging {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl UploadError {
    /// `true` when the upload itself was unacceptable (a 4xx, not a 5xx).
    pub fn is_client_error(&self) -> bool {
        !matches!(self, UploadError::Staging { .. })
    }
}

// ---------------------------------------------------------------------------
// UploadPolicy
// ---------------------------------------------------------------------------

/// Which files are accepted for transcription.
#[derive(Debug, Clone)]
pub struct UploadPolicy {
    max_bytes: u64,
    allowed_extensions: Vec<String>,
}

impl UploadPolicy {
    pub fn new(max_bytes: u64, allowed_extensions: &[&str]) -> Self {
        Self {
            max_bytes,
            allowed_extensions: allowed_extensions
                .iter()
                .map(|e| e.trim_start_matches('.').to_ascii_lowercase())
                .collect(),
        }
    }

    pub fn from_config(config: &UploadConfig) -> Self {
        let exts: Vec<&str> = config.allowed_extensions.iter().map(String::as_str).collect();
        Self::new(config.max_bytes, &exts)
    }

    /// Check a file by name and size.
    pub fn validate(&self, name: &str, size: u64) -> Result<(), UploadError> {
        let ext = Path::new(name)
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase());

        let allowed = match ext {
            Some(ext) => self.allowed_extensions.iter().any(|a| *a == ext),
            None => false,
        };
        if !allowed {
            return Err(UploadError::UnsupportedType {
                name: name.to_string(),
                allowed: self.describe_allowed(),
            });
        }

        if size > self.max_bytes {
            return Err(UploadError::TooLarge {
                name: name.to_string(),
                size,
                max: self.max_bytes,
            });
        }
        Ok(())
    }

    /// "mp3, wav, mp4, or m4a"
    fn describe_allowed(&self) -> String {
        match self.allowed_extensions.as_slice() {
            [] => "no".into(),
            [only] => only.clone(),
            [init @ .., last] => format!("{}, or {last}", init.join(", ")),
        }
    }
}

// ---------------------------------------------------------------------------
// UploadedFile
// ---------------------------------------------------------------------------

/// A file staged on disk and ready to hand to the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    /// Absolute path of the staged copy.
    pub path: PathBuf,
    /// Name the user uploaded the file as; for display only.
    pub original_name: String,
    /// Size in bytes.
    pub size: u64,
}

/// Validate `source` against `policy` and copy it into `uploads_dir` under a
/// fresh, unique name.
pub async fn stage(
    source: &Path,
    policy: &UploadPolicy,
    uploads_dir: &Path,
) -> Result<UploadedFile, UploadError> {
    let meta = match tokio::fs::metadata(source).await {
        Ok(meta) if meta.is_file() => meta,
        _ => return Err(UploadError::NotFound(source.to_path_buf())),
    };

    let original_name = source
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    policy.validate(&original_name, meta.len())?;

    let staging_err = |source: std::io::Error| UploadError::Staging {
        dir: uploads_dir.to_path_buf(),
        source,
    };

    tokio::fs::create_dir_all(uploads_dir)
        .await
        .map_err(staging_err)?;
    let dir = tokio::fs::canonicalize(uploads_dir)
        .await
        .map_err(staging_err)?;

    let suffix = Path::new(&original_name)
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy().to_ascii_lowercase()))
        .unwrap_or_default();
    let path = tempfile::Builder::new()
        .prefix("upload-")
        .suffix(&suffix)
        .tempfile_in(&dir)
        .map_err(staging_err)?
        .into_temp_path()
        .keep()
        .map_err(|e| staging_err(e.error))?;

    let size = match tokio::fs::copy(source, &path).await {
        Ok(size) => size,
        Err(e) => {
            let _ = tokio::fs::remove_file(&path).await;
            return Err(staging_err(e));
        }
    };

    log::debug!(
        "upload: staged {original_name} ({size} bytes) at {}",
        path.display()
    );
    Ok(UploadedFile {
        path,
        original_name,
        size,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn default_policy() -> UploadPolicy {
        UploadPolicy::from_config(&UploadConfig::default())
    }

    #[test]
    fn accepts_listed_extensions_case_insensitively() {
        let policy = default_policy();
        for name in ["a.mp3", "b.WAV", "c.Mp4", "voice memo.m4a"] {
            assert!(policy.validate(name, 10).is_ok(), "{name} should pass");
        }
    }

    #[test]
    fn rejects_unlisted_or_missing_extension() {
        let policy = default_policy();
        for name in ["notes.txt", "archive.tar.gz", "README"] {
            let err = policy.validate(name, 10).unwrap_err();
            assert!(matches!(err, UploadError::UnsupportedType { .. }));
            assert!(err.is_client_error());
        }
        assert_eq!(
            policy.validate("x.ogg", 1).unwrap_err().to_string(),
            "Invalid file type. Please upload mp3, wav, mp4, or m4a files."
        );
    }

    #[test]
    fn rejects_files_over_the_limit() {
        let policy = UploadPolicy::new(1024, &["wav"]);
        assert!(policy.validate("a.wav", 1024).is_ok());
        let err = policy.validate("a.wav", 1025).unwrap_err();
        assert!(matches!(err, UploadError::TooLarge { size: 1025, .. }));
    }

    #[test]
    fn default_limit_message_is_in_megabytes() {
        let err = default_policy()
            .validate("big.mp3", 201 * 1024 * 1024)
            .unwrap_err();
        assert_eq!(err.to_string(), "File too large. Maximum size is 200 MB.");
    }

    #[tokio::test]
    async fn stage_copies_to_unique_absolute_paths() {
        let src_dir = tempdir().expect("temp dir");
        let uploads = tempdir().expect("temp dir");
        let source = src_dir.path().join("Interview.M4A");
        std::fs::write(&source, b"fake m4a bytes").expect("write");

        let policy = default_policy();
        let a = stage(&source, &policy, uploads.path()).await.unwrap();
        let b = stage(&source, &policy, uploads.path()).await.unwrap();

        assert_ne!(a.path, b.path);
        for staged in [&a, &b] {
            assert!(staged.path.is_absolute());
            assert_eq!(staged.original_name, "Interview.M4A");
            assert_eq!(staged.size, 14);
            assert!(staged.path.to_string_lossy().ends_with(".m4a"));
            assert_eq!(std::fs::read(&staged.path).unwrap(), b"fake m4a bytes");
        }
        assert!(source.exists(), "original must be left alone");
    }

    #[tokio::test]
    async fn stage_creates_missing_uploads_dir() {
        let root = tempdir().expect("temp dir");
        let source = root.path().join("a.wav");
        std::fs::write(&source, b"RIFF").expect("write");
        let uploads = root.path().join("nested").join("uploads");

        let staged = stage(&source, &default_policy(), &uploads).await.unwrap();
        assert!(staged.path.starts_with(uploads.canonicalize().unwrap()));
    }

    #[tokio::test]
    async fn stage_missing_source_is_not_found() {
        let uploads = tempdir().expect("temp dir");
        let err = stage(
            Path::new("/nonexistent/a.mp3"),
            &default_policy(),
            uploads.path(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, UploadError::NotFound(_)));
    }

    #[tokio::test]
    async fn rejected_upload_leaves_nothing_staged() {
        let root = tempdir().expect("temp dir");
        let source = root.path().join("notes.txt");
        std::fs::write(&source, b"text").expect("write");
        let uploads = root.path().join("uploads");

        let err = stage(&source, &default_policy(), &uploads).await.unwrap_err();
        assert!(matches!(err, UploadError::UnsupportedType { .. }));
        assert!(!uploads.exists());
    }
}
