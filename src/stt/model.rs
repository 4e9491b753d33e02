//! Model registry, metadata, path resolution and download.
//!
//! [`WHISPER_MODELS`] lists the GGML builds this crate knows how to fetch.
//! Exactly one of them, [`SELECTED_MODEL`], is compiled in; switching models
//! means editing that constant and rebuilding.
//!
//! [`ModelPaths`] resolves the on-disk location of a model and
//! [`ensure_model`] downloads it when it is missing.

use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;

use crate::stt::engine::SttError;

// ---------------------------------------------------------------------------
// ModelInfo
// ---------------------------------------------------------------------------

/// Static metadata for a single GGML model file.
#[derive(Debug)]
pub struct ModelInfo {
    /// Unique identifier (e.g. `"whisper-small"`).
    pub id: &'static str,
    /// Human-readable display name.
    pub display_name: &'static str,
    /// File name under the models directory.
    pub file_name: &'static str,
    /// Approximate file size in megabytes.
    pub file_size_mb: u64,
    /// Direct download URL for the GGML file.
    pub source_url: &'static str,
    /// `"en"` for English-only builds, `"multilingual"` otherwise.
    pub language: &'static str,
}

/// Standard OpenAI Whisper models converted to GGML by whisper.cpp.
pub const WHISPER_MODELS: &[ModelInfo] = &[
    ModelInfo {
        id: "whisper-tiny.en",
        display_name: "Whisper Tiny (English)",
        file_name: "ggml-tiny.en.bin",
        file_size_mb: 75,
        source_url: "https://huggingface.co/ggerganov/whisper.cpp/resolve/main/ggml-tiny.en.bin",
        language: "en",
    },
    ModelInfo {
        id: "whisper-base.en",
        display_name: "Whisper Base (English)",
        file_name: "ggml-base.en.bin",
        file_size_mb: 142,
        source_url: "https://huggingface.co/ggerganov/whisper.cpp/resolve/main/ggml-base.en.bin",
        language: "en",
    },
    ModelInfo {
        id: "whisper-small",
        display_name: "Whisper Small (Multilingual)",
        file_name: "ggml-small.bin",
        file_size_mb: 466,
        source_url: "https://huggingface.co/ggerganov/whisper.cpp/resolve/main/ggml-small.bin",
        language: "multilingual",
    },
    ModelInfo {
        id: "whisper-medium",
        display_name: "Whisper Medium (Multilingual)",
        file_name: "ggml-medium.bin",
        file_size_mb: 1_500,
        source_url: "https://huggingface.co/ggerganov/whisper.cpp/resolve/main/ggml-medium.bin",
        language: "multilingual",
    },
];

/// The model every [`ModelCache`](crate::stt::ModelCache) in this build loads.
pub const SELECTED_MODEL: &ModelInfo = &WHISPER_MODELS[2];

// ---------------------------------------------------------------------------
// ModelPaths
// ---------------------------------------------------------------------------

/// Resolves the on-disk location of model files.
#[derive(Debug, Clone)]
pub struct ModelPaths {
    /// Directory that contains (or will contain) GGML `.bin` files.
    pub models_dir: PathBuf,
}

impl ModelPaths {
    /// Construct directly from a models directory path.
    pub fn new(models_dir: impl Into<PathBuf>) -> Self {
        Self {
            models_dir: models_dir.into(),
        }
    }

    /// Full path to the GGML file for the given model.
    pub fn model_path(&self, model: &ModelInfo) -> PathBuf {
        self.models_dir.join(model.file_name)
    }

    /// Returns `true` if the model file exists on disk.
    pub fn is_available(&self, model: &ModelInfo) -> bool {
        self.model_path(model).exists()
    }
}

// ---------------------------------------------------------------------------
// Download
// ---------------------------------------------------------------------------

/// Make sure `model` is present under `paths`, downloading it if needed.
///
/// The body is streamed into `<file>.part` and renamed into place only once
/// complete, so an interrupted download never leaves a truncated model
/// behind.
pub async fn ensure_model(paths: &ModelPaths, model: &ModelInfo) -> Result<PathBuf, SttError> {
    let target = paths.model_path(model);
    if paths.is_available(model) {
        log::debug!("stt: model already cached at {}", target.display());
        return Ok(target);
    }

    log::info!(
        "stt: downloading {} (~{} MB) from {}",
        model.display_name,
        model.file_size_mb,
        model.source_url
    );
    download_to(model.source_url, &target).await?;
    log::info!("stt: model saved to {}", target.display());
    Ok(target)
}

async fn download_to(url: &str, target: &Path) -> Result<(), SttError> {
    let io_err = |e: std::io::Error| SttError::Download(format!("{}: {e}", target.display()));

    if let Some(parent) = target.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
    }

    let mut response = reqwest::get(url)
        .await
        .map_err(|e| SttError::Download(e.to_string()))?;
    if !response.status().is_success() {
        return Err(SttError::Download(format!(
            "{url} returned HTTP {}",
            response.status()
        )));
    }

    let mut part = target.as_os_str().to_owned();
    part.push(".part");
    let part = PathBuf::from(part);

    let result = async {
        let mut file = tokio::fs::File::create(&part).await.map_err(io_err)?;
        while let Some(bytes) = response
            .chunk()
            .await
            .map_err(|e| SttError::Download(e.to_string()))?
        {
            file.write_all(&bytes).await.map_err(io_err)?;
        }
        file.flush().await.map_err(io_err)?;
        tokio::fs::rename(&part, target).await.map_err(io_err)
    }
    .await;

    if result.is_err() {
        let _ = tokio::fs::remove_file(&part).await;
    }
    result
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selected_model_is_whisper_small() {
        assert_eq!(SELECTED_MODEL.id, "whisper-small");
        assert_eq!(SELECTED_MODEL.language, "multilingual");
    }

    #[test]
    fn every_model_downloads_its_own_file() {
        for m in WHISPER_MODELS {
            assert!(
                m.source_url.ends_with(m.file_name),
                "{} url does not match file name",
                m.id
            );
        }
    }

    #[test]
    fn model_ids_are_unique() {
        for (i, a) in WHISPER_MODELS.iter().enumerate() {
            assert!(WHISPER_MODELS[i + 1..].iter().all(|b| b.id != a.id), "{}", a.id);
        }
    }

    #[test]
    fn model_paths_non_existent_returns_false() {
        let mp = ModelPaths::new("/nonexistent/path");
        assert!(!mp.is_available(SELECTED_MODEL));
    }

    #[test]
    fn model_paths_correct_file_name() {
        let mp = ModelPaths::new("/models");
        let p = mp.model_path(SELECTED_MODEL);
        assert_eq!(p, PathBuf::from("/models/ggml-small.bin"));
    }

    #[tokio::test]
    async fn ensure_model_skips_download_when_present() {
        let dir = tempfile::tempdir().expect("temp dir");
        let mp = ModelPaths::new(dir.path());
        std::fs::write(mp.model_path(SELECTED_MODEL), b"cached").expect("write");

        let path = ensure_model(&mp, SELECTED_MODEL).await.expect("cached");
        assert_eq!(path, mp.model_path(SELECTED_MODEL));
    }

    #[tokio::test]
    async fn download_from_unreachable_host_fails_cleanly() {
        let dir = tempfile::tempdir().expect("temp dir");
        let target = dir.path().join("ggml-test.bin");

        let result = download_to("http://127.0.0.1:9/ggml-test.bin", &target).await;
        assert!(matches!(result, Err(SttError::Download(_))));
        assert!(!target.exists());
        assert!(!dir.path().join("ggml-test.bin.part").exists());
    }
}
