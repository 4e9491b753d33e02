//! Application settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files and shared across tasks.
//! Every field carries a serde default so a partial `settings.toml` only
//! needs to name the values it overrides.

use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::AppPaths;

// ---------------------------------------------------------------------------
// SttConfig
// ---------------------------------------------------------------------------

/// Settings for the Whisper STT engine.
///
/// The model itself is fixed at build time (see
/// [`crate::stt::SELECTED_MODEL`]); only how it runs is configurable.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SttConfig {
    /// Spoken language as an ISO-639-1 code, or `"auto"` for Whisper's
    /// built-in language detection.
    pub language: String,
    /// Number of CPU threads handed to Whisper. `None` picks a value from the
    /// available parallelism.
    pub n_threads: Option<i32>,
    /// Beam width for beam-search decoding. `None` (or 1) decodes greedily.
    pub beam_size: Option<i32>,
    /// Attempt GPU-accelerated inference when available.
    pub use_gpu: bool,
    /// Download the model file on first start when it is not on disk.
    pub auto_download: bool,
    /// Override for the directory holding GGML model files.
    pub models_dir: Option<PathBuf>,
}

impl Default for SttConfig {
    fn default() -> Self {
        Self {
            language: "auto".into(),
            n_threads: None,
            beam_size: None,
            use_gpu: false,
            auto_download: true,
            models_dir: None,
        }
    }
}

// ---------------------------------------------------------------------------
// AudioConfig
// ---------------------------------------------------------------------------

/// Settings for the external audio decoding step.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Path or bare name of the ffmpeg executable.
    pub ffmpeg_path: PathBuf,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: PathBuf::from("ffmpeg"),
        }
    }
}

// ---------------------------------------------------------------------------
// UploadConfig
// ---------------------------------------------------------------------------

/// Validation and staging rules applied before a file reaches the
/// transcription engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    /// Largest accepted upload in bytes.
    pub max_bytes: u64,
    /// Accepted file extensions, lowercase, without the leading dot.
    pub allowed_extensions: Vec<String>,
    /// Override for the staging directory.
    pub uploads_dir: Option<PathBuf>,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_bytes: 200 * 1024 * 1024,
            allowed_extensions: ["mp3", "wav", "mp4", "m4a"]
                .iter()
                .map(|e| e.to_string())
                .collect(),
            uploads_dir: None,
        }
    }
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level application configuration, serialised as `settings.toml`.
///
/// # Persistence
///
/// ```rust,no_run
/// use audio_transcriber::config::AppConfig;
///
/// // Load (returns Default when file is missing)
/// let config = AppConfig::load().unwrap();
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// STT engine settings.
    pub stt: SttConfig,
    /// Audio decoding settings.
    pub audio: AudioConfig,
    /// Upload validation / staging settings.
    pub upload: UploadConfig,
}

impl AppConfig {
    /// Load configuration from the platform-appropriate `settings.toml`.
    ///
    /// Returns `Ok(AppConfig::default())` when the file does not exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Write the configuration to `path`, creating parent directories as
    /// needed.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Directory holding model files: the configured override, else the
    /// platform data dir.
    pub fn models_dir(&self, paths: &AppPaths) -> PathBuf {
        self.stt
            .models_dir
            .clone()
            .unwrap_or_else(|| paths.models_dir.clone())
    }

    /// Directory uploads are staged into.
    pub fn uploads_dir(&self, paths: &AppPaths) -> PathBuf {
        self.upload
            .uploads_dir
            .clone()
            .unwrap_or_else(|| paths.uploads_dir.clone())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn round_trip_toml() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("settings.toml");

        let mut original = AppConfig::default();
        original.stt.beam_size = Some(5);
        original.save_to(&path).expect("save");

        let loaded = AppConfig::load_from(&path).expect("load");

        assert_eq!(original.stt.language, loaded.stt.language);
        assert_eq!(original.stt.n_threads, loaded.stt.n_threads);
        assert_eq!(original.stt.use_gpu, loaded.stt.use_gpu);
        assert_eq!(loaded.stt.beam_size, Some(5));
        assert_eq!(original.stt.auto_download, loaded.stt.auto_download);
        assert_eq!(original.audio.ffmpeg_path, loaded.audio.ffmpeg_path);
        assert_eq!(original.upload.max_bytes, loaded.upload.max_bytes);
        assert_eq!(
            original.upload.allowed_extensions,
            loaded.upload.allowed_extensions
        );
    }

    /// `load_from` on a non-existent path must return `Default` without error.
    #[test]
    fn load_missing_returns_default() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("nonexistent.toml");

        let config = AppConfig::load_from(&path).expect("should not error");
        assert_eq!(config.stt.language, "auto");
        assert_eq!(config.audio.ffmpeg_path, PathBuf::from("ffmpeg"));
    }

    #[test]
    fn default_values() {
        let cfg = AppConfig::default();

        assert_eq!(cfg.stt.language, "auto");
        assert!(cfg.stt.n_threads.is_none());
        assert!(cfg.stt.auto_download);
        assert_eq!(cfg.upload.max_bytes, 200 * 1024 * 1024);
        assert_eq!(cfg.upload.allowed_extensions, ["mp3", "wav", "mp4", "m4a"]);
        assert!(cfg.upload.uploads_dir.is_none());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("partial.toml");
        std::fs::write(&path, "[audio]\nffmpeg_path = \"/opt/ffmpeg/bin/ffmpeg\"\n")
            .expect("write");

        let cfg = AppConfig::load_from(&path).expect("load");
        assert_eq!(
            cfg.audio.ffmpeg_path,
            PathBuf::from("/opt/ffmpeg/bin/ffmpeg")
        );
        assert_eq!(cfg.stt.language, "auto");
        assert_eq!(cfg.upload.max_bytes, 200 * 1024 * 1024);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "[stt\nlanguage = ").expect("write");

        assert!(AppConfig::load_from(&path).is_err());
    }

    #[test]
    fn directory_overrides_win_over_platform_paths() {
        let paths = AppPaths::new();
        let mut cfg = AppConfig::default();
        assert_eq!(cfg.models_dir(&paths), paths.models_dir);
        assert_eq!(cfg.uploads_dir(&paths), paths.uploads_dir);

        cfg.stt.models_dir = Some(PathBuf::from("/srv/models"));
        cfg.upload.uploads_dir = Some(PathBuf::from("/srv/uploads"));
        assert_eq!(cfg.models_dir(&paths), PathBuf::from("/srv/models"));
        assert_eq!(cfg.uploads_dir(&paths), PathBuf::from("/srv/uploads"));
    }
}
