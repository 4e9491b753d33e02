//! Where the transcriber keeps its files on disk.
//!
//! ```text
//! <config dir>/audio-transcriber/settings.toml      [stt] [audio] [upload]
//! <data dir>/audio-transcriber/models/ggml-*.bin    downloaded Whisper weights
//! <data dir>/audio-transcriber/uploads/upload-*     staged inputs, deleted after use
//! ```
//!
//! `<config dir>` and `<data dir>` come from `dirs::config_dir()` and
//! `dirs::data_local_dir()`.  Both `models/` and `uploads/` can be moved
//! with `[stt] models_dir` and `[upload] uploads_dir`.

use std::path::PathBuf;

/// Resolved locations of the settings file, model store and upload area.
#[derive(Debug, Clone)]
pub struct AppPaths {
    pub config_dir: PathBuf,
    /// `settings.toml`, read at startup and written by `--write-config`.
    pub settings_file: PathBuf,
    /// Default home of the GGML model; `ensure_model` downloads into it.
    pub models_dir: PathBuf,
    /// Default staging area; every file here belongs to an in-flight request.
    pub uploads_dir: PathBuf,
}

impl AppPaths {
    const APP_NAME: &'static str = "audio-transcriber";

    /// Paths under the platform's config and local data directories.
    pub fn new() -> Self {
        Self::resolve(dirs::config_dir(), dirs::data_local_dir())
    }

    /// Paths under explicit roots.  A missing root means the working
    /// directory.
    pub fn resolve(config_root: Option<PathBuf>, data_root: Option<PathBuf>) -> Self {
        let app_dir = |root: Option<PathBuf>| {
            root.unwrap_or_else(|| PathBuf::from("."))
                .join(Self::APP_NAME)
        };
        let config_dir = app_dir(config_root);
        let data_dir = app_dir(data_root);

        Self {
            settings_file: config_dir.join("settings.toml"),
            models_dir: data_dir.join("models"),
            uploads_dir: data_dir.join("uploads"),
            config_dir,
        }
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn layout_under_explicit_roots() {
        let paths = AppPaths::resolve(Some("/etc".into()), Some("/var/lib".into()));

        assert_eq!(
            paths.settings_file,
            Path::new("/etc/audio-transcriber/settings.toml")
        );
        assert_eq!(paths.models_dir, Path::new("/var/lib/audio-transcriber/models"));
        assert_eq!(paths.uploads_dir, Path::new("/var/lib/audio-transcriber/uploads"));
    }

    #[test]
    fn missing_roots_fall_back_to_working_dir() {
        let paths = AppPaths::resolve(None, None);
        assert_eq!(paths.config_dir, Path::new("./audio-transcriber"));
        assert!(paths.uploads_dir.starts_with("./audio-transcriber"));
    }

    #[test]
    fn platform_paths_keep_the_same_layout() {
        let paths = AppPaths::new();
        assert!(paths.settings_file.starts_with(&paths.config_dir));
        assert_eq!(paths.models_dir.parent(), paths.uploads_dir.parent());
    }
}
