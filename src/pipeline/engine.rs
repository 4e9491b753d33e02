//! Transcription engine — staged upload → samples → model → text.
//!
//! # Request flow
//!
//! ```text
//! transcribe(path)
//!   ├─ adopt path as StagedFile            (deleted on every exit)
//!   ├─ ModelCache::get                     (waits for the one load)
//!   ├─ AudioDecoder::convert               (parallel across requests)
//!   ├─ inference gate ─▶ spawn_blocking(SttEngine::transcribe, 30 s / 5 s)
//!   └─ StagedFile::remove
//! ```
//!
//! The inference gate admits one request at a time, so the shared model never
//! runs two inferences at once.  The blocking task owns the gate guard, so a
//! caller that stops waiting does not let the next inference start early.
//! Conversion happens before the gate is taken.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Mutex;

use crate::audio::{duration_secs, AudioConverter, AudioDecoder};
use crate::config::{AppConfig, AppPaths};
use crate::stt::{
    ChunkParams, ModelCache, ModelPaths, SttEngine, SttError, TranscribeParams,
    TranscriptionResult, WhisperLoader, SELECTED_MODEL,
};
use crate::upload::UploadedFile;

use super::cleanup::StagedFile;
use super::error::TranscriptionError;

/// Turns staged audio files into text.
///
/// Cheap to share: wrap it in an `Arc` and call [`transcribe`](Self::transcribe)
/// from as many tasks as needed.
pub struct TranscriptionEngine {
    decoder: Arc<dyn AudioDecoder>,
    models: Arc<ModelCache>,
    inference_gate: Arc<Mutex<()>>,
}

impl TranscriptionEngine {
    pub fn new(decoder: Arc<dyn AudioDecoder>, models: Arc<ModelCache>) -> Self {
        Self {
            decoder,
            models,
            inference_gate: Arc::new(Mutex::new(())),
        }
    }

    /// Production wiring: ffmpeg decoding and the compiled-in Whisper model.
    pub fn from_config(config: &AppConfig, paths: &AppPaths) -> Self {
        let loader = WhisperLoader::new(
            ModelPaths::new(config.models_dir(paths)),
            SELECTED_MODEL,
            TranscribeParams::from_config(&config.stt),
            config.stt.auto_download,
        );
        Self::new(
            Arc::new(AudioConverter::new(&config.audio.ffmpeg_path)),
            Arc::new(ModelCache::new(loader)),
        )
    }

    /// Load the model now so the first request does not pay for it.
    pub async fn warm_up(&self) -> Result<(), TranscriptionError> {
        self.models
            .get()
            .await
            .map(|_| ())
            .map_err(TranscriptionError::ModelInit)
    }

    /// Transcribe an upload, or fail with
    /// [`TranscriptionError::MissingInput`] when there is none.
    pub async fn transcribe_upload(
        &self,
        upload: Option<&UploadedFile>,
    ) -> Result<String, TranscriptionError> {
        match upload {
            Some(upload) => self.transcribe(&upload.path).await,
            None => Err(TranscriptionError::MissingInput),
        }
    }

    /// Transcribe the staged file at `path` and delete it.
    ///
    /// The file is gone when this returns, whatever the outcome.  An empty
    /// transcript is a valid result for silent audio.
    pub async fn transcribe(&self, path: impl AsRef<Path>) -> Result<String, TranscriptionError> {
        let path = path.as_ref();
        if path.as_os_str().is_empty() {
            return Err(TranscriptionError::MissingInput);
        }

        let started = Instant::now();
        let staged = StagedFile::adopt(path);

        let result = self.run(staged.path()).await;

        if let Err(e) = staged.remove().await {
            log::warn!(
                "pipeline: could not delete staged file {}: {e}",
                path.display()
            );
        }

        match &result {
            Ok(text) => log::info!(
                "pipeline: transcribed {} in {} ms ({} chars)",
                path.display(),
                started.elapsed().as_millis(),
                text.len()
            ),
            Err(e) => log::error!("pipeline: {} failed: {e}", path.display()),
        }
        result
    }

    async fn run(&self, path: &Path) -> Result<String, TranscriptionError> {
        let model = self
            .models
            .get()
            .await
            .map_err(TranscriptionError::ModelInit)?;

        let audio = self.decoder.convert(path).await?;
        log::debug!(
            "pipeline: {} decoded to {} samples ({:.1} s)",
            path.display(),
            audio.len(),
            duration_secs(&audio)
        );

        let result = self.infer(model, audio).await?;
        log::debug!(
            "pipeline: inference took {} ms, {} segment(s)",
            result.duration_ms,
            result.segments.len()
        );
        Ok(result.text)
    }

    async fn infer(
        &self,
        model: Arc<dyn SttEngine>,
        audio: Vec<f32>,
    ) -> Result<TranscriptionResult, TranscriptionError> {
        let gate = Arc::clone(&self.inference_gate).lock_owned().await;

        tokio::task::spawn_blocking(move || {
            let _gate = gate;
            model.transcribe(&audio, &ChunkParams::DEFAULT)
        })
        .await
        .map_err(|e| TranscriptionError::Inference(SttError::Internal(format!("inference task: {e}"))))?
        .map_err(TranscriptionError::Inference)
    }
}

impl std::fmt::Debug for TranscriptionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TranscriptionEngine")
            .field("models", &self.models)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
