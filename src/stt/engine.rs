//! Core STT engine trait and implementations.
//!
//! # Overview
//!
//! [`SttEngine`] is the model boundary used by the transcription pipeline.
//! It is object-safe and `Send + Sync` so it can be held behind an
//! `Arc<dyn SttEngine>` and moved into `spawn_blocking`.
//!
//! [`WhisperEngine`] is the production implementation that wraps a
//! `whisper_rs::WhisperContext`.  Construct it with [`WhisperEngine::load`].
//!
//! [`MockSttEngine`] (available under `#[cfg(test)]`) returns a
//! pre-configured response and records every call, so the pipeline can be
//! tested without a GGML model file.

use std::path::Path;

use thiserror::Error;
use whisper_rs::{FullParams, WhisperContext, WhisperContextParameters};

use crate::stt::chunk::{self, ChunkParams};
use crate::stt::transcribe::{SamplingStrategy, Segment, TranscribeParams, TranscriptionResult};

// ---------------------------------------------------------------------------
// SttError
// ---------------------------------------------------------------------------

/// All errors that can arise from the STT subsystem.
#[derive(Debug, Clone, Error)]
pub enum SttError {
    /// The GGML model file was not found at the given path.
    #[error("Model not found: {0}")]
    ModelNotFound(String),

    /// Fetching the model file failed.
    #[error("Model download failed: {0}")]
    Download(String),

    /// `whisper_rs` failed to initialise a `WhisperContext` or `WhisperState`.
    #[error("Whisper context initialisation failed: {0}")]
    ContextInit(String),

    /// An error occurred during the inference pass.
    #[error("Transcription error: {0}")]
    Transcription(String),

    /// Chunk length / stride combination cannot cover the audio.
    #[error("Invalid chunking parameters: {0}")]
    InvalidChunking(String),

    /// A blocking task panicked or was cancelled.
    #[error("Internal error: {0}")]
    Internal(String),
}

// ---------------------------------------------------------------------------
// SttEngine trait
// ---------------------------------------------------------------------------

/// Object-safe, thread-safe interface for speech-to-text engines.
///
/// # Contract
///
/// - `audio` must be **16 kHz, mono, f32** PCM samples of any length.
/// - Audio longer than one chunk is processed in overlapping windows as
///   described by `chunking`; the result is one merged transcript.
/// - An empty buffer yields an empty transcript.
pub trait SttEngine: Send + Sync {
    /// Transcribe `audio` and return the merged transcript.
    fn transcribe(
        &self,
        audio: &[f32],
        chunking: &ChunkParams,
    ) -> Result<TranscriptionResult, SttError>;
}

// Compile-time assertion: Box<dyn SttEngine> must be constructible.
const _: fn() = || {
    fn _assert_object_safe(_: Box<dyn SttEngine>) {}
};

// ---------------------------------------------------------------------------
// WhisperEngine
// ---------------------------------------------------------------------------

/// Production STT engine that wraps a `whisper_rs::WhisperContext`.
///
/// A new `WhisperState` is created for every window, so the context itself
/// is never mutated after loading.
pub struct WhisperEngine {
    ctx: WhisperContext,
    params: TranscribeParams,
}

impl std::fmt::Debug for WhisperEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WhisperEngine")
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

// SAFETY: WhisperContext is Send+Sync as declared by whisper-rs; the model
// weights are read-only after loading.
unsafe impl Send for WhisperEngine {}
unsafe impl Sync for WhisperEngine {}

impl WhisperEngine {
    /// Load a GGML model from `model_path` and prepare it for inference.
    ///
    /// # Errors
    ///
    /// - [`SttError::ModelNotFound`] — `model_path` does not exist.
    /// - [`SttError::ContextInit`]  — whisper-rs failed to load the file.
    pub fn load(model_path: impl AsRef<Path>, params: TranscribeParams) -> Result<Self, SttError> {
        let path = model_path.as_ref();

        if !path.exists() {
            return Err(SttError::ModelNotFound(path.display().to_string()));
        }

        let path_str = path.to_str().ok_or_else(|| {
            SttError::ModelNotFound(format!(
                "model path contains non-UTF-8 characters: {}",
                path.display()
            ))
        })?;

        let mut ctx_params = WhisperContextParameters::default();
        ctx_params.use_gpu(params.use_gpu);
        let ctx = WhisperContext::new_with_params(path_str, ctx_params)
            .map_err(|e| SttError::ContextInit(e.to_string()))?;

        Ok(Self { ctx, params })
    }

    fn full_params(&self) -> FullParams<'_, '_> {
        use whisper_rs::SamplingStrategy as WS;
        let ws = match self.params.strategy {
            SamplingStrategy::Greedy { best_of } => WS::Greedy { best_of },
            SamplingStrategy::BeamSearch {
                beam_size,
                patience,
            } => WS::BeamSearch {
                beam_size,
                patience,
            },
        };

        let mut fp = FullParams::new(ws);

        let lang: Option<&str> = if self.params.language == "auto" {
            None
        } else {
            Some(self.params.language.as_str())
        };
        fp.set_language(lang);
        fp.set_n_threads(self.params.n_threads);
        fp.set_print_special(false);
        fp.set_print_timestamps(false);

        if self.params.suppress_progress {
            fp.set_print_progress(false);
            fp.set_print_realtime(false);
        }
        fp
    }

    /// Run one inference pass over a single window (≤ 30 s).
    ///
    /// Segment timestamps are relative to the start of `window`.
    fn transcribe_window(&self, window: &[f32]) -> Result<Vec<Segment>, SttError> {
        let mut state = self
            .ctx
            .create_state()
            .map_err(|e| SttError::ContextInit(e.to_string()))?;

        state
            .full(self.full_params(), window)
            .map_err(|e| SttError::Transcription(e.to_string()))?;

        let n_segments = state
            .full_n_segments()
            .map_err(|e| SttError::Transcription(e.to_string()))?;

        let mut segments = Vec::with_capacity(n_segments.max(0) as usize);
        for i in 0..n_segments {
            let text = state
                .full_get_segment_text(i)
                .map_err(|e| SttError::Transcription(format!("segment {i}: {e}")))?;

            // Timestamps are in centiseconds → multiply by 10 for ms.
            let t0 = state.full_get_segment_t0(i).unwrap_or(0).max(0) as u64 * 10;
            let t1 = state.full_get_segment_t1(i).unwrap_or(0).max(0) as u64 * 10;

            segments.push(Segment {
                text,
                start_ms: t0,
                end_ms: t1,
            });
        }
        Ok(segments)
    }
}

impl SttEngine for WhisperEngine {
    fn transcribe(
        &self,
        audio: &[f32],
        chunking: &ChunkParams,
    ) -> Result<TranscriptionResult, SttError> {
        let wall_start = std::time::Instant::now();

        let segments = chunk::transcribe_windows(audio, chunking, |w| self.transcribe_window(w))?;

        Ok(TranscriptionResult {
            text: chunk::join_segments(&segments),
            segments,
            duration_ms: wall_start.elapsed().as_millis(),
        })
    }
}

// ---------------------------------------------------------------------------
// MockSttEngine  (test-only)
// ---------------------------------------------------------------------------

/// A test double that returns a pre-configured response without loading any
/// model file.  Every call is recorded, and the highest number of calls
/// running at the same time is tracked.
#[cfg(test)]
pub struct MockSttEngine {
    response: Result<String, SttError>,
    delay: std::time::Duration,
    calls: std::sync::Mutex<Vec<(usize, ChunkParams)>>,
    in_flight: std::sync::atomic::AtomicUsize,
    max_in_flight: std::sync::atomic::AtomicUsize,
}

#[cfg(test)]
impl MockSttEngine {
    fn with_response(response: Result<String, SttError>) -> Self {
        Self {
            response,
            delay: std::time::Duration::ZERO,
            calls: std::sync::Mutex::new(Vec::new()),
            in_flight: std::sync::atomic::AtomicUsize::new(0),
            max_in_flight: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    /// Create a mock that always returns `Ok(text)`.
    pub fn ok(text: impl Into<String>) -> Self {
        Self::with_response(Ok(text.into()))
    }

    /// Create a mock that always returns `Err(error)`.
    pub fn err(error: SttError) -> Self {
        Self::with_response(Err(error))
    }

    /// Block every call for `delay`, simulating a slow model.
    pub fn with_delay(mut self, delay: std::time::Duration) -> Self {
        self.delay = delay;
        self
    }

    /// `(sample count, chunk params)` of every call so far.
    pub fn calls(&self) -> Vec<(usize, ChunkParams)> {
        self.calls.lock().unwrap().clone()
    }

    /// Highest number of overlapping calls observed.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(test)]
impl SttEngine for MockSttEngine {
    fn transcribe(
        &self,
        audio: &[f32],
        chunking: &ChunkParams,
    ) -> Result<TranscriptionResult, SttError> {
        use std::sync::atomic::Ordering;

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        self.calls.lock().unwrap().push((audio.len(), *chunking));

        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        self.response.clone().map(|text| TranscriptionResult {
            text,
            ..TranscriptionResult::default()
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
