//! STT (Speech-to-Text) engine module.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        ModelCache                            │
//! │   OnceCell<Arc<dyn SttEngine>>   ◀── ModelLoader (once)      │
//! │                                      └─ WhisperLoader        │
//! │                                          - ensure_model()    │
//! │                                          - WhisperEngine::load│
//! └──────────────────────────────┬───────────────────────────────┘
//!                                │ Arc<dyn SttEngine>
//!                                ▼
//!                  ┌───────────────────────────┐
//!                  │ SttEngine::transcribe()   │
//!                  │  audio + ChunkParams      │
//!                  │  → plan_windows (30s/5s)  │
//!                  │  → one pass per window    │
//!                  │  → merge owned segments   │
//!                  └───────────────────────────┘
//! ```
//!
//! # Quick start
//!
//! ```rust,no_run
//! use audio_transcriber::stt::{
//!     ChunkParams, ModelCache, ModelPaths, SttEngine, TranscribeParams, WhisperLoader,
//!     SELECTED_MODEL,
//! };
//!
//! # async fn example() -> Result<(), audio_transcriber::stt::SttError> {
//! let loader = WhisperLoader::new(
//!     ModelPaths::new("models"),
//!     SELECTED_MODEL,
//!     TranscribeParams::default(),
//!     true,
//! );
//! let cache = ModelCache::new(loader);
//! let engine = cache.get().await?;
//!
//! // audio: 16 kHz, mono, f32 PCM
//! let audio: Vec<f32> = vec![0.0; 16_000];
//! let result = engine.transcribe(&audio, &ChunkParams::DEFAULT)?;
//! println!("{}", result.text);
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod chunk;
pub mod engine;
pub mod model;
pub mod transcribe;

// ── Public re-exports ──────────────────────────────────────────────────────

pub use cache::{ModelCache, ModelLoader, WhisperLoader};
pub use chunk::{ChunkParams, SAMPLE_RATE};
pub use engine::{SttEngine, SttError, WhisperEngine};
pub use model::{ensure_model, ModelInfo, ModelPaths, SELECTED_MODEL, WHISPER_MODELS};
pub use transcribe::{SamplingStrategy, Segment, TranscribeParams, TranscriptionResult};

// test-only re-export so the pipeline tests can import MockSttEngine
// without `use crate::stt::engine::MockSttEngine`.
#[cfg(test)]
pub use engine::MockSttEngine;
