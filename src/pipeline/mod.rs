//! Transcription pipeline — one staged upload in, one transcript out.
//!
//! # Architecture
//!
//! ```text
//! UploadedFile / path
//!        │
//!        ▼
//! TranscriptionEngine::transcribe()        ← any number of concurrent callers
//!        │
//!        ├─ ModelCache::get()              → model loaded once per process
//!        ├─ AudioDecoder::convert()        → 16 kHz mono f32 (ffmpeg)
//!        ├─ inference gate (Mutex<()>)     → one inference at a time
//!        │     └─ spawn_blocking(SttEngine::transcribe, 30 s / 5 s)
//!        └─ StagedFile::remove()           → upload deleted on every exit
//! ```
//!
//! # Quick start
//!
//! ```rust,no_run
//! use audio_transcriber::config::{AppConfig, AppPaths};
//! use audio_transcriber::pipeline::TranscriptionEngine;
//!
//! # async fn example() -> Result<(), audio_transcriber::pipeline::TranscriptionError> {
//! let paths = AppPaths::new();
//! let engine = TranscriptionEngine::from_config(&AppConfig::default(), &paths);
//! engine.warm_up().await?;
//!
//! // The file is deleted once this returns.
//! let text = engine.transcribe("/var/lib/uploads/upload-1234.mp3").await?;
//! println!("{text}");
//! # Ok(())
//! # }
//! ```

pub mod cleanup;
pub mod engine;
pub mod error;

pub use cleanup::StagedFile;
pub use engine::TranscriptionEngine;
pub use error::TranscriptionError;
