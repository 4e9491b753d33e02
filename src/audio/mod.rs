//! Audio decoding — any container on disk → 16 kHz mono `f32` samples.
//!
//! # Pipeline
//!
//! ```text
//! staged upload ──▶ ffmpeg (-ar 16000 -ac 1 -f f32le) ──▶ <upload>.wav
//!                                                          │
//!                         Vec<f32> ◀── decode_f32le ◀──────┘ (deleted after read)
//! ```
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::path::Path;
//! use audio_transcriber::audio::{AudioConverter, AudioDecoder};
//!
//! # async fn example() -> Result<(), audio_transcriber::audio::ConversionError> {
//! let converter = AudioConverter::new("ffmpeg");
//! let samples = converter.convert(Path::new("uploads/upload-1234.m4a")).await?;
//! println!("{} samples", samples.len());
//! # Ok(())
//! # }
//! ```

pub mod convert;
pub mod pcm;

pub use convert::{AudioConverter, AudioDecoder, ConversionError, SidecarFile};
pub use pcm::{decode_f32le, duration_secs};
