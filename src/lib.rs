//! Speech-to-text for uploaded audio files.
//!
//! Uploads are staged by [`upload`], decoded by [`audio`] and transcribed by
//! the Whisper model in [`stt`]; [`pipeline`] ties the three together.

pub mod audio;
pub mod config;
pub mod pipeline;
pub mod stt;
pub mod upload;
