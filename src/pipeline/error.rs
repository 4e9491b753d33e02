//! The single error type returned by [`TranscriptionEngine`](super::TranscriptionEngine).

use thiserror::Error;

use crate::audio::ConversionError;
use crate::stt::SttError;

/// Why a transcription request failed.
///
/// The `Display` form carries internal detail and is meant for logs.  Show
/// end users [`TranscriptionError::user_message`] instead.
#[derive(Debug, Error)]
pub enum TranscriptionError {
    /// No file was provided.
    #[error("no input file provided")]
    MissingInput,

    /// The speech model could not be loaded.  Every request fails this way
    /// until the process is restarted with the problem fixed.
    #[error("speech model unavailable: {0}")]
    ModelInit(#[source] SttError),

    /// The input could not be decoded into audio samples.
    #[error("audio conversion failed: {0}")]
    Conversion(#[from] ConversionError),

    /// The model failed on successfully decoded audio.
    #[error("inference failed: {0}")]
    Inference(#[source] SttError),
}

impl TranscriptionError {
    /// Generic text safe to show to whoever uploaded the file.
    pub fn user_message(&self) -> &'static str {
        match self {
            TranscriptionError::MissingInput => "No file uploaded",
            _ => "Transcription failed",
        }
    }

    /// `true` when the caller broke a precondition (a 4xx, not a 5xx).
    pub fn is_client_error(&self) -> bool {
        matches!(self, TranscriptionError::MissingInput)
    }
}
