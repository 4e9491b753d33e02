//! Transcription parameter types and result types.
//!
//! [`TranscribeParams`] carries all settings that control a Whisper
//! inference run.  [`TranscriptionResult`] is returned by every
//! [`SttEngine`](crate::stt::SttEngine).

use crate::config::SttConfig;

// ---------------------------------------------------------------------------
// SamplingStrategy
// ---------------------------------------------------------------------------

/// Mirrors `whisper_rs::SamplingStrategy` but is owned and `Clone`.
///
/// [`SamplingStrategy::Greedy`] is a single decoding pass;
/// [`SamplingStrategy::BeamSearch`] trades 2-4× latency for accuracy.
#[derive(Debug, Clone, PartialEq)]
pub enum SamplingStrategy {
    /// Greedy (single-pass) decoding.
    Greedy {
        /// Number of candidate tokens evaluated per step.  1 is fastest.
        best_of: i32,
    },
    /// Beam-search decoding.
    BeamSearch {
        /// Number of beams to maintain in parallel.
        beam_size: i32,
        /// Beam-search patience factor; -1.0 keeps whisper.cpp's default.
        patience: f32,
    },
}

impl Default for SamplingStrategy {
    fn default() -> Self {
        Self::Greedy { best_of: 1 }
    }
}

// ---------------------------------------------------------------------------
// TranscribeParams
// ---------------------------------------------------------------------------

/// All parameters for Whisper transcription runs.
///
/// ```
/// use audio_transcriber::stt::TranscribeParams;
///
/// let params = TranscribeParams {
///     language: "en".into(),
///     ..TranscribeParams::default()
/// };
/// assert_eq!(params.language, "en");
/// ```
#[derive(Debug, Clone)]
pub struct TranscribeParams {
    /// ISO-639-1 language code (e.g. `"en"`, `"de"`), or `"auto"` to let
    /// Whisper detect the language automatically.
    pub language: String,

    /// Decoding strategy.
    pub strategy: SamplingStrategy,

    /// Number of CPU threads handed to Whisper.  Defaults to
    /// [`optimal_threads()`], capped at 8.
    pub n_threads: i32,

    /// Ask whisper.cpp for a GPU backend when it was built with one.
    pub use_gpu: bool,

    /// Suppress Whisper's progress output to stderr.
    pub suppress_progress: bool,
}

impl Default for TranscribeParams {
    fn default() -> Self {
        Self {
            language: "auto".into(),
            strategy: SamplingStrategy::default(),
            n_threads: optimal_threads(),
            use_gpu: false,
            suppress_progress: true,
        }
    }
}

impl TranscribeParams {
    /// Build parameters from the `[stt]` section of the settings file.
    pub fn from_config(config: &SttConfig) -> Self {
        Self {
            language: config.language.clone(),
            strategy: match config.beam_size.filter(|b| *b > 1) {
                Some(beam_size) => SamplingStrategy::BeamSearch {
                    beam_size,
                    patience: -1.0,
                },
                None => SamplingStrategy::default(),
            },
            n_threads: config
                .n_threads
                .filter(|n| *n > 0)
                .unwrap_or_else(optimal_threads),
            use_gpu: config.use_gpu,
            ..Self::default()
        }
    }
}

/// Returns the number of CPU threads to use for inference, capped at 8 to
/// avoid diminishing returns on Whisper.
pub(crate) fn optimal_threads() -> i32 {
    std::thread::available_parallelism()
        .map(|n| n.get().min(8) as i32)
        .unwrap_or(4)
}

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// The output of a successful transcription.
#[derive(Debug, Clone, Default)]
pub struct TranscriptionResult {
    /// Full concatenated transcript text (trimmed of leading/trailing
    /// whitespace).
    pub text: String,

    /// Time-aligned segments, in order, with timestamps relative to the
    /// start of the whole buffer.
    pub segments: Vec<Segment>,

    /// Wall-clock time the inference took, in milliseconds.
    pub duration_ms: u128,
}

/// A single time-aligned text chunk produced by Whisper.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    /// Segment text (may include punctuation inserted by Whisper).
    pub text: String,
    /// Segment start time in milliseconds from the start of the audio.
    pub start_ms: u64,
    /// Segment end time in milliseconds from the start of the audio.
    pub end_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_config_copies_language_and_gpu() {
        let cfg = SttConfig {
            language: "de".into(),
            use_gpu: true,
            ..SttConfig::default()
        };
        let params = TranscribeParams::from_config(&cfg);
        assert_eq!(params.language, "de");
        assert!(params.use_gpu);
        assert_eq!(params.strategy, SamplingStrategy::Greedy { best_of: 1 });
    }

    #[test]
    fn from_config_selects_beam_search_for_wide_beams() {
        let cfg = SttConfig {
            beam_size: Some(5),
            ..SttConfig::default()
        };
        assert_eq!(
            TranscribeParams::from_config(&cfg).strategy,
            SamplingStrategy::BeamSearch {
                beam_size: 5,
                patience: -1.0
            }
        );

        let cfg = SttConfig {
            beam_size: Some(1),
            ..SttConfig::default()
        };
        assert_eq!(
            TranscribeParams::from_config(&cfg).strategy,
            SamplingStrategy::Greedy { best_of: 1 }
        );
    }

    #[test]
    fn from_config_ignores_non_positive_thread_count() {
        let cfg = SttConfig {
            n_threads: Some(0),
            ..SttConfig::default()
        };
        assert_eq!(TranscribeParams::from_config(&cfg).n_threads, optimal_threads());

        let cfg = SttConfig {
            n_threads: Some(3),
            ..SttConfig::default()
        };
        assert_eq!(TranscribeParams::from_config(&cfg).n_threads, 3);
    }

    #[test]
    fn optimal_threads_is_positive_and_at_most_8() {
        let t = optimal_threads();
        assert!((1..=8).contains(&t));
    }
}
