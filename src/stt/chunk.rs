//! Chunked inference for recordings longer than the model's context window.
//!
//! Whisper sees at most 30 s of audio per pass.  Longer buffers are cut into
//! overlapping windows:
//!
//! ```text
//!  audio   |0s ─────────────────────────────────────────────────── 90s|
//!  win 0   [0 ······················ 30)
//!  win 1            [20 ···················· 50)
//!  win 2                     [40 ···················· 70)
//!  win 3                              [60 ···················· 90]
//!  owned   [0 ─── 25)[25 ── 45)[45 ── 65)[65 ─────────────── 90]
//! ```
//!
//! Consecutive windows advance by `chunk - 2 * stride`.  Every window except
//! the first carries a left stride and every window except the last a right
//! stride.  A segment is kept only when its midpoint lands in the window's
//! *owned* region (the window minus its strides), so text recognised twice in
//! an overlap is emitted exactly once.

use crate::stt::engine::SttError;
use crate::stt::transcribe::Segment;

/// Sample rate of every buffer handed to the model.
pub const SAMPLE_RATE: usize = 16_000;

/// whisper.cpp refuses to decode less than one second of audio; shorter
/// windows are padded with silence up to this length.
pub const MIN_WINDOW_SAMPLES: usize = SAMPLE_RATE;

// ---------------------------------------------------------------------------
// ChunkParams
// ---------------------------------------------------------------------------

/// Window length and overlap, in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChunkParams {
    /// Length of one inference window.
    pub chunk_length_s: f32,
    /// Overlap kept on each side of a window boundary.
    pub stride_length_s: f32,
}

impl ChunkParams {
    /// 30 s windows with a 5 s stride; the only values the engine uses.
    pub const DEFAULT: Self = Self {
        chunk_length_s: 30.0,
        stride_length_s: 5.0,
    };

    fn chunk_samples(&self) -> usize {
        (self.chunk_length_s * SAMPLE_RATE as f32).round() as usize
    }

    fn stride_samples(&self) -> usize {
        (self.stride_length_s * SAMPLE_RATE as f32).round() as usize
    }

    /// Reject parameters that would not make forward progress.
    pub fn validate(&self) -> Result<(), SttError> {
        if !self.chunk_length_s.is_finite() || !self.stride_length_s.is_finite() {
            return Err(SttError::InvalidChunking("non-finite length".into()));
        }
        let chunk = self.chunk_samples();
        let overlap = self.stride_samples().checked_mul(2);
        let too_short = overlap.map_or(true, |overlap| chunk <= overlap);
        if self.stride_length_s < 0.0 || chunk == 0 || too_short {
            return Err(SttError::InvalidChunking(format!(
                "chunk {}s must be longer than twice the stride {}s",
                self.chunk_length_s, self.stride_length_s
            )));
        }
        Ok(())
    }
}

impl Default for ChunkParams {
    fn default() -> Self {
        Self::DEFAULT
    }
}

// ---------------------------------------------------------------------------
// Window planning
// ---------------------------------------------------------------------------

/// One inference window, in sample offsets into the full buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub start: usize,
    pub end: usize,
    pub stride_left: usize,
    pub stride_right: usize,
}

impl Window {
    /// Whether a segment midpoint (absolute ms) belongs to this window.
    fn owns_ms(&self, midpoint_ms: u64) -> bool {
        let lo = samples_to_ms(self.start + self.stride_left);
        if midpoint_ms < lo {
            return false;
        }
        self.stride_right == 0 || midpoint_ms < samples_to_ms(self.end - self.stride_right)
    }
}

fn samples_to_ms(samples: usize) -> u64 {
    (samples as u64 * 1_000) / SAMPLE_RATE as u64
}

/// Cut a buffer of `len` samples into overlapping windows.
///
/// A buffer no longer than one chunk yields a single window without strides.
/// An empty buffer yields no windows.
pub fn plan_windows(len: usize, params: &ChunkParams) -> Result<Vec<Window>, SttError> {
    params.validate()?;

    let chunk = params.chunk_samples();
    let stride = params.stride_samples();
    let step = chunk - 2 * stride;

    let mut windows = Vec::new();
    if len == 0 {
        return Ok(windows);
    }

    let mut start: usize = 0;
    loop {
        let is_last = start.saturating_add(chunk) >= len;
        let end = start.saturating_add(chunk).min(len);
        let stride_left = if start == 0 { 0 } else { stride };
        let stride_right = if is_last { 0 } else { stride };

        // A trailing sliver that fits inside the previous window's overlap
        // carries no audio of its own.
        if end - start > stride_left {
            windows.push(Window {
                start,
                end,
                stride_left,
                stride_right,
            });
        }
        if is_last {
            break;
        }
        start += step;
    }

    Ok(windows)
}

// ---------------------------------------------------------------------------
// Chunked inference
// ---------------------------------------------------------------------------

/// Run `infer` over every window of `audio` and merge the results.
///
/// `infer` receives one window (at least [`MIN_WINDOW_SAMPLES`] long) and
/// returns segments timed relative to that window.  The returned segments are
/// timed relative to the whole buffer, in order, with overlap duplicates
/// removed.
pub fn transcribe_windows<F>(
    audio: &[f32],
    params: &ChunkParams,
    mut infer: F,
) -> Result<Vec<Segment>, SttError>
where
    F: FnMut(&[f32]) -> Result<Vec<Segment>, SttError>,
{
    let windows = plan_windows(audio.len(), params)?;
    let mut merged = Vec::new();

    for (i, window) in windows.iter().enumerate() {
        let slice = &audio[window.start..window.end];
        let padded;
        let input = if slice.len() < MIN_WINDOW_SAMPLES {
            let mut buf = slice.to_vec();
            buf.resize(MIN_WINDOW_SAMPLES, 0.0);
            padded = buf;
            padded.as_slice()
        } else {
            slice
        };

        let offset_ms = samples_to_ms(window.start);
        let segments = infer(input)?;
        log::debug!(
            "stt: window {}/{} at {} ms produced {} segment(s)",
            i + 1,
            windows.len(),
            offset_ms,
            segments.len()
        );

        for seg in segments {
            let start_ms = seg.start_ms + offset_ms;
            let end_ms = seg.end_ms.max(seg.start_ms) + offset_ms;
            if window.owns_ms((start_ms + end_ms) / 2) {
                merged.push(Segment {
                    text: seg.text,
                    start_ms,
                    end_ms,
                });
            }
        }
    }

    Ok(merged)
}

/// Concatenate segment texts into one trimmed transcript.
pub fn join_segments(segments: &[Segment]) -> String {
    let mut text = String::new();
    for seg in segments {
        text.push_str(&seg.text);
    }
    text.trim().to_string()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
