//! Normalise any audio/video container into 16 kHz mono `f32` samples.
//!
//! [`AudioConverter`] shells out to ffmpeg:
//!
//! ```text
//! ffmpeg -i <input> -ar 16000 -ac 1 -f f32le -acodec pcm_f32le <input>.wav
//! ```
//!
//! The `<input>.wav` sidecar is owned by a [`SidecarFile`] guard, so it is
//! removed on every exit path: success, tool failure, read failure, or the
//! future being dropped.  Each staged upload has a unique path, which makes
//! the sidecar unique too and lets conversions run in parallel.

use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;

use crate::audio::pcm;

/// Lines of ffmpeg stderr kept in [`ConversionError::ToolFailed`].
const STDERR_TAIL_LINES: usize = 5;

// ---------------------------------------------------------------------------
// ConversionError
// ---------------------------------------------------------------------------

/// Errors raised while turning an input file into samples.
#[derive(Debug, Error)]
pub enum ConversionError {
    /// The input path does not exist.
    #[error("input file not found: {}", .0.display())]
    InputMissing(PathBuf),

    /// The decoding tool could not be started (not installed, not
    /// executable).
    #[error("could not start {tool}: {source}")]
    ToolUnavailable {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    /// The decoding tool ran and exited non-zero, usually because the input
    /// is not a decodable container.
    #[error("{tool} exited with {status}: {stderr}")]
    ToolFailed {
        tool: String,
        status: ExitStatus,
        stderr: String,
    },

    /// The converted sidecar could not be read back.
    #[error("could not read converted audio {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The converted stream is not a whole number of `f32` samples.
    #[error("converted audio is {len} bytes, not a whole number of f32 samples")]
    Malformed { len: usize },
}

// ---------------------------------------------------------------------------
// AudioDecoder trait
// ---------------------------------------------------------------------------

/// Turns a file on disk into 16 kHz mono `f32` samples.
///
/// Implementations must not keep any state between calls and must leave no
/// temporary files behind.
#[async_trait]
pub trait AudioDecoder: Send + Sync {
    async fn convert(&self, input: &Path) -> Result<Vec<f32>, ConversionError>;
}

// ---------------------------------------------------------------------------
// SidecarFile
// ---------------------------------------------------------------------------

/// Temporary conversion output next to the input, deleted on drop.
#[derive(Debug)]
pub struct SidecarFile {
    path: PathBuf,
}

impl SidecarFile {
    /// `<input>.wav`.
    pub fn for_input(input: &Path) -> Self {
        let mut path = input.as_os_str().to_owned();
        path.push(".wav");
        Self {
            path: PathBuf::from(path),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for SidecarFile {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => log::debug!("audio: removed sidecar {}", self.path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => log::warn!(
                "audio: could not remove sidecar {}: {e}",
                self.path.display()
            ),
        }
    }
}

// ---------------------------------------------------------------------------
// AudioConverter
// ---------------------------------------------------------------------------

/// ffmpeg-backed [`AudioDecoder`].
#[derive(Debug, Clone)]
pub struct AudioConverter {
    ffmpeg: PathBuf,
}

impl AudioConverter {
    /// Use the ffmpeg found at `ffmpeg` (a path or a bare name looked up on
    /// `PATH`).
    pub fn new(ffmpeg: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
        }
    }

    fn tool_name(&self) -> String {
        self.ffmpeg.display().to_string()
    }
}

impl Default for AudioConverter {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

#[async_trait]
impl AudioDecoder for AudioConverter {
    async fn convert(&self, input: &Path) -> Result<Vec<f32>, ConversionError> {
        if tokio::fs::metadata(input).await.is_err() {
            return Err(ConversionError::InputMissing(input.to_path_buf()));
        }

        let sidecar = SidecarFile::for_input(input);

        let output = Command::new(&self.ffmpeg)
            .args(["-nostdin", "-hide_banner", "-loglevel", "error", "-y", "-i"])
            .arg(input)
            .args(["-ar", "16000", "-ac", "1", "-f", "f32le", "-acodec", "pcm_f32le"])
            .arg(sidecar.path())
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| ConversionError::ToolUnavailable {
                tool: self.tool_name(),
                source,
            })?;

        if !output.status.success() {
            let stderr = stderr_tail(&output.stderr);
            log::warn!(
                "audio: {} failed on {} ({}): {stderr}",
                self.tool_name(),
                input.display(),
                output.status
            );
            return Err(ConversionError::ToolFailed {
                tool: self.tool_name(),
                status: output.status,
                stderr,
            });
        }

        let bytes = tokio::fs::read(sidecar.path())
            .await
            .map_err(|source| ConversionError::Read {
                path: sidecar.path().to_path_buf(),
                source,
            })?;
        let samples = pcm::decode_f32le(&bytes)?;

        log::debug!(
            "audio: converted {} → {} samples ({:.1} s)",
            input.display(),
            samples.len(),
            pcm::duration_secs(&samples)
        );
        Ok(samples)
    }
}

fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
    lines[start..].join("\n")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn ffmpeg_available() -> bool {
        std::process::Command::new("ffmpeg")
            .arg("-version")
            .output()
            .is_ok_and(|o| o.status.success())
    }

    /// Write an executable shell script standing in for ffmpeg.  The script
    /// receives the same arguments; its last one is the sidecar path.
    #[cfg(unix)]
    fn fake_tool(dir: &Path, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join("fake-ffmpeg");
        std::fs::write(&path, format!("#!/bin/sh\nfor last; do :; done\n{body}\n"))
            .expect("write script");
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
            .expect("chmod");
        path
    }

    fn input_file(dir: &Path, name: &str, contents: &[u8]) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, contents).expect("write input");
        path
    }

    #[test]
    fn sidecar_is_input_plus_wav() {
        let sidecar = SidecarFile::for_input(Path::new("/tmp/uploads/upload-abc.m4a"));
        assert_eq!(sidecar.path(), Path::new("/tmp/uploads/upload-abc.m4a.wav"));
    }

    #[test]
    fn sidecar_is_removed_on_drop() {
        let dir = tempdir().expect("temp dir");
        let input = input_file(dir.path(), "a.mp3", b"x");
        let sidecar = SidecarFile::for_input(&input);
        std::fs::write(sidecar.path(), b"pcm").expect("write sidecar");
        let path = sidecar.path().to_path_buf();

        drop(sidecar);
        assert!(!path.exists());
        assert!(input.exists());
    }

    #[test]
    fn stderr_tail_keeps_last_lines() {
        let raw = b"1\n2\n\n3\n4\n5\n6\n7\n";
        assert_eq!(stderr_tail(raw), "3\n4\n5\n6\n7");
    }

    #[tokio::test]
    async fn missing_input_is_reported_before_running_the_tool() {
        let converter = AudioConverter::new("/nonexistent/ffmpeg");
        let err = converter
            .convert(Path::new("/nonexistent/input.mp3"))
            .await
            .unwrap_err();
        assert!(matches!(err, ConversionError::InputMissing(_)));
    }

    #[tokio::test]
    async fn missing_tool_is_tool_unavailable() {
        let dir = tempdir().expect("temp dir");
        let input = input_file(dir.path(), "a.mp3", b"ID3");

        let converter = AudioConverter::new(dir.path().join("no-such-ffmpeg"));
        let err = converter.convert(&input).await.unwrap_err();
        assert!(matches!(err, ConversionError::ToolUnavailable { .. }));
        assert!(!SidecarFile::for_input(&input).path().exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn successful_tool_output_is_decoded_and_sidecar_removed() {
        let dir = tempdir().expect("temp dir");
        let input = input_file(dir.path(), "a.wav", b"RIFF");
        // 1.0f32 and 0.0f32, little-endian, as octal escapes.
        let tool = fake_tool(
            dir.path(),
            r#"printf '\000\000\200\077\000\000\000\000' > "$last""#,
        );

        let samples = AudioConverter::new(tool).convert(&input).await.unwrap();
        assert_eq!(samples, vec![1.0, 0.0]);
        assert!(!SidecarFile::for_input(&input).path().exists());
        assert!(input.exists(), "the converter never deletes its input");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn empty_output_is_an_empty_buffer() {
        let dir = tempdir().expect("temp dir");
        let input = input_file(dir.path(), "silence.wav", b"");
        let tool = fake_tool(dir.path(), r#": > "$last""#);

        let samples = AudioConverter::new(tool).convert(&input).await.unwrap();
        assert!(samples.is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failing_tool_removes_partial_sidecar() {
        let dir = tempdir().expect("temp dir");
        let input = input_file(dir.path(), "notes.txt", b"just some text");
        let tool = fake_tool(
            dir.path(),
            r#"printf 'partial' > "$last"; echo "Invalid data found when processing input" >&2; exit 1"#,
        );

        let err = AudioConverter::new(tool).convert(&input).await.unwrap_err();
        match err {
            ConversionError::ToolFailed { status, stderr, .. } => {
                assert_eq!(status.code(), Some(1));
                assert!(stderr.contains("Invalid data"));
            }
            other => panic!("expected ToolFailed, got {other:?}"),
        }
        assert!(!SidecarFile::for_input(&input).path().exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn truncated_output_is_malformed_and_removed() {
        let dir = tempdir().expect("temp dir");
        let input = input_file(dir.path(), "a.mp3", b"ID3");
        let tool = fake_tool(dir.path(), r#"printf 'abc' > "$last""#);

        let err = AudioConverter::new(tool).convert(&input).await.unwrap_err();
        assert!(matches!(err, ConversionError::Malformed { len: 3 }));
        assert!(!SidecarFile::for_input(&input).path().exists());
    }

    #[tokio::test]
    async fn real_ffmpeg_converts_generated_silence() {
        if !ffmpeg_available() {
            eprintln!("skipping: ffmpeg not on PATH");
            return;
        }
        let dir = tempdir().expect("temp dir");
        let input = dir.path().join("silence.wav");
        let status = std::process::Command::new("ffmpeg")
            .args(["-hide_banner", "-loglevel", "error", "-f", "lavfi", "-i"])
            .arg("anullsrc=r=44100:cl=stereo")
            .args(["-t", "2"])
            .arg(&input)
            .status()
            .expect("run ffmpeg");
        assert!(status.success());

        let samples = AudioConverter::default().convert(&input).await.unwrap();
        assert!(
            samples.len().abs_diff(32_000) <= 160,
            "expected ~2 s at 16 kHz, got {} samples",
            samples.len()
        );
        assert!(samples.iter().all(|s| s.abs() < 1e-6));
        assert!(!SidecarFile::for_input(&input).path().exists());
    }

    #[tokio::test]
    async fn real_ffmpeg_rejects_text_file() {
        if !ffmpeg_available() {
            eprintln!("skipping: ffmpeg not on PATH");
            return;
        }
        let dir = tempdir().expect("temp dir");
        let input = input_file(dir.path(), "notes.txt", b"definitely not audio\n");

        let err = AudioConverter::default().convert(&input).await.unwrap_err();
        assert!(matches!(err, ConversionError::ToolFailed { .. }));
        assert!(!SidecarFile::for_input(&input).path().exists());
    }
}
