//! Upload staging — the request side of the transcription engine.
//!
//! Before a file reaches [`TranscriptionEngine`](crate::pipeline::TranscriptionEngine)
//! it is validated against an [`UploadPolicy`] and copied into the uploads
//! directory under a unique name.  The engine owns that staged copy and
//! deletes it when it is done; the caller's original file is never touched.
//!
//! The engine itself applies no type or size gate: anything ffmpeg can
//! decode is transcribed.  The policy here is the only filter.

pub mod staging;

pub use staging::{stage, UploadError, UploadPolicy, UploadedFile};
