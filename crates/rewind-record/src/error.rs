//! Recorder errors
//!
//! Only configuration and lifecycle misuse surface to the caller. A node
//! that fails to serialize becomes an opaque placeholder, a missing host
//! capability degrades that feature, and emission after stop is dropped
//! silently; none of those interrupt capture or the host's own execution.

/// Errors surfaced by the recording API
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("invalid configuration: {reason}")]
    Config { reason: String },
    #[error("no recording session is active")]
    NotRecording,
}
