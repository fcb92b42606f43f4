//! Audio error types

use thiserror::Error;

/// Errors produced while turning a resource URI into a sample buffer.
///
/// `Clone` so completions can travel inside UI messages.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecodeError {
    #[error("Unsupported URI scheme: {0}")]
    UnsupportedScheme(String),

    #[error("Failed to open file: {0}")]
    Open(String),

    #[error("Failed to probe format: {0}")]
    Probe(String),

    #[error("No default track found")]
    NoTrack,

    #[error("No sample rate in track")]
    NoSampleRate,

    #[error("Failed to create decoder: {0}")]
    Codec(String),

    #[error("Error reading packet: {0}")]
    Packet(String),

    /// The blocking decode task was cancelled or panicked.
    #[error("Decode task did not complete: {0}")]
    Cancelled(String),
}

/// Errors that can occur while bringing up the output stream.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("No audio output device found")]
    NoDevice,

    #[error("Failed to get output config: {0}")]
    Config(String),

    #[error("Failed to build or start output stream: {0}")]
    Stream(String),

    #[error("Unsupported sample format: {0}")]
    UnsupportedFormat(String),

    #[error("Failed to spawn keepalive thread: {0}")]
    Thread(String),
}
