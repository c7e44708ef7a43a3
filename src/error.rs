//! Error types for Zira

use thiserror::Error;

/// Result type alias for Zira operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in Zira
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Audio device error
    #[error("audio error: {0}")]
    Audio(String),

    /// Speech-to-text error
    #[error("STT error: {0}")]
    Stt(String),

    /// Text-to-speech error
    #[error("TTS error: {0}")]
    Tts(String),

    /// Chat completion error (network, auth, quota, malformed reply)
    #[error("completion error: {0}")]
    Completion(String),

    /// Browser launch error
    #[error("browser error: {0}")]
    Browser(String),

    /// Alarm time could not be understood
    #[error("invalid alarm time: {0}")]
    AlarmTime(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}
