//! Voice input and output
//!
//! Input: microphone capture, energy endpointing and cloud STT behind
//! [`TranscriptionSource`]. Output: chunked online TTS with an offline
//! fallback behind [`SpeechSink`]. Keyboard and console stand-ins cover
//! headless use.

use std::time::Duration;

mod capture;
pub mod chunking;
mod detector;
mod offline;
mod playback;
mod sink;
mod source;
mod stt;
mod tts;

pub use capture::{AudioCapture, SAMPLE_RATE, samples_to_wav};
pub use chunking::{DEFAULT_SEGMENT_CHARS, MAX_SEGMENT_CHARS, MIN_SEGMENT_CHARS, chunk_for_speech};
pub use detector::{DetectorState, UtteranceDetector};
pub use offline::OfflineSpeech;
pub use playback::{AudioPlayback, PLAYBACK_SAMPLE_RATE, decode_mp3, play_mp3_detached};
pub use sink::{ConsoleSink, SpeechSink, VoiceSink};
pub use source::{KeyboardSource, MicrophoneSource, TranscriptionOutcome, TranscriptionSource};
pub use stt::{SpeechToText, SttProvider};
pub use tts::{TextToSpeech, TtsProvider, TtsSettings};

/// Upper bound on a single STT or TTS request
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP client shared by the speech services
fn http_client(timeout: Duration) -> crate::Result<reqwest::Client> {
    Ok(reqwest::Client::builder().timeout(timeout).build()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn stalled_request_times_out() {
        // Accepts connections via the backlog but never answers
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/", listener.local_addr().unwrap());

        let client = http_client(Duration::from_secs(5)).unwrap();
        let err = client.get(url).send().await.unwrap_err();

        assert!(err.is_timeout());
    }
}
