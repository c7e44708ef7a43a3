//! Where utterances come from

use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines, Stdin};

use super::capture::{AudioCapture, SAMPLE_RATE, samples_to_wav};
use super::detector::UtteranceDetector;
use super::stt::SpeechToText;

/// How often captured audio is pulled from the device buffer
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Result of one listen attempt
///
/// Callers that don't care why nothing was heard use
/// [`into_text`](Self::into_text), which collapses every failure to `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranscriptionOutcome {
    /// Lowercased, trimmed transcript
    Text(String),
    /// Nobody spoke before the listen timed out
    Silence,
    /// Audio was captured but produced no words
    Unrecognized,
    /// Capture or transcription backend failed
    BackendError(String),
    /// The input stream is closed and will never produce text again
    EndOfInput,
}

impl TranscriptionOutcome {
    /// Build an outcome from raw transcript text
    #[must_use]
    pub fn from_transcript(raw: &str) -> Self {
        let text = raw.trim().to_lowercase();
        if text.is_empty() {
            Self::Unrecognized
        } else {
            Self::Text(text)
        }
    }

    /// The transcript, or `None` for every non-text outcome
    #[must_use]
    pub fn into_text(self) -> Option<String> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }
}

/// Produces transcribed utterances
#[async_trait(?Send)]
pub trait TranscriptionSource {
    /// Wait for the next utterance
    async fn listen(&mut self) -> TranscriptionOutcome;
}

/// Microphone capture, endpointing and cloud STT
pub struct MicrophoneSource {
    capture: AudioCapture,
    detector: UtteranceDetector,
    stt: SpeechToText,
    idle_timeout: Duration,
}

impl MicrophoneSource {
    /// Create a source; `idle_timeout` bounds how long a listen waits for
    /// speech to start
    #[must_use]
    pub fn new(capture: AudioCapture, stt: SpeechToText, idle_timeout: Duration) -> Self {
        Self {
            capture,
            detector: UtteranceDetector::default(),
            stt,
            idle_timeout,
        }
    }

    /// Record until one utterance is complete, or `None` on timeout
    async fn record_utterance(&mut self) -> crate::Result<Option<Vec<f32>>> {
        let capture = ActiveCapture::begin(&mut self.capture)?;
        self.detector.reset();

        let deadline = Instant::now() + self.idle_timeout;
        let mut ticker = tokio::time::interval(POLL_INTERVAL);

        loop {
            ticker.tick().await;
            let chunk = capture.take_buffer();

            if self.detector.process(&chunk) {
                return Ok(Some(self.detector.take_utterance()));
            }

            if !self.detector.is_speaking() && Instant::now() >= deadline {
                return Ok(None);
            }
        }
    }
}

#[async_trait(?Send)]
impl TranscriptionSource for MicrophoneSource {
    async fn listen(&mut self) -> TranscriptionOutcome {
        tracing::info!("listening...");

        let samples = match self.record_utterance().await {
            Ok(Some(samples)) => samples,
            Ok(None) => return TranscriptionOutcome::Silence,
            Err(e) => return TranscriptionOutcome::BackendError(e.to_string()),
        };

        let wav = match samples_to_wav(&samples, SAMPLE_RATE) {
            Ok(wav) => wav,
            Err(e) => return TranscriptionOutcome::BackendError(e.to_string()),
        };

        match self.stt.transcribe(&wav).await {
            Ok(raw) => TranscriptionOutcome::from_transcript(&raw),
            Err(e) => TranscriptionOutcome::BackendError(e.to_string()),
        }
    }
}

/// Microphone stream held open for one listen; closed on drop
struct ActiveCapture<'a> {
    capture: &'a mut AudioCapture,
}

impl<'a> ActiveCapture<'a> {
    fn begin(capture: &'a mut AudioCapture) -> crate::Result<Self> {
        capture.start()?;
        capture.clear_buffer();
        Ok(Self { capture })
    }

    fn take_buffer(&self) -> Vec<f32> {
        self.capture.take_buffer()
    }
}

impl Drop for ActiveCapture<'_> {
    fn drop(&mut self) {
        self.capture.stop();
    }
}

/// Typed utterances, one per line
pub struct KeyboardSource<R> {
    lines: Lines<R>,
}

impl KeyboardSource<BufReader<Stdin>> {
    /// Read utterances from standard input
    #[must_use]
    pub fn stdin() -> Self {
        Self::new(BufReader::new(tokio::io::stdin()))
    }
}

impl<R: AsyncBufRead + Unpin> KeyboardSource<R> {
    #[must_use]
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
        }
    }
}

#[async_trait(?Send)]
impl<R: AsyncBufRead + Unpin> TranscriptionSource for KeyboardSource<R> {
    async fn listen(&mut self) -> TranscriptionOutcome {
        match self.lines.next_line().await {
            Ok(Some(line)) if line.trim().is_empty() => TranscriptionOutcome::Silence,
            Ok(Some(line)) => TranscriptionOutcome::from_transcript(&line),
            Ok(None) => TranscriptionOutcome::EndOfInput,
            Err(e) => TranscriptionOutcome::BackendError(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transcript_is_normalized() {
        assert_eq!(
            TranscriptionOutcome::from_transcript("  What Time Is It? "),
            TranscriptionOutcome::Text("what time is it?".to_string())
        );
        assert_eq!(
            TranscriptionOutcome::from_transcript("   "),
            TranscriptionOutcome::Unrecognized
        );
    }

    #[test]
    fn non_text_outcomes_collapse() {
        assert_eq!(TranscriptionOutcome::Silence.into_text(), None);
        assert_eq!(TranscriptionOutcome::Unrecognized.into_text(), None);
        assert_eq!(TranscriptionOutcome::BackendError("x".into()).into_text(), None);
        assert_eq!(
            TranscriptionOutcome::Text("hi".into()).into_text(),
            Some("hi".to_string())
        );
    }

    #[tokio::test]
    async fn keyboard_reads_lines_until_eof() {
        let mut source = KeyboardSource::new(&b"Open YouTube\n\nquit\n"[..]);

        assert_eq!(
            source.listen().await,
            TranscriptionOutcome::Text("open youtube".to_string())
        );
        assert_eq!(source.listen().await, TranscriptionOutcome::Silence);
        assert_eq!(source.listen().await, TranscriptionOutcome::Text("quit".to_string()));
        assert_eq!(source.listen().await, TranscriptionOutcome::EndOfInput);
    }
}
