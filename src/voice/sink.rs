//! Where replies go

use async_trait::async_trait;

use super::chunking::chunk_for_speech;
use super::offline::OfflineSpeech;
use super::playback::play_mp3_detached;
use super::tts::TextToSpeech;
use crate::Result;

/// Renders assistant replies
///
/// `speak` returns once the whole text has been rendered, so consecutive
/// calls never overlap. Rendering is best effort and never fails the caller.
#[async_trait(?Send)]
pub trait SpeechSink {
    async fn speak(&mut self, text: &str);
}

/// Spoken output: online TTS with an offline fallback per segment
pub struct VoiceSink {
    name: String,
    tts: Option<TextToSpeech>,
    offline: Option<OfflineSpeech>,
    segment_chars: usize,
}

impl VoiceSink {
    /// Create a sink speaking as `name`
    ///
    /// Either engine may be absent; with neither, replies are only logged.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        tts: Option<TextToSpeech>,
        offline: Option<OfflineSpeech>,
        segment_chars: usize,
    ) -> Self {
        if tts.is_none() && offline.is_none() {
            tracing::warn!("no speech engine available, replies will only be logged");
        }

        Self {
            name: name.into(),
            tts,
            offline,
            segment_chars,
        }
    }

    async fn speak_online(&self, segment: &str) -> Result<()> {
        let Some(tts) = &self.tts else {
            return Err(crate::Error::Tts("online TTS not configured".to_string()));
        };
        let audio = tts.synthesize(segment).await?;
        play_mp3_detached(audio).await
    }

    async fn speak_segment(&self, segment: &str) {
        let online_error = match self.speak_online(segment).await {
            Ok(()) => return,
            Err(e) => e,
        };

        let Some(offline) = &self.offline else {
            if self.tts.is_some() {
                tracing::warn!(error = %online_error, "speech failed and no offline fallback");
            }
            return;
        };

        if self.tts.is_some() {
            tracing::warn!(error = %online_error, "online TTS failed, using offline speech");
        }

        if let Err(e) = offline.speak(segment).await {
            tracing::warn!(error = %e, "offline speech failed, skipping segment");
        }
    }
}

#[async_trait(?Send)]
impl SpeechSink for VoiceSink {
    async fn speak(&mut self, text: &str) {
        tracing::info!("{}: {text}", self.name);

        for segment in chunk_for_speech(text, self.segment_chars) {
            self.speak_segment(&segment).await;
        }
    }
}

/// Prints replies to standard output
#[derive(Debug, Clone)]
pub struct ConsoleSink {
    name: String,
}

impl ConsoleSink {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[async_trait(?Send)]
impl SpeechSink for ConsoleSink {
    async fn speak(&mut self, text: &str) {
        println!("{}: {text}", self.name);
    }
}
