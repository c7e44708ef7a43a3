//! Offline speech through a local synthesizer binary
//!
//! Degraded fallback used when online TTS fails: `espeak-ng`, `espeak` or
//! macOS `say`, whichever is on `PATH`. Playback goes straight to the
//! default device and the call returns once the process exits.

use std::path::PathBuf;

use tokio::process::Command;

use crate::{Error, Result};

/// Known local synthesizers, in preference order
const CANDIDATES: &[&str] = &["espeak-ng", "espeak", "say"];

/// Speaks text with a local synthesizer process
#[derive(Debug, Clone)]
pub struct OfflineSpeech {
    program: PathBuf,
    rate: u32,
    voice: Option<String>,
}

impl OfflineSpeech {
    /// Locate a local synthesizer; `None` when none is installed
    ///
    /// `voice` is passed through as `-v`, so it must name a voice the
    /// installed synthesizer knows. `None` keeps its default voice.
    #[must_use]
    pub fn detect(rate: u32, voice: Option<String>) -> Option<Self> {
        let program = CANDIDATES.iter().find_map(|name| which::which(name).ok())?;
        tracing::debug!(program = %program.display(), rate, ?voice, "offline speech available");
        Some(Self {
            program,
            rate,
            voice,
        })
    }

    /// Speak `text`, waiting for the synthesizer to finish
    ///
    /// # Errors
    ///
    /// Returns error if the process cannot start or exits unsuccessfully
    pub async fn speak(&self, text: &str) -> Result<()> {
        let status = Command::new(&self.program)
            .args(speech_args(self.rate, self.voice.as_deref(), text))
            .kill_on_drop(true)
            .status()
            .await
            .map_err(|e| Error::Tts(format!("failed to run {}: {e}", self.program.display())))?;

        if status.success() {
            Ok(())
        } else {
            Err(Error::Tts(format!(
                "{} exited with {status}",
                self.program.display()
            )))
        }
    }
}

/// Rate and voice flags plus text
///
/// `-r` (words per minute) and `-v` (voice name) mean the same thing to
/// every candidate.
fn speech_args(rate: u32, voice: Option<&str>, text: &str) -> Vec<String> {
    let mut args = vec!["-r".to_string(), rate.to_string()];
    if let Some(voice) = voice {
        args.push("-v".to_string());
        args.push(voice.to_string());
    }
    args.push(text.trim_start_matches('-').to_string());
    args
}
