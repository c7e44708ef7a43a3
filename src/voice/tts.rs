//! Text-to-speech (TTS) over HTTP

use std::str::FromStr;

use crate::{Error, Result};

/// TTS provider backend
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TtsProvider {
    OpenAI,
    ElevenLabs,
}

impl FromStr for TtsProvider {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAI),
            "elevenlabs" => Ok(Self::ElevenLabs),
            other => Err(Error::Config(format!("unknown TTS provider: {other}"))),
        }
    }
}

/// Settings for [`TextToSpeech`]
#[derive(Debug, Clone)]
pub struct TtsSettings {
    pub provider: TtsProvider,
    pub api_key: Option<String>,
    /// Model id, e.g. `tts-1` or `eleven_monolingual_v1`
    pub model: String,
    /// Voice name (`OpenAI`) or voice id (`ElevenLabs`)
    pub voice: String,
    /// Speed multiplier, `OpenAI` only (0.25 to 4.0)
    pub speed: f64,
}

/// Synthesizes MP3 speech from text
pub struct TextToSpeech {
    client: reqwest::Client,
    api_key: String,
    voice: String,
    speed: f64,
    model: String,
    provider: TtsProvider,
}

impl TextToSpeech {
    /// Create a TTS client
    ///
    /// # Errors
    ///
    /// Returns error if the provider's API key is missing or the HTTP client
    /// cannot be built
    pub fn new(settings: TtsSettings) -> Result<Self> {
        let api_key = settings
            .api_key
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                Error::Config(match settings.provider {
                    TtsProvider::OpenAI => "OpenAI API key required for TTS".to_string(),
                    TtsProvider::ElevenLabs => "ElevenLabs API key required for TTS".to_string(),
                })
            })?;

        Ok(Self {
            client: super::http_client(super::REQUEST_TIMEOUT)?,
            api_key,
            voice: settings.voice,
            speed: settings.speed.clamp(0.25, 4.0),
            model: settings.model,
            provider: settings.provider,
        })
    }

    /// Synthesize `text` to MP3 bytes
    ///
    /// # Errors
    ///
    /// Returns error if synthesis fails
    pub async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        match self.provider {
            TtsProvider::OpenAI => self.synthesize_openai(text).await,
            TtsProvider::ElevenLabs => self.synthesize_elevenlabs(text).await,
        }
    }

    async fn synthesize_openai(&self, text: &str) -> Result<Vec<u8>> {
        #[derive(serde::Serialize)]
        struct TtsRequest<'a> {
            model: &'a str,
            input: &'a str,
            voice: &'a str,
            speed: f64,
            response_format: &'a str,
        }

        let request = TtsRequest {
            model: &self.model,
            input: text,
            voice: &self.voice,
            speed: self.speed,
            response_format: "mp3",
        };

        let response = self
            .client
            .post("https://api.openai.com/v1/audio/speech")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Tts(format!("OpenAI TTS request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Tts(format!("OpenAI TTS error {status}: {body}")));
        }

        Ok(response.bytes().await?.to_vec())
    }

    async fn synthesize_elevenlabs(&self, text: &str) -> Result<Vec<u8>> {
        #[derive(serde::Serialize)]
        struct ElevenLabsRequest<'a> {
            text: &'a str,
            model_id: &'a str,
        }

        let url = format!("https://api.elevenlabs.io/v1/text-to-speech/{}", self.voice);

        let response = self
            .client
            .post(&url)
            .header("xi-api-key", &self.api_key)
            .header("Accept", "audio/mpeg")
            .json(&ElevenLabsRequest {
                text,
                model_id: &self.model,
            })
            .send()
            .await
            .map_err(|e| Error::Tts(format!("ElevenLabs request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Tts(format!("ElevenLabs TTS error {status}: {body}")));
        }

        Ok(response.bytes().await?.to_vec())
    }
}
