//! Configuration management for Zira
//!
//! Read once at startup and immutable afterwards. Precedence is
//! environment > TOML file > built-in default.

pub mod file;

use std::str::FromStr;
use std::time::Duration;

use crate::completion::{CompletionConfig, RetryPolicy};
use crate::voice::{
    DEFAULT_SEGMENT_CHARS, MAX_SEGMENT_CHARS, MIN_SEGMENT_CHARS, SttProvider, TtsProvider,
    TtsSettings,
};
use crate::{Error, Result};

use self::file::ZiraConfigFile;

/// Default OpenAI-compatible endpoint (`OpenRouter`)
pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";

/// Default chat model
pub const DEFAULT_MODEL: &str = "openai/gpt-4o-mini";

/// Default number of user/assistant exchanges remembered
pub const DEFAULT_MAX_EXCHANGES: usize = 10;

/// Zira configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Name the assistant uses for itself
    pub name: String,

    /// Chat completion settings
    pub llm: LlmConfig,

    /// Exchanges kept in the conversation window
    pub max_exchanges: usize,

    /// Voice configuration
    pub voice: VoiceConfig,

    /// API keys for speech services
    pub api_keys: ApiKeys,

    /// Interval between alarm clock checks
    pub alarm_poll: Duration,
}

/// Chat completion configuration
#[derive(Clone)]
pub struct LlmConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub max_tokens: u32,
    pub timeout: Duration,
    pub max_retries: u32,
}

impl std::fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("timeout", &self.timeout)
            .field("max_retries", &self.max_retries)
            .finish()
    }
}

impl LlmConfig {
    /// Client settings, or `None` when no API key is configured
    #[must_use]
    pub fn completion_config(&self) -> Option<CompletionConfig> {
        let api_key = self.api_key.clone().filter(|k| !k.is_empty())?;
        Some(CompletionConfig {
            base_url: self.base_url.clone(),
            api_key,
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            timeout: self.timeout,
            retry: RetryPolicy {
                max_retries: self.max_retries,
                ..RetryPolicy::default()
            },
        })
    }
}

/// Voice processing configuration
#[derive(Debug, Clone)]
pub struct VoiceConfig {
    pub stt_provider: SttProvider,

    /// STT model (e.g. "whisper-1", "nova-2")
    pub stt_model: String,

    pub tts_provider: TtsProvider,

    /// TTS model (e.g. "tts-1", "eleven_monolingual_v1")
    pub tts_model: String,

    /// TTS voice identifier
    pub tts_voice: String,

    /// TTS speed multiplier (0.25 to 4.0)
    pub tts_speed: f64,

    /// Offline synthesizer rate in words per minute
    pub speech_rate: u32,

    /// Offline synthesizer voice (e.g. "en+f3" for espeak, "Samantha" for say)
    pub offline_voice: Option<String>,

    /// Longest text segment sent to TTS at once, 40 to 200
    pub segment_chars: usize,

    /// How long a listen waits for speech to start
    pub listen_timeout: Duration,
}

/// API keys for speech services
#[derive(Clone, Default)]
pub struct ApiKeys {
    /// `OpenAI` API key (Whisper and TTS)
    pub openai: Option<String>,

    /// `Deepgram` API key (optional STT)
    pub deepgram: Option<String>,

    /// `ElevenLabs` API key (optional TTS)
    pub elevenlabs: Option<String>,
}

impl std::fmt::Debug for ApiKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redact = |k: &Option<String>| k.as_ref().map(|_| "<redacted>");
        f.debug_struct("ApiKeys")
            .field("openai", &redact(&self.openai))
            .field("deepgram", &redact(&self.deepgram))
            .field("elevenlabs", &redact(&self.elevenlabs))
            .finish()
    }
}

impl Config {
    /// Load configuration from the process environment and config file
    ///
    /// # Errors
    ///
    /// Returns error if a provider name is not recognized
    pub fn load() -> Result<Self> {
        let fc = file::load_config_file();
        Self::from_sources(fc, |key| std::env::var(key).ok())
    }

    /// Build configuration from a parsed file and an environment lookup
    ///
    /// # Errors
    ///
    /// Returns error if a provider name is not recognized
    pub fn from_sources(fc: ZiraConfigFile, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let env = |key: &str| env(key).filter(|v| !v.trim().is_empty());

        let llm = LlmConfig {
            base_url: env("BASE_URL")
                .or(fc.llm.base_url)
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            api_key: env("OPENROUTER_API_KEY").or(fc.llm.api_key),
            model: env("MODEL")
                .or(fc.llm.model)
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            max_tokens: parsed(&env, "ZIRA_MAX_TOKENS")
                .or(fc.llm.max_tokens)
                .unwrap_or(500),
            timeout: Duration::from_secs(
                parsed(&env, "ZIRA_REQUEST_TIMEOUT_SECS")
                    .or(fc.llm.timeout_secs)
                    .unwrap_or(30),
            ),
            max_retries: parsed(&env, "ZIRA_MAX_RETRIES")
                .or(fc.llm.max_retries)
                .unwrap_or(2),
        };

        let stt_provider = env("ZIRA_STT_PROVIDER")
            .or(fc.voice.stt_provider)
            .map_or(Ok(SttProvider::Whisper), |s| s.parse())?;
        let tts_provider = env("ZIRA_TTS_PROVIDER")
            .or(fc.voice.tts_provider)
            .map_or(Ok(TtsProvider::OpenAI), |s| s.parse())?;

        let voice = VoiceConfig {
            stt_provider,
            stt_model: env("ZIRA_STT_MODEL")
                .or(fc.voice.stt_model)
                .unwrap_or_else(|| default_stt_model(stt_provider).to_string()),
            tts_provider,
            tts_model: env("ZIRA_TTS_MODEL")
                .or(fc.voice.tts_model)
                .unwrap_or_else(|| default_tts_model(tts_provider).to_string()),
            tts_voice: env("ZIRA_TTS_VOICE")
                .or(fc.voice.tts_voice)
                .unwrap_or_else(|| default_tts_voice(tts_provider).to_string()),
            tts_speed: parsed(&env, "ZIRA_TTS_SPEED")
                .or(fc.voice.tts_speed)
                .unwrap_or(1.0),
            speech_rate: parsed(&env, "ZIRA_SPEECH_RATE")
                .or(fc.voice.speech_rate)
                .unwrap_or(180),
            offline_voice: env("ZIRA_OFFLINE_VOICE")
                .or(fc.voice.offline_voice)
                .filter(|v| !v.trim().is_empty()),
            segment_chars: parsed(&env, "ZIRA_SEGMENT_CHARS")
                .or(fc.voice.segment_chars)
                .unwrap_or(DEFAULT_SEGMENT_CHARS)
                .clamp(MIN_SEGMENT_CHARS, MAX_SEGMENT_CHARS),
            listen_timeout: Duration::from_secs(
                parsed(&env, "ZIRA_LISTEN_TIMEOUT_SECS")
                    .or(fc.voice.listen_timeout_secs)
                    .unwrap_or(30),
            ),
        };

        let api_keys = ApiKeys {
            openai: env("OPENAI_API_KEY").or(fc.api_keys.openai),
            deepgram: env("DEEPGRAM_API_KEY").or(fc.api_keys.deepgram),
            elevenlabs: env("ELEVENLABS_API_KEY").or(fc.api_keys.elevenlabs),
        };

        let max_exchanges = parsed(&env, "ZIRA_MAX_EXCHANGES")
            .or(fc.memory.max_exchanges)
            .unwrap_or(DEFAULT_MAX_EXCHANGES);
        if max_exchanges == 0 {
            return Err(Error::Config("max_exchanges must be at least 1".to_string()));
        }

        let alarm_poll_secs: u64 = parsed(&env, "ZIRA_ALARM_POLL_SECS")
            .or(fc.alarm.poll_secs)
            .unwrap_or(10)
            .clamp(1, 59);

        Ok(Self {
            name: env("ZIRA_NAME")
                .or(fc.name)
                .unwrap_or_else(|| "Zira".to_string()),
            llm,
            max_exchanges,
            voice,
            api_keys,
            alarm_poll: Duration::from_secs(alarm_poll_secs),
        })
    }

    /// Settings for the online TTS engine
    #[must_use]
    pub fn tts_settings(&self) -> TtsSettings {
        let api_key = match self.voice.tts_provider {
            TtsProvider::OpenAI => self.api_keys.openai.clone(),
            TtsProvider::ElevenLabs => self.api_keys.elevenlabs.clone(),
        };

        TtsSettings {
            provider: self.voice.tts_provider,
            api_key,
            model: self.voice.tts_model.clone(),
            voice: self.voice.tts_voice.clone(),
            speed: self.voice.tts_speed,
        }
    }

    /// API key for the configured STT provider
    #[must_use]
    pub fn stt_api_key(&self) -> Option<String> {
        match self.voice.stt_provider {
            SttProvider::Whisper => self.api_keys.openai.clone(),
            SttProvider::Deepgram => self.api_keys.deepgram.clone(),
        }
    }
}

/// Parse an environment value, warning and ignoring it when malformed
fn parsed<T: FromStr>(env: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = env(key)?;
    let value = raw.trim().parse().ok();
    if value.is_none() {
        tracing::warn!(key, value = %raw, "ignoring malformed environment value");
    }
    value
}

const fn default_stt_model(provider: SttProvider) -> &'static str {
    match provider {
        SttProvider::Whisper => "whisper-1",
        SttProvider::Deepgram => "nova-2",
    }
}

const fn default_tts_model(provider: TtsProvider) -> &'static str {
    match provider {
        TtsProvider::OpenAI => "tts-1",
        TtsProvider::ElevenLabs => "eleven_monolingual_v1",
    }
}

const fn default_tts_voice(provider: TtsProvider) -> &'static str {
    match provider {
        TtsProvider::OpenAI => "nova",
        // "Rachel"
        TtsProvider::ElevenLabs => "21m00Tcm4TlvDq8ikWAM",
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_with(vars: &[(&str, &str)], fc: ZiraConfigFile) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        Config::from_sources(fc, move |key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_without_sources() {
        let config = config_with(&[], ZiraConfigFile::default()).unwrap();

        assert_eq!(config.name, "Zira");
        assert_eq!(config.llm.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.llm.model, DEFAULT_MODEL);
        assert!(config.llm.api_key.is_none());
        assert!(config.llm.completion_config().is_none());
        assert_eq!(config.max_exchanges, DEFAULT_MAX_EXCHANGES);
        assert_eq!(config.voice.stt_provider, SttProvider::Whisper);
        assert_eq!(config.voice.tts_model, "tts-1");
        assert_eq!(config.alarm_poll, Duration::from_secs(10));
    }

    #[test]
    fn env_overrides_file() {
        let mut fc = ZiraConfigFile::default();
        fc.llm.model = Some("file-model".to_string());
        fc.memory.max_exchanges = Some(4);

        let config = config_with(
            &[("MODEL", "env-model"), ("OPENROUTER_API_KEY", "sk-or")],
            fc,
        )
        .unwrap();

        assert_eq!(config.llm.model, "env-model");
        assert_eq!(config.max_exchanges, 4);
        let completion = config.llm.completion_config().unwrap();
        assert_eq!(completion.api_key, "sk-or");
    }

    #[test]
    fn provider_specific_defaults() {
        let config = config_with(
            &[("ZIRA_STT_PROVIDER", "deepgram"), ("ZIRA_TTS_PROVIDER", "elevenlabs")],
            ZiraConfigFile::default(),
        )
        .unwrap();

        assert_eq!(config.voice.stt_model, "nova-2");
        assert_eq!(config.voice.tts_model, "eleven_monolingual_v1");
    }

    #[test]
    fn unknown_provider_is_error() {
        let result = config_with(&[("ZIRA_TTS_PROVIDER", "gtts")], ZiraConfigFile::default());
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn malformed_number_falls_back() {
        let config = config_with(&[("ZIRA_MAX_EXCHANGES", "lots")], ZiraConfigFile::default())
            .unwrap();
        assert_eq!(config.max_exchanges, DEFAULT_MAX_EXCHANGES);
    }

    #[test]
    fn zero_exchanges_rejected() {
        let result = config_with(&[("ZIRA_MAX_EXCHANGES", "0")], ZiraConfigFile::default());
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn segment_size_is_bounded() {
        let config = config_with(&[("ZIRA_SEGMENT_CHARS", "5000")], ZiraConfigFile::default())
            .unwrap();
        assert_eq!(config.voice.segment_chars, MAX_SEGMENT_CHARS);

        let mut fc = ZiraConfigFile::default();
        fc.voice.segment_chars = Some(3);
        let config = config_with(&[], fc).unwrap();
        assert_eq!(config.voice.segment_chars, MIN_SEGMENT_CHARS);

        let config = config_with(&[], ZiraConfigFile::default()).unwrap();
        assert_eq!(config.voice.segment_chars, DEFAULT_SEGMENT_CHARS);
    }

    #[test]
    fn offline_voice_from_env_or_file() {
        let config = config_with(&[], ZiraConfigFile::default()).unwrap();
        assert!(config.voice.offline_voice.is_none());

        let mut fc = ZiraConfigFile::default();
        fc.voice.offline_voice = Some("en+f3".to_string());
        let config = config_with(&[], fc).unwrap();
        assert_eq!(config.voice.offline_voice.as_deref(), Some("en+f3"));

        let mut fc = ZiraConfigFile::default();
        fc.voice.offline_voice = Some("en+f3".to_string());
        let config = config_with(&[("ZIRA_OFFLINE_VOICE", "Samantha")], fc).unwrap();
        assert_eq!(config.voice.offline_voice.as_deref(), Some("Samantha"));
    }

    #[test]
    fn keys_are_redacted_in_debug() {
        let config = config_with(
            &[("OPENROUTER_API_KEY", "sk-secret"), ("OPENAI_API_KEY", "sk-other")],
            ZiraConfigFile::default(),
        )
        .unwrap();

        let rendered = format!("{config:?}");
        assert!(!rendered.contains("sk-secret"));
        assert!(!rendered.contains("sk-other"));
    }

    #[test]
    fn keys_follow_provider() {
        let config = config_with(
            &[
                ("OPENAI_API_KEY", "sk-openai"),
                ("ZIRA_STT_PROVIDER", "deepgram"),
                ("DEEPGRAM_API_KEY", "dg"),
            ],
            ZiraConfigFile::default(),
        )
        .unwrap();

        assert_eq!(config.stt_api_key().as_deref(), Some("dg"));
        assert_eq!(config.tts_settings().api_key.as_deref(), Some("sk-openai"));
    }
}
