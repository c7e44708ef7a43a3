//! TOML configuration file loading
//!
//! Supports `~/.config/zira/config.toml` (or `$ZIRA_CONFIG`) as a persistent
//! config source. All fields are optional; the file is a partial overlay on
//! top of defaults and is itself overridden by environment variables.

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ZiraConfigFile {
    /// Name the assistant introduces itself with
    #[serde(default)]
    pub name: Option<String>,

    /// Chat completion endpoint
    #[serde(default)]
    pub llm: LlmFileConfig,

    /// Conversation memory
    #[serde(default)]
    pub memory: MemoryFileConfig,

    /// Voice/audio configuration
    #[serde(default)]
    pub voice: VoiceFileConfig,

    /// API keys for speech services
    #[serde(default)]
    pub api_keys: ApiKeysFileConfig,

    /// Alarm behaviour
    #[serde(default)]
    pub alarm: AlarmFileConfig,
}

/// LLM-related configuration
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LlmFileConfig {
    /// OpenAI-compatible base URL
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    /// Model identifier (e.g. "openai/gpt-4o-mini")
    pub model: Option<String>,
    pub max_tokens: Option<u32>,
    pub timeout_secs: Option<u64>,
    pub max_retries: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MemoryFileConfig {
    /// User/assistant pairs kept in the window
    pub max_exchanges: Option<usize>,
}

/// Voice processing configuration
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VoiceFileConfig {
    /// "whisper" or "deepgram"
    pub stt_provider: Option<String>,
    pub stt_model: Option<String>,
    /// "openai" or "elevenlabs"
    pub tts_provider: Option<String>,
    pub tts_model: Option<String>,
    pub tts_voice: Option<String>,
    pub tts_speed: Option<f64>,
    /// Offline synthesizer rate in words per minute
    pub speech_rate: Option<u32>,
    /// Offline synthesizer voice name
    pub offline_voice: Option<String>,
    /// Longest text segment sent to TTS at once
    pub segment_chars: Option<usize>,
    /// Seconds a listen waits for speech to start
    pub listen_timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApiKeysFileConfig {
    pub openai: Option<String>,
    pub deepgram: Option<String>,
    pub elevenlabs: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AlarmFileConfig {
    /// Seconds between clock checks
    pub poll_secs: Option<u64>,
}

/// Load the TOML config file from `$ZIRA_CONFIG` or the standard path
///
/// Returns `ZiraConfigFile::default()` if the file doesn't exist or can't be parsed.
pub fn load_config_file() -> ZiraConfigFile {
    let path = std::env::var_os("ZIRA_CONFIG")
        .map(PathBuf::from)
        .or_else(config_file_path);

    path.map_or_else(ZiraConfigFile::default, |p| load_from(&p))
}

/// Load a config file from `path`, falling back to defaults
pub fn load_from(path: &Path) -> ZiraConfigFile {
    if !path.exists() {
        return ZiraConfigFile::default();
    }

    match std::fs::read_to_string(path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "loaded config file");
                config
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config file, using defaults"
                );
                ZiraConfigFile::default()
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to read config file"
            );
            ZiraConfigFile::default()
        }
    }
}

/// Return the config file path: `~/.config/zira/config.toml`
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("zira").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_partial_file() {
        let file: ZiraConfigFile = toml::from_str(
            r#"
            name = "Nova"

            [llm]
            model = "meta-llama/llama-3-8b-instruct"

            [memory]
            max_exchanges = 4

            [voice]
            tts_provider = "elevenlabs"
            "#,
        )
        .unwrap();

        assert_eq!(file.name.as_deref(), Some("Nova"));
        assert_eq!(file.llm.model.as_deref(), Some("meta-llama/llama-3-8b-instruct"));
        assert!(file.llm.base_url.is_none());
        assert_eq!(file.memory.max_exchanges, Some(4));
        assert_eq!(file.voice.tts_provider.as_deref(), Some("elevenlabs"));
        assert!(file.alarm.poll_secs.is_none());
    }

    #[test]
    fn rejects_unknown_keys() {
        assert!(toml::from_str::<ZiraConfigFile>("[memory]\nmax_turns = 3").is_err());
    }

    #[test]
    fn missing_file_gives_defaults() {
        let file = load_from(Path::new("/nonexistent/zira/config.toml"));
        assert!(file.name.is_none());
    }
}
