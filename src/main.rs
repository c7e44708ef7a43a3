use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use zira::completion::{CompletionService, OpenAiCompatible, Unconfigured};
use zira::voice::{
    AudioCapture, AudioPlayback, ConsoleSink, KeyboardSource, MicrophoneSource, OfflineSpeech,
    PLAYBACK_SAMPLE_RATE, SpeechSink, SpeechToText, TextToSpeech, TranscriptionSource, VoiceSink,
    play_mp3_detached,
};
use zira::{Collaborators, Config, Dispatcher, Persona, Session, SessionEnd, SystemBrowser, SystemClock};

/// Zira - a conversational voice assistant
#[derive(Parser)]
#[command(name = "zira", version, about)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Type instead of speaking and read replies on the console
    #[arg(long, env = "ZIRA_KEYBOARD")]
    keyboard: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
#[allow(clippy::enum_variant_names)]
enum Command {
    /// Test microphone input
    TestMic {
        /// Duration in seconds
        #[arg(short, long, default_value = "5")]
        duration: u64,
    },
    /// Test speaker output
    TestSpeaker,
    /// Test TTS output
    TestTts {
        /// Text to speak
        #[arg(default_value = "Hello! This is a test of the text to speech system.")]
        text: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "info,zira=info",
        1 => "info,zira=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

#[allow(clippy::future_not_send)]
async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::load()?;
    tracing::debug!(?config, "loaded configuration");

    if let Some(cmd) = cli.command {
        return match cmd {
            Command::TestMic { duration } => test_mic(duration).await,
            Command::TestSpeaker => test_speaker().await,
            Command::TestTts { text } => test_tts(&config, &text).await,
        };
    }

    tracing::info!(name = %config.name, keyboard = cli.keyboard, "starting zira");

    let (source, sink) = if cli.keyboard {
        keyboard_io(&config)
    } else {
        voice_io(&config)?
    };

    let completion: Arc<dyn CompletionService> = match config.llm.completion_config() {
        Some(settings) => Arc::new(OpenAiCompatible::new(settings)?),
        None => {
            tracing::warn!("OPENROUTER_API_KEY not set, conversation replies are unavailable");
            Arc::new(Unconfigured)
        }
    };

    let dispatcher = Dispatcher::new(
        Persona::new(config.name.clone()),
        Collaborators {
            source,
            sink,
            completion,
            browser: Box::new(SystemBrowser),
            clock: Arc::new(SystemClock),
        },
    );

    let mut session = Session::new(dispatcher, config.max_exchanges, config.alarm_poll);
    let end = session.run().await;

    match end {
        SessionEnd::Exit => tracing::info!("goodbye"),
        SessionEnd::EndOfInput => tracing::info!("input closed, stopping"),
        SessionEnd::Shutdown => tracing::info!("interrupted, stopping"),
    }

    Ok(())
}

fn keyboard_io(config: &Config) -> (Box<dyn TranscriptionSource>, Box<dyn SpeechSink>) {
    (
        Box::new(KeyboardSource::stdin()),
        Box::new(ConsoleSink::new(config.name.clone())),
    )
}

fn voice_io(
    config: &Config,
) -> anyhow::Result<(Box<dyn TranscriptionSource>, Box<dyn SpeechSink>)> {
    let stt = SpeechToText::new(
        config.voice.stt_provider,
        config.stt_api_key(),
        config.voice.stt_model.clone(),
    )?;
    let capture = AudioCapture::new()?;
    let source = MicrophoneSource::new(capture, stt, config.voice.listen_timeout);

    let tts = match TextToSpeech::new(config.tts_settings()) {
        Ok(tts) => Some(tts),
        Err(e) => {
            tracing::warn!(error = %e, "online TTS unavailable");
            None
        }
    };
    let offline =
        OfflineSpeech::detect(config.voice.speech_rate, config.voice.offline_voice.clone());
    let sink = VoiceSink::new(config.name.clone(), tts, offline, config.voice.segment_chars);

    Ok((Box::new(source), Box::new(sink)))
}

/// Test microphone input
async fn test_mic(duration: u64) -> anyhow::Result<()> {
    println!("Testing microphone for {duration} seconds...");
    println!("Speak into your microphone!\n");

    let mut capture = AudioCapture::new()?;
    capture.start()?;

    let sample_rate = capture.sample_rate();
    println!("Sample rate: {sample_rate} Hz");
    println!("---");

    for i in 0..duration {
        tokio::time::sleep(Duration::from_secs(1)).await;

        let samples = capture.take_buffer();
        let energy = rms(&samples);
        let peak = samples.iter().map(|s| s.abs()).fold(0.0f32, f32::max);

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let meter_len = (energy * 100.0).min(50.0) as usize;
        let meter = "#".repeat(meter_len) + &" ".repeat(50 - meter_len);

        println!("[{:2}s] RMS: {energy:.4} | Peak: {peak:.4} | [{meter}]", i + 1);
    }

    capture.stop();

    println!("\n---");
    println!("If the meter moved while you spoke, your mic is working.");
    println!("If RMS stayed near 0, check the default input device (arecord -l, pavucontrol).");

    Ok(())
}

#[allow(clippy::cast_precision_loss)]
fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_squares: f32 = samples.iter().map(|s| s * s).sum();
    (sum_squares / samples.len() as f32).sqrt()
}

/// Test speaker output with a 440Hz tone
async fn test_speaker() -> anyhow::Result<()> {
    println!("Testing speaker output...");
    println!("You should hear a 440Hz tone for 2 seconds\n");

    #[allow(clippy::cast_precision_loss)]
    let samples: Vec<f32> = (0..PLAYBACK_SAMPLE_RATE * 2)
        .map(|i| {
            let t = i as f32 / PLAYBACK_SAMPLE_RATE as f32;
            (2.0 * std::f32::consts::PI * 440.0 * t).sin() * 0.3
        })
        .collect();

    println!("Playing {} samples at {PLAYBACK_SAMPLE_RATE} Hz...", samples.len());
    tokio::task::spawn_blocking(move || AudioPlayback::new()?.play(samples)).await??;

    println!("\n---");
    println!("If you heard the tone, your speakers are working.");
    println!("If not, check the default output device (pactl list sinks short, pavucontrol).");

    Ok(())
}

/// Test the online TTS engine, falling back to the offline synthesizer
async fn test_tts(config: &Config, text: &str) -> anyhow::Result<()> {
    println!("Testing TTS with text: \"{text}\"\n");

    match TextToSpeech::new(config.tts_settings()) {
        Ok(tts) => {
            println!("Synthesizing speech with {:?}...", config.voice.tts_provider);
            let mp3_data = tts.synthesize(text).await?;
            println!("Got {} bytes of audio data", mp3_data.len());
            println!("Playing audio...");
            play_mp3_detached(mp3_data).await?;
        }
        Err(e) => {
            println!("Online TTS unavailable ({e}), trying offline speech...");
            let offline =
                OfflineSpeech::detect(config.voice.speech_rate, config.voice.offline_voice.clone())
                    .ok_or_else(|| {
                        anyhow::anyhow!("no offline synthesizer found (espeak-ng, espeak, say)")
                    })?;
            offline.speak(text).await?;
        }
    }

    println!("\n---");
    println!("If you heard the speech, TTS is working.");

    Ok(())
}
