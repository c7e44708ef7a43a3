//! Zira - a conversational voice assistant
//!
//! This library provides the pieces the `zira` binary wires together:
//! - Voice input and output (capture, endpointing, STT, TTS, offline speech)
//! - A bounded conversation window sent with every chat request
//! - Rule-based command dispatch with a chat-completion fallback
//! - A background alarm waiter
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                     Session                          │
//! │   listen  ─►  classify  ─►  act  ─►  speak           │
//! └──────┬──────────────┬──────────────┬────────────────┘
//!        │              │              │
//! ┌──────▼─────┐ ┌──────▼──────┐ ┌─────▼──────────────┐
//! │ Mic / STT  │ │ Dispatcher  │ │ TTS / offline / log │
//! │ Keyboard   │ │ Context     │ │ Console             │
//! └────────────┘ │ Alarms      │ └────────────────────┘
//!                └──────┬──────┘
//!                       │
//!          ┌────────────▼─────────────┐
//!          │ OpenAI-compatible chat   │
//!          └──────────────────────────┘
//! ```

pub mod alarm;
pub mod browser;
pub mod clock;
pub mod completion;
pub mod config;
pub mod context;
pub mod dispatch;
pub mod error;
pub mod session;
pub mod voice;

pub use alarm::{AlarmEvent, AlarmScheduler, AlarmTarget};
pub use browser::{Browser, SystemBrowser};
pub use clock::{Clock, SystemClock};
pub use completion::{CompletionService, OpenAiCompatible};
pub use config::Config;
pub use context::{ContextBuffer, Exchange, Role};
pub use dispatch::{Collaborators, Dispatcher, Flow, Intent, Persona};
pub use error::{Error, Result};
pub use session::{Session, SessionEnd};
pub use voice::{SpeechSink, TranscriptionOutcome, TranscriptionSource};
