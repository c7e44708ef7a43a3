//! Command dispatch
//!
//! Turns one transcribed utterance into one action: a local command, an
//! alarm, or a round trip through the completion service. Every failure is
//! recovered here with a spoken reply; nothing propagates to the session.

pub mod replies;
mod rules;

use std::sync::Arc;

use crate::alarm::{AlarmScheduler, AlarmTarget};
use crate::browser::Browser;
use crate::clock::{Clock, spoken_time};
use crate::completion::CompletionService;
use crate::context::{ContextBuffer, Exchange, Role};
use crate::voice::{SpeechSink, TranscriptionOutcome, TranscriptionSource};

pub use replies::Persona;
pub use rules::{Intent, RULES, Rule, SITES, classify, find_site};

/// External capabilities the dispatcher drives
pub struct Collaborators {
    pub source: Box<dyn TranscriptionSource>,
    pub sink: Box<dyn SpeechSink>,
    pub completion: Arc<dyn CompletionService>,
    pub browser: Box<dyn Browser>,
    pub clock: Arc<dyn Clock>,
}

/// Whether the session keeps going after a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

/// Classifies utterances and executes the matching action
pub struct Dispatcher {
    persona: Persona,
    system_prompt: String,
    source: Box<dyn TranscriptionSource>,
    sink: Box<dyn SpeechSink>,
    completion: Arc<dyn CompletionService>,
    browser: Box<dyn Browser>,
    clock: Arc<dyn Clock>,
}

impl Dispatcher {
    #[must_use]
    pub fn new(persona: Persona, collaborators: Collaborators) -> Self {
        let Collaborators {
            source,
            sink,
            completion,
            browser,
            clock,
        } = collaborators;

        Self {
            system_prompt: persona.system_prompt(),
            persona,
            source,
            sink,
            completion,
            browser,
            clock,
        }
    }

    #[must_use]
    pub const fn persona(&self) -> &Persona {
        &self.persona
    }

    #[must_use]
    pub fn clock(&self) -> Arc<dyn Clock> {
        Arc::clone(&self.clock)
    }

    /// Wait for the next utterance
    pub async fn listen(&mut self) -> TranscriptionOutcome {
        self.source.listen().await
    }

    pub async fn speak(&mut self, text: &str) {
        self.sink.speak(text).await;
    }

    pub async fn greet(&mut self) {
        let greeting = self.persona.greeting();
        self.speak(&greeting).await;
    }

    /// Handle one utterance
    pub async fn dispatch(
        &mut self,
        utterance: &str,
        context: &mut ContextBuffer,
        alarms: &mut AlarmScheduler,
    ) -> Flow {
        let intent = classify(utterance);
        tracing::debug!(?intent, utterance, "classified utterance");

        match intent {
            Intent::ClearMemory => {
                context.clear();
                tracing::info!("conversation memory cleared");
                self.speak(replies::MEMORY_CLEARED).await;
            }
            Intent::InspectMemory => match context.summary() {
                Some(summary) => self.speak(&summary).await,
                None => self.speak(replies::NO_MEMORY).await,
            },
            Intent::Exit => {
                self.speak(replies::FAREWELL).await;
                return Flow::Exit;
            }
            Intent::TellTime => {
                let reply = format!("The time is {}.", spoken_time(self.clock.now()));
                self.speak(&reply).await;
            }
            Intent::Identify => {
                let reply = self.persona.introduction();
                self.speak(&reply).await;
            }
            Intent::Navigate => self.navigate(utterance).await,
            Intent::CancelAlarm => self.cancel_alarm(alarms).await,
            Intent::SetAlarm => self.set_alarm(alarms).await,
            Intent::Converse => self.converse(utterance, context).await,
        }

        Flow::Continue
    }

    async fn navigate(&mut self, utterance: &str) {
        let Some((name, url)) = find_site(utterance) else {
            self.speak(replies::UNKNOWN_SITE).await;
            return;
        };

        if let Err(e) = self.browser.open(url) {
            tracing::warn!(error = %e, url, "failed to open browser");
        }
        self.speak(&format!("Opening {name}.")).await;
    }

    async fn cancel_alarm(&mut self, alarms: &mut AlarmScheduler) {
        match alarms.cancel() {
            Some(target) => self.speak(&format!("Your alarm for {target} is cancelled.")).await,
            None => self.speak(replies::NO_ALARM).await,
        }
    }

    async fn set_alarm(&mut self, alarms: &mut AlarmScheduler) {
        self.speak(replies::ALARM_PROMPT).await;

        let Some(spoken) = self.source.listen().await.into_text() else {
            self.speak(replies::ALARM_NOT_UNDERSTOOD).await;
            return;
        };

        let target = match spoken.parse::<AlarmTarget>() {
            Ok(target) => target,
            Err(e) => {
                tracing::info!(error = %e, "alarm time not understood");
                self.speak(replies::ALARM_NOT_UNDERSTOOD).await;
                return;
            }
        };

        let reply = match alarms.set(target) {
            Some(previous) => format!("Alarm set for {target}, replacing the one for {previous}."),
            None => format!("Alarm set for {target}."),
        };
        self.speak(&reply).await;
    }

    /// Ask the completion service; context only changes when it answers
    async fn converse(&mut self, utterance: &str, context: &mut ContextBuffer) {
        let mut messages = context.snapshot();
        messages.push(Exchange::user(utterance));

        match self.completion.complete(&self.system_prompt, &messages).await {
            Ok(reply) => {
                context.append(Role::User, utterance);
                context.append(Role::Assistant, reply.as_str());
                self.speak(&reply).await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "completion failed");
                self.speak(replies::APOLOGY).await;
            }
        }
    }
}
