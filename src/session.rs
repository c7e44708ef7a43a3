//! Session - the listen → classify → act → speak loop
//!
//! Owns the conversation window and the alarm scheduler for one run of
//! the assistant. Alarm events are raced against listening so a pending
//! alarm never stops commands from being handled.

use std::future::Future;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::alarm::{AlarmEvent, AlarmScheduler};
use crate::context::ContextBuffer;
use crate::dispatch::{Dispatcher, Flow, replies};
use crate::voice::TranscriptionOutcome;

/// Why a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The user asked to stop
    Exit,
    /// The input stream closed
    EndOfInput,
    /// An external shutdown signal arrived
    Shutdown,
}

enum Next {
    Alarm(AlarmEvent),
    Heard(TranscriptionOutcome),
    Shutdown,
}

/// One conversation with the assistant
pub struct Session {
    dispatcher: Dispatcher,
    context: ContextBuffer,
    alarms: AlarmScheduler,
    alarm_events: mpsc::Receiver<AlarmEvent>,
}

impl Session {
    /// Create a session keeping `max_exchanges` exchanges of memory and
    /// checking alarms every `alarm_poll`
    #[must_use]
    pub fn new(dispatcher: Dispatcher, max_exchanges: usize, alarm_poll: Duration) -> Self {
        let (alarms, alarm_events) = AlarmScheduler::new(dispatcher.clock(), alarm_poll);
        Self {
            dispatcher,
            context: ContextBuffer::new(max_exchanges),
            alarms,
            alarm_events,
        }
    }

    /// Conversation window, for inspection
    #[must_use]
    pub const fn context(&self) -> &ContextBuffer {
        &self.context
    }

    /// Run until exit intent, end of input or Ctrl-C
    pub async fn run(&mut self) -> SessionEnd {
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!(error = %e, "failed to listen for Ctrl-C");
                std::future::pending::<()>().await;
            }
        })
        .await
    }

    /// Run until exit intent, end of input or `shutdown` resolves
    pub async fn run_until(&mut self, shutdown: impl Future<Output = ()>) -> SessionEnd {
        tokio::pin!(shutdown);

        self.dispatcher.greet().await;

        loop {
            let next = tokio::select! {
                biased;
                () = &mut shutdown => Next::Shutdown,
                Some(event) = self.alarm_events.recv() => Next::Alarm(event),
                outcome = self.dispatcher.listen() => Next::Heard(outcome),
            };

            match next {
                Next::Shutdown => {
                    tracing::info!("shutdown requested");
                    return SessionEnd::Shutdown;
                }
                Next::Alarm(AlarmEvent::Fired(target)) => {
                    tracing::info!(%target, "alarm fired");
                    tracing::debug!("listen interrupted, pending utterance dropped");
                    self.dispatcher.speak(replies::ALARM_ALERT).await;
                }
                Next::Heard(TranscriptionOutcome::Text(utterance)) => {
                    tracing::info!("You: {utterance}");
                    let flow = self
                        .dispatcher
                        .dispatch(&utterance, &mut self.context, &mut self.alarms)
                        .await;
                    if flow == Flow::Exit {
                        tracing::info!("exit requested");
                        return SessionEnd::Exit;
                    }
                }
                Next::Heard(TranscriptionOutcome::EndOfInput) => {
                    tracing::info!("input closed");
                    return SessionEnd::EndOfInput;
                }
                Next::Heard(TranscriptionOutcome::BackendError(reason)) => {
                    tracing::warn!(%reason, "transcription failed, listening again");
                }
                Next::Heard(outcome) => {
                    tracing::debug!(?outcome, "nothing heard, listening again");
                }
            }
        }
    }
}
