//! Shared test utilities
//!
//! In-memory stand-ins for every external collaborator so the dispatcher
//! and session can run without audio hardware, network or a browser.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};

use zira::{
    Browser, Clock, Collaborators, CompletionService, Dispatcher, Error, Exchange, Persona,
    Result, SpeechSink, TranscriptionOutcome, TranscriptionSource,
};

/// Replays a fixed list of outcomes, then reports end of input
pub struct ScriptedSource {
    outcomes: VecDeque<TranscriptionOutcome>,
    hang_when_done: bool,
    delay: Option<Duration>,
}

impl ScriptedSource {
    pub fn new(lines: &[&str]) -> Self {
        Self::from_outcomes(
            lines
                .iter()
                .map(|l| TranscriptionOutcome::from_transcript(l))
                .collect(),
        )
    }

    pub fn from_outcomes(outcomes: Vec<TranscriptionOutcome>) -> Self {
        Self {
            outcomes: outcomes.into(),
            hang_when_done: false,
            delay: None,
        }
    }

    /// Take `delay` to hear each line, like a speaker who pauses first
    pub fn slow(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Wait forever instead of reporting end of input once the script runs out
    pub fn hang_when_done(mut self) -> Self {
        self.hang_when_done = true;
        self
    }
}

#[async_trait(?Send)]
impl TranscriptionSource for ScriptedSource {
    async fn listen(&mut self) -> TranscriptionOutcome {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match self.outcomes.pop_front() {
            Some(outcome) => outcome,
            None if self.hang_when_done => std::future::pending().await,
            None => TranscriptionOutcome::EndOfInput,
        }
    }
}

/// Remembers everything spoken
#[derive(Clone, Default)]
pub struct RecordingSink {
    spoken: Rc<RefCell<Vec<String>>>,
}

impl RecordingSink {
    pub fn spoken(&self) -> Vec<String> {
        self.spoken.borrow().clone()
    }

    pub fn last(&self) -> Option<String> {
        self.spoken.borrow().last().cloned()
    }
}

#[async_trait(?Send)]
impl SpeechSink for RecordingSink {
    async fn speak(&mut self, text: &str) {
        self.spoken.borrow_mut().push(text.to_string());
    }
}

/// Completion service with canned replies that records every request
#[derive(Clone, Default)]
pub struct StubCompletion {
    replies: Arc<Mutex<VecDeque<Result<String>>>>,
    requests: Arc<Mutex<Vec<(String, Vec<Exchange>)>>>,
}

impl StubCompletion {
    pub fn replying(replies: &[&str]) -> Self {
        let stub = Self::default();
        for reply in replies {
            stub.push(Ok((*reply).to_string()));
        }
        stub
    }

    pub fn failing() -> Self {
        let stub = Self::default();
        stub.push(Err(Error::Completion("service unavailable".to_string())));
        stub
    }

    pub fn push(&self, reply: Result<String>) {
        self.replies.lock().unwrap().push_back(reply);
    }

    pub fn requests(&self) -> Vec<(String, Vec<Exchange>)> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionService for StubCompletion {
    async fn complete(&self, system_prompt: &str, messages: &[Exchange]) -> Result<String> {
        self.requests
            .lock()
            .unwrap()
            .push((system_prompt.to_string(), messages.to_vec()));

        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(Error::Completion("no reply scripted".to_string())))
    }
}

/// Records opened URLs instead of launching anything
#[derive(Clone, Default)]
pub struct RecordingBrowser {
    opened: Arc<Mutex<Vec<String>>>,
}

impl RecordingBrowser {
    pub fn opened(&self) -> Vec<String> {
        self.opened.lock().unwrap().clone()
    }
}

impl Browser for RecordingBrowser {
    fn open(&self, url: &str) -> Result<()> {
        self.opened.lock().unwrap().push(url.to_string());
        Ok(())
    }
}

/// Clock that only moves when told to
#[derive(Clone)]
pub struct FixedClock {
    now: Arc<Mutex<NaiveDateTime>>,
}

impl FixedClock {
    pub fn at(hour: u32, minute: u32) -> Self {
        Self {
            now: Arc::new(Mutex::new(datetime(hour, minute))),
        }
    }

    pub fn set(&self, hour: u32, minute: u32) {
        *self.now.lock().unwrap() = datetime(hour, minute);
    }
}

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        *self.now.lock().unwrap()
    }
}

fn datetime(hour: u32, minute: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, 1)
        .unwrap()
        .and_hms_opt(hour, minute, 0)
        .unwrap()
}

/// Handles onto the fakes wired into a dispatcher
pub struct Harness {
    pub sink: RecordingSink,
    pub completion: StubCompletion,
    pub browser: RecordingBrowser,
    pub clock: FixedClock,
}

impl Harness {
    pub fn new(completion: StubCompletion) -> Self {
        Self {
            sink: RecordingSink::default(),
            completion,
            browser: RecordingBrowser::default(),
            clock: FixedClock::at(15, 7),
        }
    }

    /// Build a dispatcher listening to `source`
    pub fn dispatcher(&self, source: ScriptedSource) -> Dispatcher {
        Dispatcher::new(
            Persona::default(),
            Collaborators {
                source: Box::new(source),
                sink: Box::new(self.sink.clone()),
                completion: Arc::new(self.completion.clone()),
                browser: Box::new(self.browser.clone()),
                clock: Arc::new(self.clock.clone()),
            },
        )
    }
}
