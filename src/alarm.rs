//! Alarm waiting
//!
//! An alarm is a single time of day (`HH:MM`, 24-hour). Waiting polls the
//! wall clock at a coarse interval; comparison is minute-granular so the
//! interval only needs to be well under a minute.
//!
//! The wait runs on its own task so the session keeps handling commands
//! while an alarm is pending. Completion is reported over a channel.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDateTime, Timelike};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::clock::Clock;
use crate::{Error, Result};

/// Default interval between clock checks
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// A time of day an alarm fires at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AlarmTarget {
    hour: u32,
    minute: u32,
}

impl AlarmTarget {
    /// Create a target from a 24-hour time
    ///
    /// # Errors
    ///
    /// Returns error if the hour or minute is out of range
    pub fn new(hour: u32, minute: u32) -> Result<Self> {
        if hour > 23 || minute > 59 {
            return Err(Error::AlarmTime(format!("{hour}:{minute:02}")));
        }
        Ok(Self { hour, minute })
    }

    #[must_use]
    pub const fn hour(self) -> u32 {
        self.hour
    }

    #[must_use]
    pub const fn minute(self) -> u32 {
        self.minute
    }

    /// Whether `now` falls within the target minute
    #[must_use]
    pub fn matches(self, now: NaiveDateTime) -> bool {
        now.hour() == self.hour && now.minute() == self.minute
    }
}

impl fmt::Display for AlarmTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

impl FromStr for AlarmTarget {
    type Err = Error;

    /// Parse a spoken time such as `07:30`, `7 30`, `730`, `18:45` or
    /// `7:30 pm`
    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::AlarmTime(s.trim().to_string());

        let text = s.to_lowercase().replace('.', "");
        let words = tokens(&text);

        // am/pm only counts as the word right after the time itself
        let meridiem = words
            .iter()
            .rposition(|t| is_digits(t))
            .and_then(|i| words.get(i + 1))
            .and_then(|t| match *t {
                "am" => Some(false),
                "pm" => Some(true),
                _ => None,
            });

        let groups: Vec<&str> = words.iter().copied().filter(|t| is_digits(t)).collect();

        let (hour, minute) = match groups.as_slice() {
            [h, m] if (1..=2).contains(&h.len()) && m.len() == 2 => (*h, *m),
            [hm] if (3..=4).contains(&hm.len()) => hm.split_at(hm.len() - 2),
            [h] if (1..=2).contains(&h.len()) => (*h, "00"),
            _ => return Err(invalid()),
        };

        let mut hour: u32 = hour.parse().map_err(|_| invalid())?;
        let minute: u32 = minute.parse().map_err(|_| invalid())?;

        if let Some(pm) = meridiem {
            if !(1..=12).contains(&hour) {
                return Err(invalid());
            }
            hour %= 12;
            if pm {
                hour += 12;
            }
        }

        Self::new(hour, minute).map_err(|_| invalid())
    }
}

fn is_digits(token: &str) -> bool {
    token.bytes().all(|b| b.is_ascii_digit())
}

/// Alphanumeric runs of `text`, split again where digits meet letters
fn tokens(text: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut start = None;
    let mut prev_digit = false;

    for (i, c) in text.char_indices() {
        if !c.is_alphanumeric() {
            if let Some(s) = start.take() {
                tokens.push(&text[s..i]);
            }
            continue;
        }
        let digit = c.is_ascii_digit();
        match start {
            Some(s) if digit != prev_digit => {
                tokens.push(&text[s..i]);
                start = Some(i);
            }
            None => start = Some(i),
            Some(_) => {}
        }
        prev_digit = digit;
    }
    if let Some(s) = start {
        tokens.push(&text[s..]);
    }

    tokens
}

/// Poll `clock` every `interval` until it reaches `target`
pub async fn wait_until(clock: &dyn Clock, target: AlarmTarget, interval: Duration) {
    loop {
        if target.matches(clock.now()) {
            tracing::debug!(%target, "alarm time reached");
            return;
        }
        tokio::time::sleep(interval).await;
    }
}

/// Notification from the alarm task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlarmEvent {
    /// The alarm for this target went off
    Fired(AlarmTarget),
}

struct PendingAlarm {
    target: AlarmTarget,
    handle: JoinHandle<()>,
}

/// Owns the single pending alarm
///
/// Setting a new alarm replaces the pending one. Dropping the scheduler
/// cancels any pending alarm.
pub struct AlarmScheduler {
    clock: Arc<dyn Clock>,
    interval: Duration,
    events: mpsc::Sender<AlarmEvent>,
    pending: Option<PendingAlarm>,
}

impl AlarmScheduler {
    /// Create a scheduler and the receiver its events arrive on
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>, interval: Duration) -> (Self, mpsc::Receiver<AlarmEvent>) {
        let (events, rx) = mpsc::channel(4);
        let scheduler = Self {
            clock,
            interval,
            events,
            pending: None,
        };
        (scheduler, rx)
    }

    /// Arm an alarm for `target`, returning the alarm it replaced
    ///
    /// Must be called from within a Tokio runtime.
    pub fn set(&mut self, target: AlarmTarget) -> Option<AlarmTarget> {
        let replaced = self.cancel();

        let clock = Arc::clone(&self.clock);
        let events = self.events.clone();
        let interval = self.interval;

        let handle = tokio::spawn(async move {
            wait_until(clock.as_ref(), target, interval).await;
            if events.send(AlarmEvent::Fired(target)).await.is_err() {
                tracing::debug!(%target, "alarm fired after session ended");
            }
        });

        tracing::info!(%target, "alarm armed");
        self.pending = Some(PendingAlarm { target, handle });
        replaced
    }

    /// Cancel the pending alarm, returning its target if one was waiting
    pub fn cancel(&mut self) -> Option<AlarmTarget> {
        let pending = self.pending.take()?;
        if pending.handle.is_finished() {
            return None;
        }

        pending.handle.abort();
        tracing::info!(target = %pending.target, "alarm cancelled");
        Some(pending.target)
    }

    /// Target of the alarm still waiting, if any
    #[must_use]
    pub fn pending(&self) -> Option<AlarmTarget> {
        self.pending
            .as_ref()
            .filter(|p| !p.handle.is_finished())
            .map(|p| p.target)
    }
}

impl Drop for AlarmScheduler {
    fn drop(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.handle.abort();
        }
    }
}
