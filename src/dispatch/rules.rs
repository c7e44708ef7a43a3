//! Utterance classification
//!
//! Rules are checked top to bottom and the first match wins. Order is part
//! of the behaviour: "stop, what time is it" exits rather than telling the
//! time, and "cancel the alarm" never reaches the set-alarm rule.

/// What the user asked for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Intent {
    /// Forget the conversation so far
    ClearMemory,
    /// Read back the conversation so far
    InspectMemory,
    /// End the session
    Exit,
    /// Current wall-clock time
    TellTime,
    /// Who the assistant is
    Identify,
    /// Open a known website
    Navigate,
    /// Drop the pending alarm
    CancelAlarm,
    /// Arm an alarm
    SetAlarm,
    /// Anything else: ask the completion service
    Converse,
}

/// One classification rule
#[derive(Clone, Copy)]
pub struct Rule {
    pub intent: Intent,
    pub matches: fn(&str) -> bool,
}

impl std::fmt::Debug for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rule").field("intent", &self.intent).finish_non_exhaustive()
    }
}

/// Classification rules in priority order
///
/// [`Intent::Converse`] is not listed; it is the fallback when nothing
/// matches.
pub const RULES: &[Rule] = &[
    Rule {
        intent: Intent::ClearMemory,
        matches: wants_memory_cleared,
    },
    Rule {
        intent: Intent::InspectMemory,
        matches: wants_memory_read,
    },
    Rule {
        intent: Intent::Exit,
        matches: wants_exit,
    },
    Rule {
        intent: Intent::TellTime,
        matches: wants_time,
    },
    Rule {
        intent: Intent::Identify,
        matches: wants_identity,
    },
    Rule {
        intent: Intent::Navigate,
        matches: wants_navigation,
    },
    Rule {
        intent: Intent::CancelAlarm,
        matches: wants_alarm_cancelled,
    },
    Rule {
        intent: Intent::SetAlarm,
        matches: wants_alarm,
    },
];

/// Classify a lowercase utterance
#[must_use]
pub fn classify(utterance: &str) -> Intent {
    RULES
        .iter()
        .find(|rule| (rule.matches)(utterance))
        .map_or(Intent::Converse, |rule| rule.intent)
}

/// Sites reachable by voice, matched by name
pub const SITES: &[(&str, &str, &str)] = &[
    ("youtube", "YouTube", "https://www.youtube.com"),
    ("google", "Google", "https://www.google.com"),
    ("wikipedia", "Wikipedia", "https://www.wikipedia.org"),
];

/// A site named in the utterance: `(display name, url)`
#[must_use]
pub fn find_site(utterance: &str) -> Option<(&'static str, &'static str)> {
    SITES
        .iter()
        .find(|(key, _, _)| utterance.contains(key))
        .map(|&(_, name, url)| (name, url))
}

const CLEAR_MEMORY_PHRASES: &[&str] = &[
    "forget everything",
    "forget our conversation",
    "clear memory",
    "clear your memory",
    "clear the memory",
    "clear conversation",
    "reset memory",
    "reset conversation",
];

const READ_MEMORY_PHRASES: &[&str] = &[
    "what did we discuss",
    "what did we talk about",
    "what have we discussed",
    "what do you remember",
];

const EXIT_WORDS: &[&str] = &["stop", "exit", "quit"];

const TIME_PHRASES: &[&str] = &["what time", "the time", "time is it", "current time"];

const IDENTITY_PHRASES: &[&str] = &["your name", "who are you"];

const CANCEL_WORDS: &[&str] = &["cancel", "turn off", "delete", "remove"];

fn contains_any(utterance: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| utterance.contains(n))
}

fn has_word(utterance: &str, word: &str) -> bool {
    utterance
        .split(|c: char| !c.is_alphanumeric())
        .any(|w| w == word)
}

fn wants_memory_cleared(u: &str) -> bool {
    contains_any(u, CLEAR_MEMORY_PHRASES)
}

fn wants_memory_read(u: &str) -> bool {
    contains_any(u, READ_MEMORY_PHRASES)
}

fn wants_exit(u: &str) -> bool {
    EXIT_WORDS.iter().any(|w| has_word(u, w))
}

fn wants_time(u: &str) -> bool {
    contains_any(u, TIME_PHRASES)
}

fn wants_identity(u: &str) -> bool {
    contains_any(u, IDENTITY_PHRASES)
}

/// "open" must appear as a word; a bare site name is conversation
fn wants_navigation(u: &str) -> bool {
    has_word(u, "open")
}

fn wants_alarm_cancelled(u: &str) -> bool {
    u.contains("alarm") && contains_any(u, CANCEL_WORDS)
}

fn wants_alarm(u: &str) -> bool {
    u.contains("alarm")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rule_order_is_fixed() {
        let order: Vec<Intent> = RULES.iter().map(|r| r.intent).collect();
        assert_eq!(
            order,
            [
                Intent::ClearMemory,
                Intent::InspectMemory,
                Intent::Exit,
                Intent::TellTime,
                Intent::Identify,
                Intent::Navigate,
                Intent::CancelAlarm,
                Intent::SetAlarm,
            ]
        );
    }

    #[test]
    fn classifies_each_intent() {
        assert_eq!(classify("forget everything"), Intent::ClearMemory);
        assert_eq!(classify("please clear your memory"), Intent::ClearMemory);
        assert_eq!(classify("what did we discuss"), Intent::InspectMemory);
        assert_eq!(classify("quit"), Intent::Exit);
        assert_eq!(classify("what time is it"), Intent::TellTime);
        assert_eq!(classify("what's your name"), Intent::Identify);
        assert_eq!(classify("open youtube"), Intent::Navigate);
        assert_eq!(classify("cancel my alarm"), Intent::CancelAlarm);
        assert_eq!(classify("set an alarm"), Intent::SetAlarm);
        assert_eq!(classify("tell me a joke"), Intent::Converse);
        assert_eq!(classify("quite"), Intent::Converse);
    }

    #[test]
    fn exit_beats_time_query() {
        assert_eq!(classify("stop, what time is it"), Intent::Exit);
        assert_eq!(classify("what time is it? exit"), Intent::Exit);
    }

    #[test]
    fn exit_words_must_stand_alone() {
        assert_eq!(classify("that's quite funny, tell me another"), Intent::Converse);
        assert_eq!(classify("they worked nonstop all week"), Intent::Converse);
        assert_eq!(classify("is the exiting train late"), Intent::Converse);
        assert_eq!(classify("stop"), Intent::Exit);
    }

    #[test]
    fn memory_rules_beat_exit() {
        assert_eq!(classify("stop and forget everything"), Intent::ClearMemory);
        assert_eq!(classify("quit it, what did we discuss"), Intent::InspectMemory);
    }

    #[test]
    fn time_beats_alarm() {
        assert_eq!(classify("what time is my alarm"), Intent::TellTime);
    }

    #[test]
    fn navigation_needs_open_as_a_word() {
        assert_eq!(classify("youtube"), Intent::Converse);
        assert_eq!(classify("who founded google"), Intent::Converse);
        assert_eq!(classify("what is openai"), Intent::Converse);
        assert_eq!(classify("open, google"), Intent::Navigate);
        assert_eq!(classify("open my bank"), Intent::Navigate);
    }

    #[test]
    fn finds_sites() {
        assert_eq!(find_site("open youtube"), Some(("YouTube", "https://www.youtube.com")));
        assert_eq!(find_site("open wikipedia please"), Some(("Wikipedia", "https://www.wikipedia.org")));
        assert_eq!(find_site("open google"), Some(("Google", "https://www.google.com")));
        assert_eq!(find_site("open my bank"), None);
    }
}
