//! Fixed things the assistant says

pub const MEMORY_CLEARED: &str = "Okay, I've cleared our conversation memory.";
pub const NO_MEMORY: &str = "We haven't discussed anything yet.";
pub const FAREWELL: &str = "Goodbye! Have a great day!";
pub const UNKNOWN_SITE: &str = "I'm not sure which website you want to open.";
pub const ALARM_PROMPT: &str =
    "Please tell me the time for the alarm in 24-hour format, like 07:30 or 18:45.";
pub const ALARM_NOT_UNDERSTOOD: &str = "I couldn't understand the time you said.";
pub const ALARM_ALERT: &str = "Wake up! It's time!";
pub const NO_ALARM: &str = "There is no alarm to cancel.";
pub const APOLOGY: &str = "Sorry, I'm having trouble connecting right now.";

/// Name and voice of the assistant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Persona {
    name: String,
}

impl Default for Persona {
    fn default() -> Self {
        Self::new("Zira")
    }
}

impl Persona {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Instruction sent ahead of every completion request
    #[must_use]
    pub fn system_prompt(&self) -> String {
        format!(
            "You are {}, a friendly AI voice assistant. Keep responses conversational and clear.",
            self.name
        )
    }

    #[must_use]
    pub fn greeting(&self) -> String {
        format!(
            "Hello! I am your AI voice assistant, {}. How can I help you today?",
            self.name
        )
    }

    #[must_use]
    pub fn introduction(&self) -> String {
        format!("I am {}, your personal voice assistant.", self.name)
    }
}
