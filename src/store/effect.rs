//! Effects produced by state transitions

use super::state::ChatMessage;
use chrono::NaiveDate;

/// Effects to be executed after state transition
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Write the persisted snapshot through to storage
    PersistSnapshot,

    /// Ask for a mood-aware opening line
    RequestWelcome {
        turn: u64,
        persona_id: String,
        mood_id: String,
    },

    /// Stream a reply for the given history
    RequestReply {
        turn: u64,
        persona_id: String,
        mood_id: Option<String>,
        history: Vec<ChatMessage>,
    },

    /// Summarize a chat that is being saved
    RequestSummary {
        request_id: u64,
        persona_id: String,
        history: Vec<ChatMessage>,
    },

    /// Fetch the self-care prompt for `date`
    RequestDailyChallenge { date: NaiveDate },

    /// Stop whatever welcome or reply generation is running
    CancelGeneration,

    /// One-shot notification for a fresh unlock
    NotifyAchievement { achievement_id: String },
}

impl Effect {
    pub fn request_reply(
        turn: u64,
        persona_id: &str,
        mood_id: Option<&str>,
        history: Vec<ChatMessage>,
    ) -> Self {
        Effect::RequestReply {
            turn,
            persona_id: persona_id.to_string(),
            mood_id: mood_id.map(String::from),
            history,
        }
    }

    pub fn notify_achievement(achievement_id: &str) -> Self {
        Effect::NotifyAchievement {
            achievement_id: achievement_id.to_string(),
        }
    }
}
