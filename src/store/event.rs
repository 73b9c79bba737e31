//! Events that can occur in the store

use super::state::{ChatMessage, View};
use chrono::NaiveDate;
use serde::Deserialize;

/// Actions screens may invoke
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    // Session
    Login,
    Logout,
    SetView {
        view: View,
    },

    // AI chat flow
    GoToSelectionScreen,
    SelectPersona {
        persona_id: String,
    },
    StartChatting {
        #[serde(default)]
        mood_id: Option<String>,
    },
    GoBack,
    SendMessage {
        text: String,
        #[serde(default)]
        image_url: Option<String>,
    },
    RetryMessage {
        message_id: String,
    },
    EditUserMessage {
        message_id: String,
        text: String,
    },
    SaveCurrentChat,
    DeleteSavedChat {
        chat_id: String,
    },

    // Journal
    AddJournalEntry {
        title: String,
        content: String,
    },
    UpdateJournalEntry {
        entry_id: String,
        title: String,
        content: String,
    },
    DeleteJournalEntry {
        entry_id: String,
    },

    // Settings
    SetFontSize {
        size: f32,
    },
    SetLineSpacing {
        spacing: f32,
    },
    SetTheme {
        theme_id: String,
    },

    // Engagement
    CompleteOnboarding,
    CompleteDailyChallenge,
    CheckAchievements,
    DismissAchievementNotification,
}

/// Events that trigger state transitions
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Action(Action),

    // Generation results, tagged with the turn that requested them
    WelcomeGenerated {
        turn: u64,
        /// `None` when generation failed and the static welcome applies
        text: Option<String>,
    },
    ReplyFragment {
        turn: u64,
        text: String,
    },
    ReplyFinished {
        turn: u64,
    },
    ReplyFailed {
        turn: u64,
        message: String,
    },
    SummaryGenerated {
        request_id: u64,
        persona_id: String,
        history: Vec<ChatMessage>,
        /// `None` when generation failed and the fallback summary applies
        summary: Option<String>,
    },
    ChallengeGenerated {
        date: NaiveDate,
        text: String,
    },
}

impl From<Action> for Event {
    fn from(action: Action) -> Self {
        Event::Action(action)
    }
}
