//! Application state types

use crate::catalog::DEFAULT_THEME_ID;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Navigation
// ============================================================================

/// Screen within the AI chat flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum Screen {
    #[default]
    Welcome,
    Selection,
    MoodCheckin,
    Chat,
}

/// Top-level view selected from the navigation bar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum View {
    #[default]
    AiChat,
    Community,
    Journal,
    Profile,
    Settings,
}

// ============================================================================
// Chat
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sender {
    User,
    Ai,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageStatus {
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: String,
    pub sender: Sender,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    /// Catalog id of the persona that produced an AI message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persona_id: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_streaming: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<MessageStatus>,
}

impl ChatMessage {
    pub fn user(id: impl Into<String>, text: impl Into<String>, image_url: Option<String>) -> Self {
        Self {
            id: id.into(),
            sender: Sender::User,
            text: text.into(),
            image_url,
            persona_id: None,
            is_streaming: false,
            status: None,
        }
    }

    pub fn ai(id: impl Into<String>, text: impl Into<String>, persona_id: &str) -> Self {
        Self {
            id: id.into(),
            sender: Sender::Ai,
            text: text.into(),
            image_url: None,
            persona_id: Some(persona_id.to_string()),
            is_streaming: false,
            status: None,
        }
    }

    pub fn is_user(&self) -> bool {
        self.sender == Sender::User
    }

    pub fn is_failed(&self) -> bool {
        self.status == Some(MessageStatus::Failed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedChat {
    pub id: String,
    pub saved_at: DateTime<Utc>,
    pub persona_id: String,
    pub chat_history: Vec<ChatMessage>,
    pub summary: String,
}

// ============================================================================
// Journal, profile and gamification
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JournalEntry {
    pub id: String,
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct DailyStreak {
    pub count: u32,
    /// `None` until the first login
    #[serde(default, deserialize_with = "super::snapshot::lenient_date")]
    pub last_visit: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyChallenge {
    pub id: String,
    pub text: String,
    pub completed: bool,
    pub date: NaiveDate,
}

// ============================================================================
// Settings
// ============================================================================

pub const FONT_SIZE_RANGE: (f32, f32) = (0.8, 1.5);
pub const LINE_SPACING_RANGE: (f32, f32) = (1.2, 2.2);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    pub font_size: f32,
    pub line_spacing: f32,
    pub active_theme_id: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            font_size: 1.0,
            line_spacing: 1.6,
            active_theme_id: DEFAULT_THEME_ID.to_string(),
        }
    }
}

// ============================================================================
// Store Context
// ============================================================================

/// Immutable configuration for the store
#[derive(Debug, Clone)]
pub struct StoreContext {
    /// Profile installed by the mock login
    pub profile: User,
}

impl StoreContext {
    pub fn new(profile: User) -> Self {
        Self { profile }
    }
}

impl Default for StoreContext {
    fn default() -> Self {
        Self::new(User {
            id: "1".to_string(),
            name: "Diana".to_string(),
            email: "diana@example.com".to_string(),
        })
    }
}

// ============================================================================
// In-flight generation bookkeeping
// ============================================================================

/// What an in-flight generation request will produce
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationKind {
    Welcome,
    Reply,
}

/// The single generation request whose results the store still accepts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InFlight {
    pub turn: u64,
    pub kind: GenerationKind,
    /// User message that triggered a reply; marked failed if generation fails
    pub origin_message_id: Option<String>,
    /// Id reserved for the AI message this turn appends
    pub ai_message_id: String,
    /// Whether the first fragment has arrived and the AI message exists
    pub streaming_started: bool,
}

// ============================================================================
// Application State
// ============================================================================

/// Everything the store owns
///
/// Bookkeeping fields (`turn`, `in_flight`, `save_request`, `next_id`) are
/// never shown to screens; `is_loading` is derived from them.
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct AppState {
    // AI chat flow
    pub screen: Screen,
    pub selected_persona: Option<String>,
    pub chat_history: Vec<ChatMessage>,
    pub is_loading: bool,
    pub current_mood: Option<String>,

    // Session and navigation
    pub is_authenticated: bool,
    pub current_user: Option<User>,
    pub current_view: View,
    pub saved_chats: Vec<SavedChat>,
    pub journal_entries: Vec<JournalEntry>,

    pub settings: Settings,

    // Gamification
    pub onboarding_completed: bool,
    pub unlocked_achievements: Vec<String>,
    pub daily_streak: DailyStreak,
    pub daily_challenge: Option<DailyChallenge>,
    pub completed_challenge_dates: Vec<NaiveDate>,
    pub last_unlocked_achievement: Option<String>,

    #[serde(skip)]
    pub turn: u64,
    #[serde(skip)]
    pub in_flight: Option<InFlight>,
    #[serde(skip)]
    pub save_request: Option<u64>,
    #[serde(skip)]
    pub next_id: u64,
}

impl AppState {
    /// Allocate a fresh store-unique id with the given prefix
    pub fn allocate_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}-{}", self.next_id)
    }

    /// Recompute the busy flag from outstanding requests
    pub fn refresh_busy(&mut self) {
        self.is_loading = self.in_flight.is_some() || self.save_request.is_some();
    }

    pub fn message_mut(&mut self, id: &str) -> Option<&mut ChatMessage> {
        self.chat_history.iter_mut().find(|m| m.id == id)
    }

    /// Drop the persona, mood and history of the current chat
    pub fn clear_chat_context(&mut self) {
        self.selected_persona = None;
        self.current_mood = None;
        self.chat_history.clear();
    }

    /// Today's challenge, if one is installed for `today`
    pub fn challenge_for(&self, today: NaiveDate) -> Option<&DailyChallenge> {
        self.daily_challenge.as_ref().filter(|c| c.date == today)
    }
}
