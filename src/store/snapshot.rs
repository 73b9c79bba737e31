//! Persisted snapshot of the store
//!
//! Only durable fields are written. Loading repairs anything that cannot
//! be true after a restart: no generation is running, so nothing streams
//! and nothing is busy.

use super::state::{
    AppState, ChatMessage, DailyChallenge, DailyStreak, JournalEntry, MessageStatus, SavedChat,
    Screen, Sender, Settings, User, FONT_SIZE_RANGE, LINE_SPACING_RANGE,
};
use crate::catalog::{self, DEFAULT_THEME_ID};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Layout written by this build. Snapshots without a version are layout 0.
pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct PersistedSnapshot {
    pub version: u32,
    pub is_authenticated: bool,
    pub current_user: Option<User>,
    pub screen: Screen,
    pub selected_persona: Option<String>,
    pub chat_history: Vec<ChatMessage>,
    pub current_mood: Option<String>,
    pub settings: Settings,
    pub saved_chats: Vec<SavedChat>,
    pub journal_entries: Vec<JournalEntry>,
    pub onboarding_completed: bool,
    pub unlocked_achievements: Vec<String>,
    pub daily_streak: DailyStreak,
    pub daily_challenge: Option<DailyChallenge>,
    pub completed_challenge_dates: Vec<NaiveDate>,
    /// Id counter; absent in layout 0 and rebuilt from stored ids
    pub next_id: u64,
}

impl From<&AppState> for PersistedSnapshot {
    fn from(state: &AppState) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            is_authenticated: state.is_authenticated,
            current_user: state.current_user.clone(),
            screen: state.screen,
            selected_persona: state.selected_persona.clone(),
            chat_history: state.chat_history.clone(),
            current_mood: state.current_mood.clone(),
            settings: state.settings.clone(),
            saved_chats: state.saved_chats.clone(),
            journal_entries: state.journal_entries.clone(),
            onboarding_completed: state.onboarding_completed,
            unlocked_achievements: state.unlocked_achievements.clone(),
            daily_streak: state.daily_streak.clone(),
            daily_challenge: state.daily_challenge.clone(),
            completed_challenge_dates: state.completed_challenge_dates.clone(),
            next_id: state.next_id,
        }
    }
}

impl PersistedSnapshot {
    /// Parse a stored blob of any known layout
    ///
    /// Layout 0 is the browser store's blob: descriptors embedded as
    /// objects, settings at the top level, optionally wrapped in a
    /// `{"state": ..., "version": 0}` envelope.
    pub fn from_json(data: &str) -> serde_json::Result<Self> {
        let value: Value = serde_json::from_str(data)?;
        let version = value.get("version").and_then(Value::as_u64).unwrap_or(0);
        if version > 0 {
            return serde_json::from_value(value);
        }

        let body = match value.get("state") {
            Some(inner) if inner.is_object() => inner.clone(),
            _ => value,
        };
        let legacy: LegacySnapshot = serde_json::from_value(body)?;
        Ok(legacy.into())
    }

    /// Rebuild live state, repairing what a restart invalidates
    pub fn into_state(self) -> AppState {
        let next_id = self.next_id.max(highest_id_suffix(&self));

        let mut state = AppState {
            is_authenticated: self.is_authenticated,
            current_user: self.current_user,
            screen: self.screen,
            selected_persona: self
                .selected_persona
                .filter(|id| catalog::persona(id).is_some()),
            chat_history: self.chat_history,
            current_mood: self.current_mood.filter(|id| catalog::mood(id).is_some()),
            settings: repair_settings(self.settings),
            saved_chats: self.saved_chats,
            journal_entries: self.journal_entries,
            onboarding_completed: self.onboarding_completed,
            unlocked_achievements: self.unlocked_achievements,
            daily_streak: self.daily_streak,
            daily_challenge: self.daily_challenge,
            completed_challenge_dates: self.completed_challenge_dates,
            next_id,
            ..AppState::default()
        };

        for message in &mut state.chat_history {
            message.is_streaming = false;
        }

        if state.selected_persona.is_none()
            && matches!(state.screen, Screen::Chat | Screen::MoodCheckin)
        {
            tracing::warn!(screen = ?state.screen, "Snapshot has no usable persona, returning to selection");
            state.clear_chat_context();
            state.screen = Screen::Selection;
        }

        state.refresh_busy();
        state
    }
}

// ============================================================================
// Layout 0
// ============================================================================

/// Embedded catalog descriptor; only its id survives
#[derive(Debug, Deserialize)]
struct CatalogRef {
    id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyMessage {
    id: String,
    sender: Sender,
    #[serde(default)]
    text: String,
    #[serde(default)]
    image_url: Option<String>,
    #[serde(default)]
    character: Option<CatalogRef>,
    #[serde(default)]
    is_streaming: bool,
    #[serde(default)]
    status: Option<MessageStatus>,
}

impl From<LegacyMessage> for ChatMessage {
    fn from(m: LegacyMessage) -> Self {
        Self {
            id: m.id,
            sender: m.sender,
            text: m.text,
            image_url: m.image_url,
            persona_id: m.character.map(|c| c.id),
            is_streaming: m.is_streaming,
            status: m.status,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacySavedChat {
    id: String,
    saved_at: DateTime<Utc>,
    character: CatalogRef,
    #[serde(default)]
    chat_history: Vec<LegacyMessage>,
    #[serde(default)]
    summary: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct LegacySnapshot {
    is_authenticated: bool,
    current_user: Option<User>,
    current_screen: Screen,
    selected_character: Option<CatalogRef>,
    chat_history: Vec<LegacyMessage>,
    current_mood: Option<CatalogRef>,
    font_size: Option<f32>,
    line_spacing: Option<f32>,
    active_theme_id: Option<String>,
    saved_chats: Vec<LegacySavedChat>,
    journal_entries: Vec<JournalEntry>,
    onboarding_completed: bool,
    unlocked_achievements: Vec<String>,
    daily_streak: DailyStreak,
    daily_challenge: Option<DailyChallenge>,
    completed_challenge_dates: Vec<NaiveDate>,
}

impl From<LegacySnapshot> for PersistedSnapshot {
    fn from(legacy: LegacySnapshot) -> Self {
        let defaults = Settings::default();
        Self {
            version: 0,
            is_authenticated: legacy.is_authenticated,
            current_user: legacy.current_user,
            screen: legacy.current_screen,
            selected_persona: legacy.selected_character.map(|c| c.id),
            chat_history: legacy.chat_history.into_iter().map(Into::into).collect(),
            current_mood: legacy.current_mood.map(|m| m.id),
            settings: Settings {
                font_size: legacy.font_size.unwrap_or(defaults.font_size),
                line_spacing: legacy.line_spacing.unwrap_or(defaults.line_spacing),
                active_theme_id: legacy.active_theme_id.unwrap_or(defaults.active_theme_id),
            },
            saved_chats: legacy
                .saved_chats
                .into_iter()
                .map(|c| SavedChat {
                    id: c.id,
                    saved_at: c.saved_at,
                    persona_id: c.character.id,
                    chat_history: c.chat_history.into_iter().map(Into::into).collect(),
                    summary: c.summary,
                })
                .collect(),
            journal_entries: legacy.journal_entries,
            onboarding_completed: legacy.onboarding_completed,
            unlocked_achievements: legacy.unlocked_achievements,
            daily_streak: legacy.daily_streak,
            daily_challenge: legacy.daily_challenge,
            completed_challenge_dates: legacy.completed_challenge_dates,
            next_id: 0,
        }
    }
}

fn repair_settings(settings: Settings) -> Settings {
    let defaults = Settings::default();
    let clamp = |value: f32, (min, max): (f32, f32), fallback: f32| {
        if value.is_finite() {
            value.clamp(min, max)
        } else {
            fallback
        }
    };
    Settings {
        font_size: clamp(settings.font_size, FONT_SIZE_RANGE, defaults.font_size),
        line_spacing: clamp(settings.line_spacing, LINE_SPACING_RANGE, defaults.line_spacing),
        active_theme_id: if catalog::theme(&settings.active_theme_id).is_some() {
            settings.active_theme_id
        } else {
            DEFAULT_THEME_ID.to_string()
        },
    }
}

/// Largest numeric suffix among stored `prefix-N` ids
fn highest_id_suffix(snapshot: &PersistedSnapshot) -> u64 {
    let message_ids = snapshot
        .chat_history
        .iter()
        .chain(snapshot.saved_chats.iter().flat_map(|c| &c.chat_history))
        .map(|m| m.id.as_str());
    let other_ids = snapshot
        .saved_chats
        .iter()
        .map(|c| c.id.as_str())
        .chain(snapshot.journal_entries.iter().map(|e| e.id.as_str()));

    message_ids
        .chain(other_ids)
        .filter_map(|id| id.rsplit_once('-'))
        .filter_map(|(_, n)| n.parse::<u64>().ok())
        .max()
        .unwrap_or(0)
}

/// Layout 0 wrote an empty string before the first visit
pub(super) fn lenient_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        None => Ok(None),
        Some(s) if s.is_empty() => Ok(None),
        Some(s) => s.parse().map(Some).map_err(serde::de::Error::custom),
    }
}
