//! Pure state transition function
//!
//! Given the same state, context, time and event this always produces the
//! same new state and effects. All I/O happens in the runtime.

use super::effect::Effect;
use super::event::{Action, Event};
use super::gamification::{advance_streak, recheck_achievements};
use super::state::{
    AppState, ChatMessage, DailyChallenge, GenerationKind, InFlight, JournalEntry, SavedChat,
    Screen, StoreContext, FONT_SIZE_RANGE, LINE_SPACING_RANGE,
};
use crate::catalog::{self, Persona};
use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;

/// Summary stored when the generation service cannot provide one
pub const SUMMARY_FALLBACK: &str = "Summary unavailable.";

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: AppState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: AppState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    pub fn with_effects(mut self, effects: impl IntoIterator<Item = Effect>) -> Self {
        self.effects.extend(effects);
        self
    }
}

/// Precondition violations; the action is a no-op
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("No persona selected")]
    NoPersonaSelected,
    #[error("Message needs text or an image")]
    EmptyMessage,
    #[error("A reply is still being generated")]
    Busy,
    #[error("Chat is too short to be saved")]
    ChatTooShort,
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Unknown catalog id: {0}")]
    UnknownCatalogId(String),
    #[error("Invalid setting: {0}")]
    InvalidSetting(String),
}

/// Pure transition function
pub fn transition(
    state: &AppState,
    context: &StoreContext,
    now: DateTime<Utc>,
    event: Event,
) -> Result<TransitionResult, TransitionError> {
    let mut next = state.clone();

    let effects = match event {
        Event::Action(action) => apply_action(&mut next, context, now, action)?,
        Event::WelcomeGenerated { turn, text } => on_welcome(&mut next, turn, text),
        Event::ReplyFragment { turn, text } => on_fragment(&mut next, turn, &text),
        Event::ReplyFinished { turn } => on_finished(&mut next, turn),
        Event::ReplyFailed { turn, .. } => on_failed(&mut next, turn),
        Event::SummaryGenerated {
            request_id,
            persona_id,
            history,
            summary,
        } => on_summary(&mut next, now, request_id, persona_id, history, summary),
        Event::ChallengeGenerated { date, text } => on_challenge(&mut next, now, date, text),
    };

    next.refresh_busy();

    let mut result = TransitionResult::new(next);
    if result.new_state != *state {
        result.effects.push(Effect::PersistSnapshot);
    }
    Ok(result.with_effects(effects))
}

// ============================================================================
// Actions
// ============================================================================

#[allow(clippy::too_many_lines)] // One arm per store action
fn apply_action(
    next: &mut AppState,
    context: &StoreContext,
    now: DateTime<Utc>,
    action: Action,
) -> Result<Vec<Effect>, TransitionError> {
    let today = now.date_naive();

    match action {
        // ============================================================
        // Session
        // ============================================================
        Action::Login => {
            let mut effects = Vec::new();
            next.daily_streak = advance_streak(&next.daily_streak, today);
            if next.challenge_for(today).is_none() {
                effects.push(Effect::RequestDailyChallenge { date: today });
            }
            effects.extend(abandon_generation(next));

            next.is_authenticated = true;
            next.current_user = Some(context.profile.clone());
            next.screen = Screen::Welcome;
            next.current_view = super::state::View::AiChat;

            effects.extend(recheck_achievements(next));
            Ok(effects)
        }

        Action::Logout => {
            let effects = abandon_generation(next);
            // A summary still on its way is saved, but nothing waits for it
            next.save_request = None;
            next.is_authenticated = false;
            next.current_user = None;
            next.screen = Screen::Welcome;
            next.clear_chat_context();
            next.current_view = super::state::View::AiChat;
            Ok(effects)
        }

        Action::SetView { view } => {
            next.current_view = view;
            Ok(recheck_achievements(next))
        }

        // ============================================================
        // Navigation
        // ============================================================
        Action::GoToSelectionScreen => {
            if next.screen != Screen::Welcome {
                return Err(invalid_from(next.screen, "selection"));
            }
            next.screen = Screen::Selection;
            Ok(vec![])
        }

        Action::SelectPersona { persona_id } => {
            if next.screen != Screen::Selection {
                return Err(invalid_from(next.screen, "mood check-in"));
            }
            let persona = catalog::persona(&persona_id)
                .ok_or(TransitionError::UnknownCatalogId(persona_id))?;
            let effects = abandon_generation(next);
            next.clear_chat_context();
            next.selected_persona = Some(persona.id.to_string());
            next.screen = Screen::MoodCheckin;
            Ok(effects)
        }

        Action::StartChatting { mood_id } => {
            if next.screen != Screen::MoodCheckin {
                return Err(invalid_from(next.screen, "chat"));
            }
            let persona = selected_persona(next)?;
            let mood = match mood_id {
                Some(id) => Some(
                    catalog::mood(&id).ok_or(TransitionError::UnknownCatalogId(id))?,
                ),
                None => None,
            };

            next.screen = Screen::Chat;
            next.chat_history.clear();
            next.current_mood = mood.map(|m| m.id.to_string());

            let Some(mood) = mood else {
                let id = next.allocate_id("welcome");
                next.chat_history
                    .push(ChatMessage::ai(id, persona.welcome_message, persona.id));
                return Ok(vec![]);
            };

            next.turn += 1;
            let ai_message_id = next.allocate_id("welcome");
            next.in_flight = Some(InFlight {
                turn: next.turn,
                kind: GenerationKind::Welcome,
                origin_message_id: None,
                ai_message_id,
                streaming_started: false,
            });
            Ok(vec![Effect::RequestWelcome {
                turn: next.turn,
                persona_id: persona.id.to_string(),
                mood_id: mood.id.to_string(),
            }])
        }

        Action::GoBack => match next.screen {
            Screen::Chat => {
                let effects = abandon_generation(next);
                next.clear_chat_context();
                next.screen = Screen::Selection;
                Ok(effects)
            }
            Screen::MoodCheckin => {
                next.screen = Screen::Selection;
                Ok(vec![])
            }
            Screen::Selection => {
                next.screen = Screen::Welcome;
                Ok(vec![])
            }
            Screen::Welcome => Err(TransitionError::InvalidTransition(
                "already at the welcome screen".to_string(),
            )),
        },

        // ============================================================
        // Streaming replies
        // ============================================================
        Action::SendMessage { text, image_url } => {
            let persona = selected_persona(next)?;
            if next.screen != Screen::Chat {
                return Err(TransitionError::InvalidTransition(
                    "messages can only be sent from the chat screen".to_string(),
                ));
            }
            let image_url = image_url.filter(|url| !url.trim().is_empty());
            if text.trim().is_empty() && image_url.is_none() {
                return Err(TransitionError::EmptyMessage);
            }
            ensure_idle(next)?;

            let id = next.allocate_id("user");
            next.chat_history
                .push(ChatMessage::user(id.clone(), text, image_url));
            Ok(vec![begin_reply(next, persona, id)])
        }

        Action::RetryMessage { message_id } => {
            let persona = selected_persona(next)?;
            ensure_idle(next)?;
            let index = user_message_index(next, &message_id)?;

            let mut message = next.chat_history.remove(index);
            message.status = None;
            next.chat_history.push(message);
            Ok(vec![begin_reply(next, persona, message_id)])
        }

        Action::EditUserMessage { message_id, text } => {
            let persona = selected_persona(next)?;
            ensure_idle(next)?;
            let index = user_message_index(next, &message_id)?;
            if text.trim().is_empty() && next.chat_history[index].image_url.is_none() {
                return Err(TransitionError::EmptyMessage);
            }

            next.chat_history.truncate(index + 1);
            let edited = &mut next.chat_history[index];
            edited.text = text;
            edited.status = None;
            Ok(vec![begin_reply(next, persona, message_id)])
        }

        // ============================================================
        // Saved chats
        // ============================================================
        Action::SaveCurrentChat => {
            let persona = selected_persona(next)?;
            if next.chat_history.len() <= 1 {
                return Err(TransitionError::ChatTooShort);
            }
            if next.in_flight.is_some() || next.save_request.is_some() {
                return Err(TransitionError::Busy);
            }
            next.turn += 1;
            next.save_request = Some(next.turn);
            Ok(vec![Effect::RequestSummary {
                request_id: next.turn,
                persona_id: persona.id.to_string(),
                history: next.chat_history.clone(),
            }])
        }

        Action::DeleteSavedChat { chat_id } => {
            let before = next.saved_chats.len();
            next.saved_chats.retain(|c| c.id != chat_id);
            if next.saved_chats.len() == before {
                return Err(TransitionError::NotFound(chat_id));
            }
            Ok(vec![])
        }

        // ============================================================
        // Journal
        // ============================================================
        Action::AddJournalEntry { title, content } => {
            let id = next.allocate_id("journal");
            next.journal_entries.insert(
                0,
                JournalEntry {
                    id,
                    title,
                    content,
                    created_at: now,
                    updated_at: now,
                },
            );
            Ok(recheck_achievements(next))
        }

        Action::UpdateJournalEntry {
            entry_id,
            title,
            content,
        } => {
            let entry = next
                .journal_entries
                .iter_mut()
                .find(|e| e.id == entry_id)
                .ok_or(TransitionError::NotFound(entry_id))?;
            entry.title = title;
            entry.content = content;
            entry.updated_at = now;
            Ok(recheck_achievements(next))
        }

        Action::DeleteJournalEntry { entry_id } => {
            let before = next.journal_entries.len();
            next.journal_entries.retain(|e| e.id != entry_id);
            if next.journal_entries.len() == before {
                return Err(TransitionError::NotFound(entry_id));
            }
            Ok(recheck_achievements(next))
        }

        // ============================================================
        // Settings
        // ============================================================
        Action::SetFontSize { size } => {
            next.settings.font_size = clamp_setting("font size", size, FONT_SIZE_RANGE)?;
            Ok(vec![])
        }

        Action::SetLineSpacing { spacing } => {
            next.settings.line_spacing =
                clamp_setting("line spacing", spacing, LINE_SPACING_RANGE)?;
            Ok(vec![])
        }

        Action::SetTheme { theme_id } => {
            let theme =
                catalog::theme(&theme_id).ok_or(TransitionError::UnknownCatalogId(theme_id))?;
            next.settings.active_theme_id = theme.id.to_string();
            Ok(recheck_achievements(next))
        }

        // ============================================================
        // Engagement
        // ============================================================
        Action::CompleteOnboarding => {
            next.onboarding_completed = true;
            Ok(vec![])
        }

        Action::CompleteDailyChallenge => {
            let challenge = next
                .daily_challenge
                .as_mut()
                .filter(|c| c.date == today)
                .ok_or_else(|| TransitionError::NotFound(format!("challenge for {today}")))?;
            challenge.completed = true;
            if !next.completed_challenge_dates.contains(&today) {
                next.completed_challenge_dates.push(today);
            }
            Ok(recheck_achievements(next))
        }

        Action::CheckAchievements => Ok(recheck_achievements(next)),

        Action::DismissAchievementNotification => {
            next.last_unlocked_achievement = None;
            Ok(vec![])
        }
    }
}

fn invalid_from(screen: Screen, target: &str) -> TransitionError {
    TransitionError::InvalidTransition(format!("cannot go to {target} from {screen:?}"))
}

fn selected_persona(state: &AppState) -> Result<&'static Persona, TransitionError> {
    state
        .selected_persona
        .as_deref()
        .and_then(catalog::persona)
        .ok_or(TransitionError::NoPersonaSelected)
}

fn ensure_idle(state: &AppState) -> Result<(), TransitionError> {
    if state.in_flight.is_some() {
        Err(TransitionError::Busy)
    } else {
        Ok(())
    }
}

fn user_message_index(state: &AppState, message_id: &str) -> Result<usize, TransitionError> {
    let index = state
        .chat_history
        .iter()
        .position(|m| m.id == message_id)
        .ok_or_else(|| TransitionError::NotFound(message_id.to_string()))?;
    if !state.chat_history[index].is_user() {
        return Err(TransitionError::InvalidTransition(
            "only user messages can be retried or edited".to_string(),
        ));
    }
    Ok(index)
}

fn clamp_setting(name: &str, value: f32, (min, max): (f32, f32)) -> Result<f32, TransitionError> {
    if value.is_finite() {
        Ok(value.clamp(min, max))
    } else {
        Err(TransitionError::InvalidSetting(format!("{name} must be finite")))
    }
}

/// Open a new reply turn for the current history
fn begin_reply(next: &mut AppState, persona: &Persona, origin_message_id: String) -> Effect {
    next.turn += 1;
    let ai_message_id = next.allocate_id("ai");
    next.in_flight = Some(InFlight {
        turn: next.turn,
        kind: GenerationKind::Reply,
        origin_message_id: Some(origin_message_id),
        ai_message_id,
        streaming_started: false,
    });
    Effect::request_reply(
        next.turn,
        persona.id,
        next.current_mood.as_deref(),
        next.chat_history.clone(),
    )
}

/// Stop accepting results for the in-flight request, if any
fn abandon_generation(next: &mut AppState) -> Vec<Effect> {
    match next.in_flight.take() {
        Some(flight) => {
            if flight.streaming_started {
                if let Some(msg) = next.message_mut(&flight.ai_message_id) {
                    msg.is_streaming = false;
                }
            }
            vec![Effect::CancelGeneration]
        }
        None => vec![],
    }
}

// ============================================================================
// Generation results
// ============================================================================

/// The in-flight record if it matches `turn` and `kind`
fn current_flight(next: &AppState, turn: u64, kind: GenerationKind) -> Option<InFlight> {
    next.in_flight
        .as_ref()
        .filter(|f| f.turn == turn && f.kind == kind)
        .cloned()
}

fn on_welcome(next: &mut AppState, turn: u64, text: Option<String>) -> Vec<Effect> {
    let Some(flight) = current_flight(next, turn, GenerationKind::Welcome) else {
        return vec![];
    };
    next.in_flight = None;

    let Ok(persona) = selected_persona(next) else {
        return vec![];
    };
    let text = text
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| persona.welcome_message.to_string());
    next.chat_history
        .push(ChatMessage::ai(flight.ai_message_id, text, persona.id));
    vec![]
}

fn on_fragment(next: &mut AppState, turn: u64, text: &str) -> Vec<Effect> {
    let Some(flight) = current_flight(next, turn, GenerationKind::Reply) else {
        return vec![];
    };

    if flight.streaming_started {
        if let Some(msg) = next
            .chat_history
            .last_mut()
            .filter(|m| m.id == flight.ai_message_id)
        {
            msg.text.push_str(text);
        }
        return vec![];
    }

    let Ok(persona) = selected_persona(next) else {
        return vec![];
    };
    let mut message = ChatMessage::ai(flight.ai_message_id, text, persona.id);
    message.is_streaming = true;
    next.chat_history.push(message);
    if let Some(flight) = next.in_flight.as_mut() {
        flight.streaming_started = true;
    }
    vec![]
}

fn on_finished(next: &mut AppState, turn: u64) -> Vec<Effect> {
    let Some(flight) = current_flight(next, turn, GenerationKind::Reply) else {
        return vec![];
    };
    next.in_flight = None;
    if let Some(msg) = next.message_mut(&flight.ai_message_id) {
        msg.is_streaming = false;
    }
    vec![]
}

fn on_failed(next: &mut AppState, turn: u64) -> Vec<Effect> {
    let Some(flight) = current_flight(next, turn, GenerationKind::Reply) else {
        return vec![];
    };
    next.in_flight = None;
    next.chat_history.retain(|m| m.id != flight.ai_message_id);
    if let Some(origin) = flight
        .origin_message_id
        .as_deref()
        .and_then(|id| next.chat_history.iter_mut().find(|m| m.id == id))
    {
        origin.status = Some(super::state::MessageStatus::Failed);
    }
    vec![]
}

fn on_summary(
    next: &mut AppState,
    now: DateTime<Utc>,
    request_id: u64,
    persona_id: String,
    history: Vec<ChatMessage>,
    summary: Option<String>,
) -> Vec<Effect> {
    if next.save_request == Some(request_id) {
        next.save_request = None;
    }
    let id = next.allocate_id("saved");
    next.saved_chats.insert(
        0,
        SavedChat {
            id,
            saved_at: now,
            persona_id,
            chat_history: history,
            summary: summary
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| SUMMARY_FALLBACK.to_string()),
        },
    );
    recheck_achievements(next)
}

fn on_challenge(
    next: &mut AppState,
    now: DateTime<Utc>,
    date: NaiveDate,
    text: String,
) -> Vec<Effect> {
    if date != now.date_naive() || next.challenge_for(date).is_some() {
        return vec![];
    }
    next.daily_challenge = Some(DailyChallenge {
        id: format!("challenge-{date}"),
        text,
        completed: false,
        date,
    });
    vec![]
}
