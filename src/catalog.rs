//! Static catalogs for personas, moods, achievements and themes
//!
//! Every descriptor lives in a `&'static` table and is resolved by id.
//! State only ever stores ids; lookups go through this module.

use crate::store::state::View;
use serde::Serialize;

/// Theme applied when the user has never picked one
pub const DEFAULT_THEME_ID: &str = "default";

/// A scripted companion the user can chat with
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Persona {
    pub id: &'static str,
    pub name: &'static str,
    pub icon: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    /// Sent to the generation service as the system instruction
    #[serde(skip)]
    pub system_instruction: &'static str,
    /// Opening line used when no mood-aware welcome is available
    pub welcome_message: &'static str,
    pub color: &'static str,
    pub gradient: &'static str,
}

/// A mood the user picks once per chat session
#[derive(Debug, Clone, Serialize)]
pub struct Mood {
    pub id: &'static str,
    pub name: &'static str,
    pub icon: &'static str,
}

/// Condition under which an achievement unlocks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UnlockRule {
    JournalEntries { at_least: usize },
    SavedChats { at_least: usize },
    DistinctPersonasSaved { at_least: usize },
    StreakDays { at_least: u32 },
    CustomTheme,
    VisitView { view: View },
    ChallengesCompleted { at_least: usize },
}

#[derive(Debug, Clone, Serialize)]
pub struct Achievement {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub icon: &'static str,
    pub rule: UnlockRule,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Theme {
    pub id: &'static str,
    pub name: &'static str,
    pub gradient_from: &'static str,
    pub gradient_to: &'static str,
}

pub fn all_personas() -> &'static [Persona] {
    &[
        Persona {
            id: "noor",
            name: "Noor",
            icon: "🌙",
            title: "The gentle listener",
            description: "Listens without judgement and helps you put feelings into words.",
            system_instruction: "You are Noor, a warm and patient companion for women. \
                Listen closely, reflect feelings back in simple words, and never judge. \
                Keep replies short, kind and conversational. You are not a therapist; \
                if the user mentions self-harm, gently encourage reaching out to a trusted \
                person or a local emergency line.",
            welcome_message: "Hi, I'm Noor. I'm here to listen. What's on your mind today?",
            color: "indigo",
            gradient: "from-indigo-400 to-purple-500",
        },
        Persona {
            id: "salma",
            name: "Salma",
            icon: "☀️",
            title: "The cheerful motivator",
            description: "Brings energy and small, doable steps when things feel heavy.",
            system_instruction: "You are Salma, an upbeat and encouraging friend. \
                Celebrate small wins, suggest one small practical step at a time, and keep \
                a hopeful tone without dismissing difficult feelings. Keep replies brief.",
            welcome_message: "Hey! Salma here. Let's find one good thing in your day together.",
            color: "amber",
            gradient: "from-amber-300 to-orange-500",
        },
        Persona {
            id: "layla",
            name: "Layla",
            icon: "🌸",
            title: "The wise big sister",
            description: "Offers perspective from experience, honestly and with care.",
            system_instruction: "You are Layla, a caring older-sister figure. \
                Share gentle perspective, ask thoughtful questions, and be honest while \
                staying kind. Avoid lecturing. Keep replies conversational.",
            welcome_message: "Hello dear, it's Layla. Sit with me a while and tell me everything.",
            color: "pink",
            gradient: "from-pink-400 to-rose-500",
        },
        Persona {
            id: "hana",
            name: "Hana",
            icon: "🍃",
            title: "The calm mindfulness guide",
            description: "Guides short breathing and grounding exercises.",
            system_instruction: "You are Hana, a calm mindfulness guide. \
                Offer short grounding or breathing exercises when helpful, speak slowly and \
                simply, and invite the user to notice the present moment.",
            welcome_message: "Welcome, I'm Hana. Let's take one slow breath together before we begin.",
            color: "emerald",
            gradient: "from-emerald-400 to-teal-500",
        },
    ]
}

pub fn all_moods() -> &'static [Mood] {
    &[
        Mood { id: "happy", name: "Happy", icon: "😊" },
        Mood { id: "calm", name: "Calm", icon: "😌" },
        Mood { id: "sad", name: "Sad", icon: "😢" },
        Mood { id: "anxious", name: "Anxious", icon: "😟" },
        Mood { id: "angry", name: "Angry", icon: "😠" },
        Mood { id: "tired", name: "Tired", icon: "😴" },
    ]
}

pub fn all_achievements() -> &'static [Achievement] {
    &[
        Achievement {
            id: "journal_1",
            name: "First page",
            description: "Write your first journal entry.",
            icon: "📝",
            rule: UnlockRule::JournalEntries { at_least: 1 },
        },
        Achievement {
            id: "journal_5",
            name: "Storyteller",
            description: "Write 5 journal entries.",
            icon: "📖",
            rule: UnlockRule::JournalEntries { at_least: 5 },
        },
        Achievement {
            id: "journal_10",
            name: "Open book",
            description: "Write 10 journal entries.",
            icon: "📚",
            rule: UnlockRule::JournalEntries { at_least: 10 },
        },
        Achievement {
            id: "chat_1",
            name: "Kept close",
            description: "Save your first conversation.",
            icon: "💬",
            rule: UnlockRule::SavedChats { at_least: 1 },
        },
        Achievement {
            id: "chat_5",
            name: "Memory keeper",
            description: "Save 5 conversations.",
            icon: "🗂️",
            rule: UnlockRule::SavedChats { at_least: 5 },
        },
        Achievement {
            id: "chat_3_chars",
            name: "Circle of friends",
            description: "Save conversations with 3 different companions.",
            icon: "👭",
            rule: UnlockRule::DistinctPersonasSaved { at_least: 3 },
        },
        Achievement {
            id: "streak_3",
            name: "Coming back",
            description: "Visit 3 days in a row.",
            icon: "🔥",
            rule: UnlockRule::StreakDays { at_least: 3 },
        },
        Achievement {
            id: "streak_7",
            name: "A full week",
            description: "Visit 7 days in a row.",
            icon: "🌟",
            rule: UnlockRule::StreakDays { at_least: 7 },
        },
        Achievement {
            id: "customize_theme",
            name: "Make it yours",
            description: "Pick a new theme.",
            icon: "🎨",
            rule: UnlockRule::CustomTheme,
        },
        Achievement {
            id: "community_visit",
            name: "Not alone",
            description: "Visit the community space.",
            icon: "🤝",
            rule: UnlockRule::VisitView {
                view: View::Community,
            },
        },
        Achievement {
            id: "challenge_5",
            name: "Self-care habit",
            description: "Complete 5 daily challenges.",
            icon: "🏆",
            rule: UnlockRule::ChallengesCompleted { at_least: 5 },
        },
    ]
}

pub fn all_themes() -> &'static [Theme] {
    &[
        Theme {
            id: DEFAULT_THEME_ID,
            name: "Lavender night",
            gradient_from: "from-indigo-900",
            gradient_to: "to-purple-800",
        },
        Theme {
            id: "sunset",
            name: "Sunset",
            gradient_from: "from-orange-500",
            gradient_to: "to-pink-700",
        },
        Theme {
            id: "ocean",
            name: "Ocean",
            gradient_from: "from-sky-700",
            gradient_to: "to-blue-900",
        },
        Theme {
            id: "forest",
            name: "Forest",
            gradient_from: "from-emerald-700",
            gradient_to: "to-green-900",
        },
        Theme {
            id: "rose",
            name: "Rose garden",
            gradient_from: "from-rose-500",
            gradient_to: "to-fuchsia-800",
        },
    ]
}

pub fn persona(id: &str) -> Option<&'static Persona> {
    all_personas().iter().find(|p| p.id == id)
}

pub fn mood(id: &str) -> Option<&'static Mood> {
    all_moods().iter().find(|m| m.id == id)
}

pub fn achievement(id: &str) -> Option<&'static Achievement> {
    all_achievements().iter().find(|a| a.id == id)
}

pub fn theme(id: &str) -> Option<&'static Theme> {
    all_themes().iter().find(|t| t.id == id)
}
