//! Prompt construction shared by generation providers

use crate::catalog::{Mood, Persona};
use crate::store::state::{ChatMessage, Sender};
use std::fmt::Write as _;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Speaker {
    User,
    Model,
}

/// One provider-neutral conversation turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub speaker: Speaker,
    pub text: String,
    pub image_urls: Vec<String>,
}

/// Persona instruction, extended with the mood picked at check-in
pub fn system_instruction(persona: &Persona, mood: Option<&Mood>) -> String {
    let mut instruction = persona.system_instruction.to_string();
    if let Some(mood) = mood {
        let _ = write!(
            instruction,
            "\n\nAt the start of this conversation the user said they feel {} {}. \
             Keep that in mind without dwelling on it.",
            mood.name.to_lowercase(),
            mood.icon
        );
    }
    instruction
}

/// Chat history as alternating turns
///
/// Streaming placeholders and empty messages are skipped. Consecutive
/// messages from the same side are merged, since a retried message can
/// follow another user message directly.
pub fn conversation(history: &[ChatMessage]) -> Vec<Turn> {
    let mut turns: Vec<Turn> = Vec::new();
    for message in history {
        if message.is_streaming || (message.text.trim().is_empty() && message.image_url.is_none())
        {
            continue;
        }
        let speaker = match message.sender {
            Sender::User => Speaker::User,
            Sender::Ai => Speaker::Model,
        };

        match turns.last_mut() {
            Some(last) if last.speaker == speaker => {
                if !message.text.is_empty() {
                    if !last.text.is_empty() {
                        last.text.push_str("\n\n");
                    }
                    last.text.push_str(&message.text);
                }
                last.image_urls.extend(message.image_url.clone());
            }
            _ => turns.push(Turn {
                speaker,
                text: message.text.clone(),
                image_urls: message.image_url.clone().into_iter().collect(),
            }),
        }
    }
    turns
}

pub fn welcome_prompt(persona: &Persona, mood: &Mood) -> String {
    format!(
        "You are {name}. The user just opened a chat with you and said they feel {mood} {icon}. \
         Write a warm opening message of one or two short sentences that acknowledges \
         this feeling and invites them to share more. Reply with the message only.",
        name = persona.name,
        mood = mood.name.to_lowercase(),
        icon = mood.icon,
    )
}

pub fn summary_prompt(persona_name: &str, history: &[ChatMessage]) -> String {
    let mut prompt = format!(
        "Summarize the following conversation between the user and {persona_name} \
         in one or two gentle sentences, written to the user in the second person. \
         Reply with the summary only.\n\n"
    );
    for message in history {
        let speaker = match message.sender {
            Sender::User => "User",
            Sender::Ai => persona_name,
        };
        let text = if message.text.is_empty() && message.image_url.is_some() {
            "[shared an image]"
        } else {
            message.text.as_str()
        };
        let _ = writeln!(prompt, "{speaker}: {text}");
    }
    prompt
}

pub const DAILY_CHALLENGE_PROMPT: &str = "Suggest one small, kind self-care challenge \
    a person can finish today in under ten minutes, such as a short walk, writing down \
    three things they are grateful for, or drinking a glass of water slowly. \
    Reply with a single sentence and nothing else.";
