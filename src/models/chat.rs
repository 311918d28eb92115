use serde::{ Serialize, Deserialize };
use uuid::Uuid;

use crate::config::prompt::{ find_preset, UnknownPreset };

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    User,
    Bot,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub speaker: Speaker,
    pub text: String,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self { speaker: Speaker::User, text: text.into() }
    }

    pub fn bot(text: impl Into<String>) -> Self {
        Self { speaker: Speaker::Bot, text: text.into() }
    }
}

/// Conversation history for one connected client. Append-only and dropped
/// with the connection.
#[derive(Clone, Debug)]
pub struct Session {
    id: String,
    turns: Vec<Turn>,
    pending_question: Option<String>,
}

impl Session {
    pub fn new(greeting: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            turns: vec![Turn::bot(greeting)],
            pending_question: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn append(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    pub fn all(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn pending_question(&self) -> Option<&str> {
        self.pending_question.as_deref()
    }

    /// Queues a sidebar question for the next input cycle.
    pub fn select_preset(&mut self, preset_id: &str) -> Result<(), UnknownPreset> {
        let preset = find_preset(preset_id)?;
        self.pending_question = Some(preset.question.to_string());
        Ok(())
    }

    /// Resolves the question for this cycle: typed text wins over a queued
    /// preset. The queued preset is cleared either way.
    pub fn take_input(&mut self, typed: Option<&str>) -> Option<String> {
        let pending = self.pending_question.take();
        match typed {
            Some(text) if !text.trim().is_empty() => Some(text.to_string()),
            _ => pending,
        }
    }
}
