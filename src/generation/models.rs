//! Chat messages and generation requests

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Author of a chat message
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// One turn of a conversation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// Everything the model sees for one answer
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    /// Persona instructions
    pub system_prompt: String,

    /// Earlier turns kept in conversation memory, oldest first
    pub history: Vec<ChatMessage>,

    /// The user's question
    pub prompt: String,

    /// Retrieved passages, best first
    pub context: Vec<String>,

    pub temperature: f32,
    pub max_tokens: u32,
}

impl GenerationRequest {
    /// System message: persona followed by the retrieved context block
    pub fn system_message(&self) -> String {
        if self.context.is_empty() {
            return self.system_prompt.clone();
        }

        let mut message = String::with_capacity(
            self.system_prompt.len() + self.context.iter().map(|c| c.len() + 2).sum::<usize>() + 128,
        );
        message.push_str(&self.system_prompt);
        message.push_str("\n\nContext information is below.\n---------------------\n");
        message.push_str(&self.context.join("\n\n"));
        message.push_str(
            "\n---------------------\nUse the context above together with the conversation to answer the user.",
        );
        message
    }
}
