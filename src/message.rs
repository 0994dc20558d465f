use serde::{Deserialize, Serialize};

// Who wrote a history entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageType {
    Player,
    Game,
}

// One role-tagged entry of a session's turn history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub content: String,
    pub message_type: MessageType,
}

impl Message {
    pub fn new(message_type: MessageType, content: impl Into<String>) -> Self {
        Message {
            content: content.into(),
            message_type,
        }
    }

    pub fn player(content: impl Into<String>) -> Self {
        Self::new(MessageType::Player, content)
    }

    pub fn game(content: impl Into<String>) -> Self {
        Self::new(MessageType::Game, content)
    }
}

// Chat roles understood by the text generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptMessage {
    pub role: PromptRole,
    pub content: String,
}

impl PromptMessage {
    pub fn system(content: impl Into<String>) -> Self {
        PromptMessage {
            role: PromptRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        PromptMessage {
            role: PromptRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        PromptMessage {
            role: PromptRole::Assistant,
            content: content.into(),
        }
    }
}

impl From<&Message> for PromptMessage {
    fn from(message: &Message) -> Self {
        match message.message_type {
            MessageType::Player => PromptMessage::user(message.content.clone()),
            MessageType::Game => PromptMessage::assistant(message.content.clone()),
        }
    }
}
