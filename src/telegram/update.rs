//! Inbound update wire format (the subset the bot consumes).

use serde::Deserialize;

/// One webhook update from the Bot API.
#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    #[serde(default)]
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<Message>,
    #[serde(default)]
    pub callback_query: Option<CallbackQuery>,
}

/// A chat message.
#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    #[serde(default)]
    pub from: Option<TgUser>,
    #[serde(default)]
    pub text: Option<String>,
}

/// The sender of a message or callback.
#[derive(Debug, Clone, Deserialize)]
pub struct TgUser {
    pub id: i64,
}

/// An inline-button press.
#[derive(Debug, Clone, Deserialize)]
pub struct CallbackQuery {
    pub from: TgUser,
    #[serde(default)]
    pub data: Option<String>,
}

/// A raw chat event, before conversation state is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatEvent {
    /// A `/command` with whitespace-separated arguments.
    Command {
        user_id: i64,
        name: String,
        args: Vec<String>,
    },
    /// An inline-button press.
    Callback { user_id: i64, data: String },
    /// Plain message text.
    Text { user_id: i64, text: String },
}

impl ChatEvent {
    /// Extract the event carried by an update, if any.
    ///
    /// Updates without a sender or without text/callback data (joins, media,
    /// edits) carry nothing for this bot and yield `None`.
    pub fn from_update(update: &Update) -> Option<ChatEvent> {
        if let Some(cb) = &update.callback_query {
            let data = cb.data.clone()?;
            return Some(ChatEvent::Callback {
                user_id: cb.from.id,
                data,
            });
        }

        let msg = update.message.as_ref()?;
        let user_id = msg.from.as_ref()?.id;
        let text = msg.text.as_deref()?.trim();
        if text.is_empty() {
            return None;
        }

        if let Some(rest) = text.strip_prefix('/') {
            let mut parts = rest.split_whitespace();
            let name = parts.next()?;
            // Group chats deliver commands as `/cmd@botname`.
            let name = name.split('@').next().unwrap_or(name).to_string();
            let args = parts.map(str::to_string).collect();
            return Some(ChatEvent::Command {
                user_id,
                name,
                args,
            });
        }

        Some(ChatEvent::Text {
            user_id,
            text: text.to_string(),
        })
    }
}
