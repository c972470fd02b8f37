//! Chat gateway seam: inbound intents and the outbound message channel.
//!
//! The transport itself (webhook parsing, Bot API calls) lives in
//! [`crate::telegram`]; the rest of the crate only sees [`Intent`] coming in
//! and [`Outbox`] going out.

use async_trait::async_trait;

/// An inline button attached to an outbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub label: String,
    /// Callback payload delivered back when the button is pressed.
    pub data: String,
}

impl Button {
    pub fn new(label: &str, data: &str) -> Self {
        Self {
            label: label.to_string(),
            data: data.to_string(),
        }
    }
}

/// Outbound side of the chat transport.
#[async_trait]
pub trait Outbox: Send + Sync {
    /// Send a message to a user, optionally with inline buttons.
    async fn send_to_user(&self, user_id: i64, text: &str, buttons: &[Button])
        -> anyhow::Result<()>;

    /// Send a message to the admin channel.
    async fn send_to_admin(&self, text: &str) -> anyhow::Result<()>;
}

/// A chat event translated into what the caller wants done.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    Start { user_id: i64, referrer: Option<i64> },
    ViewBalance { user_id: i64 },
    ViewTasks { user_id: i64 },
    MarkDone { user_id: i64, task_id: i64 },
    AdminCreateTaskBegin { admin_id: i64 },
    AdminCreateTaskPayload { admin_id: i64, raw: String },
    AdminApprove { admin_id: i64, user_id: i64, task_id: i64 },
    ViewReferral { user_id: i64 },
    ViewWithdrawPrompt { user_id: i64 },
    WithdrawPayload { user_id: i64, raw: String },
}

impl Intent {
    /// Chat id of the actor who triggered the intent (the reply target).
    pub fn actor(&self) -> i64 {
        match self {
            Self::Start { user_id, .. }
            | Self::ViewBalance { user_id }
            | Self::ViewTasks { user_id }
            | Self::MarkDone { user_id, .. }
            | Self::ViewReferral { user_id }
            | Self::ViewWithdrawPrompt { user_id }
            | Self::WithdrawPayload { user_id, .. } => *user_id,
            Self::AdminCreateTaskBegin { admin_id }
            | Self::AdminCreateTaskPayload { admin_id, .. }
            | Self::AdminApprove { admin_id, .. } => *admin_id,
        }
    }
}
