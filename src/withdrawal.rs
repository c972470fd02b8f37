//! Withdrawal intake: forwards payout requests to the admin untouched.
//!
//! No parsing, no balance deduction, no stored state — the request is only
//! ever logged and relayed for manual processing.

use std::sync::Arc;

use crate::gateway::Outbox;

/// Separator a message must contain to count as a withdrawal request.
const SEPARATOR: char = '|';

/// Relays payout requests to the admin channel.
pub struct WithdrawalIntake {
    outbox: Arc<dyn Outbox>,
}

impl WithdrawalIntake {
    pub fn new(outbox: Arc<dyn Outbox>) -> Self {
        Self { outbox }
    }

    /// Forward a payout request to the admin channel verbatim.
    ///
    /// Text without the separator is not a withdrawal request and is ignored
    /// without error. Returns whether the text was forwarded.
    pub async fn request(&self, user_id: i64, raw: &str) -> bool {
        if !raw.contains(SEPARATOR) {
            return false;
        }

        let notice = format!("💸 Withdraw Request\n\n👤 User: {}\n{}", user_id, raw);
        if let Err(e) = self.outbox.send_to_admin(&notice).await {
            tracing::warn!(user_id, error = %e, "failed to forward withdraw request");
        }
        tracing::info!(user_id, "withdraw request forwarded");
        true
    }
}
