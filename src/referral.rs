//! Referral links and the signup bonus rule.
//!
//! The bonus itself is applied inside the ledger's user-creation path so it
//! can never be re-triggered for an existing user; this module owns the
//! constant and the link format.

/// Credits granted to a referrer when a new user names them at first contact.
pub const REFERRAL_BONUS: i64 = 2;

/// Build the deep link a user shares to refer others.
///
/// Pure and deterministic: the referred user's `/start` payload carries the
/// referrer's id back to the bot.
pub fn referral_link(bot_username: &str, user_id: i64) -> String {
    format!("https://t.me/{}?start={}", bot_username, user_id)
}
