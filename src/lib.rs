//! # earnbot
//!
//! A task-for-reward chat bot: users complete advertised tasks, submit by
//! tapping "done", an administrator approves, and credit balances accrue.
//! Referrals pay a fixed signup bonus to the referrer.
//!
//! ## Architecture
//!
//! ```text
//!   webhook (axum)                Bot API (reqwest)
//!        │                              ▲
//!        ▼                              │
//!   telegram::Update ──► Dispatcher ──► Outbox
//!                            │
//!           ┌────────────────┼─────────────────┐
//!           ▼                ▼                 ▼
//!       Catalog     SubmissionWorkflow   WithdrawalIntake
//!           └────────────────┼─────────────────┘
//!                            ▼
//!                    LedgerStore (SQLite)
//! ```
//!
//! ## Modules
//! - `ledger`: durable store for users, balances, tasks, and submission state
//! - `catalog`: admin task creation and per-user open-task listing
//! - `workflow`: the submit → notify → approve → credit state machine
//! - `referral`: referral links and the signup bonus rule
//! - `withdrawal`: payout request forwarding
//! - `gateway` / `telegram`: transport seam and the Telegram adapter
//! - `dispatch` / `server`: intent routing and the webhook server

pub mod catalog;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod gateway;
pub mod ledger;
pub mod referral;
pub mod server;
pub mod telegram;
pub mod withdrawal;
pub mod workflow;

pub use config::Config;
pub use error::LedgerError;
