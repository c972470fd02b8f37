//! Durable ledger: users, balances, tasks, and submission state.
//!
//! The store is injected where it is needed (no process-wide singleton) and
//! owns its own synchronization; see [`LedgerStore`].

mod store;
mod types;

pub use store::{LedgerStore, SharedLedger};
pub use types::{ApprovalOutcome, SubmissionState, Task, TaskDraft, User};
