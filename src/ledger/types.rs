//! Core ledger records.

use serde::{Deserialize, Serialize};

/// A chat user known to the ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// External chat identity.
    pub id: i64,
    /// Credit balance; only ever increased, never below zero.
    pub balance: i64,
    /// Referrer recorded at first contact, never changed afterwards.
    pub referrer: Option<i64>,
    pub created_at: String,
}

/// An advertised task users can complete for a reward.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub link: String,
    /// Credits paid out on approval; fixed at creation.
    pub reward: i64,
    pub created_at: String,
}

/// Validated fields for a task about to be created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDraft {
    pub title: String,
    pub description: String,
    pub link: String,
    pub reward: i64,
}

/// Review state of a (user, task) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionState {
    /// The user has not marked the task as done.
    NotSubmitted,
    /// Submitted and awaiting the admin's decision.
    Submitted,
    /// Approved; the reward has been credited.
    Approved,
}

/// Outcome of an approval attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalOutcome {
    /// The submission was approved and the reward credited.
    Credited { reward: i64 },
    /// The pair was already approved; nothing was credited.
    AlreadyApproved,
}
