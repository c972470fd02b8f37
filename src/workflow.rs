//! Submission workflow: the submit → notify → approve → credit state machine.
//!
//! States per (user, task) pair: `NotSubmitted → Submitted → Approved`.
//! Submission is idempotent at the store level. Approval flips the pair to
//! `Approved` and credits the task's stored reward in one transaction, so a
//! pair can never be paid twice — repeated approvals are detected no-ops.

use std::sync::Arc;

use crate::error::LedgerError;
use crate::gateway::Outbox;
use crate::ledger::{ApprovalOutcome, SharedLedger};

/// What a submit call did, used by the gateway to word the acknowledgement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// A new submission was recorded and the admin notified.
    Recorded,
    /// The pair was already submitted; nothing changed.
    Duplicate,
}

/// Drives submissions from "done" to payout.
pub struct SubmissionWorkflow {
    ledger: SharedLedger,
    outbox: Arc<dyn Outbox>,
    admin_id: i64,
}

impl SubmissionWorkflow {
    pub fn new(ledger: SharedLedger, outbox: Arc<dyn Outbox>, admin_id: i64) -> Self {
        Self {
            ledger,
            outbox,
            admin_id,
        }
    }

    /// Record the user's claim and notify the admin.
    ///
    /// Idempotent: a pair that is already submitted (or approved) is left
    /// untouched and the duplicate admin notification is suppressed, so
    /// transport redeliveries cannot produce a second submission.
    pub async fn submit(&self, user_id: i64, task_id: i64) -> Result<SubmitOutcome, LedgerError> {
        let task = self.ledger.get_task(task_id).await?;

        if !self.ledger.record_submission(user_id, task_id).await? {
            tracing::debug!(user_id, task_id, "duplicate submission ignored");
            return Ok(SubmitOutcome::Duplicate);
        }

        let notice = format!(
            "🆕 Task Submission\n\n👤 User: {}\n📌 Task: {}\n💰 Reward: {}\n\n/approve {} {}",
            user_id, task.title, task.reward, user_id, task_id
        );
        if let Err(e) = self.outbox.send_to_admin(&notice).await {
            tracing::warn!(user_id, task_id, error = %e, "failed to notify admin");
        }

        tracing::info!(user_id, task_id, "submission recorded");
        Ok(SubmitOutcome::Recorded)
    }

    /// Approve `(user, task)` and credit the task's reward.
    ///
    /// `requested_by` must be the configured admin. The gateway already
    /// routes admin commands, but the check is repeated here so the workflow
    /// is safe on its own.
    pub async fn approve(
        &self,
        user_id: i64,
        task_id: i64,
        requested_by: i64,
    ) -> Result<ApprovalOutcome, LedgerError> {
        if requested_by != self.admin_id {
            tracing::warn!(requested_by, "approve rejected: not the admin");
            return Err(LedgerError::Unauthorized);
        }

        let outcome = self.ledger.approve_submission(user_id, task_id).await?;
        match outcome {
            ApprovalOutcome::Credited { reward } => {
                tracing::info!(user_id, task_id, reward, "submission approved");
            }
            ApprovalOutcome::AlreadyApproved => {
                tracing::warn!(user_id, task_id, "re-approval ignored");
            }
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::testing::RecordingOutbox;
    use crate::ledger::{LedgerStore, TaskDraft};

    const ADMIN: i64 = 99;

    fn harness() -> (SubmissionWorkflow, SharedLedger, Arc<RecordingOutbox>) {
        let ledger: SharedLedger = Arc::new(LedgerStore::open_in_memory().unwrap());
        let outbox = Arc::new(RecordingOutbox::default());
        let workflow =
            SubmissionWorkflow::new(Arc::clone(&ledger), outbox.clone() as Arc<dyn Outbox>, ADMIN);
        (workflow, ledger, outbox)
    }

    async fn seed_task(ledger: &SharedLedger, reward: i64) -> i64 {
        ledger
            .create_task(&TaskDraft {
                title: "Join Channel".to_string(),
                description: "Join & stay 1 min".to_string(),
                link: "https://t.me/test".to_string(),
                reward,
            })
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn test_submit_notifies_admin_with_approval_hint() {
        let (workflow, ledger, outbox) = harness();
        ledger.get_or_create_user(7, None).await.unwrap();
        let task_id = seed_task(&ledger, 5).await;

        let outcome = workflow.submit(7, task_id).await.unwrap();
        assert_eq!(outcome, SubmitOutcome::Recorded);

        let admin = outbox.admin_messages.lock().unwrap();
        assert_eq!(admin.len(), 1);
        assert!(admin[0].contains("User: 7"));
        assert!(admin[0].contains("Join Channel"));
        assert!(admin[0].contains("Reward: 5"));
        assert!(admin[0].contains(&format!("/approve 7 {}", task_id)));
    }

    #[tokio::test]
    async fn test_double_submit_is_single_submission() {
        let (workflow, ledger, outbox) = harness();
        ledger.get_or_create_user(7, None).await.unwrap();
        let task_id = seed_task(&ledger, 5).await;

        assert_eq!(
            workflow.submit(7, task_id).await.unwrap(),
            SubmitOutcome::Recorded
        );
        assert_eq!(
            workflow.submit(7, task_id).await.unwrap(),
            SubmitOutcome::Duplicate
        );

        // One submission row, one admin notification.
        assert_eq!(outbox.admin_messages.lock().unwrap().len(), 1);
        assert_eq!(ledger.open_tasks(7).await.unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_submit_unknown_task() {
        let (workflow, _ledger, outbox) = harness();

        assert!(matches!(
            workflow.submit(7, 404).await,
            Err(LedgerError::NotFound(_))
        ));
        assert!(outbox.admin_messages.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_approve_credits_then_noop() {
        let (workflow, ledger, _outbox) = harness();
        ledger.get_or_create_user(7, None).await.unwrap();
        let task_id = seed_task(&ledger, 5).await;
        workflow.submit(7, task_id).await.unwrap();

        let outcome = workflow.approve(7, task_id, ADMIN).await.unwrap();
        assert_eq!(outcome, ApprovalOutcome::Credited { reward: 5 });
        assert_eq!(ledger.balance(7).await.unwrap(), 5);

        let outcome = workflow.approve(7, task_id, ADMIN).await.unwrap();
        assert_eq!(outcome, ApprovalOutcome::AlreadyApproved);
        assert_eq!(ledger.balance(7).await.unwrap(), 5);
    }

    #[tokio::test]
    async fn test_approve_rejects_non_admin() {
        let (workflow, ledger, _outbox) = harness();
        ledger.get_or_create_user(7, None).await.unwrap();
        let task_id = seed_task(&ledger, 5).await;
        workflow.submit(7, task_id).await.unwrap();

        assert!(matches!(
            workflow.approve(7, task_id, 7).await,
            Err(LedgerError::Unauthorized)
        ));
        assert_eq!(ledger.balance(7).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_approve_requires_prior_submission() {
        let (workflow, ledger, _outbox) = harness();
        ledger.get_or_create_user(7, None).await.unwrap();
        let task_id = seed_task(&ledger, 5).await;

        assert!(matches!(
            workflow.approve(7, task_id, ADMIN).await,
            Err(LedgerError::NotFound(_))
        ));
        assert_eq!(ledger.balance(7).await.unwrap(), 0);
    }
}
