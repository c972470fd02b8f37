//! Task catalog: admin task creation and per-user open-task listing.

use crate::error::LedgerError;
use crate::ledger::{SharedLedger, Task, TaskDraft};

/// Number of pipe-separated fields in the admin payload.
const DRAFT_FIELDS: usize = 4;

/// Parse the admin payload `Title | Description | Link | Reward`.
///
/// Whitespace around fields is trimmed. The whole line is rejected when the
/// field count is wrong, any field is empty, or the reward is not a positive
/// integer literal; nothing is stored on failure.
pub fn parse_draft(raw: &str) -> Result<TaskDraft, LedgerError> {
    let fields: Vec<&str> = raw.split('|').map(str::trim).collect();
    if fields.len() != DRAFT_FIELDS {
        return Err(LedgerError::FormatError(format!(
            "expected {} '|'-separated fields, got {}",
            DRAFT_FIELDS,
            fields.len()
        )));
    }
    if fields.iter().any(|f| f.is_empty()) {
        return Err(LedgerError::FormatError("empty field".to_string()));
    }
    let reward: i64 = fields[3]
        .parse()
        .map_err(|_| LedgerError::FormatError(format!("reward is not an integer: {:?}", fields[3])))?;
    if reward <= 0 {
        return Err(LedgerError::FormatError(format!(
            "reward must be positive, got {}",
            reward
        )));
    }
    Ok(TaskDraft {
        title: fields[0].to_string(),
        description: fields[1].to_string(),
        link: fields[2].to_string(),
        reward,
    })
}

/// Catalog of advertised tasks.
pub struct Catalog {
    ledger: SharedLedger,
}

impl Catalog {
    pub fn new(ledger: SharedLedger) -> Self {
        Self { ledger }
    }

    /// Validate and store a new task from the raw admin payload.
    ///
    /// All-or-nothing: a malformed payload leaves the catalog unchanged.
    pub async fn create_task(&self, raw: &str) -> Result<Task, LedgerError> {
        let draft = parse_draft(raw)?;
        let task = self.ledger.create_task(&draft).await?;
        tracing::info!(task_id = task.id, reward = task.reward, "task created");
        Ok(task)
    }

    /// All tasks the user has not yet submitted, in creation order.
    pub async fn open_tasks(&self, user_id: i64) -> Result<Vec<Task>, LedgerError> {
        self.ledger.open_tasks(user_id).await
    }
}
