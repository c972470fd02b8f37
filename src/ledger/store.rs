//! SQLite-backed ledger store.
//!
//! A single connection guarded by an async mutex: every read and write
//! serializes through it, which is what makes approval's check-then-credit
//! atomic per (user, task) pair.

use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use tokio::sync::Mutex;

use crate::error::LedgerError;
use crate::referral::REFERRAL_BONUS;

use super::types::{ApprovalOutcome, SubmissionState, Task, TaskDraft, User};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS users (
    user_id    INTEGER PRIMARY KEY,
    balance    INTEGER NOT NULL DEFAULT 0 CHECK (balance >= 0),
    referrer   INTEGER,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS tasks (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    title       TEXT NOT NULL,
    description TEXT NOT NULL,
    link        TEXT NOT NULL,
    reward      INTEGER NOT NULL CHECK (reward > 0),
    created_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS submissions (
    user_id    INTEGER NOT NULL,
    task_id    INTEGER NOT NULL,
    approved   INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    PRIMARY KEY (user_id, task_id)
);
";

/// Durable store for users, tasks, and submission state.
pub struct LedgerStore {
    conn: Mutex<Connection>,
}

/// Shared ledger handle.
pub type SharedLedger = Arc<LedgerStore>;

impl LedgerStore {
    /// Open (or create) the database at `path`.
    pub fn open(path: &Path) -> Result<Self, LedgerError> {
        Self::init(Connection::open(path)?)
    }

    /// Open a fresh in-memory database.
    pub fn open_in_memory() -> Result<Self, LedgerError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, LedgerError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    // ─────────────────────────────────────────────────────────────────────
    // Users
    // ─────────────────────────────────────────────────────────────────────

    /// Fetch the user, creating them on first contact.
    ///
    /// Idempotent: for an existing user the `referrer` argument is ignored.
    /// Creating a new user with a referrer credits [`REFERRAL_BONUS`] to the
    /// referrer, but only if the referrer row exists; unknown referrers are
    /// skipped without error.
    pub async fn get_or_create_user(
        &self,
        id: i64,
        referrer: Option<i64>,
    ) -> Result<User, LedgerError> {
        let mut conn = self.conn.lock().await;
        if let Some(user) = Self::fetch_user(&conn, id)? {
            return Ok(user);
        }

        // Resolved before the insert: a user naming themselves would
        // otherwise match the row created below.
        let bonus_to = match referrer {
            Some(rid) if Self::fetch_user(&conn, rid)?.is_some() => Some(rid),
            _ => None,
        };

        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO users (user_id, balance, referrer, created_at) VALUES (?1, 0, ?2, ?3)",
            params![id, referrer, Utc::now().to_rfc3339()],
        )?;
        if let Some(rid) = bonus_to {
            tx.execute(
                "UPDATE users SET balance = balance + ?1 WHERE user_id = ?2",
                params![REFERRAL_BONUS, rid],
            )?;
            tracing::info!(
                new_user = id,
                referrer = rid,
                bonus = REFERRAL_BONUS,
                "referral bonus credited"
            );
        }
        tx.commit()?;

        tracing::info!(user_id = id, "user created");
        Self::fetch_user(&conn, id)?
            .ok_or_else(|| LedgerError::NotFound(format!("user {}", id)))
    }

    /// Increase a user's balance.
    pub async fn credit_user(&self, id: i64, amount: i64) -> Result<(), LedgerError> {
        let conn = self.conn.lock().await;
        let changed = conn.execute(
            "UPDATE users SET balance = balance + ?1 WHERE user_id = ?2",
            params![amount, id],
        )?;
        if changed == 0 {
            return Err(LedgerError::NotFound(format!("user {}", id)));
        }
        Ok(())
    }

    /// Current balance of a user.
    pub async fn balance(&self, id: i64) -> Result<i64, LedgerError> {
        let conn = self.conn.lock().await;
        conn.query_row(
            "SELECT balance FROM users WHERE user_id = ?1",
            params![id],
            |row| row.get(0),
        )
        .optional()?
        .ok_or_else(|| LedgerError::NotFound(format!("user {}", id)))
    }

    // ─────────────────────────────────────────────────────────────────────
    // Tasks
    // ─────────────────────────────────────────────────────────────────────

    /// Store a new task from validated fields.
    pub async fn create_task(&self, draft: &TaskDraft) -> Result<Task, LedgerError> {
        let conn = self.conn.lock().await;
        let created_at = Utc::now().to_rfc3339();
        conn.execute(
            "INSERT INTO tasks (title, description, link, reward, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                draft.title,
                draft.description,
                draft.link,
                draft.reward,
                created_at
            ],
        )?;
        Ok(Task {
            id: conn.last_insert_rowid(),
            title: draft.title.clone(),
            description: draft.description.clone(),
            link: draft.link.clone(),
            reward: draft.reward,
            created_at,
        })
    }

    /// Fetch a task by id.
    pub async fn get_task(&self, id: i64) -> Result<Task, LedgerError> {
        let conn = self.conn.lock().await;
        conn.query_row(
            "SELECT id, title, description, link, reward, created_at FROM tasks WHERE id = ?1",
            params![id],
            Self::row_to_task,
        )
        .optional()?
        .ok_or_else(|| LedgerError::NotFound(format!("task {}", id)))
    }

    /// Number of tasks in the catalog.
    pub async fn task_count(&self) -> Result<i64, LedgerError> {
        let conn = self.conn.lock().await;
        Ok(conn.query_row("SELECT COUNT(*) FROM tasks", [], |row| row.get(0))?)
    }

    /// All tasks the user has not submitted, in creation order.
    ///
    /// Produced fresh on every call; never cached.
    pub async fn open_tasks(&self, user_id: i64) -> Result<Vec<Task>, LedgerError> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "SELECT t.id, t.title, t.description, t.link, t.reward, t.created_at
             FROM tasks t
             WHERE NOT EXISTS (
                 SELECT 1 FROM submissions s
                 WHERE s.user_id = ?1 AND s.task_id = t.id
             )
             ORDER BY t.id",
        )?;
        let tasks = stmt
            .query_map(params![user_id], Self::row_to_task)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(tasks)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Submissions
    // ─────────────────────────────────────────────────────────────────────

    /// Record that the user marked the task as done.
    ///
    /// Returns `true` if a new submission was recorded, `false` if the pair
    /// already had one. At most one row per pair regardless of call count.
    pub async fn record_submission(&self, user_id: i64, task_id: i64) -> Result<bool, LedgerError> {
        let conn = self.conn.lock().await;
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO submissions (user_id, task_id, approved, created_at)
             VALUES (?1, ?2, 0, ?3)",
            params![user_id, task_id, Utc::now().to_rfc3339()],
        )?;
        Ok(inserted == 1)
    }

    /// Review state of a (user, task) pair.
    pub async fn submission_state(
        &self,
        user_id: i64,
        task_id: i64,
    ) -> Result<SubmissionState, LedgerError> {
        let conn = self.conn.lock().await;
        Self::fetch_submission_state(&conn, user_id, task_id)
    }

    /// Approve a submission and credit the task's stored reward.
    ///
    /// Only an existing, not-yet-approved submission transitions; the flip
    /// and the credit happen in one transaction, so a pair can never be paid
    /// twice and a failed credit leaves the pair `Submitted`.
    pub async fn approve_submission(
        &self,
        user_id: i64,
        task_id: i64,
    ) -> Result<ApprovalOutcome, LedgerError> {
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction()?;

        let reward: i64 = tx
            .query_row(
                "SELECT reward FROM tasks WHERE id = ?1",
                params![task_id],
                |row| row.get(0),
            )
            .optional()?
            .ok_or_else(|| LedgerError::NotFound(format!("task {}", task_id)))?;

        let flipped = tx.execute(
            "UPDATE submissions SET approved = 1
             WHERE user_id = ?1 AND task_id = ?2 AND approved = 0",
            params![user_id, task_id],
        )?;
        if flipped == 0 {
            return match Self::fetch_submission_state(&tx, user_id, task_id)? {
                SubmissionState::NotSubmitted => Err(LedgerError::NotFound(format!(
                    "no submission for user {} on task {}",
                    user_id, task_id
                ))),
                _ => Ok(ApprovalOutcome::AlreadyApproved),
            };
        }

        let credited = tx.execute(
            "UPDATE users SET balance = balance + ?1 WHERE user_id = ?2",
            params![reward, user_id],
        )?;
        if credited == 0 {
            // Dropping the transaction rolls the flip back; the pair stays
            // `Submitted` and can be approved once the user exists.
            return Err(LedgerError::NotFound(format!("user {}", user_id)));
        }

        tx.commit()?;
        Ok(ApprovalOutcome::Credited { reward })
    }

    // ─────────────────────────────────────────────────────────────────────
    // Row mapping
    // ─────────────────────────────────────────────────────────────────────

    fn fetch_user(conn: &Connection, id: i64) -> Result<Option<User>, LedgerError> {
        Ok(conn
            .query_row(
                "SELECT user_id, balance, referrer, created_at FROM users WHERE user_id = ?1",
                params![id],
                |row| {
                    Ok(User {
                        id: row.get(0)?,
                        balance: row.get(1)?,
                        referrer: row.get(2)?,
                        created_at: row.get(3)?,
                    })
                },
            )
            .optional()?)
    }

    fn fetch_submission_state(
        conn: &Connection,
        user_id: i64,
        task_id: i64,
    ) -> Result<SubmissionState, LedgerError> {
        let approved: Option<i64> = conn
            .query_row(
                "SELECT approved FROM submissions WHERE user_id = ?1 AND task_id = ?2",
                params![user_id, task_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(match approved {
            None => SubmissionState::NotSubmitted,
            Some(0) => SubmissionState::Submitted,
            Some(_) => SubmissionState::Approved,
        })
    }

    fn row_to_task(row: &rusqlite::Row<'_>) -> rusqlite::Result<Task> {
        Ok(Task {
            id: row.get(0)?,
            title: row.get(1)?,
            description: row.get(2)?,
            link: row.get(3)?,
            reward: row.get(4)?,
            created_at: row.get(5)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(title: &str, reward: i64) -> TaskDraft {
        TaskDraft {
            title: title.to_string(),
            description: "do the thing".to_string(),
            link: "https://t.me/test".to_string(),
            reward,
        }
    }

    #[tokio::test]
    async fn test_get_or_create_user_idempotent() {
        let store = LedgerStore::open_in_memory().unwrap();

        let created = store.get_or_create_user(1, None).await.unwrap();
        assert_eq!(created.balance, 0);
        assert_eq!(created.referrer, None);

        // Second call with a referrer must not change anything.
        let again = store.get_or_create_user(1, Some(99)).await.unwrap();
        assert_eq!(again.referrer, None);
        assert_eq!(store.balance(1).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_referral_bonus_credited_once() {
        let store = LedgerStore::open_in_memory().unwrap();

        store.get_or_create_user(1, None).await.unwrap();
        assert_eq!(store.balance(1).await.unwrap(), 0);

        store.get_or_create_user(2, Some(1)).await.unwrap();
        assert_eq!(store.balance(1).await.unwrap(), REFERRAL_BONUS);
        assert_eq!(store.balance(2).await.unwrap(), 0);

        // Re-running the referred user's first contact must not re-credit.
        store.get_or_create_user(2, Some(1)).await.unwrap();
        store.get_or_create_user(2, Some(1)).await.unwrap();
        assert_eq!(store.balance(1).await.unwrap(), REFERRAL_BONUS);
    }

    #[tokio::test]
    async fn test_unknown_referrer_silently_skipped() {
        let store = LedgerStore::open_in_memory().unwrap();

        let user = store.get_or_create_user(5, Some(404)).await.unwrap();
        assert_eq!(user.referrer, Some(404));
        assert_eq!(store.balance(5).await.unwrap(), 0);
        assert!(store.balance(404).await.is_err());
    }

    #[tokio::test]
    async fn test_self_referral_not_credited() {
        let store = LedgerStore::open_in_memory().unwrap();

        store.get_or_create_user(9, Some(9)).await.unwrap();
        assert_eq!(store.balance(9).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_credit_unknown_user() {
        let store = LedgerStore::open_in_memory().unwrap();
        assert!(matches!(
            store.credit_user(123, 5).await,
            Err(LedgerError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_create_and_get_task() {
        let store = LedgerStore::open_in_memory().unwrap();

        let task = store.create_task(&draft("Join Channel", 5)).await.unwrap();
        assert_eq!(task.reward, 5);

        let fetched = store.get_task(task.id).await.unwrap();
        assert_eq!(fetched.title, "Join Channel");
        assert!(matches!(
            store.get_task(999).await,
            Err(LedgerError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_task_ids_monotonic() {
        let store = LedgerStore::open_in_memory().unwrap();

        let first = store.create_task(&draft("a", 1)).await.unwrap();
        let second = store.create_task(&draft("b", 1)).await.unwrap();
        assert!(second.id > first.id);
    }

    #[tokio::test]
    async fn test_open_tasks_excludes_submitted() {
        let store = LedgerStore::open_in_memory().unwrap();
        store.get_or_create_user(1, None).await.unwrap();

        let t1 = store.create_task(&draft("one", 1)).await.unwrap();
        let t2 = store.create_task(&draft("two", 2)).await.unwrap();

        let open = store.open_tasks(1).await.unwrap();
        assert_eq!(open.len(), 2);
        assert_eq!(open[0].id, t1.id); // insertion order

        assert!(store.record_submission(1, t1.id).await.unwrap());
        let open = store.open_tasks(1).await.unwrap();
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].id, t2.id);

        // Other users still see both.
        assert_eq!(store.open_tasks(2).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_record_submission_idempotent() {
        let store = LedgerStore::open_in_memory().unwrap();
        let task = store.create_task(&draft("once", 3)).await.unwrap();

        assert!(store.record_submission(1, task.id).await.unwrap());
        assert!(!store.record_submission(1, task.id).await.unwrap());
        assert_eq!(
            store.submission_state(1, task.id).await.unwrap(),
            SubmissionState::Submitted
        );
    }

    #[tokio::test]
    async fn test_approve_credits_reward_once() {
        let store = LedgerStore::open_in_memory().unwrap();
        store.get_or_create_user(1, None).await.unwrap();
        let task = store.create_task(&draft("pay me", 5)).await.unwrap();
        store.record_submission(1, task.id).await.unwrap();

        let outcome = store.approve_submission(1, task.id).await.unwrap();
        assert_eq!(outcome, ApprovalOutcome::Credited { reward: 5 });
        assert_eq!(store.balance(1).await.unwrap(), 5);
        assert_eq!(
            store.submission_state(1, task.id).await.unwrap(),
            SubmissionState::Approved
        );

        // Re-approval is a no-op, not a second payment.
        let outcome = store.approve_submission(1, task.id).await.unwrap();
        assert_eq!(outcome, ApprovalOutcome::AlreadyApproved);
        assert_eq!(store.balance(1).await.unwrap(), 5);
    }

    #[tokio::test]
    async fn test_approve_requires_submission() {
        let store = LedgerStore::open_in_memory().unwrap();
        store.get_or_create_user(1, None).await.unwrap();
        let task = store.create_task(&draft("unclaimed", 5)).await.unwrap();

        assert!(matches!(
            store.approve_submission(1, task.id).await,
            Err(LedgerError::NotFound(_))
        ));
        assert_eq!(store.balance(1).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_approve_unknown_task() {
        let store = LedgerStore::open_in_memory().unwrap();
        assert!(matches!(
            store.approve_submission(1, 77).await,
            Err(LedgerError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_approve_unknown_user_keeps_submission_pending() {
        let store = LedgerStore::open_in_memory().unwrap();
        let task = store.create_task(&draft("ghost", 5)).await.unwrap();
        store.record_submission(42, task.id).await.unwrap();

        // The user never started the bot, so the credit fails and the
        // approval rolls back.
        assert!(matches!(
            store.approve_submission(42, task.id).await,
            Err(LedgerError::NotFound(_))
        ));
        assert_eq!(
            store.submission_state(42, task.id).await.unwrap(),
            SubmissionState::Submitted
        );

        store.get_or_create_user(42, None).await.unwrap();
        let outcome = store.approve_submission(42, task.id).await.unwrap();
        assert_eq!(outcome, ApprovalOutcome::Credited { reward: 5 });
        assert_eq!(store.balance(42).await.unwrap(), 5);
    }

    #[tokio::test]
    async fn test_balance_never_negative() {
        let store = LedgerStore::open_in_memory().unwrap();
        store.get_or_create_user(1, None).await.unwrap();
        store.get_or_create_user(2, Some(1)).await.unwrap();
        let task = store.create_task(&draft("t", 7)).await.unwrap();
        store.record_submission(2, task.id).await.unwrap();
        store.approve_submission(2, task.id).await.unwrap();

        for id in [1, 2] {
            assert!(store.balance(id).await.unwrap() >= 0);
        }
    }

    #[tokio::test]
    async fn test_reopen_preserves_state() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.db");

        {
            let store = LedgerStore::open(&path).unwrap();
            store.get_or_create_user(1, None).await.unwrap();
            store.create_task(&draft("persisted", 4)).await.unwrap();
            store.credit_user(1, 10).await.unwrap();
        }

        let store = LedgerStore::open(&path).unwrap();
        assert_eq!(store.balance(1).await.unwrap(), 10);
        assert_eq!(store.task_count().await.unwrap(), 1);
    }
}
