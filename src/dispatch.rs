//! Routes chat events to the ledger components and words the replies.
//!
//! Component errors never escape: they are converted into short chat-facing
//! failure messages here, and the webhook handler acknowledges every update
//! regardless, so a failed operation can neither corrupt the store nor wedge
//! the gateway loop.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::catalog::Catalog;
use crate::config::Config;
use crate::error::LedgerError;
use crate::gateway::{Button, Intent, Outbox};
use crate::ledger::{ApprovalOutcome, SharedLedger};
use crate::referral::{self, REFERRAL_BONUS};
use crate::telegram::{ChatEvent, Update};
use crate::withdrawal::WithdrawalIntake;
use crate::workflow::{SubmissionWorkflow, SubmitOutcome};

const WELCOME: &str = "👋 Welcome to Task Earning Bot\n\nChoose an option:";

const ADD_TASK_PROMPT: &str = "Send task like this:\n\n\
    Title | Description | Link | Reward\n\n\
    Example:\nJoin Channel | Join & stay 1 min | https://t.me/test | 5";

const WITHDRAW_PROMPT: &str = "💸 Withdraw Request\n\nSend like this:\n\
    Amount | Method | Number\n\n\
    Example:\n500 | bKash | 01XXXXXXXXX";

/// Routes intents to the catalog, workflow, withdrawal intake, and ledger.
pub struct Dispatcher {
    config: Config,
    ledger: SharedLedger,
    catalog: Catalog,
    workflow: SubmissionWorkflow,
    withdrawal: WithdrawalIntake,
    outbox: Arc<dyn Outbox>,
    /// Admins who pressed /addtask and owe a task payload as their next line.
    awaiting_draft: RwLock<HashSet<i64>>,
}

impl Dispatcher {
    pub fn new(config: Config, ledger: SharedLedger, outbox: Arc<dyn Outbox>) -> Self {
        Self {
            catalog: Catalog::new(Arc::clone(&ledger)),
            workflow: SubmissionWorkflow::new(
                Arc::clone(&ledger),
                Arc::clone(&outbox),
                config.admin_id,
            ),
            withdrawal: WithdrawalIntake::new(Arc::clone(&outbox)),
            config,
            ledger,
            outbox,
            awaiting_draft: RwLock::new(HashSet::new()),
        }
    }

    /// Entry point for one webhook update.
    pub async fn handle_update(&self, update: &Update) {
        let Some(event) = ChatEvent::from_update(update) else {
            return;
        };
        let Some(intent) = self.resolve(event).await else {
            return;
        };
        self.dispatch(intent).await;
    }

    /// Execute an intent; component failures become short replies.
    pub async fn dispatch(&self, intent: Intent) {
        let actor = intent.actor();
        if let Err(e) = self.execute(intent).await {
            tracing::warn!(actor, error = %e, "intent failed");
            if let Some(text) = e.user_message() {
                self.reply(actor, &text).await;
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Event → intent
    // ─────────────────────────────────────────────────────────────────────

    /// Apply conversation state to a raw event, yielding an intent.
    async fn resolve(&self, event: ChatEvent) -> Option<Intent> {
        match event {
            ChatEvent::Command {
                user_id,
                name,
                args,
            } => match name.as_str() {
                "start" => Some(Intent::Start {
                    user_id,
                    referrer: args.first().and_then(|a| a.parse().ok()),
                }),
                "addtask" => Some(Intent::AdminCreateTaskBegin { admin_id: user_id }),
                "approve" => self.resolve_approve(user_id, &args).await,
                _ => None,
            },
            ChatEvent::Callback { user_id, data } => match data.as_str() {
                "tasks" => Some(Intent::ViewTasks { user_id }),
                "balance" => Some(Intent::ViewBalance { user_id }),
                "refer" => Some(Intent::ViewReferral { user_id }),
                "withdraw" => Some(Intent::ViewWithdrawPrompt { user_id }),
                other => other
                    .strip_prefix("done_")
                    .and_then(|id| id.parse().ok())
                    .map(|task_id| Intent::MarkDone { user_id, task_id }),
            },
            ChatEvent::Text { user_id, text } => {
                if self.awaiting_draft.write().await.remove(&user_id) {
                    Some(Intent::AdminCreateTaskPayload {
                        admin_id: user_id,
                        raw: text,
                    })
                } else {
                    Some(Intent::WithdrawPayload { user_id, raw: text })
                }
            }
        }
    }

    async fn resolve_approve(&self, requested_by: i64, args: &[String]) -> Option<Intent> {
        let parsed = match (args.first(), args.get(1)) {
            (Some(user), Some(task)) => user.parse().ok().zip(task.parse().ok()),
            _ => None,
        };
        match parsed {
            Some((user_id, task_id)) => Some(Intent::AdminApprove {
                admin_id: requested_by,
                user_id,
                task_id,
            }),
            None => {
                if requested_by == self.config.admin_id {
                    self.reply(requested_by, "❌ Usage: /approve <user_id> <task_id>")
                        .await;
                }
                None
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Intent execution
    // ─────────────────────────────────────────────────────────────────────

    async fn execute(&self, intent: Intent) -> Result<(), LedgerError> {
        match intent {
            Intent::Start { user_id, referrer } => {
                self.ledger.get_or_create_user(user_id, referrer).await?;
                let menu = [
                    Button::new("🧾 Tasks", "tasks"),
                    Button::new("💰 Balance", "balance"),
                    Button::new("👥 Refer", "refer"),
                    Button::new("💸 Withdraw", "withdraw"),
                ];
                self.send(user_id, WELCOME, &menu).await;
                Ok(())
            }

            Intent::ViewBalance { user_id } => {
                let balance = self.ledger.balance(user_id).await?;
                self.reply(user_id, &format!("💰 Your balance: {} credits", balance))
                    .await;
                Ok(())
            }

            Intent::ViewTasks { user_id } => {
                let tasks = self.catalog.open_tasks(user_id).await?;
                if tasks.is_empty() {
                    self.reply(user_id, "❌ No tasks available now").await;
                    return Ok(());
                }
                for task in tasks {
                    let card = format!(
                        "📌 {}\n\n{}\n\n💰 Reward: {} credits\n🔗 {}",
                        task.title, task.description, task.reward, task.link
                    );
                    let done = [Button::new("✅ Done", &format!("done_{}", task.id))];
                    self.send(user_id, &card, &done).await;
                }
                Ok(())
            }

            Intent::MarkDone { user_id, task_id } => {
                match self.workflow.submit(user_id, task_id).await? {
                    SubmitOutcome::Recorded => {
                        self.reply(user_id, "✅ Submitted for review").await;
                    }
                    SubmitOutcome::Duplicate => {
                        self.reply(user_id, "Already submitted for review").await;
                    }
                }
                Ok(())
            }

            Intent::AdminCreateTaskBegin { admin_id } => {
                if admin_id != self.config.admin_id {
                    return Err(LedgerError::Unauthorized);
                }
                self.awaiting_draft.write().await.insert(admin_id);
                self.reply(admin_id, ADD_TASK_PROMPT).await;
                Ok(())
            }

            Intent::AdminCreateTaskPayload { admin_id, raw } => {
                if admin_id != self.config.admin_id {
                    return Err(LedgerError::Unauthorized);
                }
                self.catalog.create_task(&raw).await?;
                self.reply(admin_id, "✅ Task added successfully").await;
                Ok(())
            }

            Intent::AdminApprove {
                admin_id,
                user_id,
                task_id,
            } => {
                match self.workflow.approve(user_id, task_id, admin_id).await? {
                    ApprovalOutcome::Credited { .. } => {
                        self.reply(admin_id, "✅ Approved").await;
                    }
                    ApprovalOutcome::AlreadyApproved => {
                        self.reply(admin_id, "Already approved; nothing credited")
                            .await;
                    }
                }
                Ok(())
            }

            Intent::ViewReferral { user_id } => {
                let link = referral::referral_link(&self.config.bot_username, user_id);
                self.reply(
                    user_id,
                    &format!(
                        "👥 Refer & Earn\n\nYour link:\n{}\n\n+{} credits per user",
                        link, REFERRAL_BONUS
                    ),
                )
                .await;
                Ok(())
            }

            Intent::ViewWithdrawPrompt { user_id } => {
                self.reply(user_id, WITHDRAW_PROMPT).await;
                Ok(())
            }

            Intent::WithdrawPayload { user_id, raw } => {
                self.withdrawal.request(user_id, &raw).await;
                Ok(())
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Outbound helpers
    // ─────────────────────────────────────────────────────────────────────

    async fn send(&self, user_id: i64, text: &str, buttons: &[Button]) {
        if let Err(e) = self.outbox.send_to_user(user_id, text, buttons).await {
            tracing::warn!(user_id, error = %e, "failed to deliver message");
        }
    }

    async fn reply(&self, user_id: i64, text: &str) {
        self.send(user_id, text, &[]).await;
    }
}
