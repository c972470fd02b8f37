//! Outbound Bot API client.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;

use crate::gateway::{Button, Outbox};

/// Minimal Bot API client covering `sendMessage`.
pub struct BotClient {
    client: Client,
    base_url: String,
    admin_id: i64,
}

impl BotClient {
    pub fn new(token: &str, admin_id: i64) -> Self {
        Self {
            client: Client::new(),
            base_url: format!("https://api.telegram.org/bot{}", token),
            admin_id,
        }
    }

    /// Override the API host (self-hosted Bot API servers, tests).
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        buttons: &[Button],
    ) -> anyhow::Result<()> {
        let mut body = json!({
            "chat_id": chat_id,
            "text": text,
        });
        if !buttons.is_empty() {
            // One button per row, like the original menu layout.
            let keyboard: Vec<Vec<serde_json::Value>> = buttons
                .iter()
                .map(|b| vec![json!({ "text": b.label, "callback_data": b.data })])
                .collect();
            body["reply_markup"] = json!({ "inline_keyboard": keyboard });
        }

        let resp = self
            .client
            .post(format!("{}/sendMessage", self.base_url))
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await?;
            anyhow::bail!("sendMessage failed: {} - {}", status, text);
        }
        Ok(())
    }
}

#[async_trait]
impl Outbox for BotClient {
    async fn send_to_user(
        &self,
        user_id: i64,
        text: &str,
        buttons: &[Button],
    ) -> anyhow::Result<()> {
        self.send_message(user_id, text, buttons).await
    }

    async fn send_to_admin(&self, text: &str) -> anyhow::Result<()> {
        self.send_message(self.admin_id, text, &[]).await
    }
}
