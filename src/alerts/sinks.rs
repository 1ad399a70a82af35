//! Notification sinks
//!
//! Fan-out of fired alerts to the configured sinks: a Discord-style webhook
//! and a Telegram bot endpoint. Sink failures are logged and never block the
//! other sinks or the sweep.

use serde_json::json;
use std::time::Duration;
use tracing::{info, warn};

use super::engine::AlertEvent;
use crate::types::Settings;

/// Timeout applied to every sink call
const SINK_TIMEOUT: Duration = Duration::from_secs(15);

/// Outbound alert dispatcher
pub struct Notifier {
    http: reqwest::Client,
    /// Optional reverse-proxy base for Discord webhooks
    webhook_proxy_base: Option<String>,
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifier {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(SINK_TIMEOUT)
                .build()
                .unwrap_or_default(),
            webhook_proxy_base: std::env::var("WEBHOOK_PROXY_BASE")
                .ok()
                .filter(|v| !v.trim().is_empty()),
        }
    }

    #[cfg(test)]
    fn with_proxy_base(base: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            webhook_proxy_base: Some(base.to_string()),
        }
    }

    /// Send one event to every configured sink. The local log line doubles
    /// as the desktop notification on headless hosts.
    pub async fn dispatch(&self, event: &AlertEvent, settings: &Settings) {
        info!(rule = %event.rule, item = %event.item_id, "{}: {}", event.title, event.body);

        if let Some(webhook) = settings.discord_webhook.as_deref() {
            if let Err(e) = self.send_webhook(webhook, &event.title, &event.body).await {
                warn!("webhook sink failed for {}: {e:#}", event.item_id);
            }
        }

        if let (Some(token), Some(chat_id)) = (
            settings.telegram_token.as_deref(),
            settings.telegram_chat_id.as_deref(),
        ) {
            if let Err(e) = self
                .send_telegram(token, chat_id, &event.title, &event.body)
                .await
            {
                warn!("telegram sink failed for {}: {e:#}", event.item_id);
            }
        }
    }

    /// Dispatch a batch sequentially; per-event failures are already
    /// swallowed inside `dispatch`.
    pub async fn dispatch_all(&self, events: &[AlertEvent], settings: &Settings) {
        for event in events {
            self.dispatch(event, settings).await;
        }
    }

    async fn send_webhook(&self, webhook: &str, title: &str, body: &str) -> anyhow::Result<()> {
        let url = self.rewrite_webhook(webhook);
        self.http
            .post(&url)
            .json(&json!({ "content": format!("**{title}**\n{body}") }))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    async fn send_telegram(
        &self,
        token: &str,
        chat_id: &str,
        title: &str,
        body: &str,
    ) -> anyhow::Result<()> {
        let url = format!("https://api.telegram.org/bot{token}/sendMessage");
        self.http
            .post(&url)
            .json(&json!({
                "chat_id": chat_id,
                "text": format!("*{title}*\n{body}"),
                "parse_mode": "Markdown",
            }))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    /// Map `https://host/api/webhooks/{id}/{token}` through the configured
    /// reverse-proxy base, leaving other URLs untouched.
    fn rewrite_webhook(&self, webhook: &str) -> String {
        let Some(base) = &self.webhook_proxy_base else {
            return webhook.to_string();
        };
        match webhook.split_once("/api/webhooks/") {
            Some((_, tail)) => format!("{}/webhooks/{}", base.trim_end_matches('/'), tail),
            None => webhook.to_string(),
        }
    }
}
