//! Best-effort operator notifications.
//!
//! `Notifier::send` detaches a task per message and returns immediately.
//! Delivery failures are logged at debug level and otherwise ignored.

use std::sync::Arc;

use async_trait::async_trait;
use log::debug;
use tokio::task::JoinHandle;

use crate::error::{Error, Result};

/// Somewhere a text message can be delivered.
#[async_trait]
pub trait MessageSink: Send + Sync {
    async fn send(&self, text: &str) -> Result<()>;
}

/// Fire-and-forget front for an optional sink.
#[derive(Clone, Default)]
pub struct Notifier {
    sink: Option<Arc<dyn MessageSink>>,
}

impl Notifier {
    pub fn new(sink: Arc<dyn MessageSink>) -> Self {
        Self { sink: Some(sink) }
    }

    /// A notifier with no destination; every send is a no-op.
    pub fn disabled() -> Self {
        Self { sink: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.sink.is_some()
    }

    /// Dispatch `text` on its own task. Must be called inside a tokio runtime.
    ///
    /// The handle is only useful to tests; dropping it detaches the task.
    pub fn send(&self, text: impl Into<String>) -> Option<JoinHandle<()>> {
        let sink = self.sink.clone()?;
        let text = text.into();
        Some(tokio::spawn(async move {
            if let Err(e) = sink.send(&text).await {
                debug!("notification dropped: {e}");
            }
        }))
    }
}

impl std::fmt::Debug for Notifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notifier")
            .field("enabled", &self.is_enabled())
            .finish()
    }
}

/// Telegram Bot API `sendMessage` sink.
pub struct TelegramSink {
    client: reqwest::Client,
    bot_token: String,
    chat_id: String,
    base_url: String,
}

impl TelegramSink {
    pub fn new(bot_token: &str, chat_id: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            bot_token: bot_token.to_string(),
            chat_id: chat_id.to_string(),
            base_url: "https://api.telegram.org".to_string(),
        }
    }

    /// Point at a different API host (e.g. a local bot API server).
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/bot{}/sendMessage", self.base_url, self.bot_token)
    }
}

#[async_trait]
impl MessageSink for TelegramSink {
    async fn send(&self, text: &str) -> Result<()> {
        let body = serde_json::json!({
            "chat_id": self.chat_id,
            "text": text,
        });
        let resp = self
            .client
            .post(self.endpoint())
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Notify(format!("telegram request failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Notify(format!("telegram returned {status}: {body}")));
        }
        Ok(())
    }
}
