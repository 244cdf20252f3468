use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::B256;
use rand::Rng;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    Success,
    Error,
    Info,
}

/// A transient message destined for whatever surface the operator watches.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub message: String,
    /// Dedup key: enqueue time in millis plus a random suffix.
    pub key: String,
    pub variant: Variant,
}

impl Notification {
    pub fn new(message: impl Into<String>, variant: Variant) -> Self {
        Self {
            message: message.into(),
            key: dedup_key(),
            variant,
        }
    }

    /// The submitted-transaction notification: the message is the hash itself.
    pub fn tx_submitted(hash: B256) -> Self {
        Self::new(hash.to_string(), Variant::Success)
    }
}

fn dedup_key() -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let suffix: u32 = rand::rng().random();
    format!("{millis}-{suffix:08x}")
}

/// Where notifications go. Kept behind a trait so the polling and transaction
/// layers can be driven in tests without any delivery machinery.
pub trait NotificationSink: Send + Sync {
    fn enqueue(&self, notification: Notification);
}

/// Writes notifications to the service log.
pub struct LogSink;

impl NotificationSink for LogSink {
    fn enqueue(&self, notification: Notification) {
        log::info!(
            "Notification ({}): {}",
            notification.key,
            notification.message
        );
    }
}

#[derive(Debug, Serialize)]
struct WebhookPayload {
    #[serde(flatten)]
    notification: Notification,
    timestamp: String,
}

/// Posts each notification as JSON to an operator-configured endpoint.
/// Delivery is fire-and-forget; failures are logged, never propagated.
pub struct WebhookSink {
    webhook_url: String,
    client: Arc<reqwest::Client>,
}

impl WebhookSink {
    pub fn new(webhook_url: String) -> Self {
        Self {
            webhook_url,
            client: Arc::new(reqwest::Client::new()),
        }
    }
}

impl NotificationSink for WebhookSink {
    fn enqueue(&self, notification: Notification) {
        let payload = WebhookPayload {
            notification,
            timestamp: chrono::Utc::now().to_rfc3339(),
        };
        let webhook_url = self.webhook_url.clone();
        let client = self.client.clone();

        tokio::spawn(async move {
            let result = client
                .post(&webhook_url)
                .json(&payload)
                .timeout(Duration::from_secs(5))
                .send()
                .await;
            match result {
                Ok(_) => log::debug!("Notification webhook delivered to {webhook_url}"),
                Err(e) => log::error!("Failed to deliver notification webhook to {webhook_url}: {e}"),
            }
        });
    }
}

/// Captures notifications in memory for assertions.
#[cfg(test)]
pub(crate) struct MemorySink {
    entries: std::sync::Mutex<Vec<Notification>>,
}

#[cfg(test)]
impl MemorySink {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            entries: std::sync::Mutex::new(Vec::new()),
        })
    }

    pub(crate) fn entries(&self) -> Vec<Notification> {
        self.entries.lock().unwrap().clone()
    }
}

#[cfg(test)]
impl NotificationSink for MemorySink {
    fn enqueue(&self, notification: Notification) {
        self.entries.lock().unwrap().push(notification);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tx_submitted_carries_hash_and_success_variant() {
        let hash = B256::repeat_byte(0xab);
        let notification = Notification::tx_submitted(hash);
        assert_eq!(notification.message, hash.to_string());
        assert_eq!(notification.variant, Variant::Success);
    }

    #[test]
    fn dedup_keys_differ_between_notifications() {
        let a = Notification::new("first", Variant::Info);
        let b = Notification::new("second", Variant::Info);
        assert_ne!(a.key, b.key);
    }

    #[test]
    fn payload_serializes_flat() {
        let payload = WebhookPayload {
            notification: Notification::new("0xdead", Variant::Success),
            timestamp: "2024-01-01T00:00:00Z".to_string(),
        };
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value["message"], "0xdead");
        assert_eq!(value["variant"], "success");
        assert!(value["key"].is_string());
    }
}
