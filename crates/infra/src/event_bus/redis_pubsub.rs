//! Redis pub/sub transport for broadcast messages (optional).
//!
//! Redis pub/sub is not durable: messages to offline subscribers are
//! dropped. That matches the broadcast contract (best-effort, at-most-once);
//! subscribers needing history must read domain state instead.

use std::sync::mpsc;
use std::thread;

use redis::Commands;

use larder_broadcast::ChannelMessage;
use larder_events::{EventBus, Subscription};

#[derive(Debug)]
pub enum RedisBusError {
    Redis(String),
    Serialize(String),
}

/// Redis pub/sub bus for channel messages.
///
/// Each [`ChannelMessage`] publishes to `"{prefix}:{channel}"`, so one Redis
/// instance can carry several deployments side by side.
#[derive(Debug, Clone)]
pub struct RedisBroadcastBus {
    client: redis::Client,
    prefix: String,
}

impl RedisBroadcastBus {
    pub fn new(redis_url: impl AsRef<str>, prefix: impl Into<String>) -> Result<Self, RedisBusError> {
        let client = redis::Client::open(redis_url.as_ref())
            .map_err(|e| RedisBusError::Redis(e.to_string()))?;
        Ok(Self {
            client,
            prefix: prefix.into(),
        })
    }

    fn redis_channel(&self, channel: &str) -> String {
        format!("{}:{}", self.prefix, channel)
    }
}

impl EventBus<ChannelMessage> for RedisBroadcastBus {
    type Error = RedisBusError;

    fn publish(&self, message: ChannelMessage) -> Result<(), Self::Error> {
        let target = self.redis_channel(&message.channel);
        let payload = serde_json::to_string(&message)
            .map_err(|e| RedisBusError::Serialize(e.to_string()))?;

        let mut conn = self
            .client
            .get_connection()
            .map_err(|e| RedisBusError::Redis(e.to_string()))?;

        let _: i64 = conn
            .publish(target, payload)
            .map_err(|e| RedisBusError::Redis(e.to_string()))?;

        Ok(())
    }

    fn subscribe(&self) -> Subscription<ChannelMessage> {
        let (tx, rx) = mpsc::channel();

        let client = self.client.clone();
        let pattern = self.redis_channel("*");

        // Background thread that receives pub/sub messages and forwards them.
        thread::spawn(move || {
            let mut conn = match client.get_connection() {
                Ok(c) => c,
                Err(_) => return,
            };

            let mut pubsub = conn.as_pubsub();
            if pubsub.psubscribe(pattern).is_err() {
                return;
            }

            loop {
                let msg = match pubsub.get_message() {
                    Ok(m) => m,
                    Err(_) => return,
                };

                let payload: String = match msg.get_payload() {
                    Ok(p) => p,
                    Err(_) => continue,
                };

                let message: ChannelMessage = match serde_json::from_str(&payload) {
                    Ok(m) => m,
                    Err(_) => continue,
                };

                if tx.send(message).is_err() {
                    return;
                }
            }
        });

        Subscription::new(rx)
    }
}
