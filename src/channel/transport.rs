//! Channel transport: publish/subscribe to one Redis Pub/Sub topic.
//!
//! The reconnect loop: subscribe, drain `on_message()`, `select!` against a
//! shutdown signal, 5s backoff and reconnect on stream-end or error.

use crate::error::{CacheError, Result};
use async_trait::async_trait;
use futures_util::StreamExt;
use redis::aio::ConnectionManager;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

/// Invalidation channel capability: publish framed bytes, and subscribe a
/// handler that receives every message this node did not suppress.
#[async_trait]
pub trait ChannelTransport: Send + Sync {
    async fn publish(&self, bytes: Vec<u8>) -> Result<()>;
    /// Spawn the receiver loop; `handler` is invoked with each message's
    /// raw bytes on a dedicated task.
    fn subscribe(&self, handler: Arc<dyn Fn(Vec<u8>) + Send + Sync>) -> tokio::task::JoinHandle<()>;
    async fn close(&self);
}

pub struct RedisChannelTransport {
    client: redis::Client,
    publish_conn: ConnectionManager,
    topic: String,
    shutdown_tx: broadcast::Sender<()>,
}

impl RedisChannelTransport {
    pub async fn new(client: redis::Client, topic: String) -> Result<Self> {
        let publish_conn = ConnectionManager::new(client.clone())
            .await
            .map_err(|e| CacheError::ChannelUnavailable(e.to_string()))?;
        let (shutdown_tx, _) = broadcast::channel(1);
        Ok(Self {
            client,
            publish_conn,
            topic,
            shutdown_tx,
        })
    }

    async fn run_loop(
        client: redis::Client,
        topic: String,
        handler: Arc<dyn Fn(Vec<u8>) + Send + Sync>,
        shutdown_rx: &mut broadcast::Receiver<()>,
    ) -> anyhow::Result<()> {
        let mut pubsub = client.get_async_pubsub().await?;
        pubsub.subscribe(&topic).await?;
        info!(topic = %topic, "subscribed to invalidation channel");
        let mut stream = pubsub.on_message();

        loop {
            tokio::select! {
                msg = stream.next() => {
                    match msg {
                        Some(msg) => {
                            let payload = msg.get_payload_bytes().to_vec();
                            handler(payload);
                        }
                        None => return Err(anyhow::anyhow!("pub/sub message stream ended")),
                    }
                }
                _ = shutdown_rx.recv() => return Ok(()),
            }
        }
    }
}

#[async_trait]
impl ChannelTransport for RedisChannelTransport {
    async fn publish(&self, bytes: Vec<u8>) -> Result<()> {
        let mut conn = self.publish_conn.clone();
        redis::cmd("PUBLISH")
            .arg(&self.topic)
            .arg(bytes)
            .query_async::<i64>(&mut conn)
            .await
            .map_err(|e| CacheError::ChannelUnavailable(e.to_string()))?;
        Ok(())
    }

    fn subscribe(
        &self,
        handler: Arc<dyn Fn(Vec<u8>) + Send + Sync>,
    ) -> tokio::task::JoinHandle<()> {
        let client = self.client.clone();
        let topic = self.topic.clone();
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            loop {
                if shutdown_rx.try_recv().is_ok() {
                    info!("invalidation subscriber shutting down");
                    break;
                }
                match Self::run_loop(client.clone(), topic.clone(), Arc::clone(&handler), &mut shutdown_rx).await {
                    Ok(()) => break,
                    Err(e) => {
                        error!(error = %e, "invalidation subscriber error, reconnecting in 5s");
                        tokio::select! {
                            () = tokio::time::sleep(Duration::from_secs(5)) => {},
                            _ = shutdown_rx.recv() => {
                                warn!("invalidation subscriber shutting down during backoff");
                                break;
                            }
                        }
                    }
                }
            }
        })
    }

    async fn close(&self) {
        let _ = self.shutdown_tx.send(());
    }
}
