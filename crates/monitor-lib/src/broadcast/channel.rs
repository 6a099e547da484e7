//! Queue-backed subscriber

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc::{self, error::SendTimeoutError};

use super::Subscriber;
use crate::errors::DeliveryError;
use crate::models::Event;

/// Subscriber that pushes events into a bounded queue.
///
/// The transport side owns the receiver and writes events to its
/// connection. Dropping the receiver makes the next delivery fail with
/// `DeliveryError::Closed`, which prunes the subscriber.
pub struct ChannelSubscriber {
    tx: mpsc::Sender<Event>,
    send_timeout: Duration,
}

impl ChannelSubscriber {
    pub fn new(queue_size: usize, send_timeout: Duration) -> (Self, mpsc::Receiver<Event>) {
        let (tx, rx) = mpsc::channel(queue_size.max(1));
        (Self { tx, send_timeout }, rx)
    }
}

#[async_trait]
impl Subscriber for ChannelSubscriber {
    async fn send(&self, event: &Event) -> Result<(), DeliveryError> {
        self.tx
            .send_timeout(event.clone(), self.send_timeout)
            .await
            .map_err(|e| match e {
                SendTimeoutError::Timeout(_) => DeliveryError::TimedOut(self.send_timeout),
                SendTimeoutError::Closed(_) => DeliveryError::Closed,
            })
    }
}
