//! Fan-out of pipeline events to live subscribers
//!
//! This module provides:
//! - `Subscriber`, the single-capability contract a transport implements
//! - `BroadcastHub`, which delivers every published event to every
//!   registered subscriber and prunes the ones that fail
//! - `ChannelSubscriber`, a bounded in-process subscriber for transports
//!   that drain events from a queue

mod channel;
mod hub;


pub use channel::ChannelSubscriber;
pub use hub::{BroadcastHub, HubConfig, HubStats};

use crate::errors::DeliveryError;
use crate::models::Event;
use async_trait::async_trait;
use std::fmt;

/// Something that can receive pipeline events
#[async_trait]
pub trait Subscriber: Send + Sync {
    /// Deliver one event. An error marks the subscriber as dead.
    async fn send(&self, event: &Event) -> Result<(), DeliveryError>;
}

/// Handle identifying one registration with the hub
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(u64);

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}
