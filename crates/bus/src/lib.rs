// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Durable messaging abstraction over a broker.
//!
//! [`Bus`] is the async trait every caller programs against; [`AmqpBus`] is
//! the production implementation backed by `lapin`, [`MemoryBus`] an
//! in-process double with the same durability/redelivery contract for tests
//! that should never need a running broker.

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod amqp;
mod memory;

use async_trait::async_trait;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use thiserror::Error;

pub use amqp::AmqpBus;
pub use memory::MemoryBus;

#[derive(Debug, Error)]
pub enum BusError {
    #[error("bus disconnected: {0}")]
    Disconnected(String),
    #[error("reconnect failed: {0}")]
    ReconnectFailed(String),
    #[error("amqp error: {0}")]
    Amqp(#[from] lapin::Error),
    #[error("unknown queue: {0}")]
    UnknownQueue(String),
}

/// Exchange type passed to [`Bus::declare_exchange`]; `Fanout` is what the
/// controller's broadcast exchange (§4.1) uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeKind {
    Fanout,
    Direct,
    Topic,
}

impl From<ExchangeKind> for lapin::ExchangeKind {
    fn from(kind: ExchangeKind) -> Self {
        match kind {
            ExchangeKind::Fanout => lapin::ExchangeKind::Fanout,
            ExchangeKind::Direct => lapin::ExchangeKind::Direct,
            ExchangeKind::Topic => lapin::ExchangeKind::Topic,
        }
    }
}

/// Queue declaration properties. Two declarations of the same queue name with
/// different properties are a broker-level conflict; callers should treat the
/// name+properties pair as the queue's identity.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueueOptions {
    pub durable: bool,
    pub auto_delete: bool,
    pub exclusive: bool,
}

/// Destination of a [`Bus::publish`] call.
#[derive(Debug, Clone)]
pub enum PublishTarget {
    Queue(String),
    Exchange { name: String, routing_key: String },
}

impl PublishTarget {
    pub fn queue(name: impl Into<String>) -> Self {
        PublishTarget::Queue(name.into())
    }

    pub fn exchange(name: impl Into<String>) -> Self {
        PublishTarget::Exchange { name: name.into(), routing_key: String::new() }
    }
}

/// A single delivered message, handed to the consumer callback. Carries its
/// own [`Acker`] so the handler decides when (or whether) to acknowledge it.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub body: Vec<u8>,
    pub queue: String,
    acker: Acker,
}

impl Delivery {
    pub async fn ack(&self) -> Result<(), BusError> {
        self.acker.ack().await
    }

    pub async fn nack(&self, requeue: bool) -> Result<(), BusError> {
        self.acker.nack(requeue).await
    }
}

#[derive(Clone)]
struct Acker(AckerInner);

#[derive(Clone)]
enum AckerInner {
    Amqp(lapin::acker::Acker),
    Memory(memory::MemoryAcker),
}

impl std::fmt::Debug for Acker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Acker(..)")
    }
}

impl Acker {
    async fn ack(&self) -> Result<(), BusError> {
        match &self.0 {
            AckerInner::Amqp(acker) => {
                acker.ack(lapin::options::BasicAckOptions::default()).await.map_err(BusError::from)
            }
            AckerInner::Memory(acker) => acker.ack().await,
        }
    }

    async fn nack(&self, requeue: bool) -> Result<(), BusError> {
        match &self.0 {
            AckerInner::Amqp(acker) => acker
                .nack(lapin::options::BasicNackOptions { requeue, ..Default::default() })
                .await
                .map_err(BusError::from),
            AckerInner::Memory(acker) => acker.nack(requeue).await,
        }
    }
}

/// Per-message callback registered with [`Bus::consume`]. Boxed so the trait
/// stays object-safe; `Arc` so the same handler can be cloned into a spawned
/// task per delivery.
pub type ConsumerHandler =
    Arc<dyn Fn(Delivery) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

/// Durable queue broker: declare/bind/publish/consume, manual ack, depth
/// probe. See module docs and SPEC_FULL §4.1 for the full contract.
#[async_trait]
pub trait Bus: Send + Sync + 'static {
    async fn declare_exchange(&self, name: &str, kind: ExchangeKind) -> Result<(), BusError>;

    async fn declare_queue(&self, name: &str, opts: QueueOptions) -> Result<(), BusError>;

    async fn bind_queue(&self, exchange: &str, queue: &str) -> Result<(), BusError>;

    async fn publish(&self, target: PublishTarget, body: Vec<u8>) -> Result<(), BusError>;

    /// Spawn a long-running consumer that invokes `handler` for every
    /// delivery on `queue`. Returns once the consumer is registered, not when
    /// it stops; the consumer runs until [`Bus::stop`] or process exit.
    async fn consume(&self, queue: &str, handler: ConsumerHandler) -> Result<(), BusError>;

    /// Current ready-message count for `queue` (messages not yet delivered to
    /// a consumer), used by the controller's drip-feed admission loop.
    async fn depth(&self, queue: &str) -> Result<u32, BusError>;

    async fn stop(&self) -> Result<(), BusError>;
}
