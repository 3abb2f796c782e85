// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `lapin`-backed [`Bus`] implementation.
//!
//! Every declare/bind/consume call is appended to an in-memory ledger before
//! it is issued against the broker. On reconnect the ledger is replayed
//! against the fresh channel, so callers never have to re-declare anything
//! themselves after a connection blip.

use async_trait::async_trait;
use futures_util::StreamExt;
use lapin::options::{
    BasicConsumeOptions, BasicPublishOptions, ExchangeDeclareOptions, QueueBindOptions,
    QueueDeclareOptions,
};
use lapin::types::FieldTable;
use lapin::{BasicProperties, Channel, Connection, ConnectionProperties};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::{Acker, AckerInner, Bus, BusError, ConsumerHandler, Delivery, ExchangeKind, PublishTarget, QueueOptions};

#[derive(Clone)]
struct Ledger {
    exchanges: Vec<(String, ExchangeKind)>,
    queues: Vec<(String, QueueOptions)>,
    bindings: Vec<(String, String)>,
    consumers: Vec<(String, ConsumerHandler)>,
}

impl Ledger {
    fn new() -> Self {
        Self { exchanges: Vec::new(), queues: Vec::new(), bindings: Vec::new(), consumers: Vec::new() }
    }
}

struct State {
    channel: Option<Channel>,
    ledger: Ledger,
}

/// AMQP-backed [`Bus`]. One connection, one channel, shared behind a mutex —
/// the broker's own per-channel framing serializes concurrent callers.
pub struct AmqpBus {
    url: String,
    state: Mutex<State>,
}

impl AmqpBus {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into(), state: Mutex::new(State { channel: None, ledger: Ledger::new() }) }
    }

    /// Return a live channel, connecting (or reconnecting) and replaying the
    /// declare/bind/consume ledger if necessary.
    async fn channel(&self) -> Result<Channel, BusError> {
        let mut state = self.state.lock().await;
        if let Some(chan) = &state.channel {
            if chan.status().connected() {
                return Ok(chan.clone());
            }
        }

        let conn = Connection::connect(
            &self.url,
            ConnectionProperties::default()
                .with_executor(tokio_executor_trait::Tokio::current())
                .with_reactor(tokio_reactor_trait::Tokio),
        )
        .await
        .map_err(|e| BusError::ReconnectFailed(e.to_string()))?;
        let chan = conn.create_channel().await?;

        let ledger = state.ledger.clone();
        for (name, kind) in &ledger.exchanges {
            declare_exchange(&chan, name, *kind).await?;
        }
        for (name, opts) in &ledger.queues {
            declare_queue(&chan, name, *opts).await?;
        }
        for (exchange, queue) in &ledger.bindings {
            bind_queue(&chan, exchange, queue).await?;
        }
        for (queue, handler) in &ledger.consumers {
            spawn_consumer(&chan, queue.clone(), handler.clone()).await?;
        }

        // Keep the connection alive for the lifetime of the channel; leaking
        // it here is deliberate — `lapin::Connection` has no owning handle we
        // thread through the trait, and dropping it would close the channel.
        std::mem::forget(conn);

        state.channel = Some(chan.clone());
        Ok(chan)
    }
}

async fn declare_exchange(chan: &Channel, name: &str, kind: ExchangeKind) -> Result<(), BusError> {
    chan.exchange_declare(
        name,
        kind.into(),
        ExchangeDeclareOptions { durable: true, ..Default::default() },
        FieldTable::default(),
    )
    .await?;
    Ok(())
}

async fn declare_queue(chan: &Channel, name: &str, opts: QueueOptions) -> Result<(), BusError> {
    chan.queue_declare(
        name,
        QueueDeclareOptions {
            durable: opts.durable,
            auto_delete: opts.auto_delete,
            exclusive: opts.exclusive,
            ..Default::default()
        },
        FieldTable::default(),
    )
    .await?;
    Ok(())
}

async fn bind_queue(chan: &Channel, exchange: &str, queue: &str) -> Result<(), BusError> {
    chan.queue_bind(queue, exchange, "", QueueBindOptions::default(), FieldTable::default()).await?;
    Ok(())
}

async fn spawn_consumer(chan: &Channel, queue: String, handler: ConsumerHandler) -> Result<(), BusError> {
    let mut consumer = chan
        .basic_consume(&queue, "", BasicConsumeOptions::default(), FieldTable::default())
        .await?;
    tokio::spawn(async move {
        while let Some(delivery) = consumer.next().await {
            let delivery = match delivery {
                Ok(d) => d,
                Err(err) => {
                    tracing::warn!(%err, "amqp consumer stream error");
                    continue;
                }
            };
            let body = delivery.data.clone();
            let queue_name = queue.clone();
            let acker = Acker(AckerInner::Amqp(delivery.acker.clone()));
            let handler = handler.clone();
            tokio::spawn(handler(Delivery { body, queue: queue_name, acker }));
        }
    });
    Ok(())
}

#[async_trait]
impl Bus for AmqpBus {
    async fn declare_exchange(&self, name: &str, kind: ExchangeKind) -> Result<(), BusError> {
        let chan = self.channel().await?;
        declare_exchange(&chan, name, kind).await?;
        let mut state = self.state.lock().await;
        state.ledger.exchanges.push((name.to_string(), kind));
        Ok(())
    }

    async fn declare_queue(&self, name: &str, opts: QueueOptions) -> Result<(), BusError> {
        let chan = self.channel().await?;
        declare_queue(&chan, name, opts).await?;
        let mut state = self.state.lock().await;
        state.ledger.queues.push((name.to_string(), opts));
        Ok(())
    }

    async fn bind_queue(&self, exchange: &str, queue: &str) -> Result<(), BusError> {
        let chan = self.channel().await?;
        bind_queue(&chan, exchange, queue).await?;
        let mut state = self.state.lock().await;
        state.ledger.bindings.push((exchange.to_string(), queue.to_string()));
        Ok(())
    }

    async fn publish(&self, target: PublishTarget, body: Vec<u8>) -> Result<(), BusError> {
        let chan = self.channel().await?;
        let (exchange, routing_key) = match &target {
            PublishTarget::Queue(name) => ("", name.as_str()),
            PublishTarget::Exchange { name, routing_key } => (name.as_str(), routing_key.as_str()),
        };
        chan.basic_publish(
            exchange,
            routing_key,
            BasicPublishOptions::default(),
            &body,
            BasicProperties::default(),
        )
        .await?
        .await?;
        Ok(())
    }

    async fn consume(&self, queue: &str, handler: ConsumerHandler) -> Result<(), BusError> {
        let chan = self.channel().await?;
        spawn_consumer(&chan, queue.to_string(), handler.clone()).await?;
        let mut state = self.state.lock().await;
        state.ledger.consumers.push((queue.to_string(), handler));
        Ok(())
    }

    async fn depth(&self, queue: &str) -> Result<u32, BusError> {
        let chan = self.channel().await?;
        let q = chan
            .queue_declare(
                queue,
                QueueDeclareOptions { passive: true, ..Default::default() },
                FieldTable::default(),
            )
            .await?;
        Ok(q.message_count())
    }

    async fn stop(&self) -> Result<(), BusError> {
        let mut state = self.state.lock().await;
        if let Some(chan) = state.channel.take() {
            let _ = chan.close(200, "bus stopped").await;
        }
        Ok(())
    }
}
