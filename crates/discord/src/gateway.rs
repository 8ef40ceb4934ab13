use std::{sync::Arc, time::Duration};

use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};

use crate::blocks::error_message;
use crate::effects::{Effect, EffectExecutor};
use crate::events::{
    DispatchError, EventContext, EventDispatcher, HandlerResult, InteractionEnvelope,
};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("transport failed to connect: {0}")]
    Connect(String),
    #[error("transport read failed: {0}")]
    Receive(String),
    #[error("transport ack failed: {0}")]
    Acknowledge(String),
    #[error("transport disconnect failed: {0}")]
    Disconnect(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self { max_retries: 5, base_delay_ms: 250, max_delay_ms: 5_000 }
    }
}

impl ReconnectPolicy {
    fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.min(16);
        let multiplier = 1_u64 << exponent;
        let delay_ms = self.base_delay_ms.saturating_mul(multiplier).min(self.max_delay_ms);
        Duration::from_millis(delay_ms)
    }
}

/// Source of interactions. `None` from [`next_interaction`](Self::next_interaction)
/// means the stream closed cleanly.
#[async_trait]
pub trait GatewayTransport: Send + Sync {
    async fn connect(&self) -> Result<(), TransportError>;
    async fn next_interaction(&self) -> Result<Option<InteractionEnvelope>, TransportError>;
    async fn acknowledge(&self, interaction_id: &str) -> Result<(), TransportError>;
    async fn disconnect(&self) -> Result<(), TransportError>;
}

/// Transport fed in-process, e.g. by the HTTP interactions endpoint.
pub struct ChannelTransport {
    receiver: Mutex<mpsc::Receiver<InteractionEnvelope>>,
}

impl ChannelTransport {
    pub fn new(capacity: usize) -> (mpsc::Sender<InteractionEnvelope>, Self) {
        let (sender, receiver) = mpsc::channel(capacity);
        (sender, Self { receiver: Mutex::new(receiver) })
    }
}

#[async_trait]
impl GatewayTransport for ChannelTransport {
    async fn connect(&self) -> Result<(), TransportError> {
        Ok(())
    }

    async fn next_interaction(&self) -> Result<Option<InteractionEnvelope>, TransportError> {
        Ok(self.receiver.lock().await.recv().await)
    }

    async fn acknowledge(&self, _interaction_id: &str) -> Result<(), TransportError> {
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        self.receiver.lock().await.close();
        Ok(())
    }
}

/// Pulls interactions one at a time, dispatches them and applies the
/// resulting effects. Handler failures become ephemeral error replies and
/// never stop the loop.
pub struct InteractionRunner {
    transport: Arc<dyn GatewayTransport>,
    dispatcher: EventDispatcher,
    executor: EffectExecutor,
    reconnect_policy: ReconnectPolicy,
}

impl InteractionRunner {
    pub fn new(
        transport: Arc<dyn GatewayTransport>,
        dispatcher: EventDispatcher,
        executor: EffectExecutor,
        reconnect_policy: ReconnectPolicy,
    ) -> Self {
        Self { transport, dispatcher, executor, reconnect_policy }
    }

    pub async fn start(&self) -> Result<()> {
        for attempt in 0..=self.reconnect_policy.max_retries {
            match self.connect_and_pump(attempt).await {
                Ok(()) => return Ok(()),
                Err(transport_error) => {
                    warn!(
                        attempt,
                        max_retries = self.reconnect_policy.max_retries,
                        error = %transport_error,
                        "gateway transport failed"
                    );

                    if attempt >= self.reconnect_policy.max_retries {
                        warn!(
                            max_retries = self.reconnect_policy.max_retries,
                            "gateway retries exhausted; continuing process without crash"
                        );
                        return Ok(());
                    }

                    let delay = self.reconnect_policy.backoff(attempt);
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        Ok(())
    }

    async fn connect_and_pump(&self, attempt: u32) -> Result<(), TransportError> {
        info!(attempt, "opening gateway transport connection");
        self.transport.connect().await?;
        info!(attempt, "gateway transport connected");

        loop {
            let Some(envelope) = self.transport.next_interaction().await? else {
                info!(attempt, "gateway transport stream closed");
                self.transport.disconnect().await?;
                return Ok(());
            };
            let correlation_id = envelope.interaction.id.clone();

            info!(
                event_name = "ingress.discord.interaction_received",
                correlation_id = %correlation_id,
                feature = ?envelope.event.feature(),
                interaction = envelope.event.label(),
                user_id = %envelope.actor.member.id,
                "received interaction"
            );

            if let Err(error) = self.transport.acknowledge(&correlation_id).await {
                warn!(
                    event_name = "ingress.discord.ack_sent",
                    correlation_id = %correlation_id,
                    error = %error,
                    "failed to acknowledge interaction"
                );
            } else {
                debug!(
                    event_name = "ingress.discord.ack_sent",
                    correlation_id = %correlation_id,
                    "acknowledged interaction"
                );
            }

            self.process(&envelope, &correlation_id).await;
        }
    }

    async fn process(&self, envelope: &InteractionEnvelope, correlation_id: &str) {
        let context = EventContext { correlation_id: correlation_id.to_owned() };
        let effects = match self.dispatcher.dispatch(envelope, &context).await {
            Ok(HandlerResult::Responded(effects)) => effects,
            Ok(HandlerResult::Ignored) => {
                debug!(
                    event_name = "interaction.ignored",
                    correlation_id = %correlation_id,
                    interaction = envelope.event.label(),
                    "no handler for interaction"
                );
                return;
            }
            Err(DispatchError::Handler(error)) => {
                warn!(
                    event_name = "interaction.failed",
                    correlation_id = %correlation_id,
                    interaction = envelope.event.label(),
                    error = %error,
                    "interaction handler failed; continuing gateway loop"
                );
                vec![Effect::Reply(error_message(&error.into_interface(correlation_id)))]
            }
        };

        let report = self.executor.execute(envelope, correlation_id, effects).await;
        debug!(
            event_name = "interaction.completed",
            correlation_id = %correlation_id,
            applied = report.applied,
            failed = report.failed,
            "interaction completed"
        );
    }
}
