//! The funnel service: transport in, transport out.
//!
//! Wraps the [`Dispatcher`] with delivery concerns: dropping messages that
//! must not be answered, sending the primary reply inline, delaying
//! follow-ups behind the takeover barrier, scheduling the teaser, and
//! routing transport events through per-user lanes.

use std::sync::Arc;
use std::time::Duration;

use funnelbot_types::conversation::{ConversationState, Stage};
use funnelbot_types::event::FunnelEvent;
use funnelbot_types::message::{InboundMessage, OutboundKind, OutboundMessage, TransportEvent};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::conversation::lanes::DEFAULT_IDLE_TIMEOUT;
use crate::conversation::{
    ConversationStore, DispatchOutcome, Dispatcher, FollowUpScheduler, InboundHandler, LaneError, UserLanes,
};
use crate::metrics::FunnelMetrics;
use crate::port::{ChatTransport, Clock, ContactStore, CredentialIssuer};

pub struct FunnelService<T, C, I> {
    dispatcher: Arc<Dispatcher<C, I>>,
    transport: Arc<T>,
    clock: Arc<dyn Clock>,
    followups: FollowUpScheduler,
}

impl<T, C, I> FunnelService<T, C, I>
where
    T: ChatTransport + 'static,
    C: ContactStore + 'static,
    I: CredentialIssuer + 'static,
{
    pub fn new(dispatcher: Arc<Dispatcher<C, I>>, transport: Arc<T>, clock: Arc<dyn Clock>) -> Self {
        Self {
            dispatcher,
            transport,
            clock,
            followups: FollowUpScheduler::new(),
        }
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher<C, I>> {
        &self.dispatcher
    }

    pub fn metrics(&self) -> &Arc<FunnelMetrics> {
        self.dispatcher.metrics()
    }

    pub fn followups(&self) -> &FollowUpScheduler {
        &self.followups
    }

    pub async fn snapshot(&self, user_id: &str) -> Option<ConversationState> {
        self.dispatcher.store().snapshot(user_id).await
    }

    /// Handle one inbound message end to end.
    pub async fn handle_message(&self, message: InboundMessage) {
        let metrics = self.metrics();
        metrics.record_inbound();

        if !message.is_dispatchable() {
            metrics.record_ignored();
            debug!(user_id = %message.user_id, from_me = message.from_me, "ignoring message");
            return;
        }

        // Any message from the user cancels the pending teaser.
        self.followups.cancel(&message.user_id);

        let outcome = self.dispatcher.dispatch(&message, self.clock.now()).await;
        self.deliver(&message.user_id, outcome).await;
    }

    /// Hand a taken-over conversation back to the bot.
    pub async fn release(&self, user_id: &str) -> Option<Stage> {
        let resumed = self.dispatcher.store().release(user_id, self.clock.now()).await?;
        info!(user_id, resumed = %resumed, "takeover released");
        self.dispatcher.events().publish(FunnelEvent::TakeoverReleased {
            user_id: user_id.to_string(),
            resumed,
        });
        Some(resumed)
    }

    /// Consume transport events until the stream ends or `shutdown` fires.
    pub async fn run(self: Arc<Self>, mut events: mpsc::Receiver<TransportEvent>, shutdown: CancellationToken) {
        let lanes = UserLanes::new(Arc::clone(&self), DEFAULT_IDLE_TIMEOUT);
        info!("funnel service started");

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("funnel service shutting down");
                    break;
                }
                event = events.recv() => match event {
                    Some(TransportEvent::Ready) => info!("transport ready"),
                    Some(TransportEvent::Disconnected { reason }) => {
                        warn!(%reason, "transport disconnected");
                    }
                    Some(TransportEvent::Message(message)) => match lanes.submit(message) {
                        Ok(()) => {}
                        Err(LaneError::Full(user_id)) => {
                            warn!(%user_id, "user lane full, dropping inbound message");
                            self.metrics().record_lane_overflow();
                        }
                        Err(err) => error!(error = %err, "failed to queue inbound message"),
                    },
                    None => {
                        info!("transport event stream closed");
                        break;
                    }
                },
            }
        }
    }

    async fn deliver(&self, user_id: &str, outcome: DispatchOutcome) {
        let metrics = self.metrics();
        let mut reply_failed = false;
        let mut follow_ups = Vec::new();

        for message in outcome.messages {
            match message.kind {
                OutboundKind::Reply => match self.transport.send(&message.user_id, &message.text).await {
                    Ok(()) => metrics.record_sent(),
                    Err(err) => {
                        warn!(user_id, turn = message.turn, error = %err, "reply not delivered");
                        metrics.record_send_failure();
                        self.dispatcher.revert_turn(user_id, message.turn).await;
                        reply_failed = true;
                    }
                },
                OutboundKind::Handoff => match self.transport.send(&message.user_id, &message.text).await {
                    Ok(()) => {
                        metrics.record_sent();
                        info!(user_id, attendant = %message.user_id, "handover summary sent");
                    }
                    Err(err) => {
                        metrics.record_send_failure();
                        error!(user_id, attendant = %message.user_id, error = %err, "handover summary not delivered");
                    }
                },
                OutboundKind::FollowUp | OutboundKind::Deferred => follow_ups.push(message),
            }
        }

        if reply_failed {
            return;
        }

        let (deferred, follow_ups): (Vec<_>, Vec<_>) = follow_ups
            .into_iter()
            .chain(outcome.deferred)
            .partition(|m| m.kind == OutboundKind::Deferred);

        if !follow_ups.is_empty() {
            let transport = Arc::clone(&self.transport);
            let store = Arc::clone(self.dispatcher.store());
            let metrics = Arc::clone(metrics);
            tokio::spawn(async move {
                for message in follow_ups {
                    tokio::time::sleep(Duration::from_millis(message.delay_ms)).await;
                    send_if_current(transport.as_ref(), &store, &metrics, &message).await;
                }
            });
        }

        for message in deferred {
            let transport = Arc::clone(&self.transport);
            let store = Arc::clone(self.dispatcher.store());
            let metrics = Arc::clone(metrics);
            let delay = Duration::from_millis(message.delay_ms);
            let job_id = self.followups.schedule(user_id, delay, async move {
                send_if_current(transport.as_ref(), &store, &metrics, &message).await;
            });
            debug!(user_id, %job_id, delay_ms = delay.as_millis() as u64, "deferred message scheduled");
        }
    }
}

impl<T, C, I> InboundHandler for FunnelService<T, C, I>
where
    T: ChatTransport + 'static,
    C: ContactStore + 'static,
    I: CredentialIssuer + 'static,
{
    async fn handle(&self, message: InboundMessage) {
        self.handle_message(message).await;
    }
}

impl<T, C, I> std::fmt::Debug for FunnelService<T, C, I> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunnelService")
            .field("dispatcher", &self.dispatcher)
            .field("pending_followups", &self.followups.pending_count())
            .finish_non_exhaustive()
    }
}

/// Check-then-send: a message composed before a takeover is dropped.
async fn send_if_current<T: ChatTransport>(
    transport: &T,
    store: &ConversationStore,
    metrics: &FunnelMetrics,
    message: &OutboundMessage,
) {
    if !store.may_deliver(&message.user_id, message.turn).await {
        debug!(user_id = %message.user_id, turn = message.turn, kind = %message.kind, "suppressed after takeover");
        metrics.record_suppressed();
        return;
    }
    match transport.send(&message.user_id, &message.text).await {
        Ok(()) => metrics.record_sent(),
        Err(err) => {
            warn!(user_id = %message.user_id, kind = %message.kind, error = %err, "delayed message not delivered");
            metrics.record_send_failure();
        }
    }
}
