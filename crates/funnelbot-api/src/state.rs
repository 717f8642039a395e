//! Application state wiring the funnel together.
//!
//! AppState pins the generic [`FunnelService`] to the concrete infra
//! implementations and holds what the HTTP handlers need: the service, the
//! inbound event sender feeding its run loop, and the webhook secret.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use funnelbot_core::compose::{OfferCooldown, ResponseComposer, TemplateCatalog, ThreadRandom};
use funnelbot_core::conversation::{ConversationStore, Dispatcher};
use funnelbot_core::event::EventBus;
use funnelbot_core::metrics::FunnelMetrics;
use funnelbot_core::port::{ChatTransport, CredentialIssuer, SystemClock};
use funnelbot_core::service::FunnelService;
use funnelbot_infra::config::{load_funnel_config, panel_api_key, webhook_secret};
use funnelbot_infra::contact::JsonContactStore;
use funnelbot_infra::issuer::{AnyIssuer, create_issuer};
use funnelbot_infra::transport::{AnyTransport, create_transport};
use funnelbot_types::config::FunnelConfig;
use funnelbot_types::message::TransportEvent;
use secrecy::SecretString;
use tokio::sync::mpsc;

/// Capacity of the inbound event queue between the webhook and the run loop.
pub const INBOUND_QUEUE: usize = 256;

pub type ConcreteDispatcher<I> = Dispatcher<JsonContactStore, I>;
pub type ConcreteFunnelService = FunnelService<AnyTransport, JsonContactStore, AnyIssuer>;

/// Shared state for the HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<ConcreteFunnelService>,
    pub inbound: mpsc::Sender<TransportEvent>,
    pub webhook_secret: Option<Arc<SecretString>>,
    pub data_dir: PathBuf,
    pub started_at: Instant,
}

impl AppState {
    /// Load config, open the contact store, build the issuer and transport.
    ///
    /// Returns the state and the receiving end of the inbound queue, which the
    /// caller hands to [`FunnelService::run`].
    pub async fn init(data_dir: PathBuf) -> anyhow::Result<(Self, mpsc::Receiver<TransportEvent>)> {
        tokio::fs::create_dir_all(&data_dir)
            .await
            .with_context(|| format!("creating data directory {}", data_dir.display()))?;

        let config = Arc::new(load_funnel_config(&data_dir).await);
        let contacts = Arc::new(JsonContactStore::open_in(&data_dir).await?);
        let issuer = Arc::new(create_issuer(&config.issuer, panel_api_key())?);
        let transport = Arc::new(create_transport(&config.transport)?);

        let dispatcher = build_dispatcher(Arc::clone(&config), contacts, issuer)?;
        let service = Arc::new(FunnelService::new(Arc::new(dispatcher), transport, Arc::new(SystemClock)));

        let secret = webhook_secret();
        if secret.is_none() {
            tracing::warn!("no webhook secret configured, inbound webhook accepts unsigned requests");
        }

        Ok(Self::from_parts(service, secret, data_dir))
    }

    pub fn from_parts(
        service: Arc<ConcreteFunnelService>,
        webhook_secret: Option<SecretString>,
        data_dir: PathBuf,
    ) -> (Self, mpsc::Receiver<TransportEvent>) {
        let (inbound, events) = mpsc::channel(INBOUND_QUEUE);
        let state = Self {
            service,
            inbound,
            webhook_secret: webhook_secret.map(Arc::new),
            data_dir,
            started_at: Instant::now(),
        };
        (state, events)
    }
}

/// Wire a dispatcher over `contacts` and `issuer` with the production
/// composer (thread-random phrasing, shared offer cooldown).
pub fn build_dispatcher<I>(
    config: Arc<FunnelConfig>,
    contacts: Arc<JsonContactStore>,
    issuer: Arc<I>,
) -> anyhow::Result<ConcreteDispatcher<I>>
where
    I: CredentialIssuer,
{
    let catalog = TemplateCatalog::with_overrides(&config.templates).context("loading template overrides")?;
    let composer = Arc::new(ResponseComposer::new(
        catalog,
        Arc::new(ThreadRandom),
        Arc::new(OfferCooldown::new(config.timing.offer_cooldown_hours)),
    ));

    let events = EventBus::default();
    spawn_event_logger(&events);

    Ok(Dispatcher::new(
        config,
        Arc::new(ConversationStore::new()),
        composer,
        contacts,
        issuer,
        events,
        Arc::new(FunnelMetrics::new()),
    ))
}

/// Log every funnel event at info level.
fn spawn_event_logger(events: &EventBus) {
    let mut rx = events.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => {
                    tracing::info!(user_id = event.user_id(), event = ?event, "funnel event");
                }
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "event logger lagged");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });
}

/// Service over an arbitrary transport; used by the simulator.
pub fn build_service<T, I>(
    dispatcher: ConcreteDispatcher<I>,
    transport: Arc<T>,
) -> FunnelService<T, JsonContactStore, I>
where
    T: ChatTransport + 'static,
    I: CredentialIssuer + 'static,
{
    FunnelService::new(Arc::new(dispatcher), transport, Arc::new(SystemClock))
}
