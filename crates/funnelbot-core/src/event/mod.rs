//! Funnel event bus.
//!
//! Provides an `EventBus` that distributes `FunnelEvent` messages to all
//! subscribers via a `tokio::sync::broadcast` channel.

pub mod bus;

pub use bus::EventBus;
