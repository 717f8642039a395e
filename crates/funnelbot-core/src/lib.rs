//! Conversation engine for the sales and support funnel.
//!
//! This crate holds the classifiers, the funnel state machine, escalation,
//! response composition and the ports (traits) that the infrastructure layer
//! implements. It depends only on `funnelbot-types`, never on
//! `funnelbot-infra` or any network or storage crate.

pub mod classify;
pub mod compose;
pub mod conversation;
pub mod escalation;
pub mod event;
pub mod metrics;
pub mod port;
pub mod service;
pub mod text;

#[cfg(test)]
pub(crate) mod testing;
