//! Shared domain types for funnelbot.
//!
//! This crate contains the domain types used across the workspace:
//! conversation stages and per-user state, classification results,
//! escalation decisions, credentials, contacts, transport messages,
//! funnel events, configuration, and their associated error types.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod classification;
pub mod config;
pub mod contact;
pub mod conversation;
pub mod credentials;
pub mod error;
pub mod escalation;
pub mod event;
pub mod message;
