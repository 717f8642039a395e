//! HTTP request handlers.

pub mod conversation;
pub mod stats;
pub mod webhook;
