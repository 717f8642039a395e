//! HTTP surface: inbound webhook, conversation inspection and release,
//! metrics and health, all under `/api/v1/`.

pub mod error;
pub mod handlers;
pub mod response;
pub mod router;
