//! Ports to external collaborators.
//!
//! Implementations live in funnelbot-infra (and in test doubles). Traits use
//! native async fn in traits (Rust 2024 edition, no async_trait macro).

pub mod clock;
pub mod contact;
pub mod issuer;
pub mod transport;

pub use clock::{Clock, ManualClock, SystemClock};
pub use contact::ContactStore;
pub use issuer::CredentialIssuer;
pub use transport::ChatTransport;
