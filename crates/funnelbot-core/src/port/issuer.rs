//! Credential issuer port.

use funnelbot_types::config::Plan;
use funnelbot_types::credentials::Credentials;
use funnelbot_types::error::IssuerError;

pub trait CredentialIssuer: Send + Sync {
    /// Throwaway trial login.
    fn issue_trial(&self) -> impl std::future::Future<Output = Result<Credentials, IssuerError>> + Send;

    /// Permanent login for a paid plan.
    fn issue_definitive(
        &self,
        plan: &Plan,
    ) -> impl std::future::Future<Output = Result<Credentials, IssuerError>> + Send;
}
