//! In-process credential generator.

use std::sync::Mutex;

use dashmap::DashSet;
use funnelbot_core::port::CredentialIssuer;
use funnelbot_types::config::{IssuerConfig, Plan};
use funnelbot_types::credentials::Credentials;
use funnelbot_types::error::IssuerError;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Unambiguous characters for passwords (no 0/O, 1/I).
const PASSWORD_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
const TRIAL_PASSWORD_LEN: usize = 8;
const ACCOUNT_PASSWORD_LEN: usize = 10;
const DEFAULT_MAX_ATTEMPTS: u32 = 20;

/// Generates `{prefix}{6 digits}` usernames that never repeat within the
/// process lifetime.
#[derive(Debug)]
pub struct LocalIssuer {
    config: IssuerConfig,
    rng: Mutex<StdRng>,
    issued: DashSet<String>,
    max_attempts: u32,
}

impl LocalIssuer {
    pub fn new(config: IssuerConfig) -> Self {
        Self::with_rng(config, StdRng::from_entropy())
    }

    /// Deterministic issuer for tests and the simulator.
    pub fn seeded(config: IssuerConfig, seed: u64) -> Self {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: IssuerConfig, rng: StdRng) -> Self {
        Self {
            config,
            rng: Mutex::new(rng),
            issued: DashSet::new(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Mark a username as taken (e.g. one already handed out elsewhere).
    pub fn reserve(&self, username: impl Into<String>) {
        self.issued.insert(username.into());
    }

    pub fn issued_count(&self) -> usize {
        self.issued.len()
    }

    fn generate(&self, prefix: &str, password_len: usize) -> Result<Credentials, IssuerError> {
        let mut rng = match self.rng.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        for _ in 0..self.max_attempts {
            let username = format!("{prefix}{:06}", rng.gen_range(0..1_000_000u32));
            if !self.issued.insert(username.clone()) {
                continue;
            }
            let password: String = (0..password_len)
                .map(|_| PASSWORD_ALPHABET[rng.gen_range(0..PASSWORD_ALPHABET.len())] as char)
                .collect();
            return Ok(Credentials::new(username, password, self.config.server_url.clone()));
        }

        tracing::warn!(prefix, attempts = self.max_attempts, "username space exhausted");
        Err(IssuerError::Exhausted(self.max_attempts))
    }
}

impl CredentialIssuer for LocalIssuer {
    async fn issue_trial(&self) -> Result<Credentials, IssuerError> {
        let credentials = self.generate(&self.config.trial_prefix, TRIAL_PASSWORD_LEN)?;
        tracing::info!(username = %credentials.username, "trial credentials issued");
        Ok(credentials)
    }

    async fn issue_definitive(&self, plan: &Plan) -> Result<Credentials, IssuerError> {
        let credentials = self.generate(&self.config.account_prefix, ACCOUNT_PASSWORD_LEN)?;
        tracing::info!(username = %credentials.username, plan = %plan.key, "account credentials issued");
        Ok(credentials)
    }
}
