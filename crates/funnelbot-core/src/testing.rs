//! In-memory collaborators for unit tests.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use chrono::Utc;
use dashmap::{DashMap, DashSet};
use funnelbot_types::config::Plan;
use funnelbot_types::contact::ContactRecord;
use funnelbot_types::credentials::Credentials;
use funnelbot_types::error::{ContactStoreError, IssuerError, TransportError};

use crate::port::{ChatTransport, ContactStore, CredentialIssuer};

#[derive(Debug, Default)]
pub struct MemoryContacts {
    pub records: DashMap<String, ContactRecord>,
}

impl MemoryContacts {
    pub fn tags(&self, user_id: &str) -> Vec<String> {
        self.records
            .get(user_id)
            .map(|r| r.tags.clone())
            .unwrap_or_default()
    }
}

impl ContactStore for MemoryContacts {
    async fn get_or_create(&self, user_id: &str) -> Result<ContactRecord, ContactStoreError> {
        Ok(self
            .records
            .entry(user_id.to_string())
            .or_insert_with(|| ContactRecord::new(user_id, Utc::now()))
            .clone())
    }

    async fn set_tags(&self, user_id: &str, tags: Vec<String>) -> Result<(), ContactStoreError> {
        let mut record = self
            .records
            .entry(user_id.to_string())
            .or_insert_with(|| ContactRecord::new(user_id, Utc::now()));
        record.tags = tags;
        Ok(())
    }
}

/// Issues sequential credentials; can be switched to fail.
#[derive(Debug, Default)]
pub struct SequenceIssuer {
    pub issued: AtomicU32,
    pub fail: AtomicBool,
}

impl SequenceIssuer {
    pub fn failing() -> Self {
        let issuer = Self::default();
        issuer.fail.store(true, Ordering::SeqCst);
        issuer
    }

    fn next(&self, prefix: &str) -> Result<Credentials, IssuerError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(IssuerError::Unavailable("panel offline".to_string()));
        }
        let n = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(Credentials::new(
            format!("{prefix}{n:06}"),
            format!("PW{n:06}"),
            "http://vip.hobtv.pro",
        ))
    }
}

impl CredentialIssuer for SequenceIssuer {
    async fn issue_trial(&self) -> Result<Credentials, IssuerError> {
        self.next("TESTE_")
    }

    async fn issue_definitive(&self, plan: &Plan) -> Result<Credentials, IssuerError> {
        self.next(&format!("{}_", plan.key))
    }
}

/// Records every message; can be switched to fail or to hang per user.
#[derive(Debug, Default)]
pub struct RecordingTransport {
    pub sent: Mutex<Vec<(String, String)>>,
    pub fail: AtomicBool,
    /// Sends to these users never complete.
    pub stalled: DashSet<String>,
}

impl RecordingTransport {
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn texts_to(&self, user_id: &str) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter(|(u, _)| u == user_id)
            .map(|(_, t)| t)
            .collect()
    }
}

impl ChatTransport for RecordingTransport {
    async fn send(&self, user_id: &str, text: &str) -> Result<(), TransportError> {
        if self.stalled.contains(user_id) {
            std::future::pending::<()>().await;
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(TransportError::RetriesExhausted {
                attempts: 3,
                last_error: "connection reset".to_string(),
            });
        }
        self.sent
            .lock()
            .unwrap()
            .push((user_id.to_string(), text.to_string()));
        Ok(())
    }
}
