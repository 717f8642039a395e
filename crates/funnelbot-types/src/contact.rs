//! Contact record kept by the CRM collaborator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Well-known contact tags applied by the dispatcher.
pub mod tags {
    pub const BUYER: &str = "Comprador";
    pub const CUSTOMER: &str = "Cliente";
    pub const HOT_LEAD: &str = "Lead Quente";
    pub const ACTIVE_CUSTOMER: &str = "Cliente Ativo";
    pub const HUMAN_SUPPORT: &str = "Atendimento Humano";
    pub const REFERRED_FRIEND: &str = "Indicou Amigo";
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactRecord {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ContactRecord {
    pub fn new(id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            name: None,
            tags: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// Add a tag unless already present. Returns true if the tag was added.
    pub fn add_tag(&mut self, tag: &str) -> bool {
        if self.has_tag(tag) {
            return false;
        }
        self.tags.push(tag.to_string());
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_tag_is_idempotent() {
        let mut contact = ContactRecord::new("5511999990000@c.us", Utc::now());
        assert!(contact.add_tag(tags::BUYER));
        assert!(!contact.add_tag(tags::BUYER));
        assert_eq!(contact.tags, vec![tags::BUYER.to_string()]);
    }
}
