//! Credentials handed to a user for a trial or a paid account.

use serde::{Deserialize, Serialize};

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialKind {
    Trial,
    Definitive,
}

impl fmt::Display for CredentialKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialKind::Trial => write!(f, "trial"),
            CredentialKind::Definitive => write!(f, "definitive"),
        }
    }
}

/// Access credentials rendered verbatim into message text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
    pub url: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            url: url.into(),
        }
    }

    pub fn is_complete(&self) -> bool {
        !self.username.is_empty() && !self.password.is_empty() && !self.url.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completeness_requires_all_fields() {
        assert!(Credentials::new("teste_123456", "ABCD1234", "http://vip.hobtv.pro").is_complete());
        assert!(!Credentials::new("", "ABCD1234", "http://vip.hobtv.pro").is_complete());
    }
}
