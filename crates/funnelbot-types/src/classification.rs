//! Lead and profile classification result types.

use serde::{Deserialize, Serialize};

use std::fmt;
use std::str::FromStr;

/// Coarse lead category assigned to every inbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LeadCategory {
    /// Prospect evaluating a purchase.
    Buyer,
    /// Existing subscriber, usually asking for support or renewal.
    Customer,
    Undefined,
}

impl Default for LeadCategory {
    fn default() -> Self {
        LeadCategory::Undefined
    }
}

impl fmt::Display for LeadCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LeadCategory::Buyer => write!(f, "BUYER"),
            LeadCategory::Customer => write!(f, "CUSTOMER"),
            LeadCategory::Undefined => write!(f, "UNDEFINED"),
        }
    }
}

impl FromStr for LeadCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "BUYER" => Ok(LeadCategory::Buyer),
            "CUSTOMER" => Ok(LeadCategory::Customer),
            "UNDEFINED" => Ok(LeadCategory::Undefined),
            other => Err(format!("unknown lead category: '{other}'")),
        }
    }
}

/// Five-way behavioural profile used to tune tone and tag contacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CustomerProfile {
    /// Renewing customer who refers friends.
    Loyal,
    /// Price-sensitive lead pushing for discounts.
    Negotiator,
    /// Wants to test before committing.
    Cautious,
    /// Asks how everything works.
    Questioner,
    /// Talks about apps, URLs and logins.
    Technical,
}

impl CustomerProfile {
    pub const ALL: [CustomerProfile; 5] = [
        CustomerProfile::Loyal,
        CustomerProfile::Negotiator,
        CustomerProfile::Cautious,
        CustomerProfile::Questioner,
        CustomerProfile::Technical,
    ];

    /// Contact tag applied when the profile is detected with enough confidence.
    pub fn tag(&self) -> &'static str {
        match self {
            CustomerProfile::Loyal => "Perfil Fiel",
            CustomerProfile::Negotiator => "Perfil Negociador",
            CustomerProfile::Cautious => "Perfil Cauteloso",
            CustomerProfile::Questioner => "Perfil Questionador",
            CustomerProfile::Technical => "Perfil Tecnico",
        }
    }
}

impl fmt::Display for CustomerProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CustomerProfile::Loyal => write!(f, "FIEL"),
            CustomerProfile::Negotiator => write!(f, "NEGOCIADOR"),
            CustomerProfile::Cautious => write!(f, "CAUTELOSO"),
            CustomerProfile::Questioner => write!(f, "QUESTIONADOR"),
            CustomerProfile::Technical => write!(f, "TECNICO"),
        }
    }
}

impl FromStr for CustomerProfile {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "FIEL" | "LOYAL" => Ok(CustomerProfile::Loyal),
            "NEGOCIADOR" | "NEGOTIATOR" => Ok(CustomerProfile::Negotiator),
            "CAUTELOSO" | "CAUTIOUS" => Ok(CustomerProfile::Cautious),
            "QUESTIONADOR" | "QUESTIONER" => Ok(CustomerProfile::Questioner),
            "TECNICO" | "TECHNICAL" => Ok(CustomerProfile::Technical),
            other => Err(format!("unknown customer profile: '{other}'")),
        }
    }
}

/// Attention priority derived from the message wording.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Medium
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Priority::Low => write!(f, "low"),
            Priority::Medium => write!(f, "medium"),
            Priority::High => write!(f, "high"),
        }
    }
}

/// Slots pulled out of a single message by the extractor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedSlots {
    pub device: Option<String>,
    pub app: Option<String>,
    pub problem: Option<String>,
    pub intent: Option<String>,
}

impl ExtractedSlots {
    pub fn is_empty(&self) -> bool {
        self.device.is_none() && self.app.is_none() && self.problem.is_none() && self.intent.is_none()
    }
}

/// Outcome of lead classification for one message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub category: LeadCategory,
    /// 0..=100.
    pub confidence: u8,
    pub priority: Priority,
    pub extracted_slots: ExtractedSlots,
    /// Rule identifiers that fired, for logging.
    #[serde(default)]
    pub matched_rules: Vec<String>,
}

/// Outcome of profile classification for one message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileResult {
    pub profile: CustomerProfile,
    /// 0..=100.
    pub confidence: u8,
}
