//! Escalation decision and handover sub-dialogue types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use std::fmt;

/// Why a conversation is routed to a human.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EscalationKind {
    /// Cancellation, legal threat or strong dissatisfaction.
    Immediate,
    /// Repeated "still not working" after the bot already tried.
    ComplexSupport,
    /// Bulk, business or custom-pricing request.
    SpecialSales,
    /// The bot has had several tries and still cannot tell what the user wants.
    LowConfidence,
}

impl EscalationKind {
    pub const ALL: [EscalationKind; 4] = [
        EscalationKind::Immediate,
        EscalationKind::ComplexSupport,
        EscalationKind::SpecialSales,
        EscalationKind::LowConfidence,
    ];
}

impl fmt::Display for EscalationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EscalationKind::Immediate => write!(f, "IMMEDIATE"),
            EscalationKind::ComplexSupport => write!(f, "COMPLEX_SUPPORT"),
            EscalationKind::SpecialSales => write!(f, "SPECIAL_SALES"),
            EscalationKind::LowConfidence => write!(f, "LOW_CONFIDENCE"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Low,
    Medium,
    High,
}

impl Default for Urgency {
    fn default() -> Self {
        Urgency::Low
    }
}

impl fmt::Display for Urgency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Urgency::Low => write!(f, "BAIXA"),
            Urgency::Medium => write!(f, "MEDIA"),
            Urgency::High => write!(f, "ALTA"),
        }
    }
}

/// Result of evaluating one message for escalation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscalationDecision {
    pub must_escalate: bool,
    pub kind: Option<EscalationKind>,
    pub urgency: Urgency,
    /// Short machine-friendly reason, e.g. the keyword that fired.
    pub reason: String,
    /// Filled once the handover sub-dialogue has collected everything.
    pub human_summary: Option<String>,
}

impl EscalationDecision {
    pub fn none() -> Self {
        Self {
            must_escalate: false,
            kind: None,
            urgency: Urgency::Low,
            reason: String::new(),
            human_summary: None,
        }
    }

    pub fn escalate(kind: EscalationKind, urgency: Urgency, reason: impl Into<String>) -> Self {
        Self {
            must_escalate: true,
            kind: Some(kind),
            urgency,
            reason: reason.into(),
            human_summary: None,
        }
    }
}

/// Which collection script the handover sub-dialogue runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandoverFlow {
    /// Name, device, content interest.
    Sales,
    /// Technical details, last time it worked.
    Support,
}

impl fmt::Display for HandoverFlow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandoverFlow::Sales => write!(f, "vendas"),
            HandoverFlow::Support => write!(f, "suporte"),
        }
    }
}

/// Micro-stage of the handover sub-dialogue. Each variant names the answer
/// the bot is waiting for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandoverStep {
    AwaitName,
    AwaitDevice,
    AwaitInterest,
    AwaitTechnicalDetails,
    AwaitLastWorking,
}

/// Answers gathered by the handover sub-dialogue.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandoverAnswers {
    pub name: Option<String>,
    pub device: Option<String>,
    pub interest: Option<String>,
    pub technical_details: Option<String>,
    pub last_working: Option<String>,
}

/// Resumable handover progress stored on the conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandoverProgress {
    pub kind: EscalationKind,
    pub urgency: Urgency,
    pub reason: String,
    pub flow: HandoverFlow,
    pub step: HandoverStep,
    pub answers: HandoverAnswers,
    pub started_at: DateTime<Utc>,
}
