//! Domain events published on the funnel event bus.
//!
//! All variants are Clone + Send + Sync for use with tokio broadcast channels.

use serde::{Deserialize, Serialize};

use crate::classification::LeadCategory;
use crate::conversation::Stage;
use crate::credentials::CredentialKind;
use crate::escalation::{EscalationKind, Urgency};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FunnelEvent {
    /// A conversation moved between stages.
    StageChanged {
        user_id: String,
        from: Stage,
        to: Stage,
        category: LeadCategory,
    },

    /// The escalation evaluator (or the dispatcher fail-safe) fired.
    Escalated {
        user_id: String,
        kind: EscalationKind,
        urgency: Urgency,
        reason: String,
    },

    /// The handover sub-dialogue produced its summary and the user is now
    /// waiting for a human.
    HandoverCompleted {
        user_id: String,
        kind: EscalationKind,
        summary: String,
    },

    /// Credentials were issued.
    TrialIssued { user_id: String, kind: CredentialKind },

    /// Payment confirmed, the user is now an active customer.
    Converted { user_id: String, plan: Option<String> },

    /// A referral phone number was captured.
    ReferralCaptured { user_id: String, referral: String },

    /// An operator handed the conversation back to the bot.
    TakeoverReleased { user_id: String, resumed: Stage },
}

impl FunnelEvent {
    pub fn user_id(&self) -> &str {
        match self {
            FunnelEvent::StageChanged { user_id, .. }
            | FunnelEvent::Escalated { user_id, .. }
            | FunnelEvent::HandoverCompleted { user_id, .. }
            | FunnelEvent::TrialIssued { user_id, .. }
            | FunnelEvent::Converted { user_id, .. }
            | FunnelEvent::ReferralCaptured { user_id, .. }
            | FunnelEvent::TakeoverReleased { user_id, .. } => user_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_type_tag() {
        let event = FunnelEvent::Converted {
            user_id: "u1".to_string(),
            plan: Some("anual".to_string()),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "converted");
        assert_eq!(json["plan"], "anual");
        assert_eq!(event.user_id(), "u1");
    }
}
