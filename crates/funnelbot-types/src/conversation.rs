//! Conversation stage, collected slots, and the per-user state aggregate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use std::fmt;
use std::str::FromStr;

use crate::classification::ExtractedSlots;
use crate::credentials::Credentials;
use crate::escalation::HandoverProgress;

/// Position of a user inside the sales and support funnel.
///
/// The sales funnel runs START -> QUALIFYING -> DEVICE_SELECTION ->
/// APP_INSTALL_WAIT -> TRIAL_ISSUED -> PLAN_PRESENTED -> PAYMENT_PENDING ->
/// ACTIVE_CUSTOMER. SUPPORT and REFERRAL_COLLECTION are side flows,
/// HANDOVER_COLLECTION is the escalation sub-dialogue and HUMAN_TAKEOVER is
/// terminal until released by an operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Stage {
    Start,
    Qualifying,
    DeviceSelection,
    AppInstallWait,
    TrialIssued,
    PlanPresented,
    PaymentPending,
    ActiveCustomer,
    Support,
    ReferralCollection,
    HandoverCollection,
    HumanTakeover,
}

impl Stage {
    /// All stages in funnel order.
    pub const ALL: [Stage; 12] = [
        Stage::Start,
        Stage::Qualifying,
        Stage::DeviceSelection,
        Stage::AppInstallWait,
        Stage::TrialIssued,
        Stage::PlanPresented,
        Stage::PaymentPending,
        Stage::ActiveCustomer,
        Stage::Support,
        Stage::ReferralCollection,
        Stage::HandoverCollection,
        Stage::HumanTakeover,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Start => "START",
            Stage::Qualifying => "QUALIFYING",
            Stage::DeviceSelection => "DEVICE_SELECTION",
            Stage::AppInstallWait => "APP_INSTALL_WAIT",
            Stage::TrialIssued => "TRIAL_ISSUED",
            Stage::PlanPresented => "PLAN_PRESENTED",
            Stage::PaymentPending => "PAYMENT_PENDING",
            Stage::ActiveCustomer => "ACTIVE_CUSTOMER",
            Stage::Support => "SUPPORT",
            Stage::ReferralCollection => "REFERRAL_COLLECTION",
            Stage::HandoverCollection => "HANDOVER_COLLECTION",
            Stage::HumanTakeover => "HUMAN_TAKEOVER",
        }
    }

    /// Whether the stage belongs to the escalation path.
    pub fn is_escalation(&self) -> bool {
        matches!(self, Stage::HandoverCollection | Stage::HumanTakeover)
    }
}

impl Default for Stage {
    fn default() -> Self {
        Stage::Start
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_uppercase().replace('-', "_");
        Stage::ALL
            .iter()
            .copied()
            .find(|stage| stage.as_str() == normalized)
            .ok_or_else(|| format!("unknown stage: '{s}'"))
    }
}

/// Slot values gathered over the whole conversation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectedSlots {
    pub device: Option<String>,
    pub app: Option<String>,
    pub declared_problem: Option<String>,
    pub intent: Option<String>,
    /// Key of the plan picked in PLAN_PRESENTED.
    pub chosen_plan: Option<String>,
    pub referral_number: Option<String>,
}

impl CollectedSlots {
    /// Merge freshly extracted slots. A new value overwrites the old one for
    /// the same key; absent values leave the stored value alone.
    pub fn merge(&mut self, extracted: &ExtractedSlots) {
        if let Some(device) = &extracted.device {
            self.device = Some(device.clone());
        }
        if let Some(app) = &extracted.app {
            self.app = Some(app.clone());
        }
        if let Some(problem) = &extracted.problem {
            self.declared_problem = Some(problem.clone());
        }
        if let Some(intent) = &extracted.intent {
            self.intent = Some(intent.clone());
        }
    }
}

/// Who authored a history entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Inbound,
    Outbound,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Inbound => write!(f, "cliente"),
            Direction::Outbound => write!(f, "bot"),
        }
    }
}

/// One message in the bounded per-user history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub direction: Direction,
    pub text: String,
    /// True for bot-authored replies.
    pub automated: bool,
    pub at: DateTime<Utc>,
}

/// Per-user conversation aggregate.
///
/// Created on the first inbound message from a user id and mutated only by
/// the dispatcher while it holds that user's lock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationState {
    pub user_id: String,
    pub stage: Stage,
    pub collected_slots: CollectedSlots,
    /// Incremented once per turn that produced a bot-authored reply.
    pub automated_turn_count: u32,
    /// Once set, no automated reply is composed until an operator releases it.
    pub human_takeover: bool,
    /// Turn in which the takeover happened; replies composed in any other
    /// turn are suppressed at send time.
    pub takeover_turn: Option<u32>,
    /// Stage held before the escalation path was entered.
    pub resume_stage: Option<Stage>,
    /// Progress of the handover sub-dialogue while in HANDOVER_COLLECTION.
    pub handover: Option<HandoverProgress>,
    /// Summary block handed to the human attendant.
    pub handover_summary: Option<String>,
    /// Consecutive unrecognized answers in the current stage.
    pub reprompt_count: u32,
    /// Persuasion replies sent after a "no" in QUALIFYING.
    pub persuasion_attempts: u32,
    pub trial_credentials: Option<Credentials>,
    pub account_credentials: Option<Credentials>,
    pub history: Vec<HistoryEntry>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ConversationState {
    pub fn new(user_id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            user_id: user_id.into(),
            stage: Stage::Start,
            collected_slots: CollectedSlots::default(),
            automated_turn_count: 0,
            human_takeover: false,
            takeover_turn: None,
            resume_stage: None,
            handover: None,
            handover_summary: None,
            reprompt_count: 0,
            persuasion_attempts: 0,
            trial_credentials: None,
            account_credentials: None,
            history: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether anything was exchanged before the current message.
    pub fn has_history(&self) -> bool {
        !self.history.is_empty()
    }

    /// Append an entry, keeping at most `limit` entries.
    pub fn push_history(&mut self, entry: HistoryEntry, limit: usize) {
        self.history.push(entry);
        if limit > 0 && self.history.len() > limit {
            let excess = self.history.len() - limit;
            self.history.drain(..excess);
        }
    }

    /// Mark the conversation as handed to a human in the given turn.
    pub fn enter_takeover(&mut self, turn: u32) {
        if !self.stage.is_escalation() {
            self.resume_stage = Some(self.stage);
        }
        self.stage = Stage::HumanTakeover;
        self.human_takeover = true;
        self.takeover_turn = Some(turn);
        self.handover = None;
    }

    /// Clear the takeover flag and return to the stage held before escalation.
    ///
    /// Returns false when the conversation was not taken over.
    pub fn release_takeover(&mut self) -> bool {
        if !self.human_takeover && self.stage != Stage::HumanTakeover {
            return false;
        }
        self.human_takeover = false;
        self.takeover_turn = None;
        self.handover = None;
        self.reprompt_count = 0;
        self.stage = self
            .resume_stage
            .take()
            .filter(|stage| !stage.is_escalation())
            .unwrap_or(Stage::Start);
        true
    }

    /// Whether a message composed in `turn` may still be delivered.
    pub fn may_deliver(&self, turn: u32) -> bool {
        match self.takeover_turn {
            Some(takeover) => self.human_takeover && takeover == turn,
            None => !self.human_takeover,
        }
    }
}
