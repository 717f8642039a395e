//! Funnel counters, read as a serializable snapshot.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use funnelbot_types::conversation::Stage;
use funnelbot_types::escalation::EscalationKind;
use serde::{Deserialize, Serialize};

#[derive(Debug, Default)]
pub struct FunnelMetrics {
    inbound: AtomicU64,
    ignored: AtomicU64,
    replies_sent: AtomicU64,
    send_failures: AtomicU64,
    suppressed: AtomicU64,
    trials_issued: AtomicU64,
    conversions: AtomicU64,
    referrals: AtomicU64,
    handovers_completed: AtomicU64,
    dispatch_failures: AtomicU64,
    stage_transitions: AtomicU64,
    offers_suppressed: AtomicU64,
    lane_overflows: AtomicU64,
    escalations: DashMap<EscalationKind, AtomicU64>,
    stage_entries: DashMap<Stage, AtomicU64>,
}

fn bump(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::SeqCst);
}

impl FunnelMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_inbound(&self) {
        bump(&self.inbound);
    }

    /// Group, broadcast or self-authored message filtered before dispatch.
    pub fn record_ignored(&self) {
        bump(&self.ignored);
    }

    pub fn record_sent(&self) {
        bump(&self.replies_sent);
    }

    pub fn record_send_failure(&self) {
        bump(&self.send_failures);
    }

    /// Message dropped at the takeover barrier.
    pub fn record_suppressed(&self) {
        bump(&self.suppressed);
    }

    pub fn record_trial(&self) {
        bump(&self.trials_issued);
    }

    pub fn record_conversion(&self) {
        bump(&self.conversions);
    }

    pub fn record_referral(&self) {
        bump(&self.referrals);
    }

    pub fn record_handover_completed(&self) {
        bump(&self.handovers_completed);
    }

    pub fn record_dispatch_failure(&self) {
        bump(&self.dispatch_failures);
    }

    pub fn record_offer_suppressed(&self) {
        bump(&self.offers_suppressed);
    }

    /// Inbound message dropped because its user's lane was full.
    pub fn record_lane_overflow(&self) {
        bump(&self.lane_overflows);
    }

    pub fn record_escalation(&self, kind: EscalationKind) {
        bump(&self.escalations.entry(kind).or_insert_with(|| AtomicU64::new(0)));
    }

    pub fn record_transition(&self, to: Stage) {
        bump(&self.stage_transitions);
        bump(&self.stage_entries.entry(to).or_insert_with(|| AtomicU64::new(0)));
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let load = |c: &AtomicU64| c.load(Ordering::SeqCst);
        MetricsSnapshot {
            inbound: load(&self.inbound),
            ignored: load(&self.ignored),
            replies_sent: load(&self.replies_sent),
            send_failures: load(&self.send_failures),
            suppressed: load(&self.suppressed),
            trials_issued: load(&self.trials_issued),
            conversions: load(&self.conversions),
            referrals: load(&self.referrals),
            handovers_completed: load(&self.handovers_completed),
            dispatch_failures: load(&self.dispatch_failures),
            stage_transitions: load(&self.stage_transitions),
            offers_suppressed: load(&self.offers_suppressed),
            lane_overflows: load(&self.lane_overflows),
            escalations: self
                .escalations
                .iter()
                .map(|e| (e.key().to_string(), load(e.value())))
                .collect(),
            stage_entries: self
                .stage_entries
                .iter()
                .map(|e| (e.key().to_string(), load(e.value())))
                .collect(),
        }
    }
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub inbound: u64,
    pub ignored: u64,
    pub replies_sent: u64,
    pub send_failures: u64,
    pub suppressed: u64,
    pub trials_issued: u64,
    pub conversions: u64,
    pub referrals: u64,
    pub handovers_completed: u64,
    pub dispatch_failures: u64,
    pub stage_transitions: u64,
    pub offers_suppressed: u64,
    pub lane_overflows: u64,
    /// Escalations per kind (`IMMEDIATE`, `COMPLEX_SUPPORT`, ...).
    pub escalations: BTreeMap<String, u64>,
    /// Entries per stage.
    pub stage_entries: BTreeMap<String, u64>,
}

impl MetricsSnapshot {
    pub fn total_escalations(&self) -> u64 {
        self.escalations.values().sum()
    }
}
