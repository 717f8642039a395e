//! At most one promotional pitch per user per window.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

/// One recorded offer, remembering the one it replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct OfferClaim {
    at: DateTime<Utc>,
    /// Automated turn that made the offer; `None` once restored.
    turn: Option<u32>,
    previous: Option<DateTime<Utc>>,
}

#[derive(Debug)]
pub struct OfferCooldown {
    offers: DashMap<String, OfferClaim>,
    window: Duration,
}

impl OfferCooldown {
    pub fn new(window_hours: u32) -> Self {
        Self {
            offers: DashMap::new(),
            window: Duration::hours(i64::from(window_hours)),
        }
    }

    /// Record an offer made by `turn` at `now` if the user is outside the window.
    ///
    /// Returns `false` while a previous offer is still within the window; in
    /// that case the stored timestamp is left untouched, so the window is
    /// measured from the last offer actually made.
    pub fn claim(&self, user_id: &str, now: DateTime<Utc>, turn: u32) -> bool {
        match self.offers.entry(user_id.to_string()) {
            Entry::Occupied(mut entry) => {
                let last = entry.get().at;
                if now < last + self.window {
                    return false;
                }
                entry.insert(OfferClaim {
                    at: now,
                    turn: Some(turn),
                    previous: Some(last),
                });
                true
            }
            Entry::Vacant(entry) => {
                entry.insert(OfferClaim {
                    at: now,
                    turn: Some(turn),
                    previous: None,
                });
                true
            }
        }
    }

    /// Undo the claim made by `turn` after its pitch was never delivered.
    pub fn release(&self, user_id: &str, turn: u32) -> bool {
        let Entry::Occupied(mut entry) = self.offers.entry(user_id.to_string()) else {
            return false;
        };
        if entry.get().turn != Some(turn) {
            return false;
        }
        match entry.get().previous {
            Some(at) => {
                entry.insert(OfferClaim {
                    at,
                    turn: None,
                    previous: None,
                });
            }
            None => {
                entry.remove();
            }
        }
        true
    }

    /// Whether an offer at `now` would be allowed, without claiming it.
    pub fn is_open(&self, user_id: &str, now: DateTime<Utc>) -> bool {
        self.offers
            .get(user_id)
            .is_none_or(|claim| now >= claim.at + self.window)
    }

    pub fn last_offer(&self, user_id: &str) -> Option<DateTime<Utc>> {
        self.offers.get(user_id).map(|claim| claim.at)
    }
}
