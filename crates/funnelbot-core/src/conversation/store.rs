//! In-memory per-user conversation store.
//!
//! Each user's state sits behind its own async mutex. The dispatcher holds
//! that lock for a whole turn, which serializes messages from one user while
//! different users proceed in parallel.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use funnelbot_types::conversation::{ConversationState, Stage};
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Debug, Default)]
pub struct ConversationStore {
    states: DashMap<String, Arc<Mutex<ConversationState>>>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, user_id: &str, now: DateTime<Utc>) -> Arc<Mutex<ConversationState>> {
        self.states
            .entry(user_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(ConversationState::new(user_id, now))))
            .clone()
    }

    /// Lock the user's state, creating it on first contact.
    pub async fn lock(&self, user_id: &str, now: DateTime<Utc>) -> OwnedMutexGuard<ConversationState> {
        self.slot(user_id, now).lock_owned().await
    }

    /// Copy of the current state, if the user is known.
    pub async fn snapshot(&self, user_id: &str) -> Option<ConversationState> {
        let slot = self.states.get(user_id).map(|entry| entry.value().clone())?;
        let state = slot.lock().await;
        Some(state.clone())
    }

    /// Check-then-send barrier for a message composed in `turn`.
    pub async fn may_deliver(&self, user_id: &str, turn: u32) -> bool {
        let Some(slot) = self.states.get(user_id).map(|entry| entry.value().clone()) else {
            return false;
        };
        let state = slot.lock().await;
        state.may_deliver(turn)
    }

    /// Hand a taken-over conversation back to the bot.
    ///
    /// Returns the stage the conversation resumed in, or `None` when the user
    /// is unknown or was not taken over.
    pub async fn release(&self, user_id: &str, now: DateTime<Utc>) -> Option<Stage> {
        let slot = self.states.get(user_id).map(|entry| entry.value().clone())?;
        let mut state = slot.lock().await;
        if !state.release_takeover() {
            return None;
        }
        state.updated_at = now;
        Some(state.stage)
    }

    /// Undo the turn increment of `turn` after its primary reply failed.
    pub async fn revert_turn(&self, user_id: &str, turn: u32) -> bool {
        let Some(slot) = self.states.get(user_id).map(|entry| entry.value().clone()) else {
            return false;
        };
        let mut state = slot.lock().await;
        if state.automated_turn_count != turn || turn == 0 {
            return false;
        }
        state.automated_turn_count -= 1;
        true
    }

    pub fn user_ids(&self) -> Vec<String> {
        self.states.iter().map(|entry| entry.key().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn lock_creates_state_once() {
        let store = ConversationStore::new();
        {
            let mut state = store.lock("u1", Utc::now()).await;
            state.stage = Stage::Qualifying;
        }
        let state = store.lock("u1", Utc::now()).await;
        assert_eq!(state.stage, Stage::Qualifying);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn snapshot_of_unknown_user_is_none() {
        let store = ConversationStore::new();
        assert!(store.snapshot("ghost").await.is_none());
        assert!(!store.may_deliver("ghost", 1).await);
    }

    #[tokio::test]
    async fn same_user_is_serialized() {
        let store = Arc::new(ConversationStore::new());
        let guard = store.lock("u1", Utc::now()).await;

        let other = Arc::clone(&store);
        let waiter = tokio::spawn(async move {
            let mut state = other.lock("u1", Utc::now()).await;
            state.automated_turn_count += 1;
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());
        drop(guard);
        waiter.await.unwrap();

        assert_eq!(store.snapshot("u1").await.unwrap().automated_turn_count, 1);
    }

    #[tokio::test]
    async fn different_users_do_not_block() {
        let store = ConversationStore::new();
        let _a = store.lock("a", Utc::now()).await;
        let b = tokio::time::timeout(Duration::from_millis(100), store.lock("b", Utc::now())).await;
        assert!(b.is_ok());
    }

    #[tokio::test]
    async fn release_resumes_previous_stage() {
        let store = ConversationStore::new();
        {
            let mut state = store.lock("u1", Utc::now()).await;
            state.stage = Stage::PlanPresented;
            state.automated_turn_count = 4;
            state.enter_takeover(5);
        }
        assert!(store.may_deliver("u1", 5).await);
        assert!(!store.may_deliver("u1", 4).await);

        assert_eq!(store.release("u1", Utc::now()).await, Some(Stage::PlanPresented));
        assert_eq!(store.release("u1", Utc::now()).await, None);
        assert!(store.may_deliver("u1", 6).await);
    }

    #[tokio::test]
    async fn revert_turn_only_for_latest_turn() {
        let store = ConversationStore::new();
        store.lock("u1", Utc::now()).await.automated_turn_count = 3;

        assert!(!store.revert_turn("u1", 2).await);
        assert!(store.revert_turn("u1", 3).await);
        assert_eq!(store.snapshot("u1").await.unwrap().automated_turn_count, 2);
    }
}
