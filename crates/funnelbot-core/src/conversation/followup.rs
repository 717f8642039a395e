//! Deferred per-user jobs (the post-trial teaser).
//!
//! At most one job is pending per user. Scheduling a new one or receiving a
//! new inbound message cancels the pending job.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Default)]
pub struct FollowUpScheduler {
    pending: Arc<DashMap<String, (Uuid, CancellationToken)>>,
}

impl FollowUpScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `job` after `delay` unless cancelled first. Replaces any job
    /// already pending for the user.
    pub fn schedule<F>(&self, user_id: &str, delay: Duration, job: F) -> Uuid
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let job_id = Uuid::now_v7();
        let token = CancellationToken::new();

        if let Some((_, (previous, old))) = self.pending.remove(user_id) {
            debug!(user_id, job_id = %previous, "replacing pending follow-up");
            old.cancel();
        }
        self.pending.insert(user_id.to_string(), (job_id, token.clone()));

        let pending = Arc::clone(&self.pending);
        let user_id = user_id.to_string();
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {
                    debug!(%user_id, %job_id, "follow-up cancelled");
                }
                _ = tokio::time::sleep(delay) => {
                    pending.remove_if(&user_id, |_, (id, _)| *id == job_id);
                    job.await;
                }
            }
        });

        job_id
    }

    /// Cancel the user's pending job. Returns whether one was pending.
    pub fn cancel(&self, user_id: &str) -> bool {
        match self.pending.remove(user_id) {
            Some((_, (job_id, token))) => {
                debug!(user_id, %job_id, "cancelling follow-up");
                token.cancel();
                true
            }
            None => false,
        }
    }

    pub fn is_pending(&self, user_id: &str) -> bool {
        self.pending.contains_key(user_id)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn counting_job(counter: &Arc<AtomicU32>) -> impl Future<Output = ()> + Send + 'static {
        let counter = Arc::clone(counter);
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn job_runs_after_delay() {
        let scheduler = FollowUpScheduler::new();
        let fired = Arc::new(AtomicU32::new(0));

        scheduler.schedule("u1", Duration::from_secs(60), counting_job(&fired));
        assert!(scheduler.is_pending("u1"));

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(31)).await;
        tokio::task::yield_now().await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(!scheduler.is_pending("u1"));
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_job_never_runs() {
        let scheduler = FollowUpScheduler::new();
        let fired = Arc::new(AtomicU32::new(0));

        scheduler.schedule("u1", Duration::from_secs(60), counting_job(&fired));
        assert!(scheduler.cancel("u1"));
        assert!(!scheduler.cancel("u1"));

        tokio::time::sleep(Duration::from_secs(120)).await;
        tokio::task::yield_now().await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn rescheduling_replaces_previous_job() {
        let scheduler = FollowUpScheduler::new();
        let first = Arc::new(AtomicU32::new(0));
        let second = Arc::new(AtomicU32::new(0));

        scheduler.schedule("u1", Duration::from_secs(60), counting_job(&first));
        scheduler.schedule("u1", Duration::from_secs(60), counting_job(&second));
        assert_eq!(scheduler.pending_count(), 1);

        tokio::time::sleep(Duration::from_secs(61)).await;
        tokio::task::yield_now().await;
        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn users_are_independent() {
        let scheduler = FollowUpScheduler::new();
        let fired = Arc::new(AtomicU32::new(0));

        scheduler.schedule("u1", Duration::from_secs(10), counting_job(&fired));
        scheduler.schedule("u2", Duration::from_secs(10), counting_job(&fired));
        scheduler.cancel("u1");

        tokio::time::sleep(Duration::from_secs(11)).await;
        tokio::task::yield_now().await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }
}
