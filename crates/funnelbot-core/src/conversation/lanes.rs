//! Per-user inbound lanes.
//!
//! Each user id gets a bounded `mpsc` mailbox drained by its own task, so one
//! user's messages are handled in arrival order while different users run in
//! parallel. Idle lanes shut themselves down and are recreated on the next
//! message. Submitting never waits: a full lane rejects the message so a
//! stuck user cannot hold up anyone else.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use funnelbot_types::message::InboundMessage;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::debug;

/// Buffer size for one user's mailbox.
const LANE_BUFFER: usize = 64;

/// Default time a lane may sit empty before its task exits.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Debug, Error)]
pub enum LaneError {
    #[error("lane for {0} is closed")]
    Closed(String),
    #[error("lane for {0} is full")]
    Full(String),
}

/// Consumer of one user's messages.
pub trait InboundHandler: Send + Sync + 'static {
    fn handle(&self, message: InboundMessage) -> impl Future<Output = ()> + Send;
}

pub struct UserLanes<H: InboundHandler> {
    handler: Arc<H>,
    lanes: Arc<DashMap<String, mpsc::Sender<InboundMessage>>>,
    idle_timeout: Duration,
}

impl<H: InboundHandler> UserLanes<H> {
    pub fn new(handler: Arc<H>, idle_timeout: Duration) -> Self {
        Self {
            handler,
            lanes: Arc::new(DashMap::new()),
            idle_timeout,
        }
    }

    /// Queue a message on its user's lane without waiting.
    pub fn submit(&self, message: InboundMessage) -> Result<(), LaneError> {
        let mut message = message;
        // A lane may close between lookup and send; retry once on a fresh one.
        for _ in 0..2 {
            let tx = self.sender_for(&message.user_id);
            match tx.try_send(message) {
                Ok(()) => return Ok(()),
                Err(mpsc::error::TrySendError::Full(returned)) => {
                    return Err(LaneError::Full(returned.user_id));
                }
                Err(mpsc::error::TrySendError::Closed(returned)) => {
                    self.lanes
                        .remove_if(&returned.user_id, |_, current| current.same_channel(&tx));
                    message = returned;
                }
            }
        }
        Err(LaneError::Closed(message.user_id))
    }

    pub fn active_lanes(&self) -> usize {
        self.lanes.len()
    }

    fn sender_for(&self, user_id: &str) -> mpsc::Sender<InboundMessage> {
        self.lanes
            .entry(user_id.to_string())
            .or_insert_with(|| self.spawn_lane(user_id))
            .clone()
    }

    fn spawn_lane(&self, user_id: &str) -> mpsc::Sender<InboundMessage> {
        let (tx, mut rx) = mpsc::channel::<InboundMessage>(LANE_BUFFER);
        let own = tx.clone();
        let handler = Arc::clone(&self.handler);
        let lanes = Arc::clone(&self.lanes);
        let idle = self.idle_timeout;
        let user_id = user_id.to_string();

        tokio::spawn(async move {
            loop {
                match tokio::time::timeout(idle, rx.recv()).await {
                    Ok(Some(message)) => handler.handle(message).await,
                    Ok(None) => break,
                    Err(_) => {
                        lanes.remove_if(&user_id, |_, current| current.same_channel(&own));
                        rx.close();
                        while let Ok(message) = rx.try_recv() {
                            handler.handle(message).await;
                        }
                        debug!(%user_id, "lane idle, closed");
                        break;
                    }
                }
            }
        });

        tx
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<(String, String)>>,
    }

    impl InboundHandler for Recorder {
        async fn handle(&self, message: InboundMessage) {
            tokio::time::sleep(Duration::from_millis(5)).await;
            self.seen.lock().unwrap().push((message.user_id, message.text));
        }
    }

    impl Recorder {
        fn texts_for(&self, user_id: &str) -> Vec<String> {
            self.seen
                .lock()
                .unwrap()
                .iter()
                .filter(|(u, _)| u == user_id)
                .map(|(_, t)| t.clone())
                .collect()
        }
    }

    async fn settle(recorder: &Recorder, expected: usize) {
        for _ in 0..200 {
            if recorder.seen.lock().unwrap().len() >= expected {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    #[tokio::test]
    async fn messages_of_one_user_keep_order() {
        let recorder = Arc::new(Recorder::default());
        let lanes = UserLanes::new(Arc::clone(&recorder), DEFAULT_IDLE_TIMEOUT);

        for i in 0..5 {
            lanes.submit(InboundMessage::text("u1", format!("m{i}"))).unwrap();
        }
        lanes.submit(InboundMessage::text("u2", "x")).unwrap();
        settle(&recorder, 6).await;

        assert_eq!(recorder.texts_for("u1"), vec!["m0", "m1", "m2", "m3", "m4"]);
        assert_eq!(recorder.texts_for("u2"), vec!["x"]);
        assert_eq!(lanes.active_lanes(), 2);
    }

    #[tokio::test]
    async fn idle_lane_is_recreated() {
        let recorder = Arc::new(Recorder::default());
        let lanes = UserLanes::new(Arc::clone(&recorder), Duration::from_millis(20));

        lanes.submit(InboundMessage::text("u1", "first")).unwrap();
        settle(&recorder, 1).await;
        tokio::time::sleep(Duration::from_millis(80)).await;
        assert_eq!(lanes.active_lanes(), 0);

        lanes.submit(InboundMessage::text("u1", "second")).unwrap();
        settle(&recorder, 2).await;
        assert_eq!(recorder.texts_for("u1"), vec!["first", "second"]);
    }

    /// Blocks forever on messages from "stuck".
    #[derive(Default)]
    struct Stuck {
        fast: Mutex<Vec<String>>,
    }

    impl InboundHandler for Stuck {
        async fn handle(&self, message: InboundMessage) {
            if message.user_id == "stuck" {
                std::future::pending::<()>().await;
            }
            self.fast.lock().unwrap().push(message.text);
        }
    }

    #[tokio::test]
    async fn full_lane_rejects_without_blocking_other_users() {
        let handler = Arc::new(Stuck::default());
        let lanes = UserLanes::new(Arc::clone(&handler), DEFAULT_IDLE_TIMEOUT);

        // One message is taken by the handler, then the buffer fills up.
        let mut accepted = 0;
        let mut rejected = None;
        for i in 0..LANE_BUFFER + 8 {
            match lanes.submit(InboundMessage::text("stuck", format!("m{i}"))) {
                Ok(()) => accepted += 1,
                Err(err) => {
                    rejected = Some(err);
                    break;
                }
            }
            tokio::task::yield_now().await;
        }
        assert!(matches!(rejected, Some(LaneError::Full(ref user_id)) if user_id == "stuck"));
        assert!(accepted >= LANE_BUFFER);

        lanes.submit(InboundMessage::text("fast", "oi")).unwrap();
        for _ in 0..100 {
            if !handler.fast.lock().unwrap().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(*handler.fast.lock().unwrap(), vec!["oi".to_string()]);
    }
}
