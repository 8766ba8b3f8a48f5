//! Controller event subscription
//!
//! A [`ControllerSession`] owns the lifecycle of one `gamepad-input`
//! subscription: it spawns a single event loop that decodes events in arrival
//! order, fires debounce expiries between them, and publishes each resulting
//! [`ControllerSnapshot`] through a watch channel. Dropping or unsubscribing
//! the session aborts the loop, taking its pending timers with it.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::decoder::EventDecoder;
use crate::schema::GamepadPayload;
use crate::store::CountFn;
use crate::tracker::{ControllerTracker, DEFAULT_DEBOUNCE};
use crate::types::ControllerSnapshot;

/// Sending half of a controller event channel
pub type EventSender = mpsc::Sender<GamepadPayload>;

/// Receiving half consumed by [`ControllerSession::subscribe`]
pub type EventReceiver = mpsc::Receiver<GamepadPayload>;

/// Default capacity of [`event_channel`]
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// Create a bounded channel for feeding controller events into a session
pub fn event_channel(capacity: usize) -> (EventSender, EventReceiver) {
    mpsc::channel(capacity.max(1))
}

pub struct ControllerSession {
    debounce: Duration,
    snapshot_tx: watch::Sender<ControllerSnapshot>,
    task: Option<JoinHandle<()>>,
    subscription_id: Option<Uuid>,
}

impl Default for ControllerSession {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE)
    }
}

impl ControllerSession {
    /// Create an unsubscribed session with the given spin debounce window
    pub fn new(debounce: Duration) -> Self {
        let (snapshot_tx, _) = watch::channel(ControllerSnapshot::default());
        Self {
            debounce,
            snapshot_tx,
            task: None,
            subscription_id: None,
        }
    }

    /// Start consuming `events`.
    ///
    /// Returns false, leaving the running subscription alone, if the session
    /// is already subscribed. Must be called inside a tokio runtime.
    pub fn subscribe(&mut self, events: EventReceiver) -> bool {
        if self.is_subscribed() {
            debug!("controller session already subscribed");
            return false;
        }

        let id = Uuid::new_v4();
        let tracker = ControllerTracker::new(self.debounce);
        self.snapshot_tx.send_replace(tracker.snapshot());

        let span = info_span!("controller_session", subscription = %id);
        let snapshot_tx = self.snapshot_tx.clone();
        self.task = Some(tokio::spawn(
            run_event_loop(events, tracker, snapshot_tx).instrument(span),
        ));
        self.subscription_id = Some(id);
        info!(subscription = %id, "subscribed to controller events");
        true
    }

    /// Stop the event loop and drop any pending debounce timers.
    ///
    /// The last published snapshot stays readable.
    pub fn unsubscribe(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            if let Some(id) = self.subscription_id.take() {
                info!(subscription = %id, "unsubscribed from controller events");
            }
        }
    }

    /// Wait for the event loop to finish.
    ///
    /// The loop ends once every [`EventSender`] is dropped and the queued
    /// events are applied; the final snapshot stays readable afterwards.
    pub async fn closed(&mut self) {
        let Some(task) = self.task.take() else {
            return;
        };
        if let Err(e) = task.await {
            if e.is_panic() {
                warn!(error = %e, "controller event loop panicked");
            }
        }
        if let Some(id) = self.subscription_id.take() {
            info!(subscription = %id, "controller event source closed");
        }
    }

    /// True while the event loop is alive
    pub fn is_subscribed(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    pub fn subscription_id(&self) -> Option<Uuid> {
        self.subscription_id
    }

    /// Latest published snapshot
    pub fn snapshot(&self) -> ControllerSnapshot {
        *self.snapshot_tx.borrow()
    }

    /// Receiver that is notified on every published snapshot
    pub fn snapshots(&self) -> watch::Receiver<ControllerSnapshot> {
        self.snapshot_tx.subscribe()
    }

    /// Reader for the live note count, for stores that persist it
    pub fn live_count(&self) -> CountFn {
        let snapshots = self.snapshot_tx.subscribe();
        Arc::new(move || snapshots.borrow().counters.count)
    }
}

impl Drop for ControllerSession {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

async fn run_event_loop(
    mut events: EventReceiver,
    mut tracker: ControllerTracker,
    snapshot_tx: watch::Sender<ControllerSnapshot>,
) {
    loop {
        let deadline = tracker.next_deadline();

        tokio::select! {
            biased;

            _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                let now = Instant::now();
                let mut changed = false;
                for expiry in tracker.due_expiries(now) {
                    changed |= tracker.apply(&expiry, now);
                }
                if changed {
                    snapshot_tx.send_replace(tracker.snapshot());
                }
            }

            received = events.recv() => {
                let Some(payload) = received else {
                    debug!("controller event channel closed");
                    break;
                };
                if let Some(instruction) = EventDecoder::decode(&payload) {
                    if tracker.apply(&instruction, Instant::now()) {
                        snapshot_tx.send_replace(tracker.snapshot());
                    }
                }
            }
        }
    }

    // the source hung up; nothing may fire after this point
    tracker.cancel_timers();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Direction;
    use pretty_assertions::assert_eq;

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_button_scenario() {
        let mut session = ControllerSession::default();
        let (tx, rx) = event_channel(8);
        assert!(session.subscribe(rx));

        tx.send(GamepadPayload::button(2, true, 1)).await.unwrap();
        settle().await;
        assert_eq!(session.snapshot().buttons.is_pressed(2), Some(true));

        tx.send(GamepadPayload::button(2, false, 2).with_average_release_time(120.0))
            .await
            .unwrap();
        settle().await;

        let snapshot = session.snapshot();
        assert_eq!(snapshot.buttons.is_pressed(2), Some(false));
        assert_eq!(snapshot.counters.count, 2);
        assert_eq!(snapshot.counters.average_release_ms, Some(120.0));
        assert_eq!((session.live_count())(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_spin_highlight_decays() {
        let mut session = ControllerSession::default();
        let (tx, rx) = event_channel(8);
        session.subscribe(rx);

        tx.send(GamepadPayload::scratch(0, Direction::Left, 1)).await.unwrap();
        settle().await;
        assert!(session.snapshot().rotation.top_active);

        tokio::time::sleep(Duration::from_millis(60)).await;
        let rotation = session.snapshot().rotation;
        assert!(!rotation.spin_visual_active());
        assert_eq!(rotation.angle_degrees, 180);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rearm_clears_once_from_second_event() {
        let mut session = ControllerSession::default();
        let (tx, rx) = event_channel(8);
        session.subscribe(rx);

        let mut snapshots = session.snapshots();
        snapshots.borrow_and_update();
        let watcher = tokio::spawn(async move {
            let mut clears = Vec::new();
            let mut lit = false;
            while snapshots.changed().await.is_ok() {
                let active = snapshots.borrow_and_update().rotation.bottom_active;
                if lit && !active {
                    clears.push(Instant::now());
                }
                lit = active;
            }
            clears
        });

        let start = Instant::now();
        tx.send(GamepadPayload::scratch(100, Direction::Right, 1)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;
        tx.send(GamepadPayload::scratch(200, Direction::Right, 2)).await.unwrap();

        // 60ms after the first event, 30ms after the second: still lit
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(session.snapshot().rotation.bottom_active);

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(!session.snapshot().rotation.bottom_active);

        drop(session);
        let clears = watcher.await.unwrap();
        assert_eq!(clears.len(), 1);
        assert_eq!(clears[0] - start, Duration::from_millis(80));
    }

    #[tokio::test(start_paused = true)]
    async fn test_malformed_events_do_not_publish() {
        let mut session = ControllerSession::default();
        let mut snapshots = session.snapshots();
        let (tx, rx) = event_channel(8);
        session.subscribe(rx);
        snapshots.borrow_and_update();

        tx.send(GamepadPayload::button(9, true, 1)).await.unwrap();
        tx.send(GamepadPayload {
            kind: "pedal".to_string(),
            ..Default::default()
        })
        .await
        .unwrap();
        settle().await;

        assert!(!snapshots.has_changed().unwrap());
        assert_eq!(session.snapshot(), ControllerSnapshot::default());
    }

    #[tokio::test(start_paused = true)]
    async fn test_closed_waits_for_queued_events() {
        let mut session = ControllerSession::default();
        let (tx, rx) = event_channel(8);
        session.subscribe(rx);

        tx.send(GamepadPayload::button(4, true, 1)).await.unwrap();
        tx.send(GamepadPayload::button(4, false, 2).with_average_release_time(80.0))
            .await
            .unwrap();
        tx.send(GamepadPayload::button(1, true, 3)).await.unwrap();
        drop(tx);

        session.closed().await;

        assert!(!session.is_subscribed());
        assert_eq!(session.subscription_id(), None);
        let snapshot = session.snapshot();
        assert_eq!(snapshot.buttons.is_pressed(4), Some(false));
        assert_eq!(snapshot.buttons.is_pressed(1), Some(true));
        assert_eq!(snapshot.counters.count, 3);
        assert_eq!(snapshot.counters.average_release_ms, Some(80.0));

        // waiting again on a finished session returns at once
        session.closed().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_subscribe_is_idempotent() {
        let mut session = ControllerSession::default();
        let (_tx, rx) = event_channel(8);
        let (_tx2, rx2) = event_channel(8);

        assert!(session.subscribe(rx));
        let id = session.subscription_id();
        assert!(!session.subscribe(rx2));
        assert_eq!(session.subscription_id(), id);
        assert!(session.is_subscribed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unsubscribe_stops_pending_timers() {
        let mut session = ControllerSession::default();
        let (tx, rx) = event_channel(8);
        session.subscribe(rx);

        tx.send(GamepadPayload::scratch(0, Direction::Left, 1)).await.unwrap();
        settle().await;
        assert!(session.snapshot().rotation.top_active);

        session.unsubscribe();
        settle().await;
        assert!(!session.is_subscribed());

        // the loop is gone, so the highlight is frozen as last published
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(session.snapshot().rotation.top_active);
        assert!(tx.send(GamepadPayload::button(0, true, 2)).await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_resubscribe_after_unsubscribe_starts_fresh() {
        let mut session = ControllerSession::default();
        let (tx, rx) = event_channel(8);
        session.subscribe(rx);
        tx.send(GamepadPayload::button(5, true, 7)).await.unwrap();
        settle().await;
        session.unsubscribe();

        let (_tx2, rx2) = event_channel(8);
        assert!(session.subscribe(rx2));
        assert_eq!(session.snapshot(), ControllerSnapshot::default());
    }
}
