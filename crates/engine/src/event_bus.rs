//! Event Bus (§4.8): per-user ordered broadcast with bounded replay.
//!
//! `Publish` is O(1) and non-blocking. A late `Subscribe` gets the current
//! replay window followed by live events; a subscriber that falls behind the
//! bounded channel capacity is dropped (it sees a gap via `Lagged` and its
//! stream ends) rather than blocking the publisher.

use futures::stream::{self, Stream, StreamExt};
use oj_core::{Event, EventKind, UserId};
use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, VecDeque};
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;

/// Slow-subscriber bound (§4.8): a pending-queue limit of 128 rather than
/// an unbounded or blocking channel.
const DEFAULT_CHANNEL_CAPACITY: usize = 128;

struct UserChannel {
    next_seq: Mutex<u64>,
    history: Mutex<VecDeque<Event>>,
    sender: broadcast::Sender<Event>,
}

impl UserChannel {
    fn new() -> Self {
        Self {
            next_seq: Mutex::new(0),
            history: Mutex::new(VecDeque::new()),
            sender: broadcast::channel(DEFAULT_CHANNEL_CAPACITY).0,
        }
    }
}

pub struct EventBus {
    channels: RwLock<HashMap<UserId, Arc<UserChannel>>>,
    replay_window: usize,
    post_terminal_grace: Duration,
}

impl EventBus {
    pub fn new(replay_window: usize, post_terminal_grace: Duration) -> Self {
        Self {
            channels: RwLock::new(HashMap::new()),
            replay_window,
            post_terminal_grace,
        }
    }

    fn channel_for(&self, user_id: &UserId) -> Arc<UserChannel> {
        if let Some(channel) = self.channels.read().get(user_id) {
            return channel.clone();
        }
        self.channels
            .write()
            .entry(user_id.clone())
            .or_insert_with(|| Arc::new(UserChannel::new()))
            .clone()
    }

    /// Starts a fresh event log for `user_id`: sequence numbers restart at 1
    /// and old history is discarded, so a new Run's replay never leaks a
    /// prior Run's events to a late subscriber.
    pub fn start_run(&self, user_id: &UserId) {
        self.channels
            .write()
            .insert(user_id.clone(), Arc::new(UserChannel::new()));
    }

    pub fn publish(&self, user_id: &UserId, kind: EventKind, ts_epoch_ms: u64) -> Event {
        let channel = self.channel_for(user_id);
        let seq = {
            let mut next = channel.next_seq.lock();
            *next += 1;
            *next
        };
        let event = Event { seq, ts_epoch_ms, kind };

        {
            let mut history = channel.history.lock();
            history.push_back(event.clone());
            while history.len() > self.replay_window {
                history.pop_front();
            }
        }

        // Ignoring the send error: no receivers is a normal state (no one
        // has subscribed yet), not a publisher-side failure.
        let _ = channel.sender.send(event.clone());
        event
    }

    /// Replay-then-live stream. Subscribes to the live channel before
    /// reading the history snapshot so no event can land in the gap between
    /// the two reads; duplicates from that overlap are filtered by `seq`.
    pub fn subscribe(&self, user_id: &UserId) -> impl Stream<Item = Event> + Send + 'static {
        let channel = self.channel_for(user_id);
        let receiver = channel.sender.subscribe();
        let history: Vec<Event> = channel.history.lock().iter().cloned().collect();
        let last_history_seq = history.last().map(|e| e.seq).unwrap_or(0);
        let grace = self.post_terminal_grace;

        let live: Pin<Box<dyn Stream<Item = Event> + Send>> = Box::pin(
            BroadcastStream::new(receiver)
                .filter_map(|result| async move { result.ok() })
                .filter(move |event| futures::future::ready(event.seq > last_history_seq)),
        );

        stream::iter(history).chain(end_after_terminal_grace(live, grace))
    }
}

/// Wraps a live event stream so that once a terminal event passes through,
/// the stream waits at most `grace` for anything further before ending —
/// instead of hanging forever on a sender nobody is going to use again.
fn end_after_terminal_grace(
    stream: Pin<Box<dyn Stream<Item = Event> + Send>>,
    grace: Duration,
) -> impl Stream<Item = Event> {
    stream::unfold((stream, false), move |(mut stream, seen_terminal)| async move {
        if seen_terminal {
            match tokio::time::timeout(grace, stream.next()).await {
                Ok(Some(event)) => {
                    let terminal = event.kind.is_terminal();
                    Some((event, (stream, terminal)))
                }
                Ok(None) | Err(_) => None,
            }
        } else {
            let event = stream.next().await?;
            let terminal = event.kind.is_terminal();
            Some((event, (stream, terminal)))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kind(n: u32) -> EventKind {
        EventKind::StageUpdate {
            job_id: None,
            stage: format!("stage-{n}"),
            current_index: n,
            total_jobs: 10,
            attempt: None,
        }
    }

    #[tokio::test]
    async fn publish_assigns_strictly_increasing_sequence_numbers() {
        let bus = EventBus::new(256, Duration::from_millis(50));
        let user = UserId::new("u1");
        bus.start_run(&user);
        let e1 = bus.publish(&user, kind(1), 0);
        let e2 = bus.publish(&user, kind(2), 1);
        assert_eq!(e1.seq, 1);
        assert_eq!(e2.seq, 2);
    }

    #[tokio::test]
    async fn subscribe_replays_history_then_live_events() {
        let bus = EventBus::new(256, Duration::from_millis(50));
        let user = UserId::new("u1");
        bus.start_run(&user);
        bus.publish(&user, kind(1), 0);
        bus.publish(&user, kind(2), 1);

        let stream = bus.subscribe(&user);
        tokio::pin!(stream);

        let first = stream.next().await.unwrap();
        let second = stream.next().await.unwrap();
        assert_eq!(first.seq, 1);
        assert_eq!(second.seq, 2);

        bus.publish(
            &user,
            EventKind::WorkflowCompleted {
                submitted_count: 0,
                failed_count: 0,
                skipped_count: 0,
                status: "completed".into(),
            },
            2,
        );
        let third = stream.next().await.unwrap();
        assert_eq!(third.seq, 3);
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn new_subscriber_does_not_see_events_published_before_start_run() {
        let bus = EventBus::new(256, Duration::from_millis(20));
        let user = UserId::new("u1");
        bus.start_run(&user);
        bus.publish(&user, kind(1), 0);
        bus.start_run(&user);

        let stream = bus.subscribe(&user);
        tokio::pin!(stream);
        bus.publish(&user, kind(2), 1);
        let first = stream.next().await.unwrap();
        assert_eq!(first.seq, 1, "seq restarts for the new run");
    }

    #[tokio::test]
    async fn history_is_capped_to_replay_window() {
        let bus = EventBus::new(2, Duration::from_millis(20));
        let user = UserId::new("u1");
        bus.start_run(&user);
        bus.publish(&user, kind(1), 0);
        bus.publish(&user, kind(2), 1);
        bus.publish(&user, kind(3), 2);

        let stream = bus.subscribe(&user);
        tokio::pin!(stream);
        let first = stream.next().await.unwrap();
        assert_eq!(first.seq, 2, "oldest event should have been trimmed");
    }
}
