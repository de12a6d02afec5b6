//! Post-commit notifications.
//!
//! A store emits one notification per committed unit, after the unit is
//! durable and visible to readers. Notifications from one store are totally
//! ordered: they are emitted while the store's writer lock is held.
//!
//! Subscribers receive every notification emitted after they subscribed. A
//! late subscriber can catch up from the bounded history with
//! [`ChangeFeed::poll`].
//!
//! ```rust,ignore
//! let changes = db.content().subscribe();
//! std::thread::spawn(move || {
//!     while let Ok(change) = changes.recv() {
//!         println!("{} committed, cursor {}", change.summary.collection, change.summary.cursor);
//!     }
//! });
//! ```

use parking_lot::RwLock;
use std::collections::VecDeque;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::time::Duration;

/// A notification carrying the commit sequence that produced it.
pub trait Sequenced {
    /// Commit sequence of the unit this notification describes.
    fn sequence(&self) -> u64;
}

/// Distributes notifications of type `E` to subscribers.
pub struct ChangeFeed<E> {
    subscribers: RwLock<Vec<Sender<E>>>,
    history: RwLock<VecDeque<E>>,
    max_history: usize,
}

impl<E: Clone> ChangeFeed<E> {
    /// Creates a feed keeping the last `max_history` notifications.
    pub fn with_max_history(max_history: usize) -> Self {
        Self {
            subscribers: RwLock::new(Vec::new()),
            history: RwLock::new(VecDeque::with_capacity(max_history.min(1024))),
            max_history,
        }
    }

    /// Subscribes to every notification emitted from now on.
    pub fn subscribe(&self) -> Subscription<E> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.write().push(tx);
        Subscription { receiver: rx }
    }

    /// Emits a notification. Dropped subscribers are pruned here.
    pub fn emit(&self, event: E) {
        if self.max_history > 0 {
            let mut history = self.history.write();
            history.push_back(event.clone());
            while history.len() > self.max_history {
                history.pop_front();
            }
        }

        let mut subscribers = self.subscribers.write();
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    /// Number of live subscribers as of the last emit.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }

    /// Number of notifications kept for polling.
    pub fn history_len(&self) -> usize {
        self.history.read().len()
    }
}

impl<E: Clone + Sequenced> ChangeFeed<E> {
    /// Returns up to `limit` retained notifications with sequence > `after`.
    pub fn poll(&self, after: u64, limit: usize) -> Vec<E> {
        self.history
            .read()
            .iter()
            .filter(|e| e.sequence() > after)
            .take(limit)
            .cloned()
            .collect()
    }

    /// Sequence of the most recent notification, 0 if none was emitted.
    pub fn latest_sequence(&self) -> u64 {
        self.history.read().back().map_or(0, Sequenced::sequence)
    }
}

/// The receiving end of a [`ChangeFeed`] subscription.
///
/// Dropping it unsubscribes.
pub struct Subscription<E> {
    receiver: Receiver<E>,
}

impl<E> Subscription<E> {
    /// Blocks until the next notification. Fails once the feed is gone.
    pub fn recv(&self) -> Result<E, mpsc::RecvError> {
        self.receiver.recv()
    }

    /// Returns the next notification if one is pending.
    pub fn try_recv(&self) -> Option<E> {
        match self.receiver.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }

    /// Waits up to `timeout` for the next notification.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<E> {
        match self.receiver.recv_timeout(timeout) {
            Ok(event) => Some(event),
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Takes every pending notification without blocking.
    pub fn drain(&self) -> Vec<E> {
        self.receiver.try_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[derive(Debug, Clone, PartialEq)]
    struct Tick(u64);

    impl Sequenced for Tick {
        fn sequence(&self) -> u64 {
            self.0
        }
    }

    #[test]
    fn emit_and_receive() {
        let feed = ChangeFeed::with_max_history(8);
        let sub = feed.subscribe();
        feed.emit(Tick(1));
        assert_eq!(sub.recv_timeout(Duration::from_millis(100)), Some(Tick(1)));
    }

    #[test]
    fn multiple_subscribers_see_same_order() {
        let feed = ChangeFeed::with_max_history(8);
        let a = feed.subscribe();
        let b = feed.subscribe();
        for i in 1..=3 {
            feed.emit(Tick(i));
        }
        assert_eq!(a.drain(), vec![Tick(1), Tick(2), Tick(3)]);
        assert_eq!(b.drain(), vec![Tick(1), Tick(2), Tick(3)]);
    }

    #[test]
    fn dropped_subscription_is_pruned() {
        let feed = ChangeFeed::with_max_history(8);
        let sub = feed.subscribe();
        assert_eq!(feed.subscriber_count(), 1);
        drop(sub);
        feed.emit(Tick(1));
        assert_eq!(feed.subscriber_count(), 0);
    }

    #[test]
    fn poll_after_sequence() {
        let feed = ChangeFeed::with_max_history(3);
        for i in 1..=5 {
            feed.emit(Tick(i));
        }
        assert_eq!(feed.history_len(), 3);
        assert_eq!(feed.poll(0, 10), vec![Tick(3), Tick(4), Tick(5)]);
        assert_eq!(feed.poll(4, 10), vec![Tick(5)]);
        assert_eq!(feed.poll(0, 1), vec![Tick(3)]);
        assert_eq!(feed.latest_sequence(), 5);
    }

    #[test]
    fn zero_history_keeps_nothing() {
        let feed = ChangeFeed::with_max_history(0);
        feed.emit(Tick(1));
        assert_eq!(feed.history_len(), 0);
        assert_eq!(feed.latest_sequence(), 0);
    }

    #[test]
    fn threaded_delivery() {
        let feed = Arc::new(ChangeFeed::with_max_history(8));
        let sub = feed.subscribe();
        let emitter = Arc::clone(&feed);
        let handle = thread::spawn(move || emitter.emit(Tick(42)));
        assert_eq!(sub.recv_timeout(Duration::from_secs(1)), Some(Tick(42)));
        handle.join().unwrap();
    }
}
