//! Publish-on-diff wrapper around a `watch` channel.
//!
//! The notifier owns the comparison baseline on behalf of the probe that
//! feeds it. Observers get cheap copy-on-read access through
//! `watch::Receiver` and are only woken when the value actually changed.

use std::sync::Arc;

use tokio::sync::watch;

pub struct ChangeNotifier<T> {
    tx: Arc<watch::Sender<T>>,
}

impl<T> Clone for ChangeNotifier<T> {
    fn clone(&self) -> Self {
        Self {
            tx: Arc::clone(&self.tx),
        }
    }
}

impl<T: Clone + PartialEq> ChangeNotifier<T> {
    /// `initial` is the baseline; it is visible to subscribers but never
    /// counted as a change.
    pub fn new(initial: T) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx: Arc::new(tx) }
    }

    /// Replaces the baseline if `value` differs from it. Returns whether
    /// observers were notified.
    pub fn publish(&self, value: T) -> bool {
        self.tx.send_if_modified(|current| {
            if *current == value {
                false
            } else {
                *current = value;
                true
            }
        })
    }

    pub fn current(&self) -> T {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.tx.subscribe()
    }
}
