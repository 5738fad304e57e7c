//! Observer registry for session collections
//!
//! A collection is held as an immutable `Arc<Vec<T>>` that is swapped
//! wholesale on every change. Each subscriber owns an unbounded channel, so a
//! slow reader never blocks a mutation and never misses a snapshot.

use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio_stream::wrappers::UnboundedReceiverStream;

/// Full value of one collection at a point in time
pub type Snapshot<T> = Arc<Vec<T>>;

/// A collection value plus the observers watching it
///
/// Callers serialize access (the session store keeps each one behind a
/// mutex), which is what makes "replace then publish" atomic with respect to
/// new subscriptions.
#[derive(Debug)]
pub struct Observable<T> {
    current: Snapshot<T>,
    version: u64,
    observers: Vec<UnboundedSender<Snapshot<T>>>,
}

impl<T> Observable<T> {
    /// Wrap an initial collection value
    pub fn new(items: Vec<T>) -> Self {
        Self {
            current: Arc::new(items),
            version: 0,
            observers: Vec::new(),
        }
    }

    /// Current collection value
    pub fn snapshot(&self) -> Snapshot<T> {
        Arc::clone(&self.current)
    }

    /// Number of replacements applied so far
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Register an observer; it receives the current value immediately
    pub fn subscribe(&mut self) -> Subscription<T> {
        let (tx, rx) = mpsc::unbounded_channel();
        // receiver is alive, the send cannot fail
        let _ = tx.send(self.snapshot());
        self.observers.push(tx);
        Subscription { rx }
    }

    /// Replace the collection and notify every live observer
    ///
    /// Observers whose subscription was dropped are pruned here.
    pub fn replace(&mut self, items: Vec<T>) -> Snapshot<T> {
        self.current = Arc::new(items);
        self.version += 1;
        let snapshot = self.snapshot();
        self.observers
            .retain(|tx| tx.send(Arc::clone(&snapshot)).is_ok());
        snapshot
    }

    /// Number of observers that were alive at the last publish
    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }
}

/// Live feed of full-collection values
///
/// The first value is the collection at subscription time; every later value
/// is the result of exactly one completed mutation, in the order the store
/// applied them. Dropping the subscription unsubscribes.
#[derive(Debug)]
pub struct Subscription<T> {
    rx: UnboundedReceiver<Snapshot<T>>,
}

impl<T> Subscription<T> {
    /// Wait for the next snapshot
    ///
    /// Returns `None` once the store has been dropped.
    ///
    /// # Examples
    ///
    /// ```
    /// use promptbench::session::Observable;
    ///
    /// # tokio_test::block_on(async {
    /// let mut observable = Observable::new(vec![1]);
    /// let mut sub = observable.subscribe();
    /// observable.replace(vec![1, 2]);
    ///
    /// assert_eq!(*sub.recv().await.unwrap(), vec![1]);
    /// assert_eq!(*sub.recv().await.unwrap(), vec![1, 2]);
    /// # });
    /// ```
    pub async fn recv(&mut self) -> Option<Snapshot<T>> {
        self.rx.recv().await
    }

    /// Take the next snapshot if one is already queued
    pub fn try_recv(&mut self) -> Option<Snapshot<T>> {
        self.rx.try_recv().ok()
    }

    /// Drain queued snapshots and keep only the newest
    pub fn latest(&mut self) -> Option<Snapshot<T>> {
        let mut newest = None;
        while let Some(snapshot) = self.try_recv() {
            newest = Some(snapshot);
        }
        newest
    }

    /// Convert into a `Stream` of snapshots
    pub fn into_stream(self) -> UnboundedReceiverStream<Snapshot<T>> {
        UnboundedReceiverStream::new(self.rx)
    }
}
