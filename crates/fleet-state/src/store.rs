//! Snapshot store
//!
//! Holds the current snapshot behind an `Arc` and publishes each new
//! snapshot through a `watch` channel. Dispatches are serialised by the
//! channel's internal lock.

use std::sync::Arc;
use tokio::sync::watch;

/// A state that evolves by folding actions
pub trait Reducer: Clone + Send + Sync + 'static {
    type Action;

    fn reduce(self, action: Self::Action) -> Self;
}

pub struct Store<R> {
    tx: watch::Sender<Arc<R>>,
}

impl<R: Reducer> Store<R> {
    pub fn new(initial: R) -> Self {
        let (tx, _rx) = watch::channel(Arc::new(initial));
        Self { tx }
    }

    /// Current snapshot
    pub fn snapshot(&self) -> Arc<R> {
        self.tx.borrow().clone()
    }

    /// Receiver notified on every new snapshot
    pub fn subscribe(&self) -> watch::Receiver<Arc<R>> {
        self.tx.subscribe()
    }

    /// Reduce one action and publish the result
    pub fn dispatch(&self, action: R::Action) -> Arc<R> {
        self.update(|state| state.reduce(action))
    }

    /// Replace the snapshot with `f(current)` and publish it
    pub fn update(&self, f: impl FnOnce(R) -> R) -> Arc<R> {
        let mut published = None;
        self.tx.send_modify(|current| {
            let next = Arc::new(f((**current).clone()));
            *current = next.clone();
            published = Some(next);
        });
        published.unwrap_or_else(|| self.snapshot())
    }
}

impl<R: Reducer + Default> Default for Store<R> {
    fn default() -> Self {
        Self::new(R::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FleetAction, FleetState};

    #[tokio::test]
    async fn test_dispatch_publishes() {
        let store: Store<FleetState> = Store::default();
        let mut rx = store.subscribe();

        let published = store.dispatch(FleetAction::SetConnectionStatus(true));
        assert!(published.is_connected);

        rx.changed().await.unwrap();
        assert!(rx.borrow_and_update().is_connected);
        assert!(store.snapshot().is_connected);
    }

    #[tokio::test]
    async fn test_snapshots_are_immutable() {
        let store: Store<FleetState> = Store::default();
        let before = store.snapshot();
        store.dispatch(FleetAction::SetTrackingInterval(5));

        assert_eq!(before.tracking_interval_secs, 30);
        assert_eq!(store.snapshot().tracking_interval_secs, 5);
    }
}
