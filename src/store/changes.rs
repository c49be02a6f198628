//! Change notifications.
//!
//! Every successful gateway write signals a per-table broadcast channel.
//! Subscribers react by re-fetching the full list and handing the complete
//! refreshed collection (never a delta) to their callback. Re-fetches carry
//! monotonic sequence numbers; a response that resolves after a newer one has
//! already been delivered is discarded.
//!
//! In fallback mode subscriptions are inert: local mutations are not
//! observable by other sessions, so no notification ever fires.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::entities::{checkout_event, key, user};
use crate::store::{DataStore, EntityKind, TableMode};

const CHANNEL_CAPACITY: usize = 16;

/// One broadcast channel per entity table.
pub(crate) struct ChangeHub {
    users: broadcast::Sender<()>,
    keys: broadcast::Sender<()>,
    events: broadcast::Sender<()>,
}

impl ChangeHub {
    pub(crate) fn new() -> Self {
        Self {
            users: broadcast::channel(CHANNEL_CAPACITY).0,
            keys: broadcast::channel(CHANNEL_CAPACITY).0,
            events: broadcast::channel(CHANNEL_CAPACITY).0,
        }
    }

    fn sender(&self, kind: EntityKind) -> &broadcast::Sender<()> {
        match kind {
            EntityKind::Users => &self.users,
            EntityKind::Keys => &self.keys,
            EntityKind::Events => &self.events,
        }
    }

    /// Signals a change on one table. A send with no subscribers is fine.
    pub(crate) fn notify(&self, kind: EntityKind) {
        let _ = self.sender(kind).send(());
    }

    fn subscribe(&self, kind: EntityKind) -> broadcast::Receiver<()> {
        self.sender(kind).subscribe()
    }
}

/// Handle for an active change subscription. Dropping it (or calling
/// [`Subscription::unsubscribe`]) stops the notifications.
pub struct Subscription {
    task: Option<JoinHandle<()>>,
}

impl Subscription {
    fn active(task: JoinHandle<()>) -> Self {
        Self { task: Some(task) }
    }

    /// The inert subscription handed out in fallback mode.
    fn inert() -> Self {
        Self { task: None }
    }

    /// True when notifications can actually fire.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.task.is_some()
    }

    /// Stops the subscription.
    pub fn unsubscribe(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Per-subscription sequencing state: `issued` numbers the re-fetches,
/// `applied` remembers the newest one delivered so stale responses can be
/// dropped.
struct FetchSequence {
    issued: AtomicU64,
    applied: AtomicU64,
}

impl FetchSequence {
    fn new() -> Self {
        Self {
            issued: AtomicU64::new(0),
            applied: AtomicU64::new(0),
        }
    }

    fn next_ticket(&self) -> u64 {
        self.issued.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Records a resolved fetch; false means a newer one already delivered.
    fn try_apply(&self, ticket: u64) -> bool {
        self.applied.fetch_max(ticket, Ordering::SeqCst) < ticket
    }
}

impl DataStore {
    /// Delivers the complete refreshed key list to `callback` after every
    /// remote key change. Inert in fallback mode.
    pub fn subscribe_to_key_changes<F>(self: &Arc<Self>, callback: F) -> Subscription
    where
        F: Fn(Vec<key::Model>) + Send + Sync + 'static,
    {
        if self.mode(EntityKind::Keys) != TableMode::Remote {
            return Subscription::inert();
        }
        let mut rx = self.changes.subscribe(EntityKind::Keys);
        let store = Arc::clone(self);
        let callback = Arc::new(callback);
        let sequence = Arc::new(FetchSequence::new());
        let task = tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(()) | Err(broadcast::error::RecvError::Lagged(_)) => {}
                    Err(broadcast::error::RecvError::Closed) => break,
                }
                let ticket = sequence.next_ticket();
                let store = Arc::clone(&store);
                let callback = Arc::clone(&callback);
                let sequence = Arc::clone(&sequence);
                tokio::spawn(async move {
                    let snapshot = store.list_keys().await.value;
                    if sequence.try_apply(ticket) {
                        callback(snapshot);
                    }
                });
            }
        });
        Subscription::active(task)
    }

    /// Delivers the complete refreshed user list to `callback` after every
    /// remote user change. Inert in fallback mode.
    pub fn subscribe_to_user_changes<F>(self: &Arc<Self>, callback: F) -> Subscription
    where
        F: Fn(Vec<user::Model>) + Send + Sync + 'static,
    {
        if self.mode(EntityKind::Users) != TableMode::Remote {
            return Subscription::inert();
        }
        let mut rx = self.changes.subscribe(EntityKind::Users);
        let store = Arc::clone(self);
        let callback = Arc::new(callback);
        let sequence = Arc::new(FetchSequence::new());
        let task = tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(()) | Err(broadcast::error::RecvError::Lagged(_)) => {}
                    Err(broadcast::error::RecvError::Closed) => break,
                }
                let ticket = sequence.next_ticket();
                let store = Arc::clone(&store);
                let callback = Arc::clone(&callback);
                let sequence = Arc::clone(&sequence);
                tokio::spawn(async move {
                    let snapshot = store.list_users().await.value;
                    if sequence.try_apply(ticket) {
                        callback(snapshot);
                    }
                });
            }
        });
        Subscription::active(task)
    }

    /// Delivers the complete refreshed event log to `callback` after every
    /// remote event append. Inert in fallback mode.
    pub fn subscribe_to_event_changes<F>(self: &Arc<Self>, callback: F) -> Subscription
    where
        F: Fn(Vec<checkout_event::Model>) + Send + Sync + 'static,
    {
        if self.mode(EntityKind::Events) != TableMode::Remote {
            return Subscription::inert();
        }
        let mut rx = self.changes.subscribe(EntityKind::Events);
        let store = Arc::clone(self);
        let callback = Arc::new(callback);
        let sequence = Arc::new(FetchSequence::new());
        let task = tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(()) | Err(broadcast::error::RecvError::Lagged(_)) => {}
                    Err(broadcast::error::RecvError::Closed) => break,
                }
                let ticket = sequence.next_ticket();
                let store = Arc::clone(&store);
                let callback = Arc::clone(&callback);
                let sequence = Arc::clone(&sequence);
                tokio::spawn(async move {
                    let snapshot = store.list_events().await.value;
                    if sequence.try_apply(ticket) {
                        callback(snapshot);
                    }
                });
            }
        });
        Subscription::active(task)
    }
}
