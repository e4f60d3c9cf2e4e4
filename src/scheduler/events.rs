//! Typed observer registry for resource lifecycle events

use parking_lot::RwLock;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use super::resource::ResourceSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Queued,
    Updated,
    Removed,
}

/// Handle returned by `subscribe`, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

pub type Callback = Arc<dyn Fn(&ResourceSnapshot) + Send + Sync>;

#[derive(Default)]
struct Subscribers {
    queued: Vec<(SubscriptionId, Callback)>,
    updated: Vec<(SubscriptionId, Callback)>,
    removed: Vec<(SubscriptionId, Callback)>,
}

impl Subscribers {
    fn list(&self, kind: EventKind) -> &Vec<(SubscriptionId, Callback)> {
        match kind {
            EventKind::Queued => &self.queued,
            EventKind::Updated => &self.updated,
            EventKind::Removed => &self.removed,
        }
    }

    fn list_mut(&mut self, kind: EventKind) -> &mut Vec<(SubscriptionId, Callback)> {
        match kind {
            EventKind::Queued => &mut self.queued,
            EventKind::Updated => &mut self.updated,
            EventKind::Removed => &mut self.removed,
        }
    }
}

/// Fans snapshots out to the callbacks subscribed for each event kind.
///
/// Callbacks run synchronously on the emitting task, outside the subscriber
/// lock, so a callback may itself subscribe or unsubscribe.
#[derive(Default)]
pub struct Notifier {
    next_id: AtomicU64,
    subscribers: RwLock<Subscribers>,
}

impl Notifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, kind: EventKind, callback: F) -> SubscriptionId
    where
        F: Fn(&ResourceSnapshot) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.subscribers
            .write()
            .list_mut(kind)
            .push((id, Arc::new(callback)));
        id
    }

    /// Removes a subscription from whichever list holds it.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.subscribers.write();
        for kind in [EventKind::Queued, EventKind::Updated, EventKind::Removed] {
            let list = subscribers.list_mut(kind);
            if let Some(pos) = list.iter().position(|(sid, _)| *sid == id) {
                list.remove(pos);
                return true;
            }
        }
        false
    }

    pub fn emit(&self, kind: EventKind, snapshot: &ResourceSnapshot) {
        let callbacks: Vec<Callback> = self
            .subscribers
            .read()
            .list(kind)
            .iter()
            .map(|(_, cb)| Arc::clone(cb))
            .collect();

        tracing::trace!(
            event = ?kind,
            address = %snapshot.address,
            state = %snapshot.state,
            subscribers = callbacks.len(),
            "Emitting resource event"
        );

        for callback in callbacks {
            callback(snapshot);
        }
    }

    pub fn subscriber_count(&self, kind: EventKind) -> usize {
        self.subscribers.read().list(kind).len()
    }
}

impl std::fmt::Debug for Notifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let subscribers = self.subscribers.read();
        f.debug_struct("Notifier")
            .field("queued", &subscribers.queued.len())
            .field("updated", &subscribers.updated.len())
            .field("removed", &subscribers.removed.len())
            .finish()
    }
}
