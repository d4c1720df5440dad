//! Item lifecycle events.
//!
//! Observers are called synchronously on pool workers. `item_found` calls
//! are serialized, each made by whichever worker is pulling the next item
//! from discovery. Every other event comes from the worker handling the
//! item. Events of different items may interleave.

use std::sync::Arc;

use backhaul_core::{FailureCause, Item, ItemKind};
use serde::Serialize;
use tokio::sync::broadcast;

use crate::EVENT_CHANNEL_SIZE;

/// An item that was just discovered, before it is scheduled.
///
/// Observers may mark it ignored. An item ignored by the filter or by an
/// earlier observer stays ignored.
#[derive(Debug)]
pub struct ItemFound<'a> {
    item: &'a Item,
    ignored: bool,
}

impl<'a> ItemFound<'a> {
    pub(crate) fn new(item: &'a Item, ignored: bool) -> Self {
        Self { item, ignored }
    }

    pub fn item(&self) -> &Item {
        self.item
    }

    /// Check if the item will be skipped.
    pub fn is_ignored(&self) -> bool {
        self.ignored
    }

    /// Skip this item.
    pub fn ignore(&mut self) {
        self.ignored = true;
    }
}

/// Receives item lifecycle events of a run.
///
/// Every method defaults to doing nothing.
pub trait TransferObserver: Send + Sync {
    /// An item was discovered.
    fn item_found(&self, _found: &mut ItemFound<'_>) {}

    /// An item was ignored.
    fn item_ignored(&self, _item: &Item) {}

    /// An attempt to copy an item is starting.
    fn item_copying(&self, _item: &Item, _attempt: u32) {}

    /// The destination stored an item.
    fn item_stored(&self, _item: &Item, _destination_id: &str) {}

    /// An item was copied successfully.
    fn item_copied(&self, _item: &Item) {}

    /// An attempt failed. `exhausted` is set on the last attempt.
    fn item_failed(&self, _item: &Item, _cause: &FailureCause, _exhausted: bool) {}
}

/// The observers registered on a job, called in registration order.
#[derive(Clone, Default)]
pub(crate) struct Observers(Vec<Arc<dyn TransferObserver>>);

impl Observers {
    pub(crate) fn push(&mut self, observer: Arc<dyn TransferObserver>) {
        self.0.push(observer);
    }

    pub(crate) fn len(&self) -> usize {
        self.0.len()
    }

    pub(crate) fn item_found(&self, found: &mut ItemFound<'_>) {
        for observer in &self.0 {
            observer.item_found(found);
        }
    }

    pub(crate) fn item_ignored(&self, item: &Item) {
        self.0.iter().for_each(|o| o.item_ignored(item));
    }

    pub(crate) fn item_copying(&self, item: &Item, attempt: u32) {
        self.0.iter().for_each(|o| o.item_copying(item, attempt));
    }

    pub(crate) fn item_stored(&self, item: &Item, destination_id: &str) {
        self.0.iter().for_each(|o| o.item_stored(item, destination_id));
    }

    pub(crate) fn item_copied(&self, item: &Item) {
        self.0.iter().for_each(|o| o.item_copied(item));
    }

    pub(crate) fn item_failed(&self, item: &Item, cause: &FailureCause, exhausted: bool) {
        self.0
            .iter()
            .for_each(|o| o.item_failed(item, cause, exhausted));
    }
}

/// Owned form of an item lifecycle event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TransferEvent {
    Found {
        key: String,
        kind: ItemKind,
        ignored: bool,
    },
    Ignored {
        key: String,
        kind: ItemKind,
    },
    Copying {
        key: String,
        kind: ItemKind,
        attempt: u32,
    },
    Stored {
        key: String,
        kind: ItemKind,
        destination_id: String,
    },
    Copied {
        key: String,
        kind: ItemKind,
    },
    Failed {
        key: String,
        kind: ItemKind,
        cause: FailureCause,
        exhausted: bool,
    },
}

impl TransferEvent {
    /// Key of the item the event is about.
    pub fn key(&self) -> &str {
        match self {
            Self::Found { key, .. }
            | Self::Ignored { key, .. }
            | Self::Copying { key, .. }
            | Self::Stored { key, .. }
            | Self::Copied { key, .. }
            | Self::Failed { key, .. } => key,
        }
    }
}

/// Forwards every event to a broadcast channel.
///
/// Events sent while nobody is subscribed are dropped. Slow receivers
/// lag instead of blocking the workers.
#[derive(Debug, Clone)]
pub struct EventBroadcaster {
    event_tx: broadcast::Sender<TransferEvent>,
}

impl EventBroadcaster {
    /// Create a broadcaster with the default channel capacity.
    pub fn new() -> Self {
        Self::with_capacity(EVENT_CHANNEL_SIZE)
    }

    /// Create a broadcaster with a custom channel capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        let (event_tx, _) = broadcast::channel(capacity.max(1));
        Self { event_tx }
    }

    /// Subscribe to events.
    pub fn subscribe(&self) -> broadcast::Receiver<TransferEvent> {
        self.event_tx.subscribe()
    }

    fn send(&self, event: TransferEvent) {
        let _ = self.event_tx.send(event);
    }
}

impl Default for EventBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

impl TransferObserver for EventBroadcaster {
    fn item_found(&self, found: &mut ItemFound<'_>) {
        self.send(TransferEvent::Found {
            key: found.item().source_path().to_string(),
            kind: found.item().kind(),
            ignored: found.is_ignored(),
        });
    }

    fn item_ignored(&self, item: &Item) {
        self.send(TransferEvent::Ignored {
            key: item.source_path().to_string(),
            kind: item.kind(),
        });
    }

    fn item_copying(&self, item: &Item, attempt: u32) {
        self.send(TransferEvent::Copying {
            key: item.source_path().to_string(),
            kind: item.kind(),
            attempt,
        });
    }

    fn item_stored(&self, item: &Item, destination_id: &str) {
        self.send(TransferEvent::Stored {
            key: item.source_path().to_string(),
            kind: item.kind(),
            destination_id: destination_id.to_string(),
        });
    }

    fn item_copied(&self, item: &Item) {
        self.send(TransferEvent::Copied {
            key: item.source_path().to_string(),
            kind: item.kind(),
        });
    }

    fn item_failed(&self, item: &Item, cause: &FailureCause, exhausted: bool) {
        self.send(TransferEvent::Failed {
            key: item.source_path().to_string(),
            kind: item.kind(),
            cause: cause.clone(),
            exhausted,
        });
    }
}

/// Logs every event through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl TransferObserver for TracingObserver {
    fn item_found(&self, found: &mut ItemFound<'_>) {
        tracing::debug!(item = %found.item(), ignored = found.is_ignored(), "found");
    }

    fn item_ignored(&self, item: &Item) {
        tracing::debug!(item = %item, "ignored");
    }

    fn item_copying(&self, item: &Item, attempt: u32) {
        tracing::debug!(item = %item, attempt, "copying");
    }

    fn item_stored(&self, item: &Item, destination_id: &str) {
        tracing::trace!(
            item = %item,
            destination = destination_id,
            path = item.destination().unwrap_or_default(),
            "stored"
        );
    }

    fn item_copied(&self, item: &Item) {
        tracing::debug!(item = %item, "copied");
    }

    fn item_failed(&self, item: &Item, cause: &FailureCause, exhausted: bool) {
        tracing::debug!(
            item = %item,
            attempt = cause.attempt,
            stage = %cause.stage,
            exhausted,
            "failed: {}",
            cause.message
        );
    }
}

#[cfg(test)]
mod tests {
    use backhaul_core::Stage;

    use super::*;

    #[test]
    fn test_item_found_ignore_is_sticky() {
        let item = Item::file("a.txt");
        let mut found = ItemFound::new(&item, false);
        assert!(!found.is_ignored());
        found.ignore();
        assert!(found.is_ignored());
    }

    #[test]
    fn test_broadcaster_forwards_events() {
        let broadcaster = EventBroadcaster::new();
        let mut rx = broadcaster.subscribe();

        let item = Item::file("a.txt");
        broadcaster.item_copying(&item, 1);
        broadcaster.item_failed(&item, &FailureCause::new(1, Stage::Read, "denied"), true);

        assert_eq!(
            rx.try_recv().unwrap(),
            TransferEvent::Copying {
                key: "a.txt".to_string(),
                kind: ItemKind::File,
                attempt: 1,
            }
        );
        match rx.try_recv().unwrap() {
            TransferEvent::Failed { exhausted, cause, .. } => {
                assert!(exhausted);
                assert_eq!(cause.stage, Stage::Read);
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn test_broadcaster_without_subscribers() {
        let broadcaster = EventBroadcaster::new();
        broadcaster.item_copied(&Item::file("a.txt"));
    }

    #[test]
    fn test_event_serialization() {
        let event = TransferEvent::Ignored {
            key: "/B".to_string(),
            kind: ItemKind::Folder,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(json, r#"{"event":"ignored","key":"/B","kind":"folder"}"#);
        assert_eq!(event.key(), "/B");
    }
}
