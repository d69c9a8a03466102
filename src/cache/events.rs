//! Event Hub Module
//!
//! Typed cache events and the observer registry that dispatches them.

use std::collections::HashMap;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use serde::Serialize;
use tracing::error;

// == Event Kinds ==
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum EventKind {
    Hit,
    Miss,
    Eviction,
    MemoryWarning,
}

/// Why a read missed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MissReason {
    Expired,
    /// Stored payload could not be decompressed
    Corrupted,
}

/// What triggered an eviction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EvictionReason {
    /// Memory budget needed room for an incoming entry
    SpaceNeeded,
    /// Entry count exceeded `max_entries`
    MemoryLimit,
    /// Removed by the periodic expiry sweep
    Expired,
}

impl EvictionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            EvictionReason::SpaceNeeded => "space_needed",
            EvictionReason::MemoryLimit => "memory_limit",
            EvictionReason::Expired => "expired",
        }
    }
}

impl fmt::Display for EvictionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// == Cache Event ==
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum CacheEvent {
    Hit {
        key: String,
        size: u64,
        age_ms: u64,
    },
    Miss {
        key: String,
        timestamp: u64,
        reason: Option<MissReason>,
    },
    Eviction {
        keys: Vec<String>,
        bytes_freed: u64,
        reason: EvictionReason,
    },
    MemoryWarning {
        usage_bytes: u64,
        limit_bytes: u64,
        percentage: f64,
    },
}

impl CacheEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            CacheEvent::Hit { .. } => EventKind::Hit,
            CacheEvent::Miss { .. } => EventKind::Miss,
            CacheEvent::Eviction { .. } => EventKind::Eviction,
            CacheEvent::MemoryWarning { .. } => EventKind::MemoryWarning,
        }
    }
}

/// Observer callback.
pub type EventCallback = Arc<dyn Fn(&CacheEvent) + Send + Sync>;

/// Handle returned by [`EventHub::on`], used to unregister.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

// == Event Hub ==
#[derive(Default)]
pub struct EventHub {
    listeners: HashMap<EventKind, Vec<(ListenerId, EventCallback)>>,
    next_id: u64,
}

impl fmt::Debug for EventHub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let counts: HashMap<&EventKind, usize> =
            self.listeners.iter().map(|(k, v)| (k, v.len())).collect();
        f.debug_struct("EventHub").field("listeners", &counts).finish()
    }
}

impl EventHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `callback` for `kind`.
    pub fn on(&mut self, kind: EventKind, callback: EventCallback) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners.entry(kind).or_default().push((id, callback));
        id
    }

    /// Unregisters one callback. Returns false if it was not registered.
    pub fn off(&mut self, kind: EventKind, id: ListenerId) -> bool {
        let Some(callbacks) = self.listeners.get_mut(&kind) else {
            return false;
        };
        let before = callbacks.len();
        callbacks.retain(|(listener, _)| *listener != id);
        callbacks.len() != before
    }

    pub fn has_listeners(&self, kind: EventKind) -> bool {
        self.listeners.get(&kind).is_some_and(|c| !c.is_empty())
    }

    // == Emit ==
    /// Invokes every callback for the event's kind, in registration order.
    ///
    /// A panicking callback is logged and skipped; the rest still run.
    pub fn emit(&self, event: &CacheEvent) {
        let Some(callbacks) = self.listeners.get(&event.kind()) else {
            return;
        };
        for (id, callback) in callbacks {
            if catch_unwind(AssertUnwindSafe(|| callback(event))).is_err() {
                error!("Cache observer {:?} panicked handling {:?}", id, event.kind());
            }
        }
    }

    pub fn clear(&mut self) {
        self.listeners.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counter() -> (Arc<AtomicUsize>, EventCallback) {
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        (
            count,
            Arc::new(move |_: &CacheEvent| {
                c.fetch_add(1, Ordering::SeqCst);
            }),
        )
    }

    fn hit() -> CacheEvent {
        CacheEvent::Hit {
            key: "k".into(),
            size: 1,
            age_ms: 0,
        }
    }

    #[test]
    fn test_emit_only_reaches_matching_kind() {
        let mut hub = EventHub::new();
        let (hits, on_hit) = counter();
        let (misses, on_miss) = counter();
        hub.on(EventKind::Hit, on_hit);
        hub.on(EventKind::Miss, on_miss);

        hub.emit(&hit());

        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(misses.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_off_removes_specific_callback() {
        let mut hub = EventHub::new();
        let (first, cb1) = counter();
        let (second, cb2) = counter();
        let id1 = hub.on(EventKind::Hit, cb1);
        hub.on(EventKind::Hit, cb2);

        assert!(hub.off(EventKind::Hit, id1));
        assert!(!hub.off(EventKind::Hit, id1));
        assert!(!hub.off(EventKind::Miss, id1));

        hub.emit(&hit());
        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_panicking_observer_does_not_stop_dispatch() {
        let mut hub = EventHub::new();
        let (count, cb) = counter();
        hub.on(EventKind::Hit, Arc::new(|_: &CacheEvent| panic!("observer bug")));
        hub.on(EventKind::Hit, cb);

        hub.emit(&hit());

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_event_serializes_with_type_tag() {
        let event = CacheEvent::Eviction {
            keys: vec!["a".into()],
            bytes_freed: 10,
            reason: EvictionReason::SpaceNeeded,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "eviction");
        assert_eq!(json["reason"], "space_needed");
        assert_eq!(event.kind(), EventKind::Eviction);
    }

    #[test]
    fn test_eviction_reason_wire_names() {
        for (reason, name) in [
            (EvictionReason::SpaceNeeded, "space_needed"),
            (EvictionReason::MemoryLimit, "memory_limit"),
            (EvictionReason::Expired, "expired"),
        ] {
            assert_eq!(reason.as_str(), name);
            assert_eq!(serde_json::to_value(reason).unwrap(), name);
        }
    }
}
