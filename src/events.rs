//! Cache Events Module
//!
//! Observer-style delivery of cache activity. Observers are attached to a
//! cache by composition; there is no emitter base type to inherit from.

use std::fmt;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};

// == Event Reasons ==
/// Why an entry was evicted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvictReason {
    /// The entry outlived its TTL
    Expired,
    /// The entry-count bound needed room
    Capacity,
    /// The byte budget needed room
    SizePressure,
}

impl fmt::Display for EvictReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvictReason::Expired => write!(f, "expired"),
            EvictReason::Capacity => write!(f, "capacity"),
            EvictReason::SizePressure => write!(f, "size pressure"),
        }
    }
}

/// Why an entry was invalidated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidateReason {
    /// Direct call for this key
    Explicit,
    /// Source fingerprint no longer matches
    Stale,
    /// Matched a pattern invalidation
    Pattern,
    /// Matched a prefix invalidation
    Prefix,
    /// Removed through a resource its key was registered against
    Dependency,
}

impl fmt::Display for InvalidateReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvalidateReason::Explicit => write!(f, "explicit"),
            InvalidateReason::Stale => write!(f, "stale"),
            InvalidateReason::Pattern => write!(f, "pattern"),
            InvalidateReason::Prefix => write!(f, "prefix"),
            InvalidateReason::Dependency => write!(f, "dependency"),
        }
    }
}

// == Cache Event ==
/// What happened to a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    Hit,
    Miss,
    Evicted(EvictReason),
    Invalidated(InvalidateReason),
    /// Value exceeded the per-item budget and was served uncached
    Skipped { size_bytes: usize },
}

/// A single cache event, timestamped at emission.
#[derive(Debug, Clone)]
pub struct CacheEvent {
    pub key: String,
    pub kind: EventKind,
    pub at: DateTime<Utc>,
}

impl CacheEvent {
    pub fn new(key: impl Into<String>, kind: EventKind) -> Self {
        Self {
            key: key.into(),
            kind,
            at: Utc::now(),
        }
    }
}

// == Observer ==
/// Receives cache events synchronously, after the store lock is released.
///
/// Implementations must be cheap; a slow observer delays the read that
/// triggered the event.
pub trait CacheObserver: Send + Sync {
    fn on_event(&self, event: &CacheEvent);
}

// == Notifier ==
/// Fan-out of events to the registered observers.
#[derive(Clone, Default)]
pub struct Notifier {
    observers: Arc<RwLock<Vec<Arc<dyn CacheObserver>>>>,
}

impl Notifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an observer. Observers cannot be removed individually;
    /// `clear` drops them all.
    pub fn subscribe(&self, observer: Arc<dyn CacheObserver>) {
        if let Ok(mut observers) = self.observers.write() {
            observers.push(observer);
        }
    }

    /// Drops every registered observer.
    pub fn clear(&self) {
        if let Ok(mut observers) = self.observers.write() {
            observers.clear();
        }
    }

    /// Delivers each event to each observer, in registration order.
    pub fn notify(&self, events: &[CacheEvent]) {
        if events.is_empty() {
            return;
        }
        if let Ok(observers) = self.observers.read() {
            for event in events {
                for observer in observers.iter() {
                    observer.on_event(event);
                }
            }
        }
    }
}
