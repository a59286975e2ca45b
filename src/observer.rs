//! Diagnostic observers for resolution traceability.
//!
//! Hooks for observing resolution and release events: structured tracing,
//! timing, and debugging of binding graphs. Observer calls are synchronous;
//! keep implementations lightweight.

use std::sync::Arc;
use std::time::Duration;

use crate::key::Key;

/// Observer of kernel resolution events.
///
/// # Examples
///
/// ```rust
/// use std::time::Duration;
/// use shinobi_di::{Key, ResolutionObserver};
///
/// struct TracingObserver;
///
/// impl ResolutionObserver for TracingObserver {
///     fn resolving(&self, key: &Key) {
///         eprintln!("resolving {}", key.display_name());
///     }
///
///     fn resolved(&self, key: &Key, duration: Duration) {
///         eprintln!("resolved {} in {:?}", key.display_name(), duration);
///     }
/// }
/// ```
pub trait ResolutionObserver: Send + Sync {
    /// Called before a root or nested resolution starts.
    fn resolving(&self, key: &Key);

    /// Called when a resolution completes (successfully or not).
    fn resolved(&self, key: &Key, duration: Duration);

    /// Called when a cached instance is deactivated and evicted.
    fn released(&self, _key: &Key) {}
}

/// Fan-out collection of observers with a cheap emptiness fast path.
pub struct Observers {
    list: Vec<Arc<dyn ResolutionObserver>>,
}

impl Observers {
    pub fn new() -> Self {
        Self { list: Vec::new() }
    }

    pub fn add(&mut self, observer: Arc<dyn ResolutionObserver>) {
        self.list.push(observer);
    }

    #[inline(always)]
    pub fn has_observers(&self) -> bool {
        !self.list.is_empty()
    }

    pub fn resolving(&self, key: &Key) {
        for observer in &self.list {
            observer.resolving(key);
        }
    }

    pub fn resolved(&self, key: &Key, duration: Duration) {
        for observer in &self.list {
            observer.resolved(key, duration);
        }
    }

    pub fn released(&self, key: &Key) {
        for observer in &self.list {
            observer.released(key);
        }
    }
}

impl Default for Observers {
    fn default() -> Self {
        Self::new()
    }
}

/// Ready-made observer that prints resolution events to stderr.
pub struct LoggingObserver {
    prefix: &'static str,
}

impl LoggingObserver {
    pub fn new(prefix: &'static str) -> Self {
        Self { prefix }
    }
}

impl Default for LoggingObserver {
    fn default() -> Self {
        Self::new("shinobi-di")
    }
}

impl ResolutionObserver for LoggingObserver {
    fn resolving(&self, key: &Key) {
        eprintln!("[{}] resolving: {}", self.prefix, key.display_name());
    }

    fn resolved(&self, key: &Key, duration: Duration) {
        eprintln!("[{}] resolved: {} in {:?}", self.prefix, key.display_name(), duration);
    }

    fn released(&self, key: &Key) {
        eprintln!("[{}] released: {}", self.prefix, key.display_name());
    }
}
