//! Scope-keyed instance cache and per-scope construction locks.

use std::any::Any;
use std::sync::{Arc, Weak};

use ahash::AHashMap;
use parking_lot::{Mutex, ReentrantMutex};

use crate::binding::{Binding, BindingId};
use crate::instance::{Instance, InstanceReference};
use crate::planning::Plan;
use crate::scope::{ScopeId, ScopeObject};

/// One cached activation, retaining what deactivation needs after the
/// originating context is gone.
pub(crate) struct CacheEntry {
    pub(crate) binding: Arc<Binding>,
    pub(crate) plan: Option<Arc<Plan>>,
    pub(crate) scope: Weak<dyn Any + Send + Sync>,
    pub(crate) reference: Arc<InstanceReference>,
}

/// Store of activated instances keyed by `(binding, scope identity)`.
///
/// Entry lookups validate scope liveness through the retained `Weak`, so a
/// recycled allocation address can never alias a dead scope. The lock
/// registry realizes "lock on the scope object": one lazily-created mutex per
/// scope identity, taken only around cached construction.
pub struct Cache {
    entries: Mutex<AHashMap<ScopeId, Vec<CacheEntry>>>,
    locks: Mutex<AHashMap<ScopeId, Arc<ReentrantMutex<()>>>>,
}

impl Cache {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(AHashMap::new()),
            locks: Mutex::new(AHashMap::new()),
        }
    }

    /// Fast-path lookup; takes only the bucket map lock, never the per-scope
    /// construction lock.
    pub(crate) fn try_get(&self, binding: BindingId, scope: &ScopeObject) -> Option<Instance> {
        let scope_id = ScopeId::of(scope);
        let entries = self.entries.lock();
        let bucket = entries.get(&scope_id)?;
        bucket
            .iter()
            .find(|entry| entry.binding.id() == binding && entry.scope.strong_count() > 0)
            .and_then(|entry| entry.reference.instance())
    }

    /// The construction mutex for a scope, created on first use.
    ///
    /// Reentrant: a provider constructing under this lock may resolve further
    /// services cached under the same scope on the same thread.
    pub(crate) fn construction_lock(&self, scope: &ScopeObject) -> Arc<ReentrantMutex<()>> {
        self.locks
            .lock()
            .entry(ScopeId::of(scope))
            .or_insert_with(|| Arc::new(ReentrantMutex::new(())))
            .clone()
    }

    /// Records a freshly activated instance under `(binding, scope)`.
    pub(crate) fn remember(
        &self,
        binding: Arc<Binding>,
        plan: Option<Arc<Plan>>,
        scope: &ScopeObject,
        reference: Arc<InstanceReference>,
    ) {
        let scope_id = ScopeId::of(scope);
        self.entries.lock().entry(scope_id).or_default().push(CacheEntry {
            binding,
            plan,
            scope: Arc::downgrade(scope),
            reference,
        });
    }

    /// Removes every entry holding the given instance identity.
    pub(crate) fn release(&self, instance_id: usize) -> Vec<CacheEntry> {
        let mut entries = self.entries.lock();
        let mut removed = Vec::new();
        let mut emptied = Vec::new();
        for (scope_id, bucket) in entries.iter_mut() {
            let mut kept = Vec::with_capacity(bucket.len());
            for entry in bucket.drain(..) {
                if entry.reference.id() == instance_id {
                    removed.push(entry);
                } else {
                    kept.push(entry);
                }
            }
            *bucket = kept;
            if bucket.is_empty() {
                emptied.push(*scope_id);
            }
        }
        for scope_id in emptied {
            entries.remove(&scope_id);
            self.locks.lock().remove(&scope_id);
        }
        removed
    }

    /// Removes every entry owned by the given scope.
    pub(crate) fn clear(&self, scope_id: ScopeId) -> Vec<CacheEntry> {
        let removed = self.entries.lock().remove(&scope_id).unwrap_or_default();
        self.locks.lock().remove(&scope_id);
        removed
    }

    /// Removes entries whose scope object has been dropped.
    pub(crate) fn prune(&self) -> Vec<CacheEntry> {
        let mut entries = self.entries.lock();
        let mut removed = Vec::new();
        let mut emptied = Vec::new();
        for (scope_id, bucket) in entries.iter_mut() {
            let mut kept = Vec::with_capacity(bucket.len());
            for entry in bucket.drain(..) {
                if entry.scope.strong_count() == 0 {
                    removed.push(entry);
                } else {
                    kept.push(entry);
                }
            }
            *bucket = kept;
            if bucket.is_empty() {
                emptied.push(*scope_id);
            }
        }
        for scope_id in emptied {
            entries.remove(&scope_id);
            self.locks.lock().remove(&scope_id);
        }
        removed
    }

    /// Drains the whole cache (kernel shutdown).
    pub(crate) fn clear_all(&self) -> Vec<CacheEntry> {
        let mut entries = self.entries.lock();
        self.locks.lock().clear();
        entries.drain().flat_map(|(_, bucket)| bucket).collect()
    }

    /// Number of live cached instances.
    pub fn len(&self) -> usize {
        self.entries.lock().values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for Cache {
    fn default() -> Self {
        Self::new()
    }
}
