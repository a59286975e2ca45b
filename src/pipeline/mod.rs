//! The activation pipeline: ordered initialize / activate / deactivate
//! strategies with idempotence guarantees.

use std::any::Any;
use std::sync::{Arc, Weak};

use ahash::AHashMap;
use parking_lot::Mutex;

use crate::binding::Binding;
use crate::context::Context;
use crate::error::DiResult;
use crate::instance::{Instance, InstanceReference};
use crate::planning::Plan;

pub mod strategies;

/// Lifecycle opt-in: instances implementing this are started during
/// activation and stopped during deactivation.
///
/// Concrete types opt in through [`PlanBuilder::startable`](crate::PlanBuilder::startable);
/// trait bindings through [`BindingBuilder::startable_trait`](crate::BindingBuilder::startable_trait).
pub trait Startable: Send + Sync {
    fn start(&self);
    fn stop(&self);
}

/// Mutates or replaces a freshly constructed raw instance.
///
/// Runs for every new instance, before it is cached; a strategy may return a
/// different object (decorators) as long as it stays downcastable to the
/// declared type.
pub trait InitializationStrategy: Send + Sync {
    fn initialize(&self, ctx: &Context, instance: Instance) -> DiResult<Instance>;
}

/// Side-effecting hook run once per logical instance after initialization.
pub trait ActivationStrategy: Send + Sync {
    fn activate(&self, ctx: &Context, reference: &InstanceReference) -> DiResult<()>;
}

/// Reverse hook run once per logical instance when it leaves the container.
pub trait DeactivationStrategy: Send + Sync {
    fn deactivate(&self, binding: &Binding, plan: Option<&Plan>, reference: &InstanceReference);
}

type WeakAny = Weak<dyn Any + Send + Sync>;

/// Identity-keyed record of which instances have been activated/deactivated.
///
/// Entries hold a `Weak` to the instance storage: a dead weak is a stale mark
/// left by a dropped instance whose address was recycled, and is overwritten.
pub struct ActivationCache {
    activated: Mutex<AHashMap<usize, WeakAny>>,
    deactivated: Mutex<AHashMap<usize, WeakAny>>,
}

impl ActivationCache {
    pub fn new() -> Self {
        Self {
            activated: Mutex::new(AHashMap::new()),
            deactivated: Mutex::new(AHashMap::new()),
        }
    }

    fn mark(map: &Mutex<AHashMap<usize, WeakAny>>, instance: &Instance) -> bool {
        let mut map = map.lock();
        match map.get(&instance.id()) {
            Some(existing) if existing.strong_count() > 0 => false,
            _ => {
                map.insert(instance.id(), instance.downgrade());
                true
            }
        }
    }

    /// Records the instance as activated; `false` if it already was.
    pub fn mark_activated(&self, instance: &Instance) -> bool {
        Self::mark(&self.activated, instance)
    }

    /// Records the instance as deactivated; `false` if it already was.
    pub fn mark_deactivated(&self, instance: &Instance) -> bool {
        Self::mark(&self.deactivated, instance)
    }

    pub fn is_activated(&self, instance: &Instance) -> bool {
        self.activated
            .lock()
            .get(&instance.id())
            .map_or(false, |existing| existing.strong_count() > 0)
    }

    pub fn is_deactivated(&self, instance: &Instance) -> bool {
        self.deactivated
            .lock()
            .get(&instance.id())
            .map_or(false, |existing| existing.strong_count() > 0)
    }

    /// Drops stale marks whose instances are gone.
    pub fn prune(&self) {
        self.activated.lock().retain(|_, weak| weak.strong_count() > 0);
        self.deactivated.lock().retain(|_, weak| weak.strong_count() > 0);
    }
}

impl Default for ActivationCache {
    fn default() -> Self {
        Self::new()
    }
}

/// The ordered strategy lists applied around construction.
pub struct Pipeline {
    initializations: Vec<Arc<dyn InitializationStrategy>>,
    activations: Vec<Arc<dyn ActivationStrategy>>,
    deactivations: Vec<Arc<dyn DeactivationStrategy>>,
    cache: ActivationCache,
}

impl Pipeline {
    /// The standard strategy complement, with user extensions appended.
    pub(crate) fn standard(
        extra_initializations: Vec<Arc<dyn InitializationStrategy>>,
        extra_activations: Vec<Arc<dyn ActivationStrategy>>,
        extra_deactivations: Vec<Arc<dyn DeactivationStrategy>>,
    ) -> Self {
        let mut initializations: Vec<Arc<dyn InitializationStrategy>> = vec![
            Arc::new(strategies::PropertyInjectionStrategy),
            Arc::new(strategies::MethodInjectionStrategy),
            Arc::new(strategies::BindingInitializationStrategy),
        ];
        initializations.extend(extra_initializations);

        let mut activations: Vec<Arc<dyn ActivationStrategy>> = vec![
            Arc::new(strategies::BindingActivationStrategy),
            Arc::new(strategies::StartableActivationStrategy),
        ];
        activations.extend(extra_activations);

        let mut deactivations: Vec<Arc<dyn DeactivationStrategy>> = vec![
            Arc::new(strategies::BindingDeactivationStrategy),
            Arc::new(strategies::StartableDeactivationStrategy),
        ];
        deactivations.extend(extra_deactivations);

        Self {
            initializations,
            activations,
            deactivations,
            cache: ActivationCache::new(),
        }
    }

    /// Runs every initialization strategy over a new raw instance.
    ///
    /// Not gated by the activation cache: a freshly built instance has never
    /// been initialized.
    pub fn initialize(&self, ctx: &Context, mut instance: Instance) -> DiResult<Instance> {
        for strategy in &self.initializations {
            instance = strategy.initialize(ctx, instance)?;
        }
        Ok(instance)
    }

    /// Runs activation strategies at most once per logical instance.
    ///
    /// The activated mark is recorded before any user strategy runs; a
    /// strategy that fails leaves the instance marked, so retries through
    /// other contexts cannot duplicate side effects.
    pub fn activate(&self, ctx: &Context, reference: &InstanceReference) -> DiResult<()> {
        if self.activations.is_empty() {
            return Ok(());
        }
        let Some(instance) = reference.instance() else {
            return Ok(());
        };
        if !self.cache.mark_activated(&instance) {
            return Ok(());
        }
        for strategy in &self.activations {
            strategy.activate(ctx, reference)?;
        }
        Ok(())
    }

    /// Runs deactivation strategies at most once, then clears the reference.
    pub(crate) fn deactivate(
        &self,
        binding: &Binding,
        plan: Option<&Plan>,
        reference: &InstanceReference,
    ) {
        if let Some(instance) = reference.instance() {
            if self.deactivations.is_empty() || self.cache.mark_deactivated(&instance) {
                for strategy in &self.deactivations {
                    strategy.deactivate(binding, plan, reference);
                }
            }
        }
        reference.clear();
    }

    pub fn activation_cache(&self) -> &ActivationCache {
        &self.cache
    }
}
