//! The kernel: binding registry, component wiring, and the typed entry points.

use std::any::Any;
use std::sync::Arc;
use std::time::Instant;

use ahash::AHashMap;

use crate::binding::Binding;
use crate::cache::{Cache, CacheEntry};
use crate::components::ComponentContainer;
use crate::context::Context;
use crate::error::{DiError, DiResult};
use crate::instance::{Instance, ResolvedValue};
use crate::key::{key_of_trait, key_of_type, Key};
use crate::observer::{Observers, ResolutionObserver};
use crate::parameters::Parameter;
use crate::pipeline::{ActivationStrategy, DeactivationStrategy, InitializationStrategy, Pipeline};
use crate::planning::selection::{ConstructorScorer, ConstructorSelector, StandardScorer};
use crate::planning::{PlanBuilder, Planner, RegistryPlanner};
use crate::provider::{CallbackProvider, CoercingProvider, ConstantProvider, StandardProvider};
use crate::request::{Constraint, Request};
use crate::scope::{ScopeCallback, ScopeId, ScopeObject};
use crate::settings::ContainerSettings;

/// The container: resolves services against the configured bindings.
///
/// A `Kernel` is a cheaply cloneable handle (`Arc` internally) and is fully
/// thread-safe: any number of threads may resolve concurrently. Bindings and
/// plans are immutable after [`KernelBuilder::build`]; the scope-keyed cache
/// and the activation bookkeeping are the only shared mutable state.
///
/// # Examples
///
/// ```rust
/// use shinobi_di::KernelBuilder;
///
/// struct Config { port: u16 }
///
/// let mut builder = KernelBuilder::new();
/// builder.add_constant(Config { port: 8080 });
/// let kernel = builder.build();
///
/// let config = kernel.get::<Config>().unwrap();
/// assert_eq!(config.port, 8080);
/// ```
pub struct Kernel {
    inner: Arc<KernelInner>,
}

impl Clone for Kernel {
    fn clone(&self) -> Self {
        Self { inner: self.inner.clone() }
    }
}

pub(crate) struct KernelInner {
    bindings: AHashMap<Key, Vec<Arc<Binding>>>,
    settings: Arc<ContainerSettings>,
    planner: Arc<dyn Planner>,
    selector: Arc<ConstructorSelector>,
    pipeline: Arc<Pipeline>,
    cache: Arc<Cache>,
    components: ComponentContainer,
    observers: Observers,
}

impl Drop for KernelInner {
    fn drop(&mut self) {
        // Last handle gone: deactivate whatever is still cached.
        for entry in self.cache.clear_all() {
            self.pipeline.deactivate(&entry.binding, entry.plan.as_deref(), &entry.reference);
        }
    }
}

impl Kernel {
    pub fn settings(&self) -> &ContainerSettings {
        &*self.inner.settings
    }

    pub(crate) fn cache(&self) -> &Cache {
        &self.inner.cache
    }

    pub(crate) fn pipeline(&self) -> &Pipeline {
        &self.inner.pipeline
    }

    /// The planner capability; custom plan-driven providers resolve plans
    /// through this.
    pub fn planner(&self) -> &dyn Planner {
        self.inner.planner.as_ref()
    }

    /// The constructor selector used by plan-driven providers.
    pub fn selector(&self) -> &ConstructorSelector {
        &self.inner.selector
    }

    /// Looks up one of the kernel's own components (cache, pipeline,
    /// selector, settings, default planner).
    pub fn component<T: Any + Send + Sync>(&self) -> DiResult<Arc<T>> {
        self.inner.components.get::<T>()
    }

    /// Whether any binding exists for the key; constructor scoring uses this
    /// to judge target satisfiability.
    pub fn has_binding(&self, key: &Key) -> bool {
        self.inner.bindings.contains_key(key)
    }

    /// The kernel's identity as a scope object (singleton scope).
    pub(crate) fn scope_object(&self) -> ScopeObject {
        self.inner.clone()
    }

    // ----- Resolution -----

    pub(crate) fn resolve_request(&self, request: &Arc<Request>) -> DiResult<ResolvedValue> {
        if self.inner.observers.has_observers() {
            let start = Instant::now();
            self.inner.observers.resolving(request.service());
            let result = self.resolve_request_impl(request);
            self.inner.observers.resolved(request.service(), start.elapsed());
            result
        } else {
            self.resolve_request_impl(request)
        }
    }

    fn resolve_request_impl(&self, request: &Arc<Request>) -> DiResult<ResolvedValue> {
        let binding = self.select_binding(request)?;
        Context::new(self.clone(), request.clone(), binding).resolve()
    }

    /// Picks the single binding satisfying a unique request: condition and
    /// constraint filters first, then the top-weight group. A tie within the
    /// top group fails rather than guessing.
    fn select_binding(&self, request: &Arc<Request>) -> DiResult<Arc<Binding>> {
        let name = request.service().display_name();
        let Some(list) = self.inner.bindings.get(request.service()) else {
            return Err(DiError::NotFound(name));
        };
        let matched: Vec<&Arc<Binding>> = list
            .iter()
            .filter(|b| b.matches(request) && request.constraint_allows(b.metadata()))
            .collect();
        let Some(top) = matched.iter().map(|b| b.weight()).max() else {
            return Err(DiError::NotFound(name));
        };
        let mut winners = matched.iter().filter(|b| b.weight() == top);
        let first = winners.next();
        let extra = winners.count();
        match (first, extra) {
            (Some(binding), 0) => Ok((**binding).clone()),
            (Some(_), more) => Err(DiError::AmbiguousBindings(name, more + 1)),
            (None, _) => Err(DiError::NotFound(name)),
        }
    }

    fn resolve_all(&self, request: &Arc<Request>) -> DiResult<Vec<Instance>> {
        let Some(list) = self.inner.bindings.get(request.service()) else {
            return Ok(Vec::new());
        };
        let mut results = Vec::new();
        for binding in list {
            if binding.matches(request) && request.constraint_allows(binding.metadata()) {
                let ctx = Context::new(self.clone(), request.clone(), binding.clone());
                if let Some(instance) = ctx.resolve()? {
                    results.push(instance);
                }
            }
        }
        Ok(results)
    }

    // ----- Typed entry points: concrete services -----

    /// Resolves a concrete service, failing on zero or ambiguous bindings.
    pub fn get<T: Any + Send + Sync>(&self) -> DiResult<Arc<T>> {
        self.get_with(Vec::new())
    }

    /// Resolves a concrete service with caller-supplied parameter overrides.
    pub fn get_with<T: Any + Send + Sync>(&self, parameters: Vec<Parameter>) -> DiResult<Arc<T>> {
        let request = Request::root(key_of_type::<T>(), parameters, false, true);
        self.expect_value::<T>(self.resolve_request(&request)?)
    }

    /// Resolves a concrete service restricted by a metadata constraint.
    pub fn get_constrained<T: Any + Send + Sync>(
        &self,
        constraint: Constraint,
        parameters: Vec<Parameter>,
    ) -> DiResult<Arc<T>> {
        let request =
            Request::root_with(key_of_type::<T>(), parameters, Some(constraint), None, false, true);
        self.expect_value::<T>(self.resolve_request(&request)?)
    }

    /// Resolves a concrete service registered under a binding name.
    pub fn get_named<T: Any + Send + Sync>(&self, name: &'static str) -> DiResult<Arc<T>> {
        self.get_constrained(Arc::new(move |m| m.name == Some(name)), Vec::new())
    }

    /// Resolves a concrete service under a request-level scope override,
    /// which takes precedence over the binding's own scope callback.
    pub fn get_in_scope<T: Any + Send + Sync>(
        &self,
        scope: &ScopeObject,
        parameters: Vec<Parameter>,
    ) -> DiResult<Arc<T>> {
        let request = Request::root_with(
            key_of_type::<T>(),
            parameters,
            None,
            Some(scope.clone()),
            false,
            true,
        );
        self.expect_value::<T>(self.resolve_request(&request)?)
    }

    /// Resolves a concrete service, returning `Ok(None)` when no binding
    /// matches or the provider produced nothing (with null injection on).
    pub fn try_get<T: Any + Send + Sync>(&self) -> DiResult<Option<Arc<T>>> {
        self.try_get_with(Vec::new())
    }

    pub fn try_get_with<T: Any + Send + Sync>(
        &self,
        parameters: Vec<Parameter>,
    ) -> DiResult<Option<Arc<T>>> {
        let request = Request::root(key_of_type::<T>(), parameters, true, true);
        match self.resolve_request(&request) {
            Ok(Some(instance)) => Ok(Some(instance.downcast::<T>()?)),
            Ok(None) => Ok(None),
            Err(DiError::NotFound(_)) => Ok(None),
            Err(error) => Err(error),
        }
    }

    /// Resolves every matching binding in registration order; empty values
    /// are skipped.
    pub fn get_all<T: Any + Send + Sync>(&self) -> DiResult<Vec<Arc<T>>> {
        let request = Request::root(key_of_type::<T>(), Vec::new(), true, false);
        self.resolve_all(&request)?.iter().map(|i| i.downcast::<T>()).collect()
    }

    // ----- Typed entry points: trait-object services -----

    pub fn get_trait<S: ?Sized + Send + Sync + 'static>(&self) -> DiResult<Arc<S>> {
        self.get_trait_with(Vec::new())
    }

    pub fn get_trait_with<S: ?Sized + Send + Sync + 'static>(
        &self,
        parameters: Vec<Parameter>,
    ) -> DiResult<Arc<S>> {
        let request = Request::root(key_of_trait::<S>(), parameters, false, true);
        match self.resolve_request(&request)? {
            Some(instance) => instance.downcast_trait::<S>(),
            None => Err(DiError::NullInjection(std::any::type_name::<S>())),
        }
    }

    pub fn get_named_trait<S: ?Sized + Send + Sync + 'static>(
        &self,
        name: &'static str,
    ) -> DiResult<Arc<S>> {
        let constraint: Constraint = Arc::new(move |m| m.name == Some(name));
        let request =
            Request::root_with(key_of_trait::<S>(), Vec::new(), Some(constraint), None, false, true);
        match self.resolve_request(&request)? {
            Some(instance) => instance.downcast_trait::<S>(),
            None => Err(DiError::NullInjection(std::any::type_name::<S>())),
        }
    }

    pub fn try_get_trait<S: ?Sized + Send + Sync + 'static>(&self) -> DiResult<Option<Arc<S>>> {
        let request = Request::root(key_of_trait::<S>(), Vec::new(), true, true);
        match self.resolve_request(&request) {
            Ok(Some(instance)) => Ok(Some(instance.downcast_trait::<S>()?)),
            Ok(None) => Ok(None),
            Err(DiError::NotFound(_)) => Ok(None),
            Err(error) => Err(error),
        }
    }

    pub fn get_all_trait<S: ?Sized + Send + Sync + 'static>(&self) -> DiResult<Vec<Arc<S>>> {
        let request = Request::root(key_of_trait::<S>(), Vec::new(), true, false);
        self.resolve_all(&request)?.iter().map(|i| i.downcast_trait::<S>()).collect()
    }

    fn expect_value<T: Any + Send + Sync>(&self, value: ResolvedValue) -> DiResult<Arc<T>> {
        match value {
            Some(instance) => instance.downcast::<T>(),
            None => Err(DiError::NullInjection(std::any::type_name::<T>())),
        }
    }

    // ----- Lifetime management -----

    /// Deactivates and evicts the cached instance, if the kernel owns one
    /// with this identity. Returns whether anything was released; repeated
    /// calls are no-ops.
    pub fn release<T: ?Sized + Send + Sync + 'static>(&self, instance: &Arc<T>) -> bool {
        let id = Arc::as_ptr(instance).cast::<()>() as usize;
        let entries = self.inner.cache.release(id);
        let released = !entries.is_empty();
        self.deactivate_entries(entries);
        released
    }

    /// Deactivates and evicts every instance owned by the scope object.
    pub fn clear_scope(&self, scope: &ScopeObject) {
        let entries = self.inner.cache.clear(ScopeId::of(scope));
        self.deactivate_entries(entries);
    }

    /// Deactivates and evicts entries whose scope object has been dropped
    /// (exited threads, discarded custom scopes).
    pub fn prune(&self) {
        let entries = self.inner.cache.prune();
        self.deactivate_entries(entries);
        self.inner.pipeline.activation_cache().prune();
    }

    /// Deactivates and evicts everything; also runs when the last kernel
    /// handle drops.
    pub fn shutdown(&self) {
        let entries = self.inner.cache.clear_all();
        self.deactivate_entries(entries);
    }

    fn deactivate_entries(&self, entries: Vec<CacheEntry>) {
        for entry in entries {
            self.inner
                .pipeline
                .deactivate(&entry.binding, entry.plan.as_deref(), &entry.reference);
            if self.inner.observers.has_observers() {
                self.inner.observers.released(entry.binding.service());
            }
        }
    }

    #[cfg(feature = "diagnostics")]
    pub fn to_debug_string(&self) -> String {
        let mut s = String::new();
        s.push_str("=== Kernel Debug ===\n");
        for (key, bindings) in &self.inner.bindings {
            for binding in bindings {
                s.push_str(&format!(
                    "  {} (weight {}, name {:?})\n",
                    key.display_name(),
                    binding.weight(),
                    binding.metadata().name,
                ));
            }
        }
        s.push_str(&format!("cached instances: {}\n", self.inner.cache.len()));
        s
    }
}

/// Single mutable builder assembling a [`Kernel`]: bindings, plans, settings,
/// observers, and component overrides, finalized by [`build`](Self::build).
pub struct KernelBuilder {
    bindings: Vec<Binding>,
    planner: RegistryPlanner,
    planner_override: Option<Arc<dyn Planner>>,
    settings: ContainerSettings,
    observers: Observers,
    scorer: Arc<dyn ConstructorScorer>,
    extra_initializations: Vec<Arc<dyn InitializationStrategy>>,
    extra_activations: Vec<Arc<dyn ActivationStrategy>>,
    extra_deactivations: Vec<Arc<dyn DeactivationStrategy>>,
}

impl KernelBuilder {
    pub fn new() -> Self {
        Self {
            bindings: Vec::new(),
            planner: RegistryPlanner::new(),
            planner_override: None,
            settings: ContainerSettings::default(),
            observers: Observers::new(),
            scorer: Arc::new(StandardScorer),
            extra_initializations: Vec::new(),
            extra_activations: Vec::new(),
            extra_deactivations: Vec::new(),
        }
    }

    pub fn with_settings(&mut self, settings: ContainerSettings) -> &mut Self {
        self.settings = settings;
        self
    }

    pub fn with_observer(&mut self, observer: Arc<dyn ResolutionObserver>) -> &mut Self {
        self.observers.add(observer);
        self
    }

    /// Replaces the constructor-scoring policy.
    pub fn with_scorer(&mut self, scorer: Arc<dyn ConstructorScorer>) -> &mut Self {
        self.scorer = scorer;
        self
    }

    /// Replaces the planner capability entirely; plans registered on this
    /// builder are ignored when an override is set.
    pub fn with_planner(&mut self, planner: Arc<dyn Planner>) -> &mut Self {
        self.planner_override = Some(planner);
        self
    }

    pub fn with_initialization_strategy(
        &mut self,
        strategy: Arc<dyn InitializationStrategy>,
    ) -> &mut Self {
        self.extra_initializations.push(strategy);
        self
    }

    pub fn with_activation_strategy(&mut self, strategy: Arc<dyn ActivationStrategy>) -> &mut Self {
        self.extra_activations.push(strategy);
        self
    }

    pub fn with_deactivation_strategy(
        &mut self,
        strategy: Arc<dyn DeactivationStrategy>,
    ) -> &mut Self {
        self.extra_deactivations.push(strategy);
        self
    }

    /// Registers the construction plan for an implementation type.
    pub fn register_plan<T: Any + Send + Sync>(&mut self, plan: PlanBuilder<T>) -> &mut Self {
        self.planner.register(plan);
        self
    }

    /// Adds a fully configured binding.
    pub fn add_binding(&mut self, binding: Binding) -> &mut Self {
        self.bindings.push(binding);
        self
    }

    /// Binds `T` to a pre-built value (always the same instance).
    pub fn add_constant<T: Any + Send + Sync>(&mut self, value: T) -> &mut Self {
        let provider = Arc::new(ConstantProvider::new(Arc::new(value)));
        self.add_binding(Binding::build(key_of_type::<T>(), provider).finish())
    }

    /// Binds `dyn S` to a pre-built trait object.
    pub fn add_trait_constant<S: ?Sized + Send + Sync + 'static>(
        &mut self,
        value: Arc<S>,
    ) -> &mut Self {
        let provider = Arc::new(ConstantProvider::for_trait(value));
        self.add_binding(Binding::build(key_of_trait::<S>(), provider).finish())
    }

    /// Binds `T` to a callback producing owned values.
    pub fn add_callback<T, F>(&mut self, scope: ScopeCallback, callback: F) -> &mut Self
    where
        T: Any + Send + Sync,
        F: Fn(&Context) -> DiResult<T> + Send + Sync + 'static,
    {
        let provider = Arc::new(CallbackProvider::new(callback));
        self.add_binding(Binding::build(key_of_type::<T>(), provider).in_scope(scope).finish())
    }

    /// Binds `T` to a callback producing shared `Arc<T>` values.
    pub fn add_shared_callback<T, F>(&mut self, scope: ScopeCallback, callback: F) -> &mut Self
    where
        T: Any + Send + Sync,
        F: Fn(&Context) -> DiResult<Arc<T>> + Send + Sync + 'static,
    {
        let provider = Arc::new(CallbackProvider::shared(callback));
        self.add_binding(Binding::build(key_of_type::<T>(), provider).in_scope(scope).finish())
    }

    /// Binds `dyn S` to a callback producing trait objects.
    pub fn add_trait_callback<S, F>(&mut self, scope: ScopeCallback, callback: F) -> &mut Self
    where
        S: ?Sized + Send + Sync + 'static,
        F: Fn(&Context) -> DiResult<Arc<S>> + Send + Sync + 'static,
    {
        let provider = Arc::new(CallbackProvider::for_trait(callback));
        self.add_binding(Binding::build(key_of_trait::<S>(), provider).in_scope(scope).finish())
    }

    /// Binds `T` to its registered construction plan.
    pub fn add_plan_binding<T: Any + Send + Sync>(&mut self, scope: ScopeCallback) -> &mut Self {
        let provider = Arc::new(StandardProvider::of::<T>());
        self.add_binding(Binding::build(key_of_type::<T>(), provider).in_scope(scope).finish())
    }

    /// Binds `dyn S` to the construction plan of `T`, coercing each built
    /// instance into the trait object (`|t| t as Arc<S>`).
    pub fn add_trait_plan_binding<S, T, F>(&mut self, scope: ScopeCallback, coerce: F) -> &mut Self
    where
        S: ?Sized + Send + Sync + 'static,
        T: Any + Send + Sync,
        F: Fn(Arc<T>) -> Arc<S> + Send + Sync + 'static,
    {
        let provider = Arc::new(CoercingProvider::new::<S, T, F>(
            Arc::new(StandardProvider::of::<T>()),
            coerce,
        ));
        self.add_binding(Binding::build(key_of_trait::<S>(), provider).in_scope(scope).finish())
    }

    /// Finalizes the configuration into an immutable kernel.
    pub fn build(self) -> Kernel {
        let mut components = ComponentContainer::new();

        let planner: Arc<dyn Planner> = match self.planner_override {
            Some(planner) => planner,
            None => {
                let registry = Arc::new(self.planner);
                components.add(registry.clone());
                registry
            }
        };

        let selector = Arc::new(ConstructorSelector::new(self.scorer));
        let pipeline = Arc::new(Pipeline::standard(
            self.extra_initializations,
            self.extra_activations,
            self.extra_deactivations,
        ));
        let cache = Arc::new(Cache::new());
        let settings = Arc::new(self.settings);

        components.add(selector.clone());
        components.add(pipeline.clone());
        components.add(cache.clone());
        components.add(settings.clone());

        let mut bindings: AHashMap<Key, Vec<Arc<Binding>>> = AHashMap::new();
        for binding in self.bindings {
            bindings.entry(binding.service().clone()).or_default().push(Arc::new(binding));
        }

        Kernel {
            inner: Arc::new(KernelInner {
                bindings,
                settings,
                planner,
                selector,
                pipeline,
                cache,
                components,
                observers: self.observers,
            }),
        }
    }
}

impl Default for KernelBuilder {
    fn default() -> Self {
        Self::new()
    }
}
