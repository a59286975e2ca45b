//! The unit of one activation: a request paired with its chosen binding.

use std::any::Any;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use smallvec::SmallVec;

use crate::binding::Binding;
use crate::error::{DiError, DiResult};
use crate::instance::{InstanceReference, ResolvedValue};
use crate::kernel::Kernel;
use crate::key::{key_of_trait, key_of_type, Key};
use crate::parameters::{Parameter, ParameterKind};
use crate::planning::{Plan, Target, TargetKind};
use crate::request::{ActiveBindingGuard, Request};
use crate::scope::ScopeObject;

/// Bundles a [`Request`] with the [`Binding`] chosen to satisfy it, the
/// merged parameters, the plan once computed, and the per-call scope.
///
/// One context exists per `(request, binding)` pair being activated; it is
/// short-lived and never outlives the resolution call that created it.
pub struct Context {
    kernel: Kernel,
    request: Arc<Request>,
    binding: Arc<Binding>,
    parameters: SmallVec<[Parameter; 4]>,
    plan: OnceCell<Arc<Plan>>,
    cached_scope: Mutex<Option<Option<ScopeObject>>>,
}

impl Context {
    pub(crate) fn new(kernel: Kernel, request: Arc<Request>, binding: Arc<Binding>) -> Self {
        let mut parameters: SmallVec<[Parameter; 4]> = SmallVec::new();
        parameters.extend(request.parameters().iter().cloned());
        parameters.extend(binding.parameters().iter().cloned());
        Self {
            kernel,
            request,
            binding,
            parameters,
            plan: OnceCell::new(),
            cached_scope: Mutex::new(None),
        }
    }

    pub fn kernel(&self) -> &Kernel {
        &self.kernel
    }

    pub fn request(&self) -> &Arc<Request> {
        &self.request
    }

    pub fn binding(&self) -> &Arc<Binding> {
        &self.binding
    }

    /// Request parameters followed by binding parameters.
    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    /// The construction plan, once a plan-driven provider has computed it.
    pub fn plan(&self) -> Option<Arc<Plan>> {
        self.plan.get().cloned()
    }

    /// Records the plan driving this activation; first caller wins. Providers
    /// set this so the property/method injection strategies can see it.
    pub fn set_plan(&self, plan: Arc<Plan>) {
        let _ = self.plan.set(plan);
    }

    /// The effective scope for this activation: request override, else the
    /// binding's scope callback. `None` means transient.
    ///
    /// Cached for the duration of one `resolve` call only.
    pub fn get_scope(&self) -> Option<ScopeObject> {
        if let Some(cached) = self.cached_scope.lock().clone() {
            return cached;
        }
        let scope = self
            .request
            .scope_override()
            .cloned()
            .or_else(|| (self.binding.scope_callback())(self));
        *self.cached_scope.lock() = Some(scope.clone());
        scope
    }

    /// Resolves the instance satisfying this context's request/binding pair.
    ///
    /// Scoped activations are served from the cache when possible; a miss
    /// constructs under the scope's construction lock (double-checked), then
    /// initializes, remembers, and activates. Transient activations skip the
    /// cache entirely.
    pub fn resolve(&self) -> DiResult<ResolvedValue> {
        let settings = self.kernel.settings();
        if self.request.depth() >= settings.max_resolution_depth {
            return Err(DiError::DepthExceeded(self.request.depth()));
        }
        if settings.detect_cycles && self.request.is_binding_active(self.binding.id()) {
            return Err(DiError::Circular(self.request.cycle_path()));
        }
        let _active = ActiveBindingGuard::new(&self.request, self.binding.id());
        let result = self.resolve_instance();
        // Scope is re-derived fresh if this context is ever resolved again.
        *self.cached_scope.lock() = None;
        result
    }

    fn resolve_instance(&self) -> DiResult<ResolvedValue> {
        match self.get_scope() {
            Some(scope) => {
                let cache = self.kernel.cache();
                if let Some(cached) = cache.try_get(self.binding.id(), &scope) {
                    return Ok(Some(cached));
                }
                let lock = cache.construction_lock(&scope);
                let _guard = lock.lock();
                if let Some(cached) = cache.try_get(self.binding.id(), &scope) {
                    return Ok(Some(cached));
                }
                let Some(raw) = self.binding.provider().create(self)? else {
                    return self.null_result();
                };
                let pipeline = self.kernel.pipeline();
                let instance = pipeline.initialize(self, raw)?;
                let reference = Arc::new(InstanceReference::new(instance.clone()));
                cache.remember(self.binding.clone(), self.plan(), &scope, reference.clone());
                pipeline.activate(self, &reference)?;
                Ok(Some(instance))
            }
            None => {
                let Some(raw) = self.binding.provider().create(self)? else {
                    return self.null_result();
                };
                let pipeline = self.kernel.pipeline();
                let instance = pipeline.initialize(self, raw)?;
                let reference = InstanceReference::new(instance.clone());
                pipeline.activate(self, &reference)?;
                Ok(Some(instance))
            }
        }
    }

    fn null_result(&self) -> DiResult<ResolvedValue> {
        if self.kernel.settings().allow_null_injection {
            Ok(None)
        } else {
            Err(DiError::NullInjection(self.binding.service().display_name()))
        }
    }

    // ----- Nested resolution for providers and callbacks -----

    /// Resolves a concrete dependency as a child request of this activation.
    ///
    /// Callbacks and custom providers resolve their dependencies through the
    /// context, not the kernel directly, so cycle detection and the depth
    /// guard see the whole chain.
    pub fn get<T: Any + Send + Sync>(&self) -> DiResult<Arc<T>> {
        match self.resolve_child(key_of_type::<T>())? {
            Some(instance) => instance.downcast::<T>(),
            None => Err(DiError::NullInjection(std::any::type_name::<T>())),
        }
    }

    /// Resolves a trait-object dependency as a child request.
    pub fn get_trait<S: ?Sized + Send + Sync + 'static>(&self) -> DiResult<Arc<S>> {
        match self.resolve_child(key_of_trait::<S>())? {
            Some(instance) => instance.downcast_trait::<S>(),
            None => Err(DiError::NullInjection(std::any::type_name::<S>())),
        }
    }

    /// Child-request variant of [`Kernel::try_get`](crate::Kernel::try_get).
    pub fn try_get<T: Any + Send + Sync>(&self) -> DiResult<Option<Arc<T>>> {
        match self.resolve_child(key_of_type::<T>()) {
            Ok(Some(instance)) => Ok(Some(instance.downcast::<T>()?)),
            Ok(None) => Ok(None),
            Err(DiError::NotFound(_)) => Ok(None),
            Err(error) => Err(error),
        }
    }

    /// Child-request variant of [`Kernel::try_get_trait`](crate::Kernel::try_get_trait).
    pub fn try_get_trait<S: ?Sized + Send + Sync + 'static>(&self) -> DiResult<Option<Arc<S>>> {
        match self.resolve_child(key_of_trait::<S>()) {
            Ok(Some(instance)) => Ok(Some(instance.downcast_trait::<S>()?)),
            Ok(None) => Ok(None),
            Err(DiError::NotFound(_)) => Ok(None),
            Err(error) => Err(error),
        }
    }

    fn resolve_child(&self, service: Key) -> DiResult<ResolvedValue> {
        let target = Target::new(service.clone(), "dependency", TargetKind::ConstructorArgument);
        let child = self.request.child(service, target);
        self.kernel.resolve_request(&child)
    }

    /// Resolves the value for one injection target.
    ///
    /// Exactly one applicable parameter override wins; more than one is a
    /// configuration error; none falls through to recursive resolution of the
    /// target's service as a child request.
    pub fn resolve_target(&self, target: &Target) -> DiResult<ResolvedValue> {
        let kind = match target.kind() {
            TargetKind::ConstructorArgument => ParameterKind::ConstructorArgument,
            TargetKind::Property => ParameterKind::PropertyValue,
            TargetKind::MethodArgument => ParameterKind::MethodArgument,
        };
        let mut applicable: SmallVec<[&Parameter; 2]> = SmallVec::new();
        for parameter in self.parameters.iter() {
            if parameter.kind() == kind && parameter.applies_to(target) {
                applicable.push(parameter);
            }
        }
        match applicable.len() {
            0 => {
                let child = self.request.child(target.service().clone(), target.clone());
                match self.kernel.resolve_request(&child) {
                    Err(DiError::NotFound(_)) if target.is_optional() => Ok(None),
                    other => other,
                }
            }
            1 => applicable[0].resolve(self, target),
            _ => Err(DiError::AmbiguousOverride(target.name())),
        }
    }
}
