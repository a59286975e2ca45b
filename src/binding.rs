//! Bindings: configured mappings from a service to a provider, scope, and
//! conditions.

use std::any::Any;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::context::Context;
use crate::error::{DiError, DiResult};
use crate::instance::Instance;
use crate::key::Key;
use crate::parameters::Parameter;
use crate::pipeline::Startable;
use crate::provider::Provider;
use crate::request::Request;
use crate::scope::{scopes, ScopeCallback};

static NEXT_BINDING_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique binding identity; the cache keys entries by it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BindingId(u64);

impl BindingId {
    fn next() -> Self {
        BindingId(NEXT_BINDING_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Descriptive metadata attached to a binding, visible to request constraints.
#[derive(Debug, Clone, Default)]
pub struct BindingMetadata {
    pub name: Option<&'static str>,
}

type ConditionFn = Arc<dyn Fn(&Request) -> bool + Send + Sync>;
type InitActionFn = Arc<dyn Fn(&Context, Instance) -> DiResult<Instance> + Send + Sync>;
type ActivationActionFn = Arc<dyn Fn(&Context, &Instance) -> DiResult<()> + Send + Sync>;
type DeactivationActionFn = Arc<dyn Fn(&Instance) + Send + Sync>;

/// Immutable association of a service with everything needed to activate it:
/// provider, scope callback, parameters, condition, weight, and user actions.
///
/// Bindings are created through [`BindingBuilder`] at configuration time and
/// never change after the kernel is built.
pub struct Binding {
    id: BindingId,
    service: Key,
    metadata: BindingMetadata,
    provider: Arc<dyn Provider>,
    scope: ScopeCallback,
    parameters: Vec<Parameter>,
    condition: Option<ConditionFn>,
    weight: i32,
    initialization: Vec<InitActionFn>,
    activation: Vec<ActivationActionFn>,
    deactivation: Vec<DeactivationActionFn>,
}

impl Binding {
    /// Starts building a binding for `service` backed by `provider`.
    pub fn build(service: Key, provider: Arc<dyn Provider>) -> BindingBuilder {
        BindingBuilder {
            service,
            metadata: BindingMetadata::default(),
            provider,
            scope: scopes::transient(),
            parameters: Vec::new(),
            condition: None,
            weight: 0,
            initialization: Vec::new(),
            activation: Vec::new(),
            deactivation: Vec::new(),
        }
    }

    pub fn id(&self) -> BindingId {
        self.id
    }

    pub fn service(&self) -> &Key {
        &self.service
    }

    pub fn metadata(&self) -> &BindingMetadata {
        &self.metadata
    }

    pub fn provider(&self) -> &Arc<dyn Provider> {
        &self.provider
    }

    pub fn scope_callback(&self) -> &ScopeCallback {
        &self.scope
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    pub fn weight(&self) -> i32 {
        self.weight
    }

    /// Whether this binding's condition accepts the request.
    pub fn matches(&self, request: &Request) -> bool {
        self.condition.as_ref().map_or(true, |condition| condition(request))
    }

    pub(crate) fn initialization_actions(&self) -> &[InitActionFn] {
        &self.initialization
    }

    pub(crate) fn activation_actions(&self) -> &[ActivationActionFn] {
        &self.activation
    }

    pub(crate) fn deactivation_actions(&self) -> &[DeactivationActionFn] {
        &self.deactivation
    }
}

/// Free-order binding configuration with a final [`finish`](Self::finish).
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use shinobi_di::{key_of_type, scopes, Binding, ConstantProvider};
///
/// struct Config { url: &'static str }
///
/// let provider = Arc::new(ConstantProvider::new(Arc::new(Config { url: "localhost" })));
/// let binding = Binding::build(key_of_type::<Config>(), provider)
///     .in_scope(scopes::singleton())
///     .weight(1)
///     .finish();
/// assert_eq!(binding.weight(), 1);
/// ```
pub struct BindingBuilder {
    service: Key,
    metadata: BindingMetadata,
    provider: Arc<dyn Provider>,
    scope: ScopeCallback,
    parameters: Vec<Parameter>,
    condition: Option<ConditionFn>,
    weight: i32,
    initialization: Vec<InitActionFn>,
    activation: Vec<ActivationActionFn>,
    deactivation: Vec<DeactivationActionFn>,
}

impl BindingBuilder {
    /// Sets the scope callback; defaults to transient.
    pub fn in_scope(mut self, scope: ScopeCallback) -> Self {
        self.scope = scope;
        self
    }

    /// Attaches a binding-level parameter override.
    pub fn with_parameter(mut self, parameter: Parameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    /// Restricts the binding to requests accepted by the predicate.
    pub fn when<F>(mut self, condition: F) -> Self
    where
        F: Fn(&Request) -> bool + Send + Sync + 'static,
    {
        self.condition = Some(Arc::new(condition));
        self
    }

    /// Names the binding; constraints match against the metadata name.
    pub fn named(mut self, name: &'static str) -> Self {
        self.metadata.name = Some(name);
        self
    }

    /// Precedence among bindings for the same service; the top-weight group
    /// wins, and a tie within it fails a unique request.
    pub fn weight(mut self, weight: i32) -> Self {
        self.weight = weight;
        self
    }

    /// Adds an initialization action that may replace the instance
    /// (decorators). The replacement must stay downcastable to `T`.
    pub fn on_initialization<T, F>(mut self, action: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(&Context, Arc<T>) -> Arc<T> + Send + Sync + 'static,
    {
        self.initialization.push(Arc::new(move |ctx, instance| {
            let typed = instance
                .downcast::<T>()
                .map_err(|_| DiError::InitializerTypeMismatch(std::any::type_name::<T>()))?;
            Ok(Instance::of(action(ctx, typed)))
        }));
        self
    }

    /// Trait-object variant of [`on_initialization`](Self::on_initialization).
    pub fn on_initialization_trait<S, F>(mut self, action: F) -> Self
    where
        S: ?Sized + Send + Sync + 'static,
        F: Fn(&Context, Arc<S>) -> Arc<S> + Send + Sync + 'static,
    {
        self.initialization.push(Arc::new(move |ctx, instance| {
            let typed = instance
                .downcast_trait::<S>()
                .map_err(|_| DiError::InitializerTypeMismatch(std::any::type_name::<S>()))?;
            Ok(Instance::of_trait(action(ctx, typed)))
        }));
        self
    }

    /// Adds an activation action, run once per logical instance.
    pub fn on_activation<T, F>(mut self, action: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(&Context, &T) + Send + Sync + 'static,
    {
        self.activation.push(Arc::new(move |ctx, instance| {
            let typed = instance.downcast::<T>()?;
            action(ctx, &typed);
            Ok(())
        }));
        self
    }

    /// Trait-object variant of [`on_activation`](Self::on_activation).
    pub fn on_activation_trait<S, F>(mut self, action: F) -> Self
    where
        S: ?Sized + Send + Sync + 'static,
        F: Fn(&Context, &S) + Send + Sync + 'static,
    {
        self.activation.push(Arc::new(move |ctx, instance| {
            let typed = instance.downcast_trait::<S>()?;
            action(ctx, &typed);
            Ok(())
        }));
        self
    }

    /// Adds a deactivation action, run once when the instance is released or
    /// its scope cleared.
    pub fn on_deactivation<T, F>(mut self, action: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.deactivation.push(Arc::new(move |instance| {
            if let Ok(typed) = instance.downcast::<T>() {
                action(&typed);
            }
        }));
        self
    }

    /// Trait-object variant of [`on_deactivation`](Self::on_deactivation).
    pub fn on_deactivation_trait<S, F>(mut self, action: F) -> Self
    where
        S: ?Sized + Send + Sync + 'static,
        F: Fn(&S) + Send + Sync + 'static,
    {
        self.deactivation.push(Arc::new(move |instance| {
            if let Ok(typed) = instance.downcast_trait::<S>() {
                action(&typed);
            }
        }));
        self
    }

    /// Start/stop lifecycle hooks for a concrete implementation type.
    pub fn startable<T>(self) -> Self
    where
        T: Startable + Any + Send + Sync,
    {
        self.on_activation::<T, _>(|_, instance| instance.start())
            .on_deactivation::<T, _>(|instance| instance.stop())
    }

    /// Start/stop lifecycle hooks for a trait-bound service. Use this on
    /// trait bindings, where the activated instance is the trait object and
    /// plan-level hooks for the concrete type do not apply.
    pub fn startable_trait<S>(self) -> Self
    where
        S: ?Sized + Startable + Send + Sync + 'static,
    {
        self.on_activation_trait::<S, _>(|_, instance| instance.start())
            .on_deactivation_trait::<S, _>(|instance| instance.stop())
    }

    /// Finalizes the configuration into an immutable [`Binding`].
    pub fn finish(self) -> Binding {
        Binding {
            id: BindingId::next(),
            service: self.service,
            metadata: self.metadata,
            provider: self.provider,
            scope: self.scope,
            parameters: self.parameters,
            condition: self.condition,
            weight: self.weight,
            initialization: self.initialization,
            activation: self.activation,
            deactivation: self.deactivation,
        }
    }
}
