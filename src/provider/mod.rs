//! Providers: the terminal step that produces a raw instance for a context.

use std::any::{Any, TypeId};
use std::sync::Arc;

use crate::context::Context;
use crate::error::{DiError, DiResult};
use crate::instance::{Instance, ResolvedValue};
use crate::key::{key_of_type, Key};
use crate::planning::{Target, TargetKind};

/// Strategy that instantiates a raw object given a resolution context.
///
/// `resolves_services` reports whether the provider performs nested service
/// resolution itself; diagnostics use it to detect configuration mistakes
/// such as binding a value-returning provider to a provider-resolving slot.
pub trait Provider: Send + Sync {
    fn create(&self, ctx: &Context) -> DiResult<ResolvedValue>;

    fn resolves_services(&self) -> bool {
        false
    }
}

/// Plan-driven provider: selects a constructor, resolves its targets, and
/// invokes it.
pub struct StandardProvider {
    type_id: TypeId,
    type_name: &'static str,
}

impl StandardProvider {
    /// Provider for instances of `T`, built from `T`'s registered plan.
    pub fn of<T: Any + Send + Sync>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
        }
    }
}

impl Provider for StandardProvider {
    fn create(&self, ctx: &Context) -> DiResult<ResolvedValue> {
        let plan = ctx.kernel().planner().plan(self.type_id, self.type_name)?;
        ctx.set_plan(plan.clone());
        let directive = ctx.kernel().selector().select(ctx, &plan)?;
        let mut values = Vec::with_capacity(directive.targets().len());
        for target in directive.targets() {
            values.push(ctx.resolve_target(target)?);
        }
        Ok(Some(directive.construct(ctx, &values)?))
    }

    fn resolves_services(&self) -> bool {
        true
    }
}

/// Provider pinned to one constructor directive chosen at bind time; skips
/// selection but still resolves the directive's targets.
pub struct FixedConstructorProvider {
    directive: Arc<crate::planning::ConstructorDirective>,
}

impl FixedConstructorProvider {
    pub fn new(directive: Arc<crate::planning::ConstructorDirective>) -> Self {
        Self { directive }
    }
}

impl Provider for FixedConstructorProvider {
    fn create(&self, ctx: &Context) -> DiResult<ResolvedValue> {
        let mut values = Vec::with_capacity(self.directive.targets().len());
        for target in self.directive.targets() {
            values.push(ctx.resolve_target(target)?);
        }
        Ok(Some(self.directive.construct(ctx, &values)?))
    }

    fn resolves_services(&self) -> bool {
        true
    }
}

/// Provider backed by a user callback.
pub struct CallbackProvider {
    callback: Arc<dyn Fn(&Context) -> DiResult<ResolvedValue> + Send + Sync>,
    resolves_services: bool,
}

impl CallbackProvider {
    /// Callback producing an owned value.
    pub fn new<T, F>(callback: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(&Context) -> DiResult<T> + Send + Sync + 'static,
    {
        Self {
            callback: Arc::new(move |ctx| Ok(Some(Instance::of(Arc::new(callback(ctx)?))))),
            resolves_services: true,
        }
    }

    /// Callback producing a shared `Arc<T>` (e.g. indirection to an instance
    /// owned elsewhere). Logical identity follows the returned `Arc`.
    pub fn shared<T, F>(callback: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(&Context) -> DiResult<Arc<T>> + Send + Sync + 'static,
    {
        Self {
            callback: Arc::new(move |ctx| Ok(Some(Instance::of(callback(ctx)?)))),
            resolves_services: true,
        }
    }

    /// Callback producing a trait object.
    pub fn for_trait<S, F>(callback: F) -> Self
    where
        S: ?Sized + Send + Sync + 'static,
        F: Fn(&Context) -> DiResult<Arc<S>> + Send + Sync + 'static,
    {
        Self {
            callback: Arc::new(move |ctx| Ok(Some(Instance::of_trait(callback(ctx)?)))),
            resolves_services: true,
        }
    }

    /// Callback that may produce nothing; `None` is subject to the
    /// null-injection setting.
    pub fn nullable<T, F>(callback: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(&Context) -> DiResult<Option<Arc<T>>> + Send + Sync + 'static,
    {
        Self {
            callback: Arc::new(move |ctx| Ok(callback(ctx)?.map(Instance::of))),
            resolves_services: true,
        }
    }

    /// Declares whether the callback resolves further services.
    pub fn with_service_resolution(mut self, resolves: bool) -> Self {
        self.resolves_services = resolves;
        self
    }
}

impl Provider for CallbackProvider {
    fn create(&self, ctx: &Context) -> DiResult<ResolvedValue> {
        (self.callback)(ctx)
    }

    fn resolves_services(&self) -> bool {
        self.resolves_services
    }
}

/// Provider that always returns the same pre-built object.
pub struct ConstantProvider {
    instance: Instance,
}

impl ConstantProvider {
    pub fn new<T: Any + Send + Sync>(value: Arc<T>) -> Self {
        Self { instance: Instance::of(value) }
    }

    pub fn for_trait<S: ?Sized + Send + Sync + 'static>(value: Arc<S>) -> Self {
        Self { instance: Instance::of_trait(value) }
    }
}

impl Provider for ConstantProvider {
    fn create(&self, _ctx: &Context) -> DiResult<ResolvedValue> {
        Ok(Some(self.instance.clone()))
    }
}

/// Provider that resolves another provider as a service and delegates to it.
pub struct DelegatingProvider {
    provider_service: Key,
    delegate: Arc<dyn Fn(&Context, Instance) -> DiResult<ResolvedValue> + Send + Sync>,
}

impl DelegatingProvider {
    /// Delegates creation to the `P` instance resolved from the kernel.
    pub fn to<P: Provider + Any + Send + Sync>() -> Self {
        Self {
            provider_service: key_of_type::<P>(),
            delegate: Arc::new(|ctx, instance| instance.downcast::<P>()?.create(ctx)),
        }
    }
}

impl Provider for DelegatingProvider {
    fn create(&self, ctx: &Context) -> DiResult<ResolvedValue> {
        let target = Target::new(
            self.provider_service.clone(),
            "provider",
            TargetKind::ConstructorArgument,
        );
        let child = ctx.request().child(self.provider_service.clone(), target);
        let resolved = ctx.kernel().resolve_request(&child)?;
        let instance = resolved
            .ok_or(DiError::NullInjection(self.provider_service.display_name()))?;
        (self.delegate)(ctx, instance)
    }

    fn resolves_services(&self) -> bool {
        true
    }
}

/// Wraps another provider, converting its concrete output into the
/// trait-object form a trait binding stores.
///
/// Identity is preserved: the coerced instance keeps the inner allocation's
/// address, so activate-once still holds across concrete and trait chains.
pub struct CoercingProvider {
    inner: Arc<dyn Provider>,
    coerce: Arc<dyn Fn(Instance) -> DiResult<Instance> + Send + Sync>,
}

impl CoercingProvider {
    pub fn new<S, T, F>(inner: Arc<dyn Provider>, coerce: F) -> Self
    where
        S: ?Sized + Send + Sync + 'static,
        T: Any + Send + Sync,
        F: Fn(Arc<T>) -> Arc<S> + Send + Sync + 'static,
    {
        Self {
            inner,
            coerce: Arc::new(move |instance| Ok(Instance::of_trait(coerce(instance.downcast::<T>()?)))),
        }
    }
}

impl Provider for CoercingProvider {
    fn create(&self, ctx: &Context) -> DiResult<ResolvedValue> {
        match self.inner.create(ctx)? {
            Some(instance) => Ok(Some((self.coerce)(instance)?)),
            None => Ok(None),
        }
    }

    fn resolves_services(&self) -> bool {
        self.inner.resolves_services()
    }
}
