//! Construction plans: the per-type registration table of injectable members.
//!
//! With no runtime reflection, each implementation type is described once with
//! a [`PlanBuilder`]: its candidate constructors, injected properties and
//! methods, and optional lifecycle opt-ins. The [`Planner`] memoizes one
//! immutable [`Plan`] per type, shared by every activation of that type.

use std::any::{Any, TypeId};
use std::marker::PhantomData;
use std::sync::Arc;

use ahash::AHashMap;
use once_cell::sync::OnceCell;

use crate::context::Context;
use crate::error::{DiError, DiResult};
use crate::instance::{value_of, Instance, ResolvedValue};
use crate::key::{key_of_trait, key_of_type, Key};
use crate::pipeline::Startable;

pub mod selection;

/// Which member class an injection point belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    ConstructorArgument,
    Property,
    MethodArgument,
}

/// One injection point: a constructor parameter, property, or method parameter.
#[derive(Debug, Clone)]
pub struct Target {
    service: Key,
    name: &'static str,
    kind: TargetKind,
    optional: bool,
}

impl Target {
    pub fn new(service: Key, name: &'static str, kind: TargetKind) -> Self {
        Self { service, name, kind, optional: false }
    }

    /// Target for a concrete dependency type.
    pub fn of<T: 'static>(name: &'static str, kind: TargetKind) -> Self {
        Self::new(key_of_type::<T>(), name, kind)
    }

    /// Target for a trait-object dependency.
    pub fn of_trait<S: ?Sized + 'static>(name: &'static str, kind: TargetKind) -> Self {
        Self::new(key_of_trait::<S>(), name, kind)
    }

    /// Marks the target as satisfiable by an empty value.
    ///
    /// A missing binding for an optional target resolves to `None` instead of
    /// failing the enclosing activation.
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn service(&self) -> &Key {
        &self.service
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn kind(&self) -> TargetKind {
        self.kind
    }

    pub fn is_optional(&self) -> bool {
        self.optional
    }
}

/// Scoring bias attached to a constructor directive.
///
/// `Preferred` forces the constructor to win selection outright; `Deprecated`
/// pushes it below every unbiased candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreHint {
    Neutral,
    Preferred,
    Deprecated,
}

type ConstructFn = Arc<dyn Fn(&Context, &[ResolvedValue]) -> DiResult<Instance> + Send + Sync>;

/// A candidate constructor: its targets plus the closure that builds the raw
/// instance from resolved argument values.
#[derive(Clone)]
pub struct ConstructorDirective {
    name: &'static str,
    targets: Vec<Target>,
    construct: ConstructFn,
    hint: ScoreHint,
}

impl ConstructorDirective {
    pub fn new<T, F>(name: &'static str, targets: Vec<Target>, build: F) -> Arc<Self>
    where
        T: Any + Send + Sync,
        F: Fn(&Context, &[ResolvedValue]) -> DiResult<T> + Send + Sync + 'static,
    {
        Self::hinted(name, targets, ScoreHint::Neutral, build)
    }

    pub fn hinted<T, F>(
        name: &'static str,
        targets: Vec<Target>,
        hint: ScoreHint,
        build: F,
    ) -> Arc<Self>
    where
        T: Any + Send + Sync,
        F: Fn(&Context, &[ResolvedValue]) -> DiResult<T> + Send + Sync + 'static,
    {
        Arc::new(Self {
            name,
            targets,
            construct: Arc::new(move |ctx, values| Ok(Instance::of(Arc::new(build(ctx, values)?)))),
            hint,
        })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn targets(&self) -> &[Target] {
        &self.targets
    }

    pub fn hint(&self) -> ScoreHint {
        self.hint
    }

    /// Invokes the construction closure with resolved argument values.
    pub fn construct(&self, ctx: &Context, values: &[ResolvedValue]) -> DiResult<Instance> {
        (self.construct)(ctx, values)
    }
}

type PropertySetFn = Arc<dyn Fn(&Context, &Instance, ResolvedValue) -> DiResult<()> + Send + Sync>;

/// An injected property: one target plus the setter closure.
#[derive(Clone)]
pub struct PropertyDirective {
    target: Target,
    set: PropertySetFn,
}

impl PropertyDirective {
    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn set(&self, ctx: &Context, instance: &Instance, value: ResolvedValue) -> DiResult<()> {
        (self.set)(ctx, instance, value)
    }
}

type MethodInvokeFn = Arc<dyn Fn(&Context, &Instance, &[ResolvedValue]) -> DiResult<()> + Send + Sync>;

/// An injected method: its targets plus the invocation closure.
#[derive(Clone)]
pub struct MethodDirective {
    name: &'static str,
    targets: Vec<Target>,
    invoke: MethodInvokeFn,
}

impl MethodDirective {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn targets(&self) -> &[Target] {
        &self.targets
    }

    pub fn invoke(&self, ctx: &Context, instance: &Instance, values: &[ResolvedValue]) -> DiResult<()> {
        (self.invoke)(ctx, instance, values)
    }
}

pub(crate) type LifecycleHook = Arc<dyn Fn(&Instance) + Send + Sync>;

/// Immutable per-type construction description.
///
/// Built once per implementation type and shared across all activations;
/// safe for concurrent reads without locking.
pub struct Plan {
    type_id: TypeId,
    type_name: &'static str,
    constructors: Vec<Arc<ConstructorDirective>>,
    properties: Vec<PropertyDirective>,
    methods: Vec<MethodDirective>,
    start: Option<LifecycleHook>,
    stop: Option<LifecycleHook>,
}

impl Plan {
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn constructors(&self) -> &[Arc<ConstructorDirective>] {
        &self.constructors
    }

    pub fn properties(&self) -> &[PropertyDirective] {
        &self.properties
    }

    pub fn methods(&self) -> &[MethodDirective] {
        &self.methods
    }

    pub(crate) fn start_hook(&self) -> Option<&LifecycleHook> {
        self.start.as_ref()
    }

    pub(crate) fn stop_hook(&self) -> Option<&LifecycleHook> {
        self.stop.as_ref()
    }
}

/// Starts describing how instances of `T` are constructed and populated.
pub fn plan_for<T: Any + Send + Sync>() -> PlanBuilder<T> {
    PlanBuilder {
        constructors: Vec::new(),
        properties: Vec::new(),
        methods: Vec::new(),
        start: None,
        stop: None,
        _marker: PhantomData,
    }
}

/// Free-order builder for a type's [`Plan`].
///
/// # Examples
///
/// ```rust
/// use shinobi_di::{plan_for, value_of, Target, TargetKind};
///
/// struct Engine { cylinders: u32 }
/// struct Car { engine: std::sync::Arc<Engine> }
///
/// let plan = plan_for::<Car>().constructor(
///     "new",
///     vec![Target::of::<Engine>("engine", TargetKind::ConstructorArgument)],
///     |_ctx, values| Ok(Car { engine: value_of::<Engine>(&values[0])? }),
/// );
/// ```
pub struct PlanBuilder<T> {
    constructors: Vec<Arc<ConstructorDirective>>,
    properties: Vec<PropertyDirective>,
    methods: Vec<MethodDirective>,
    start: Option<LifecycleHook>,
    stop: Option<LifecycleHook>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for PlanBuilder<T> {
    fn clone(&self) -> Self {
        Self {
            constructors: self.constructors.clone(),
            properties: self.properties.clone(),
            methods: self.methods.clone(),
            start: self.start.clone(),
            stop: self.stop.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T: Any + Send + Sync> PlanBuilder<T> {
    /// Adds a candidate constructor.
    pub fn constructor<F>(self, name: &'static str, targets: Vec<Target>, build: F) -> Self
    where
        F: Fn(&Context, &[ResolvedValue]) -> DiResult<T> + Send + Sync + 'static,
    {
        self.constructor_hinted(name, targets, ScoreHint::Neutral, build)
    }

    /// Adds a candidate constructor with a scoring bias.
    pub fn constructor_hinted<F>(
        mut self,
        name: &'static str,
        targets: Vec<Target>,
        hint: ScoreHint,
        build: F,
    ) -> Self
    where
        F: Fn(&Context, &[ResolvedValue]) -> DiResult<T> + Send + Sync + 'static,
    {
        self.constructors.push(ConstructorDirective::hinted(name, targets, hint, build));
        self
    }

    /// Adds an injected property of concrete type `V`.
    ///
    /// The setter runs during initialization; property slots on `T` need
    /// interior mutability.
    pub fn property<V, F>(mut self, name: &'static str, set: F) -> Self
    where
        V: Any + Send + Sync,
        F: Fn(&T, Arc<V>) + Send + Sync + 'static,
    {
        let target = Target::of::<V>(name, TargetKind::Property);
        self.properties.push(PropertyDirective {
            target,
            set: Arc::new(move |_ctx, instance, value| {
                let this = instance.downcast::<T>()?;
                set(&this, value_of::<V>(&value)?);
                Ok(())
            }),
        });
        self
    }

    /// Adds an injected trait-object property.
    pub fn property_trait<S, F>(mut self, name: &'static str, set: F) -> Self
    where
        S: ?Sized + Send + Sync + 'static,
        F: Fn(&T, Arc<S>) + Send + Sync + 'static,
    {
        let target = Target::of_trait::<S>(name, TargetKind::Property);
        self.properties.push(PropertyDirective {
            target,
            set: Arc::new(move |_ctx, instance, value| {
                let this = instance.downcast::<T>()?;
                set(&this, crate::instance::trait_value_of::<S>(&value)?);
                Ok(())
            }),
        });
        self
    }

    /// Adds an optional injected property; the setter sees `None` when no
    /// binding exists for `V`.
    pub fn optional_property<V, F>(mut self, name: &'static str, set: F) -> Self
    where
        V: Any + Send + Sync,
        F: Fn(&T, Option<Arc<V>>) + Send + Sync + 'static,
    {
        let target = Target::of::<V>(name, TargetKind::Property).optional();
        self.properties.push(PropertyDirective {
            target,
            set: Arc::new(move |_ctx, instance, value| {
                let this = instance.downcast::<T>()?;
                set(&this, crate::instance::optional_value_of::<V>(&value)?);
                Ok(())
            }),
        });
        self
    }

    /// Adds an injected method invoked after construction.
    pub fn method<F>(mut self, name: &'static str, targets: Vec<Target>, invoke: F) -> Self
    where
        F: Fn(&T, &[ResolvedValue]) -> DiResult<()> + Send + Sync + 'static,
    {
        self.methods.push(MethodDirective {
            name,
            targets,
            invoke: Arc::new(move |_ctx, instance, values| {
                let this = instance.downcast::<T>()?;
                invoke(&this, values)
            }),
        });
        self
    }

    /// Opts instances into the start/stop lifecycle hooks run by the
    /// activation and deactivation pipelines.
    pub fn startable(mut self) -> Self
    where
        T: Startable,
    {
        self.start = Some(Arc::new(|instance: &Instance| {
            if let Ok(this) = instance.downcast::<T>() {
                this.start();
            }
        }));
        self.stop = Some(Arc::new(|instance: &Instance| {
            if let Ok(this) = instance.downcast::<T>() {
                this.stop();
            }
        }));
        self
    }

    pub(crate) fn build(self) -> Plan {
        Plan {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            constructors: self.constructors,
            properties: self.properties,
            methods: self.methods,
            start: self.start,
            stop: self.stop,
        }
    }
}

/// Turns a raw implementation type into its construction plan.
///
/// Pluggable: the kernel installs a [`RegistryPlanner`] by default, but any
/// capability that can answer "the candidate set for this type" fits.
pub trait Planner: Send + Sync {
    fn plan(&self, type_id: TypeId, type_name: &'static str) -> DiResult<Arc<Plan>>;
    fn has_plan(&self, type_id: TypeId) -> bool;
}

struct PlanSource {
    build: Arc<dyn Fn() -> Plan + Send + Sync>,
    cell: OnceCell<Arc<Plan>>,
}

/// Registration-table planner: plans are described up front and built lazily,
/// exactly once per type.
pub struct RegistryPlanner {
    sources: AHashMap<TypeId, PlanSource>,
}

impl RegistryPlanner {
    pub fn new() -> Self {
        Self { sources: AHashMap::new() }
    }

    /// Registers the plan description for `T`, replacing any earlier one.
    pub fn register<T: Any + Send + Sync>(&mut self, builder: PlanBuilder<T>) {
        self.sources.insert(
            TypeId::of::<T>(),
            PlanSource {
                build: Arc::new(move || builder.clone().build()),
                cell: OnceCell::new(),
            },
        );
    }
}

impl Default for RegistryPlanner {
    fn default() -> Self {
        Self::new()
    }
}

impl Planner for RegistryPlanner {
    fn plan(&self, type_id: TypeId, type_name: &'static str) -> DiResult<Arc<Plan>> {
        let source = self.sources.get(&type_id).ok_or(DiError::NoPlan(type_name))?;
        Ok(source.cell.get_or_init(|| Arc::new((source.build)())).clone())
    }

    fn has_plan(&self, type_id: TypeId) -> bool {
        self.sources.contains_key(&type_id)
    }
}
