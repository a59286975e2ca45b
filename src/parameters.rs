//! Caller-supplied value overrides for injection targets.

use std::any::Any;
use std::sync::Arc;

use crate::context::Context;
use crate::error::DiResult;
use crate::instance::{Instance, ResolvedValue};
use crate::key::{key_of_trait, key_of_type, Key};
use crate::planning::Target;

/// Which class of injection target a parameter may override.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterKind {
    /// A constructor argument
    ConstructorArgument,
    /// A property value
    PropertyValue,
    /// A method argument
    MethodArgument,
}

type AppliesFn = Arc<dyn Fn(&Target) -> bool + Send + Sync>;
type ValueFn = Arc<dyn Fn(&Context, &Target) -> DiResult<ResolvedValue> + Send + Sync>;

/// One explicit override: an applicability predicate plus a value callback.
///
/// Parameters travel on the request (caller-supplied) or on the binding
/// (configured); a [`Context`] sees both, concatenated. For a given target,
/// exactly zero or one parameter may apply — two applicable overrides are a
/// configuration error, never resolved by priority.
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use shinobi_di::Parameter;
///
/// struct Dagger;
/// let dagger = Arc::new(Dagger);
/// let param = Parameter::constructor_arg("weapon", dagger);
/// assert_eq!(param.name(), "weapon");
/// ```
#[derive(Clone)]
pub struct Parameter {
    kind: ParameterKind,
    name: &'static str,
    applies: AppliesFn,
    value: ValueFn,
}

impl Parameter {
    fn new(kind: ParameterKind, name: &'static str, applies: AppliesFn, value: ValueFn) -> Self {
        Self { kind, name, applies, value }
    }

    fn named(kind: ParameterKind, name: &'static str, value: ValueFn) -> Self {
        Self::new(kind, name, Arc::new(move |t: &Target| t.name() == name), value)
    }

    fn keyed(kind: ParameterKind, key: Key, value: ValueFn) -> Self {
        let name = key.display_name();
        Self::new(kind, name, Arc::new(move |t: &Target| *t.service() == key), value)
    }

    /// Overrides the constructor argument with the given name.
    pub fn constructor_arg<T: Any + Send + Sync>(name: &'static str, value: Arc<T>) -> Self {
        let instance = Instance::of(value);
        Self::named(
            ParameterKind::ConstructorArgument,
            name,
            Arc::new(move |_, _| Ok(Some(instance.clone()))),
        )
    }

    /// Overrides a trait-typed constructor argument with the given name.
    pub fn constructor_arg_trait<S: ?Sized + Send + Sync + 'static>(
        name: &'static str,
        value: Arc<S>,
    ) -> Self {
        let instance = Instance::of_trait(value);
        Self::named(
            ParameterKind::ConstructorArgument,
            name,
            Arc::new(move |_, _| Ok(Some(instance.clone()))),
        )
    }

    /// Overrides the named constructor argument with a computed value.
    pub fn constructor_arg_with<T, F>(name: &'static str, f: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(&Context, &Target) -> DiResult<Arc<T>> + Send + Sync + 'static,
    {
        Self::named(
            ParameterKind::ConstructorArgument,
            name,
            Arc::new(move |ctx, target| Ok(Some(Instance::of(f(ctx, target)?)))),
        )
    }

    /// Overrides every constructor argument whose declared service is `T`.
    pub fn typed_constructor_arg<T: Any + Send + Sync>(value: Arc<T>) -> Self {
        let instance = Instance::of(value);
        Self::keyed(
            ParameterKind::ConstructorArgument,
            key_of_type::<T>(),
            Arc::new(move |_, _| Ok(Some(instance.clone()))),
        )
    }

    /// Overrides every constructor argument whose declared service is `dyn S`.
    pub fn typed_constructor_arg_trait<S: ?Sized + Send + Sync + 'static>(value: Arc<S>) -> Self {
        let instance = Instance::of_trait(value);
        Self::keyed(
            ParameterKind::ConstructorArgument,
            key_of_trait::<S>(),
            Arc::new(move |_, _| Ok(Some(instance.clone()))),
        )
    }

    /// Overrides the property with the given name.
    pub fn property_value<T: Any + Send + Sync>(name: &'static str, value: Arc<T>) -> Self {
        let instance = Instance::of(value);
        Self::named(
            ParameterKind::PropertyValue,
            name,
            Arc::new(move |_, _| Ok(Some(instance.clone()))),
        )
    }

    /// Overrides a trait-typed property with the given name.
    pub fn property_value_trait<S: ?Sized + Send + Sync + 'static>(
        name: &'static str,
        value: Arc<S>,
    ) -> Self {
        let instance = Instance::of_trait(value);
        Self::named(
            ParameterKind::PropertyValue,
            name,
            Arc::new(move |_, _| Ok(Some(instance.clone()))),
        )
    }

    /// Overrides the method argument with the given name.
    pub fn method_arg<T: Any + Send + Sync>(name: &'static str, value: Arc<T>) -> Self {
        let instance = Instance::of(value);
        Self::named(
            ParameterKind::MethodArgument,
            name,
            Arc::new(move |_, _| Ok(Some(instance.clone()))),
        )
    }

    /// Builds a parameter from raw parts, for custom applicability rules.
    pub fn custom<A, V>(kind: ParameterKind, name: &'static str, applies: A, value: V) -> Self
    where
        A: Fn(&Target) -> bool + Send + Sync + 'static,
        V: Fn(&Context, &Target) -> DiResult<ResolvedValue> + Send + Sync + 'static,
    {
        Self::new(kind, name, Arc::new(applies), Arc::new(value))
    }

    pub fn kind(&self) -> ParameterKind {
        self.kind
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Whether this override applies to the given target.
    pub fn applies_to(&self, target: &Target) -> bool {
        (self.applies)(target)
    }

    /// Produces the override value for a target this parameter applies to.
    pub fn resolve(&self, ctx: &Context, target: &Target) -> DiResult<ResolvedValue> {
        (self.value)(ctx, target)
    }
}
