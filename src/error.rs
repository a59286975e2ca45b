//! Error types for the dependency injection container.

use std::fmt;

/// Dependency injection errors.
///
/// Represents the error conditions that can occur during binding selection,
/// constructor selection, value resolution, or activation. All of these are
/// deterministic configuration-shape errors: they are never retried
/// internally, and propagate synchronously to the caller of `get`/`try_get`.
///
/// # Examples
///
/// ```rust
/// use shinobi_di::{DiError, KernelBuilder};
///
/// let kernel = KernelBuilder::new().build();
/// match kernel.get::<String>() {
///     Err(DiError::NotFound(type_name)) => {
///         assert_eq!(type_name, "alloc::string::String");
///     }
///     _ => unreachable!(),
/// }
/// ```
#[derive(Debug, Clone)]
pub enum DiError {
    /// No binding registered for the requested service
    NotFound(&'static str),
    /// Type downcast failed
    TypeMismatch(&'static str),
    /// More than one binding matched a unique request at equal weight
    AmbiguousBindings(&'static str, usize),
    /// The plan for a type has no constructor directives
    NoConstructor(&'static str),
    /// Two or more constructors tied at the top score (type name, tied constructor names)
    AmbiguousConstructors(&'static str, Vec<&'static str>),
    /// More than one explicit parameter override matched the same target
    AmbiguousOverride(&'static str),
    /// A provider produced nothing and null injection is disallowed
    NullInjection(&'static str),
    /// An initialization action returned an instance of the wrong type
    InitializerTypeMismatch(&'static str),
    /// Cyclic dependency detected (includes service path)
    Circular(Vec<&'static str>),
    /// Maximum resolution depth exceeded
    DepthExceeded(usize),
    /// Internal container component missing (self-configuration bug, not a user binding gap)
    NoSuchComponent(&'static str),
    /// No construction plan registered for an implementation type
    NoPlan(&'static str),
}

impl fmt::Display for DiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiError::NotFound(name) => write!(f, "No binding for service: {}", name),
            DiError::TypeMismatch(name) => write!(f, "Type mismatch for: {}", name),
            DiError::AmbiguousBindings(name, count) => {
                write!(f, "Ambiguous bindings for {}: {} candidates at equal weight", name, count)
            }
            DiError::NoConstructor(name) => {
                write!(f, "No constructors available for: {}", name)
            }
            DiError::AmbiguousConstructors(name, ctors) => {
                write!(f, "Ambiguous constructors for {}: {}", name, ctors.join(", "))
            }
            DiError::AmbiguousOverride(target) => {
                write!(f, "Multiple parameter overrides apply to target: {}", target)
            }
            DiError::NullInjection(name) => {
                write!(f, "Provider returned nothing for: {}", name)
            }
            DiError::InitializerTypeMismatch(name) => {
                write!(f, "Initialization returned an incompatible instance for: {}", name)
            }
            DiError::Circular(path) => {
                write!(f, "Cyclic dependency: {}", path.join(" -> "))
            }
            DiError::DepthExceeded(depth) => write!(f, "Max depth {} exceeded", depth),
            DiError::NoSuchComponent(name) => {
                write!(f, "No such container component: {}", name)
            }
            DiError::NoPlan(name) => write!(f, "No construction plan registered for: {}", name),
        }
    }
}

impl std::error::Error for DiError {}

/// Result type for DI operations
///
/// A convenience type alias for `Result<T, DiError>` used throughout the crate.
pub type DiResult<T> = Result<T, DiError>;
