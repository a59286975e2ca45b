//! Type-erased instances and the mutable reference box used by activation.

use std::any::Any;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::error::{DiError, DiResult};

// Type-erased Arc for storage
pub(crate) type AnyArc = Arc<dyn Any + Send + Sync>;

/// A type-erased activated object plus its logical identity.
///
/// The identity is the data-pointer address of the innermost `Arc`, which
/// stays stable when the same object is re-wrapped as a trait object. Two
/// instances reached through different binding chains therefore compare as
/// the same logical instance, which is what the activate-once and
/// deactivate-once guarantees key on.
#[derive(Clone)]
pub struct Instance {
    value: AnyArc,
    id: usize,
}

impl Instance {
    /// Erases a concrete `Arc<T>`.
    pub fn of<T: Any + Send + Sync>(value: Arc<T>) -> Self {
        let id = Arc::as_ptr(&value) as usize;
        let value: AnyArc = value;
        Self { value, id }
    }

    /// Erases a trait object `Arc<S>`.
    ///
    /// Trait objects are stored boxed as `Arc<Arc<S>>`; the identity is taken
    /// from the inner `Arc` before boxing.
    pub fn of_trait<S: ?Sized + Send + Sync + 'static>(value: Arc<S>) -> Self {
        let id = Arc::as_ptr(&value).cast::<()>() as usize;
        let value: AnyArc = Arc::new(value);
        Self { value, id }
    }

    /// Logical identity of the wrapped object.
    #[inline(always)]
    pub fn id(&self) -> usize {
        self.id
    }

    pub(crate) fn downgrade(&self) -> Weak<dyn Any + Send + Sync> {
        Arc::downgrade(&self.value)
    }

    /// Recovers a concrete `Arc<T>`.
    pub fn downcast<T: Any + Send + Sync>(&self) -> DiResult<Arc<T>> {
        self.value
            .clone()
            .downcast::<T>()
            .map_err(|_| DiError::TypeMismatch(std::any::type_name::<T>()))
    }

    /// Recovers a trait object `Arc<S>`.
    pub fn downcast_trait<S: ?Sized + Send + Sync + 'static>(&self) -> DiResult<Arc<S>> {
        self.value
            .clone()
            .downcast::<Arc<S>>()
            .map(|boxed| (*boxed).clone())
            .map_err(|_| DiError::TypeMismatch(std::any::type_name::<S>()))
    }
}

/// The outcome of one provider invocation or target resolution.
///
/// `None` models a provider that produced nothing; whether that is an error
/// is decided by [`ContainerSettings::allow_null_injection`](crate::ContainerSettings).
pub type ResolvedValue = Option<Instance>;

/// Downcasts a resolved constructor/method argument to a concrete type.
///
/// An empty value is the secondary failure of threading "nothing" into a slot
/// that requires a value.
pub fn value_of<T: Any + Send + Sync>(value: &ResolvedValue) -> DiResult<Arc<T>> {
    match value {
        Some(instance) => instance.downcast::<T>(),
        None => Err(DiError::NullInjection(std::any::type_name::<T>())),
    }
}

/// Downcasts a resolved argument to a trait object.
pub fn trait_value_of<S: ?Sized + Send + Sync + 'static>(value: &ResolvedValue) -> DiResult<Arc<S>> {
    match value {
        Some(instance) => instance.downcast_trait::<S>(),
        None => Err(DiError::NullInjection(std::any::type_name::<S>())),
    }
}

/// Downcasts a resolved argument, tolerating an empty value.
pub fn optional_value_of<T: Any + Send + Sync>(value: &ResolvedValue) -> DiResult<Option<Arc<T>>> {
    value.as_ref().map(|instance| instance.downcast::<T>()).transpose()
}

/// Downcasts a resolved trait-object argument, tolerating an empty value.
pub fn optional_trait_value_of<S: ?Sized + Send + Sync + 'static>(
    value: &ResolvedValue,
) -> DiResult<Option<Arc<S>>> {
    value.as_ref().map(|instance| instance.downcast_trait::<S>()).transpose()
}

/// Mutable box wrapping an activated instance.
///
/// Activation and deactivation strategies receive the reference rather than
/// the bare instance; deactivation clears it so a released instance drops its
/// tracked state even while the cache entry is being torn down.
pub struct InstanceReference {
    id: usize,
    instance: Mutex<Option<Instance>>,
}

impl InstanceReference {
    pub fn new(instance: Instance) -> Self {
        Self {
            id: instance.id(),
            instance: Mutex::new(Some(instance)),
        }
    }

    /// Identity captured at construction; survives [`clear`](Self::clear).
    #[inline(always)]
    pub fn id(&self) -> usize {
        self.id
    }

    /// The wrapped instance, if not yet deactivated.
    pub fn instance(&self) -> Option<Instance> {
        self.instance.lock().clone()
    }

    pub(crate) fn clear(&self) {
        *self.instance.lock() = None;
    }
}
