//! Scope objects: the identity values that govern instance reuse.

use std::any::Any;
use std::sync::Arc;

use crate::context::Context;

/// An arbitrary object whose identity delimits an instance-reuse region.
///
/// The container never inspects a scope object; it only compares identity
/// (the `Arc` data pointer) and watches liveness through a `Weak`. The scope
/// object's lifetime is owned by whoever produced it.
pub type ScopeObject = Arc<dyn Any + Send + Sync>;

/// Reference identity of a scope object, usable as a map key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(usize);

impl ScopeId {
    #[inline(always)]
    pub fn of(scope: &ScopeObject) -> Self {
        ScopeId(Arc::as_ptr(scope).cast::<()>() as usize)
    }
}

/// Computes the scope object for an activation, or `None` for transient.
///
/// Evaluated once per resolution against the current [`Context`]; the result
/// is cached for the duration of that call only.
pub type ScopeCallback = Arc<dyn Fn(&Context) -> Option<ScopeObject> + Send + Sync>;

/// Built-in scope callbacks.
pub mod scopes {
    use super::*;

    struct ThreadScopeToken;

    std::thread_local! {
        static THREAD_SCOPE: ScopeObject = Arc::new(ThreadScopeToken);
    }

    /// One instance per kernel: the kernel itself is the scope object.
    pub fn singleton() -> ScopeCallback {
        Arc::new(|ctx: &Context| Some(ctx.kernel().scope_object()))
    }

    /// Never cached; every resolution constructs a fresh instance.
    pub fn transient() -> ScopeCallback {
        Arc::new(|_: &Context| None)
    }

    /// One instance per OS thread.
    ///
    /// The per-thread token drops when its thread exits, at which point the
    /// cached entries become prunable.
    pub fn thread() -> ScopeCallback {
        Arc::new(|_: &Context| Some(THREAD_SCOPE.with(|token| token.clone())))
    }

    /// Caller-supplied scope object; reuse lasts until the caller clears it
    /// or drops it. The callback holds the object weakly, so once it is gone
    /// the binding resolves transiently and its cached entries become
    /// prunable.
    pub fn custom(scope: &ScopeObject) -> ScopeCallback {
        let weak = Arc::downgrade(scope);
        Arc::new(move |_: &Context| weak.upgrade())
    }
}
