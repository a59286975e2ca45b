//! Requests: one logical "give me an instance of service X" invocation.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::binding::{BindingId, BindingMetadata};
use crate::key::Key;
use crate::parameters::Parameter;
use crate::planning::Target;
use crate::scope::ScopeObject;

/// Predicate over binding metadata, restricting which bindings may satisfy a
/// request.
pub type Constraint = Arc<dyn Fn(&BindingMetadata) -> bool + Send + Sync>;

/// One resolution invocation, linked to its parent for nested dependencies.
///
/// Root requests come from `get`/`try_get`/`get_all`; child requests are
/// created per injection target during recursive resolution. The
/// active-binding stack is shared down the chain so cycle detection sees the
/// whole in-flight resolution, not just one level.
pub struct Request {
    service: Key,
    parent: Option<Arc<Request>>,
    target: Option<Target>,
    constraint: Option<Constraint>,
    parameters: Vec<Parameter>,
    is_optional: bool,
    is_unique: bool,
    depth: usize,
    scope_override: Option<ScopeObject>,
    active_bindings: Arc<Mutex<Vec<BindingId>>>,
}

impl Request {
    /// A root request with default constraint and scope.
    pub fn root(
        service: Key,
        parameters: Vec<Parameter>,
        is_optional: bool,
        is_unique: bool,
    ) -> Arc<Request> {
        Self::root_with(service, parameters, None, None, is_optional, is_unique)
    }

    /// A root request carrying a metadata constraint and/or scope override.
    pub fn root_with(
        service: Key,
        parameters: Vec<Parameter>,
        constraint: Option<Constraint>,
        scope_override: Option<ScopeObject>,
        is_optional: bool,
        is_unique: bool,
    ) -> Arc<Request> {
        Arc::new(Request {
            service,
            parent: None,
            target: None,
            constraint,
            parameters,
            is_optional,
            is_unique,
            depth: 0,
            scope_override,
            active_bindings: Arc::new(Mutex::new(Vec::new())),
        })
    }

    /// A child request for one injection target of the current activation.
    pub fn child(self: &Arc<Self>, service: Key, target: Target) -> Arc<Request> {
        let is_optional = target.is_optional();
        Arc::new(Request {
            service,
            parent: Some(self.clone()),
            target: Some(target),
            constraint: None,
            parameters: Vec::new(),
            is_optional,
            is_unique: true,
            depth: self.depth + 1,
            scope_override: None,
            active_bindings: self.active_bindings.clone(),
        })
    }

    pub fn service(&self) -> &Key {
        &self.service
    }

    pub fn parent(&self) -> Option<&Arc<Request>> {
        self.parent.as_ref()
    }

    /// The injection target this request was spawned for, if nested.
    pub fn target(&self) -> Option<&Target> {
        self.target.as_ref()
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    pub fn is_optional(&self) -> bool {
        self.is_optional
    }

    pub fn is_unique(&self) -> bool {
        self.is_unique
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn scope_override(&self) -> Option<&ScopeObject> {
        self.scope_override.as_ref()
    }

    /// Whether the request's constraint accepts the binding metadata.
    pub fn constraint_allows(&self, metadata: &BindingMetadata) -> bool {
        self.constraint.as_ref().map_or(true, |constraint| constraint(metadata))
    }

    pub(crate) fn is_binding_active(&self, id: BindingId) -> bool {
        self.active_bindings.lock().iter().any(|active| *active == id)
    }

    /// Service names from the root request down to this one, with the current
    /// service repeated at the end to show the cycle closing.
    pub(crate) fn cycle_path(&self) -> Vec<&'static str> {
        let mut path = Vec::new();
        let mut current = Some(self);
        while let Some(request) = current {
            path.push(request.service.display_name());
            current = request.parent.as_deref();
        }
        path.reverse();
        path.push(self.service.display_name());
        path
    }
}

/// Marks a binding as in-flight for the duration of one `Context::resolve`.
pub(crate) struct ActiveBindingGuard {
    stack: Arc<Mutex<Vec<BindingId>>>,
    id: BindingId,
}

impl ActiveBindingGuard {
    pub(crate) fn new(request: &Request, id: BindingId) -> Self {
        request.active_bindings.lock().push(id);
        Self { stack: request.active_bindings.clone(), id }
    }
}

impl Drop for ActiveBindingGuard {
    fn drop(&mut self) {
        let popped = self.stack.lock().pop();
        debug_assert_eq!(popped, Some(self.id));
    }
}
