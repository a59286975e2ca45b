//! # shinobi-di
//!
//! Binding-based dependency injection for Rust: given a graph of
//! service-to-implementation bindings, the kernel resolves instances, wires
//! their dependencies (constructor/property/method injection), manages
//! instance lifetime through scope objects, and runs extensible
//! initialization/activation/deactivation pipelines.
//!
//! ## Features
//!
//! - **Scope-keyed caching**: singleton, per-thread, and custom scope objects
//!   with at-most-once construction per scope under concurrency
//! - **Constructor scoring**: multiple candidate constructors scored per
//!   activation; ties are a hard error, never a silent pick
//! - **Parameter overrides**: caller- and binding-supplied values outrank
//!   recursive resolution, ambiguity fails fast
//! - **Activation pipeline**: property/method injection, decorators,
//!   `on_activation`/`on_deactivation` hooks, start/stop lifecycle — each
//!   side effect guaranteed to run at most once per logical instance
//! - **Thread-safe**: `Arc`-based kernel handle, per-scope construction locks
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use shinobi_di::{plan_for, scopes, trait_value_of, KernelBuilder, Target, TargetKind};
//!
//! trait Weapon: Send + Sync {
//!     fn damage(&self) -> u32;
//! }
//!
//! struct Dagger;
//! impl Weapon for Dagger {
//!     fn damage(&self) -> u32 {
//!         7
//!     }
//! }
//!
//! struct Ninja {
//!     weapon: Arc<dyn Weapon>,
//! }
//!
//! let mut builder = KernelBuilder::new();
//! builder.add_trait_callback::<dyn Weapon, _>(scopes::transient(), |_| {
//!     Ok(Arc::new(Dagger) as Arc<dyn Weapon>)
//! });
//! builder.register_plan(plan_for::<Ninja>().constructor(
//!     "new",
//!     vec![Target::of_trait::<dyn Weapon>("weapon", TargetKind::ConstructorArgument)],
//!     |_ctx, values| {
//!         Ok(Ninja { weapon: trait_value_of::<dyn Weapon>(&values[0])? })
//!     },
//! ));
//! builder.add_plan_binding::<Ninja>(scopes::singleton());
//!
//! let kernel = builder.build();
//! let ninja = kernel.get::<Ninja>().unwrap();
//! assert_eq!(ninja.weapon.damage(), 7);
//!
//! // Singleton scope: the same instance comes back.
//! let again = kernel.get::<Ninja>().unwrap();
//! assert!(Arc::ptr_eq(&ninja, &again));
//! ```
//!
//! ## Scopes
//!
//! A scope is an arbitrary object identity. The built-ins cover the common
//! cases — [`scopes::singleton`] (the kernel itself), [`scopes::thread`]
//! (a per-thread token), [`scopes::custom`] (caller-supplied object),
//! [`scopes::transient`] (never cached) — and any `Arc` works as a custom
//! scope. Clearing a scope deactivates and evicts everything it owns.

// Module declarations
pub mod binding;
pub mod cache;
pub mod components;
pub mod context;
pub mod error;
pub mod instance;
pub mod key;
pub mod kernel;
pub mod observer;
pub mod parameters;
pub mod pipeline;
pub mod planning;
pub mod provider;
pub mod request;
pub mod scope;
pub mod settings;

// Re-export core types
pub use binding::{Binding, BindingBuilder, BindingId, BindingMetadata};
pub use cache::Cache;
pub use components::ComponentContainer;
pub use context::Context;
pub use error::{DiError, DiResult};
pub use instance::{
    optional_trait_value_of, optional_value_of, trait_value_of, value_of, Instance,
    InstanceReference, ResolvedValue,
};
pub use key::{key_of_trait, key_of_type, Key};
pub use kernel::{Kernel, KernelBuilder};
pub use observer::{LoggingObserver, Observers, ResolutionObserver};
pub use parameters::{Parameter, ParameterKind};
pub use pipeline::{
    ActivationCache, ActivationStrategy, DeactivationStrategy, InitializationStrategy, Pipeline,
    Startable,
};
pub use planning::selection::{ConstructorScorer, ConstructorSelector, StandardScorer};
pub use planning::{
    plan_for, ConstructorDirective, MethodDirective, Plan, PlanBuilder, Planner,
    PropertyDirective, RegistryPlanner, ScoreHint, Target, TargetKind,
};
pub use provider::{
    CallbackProvider, CoercingProvider, ConstantProvider, DelegatingProvider,
    FixedConstructorProvider, Provider, StandardProvider,
};
pub use request::{Constraint, Request};
pub use scope::{scopes, ScopeCallback, ScopeId, ScopeObject};
pub use settings::ContainerSettings;
