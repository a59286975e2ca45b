//! The standard pipeline strategies.

use crate::binding::Binding;
use crate::context::Context;
use crate::error::DiResult;
use crate::instance::{Instance, InstanceReference};
use crate::pipeline::{ActivationStrategy, DeactivationStrategy, InitializationStrategy};
use crate::planning::Plan;

/// Resolves and sets every property directive of the context's plan.
pub struct PropertyInjectionStrategy;

impl InitializationStrategy for PropertyInjectionStrategy {
    fn initialize(&self, ctx: &Context, instance: Instance) -> DiResult<Instance> {
        if let Some(plan) = ctx.plan() {
            for directive in plan.properties() {
                let value = ctx.resolve_target(directive.target())?;
                directive.set(ctx, &instance, value)?;
            }
        }
        Ok(instance)
    }
}

/// Resolves arguments for and invokes every method directive of the plan.
pub struct MethodInjectionStrategy;

impl InitializationStrategy for MethodInjectionStrategy {
    fn initialize(&self, ctx: &Context, instance: Instance) -> DiResult<Instance> {
        if let Some(plan) = ctx.plan() {
            for directive in plan.methods() {
                let mut values = Vec::with_capacity(directive.targets().len());
                for target in directive.targets() {
                    values.push(ctx.resolve_target(target)?);
                }
                directive.invoke(ctx, &instance, &values)?;
            }
        }
        Ok(instance)
    }
}

/// Runs the binding's `on_initialization` actions; each may replace the
/// instance.
pub struct BindingInitializationStrategy;

impl InitializationStrategy for BindingInitializationStrategy {
    fn initialize(&self, ctx: &Context, mut instance: Instance) -> DiResult<Instance> {
        for action in ctx.binding().initialization_actions() {
            instance = action(ctx, instance)?;
        }
        Ok(instance)
    }
}

/// Runs the binding's `on_activation` actions.
pub struct BindingActivationStrategy;

impl ActivationStrategy for BindingActivationStrategy {
    fn activate(&self, ctx: &Context, reference: &InstanceReference) -> DiResult<()> {
        let Some(instance) = reference.instance() else {
            return Ok(());
        };
        for action in ctx.binding().activation_actions() {
            action(ctx, &instance)?;
        }
        Ok(())
    }
}

/// Calls the plan's start hook when the implementation type opted in.
pub struct StartableActivationStrategy;

impl ActivationStrategy for StartableActivationStrategy {
    fn activate(&self, ctx: &Context, reference: &InstanceReference) -> DiResult<()> {
        if let Some(plan) = ctx.plan() {
            if let Some(hook) = plan.start_hook() {
                if let Some(instance) = reference.instance() {
                    hook(&instance);
                }
            }
        }
        Ok(())
    }
}

/// Runs the binding's `on_deactivation` actions.
pub struct BindingDeactivationStrategy;

impl DeactivationStrategy for BindingDeactivationStrategy {
    fn deactivate(&self, binding: &Binding, _plan: Option<&Plan>, reference: &InstanceReference) {
        if let Some(instance) = reference.instance() {
            for action in binding.deactivation_actions() {
                action(&instance);
            }
        }
    }
}

/// Calls the plan's stop hook when the implementation type opted in.
pub struct StartableDeactivationStrategy;

impl DeactivationStrategy for StartableDeactivationStrategy {
    fn deactivate(&self, _binding: &Binding, plan: Option<&Plan>, reference: &InstanceReference) {
        if let Some(plan) = plan {
            if let Some(hook) = plan.stop_hook() {
                if let Some(instance) = reference.instance() {
                    hook(&instance);
                }
            }
        }
    }
}
