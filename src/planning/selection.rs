//! Constructor selection and scoring.
//!
//! A single candidate is used unconditionally. Multiple candidates are scored
//! by a pluggable [`ConstructorScorer`]; a tie at the top score is a hard
//! error rather than an arbitrary pick, because silently choosing one could
//! hide a binding-configuration mistake.

use std::sync::Arc;

use crate::context::Context;
use crate::error::{DiError, DiResult};
use crate::parameters::ParameterKind;
use crate::planning::{ConstructorDirective, Plan, ScoreHint};

/// Scores one candidate constructor for the current activation.
pub trait ConstructorScorer: Send + Sync {
    fn score(&self, ctx: &Context, directive: &ConstructorDirective) -> i64;
}

/// Default policy: one point per target the context can satisfy, either via
/// an applicable constructor-argument override or an existing binding for the
/// target's service. Optional targets always count as satisfiable.
/// [`ScoreHint::Preferred`] wins outright; [`ScoreHint::Deprecated`] loses to
/// every unbiased candidate.
pub struct StandardScorer;

impl ConstructorScorer for StandardScorer {
    fn score(&self, ctx: &Context, directive: &ConstructorDirective) -> i64 {
        match directive.hint() {
            ScoreHint::Preferred => return i64::MAX,
            ScoreHint::Deprecated => return i64::MIN,
            ScoreHint::Neutral => {}
        }

        let mut score = 0;
        for target in directive.targets() {
            let overridden = ctx.parameters().iter().any(|p| {
                p.kind() == ParameterKind::ConstructorArgument && p.applies_to(target)
            });
            if overridden || target.is_optional() || ctx.kernel().has_binding(target.service()) {
                score += 1;
            }
        }
        score
    }
}

/// Runtime injection selector: picks exactly one constructor per activation.
pub struct ConstructorSelector {
    scorer: Arc<dyn ConstructorScorer>,
}

impl ConstructorSelector {
    pub fn new(scorer: Arc<dyn ConstructorScorer>) -> Self {
        Self { scorer }
    }

    /// Selects the constructor to call for this activation.
    ///
    /// Fails with [`DiError::NoConstructor`] when the plan has no candidates
    /// and [`DiError::AmbiguousConstructors`] when the top score is tied.
    pub fn select<'p>(&self, ctx: &Context, plan: &'p Plan) -> DiResult<&'p Arc<ConstructorDirective>> {
        let candidates = plan.constructors();
        match candidates.len() {
            0 => Err(DiError::NoConstructor(plan.type_name())),
            1 => Ok(&candidates[0]),
            _ => {
                let scored: Vec<(i64, &Arc<ConstructorDirective>)> = candidates
                    .iter()
                    .map(|c| (self.scorer.score(ctx, c), c))
                    .collect();
                // Scores are computed once; the max is then re-scanned so
                // ties can be reported with every candidate named.
                let best = scored.iter().map(|(s, _)| *s).max().unwrap_or(0);
                let mut top = scored.iter().filter(|(s, _)| *s == best);
                let first = top.next().map(|(_, c)| *c);
                let rest: Vec<&'static str> = top.map(|(_, c)| c.name()).collect();
                match (first, rest.is_empty()) {
                    (Some(winner), true) => Ok(winner),
                    (Some(winner), false) => {
                        let mut names = vec![winner.name()];
                        names.extend(rest);
                        Err(DiError::AmbiguousConstructors(plan.type_name(), names))
                    }
                    (None, _) => Err(DiError::NoConstructor(plan.type_name())),
                }
            }
        }
    }
}
