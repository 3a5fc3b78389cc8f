//! Condition evaluator — ordered, fail-fast
//!
//! Every condition list is walked strictly in order. The first predicate that
//! does not return `true` ends the walk and becomes the [`Violation`]; later
//! predicates are never called.

use crate::condition::{Condition, ContractKind};
use crate::error::Violation;

/// Check one condition list, returning the first violation
pub fn check(conditions: &[Condition], kind: ContractKind) -> Result<(), Violation> {
    tracing::trace!(%kind, count = conditions.len(), "checking conditions");
    for (index, condition) in conditions.iter().enumerate() {
        if condition.holds() {
            continue;
        }
        let message = condition
            .explicit_message()
            .unwrap_or_else(|| kind.default_message());
        tracing::debug!(%kind, index, reason = message, "contract violated");
        return Err(Violation::new(kind, index, message));
    }
    Ok(())
}

/// The three condition lists of a contract, in evaluation order
#[derive(Debug, Clone, Default)]
pub struct Clauses {
    pub preconditions: Vec<Condition>,
    pub postconditions: Vec<Condition>,
    pub invariants: Vec<Condition>,
}

impl Clauses {
    /// Stages run before the target: preconditions, then invariants
    pub fn before_call(&self) -> Result<(), Violation> {
        check(&self.preconditions, ContractKind::Precondition)?;
        check(&self.invariants, ContractKind::Invariant)
    }

    /// Stages run after the target: invariants, then postconditions
    pub fn after_call(&self) -> Result<(), Violation> {
        check(&self.invariants, ContractKind::Invariant)?;
        check(&self.postconditions, ContractKind::Postcondition)
    }
}
