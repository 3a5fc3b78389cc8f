//! Typed contract specs
//!
//! A [`ContractSpec`] names the target and its three condition lists. The
//! target is any `Fn`, so the structural checks the dynamic validator performs
//! are already discharged by the compiler here and building is infallible.

use crate::asynchronous::AsyncContract;
use crate::condition::Condition;
use crate::evaluator::Clauses;
use crate::wrapper::Contract;

/// Target plus preconditions, postconditions and invariants
#[derive(Debug, Clone)]
pub struct ContractSpec<F> {
    pub target: F,
    pub clauses: Clauses,
}

impl<F> ContractSpec<F> {
    /// Spec with empty condition lists
    pub fn new(target: F) -> Self {
        ContractSpec {
            target,
            clauses: Clauses::default(),
        }
    }

    pub fn precondition(mut self, condition: Condition) -> Self {
        self.clauses.preconditions.push(condition);
        self
    }

    pub fn postcondition(mut self, condition: Condition) -> Self {
        self.clauses.postconditions.push(condition);
        self
    }

    pub fn invariant(mut self, condition: Condition) -> Self {
        self.clauses.invariants.push(condition);
        self
    }

    pub fn preconditions(mut self, conditions: impl IntoIterator<Item = Condition>) -> Self {
        self.clauses.preconditions.extend(conditions);
        self
    }

    pub fn postconditions(mut self, conditions: impl IntoIterator<Item = Condition>) -> Self {
        self.clauses.postconditions.extend(conditions);
        self
    }

    pub fn invariants(mut self, conditions: impl IntoIterator<Item = Condition>) -> Self {
        self.clauses.invariants.extend(conditions);
        self
    }

    /// Wrap the target for synchronous calls
    pub fn build(self) -> Contract<F> {
        Contract::new(self)
    }

    /// Wrap the target for asynchronous calls with fixed arguments
    pub fn build_async<A>(self, args: A) -> AsyncContract<F, A> {
        AsyncContract::new(self, args)
    }
}
