//! Synchronous contract wrapper
//!
//! Each call runs the same pipeline:
//!
//! 1. preconditions
//! 2. invariants
//! 3. the target
//! 4. invariants again
//! 5. postconditions
//!
//! A violation in stages 1–2 means the target never runs. A violation in
//! stages 4–5 discards the target's return value. Invariants are checked on
//! both sides of the call so that a target corrupting state its invariants
//! observe is caught, even though the predicates themselves never change.
//! A panicking target unwinds through the wrapper unchanged and skips stages
//! 4–5.
//!
//! The pipeline produces a single `Result`; the public methods only differ in
//! what they do with a violation:
//!
//! - [`Contract::invoke`] returns it as a value
//! - [`Contract::call`] raises it as a panic
//! - [`Contract::try_invoke`] is `invoke` for fallible targets

use std::fmt;

use crate::error::{ContractError, Violation};
use crate::evaluator::Clauses;
use crate::spec::ContractSpec;

/// A target guarded by its contract
#[derive(Clone)]
pub struct Contract<F> {
    target: F,
    clauses: Clauses,
}

impl<F> Contract<F> {
    pub fn new(spec: ContractSpec<F>) -> Self {
        Contract {
            target: spec.target,
            clauses: spec.clauses,
        }
    }

    pub fn clauses(&self) -> &Clauses {
        &self.clauses
    }

    /// Run the guarded target, returning a violation as a value
    pub fn invoke<A, R>(&self, args: A) -> Result<R, Violation>
    where
        F: Fn(A) -> R,
    {
        self.clauses.before_call()?;
        let returned = (self.target)(args);
        self.clauses.after_call()?;
        Ok(returned)
    }

    /// Run the guarded target, panicking on a violation
    ///
    /// # Panics
    /// Panics with the violation message when any condition fails.
    pub fn call<A, R>(&self, args: A) -> R
    where
        F: Fn(A) -> R,
    {
        match self.invoke(args) {
            Ok(returned) => returned,
            Err(violation) => panic!("{}", violation),
        }
    }

    /// Run a fallible target
    ///
    /// A target error skips the post-call checks and is returned unchanged as
    /// [`ContractError::Target`].
    pub fn try_invoke<A, T, E>(&self, args: A) -> Result<T, ContractError<E>>
    where
        F: Fn(A) -> Result<T, E>,
    {
        self.clauses.before_call()?;
        let returned = match (self.target)(args) {
            Ok(value) => value,
            Err(err) => {
                tracing::debug!("target failed, skipping post-call checks");
                return Err(ContractError::Target(err));
            }
        };
        self.clauses.after_call()?;
        Ok(returned)
    }
}

impl<F> fmt::Debug for Contract<F> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Contract")
            .field("clauses", &self.clauses)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::{Condition, ContractKind};
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_empty_contract_is_transparent() {
        let contract = ContractSpec::new(|(a, b): (i32, i32)| a + b).build();
        assert_eq!(contract.invoke((2, 3)), Ok(5));
        assert_eq!(contract.call((4, 4)), 8);
    }

    #[test]
    fn test_precondition_blocks_target() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let contract = ContractSpec::new(move |x: i32| {
            counter.fetch_add(1, Ordering::SeqCst);
            x
        })
        .precondition(Condition::new(|| false).message("no"))
        .build();

        let violation = contract.invoke(1).unwrap_err();
        assert_eq!(violation.message, "no");
        assert_eq!(violation.kind, ContractKind::Precondition);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_pre_call_invariant_blocks_target() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let contract = ContractSpec::new(move |_: ()| counter.fetch_add(1, Ordering::SeqCst))
            .invariant(Condition::new(|| false))
            .build();

        let violation = contract.invoke(()).unwrap_err();
        assert_eq!(violation.kind, ContractKind::Invariant);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_invariant_broken_by_target_is_detected() {
        let state = Arc::new(Mutex::new((10_i64, 10_i64)));
        let target_state = state.clone();
        let inv_state = state.clone();
        let contract = ContractSpec::new(move |_: ()| {
            let mut s = target_state.lock();
            s.1 = 5;
            s.0 / s.1
        })
        .invariant(
            Condition::new(move || *inv_state.lock() == (10, 10)).message("inputs are not same"),
        )
        .build();

        let violation = contract.invoke(()).unwrap_err();
        assert_eq!(violation.message, "inputs are not same");
        assert_eq!(violation.kind, ContractKind::Invariant);
    }

    #[test]
    fn test_postcondition_sees_new_state() {
        let sum = Arc::new(Mutex::new(0_i64));
        let target_sum = sum.clone();
        let post_sum = sum.clone();
        let contract = ContractSpec::new(move |(a, b): (i64, i64)| {
            *target_sum.lock() = a + b;
            a + b
        })
        .postcondition(Condition::new(move || *post_sum.lock() == 3))
        .build();

        assert_eq!(contract.invoke((1, 2)), Ok(3));
        let violation = contract.invoke((2, 2)).unwrap_err();
        assert_eq!(violation.message, "One of the postconditions is violated.");
    }

    #[test]
    #[should_panic(expected = "cannot divide by zero")]
    fn test_call_panics_on_violation() {
        let contract = ContractSpec::new(|(a, b): (i64, i64)| a / b)
            .precondition(Condition::new(|| false).message("cannot divide by zero"))
            .build();
        contract.call((1, 0));
    }

    #[test]
    #[should_panic(expected = "target exploded")]
    fn test_invoke_propagates_target_panic() {
        let contract = ContractSpec::new(|_: ()| -> i32 { panic!("target exploded") })
            .precondition(Condition::new(|| true))
            .invariant(Condition::new(|| true))
            .postcondition(Condition::new(|| true))
            .build();
        let _ = contract.invoke(());
    }

    #[test]
    fn test_call_propagates_target_panic_without_post_checks() {
        let post_ran = Arc::new(AtomicUsize::new(0));
        let counter = post_ran.clone();
        let contract = ContractSpec::new(|x: i32| -> i32 { panic!("target exploded on {}", x) })
            .postcondition(Condition::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                true
            }))
            .build();

        let payload = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| contract.call(7)))
            .unwrap_err();
        let message = payload
            .downcast_ref::<String>()
            .cloned()
            .unwrap_or_default();
        assert_eq!(message, "target exploded on 7");
        assert_eq!(post_ran.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_try_invoke_passes_target_error_through() {
        let post_ran = Arc::new(AtomicUsize::new(0));
        let counter = post_ran.clone();
        let contract = ContractSpec::new(|x: i32| -> Result<i32, String> {
            if x < 0 {
                Err(format!("negative input {}", x))
            } else {
                Ok(x * 2)
            }
        })
        .postcondition(Condition::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            true
        }))
        .build();

        assert_eq!(contract.try_invoke(4), Ok(8));
        let err = contract.try_invoke(-1).unwrap_err();
        assert_eq!(err, ContractError::Target("negative input -1".to_string()));
        assert_eq!(post_ran.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_try_invoke_reports_violation() {
        let contract = ContractSpec::new(|x: i32| Ok::<_, String>(x))
            .postcondition(Condition::new(|| false).message("never"))
            .build();
        let err = contract.try_invoke(1).unwrap_err();
        assert_eq!(err.violation().map(|v| v.message.as_str()), Some("never"));
    }
}
