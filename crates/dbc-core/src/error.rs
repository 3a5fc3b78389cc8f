//! Error types for the contract runtime
//!
//! Two categories are kept apart:
//!
//! - **Structural** errors ([`StructuralError`]) describe a malformed contract
//!   spec. They are raised while a wrapper is being built and the wrapper is
//!   never produced.
//! - **Semantic** errors ([`Violation`]) describe a condition that failed at
//!   call time.
//!
//! Failures of the guarded target are carried untouched inside
//! [`ContractError::Target`].

use std::fmt;

use thiserror::Error;

use crate::condition::ContractKind;

/// Malformed contract spec, detected at construction time.
///
/// `Display` yields the exact message callers match on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StructuralError {
    /// The target is missing or not callable
    #[error("First argument must be a function")]
    TargetNotCallable,

    /// A condition list is missing or not a sequence
    #[error("{} must be an array", .0.list_name())]
    NotAnArray(ContractKind),

    /// A condition list contains an element that is not a tuple
    #[error("{} must be an array of array", .0.list_name())]
    NotAnArrayOfArray(ContractKind),

    /// A condition tuple does not start with a callable predicate
    #[error("all {} have a function", .0.list_name())]
    MissingPredicate(ContractKind),
}

/// A condition that did not hold at call time.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
#[error("{message}")]
pub struct Violation {
    /// Which condition list failed
    pub kind: ContractKind,
    /// Position of the failing condition inside its list
    pub index: usize,
    /// Explicit condition message, or the list's default message
    pub message: String,
}

impl Violation {
    pub fn new(kind: ContractKind, index: usize, message: impl Into<String>) -> Self {
        Violation {
            kind,
            index,
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Failure of a guarded call whose target is itself fallible.
///
/// A violation and a target error are never merged: the target's error is
/// handed back exactly as the target produced it.
#[derive(Debug, Clone, PartialEq)]
pub enum ContractError<E> {
    /// A precondition, invariant or postcondition failed
    Violation(Violation),
    /// The target returned an error
    Target(E),
}

impl<E> ContractError<E> {
    pub fn is_violation(&self) -> bool {
        matches!(self, ContractError::Violation(_))
    }

    pub fn violation(&self) -> Option<&Violation> {
        match self {
            ContractError::Violation(v) => Some(v),
            ContractError::Target(_) => None,
        }
    }

    pub fn into_target(self) -> Option<E> {
        match self {
            ContractError::Target(e) => Some(e),
            ContractError::Violation(_) => None,
        }
    }
}

impl<E> From<Violation> for ContractError<E> {
    fn from(violation: Violation) -> Self {
        ContractError::Violation(violation)
    }
}

impl<E: fmt::Display> fmt::Display for ContractError<E> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ContractError::Violation(v) => write!(f, "{}", v),
            ContractError::Target(e) => write!(f, "{}", e),
        }
    }
}

impl<E: fmt::Debug + fmt::Display> std::error::Error for ContractError<E> {}

/// Crate-wide error type
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// Malformed spec (raised at construction)
    #[error(transparent)]
    Structural(#[from] StructuralError),

    /// Condition failed (raised at call time)
    #[error(transparent)]
    Violation(#[from] Violation),

    /// Expression syntax error
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Manifest could not be read or decoded
    #[error("Manifest error: {0}")]
    ManifestError(String),

    /// Runtime failure while evaluating a target body
    #[error("Execution error: {0}")]
    ExecutionError(String),
}

/// Result type alias for contract operations
pub type Result<T> = std::result::Result<T, Error>;
