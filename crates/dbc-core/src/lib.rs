//! DBC Core - design-by-contract wrappers for Rust callables
//!
//! Wraps a target with ordered preconditions, postconditions and invariants,
//! and turns every violation into a [`Violation`] carrying the first failing
//! condition's message.
//!
//! # Architecture
//!
//! ```text
//! ContractSpec → build()        → Contract       (sync: invoke / call / try_invoke)
//!              → build_async()  → AsyncContract  (call → Deferred)
//!
//! JSON Manifest → Validator → Expr compiler → Contract / AsyncContract → ExecutionResult
//! ```
//!
//! # Pipeline
//!
//! ```text
//! preconditions → invariants → target → invariants → postconditions
//! ```
//!
//! Each list is evaluated in order and stops at its first failing predicate.
//! A violation before the call means the target never runs.
//!
//! # Guarantees
//!
//! - **Transparent**: with all lists empty, a wrapper returns exactly what the target returns
//! - **Fail-fast**: no predicate after the first failing one is evaluated
//! - **Stateless**: wrappers keep no state between calls
//! - **Deterministic messages**: a violation carries its explicit message or a fixed default

pub mod asynchronous;
pub mod condition;
pub mod error;
pub mod evaluator;
pub mod expr;
pub mod manifest;
pub mod spec;
pub mod validator;
pub mod value;
pub mod wrapper;

pub use asynchronous::{AsyncContract, Deferred};
pub use condition::{Condition, ContractKind, Predicate};
pub use error::{ContractError, Error, Result, StructuralError, Violation};
pub use manifest::{
    execute_manifest, execute_manifest_async, ConditionShape, ExecutionResult, Manifest,
    ViolationPolicy,
};
pub use spec::ContractSpec;
pub use value::{Bag, State, Value};
pub use wrapper::Contract;
