//! Conditions: a predicate plus an optional message
//!
//! A condition is immutable once built. Predicates either close over whatever
//! state they observe, or receive a named argument [`Bag`] that was captured
//! when the condition was constructed.
//!
//! Predicates must not mutate the state they read. Invariants are evaluated
//! both before and after the target runs, and a predicate with side effects
//! makes that comparison meaningless. This is an obligation on the caller and
//! is not checked.

use std::fmt;
use std::sync::Arc;

use crate::value::Bag;

/// Which condition list a condition belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContractKind {
    /// Checked before the target runs
    Precondition,
    /// Checked before and after the target runs
    Invariant,
    /// Checked after the target returns successfully
    Postcondition,
}

impl ContractKind {
    /// Message used when a failing condition carries none of its own
    pub fn default_message(self) -> &'static str {
        match self {
            ContractKind::Precondition => "One of the preconditions is violated.",
            ContractKind::Invariant => "One of the invariants is violated.",
            ContractKind::Postcondition => "One of the postconditions is violated.",
        }
    }

    /// Name of the field holding this list
    pub fn list_name(self) -> &'static str {
        match self {
            ContractKind::Precondition => "preconditions",
            ContractKind::Invariant => "invariants",
            ContractKind::Postcondition => "postconditions",
        }
    }
}

impl fmt::Display for ContractKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ContractKind::Precondition => write!(f, "precondition"),
            ContractKind::Invariant => write!(f, "invariant"),
            ContractKind::Postcondition => write!(f, "postcondition"),
        }
    }
}

type PlainFn = dyn Fn() -> bool + Send + Sync;
type BagFn = dyn Fn(&Bag) -> bool + Send + Sync;

/// The boolean test of a condition
#[derive(Clone)]
pub enum Predicate {
    /// Zero-argument predicate closing over ambient state
    Plain(Arc<PlainFn>),
    /// Predicate over an argument bag fixed at construction
    WithArgs { test: Arc<BagFn>, args: Bag },
}

impl Predicate {
    /// Run the predicate
    pub fn test(&self) -> bool {
        match self {
            Predicate::Plain(test) => test(),
            Predicate::WithArgs { test, args } => test(args),
        }
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Predicate::Plain(_) => f.write_str("Plain(..)"),
            Predicate::WithArgs { args, .. } => {
                f.debug_struct("WithArgs").field("args", args).finish_non_exhaustive()
            }
        }
    }
}

/// A predicate and an optional violation message
#[derive(Debug, Clone)]
pub struct Condition {
    predicate: Predicate,
    message: Option<String>,
}

impl Condition {
    /// Condition over ambient state
    pub fn new<P>(predicate: P) -> Self
    where
        P: Fn() -> bool + Send + Sync + 'static,
    {
        Condition {
            predicate: Predicate::Plain(Arc::new(predicate)),
            message: None,
        }
    }

    /// Condition over a bag of named arguments captured now
    pub fn with_args<P>(args: Bag, predicate: P) -> Self
    where
        P: Fn(&Bag) -> bool + Send + Sync + 'static,
    {
        Condition {
            predicate: Predicate::WithArgs {
                test: Arc::new(predicate),
                args,
            },
            message: None,
        }
    }

    pub fn from_predicate(predicate: Predicate) -> Self {
        Condition {
            predicate,
            message: None,
        }
    }

    /// Attach the message reported when this condition fails
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Evaluate the predicate; only `true` counts as holding
    pub fn holds(&self) -> bool {
        self.predicate.test()
    }

    /// The attached message, unless it is missing or empty
    pub fn explicit_message(&self) -> Option<&str> {
        self.message.as_deref().filter(|m| !m.is_empty())
    }

    pub fn predicate(&self) -> &Predicate {
        &self.predicate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    #[test]
    fn test_default_messages() {
        assert_eq!(
            ContractKind::Precondition.default_message(),
            "One of the preconditions is violated."
        );
        assert_eq!(
            ContractKind::Invariant.default_message(),
            "One of the invariants is violated."
        );
        assert_eq!(
            ContractKind::Postcondition.default_message(),
            "One of the postconditions is violated."
        );
    }

    #[test]
    fn test_bag_is_captured_at_construction() {
        let mut args = Bag::new();
        args.insert("n2".into(), Value::Integer(0));
        let cond = Condition::with_args(args, |bag| bag.get("n2") != Some(&Value::Integer(0)))
            .message("cannot divide by zero");
        assert!(!cond.holds());
        assert_eq!(cond.explicit_message(), Some("cannot divide by zero"));
    }

    #[test]
    fn test_plain_condition_without_message() {
        let cond = Condition::new(|| true);
        assert!(cond.holds());
        assert_eq!(cond.explicit_message(), None);
    }

    #[test]
    fn test_kind_serializes_snake_case() {
        let json = serde_json::to_string(&ContractKind::Postcondition).unwrap();
        assert_eq!(json, "\"postcondition\"");
    }
}
