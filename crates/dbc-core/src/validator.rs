//! Structural validation of dynamic contract specs
//!
//! Typed specs cannot be malformed, but specs that arrive as data (JSON
//! manifests, foreign callers) can. [`validate`] checks such a [`RawSpec`]
//! before anything is built and stops at the first problem:
//!
//! 1. the target is callable
//! 2. every condition list is an array (preconditions, postconditions,
//!    invariants, in that order)
//! 3. every element of every list is itself an array
//! 4. every tuple starts with a callable predicate
//!
//! What counts as "callable" depends on the caller, so it is passed in as a
//! capability test.

use serde_json::Value as Json;

use crate::condition::ContractKind;
use crate::error::StructuralError;

/// The list order used for every validation pass
const LIST_ORDER: [ContractKind; 3] = [
    ContractKind::Precondition,
    ContractKind::Postcondition,
    ContractKind::Invariant,
];

/// A contract spec whose fields have not been checked yet.
///
/// Missing fields are `Json::Null`.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RawSpec {
    #[serde(rename = "fn", default)]
    pub target: Json,
    #[serde(default)]
    pub preconditions: Json,
    #[serde(default)]
    pub postconditions: Json,
    #[serde(default)]
    pub invariants: Json,
}

impl RawSpec {
    /// The raw list for one kind of condition
    pub fn list(&self, kind: ContractKind) -> &Json {
        match kind {
            ContractKind::Precondition => &self.preconditions,
            ContractKind::Postcondition => &self.postconditions,
            ContractKind::Invariant => &self.invariants,
        }
    }
}

/// Validate the shape of a raw spec
///
/// `is_callable` decides whether a value can act as a target or predicate.
pub fn validate<C>(spec: &RawSpec, is_callable: C) -> Result<(), StructuralError>
where
    C: Fn(&Json) -> bool,
{
    if !is_callable(&spec.target) {
        return Err(StructuralError::TargetNotCallable);
    }

    for kind in LIST_ORDER {
        if !spec.list(kind).is_array() {
            return Err(StructuralError::NotAnArray(kind));
        }
    }

    for kind in LIST_ORDER {
        if !tuples(spec.list(kind)).all(Json::is_array) {
            return Err(StructuralError::NotAnArrayOfArray(kind));
        }
    }

    for kind in LIST_ORDER {
        let all_callable = tuples(spec.list(kind))
            .all(|tuple| tuple.get(0).is_some_and(|first| is_callable(first)));
        if !all_callable {
            return Err(StructuralError::MissingPredicate(kind));
        }
    }

    Ok(())
}

fn tuples(list: &Json) -> impl Iterator<Item = &Json> {
    list.as_array().into_iter().flatten()
}
