//! Contract manifests — dynamic contracts described as JSON
//!
//! A manifest carries the same fields as a typed spec, but as data:
//!
//! ```json
//! {
//!   "name": "divide",
//!   "state": { "n1": 10, "n2": 0 },
//!   "fn": "n1 / n2",
//!   "preconditions": [["n2 != 0", "cannot divide by zero"]],
//!   "postconditions": [],
//!   "invariants": [["n1 == 10"]]
//! }
//! ```
//!
//! Targets and predicates are written in the [`crate::expr`] language. A target
//! is a string body or an object `{ "params": [..], "body": ".." }`; call
//! arguments bind to the params positionally.
//!
//! Compiling a manifest runs the structural [`validator`] first, so a
//! malformed manifest fails with the same messages as any other dynamic spec
//! and never produces a runnable contract.
//!
//! [`validator`]: crate::validator

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use serde_json::Value as Json;
use sha2::{Digest, Sha256};

use crate::asynchronous::AsyncContract;
use crate::condition::{Condition, ContractKind};
use crate::error::{ContractError, Violation};
use crate::expr::{parse_expression, parse_program, Expr, Program};
use crate::spec::ContractSpec;
use crate::validator::{self, RawSpec};
use crate::value::{compute_changes, Bag, SharedState, State, StateChange, Value};
use crate::wrapper::Contract;
use crate::{Error, Result};

// ── Configuration ─────────────────────────────────────────

/// What a guarded call does with a violation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationPolicy {
    /// Abort: the violation becomes the execution's error
    #[default]
    Raise,
    /// Record the violation as the call's value and keep going
    Return,
}

impl std::str::FromStr for ViolationPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "raise" => Ok(ViolationPolicy::Raise),
            "return" => Ok(ViolationPolicy::Return),
            other => Err(Error::ManifestError(format!(
                "unknown violation policy '{}', expected 'raise' or 'return'",
                other
            ))),
        }
    }
}

/// Layout of a condition tuple
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionShape {
    /// `[predicate, message?]`
    #[default]
    Plain,
    /// `[predicate, {args}, message?]`
    WithArgs,
}

/// A contract manifest as read from JSON
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub name: String,
    /// Initial state fields
    #[serde(default)]
    pub state: Json,
    #[serde(flatten)]
    pub spec: RawSpec,
    #[serde(default)]
    pub shape: ConditionShape,
    #[serde(default)]
    pub on_violation: ViolationPolicy,
    /// Select the asynchronous protocol
    #[serde(rename = "async", default)]
    pub asynchronous: bool,
    /// Fixed arguments for asynchronous calls
    #[serde(default)]
    pub async_args: Json,
    /// Delay awaited by asynchronous targets before their body runs
    #[serde(default)]
    pub delay_ms: u64,
}

impl Manifest {
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text)
            .map_err(|e| Error::ManifestError(format!("Invalid manifest JSON: {}", e)))
    }

    /// Structural validation followed by expression compilation
    pub fn validate(&self) -> Result<()> {
        self.compile().map(|_| ())
    }

    /// SHA-256 over the canonical JSON form of the manifest
    pub fn fingerprint(&self) -> Result<String> {
        let canonical = serde_json::to_value(self)
            .and_then(|v| serde_json::to_string(&v))
            .map_err(|e| Error::ManifestError(format!("Failed to serialize manifest: {}", e)))?;
        let mut hasher = Sha256::new();
        hasher.update(canonical.as_bytes());
        Ok(format!("{:x}", hasher.finalize()))
    }

    /// Validate and build a runnable contract over fresh state
    pub fn compile(&self) -> Result<CompiledManifest> {
        validator::validate(&self.spec, |value| callable_source(value).is_some())?;

        let state: SharedState = Arc::new(parking_lot::Mutex::new(State::from_json(&self.state)));
        let (params, program) = compile_target(&self.spec.target)?;

        let conditions = |kind: ContractKind| -> Result<Vec<Condition>> {
            tuples(self.spec.list(kind))
                .map(|tuple| compile_condition(tuple, self.shape, &state))
                .collect()
        };
        let preconditions = conditions(ContractKind::Precondition)?;
        let postconditions = conditions(ContractKind::Postcondition)?;
        let invariants = conditions(ContractKind::Invariant)?;

        let runner = if self.asynchronous {
            let target = async_target(params, program, state.clone(), self.delay_ms);
            Runner::Async(
                ContractSpec::new(target)
                    .preconditions(preconditions)
                    .postconditions(postconditions)
                    .invariants(invariants)
                    .build_async(values_from(&self.async_args)),
            )
        } else {
            let target = sync_target(params, program, state.clone());
            Runner::Sync(
                ContractSpec::new(target)
                    .preconditions(preconditions)
                    .postconditions(postconditions)
                    .invariants(invariants)
                    .build(),
            )
        };

        tracing::debug!(name = %self.name, asynchronous = self.asynchronous, "compiled manifest");

        Ok(CompiledManifest {
            name: self.name.clone(),
            fingerprint: self.fingerprint()?,
            policy: self.on_violation,
            state,
            runner,
        })
    }
}

// ── Compilation ───────────────────────────────────────────

/// Source text of a callable value: a string, or an object's string `body`
fn callable_source(value: &Json) -> Option<&str> {
    match value {
        Json::String(s) => Some(s),
        Json::Object(map) => map.get("body").and_then(Json::as_str),
        _ => None,
    }
}

fn tuples(list: &Json) -> impl Iterator<Item = &[Json]> {
    list.as_array()
        .into_iter()
        .flatten()
        .filter_map(|tuple| tuple.as_array().map(Vec::as_slice))
}

fn compile_target(target: &Json) -> Result<(Arc<[String]>, Arc<Program>)> {
    let body = callable_source(target).unwrap_or_default();
    let params = match target.get("params") {
        None | Some(Json::Null) => Vec::new(),
        Some(Json::Array(items)) => items
            .iter()
            .map(|item| {
                item.as_str().map(str::to_string).ok_or_else(|| {
                    Error::ManifestError(format!("target params must be strings, found {}", item))
                })
            })
            .collect::<Result<Vec<_>>>()?,
        Some(other) => {
            return Err(Error::ManifestError(format!(
                "target params must be an array, found {}",
                other
            )))
        }
    };
    Ok((params.into(), Arc::new(parse_program(body)?)))
}

fn compile_condition(tuple: &[Json], shape: ConditionShape, state: &SharedState) -> Result<Condition> {
    let source = tuple.first().and_then(callable_source).unwrap_or_default();
    let expr = Arc::new(parse_expression(source)?);
    let state = state.clone();

    let (condition, message) = match shape {
        ConditionShape::Plain => {
            let condition = Condition::new(move || holds(&expr, &Bag::new(), &state));
            (condition, tuple.get(1))
        }
        ConditionShape::WithArgs => {
            let args = bag_from(tuple.get(1))?;
            let condition = Condition::with_args(args, move |bag| holds(&expr, bag, &state));
            (condition, tuple.get(2))
        }
    };

    Ok(match message.and_then(Json::as_str) {
        Some(text) if !text.is_empty() => condition.message(text),
        _ => condition,
    })
}

/// Only a boolean `true` holds; errors and other values fail the condition
fn holds(expr: &Expr, locals: &Bag, state: &SharedState) -> bool {
    let state = state.lock();
    match expr.evaluate(locals, &state) {
        Ok(Value::Boolean(true)) => true,
        Ok(other) => {
            tracing::trace!(value = %other, "predicate did not yield true");
            false
        }
        Err(e) => {
            tracing::debug!(error = %e, "predicate failed to evaluate");
            false
        }
    }
}

/// The argument object of a `with_args` tuple; absent or null means no args
fn bag_from(value: Option<&Json>) -> Result<Bag> {
    match value {
        None | Some(Json::Null) => Ok(Bag::new()),
        Some(Json::Object(map)) => Ok(map
            .iter()
            .map(|(k, v)| (k.clone(), Value::from_json(v)))
            .collect()),
        Some(other) => Err(Error::ManifestError(format!(
            "with_args conditions take an argument object after the predicate, found {}",
            other
        ))),
    }
}

fn values_from(value: &Json) -> Vec<Value> {
    match value {
        Json::Array(items) => items.iter().map(Value::from_json).collect(),
        _ => Vec::new(),
    }
}

/// Bind call arguments to params by position; missing args are null
fn bind(params: &[String], args: Vec<Value>) -> Bag {
    let mut args = args.into_iter();
    params
        .iter()
        .map(|name| (name.clone(), args.next().unwrap_or(Value::Null)))
        .collect()
}

fn run_locked(program: &Program, params: &[String], args: Vec<Value>, state: &SharedState) -> Result<Value> {
    let locals = bind(params, args);
    let mut state = state.lock();
    program.run(&locals, &mut state)
}

type SyncTarget = Box<dyn Fn(Vec<Value>) -> Result<Value> + Send + Sync>;
type AsyncTarget = Box<dyn Fn(Vec<Value>) -> BoxFuture<'static, Result<Value>> + Send + Sync>;

fn sync_target(params: Arc<[String]>, program: Arc<Program>, state: SharedState) -> SyncTarget {
    Box::new(move |args| run_locked(&program, &params, args, &state))
}

fn async_target(
    params: Arc<[String]>,
    program: Arc<Program>,
    state: SharedState,
    delay_ms: u64,
) -> AsyncTarget {
    Box::new(move |args| {
        let params = params.clone();
        let program = program.clone();
        let state = state.clone();
        Box::pin(async move {
            if delay_ms > 0 {
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }
            run_locked(&program, &params, args, &state)
        })
    })
}

// ── Execution ─────────────────────────────────────────────

enum Runner {
    Sync(Contract<SyncTarget>),
    Async(AsyncContract<AsyncTarget, Vec<Value>>),
}

/// A validated manifest, ready to be called
pub struct CompiledManifest {
    name: String,
    fingerprint: String,
    policy: ViolationPolicy,
    state: SharedState,
    runner: Runner,
}

/// How one call ended
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CallOutcome {
    Returned { value: Value },
    Violated(Violation),
    Failed { error: String },
}

/// One guarded call and the state changes it caused
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CallRecord {
    pub index: usize,
    pub args: Vec<Value>,
    pub outcome: CallOutcome,
    pub changes: Vec<StateChange>,
}

/// Result of executing a manifest
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ExecutionResult {
    pub name: String,
    pub fingerprint: String,
    /// False when a violation was raised or a target failed
    pub success: bool,
    pub calls: Vec<CallRecord>,
    pub final_state: BTreeMap<String, Value>,
    pub error: Option<String>,
}

impl CompiledManifest {
    pub fn is_async(&self) -> bool {
        matches!(self.runner, Runner::Async(_))
    }

    /// Override the manifest's violation policy
    pub fn with_policy(mut self, policy: ViolationPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> ViolationPolicy {
        self.policy
    }

    pub fn state(&self) -> &SharedState {
        &self.state
    }

    /// Run one synchronous call per argument list
    pub fn execute(&self, calls: &[Vec<Value>]) -> Result<ExecutionResult> {
        let Runner::Sync(contract) = &self.runner else {
            return Err(Error::ExecutionError(
                "asynchronous manifests must be run with execute_async".into(),
            ));
        };
        tracing::debug!(name = %self.name, calls = calls.len(), "executing manifest");

        let mut log = CallLog::default();
        for args in calls {
            let before = self.snapshot();
            let result = contract.try_invoke(args.clone());
            if !log.record(self, args.clone(), before, result) {
                break;
            }
        }
        Ok(log.finish(self))
    }

    /// Run `times` asynchronous calls, one after another, with the fixed args
    pub async fn execute_async(&self, times: usize) -> Result<ExecutionResult> {
        let Runner::Async(contract) = &self.runner else {
            return Err(Error::ExecutionError(
                "synchronous manifests must be run with execute".into(),
            ));
        };
        tracing::debug!(name = %self.name, calls = times, "executing asynchronous manifest");

        let mut log = CallLog::default();
        for _ in 0..times {
            let before = self.snapshot();
            let result = contract.call().await;
            if !log.record(self, contract.args().clone(), before, result) {
                break;
            }
        }
        Ok(log.finish(self))
    }

    fn snapshot(&self) -> BTreeMap<String, Value> {
        self.state.lock().fields.clone()
    }
}

#[derive(Default)]
struct CallLog {
    calls: Vec<CallRecord>,
    error: Option<String>,
}

impl CallLog {
    /// Record one call; returns whether execution should continue
    fn record(
        &mut self,
        manifest: &CompiledManifest,
        args: Vec<Value>,
        before: BTreeMap<String, Value>,
        result: std::result::Result<Value, ContractError<Error>>,
    ) -> bool {
        let changes = compute_changes(&before, &manifest.snapshot());
        let (outcome, keep_going) = match result {
            Ok(value) => (CallOutcome::Returned { value }, true),
            Err(ContractError::Violation(violation)) => {
                let keep_going = manifest.policy == ViolationPolicy::Return;
                if !keep_going {
                    self.error = Some(violation.message.clone());
                }
                (CallOutcome::Violated(violation), keep_going)
            }
            Err(ContractError::Target(err)) => {
                let error = err.to_string();
                self.error = Some(error.clone());
                (CallOutcome::Failed { error }, false)
            }
        };
        self.calls.push(CallRecord {
            index: self.calls.len(),
            args,
            outcome,
            changes,
        });
        keep_going
    }

    fn finish(self, manifest: &CompiledManifest) -> ExecutionResult {
        ExecutionResult {
            name: manifest.name.clone(),
            fingerprint: manifest.fingerprint.clone(),
            success: self.error.is_none(),
            calls: self.calls,
            final_state: manifest.snapshot(),
            error: self.error,
        }
    }
}

/// Execute a synchronous manifest and return the pretty JSON result
///
/// `policy` overrides the manifest's `on_violation` when given.
pub fn execute_manifest(
    manifest_json: &str,
    calls: &[Vec<Value>],
    policy: Option<ViolationPolicy>,
) -> Result<String> {
    let compiled = compile_with_policy(manifest_json, policy)?;
    let result = compiled.execute(calls)?;
    to_pretty(&result)
}

/// Execute an asynchronous manifest `times` times and return the pretty JSON result
pub async fn execute_manifest_async(
    manifest_json: &str,
    times: usize,
    policy: Option<ViolationPolicy>,
) -> Result<String> {
    let compiled = compile_with_policy(manifest_json, policy)?;
    let result = compiled.execute_async(times).await?;
    to_pretty(&result)
}

fn compile_with_policy(manifest_json: &str, policy: Option<ViolationPolicy>) -> Result<CompiledManifest> {
    let compiled = Manifest::from_json(manifest_json)?.compile()?;
    Ok(match policy {
        Some(policy) => compiled.with_policy(policy),
        None => compiled,
    })
}

fn to_pretty(result: &ExecutionResult) -> Result<String> {
    serde_json::to_string_pretty(result)
        .map_err(|e| Error::ExecutionError(format!("Failed to serialize result: {}", e)))
}

// ── Tests ─────────────────────────────────────────────────
