//! Asynchronous contract wrapper
//!
//! The async wrapper takes no call-time arguments. It calls the target with
//! the argument value fixed at build time and hands back a [`Deferred`], a
//! boxed future that settles exactly once.
//!
//! The pipeline is the same as the synchronous one. Awaiting the target is its
//! only suspension point; every condition list is evaluated synchronously on
//! either side of it. There is no timeout: the deferred waits for the target
//! for as long as the target takes.
//!
//! Nothing runs until the deferred is polled.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;

use crate::error::ContractError;
use crate::evaluator::Clauses;
use crate::spec::ContractSpec;

/// Pending outcome of an asynchronous guarded call
pub type Deferred<T, E> = BoxFuture<'static, Result<T, ContractError<E>>>;

struct Inner<F, A> {
    target: F,
    args: A,
    clauses: Clauses,
}

/// An async target guarded by its contract, with fixed call arguments
pub struct AsyncContract<F, A> {
    inner: Arc<Inner<F, A>>,
}

impl<F, A> AsyncContract<F, A> {
    pub fn new(spec: ContractSpec<F>, args: A) -> Self {
        AsyncContract {
            inner: Arc::new(Inner {
                target: spec.target,
                args,
                clauses: spec.clauses,
            }),
        }
    }

    /// The arguments every call passes to the target
    pub fn args(&self) -> &A {
        &self.inner.args
    }

    pub fn clauses(&self) -> &Clauses {
        &self.inner.clauses
    }
}

impl<F, A, Fut, T, E> AsyncContract<F, A>
where
    F: Fn(A) -> Fut + Send + Sync + 'static,
    A: Clone + Send + Sync + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    T: Send + 'static,
    E: Send + 'static,
{
    /// Start a guarded call
    ///
    /// Violations and target failures both settle the deferred as failed; a
    /// target failure is passed through as [`ContractError::Target`].
    pub fn call(&self) -> Deferred<T, E> {
        Box::pin(settle(Arc::clone(&self.inner)))
    }
}

async fn settle<F, A, Fut, T, E>(inner: Arc<Inner<F, A>>) -> Result<T, ContractError<E>>
where
    F: Fn(A) -> Fut,
    A: Clone,
    Fut: Future<Output = Result<T, E>>,
{
    inner.clauses.before_call()?;
    let returned = match (inner.target)(inner.args.clone()).await {
        Ok(value) => value,
        Err(err) => {
            tracing::debug!("async target failed, skipping post-call checks");
            return Err(ContractError::Target(err));
        }
    };
    inner.clauses.after_call()?;
    Ok(returned)
}

impl<F, A> Clone for AsyncContract<F, A> {
    fn clone(&self) -> Self {
        AsyncContract {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<F, A: fmt::Debug> fmt::Debug for AsyncContract<F, A> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("AsyncContract")
            .field("args", &self.inner.args)
            .field("clauses", &self.inner.clauses)
            .finish_non_exhaustive()
    }
}
