//! Unit-of-work shapes
//!
//! A [`Body`] produces its outcome in one of three ways: directly, as a
//! future, or by calling a [`Done`] completion handle. [`Body::settle`]
//! turns every shape into one awaited `Result`.

use std::future::Future;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use serde_json::{Map, Value};
use tokio::sync::oneshot;
use tracing::debug;

use super::context::ActionContext;
use crate::common::{Error, Result};

type ValueFn<I, O> = Box<dyn FnOnce(I) -> Result<O> + Send>;
type FutureFn<I, O> = Box<dyn FnOnce(I) -> BoxFuture<'static, Result<O>> + Send>;
type CallbackFn<I, O> = Box<dyn FnOnce(I, Done<O>) + Send>;

/// A unit of work taking `I` and producing `O`
pub enum Body<I, O> {
    /// Returns its outcome directly
    Value(ValueFn<I, O>),
    /// Returns a future of its outcome
    Future(FutureFn<I, O>),
    /// Reports its outcome through a completion handle
    Callback(CallbackFn<I, O>),
}

/// Completion handle for callback-shaped bodies
///
/// Only the first call counts; dropping it unused settles as an error.
pub struct Done<O> {
    tx: oneshot::Sender<Result<O>>,
}

impl<O> Done<O> {
    pub fn call(self, outcome: Result<O>) {
        // The receiver is gone only if the body was abandoned
        let _ = self.tx.send(outcome);
    }

    pub fn ok(self, value: O) {
        self.call(Ok(value));
    }

    pub fn err(self, error: Error) {
        self.call(Err(error));
    }
}

impl<I, O> Body<I, O>
where
    I: Send + 'static,
    O: Send + 'static,
{
    pub fn value<F>(f: F) -> Self
    where
        F: FnOnce(I) -> Result<O> + Send + 'static,
    {
        Body::Value(Box::new(f))
    }

    pub fn future<F, Fut>(f: F) -> Self
    where
        F: FnOnce(I) -> Fut + Send + 'static,
        Fut: Future<Output = Result<O>> + Send + 'static,
    {
        Body::Future(Box::new(move |input| f(input).boxed()))
    }

    pub fn callback<F>(f: F) -> Self
    where
        F: FnOnce(I, Done<O>) + Send + 'static,
    {
        Body::Callback(Box::new(f))
    }

    /// Run the body and wait for its outcome, whatever its shape
    pub async fn settle(self, input: I) -> Result<O> {
        match self {
            Body::Value(f) => f(input),
            Body::Future(f) => f(input).await,
            Body::Callback(f) => {
                let (tx, rx) = oneshot::channel();
                f(input, Done { tx });
                rx.await.map_err(|_| {
                    Error::Internal("callback dropped without reporting an outcome".to_string())
                })?
            }
        }
    }
}

/// Pipeline entry point: seed a context with `data` and settle `body` on it
pub async fn run(
    body: Body<ActionContext, ActionContext>,
    data: Option<Map<String, Value>>,
) -> Result<ActionContext> {
    debug!("Running action body");
    body.settle(ActionContext::with_data(data.unwrap_or_default()))
        .await
}
