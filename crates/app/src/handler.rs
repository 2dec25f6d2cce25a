//! Application-supplied handlers for reads, writes and action invocations.
//!
//! A [`Handler`] is a capability: a shared function value that the runtime
//! calls through a single entry point, [`Handler::call`]. Whatever state the
//! handler needs (its "receiver") is captured by the closure.
//!
//! Handlers may complete synchronously or asynchronously. Either way they
//! produce a [`HandlerOutput`], a single-level deferred result: an
//! asynchronous handler's future always resolves to a plain value, never to
//! another future, so callers await exactly once.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde_json::Value;

/// Outcome of a handler once it has completed.
pub type HandlerResult = anyhow::Result<Value>;

/// A pending handler outcome.
pub type HandlerFuture = Pin<Box<dyn Future<Output = HandlerResult> + Send + 'static>>;

/// What a handler returns when called.
pub enum HandlerOutput {
    /// The handler completed synchronously.
    Ready(HandlerResult),
    /// The handler completes later.
    Deferred(HandlerFuture),
}

impl HandlerOutput {
    /// Wait for the handler's outcome.
    ///
    /// # Errors
    ///
    /// Returns the handler's own error, unchanged.
    pub async fn resolve(self) -> HandlerResult {
        match self {
            Self::Ready(result) => result,
            Self::Deferred(future) => future.await,
        }
    }
}

impl From<HandlerResult> for HandlerOutput {
    fn from(result: HandlerResult) -> Self {
        Self::Ready(result)
    }
}

impl fmt::Debug for HandlerOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ready(result) => f.debug_tuple("Ready").field(result).finish(),
            Self::Deferred(_) => f.write_str("Deferred(..)"),
        }
    }
}

/// A shared handler taking an argument of type `A`.
pub struct Handler<A> {
    call: Arc<dyn Fn(A) -> HandlerOutput + Send + Sync>,
}

/// Produces a property's value on read.
pub type ReadHandler = Handler<()>;

/// Receives a property's new value on write; its result becomes the cached value.
pub type WriteHandler = Handler<Value>;

/// Runs an action with its optional input parameter.
pub type ActionHandler = Handler<Option<Value>>;

impl<A: 'static> Handler<A> {
    /// Wrap a synchronous function.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(A) -> HandlerResult + Send + Sync + 'static,
    {
        Self {
            call: Arc::new(move |arg| HandlerOutput::Ready(f(arg))),
        }
    }

    /// Wrap an asynchronous function.
    ///
    /// The returned future is awaited by the runtime; its output is used as
    /// the handler's result.
    pub fn new_async<F, Fut>(f: F) -> Self
    where
        F: Fn(A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        Self {
            call: Arc::new(move |arg| HandlerOutput::Deferred(Box::pin(f(arg)))),
        }
    }

    /// Wrap a function that decides per call whether to complete now or later.
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(A) -> HandlerOutput + Send + Sync + 'static,
    {
        Self { call: Arc::new(f) }
    }

    /// Invoke the handler.
    pub fn call(&self, arg: A) -> HandlerOutput {
        (self.call)(arg)
    }
}

impl<A> Clone for Handler<A> {
    fn clone(&self) -> Self {
        Self {
            call: Arc::clone(&self.call),
        }
    }
}

impl<A> fmt::Debug for Handler<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Handler(..)")
    }
}
