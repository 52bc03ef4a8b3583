//! Hook implementations — marked callables and their invocation.
//!
//! A [`HookImpl`] packages one implementation of a hook: the hook name it
//! targets, its declared [`Signature`], and the callable itself. Creating
//! one is passive: it binds to a plugin only when that plugin is
//! registered and the kernel collects its implementations.
//!
//! A [`PendingCall`] is one not-yet-executed invocation: the plugin name,
//! the callable, and the fully prepared arguments. The dispatcher builds
//! the canonical list of pending calls and either executes them itself or
//! hands them, unexecuted, to a user reducer.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde_json::Value;

use crate::args::CallArgs;
use crate::error::{BoxError, PlugmuxError};
use crate::signature::Signature;

/// Boxed future returned by async hook implementations.
pub type HookFuture = Pin<Box<dyn Future<Output = Result<Value, BoxError>> + Send>>;

/// The stored callable of a hook implementation.
#[derive(Clone)]
pub enum HookCallable {
    /// A synchronous implementation.
    Sync(Arc<dyn Fn(CallArgs) -> Result<Value, BoxError> + Send + Sync>),
    /// An asynchronous implementation.
    Async(Arc<dyn Fn(CallArgs) -> HookFuture + Send + Sync>),
}

impl HookCallable {
    /// Returns `true` for async callables.
    #[must_use]
    pub fn is_async(&self) -> bool {
        matches!(self, Self::Async(_))
    }
}

impl fmt::Debug for HookCallable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sync(_) => f.write_str("HookCallable::Sync"),
            Self::Async(_) => f.write_str("HookCallable::Async"),
        }
    }
}

/// One implementation of a hook.
///
/// # Example
///
/// ```
/// use plugmux::{HookImpl, Signature};
/// use serde_json::json;
///
/// let imp = HookImpl::new("greet", Signature::new(["who"]), |args| {
///     let who = args.args()[0].as_str().unwrap_or("world");
///     Ok(json!(format!("hello {who}")))
/// });
/// assert_eq!(imp.hook(), "greet");
/// assert!(!imp.is_async());
/// ```
#[derive(Debug, Clone)]
pub struct HookImpl {
    hook: String,
    signature: Signature,
    callable: HookCallable,
}

impl HookImpl {
    /// Creates a synchronous implementation of the named hook.
    pub fn new<F>(hook: impl Into<String>, signature: Signature, call: F) -> Self
    where
        F: Fn(CallArgs) -> Result<Value, BoxError> + Send + Sync + 'static,
    {
        Self {
            hook: hook.into(),
            signature,
            callable: HookCallable::Sync(Arc::new(call)),
        }
    }

    /// Creates an asynchronous implementation of the named hook.
    pub fn new_async<F, Fut>(hook: impl Into<String>, signature: Signature, call: F) -> Self
    where
        F: Fn(CallArgs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, BoxError>> + Send + 'static,
    {
        Self {
            hook: hook.into(),
            signature,
            callable: HookCallable::Async(Arc::new(move |args| Box::pin(call(args)))),
        }
    }

    /// The hook this implements.
    #[must_use]
    pub fn hook(&self) -> &str {
        &self.hook
    }

    /// The declared parameter names.
    #[must_use]
    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// Returns `true` for async implementations.
    #[must_use]
    pub fn is_async(&self) -> bool {
        self.callable.is_async()
    }

    pub(crate) fn callable(&self) -> &HookCallable {
        &self.callable
    }
}

/// A prepared, not-yet-executed invocation of one implementation.
///
/// User reducers receive the canonical dispatch list as pending calls and
/// own execution: they may invoke, reorder, or skip them freely.
#[derive(Debug, Clone)]
pub struct PendingCall {
    plugin: String,
    hook: String,
    callable: HookCallable,
    args: CallArgs,
}

impl PendingCall {
    pub(crate) fn new(
        plugin: impl Into<String>,
        hook: impl Into<String>,
        callable: HookCallable,
        args: CallArgs,
    ) -> Self {
        Self {
            plugin: plugin.into(),
            hook: hook.into(),
            callable,
            args,
        }
    }

    /// Name of the plugin that owns the implementation.
    #[must_use]
    pub fn plugin(&self) -> &str {
        &self.plugin
    }

    /// Hook being dispatched.
    #[must_use]
    pub fn hook(&self) -> &str {
        &self.hook
    }

    /// The prepared arguments (receiver injected, routing key stripped).
    #[must_use]
    pub fn args(&self) -> &CallArgs {
        &self.args
    }

    /// Returns `true` when the underlying implementation is async.
    #[must_use]
    pub fn is_async(&self) -> bool {
        self.callable.is_async()
    }

    /// Executes the implementation synchronously.
    ///
    /// An async implementation is awaited on a fresh current-thread
    /// runtime, blocking the caller. This direction is supported but
    /// discouraged, and must not be used from inside an async context
    /// (the runtime will refuse to block there).
    pub fn invoke(&self) -> Result<Value, PlugmuxError> {
        match &self.callable {
            HookCallable::Sync(call) => call(self.args.clone()).map_err(|e| self.failure(e)),
            HookCallable::Async(call) => {
                let fut = call(self.args.clone());
                let runtime = tokio::runtime::Builder::new_current_thread()
                    .enable_time()
                    .build()
                    .map_err(|e| self.failure(Box::new(e)))?;
                runtime.block_on(fut).map_err(|e| self.failure(e))
            }
        }
    }

    /// Executes the implementation in an async dispatch.
    ///
    /// A sync implementation is called directly; its value is already
    /// resolved when this future completes.
    pub async fn invoke_async(&self) -> Result<Value, PlugmuxError> {
        match &self.callable {
            HookCallable::Sync(call) => call(self.args.clone()).map_err(|e| self.failure(e)),
            HookCallable::Async(call) => {
                call(self.args.clone()).await.map_err(|e| self.failure(e))
            }
        }
    }

    fn failure(&self, source: BoxError) -> PlugmuxError {
        PlugmuxError::ImplFailure {
            plugin: self.plugin.clone(),
            hook: self.hook.clone(),
            source,
        }
    }
}
