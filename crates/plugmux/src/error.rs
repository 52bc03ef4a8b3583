//! Error types for the dispatch kernel.
//!
//! Every failure the kernel can surface is a [`PlugmuxError`] variant.
//! Implementation failures wrap the underlying cause and are never
//! swallowed: a failing impl aborts the whole dispatch.
//!
//! # Error Code Convention
//!
//! All variants expose a stable machine-readable code via
//! [`PlugmuxError::code`]:
//!
//! | Error | Code | Recoverable |
//! |-------|------|-------------|
//! | `NoSuchPlugin` | `NO_SUCH_PLUGIN` | No |
//! | `DuplicatePluginName` | `DUPLICATE_PLUGIN_NAME` | No |
//! | `UnnamedPlugin` | `UNNAMED_PLUGIN` | No |
//! | `NoSuchHookSpec` | `NO_SUCH_HOOK_SPEC` | No |
//! | `DuplicateSpec` | `DUPLICATE_SPEC` | No |
//! | `SignatureMismatch` | `SIGNATURE_MISMATCH` | No |
//! | `HookRequired` | `HOOK_REQUIRED` | No |
//! | `ResultUnavailable` | `RESULT_UNAVAILABLE` | No |
//! | `ImplFailure` | `IMPL_FAILURE` | Yes |
//! | `AsyncSpec` | `ASYNC_SPEC` | No |
//! | `SyncSpec` | `SYNC_SPEC` | No |
//! | `ReducerMismatch` | `REDUCER_MISMATCH` | No |
//! | `InvalidScope` | `INVALID_SCOPE` | No |
//! | `UnknownStrategy` | `UNKNOWN_STRATEGY` | No |
//! | `LoadFailed` | `LOAD_FAILED` | Yes |

use thiserror::Error;

/// Boxed error type returned by hook implementations.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors surfaced by the plugin kernel.
#[derive(Debug, Error)]
pub enum PlugmuxError {
    /// No plugin with the given name is registered.
    #[error("no such plugin: {0}")]
    NoSuchPlugin(String),

    /// A different plugin object is already registered under this name.
    ///
    /// Re-registering the *same* object is a silent no-op.
    #[error("another plugin named '{0}' is already registered")]
    DuplicatePluginName(String),

    /// No name source produced a name for the plugin.
    ///
    /// A plugin needs an injected discovery name, a self-reported
    /// [`Plugin::name`](crate::Plugin::name), or a concrete type captured
    /// at registration.
    #[error("cannot resolve a name for plugin: {0}")]
    UnnamedPlugin(String),

    /// The hook has no registered specification.
    #[error("no such hook spec: {0}")]
    NoSuchHookSpec(String),

    /// A spec with this name is already registered.
    #[error("hook spec '{0}' is already defined")]
    DuplicateSpec(String),

    /// An implementation's parameter names diverge from the spec's.
    #[error(
        "signature of hook '{hook}' in plugin '{plugin}' differs from spec: \
         expected {expected:?}, got {got:?}"
    )]
    SignatureMismatch {
        /// Hook name.
        hook: String,
        /// Plugin carrying the offending implementation.
        plugin: String,
        /// Receiver-erased parameter names declared by the spec.
        expected: Vec<String>,
        /// Receiver-erased parameter names declared by the impl.
        got: Vec<String>,
    },

    /// A required hook was dispatched with no enabled implementation.
    #[error("hook '{0}' is required but no enabled plugin implements it")]
    HookRequired(String),

    /// The strategy demanded a result and none was produced.
    ///
    /// Use a `TRY_`-prefixed strategy to get `null` instead.
    #[error("no result available for hook '{0}'")]
    ResultUnavailable(String),

    /// A hook implementation returned an error.
    ///
    /// Aborts the dispatch immediately: no further impls run and no
    /// reducer is applied.
    #[error("implementation of hook '{hook}' in plugin '{plugin}' failed")]
    ImplFailure {
        /// Plugin whose impl failed.
        plugin: String,
        /// Hook being dispatched.
        hook: String,
        /// The underlying failure.
        #[source]
        source: BoxError,
    },

    /// A sync dispatch (`call`) was attempted on an async spec.
    #[error("hook '{0}' is async; dispatch it with `call_async`")]
    AsyncSpec(String),

    /// An async dispatch (`call_async`) was attempted on a sync spec.
    #[error("hook '{0}' is sync; dispatch it with `call`")]
    SyncSpec(String),

    /// A user reducer's sync/async kind does not match the spec's.
    #[error("reducer kind does not match sync/async kind of hook '{0}'")]
    ReducerMismatch(String),

    /// A scope selector mixed bare and `+`/`-` prefixed names.
    #[error("invalid scope selector: {0}")]
    InvalidScope(String),

    /// A strategy name did not parse.
    #[error("unknown result strategy: {0}")]
    UnknownStrategy(String),

    /// A plugin source failed during discovery.
    #[error("plugin discovery failed: {0}")]
    LoadFailed(String),
}

impl PlugmuxError {
    /// Returns a stable machine-readable error code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::NoSuchPlugin(_) => "NO_SUCH_PLUGIN",
            Self::DuplicatePluginName(_) => "DUPLICATE_PLUGIN_NAME",
            Self::UnnamedPlugin(_) => "UNNAMED_PLUGIN",
            Self::NoSuchHookSpec(_) => "NO_SUCH_HOOK_SPEC",
            Self::DuplicateSpec(_) => "DUPLICATE_SPEC",
            Self::SignatureMismatch { .. } => "SIGNATURE_MISMATCH",
            Self::HookRequired(_) => "HOOK_REQUIRED",
            Self::ResultUnavailable(_) => "RESULT_UNAVAILABLE",
            Self::ImplFailure { .. } => "IMPL_FAILURE",
            Self::AsyncSpec(_) => "ASYNC_SPEC",
            Self::SyncSpec(_) => "SYNC_SPEC",
            Self::ReducerMismatch(_) => "REDUCER_MISMATCH",
            Self::InvalidScope(_) => "INVALID_SCOPE",
            Self::UnknownStrategy(_) => "UNKNOWN_STRATEGY",
            Self::LoadFailed(_) => "LOAD_FAILED",
        }
    }

    /// Returns whether retrying the operation may succeed.
    ///
    /// Only transient conditions qualify: a failing implementation and a
    /// failing discovery source. Everything else is a host or plugin bug
    /// that will not change on retry.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::ImplFailure { .. } | Self::LoadFailed(_))
    }
}
