//! Hook specifications — the declaration of an extension point.
//!
//! A [`HookSpec`] is registered exactly once per kernel and is the
//! canonical reference for every implementation of that hook: the
//! signature impls are validated against, the sync/async dispatch mode,
//! and the result strategy.

use crate::signature::Signature;
use crate::strategy::{Collect, Strategy};

/// The declaration of one hook.
///
/// Defaults mirror the common case: synchronous, optional, strategy
/// `ALL_AVAILS`, and (for async specs) warning when a sync implementation
/// is invoked.
///
/// # Example
///
/// ```
/// use plugmux::{Collect, HookSpec, Signature};
///
/// let spec = HookSpec::new("on_init", Signature::new(["self", "arg"]))
///     .required()
///     .with_strategy(Collect::FIRST_AVAIL);
/// assert!(spec.is_required());
/// assert!(!spec.is_async());
/// ```
#[derive(Debug, Clone)]
pub struct HookSpec {
    name: String,
    signature: Signature,
    is_async: bool,
    required: bool,
    warn_sync_impl: bool,
    strategy: Strategy,
}

impl HookSpec {
    /// Declares a synchronous hook.
    pub fn new(name: impl Into<String>, signature: Signature) -> Self {
        Self {
            name: name.into(),
            signature,
            is_async: false,
            required: false,
            warn_sync_impl: true,
            strategy: Strategy::Collect(Collect::ALL_AVAILS),
        }
    }

    /// Declares an asynchronous hook.
    ///
    /// Implementations may still be synchronous; their values are wrapped
    /// into resolved futures at dispatch, and the
    /// `sync-impl-on-async-spec` diagnostic fires unless silenced with
    /// [`warn_sync_impl(false)`](Self::warn_sync_impl).
    pub fn new_async(name: impl Into<String>, signature: Signature) -> Self {
        Self {
            is_async: true,
            ..Self::new(name, signature)
        }
    }

    /// Requires at least one enabled implementation at dispatch time.
    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Sets the result strategy.
    #[must_use]
    pub fn with_strategy(mut self, strategy: impl Into<Strategy>) -> Self {
        self.strategy = strategy.into();
        self
    }

    /// Controls the `sync-impl-on-async-spec` diagnostic. Default: on.
    #[must_use]
    pub fn warn_sync_impl(mut self, warn: bool) -> Self {
        self.warn_sync_impl = warn;
        self
    }

    /// The hook name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The canonical signature.
    #[must_use]
    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// Returns `true` for async hooks.
    #[must_use]
    pub fn is_async(&self) -> bool {
        self.is_async
    }

    /// Returns `true` when an implementation must exist at dispatch.
    #[must_use]
    pub fn is_required(&self) -> bool {
        self.required
    }

    /// Returns `true` when sync impls under this async spec warn.
    #[must_use]
    pub fn warns_on_sync_impl(&self) -> bool {
        self.is_async && self.warn_sync_impl
    }

    /// The result strategy.
    #[must_use]
    pub fn strategy(&self) -> &Strategy {
        &self.strategy
    }
}
