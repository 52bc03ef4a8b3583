//! Plugin dispatch kernel for host applications.
//!
//! plugmux lets a host declare named extension points ("hook specs") and
//! lets third parties register implementations ("hook impls"), directly
//! or through a discovery source. At call time the kernel selects the
//! eligible implementations, orders them deterministically, invokes each
//! with validated arguments, and folds the results through a named
//! collection strategy.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Host Surface                            │
//! ├─────────────────────────────────────────────────────────────┤
//! │  kernel()     : per-project singleton lookup                │
//! │  Kernel       : specs, registration, call / call_async      │
//! └─────────────────────────────────────────────────────────────┘
//!                               ↓
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Dispatch Core                           │
//! ├─────────────────────────────────────────────────────────────┤
//! │  PluginRegistry : ordered store, enable/disable, scoped     │
//! │  dispatch       : canonical order, sync↔async bridging      │
//! │  Collect        : Scope × Reduce × OnEmpty strategies       │
//! └─────────────────────────────────────────────────────────────┘
//!                               ↓
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Plugin Surface                          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Plugin       : trait plugins implement                     │
//! │  HookImpl     : one marked implementation                   │
//! │  PluginSource : package-ecosystem discovery                 │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Core Concepts
//!
//! ## Specs and impls
//!
//! A [`HookSpec`] declares a hook once: its [`Signature`], sync/async
//! mode, whether it is required, and its result [`Strategy`]. Plugins
//! carry [`HookImpl`]s; each is validated against the spec's signature.
//! An impl registered before its spec is inert until the spec arrives.
//!
//! ## Canonical order
//!
//! Plugins execute in ascending `priority_key` order: a self-reported
//! priority dominates, otherwise registration batch order. Negative
//! priorities run before the defaults. The key is snapshotted at
//! registration and never re-read.
//!
//! ## Result strategies
//!
//! The named strategies form a `Scope × Reduce × OnEmpty` product — see
//! [`Collect`]. `TRY_`-prefixed forms produce `null` where the base
//! forms fail with `ResultUnavailable`. A user [`Reducer`] instead
//! receives the ordered calls unexecuted and owns execution.
//!
//! ## Sync and async
//!
//! Sync specs dispatch through [`Kernel::call`], async specs through
//! [`Kernel::call_async`]. Either kind of impl works under either kind
//! of spec: async impls under a sync spec block on a kernel-owned
//! runtime; sync impls under an async spec are wrapped into resolved
//! futures and (by default) emit a diagnostic. Execution is strictly
//! sequential in canonical order, with no concurrent fan-out.
//!
//! # Example
//!
//! ```
//! use plugmux::{kernel, CallArgs, Collect, HookImpl, HookSpec, Plugin, Signature};
//! use serde_json::json;
//!
//! struct Doubler;
//!
//! impl Plugin for Doubler {
//!     fn name(&self) -> Option<&str> {
//!         Some("doubler")
//!     }
//!
//!     fn hooks(&self) -> Vec<HookImpl> {
//!         vec![HookImpl::new("transform", Signature::new(["value"]), |args| {
//!             let v = args.args()[0].as_i64().unwrap_or(0);
//!             Ok(json!(v * 2))
//!         })]
//!     }
//! }
//!
//! let kernel = kernel("readme-example");
//! kernel
//!     .add_spec(HookSpec::new("transform", Signature::new(["value"])).with_strategy(Collect::ALL))
//!     .unwrap();
//! kernel.register(Doubler).unwrap();
//!
//! let out = kernel.call("transform", CallArgs::new().arg(21)).unwrap();
//! assert_eq!(out, json!([42]));
//! ```

mod args;
mod diag;
mod dispatch;
mod error;
mod hook;
mod kernel;
mod plugin;
mod registry;
mod scoped;
mod signature;
mod source;
mod spec;
mod strategy;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use args::{CallArgs, TARGET_PLUGIN_KWARG};
pub use diag::{Diagnostic, DiagnosticKind, Diagnostics, MemoryDiagnostics, TracingDiagnostics};
pub use error::{BoxError, PlugmuxError};
pub use hook::{HookCallable, HookFuture, HookImpl, PendingCall};
pub use kernel::{anonymous_kernel, kernel, Kernel};
pub use plugin::{Plugin, PluginEntry, PluginInfo};
pub use scoped::{ScopeOp, ScopeSelector, ScopedPlugins};
pub use signature::{Signature, RECEIVER_PARAM};
pub use source::{PluginSource, SourceEntry, StaticSource};
pub use spec::HookSpec;
pub use strategy::{AsyncReducer, Collect, OnEmpty, Reduce, Reducer, Scope, Strategy};
