//! Diagnostics — non-fatal conditions reported through a pluggable sink.
//!
//! Only two conditions are diagnostics rather than errors:
//!
//! - [`DiagnosticKind::SyncImplOnAsyncSpec`] — a synchronous implementation
//!   was invoked under an async spec (emitted once per hook/plugin pair,
//!   and only when the spec enables the warning).
//! - [`DiagnosticKind::SingleWithoutTarget`] — a `SINGLE` dispatch had more
//!   than one eligible implementation and no routing key; the last one ran.
//!
//! Everything else is a [`PlugmuxError`](crate::PlugmuxError).
//!
//! The default sink, [`TracingDiagnostics`], forwards to `tracing::warn!`.
//! [`MemoryDiagnostics`] captures entries for inspection in tests or hosts
//! that want to surface them in their own UI.

use std::fmt;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// The kind of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiagnosticKind {
    /// A sync implementation was invoked under an async spec.
    SyncImplOnAsyncSpec,
    /// A `SINGLE` dispatch fell back to the last impl with no routing key.
    SingleWithoutTarget,
}

impl DiagnosticKind {
    /// The wire spelling of this kind.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SyncImplOnAsyncSpec => "sync-impl-on-async-spec",
            Self::SingleWithoutTarget => "single-without-target",
        }
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One emitted diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// What happened.
    pub kind: DiagnosticKind,
    /// Human-readable description.
    pub message: String,
    /// Hook being dispatched when the condition arose.
    pub hook: String,
    /// Plugin involved, when one is identifiable.
    pub plugin: Option<String>,
}

/// A sink receiving kernel diagnostics.
pub trait Diagnostics: Send + Sync {
    /// Delivers one diagnostic.
    fn emit(&self, diagnostic: Diagnostic);
}

/// Default sink: forwards diagnostics to `tracing::warn!`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingDiagnostics;

impl Diagnostics for TracingDiagnostics {
    fn emit(&self, diagnostic: Diagnostic) {
        tracing::warn!(
            kind = diagnostic.kind.as_str(),
            hook = %diagnostic.hook,
            plugin = diagnostic.plugin.as_deref().unwrap_or("-"),
            "{}",
            diagnostic.message
        );
    }
}

/// Capturing sink: stores every diagnostic for later inspection.
#[derive(Debug, Default)]
pub struct MemoryDiagnostics {
    entries: Mutex<Vec<Diagnostic>>,
}

impl MemoryDiagnostics {
    /// Creates an empty capture sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A snapshot of everything emitted so far.
    #[must_use]
    pub fn entries(&self) -> Vec<Diagnostic> {
        self.entries.lock().clone()
    }

    /// Number of diagnostics of the given kind.
    #[must_use]
    pub fn count_of(&self, kind: DiagnosticKind) -> usize {
        self.entries.lock().iter().filter(|d| d.kind == kind).count()
    }

    /// Total number of diagnostics captured.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Returns `true` when nothing has been emitted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl Diagnostics for MemoryDiagnostics {
    fn emit(&self, diagnostic: Diagnostic) {
        self.entries.lock().push(diagnostic);
    }
}
