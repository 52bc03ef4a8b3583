//! Test utilities for the dispatch kernel.
//!
//! Provides [`MockPlugin`]: a builder over canned hook implementations
//! with per-hook invocation counters.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde_json::Value;

use crate::hook::HookImpl;
use crate::plugin::Plugin;
use crate::signature::Signature;

/// A mock plugin for tests.
///
/// Each `returning*` hook gets an [`AtomicUsize`] counter incremented on
/// every invocation, so tests can observe short-circuiting and skipped
/// implementations.
///
/// # Example
///
/// ```
/// # #[cfg(feature = "test-utils")] {
/// use plugmux::testing::MockPlugin;
/// use plugmux::Signature;
/// use serde_json::json;
///
/// let plugin = MockPlugin::new("p").returning("h", Signature::new(["a"]), json!(1));
/// assert_eq!(plugin.calls("h"), 0);
/// # }
/// ```
pub struct MockPlugin {
    name: String,
    priority: Option<i64>,
    version: Option<String>,
    hooks: Vec<HookImpl>,
    counters: HashMap<String, Arc<AtomicUsize>>,
}

impl MockPlugin {
    /// Creates a mock with no hooks.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            priority: None,
            version: None,
            hooks: Vec::new(),
            counters: HashMap::new(),
        }
    }

    /// Sets the declared priority.
    #[must_use]
    pub fn with_priority(mut self, priority: i64) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Sets the reported version.
    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Adds a sync implementation returning a fixed value.
    #[must_use]
    pub fn returning(mut self, hook: &str, signature: Signature, value: Value) -> Self {
        let counter = self.counter_for(hook);
        self.hooks.push(HookImpl::new(hook, signature, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(value.clone())
        }));
        self
    }

    /// Adds an async implementation returning a fixed value.
    #[must_use]
    pub fn returning_async(mut self, hook: &str, signature: Signature, value: Value) -> Self {
        let counter = self.counter_for(hook);
        self.hooks
            .push(HookImpl::new_async(hook, signature, move |_| {
                let counter = counter.clone();
                let value = value.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(value)
                }
            }));
        self
    }

    /// Adds a sync implementation that always fails.
    #[must_use]
    pub fn failing(mut self, hook: &str, signature: Signature, message: &str) -> Self {
        let counter = self.counter_for(hook);
        let message = message.to_string();
        self.hooks.push(HookImpl::new(hook, signature, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(message.clone().into())
        }));
        self
    }

    /// Adds a custom implementation (no counter attached).
    #[must_use]
    pub fn with_hook(mut self, imp: HookImpl) -> Self {
        self.hooks.push(imp);
        self
    }

    /// Number of times the named hook's canned impl has run.
    #[must_use]
    pub fn calls(&self, hook: &str) -> usize {
        self.counters
            .get(hook)
            .map_or(0, |c| c.load(Ordering::SeqCst))
    }

    /// Shared counter for the named hook, for use after the plugin has
    /// been moved into a kernel.
    #[must_use]
    pub fn counter(&self, hook: &str) -> Arc<AtomicUsize> {
        self.counters.get(hook).cloned().unwrap_or_default()
    }

    fn counter_for(&mut self, hook: &str) -> Arc<AtomicUsize> {
        self.counters
            .entry(hook.to_string())
            .or_insert_with(|| Arc::new(AtomicUsize::new(0)))
            .clone()
    }
}

impl Plugin for MockPlugin {
    fn name(&self) -> Option<&str> {
        Some(&self.name)
    }

    fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    fn priority(&self) -> Option<i64> {
        self.priority
    }

    fn hooks(&self) -> Vec<HookImpl> {
        self.hooks.clone()
    }
}
