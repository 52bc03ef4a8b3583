//! Plugin discovery — pluggable sources of `(name, plugin)` pairs.
//!
//! A [`PluginSource`] abstracts package-ecosystem discovery: given a
//! *group* label (the kernel's project name by default), it yields
//! entries to register. Discovered names are injected ahead of the
//! plugin's own opinion, so an entry named `"tool-a"` registers as
//! `"tool-a"` whatever the plugin reports.
//!
//! [`StaticSource`] is the in-memory implementation used by hosts that
//! assemble their plugin set at startup, and by tests.

use std::sync::Arc;

use crate::error::PlugmuxError;
use crate::plugin::Plugin;

/// One discovered plugin.
#[derive(Clone)]
pub struct SourceEntry {
    /// The discovery name; dominates the plugin's self-reported name.
    pub name: String,
    /// The plugin object.
    pub plugin: Arc<dyn Plugin>,
}

impl SourceEntry {
    /// Creates an entry.
    pub fn new(name: impl Into<String>, plugin: Arc<dyn Plugin>) -> Self {
        Self {
            name: name.into(),
            plugin,
        }
    }
}

/// A source of plugins for a group label.
pub trait PluginSource: Send + Sync {
    /// Returns the entries registered under `group`.
    ///
    /// An unknown group yields an empty list, not an error; errors are
    /// for sources that genuinely failed to enumerate.
    fn discover(&self, group: &str) -> Result<Vec<SourceEntry>, PlugmuxError>;
}

/// An in-memory plugin source.
///
/// # Example
///
/// ```
/// use plugmux::{PluginSource, StaticSource};
/// # use plugmux::{HookImpl, Plugin};
/// # use std::sync::Arc;
/// # struct P;
/// # impl Plugin for P {
/// #     fn hooks(&self) -> Vec<HookImpl> { vec![] }
/// # }
///
/// let source = StaticSource::new("my-project").with("tool-a", Arc::new(P));
/// assert_eq!(source.discover("my-project").unwrap().len(), 1);
/// assert!(source.discover("other-project").unwrap().is_empty());
/// ```
#[derive(Clone, Default)]
pub struct StaticSource {
    group: String,
    entries: Vec<SourceEntry>,
}

impl StaticSource {
    /// Creates an empty source for the given group.
    pub fn new(group: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            entries: Vec::new(),
        }
    }

    /// Adds an entry.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, plugin: Arc<dyn Plugin>) -> Self {
        self.entries.push(SourceEntry::new(name, plugin));
        self
    }
}

impl PluginSource for StaticSource {
    fn discover(&self, group: &str) -> Result<Vec<SourceEntry>, PlugmuxError> {
        if group == self.group {
            Ok(self.entries.clone())
        } else {
            Ok(Vec::new())
        }
    }
}
