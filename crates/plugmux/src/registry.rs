//! Plugin registry — insertion-ordered store with canonical ordering.
//!
//! Plugins live in a parallel structure: an insertion-ordered vector plus
//! a `name → position` index, so listings are stable and lookups cheap.
//! Entries are never removed, only disabled.
//!
//! # Canonical order
//!
//! For dispatch, wrappers sort ascending by `priority_key`, ties broken
//! by intra-batch registration sub-index (the sort is stable, so
//! registration order is preserved among equals). Lower keys execute
//! first; a negative declared priority runs before the defaults.

use std::collections::HashMap;

use crate::error::PlugmuxError;
use crate::plugin::{PluginEntry, PluginWrapper};
use crate::spec::HookSpec;

#[derive(Debug, Default)]
pub(crate) struct PluginRegistry {
    plugins: Vec<PluginWrapper>,
    index: HashMap<String, usize>,
    batch_counter: i64,
}

impl PluginRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Registers a batch of entries under one batch index.
    ///
    /// Every entry of the call shares the batch index; the position
    /// within the call is the sub-index. Re-registering a pointer-equal
    /// object is a no-op; a different object under a taken name fails.
    ///
    /// Implementations whose spec is already known are validated here;
    /// the rest are validated at first dispatch.
    pub(crate) fn register_batch(
        &mut self,
        entries: Vec<PluginEntry>,
        specs: &HashMap<String, HookSpec>,
    ) -> Result<(), PlugmuxError> {
        let batch_index = self.batch_counter;
        self.batch_counter += 1;

        for (sub_index, entry) in entries.into_iter().enumerate() {
            let wrapper = PluginWrapper::new(entry, batch_index, sub_index as i64)?;

            if let Some(&pos) = self.index.get(wrapper.name()) {
                if self.plugins[pos].same_object(wrapper.raw()) {
                    tracing::debug!(plugin = %wrapper.name(), "plugin already registered, skipping");
                    continue;
                }
                return Err(PlugmuxError::DuplicatePluginName(wrapper.name().to_string()));
            }

            for imp in wrapper.impls().values() {
                if let Some(spec) = specs.get(imp.hook()) {
                    if !spec.signature().matches(imp.signature()) {
                        return Err(PlugmuxError::SignatureMismatch {
                            hook: imp.hook().to_string(),
                            plugin: wrapper.name().to_string(),
                            expected: spec.signature().erased().to_vec(),
                            got: imp.signature().erased().to_vec(),
                        });
                    }
                }
            }

            tracing::debug!(
                plugin = %wrapper.name(),
                priority = ?wrapper.priority_key(),
                impls = wrapper.impls().len(),
                "registered plugin"
            );
            self.index.insert(wrapper.name().to_string(), self.plugins.len());
            self.plugins.push(wrapper);
        }

        Ok(())
    }

    pub(crate) fn get(&self, name: &str) -> Option<&PluginWrapper> {
        self.index.get(name).map(|&pos| &self.plugins[pos])
    }

    pub(crate) fn set_enabled(&mut self, name: &str, enabled: bool) -> Result<(), PlugmuxError> {
        let pos = *self
            .index
            .get(name)
            .ok_or_else(|| PlugmuxError::NoSuchPlugin(name.to_string()))?;
        self.plugins[pos].set_enabled(enabled);
        tracing::debug!(plugin = %name, enabled, "plugin state changed");
        Ok(())
    }

    pub(crate) fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// All wrappers in canonical execution order.
    pub(crate) fn ordered(&self) -> Vec<&PluginWrapper> {
        let mut ordered: Vec<&PluginWrapper> = self.plugins.iter().collect();
        ordered.sort_by_key(|w| (w.priority_key(), w.sub_index()));
        ordered
    }

    /// Snapshot of every plugin's enabled bit, in insertion order.
    pub(crate) fn enabled_state(&self) -> Vec<(String, bool)> {
        self.plugins
            .iter()
            .map(|w| (w.name().to_string(), w.is_enabled()))
            .collect()
    }

    /// Restores a previously captured enabled snapshot.
    ///
    /// Names registered after the snapshot keep their current state.
    pub(crate) fn restore_enabled(&mut self, saved: &[(String, bool)]) {
        for (name, enabled) in saved {
            if let Some(&pos) = self.index.get(name) {
                self.plugins[pos].set_enabled(*enabled);
            }
        }
    }

    /// Sets every plugin's enabled bit to membership in `names`.
    pub(crate) fn enable_only(&mut self, names: &[String]) -> Result<(), PlugmuxError> {
        for name in names {
            if !self.contains(name) {
                return Err(PlugmuxError::NoSuchPlugin(name.clone()));
            }
        }
        for wrapper in &mut self.plugins {
            let enabled = names.iter().any(|n| n == wrapper.name());
            wrapper.set_enabled(enabled);
        }
        Ok(())
    }

    pub(crate) fn len(&self) -> usize {
        self.plugins.len()
    }
}
