//! Dispatch arguments — positional and keyword values.
//!
//! A [`CallArgs`] carries the arguments of one hook dispatch: an ordered
//! positional list and a keyword map, both over [`serde_json::Value`].
//!
//! The reserved keyword [`TARGET_PLUGIN_KWARG`] routes `SINGLE`-family
//! strategies to a specific plugin. It is stripped before implementations
//! see the keyword map, and is a silent no-op for other strategies.

use serde_json::{Map, Value};

/// Reserved keyword selecting a plugin for `SINGLE`-family strategies.
pub const TARGET_PLUGIN_KWARG: &str = "__plugin";

/// Arguments for one hook dispatch.
///
/// # Example
///
/// ```
/// use plugmux::CallArgs;
/// use serde_json::json;
///
/// let args = CallArgs::new()
///     .arg(1)
///     .arg("two")
///     .kwarg("flag", true);
///
/// assert_eq!(args.args(), &[json!(1), json!("two")]);
/// assert_eq!(args.kwarg_value("flag"), Some(&json!(true)));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallArgs {
    positional: Vec<Value>,
    keyword: Map<String, Value>,
}

impl CallArgs {
    /// Creates an empty argument set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an argument set from positional values.
    pub fn positional<I>(args: I) -> Self
    where
        I: IntoIterator<Item = Value>,
    {
        Self {
            positional: args.into_iter().collect(),
            keyword: Map::new(),
        }
    }

    /// Appends a positional argument.
    #[must_use]
    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.positional.push(value.into());
        self
    }

    /// Sets a keyword argument.
    #[must_use]
    pub fn kwarg(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.keyword.insert(key.into(), value.into());
        self
    }

    /// Routes a `SINGLE`-family dispatch to the named plugin.
    ///
    /// Shorthand for setting [`TARGET_PLUGIN_KWARG`].
    #[must_use]
    pub fn target(self, plugin: impl Into<String>) -> Self {
        self.kwarg(TARGET_PLUGIN_KWARG, Value::String(plugin.into()))
    }

    /// The positional arguments, in order.
    #[must_use]
    pub fn args(&self) -> &[Value] {
        &self.positional
    }

    /// The keyword arguments.
    #[must_use]
    pub fn kwargs(&self) -> &Map<String, Value> {
        &self.keyword
    }

    /// Positional argument by index.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.positional.get(index)
    }

    /// Keyword argument by name.
    #[must_use]
    pub fn kwarg_value(&self, key: &str) -> Option<&Value> {
        self.keyword.get(key)
    }

    /// Number of positional arguments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.positional.len()
    }

    /// Returns `true` when there are no positional or keyword arguments.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.positional.is_empty() && self.keyword.is_empty()
    }

    /// Removes and returns the routing target, if any.
    ///
    /// Non-string values under the reserved keyword are dropped.
    pub(crate) fn take_target(&mut self) -> Option<String> {
        self.keyword
            .remove(TARGET_PLUGIN_KWARG)
            .and_then(|v| v.as_str().map(ToOwned::to_owned))
    }

    /// Discards the leading positional argument (a caller-supplied receiver).
    pub(crate) fn drop_leading(&mut self) {
        if !self.positional.is_empty() {
            self.positional.remove(0);
        }
    }

    /// Injects `null` in the receiver slot.
    pub(crate) fn push_receiver(&mut self) {
        self.positional.insert(0, Value::Null);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn builder_collects_in_order() {
        let args = CallArgs::new().arg(1).arg(2).kwarg("k", "v");
        assert_eq!(args.args(), &[json!(1), json!(2)]);
        assert_eq!(args.kwarg_value("k"), Some(&json!("v")));
        assert_eq!(args.len(), 2);
        assert!(!args.is_empty());
    }

    #[test]
    fn positional_constructor() {
        let args = CallArgs::positional([json!("a"), json!(null)]);
        assert_eq!(args.get(0), Some(&json!("a")));
        assert_eq!(args.get(1), Some(&json!(null)));
        assert_eq!(args.get(2), None);
    }

    #[test]
    fn target_sets_reserved_kwarg() {
        let mut args = CallArgs::new().target("plugin-b");
        assert_eq!(
            args.kwarg_value(TARGET_PLUGIN_KWARG),
            Some(&json!("plugin-b"))
        );
        assert_eq!(args.take_target(), Some("plugin-b".into()));
        // Stripped after consumption.
        assert_eq!(args.kwarg_value(TARGET_PLUGIN_KWARG), None);
    }

    #[test]
    fn non_string_target_is_dropped() {
        let mut args = CallArgs::new().kwarg(TARGET_PLUGIN_KWARG, 42);
        assert_eq!(args.take_target(), None);
        assert_eq!(args.kwarg_value(TARGET_PLUGIN_KWARG), None);
    }

    #[test]
    fn receiver_injection_and_discard() {
        let mut args = CallArgs::new().arg(1);
        args.push_receiver();
        assert_eq!(args.args(), &[json!(null), json!(1)]);

        args.drop_leading();
        assert_eq!(args.args(), &[json!(1)]);
    }

    #[test]
    fn empty_args() {
        let args = CallArgs::new();
        assert!(args.is_empty());
        assert_eq!(args.len(), 0);
    }
}
