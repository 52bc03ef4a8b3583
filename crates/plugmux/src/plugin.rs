//! Plugins — registered objects carrying hook implementations.
//!
//! Anything implementing [`Plugin`] can register with a kernel. The
//! trait's accessors replace the dynamic attribute probing of looser
//! systems: a plugin *may* report a name, a version, and a priority; the
//! kernel resolves what it can and fills in the rest.
//!
//! # Name resolution
//!
//! First non-null source wins:
//!
//! 1. The injected discovery name ([`PluginEntry::named`]) — reserved for
//!    entries found through a [`PluginSource`](crate::PluginSource), which
//!    must override the plugin's own opinion.
//! 2. [`Plugin::name`].
//! 3. The lowercased tail of the concrete type name captured by
//!    [`PluginEntry::of`].
//!
//! A plugin with no resolvable name is rejected with
//! [`PlugmuxError::UnnamedPlugin`].

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;

use crate::error::PlugmuxError;
use crate::hook::HookImpl;

/// A registered extension object.
///
/// # Example
///
/// ```
/// use plugmux::{HookImpl, Plugin, Signature};
/// use serde_json::json;
///
/// struct Greeter;
///
/// impl Plugin for Greeter {
///     fn name(&self) -> Option<&str> {
///         Some("greeter")
///     }
///
///     fn hooks(&self) -> Vec<HookImpl> {
///         vec![HookImpl::new("greet", Signature::new(["who"]), |args| {
///             Ok(json!(format!("hi {}", args.args()[0])))
///         })]
///     }
/// }
/// ```
pub trait Plugin: Send + Sync {
    /// Self-reported plugin name, lowercase recommended.
    fn name(&self) -> Option<&str> {
        None
    }

    /// Self-reported version.
    fn version(&self) -> Option<&str> {
        None
    }

    /// Declared priority. Lower runs earlier; negative runs before the
    /// defaults. Read once at registration and never again.
    fn priority(&self) -> Option<i64> {
        None
    }

    /// The hook implementations this plugin carries.
    ///
    /// Called once at registration. Implementations whose hook has no
    /// spec yet are inert until the spec is registered.
    fn hooks(&self) -> Vec<HookImpl>;
}

/// One item of a registration batch.
///
/// Wraps the plugin object together with the optional injected discovery
/// name and the concrete type name (when known), which feed name
/// resolution.
#[derive(Clone)]
pub struct PluginEntry {
    plugin: Arc<dyn Plugin>,
    injected_name: Option<String>,
    type_name: Option<&'static str>,
}

impl PluginEntry {
    /// Wraps a concrete plugin, capturing its type name as a fallback
    /// name source.
    pub fn of<P: Plugin + 'static>(plugin: P) -> Self {
        Self {
            plugin: Arc::new(plugin),
            injected_name: None,
            type_name: Some(std::any::type_name::<P>()),
        }
    }

    /// Wraps an already type-erased plugin. No type-name fallback.
    pub fn from_arc(plugin: Arc<dyn Plugin>) -> Self {
        Self {
            plugin,
            injected_name: None,
            type_name: None,
        }
    }

    /// Injects a discovery name, which dominates every other source.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.injected_name = Some(name.into());
        self
    }

    pub(crate) fn resolve_name(&self) -> Result<String, PlugmuxError> {
        if let Some(name) = &self.injected_name {
            return Ok(name.clone());
        }
        if let Some(name) = self.plugin.name() {
            return Ok(name.to_string());
        }
        if let Some(type_name) = self.type_name {
            return Ok(type_tail(type_name).to_lowercase());
        }
        Err(PlugmuxError::UnnamedPlugin(
            "no injected name, no self-reported name, no captured type".into(),
        ))
    }

    pub(crate) fn into_raw(self) -> Arc<dyn Plugin> {
        self.plugin
    }
}

/// Last path segment of a fully qualified type name.
fn type_tail(full: &str) -> &str {
    full.rsplit("::").next().unwrap_or(full)
}

impl std::fmt::Debug for dyn Plugin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<plugin {}>", self.name().unwrap_or("?"))
    }
}

/// A registered plugin with its resolved dispatch metadata.
#[derive(Debug, Clone)]
pub(crate) struct PluginWrapper {
    name: String,
    raw: Arc<dyn Plugin>,
    enabled: bool,
    priority_key: (i64, i64),
    sub_index: i64,
    impls: HashMap<String, HookImpl>,
}

impl PluginWrapper {
    /// Builds a wrapper, resolving the name and snapshotting the
    /// priority key.
    ///
    /// `batch_index` is shared by every entry of one `register` call;
    /// `sub_index` is the entry's position within that call.
    pub(crate) fn new(
        entry: PluginEntry,
        batch_index: i64,
        sub_index: i64,
    ) -> Result<Self, PlugmuxError> {
        let name = entry.resolve_name()?;
        let raw = entry.into_raw();
        let priority_key = match raw.priority() {
            Some(declared) => (declared, batch_index),
            None => (batch_index, sub_index),
        };
        let impls = raw
            .hooks()
            .into_iter()
            .map(|imp| (imp.hook().to_string(), imp))
            .collect();
        Ok(Self {
            name,
            raw,
            enabled: true,
            priority_key,
            sub_index,
            impls,
        })
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn raw(&self) -> &Arc<dyn Plugin> {
        &self.raw
    }

    pub(crate) fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub(crate) fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub(crate) fn priority_key(&self) -> (i64, i64) {
        self.priority_key
    }

    pub(crate) fn sub_index(&self) -> i64 {
        self.sub_index
    }

    pub(crate) fn impl_for(&self, hook: &str) -> Option<&HookImpl> {
        self.impls.get(hook)
    }

    pub(crate) fn impls(&self) -> &HashMap<String, HookImpl> {
        &self.impls
    }

    /// Pointer identity with a candidate raw object.
    pub(crate) fn same_object(&self, other: &Arc<dyn Plugin>) -> bool {
        Arc::ptr_eq(&self.raw, other)
    }

    pub(crate) fn info(&self) -> PluginInfo {
        let mut hooks: Vec<String> = self.impls.keys().cloned().collect();
        hooks.sort();
        PluginInfo {
            name: self.name.clone(),
            enabled: self.enabled,
            priority_key: self.priority_key,
            version: self.raw.version().map(ToOwned::to_owned),
            hooks,
        }
    }
}

/// A read-only snapshot of one registered plugin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PluginInfo {
    /// Resolved name.
    pub name: String,
    /// Whether the plugin participates in dispatch.
    pub enabled: bool,
    /// The sortable pair determining canonical execution order.
    pub priority_key: (i64, i64),
    /// Self-reported version, if any.
    pub version: Option<String>,
    /// Hook names this plugin implements, sorted.
    pub hooks: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signature::Signature;
    use serde_json::json;

    struct Named;

    impl Plugin for Named {
        fn name(&self) -> Option<&str> {
            Some("named")
        }

        fn hooks(&self) -> Vec<HookImpl> {
            vec![HookImpl::new("h", Signature::empty(), |_| Ok(json!(1)))]
        }
    }

    struct Anonymous;

    impl Plugin for Anonymous {
        fn hooks(&self) -> Vec<HookImpl> {
            Vec::new()
        }
    }

    struct Prioritized;

    impl Plugin for Prioritized {
        fn priority(&self) -> Option<i64> {
            Some(-1)
        }

        fn version(&self) -> Option<&str> {
            Some("0.0.1")
        }

        fn hooks(&self) -> Vec<HookImpl> {
            Vec::new()
        }
    }

    // ── Name resolution ──────────────────────────────────────

    #[test]
    fn injected_name_dominates() {
        let entry = PluginEntry::of(Named).named("entry-name");
        assert_eq!(entry.resolve_name().unwrap(), "entry-name");
    }

    #[test]
    fn self_reported_name_beats_type_name() {
        let entry = PluginEntry::of(Named);
        assert_eq!(entry.resolve_name().unwrap(), "named");
    }

    #[test]
    fn type_name_fallback_is_lowercased_tail() {
        let entry = PluginEntry::of(Anonymous);
        assert_eq!(entry.resolve_name().unwrap(), "anonymous");
    }

    #[test]
    fn erased_unnamed_plugin_is_rejected() {
        let entry = PluginEntry::from_arc(Arc::new(Anonymous));
        let err = entry.resolve_name().unwrap_err();
        assert_eq!(err.code(), "UNNAMED_PLUGIN");
    }

    #[test]
    fn type_tail_strips_modules() {
        assert_eq!(type_tail("a::b::MyPlugin"), "MyPlugin");
        assert_eq!(type_tail("MyPlugin"), "MyPlugin");
    }

    // ── Wrapper ──────────────────────────────────────────────

    #[test]
    fn wrapper_without_declared_priority_uses_batch_and_sub() {
        let wrapper = PluginWrapper::new(PluginEntry::of(Named), 3, 1).unwrap();
        assert_eq!(wrapper.priority_key(), (3, 1));
        assert_eq!(wrapper.sub_index(), 1);
        assert!(wrapper.is_enabled());
    }

    #[test]
    fn wrapper_with_declared_priority_uses_it_first() {
        let wrapper = PluginWrapper::new(PluginEntry::of(Prioritized), 5, 0).unwrap();
        assert_eq!(wrapper.priority_key(), (-1, 5));
    }

    #[test]
    fn wrapper_collects_impls_by_hook_name() {
        let wrapper = PluginWrapper::new(PluginEntry::of(Named), 0, 0).unwrap();
        assert!(wrapper.impl_for("h").is_some());
        assert!(wrapper.impl_for("missing").is_none());
    }

    #[test]
    fn wrapper_identity_is_pointer_equality() {
        let arc: Arc<dyn Plugin> = Arc::new(Named);
        let wrapper =
            PluginWrapper::new(PluginEntry::from_arc(arc.clone()).named("n"), 0, 0).unwrap();
        assert!(wrapper.same_object(&arc));
        let other: Arc<dyn Plugin> = Arc::new(Named);
        assert!(!wrapper.same_object(&other));
    }

    #[test]
    fn info_snapshot() {
        let wrapper = PluginWrapper::new(PluginEntry::of(Prioritized).named("p"), 2, 0).unwrap();
        let info = wrapper.info();
        assert_eq!(info.name, "p");
        assert!(info.enabled);
        assert_eq!(info.priority_key, (-1, 2));
        assert_eq!(info.version.as_deref(), Some("0.0.1"));
        assert!(info.hooks.is_empty());
    }
}
