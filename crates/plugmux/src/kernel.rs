//! The kernel façade — one registry, one spec table, one dispatcher.
//!
//! A [`Kernel`] is the per-project singleton binding everything together:
//! hosts declare [`HookSpec`]s, plugins register through it, and hook
//! invocations enter here. Kernels are process-wide: [`kernel`] returns
//! the same instance for the same project name, and
//! [`anonymous_kernel`] mints `project-0`, `project-1`, … for callers
//! that do not care. Kernels are never destroyed in normal operation.
//!
//! # Concurrency
//!
//! The registry and spec table sit behind `parking_lot::RwLock`s. Locks
//! are never held across `.await` points: a dispatch clones the spec and
//! an eligible-call snapshot under read locks, then executes lock-free,
//! so mutations during a dispatch do not affect it.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, OnceLock};

use parking_lot::{Mutex, RwLock};
use serde_json::Value;

use crate::args::CallArgs;
use crate::diag::{Diagnostics, TracingDiagnostics};
use crate::dispatch::{self, WarnedImpls};
use crate::error::PlugmuxError;
use crate::hook::HookImpl;
use crate::plugin::{Plugin, PluginEntry, PluginInfo};
use crate::registry::PluginRegistry;
use crate::scoped::{ScopeOp, ScopeSelector, ScopedPlugins};
use crate::source::PluginSource;
use crate::spec::HookSpec;
use crate::strategy::Strategy;

static PROJECTS: OnceLock<Mutex<HashMap<String, Arc<Kernel>>>> = OnceLock::new();

fn projects() -> &'static Mutex<HashMap<String, Arc<Kernel>>> {
    PROJECTS.get_or_init(|| Mutex::new(HashMap::new()))
}

/// Returns the canonical kernel for a project name.
///
/// The same name always returns the same instance.
///
/// # Example
///
/// ```
/// let a = plugmux::kernel("kernel-identity-doc");
/// let b = plugmux::kernel("kernel-identity-doc");
/// assert!(std::sync::Arc::ptr_eq(&a, &b));
/// ```
pub fn kernel(project: impl Into<String>) -> Arc<Kernel> {
    let project = project.into();
    let mut map = projects().lock();
    map.entry(project.clone())
        .or_insert_with(|| Arc::new(Kernel::new(project)))
        .clone()
}

/// Returns a kernel under a freshly minted project name.
///
/// Names are `project-0`, `project-1`, … skipping taken ones.
pub fn anonymous_kernel() -> Arc<Kernel> {
    let mut map = projects().lock();
    let mut index = 0usize;
    loop {
        let name = format!("project-{index}");
        if !map.contains_key(&name) {
            let kernel = Arc::new(Kernel::new(name.clone()));
            map.insert(name, kernel.clone());
            return kernel;
        }
        index += 1;
    }
}

/// The per-project plugin dispatch kernel.
pub struct Kernel {
    project: String,
    specs: RwLock<HashMap<String, HookSpec>>,
    registry: RwLock<PluginRegistry>,
    diagnostics: RwLock<Arc<dyn Diagnostics>>,
    warned_sync_impls: WarnedImpls,
}

impl Kernel {
    fn new(project: String) -> Self {
        Self {
            project,
            specs: RwLock::new(HashMap::new()),
            registry: RwLock::new(PluginRegistry::new()),
            diagnostics: RwLock::new(Arc::new(TracingDiagnostics)),
            warned_sync_impls: Mutex::new(HashSet::new()),
        }
    }

    /// The project name this kernel serves.
    #[must_use]
    pub fn project(&self) -> &str {
        &self.project
    }

    /// Replaces the diagnostics sink.
    pub fn set_diagnostics(&self, sink: Arc<dyn Diagnostics>) {
        *self.diagnostics.write() = sink;
    }

    fn diag(&self) -> Arc<dyn Diagnostics> {
        self.diagnostics.read().clone()
    }

    // ── Specs ────────────────────────────────────────────────

    /// Registers a hook specification.
    ///
    /// Fails with [`PlugmuxError::DuplicateSpec`] on a second registration
    /// under the same name, and with [`PlugmuxError::ReducerMismatch`]
    /// when a user reducer's sync/async kind does not match the spec's.
    pub fn add_spec(&self, spec: HookSpec) -> Result<(), PlugmuxError> {
        match (spec.is_async(), spec.strategy()) {
            (false, Strategy::ReduceAsync(_)) | (true, Strategy::Reduce(_)) => {
                return Err(PlugmuxError::ReducerMismatch(spec.name().to_string()));
            }
            _ => {}
        }

        let mut specs = self.specs.write();
        if specs.contains_key(spec.name()) {
            return Err(PlugmuxError::DuplicateSpec(spec.name().to_string()));
        }
        tracing::debug!(hook = %spec.name(), "registered hook spec");
        specs.insert(spec.name().to_string(), spec);
        Ok(())
    }

    /// Returns `true` when a spec with this name exists.
    #[must_use]
    pub fn has_spec(&self, name: &str) -> bool {
        self.specs.read().contains_key(name)
    }

    /// All spec names, sorted.
    #[must_use]
    pub fn spec_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.specs.read().keys().cloned().collect();
        names.sort();
        names
    }

    // ── Registration ─────────────────────────────────────────

    /// Registers one plugin as its own batch.
    pub fn register<P: Plugin + 'static>(&self, plugin: P) -> Result<(), PlugmuxError> {
        self.register_batch(vec![PluginEntry::of(plugin)])
    }

    /// Registers a plugin whose type implements `Default`.
    ///
    /// The typed form of auto-instantiation: the kernel constructs the
    /// instance itself because the type proves it needs no inputs.
    pub fn register_default<P: Plugin + Default + 'static>(&self) -> Result<(), PlugmuxError> {
        self.register(P::default())
    }

    /// Registers a batch of entries under one batch index.
    pub fn register_batch(&self, entries: Vec<PluginEntry>) -> Result<(), PlugmuxError> {
        let specs = self.specs.read();
        self.registry.write().register_batch(entries, &specs)
    }

    /// Loads plugins from a source under the project-name group.
    ///
    /// Returns the number of plugins registered.
    pub fn load_source(&self, source: &dyn PluginSource) -> Result<usize, PlugmuxError> {
        self.load_source_filtered(source, None, None)
    }

    /// Loads plugins from a source with an explicit group and name filter.
    ///
    /// `group` defaults to the project name; `only` restricts to the
    /// listed entry names. Each discovered entry registers as its own
    /// batch, with the discovery name injected.
    pub fn load_source_filtered(
        &self,
        source: &dyn PluginSource,
        group: Option<&str>,
        only: Option<&[&str]>,
    ) -> Result<usize, PlugmuxError> {
        let group = group.unwrap_or(&self.project);
        let mut loaded = 0;
        for entry in source.discover(group)? {
            if let Some(only) = only {
                if !only.contains(&entry.name.as_str()) {
                    continue;
                }
            }
            self.register_batch(vec![PluginEntry::from_arc(entry.plugin).named(entry.name)])?;
            loaded += 1;
        }
        Ok(loaded)
    }

    // ── Enable / disable / lookup ────────────────────────────

    /// Enables plugins by name.
    pub fn enable<I, S>(&self, names: I) -> Result<(), PlugmuxError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut registry = self.registry.write();
        for name in names {
            registry.set_enabled(name.as_ref(), true)?;
        }
        Ok(())
    }

    /// Disables plugins by name.
    pub fn disable<I, S>(&self, names: I) -> Result<(), PlugmuxError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut registry = self.registry.write();
        for name in names {
            registry.set_enabled(name.as_ref(), false)?;
        }
        Ok(())
    }

    /// Snapshot of one plugin.
    pub fn plugin_info(&self, name: &str) -> Result<PluginInfo, PlugmuxError> {
        self.registry
            .read()
            .get(name)
            .map(|w| w.info())
            .ok_or_else(|| PlugmuxError::NoSuchPlugin(name.to_string()))
    }

    /// The raw plugin object as registered.
    pub fn raw(&self, name: &str) -> Result<Arc<dyn Plugin>, PlugmuxError> {
        self.registry
            .read()
            .get(name)
            .map(|w| w.raw().clone())
            .ok_or_else(|| PlugmuxError::NoSuchPlugin(name.to_string()))
    }

    /// Snapshots of all plugins, in canonical execution order.
    #[must_use]
    pub fn plugins(&self) -> Vec<PluginInfo> {
        self.registry
            .read()
            .ordered()
            .into_iter()
            .map(|w| w.info())
            .collect()
    }

    /// Snapshots of enabled plugins, in canonical execution order.
    #[must_use]
    pub fn enabled_plugins(&self) -> Vec<PluginInfo> {
        self.plugins().into_iter().filter(|p| p.enabled).collect()
    }

    /// All plugin names, in canonical execution order.
    #[must_use]
    pub fn plugin_names(&self) -> Vec<String> {
        self.plugins().into_iter().map(|p| p.name).collect()
    }

    /// Enabled plugin names, in canonical execution order.
    #[must_use]
    pub fn enabled_plugin_names(&self) -> Vec<String> {
        self.enabled_plugins().into_iter().map(|p| p.name).collect()
    }

    // ── Scoped state ─────────────────────────────────────────

    /// Applies a scope selector, returning a guard that restores the
    /// previous enabled set when dropped.
    ///
    /// A failed apply (unknown plugin name) rolls back before returning
    /// the error; the enabled set is untouched either way.
    pub fn scoped(&self, selector: ScopeSelector) -> Result<ScopedPlugins<'_>, PlugmuxError> {
        let mut registry = self.registry.write();
        let saved = registry.enabled_state();

        let applied = match &selector {
            ScopeSelector::Unchanged => Ok(()),
            ScopeSelector::Only(names) => registry.enable_only(names),
            ScopeSelector::Adjust(ops) => ops.iter().try_for_each(|op| match op {
                ScopeOp::Enable(name) => registry.set_enabled(name, true),
                ScopeOp::Disable(name) => registry.set_enabled(name, false),
            }),
        };

        if let Err(err) = applied {
            registry.restore_enabled(&saved);
            return Err(err);
        }
        drop(registry);
        Ok(ScopedPlugins::new(self, saved))
    }

    pub(crate) fn restore_enabled(&self, saved: &[(String, bool)]) {
        self.registry.write().restore_enabled(saved);
    }

    // ── Dispatch ─────────────────────────────────────────────

    /// Dispatches a synchronous hook.
    pub fn call(&self, hook: &str, args: CallArgs) -> Result<Value, PlugmuxError> {
        let spec = self.spec_for(hook)?;
        if spec.is_async() {
            return Err(PlugmuxError::AsyncSpec(hook.to_string()));
        }
        let eligible = self.eligible(&spec)?;
        let (calls, target) = dispatch::prepare(&spec, eligible, args);
        dispatch::run_sync(&spec, calls, target, &*self.diag())
    }

    /// Dispatches an asynchronous hook.
    pub async fn call_async(&self, hook: &str, args: CallArgs) -> Result<Value, PlugmuxError> {
        let spec = self.spec_for(hook)?;
        if !spec.is_async() {
            return Err(PlugmuxError::SyncSpec(hook.to_string()));
        }
        let eligible = self.eligible(&spec)?;
        let (calls, target) = dispatch::prepare(&spec, eligible, args);
        let diag = self.diag();
        dispatch::run_async(&spec, calls, target, &*diag, &self.warned_sync_impls).await
    }

    fn spec_for(&self, hook: &str) -> Result<HookSpec, PlugmuxError> {
        self.specs
            .read()
            .get(hook)
            .cloned()
            .ok_or_else(|| PlugmuxError::NoSuchHookSpec(hook.to_string()))
    }

    /// Consistent snapshot of the eligible impls for one dispatch.
    ///
    /// Validates here any implementation whose spec arrived after the
    /// plugin did.
    fn eligible(&self, spec: &HookSpec) -> Result<Vec<(String, HookImpl)>, PlugmuxError> {
        let registry = self.registry.read();
        let mut eligible = Vec::new();
        for wrapper in registry.ordered() {
            if !wrapper.is_enabled() {
                continue;
            }
            let Some(imp) = wrapper.impl_for(spec.name()) else {
                continue;
            };
            if !spec.signature().matches(imp.signature()) {
                return Err(PlugmuxError::SignatureMismatch {
                    hook: spec.name().to_string(),
                    plugin: wrapper.name().to_string(),
                    expected: spec.signature().erased().to_vec(),
                    got: imp.signature().erased().to_vec(),
                });
            }
            eligible.push((wrapper.name().to_string(), imp.clone()));
        }
        Ok(eligible)
    }
}

impl std::fmt::Debug for Kernel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Kernel")
            .field("project", &self.project)
            .field("specs", &self.specs.read().len())
            .field("plugins", &self.registry.read().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signature::Signature;
    use crate::strategy::Collect;
    use crate::testing::MockPlugin;
    use serde_json::json;

    // Unit tests share the process-wide project map; every test uses a
    // unique project name.

    #[test]
    fn same_project_same_kernel() {
        let a = kernel("kernel-tests-identity");
        let b = kernel("kernel-tests-identity");
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.project(), "kernel-tests-identity");
    }

    #[test]
    fn anonymous_kernels_mint_distinct_projects() {
        let a = anonymous_kernel();
        let b = anonymous_kernel();
        assert_ne!(a.project(), b.project());
        assert!(a.project().starts_with("project-"));
        // Re-asking for the minted name returns the same kernel.
        assert!(Arc::ptr_eq(&a, &kernel(a.project())));
    }

    #[test]
    fn duplicate_spec_is_rejected() {
        let k = kernel("kernel-tests-dup-spec");
        k.add_spec(HookSpec::new("h", Signature::empty())).unwrap();
        let err = k
            .add_spec(HookSpec::new("h", Signature::empty()))
            .unwrap_err();
        assert_eq!(err.code(), "DUPLICATE_SPEC");
        assert!(k.has_spec("h"));
        assert_eq!(k.spec_names(), ["h"]);
    }

    #[test]
    fn reducer_kind_is_validated_at_spec_registration() {
        let k = kernel("kernel-tests-reducer-kind");
        let err = k
            .add_spec(
                HookSpec::new("sync_hook", Signature::empty())
                    .with_strategy(Strategy::reduce_async(|_| async { Ok(json!(null)) })),
            )
            .unwrap_err();
        assert_eq!(err.code(), "REDUCER_MISMATCH");

        let err = k
            .add_spec(
                HookSpec::new_async("async_hook", Signature::empty())
                    .with_strategy(Strategy::reduce(|_| Ok(json!(null)))),
            )
            .unwrap_err();
        assert_eq!(err.code(), "REDUCER_MISMATCH");
    }

    #[test]
    fn unknown_hook_is_rejected() {
        let k = kernel("kernel-tests-unknown-hook");
        let err = k.call("ghost", CallArgs::new()).unwrap_err();
        assert_eq!(err.code(), "NO_SUCH_HOOK_SPEC");
    }

    #[test]
    fn call_surface_must_match_spec_kind() {
        let k = kernel("kernel-tests-surface");
        k.add_spec(HookSpec::new("s", Signature::empty())).unwrap();
        k.add_spec(HookSpec::new_async("a", Signature::empty()))
            .unwrap();

        assert_eq!(
            k.call("a", CallArgs::new()).unwrap_err().code(),
            "ASYNC_SPEC"
        );
        let rt = tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap();
        let err = rt.block_on(k.call_async("s", CallArgs::new())).unwrap_err();
        assert_eq!(err.code(), "SYNC_SPEC");
    }

    #[test]
    fn dispatch_smoke() {
        let k = kernel("kernel-tests-smoke");
        k.add_spec(
            HookSpec::new("h", Signature::new(["a"])).with_strategy(Collect::ALL),
        )
        .unwrap();
        k.register(MockPlugin::new("p1").returning("h", Signature::new(["a"]), json!(1)))
            .unwrap();
        k.register(MockPlugin::new("p2").returning("h", Signature::new(["a"]), json!(2)))
            .unwrap();

        assert_eq!(
            k.call("h", CallArgs::new().arg(0)).unwrap(),
            json!([1, 2])
        );
        assert_eq!(k.plugin_names(), ["p1", "p2"]);
        assert_eq!(k.plugin_info("p1").unwrap().hooks, ["h"]);
        assert!(k.raw("p1").is_ok());
        assert_eq!(k.raw("nope").unwrap_err().code(), "NO_SUCH_PLUGIN");
    }

    #[test]
    fn impl_without_spec_is_inert_until_spec_arrives() {
        let k = kernel("kernel-tests-inert");
        k.register(MockPlugin::new("p").returning("late", Signature::new(["x"]), json!(9)))
            .unwrap();

        // No spec yet: dispatching is an unknown-hook error, the impl
        // itself is simply unused.
        assert_eq!(
            k.call("late", CallArgs::new()).unwrap_err().code(),
            "NO_SUCH_HOOK_SPEC"
        );

        k.add_spec(HookSpec::new("late", Signature::new(["x"])).with_strategy(Collect::ALL))
            .unwrap();
        assert_eq!(k.call("late", CallArgs::new().arg(0)).unwrap(), json!([9]));
    }

    #[test]
    fn late_spec_still_validates_signatures() {
        let k = kernel("kernel-tests-late-validation");
        k.register(MockPlugin::new("p").returning("h", Signature::new(["wrong"]), json!(1)))
            .unwrap();
        k.add_spec(HookSpec::new("h", Signature::new(["right"])))
            .unwrap();
        let err = k.call("h", CallArgs::new().arg(0)).unwrap_err();
        assert_eq!(err.code(), "SIGNATURE_MISMATCH");
    }

    #[test]
    fn scoped_failure_rolls_back() {
        let k = kernel("kernel-tests-scoped-rollback");
        k.register(MockPlugin::new("a")).unwrap();
        k.register(MockPlugin::new("b")).unwrap();

        let err = k
            .scoped(ScopeSelector::parse(["-a", "+never"]).unwrap())
            .unwrap_err();
        assert_eq!(err.code(), "NO_SUCH_PLUGIN");
        assert_eq!(k.enabled_plugin_names(), ["a", "b"]);
    }

    #[test]
    fn scoped_guard_restores_on_drop() {
        let k = kernel("kernel-tests-scoped-drop");
        k.register(MockPlugin::new("a")).unwrap();
        k.register(MockPlugin::new("b")).unwrap();
        k.disable(["b"]).unwrap();

        {
            let _guard = k.scoped(ScopeSelector::only(["b"])).unwrap();
            assert_eq!(k.enabled_plugin_names(), ["b"]);
        }
        assert_eq!(k.enabled_plugin_names(), ["a"]);
        assert!(!k.plugin_info("b").unwrap().enabled);
    }

    #[test]
    fn register_default_uses_the_type() {
        #[derive(Default)]
        struct Defaulted;

        impl Plugin for Defaulted {
            fn hooks(&self) -> Vec<HookImpl> {
                Vec::new()
            }
        }

        let k = kernel("kernel-tests-default");
        k.register_default::<Defaulted>().unwrap();
        assert_eq!(k.plugin_names(), ["defaulted"]);
    }
}
