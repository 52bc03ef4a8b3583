//! Integration tests for synchronous dispatch.
//!
//! Covers the complete flow of:
//! - Registration batches, priorities, and canonical ordering
//! - Result strategies and their short-circuiting behavior
//! - Required hooks, scoped enable/disable, and SINGLE routing
//! - Discovery sources and name-resolution precedence

use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::Arc;

use plugmux::{
    kernel, CallArgs, Collect, DiagnosticKind, HookImpl, HookSpec, MemoryDiagnostics, PendingCall,
    Plugin, PluginEntry, ScopeSelector, Signature, StaticSource, Strategy,
};
use serde_json::{json, Value};

// =============================================================================
// Test Fixtures
// =============================================================================

/// A plugin built from canned hook implementations.
struct TestPlugin {
    name: &'static str,
    priority: Option<i64>,
    version: Option<&'static str>,
    hooks: Vec<HookImpl>,
}

impl TestPlugin {
    fn new(name: &'static str) -> Self {
        Self {
            name,
            priority: None,
            version: None,
            hooks: Vec::new(),
        }
    }

    fn with_priority(mut self, priority: i64) -> Self {
        self.priority = Some(priority);
        self
    }

    fn with_version(mut self, version: &'static str) -> Self {
        self.version = Some(version);
        self
    }

    /// Adds a sync impl returning `value`, counting invocations.
    fn returning(
        mut self,
        hook: &str,
        signature: Signature,
        value: Value,
        counter: Arc<AtomicUsize>,
    ) -> Self {
        self.hooks.push(HookImpl::new(hook, signature, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(value.clone())
        }));
        self
    }

    fn with_hook(mut self, imp: HookImpl) -> Self {
        self.hooks.push(imp);
        self
    }
}

impl Plugin for TestPlugin {
    fn name(&self) -> Option<&str> {
        Some(self.name)
    }

    fn version(&self) -> Option<&str> {
        self.version
    }

    fn priority(&self) -> Option<i64> {
        self.priority
    }

    fn hooks(&self) -> Vec<HookImpl> {
        self.hooks.clone()
    }
}

fn counter() -> Arc<AtomicUsize> {
    Arc::new(AtomicUsize::new(0))
}

fn arg_sig() -> Signature {
    Signature::new(["arg"])
}

// =============================================================================
// Scenario S1 — order preservation
// =============================================================================

#[test]
fn registration_order_is_execution_order() {
    let k = kernel("it-s1");
    k.add_spec(HookSpec::new("h", arg_sig()).with_strategy(Collect::ALL))
        .unwrap();

    k.register(TestPlugin::new("a").returning("h", arg_sig(), json!("a_result"), counter()))
        .unwrap();
    k.register(TestPlugin::new("b").returning("h", arg_sig(), json!("b_result"), counter()))
        .unwrap();

    let out = k.call("h", CallArgs::new().arg(0)).unwrap();
    assert_eq!(out, json!(["a_result", "b_result"]));
}

// =============================================================================
// Scenario S2 — negative priority overrides
// =============================================================================

#[test]
fn negative_priority_runs_before_defaults() {
    let k = kernel("it-s2");
    k.add_spec(HookSpec::new("h", arg_sig()).with_strategy(Collect::ALL))
        .unwrap();

    k.register(TestPlugin::new("default_p").returning("h", arg_sig(), json!("default"), counter()))
        .unwrap();
    k.register(
        TestPlugin::new("override_p")
            .with_priority(-1)
            .returning("h", arg_sig(), json!("override"), counter()),
    )
    .unwrap();

    let out = k.call("h", CallArgs::new().arg(0)).unwrap();
    assert_eq!(out, json!(["override", "default"]));
    assert_eq!(k.plugin_names(), ["override_p", "default_p"]);
}

// =============================================================================
// Scenario S3 — FIRST_AVAIL short-circuit
// =============================================================================

#[test]
fn first_avail_stops_at_first_non_null() {
    let k = kernel("it-s3");
    k.add_spec(HookSpec::new("h", arg_sig()).with_strategy(Collect::FIRST_AVAIL))
        .unwrap();

    let (c1, c2, c3) = (counter(), counter(), counter());
    k.register(TestPlugin::new("p1").returning("h", arg_sig(), json!(null), c1.clone()))
        .unwrap();
    k.register(TestPlugin::new("p2").returning("h", arg_sig(), json!("ok"), c2.clone()))
        .unwrap();
    k.register(TestPlugin::new("p3").returning("h", arg_sig(), json!("shouldntrun"), c3.clone()))
        .unwrap();

    let out = k.call("h", CallArgs::new().arg(0)).unwrap();
    assert_eq!(out, json!("ok"));
    assert_eq!(c1.load(Ordering::SeqCst), 1);
    assert_eq!(c2.load(Ordering::SeqCst), 1);
    // The third impl must never have run.
    assert_eq!(c3.load(Ordering::SeqCst), 0);
}

#[test]
fn last_avail_invokes_minimum_from_the_back() {
    let k = kernel("it-last-avail");
    k.add_spec(HookSpec::new("h", arg_sig()).with_strategy(Collect::LAST_AVAIL))
        .unwrap();

    let (c1, c2, c3) = (counter(), counter(), counter());
    k.register(TestPlugin::new("p1").returning("h", arg_sig(), json!("unreached"), c1.clone()))
        .unwrap();
    k.register(TestPlugin::new("p2").returning("h", arg_sig(), json!("picked"), c2.clone()))
        .unwrap();
    k.register(TestPlugin::new("p3").returning("h", arg_sig(), json!(null), c3.clone()))
        .unwrap();

    assert_eq!(k.call("h", CallArgs::new().arg(0)).unwrap(), json!("picked"));
    assert_eq!(c1.load(Ordering::SeqCst), 0);
    assert_eq!(c2.load(Ordering::SeqCst), 1);
    assert_eq!(c3.load(Ordering::SeqCst), 1);
}

// =============================================================================
// Scenario S4 — required hook
// =============================================================================

#[test]
fn required_hook_without_impls_fails() {
    let k = kernel("it-s4");
    k.add_spec(HookSpec::new("h", arg_sig()).required()).unwrap();

    let err = k.call("h", CallArgs::new().arg(0)).unwrap_err();
    assert_eq!(err.code(), "HOOK_REQUIRED");
}

#[test]
fn required_hook_with_all_providers_disabled_fails() {
    let k = kernel("it-s4-disabled");
    k.add_spec(HookSpec::new("h", arg_sig()).required()).unwrap();
    k.register(TestPlugin::new("p").returning("h", arg_sig(), json!(1), counter()))
        .unwrap();

    assert!(k.call("h", CallArgs::new().arg(0)).is_ok());
    k.disable(["p"]).unwrap();
    let err = k.call("h", CallArgs::new().arg(0)).unwrap_err();
    assert_eq!(err.code(), "HOOK_REQUIRED");
}

// =============================================================================
// Scenario S5 — scoped context restore
// =============================================================================

#[test]
fn scoped_restores_after_failed_apply() {
    let k = kernel("it-s5");
    for name in ["a", "b", "c"] {
        k.register(TestPlugin::new(name)).unwrap();
    }

    let err = k
        .scoped(ScopeSelector::parse(["-a", "+never"]).unwrap())
        .unwrap_err();
    assert_eq!(err.code(), "NO_SUCH_PLUGIN");
    assert_eq!(k.enabled_plugin_names(), ["a", "b", "c"]);
}

#[test]
fn scoped_restores_after_normal_exit() {
    let k = kernel("it-scoped-normal");
    for name in ["a", "b", "c"] {
        k.register(TestPlugin::new(name)).unwrap();
    }
    k.disable(["c"]).unwrap();

    {
        let _guard = k.scoped(ScopeSelector::only(["b", "c"])).unwrap();
        assert_eq!(k.enabled_plugin_names(), ["b", "c"]);
    }
    // Exact pre-entry state, including the disabled "c".
    assert_eq!(k.enabled_plugin_names(), ["a", "b"]);
}

#[test]
fn scoped_adjust_applies_a_diff() {
    let k = kernel("it-scoped-adjust");
    for name in ["a", "b", "c"] {
        k.register(TestPlugin::new(name)).unwrap();
    }
    k.disable(["b"]).unwrap();

    {
        let _guard = k
            .scoped(ScopeSelector::parse(["+b", "-a"]).unwrap())
            .unwrap();
        assert_eq!(k.enabled_plugin_names(), ["b", "c"]);
    }
    assert_eq!(k.enabled_plugin_names(), ["a", "c"]);
}

#[test]
fn scoped_restores_when_the_body_panics() {
    let k = kernel("it-scoped-panic");
    for name in ["a", "b"] {
        k.register(TestPlugin::new(name)).unwrap();
    }

    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        let _guard = k.scoped(ScopeSelector::only(["a"])).unwrap();
        panic!("scope body failed");
    }));
    assert!(result.is_err());
    assert_eq!(k.enabled_plugin_names(), ["a", "b"]);
}

// =============================================================================
// Scenario S7 — SINGLE routing
// =============================================================================

#[test]
fn single_routes_by_plugin_name() {
    let k = kernel("it-s7");
    let diag = Arc::new(MemoryDiagnostics::new());
    k.set_diagnostics(diag.clone());
    k.add_spec(HookSpec::new("h", arg_sig()).with_strategy(Collect::SINGLE))
        .unwrap();

    let (ca, cb, cc) = (counter(), counter(), counter());
    k.register(TestPlugin::new("a").returning("h", arg_sig(), json!("from_a"), ca.clone()))
        .unwrap();
    k.register(TestPlugin::new("b").returning("h", arg_sig(), json!("from_b"), cb.clone()))
        .unwrap();
    k.register(TestPlugin::new("c").returning("h", arg_sig(), json!("from_c"), cc.clone()))
        .unwrap();

    let out = k.call("h", CallArgs::new().arg(0).target("b")).unwrap();
    assert_eq!(out, json!("from_b"));
    assert_eq!(ca.load(Ordering::SeqCst), 0);
    assert_eq!(cb.load(Ordering::SeqCst), 1);
    assert_eq!(cc.load(Ordering::SeqCst), 0);
    assert!(diag.is_empty());

    // Without a routing key: last impl runs and a diagnostic fires.
    let out = k.call("h", CallArgs::new().arg(0)).unwrap();
    assert_eq!(out, json!("from_c"));
    assert_eq!(cc.load(Ordering::SeqCst), 1);
    assert_eq!(diag.count_of(DiagnosticKind::SingleWithoutTarget), 1);
}

#[test]
fn routing_key_is_ignored_by_other_strategies() {
    let k = kernel("it-routing-ignored");
    k.add_spec(HookSpec::new("h", arg_sig()).with_strategy(Collect::ALL))
        .unwrap();
    k.register(TestPlugin::new("a").returning("h", arg_sig(), json!(1), counter()))
        .unwrap();

    // Silent no-op: every impl still runs, the key never reaches kwargs.
    let out = k.call("h", CallArgs::new().arg(0).target("a")).unwrap();
    assert_eq!(out, json!([1]));
}

// =============================================================================
// Invariants
// =============================================================================

#[test]
fn list_all_is_sorted_by_priority_key() {
    let k = kernel("it-inv-order");
    k.register_batch(vec![
        PluginEntry::of(TestPlugin::new("b0_first")),
        PluginEntry::of(TestPlugin::new("b0_second")),
    ])
    .unwrap();
    k.register(TestPlugin::new("early").with_priority(-5))
        .unwrap();
    k.register(TestPlugin::new("late").with_priority(99))
        .unwrap();
    k.register(TestPlugin::new("b3_plain")).unwrap();

    assert_eq!(
        k.plugin_names(),
        ["early", "b0_first", "b0_second", "b3_plain", "late"]
    );

    let infos = k.plugins();
    for pair in infos.windows(2) {
        assert!(pair[0].priority_key <= pair[1].priority_key);
    }
}

#[test]
fn injected_discovery_name_beats_self_reported_name() {
    let k = kernel("it-inv-names");
    k.register_batch(vec![
        PluginEntry::of(TestPlugin::new("own_opinion")).named("entry_name")
    ])
    .unwrap();

    assert_eq!(k.plugin_names(), ["entry_name"]);
    assert_eq!(k.plugin_info("own_opinion").unwrap_err().code(), "NO_SUCH_PLUGIN");
    // The raw object still reports its own opinion.
    assert_eq!(k.raw("entry_name").unwrap().name(), Some("own_opinion"));
}

#[test]
fn kernel_identity_per_project() {
    let a = kernel("it-inv-identity");
    let b = kernel("it-inv-identity");
    assert!(Arc::ptr_eq(&a, &b));
}

#[test]
fn priority_is_snapshotted_at_registration() {
    struct Shifty {
        priority: Arc<AtomicI64>,
    }

    impl Plugin for Shifty {
        fn name(&self) -> Option<&str> {
            Some("shifty")
        }

        fn priority(&self) -> Option<i64> {
            Some(self.priority.load(Ordering::SeqCst))
        }

        fn hooks(&self) -> Vec<HookImpl> {
            Vec::new()
        }
    }

    let k = kernel("it-inv-static-priority");
    let cell = Arc::new(AtomicI64::new(-10));
    k.register(Shifty {
        priority: cell.clone(),
    })
    .unwrap();
    k.register(TestPlugin::new("plain")).unwrap();
    assert_eq!(k.plugin_names(), ["shifty", "plain"]);

    // Mutating the attribute post-hoc has no effect on dispatch order.
    cell.store(100, Ordering::SeqCst);
    assert_eq!(k.plugin_names(), ["shifty", "plain"]);
    assert_eq!(k.plugin_info("shifty").unwrap().priority_key, (-10, 0));
}

#[test]
fn impl_ahead_of_spec_is_inert_then_live() {
    let k = kernel("it-inv-inert");
    let c = counter();
    k.register(TestPlugin::new("p").returning("future_hook", arg_sig(), json!(7), c.clone()))
        .unwrap();

    assert_eq!(
        k.call("future_hook", CallArgs::new().arg(0))
            .unwrap_err()
            .code(),
        "NO_SUCH_HOOK_SPEC"
    );
    assert_eq!(c.load(Ordering::SeqCst), 0);

    k.add_spec(HookSpec::new("future_hook", arg_sig()).with_strategy(Collect::ALL))
        .unwrap();
    assert_eq!(
        k.call("future_hook", CallArgs::new().arg(0)).unwrap(),
        json!([7])
    );
    assert_eq!(c.load(Ordering::SeqCst), 1);
}

#[test]
fn receiver_erasure_accepts_both_impl_shapes() {
    let k = kernel("it-inv-receiver");
    k.add_spec(
        HookSpec::new("h", Signature::new(["self", "arg"])).with_strategy(Collect::ALL),
    )
    .unwrap();

    k.register(TestPlugin::new("omits").with_hook(HookImpl::new(
        "h",
        Signature::new(["arg"]),
        |args| Ok(json!(["omits", args.args()])),
    )))
    .unwrap();
    k.register(TestPlugin::new("includes").with_hook(HookImpl::new(
        "h",
        Signature::new(["self", "arg"]),
        |args| Ok(json!(["includes", args.args()])),
    )))
    .unwrap();

    // Callers never supply the receiver.
    let out = k.call("h", CallArgs::new().arg(5)).unwrap();
    assert_eq!(
        out,
        json!([["omits", [5]], ["includes", [null, 5]]])
    );
}

// =============================================================================
// Laws
// =============================================================================

#[test]
fn try_strategy_softens_exactly_the_empty_case() {
    let k = kernel("it-law-try");
    k.add_spec(HookSpec::new("strict", arg_sig()).with_strategy(Collect::FIRST))
        .unwrap();
    k.add_spec(HookSpec::new("soft", arg_sig()).with_strategy(Collect::TRY_FIRST))
        .unwrap();

    let err = k.call("strict", CallArgs::new().arg(0)).unwrap_err();
    assert_eq!(err.code(), "RESULT_UNAVAILABLE");
    assert_eq!(k.call("soft", CallArgs::new().arg(0)).unwrap(), json!(null));
}

#[test]
fn try_never_absorbs_impl_failures() {
    let k = kernel("it-law-try-failure");
    k.add_spec(HookSpec::new("h", arg_sig()).with_strategy(Collect::TRY_ALL))
        .unwrap();
    let after = counter();
    k.register(TestPlugin::new("bad").with_hook(HookImpl::new(
        "h",
        arg_sig(),
        |_| Err("exploded".into()),
    )))
    .unwrap();
    k.register(TestPlugin::new("after").returning("h", arg_sig(), json!(1), after.clone()))
        .unwrap();

    let err = k.call("h", CallArgs::new().arg(0)).unwrap_err();
    assert_eq!(err.code(), "IMPL_FAILURE");
    assert!(err.to_string().contains("bad"));
    // Dispatch aborted before the second impl.
    assert_eq!(after.load(Ordering::SeqCst), 0);
}

#[test]
fn user_reducer_sees_unexecuted_calls_in_canonical_order() {
    let k = kernel("it-law-reducer");
    let (c1, c2) = (counter(), counter());
    k.add_spec(
        HookSpec::new("h", arg_sig()).with_strategy(Strategy::reduce(
            |calls: Vec<PendingCall>| {
                let order: Vec<_> = calls.iter().map(|c| c.plugin().to_string()).collect();
                Ok(json!(order))
            },
        )),
    )
    .unwrap();
    k.register(
        TestPlugin::new("second")
            .with_priority(1)
            .returning("h", arg_sig(), json!(2), c2.clone()),
    )
    .unwrap();
    k.register(
        TestPlugin::new("first")
            .with_priority(-1)
            .returning("h", arg_sig(), json!(1), c1.clone()),
    )
    .unwrap();

    let out = k.call("h", CallArgs::new().arg(0)).unwrap();
    // Same order ALL would execute in, nothing executed.
    assert_eq!(out, json!(["first", "second"]));
    assert_eq!(c1.load(Ordering::SeqCst), 0);
    assert_eq!(c2.load(Ordering::SeqCst), 0);
}

// =============================================================================
// Registration edge cases
// =============================================================================

#[test]
fn duplicate_name_fails_and_same_object_is_idempotent() {
    let k = kernel("it-reg-duplicate");
    let shared: Arc<dyn Plugin> = Arc::new(TestPlugin::new("p"));
    k.register_batch(vec![PluginEntry::from_arc(shared.clone())])
        .unwrap();

    // Same Arc again: no-op.
    k.register_batch(vec![PluginEntry::from_arc(shared)]).unwrap();
    assert_eq!(k.plugins().len(), 1);

    // Different object under the same name: error.
    let err = k.register(TestPlugin::new("p")).unwrap_err();
    assert_eq!(err.code(), "DUPLICATE_PLUGIN_NAME");
}

#[test]
fn attach_time_signature_mismatch_rejects_registration() {
    let k = kernel("it-reg-signature");
    k.add_spec(HookSpec::new("on_init", Signature::new(["self", "arg"])))
        .unwrap();

    let err = k
        .register(TestPlugin::new("p6").with_hook(HookImpl::new(
            "on_init",
            Signature::new(["self", "diff_arg"]),
            |_| Ok(json!(null)),
        )))
        .unwrap_err();
    assert_eq!(err.code(), "SIGNATURE_MISMATCH");
    assert!(k.plugins().is_empty());
}

#[test]
fn enable_disable_unknown_plugin() {
    let k = kernel("it-reg-unknown");
    assert_eq!(k.enable(["ghost"]).unwrap_err().code(), "NO_SUCH_PLUGIN");
    assert_eq!(k.disable(["ghost"]).unwrap_err().code(), "NO_SUCH_PLUGIN");
}

#[test]
fn version_is_surfaced_through_info() {
    let k = kernel("it-reg-version");
    k.register(TestPlugin::new("p").with_version("0.0.1"))
        .unwrap();
    assert_eq!(
        k.plugin_info("p").unwrap().version.as_deref(),
        Some("0.0.1")
    );
}

#[test]
fn disabled_plugins_are_skipped_then_rejoin() {
    let k = kernel("it-reg-toggle");
    k.add_spec(HookSpec::new("h", arg_sig()).with_strategy(Collect::ALL))
        .unwrap();
    k.register(TestPlugin::new("a").returning("h", arg_sig(), json!("a"), counter()))
        .unwrap();
    k.register(TestPlugin::new("b").returning("h", arg_sig(), json!("b"), counter()))
        .unwrap();

    k.disable(["a"]).unwrap();
    assert_eq!(k.call("h", CallArgs::new().arg(0)).unwrap(), json!(["b"]));
    assert_eq!(k.enabled_plugin_names(), ["b"]);

    k.enable(["a"]).unwrap();
    assert_eq!(
        k.call("h", CallArgs::new().arg(0)).unwrap(),
        json!(["a", "b"])
    );
}

// =============================================================================
// Discovery sources
// =============================================================================

#[test]
fn load_source_registers_under_discovered_names() {
    let k = kernel("it-src-load");
    k.add_spec(HookSpec::new("h", arg_sig()).with_strategy(Collect::ALL))
        .unwrap();

    let source = StaticSource::new("it-src-load")
        .with(
            "tool-a",
            Arc::new(TestPlugin::new("ignored-a").returning(
                "h",
                arg_sig(),
                json!("a"),
                counter(),
            )),
        )
        .with(
            "tool-b",
            Arc::new(TestPlugin::new("ignored-b").returning(
                "h",
                arg_sig(),
                json!("b"),
                counter(),
            )),
        );

    let loaded = k.load_source(&source).unwrap();
    assert_eq!(loaded, 2);
    assert_eq!(k.plugin_names(), ["tool-a", "tool-b"]);
    assert_eq!(
        k.call("h", CallArgs::new().arg(0)).unwrap(),
        json!(["a", "b"])
    );
}

#[test]
fn load_source_honors_the_only_filter() {
    let k = kernel("it-src-only");
    let source = StaticSource::new("it-src-only")
        .with("keep", Arc::new(TestPlugin::new("x")))
        .with("drop", Arc::new(TestPlugin::new("y")));

    let loaded = k
        .load_source_filtered(&source, None, Some(&["keep"]))
        .unwrap();
    assert_eq!(loaded, 1);
    assert_eq!(k.plugin_names(), ["keep"]);
}

#[test]
fn load_source_with_explicit_group() {
    let k = kernel("it-src-group");
    let source = StaticSource::new("other-group").with("p", Arc::new(TestPlugin::new("p")));

    assert_eq!(k.load_source(&source).unwrap(), 0);
    assert_eq!(
        k.load_source_filtered(&source, Some("other-group"), None)
            .unwrap(),
        1
    );
}
