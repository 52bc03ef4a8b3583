//! The dispatch engine — executes implementations and applies strategies.
//!
//! One dispatch is strictly sequential: the next implementation starts
//! only after the previous one's outcome is observed, in canonical order,
//! with no concurrent fan-out. Async dispatch suspends only at
//! implementation boundaries; cancelling the dispatch future drops any
//! collected outcomes and never runs the reducer.
//!
//! An implementation failure aborts the dispatch immediately, wrapped as
//! [`PlugmuxError::ImplFailure`]. The `TRY_` strategies only soften the
//! "nothing to reduce" condition, never failures.

use std::collections::HashSet;

use parking_lot::Mutex;
use serde_json::Value;

use crate::args::CallArgs;
use crate::diag::{Diagnostic, DiagnosticKind, Diagnostics};
use crate::error::PlugmuxError;
use crate::hook::{HookImpl, PendingCall};
use crate::spec::HookSpec;
use crate::strategy::{fold, Collect, OnEmpty, Scope, Strategy};

/// Keys of (hook, plugin) pairs that already emitted the sync-impl warning.
pub(crate) type WarnedImpls = Mutex<HashSet<(String, String)>>;

/// Builds the ordered pending-call list from the eligible snapshot.
///
/// Discards a caller-supplied receiver argument, strips the routing key,
/// and injects `null` receivers for impls that declare one.
pub(crate) fn prepare(
    spec: &HookSpec,
    eligible: Vec<(String, HookImpl)>,
    mut args: CallArgs,
) -> (Vec<PendingCall>, Option<String>) {
    if spec.signature().has_receiver() && args.len() == spec.signature().arity() + 1 {
        args.drop_leading();
    }
    let target = args.take_target();

    let calls = eligible
        .into_iter()
        .map(|(plugin, imp)| {
            let mut call_args = args.clone();
            if imp.signature().has_receiver() {
                call_args.push_receiver();
            }
            PendingCall::new(plugin, spec.name(), imp.callable().clone(), call_args)
        })
        .collect();

    (calls, target)
}

/// Runs a synchronous dispatch.
pub(crate) fn run_sync(
    spec: &HookSpec,
    calls: Vec<PendingCall>,
    target: Option<String>,
    diag: &dyn Diagnostics,
) -> Result<Value, PlugmuxError> {
    tracing::debug!(
        hook = %spec.name(),
        impls = calls.len(),
        strategy = spec.strategy().label(),
        "dispatching hook"
    );
    if spec.is_required() && calls.is_empty() {
        return Err(PlugmuxError::HookRequired(spec.name().to_string()));
    }

    match spec.strategy() {
        Strategy::Reduce(reducer) => reducer.reduce(calls),
        Strategy::ReduceAsync(_) => Err(PlugmuxError::ReducerMismatch(spec.name().to_string())),
        Strategy::Collect(collect) => collect_sync(spec, *collect, &calls, target.as_deref(), diag),
    }
}

/// Runs an asynchronous dispatch.
pub(crate) async fn run_async(
    spec: &HookSpec,
    calls: Vec<PendingCall>,
    target: Option<String>,
    diag: &dyn Diagnostics,
    warned: &WarnedImpls,
) -> Result<Value, PlugmuxError> {
    tracing::debug!(
        hook = %spec.name(),
        impls = calls.len(),
        strategy = spec.strategy().label(),
        "dispatching async hook"
    );
    if spec.is_required() && calls.is_empty() {
        return Err(PlugmuxError::HookRequired(spec.name().to_string()));
    }

    match spec.strategy() {
        Strategy::ReduceAsync(reducer) => reducer.reduce(calls).await,
        Strategy::Reduce(_) => Err(PlugmuxError::ReducerMismatch(spec.name().to_string())),
        Strategy::Collect(collect) => {
            collect_async(spec, *collect, &calls, target.as_deref(), diag, warned).await
        }
    }
}

fn absent(collect: Collect, hook: &str) -> Result<Value, PlugmuxError> {
    match collect.on_empty {
        OnEmpty::Fail => Err(PlugmuxError::ResultUnavailable(hook.to_string())),
        OnEmpty::Null => Ok(Value::Null),
    }
}

/// Picks the `SINGLE` call: the routed one, or the last with a diagnostic.
fn pick_single<'a>(
    hook: &str,
    calls: &'a [PendingCall],
    target: Option<&str>,
    diag: &dyn Diagnostics,
) -> Option<&'a PendingCall> {
    match target {
        Some(plugin) => calls.iter().find(|call| call.plugin() == plugin),
        None => {
            let last = calls.last()?;
            if calls.len() > 1 {
                diag.emit(Diagnostic {
                    kind: DiagnosticKind::SingleWithoutTarget,
                    message: format!(
                        "more than one implementation of '{hook}' and no plugin \
                         specified; using the last one"
                    ),
                    hook: hook.to_string(),
                    plugin: Some(last.plugin().to_string()),
                });
            }
            Some(last)
        }
    }
}

fn collect_sync(
    spec: &HookSpec,
    collect: Collect,
    calls: &[PendingCall],
    target: Option<&str>,
    diag: &dyn Diagnostics,
) -> Result<Value, PlugmuxError> {
    let hook = spec.name();
    match collect.scope {
        Scope::All(reduce) => {
            let mut outcomes = Vec::with_capacity(calls.len());
            for call in calls {
                outcomes.push(call.invoke()?);
            }
            match fold(reduce, outcomes) {
                Some(value) => Ok(value),
                None => absent(collect, hook),
            }
        }
        Scope::First => match calls.first() {
            Some(call) => call.invoke(),
            None => absent(collect, hook),
        },
        Scope::Last => match calls.last() {
            Some(call) => call.invoke(),
            None => absent(collect, hook),
        },
        Scope::FirstAvail => {
            for call in calls {
                let value = call.invoke()?;
                if !value.is_null() {
                    return Ok(value);
                }
            }
            absent(collect, hook)
        }
        Scope::LastAvail => {
            for call in calls.iter().rev() {
                let value = call.invoke()?;
                if !value.is_null() {
                    return Ok(value);
                }
            }
            absent(collect, hook)
        }
        Scope::Single => match pick_single(hook, calls, target, diag) {
            Some(call) => call.invoke(),
            None => absent(collect, hook),
        },
    }
}

/// Invokes one call under an async spec, warning on sync impls.
async fn invoke_checked(
    spec: &HookSpec,
    call: &PendingCall,
    diag: &dyn Diagnostics,
    warned: &WarnedImpls,
) -> Result<Value, PlugmuxError> {
    if !call.is_async() && spec.warns_on_sync_impl() {
        let key = (spec.name().to_string(), call.plugin().to_string());
        if warned.lock().insert(key) {
            diag.emit(Diagnostic {
                kind: DiagnosticKind::SyncImplOnAsyncSpec,
                message: format!(
                    "sync implementation of async hook '{}' in plugin '{}'",
                    spec.name(),
                    call.plugin()
                ),
                hook: spec.name().to_string(),
                plugin: Some(call.plugin().to_string()),
            });
        }
    }
    call.invoke_async().await
}

async fn collect_async(
    spec: &HookSpec,
    collect: Collect,
    calls: &[PendingCall],
    target: Option<&str>,
    diag: &dyn Diagnostics,
    warned: &WarnedImpls,
) -> Result<Value, PlugmuxError> {
    let hook = spec.name();
    match collect.scope {
        Scope::All(reduce) => {
            let mut outcomes = Vec::with_capacity(calls.len());
            for call in calls {
                outcomes.push(invoke_checked(spec, call, diag, warned).await?);
            }
            match fold(reduce, outcomes) {
                Some(value) => Ok(value),
                None => absent(collect, hook),
            }
        }
        Scope::First => match calls.first() {
            Some(call) => invoke_checked(spec, call, diag, warned).await,
            None => absent(collect, hook),
        },
        Scope::Last => match calls.last() {
            Some(call) => invoke_checked(spec, call, diag, warned).await,
            None => absent(collect, hook),
        },
        Scope::FirstAvail => {
            for call in calls {
                let value = invoke_checked(spec, call, diag, warned).await?;
                if !value.is_null() {
                    return Ok(value);
                }
            }
            absent(collect, hook)
        }
        Scope::LastAvail => {
            for call in calls.iter().rev() {
                let value = invoke_checked(spec, call, diag, warned).await?;
                if !value.is_null() {
                    return Ok(value);
                }
            }
            absent(collect, hook)
        }
        Scope::Single => match pick_single(hook, calls, target, diag) {
            Some(call) => invoke_checked(spec, call, diag, warned).await,
            None => absent(collect, hook),
        },
    }
}
