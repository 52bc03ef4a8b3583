//! Result strategies — how one dispatch folds many outcomes into a value.
//!
//! The named strategies form a three-axis product:
//!
//! - [`Scope`]: which implementations execute (`ALL*` run every one;
//!   `FIRST`/`LAST` run a single one; `*_AVAIL` walk until a non-null
//!   outcome; `SINGLE` runs the routed one).
//! - [`Reduce`]: how the outcomes of an `ALL` scope fold (full list,
//!   nulls removed, first/last, first/last non-null).
//! - [`OnEmpty`]: what an absent result becomes — an error, or `null`
//!   (the `TRY_` prefix).
//!
//! [`Collect`] is one point of that product; every named spelling from
//! `ALL` to `TRY_SINGLE` is an associated constant, and the canonical
//! names round-trip through [`FromStr`]/[`fmt::Display`] for declarative use.
//!
//! List-shaped reductions (`ALL`, `ALL_AVAILS`) yield an empty list when
//! nothing ran, so their `TRY_` spellings behave identically; only
//! scalar-shaped reductions participate in the empty policy.
//!
//! A [`Strategy`] is either a `Collect` or an opaque user reducer, which
//! receives the canonical call list **unexecuted** and owns execution.

use std::fmt;
use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::PlugmuxError;
use crate::hook::PendingCall;

/// How the outcomes of an all-impls execution fold into one value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Reduce {
    /// The ordered list of all outcomes, nulls included.
    List,
    /// The ordered list with nulls removed.
    AvailList,
    /// The first outcome.
    First,
    /// The last outcome.
    Last,
    /// The first non-null outcome.
    FirstAvail,
    /// The last non-null outcome.
    LastAvail,
}

/// Which implementations of the canonical list execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    /// Execute every eligible implementation, then fold with a [`Reduce`].
    All(Reduce),
    /// Execute only the first eligible implementation.
    First,
    /// Execute only the last eligible implementation.
    Last,
    /// Walk from the front, executing until one returns non-null.
    FirstAvail,
    /// Walk from the back, executing until one returns non-null.
    LastAvail,
    /// Execute exactly the implementation selected by the routing key,
    /// falling back to the last one (with a diagnostic) when absent.
    Single,
}

/// What an absent result becomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OnEmpty {
    /// Fail with [`PlugmuxError::ResultUnavailable`].
    Fail,
    /// Produce `null` (the `TRY_` prefix).
    Null,
}

/// A named result-collection strategy: one point of the
/// `Scope × Reduce × OnEmpty` product.
///
/// # Example
///
/// ```
/// use plugmux::Collect;
///
/// assert_eq!(Collect::TRY_FIRST_AVAIL.to_string(), "TRY_FIRST_AVAIL");
/// assert_eq!("ALL_LAST".parse::<Collect>().unwrap(), Collect::ALL_LAST);
/// assert_eq!(Collect::FIRST.forgiving(), Collect::TRY_FIRST);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Collect {
    /// Which implementations execute.
    pub scope: Scope,
    /// Empty-result policy.
    pub on_empty: OnEmpty,
}

macro_rules! collect_consts {
    ($($name:ident = ($scope:expr, $on_empty:expr);)*) => {
        $(
            #[doc = concat!("The `", stringify!($name), "` strategy.")]
            pub const $name: Collect = Collect { scope: $scope, on_empty: $on_empty };
        )*
    };
}

impl Collect {
    collect_consts! {
        ALL = (Scope::All(Reduce::List), OnEmpty::Fail);
        ALL_AVAILS = (Scope::All(Reduce::AvailList), OnEmpty::Fail);
        ALL_FIRST = (Scope::All(Reduce::First), OnEmpty::Fail);
        ALL_LAST = (Scope::All(Reduce::Last), OnEmpty::Fail);
        ALL_FIRST_AVAIL = (Scope::All(Reduce::FirstAvail), OnEmpty::Fail);
        ALL_LAST_AVAIL = (Scope::All(Reduce::LastAvail), OnEmpty::Fail);
        FIRST = (Scope::First, OnEmpty::Fail);
        LAST = (Scope::Last, OnEmpty::Fail);
        FIRST_AVAIL = (Scope::FirstAvail, OnEmpty::Fail);
        LAST_AVAIL = (Scope::LastAvail, OnEmpty::Fail);
        SINGLE = (Scope::Single, OnEmpty::Fail);
        TRY_ALL = (Scope::All(Reduce::List), OnEmpty::Null);
        TRY_ALL_AVAILS = (Scope::All(Reduce::AvailList), OnEmpty::Null);
        TRY_ALL_FIRST = (Scope::All(Reduce::First), OnEmpty::Null);
        TRY_ALL_LAST = (Scope::All(Reduce::Last), OnEmpty::Null);
        TRY_ALL_FIRST_AVAIL = (Scope::All(Reduce::FirstAvail), OnEmpty::Null);
        TRY_ALL_LAST_AVAIL = (Scope::All(Reduce::LastAvail), OnEmpty::Null);
        TRY_FIRST = (Scope::First, OnEmpty::Null);
        TRY_LAST = (Scope::Last, OnEmpty::Null);
        TRY_FIRST_AVAIL = (Scope::FirstAvail, OnEmpty::Null);
        TRY_LAST_AVAIL = (Scope::LastAvail, OnEmpty::Null);
        TRY_SINGLE = (Scope::Single, OnEmpty::Null);
    }

    /// The canonical spelling of this strategy.
    #[must_use]
    pub fn name(&self) -> &'static str {
        let base = match self.scope {
            Scope::All(Reduce::List) => "ALL",
            Scope::All(Reduce::AvailList) => "ALL_AVAILS",
            Scope::All(Reduce::First) => "ALL_FIRST",
            Scope::All(Reduce::Last) => "ALL_LAST",
            Scope::All(Reduce::FirstAvail) => "ALL_FIRST_AVAIL",
            Scope::All(Reduce::LastAvail) => "ALL_LAST_AVAIL",
            Scope::First => "FIRST",
            Scope::Last => "LAST",
            Scope::FirstAvail => "FIRST_AVAIL",
            Scope::LastAvail => "LAST_AVAIL",
            Scope::Single => "SINGLE",
        };
        match self.on_empty {
            OnEmpty::Fail => base,
            OnEmpty::Null => match base {
                "ALL" => "TRY_ALL",
                "ALL_AVAILS" => "TRY_ALL_AVAILS",
                "ALL_FIRST" => "TRY_ALL_FIRST",
                "ALL_LAST" => "TRY_ALL_LAST",
                "ALL_FIRST_AVAIL" => "TRY_ALL_FIRST_AVAIL",
                "ALL_LAST_AVAIL" => "TRY_ALL_LAST_AVAIL",
                "FIRST" => "TRY_FIRST",
                "LAST" => "TRY_LAST",
                "FIRST_AVAIL" => "TRY_FIRST_AVAIL",
                "LAST_AVAIL" => "TRY_LAST_AVAIL",
                _ => "TRY_SINGLE",
            },
        }
    }

    /// The `TRY_` form of this strategy.
    #[must_use]
    pub fn forgiving(mut self) -> Self {
        self.on_empty = OnEmpty::Null;
        self
    }

    /// Returns `true` for the `SINGLE`/`TRY_SINGLE` routing strategies.
    #[must_use]
    pub fn is_single(&self) -> bool {
        matches!(self.scope, Scope::Single)
    }
}

impl fmt::Display for Collect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Collect {
    type Err = PlugmuxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (try_, base) = match s.strip_prefix("TRY_") {
            Some(rest) => (true, rest),
            None => (false, s),
        };
        let scope = match base {
            "ALL" => Scope::All(Reduce::List),
            "ALL_AVAILS" => Scope::All(Reduce::AvailList),
            "ALL_FIRST" => Scope::All(Reduce::First),
            "ALL_LAST" => Scope::All(Reduce::Last),
            "ALL_FIRST_AVAIL" => Scope::All(Reduce::FirstAvail),
            "ALL_LAST_AVAIL" => Scope::All(Reduce::LastAvail),
            "FIRST" => Scope::First,
            "LAST" => Scope::Last,
            "FIRST_AVAIL" => Scope::FirstAvail,
            "LAST_AVAIL" => Scope::LastAvail,
            "SINGLE" => Scope::Single,
            _ => return Err(PlugmuxError::UnknownStrategy(s.to_string())),
        };
        Ok(Collect {
            scope,
            on_empty: if try_ { OnEmpty::Null } else { OnEmpty::Fail },
        })
    }
}

impl From<Collect> for String {
    fn from(value: Collect) -> Self {
        value.name().to_string()
    }
}

impl TryFrom<String> for Collect {
    type Error = PlugmuxError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Folds executed outcomes per a [`Reduce`]. `None` means "absent".
pub(crate) fn fold(reduce: Reduce, outcomes: Vec<Value>) -> Option<Value> {
    match reduce {
        Reduce::List => Some(Value::Array(outcomes)),
        Reduce::AvailList => Some(Value::Array(
            outcomes.into_iter().filter(|v| !v.is_null()).collect(),
        )),
        Reduce::First => outcomes.into_iter().next(),
        Reduce::Last => outcomes.into_iter().next_back(),
        Reduce::FirstAvail => outcomes.into_iter().find(|v| !v.is_null()),
        Reduce::LastAvail => outcomes.into_iter().rev().find(|v| !v.is_null()),
    }
}

/// A user-supplied reducer for synchronous specs.
///
/// Receives the canonical call list unexecuted; owns execution and may
/// invoke, reorder, or skip calls freely.
pub trait Reducer: Send + Sync {
    /// Reduces the pending calls to the dispatch result.
    fn reduce(&self, calls: Vec<PendingCall>) -> Result<Value, PlugmuxError>;
}

impl<F> Reducer for F
where
    F: Fn(Vec<PendingCall>) -> Result<Value, PlugmuxError> + Send + Sync,
{
    fn reduce(&self, calls: Vec<PendingCall>) -> Result<Value, PlugmuxError> {
        self(calls)
    }
}

/// A user-supplied reducer for asynchronous specs.
#[async_trait]
pub trait AsyncReducer: Send + Sync {
    /// Reduces the pending calls to the dispatch result.
    async fn reduce(&self, calls: Vec<PendingCall>) -> Result<Value, PlugmuxError>;
}

struct FnAsyncReducer<F>(F);

#[async_trait]
impl<F, Fut> AsyncReducer for FnAsyncReducer<F>
where
    F: Fn(Vec<PendingCall>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value, PlugmuxError>> + Send,
{
    async fn reduce(&self, calls: Vec<PendingCall>) -> Result<Value, PlugmuxError> {
        (self.0)(calls).await
    }
}

/// The result strategy of a hook spec: named collection or user reducer.
#[derive(Clone)]
pub enum Strategy {
    /// A named strategy from the `Scope × Reduce × OnEmpty` product.
    Collect(Collect),
    /// A user reducer for a synchronous spec.
    Reduce(Arc<dyn Reducer>),
    /// A user reducer for an asynchronous spec.
    ReduceAsync(Arc<dyn AsyncReducer>),
}

impl Strategy {
    /// Wraps a synchronous user reducer given as a closure.
    pub fn reduce<F>(reducer: F) -> Self
    where
        F: Fn(Vec<PendingCall>) -> Result<Value, PlugmuxError> + Send + Sync + 'static,
    {
        Self::Reduce(Arc::new(reducer))
    }

    /// Wraps an asynchronous user reducer given as a closure.
    pub fn reduce_async<F, Fut>(reducer: F) -> Self
    where
        F: Fn(Vec<PendingCall>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, PlugmuxError>> + Send + 'static,
    {
        Self::ReduceAsync(Arc::new(FnAsyncReducer(reducer)))
    }

    /// A short label for logging.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Collect(c) => c.name(),
            Self::Reduce(_) => "reducer",
            Self::ReduceAsync(_) => "async-reducer",
        }
    }
}

impl From<Collect> for Strategy {
    fn from(value: Collect) -> Self {
        Self::Collect(value)
    }
}

impl fmt::Debug for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Collect(c) => write!(f, "Strategy::Collect({})", c.name()),
            Self::Reduce(_) => f.write_str("Strategy::Reduce(..)"),
            Self::ReduceAsync(_) => f.write_str("Strategy::ReduceAsync(..)"),
        }
    }
}
