//! Scoped enable/disable — temporary plugin selection with guaranteed restore.
//!
//! [`ScopeSelector`] describes a temporary change to the enabled set:
//!
//! - [`ScopeSelector::Unchanged`] — no change.
//! - [`ScopeSelector::Only`] — exactly the listed plugins are enabled,
//!   everything else disabled.
//! - [`ScopeSelector::Adjust`] — start from the current state, then apply
//!   `+name` enables and `-name` disables.
//!
//! [`ScopeSelector::parse`] classifies a list of strings; mixing bare and
//! prefixed items in one list is rejected.
//!
//! [`Kernel::scoped`](crate::Kernel::scoped) applies a selector and
//! returns a [`ScopedPlugins`] guard. Dropping the guard restores the
//! enabled set exactly as it was at entry, on every exit path — early
//! returns and panics included.

use serde::{Deserialize, Serialize};

use crate::error::PlugmuxError;
use crate::kernel::Kernel;

/// One adjustment of an [`ScopeSelector::Adjust`] list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScopeOp {
    /// Enable the named plugin (`+name`).
    Enable(String),
    /// Disable the named plugin (`-name`).
    Disable(String),
}

/// A temporary change to the enabled set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScopeSelector {
    /// Leave the enabled set as it is.
    Unchanged,
    /// Enable exactly these plugins; disable all others.
    Only(Vec<String>),
    /// Apply enables and disables on top of the current state.
    Adjust(Vec<ScopeOp>),
}

impl ScopeSelector {
    /// Builds an [`Only`](Self::Only) selector.
    pub fn only<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Only(names.into_iter().map(Into::into).collect())
    }

    /// Classifies a list of names into a selector.
    ///
    /// Items prefixed `+`/`-` become an [`Adjust`](Self::Adjust) list;
    /// bare items become an [`Only`](Self::Only) list. Mixing the two
    /// forms fails with [`PlugmuxError::InvalidScope`].
    ///
    /// # Example
    ///
    /// ```
    /// use plugmux::{ScopeOp, ScopeSelector};
    ///
    /// let only = ScopeSelector::parse(["a", "b"]).unwrap();
    /// assert_eq!(only, ScopeSelector::only(["a", "b"]));
    ///
    /// let diff = ScopeSelector::parse(["+a", "-b"]).unwrap();
    /// assert_eq!(
    ///     diff,
    ///     ScopeSelector::Adjust(vec![
    ///         ScopeOp::Enable("a".into()),
    ///         ScopeOp::Disable("b".into()),
    ///     ])
    /// );
    ///
    /// assert!(ScopeSelector::parse(["a", "-b"]).is_err());
    /// ```
    pub fn parse<I, S>(items: I) -> Result<Self, PlugmuxError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut bare: Vec<String> = Vec::new();
        let mut ops: Vec<ScopeOp> = Vec::new();

        for item in items {
            let item = item.as_ref();
            if let Some(name) = item.strip_prefix('+') {
                ops.push(ScopeOp::Enable(name.to_string()));
            } else if let Some(name) = item.strip_prefix('-') {
                ops.push(ScopeOp::Disable(name.to_string()));
            } else {
                bare.push(item.to_string());
            }
        }

        match (bare.is_empty(), ops.is_empty()) {
            (false, false) => Err(PlugmuxError::InvalidScope(
                "cannot mix bare names with '+'/'-' prefixed names".into(),
            )),
            (true, false) => Ok(Self::Adjust(ops)),
            // An empty list is an empty Only: everything disabled.
            (_, true) => Ok(Self::Only(bare)),
        }
    }
}

/// RAII guard restoring the enabled set captured at scope entry.
#[must_use = "dropping the guard immediately restores the previous enabled set"]
pub struct ScopedPlugins<'a> {
    kernel: &'a Kernel,
    saved: Vec<(String, bool)>,
}

impl<'a> ScopedPlugins<'a> {
    pub(crate) fn new(kernel: &'a Kernel, saved: Vec<(String, bool)>) -> Self {
        Self { kernel, saved }
    }
}

impl Drop for ScopedPlugins<'_> {
    fn drop(&mut self) {
        self.kernel.restore_enabled(&self.saved);
    }
}

impl std::fmt::Debug for ScopedPlugins<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopedPlugins")
            .field("saved", &self.saved)
            .finish()
    }
}
