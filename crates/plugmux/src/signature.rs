//! Hook signatures — ordered parameter-name lists.
//!
//! A [`Signature`] records the parameter names of a hook, in order.
//! Comparison ignores everything else: two signatures match when their
//! receiver-erased name sequences are equal elementwise.
//!
//! # Receiver
//!
//! The optional first parameter of a spec is a *receiver*: callers never
//! supply it and the dispatcher delivers it as `null` to implementations
//! that declare it. A parameter list whose first entry is the conventional
//! name [`RECEIVER_PARAM`] is treated as receiver-bearing automatically;
//! any other leading name can be marked with [`Signature::with_receiver`].

use serde::{Deserialize, Serialize};

/// Conventional name of the receiver parameter.
pub const RECEIVER_PARAM: &str = "self";

/// The ordered parameter-name list of a hook spec or implementation.
///
/// # Example
///
/// ```
/// use plugmux::Signature;
///
/// // A spec with a receiver and two parameters...
/// let spec = Signature::new(["self", "a", "b"]);
/// // ...matches an impl that omits the receiver,
/// assert!(spec.matches(&Signature::new(["a", "b"])));
/// // ...and one that includes it.
/// assert!(spec.matches(&Signature::new(["self", "a", "b"])));
/// // Parameter order matters.
/// assert!(!spec.matches(&Signature::new(["b", "a"])));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    params: Vec<String>,
    #[serde(default)]
    receiver: bool,
}

impl Signature {
    /// Creates a signature from ordered parameter names.
    pub fn new<I, S>(params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            params: params.into_iter().map(Into::into).collect(),
            receiver: false,
        }
    }

    /// A signature with no parameters.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            params: Vec::new(),
            receiver: false,
        }
    }

    /// Marks the first parameter as the receiver regardless of its name.
    #[must_use]
    pub fn with_receiver(mut self) -> Self {
        self.receiver = true;
        self
    }

    /// Returns `true` if the first parameter is a receiver.
    ///
    /// Either marked explicitly, or named [`RECEIVER_PARAM`].
    #[must_use]
    pub fn has_receiver(&self) -> bool {
        self.receiver || self.params.first().is_some_and(|p| p == RECEIVER_PARAM)
    }

    /// The raw parameter names, receiver included.
    #[must_use]
    pub fn params(&self) -> &[String] {
        &self.params
    }

    /// The parameter names with the leading receiver stripped.
    #[must_use]
    pub fn erased(&self) -> &[String] {
        if self.has_receiver() && !self.params.is_empty() {
            &self.params[1..]
        } else {
            &self.params
        }
    }

    /// Number of parameters a caller is expected to supply.
    #[must_use]
    pub fn arity(&self) -> usize {
        self.erased().len()
    }

    /// Returns `true` when both receiver-erased name lists are equal.
    #[must_use]
    pub fn matches(&self, other: &Signature) -> bool {
        self.erased() == other.erased()
    }
}

impl Default for Signature {
    fn default() -> Self {
        Self::empty()
    }
}
