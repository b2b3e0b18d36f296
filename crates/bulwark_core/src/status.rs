//! Status code sets used by validators and retry triggers.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// True for any status in `200..=299`.
pub fn is_success(status: u16) -> bool {
    (200..300).contains(&status)
}

/// An ordered set of HTTP status codes.
///
/// # Examples
///
/// ```
/// use bulwark_core::StatusSet;
///
/// let set = StatusSet::from([404, 200]);
/// assert!(set.contains(404));
/// assert_eq!(set.to_string(), "200, 404");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatusSet(BTreeSet<u16>);

impl StatusSet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Membership test.
    pub fn contains(&self, status: u16) -> bool {
        self.0.contains(&status)
    }

    /// Adds a status.
    pub fn insert(&mut self, status: u16) -> bool {
        self.0.insert(status)
    }

    /// True when no status is present.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates statuses in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = u16> + '_ {
        self.0.iter().copied()
    }
}

impl std::fmt::Display for StatusSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self.0.iter().map(u16::to_string).collect();
        write!(f, "{}", parts.join(", "))
    }
}

impl<const N: usize> From<[u16; N]> for StatusSet {
    fn from(codes: [u16; N]) -> Self {
        Self(codes.into_iter().collect())
    }
}

impl From<u16> for StatusSet {
    fn from(code: u16) -> Self {
        Self(BTreeSet::from([code]))
    }
}

impl FromIterator<u16> for StatusSet {
    fn from_iter<I: IntoIterator<Item = u16>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
