//! Identifier newtypes.

use std::cmp::Ordering;
use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

// ============================================================================
// Node identity
// ============================================================================

/// Opaque identifier of a participant, e.g. `"n0"`, `"c3"` or `"seq-kv"`.
///
/// Ids order by their embedded numeric suffix first (`n2 < n10`) and fall
/// back to lexical order, so ids without a suffix sort after numbered ones.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the trailing decimal number of the id, if any.
    ///
    /// ```
    /// # use gossamer_wire::NodeId;
    /// assert_eq!(NodeId::new("n12").index(), Some(12));
    /// assert_eq!(NodeId::new("seq-kv").index(), None);
    /// ```
    pub fn index(&self) -> Option<u64> {
        let digits = self.0.len() - self.0.trim_end_matches(|c: char| c.is_ascii_digit()).len();
        if digits == 0 {
            return None;
        }
        self.0[self.0.len() - digits..].parse().ok()
    }
}

impl Ord for NodeId {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.index(), other.index()) {
            (Some(a), Some(b)) => a.cmp(&b).then_with(|| self.0.cmp(&other.0)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => self.0.cmp(&other.0),
        }
    }
}

impl PartialOrd for NodeId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for NodeId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl AsRef<str> for NodeId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// ============================================================================
// Message ids
// ============================================================================

/// Per-sender message identifier used for request/reply correlation.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct MsgId(u64);

impl MsgId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the id that follows this one.
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl Display for MsgId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for MsgId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<MsgId> for u64 {
    fn from(id: MsgId) -> Self {
        id.0
    }
}
