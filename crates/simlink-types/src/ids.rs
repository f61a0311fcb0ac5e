//! Sequence identifiers for the exchange protocol.
//!
//! Every exchange between the simulation process and the bridge carries a
//! [`SequenceId`]. The bridge owns the only counter; the simulation echoes
//! back the id it was last handed so that a dropped or duplicated frame is
//! detected as a desync instead of being silently applied.

use serde::{Deserialize, Serialize};

/// Monotonically increasing exchange counter, one per session.
///
/// Serialized as a bare integer (`"sequenceId": 3`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SequenceId(pub u64);

impl SequenceId {
    /// The id the simulation presents on its very first exchange.
    pub const INITIAL: Self = Self(0);

    /// Return the id that follows this one, or `None` on overflow.
    pub const fn next(self) -> Option<Self> {
        match self.0.checked_add(1) {
            Some(v) => Some(Self(v)),
            None => None,
        }
    }

    /// Return the inner integer value.
    pub const fn into_inner(self) -> u64 {
        self.0
    }
}

impl core::fmt::Display for SequenceId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for SequenceId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl From<SequenceId> for u64 {
    fn from(id: SequenceId) -> Self {
        id.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_increments_by_one() {
        assert_eq!(SequenceId::INITIAL.next(), Some(SequenceId(1)));
        assert_eq!(SequenceId(41).next(), Some(SequenceId(42)));
    }

    #[test]
    fn next_overflow_is_none() {
        assert_eq!(SequenceId(u64::MAX).next(), None);
    }

    #[test]
    fn serializes_as_bare_integer() {
        let json = serde_json::to_string(&SequenceId(7)).ok();
        assert_eq!(json.as_deref(), Some("7"));
    }
}
