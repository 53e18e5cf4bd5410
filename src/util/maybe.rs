use serde::{Deserialize, Serialize};

/// A field of a partial update: either sent by the client or left out.
///
/// Pair it with `#[serde(default)]` so a missing key becomes `Absent`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum MaybeAbsent<T> {
    Present(T),
    #[serde(skip_serializing)]
    Absent,
}

impl<T> Default for MaybeAbsent<T> {
    fn default() -> Self {
        Self::Absent
    }
}

impl<T> MaybeAbsent<T> {
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    pub fn as_option(&self) -> Option<&T> {
        match self {
            MaybeAbsent::Present(v) => Some(v),
            MaybeAbsent::Absent => None,
        }
    }

    /// The sent value, or `current` when the field was left out.
    pub fn unwrap_or(self, current: T) -> T {
        match self {
            MaybeAbsent::Present(v) => v,
            MaybeAbsent::Absent => current,
        }
    }
}
