use core::fmt;
use core::num::NonZeroU64;

/// Opaque, stable identifier for an entity in a graph.
///
/// - graph-unique and never reused, so a dangling handle can only ever
///   resolve to "no entity", not to a different one
/// - `NonZero` enables `Option<Handle>` to be pointer-optimized
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Handle(NonZeroU64);

impl Handle {
    /// Create a Handle from a raw nonzero value.
    ///
    /// Returns `None` for zero. Graphs allocate handles from a monotonic
    /// counter starting at 1; this constructor exists for deserialization
    /// and tests.
    pub fn from_raw(raw: u64) -> Option<Self> {
        NonZeroU64::new(raw).map(Self)
    }

    /// Recover the raw value.
    pub fn raw(self) -> u64 {
        self.0.get()
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handle({})", self.0.get())
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.get())
    }
}

/// Index of a port slot on an entity (inlet/outlet/branch positions).
pub type PortIndex = usize;

/// Index of a field in an entity's schema-ordered field vector.
pub type FieldIndex = usize;
