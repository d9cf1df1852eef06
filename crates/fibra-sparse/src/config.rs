//! Tensor configuration

/// How the packer resolves several inserts at the same coordinate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DuplicatePolicy {
    /// The most recent insert overwrites earlier ones
    #[default]
    LastWins,
    /// Colliding values are summed
    Sum,
    /// Packing fails with [`fibra_core::FibraError::DuplicateCoordinate`]
    Reject,
}

/// Per-tensor options
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TensorOptions {
    /// Duplicate resolution applied by `pack` (default: last write wins)
    pub duplicate_policy: DuplicatePolicy,
    /// Records reserved in the coordinate buffer at construction (default: 0)
    pub initial_capacity: usize,
}

impl Default for TensorOptions {
    fn default() -> Self {
        Self {
            duplicate_policy: DuplicatePolicy::LastWins,
            initial_capacity: 0,
        }
    }
}

impl TensorOptions {
    /// Create default options
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the duplicate resolution policy
    pub fn duplicate_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.duplicate_policy = policy;
        self
    }

    /// Sum colliding inserts
    pub fn sum_duplicates(self) -> Self {
        self.duplicate_policy(DuplicatePolicy::Sum)
    }

    /// Set the number of records reserved up front
    pub fn initial_capacity(mut self, records: usize) -> Self {
        self.initial_capacity = records;
        self
    }
}
