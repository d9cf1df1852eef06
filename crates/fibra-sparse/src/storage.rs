//! Materialized tensor storage
//!
//! A [`Storage`] bundles a [`TensorIndex`] with the flat value array it
//! addresses. Both may be engine-owned (produced by packing or copied in) or
//! borrowed from the caller for zero-copy interop; see
//! [`fibra_core::Ownership`]. Dropping a storage releases the engine-owned
//! arrays exactly once and leaves borrowed arrays to their owner.

use fibra_core::{DataType, FibraError, FibraResult, Ownership, Value, ValueArray};

use crate::index::TensorIndex;

/// Index plus values of a packed tensor
#[derive(Debug)]
pub struct Storage<'a> {
    index: TensorIndex<'a>,
    values: ValueArray<'a>,
}

impl<'a> Storage<'a> {
    /// Creates a storage from an index and a value array.
    ///
    /// # Errors
    ///
    /// [`FibraError::InvalidIndex`] if the value array length differs from
    /// the index size.
    pub fn new(index: TensorIndex<'a>, values: ValueArray<'a>) -> FibraResult<Self> {
        if values.len() != index.size() {
            return Err(FibraError::invalid_index(format!(
                "index addresses {} values but {} are provided",
                index.size(),
                values.len()
            )));
        }
        Ok(Self { index, values })
    }

    #[inline]
    pub fn index(&self) -> &TensorIndex<'a> {
        &self.index
    }

    #[inline]
    pub fn index_mut(&mut self) -> &mut TensorIndex<'a> {
        &mut self.index
    }

    #[inline]
    pub fn values(&self) -> &ValueArray<'a> {
        &self.values
    }

    #[inline]
    pub fn values_mut(&mut self) -> &mut ValueArray<'a> {
        &mut self.values
    }

    /// Replaces the index, dropping the previous one
    pub fn set_index(&mut self, index: TensorIndex<'a>) {
        self.index = index;
    }

    /// Replaces the value array, dropping the previous one
    pub fn set_values(&mut self, values: ValueArray<'a>) {
        self.values = values;
    }

    /// Component type of the values
    #[inline]
    pub fn data_type(&self) -> DataType {
        self.values.data_type()
    }

    /// Value stored at leaf position `pos`
    #[inline]
    pub fn value_at(&self, pos: usize) -> Option<Value> {
        self.values.get(pos)
    }

    /// Ownership of the value array
    pub fn values_ownership(&self) -> Ownership {
        self.values.ownership()
    }

    /// True if every array is engine-owned
    pub fn is_owned(&self) -> bool {
        self.values.ownership() == Ownership::Owned
            && self
                .index
                .mode_indices()
                .iter()
                .flat_map(|m| m.ownership())
                .all(|o| o == Ownership::Owned)
    }

    /// Zeroes every value, leaving the index untouched
    pub fn zero(&mut self) {
        self.values.fill_zero();
    }
}
