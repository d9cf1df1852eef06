//! Coordinate buffer
//!
//! Pending inserts are kept as fixed-size records (`order` coordinates plus
//! one [`Value`]) in two flat vectors. Nothing is sorted, deduplicated or
//! bounds-checked here; the packer does that when the buffer is compiled.
//! Clearing keeps the allocation so the next burst of inserts reuses it.

use fibra_core::{DataType, FibraError, FibraResult, Value};

/// Unordered `(coordinate, value)` records awaiting a pack
#[derive(Debug, Clone)]
pub struct CoordinateBuffer {
    order: usize,
    dtype: DataType,
    /// Record `r` owns `coords[r * order..(r + 1) * order]`
    coords: Vec<usize>,
    values: Vec<Value>,
}

impl CoordinateBuffer {
    /// Creates an empty buffer for tensors of the given order and type
    pub fn new(order: usize, dtype: DataType) -> Self {
        Self {
            order,
            dtype,
            coords: Vec::new(),
            values: Vec::new(),
        }
    }

    /// Creates an empty buffer with room for `records` inserts
    pub fn with_capacity(order: usize, dtype: DataType, records: usize) -> Self {
        let mut buffer = Self::new(order, dtype);
        buffer.reserve(records);
        buffer
    }

    #[inline]
    pub fn order(&self) -> usize {
        self.order
    }

    #[inline]
    pub fn data_type(&self) -> DataType {
        self.dtype
    }

    /// Number of buffered records
    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Number of records the buffer holds without reallocating
    #[inline]
    pub fn capacity(&self) -> usize {
        self.values.capacity()
    }

    /// Pre-grows the buffer for `additional` more records
    pub fn reserve(&mut self, additional: usize) {
        self.coords.reserve(additional.saturating_mul(self.order));
        self.values.reserve(additional);
    }

    /// Appends one record.
    ///
    /// The buffer is unchanged on error.
    ///
    /// # Errors
    ///
    /// - [`FibraError::DimensionMismatch`] if `coordinate.len() != order`
    /// - [`FibraError::TypeMismatch`] if `value` is not of the buffer's kind
    pub fn push(&mut self, coordinate: &[usize], value: Value) -> FibraResult<()> {
        if coordinate.len() != self.order {
            return Err(FibraError::DimensionMismatch {
                expected: self.order,
                got: coordinate.len(),
            });
        }
        if value.data_type() != self.dtype {
            return Err(FibraError::type_mismatch(self.dtype, value.data_type()));
        }
        self.coords.extend_from_slice(coordinate);
        self.values.push(value);
        Ok(())
    }

    /// Coordinate of record `r`
    #[inline]
    pub fn coordinate(&self, r: usize) -> &[usize] {
        &self.coords[r * self.order..(r + 1) * self.order]
    }

    /// Value of record `r`
    #[inline]
    pub fn value(&self, r: usize) -> Value {
        self.values[r]
    }

    /// Iterates over records in insertion order
    pub fn records(&self) -> impl Iterator<Item = (&[usize], Value)> + '_ {
        (0..self.len()).map(move |r| (self.coordinate(r), self.values[r]))
    }

    /// Drops every record, keeping capacity
    pub fn clear(&mut self) {
        self.coords.clear();
        self.values.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_and_read_back() {
        let mut buffer = CoordinateBuffer::new(2, DataType::Float64);
        buffer.push(&[0, 1], Value::Float64(1.0)).unwrap();
        buffer.push(&[2, 0], Value::Float64(2.0)).unwrap();

        assert_eq!(buffer.len(), 2);
        assert_eq!(buffer.coordinate(1), &[2, 0]);
        assert_eq!(buffer.value(0), Value::Float64(1.0));
        let records: Vec<_> = buffer.records().map(|(c, v)| (c.to_vec(), v)).collect();
        assert_eq!(
            records,
            vec![
                (vec![0, 1], Value::Float64(1.0)),
                (vec![2, 0], Value::Float64(2.0))
            ]
        );
    }

    #[test]
    fn test_rejected_push_leaves_buffer_untouched() {
        let mut buffer = CoordinateBuffer::new(2, DataType::Int32);
        buffer.push(&[0, 0], Value::Int32(1)).unwrap();

        assert!(matches!(
            buffer.push(&[1], Value::Int32(2)),
            Err(FibraError::DimensionMismatch { expected: 2, got: 1 })
        ));
        assert!(matches!(
            buffer.push(&[1, 1], Value::Float64(2.0)),
            Err(FibraError::TypeMismatch { .. })
        ));
        assert_eq!(buffer.len(), 1);
        assert_eq!(buffer.coordinate(0), &[0, 0]);
    }

    #[test]
    fn test_clear_keeps_capacity() {
        let mut buffer = CoordinateBuffer::with_capacity(3, DataType::Int64, 64);
        let capacity = buffer.capacity();
        assert!(capacity >= 64);
        for i in 0..10 {
            buffer.push(&[i, i, i], Value::Int64(i as i64)).unwrap();
        }
        buffer.clear();
        assert!(buffer.is_empty());
        assert_eq!(buffer.capacity(), capacity);
    }

    #[test]
    fn test_order_zero_records() {
        let mut buffer = CoordinateBuffer::new(0, DataType::Float32);
        buffer.push(&[], Value::Float32(4.0)).unwrap();
        assert_eq!(buffer.coordinate(0), &[] as &[usize]);
        assert_eq!(buffer.value(0), Value::Float32(4.0));
    }
}
