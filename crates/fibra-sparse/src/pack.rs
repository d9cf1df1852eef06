//! Packing: coordinate records to per-level storage
//!
//! The packer compiles an unordered stream of `(coordinate, value)` records
//! into a [`Storage`] laid out according to a [`Format`].
//!
//! # Algorithm
//!
//! 1. Validate arity, component kind and bounds of every record and map its
//!    coordinate to level order through the format's mode ordering.
//! 2. Stable-sort records lexicographically by level coordinates and resolve
//!    runs of equal coordinates with the [`DuplicatePolicy`].
//! 3. Walk the levels outermost to innermost, carrying each entry's position
//!    in the previous level (the root position is 0):
//!    - Dense level of extent `n`: `position = parent * n + coordinate`; only
//!      the extent is recorded
//!    - Compressed level: entries of the same parent are contiguous after the
//!      sort, so one scan emits each new `(parent, coordinate)` pair into
//!      `crd` and counts children per parent; a prefix sum of the counts is
//!      `pos`
//! 4. Scatter values into a zero-filled array indexed by the innermost
//!    position, so `values[k]` belongs to the path ending at position `k`.
//!
//! # Complexity
//!
//! O(nnz × log(nnz)) for the sort plus O(nnz × order + Σ level sizes) for
//! the level walk.
//!
//! # Examples
//!
//! ```
//! use fibra_core::{DataType, Format, Value};
//! use fibra_sparse::pack::Packer;
//!
//! let dims = [3, 3];
//! let records = [
//!     (vec![2, 1], Value::Float64(3.0)),
//!     (vec![0, 0], Value::Float64(1.0)),
//!     (vec![0, 2], Value::Float64(2.0)),
//! ];
//! let format = Format::csr();
//! let storage = Packer::new(&dims, &format, DataType::Float64)
//!     .pack(records.iter().map(|(c, v)| (c.as_slice(), *v)))
//!     .unwrap();
//!
//! let cols = storage.index().mode_index(1).unwrap();
//! assert_eq!(&cols.index_array(0).unwrap()[..], &[0, 2, 2, 3]);
//! assert_eq!(&cols.index_array(1).unwrap()[..], &[0, 2, 1]);
//! assert_eq!(storage.values().as_slice::<f64>().unwrap(), &[1.0, 2.0, 3.0]);
//! ```

use fibra_core::{DataType, FibraError, FibraResult, Format, ModeType, Value, ValueArray};
use tracing::{debug, trace};

use crate::config::DuplicatePolicy;
use crate::index::{ModeIndex, TensorIndex};
use crate::storage::Storage;

/// Largest position or extent representable in the `i32` index arrays
pub const MAX_INDEX: usize = i32::MAX as usize;

/// Compiles coordinate records into storage for one tensor shape and format
#[derive(Debug, Clone)]
pub struct Packer<'f> {
    dimensions: &'f [usize],
    format: &'f Format,
    dtype: DataType,
    policy: DuplicatePolicy,
}

impl<'f> Packer<'f> {
    /// Creates a packer with the default duplicate policy
    pub fn new(dimensions: &'f [usize], format: &'f Format, dtype: DataType) -> Self {
        Self {
            dimensions,
            format,
            dtype,
            policy: DuplicatePolicy::default(),
        }
    }

    /// Sets the duplicate resolution policy
    pub fn policy(mut self, policy: DuplicatePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Packs `records` into a new engine-owned storage.
    ///
    /// # Errors
    ///
    /// - [`FibraError::InvalidFormat`] if the format order differs from the
    ///   number of dimensions
    /// - [`FibraError::UnsupportedModeType`] for singleton levels
    /// - [`FibraError::DimensionMismatch`], [`FibraError::TypeMismatch`],
    ///   [`FibraError::OutOfBounds`] for malformed records
    /// - [`FibraError::DuplicateCoordinate`] under [`DuplicatePolicy::Reject`]
    /// - [`FibraError::IndexOverflow`] if a level outgrows the index range
    pub fn pack<'r, I>(&self, records: I) -> FibraResult<Storage<'static>>
    where
        I: IntoIterator<Item = (&'r [usize], Value)>,
    {
        self.merge(std::iter::empty::<(&[usize], Value)>(), records)
    }

    /// Packs `records` over previously `stored` entries.
    ///
    /// The policy resolves duplicates among `records` only. A resolved record
    /// then replaces the stored entry at its coordinate, or adds to it under
    /// [`DuplicatePolicy::Sum`]. Stored entries must be distinct.
    ///
    /// # Errors
    ///
    /// Same as [`Packer::pack`], for both record streams.
    pub fn merge<'s, 'r, S, I>(&self, stored: S, records: I) -> FibraResult<Storage<'static>>
    where
        S: IntoIterator<Item = (&'s [usize], Value)>,
        I: IntoIterator<Item = (&'r [usize], Value)>,
    {
        let order = self.dimensions.len();
        if self.format.order() != order {
            return Err(FibraError::invalid_format(format!(
                "format has {} levels but the tensor has {} dimensions",
                self.format.order(),
                order
            )));
        }
        self.format.ensure_supported()?;
        if let Some(&dim) = self.dimensions.iter().find(|&&d| d > MAX_INDEX) {
            return Err(FibraError::IndexOverflow { count: dim });
        }

        let (mut level_coords, mut values) = self.collect(stored)?;
        let merged = values.len();
        let (new_coords, new_values) = self.collect(records)?;
        let received = new_values.len();
        let (new_entries, new_values) =
            self.resolve_duplicates(&new_coords, new_values, self.policy)?;
        for (&r, value) in new_entries.iter().zip(new_values) {
            level_coords.extend_from_slice(&new_coords[r * order..(r + 1) * order]);
            values.push(value);
        }

        // The sort is stable, so new records follow the stored entry they hit
        let over_stored = match self.policy {
            DuplicatePolicy::Sum => DuplicatePolicy::Sum,
            DuplicatePolicy::LastWins | DuplicatePolicy::Reject => DuplicatePolicy::LastWins,
        };
        let (entries, values) = self.resolve_duplicates(&level_coords, values, over_stored)?;
        debug!(
            records = received,
            merged,
            entries = entries.len(),
            order,
            policy = ?self.policy,
            "packing coordinate records"
        );

        let coord = |e: usize, level: usize| level_coords[entries[e] * order + level];
        let mut positions = vec![0usize; entries.len()];
        let mut parent_count = 1usize;
        let mut modes = Vec::with_capacity(order);

        for level in 0..order {
            match self.format.mode_type(level) {
                ModeType::Dense => {
                    let extent = self.dimensions[self.format.mode_ordering()[level]];
                    for (e, pos) in positions.iter_mut().enumerate() {
                        *pos = *pos * extent + coord(e, level);
                    }
                    parent_count = parent_count
                        .checked_mul(extent)
                        .filter(|&n| n <= MAX_INDEX)
                        .ok_or(FibraError::IndexOverflow {
                            count: parent_count.saturating_mul(extent),
                        })?;
                    modes.push(ModeIndex::dense(extent as i32));
                }
                ModeType::Compressed => {
                    let mut pos = vec![0usize; parent_count + 1];
                    let mut crd: Vec<i32> = Vec::new();
                    let mut last: Option<(usize, usize)> = None;
                    for (e, p) in positions.iter_mut().enumerate() {
                        let child = (*p, coord(e, level));
                        if last != Some(child) {
                            // Coordinates are bounded by dimensions <= MAX_INDEX
                            crd.push(child.1 as i32);
                            pos[child.0 + 1] += 1;
                            last = Some(child);
                        }
                        *p = crd.len() - 1;
                    }
                    for i in 0..parent_count {
                        pos[i + 1] += pos[i];
                    }
                    parent_count = crd.len();
                    modes.push(ModeIndex::compressed(
                        pos.into_iter().map(|p| p as i32).collect::<Vec<_>>().into(),
                        crd.into(),
                    ));
                }
                other => {
                    return Err(FibraError::UnsupportedModeType {
                        mode_type: other,
                        level,
                    })
                }
            }
            trace!(level, positions = parent_count, "packed level");
        }

        let mut array = ValueArray::zeros(self.dtype, parent_count);
        for (&pos, &value) in positions.iter().zip(&values) {
            array.set(pos, value)?;
        }

        Storage::new(TensorIndex::new(modes, parent_count), array)
    }

    /// Validates records and lays out their level-order coordinates flat.
    fn collect<'r, I>(&self, records: I) -> FibraResult<(Vec<usize>, Vec<Value>)>
    where
        I: IntoIterator<Item = (&'r [usize], Value)>,
    {
        let order = self.dimensions.len();
        let ordering = self.format.mode_ordering();
        let records = records.into_iter();
        let (hint, _) = records.size_hint();
        let mut level_coords = Vec::with_capacity(hint * order);
        let mut values = Vec::with_capacity(hint);

        for (coordinate, value) in records {
            if coordinate.len() != order {
                return Err(FibraError::DimensionMismatch {
                    expected: order,
                    got: coordinate.len(),
                });
            }
            if value.data_type() != self.dtype {
                return Err(FibraError::type_mismatch(self.dtype, value.data_type()));
            }
            if coordinate
                .iter()
                .zip(self.dimensions)
                .any(|(&c, &d)| c >= d)
            {
                return Err(FibraError::OutOfBounds {
                    coordinate: coordinate.to_vec(),
                    dimensions: self.dimensions.to_vec(),
                });
            }
            level_coords.extend(ordering.iter().map(|&mode| coordinate[mode]));
            values.push(value);
        }
        Ok((level_coords, values))
    }

    /// Sorts records by level coordinates and collapses duplicates.
    ///
    /// Returns the representative record of each distinct coordinate, in
    /// sorted order, and its resolved value.
    fn resolve_duplicates(
        &self,
        level_coords: &[usize],
        values: Vec<Value>,
        policy: DuplicatePolicy,
    ) -> FibraResult<(Vec<usize>, Vec<Value>)> {
        let order = self.dimensions.len();
        let key = |r: usize| &level_coords[r * order..(r + 1) * order];

        let mut perm: Vec<usize> = (0..values.len()).collect();
        perm.sort_by(|&a, &b| key(a).cmp(key(b)));

        let mut entries: Vec<usize> = Vec::with_capacity(perm.len());
        let mut resolved: Vec<Value> = Vec::with_capacity(perm.len());
        for &r in &perm {
            let duplicate = entries.last().is_some_and(|&prev| key(prev) == key(r));
            if !duplicate {
                entries.push(r);
                resolved.push(values[r]);
                continue;
            }
            let slot = resolved.len() - 1;
            match policy {
                DuplicatePolicy::LastWins => resolved[slot] = values[r],
                DuplicatePolicy::Sum => resolved[slot] = resolved[slot].checked_add(values[r])?,
                DuplicatePolicy::Reject => {
                    let mut coordinate = vec![0; order];
                    for (level, &mode) in self.format.mode_ordering().iter().enumerate() {
                        coordinate[mode] = key(r)[level];
                    }
                    return Err(FibraError::DuplicateCoordinate { coordinate });
                }
            }
        }
        Ok((entries, resolved))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pack_f64(
        dims: &[usize],
        format: &Format,
        policy: DuplicatePolicy,
        records: &[(Vec<usize>, f64)],
    ) -> FibraResult<Storage<'static>> {
        Packer::new(dims, format, DataType::Float64)
            .policy(policy)
            .pack(records.iter().map(|(c, v)| (c.as_slice(), Value::Float64(*v))))
    }

    fn level_arrays(storage: &Storage<'_>, level: usize) -> Vec<Vec<i32>> {
        let mode = storage.index().mode_index(level).unwrap();
        (0..mode.num_index_arrays())
            .map(|i| mode.index_array(i).unwrap().to_vec())
            .collect()
    }

    #[test]
    fn test_pack_dense_compressed_matrix() {
        let records = vec![(vec![0, 0], 1.0), (vec![0, 2], 2.0), (vec![2, 1], 3.0)];
        let storage =
            pack_f64(&[3, 3], &Format::csr(), DuplicatePolicy::LastWins, &records).unwrap();

        assert_eq!(storage.index().size(), 3);
        assert_eq!(level_arrays(&storage, 0), vec![vec![3]]);
        assert_eq!(level_arrays(&storage, 1), vec![vec![0, 2, 2, 3], vec![0, 2, 1]]);
        assert_eq!(storage.values().as_slice::<f64>().unwrap(), &[1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_pack_csc_orders_by_column() {
        let records = vec![(vec![0, 0], 1.0), (vec![0, 2], 2.0), (vec![2, 1], 3.0)];
        let storage =
            pack_f64(&[3, 3], &Format::csc(), DuplicatePolicy::LastWins, &records).unwrap();

        assert_eq!(level_arrays(&storage, 1), vec![vec![0, 1, 2, 3], vec![0, 2, 0]]);
        assert_eq!(storage.values().as_slice::<f64>().unwrap(), &[1.0, 3.0, 2.0]);
    }

    #[test]
    fn test_pack_all_compressed_3d() {
        let records = vec![
            (vec![1, 2, 3], 7.0),
            (vec![0, 1, 2], 5.0),
            (vec![0, 1, 3], 6.0),
        ];
        let storage = pack_f64(
            &[3, 4, 5],
            &Format::sparse(3),
            DuplicatePolicy::LastWins,
            &records,
        )
        .unwrap();

        assert_eq!(level_arrays(&storage, 0), vec![vec![0, 2], vec![0, 1]]);
        assert_eq!(level_arrays(&storage, 1), vec![vec![0, 1, 2], vec![1, 2]]);
        assert_eq!(level_arrays(&storage, 2), vec![vec![0, 2, 3], vec![2, 3, 3]]);
        assert_eq!(storage.values().as_slice::<f64>().unwrap(), &[5.0, 6.0, 7.0]);
    }

    #[test]
    fn test_pack_compressed_outer_dense_inner() {
        let format = Format::new(vec![ModeType::Compressed, ModeType::Dense], vec![0, 1]).unwrap();
        let records = vec![(vec![2, 1], 4.0), (vec![0, 0], 1.0)];
        let storage = pack_f64(&[4, 3], &format, DuplicatePolicy::LastWins, &records).unwrap();

        assert_eq!(level_arrays(&storage, 0), vec![vec![0, 2], vec![0, 2]]);
        assert_eq!(storage.index().size(), 6);
        assert_eq!(
            storage.values().as_slice::<f64>().unwrap(),
            &[1.0, 0.0, 0.0, 0.0, 4.0, 0.0]
        );
    }

    #[test]
    fn test_pack_empty_records() {
        let storage = pack_f64(&[3, 3], &Format::csr(), DuplicatePolicy::LastWins, &[]).unwrap();
        assert_eq!(storage.index().size(), 0);
        assert_eq!(level_arrays(&storage, 1), vec![vec![0, 0, 0, 0], vec![]]);
        assert!(storage.values().is_empty());

        let dense = pack_f64(&[2, 2], &Format::dense(2), DuplicatePolicy::LastWins, &[]).unwrap();
        assert_eq!(dense.index().size(), 4);
        assert!(dense.values().as_slice::<f64>().unwrap().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_duplicate_policies() {
        let records = vec![(vec![1, 1], 1.0), (vec![0, 0], 5.0), (vec![1, 1], 2.0)];

        let last = pack_f64(&[2, 2], &Format::csr(), DuplicatePolicy::LastWins, &records).unwrap();
        assert_eq!(last.values().as_slice::<f64>().unwrap(), &[5.0, 2.0]);

        let sum = pack_f64(&[2, 2], &Format::csr(), DuplicatePolicy::Sum, &records).unwrap();
        assert_eq!(sum.values().as_slice::<f64>().unwrap(), &[5.0, 3.0]);

        let err = pack_f64(&[2, 2], &Format::csr(), DuplicatePolicy::Reject, &records).unwrap_err();
        assert_eq!(
            err,
            FibraError::DuplicateCoordinate {
                coordinate: vec![1, 1]
            }
        );
    }

    #[test]
    fn test_merge_resolves_policy_among_new_records() {
        let format = Format::dense(2);
        let stored = vec![
            (vec![0, 0], 1.0),
            (vec![0, 1], 0.0),
            (vec![1, 0], 0.0),
            (vec![1, 1], 0.0),
        ];
        let stored = stored.iter().map(|(c, v)| (c.as_slice(), Value::Float64(*v)));
        let fresh = [(vec![1, 1], 2.0), (vec![0, 0], 3.0)];
        let fresh = fresh.iter().map(|(c, v)| (c.as_slice(), Value::Float64(*v)));

        let storage = Packer::new(&[2, 2], &format, DataType::Float64)
            .policy(DuplicatePolicy::Reject)
            .merge(stored.clone(), fresh.clone())
            .unwrap();
        assert_eq!(storage.values().as_slice::<f64>().unwrap(), &[3.0, 0.0, 0.0, 2.0]);

        let summed = Packer::new(&[2, 2], &format, DataType::Float64)
            .policy(DuplicatePolicy::Sum)
            .merge(stored.clone(), fresh)
            .unwrap();
        assert_eq!(summed.values().as_slice::<f64>().unwrap(), &[4.0, 0.0, 0.0, 2.0]);

        let repeated = [(vec![1, 0], 5.0), (vec![1, 0], 6.0)];
        let err = Packer::new(&[2, 2], &format, DataType::Float64)
            .policy(DuplicatePolicy::Reject)
            .merge(stored, repeated.iter().map(|(c, v)| (c.as_slice(), Value::Float64(*v))))
            .unwrap_err();
        assert_eq!(err, FibraError::DuplicateCoordinate { coordinate: vec![1, 0] });
    }

    #[test]
    fn test_out_of_bounds_rejected() {
        let records = vec![(vec![0, 3], 1.0)];
        let err = pack_f64(&[3, 3], &Format::csr(), DuplicatePolicy::LastWins, &records).unwrap_err();
        assert!(matches!(err, FibraError::OutOfBounds { .. }));
    }

    #[test]
    fn test_arity_revalidated() {
        let records = vec![(vec![0], 1.0)];
        let err = pack_f64(&[3, 3], &Format::csr(), DuplicatePolicy::LastWins, &records).unwrap_err();
        assert_eq!(err, FibraError::DimensionMismatch { expected: 2, got: 1 });
    }

    #[test]
    fn test_singleton_unsupported() {
        let format = Format::new(vec![ModeType::Compressed, ModeType::Singleton], vec![0, 1]).unwrap();
        let err = pack_f64(&[2, 2], &format, DuplicatePolicy::LastWins, &[]).unwrap_err();
        assert!(matches!(err, FibraError::UnsupportedModeType { level: 1, .. }));
    }

    #[test]
    fn test_dense_overflow() {
        let dims = [1 << 20, 1 << 20];
        let err = pack_f64(&dims, &Format::dense(2), DuplicatePolicy::LastWins, &[]).unwrap_err();
        assert!(matches!(err, FibraError::IndexOverflow { .. }));
    }

    #[test]
    fn test_pack_scalar() {
        let format = Format::dense(0);
        let storage = Packer::new(&[], &format, DataType::Int32)
            .pack(std::iter::once((&[] as &[usize], Value::Int32(42))))
            .unwrap();
        assert_eq!(storage.index().order(), 0);
        assert_eq!(storage.index().size(), 1);
        assert_eq!(storage.value_at(0), Some(Value::Int32(42)));
    }
}
