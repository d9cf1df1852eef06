//! Property-based tests for packing and traversal
//!
//! These tests use proptest to check that any insert stream, packed into any
//! mix of dense and compressed levels, enumerates back to the resolved
//! inserts, and that packed CSR matches a reference CSR built directly.

use std::collections::BTreeMap;

use fibra_core::{DataType, Format, ModeType};
use fibra_sparse::{csr_arrays, DuplicatePolicy, Tensor, TensorOptions};
use proptest::prelude::*;

// ============================================================================
// Test Utilities
// ============================================================================

type Records = Vec<(Vec<usize>, i64)>;

/// Random records of a 3-mode tensor with small dimensions
fn records_strategy(dims: [usize; 3], max_nnz: usize) -> impl Strategy<Value = Records> {
    prop::collection::vec(
        ((0..dims[0], 0..dims[1], 0..dims[2]), -50i64..50),
        0..=max_nnz,
    )
    .prop_map(|records| {
        records
            .into_iter()
            .map(|((i, j, k), v)| (vec![i, j, k], v))
            .collect()
    })
}

/// Any of the 8 mode type combinations with any of the 6 level orderings
fn format_strategy() -> impl Strategy<Value = Format> {
    let mode_type = prop_oneof![Just(ModeType::Dense), Just(ModeType::Compressed)];
    (
        prop::collection::vec(mode_type, 3..=3),
        Just(vec![0usize, 1, 2]).prop_shuffle(),
    )
        .prop_map(|(types, ordering)| Format::new(types, ordering).unwrap())
}

/// Last write wins, keyed by coordinate
fn reference(records: &Records) -> BTreeMap<Vec<usize>, i64> {
    let mut map = BTreeMap::new();
    for (coord, v) in records {
        map.insert(coord.clone(), *v);
    }
    map
}

fn has_dense_level(format: &Format) -> bool {
    format.mode_types().contains(&ModeType::Dense)
}

// ============================================================================
// Insert / Pack / Traverse Properties
// ============================================================================

proptest! {
    /// Property: traversal yields exactly the resolved inserts (plus zero
    /// padding of dense levels) and exactly `size` entries
    #[test]
    fn prop_pack_traverse_matches_inserts(
        records in records_strategy([4, 3, 5], 25),
        format in format_strategy(),
    ) {
        let t = Tensor::new("T", DataType::Int64, &[4, 3, 5], format.clone()).unwrap();
        for (coord, v) in &records {
            t.insert(coord, *v).unwrap();
        }
        t.pack().unwrap();

        let size = t.storage().unwrap().index().size();
        let entries: Vec<_> = t.iter_typed::<i64>().unwrap().collect();
        prop_assert_eq!(entries.len(), size);

        let expected = reference(&records);
        let mut seen = BTreeMap::new();
        for (coord, v) in entries {
            prop_assert!(seen.insert(coord.clone(), v).is_none(), "coordinate {:?} yielded twice", coord);
        }
        for (coord, v) in &expected {
            prop_assert_eq!(seen.get(coord), Some(v));
        }
        for (coord, v) in &seen {
            if !expected.contains_key(coord) {
                prop_assert!(has_dense_level(&format));
                prop_assert_eq!(*v, 0);
            }
        }
    }

    /// Property: entries come out in storage order (level coordinates
    /// lexicographically increasing)
    #[test]
    fn prop_traversal_in_level_order(
        records in records_strategy([3, 4, 3], 20),
        format in format_strategy(),
    ) {
        let t = Tensor::new("T", DataType::Int64, &[3, 4, 3], format.clone()).unwrap();
        for (coord, v) in &records {
            t.insert(coord, *v).unwrap();
        }
        t.pack().unwrap();

        let keys: Vec<Vec<usize>> = t.iter().unwrap().map(|(c, _)| format.to_levels(&c)).collect();
        prop_assert!(keys.windows(2).all(|w| w[0] < w[1]));
    }

    /// Property: packing in two batches equals packing once
    #[test]
    fn prop_repack_equals_single_pack(
        first in records_strategy([4, 4, 4], 15),
        second in records_strategy([4, 4, 4], 15),
        format in format_strategy(),
    ) {
        let once = Tensor::new("A", DataType::Int64, &[4, 4, 4], format.clone()).unwrap();
        let twice = Tensor::new("B", DataType::Int64, &[4, 4, 4], format).unwrap();
        for (coord, v) in first.iter().chain(&second) {
            once.insert(coord, *v).unwrap();
        }
        once.pack().unwrap();

        for (coord, v) in &first {
            twice.insert(coord, *v).unwrap();
        }
        twice.pack().unwrap();
        for (coord, v) in &second {
            twice.insert(coord, *v).unwrap();
        }
        twice.pack().unwrap();

        prop_assert!(once.equals(&twice));
    }

    /// Property: summing duplicates equals summing per coordinate
    #[test]
    fn prop_sum_policy(records in records_strategy([3, 3, 3], 30)) {
        let options = TensorOptions::new().duplicate_policy(DuplicatePolicy::Sum);
        let t = Tensor::with_options("S", DataType::Int64, &[3, 3, 3], Format::sparse(3), options).unwrap();
        let mut expected: BTreeMap<Vec<usize>, i64> = BTreeMap::new();
        for (coord, v) in &records {
            t.insert(coord, *v).unwrap();
            *expected.entry(coord.clone()).or_insert(0) += v;
        }
        t.pack().unwrap();

        let got: BTreeMap<_, _> = t.iter_typed::<i64>().unwrap().collect();
        prop_assert_eq!(got, expected);
    }

    /// Property: transpose twice is the identity on values
    #[test]
    fn prop_transpose_roundtrip(
        records in records_strategy([3, 4, 5], 20),
        format in format_strategy(),
    ) {
        let t = Tensor::new("T", DataType::Int64, &[3, 4, 5], format).unwrap();
        for (coord, v) in &records {
            t.insert(coord, *v).unwrap();
        }
        t.pack().unwrap();

        let tt = t.transpose(&[2, 0, 1]).unwrap();
        let tt_dims = tt.dimensions();
        prop_assert_eq!(tt_dims.as_slice(), &[5, 3, 4]);
        let back = tt.transpose(&[1, 2, 0]).unwrap();
        prop_assert!(back.equals(&t));
    }
}

// ============================================================================
// CSR Export Properties
// ============================================================================

proptest! {
    /// Property: packed CSR arrays equal a reference CSR built from the
    /// deduplicated triples sorted by row then column
    #[test]
    fn prop_csr_export_matches_reference(
        triples in prop::collection::vec(((0..6usize, 0..7usize), -10.0..10.0f64), 0..30)
    ) {
        let t = Tensor::new("A", DataType::Float64, &[6, 7], Format::csr()).unwrap();
        let mut reference: BTreeMap<(usize, usize), f64> = BTreeMap::new();
        for ((i, j), v) in &triples {
            t.insert(&[*i, *j], *v).unwrap();
            reference.insert((*i, *j), *v);
        }
        t.pack().unwrap();

        let mut rowptr = vec![0i32; 7];
        let mut colidx = Vec::new();
        let mut vals = Vec::new();
        for (&(i, j), &v) in &reference {
            rowptr[i + 1] += 1;
            colidx.push(j as i32);
            vals.push(v);
        }
        for i in 0..6 {
            rowptr[i + 1] += rowptr[i];
        }

        let csr = csr_arrays::<f64>(&t).unwrap();
        prop_assert_eq!(csr.ptr(), rowptr.as_slice());
        prop_assert_eq!(csr.idx(), colidx.as_slice());
        prop_assert_eq!(csr.values(), vals.as_slice());
    }

    /// Property: dense export agrees with traversal
    #[test]
    fn prop_to_dense_matches_entries(
        triples in prop::collection::vec(((0..5usize, 0..5usize), 1i32..100), 0..20)
    ) {
        let t = Tensor::new("D", DataType::Int32, &[5, 5], Format::dcsr()).unwrap();
        for ((i, j), v) in &triples {
            t.insert(&[*i, *j], *v).unwrap();
        }
        t.pack().unwrap();

        let dense = t.to_dense::<i32>().unwrap();
        let nnz = t.iter().unwrap().count();
        prop_assert_eq!(dense.iter().filter(|&&v| v != 0).count(), nnz);
        for (coord, v) in t.iter_typed::<i32>().unwrap() {
            prop_assert_eq!(dense[coord.as_slice()], v);
        }
    }
}
