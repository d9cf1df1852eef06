//! Level index structures
//!
//! A [`TensorIndex`] holds one [`ModeIndex`] per physical level plus the
//! number of leaf positions (`size`), which is both the length of the value
//! array and the number of elements a traversal produces.
//!
//! # Structure
//!
//! - Dense level: a single synthetic array `[extent]`; children of parent
//!   position `p` occupy positions `p * extent .. (p + 1) * extent`
//! - Compressed level: `[pos, crd]` where `pos` has one entry per parent
//!   position plus one, and `crd[pos[p]..pos[p + 1]]` are the coordinates of
//!   the children of `p`
//!
//! # Example
//!
//! A 3×3 CSR matrix with nonzeros at (0,0), (0,2), (2,1):
//!
//! - level 0 (rows, dense): `[3]`
//! - level 1 (cols, compressed): `pos = [0, 2, 2, 3]`, `crd = [0, 2, 1]`
//!
//! ```
//! use fibra_sparse::index::make_csr_index;
//!
//! let index = make_csr_index(vec![0, 2, 2, 3].into(), vec![0, 2, 1].into()).unwrap();
//! assert_eq!(index.order(), 2);
//! assert_eq!(index.size(), 3);
//! assert_eq!(&index.mode_index(0).unwrap().index_array(0).unwrap()[..], &[3]);
//! ```

use fibra_core::{FibraError, FibraResult, IndexArray, Ownership};

/// Index arrays of one level
#[derive(Debug)]
pub struct ModeIndex<'a> {
    arrays: Vec<IndexArray<'a>>,
}

impl ModeIndex<'static> {
    /// Dense level of the given extent
    pub fn dense(extent: i32) -> Self {
        Self {
            arrays: vec![vec![extent].into()],
        }
    }
}

impl<'a> ModeIndex<'a> {
    /// Creates a mode index from raw arrays
    pub fn new(arrays: Vec<IndexArray<'a>>) -> Self {
        Self { arrays }
    }

    /// Compressed level from a position and a coordinate array
    pub fn compressed(pos: IndexArray<'a>, crd: IndexArray<'a>) -> Self {
        Self {
            arrays: vec![pos, crd],
        }
    }

    /// Number of index arrays this level exposes
    #[inline]
    pub fn num_index_arrays(&self) -> usize {
        self.arrays.len()
    }

    /// Returns index array `i`.
    ///
    /// Compressed levels expose `0 = pos`, `1 = crd`; dense levels expose
    /// only `0 = [extent]`.
    ///
    /// # Errors
    ///
    /// [`FibraError::InvalidModeAccess`] if the level has no array `i`.
    pub fn index_array(&self, i: usize) -> FibraResult<&IndexArray<'a>> {
        self.arrays.get(i).ok_or(FibraError::InvalidModeAccess {
            array: i,
            available: self.arrays.len(),
        })
    }

    /// Mutable access to index array `i`.
    ///
    /// # Errors
    ///
    /// [`FibraError::InvalidModeAccess`] if the level has no array `i`.
    pub fn index_array_mut(&mut self, i: usize) -> FibraResult<&mut IndexArray<'a>> {
        let available = self.arrays.len();
        self.arrays
            .get_mut(i)
            .ok_or(FibraError::InvalidModeAccess { array: i, available })
    }

    /// Ownership tags of every array of this level
    pub fn ownership(&self) -> Vec<Ownership> {
        self.arrays.iter().map(|a| a.ownership()).collect()
    }
}

/// Index of a packed tensor: one mode index per level
#[derive(Debug)]
pub struct TensorIndex<'a> {
    modes: Vec<ModeIndex<'a>>,
    /// Number of leaf positions
    size: usize,
}

impl<'a> TensorIndex<'a> {
    /// Creates an index from its levels and the number of leaf positions
    pub fn new(modes: Vec<ModeIndex<'a>>, size: usize) -> Self {
        Self { modes, size }
    }

    /// Number of levels
    #[inline]
    pub fn order(&self) -> usize {
        self.modes.len()
    }

    /// Number of stored leaf entries (value slots)
    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Mode index at `level`.
    ///
    /// # Errors
    ///
    /// [`FibraError::InvalidIndex`] if the index has fewer levels.
    pub fn mode_index(&self, level: usize) -> FibraResult<&ModeIndex<'a>> {
        self.modes.get(level).ok_or_else(|| {
            FibraError::invalid_index(format!(
                "level {} requested from an index of order {}",
                level,
                self.modes.len()
            ))
        })
    }

    /// All mode indices, outermost first
    #[inline]
    pub fn mode_indices(&self) -> &[ModeIndex<'a>] {
        &self.modes
    }

    #[inline]
    pub(crate) fn mode_indices_mut(&mut self) -> &mut [ModeIndex<'a>] {
        &mut self.modes
    }
}

/// Checks the CSR-style invariants of a compressed level.
///
/// `pos` must start at 0, be non-decreasing, and end at `crd_len`.
pub(crate) fn validate_segments(pos: &[i32], crd_len: usize) -> FibraResult<()> {
    let first = *pos
        .first()
        .ok_or_else(|| FibraError::invalid_index("position array is empty"))?;
    if first != 0 {
        return Err(FibraError::invalid_index(format!(
            "position array starts at {first}, expected 0"
        )));
    }
    if let Some(i) = pos.windows(2).position(|w| w[0] > w[1]) {
        return Err(FibraError::invalid_index(format!(
            "position array decreases at {}: {} > {}",
            i,
            pos[i],
            pos[i + 1]
        )));
    }
    let last = pos[pos.len() - 1];
    if usize::try_from(last).ok() != Some(crd_len) {
        return Err(FibraError::invalid_index(format!(
            "position array ends at {last} but {crd_len} coordinates are stored"
        )));
    }
    Ok(())
}

/// Builds a two-level (dense, compressed) index over segment arrays.
fn make_segmented_index<'a>(ptr: IndexArray<'a>, idx: IndexArray<'a>) -> FibraResult<TensorIndex<'a>> {
    validate_segments(&ptr, idx.len())?;
    if let Some(&c) = idx.iter().find(|&&c| c < 0) {
        return Err(FibraError::invalid_index(format!(
            "negative coordinate {c}"
        )));
    }
    let outer = i32::try_from(ptr.len() - 1).map_err(|_| FibraError::IndexOverflow {
        count: ptr.len() - 1,
    })?;
    let size = idx.len();
    Ok(TensorIndex::new(
        vec![ModeIndex::dense(outer), ModeIndex::compressed(ptr, idx)],
        size,
    ))
}

/// Index of a CSR matrix from its row pointer and column index arrays.
///
/// The number of rows is `rowptr.len() - 1`.
///
/// # Errors
///
/// [`FibraError::InvalidIndex`] if the arrays violate the segment invariants.
pub fn make_csr_index<'a>(rowptr: IndexArray<'a>, colidx: IndexArray<'a>) -> FibraResult<TensorIndex<'a>> {
    make_segmented_index(rowptr, colidx)
}

/// Index of a CSC matrix from its column pointer and row index arrays.
///
/// The number of columns is `colptr.len() - 1`.
///
/// # Errors
///
/// [`FibraError::InvalidIndex`] if the arrays violate the segment invariants.
pub fn make_csc_index<'a>(colptr: IndexArray<'a>, rowidx: IndexArray<'a>) -> FibraResult<TensorIndex<'a>> {
    make_segmented_index(colptr, rowidx)
}
