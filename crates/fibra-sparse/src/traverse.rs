//! Traversal engine
//!
//! Walks the stored entries of any mix of dense and compressed levels in
//! storage order (innermost level varies fastest) and reconstructs each
//! entry's coordinate in original dimension order.
//!
//! The walk is an explicit state machine over a per-level cursor stack:
//!
//! - entering level `l` under parent position `p` sets the cursor range to
//!   `p * extent .. (p + 1) * extent` (dense) or `pos[p] .. pos[p + 1]`
//!   (compressed)
//! - an in-range cursor fixes the level coordinate (`position - start` for
//!   dense, `crd[position]` for compressed) and descends, or yields the leaf
//!   position at the innermost level
//! - an exhausted cursor backtracks to its parent and steps it
//!
//! Every dense position is visited, so a dense-only tensor yields all
//! `∏ dims` entries including zeros. A traversal yields exactly
//! `index.size()` items.
//!
//! # Examples
//!
//! ```
//! use fibra_core::{Format, ValueArray};
//! use fibra_sparse::index::make_csr_index;
//! use fibra_sparse::storage::Storage;
//! use fibra_sparse::traverse::Traversal;
//!
//! let index = make_csr_index(vec![0, 2, 2, 3].into(), vec![0, 2, 1].into()).unwrap();
//! let storage = Storage::new(index, ValueArray::from_vec(vec![1.0f64, 2.0, 3.0])).unwrap();
//! let format = Format::csr();
//!
//! let coords: Vec<Vec<usize>> = Traversal::new(&storage, &format)
//!     .unwrap()
//!     .map(|(c, _)| c)
//!     .collect();
//! assert_eq!(coords, vec![vec![0, 0], vec![0, 2], vec![2, 1]]);
//! ```

use std::iter::FusedIterator;

use fibra_core::{Element, FibraError, FibraResult, Format, ModeType, Shape, Value};
use smallvec::SmallVec;

use crate::index::validate_segments;
use crate::storage::Storage;

/// Borrowed view of one level's index arrays
#[derive(Debug, Clone, Copy)]
pub(crate) enum LevelView<'s> {
    Dense { extent: usize },
    Compressed { pos: &'s [i32], crd: &'s [i32] },
}

pub(crate) type LevelViews<'s> = SmallVec<[LevelView<'s>; 6]>;

/// Resolves the level views of `storage` under `format`.
///
/// Checks only what is needed to address the arrays; see [`validate`] for
/// the full structural check.
pub(crate) fn level_views<'s>(storage: &'s Storage<'_>, format: &Format) -> FibraResult<LevelViews<'s>> {
    format.ensure_supported()?;
    let index = storage.index();
    if index.order() != format.order() {
        return Err(FibraError::invalid_format(format!(
            "format has {} levels but the index has {}",
            format.order(),
            index.order()
        )));
    }

    let mut views = LevelViews::new();
    for (level, mode) in index.mode_indices().iter().enumerate() {
        let view = match format.mode_type(level) {
            ModeType::Dense => {
                let extent = mode.index_array(0)?.first().copied().unwrap_or(-1);
                let extent = usize::try_from(extent).map_err(|_| {
                    FibraError::invalid_index(format!("dense level {level} has extent {extent}"))
                })?;
                LevelView::Dense { extent }
            }
            ModeType::Compressed => LevelView::Compressed {
                pos: mode.index_array(0)?.as_slice(),
                crd: mode.index_array(1)?.as_slice(),
            },
            other => {
                return Err(FibraError::UnsupportedModeType {
                    mode_type: other,
                    level,
                })
            }
        };
        views.push(view);
    }
    Ok(views)
}

/// Checks that the level arrays nest consistently and address exactly the
/// stored values.
pub(crate) fn validate(storage: &Storage<'_>, views: &[LevelView<'_>]) -> FibraResult<()> {
    let mut parents = 1usize;
    for (level, view) in views.iter().enumerate() {
        parents = match *view {
            LevelView::Dense { extent } => parents.checked_mul(extent).ok_or(FibraError::IndexOverflow {
                count: parents.saturating_mul(extent),
            })?,
            LevelView::Compressed { pos, crd } => {
                if pos.len() != parents + 1 {
                    return Err(FibraError::invalid_index(format!(
                        "level {} position array has {} entries, expected {}",
                        level,
                        pos.len(),
                        parents + 1
                    )));
                }
                validate_segments(pos, crd.len())?;
                if let Some(&c) = crd.iter().find(|&&c| c < 0) {
                    return Err(FibraError::invalid_index(format!(
                        "negative coordinate {c} at level {level}"
                    )));
                }
                crd.len()
            }
        };
    }
    let index = storage.index();
    if parents != index.size() || parents != storage.values().len() {
        return Err(FibraError::invalid_index(format!(
            "levels address {} positions, index size is {} and {} values are stored",
            parents,
            index.size(),
            storage.values().len()
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
struct Frame {
    start: usize,
    pos: usize,
    end: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Start,
    Positioned,
    Exhausted,
}

/// Cursor stack of a walk, independent of the arrays it walks
#[derive(Debug, Clone)]
pub(crate) struct Cursor {
    frames: Vec<Frame>,
    coords: Vec<usize>,
    state: State,
    produced: usize,
}

impl Cursor {
    pub(crate) fn new(order: usize) -> Self {
        Self {
            frames: vec![Frame::default(); order],
            coords: vec![0; order],
            state: State::Start,
            produced: 0,
        }
    }

    #[inline]
    pub(crate) fn produced(&self) -> usize {
        self.produced
    }

    /// Moves to the next stored entry and returns its leaf position
    pub(crate) fn advance(&mut self, levels: &[LevelView<'_>]) -> Option<usize> {
        let order = levels.len();
        let mut level = match self.state {
            State::Exhausted => return None,
            State::Start if order == 0 => {
                // A scalar has exactly one entry, at position 0
                self.state = State::Exhausted;
                self.produced += 1;
                return Some(0);
            }
            State::Start => {
                self.enter(levels, 0);
                0
            }
            State::Positioned => {
                self.frames[order - 1].pos += 1;
                order - 1
            }
        };

        loop {
            let frame = self.frames[level];
            if frame.pos < frame.end {
                self.coords[level] = match levels[level] {
                    LevelView::Dense { .. } => frame.pos - frame.start,
                    LevelView::Compressed { crd, .. } => crd[frame.pos] as usize,
                };
                if level + 1 == order {
                    self.state = State::Positioned;
                    self.produced += 1;
                    return Some(frame.pos);
                }
                level += 1;
                self.enter(levels, level);
            } else if level == 0 {
                self.state = State::Exhausted;
                return None;
            } else {
                level -= 1;
                self.frames[level].pos += 1;
            }
        }
    }

    fn enter(&mut self, levels: &[LevelView<'_>], level: usize) {
        let parent = if level == 0 { 0 } else { self.frames[level - 1].pos };
        let (start, end) = match levels[level] {
            LevelView::Dense { extent } => (parent * extent, parent * extent + extent),
            LevelView::Compressed { pos, .. } => (pos[parent] as usize, pos[parent + 1] as usize),
        };
        self.frames[level] = Frame { start, pos: start, end };
    }

    /// Current coordinate in original dimension order
    pub(crate) fn coordinate(&self, ordering: &[usize]) -> Vec<usize> {
        let mut out = vec![0; self.coords.len()];
        for (level, &mode) in ordering.iter().enumerate() {
            out[mode] = self.coords[level];
        }
        out
    }
}

/// Iterator over the stored entries of a [`Storage`]
///
/// Yields `(coordinate, value)` pairs with coordinates in original dimension
/// order.
#[derive(Debug, Clone)]
pub struct Traversal<'s> {
    storage: &'s Storage<'s>,
    levels: LevelViews<'s>,
    ordering: Shape,
    cursor: Cursor,
}

impl<'s> Traversal<'s> {
    /// Starts a walk over `storage` laid out by `format`.
    ///
    /// # Errors
    ///
    /// - [`FibraError::UnsupportedModeType`] for singleton levels
    /// - [`FibraError::InvalidModeAccess`] if a level lacks its arrays
    /// - [`FibraError::InvalidFormat`] if the format order differs from the
    ///   index order
    /// - [`FibraError::InvalidIndex`] if the arrays do not nest consistently
    pub fn new(storage: &'s Storage<'s>, format: &Format) -> FibraResult<Self> {
        let levels = level_views(storage, format)?;
        validate(storage, &levels)?;
        Ok(Self {
            storage,
            cursor: Cursor::new(levels.len()),
            levels,
            ordering: format.mode_ordering().iter().copied().collect(),
        })
    }

    /// Moves to the next stored entry and returns its leaf position
    pub fn advance(&mut self) -> Option<usize> {
        self.cursor.advance(&self.levels)
    }

    /// Coordinate of the current entry in original dimension order
    pub fn coordinate(&self) -> Vec<usize> {
        self.cursor.coordinate(&self.ordering)
    }

    /// Number of entries yielded so far
    #[inline]
    pub fn produced(&self) -> usize {
        self.cursor.produced()
    }

    /// Restricts the walk to values of element type `T`.
    ///
    /// # Errors
    ///
    /// [`FibraError::TypeMismatch`] if the storage holds another kind.
    pub fn typed<T: Element>(self) -> FibraResult<TypedTraversal<'s, T>> {
        let values = self.storage.values().as_slice::<T>()?;
        Ok(TypedTraversal { inner: self, values })
    }

    fn remaining(&self) -> usize {
        self.storage.index().size().saturating_sub(self.produced())
    }
}

impl Iterator for Traversal<'_> {
    type Item = (Vec<usize>, Value);

    fn next(&mut self) -> Option<Self::Item> {
        let pos = self.advance()?;
        let value = self.storage.value_at(pos)?;
        Some((self.coordinate(), value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.remaining();
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Traversal<'_> {}

impl FusedIterator for Traversal<'_> {}

/// Two traversals are equal when they walk the same storage and have yielded
/// the same number of entries.
impl PartialEq for Traversal<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.storage, other.storage) && self.produced() == other.produced()
    }
}

/// [`Traversal`] yielding typed values
#[derive(Debug, Clone)]
pub struct TypedTraversal<'s, T> {
    inner: Traversal<'s>,
    values: &'s [T],
}

impl<T: Element> Iterator for TypedTraversal<'_, T> {
    type Item = (Vec<usize>, T);

    fn next(&mut self) -> Option<Self::Item> {
        let pos = self.inner.advance()?;
        let value = *self.values.get(pos)?;
        Some((self.inner.coordinate(), value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<T: Element> ExactSizeIterator for TypedTraversal<'_, T> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{make_csr_index, ModeIndex, TensorIndex};
    use crate::pack::Packer;
    use fibra_core::{DataType, ValueArray};

    fn csr_storage() -> Storage<'static> {
        let index = make_csr_index(vec![0, 2, 2, 3].into(), vec![0, 2, 1].into()).unwrap();
        Storage::new(index, ValueArray::from_vec(vec![1.0f64, 2.0, 3.0])).unwrap()
    }

    #[test]
    fn test_traverse_csr() {
        let storage = csr_storage();
        let format = Format::csr();
        let entries: Vec<_> = Traversal::new(&storage, &format).unwrap().collect();
        assert_eq!(
            entries,
            vec![
                (vec![0, 0], Value::Float64(1.0)),
                (vec![0, 2], Value::Float64(2.0)),
                (vec![2, 1], Value::Float64(3.0)),
            ]
        );
    }

    #[test]
    fn test_traverse_same_arrays_as_csc() {
        let storage = csr_storage();
        let format = Format::csc();
        let coords: Vec<_> = Traversal::new(&storage, &format)
            .unwrap()
            .map(|(c, _)| c)
            .collect();
        assert_eq!(coords, vec![vec![0, 0], vec![2, 0], vec![1, 2]]);
    }

    #[test]
    fn test_traverse_dense_row_major() {
        let index = TensorIndex::new(vec![ModeIndex::dense(2), ModeIndex::dense(3)], 6);
        let storage = Storage::new(index, ValueArray::from_vec((0..6).collect::<Vec<i32>>())).unwrap();
        let format = Format::dense(2);

        let traversal = Traversal::new(&storage, &format).unwrap();
        assert_eq!(traversal.len(), 6);
        let entries: Vec<_> = traversal.typed::<i32>().unwrap().collect();
        assert_eq!(entries[0], (vec![0, 0], 0));
        assert_eq!(entries[2], (vec![0, 2], 2));
        assert_eq!(entries[3], (vec![1, 0], 3));
        assert_eq!(entries[5], (vec![1, 2], 5));
    }

    #[test]
    fn test_traverse_skips_empty_segments() {
        let format = Format::sparse(3);
        let records = [
            (vec![0, 1, 2], Value::Int64(1)),
            (vec![0, 3, 0], Value::Int64(2)),
            (vec![4, 0, 4], Value::Int64(3)),
        ];
        let storage = Packer::new(&[5, 5, 5], &format, DataType::Int64)
            .pack(records.iter().map(|(c, v)| (c.as_slice(), *v)))
            .unwrap();
        let entries: Vec<_> = Traversal::new(&storage, &format).unwrap().collect();
        assert_eq!(entries, records.to_vec());
    }

    #[test]
    fn test_traverse_empty_storage() {
        let format = Format::csr();
        let storage = Packer::new(&[4, 4], &format, DataType::Float32)
            .pack(std::iter::empty())
            .unwrap();
        let mut traversal = Traversal::new(&storage, &format).unwrap();
        assert_eq!(traversal.next(), None);
        assert_eq!(traversal.next(), None);
        assert_eq!(traversal.produced(), 0);
    }

    #[test]
    fn test_traverse_scalar() {
        let index = TensorIndex::new(Vec::new(), 1);
        let storage = Storage::new(index, ValueArray::from_vec(vec![9i32])).unwrap();
        let format = Format::dense(0);
        let entries: Vec<_> = Traversal::new(&storage, &format).unwrap().collect();
        assert_eq!(entries, vec![(vec![], Value::Int32(9))]);
    }

    #[test]
    fn test_traversal_identity() {
        let storage = csr_storage();
        let other = csr_storage();
        let format = Format::csr();

        let mut a = Traversal::new(&storage, &format).unwrap();
        let mut b = Traversal::new(&storage, &format).unwrap();
        let c = Traversal::new(&other, &format).unwrap();
        assert!(a == b);
        assert!(a != c);
        a.next();
        assert!(a != b);
        b.next();
        assert!(a == b);
    }

    #[test]
    fn test_traversal_rejects_bad_structure() {
        let storage = csr_storage();
        let err = Traversal::new(&storage, &Format::dense(2)).unwrap_err();
        assert!(matches!(err, FibraError::InvalidIndex { .. }));

        let singleton = Format::new(vec![ModeType::Dense, ModeType::Singleton], vec![0, 1]).unwrap();
        let err = Traversal::new(&storage, &singleton).unwrap_err();
        assert!(matches!(err, FibraError::UnsupportedModeType { level: 1, .. }));

        let err = Traversal::new(&storage, &Format::sparse(2)).unwrap_err();
        assert!(matches!(err, FibraError::InvalidModeAccess { array: 1, available: 1 }));
    }

    #[test]
    fn test_typed_traversal_kind_check() {
        let storage = csr_storage();
        let format = Format::csr();
        let err = Traversal::new(&storage, &format).unwrap().typed::<f32>().unwrap_err();
        assert_eq!(err, FibraError::type_mismatch(DataType::Float32, DataType::Float64));
    }
}
