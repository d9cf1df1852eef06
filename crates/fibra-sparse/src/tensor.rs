//! Tensor facade
//!
//! A [`Tensor`] is a shared handle over one content block: name, dimensions,
//! component type, format, pending coordinate buffer and, once packed, the
//! [`Storage`]. Cloning a handle aliases the content, so inserts and packs
//! through one clone are visible through every other. Structural transforms
//! such as [`Tensor::transpose`] build an independent tensor instead.
//!
//! Handles are single-threaded (`Rc<RefCell<..>>`). A packed [`Storage`] can
//! still be walked from several threads at once through [`Traversal`].
//!
//! # Examples
//!
//! ```
//! use fibra_core::Format;
//! use fibra_sparse::tensor::Tensor;
//! use fibra_core::DataType;
//!
//! let a = Tensor::new("A", DataType::Float64, &[3, 3], Format::csr()).unwrap();
//! a.insert(&[2, 1], 3.0f64).unwrap();
//! a.insert(&[0, 0], 1.0f64).unwrap();
//! a.insert(&[0, 2], 2.0f64).unwrap();
//! a.pack().unwrap();
//!
//! let entries: Vec<_> = a.iter_typed::<f64>().unwrap().collect();
//! assert_eq!(entries, vec![(vec![0, 0], 1.0), (vec![0, 2], 2.0), (vec![2, 1], 3.0)]);
//! ```

use std::cell::{Ref, RefCell, RefMut};
use std::cmp::Ordering as CmpOrdering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::iter::FusedIterator;
use std::marker::PhantomData;
use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};

use fibra_core::{DataType, Element, FibraError, FibraResult, Format, ModeType, Shape, Value};
use scirs2_core::ndarray_ext::{Array, ArrayD, IxDyn};
use tracing::{debug, trace};

use crate::buffer::CoordinateBuffer;
use crate::config::TensorOptions;
use crate::pack::{Packer, MAX_INDEX};
use crate::storage::Storage;
use crate::traverse::{level_views, validate, Cursor, LevelView, Traversal};

static NAME_COUNTER: AtomicUsize = AtomicUsize::new(0);

/// Returns a process-wide unique name starting with `prefix`
pub fn unique_name(prefix: char) -> String {
    format!("{}{}", prefix, NAME_COUNTER.fetch_add(1, Ordering::Relaxed))
}

#[derive(Debug)]
struct TensorContent<'a> {
    name: String,
    dimensions: Shape,
    dtype: DataType,
    format: Format,
    options: TensorOptions,
    buffer: CoordinateBuffer,
    storage: Option<Storage<'a>>,
    /// Bumped whenever the storage may have changed shape
    generation: u64,
}

/// Shared handle to a tensor
///
/// The lifetime `'a` bounds caller-owned arrays attached through the CSR/CSC
/// factories; tensors built by packing are `Tensor<'static>`.
#[derive(Debug, Clone)]
pub struct Tensor<'a> {
    content: Rc<RefCell<TensorContent<'a>>>,
}

impl<'a> Tensor<'a> {
    /// Creates an empty tensor.
    ///
    /// # Errors
    ///
    /// - [`FibraError::InvalidFormat`] if the format order differs from the
    ///   number of dimensions
    /// - [`FibraError::InvalidShape`] if a dimension exceeds the index range
    pub fn new(
        name: impl Into<String>,
        dtype: DataType,
        dimensions: &[usize],
        format: Format,
    ) -> FibraResult<Self> {
        Self::with_options(name, dtype, dimensions, format, TensorOptions::default())
    }

    /// Creates an empty tensor storing every mode with `mode_type`
    pub fn with_mode_type(
        name: impl Into<String>,
        dtype: DataType,
        dimensions: &[usize],
        mode_type: ModeType,
    ) -> FibraResult<Self> {
        Self::new(name, dtype, dimensions, Format::uniform(dimensions.len(), mode_type))
    }

    /// Creates an empty tensor with explicit options
    pub fn with_options(
        name: impl Into<String>,
        dtype: DataType,
        dimensions: &[usize],
        format: Format,
        options: TensorOptions,
    ) -> FibraResult<Self> {
        if format.order() != dimensions.len() {
            return Err(FibraError::invalid_format(format!(
                "format {} has {} levels but {} dimensions were given",
                format,
                format.order(),
                dimensions.len()
            )));
        }
        if let Some(&dim) = dimensions.iter().find(|&&d| d > MAX_INDEX) {
            return Err(FibraError::InvalidShape {
                reason: format!("dimension {dim} exceeds the index range"),
            });
        }

        let buffer = CoordinateBuffer::with_capacity(dimensions.len(), dtype, options.initial_capacity);
        let content = TensorContent {
            name: name.into(),
            dimensions: dimensions.iter().copied().collect(),
            dtype,
            format,
            options,
            buffer,
            storage: None,
            generation: 0,
        };
        Ok(Self {
            content: Rc::new(RefCell::new(content)),
        })
    }

    /// Creates a packed order-0 tensor holding `value`
    pub fn scalar(value: Value) -> FibraResult<Self> {
        let tensor = Self::new(unique_name('s'), value.data_type(), &[], Format::dense(0))?;
        tensor.insert_value(&[], value)?;
        tensor.pack()?;
        Ok(tensor)
    }

    pub fn name(&self) -> String {
        self.content.borrow().name.clone()
    }

    pub fn set_name(&self, name: impl Into<String>) {
        self.content.borrow_mut().name = name.into();
    }

    /// Number of modes
    pub fn order(&self) -> usize {
        self.content.borrow().dimensions.len()
    }

    /// Size of `mode`, or `None` past the order
    pub fn dimension(&self, mode: usize) -> Option<usize> {
        self.content.borrow().dimensions.get(mode).copied()
    }

    pub fn dimensions(&self) -> Shape {
        self.content.borrow().dimensions.clone()
    }

    pub fn data_type(&self) -> DataType {
        self.content.borrow().dtype
    }

    pub fn format(&self) -> Format {
        self.content.borrow().format.clone()
    }

    pub fn options(&self) -> TensorOptions {
        self.content.borrow().options.clone()
    }

    /// True once the tensor has storage
    pub fn is_packed(&self) -> bool {
        self.content.borrow().storage.is_some()
    }

    /// Number of inserts waiting for the next pack
    pub fn pending(&self) -> usize {
        self.content.borrow().buffer.len()
    }

    /// Pre-grows the coordinate buffer for `records` more inserts
    pub fn reserve(&self, records: usize) {
        self.content.borrow_mut().buffer.reserve(records);
    }

    /// Buffers a typed insert.
    ///
    /// Bounds and duplicates are checked by [`Tensor::pack`].
    ///
    /// # Errors
    ///
    /// - [`FibraError::DimensionMismatch`] if `coordinate.len()` differs
    ///   from the order
    /// - [`FibraError::TypeMismatch`] if `T` is not the component type
    pub fn insert<T: Element>(&self, coordinate: &[usize], value: T) -> FibraResult<()> {
        self.insert_value(coordinate, value.into_value())
    }

    /// Buffers an insert of a type-erased value. Same errors as
    /// [`Tensor::insert`].
    pub fn insert_value(&self, coordinate: &[usize], value: Value) -> FibraResult<()> {
        self.content.borrow_mut().buffer.push(coordinate, value)
    }

    /// Compiles the buffered inserts into storage.
    ///
    /// Entries already stored are merged with the buffer. The duplicate
    /// policy applies among the buffered inserts; an insert then overwrites
    /// the stored entry at its coordinate, or adds to it under
    /// [`DuplicatePolicy::Sum`](crate::config::DuplicatePolicy::Sum). The new storage is engine-owned even
    /// if the previous one borrowed caller arrays. On error the previous
    /// storage and the buffer are left untouched; on success the buffer is
    /// cleared. With an empty buffer and existing storage this is a no-op.
    ///
    /// # Panics
    ///
    /// Panics if a [`Ref`] returned by [`Tensor::storage`] is still alive.
    pub fn pack(&self) -> FibraResult<()> {
        let mut guard = self.content.borrow_mut();
        let content = &mut *guard;
        if content.buffer.is_empty() && content.storage.is_some() {
            trace!(tensor = %content.name, "nothing to pack");
            return Ok(());
        }

        let stored: Vec<(Vec<usize>, Value)> = match &content.storage {
            Some(storage) => Traversal::new(storage, &content.format)?.collect(),
            None => Vec::new(),
        };
        let storage = Packer::new(&content.dimensions, &content.format, content.dtype)
            .policy(content.options.duplicate_policy)
            .merge(
                stored.iter().map(|(c, v)| (c.as_slice(), *v)),
                content.buffer.records(),
            )?;

        debug!(
            tensor = %content.name,
            format = %content.format,
            merged = stored.len(),
            inserted = content.buffer.len(),
            size = storage.index().size(),
            "packed tensor"
        );
        content.storage = Some(storage);
        content.buffer.clear();
        content.generation += 1;
        Ok(())
    }

    /// Zeroes every stored value, keeping the index
    pub fn zero(&self) {
        if let Some(storage) = self.content.borrow_mut().storage.as_mut() {
            storage.zero();
        }
    }

    /// Borrows the packed storage.
    ///
    /// # Errors
    ///
    /// [`FibraError::NotPacked`] before the first pack.
    pub fn storage(&self) -> FibraResult<Ref<'_, Storage<'a>>> {
        Ref::filter_map(self.content.borrow(), |c| c.storage.as_ref()).map_err(|c| FibraError::NotPacked {
            name: c.name.clone(),
        })
    }

    /// Mutably borrows the packed storage.
    ///
    /// Iterators created earlier stop yielding, since the index may change
    /// through this borrow.
    ///
    /// # Errors
    ///
    /// [`FibraError::NotPacked`] before the first pack.
    pub fn storage_mut(&self) -> FibraResult<RefMut<'_, Storage<'a>>> {
        let mut content = self.content.borrow_mut();
        if content.storage.is_none() {
            return Err(FibraError::NotPacked {
                name: content.name.clone(),
            });
        }
        content.generation += 1;
        RefMut::filter_map(content, |c| c.storage.as_mut()).map_err(|c| FibraError::NotPacked {
            name: c.name.clone(),
        })
    }

    /// Installs an externally built storage.
    ///
    /// Pending inserts are kept and merged by the next pack.
    ///
    /// # Errors
    ///
    /// - [`FibraError::TypeMismatch`] if the value kind differs
    /// - [`FibraError::InvalidIndex`] if the arrays do not nest under the
    ///   tensor's format or address coordinates past its dimensions
    pub fn set_storage(&self, storage: Storage<'a>) -> FibraResult<()> {
        let mut content = self.content.borrow_mut();
        if storage.data_type() != content.dtype {
            return Err(FibraError::type_mismatch(content.dtype, storage.data_type()));
        }
        check_fits(&storage, &content.format, &content.dimensions)?;
        content.storage = Some(storage);
        content.generation += 1;
        Ok(())
    }

    /// Iterates over the stored `(coordinate, value)` entries.
    ///
    /// # Errors
    ///
    /// [`FibraError::NotPacked`] before the first pack, or the structural
    /// errors of [`Traversal::new`].
    pub fn iter(&self) -> FibraResult<TensorIter<'a>> {
        let content = self.content.borrow();
        let storage = content.storage.as_ref().ok_or_else(|| FibraError::NotPacked {
            name: content.name.clone(),
        })?;
        let views = level_views(storage, &content.format)?;
        validate(storage, &views)?;
        Ok(TensorIter {
            tensor: self.clone(),
            cursor: Cursor::new(views.len()),
            generation: content.generation,
        })
    }

    /// Iterates with typed values.
    ///
    /// # Errors
    ///
    /// [`FibraError::TypeMismatch`] if `T` is not the component type, plus
    /// the errors of [`Tensor::iter`].
    pub fn iter_typed<T: Element>(&self) -> FibraResult<TypedTensorIter<'a, T>> {
        let dtype = self.data_type();
        if dtype != T::DATA_TYPE {
            return Err(FibraError::type_mismatch(dtype, T::DATA_TYPE));
        }
        Ok(TypedTensorIter {
            inner: self.iter()?,
            _marker: PhantomData,
        })
    }

    /// Transposed copy in the same format under a fresh name.
    ///
    /// Mode `i` of the result is mode `ordering[i]` of `self`.
    pub fn transpose(&self, ordering: &[usize]) -> FibraResult<Tensor<'static>> {
        self.transpose_with(unique_name('A'), ordering, self.format())
    }

    /// Transposed copy with an explicit name and format.
    ///
    /// The new tensor is filled by traversing `self` and is packed before it
    /// is returned.
    ///
    /// # Errors
    ///
    /// - [`FibraError::InvalidFormat`] if `ordering` is not a permutation of
    ///   the modes or `format` has the wrong order
    /// - [`FibraError::NotPacked`] if `self` has no storage
    pub fn transpose_with(
        &self,
        name: impl Into<String>,
        ordering: &[usize],
        format: Format,
    ) -> FibraResult<Tensor<'static>> {
        let dimensions = self.dimensions();
        // Reuses the permutation check of formats
        Format::new(vec![ModeType::Dense; ordering.len()], ordering.to_vec())?;
        if ordering.len() != dimensions.len() {
            return Err(FibraError::invalid_format(format!(
                "mode ordering {:?} does not match order {}",
                ordering,
                dimensions.len()
            )));
        }

        let new_dims: Vec<usize> = ordering.iter().map(|&m| dimensions[m]).collect();
        let options = self.options();
        let result = Tensor::with_options(name, self.data_type(), &new_dims, format, options)?;
        result.reserve(self.storage()?.index().size());
        for (coordinate, value) in self.iter()? {
            let permuted: Vec<usize> = ordering.iter().map(|&m| coordinate[m]).collect();
            result.insert_value(&permuted, value)?;
        }
        result.pack()?;
        Ok(result)
    }

    /// Same component type, dimensions and nonzero entries.
    ///
    /// Explicitly stored zeros are ignored, so tensors in different formats
    /// compare equal when they hold the same values. Unpacked tensors hold
    /// no entries.
    pub fn equals(&self, other: &Tensor<'_>) -> bool {
        if self.data_type() != other.data_type() || self.dimensions() != other.dimensions() {
            return false;
        }
        match (self.nonzeros(), other.nonzeros()) {
            (Ok(a), Ok(b)) => a == b,
            _ => false,
        }
    }

    fn nonzeros(&self) -> FibraResult<Vec<(Vec<usize>, Value)>> {
        if !self.is_packed() {
            return Ok(Vec::new());
        }
        let mut entries: Vec<_> = self.iter()?.filter(|(_, v)| !v.is_zero()).collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(entries)
    }

    /// Dense copy of the stored entries.
    ///
    /// # Errors
    ///
    /// - [`FibraError::TypeMismatch`] if `T` is not the component type
    /// - [`FibraError::InvalidShape`] if the element count overflows
    /// - [`FibraError::NotPacked`] before the first pack
    pub fn to_dense<T: Element>(&self) -> FibraResult<ArrayD<T>> {
        let dimensions = self.dimensions();
        dimensions
            .iter()
            .try_fold(1usize, |acc, &d| acc.checked_mul(d))
            .filter(|&n| n <= isize::MAX as usize)
            .ok_or_else(|| FibraError::InvalidShape {
                reason: format!("{dimensions:?} has too many elements for a dense copy"),
            })?;

        let mut dense = Array::from_elem(IxDyn(&dimensions), T::default());
        for (coordinate, value) in self.iter_typed::<T>()? {
            dense[IxDyn(&coordinate)] = value;
        }
        Ok(dense)
    }
}

/// Checks that `storage` nests under `format` and stays within `dimensions`.
fn check_fits(storage: &Storage<'_>, format: &Format, dimensions: &[usize]) -> FibraResult<()> {
    let views = level_views(storage, format)?;
    validate(storage, &views)?;
    for (level, view) in views.iter().enumerate() {
        let dim = dimensions[format.mode_ordering()[level]];
        match *view {
            LevelView::Dense { extent } if extent != dim => {
                return Err(FibraError::invalid_index(format!(
                    "dense level {level} has extent {extent}, expected {dim}"
                )))
            }
            LevelView::Compressed { crd, .. } => {
                if let Some(&c) = crd.iter().find(|&&c| c as usize >= dim) {
                    return Err(FibraError::invalid_index(format!(
                        "coordinate {c} at level {level} exceeds dimension {dim}"
                    )));
                }
            }
            _ => {}
        }
    }
    Ok(())
}

impl Tensor<'_> {
    fn identity(&self) -> *const () {
        Rc::as_ptr(&self.content).cast::<()>()
    }
}

/// Handle identity: true iff both handles share one content block
impl<'b> PartialEq<Tensor<'b>> for Tensor<'_> {
    fn eq(&self, other: &Tensor<'b>) -> bool {
        std::ptr::eq(self.identity(), other.identity())
    }
}

impl Eq for Tensor<'_> {}

/// Orders handles by content block identity, so they can key ordered maps.
/// The order is stable for the lifetime of the content but otherwise
/// arbitrary.
impl<'b> PartialOrd<Tensor<'b>> for Tensor<'_> {
    fn partial_cmp(&self, other: &Tensor<'b>) -> Option<CmpOrdering> {
        Some(self.identity().cmp(&other.identity()))
    }
}

impl Ord for Tensor<'_> {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        self.identity().cmp(&other.identity())
    }
}

impl Hash for Tensor<'_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identity().hash(state);
    }
}

impl fmt::Display for Tensor<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let content = self.content.borrow();
        let dims: Vec<String> = content.dimensions.iter().map(|d| d.to_string()).collect();
        writeln!(
            f,
            "{} ({}) {} {}:",
            content.name,
            dims.join("x"),
            content.dtype,
            content.format
        )?;
        let Some(storage) = content.storage.as_ref() else {
            return writeln!(f, "  <unpacked, {} pending>", content.buffer.len());
        };
        let traversal = Traversal::new(storage, &content.format).map_err(|_| fmt::Error)?;
        for (coordinate, value) in traversal {
            writeln!(f, "  {coordinate:?}: {value}")?;
        }
        Ok(())
    }
}

/// Iterator over the entries of a [`Tensor`]
///
/// Holds its own handle, so the tensor stays alive while iterating. If the
/// tensor is re-packed or its storage replaced, the iterator ends.
#[derive(Debug, Clone)]
pub struct TensorIter<'a> {
    tensor: Tensor<'a>,
    cursor: Cursor,
    generation: u64,
}

impl TensorIter<'_> {
    /// Number of entries yielded so far
    pub fn produced(&self) -> usize {
        self.cursor.produced()
    }
}

impl Iterator for TensorIter<'_> {
    type Item = (Vec<usize>, Value);

    fn next(&mut self) -> Option<Self::Item> {
        let content = self.tensor.content.borrow();
        if content.generation != self.generation {
            return None;
        }
        let storage = content.storage.as_ref()?;
        let views = level_views(storage, &content.format).ok()?;
        let pos = self.cursor.advance(&views)?;
        let value = storage.value_at(pos)?;
        Some((self.cursor.coordinate(content.format.mode_ordering()), value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let content = self.tensor.content.borrow();
        let remaining = match content.storage.as_ref() {
            Some(storage) if content.generation == self.generation => {
                storage.index().size().saturating_sub(self.produced())
            }
            _ => 0,
        };
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for TensorIter<'_> {}

// Generations only grow, so a stale iterator never resumes
impl FusedIterator for TensorIter<'_> {}

/// Equal iff both iterate the same tensor and have yielded the same count
impl PartialEq for TensorIter<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.tensor == other.tensor && self.produced() == other.produced()
    }
}

/// [`TensorIter`] yielding typed values
#[derive(Debug, Clone)]
pub struct TypedTensorIter<'a, T> {
    inner: TensorIter<'a>,
    _marker: PhantomData<T>,
}

impl<T: Element> Iterator for TypedTensorIter<'_, T> {
    type Item = (Vec<usize>, T);

    fn next(&mut self) -> Option<Self::Item> {
        let (coordinate, value) = self.inner.next()?;
        T::from_value(value).map(|v| (coordinate, v))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<T: Element> ExactSizeIterator for TypedTensorIter<'_, T> {}

impl<T: Element> FusedIterator for TypedTensorIter<'_, T> {}
