//! Per-mode storage formats
//!
//! A [`Format`] pairs one [`ModeType`] per physical level with a mode
//! ordering: `mode_ordering[level]` is the original tensor dimension stored
//! at that level. CSR and CSC are the same two-level layout (dense outer,
//! compressed inner) with different orderings.
//!
//! # Examples
//!
//! ```
//! use fibra_core::{Format, ModeType};
//!
//! let csc = Format::csc();
//! assert_eq!(csc.mode_types(), &[ModeType::Dense, ModeType::Compressed]);
//! assert_eq!(csc.mode_ordering(), &[1, 0]);
//!
//! // Mode orderings must be permutations
//! assert!(Format::new(vec![ModeType::Dense; 2], vec![0, 0]).is_err());
//! ```

use std::fmt;

use crate::error::{FibraError, FibraResult};

/// Storage discipline of one level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ModeType {
    /// Every coordinate in `[0, extent)` is stored; child positions are
    /// `parent * extent + coordinate`
    Dense,
    /// Stored coordinates are listed explicitly: a position array segments
    /// a coordinate array per parent (CSR-style)
    Compressed,
    /// One child per parent, coordinates only. Understood by formats and
    /// kernel descriptors; the packer and traversal do not implement it.
    Singleton,
}

impl ModeType {
    /// Returns the mode type name
    pub fn name(&self) -> &'static str {
        match self {
            ModeType::Dense => "dense",
            ModeType::Compressed => "compressed",
            ModeType::Singleton => "singleton",
        }
    }
}

impl fmt::Display for ModeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Mode types and level ordering of a tensor
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Format {
    mode_types: Vec<ModeType>,
    mode_ordering: Vec<usize>,
}

impl Format {
    /// Creates a format from per-level mode types and a mode ordering.
    ///
    /// # Errors
    ///
    /// [`FibraError::InvalidFormat`] if the lengths differ or the ordering is
    /// not a permutation of `0..order`.
    pub fn new(mode_types: Vec<ModeType>, mode_ordering: Vec<usize>) -> FibraResult<Self> {
        if mode_types.len() != mode_ordering.len() {
            return Err(FibraError::invalid_format(format!(
                "{} mode types but mode ordering of length {}",
                mode_types.len(),
                mode_ordering.len()
            )));
        }

        let mut sorted = mode_ordering.clone();
        sorted.sort_unstable();
        if sorted.iter().enumerate().any(|(i, &m)| i != m) {
            return Err(FibraError::invalid_format(format!(
                "mode ordering {:?} is not a permutation of 0..{}",
                mode_ordering,
                mode_ordering.len()
            )));
        }

        Ok(Self {
            mode_types,
            mode_ordering,
        })
    }

    /// Same mode type at every level, identity ordering
    pub fn uniform(order: usize, mode_type: ModeType) -> Self {
        Self {
            mode_types: vec![mode_type; order],
            mode_ordering: (0..order).collect(),
        }
    }

    /// All levels dense
    pub fn dense(order: usize) -> Self {
        Self::uniform(order, ModeType::Dense)
    }

    /// All levels compressed
    pub fn sparse(order: usize) -> Self {
        Self::uniform(order, ModeType::Compressed)
    }

    /// Compressed sparse row: dense rows, compressed columns
    pub fn csr() -> Self {
        Self {
            mode_types: vec![ModeType::Dense, ModeType::Compressed],
            mode_ordering: vec![0, 1],
        }
    }

    /// Compressed sparse column: dense columns, compressed rows
    pub fn csc() -> Self {
        Self {
            mode_types: vec![ModeType::Dense, ModeType::Compressed],
            mode_ordering: vec![1, 0],
        }
    }

    /// Doubly compressed sparse row
    pub fn dcsr() -> Self {
        Self::sparse(2)
    }

    /// Number of levels
    #[inline]
    pub fn order(&self) -> usize {
        self.mode_types.len()
    }

    #[inline]
    pub fn mode_types(&self) -> &[ModeType] {
        &self.mode_types
    }

    #[inline]
    pub fn mode_ordering(&self) -> &[usize] {
        &self.mode_ordering
    }

    /// Mode type stored at `level`
    #[inline]
    pub fn mode_type(&self, level: usize) -> ModeType {
        self.mode_types[level]
    }

    /// Maps a coordinate in original dimension order to level order
    pub fn to_levels(&self, coordinate: &[usize]) -> Vec<usize> {
        self.mode_ordering.iter().map(|&mode| coordinate[mode]).collect()
    }

    /// Checks that every level uses a mode type the engine implements.
    ///
    /// # Errors
    ///
    /// [`FibraError::UnsupportedModeType`] for the first offending level.
    pub fn ensure_supported(&self) -> FibraResult<()> {
        match self
            .mode_types
            .iter()
            .position(|mt| !matches!(mt, ModeType::Dense | ModeType::Compressed))
        {
            Some(level) => Err(FibraError::UnsupportedModeType {
                mode_type: self.mode_types[level],
                level,
            }),
            None => Ok(()),
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (level, mt) in self.mode_types.iter().enumerate() {
            if level > 0 {
                write!(f, ",")?;
            }
            write!(f, "{mt}")?;
        }
        write!(f, "; {:?})", self.mode_ordering)
    }
}
