/*
 * Copyright (c) Microsoft Corporation.
 * Licensed under the MIT license.
 */

use serde::{Deserialize, Serialize};
use thiserror::Error;
use vsearch::{VSError, VSErrorKind};
use vsearch_utils::{DataType, UnsupportedDtype, views::Layout};

/// Traversal order of cells within a tile, or of tiles within an array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Order {
    RowMajor,
    ColMajor,
}

impl From<Layout> for Order {
    fn from(layout: Layout) -> Self {
        match layout {
            Layout::RowMajor => Self::RowMajor,
            Layout::ColumnMajor => Self::ColMajor,
        }
    }
}

impl From<Order> for Layout {
    fn from(order: Order) -> Self {
        match order {
            Order::RowMajor => Self::RowMajor,
            Order::ColMajor => Self::ColumnMajor,
        }
    }
}

/// One dimension of a dense array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimension {
    pub name: String,
    /// Inclusive `[low, high]` coordinates.
    pub domain: [u64; 2],
    pub tile_extent: u64,
}

impl Dimension {
    /// Number of coordinates in the domain, or `None` if the domain is inverted or does not
    /// fit in `usize`.
    pub fn checked_len(&self) -> Option<usize> {
        let [low, high] = self.domain;
        let span = high.checked_sub(low)?.checked_add(1)?;
        usize::try_from(span).ok()
    }

    /// Number of coordinates in the domain. Zero for domains rejected by
    /// [`ArraySchema::validate`].
    pub fn len(&self) -> usize {
        self.checked_len().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check(&self) -> Result<usize, SchemaError> {
        let [low, high] = self.domain;
        if low > high {
            return Err(SchemaError::EmptyDomain {
                name: self.name.clone(),
                low,
                high,
            });
        }
        let len = self.checked_len().ok_or_else(|| SchemaError::DomainTooLarge {
            name: self.name.clone(),
            low,
            high,
        })?;
        if self.tile_extent == 0 || self.tile_extent > len as u64 {
            return Err(SchemaError::TileExtent {
                name: self.name.clone(),
                extent: self.tile_extent,
                len,
            });
        }
        Ok(len)
    }

    // Bounded by `len()` once validated.
    fn tile_extent(&self) -> usize {
        self.tile_extent as usize
    }
}

/// A structurally invalid [`ArraySchema`].
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("only two-dimensional arrays are supported, found {0} dimensions")]
    Rank(usize),
    #[error("dimension \"{name}\" has an empty domain [{low}, {high}]")]
    EmptyDomain { name: String, low: u64, high: u64 },
    #[error("dimension \"{name}\" spans [{low}, {high}], too many coordinates to address")]
    DomainTooLarge { name: String, low: u64, high: u64 },
    #[error("dimension \"{name}\" has tile extent {extent}, outside 1..={len}")]
    TileExtent { name: String, extent: u64, len: usize },
    #[error("{nrows} × {ncols} cells of {dtype} overflow the addressable size")]
    Overflow {
        nrows: usize,
        ncols: usize,
        dtype: DataType,
    },
    #[error(transparent)]
    Dtype(#[from] UnsupportedDtype),
}

impl SchemaError {
    /// Convert into a [`VSError`] of `kind`. Unknown element types keep `UnsupportedDtype`.
    #[track_caller]
    pub fn into_error(self, kind: VSErrorKind) -> VSError {
        match self {
            Self::Dtype(err) => err.into(),
            other => VSError::new(kind, other),
        }
    }
}

/// The single attribute stored in every cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    /// Element type name, e.g. `"float32"`.
    pub dtype: String,
}

/// Description of a dense two-dimensional array, serialized as JSON next to its values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArraySchema {
    /// Rows, then columns.
    pub dimensions: Vec<Dimension>,
    pub attribute: Attribute,
    pub cell_order: Order,
    pub tile_order: Order,
}

impl ArraySchema {
    /// A schema holding an `nrows × ncols` matrix of `dtype` in a single tile, with cells
    /// ordered like `layout`.
    pub fn for_matrix(dtype: DataType, nrows: usize, ncols: usize, layout: Layout) -> Self {
        let dimension = |name: &str, len: usize| Dimension {
            name: name.to_owned(),
            domain: [0, (len as u64).saturating_sub(1)],
            tile_extent: len.max(1) as u64,
        };
        Self {
            dimensions: vec![dimension("rows", nrows), dimension("cols", ncols)],
            attribute: Attribute {
                name: "values".to_owned(),
                dtype: dtype.as_str().to_owned(),
            },
            cell_order: layout.into(),
            tile_order: layout.into(),
        }
    }

    /// Replace the tile extents of both dimensions.
    pub fn with_tile_extents(mut self, rows: u64, cols: u64) -> Self {
        self.dimensions[0].tile_extent = rows;
        self.dimensions[1].tile_extent = cols;
        self
    }

    pub fn with_tile_order(mut self, order: Order) -> Self {
        self.tile_order = order;
        self
    }

    /// The element type of the attribute.
    pub fn dtype(&self) -> Result<DataType, UnsupportedDtype> {
        self.attribute.dtype.parse()
    }

    /// `(rows, columns)` of the stored matrix.
    pub fn shape(&self) -> (usize, usize) {
        (self.dimensions[0].len(), self.dimensions[1].len())
    }

    /// Layout of matrices read from this array.
    pub fn layout(&self) -> Layout {
        self.cell_order.into()
    }

    /// Check the structural invariants that the rest of this module relies on: two
    /// dimensions with non-empty domains, tile extents within their domain, a known
    /// element type, and a total byte size that fits in `usize`.
    pub fn validate(&self) -> Result<(), SchemaError> {
        let [rows, cols] = self.dimensions.as_slice() else {
            return Err(SchemaError::Rank(self.dimensions.len()));
        };
        let (nrows, ncols) = (rows.check()?, cols.check()?);
        let dtype = self.dtype()?;
        nrows
            .checked_mul(ncols)
            .and_then(|cells| cells.checked_mul(dtype.size()))
            .ok_or(SchemaError::Overflow {
                nrows,
                ncols,
                dtype,
            })?;
        Ok(())
    }

    /// Total number of cells. The schema must be valid.
    pub(crate) fn num_cells(&self) -> usize {
        let (nrows, ncols) = self.shape();
        nrows * ncols
    }

    /// Visit every `(row, column)` of the array in global order: tiles in tile order and
    /// the cells of each tile in cell order. Coordinates are relative to the domain start.
    ///
    /// The schema must be valid.
    pub(crate) fn for_each_cell<F>(&self, mut f: F)
    where
        F: FnMut(usize, usize),
    {
        let (nrows, ncols) = self.shape();
        let (row_extent, col_extent) = (
            self.dimensions[0].tile_extent(),
            self.dimensions[1].tile_extent(),
        );
        let row_tiles = nrows.div_ceil(row_extent);
        let col_tiles = ncols.div_ceil(col_extent);

        for tile in 0..row_tiles * col_tiles {
            let (ti, tj) = match self.tile_order {
                Order::RowMajor => (tile / col_tiles, tile % col_tiles),
                Order::ColMajor => (tile % row_tiles, tile / row_tiles),
            };
            let (r0, c0) = (ti * row_extent, tj * col_extent);
            let rows = r0..r0 + row_extent.min(nrows - r0);
            let cols = c0..c0 + col_extent.min(ncols - c0);
            match self.cell_order {
                Order::RowMajor => {
                    for r in rows {
                        cols.clone().for_each(|c| f(r, c));
                    }
                }
                Order::ColMajor => {
                    for c in cols {
                        rows.clone().for_each(|r| f(r, c));
                    }
                }
            }
        }
    }
}
