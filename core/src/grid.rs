//! Dense terrain grids shared by every placement system.

use thiserror::Error;

use crate::{Biome, GridCoord, TerrainGrid};

/// Errors raised when assembling grids from raw samples.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GridError {
    /// The grid needs at least one sample along each axis.
    #[error("grid dimensions must be non-zero, got {columns}x{rows}")]
    EmptyDimensions {
        /// Requested number of columns.
        columns: u32,
        /// Requested number of rows.
        rows: u32,
    },
    /// The number of provided samples does not match the dimensions.
    #[error("expected {expected} samples for the grid, got {actual}")]
    SampleCount {
        /// Number of samples implied by the dimensions.
        expected: usize,
        /// Number of samples supplied by the caller.
        actual: usize,
    },
    /// Two grids that must describe the same terrain disagree on size.
    #[error("grid shapes differ: {left_columns}x{left_rows} vs {right_columns}x{right_rows}")]
    ShapeMismatch {
        /// Columns of the first grid.
        left_columns: u32,
        /// Rows of the first grid.
        left_rows: u32,
        /// Columns of the second grid.
        right_columns: u32,
        /// Rows of the second grid.
        right_rows: u32,
    },
    /// A terrain description asks for an unsupported height-field resolution.
    #[error("terrain resolution {resolution} is outside 2..=4096")]
    Resolution {
        /// Requested samples along each side.
        resolution: u32,
    },
}

fn checked_len(columns: u32, rows: u32) -> Result<usize, GridError> {
    if columns == 0 || rows == 0 {
        return Err(GridError::EmptyDimensions { columns, rows });
    }
    Ok(columns as usize * rows as usize)
}

/// Row-major grid of normalized elevation samples.
///
/// Values are not strictly bounded to `[0, 1]`; biome multipliers and feature
/// bumps can push them higher.
#[derive(Clone, Debug, PartialEq)]
pub struct HeightField {
    columns: u32,
    rows: u32,
    samples: Vec<f32>,
}

impl HeightField {
    /// Assembles a height field from row-major samples.
    pub fn from_samples(columns: u32, rows: u32, samples: Vec<f32>) -> Result<Self, GridError> {
        let expected = checked_len(columns, rows)?;
        if samples.len() != expected {
            return Err(GridError::SampleCount {
                expected,
                actual: samples.len(),
            });
        }
        Ok(Self {
            columns,
            rows,
            samples,
        })
    }

    /// Creates a height field where every sample has the same height.
    pub fn flat(columns: u32, rows: u32, height: f32) -> Result<Self, GridError> {
        let len = checked_len(columns, rows)?;
        Self::from_samples(columns, rows, vec![height; len])
    }

    /// Number of samples along the x axis.
    #[must_use]
    pub const fn columns(&self) -> u32 {
        self.columns
    }

    /// Number of samples along the z axis.
    #[must_use]
    pub const fn rows(&self) -> u32 {
        self.rows
    }

    /// Height stored at the provided coordinate, if it lies inside the grid.
    #[must_use]
    pub fn height(&self, cell: GridCoord) -> Option<f32> {
        self.index(cell).map(|index| self.samples[index])
    }

    /// Height at signed coordinates, returning `None` outside the grid.
    #[must_use]
    pub fn height_at(&self, column: i64, row: i64) -> Option<f32> {
        let column = u32::try_from(column).ok()?;
        let row = u32::try_from(row).ok()?;
        self.height(GridCoord::new(column, row))
    }

    /// Dense samples in row-major order.
    #[must_use]
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Iterator over every coordinate paired with its height, in scan order.
    pub fn cells(&self) -> impl Iterator<Item = (GridCoord, f32)> + '_ {
        let columns = self.columns;
        self.samples.iter().enumerate().map(move |(index, height)| {
            let index = index as u32;
            (GridCoord::new(index % columns, index / columns), *height)
        })
    }

    /// Mutable samples in row-major order, used while shaping the terrain.
    pub fn samples_mut(&mut self) -> &mut [f32] {
        &mut self.samples
    }

    fn index(&self, cell: GridCoord) -> Option<usize> {
        if cell.column() < self.columns && cell.row() < self.rows {
            Some(cell.row() as usize * self.columns as usize + cell.column() as usize)
        } else {
            None
        }
    }
}

/// Boolean walkability grid derived from a [`HeightField`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlacementMask {
    columns: u32,
    rows: u32,
    walkable: Vec<bool>,
}

impl PlacementMask {
    /// Assembles a mask from row-major walkability flags.
    pub fn from_cells(columns: u32, rows: u32, walkable: Vec<bool>) -> Result<Self, GridError> {
        let expected = checked_len(columns, rows)?;
        if walkable.len() != expected {
            return Err(GridError::SampleCount {
                expected,
                actual: walkable.len(),
            });
        }
        Ok(Self {
            columns,
            rows,
            walkable,
        })
    }

    /// Derives a mask with the height field's shape from a per-cell predicate.
    pub fn derive(field: &HeightField, walkable: impl FnMut((GridCoord, f32)) -> bool) -> Self {
        Self {
            columns: field.columns(),
            rows: field.rows(),
            walkable: field.cells().map(walkable).collect(),
        }
    }

    /// Creates a mask where every cell shares the same walkability.
    pub fn uniform(columns: u32, rows: u32, walkable: bool) -> Result<Self, GridError> {
        let len = checked_len(columns, rows)?;
        Self::from_cells(columns, rows, vec![walkable; len])
    }

    /// Number of cells along the x axis.
    #[must_use]
    pub const fn columns(&self) -> u32 {
        self.columns
    }

    /// Number of cells along the z axis.
    #[must_use]
    pub const fn rows(&self) -> u32 {
        self.rows
    }

    /// Reports whether the cell is walkable. Cells outside the grid are not.
    #[must_use]
    pub fn is_walkable(&self, cell: GridCoord) -> bool {
        if cell.column() >= self.columns || cell.row() >= self.rows {
            return false;
        }
        self.walkable[cell.row() as usize * self.columns as usize + cell.column() as usize]
    }

    /// Iterator over walkable coordinates in scan order.
    pub fn walkable_cells(&self) -> impl Iterator<Item = GridCoord> + '_ {
        let columns = self.columns;
        self.walkable
            .iter()
            .enumerate()
            .filter(|(_, walkable)| **walkable)
            .map(move |(index, _)| {
                let index = index as u32;
                GridCoord::new(index % columns, index / columns)
            })
    }

    /// Number of walkable cells.
    #[must_use]
    pub fn walkable_count(&self) -> usize {
        self.walkable.iter().filter(|walkable| **walkable).count()
    }
}

/// Immutable bundle of everything placement systems read about the ground.
#[derive(Clone, Debug)]
pub struct Terrain {
    biome: Biome,
    grid: TerrainGrid,
    field: HeightField,
    mask: PlacementMask,
}

impl Terrain {
    /// Bundles a height field and mask that share the same shape.
    pub fn new(
        biome: Biome,
        grid: TerrainGrid,
        field: HeightField,
        mask: PlacementMask,
    ) -> Result<Self, GridError> {
        if field.columns() != mask.columns() || field.rows() != mask.rows() {
            return Err(GridError::ShapeMismatch {
                left_columns: field.columns(),
                left_rows: field.rows(),
                right_columns: mask.columns(),
                right_rows: mask.rows(),
            });
        }
        if grid.columns() != field.columns() || grid.rows() != field.rows() {
            return Err(GridError::ShapeMismatch {
                left_columns: grid.columns(),
                left_rows: grid.rows(),
                right_columns: field.columns(),
                right_rows: field.rows(),
            });
        }
        Ok(Self {
            biome,
            grid,
            field,
            mask,
        })
    }

    /// Biome whose rules shaped the terrain.
    #[must_use]
    pub const fn biome(&self) -> Biome {
        self.biome
    }

    /// Mapping between grid indices and world space.
    #[must_use]
    pub const fn grid(&self) -> &TerrainGrid {
        &self.grid
    }

    /// Elevation samples.
    #[must_use]
    pub const fn field(&self) -> &HeightField {
        &self.field
    }

    /// Walkability mask.
    #[must_use]
    pub const fn mask(&self) -> &PlacementMask {
        &self.mask
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_mismatched_sample_counts() {
        let error = HeightField::from_samples(3, 3, vec![0.0; 8]).unwrap_err();
        assert_eq!(
            error,
            GridError::SampleCount {
                expected: 9,
                actual: 8,
            }
        );
    }

    #[test]
    fn rejects_empty_dimensions() {
        assert!(matches!(
            PlacementMask::uniform(0, 4, true),
            Err(GridError::EmptyDimensions { .. })
        ));
    }

    #[test]
    fn cells_iterate_in_scan_order() {
        let field = HeightField::from_samples(2, 2, vec![0.1, 0.2, 0.3, 0.4]).unwrap();
        let cells: Vec<(GridCoord, f32)> = field.cells().collect();
        assert_eq!(cells[1], (GridCoord::new(1, 0), 0.2));
        assert_eq!(cells[2], (GridCoord::new(0, 1), 0.3));
        assert_eq!(field.height_at(-1, 0), None);
    }

    #[test]
    fn terrain_requires_matching_shapes() {
        let field = HeightField::flat(4, 4, 0.5).unwrap();
        let mask = PlacementMask::uniform(4, 3, true).unwrap();
        let grid = TerrainGrid::new(4, 4, 10.0, 1.0);
        assert!(Terrain::new(Biome::Forest, grid, field, mask).is_err());
    }
}
