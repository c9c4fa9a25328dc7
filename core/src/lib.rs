#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the worldforge engine.
//!
//! This crate defines the vocabulary that connects adapters, the authoritative
//! world state, and pure systems. Adapters hand over [`GenerationParams`] and
//! [`Diff`] values produced by external collaborators, systems turn terrain
//! views into placements, and the world crate stores the resulting instances.
//! Nothing in here performs I/O; every randomized system receives its random
//! source from the caller.

pub mod biome;
pub mod diff;
pub mod grid;
pub mod lenient;
pub mod params;
pub mod presets;
pub mod seed;
pub mod structures;

use serde::{Deserialize, Serialize};

pub use biome::{Biome, BiomeRules};
pub use diff::{
    AddRequest, Amount, Batch, Diff, PresetRequest, SetRequest, TerrainPatch, TimeChange,
    WorldPatch,
};
pub use grid::{GridError, HeightField, PlacementMask, Terrain};
pub use params::{ColorPalette, GenerationParams};
pub use presets::{NoPresets, Presets};
pub use seed::derive_stream_seed;
pub use structures::{
    Building, BuildingKind, BuildingSubtype, Category, CreativeObject, Enemy, EnemyDraft,
    EnemyKind, EnemyStats, Peak, Placed, Rock, Selector, StreetLamp, Tree,
};

/// Collision radius applied around most structures when newly added
/// instances displace existing ones.
pub const COLLISION_RADIUS: f32 = 5.0;

/// Collision radius applied around mountain peaks.
pub const PEAK_COLLISION_RADIUS: f32 = 10.0;

/// Location in world space measured in world units.
///
/// `y` carries elevation already multiplied by the terrain's vertical scale.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Horizontal coordinate along the terrain's column axis.
    pub x: f32,
    /// Vertical coordinate.
    #[serde(default)]
    pub y: f32,
    /// Horizontal coordinate along the terrain's row axis.
    pub z: f32,
}

impl Position {
    /// Creates a new world-space position.
    #[must_use]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Euclidean distance between two positions ignoring elevation.
    #[must_use]
    pub fn planar_distance(self, other: Position) -> f32 {
        let dx = self.x - other.x;
        let dz = self.z - other.z;
        (dx * dx + dz * dz).sqrt()
    }
}

/// Location of a single height-field sample expressed as column and row.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridCoord {
    column: u32,
    row: u32,
}

impl GridCoord {
    /// Creates a new grid coordinate.
    #[must_use]
    pub const fn new(column: u32, row: u32) -> Self {
        Self { column, row }
    }

    /// Zero-based column index of the sample.
    #[must_use]
    pub const fn column(&self) -> u32 {
        self.column
    }

    /// Zero-based row index of the sample.
    #[must_use]
    pub const fn row(&self) -> u32 {
        self.row
    }

    /// Euclidean distance between two grid coordinates measured in cells.
    #[must_use]
    pub fn distance(self, other: GridCoord) -> f32 {
        let dc = self.column.abs_diff(other.column) as f32;
        let dr = self.row.abs_diff(other.row) as f32;
        (dc * dc + dr * dr).sqrt()
    }
}

/// Describes how height-field indices map onto world space.
///
/// A grid with `columns` samples spans `columns - 1` segments, so the first
/// sample sits at `-terrain_size / 2` and the last at `+terrain_size / 2`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TerrainGrid {
    columns: u32,
    rows: u32,
    terrain_size: f32,
    vertical_scale: f32,
}

impl TerrainGrid {
    /// Creates a new terrain grid description.
    #[must_use]
    pub const fn new(columns: u32, rows: u32, terrain_size: f32, vertical_scale: f32) -> Self {
        Self {
            columns,
            rows,
            terrain_size,
            vertical_scale,
        }
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

    /// Side length of the square terrain in world units.
    #[must_use]
    pub const fn terrain_size(&self) -> f32 {
        self.terrain_size
    }

    /// Multiplier turning normalized elevation into world-space `y`.
    #[must_use]
    pub const fn vertical_scale(&self) -> f32 {
        self.vertical_scale
    }

    /// World-space length of one segment along the x axis.
    #[must_use]
    pub fn cell_length(&self) -> f32 {
        self.terrain_size / segments(self.columns)
    }

    /// Converts a column index into a world-space `x` coordinate.
    #[must_use]
    pub fn world_x(&self, column: u32) -> f32 {
        to_world(column, self.columns, self.terrain_size)
    }

    /// Converts a row index into a world-space `z` coordinate.
    #[must_use]
    pub fn world_z(&self, row: u32) -> f32 {
        to_world(row, self.rows, self.terrain_size)
    }

    /// Converts a grid sample and its normalized height into a world position.
    #[must_use]
    pub fn to_world(&self, cell: GridCoord, height: f32) -> Position {
        Position::new(
            self.world_x(cell.column()),
            height * self.vertical_scale,
            self.world_z(cell.row()),
        )
    }

    /// Converts world-space `(x, z)` back into the nearest grid sample.
    ///
    /// Coordinates outside the terrain clamp to the closest edge sample.
    #[must_use]
    pub fn to_grid(&self, x: f32, z: f32) -> GridCoord {
        GridCoord::new(
            to_index(x, self.columns, self.terrain_size),
            to_index(z, self.rows, self.terrain_size),
        )
    }
}

fn segments(samples: u32) -> f32 {
    samples.saturating_sub(1).max(1) as f32
}

fn to_world(index: u32, samples: u32, terrain_size: f32) -> f32 {
    (index as f32 / segments(samples)) * terrain_size - terrain_size / 2.0
}

fn to_index(coordinate: f32, samples: u32, terrain_size: f32) -> u32 {
    if samples == 0 || terrain_size <= 0.0 {
        return 0;
    }

    let normalized = (coordinate + terrain_size / 2.0) / terrain_size;
    let scaled = (normalized * segments(samples)).round();
    let max_index = samples.saturating_sub(1) as f32;
    scaled.clamp(0.0, max_index) as u32
}

/// Exclusion zone that placements must stay clear of.
///
/// The effective radius is `radius * scale`, letting large instances such as
/// mountain peaks keep surrounding objects proportionally further away.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ExclusionZone {
    /// Centre of the zone in world space.
    pub center: Position,
    /// Base radius of the zone in world units.
    pub radius: f32,
    /// Multiplier applied to the base radius.
    pub scale: f32,
}

impl ExclusionZone {
    /// Creates a new exclusion zone.
    #[must_use]
    pub const fn new(center: Position, radius: f32, scale: f32) -> Self {
        Self {
            center,
            radius,
            scale,
        }
    }

    /// Effective radius of the zone after scaling.
    #[must_use]
    pub fn effective_radius(&self) -> f32 {
        self.radius * self.scale
    }

    /// Reports whether the provided position falls inside the zone.
    #[must_use]
    pub fn contains(&self, position: Position) -> bool {
        self.center.planar_distance(position) < self.effective_radius()
    }
}

/// Persistent description of the terrain a world was generated from.
///
/// Stored alongside the world so the height field can be regenerated
/// deterministically when a later diff needs to place new instances.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainSettings {
    /// Seed feeding the terrain noise and feature bumps.
    pub seed: u64,
    /// Number of samples along each side of the height field.
    pub resolution: u32,
    /// Side length of the terrain in world units.
    pub terrain_size: f32,
    /// Divisor applied to grid coordinates before sampling noise.
    pub noise_scale: f32,
    /// Multiplier turning normalized elevation into world-space `y`.
    pub vertical_scale: f32,
    /// Requested feature bumps keyed by feature keyword.
    pub features: std::collections::BTreeMap<String, u32>,
}

impl Default for TerrainSettings {
    fn default() -> Self {
        Self {
            seed: 0,
            resolution: 128,
            terrain_size: 200.0,
            noise_scale: 24.0,
            vertical_scale: 20.0,
            features: std::collections::BTreeMap::new(),
        }
    }
}

impl TerrainSettings {
    /// Height-field resolutions accepted from worlds, diffs and configuration.
    pub const RESOLUTIONS: std::ops::RangeInclusive<u32> = 2..=4096;

    /// Rejects resolutions outside [`Self::RESOLUTIONS`].
    pub fn validate(&self) -> Result<(), GridError> {
        if Self::RESOLUTIONS.contains(&self.resolution) {
            Ok(())
        } else {
            Err(GridError::Resolution {
                resolution: self.resolution,
            })
        }
    }

    /// Builds the grid mapping described by these settings.
    #[must_use]
    pub fn grid(&self) -> TerrainGrid {
        let (low, high) = (*Self::RESOLUTIONS.start(), *Self::RESOLUTIONS.end());
        let resolution = self.resolution.clamp(low, high);
        TerrainGrid::new(
            resolution,
            resolution,
            self.terrain_size,
            self.vertical_scale,
        )
    }
}
