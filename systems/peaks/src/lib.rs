#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Mountain peak detection for winter-like terrain.
//!
//! Candidates are interior cells above a height threshold that no
//! 8-neighbour exceeds by more than a small tolerance. They are visited in
//! scan order and accepted greedily while they keep [`MIN_DISTANCE`] from
//! every earlier peak.

use tracing::debug;
use worldforge_core::{Biome, ExclusionZone, GridCoord, HeightField, Peak, Terrain};

/// Radius of a rendered mountain at unit scale, in world units.
pub const PEAK_RADIUS: f32 = 8.0;

/// Minimum planar distance between accepted peaks.
pub const MIN_DISTANCE: f32 = 3.0 * PEAK_RADIUS;

/// Peaks detected when the request names no mountain count.
pub const DEFAULT_MAX_PEAKS: u32 = 3;

/// Upper bound on detected peaks.
pub const MAX_PEAKS_CAP: u32 = 8;

/// Share of the biome height multiplier a cell must exceed to be a peak.
pub const THRESHOLD_FACTOR: f32 = 0.6;

/// Slack allowed when comparing a candidate against its neighbours.
pub const NEIGHBOUR_TOLERANCE: f32 = 0.02;

/// Tunables of a detection pass.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Config {
    max_peaks: u32,
    threshold: f32,
    tolerance: f32,
    min_distance: f32,
}

impl Config {
    /// Creates a configuration from explicit values.
    #[must_use]
    pub const fn new(max_peaks: u32, threshold: f32, tolerance: f32, min_distance: f32) -> Self {
        Self {
            max_peaks,
            threshold,
            tolerance,
            min_distance,
        }
    }

    /// Default configuration for the biome, honouring a requested peak count.
    #[must_use]
    pub fn for_biome(biome: Biome, requested: Option<u32>) -> Self {
        Self::new(
            requested.unwrap_or(DEFAULT_MAX_PEAKS).min(MAX_PEAKS_CAP),
            THRESHOLD_FACTOR * biome.rules().height_multiplier,
            NEIGHBOUR_TOLERANCE,
            MIN_DISTANCE,
        )
    }

    /// Largest number of peaks the pass accepts.
    #[must_use]
    pub const fn max_peaks(&self) -> u32 {
        self.max_peaks
    }

    /// Height a candidate must exceed.
    #[must_use]
    pub const fn threshold(&self) -> f32 {
        self.threshold
    }
}

/// Detects up to `max_peaks` well-separated local maxima.
#[must_use]
pub fn detect_peaks(terrain: &Terrain, config: &Config) -> Vec<Peak> {
    let field = terrain.field();
    let grid = terrain.grid();
    let mut peaks: Vec<Peak> = Vec::new();
    let mut candidates = 0_usize;

    for (cell, height) in field.cells() {
        if peaks.len() >= config.max_peaks as usize {
            break;
        }
        if !is_interior(field, cell) || height <= config.threshold {
            continue;
        }
        if !is_local_maximum(field, cell, height, config.tolerance) {
            continue;
        }
        candidates += 1;

        let position = grid.to_world(cell, height);
        let separated = peaks
            .iter()
            .all(|peak| peak.position.planar_distance(position) >= config.min_distance);
        if !separated {
            continue;
        }
        peaks.push(Peak {
            position,
            scale: peak_scale(height, config.threshold),
            rotation: 0.0,
        });
    }

    debug!(
        candidates,
        accepted = peaks.len(),
        max_peaks = config.max_peaks,
        "peak detection finished"
    );
    peaks
}

/// Exclusion zones keeping other placements off the rendered mountains.
#[must_use]
pub fn exclusion_zones(peaks: &[Peak]) -> Vec<ExclusionZone> {
    peaks
        .iter()
        .map(|peak| ExclusionZone::new(peak.position, PEAK_RADIUS, peak.scale))
        .collect()
}

/// Taller summits render larger, up to half again the base size.
fn peak_scale(height: f32, threshold: f32) -> f32 {
    if threshold <= 0.0 {
        return 1.0;
    }
    (height / threshold).clamp(1.0, 1.5)
}

fn is_interior(field: &HeightField, cell: GridCoord) -> bool {
    cell.column() > 0
        && cell.row() > 0
        && cell.column() + 1 < field.columns()
        && cell.row() + 1 < field.rows()
}

fn is_local_maximum(field: &HeightField, cell: GridCoord, height: f32, tolerance: f32) -> bool {
    let (column, row) = (i64::from(cell.column()), i64::from(cell.row()));
    (-1..=1)
        .flat_map(|dr| (-1..=1).map(move |dc| (dc, dr)))
        .filter(|offset| *offset != (0, 0))
        .filter_map(|(dc, dr)| field.height_at(column + dc, row + dr))
        .all(|neighbour| neighbour <= height + tolerance)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_configuration_scales_with_biome() {
        let config = Config::for_biome(Biome::Mountain, None);
        assert_eq!(config.max_peaks(), DEFAULT_MAX_PEAKS);
        assert!((config.threshold() - 0.96).abs() < 1e-6);
        let capped = Config::for_biome(Biome::Arctic, Some(20));
        assert_eq!(capped.max_peaks(), MAX_PEAKS_CAP);
    }

    #[test]
    fn exclusion_radius_grows_with_scale() {
        let peak = Peak {
            position: worldforge_core::Position::default(),
            scale: 1.5,
            rotation: 0.0,
        };
        let zones = exclusion_zones(&[peak]);
        assert!((zones[0].effective_radius() - 12.0).abs() < f32::EPSILON);
    }

    #[test]
    fn plateaus_count_as_maxima() {
        let field = HeightField::flat(3, 3, 0.9).unwrap();
        assert!(is_local_maximum(&field, GridCoord::new(1, 1), 0.9, 0.0));
        assert!(!is_local_maximum(&field, GridCoord::new(1, 1), 0.8, 0.02));
    }
}
