#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Constrained scatter placement.
//!
//! [`scatter`] collects every cell that satisfies the walkability, height,
//! flatness and centre-distance constraints, shuffles them, and greedily keeps
//! those that clear the exclusion zones and the spacing requirement. The
//! archetype generators in [`generators`] layer category-specific attributes
//! on top of the raw placements.

pub mod archetype;
pub mod generators;

use rand::{seq::SliceRandom, Rng};
use tracing::debug;
use worldforge_core::{ExclusionZone, GridCoord, Position, Terrain};

pub use archetype::Archetype;
pub use generators::{
    footprint_zones, place_buildings, place_rocks, place_street_lamps, plant_trees,
};

/// Constraints an archetype imposes on candidate cells.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlacementRules {
    /// Lowest acceptable cell height.
    pub min_height: f32,
    /// Highest acceptable cell height.
    pub max_height: f32,
    /// Minimum planar distance between accepted placements in world units.
    pub min_spacing: f32,
    /// Radius in cells that must be level around a candidate; zero disables it.
    pub flatness_radius: u32,
    /// Largest height difference tolerated inside the flatness radius.
    pub flatness_tolerance: f32,
    /// Largest planar distance from the world centre, if bounded.
    pub max_center_distance: Option<f32>,
}

impl PlacementRules {
    /// Rules accepting the height band of `min_height..=max_height` with no
    /// spacing, flatness or centre constraints.
    #[must_use]
    pub const fn within(min_height: f32, max_height: f32) -> Self {
        Self {
            min_height,
            max_height,
            min_spacing: 0.0,
            flatness_radius: 0,
            flatness_tolerance: 0.0,
            max_center_distance: None,
        }
    }
}

/// Positions a scatter pass must keep clear of.
#[derive(Clone, Copy, Debug, Default)]
pub struct Obstacles<'a> {
    /// Circles no placement may fall inside.
    pub exclusions: &'a [ExclusionZone],
    /// Already placed instances that count against the spacing requirement.
    pub existing: &'a [Position],
}

/// Accepted cell together with its world-space position.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Placement {
    /// Grid cell the placement snapped to.
    pub cell: GridCoord,
    /// World position with elevation already scaled.
    pub position: Position,
}

/// Places up to `count` instances on the terrain.
///
/// Returns fewer placements, possibly none, when the candidates run out.
pub fn scatter<R: Rng + ?Sized>(
    terrain: &Terrain,
    rules: &PlacementRules,
    count: usize,
    obstacles: Obstacles<'_>,
    rng: &mut R,
) -> Vec<Placement> {
    if count == 0 {
        return Vec::new();
    }

    let mut candidates = candidate_cells(terrain, rules);
    let candidate_count = candidates.len();
    candidates.shuffle(rng);

    let mut accepted: Vec<Placement> = Vec::with_capacity(count.min(candidate_count));
    for placement in candidates {
        if accepted.len() >= count {
            break;
        }
        let position = placement.position;
        if obstacles
            .exclusions
            .iter()
            .any(|zone| zone.contains(position))
        {
            continue;
        }
        let crowded = obstacles
            .existing
            .iter()
            .copied()
            .chain(accepted.iter().map(|placed| placed.position))
            .any(|other| other.planar_distance(position) < rules.min_spacing);
        if crowded {
            continue;
        }
        accepted.push(placement);
    }

    debug!(
        requested = count,
        candidates = candidate_count,
        placed = accepted.len(),
        "scatter pass finished"
    );
    accepted
}

/// Every cell satisfying the rules' per-cell constraints, in scan order.
#[must_use]
pub fn candidate_cells(terrain: &Terrain, rules: &PlacementRules) -> Vec<Placement> {
    let field = terrain.field();
    let grid = terrain.grid();
    let centre = Position::default();

    terrain
        .mask()
        .walkable_cells()
        .filter_map(|cell| {
            let height = field.height(cell)?;
            if height < rules.min_height || height > rules.max_height {
                return None;
            }
            if rules.flatness_radius > 0 && !is_level(terrain, cell, height, rules) {
                return None;
            }
            let position = grid.to_world(cell, height);
            if let Some(limit) = rules.max_center_distance {
                if position.planar_distance(centre) > limit {
                    return None;
                }
            }
            Some(Placement { cell, position })
        })
        .collect()
}

fn is_level(terrain: &Terrain, cell: GridCoord, height: f32, rules: &PlacementRules) -> bool {
    let radius = rules.flatness_radius as i64;
    let reach = rules.flatness_radius as f32;
    let (column, row) = (i64::from(cell.column()), i64::from(cell.row()));

    for dr in -radius..=radius {
        for dc in -radius..=radius {
            if ((dc * dc + dr * dr) as f32).sqrt() > reach {
                continue;
            }
            match terrain.field().height_at(column + dc, row + dr) {
                Some(neighbour) if (neighbour - height).abs() <= rules.flatness_tolerance => {}
                _ => return false,
            }
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use worldforge_core::{Biome, HeightField, PlacementMask, TerrainGrid};

    use super::*;

    fn terrain(samples: Vec<f32>, size: u32) -> Terrain {
        let field = HeightField::from_samples(size, size, samples).unwrap();
        let mask = PlacementMask::uniform(size, size, true).unwrap();
        let grid = TerrainGrid::new(size, size, (size - 1) as f32, 1.0);
        Terrain::new(Biome::Forest, grid, field, mask).unwrap()
    }

    #[test]
    fn flatness_rejects_cells_near_bumps() {
        let mut samples = vec![0.5; 49];
        samples[3 * 7 + 3] = 0.7;
        let terrain = terrain(samples, 7);
        let rules = PlacementRules {
            flatness_radius: 1,
            flatness_tolerance: 0.05,
            ..PlacementRules::within(0.0, 1.0)
        };

        let cells: Vec<GridCoord> = candidate_cells(&terrain, &rules)
            .into_iter()
            .map(|placement| placement.cell)
            .collect();

        assert!(!cells.contains(&GridCoord::new(3, 3)));
        assert!(!cells.contains(&GridCoord::new(2, 3)));
        assert!(
            !cells.contains(&GridCoord::new(0, 0)),
            "edge lacks neighbours"
        );
        assert!(cells.contains(&GridCoord::new(2, 2)));
    }

    #[test]
    fn centre_distance_bounds_candidates() {
        let terrain = terrain(vec![0.5; 121], 11);
        let rules = PlacementRules {
            max_center_distance: Some(2.1),
            ..PlacementRules::within(0.0, 1.0)
        };
        let cells = candidate_cells(&terrain, &rules);
        assert_eq!(cells.len(), 13);
    }

    #[test]
    fn exclusion_zones_and_existing_positions_are_respected() {
        let terrain = terrain(vec![0.5; 121], 11);
        let rules = PlacementRules {
            min_spacing: 2.0,
            ..PlacementRules::within(0.0, 1.0)
        };
        let zones = [ExclusionZone::new(Position::default(), 3.0, 1.0)];
        let existing = [Position::new(4.0, 0.0, 4.0)];
        let mut rng = ChaCha8Rng::seed_from_u64(9);

        let placements = scatter(
            &terrain,
            &rules,
            200,
            Obstacles {
                exclusions: &zones,
                existing: &existing,
            },
            &mut rng,
        );

        assert!(!placements.is_empty());
        for placement in &placements {
            assert!(!zones[0].contains(placement.position));
            assert!(placement.position.planar_distance(existing[0]) >= 2.0);
        }
    }
}
