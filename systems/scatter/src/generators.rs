//! Archetype generators turning scatter placements into structure instances.

use std::f32::consts::{FRAC_PI_2, TAU};

use rand::{seq::SliceRandom, Rng};
use tracing::{debug, warn};
use worldforge_core::{
    Building, BuildingSubtype, ColorPalette, ExclusionZone, Rock, StreetLamp, Terrain, Tree,
};

use crate::{
    archetype::{building_catalogue, tree_types, ROCK_TYPES},
    scatter, Archetype, Obstacles, Placement,
};

/// Scale boost applied to trees in winter-like biomes.
pub const WINTER_TREE_SCALE: f32 = 1.3;

fn placements<R: Rng + ?Sized>(
    archetype: Archetype,
    terrain: &Terrain,
    count: u32,
    obstacles: Obstacles<'_>,
    rng: &mut R,
) -> Vec<Placement> {
    let category = archetype.category().key();
    let requested = count.min(archetype.cap());
    if requested < count {
        debug!(
            category,
            count,
            cap = archetype.cap(),
            "clamping request to cap"
        );
    }
    if requested == 0 {
        return Vec::new();
    }

    let biome = terrain.biome();
    let Some(rules) = archetype.rules(biome, terrain.grid().terrain_size()) else {
        debug!(
            category,
            biome = biome.name(),
            "biome does not host archetype"
        );
        return Vec::new();
    };

    let placed = scatter(terrain, &rules, requested as usize, obstacles, rng);
    if placed.len() < requested as usize {
        warn!(
            category,
            requested,
            placed = placed.len(),
            "placement candidates exhausted"
        );
    }
    placed
}

/// Plants up to `count` trees, stamping the palette's foliage colours.
pub fn plant_trees<R: Rng + ?Sized>(
    terrain: &Terrain,
    count: u32,
    obstacles: Obstacles<'_>,
    palette: &ColorPalette,
    rng: &mut R,
) -> Vec<Tree> {
    let biome = terrain.biome();
    let winter = biome.is_winter();
    let types = tree_types(biome);

    placements(Archetype::Tree, terrain, count, obstacles, rng)
        .into_iter()
        .map(|placement| {
            let kind = types.choose(rng).copied().unwrap_or("oak");
            let mut scale = rng.gen_range(0.8..1.4);
            if winter {
                scale *= WINTER_TREE_SCALE;
            }
            Tree {
                kind: kind.to_owned(),
                position: placement.position,
                scale,
                rotation: rng.gen_range(0.0..TAU),
                leafless: winter,
                leaf_color: palette.leaf_color.clone(),
                trunk_color: palette.trunk_color.clone(),
            }
        })
        .collect()
}

/// Scatters up to `count` rocks.
pub fn place_rocks<R: Rng + ?Sized>(
    terrain: &Terrain,
    count: u32,
    obstacles: Obstacles<'_>,
    rng: &mut R,
) -> Vec<Rock> {
    placements(Archetype::Rock, terrain, count, obstacles, rng)
        .into_iter()
        .map(|placement| Rock {
            kind: ROCK_TYPES.choose(rng).unwrap_or(&"stone").to_string(),
            position: placement.position,
            scale: rng.gen_range(0.5..1.5),
            rotation: rng.gen_range(0.0..TAU),
        })
        .collect()
}

/// Places up to `count` buildings drawn from the biome catalogue.
///
/// A subtype restricts the catalogue to that subtype. Non-empty `colors`
/// override the catalogue colours round-robin.
pub fn place_buildings<R: Rng + ?Sized>(
    terrain: &Terrain,
    count: u32,
    subtype: Option<BuildingSubtype>,
    obstacles: Obstacles<'_>,
    colors: &[String],
    rng: &mut R,
) -> Vec<Building> {
    let catalogue = building_catalogue(terrain.biome(), subtype);
    if catalogue.is_empty() {
        if count > 0 {
            warn!(
                category = "buildings",
                subtype = subtype.map(BuildingSubtype::key),
                biome = terrain.biome().name(),
                requested = count,
                placed = 0,
                "biome has no matching building templates"
            );
        }
        return Vec::new();
    }

    placements(Archetype::Building, terrain, count, obstacles, rng)
        .into_iter()
        .enumerate()
        .filter_map(|(index, placement)| {
            let template = catalogue.choose(rng)?;
            let color = if colors.is_empty() {
                template.color.to_owned()
            } else {
                colors[index % colors.len()].clone()
            };
            Some(Building {
                kind: template.kind,
                position: placement.position,
                scale: 1.0,
                rotation: f32::from(rng.gen_range(0_u8..4)) * FRAC_PI_2,
                height: template.height,
                width: template.width,
                depth: template.depth,
                color,
            })
        })
        .collect()
}

/// Places up to `count` street lamps near the centre of city terrain.
pub fn place_street_lamps<R: Rng + ?Sized>(
    terrain: &Terrain,
    count: u32,
    obstacles: Obstacles<'_>,
    rng: &mut R,
) -> Vec<StreetLamp> {
    placements(Archetype::StreetLamp, terrain, count, obstacles, rng)
        .into_iter()
        .map(|placement| StreetLamp {
            position: placement.position,
            scale: 1.0,
            rotation: rng.gen_range(0.0..TAU),
        })
        .collect()
}

/// Exclusion zones covering building footprints.
///
/// Each zone's radius is half the longer footprint side, scaled by the
/// building's own scale.
#[must_use]
pub fn footprint_zones(buildings: &[Building]) -> Vec<ExclusionZone> {
    buildings
        .iter()
        .map(|building| {
            ExclusionZone::new(
                building.position,
                building.width.max(building.depth) / 2.0,
                building.scale,
            )
        })
        .collect()
}
