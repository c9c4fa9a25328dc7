#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Height field generation and walkability derivation.
//!
//! Heights come from fractal Perlin noise scaled by the biome's height
//! multiplier, then shaped by radial feature bumps such as mountains, hills
//! and river depressions. The placement mask marks cells whose height lies in
//! the biome's walkable band and whose cardinal slopes stay gentle.

use noise::{Fbm, MultiFractal, NoiseFn, Perlin};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::debug;
use worldforge_core::{
    seed, Biome, GridCoord, GridError, HeightField, PlacementMask, Terrain, TerrainSettings,
};

/// Number of octaves summed by the fractal noise.
pub const NOISE_OCTAVES: usize = 4;

/// Multiplier applied at the centre of a named feature bump.
///
/// Values above one raise the ground, values below one carve depressions.
#[must_use]
pub fn feature_multiplier(keyword: &str) -> Option<f32> {
    match keyword {
        "mountain" | "mountains" => Some(1.8),
        "hill" | "hills" => Some(1.3),
        "river" | "rivers" => Some(0.4),
        _ => None,
    }
}

/// Radius in cells of every feature bump on a grid of the given shape.
#[must_use]
pub fn bump_radius(columns: u32, rows: u32) -> f32 {
    (columns.min(rows) / 8).max(2) as f32
}

/// Generates a height field for the biome from noise and feature bumps.
pub fn generate_height_field<R: Rng + ?Sized>(
    biome: Biome,
    settings: &TerrainSettings,
    rng: &mut R,
) -> Result<HeightField, GridError> {
    let grid = settings.grid();
    let (columns, rows) = (grid.columns(), grid.rows());
    let multiplier = biome.rules().height_multiplier;
    let scale = f64::from(settings.noise_scale.max(f32::EPSILON));

    let fbm = Fbm::<Perlin>::new(rng.gen()).set_octaves(NOISE_OCTAVES);
    let mut samples = Vec::with_capacity(columns as usize * rows as usize);
    for row in 0..rows {
        for column in 0..columns {
            let value = fbm.get([f64::from(column) / scale, f64::from(row) / scale]);
            let normalized = ((value + 1.0) / 2.0).clamp(0.0, 1.0) as f32;
            samples.push(normalized * multiplier);
        }
    }
    let mut field = HeightField::from_samples(columns, rows, samples)?;

    for (keyword, count) in &settings.features {
        let Some(feature) = feature_multiplier(keyword) else {
            debug!(keyword = %keyword, "ignoring unknown terrain feature");
            continue;
        };
        for _ in 0..*count {
            let center = GridCoord::new(rng.gen_range(0..columns), rng.gen_range(0..rows));
            apply_bump(&mut field, center, feature, multiplier);
        }
    }

    Ok(field)
}

/// Multiplies heights around `center` by a linearly decaying factor.
///
/// Raising bumps never push a cell above `feature × biome_multiplier`, so
/// overlapping features cannot stack without bound.
pub fn apply_bump(
    field: &mut HeightField,
    center: GridCoord,
    feature: f32,
    biome_multiplier: f32,
) {
    let columns = field.columns();
    let rows = field.rows();
    let radius = bump_radius(columns, rows);
    let reach = radius.ceil() as u32;
    let cap = feature * biome_multiplier;

    let min_column = center.column().saturating_sub(reach);
    let max_column = center.column().saturating_add(reach).min(columns - 1);
    let min_row = center.row().saturating_sub(reach);
    let max_row = center.row().saturating_add(reach).min(rows - 1);

    let samples = field.samples_mut();
    for row in min_row..=max_row {
        for column in min_column..=max_column {
            let distance = center.distance(GridCoord::new(column, row));
            if distance >= radius {
                continue;
            }
            let factor = 1.0 + (feature - 1.0) * (1.0 - distance / radius);
            let index = row as usize * columns as usize + column as usize;
            let shaped = samples[index] * factor;
            samples[index] = if feature > 1.0 {
                shaped.min(cap.max(samples[index]))
            } else {
                shaped
            };
        }
    }
}

/// Derives the walkability mask for a height field under the biome's rules.
///
/// The outermost ring of cells is always unwalkable.
#[must_use]
pub fn derive_mask(field: &HeightField, biome: Biome) -> PlacementMask {
    let rules = biome.rules();
    let columns = field.columns();
    let rows = field.rows();

    PlacementMask::derive(field, |(cell, height)| {
        let (column, row) = (cell.column(), cell.row());
        if column == 0 || row == 0 || column + 1 >= columns || row + 1 >= rows {
            return false;
        }
        if height < rules.min_height || height > rules.max_height {
            return false;
        }
        max_cardinal_slope(field, column, row, height) <= rules.max_slope
    })
}

/// Largest absolute height difference to the four cardinal neighbours.
#[must_use]
pub fn max_cardinal_slope(field: &HeightField, column: u32, row: u32, height: f32) -> f32 {
    let (column, row) = (i64::from(column), i64::from(row));
    [(0, -1), (0, 1), (-1, 0), (1, 0)]
        .into_iter()
        .filter_map(|(dc, dr)| field.height_at(column + dc, row + dr))
        .map(|neighbour| (height - neighbour).abs())
        .fold(0.0, f32::max)
}

/// Builds the complete terrain for the biome from an injected random source.
pub fn generate_terrain<R: Rng + ?Sized>(
    biome: Biome,
    settings: &TerrainSettings,
    rng: &mut R,
) -> Result<Terrain, GridError> {
    let field = generate_height_field(biome, settings, rng)?;
    let mask = derive_mask(&field, biome);
    debug!(
        biome = biome.name(),
        columns = field.columns(),
        rows = field.rows(),
        walkable = mask.walkable_count(),
        "generated terrain"
    );
    Terrain::new(biome, settings.grid(), field, mask)
}

/// Regenerates the terrain described by persisted settings.
///
/// The random stream is derived from the settings' seed, so the same settings
/// always reproduce the same ground.
pub fn terrain_for(biome: Biome, settings: &TerrainSettings) -> Result<Terrain, GridError> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed::derive_stream_seed(
        settings.seed,
        seed::TERRAIN_STREAM,
    ));
    generate_terrain(biome, settings, &mut rng)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bump_radius_has_a_floor() {
        assert_eq!(bump_radius(128, 128), 16.0);
        assert_eq!(bump_radius(10, 12), 2.0);
    }

    #[test]
    fn raising_bumps_are_capped() {
        let mut field = HeightField::flat(9, 9, 0.8).unwrap();
        let center = GridCoord::new(4, 4);
        for _ in 0..10 {
            apply_bump(&mut field, center, 1.8, 0.8);
        }
        let peak = field.height(center).unwrap();
        assert!((peak - 1.44).abs() < 1e-5, "peak {peak}");
    }

    #[test]
    fn depressions_lower_the_centre_most() {
        let mut field = HeightField::flat(9, 9, 0.5).unwrap();
        apply_bump(&mut field, GridCoord::new(4, 4), 0.4, 0.8);
        let centre = field.height(GridCoord::new(4, 4)).unwrap();
        let edge = field.height(GridCoord::new(5, 4)).unwrap();
        let outside = field.height(GridCoord::new(7, 4)).unwrap();
        assert!((centre - 0.2).abs() < 1e-5);
        assert!(centre < edge && edge < outside);
        assert!((outside - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn border_cells_are_never_walkable() {
        let field = HeightField::flat(5, 5, 0.5).unwrap();
        let mask = derive_mask(&field, Biome::Forest);
        assert_eq!(mask.walkable_count(), 9);
        assert!(!mask.is_walkable(GridCoord::new(0, 2)));
        assert!(mask.is_walkable(GridCoord::new(2, 2)));
    }

    #[test]
    fn steep_cells_are_rejected() {
        let mut samples = vec![0.5; 25];
        samples[12] = 0.6;
        let field = HeightField::from_samples(5, 5, samples).unwrap();
        let mask = derive_mask(&field, Biome::Forest);
        assert!(!mask.is_walkable(GridCoord::new(2, 2)));
        assert!(!mask.is_walkable(GridCoord::new(1, 2)));
        assert!(mask.is_walkable(GridCoord::new(1, 1)));
    }
}
