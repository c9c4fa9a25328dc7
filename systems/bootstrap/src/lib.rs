#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure bootstrap system that generates a fresh world from parameters.
//!
//! Generation runs terrain, peaks, buildings, street lamps, trees, rocks,
//! spawn point and enemies in that order. Each randomized archetype draws
//! from its own stream derived from the world seed, so asking for more rocks
//! never moves a single tree.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde_json::{Map, Value};
use tracing::debug;
use worldforge_core::{
    seed::{
        derive_stream_seed, BUILDING_STREAM, ENEMY_STREAM, ROCK_STREAM, STREET_LAMP_STREAM,
        TREE_STREAM,
    },
    Batch, Biome, Building, BuildingSubtype, ExclusionZone, GenerationParams, GridCoord, GridError,
    Position, Presets, Terrain, TerrainSettings,
};
use worldforge_system_enemies::{place_enemies, EnemyRequest, DEFAULT_ENEMY_COUNT};
use worldforge_system_peaks::{detect_peaks, exclusion_zones};
use worldforge_system_scatter::{
    footprint_zones, place_buildings, place_rocks, place_street_lamps, plant_trees, Archetype,
    Obstacles,
};
use worldforge_system_terrain::{feature_multiplier, terrain_for};
use worldforge_world::{query, WorldSettings, WorldState};

const PEAK_KEYS: [&str; 4] = ["mountains", "mountain", "peaks", "peak"];
const TREE_KEYS: [&str; 2] = ["trees", "tree"];
const ROCK_KEYS: [&str; 4] = ["rocks", "rock", "boulders", "boulder"];
const BUILDING_KEYS: [&str; 2] = ["buildings", "building"];
const STREET_LAMP_KEYS: [&str; 4] = ["street_lamps", "street_lamp", "lamps", "lamp"];
const SUBTYPE_KEYS: [(BuildingSubtype, [&str; 2]); 2] = [
    (BuildingSubtype::Houses, ["houses", "house"]),
    (BuildingSubtype::Skyscrapers, ["skyscrapers", "skyscraper"]),
];

/// Freshly generated world together with the terrain it was placed on.
#[derive(Clone, Debug)]
pub struct GeneratedWorld {
    /// Authoritative world state.
    pub world: WorldState,
    /// Terrain regenerable from the world's stored terrain settings.
    pub terrain: Terrain,
}

/// Generates initial worlds.
#[derive(Debug)]
pub struct Bootstrap<'a, P: Presets + ?Sized> {
    presets: &'a P,
    terrain: TerrainSettings,
    enemies: worldforge_system_enemies::Config,
}

impl<'a, P: Presets + ?Sized> Bootstrap<'a, P> {
    /// Creates a generator using `terrain` as the template for every world's
    /// terrain settings. Seed and features are filled in per world.
    #[must_use]
    pub fn new(presets: &'a P, terrain: TerrainSettings) -> Self {
        Self {
            presets,
            terrain,
            enemies: worldforge_system_enemies::Config::default(),
        }
    }

    /// Overrides the enemy placement constraints.
    #[must_use]
    pub fn with_enemy_config(mut self, config: worldforge_system_enemies::Config) -> Self {
        self.enemies = config;
        self
    }

    /// Generates a world described by `params` from `seed`.
    ///
    /// Fails only when the configured terrain resolution cannot produce a
    /// valid height field.
    pub fn generate(
        &self,
        params: &GenerationParams,
        seed: u64,
    ) -> Result<GeneratedWorld, GridError> {
        let biome = Biome::from_name(&params.biome);
        let settings = self.terrain_settings(params, seed);
        let terrain = terrain_for(biome, &settings)?;

        let mut world = WorldState::new(WorldSettings::new(
            params.biome.clone(),
            params.time.clone(),
            settings,
        ));
        let palette = &params.color_palette;

        let peaks = if biome.is_winter() {
            let config =
                worldforge_system_peaks::Config::for_biome(biome, params.count_for(&PEAK_KEYS));
            detect_peaks(&terrain, &config)
        } else {
            Vec::new()
        };
        let mut exclusions = exclusion_zones(&peaks);
        let _ = world.append(Batch::Peaks(peaks));

        let buildings = self.buildings(&terrain, params, &exclusions, seed);
        exclusions.extend(footprint_zones(&buildings));
        let _ = world.append(Batch::Buildings(buildings));

        let obstacles = Obstacles {
            exclusions: &exclusions,
            existing: &[],
        };
        let lamps = place_street_lamps(
            &terrain,
            requested(params, &STREET_LAMP_KEYS, Archetype::StreetLamp, biome),
            obstacles,
            &mut stream(seed, STREET_LAMP_STREAM),
        );
        let _ = world.append(Batch::StreetLamps(lamps));

        let trees = plant_trees(
            &terrain,
            requested(params, &TREE_KEYS, Archetype::Tree, biome),
            obstacles,
            palette,
            &mut stream(seed, TREE_STREAM),
        );
        let _ = world.append(Batch::Trees(trees));

        let rocks = place_rocks(
            &terrain,
            requested(params, &ROCK_KEYS, Archetype::Rock, biome),
            obstacles,
            &mut stream(seed, ROCK_STREAM),
        );
        let _ = world.append(Batch::Rocks(rocks));
        let _ = world.append(Batch::CreativeObjects(params.creative_objects.clone()));

        let spawn = spawn_point(&terrain);
        world.set_spawn_point(spawn);

        let request = EnemyRequest {
            count: params.enemy_count.unwrap_or(DEFAULT_ENEMY_COUNT),
            kind: None,
            spawn,
            existing: &[],
            first_ordinal: world.next_enemy_ordinal(),
        };
        let enemies = place_enemies(
            &terrain,
            &request,
            &self.enemies,
            &mut stream(seed, ENEMY_STREAM),
        );
        let _ = world.append_enemies(enemies);

        if let Some(weapon) = &params.weapon {
            let mut combat = Map::new();
            let _ = combat.insert("weapon".to_owned(), Value::String(weapon.clone()));
            world.merge_combat_settings(combat);
        }
        if let Some(physics) = self
            .presets
            .physics(&params.biome)
            .or_else(|| self.presets.physics(biome.name()))
        {
            world.set_physics(physics);
        }
        let world_settings = world.settings_mut();
        world_settings.lighting = self.presets.lighting(&params.time);
        world_settings.sky = palette.sky_color.clone();

        debug!(
            biome = biome.name(),
            seed,
            enemies = query::enemies(&world).len(),
            "generated world"
        );
        Ok(GeneratedWorld { world, terrain })
    }

    fn terrain_settings(&self, params: &GenerationParams, seed: u64) -> TerrainSettings {
        let features = params
            .structure_counts
            .iter()
            .filter(|(keyword, count)| **count > 0 && feature_multiplier(keyword).is_some())
            .map(|(keyword, count)| (keyword.clone(), *count))
            .collect();
        TerrainSettings {
            seed,
            features,
            ..self.terrain.clone()
        }
    }

    fn buildings(
        &self,
        terrain: &Terrain,
        params: &GenerationParams,
        exclusions: &[ExclusionZone],
        seed: u64,
    ) -> Vec<Building> {
        let colors = &params.color_palette.building_colors;
        let mut rng = stream(seed, BUILDING_STREAM);
        let subtypes: Vec<(BuildingSubtype, u32)> = SUBTYPE_KEYS
            .iter()
            .filter_map(|(subtype, keys)| params.count_for(keys).map(|count| (*subtype, count)))
            .collect();

        if subtypes.is_empty() {
            let count = requested(params, &BUILDING_KEYS, Archetype::Building, terrain.biome());
            let obstacles = Obstacles {
                exclusions,
                existing: &[],
            };
            return place_buildings(terrain, count, None, obstacles, colors, &mut rng);
        }

        let mut buildings: Vec<Building> = Vec::new();
        for (subtype, count) in subtypes {
            let existing: Vec<Position> = buildings.iter().map(|placed| placed.position).collect();
            let obstacles = Obstacles {
                exclusions,
                existing: &existing,
            };
            buildings.extend(place_buildings(
                terrain,
                count,
                Some(subtype),
                obstacles,
                colors,
                &mut rng,
            ));
        }
        buildings
    }
}

fn requested(
    params: &GenerationParams,
    keys: &[&str],
    archetype: Archetype,
    biome: Biome,
) -> u32 {
    params
        .count_for(keys)
        .unwrap_or_else(|| archetype.default_count(biome))
}

fn stream(seed: u64, label: &str) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(derive_stream_seed(seed, label))
}

/// Player spawn point: the walkable cell closest to the grid centre.
///
/// Ties resolve to the first cell in scan order. Terrain without a single
/// walkable cell spawns the player at the centre itself.
#[must_use]
pub fn spawn_point(terrain: &Terrain) -> Position {
    let grid = terrain.grid();
    let centre = GridCoord::new(grid.columns() / 2, grid.rows() / 2);
    let cell = terrain
        .mask()
        .walkable_cells()
        .min_by(|a, b| a.distance(centre).total_cmp(&b.distance(centre)))
        .unwrap_or(centre);
    let height = terrain.field().height(cell).unwrap_or(0.0);
    grid.to_world(cell, height)
}
