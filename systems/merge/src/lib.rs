#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Applies structured diffs to an existing world.
//!
//! A merge runs six phases in a fixed order, each reading the state the
//! previous phase left behind:
//!
//! 1. world, lighting, physics, combat and spawn property overwrites,
//! 2. removals,
//! 3. caps and verbatim replacements,
//! 4. additions, running the placement generators for bare counts,
//! 5. collision removal of pre-existing instances crowding new ones,
//! 6. time-of-day and lighting recompute.
//!
//! Fields the diff normaliser could not interpret never reach the engine, so
//! a merge always completes and reports under-filled generations as
//! [`Shortfall`]s instead of failing.

use std::collections::{BTreeMap, BTreeSet};

use rand::Rng;
use tracing::{debug, warn};
use worldforge_core::{
    AddRequest, Biome, Category, ColorPalette, Diff, EnemyKind, ExclusionZone, Position,
    PresetRequest, Presets, Selector, SetRequest, Terrain, TimeChange,
};
use worldforge_system_enemies::{place_enemies, EnemyRequest};
use worldforge_system_scatter::{
    footprint_zones, place_buildings, place_rocks, place_street_lamps, plant_trees, Obstacles,
};
use worldforge_system_terrain::terrain_for;
use worldforge_world::{query, respond, MergeResponse, Shortfall, Touched, WorldState};

/// Pure system merging diffs into worlds.
#[derive(Debug)]
pub struct MergeEngine<'a, P: Presets + ?Sized> {
    presets: &'a P,
    enemies: worldforge_system_enemies::Config,
}

impl<'a, P: Presets + ?Sized> MergeEngine<'a, P> {
    /// Creates an engine resolving preset names through `presets`.
    #[must_use]
    pub fn new(presets: &'a P) -> Self {
        Self {
            presets,
            enemies: worldforge_system_enemies::Config::default(),
        }
    }

    /// Overrides the enemy placement constraints used for generated enemies.
    #[must_use]
    pub fn with_enemy_config(mut self, config: worldforge_system_enemies::Config) -> Self {
        self.enemies = config;
        self
    }

    /// Applies `diff` to `world`, regenerating `terrain` when the diff
    /// changes the biome or terrain settings.
    pub fn apply<R: Rng + ?Sized>(
        &self,
        world: &mut WorldState,
        terrain: &mut Terrain,
        diff: Diff,
        rng: &mut R,
    ) -> MergeResponse {
        let Diff {
            world: patch,
            remove,
            set,
            add,
            physics,
            lighting,
            combat,
            spawn_point,
            time_change,
        } = diff;
        let mut touched = Touched::default();

        let reshaped = merge_world_patch(world, patch, &mut touched);
        if reshaped {
            regenerate(world, terrain);
        }
        self.merge_presets(world, physics, lighting, &mut touched);
        if let Some(settings) = combat {
            world.merge_combat_settings(settings);
        }
        if let Some(spawn_point) = spawn_point {
            world.set_spawn_point(spawn_point);
            touched.spawn_point = true;
        }
        debug!(phase = "properties", ?touched, reshaped, "merged world properties");

        for (selector, amount) in remove {
            let current = query::count(world, selector);
            world.truncate(selector, amount.remaining_after_removal(current));
            debug!(
                phase = "remove",
                selector = selector.key(),
                before = current,
                after = query::count(world, selector),
                "removed instances"
            );
        }

        for (selector, request) in set {
            match request {
                SetRequest::Limit(amount) => {
                    let current = query::count(world, selector);
                    world.truncate(selector, amount.limit(current));
                }
                SetRequest::Replace(batch) => {
                    if !world.replace(selector, batch) {
                        warn!(
                            selector = selector.key(),
                            "skipping replacement with mismatched category"
                        );
                    }
                }
            }
            debug!(
                phase = "set",
                selector = selector.key(),
                count = query::count(world, selector),
                "applied set"
            );
        }

        let baseline = baseline_counts(world);
        let mut shortfalls = BTreeMap::new();
        for (selector, request) in add {
            match request {
                AddRequest::Items(batch) => {
                    let added = world.append(batch);
                    debug!(phase = "add", selector = selector.key(), added, "appended");
                }
                AddRequest::Generate(count) => {
                    let Some(placed) = self.generate(world, terrain, selector, count, rng) else {
                        continue;
                    };
                    debug!(
                        phase = "add",
                        selector = selector.key(),
                        requested = count,
                        placed,
                        "generated"
                    );
                    if placed < count as usize {
                        let _ = shortfalls.insert(
                            selector.key().to_owned(),
                            Shortfall {
                                requested: count as usize,
                                placed,
                            },
                        );
                    }
                }
            }
        }

        let auto_removed = remove_collisions(world, &baseline);

        if let Some(change) = time_change {
            self.change_time(world, change);
            touched.world = true;
        }

        let mut response = respond(world, touched);
        response.auto_removed = auto_removed;
        response.shortfalls = shortfalls;
        response
    }

    fn merge_presets(
        &self,
        world: &mut WorldState,
        physics: Option<PresetRequest>,
        lighting: Option<PresetRequest>,
        touched: &mut Touched,
    ) {
        match physics {
            Some(PresetRequest::Inline(value)) => {
                world.set_physics(value);
                touched.physics = true;
            }
            Some(PresetRequest::Named(name)) => match self.presets.physics(&name) {
                Some(value) => {
                    world.set_physics(value);
                    touched.physics = true;
                }
                None => warn!(preset = %name, "unknown physics preset"),
            },
            None => {}
        }

        match lighting {
            Some(PresetRequest::Inline(value)) => {
                world.settings_mut().lighting = Some(value);
                touched.world = true;
            }
            Some(PresetRequest::Named(name)) => match self.presets.lighting(&name) {
                Some(value) => {
                    world.settings_mut().lighting = Some(value);
                    touched.world = true;
                }
                None => warn!(preset = %name, "unknown lighting preset"),
            },
            None => {}
        }
    }

    /// Runs the generator behind `selector`, returning how many instances it
    /// placed, or `None` when the category cannot be generated from a count.
    fn generate<R: Rng + ?Sized>(
        &self,
        world: &mut WorldState,
        terrain: &Terrain,
        selector: Selector,
        count: u32,
        rng: &mut R,
    ) -> Option<usize> {
        let structures = query::structures(world);
        let mut exclusions = worldforge_system_peaks::exclusion_zones(&structures.peaks);
        let category = selector.category();
        if category != Category::Building && category != Category::Enemy {
            exclusions.extend(footprint_zones(&structures.buildings));
        }
        let existing = existing_positions(world, category);
        let obstacles = Obstacles {
            exclusions: &exclusions,
            existing: &existing,
        };

        let placed = match selector {
            Selector::Category(Category::Tree) => {
                let trees = plant_trees(terrain, count, obstacles, &ColorPalette::default(), rng);
                world.append(worldforge_core::Batch::Trees(trees))
            }
            Selector::Category(Category::Rock) => {
                let rocks = place_rocks(terrain, count, obstacles, rng);
                world.append(worldforge_core::Batch::Rocks(rocks))
            }
            Selector::Category(Category::Building) | Selector::Subtype(_) => {
                let subtype = match selector {
                    Selector::Subtype(subtype) => Some(subtype),
                    Selector::Category(_) => None,
                };
                let buildings = place_buildings(terrain, count, subtype, obstacles, &[], rng);
                world.append(worldforge_core::Batch::Buildings(buildings))
            }
            Selector::Category(Category::StreetLamp) => {
                let lamps = place_street_lamps(terrain, count, obstacles, rng);
                world.append(worldforge_core::Batch::StreetLamps(lamps))
            }
            Selector::Category(Category::Enemy) => {
                let kind = query::combat(world)
                    .settings
                    .get("enemy_type")
                    .and_then(|value| value.as_str())
                    .map(EnemyKind::from_name);
                let request = EnemyRequest {
                    count,
                    kind,
                    spawn: query::spawn_point(world).unwrap_or_default(),
                    existing: &existing,
                    first_ordinal: world.next_enemy_ordinal(),
                };
                let enemies = place_enemies(terrain, &request, &self.enemies, rng);
                world.append_enemies(enemies)
            }
            Selector::Category(Category::Peak | Category::CreativeObject) => {
                warn!(
                    selector = selector.key(),
                    requested = count,
                    "category needs explicit instances; skipping bare count"
                );
                return None;
            }
        };
        Some(placed)
    }

    fn change_time(&self, world: &mut WorldState, change: TimeChange) {
        let (time, lighting) = match change {
            TimeChange::To(time) => {
                let lighting = self.presets.lighting(&time);
                (time, lighting)
            }
            TimeChange::Blend { from, to, progress } => {
                let lighting = self.presets.blend_lighting(&from, &to, progress);
                (if progress >= 1.0 { to } else { from }, lighting)
            }
        };
        debug!(phase = "time", time = %time, resolved = lighting.is_some(), "changed time");
        let settings = world.settings_mut();
        settings.time = time;
        if let Some(lighting) = lighting {
            settings.lighting = Some(lighting);
        }
    }
}

/// Overwrites world properties, returning whether the ground must be rebuilt.
fn merge_world_patch(
    world: &mut WorldState,
    patch: worldforge_core::WorldPatch,
    touched: &mut Touched,
) -> bool {
    if patch.is_empty() {
        return false;
    }
    touched.world = true;

    let settings = world.settings_mut();
    let mut reshaped = false;
    if let Some(biome) = patch.biome {
        reshaped |= Biome::from_name(&biome) != Biome::from_name(&settings.biome);
        settings.biome = biome;
    }
    if let Some(time) = patch.time {
        settings.time = time;
    }
    if let Some(sky) = patch.sky {
        settings.sky = Some(sky);
    }
    if let Some(lighting) = patch.lighting {
        settings.lighting = Some(lighting);
    }
    if let Some(terrain) = patch.terrain {
        reshaped |= terrain.apply(&mut settings.terrain);
    }
    reshaped
}

fn regenerate(world: &WorldState, terrain: &mut Terrain) {
    let biome = query::biome(world);
    match terrain_for(biome, query::terrain_settings(world)) {
        Ok(regenerated) => {
            *terrain = regenerated;
            debug!(biome = biome.name(), "regenerated terrain");
        }
        Err(error) => warn!(%error, "keeping previous terrain"),
    }
}

fn existing_positions(world: &WorldState, category: Category) -> Vec<Position> {
    query::positions(world, category)
        .into_iter()
        .flatten()
        .collect()
}

fn baseline_counts(world: &WorldState) -> BTreeMap<Category, usize> {
    Category::ALL
        .into_iter()
        .map(|category| (category, query::count(world, Selector::Category(category))))
        .collect()
}

/// Removes pre-existing structures crowding instances added by this merge.
///
/// The radius belongs to the existing instance's category. Enemies never take
/// part, and instances added by the same merge never displace each other.
fn remove_collisions(
    world: &mut WorldState,
    baseline: &BTreeMap<Category, usize>,
) -> BTreeMap<String, usize> {
    let structure_categories = || Category::ALL.into_iter().filter(|c| c.is_structure());

    let fresh: Vec<(Category, Position)> = structure_categories()
        .flat_map(|category| {
            let skip = baseline.get(&category).copied().unwrap_or(0);
            query::positions(world, category)
                .into_iter()
                .skip(skip)
                .flatten()
                .map(move |position| (category, position))
        })
        .collect();
    if fresh.is_empty() {
        return BTreeMap::new();
    }

    let mut doomed: BTreeMap<Category, BTreeSet<usize>> = BTreeMap::new();
    for category in structure_categories() {
        let radius = category.collision_radius();
        let take = baseline.get(&category).copied().unwrap_or(0);
        for (index, position) in query::positions(world, category)
            .into_iter()
            .take(take)
            .enumerate()
        {
            let Some(position) = position else {
                continue;
            };
            let zone = ExclusionZone::new(position, radius, 1.0);
            let crowded = fresh
                .iter()
                .any(|(added, at)| *added != category && zone.contains(*at));
            if crowded {
                let _ = doomed.entry(category).or_default().insert(index);
            }
        }
    }

    let mut removed = BTreeMap::new();
    for (category, indices) in doomed {
        let count = world.remove_indices(category, &indices);
        debug!(
            phase = "collisions",
            category = category.key(),
            count,
            "auto-removed"
        );
        let _ = removed.insert(category.key().to_owned(), count);
    }
    removed
}
