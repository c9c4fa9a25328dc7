#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative world state for worldforge.
//!
//! [`WorldState`] owns every placed instance together with the world-level
//! settings. Systems read it through the [`query`] module and mutate it through
//! the narrow primitives below; nothing outside this crate touches the lists
//! directly, which keeps `enemy_count` and enemy identifiers consistent.

mod response;

use std::collections::BTreeSet;

use serde::{de, Deserialize, Serialize};
use serde_json::{Map, Value};
use worldforge_core::{
    Batch, Building, BuildingSubtype, Category, CreativeObject, Enemy, Peak, Position, Rock,
    Selector, StreetLamp, TerrainSettings, Tree,
};

pub use response::{respond, MergeResponse, Shortfall, Touched};

/// World-level properties that are not placed instances.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorldSettings {
    /// Biome name exactly as requested; unknown names keep default rules.
    pub biome: String,
    /// Time of day.
    pub time: String,
    /// Sky colour.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sky: Option<String>,
    /// Opaque lighting configuration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lighting: Option<Value>,
    /// Terrain the placements were generated on.
    #[serde(default)]
    pub terrain: TerrainSettings,
}

impl WorldSettings {
    /// Creates settings for the provided biome and time of day.
    #[must_use]
    pub fn new(
        biome: impl Into<String>,
        time: impl Into<String>,
        terrain: TerrainSettings,
    ) -> Self {
        Self {
            biome: biome.into(),
            time: time.into(),
            sky: None,
            lighting: None,
            terrain,
        }
    }
}

/// Insertion-ordered structure lists keyed by category.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Structures {
    /// Trees.
    pub trees: Vec<Tree>,
    /// Rocks.
    pub rocks: Vec<Rock>,
    /// Mountain peaks.
    pub peaks: Vec<Peak>,
    /// Buildings of every kind.
    pub buildings: Vec<Building>,
    /// Street lamps.
    pub street_lamps: Vec<StreetLamp>,
    /// Free-form objects.
    pub creative_objects: Vec<CreativeObject>,
}

/// Enemies and the opaque combat settings stored beside them.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Combat {
    /// Enemies in insertion order.
    #[serde(default)]
    pub enemies: Vec<Enemy>,
    /// Number of enemies; always equals `enemies.len()`.
    #[serde(default)]
    pub enemy_count: usize,
    /// Weapon, enemy type and any other opaque combat keys.
    #[serde(flatten)]
    pub settings: Map<String, Value>,
}

/// Aggregate of all placed entities and ancillary configuration for one
/// generated scene.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorldState {
    world: WorldSettings,
    #[serde(default)]
    structures: Structures,
    #[serde(default)]
    combat: Combat,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    physics: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    spawn_point: Option<Position>,
}

macro_rules! with_list {
    (mut $state:expr, $category:expr, $list:ident => $body:expr) => {
        match $category {
            Category::Tree => {
                let $list = &mut $state.structures.trees;
                $body
            }
            Category::Rock => {
                let $list = &mut $state.structures.rocks;
                $body
            }
            Category::Peak => {
                let $list = &mut $state.structures.peaks;
                $body
            }
            Category::Building => {
                let $list = &mut $state.structures.buildings;
                $body
            }
            Category::StreetLamp => {
                let $list = &mut $state.structures.street_lamps;
                $body
            }
            Category::CreativeObject => {
                let $list = &mut $state.structures.creative_objects;
                $body
            }
            Category::Enemy => {
                let $list = &mut $state.combat.enemies;
                $body
            }
        }
    };
    ($state:expr, $category:expr, $list:ident => $body:expr) => {
        match $category {
            Category::Tree => {
                let $list = &$state.structures.trees;
                $body
            }
            Category::Rock => {
                let $list = &$state.structures.rocks;
                $body
            }
            Category::Peak => {
                let $list = &$state.structures.peaks;
                $body
            }
            Category::Building => {
                let $list = &$state.structures.buildings;
                $body
            }
            Category::StreetLamp => {
                let $list = &$state.structures.street_lamps;
                $body
            }
            Category::CreativeObject => {
                let $list = &$state.structures.creative_objects;
                $body
            }
            Category::Enemy => {
                let $list = &$state.combat.enemies;
                $body
            }
        }
    };
}

impl WorldState {
    /// Creates an empty world with the provided settings.
    #[must_use]
    pub fn new(world: WorldSettings) -> Self {
        Self {
            world,
            structures: Structures::default(),
            combat: Combat::default(),
            physics: None,
            spawn_point: None,
        }
    }

    /// Parses a persisted world document.
    ///
    /// Documents whose terrain resolution falls outside
    /// [`TerrainSettings::RESOLUTIONS`] are rejected before any terrain is
    /// rebuilt from them.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        let mut state: Self = serde_json::from_str(text)?;
        if let Err(error) = state.world.terrain.validate() {
            return Err(de::Error::custom(error));
        }
        state.sync_enemy_count();
        Ok(state)
    }

    /// Mutable access to the world-level settings.
    pub fn settings_mut(&mut self) -> &mut WorldSettings {
        &mut self.world
    }

    /// Replaces the stored physics configuration.
    pub fn set_physics(&mut self, physics: Value) {
        self.physics = Some(physics);
    }

    /// Replaces the player spawn point.
    pub fn set_spawn_point(&mut self, spawn_point: Position) {
        self.spawn_point = Some(spawn_point);
    }

    /// Merges opaque combat settings, ignoring keys owned by the enemy list.
    pub fn merge_combat_settings(&mut self, settings: Map<String, Value>) {
        for (key, value) in settings {
            if key == "enemies" || key == "enemy_count" {
                continue;
            }
            let _ = self.combat.settings.insert(key, value);
        }
    }

    /// Keeps the first `keep` instances addressed by the selector.
    ///
    /// Subtype selectors only consider buildings of that subtype; every other
    /// building keeps its place in the list.
    pub fn truncate(&mut self, selector: Selector, keep: usize) {
        match selector {
            Selector::Category(category) => {
                with_list!(mut self, category, list => list.truncate(keep));
            }
            Selector::Subtype(subtype) => {
                truncate_subtype(&mut self.structures.buildings, subtype, keep);
            }
        }
        self.sync_enemy_count();
    }

    /// Replaces the instances addressed by the selector with the batch.
    ///
    /// Returns `false` without touching the world when the batch belongs to a
    /// different category than the selector.
    pub fn replace(&mut self, selector: Selector, batch: Batch) -> bool {
        if batch.category() != selector.category() {
            return false;
        }
        match selector {
            Selector::Category(category) => {
                with_list!(mut self, category, list => list.clear());
            }
            Selector::Subtype(subtype) => {
                self.structures
                    .buildings
                    .retain(|building| !subtype.contains(building));
            }
        }
        let _ = self.append(batch);
        true
    }

    /// Appends fully specified instances, returning how many were added.
    ///
    /// Enemy drafts without an identifier receive the next free `enemy_<n>`.
    pub fn append(&mut self, batch: Batch) -> usize {
        let added = batch.len();
        match batch {
            Batch::Trees(items) => self.structures.trees.extend(items),
            Batch::Rocks(items) => self.structures.rocks.extend(items),
            Batch::Peaks(items) => self.structures.peaks.extend(items),
            Batch::Buildings(items) => self.structures.buildings.extend(items),
            Batch::StreetLamps(items) => self.structures.street_lamps.extend(items),
            Batch::CreativeObjects(items) => self.structures.creative_objects.extend(items),
            Batch::Enemies(drafts) => {
                let mut next = self.next_enemy_ordinal();
                for draft in drafts {
                    let fallback = format!("enemy_{next}");
                    let enemy = draft.into_enemy(|| fallback);
                    if let Some(ordinal) = enemy.ordinal() {
                        next = next.max(ordinal.saturating_add(1));
                    }
                    self.combat.enemies.push(enemy);
                }
                self.sync_enemy_count();
            }
        }
        added
    }

    /// Appends enemies that already carry identifiers and stats.
    pub fn append_enemies(&mut self, enemies: Vec<Enemy>) -> usize {
        let added = enemies.len();
        self.combat.enemies.extend(enemies);
        self.sync_enemy_count();
        added
    }

    /// Removes the instances at the given list indices, returning how many
    /// were removed. Indices past the end are ignored.
    pub fn remove_indices(&mut self, category: Category, indices: &BTreeSet<usize>) -> usize {
        let removed = with_list!(mut self, category, list => retain_unlisted(list, indices));
        self.sync_enemy_count();
        removed
    }

    /// Numeric suffix the next allocated enemy identifier will use.
    #[must_use]
    pub fn next_enemy_ordinal(&self) -> u64 {
        self.combat
            .enemies
            .iter()
            .filter_map(Enemy::ordinal)
            .max()
            .map_or(1, |highest| highest.saturating_add(1))
    }

    fn sync_enemy_count(&mut self) {
        self.combat.enemy_count = self.combat.enemies.len();
    }
}

fn truncate_subtype(buildings: &mut Vec<Building>, subtype: BuildingSubtype, keep: usize) {
    let mut kept = 0;
    buildings.retain(|building| {
        if !subtype.contains(building) {
            return true;
        }
        kept += 1;
        kept <= keep
    });
}

fn retain_unlisted<T>(list: &mut Vec<T>, indices: &BTreeSet<usize>) -> usize {
    let before = list.len();
    let mut index = 0;
    list.retain(|_| {
        let keep = !indices.contains(&index);
        index += 1;
        keep
    });
    before - list.len()
}

/// Read-only views over the world state.
pub mod query {
    use serde_json::Value;
    use worldforge_core::{Biome, Category, Enemy, Placed, Position, Selector, TerrainSettings};

    use super::{Combat, Structures, WorldSettings, WorldState};

    /// World-level properties.
    #[must_use]
    pub fn settings(world: &WorldState) -> &WorldSettings {
        &world.world
    }

    /// Biome rules in effect for the world's biome name.
    #[must_use]
    pub fn biome(world: &WorldState) -> Biome {
        Biome::from_name(&world.world.biome)
    }

    /// Terrain the world was generated on.
    #[must_use]
    pub fn terrain_settings(world: &WorldState) -> &TerrainSettings {
        &world.world.terrain
    }

    /// Every structure list.
    #[must_use]
    pub fn structures(world: &WorldState) -> &Structures {
        &world.structures
    }

    /// Enemies and combat settings.
    #[must_use]
    pub fn combat(world: &WorldState) -> &Combat {
        &world.combat
    }

    /// Enemies in insertion order.
    #[must_use]
    pub fn enemies(world: &WorldState) -> &[Enemy] {
        &world.combat.enemies
    }

    /// Stored physics configuration.
    #[must_use]
    pub fn physics(world: &WorldState) -> Option<&Value> {
        world.physics.as_ref()
    }

    /// Player spawn point.
    #[must_use]
    pub fn spawn_point(world: &WorldState) -> Option<Position> {
        world.spawn_point
    }

    /// Number of instances addressed by the selector.
    #[must_use]
    pub fn count(world: &WorldState, selector: Selector) -> usize {
        match selector {
            Selector::Category(category) => with_list!(world, category, list => list.len()),
            Selector::Subtype(subtype) => world
                .structures
                .buildings
                .iter()
                .filter(|building| subtype.contains(building))
                .count(),
        }
    }

    /// Positions of every instance in the category, in list order.
    #[must_use]
    pub fn positions(world: &WorldState, category: Category) -> Vec<Option<Position>> {
        with_list!(world, category, list => list.iter().map(Placed::position).collect())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use worldforge_core::{BuildingKind, EnemyKind};

    use super::*;

    fn building(kind: BuildingKind, x: f32) -> Building {
        Building {
            kind,
            position: Position::new(x, 0.0, 0.0),
            scale: 1.0,
            rotation: 0.0,
            height: 10.0,
            width: 5.0,
            depth: 5.0,
            color: "#ffffff".to_owned(),
        }
    }

    fn rock(x: f32) -> Rock {
        Rock {
            kind: "stone".to_owned(),
            position: Position::new(x, 0.0, 0.0),
            scale: 1.0,
            rotation: 0.0,
        }
    }

    fn empty_world() -> WorldState {
        WorldState::new(WorldSettings::new("city", "day", TerrainSettings::default()))
    }

    #[test]
    fn subtype_truncation_preserves_other_buildings() {
        let mut world = empty_world();
        let _ = world.append(Batch::Buildings(vec![
            building(BuildingKind::House, 0.0),
            building(BuildingKind::Skyscraper, 1.0),
            building(BuildingKind::House, 2.0),
            building(BuildingKind::Skyscraper, 3.0),
        ]));

        world.truncate(Selector::Subtype(BuildingSubtype::Skyscrapers), 1);

        let xs: Vec<f32> = query::structures(&world)
            .buildings
            .iter()
            .map(|building| building.position.x)
            .collect();
        assert_eq!(xs, vec![0.0, 1.0, 2.0]);
    }

    #[test]
    fn subtype_replacement_keeps_foreign_buildings() {
        let mut world = empty_world();
        let _ = world.append(Batch::Buildings(vec![
            building(BuildingKind::House, 0.0),
            building(BuildingKind::Skyscraper, 1.0),
        ]));

        assert!(world.replace(
            Selector::Subtype(BuildingSubtype::Houses),
            Batch::Buildings(vec![
                building(BuildingKind::House, 5.0),
                building(BuildingKind::House, 6.0),
            ]),
        ));

        assert_eq!(
            query::count(&world, Selector::Subtype(BuildingSubtype::Houses)),
            2
        );
        assert_eq!(
            query::count(&world, Selector::Subtype(BuildingSubtype::Skyscrapers)),
            1
        );
    }

    #[test]
    fn mismatched_batches_are_rejected() {
        let mut world = empty_world();
        assert!(!world.replace(
            Selector::Category(Category::Tree),
            Batch::Rocks(vec![rock(0.0)])
        ));
        assert_eq!(query::count(&world, Selector::Category(Category::Rock)), 0);
    }

    #[test]
    fn enemy_drafts_continue_after_highest_identifier() {
        let mut world = empty_world();
        let _ = world.append_enemies(vec![Enemy::spawn(
            "enemy_4".to_owned(),
            EnemyKind::Grunt,
            Position::default(),
            0.0,
        )]);
        let drafts = Batch::parse(
            Category::Enemy,
            &[
                json!({"position": {"x": 1, "z": 1}}),
                json!({"type": "stalker", "position": {"x": 2, "z": 2}}),
            ],
        );

        assert_eq!(world.append(drafts), 2);

        let ids: Vec<&str> = query::enemies(&world)
            .iter()
            .map(|enemy| enemy.id.as_str())
            .collect();
        assert_eq!(ids, vec!["enemy_4", "enemy_5", "enemy_6"]);
        assert_eq!(query::combat(&world).enemy_count, 3);
        assert_eq!(world.next_enemy_ordinal(), 7);
    }

    #[test]
    fn removing_indices_keeps_enemy_count_in_sync() {
        let mut world = empty_world();
        let enemies = (1..=3)
            .map(|n| {
                Enemy::spawn(
                    format!("enemy_{n}"),
                    EnemyKind::Brute,
                    Position::default(),
                    0.0,
                )
            })
            .collect();
        let _ = world.append_enemies(enemies);

        let removed = world.remove_indices(Category::Enemy, &BTreeSet::from([0, 2, 9]));

        assert_eq!(removed, 2);
        assert_eq!(query::combat(&world).enemy_count, 1);
        assert_eq!(query::enemies(&world)[0].id, "enemy_2");
    }

    #[test]
    fn combat_settings_ignore_enemy_keys() {
        let mut world = empty_world();
        let settings = json!({"weapon": "bow", "enemy_count": 40})
            .as_object()
            .cloned()
            .unwrap();

        world.merge_combat_settings(settings);

        let combat = query::combat(&world);
        assert_eq!(combat.settings.get("weapon"), Some(&json!("bow")));
        assert_eq!(combat.enemy_count, 0);
    }

    #[test]
    fn persisted_documents_round_trip_and_resync_counts() {
        let text = json!({
            "world": {"biome": "desert", "time": "dusk"},
            "structures": {"rocks": [{"type": "boulder", "position": {"x": 1, "y": 2, "z": 3}}]},
            "combat": {"enemy_count": 99, "weapon": "sword"}
        })
        .to_string();

        let world = WorldState::from_json(&text).unwrap();

        assert_eq!(query::combat(&world).enemy_count, 0);
        assert_eq!(query::structures(&world).rocks.len(), 1);
        assert_eq!(query::terrain_settings(&world), &TerrainSettings::default());
        let encoded = serde_json::to_value(&world).unwrap();
        assert_eq!(encoded["combat"]["weapon"], json!("sword"));
        assert!(encoded.get("physics").is_none());
    }

    #[test]
    fn persisted_documents_with_oversized_terrain_are_rejected() {
        let text = json!({
            "world": {"biome": "forest", "time": "day", "terrain": {"resolution": 200000}}
        })
        .to_string();

        let error = WorldState::from_json(&text).unwrap_err();

        assert!(error.to_string().contains("200000"));
    }
}
