use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde_json::{json, Value};
use worldforge_core::{
    Batch, Biome, Building, BuildingKind, BuildingSubtype, Category, Diff, Enemy, EnemyKind,
    HeightField, NoPresets, Peak, PlacementMask, Position, Presets, Rock, Selector, Terrain,
    TerrainGrid, TerrainSettings, Tree,
};
use worldforge_system_merge::MergeEngine;
use worldforge_world::{query, MergeResponse, WorldSettings, WorldState};

fn flat_terrain(biome: Biome) -> Terrain {
    let field = HeightField::flat(64, 64, 0.2).unwrap();
    let mask = PlacementMask::uniform(64, 64, true).unwrap();
    let grid = TerrainGrid::new(64, 64, 200.0, 20.0);
    Terrain::new(biome, grid, field, mask).unwrap()
}

fn world(biome: &str) -> WorldState {
    WorldState::new(WorldSettings::new(biome, "day", TerrainSettings::default()))
}

fn tree(x: f32, z: f32) -> Tree {
    Tree {
        kind: "oak".to_owned(),
        position: Position::new(x, 0.0, z),
        scale: 1.0,
        rotation: 0.0,
        leafless: false,
        leaf_color: None,
        trunk_color: None,
    }
}

fn rock(x: f32, z: f32) -> Rock {
    Rock {
        kind: "boulder".to_owned(),
        position: Position::new(x, 0.0, z),
        scale: 1.0,
        rotation: 0.0,
    }
}

fn building(kind: BuildingKind, x: f32) -> Building {
    Building {
        kind,
        position: Position::new(x, 0.0, 60.0),
        scale: 1.0,
        rotation: 0.0,
        height: 12.0,
        width: 8.0,
        depth: 8.0,
        color: "#888888".to_owned(),
    }
}

fn forest_with_trees(count: usize) -> WorldState {
    let mut world = world("forest");
    let trees = (0..count).map(|i| tree(i as f32 * 10.0, 0.0)).collect();
    let _ = world.append(Batch::Trees(trees));
    world
}

fn merge(world: &mut WorldState, terrain: &mut Terrain, diff: Value) -> MergeResponse {
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    MergeEngine::new(&NoPresets).apply(world, terrain, Diff::from_value(&diff), &mut rng)
}

struct Clock;

impl Presets for Clock {
    fn lighting(&self, time: &str) -> Option<Value> {
        Some(json!({ "preset": time }))
    }

    fn blend_lighting(&self, from: &str, to: &str, progress: f32) -> Option<Value> {
        Some(json!({ "from": from, "to": to, "progress": progress }))
    }

    fn physics(&self, name: &str) -> Option<Value> {
        (name == "moon").then(|| json!({ "gravity": -1.6 }))
    }
}

#[test]
fn removing_two_of_five_trees_leaves_three() {
    let mut world = forest_with_trees(5);
    let mut terrain = flat_terrain(Biome::Forest);

    let response = merge(&mut world, &mut terrain, json!({"remove": {"trees": 2}}));

    assert_eq!(response.structures.trees.len(), 3);
    assert_eq!(query::count(&world, Selector::Category(Category::Tree)), 3);
}

#[test]
fn removing_all_skyscrapers_keeps_the_house() {
    let mut world = world("city");
    let _ = world.append(Batch::Buildings(vec![
        building(BuildingKind::House, 0.0),
        building(BuildingKind::Skyscraper, 40.0),
    ]));
    let mut terrain = flat_terrain(Biome::City);

    let diff = json!({"remove": {"skyscrapers": 999}});
    let response = merge(&mut world, &mut terrain, diff);

    assert_eq!(response.structures.buildings.len(), 1);
    assert_eq!(response.structures.buildings[0].kind, BuildingKind::House);
}

#[test]
fn added_tree_displaces_the_rock_beneath_it() {
    let mut world = world("forest");
    let _ = world.append(Batch::Rocks(vec![rock(11.0, 9.0), rock(-60.0, -60.0)]));
    let _ = world.append(Batch::Trees(vec![tree(10.5, 10.0)]));
    let mut terrain = flat_terrain(Biome::Forest);

    let response = merge(
        &mut world,
        &mut terrain,
        json!({"add": {"trees": [{"type": "pine", "position": {"x": 10, "y": 0, "z": 10}}]}}),
    );

    assert_eq!(response.structures.rocks.len(), 1);
    assert_eq!(response.structures.rocks[0].position.x, -60.0);
    assert_eq!(response.structures.trees.len(), 2);
    assert_eq!(response.structures.trees[1].kind, "pine");
    assert_eq!(response.auto_removed.get("rocks"), Some(&1));
    assert!(!response.auto_removed.contains_key("trees"));
}

#[test]
fn peaks_clear_a_wider_radius_than_other_structures() {
    let mut world = world("arctic");
    let peak = Peak {
        position: Position::new(0.0, 0.0, 0.0),
        scale: 1.0,
        rotation: 0.0,
    };
    let _ = world.append(Batch::Peaks(vec![peak]));
    let _ = world.append(Batch::Trees(vec![tree(50.0, 50.0)]));
    let mut terrain = flat_terrain(Biome::Arctic);

    let response = merge(
        &mut world,
        &mut terrain,
        json!({"add": {
            "trees": [{"type": "pine", "position": {"x": 7, "y": 0, "z": 0}}],
            "rocks": [{"type": "boulder", "position": {"x": 57, "y": 0, "z": 50}}]
        }}),
    );

    assert!(response.structures.peaks.is_empty());
    assert_eq!(response.structures.trees.len(), 2);
    assert_eq!(response.structures.rocks.len(), 1);
    assert_eq!(response.auto_removed.get("peaks"), Some(&1));
    assert!(!response.auto_removed.contains_key("trees"));
}

#[test]
fn generated_houses_displace_the_trees_beneath_them() {
    let mut world = world("city");
    let lattice: Vec<Tree> = (-17..=17)
        .flat_map(|row| (-17..=17).map(move |column| (column, row)))
        .map(|(column, row)| tree(column as f32 * 6.0, row as f32 * 6.0))
        .collect();
    let planted = lattice.len();
    let _ = world.append(Batch::Trees(lattice));
    let mut terrain = flat_terrain(Biome::City);

    let response = merge(&mut world, &mut terrain, json!({"add": {"houses": 2}}));

    let houses = &response.structures.buildings;
    assert_eq!(houses.len(), 2);
    let removed = response.auto_removed.get("trees").copied().unwrap_or(0);
    assert!(removed >= 2);
    assert_eq!(response.structures.trees.len(), planted - removed);
    for tree in &response.structures.trees {
        assert!(houses
            .iter()
            .all(|house| tree.position.planar_distance(house.position) >= 5.0));
    }
}

#[test]
fn enemies_never_take_part_in_collisions() {
    let mut world = world("forest");
    let _ = world.append(Batch::Rocks(vec![rock(3.0, 0.0)]));
    let guard = Enemy::spawn(
        "enemy_1".to_owned(),
        EnemyKind::Grunt,
        Position::new(20.0, 0.0, 20.0),
        0.0,
    );
    let _ = world.append_enemies(vec![guard]);
    let mut terrain = flat_terrain(Biome::Forest);

    let response = merge(
        &mut world,
        &mut terrain,
        json!({"add": {
            "enemies": [{"position": {"x": 3, "y": 0, "z": 1}}],
            "trees": [{"type": "oak", "position": {"x": 21, "y": 0, "z": 20}}]
        }}),
    );

    assert_eq!(response.structures.rocks.len(), 1);
    assert_eq!(response.combat.enemies.len(), 2);
    assert!(response.auto_removed.is_empty());
}

#[test]
fn removal_clamps_to_zero_and_subtracts_exactly() {
    for (amount, expected) in [
        (json!(1), 3),
        (json!(4), 0),
        (json!(40), 0),
        (json!("all"), 0),
    ] {
        let mut world = forest_with_trees(4);
        let mut terrain = flat_terrain(Biome::Forest);
        let diff = json!({"remove": {"trees": amount}});

        let _ = merge(&mut world, &mut terrain, diff);

        assert_eq!(query::structures(&world).trees.len(), expected);
    }
}

#[test]
fn subtype_operations_leave_the_other_partition_alone() {
    let mut world = world("city");
    let _ = world.append(Batch::Buildings(vec![
        building(BuildingKind::House, 0.0),
        building(BuildingKind::Skyscraper, 20.0),
        building(BuildingKind::House, 40.0),
        building(BuildingKind::Skyscraper, 60.0),
        building(BuildingKind::Igloo, 80.0),
    ]));
    let mut terrain = flat_terrain(Biome::City);

    let _ = merge(
        &mut world,
        &mut terrain,
        json!({"set": {"houses": 1}, "remove": {"skyscrapers": 1}}),
    );

    let houses = Selector::Subtype(BuildingSubtype::Houses);
    let skyscrapers = Selector::Subtype(BuildingSubtype::Skyscrapers);
    assert_eq!(query::count(&world, houses), 1);
    assert_eq!(query::count(&world, skyscrapers), 1);
    assert_eq!(query::structures(&world).buildings.len(), 3);
}

#[test]
fn set_limit_never_grows_a_category() {
    let mut world = forest_with_trees(2);
    let mut terrain = flat_terrain(Biome::Forest);

    let _ = merge(&mut world, &mut terrain, json!({"set": {"trees": 10}}));

    assert_eq!(query::structures(&world).trees.len(), 2);
}

#[test]
fn set_list_replaces_the_category_verbatim() {
    let mut world = forest_with_trees(5);
    let mut terrain = flat_terrain(Biome::Forest);

    let response = merge(
        &mut world,
        &mut terrain,
        json!({"set": {"trees": [
            {"type": "birch", "position": {"x": 1, "y": 0, "z": 1}, "leaf_color": "#ff0000"},
            {"type": "birch", "position": {"x": 2, "y": 0, "z": 2}, "leaf_color": "#ff0000"}
        ]}}),
    );

    let trees = &response.structures.trees;
    assert_eq!(trees.len(), 2);
    assert!(trees
        .iter()
        .all(|tree| tree.kind == "birch" && tree.leaf_color.as_deref() == Some("#ff0000")));
}

#[test]
fn empty_diff_returns_only_structures_and_combat() {
    let mut world = forest_with_trees(3);
    let before = world.clone();
    let mut terrain = flat_terrain(Biome::Forest);

    let response = merge(&mut world, &mut terrain, json!({}));

    assert_eq!(world, before);
    let encoded = serde_json::to_value(&response).unwrap();
    let keys: Vec<&String> = encoded.as_object().unwrap().keys().collect();
    assert_eq!(keys, vec!["combat", "structures"]);
}

#[test]
fn bare_enemy_count_runs_the_enemy_placer() {
    let mut world = world("forest");
    world.set_spawn_point(Position::default());
    let mut terrain = flat_terrain(Biome::Forest);

    let response = merge(&mut world, &mut terrain, json!({"add": {"enemies": 3}}));

    let enemies = &response.combat.enemies;
    let ids: Vec<&str> = enemies.iter().map(|enemy| enemy.id.as_str()).collect();
    assert_eq!(ids, vec!["enemy_1", "enemy_2", "enemy_3"]);
    assert_eq!(response.combat.enemy_count, 3);
    assert!(response.shortfalls.is_empty());
    assert!(response.spawn_point.is_none());
}

#[test]
fn pinned_enemy_type_is_used_for_generated_enemies() {
    let mut world = world("forest");
    let mut terrain = flat_terrain(Biome::Forest);

    let response = merge(
        &mut world,
        &mut terrain,
        json!({"combat": {"enemy_type": "brute"}, "add": {"enemies": 2}}),
    );

    assert_eq!(response.combat.enemies.len(), 2);
    assert!(response
        .combat
        .enemies
        .iter()
        .all(|enemy| enemy.kind == worldforge_core::EnemyKind::Brute));
}

#[test]
fn generation_in_a_foreign_biome_reports_a_shortfall() {
    let mut world = world("forest");
    let mut terrain = flat_terrain(Biome::Forest);

    let diff = json!({"add": {"street_lamps": 3}});
    let response = merge(&mut world, &mut terrain, diff);

    assert!(response.structures.street_lamps.is_empty());
    let shortfall = response.shortfalls.get("street_lamps").unwrap();
    assert_eq!((shortfall.requested, shortfall.placed), (3, 0));
}

#[test]
fn generated_houses_keep_clear_of_existing_buildings() {
    let mut world = world("city");
    let tower = building(BuildingKind::Skyscraper, 0.0);
    let _ = world.append(Batch::Buildings(vec![tower]));
    let mut terrain = flat_terrain(Biome::City);

    let response = merge(&mut world, &mut terrain, json!({"add": {"houses": 4}}));

    let buildings = &response.structures.buildings;
    assert_eq!(buildings.len(), 5);
    assert!(buildings[1..]
        .iter()
        .all(|house| house.kind == BuildingKind::House));
    assert!(buildings[1..]
        .iter()
        .all(|house| house.position.planar_distance(buildings[0].position) >= 18.0));
}

#[test]
fn time_change_recomputes_lighting() {
    let mut world = world("forest");
    let mut terrain = flat_terrain(Biome::Forest);
    let mut rng = ChaCha8Rng::seed_from_u64(1);
    let engine = MergeEngine::new(&Clock);

    let response = engine.apply(
        &mut world,
        &mut terrain,
        Diff::from_value(&json!({"time_change": "night"})),
        &mut rng,
    );
    let settings = response.world.unwrap();
    assert_eq!(settings.time, "night");
    assert_eq!(settings.lighting, Some(json!({"preset": "night"})));

    let response = engine.apply(
        &mut world,
        &mut terrain,
        Diff::from_value(&json!({"from_time": "night", "to_time": "dawn", "progress": 0.5})),
        &mut rng,
    );
    let settings = response.world.unwrap();
    assert_eq!(settings.time, "night");
    assert_eq!(settings.lighting.unwrap()["to"], json!("dawn"));
}

#[test]
fn unknown_presets_leave_physics_untouched() {
    let mut world = world("forest");
    world.set_physics(json!({"gravity": -9.8}));
    let mut terrain = flat_terrain(Biome::Forest);
    let mut rng = ChaCha8Rng::seed_from_u64(1);
    let engine = MergeEngine::new(&Clock);

    let response = engine.apply(
        &mut world,
        &mut terrain,
        Diff::from_value(&json!({"physics": "jupiter"})),
        &mut rng,
    );
    assert!(response.physics.is_none());
    assert_eq!(query::physics(&world), Some(&json!({"gravity": -9.8})));

    let response = engine.apply(
        &mut world,
        &mut terrain,
        Diff::from_value(&json!({"physics": "moon"})),
        &mut rng,
    );
    assert_eq!(response.physics, Some(json!({"gravity": -1.6})));
}

#[test]
fn biome_change_regenerates_the_terrain() {
    let mut world = world("forest");
    let mut terrain = flat_terrain(Biome::Forest);

    let response = merge(
        &mut world,
        &mut terrain,
        json!({"biome": "arctic", "terrain": {"resolution": 48}}),
    );

    assert_eq!(terrain.biome(), Biome::Arctic);
    assert_eq!(terrain.grid().columns(), 48);
    assert_eq!(response.world.unwrap().biome, "arctic");
}

#[test]
fn merges_replay_identically_with_the_same_seed() {
    let diff = json!({"add": {"trees": 12, "rocks": 6, "enemies": 4}, "remove": {"trees": 1}});
    let mut first = forest_with_trees(3);
    let mut second = first.clone();
    let mut terrain = flat_terrain(Biome::Forest);

    let a = merge(&mut first, &mut terrain, diff.clone());
    let b = merge(&mut second, &mut terrain, diff);

    assert_eq!(a, b);
    assert_eq!(first, second);
}
