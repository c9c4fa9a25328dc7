use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use worldforge_core::{
    Biome, EnemyKind, GridCoord, HeightField, PlacementMask, Position, Terrain, TerrainGrid,
};
use worldforge_system_enemies::{place_enemies, Config, EnemyRequest};

const SIZE: u32 = 32;

fn terrain_with_walkable(cells: &[GridCoord]) -> Terrain {
    let field = HeightField::flat(SIZE, SIZE, 0.3).unwrap();
    let mut walkable = vec![false; (SIZE * SIZE) as usize];
    for cell in cells {
        walkable[(cell.row() * SIZE + cell.column()) as usize] = true;
    }
    let mask = PlacementMask::from_cells(SIZE, SIZE, walkable).unwrap();
    let grid = TerrainGrid::new(SIZE, SIZE, 62.0, 10.0);
    Terrain::new(Biome::Forest, grid, field, mask).unwrap()
}

fn open_terrain() -> Terrain {
    let cells: Vec<GridCoord> = (1..SIZE - 1)
        .flat_map(|row| (1..SIZE - 1).map(move |column| GridCoord::new(column, row)))
        .collect();
    terrain_with_walkable(&cells)
}

#[test]
fn only_two_far_cells_yield_two_enemies() {
    let spawn_cell = GridCoord::new(16, 16);
    let terrain = terrain_with_walkable(&[
        spawn_cell,
        GridCoord::new(17, 16),
        GridCoord::new(16, 20),
        GridCoord::new(2, 2),
        GridCoord::new(29, 29),
    ]);
    let spawn = terrain.grid().to_world(spawn_cell, 0.3);
    let mut rng = ChaCha8Rng::seed_from_u64(5);

    let enemies = place_enemies(
        &terrain,
        &EnemyRequest {
            count: 3,
            kind: None,
            spawn,
            existing: &[],
            first_ordinal: 1,
        },
        &Config::default(),
        &mut rng,
    );

    assert_eq!(enemies.len(), 2);
    let mut cells: Vec<GridCoord> = enemies
        .iter()
        .map(|enemy| terrain.grid().to_grid(enemy.position.x, enemy.position.z))
        .collect();
    cells.sort();
    assert_eq!(cells, vec![GridCoord::new(2, 2), GridCoord::new(29, 29)]);
    let ids: Vec<&str> = enemies.iter().map(|enemy| enemy.id.as_str()).collect();
    assert_eq!(ids, vec!["enemy_1", "enemy_2"]);
}

#[test]
fn enemies_keep_their_distance_from_spawn_and_each_other() {
    let terrain = open_terrain();
    let spawn = Position::default();
    let spawn_cell = terrain.grid().to_grid(0.0, 0.0);
    let config = Config::default();
    let mut rng = ChaCha8Rng::seed_from_u64(77);

    let enemies = place_enemies(
        &terrain,
        &EnemyRequest {
            count: 12,
            kind: Some(EnemyKind::Stalker),
            spawn,
            existing: &[],
            first_ordinal: 4,
        },
        &config,
        &mut rng,
    );

    assert!(!enemies.is_empty());
    for (index, enemy) in enemies.iter().enumerate() {
        let cell = terrain.grid().to_grid(enemy.position.x, enemy.position.z);
        assert!(cell.distance(spawn_cell) >= config.min_player_distance());
        assert_eq!(enemy.kind, EnemyKind::Stalker);
        assert_eq!(enemy.behavior, "hunt");
        assert!((enemy.health - 35.0).abs() < f32::EPSILON);
        for other in &enemies[index + 1..] {
            assert!(enemy.position.planar_distance(other.position) >= config.min_enemy_distance());
        }
    }
    assert_eq!(enemies[0].id, "enemy_4");
}

#[test]
fn existing_enemies_block_nearby_candidates() {
    let far = GridCoord::new(2, 2);
    let terrain = terrain_with_walkable(&[far]);
    let occupied = terrain.grid().to_world(far, 0.3);
    let mut rng = ChaCha8Rng::seed_from_u64(1);

    let enemies = place_enemies(
        &terrain,
        &EnemyRequest {
            count: 1,
            kind: None,
            spawn: Position::default(),
            existing: &[occupied],
            first_ordinal: 2,
        },
        &Config::default(),
        &mut rng,
    );

    assert!(enemies.is_empty());
}

#[test]
fn same_seed_replays_identically() {
    let terrain = open_terrain();
    let request = EnemyRequest {
        count: 8,
        kind: None,
        spawn: Position::default(),
        existing: &[],
        first_ordinal: 1,
    };

    let first = place_enemies(
        &terrain,
        &request,
        &Config::default(),
        &mut ChaCha8Rng::seed_from_u64(99),
    );
    let second = place_enemies(
        &terrain,
        &request,
        &Config::default(),
        &mut ChaCha8Rng::seed_from_u64(99),
    );

    assert_eq!(first, second);
}
