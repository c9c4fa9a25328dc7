#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Enemy placement around the player spawn.
//!
//! Walkable cells far enough from the spawn are shuffled and popped one at a
//! time; a candidate is kept when it clears every enemy placed so far. The
//! pass gives up after a fixed attempt budget, so callers must tolerate
//! receiving fewer enemies than requested.

use std::f32::consts::TAU;

use rand::{seq::SliceRandom, Rng};
use tracing::{debug, warn};
use worldforge_core::{Enemy, EnemyKind, Position, Terrain};

/// Enemies placed when a world request leaves the count open.
pub const DEFAULT_ENEMY_COUNT: u32 = 5;

/// Upper bound on enemies a single placement pass may request.
pub const MAX_ENEMY_COUNT: u32 = 50;

/// Every enemy kind, used when the caller does not pin one.
const KINDS: [EnemyKind; 3] = [EnemyKind::Grunt, EnemyKind::Brute, EnemyKind::Stalker];

/// Distance constraints and attempt budget of a placement pass.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Config {
    min_player_distance: f32,
    min_enemy_distance: f32,
    attempt_budget: usize,
}

impl Config {
    /// Creates a configuration.
    ///
    /// `min_player_distance` is measured in grid cells and
    /// `min_enemy_distance` in world units.
    #[must_use]
    pub const fn new(
        min_player_distance: f32,
        min_enemy_distance: f32,
        attempt_budget: usize,
    ) -> Self {
        Self {
            min_player_distance,
            min_enemy_distance,
            attempt_budget,
        }
    }

    /// Minimum grid distance between the spawn and any enemy.
    #[must_use]
    pub const fn min_player_distance(&self) -> f32 {
        self.min_player_distance
    }

    /// Minimum world distance between two enemies.
    #[must_use]
    pub const fn min_enemy_distance(&self) -> f32 {
        self.min_enemy_distance
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(10.0, 8.0, 500)
    }
}

/// Describes the enemies a pass should produce.
#[derive(Clone, Copy, Debug)]
pub struct EnemyRequest<'a> {
    /// Number of enemies wanted.
    pub count: u32,
    /// Kind stamped on every enemy; `None` draws a kind per enemy.
    pub kind: Option<EnemyKind>,
    /// Player spawn point in world space.
    pub spawn: Position,
    /// Positions of enemies that already exist.
    pub existing: &'a [Position],
    /// Numeric suffix of the first allocated `enemy_<n>` identifier.
    pub first_ordinal: u64,
}

/// Places up to `request.count` enemies on walkable terrain.
pub fn place_enemies<R: Rng + ?Sized>(
    terrain: &Terrain,
    request: &EnemyRequest<'_>,
    config: &Config,
    rng: &mut R,
) -> Vec<Enemy> {
    let wanted = request.count.min(MAX_ENEMY_COUNT) as usize;
    if wanted == 0 {
        return Vec::new();
    }

    let grid = terrain.grid();
    let field = terrain.field();
    let spawn_cell = grid.to_grid(request.spawn.x, request.spawn.z);

    let mut candidates: Vec<_> = terrain
        .mask()
        .walkable_cells()
        .filter(|cell| cell.distance(spawn_cell) >= config.min_player_distance)
        .collect();
    candidates.shuffle(rng);

    let mut placed: Vec<Position> = Vec::with_capacity(wanted);
    let mut enemies = Vec::with_capacity(wanted);
    let mut attempts = 0;
    while enemies.len() < wanted && attempts < config.attempt_budget {
        let Some(cell) = candidates.pop() else {
            break;
        };
        attempts += 1;

        let Some(height) = field.height(cell) else {
            continue;
        };
        let position = grid.to_world(cell, height);
        let crowded = request
            .existing
            .iter()
            .chain(placed.iter())
            .any(|other| other.planar_distance(position) < config.min_enemy_distance);
        if crowded {
            continue;
        }

        let kind = request
            .kind
            .or_else(|| KINDS.choose(rng).copied())
            .unwrap_or(EnemyKind::Grunt);
        let ordinal = request.first_ordinal + enemies.len() as u64;
        placed.push(position);
        enemies.push(Enemy::spawn(
            format!("enemy_{ordinal}"),
            kind,
            position,
            rng.gen_range(0.0..TAU),
        ));
    }

    if enemies.len() < wanted {
        warn!(
            category = "enemies",
            requested = wanted,
            placed = enemies.len(),
            attempts,
            "enemy placement came up short"
        );
    } else {
        debug!(placed = enemies.len(), attempts, "placed enemies");
    }
    enemies
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_configuration_matches_documented_limits() {
        let config = Config::default();
        assert_eq!(config.min_player_distance(), 10.0);
        assert_eq!(config.min_enemy_distance(), 8.0);
        assert_eq!(config.attempt_budget, 500);
    }
}
