//! Minimal payload describing the outcome of a merge.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;
use worldforge_core::Position;

use crate::{Combat, Structures, WorldSettings, WorldState};

/// Top-level fields a merge touched besides structures and combat.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Touched {
    /// World-level settings changed.
    pub world: bool,
    /// Physics configuration changed.
    pub physics: bool,
    /// Spawn point changed.
    pub spawn_point: bool,
}

/// Requested generation that placed fewer instances than asked for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Shortfall {
    /// Number of instances requested.
    pub requested: usize,
    /// Number of instances actually placed.
    pub placed: usize,
}

/// Response returned to the caller after a diff has been merged.
///
/// `structures` and `combat` are always present. Every other key is only
/// serialised when the merge changed it, so an absent key means unchanged.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MergeResponse {
    /// Every structure list after the merge.
    pub structures: Structures,
    /// Enemies and combat settings after the merge.
    pub combat: Combat,
    /// World-level settings, when touched.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub world: Option<WorldSettings>,
    /// Physics configuration, when touched.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub physics: Option<Value>,
    /// Spawn point, when touched.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spawn_point: Option<Position>,
    /// Instances displaced by collisions, keyed by category.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub auto_removed: BTreeMap<String, usize>,
    /// Generations that came up short, keyed by the addressed selector.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub shortfalls: BTreeMap<String, Shortfall>,
}

/// Assembles the response for the current state of `world`.
#[must_use]
pub fn respond(world: &WorldState, touched: Touched) -> MergeResponse {
    MergeResponse {
        structures: world.structures.clone(),
        combat: world.combat.clone(),
        world: touched.world.then(|| world.world.clone()),
        physics: if touched.physics {
            world.physics.clone()
        } else {
            None
        },
        spawn_point: if touched.spawn_point {
            world.spawn_point
        } else {
            None
        },
        auto_removed: BTreeMap::new(),
        shortfalls: BTreeMap::new(),
    }
}
