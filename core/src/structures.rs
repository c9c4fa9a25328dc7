//! Placed instances and the categories that group them.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::{lenient, Position, COLLISION_RADIUS, PEAK_COLLISION_RADIUS};

/// Category of placed instance stored by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    /// Terrain-bound trees.
    #[serde(rename = "trees")]
    Tree,
    /// Loose rocks and boulders.
    #[serde(rename = "rocks")]
    Rock,
    /// Mountain peaks detected on winter-like terrain.
    #[serde(rename = "peaks")]
    Peak,
    /// Houses, skyscrapers and igloos.
    #[serde(rename = "buildings")]
    Building,
    /// Street lamps lining city ground.
    #[serde(rename = "street_lamps")]
    StreetLamp,
    /// Free-form objects composed from primitive shapes.
    #[serde(rename = "creative_objects")]
    CreativeObject,
    /// Hostile actors tracked by the combat state.
    #[serde(rename = "enemies")]
    Enemy,
}

impl Category {
    /// Every category in canonical order.
    pub const ALL: [Category; 7] = [
        Category::Tree,
        Category::Rock,
        Category::Peak,
        Category::Building,
        Category::StreetLamp,
        Category::CreativeObject,
        Category::Enemy,
    ];

    /// Canonical plural key used in world documents and diffs.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Tree => "trees",
            Self::Rock => "rocks",
            Self::Peak => "peaks",
            Self::Building => "buildings",
            Self::StreetLamp => "street_lamps",
            Self::CreativeObject => "creative_objects",
            Self::Enemy => "enemies",
        }
    }

    /// Resolves a user-facing key, accepting singular forms and aliases.
    #[must_use]
    pub fn from_key(raw: &str) -> Option<Self> {
        let category = match lenient::key(raw).as_str() {
            "trees" | "tree" => Self::Tree,
            "rocks" | "rock" | "boulders" | "boulder" => Self::Rock,
            "peaks" | "peak" | "mountains" | "mountain" => Self::Peak,
            "buildings" | "building" => Self::Building,
            "street_lamps" | "street_lamp" | "streetlamps" | "lamps" | "lamp" => {
                Self::StreetLamp
            }
            "creative_objects" | "creative_object" | "objects" => Self::CreativeObject,
            "enemies" | "enemy" => Self::Enemy,
            _ => return None,
        };
        Some(category)
    }

    /// Reports whether instances of the category live in the structure lists.
    #[must_use]
    pub const fn is_structure(self) -> bool {
        !matches!(self, Self::Enemy)
    }

    /// Radius around an instance of this category inside which a newly added
    /// instance displaces it.
    #[must_use]
    pub const fn collision_radius(self) -> f32 {
        match self {
            Self::Peak => PEAK_COLLISION_RADIUS,
            _ => COLLISION_RADIUS,
        }
    }
}

/// Architectural style of a building.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildingKind {
    /// Low-rise house.
    House,
    /// High-rise tower.
    Skyscraper,
    /// Snow dome used in arctic biomes.
    Igloo,
}

impl BuildingKind {
    /// Virtual subtype the building belongs to, if any.
    #[must_use]
    pub const fn subtype(self) -> Option<BuildingSubtype> {
        match self {
            Self::House => Some(BuildingSubtype::Houses),
            Self::Skyscraper => Some(BuildingSubtype::Skyscrapers),
            Self::Igloo => None,
        }
    }
}

/// Virtual partition of the building list addressed by diffs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildingSubtype {
    /// Buildings whose kind is [`BuildingKind::House`].
    Houses,
    /// Buildings whose kind is [`BuildingKind::Skyscraper`].
    Skyscrapers,
}

impl BuildingSubtype {
    /// Building kind that belongs to the subtype.
    #[must_use]
    pub const fn kind(self) -> BuildingKind {
        match self {
            Self::Houses => BuildingKind::House,
            Self::Skyscrapers => BuildingKind::Skyscraper,
        }
    }

    /// Reports whether the building belongs to the subtype.
    #[must_use]
    pub fn contains(self, building: &Building) -> bool {
        building.kind.subtype() == Some(self)
    }

    /// Canonical plural key used in diffs.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Houses => "houses",
            Self::Skyscrapers => "skyscrapers",
        }
    }
}

/// Target of a remove, set or add operation: a whole category or a
/// building subtype.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Selector {
    /// Every instance in the category.
    Category(Category),
    /// Only buildings of the given subtype.
    Subtype(BuildingSubtype),
}

impl Selector {
    /// Resolves a diff key into a selector.
    #[must_use]
    pub fn from_key(raw: &str) -> Option<Self> {
        match lenient::key(raw).as_str() {
            "houses" | "house" => Some(Self::Subtype(BuildingSubtype::Houses)),
            "skyscrapers" | "skyscraper" => Some(Self::Subtype(BuildingSubtype::Skyscrapers)),
            other => Category::from_key(other).map(Self::Category),
        }
    }

    /// Category whose list the selector addresses.
    #[must_use]
    pub const fn category(self) -> Category {
        match self {
            Self::Category(category) => category,
            Self::Subtype(_) => Category::Building,
        }
    }

    /// Canonical key of the selector.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Category(category) => category.key(),
            Self::Subtype(subtype) => subtype.key(),
        }
    }
}

/// Anything that may occupy a world position.
pub trait Placed {
    /// World position of the instance, if it has one.
    fn position(&self) -> Option<Position>;
}

fn default_scale() -> f32 {
    1.0
}

/// Tree placed on the terrain.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Tree {
    /// Species name such as `pine` or `oak`.
    #[serde(rename = "type")]
    pub kind: String,
    /// World position of the trunk base.
    pub position: Position,
    /// Uniform scale multiplier.
    #[serde(default = "default_scale")]
    pub scale: f32,
    /// Rotation about the vertical axis in radians.
    #[serde(default)]
    pub rotation: f32,
    /// Whether the tree is rendered without foliage.
    #[serde(default)]
    pub leafless: bool,
    /// Optional foliage colour override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub leaf_color: Option<String>,
    /// Optional trunk colour override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trunk_color: Option<String>,
}

/// Rock placed on the terrain.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Rock {
    /// Rock variant such as `boulder`.
    #[serde(rename = "type")]
    pub kind: String,
    /// World position of the rock centre.
    pub position: Position,
    /// Uniform scale multiplier.
    #[serde(default = "default_scale")]
    pub scale: f32,
    /// Rotation about the vertical axis in radians.
    #[serde(default)]
    pub rotation: f32,
}

/// Mountain peak detected on the height field.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Peak {
    /// World position of the summit.
    pub position: Position,
    /// Uniform scale multiplier of the rendered mountain.
    #[serde(default = "default_scale")]
    pub scale: f32,
    /// Rotation about the vertical axis in radians.
    #[serde(default)]
    pub rotation: f32,
}

/// Building placed on level ground.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Building {
    /// Architectural style.
    #[serde(rename = "type")]
    pub kind: BuildingKind,
    /// World position of the footprint centre.
    pub position: Position,
    /// Uniform scale multiplier.
    #[serde(default = "default_scale")]
    pub scale: f32,
    /// Rotation about the vertical axis in radians.
    #[serde(default)]
    pub rotation: f32,
    /// Height of the building in world units.
    pub height: f32,
    /// Footprint width in world units.
    pub width: f32,
    /// Footprint depth in world units.
    pub depth: f32,
    /// Facade colour as a CSS hex string.
    pub color: String,
}

/// Street lamp placed on level city ground.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StreetLamp {
    /// World position of the lamp base.
    pub position: Position,
    /// Uniform scale multiplier.
    #[serde(default = "default_scale")]
    pub scale: f32,
    /// Rotation about the vertical axis in radians.
    #[serde(default)]
    pub rotation: f32,
}

/// Free-form object composed from primitive shapes.
///
/// Everything except the position is carried through verbatim.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CreativeObject {
    /// Optional world position of the object's anchor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
    /// Opaque attributes such as name, shapes and colours.
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

/// Archetype of enemy with a fixed stat block.
///
/// Deserialization accepts any value and resolves it like
/// [`EnemyKind::from_name`], so unknown types load as grunts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EnemyKind {
    /// Balanced foot soldier.
    Grunt,
    /// Slow, heavily armoured bruiser.
    Brute,
    /// Fast, fragile hunter with long sight.
    Stalker,
}

impl<'de> Deserialize<'de> for EnemyKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = Value::deserialize(deserializer)?;
        Ok(name.as_str().map_or(Self::Grunt, Self::from_name))
    }
}

/// Fixed combat stats stamped onto freshly placed enemies.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EnemyStats {
    /// Starting and maximum health.
    pub health: f32,
    /// Damage dealt per attack.
    pub damage: f32,
    /// Movement speed in world units per second.
    pub speed: f32,
    /// Distance at which the enemy notices the player.
    pub detection_radius: f32,
    /// Distance at which the enemy can attack.
    pub attack_radius: f32,
    /// Behaviour tree identifier.
    pub behavior: &'static str,
}

impl EnemyKind {
    /// Resolves a free-form enemy type, falling back to [`EnemyKind::Grunt`].
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        match lenient::key(name).as_str() {
            "brute" | "tank" | "ogre" => Self::Brute,
            "stalker" | "hunter" | "scout" => Self::Stalker,
            _ => Self::Grunt,
        }
    }

    /// Stat block associated with the enemy kind.
    #[must_use]
    pub const fn stats(self) -> EnemyStats {
        match self {
            Self::Grunt => EnemyStats {
                health: 50.0,
                damage: 10.0,
                speed: 3.0,
                detection_radius: 20.0,
                attack_radius: 2.0,
                behavior: "patrol",
            },
            Self::Brute => EnemyStats {
                health: 120.0,
                damage: 25.0,
                speed: 1.8,
                detection_radius: 15.0,
                attack_radius: 3.0,
                behavior: "guard",
            },
            Self::Stalker => EnemyStats {
                health: 35.0,
                damage: 8.0,
                speed: 4.5,
                detection_radius: 30.0,
                attack_radius: 2.0,
                behavior: "hunt",
            },
        }
    }
}

/// Enemy tracked by the combat state.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Enemy {
    /// Unique identifier of the form `enemy_<n>`.
    pub id: String,
    /// Archetype of the enemy.
    #[serde(rename = "type")]
    pub kind: EnemyKind,
    /// World position of the enemy.
    pub position: Position,
    /// Uniform scale multiplier.
    #[serde(default = "default_scale")]
    pub scale: f32,
    /// Rotation about the vertical axis in radians.
    #[serde(default)]
    pub rotation: f32,
    /// Current health.
    pub health: f32,
    /// Maximum health.
    pub max_health: f32,
    /// Damage dealt per attack.
    pub damage: f32,
    /// Movement speed in world units per second.
    pub speed: f32,
    /// Distance at which the enemy notices the player.
    pub detection_radius: f32,
    /// Distance at which the enemy can attack.
    pub attack_radius: f32,
    /// Behaviour tree identifier.
    pub behavior: String,
}

impl Enemy {
    /// Creates an enemy stamped with the stat block of its kind.
    #[must_use]
    pub fn spawn(id: String, kind: EnemyKind, position: Position, rotation: f32) -> Self {
        let stats = kind.stats();
        Self {
            id,
            kind,
            position,
            scale: 1.0,
            rotation,
            health: stats.health,
            max_health: stats.health,
            damage: stats.damage,
            speed: stats.speed,
            detection_radius: stats.detection_radius,
            attack_radius: stats.attack_radius,
            behavior: stats.behavior.to_owned(),
        }
    }

    /// Numeric suffix of an `enemy_<n>` identifier.
    #[must_use]
    pub fn ordinal(&self) -> Option<u64> {
        self.id.strip_prefix("enemy_")?.parse().ok()
    }
}

/// Partially specified enemy supplied by an external collaborator.
///
/// Missing stats fall back to the kind's stat block and a missing identifier
/// is allocated by the world when the enemy is stored.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct EnemyDraft {
    /// Optional identifier supplied by the caller.
    #[serde(default)]
    pub id: Option<String>,
    /// Free-form enemy type name.
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    /// World position of the enemy.
    pub position: Position,
    /// Optional rotation in radians.
    #[serde(default)]
    pub rotation: Option<f32>,
    /// Optional scale override.
    #[serde(default)]
    pub scale: Option<f32>,
    /// Optional current health override.
    #[serde(default)]
    pub health: Option<f32>,
    /// Optional maximum health override.
    #[serde(default)]
    pub max_health: Option<f32>,
    /// Optional damage override.
    #[serde(default)]
    pub damage: Option<f32>,
    /// Optional speed override.
    #[serde(default)]
    pub speed: Option<f32>,
    /// Optional detection radius override.
    #[serde(default)]
    pub detection_radius: Option<f32>,
    /// Optional attack radius override.
    #[serde(default)]
    pub attack_radius: Option<f32>,
    /// Optional behaviour override.
    #[serde(default)]
    pub behavior: Option<String>,
}

impl EnemyDraft {
    /// Completes the draft, using `fallback_id` when no identifier was given.
    #[must_use]
    pub fn into_enemy(self, fallback_id: impl FnOnce() -> String) -> Enemy {
        let kind = self
            .kind
            .as_deref()
            .map_or(EnemyKind::Grunt, EnemyKind::from_name);
        let id = self.id.unwrap_or_else(fallback_id);
        let mut enemy = Enemy::spawn(id, kind, self.position, self.rotation.unwrap_or(0.0));
        if let Some(scale) = self.scale {
            enemy.scale = scale;
        }
        if let Some(max_health) = self.max_health {
            enemy.max_health = max_health;
            enemy.health = max_health;
        }
        if let Some(health) = self.health {
            enemy.health = health;
        }
        if let Some(damage) = self.damage {
            enemy.damage = damage;
        }
        if let Some(speed) = self.speed {
            enemy.speed = speed;
        }
        if let Some(detection_radius) = self.detection_radius {
            enemy.detection_radius = detection_radius;
        }
        if let Some(attack_radius) = self.attack_radius {
            enemy.attack_radius = attack_radius;
        }
        if let Some(behavior) = self.behavior {
            enemy.behavior = behavior;
        }
        enemy
    }
}

macro_rules! placed_at_position {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Placed for $ty {
                fn position(&self) -> Option<Position> {
                    Some(self.position)
                }
            }
        )*
    };
}

placed_at_position!(Tree, Rock, Peak, Building, StreetLamp, Enemy);

impl Placed for CreativeObject {
    fn position(&self) -> Option<Position> {
        self.position
    }
}
