//! Per-archetype placement rules, counts and catalogues.

use worldforge_core::{Biome, BuildingKind, BuildingSubtype, Category};

use crate::PlacementRules;

/// Share of the terrain size street lamps may stray from the world centre.
pub const STREET_LAMP_CENTER_FRACTION: f32 = 0.4;

/// Kind of structure produced by the scatter generators.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Archetype {
    /// Trees.
    Tree,
    /// Rocks.
    Rock,
    /// Buildings.
    Building,
    /// Street lamps.
    StreetLamp,
}

impl Archetype {
    /// Category the archetype's instances are stored under.
    #[must_use]
    pub const fn category(self) -> Category {
        match self {
            Self::Tree => Category::Tree,
            Self::Rock => Category::Rock,
            Self::Building => Category::Building,
            Self::StreetLamp => Category::StreetLamp,
        }
    }

    /// Upper bound on instances a single generation may request.
    #[must_use]
    pub const fn cap(self) -> u32 {
        match self {
            Self::Tree => 300,
            Self::Rock => 200,
            Self::Building | Self::StreetLamp => 60,
        }
    }

    /// Instances generated when a world request leaves the count open.
    #[must_use]
    pub const fn default_count(self, biome: Biome) -> u32 {
        match (self, biome) {
            (Self::Tree, Biome::Arctic) => 40,
            (Self::Tree, Biome::Forest) => 80,
            (Self::Tree, Biome::Desert) => 15,
            (Self::Tree, Biome::City) => 20,
            (Self::Tree, Biome::Mountain) => 30,
            (Self::Tree, Biome::Default) => 50,
            (Self::Rock, Biome::Desert) => 35,
            (Self::Rock, _) => 20,
            (Self::Building, Biome::City) => 12,
            (Self::Building, Biome::Arctic) => 4,
            (Self::Building, _) => 0,
            (Self::StreetLamp, Biome::City) => 10,
            (Self::StreetLamp, _) => 0,
        }
    }

    /// Placement rules for the archetype in the biome.
    ///
    /// Returns `None` when the biome does not host the archetype at all.
    #[must_use]
    pub fn rules(self, biome: Biome, terrain_size: f32) -> Option<PlacementRules> {
        let band = biome.rules();
        let base = PlacementRules::within(band.min_height, band.max_height);
        let rules = match (self, biome) {
            (Self::Tree, _) => PlacementRules {
                min_spacing: 3.0,
                ..base
            },
            (Self::Rock, _) => PlacementRules {
                min_spacing: 4.0,
                ..base
            },
            (Self::Building, Biome::City) => PlacementRules {
                min_spacing: 18.0,
                flatness_radius: 2,
                flatness_tolerance: 0.02,
                ..base
            },
            (Self::Building, Biome::Arctic) => PlacementRules {
                min_spacing: 12.0,
                flatness_radius: 2,
                flatness_tolerance: 0.06,
                ..base
            },
            (Self::StreetLamp, Biome::City) => PlacementRules {
                min_spacing: 10.0,
                flatness_radius: 1,
                flatness_tolerance: 0.01,
                max_center_distance: Some(terrain_size * STREET_LAMP_CENTER_FRACTION),
                ..base
            },
            (Self::Building | Self::StreetLamp, _) => return None,
        };
        Some(rules)
    }
}

/// Species planted in the biome.
#[must_use]
pub const fn tree_types(biome: Biome) -> &'static [&'static str] {
    match biome {
        Biome::Arctic | Biome::Mountain => &["pine", "spruce"],
        Biome::Forest => &["oak", "pine", "birch"],
        Biome::Desert => &["cactus", "palm"],
        Biome::City => &["oak", "maple"],
        Biome::Default => &["oak", "pine"],
    }
}

/// Rock variants scattered in every biome.
pub const ROCK_TYPES: [&str; 3] = ["boulder", "stone", "pebble"];

/// Building template drawn from a biome catalogue.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BuildingTemplate {
    /// Architectural style.
    pub kind: BuildingKind,
    /// Height in world units.
    pub height: f32,
    /// Footprint width in world units.
    pub width: f32,
    /// Footprint depth in world units.
    pub depth: f32,
    /// Facade colour.
    pub color: &'static str,
}

const fn template(
    kind: BuildingKind,
    height: f32,
    width: f32,
    depth: f32,
    color: &'static str,
) -> BuildingTemplate {
    BuildingTemplate {
        kind,
        height,
        width,
        depth,
        color,
    }
}

const CITY_BUILDINGS: [BuildingTemplate; 4] = [
    template(BuildingKind::House, 6.0, 8.0, 8.0, "#c8a27a"),
    template(BuildingKind::House, 5.0, 7.0, 9.0, "#b5651d"),
    template(BuildingKind::Skyscraper, 40.0, 12.0, 12.0, "#8fa3b8"),
    template(BuildingKind::Skyscraper, 60.0, 14.0, 14.0, "#5d6d7e"),
];

const ARCTIC_BUILDINGS: [BuildingTemplate; 1] =
    [template(BuildingKind::Igloo, 3.0, 6.0, 6.0, "#f4f9ff")];

/// Building templates available in the biome, restricted to a subtype.
#[must_use]
pub fn building_catalogue(biome: Biome, subtype: Option<BuildingSubtype>) -> Vec<BuildingTemplate> {
    let catalogue: &[BuildingTemplate] = match biome {
        Biome::City => &CITY_BUILDINGS,
        Biome::Arctic => &ARCTIC_BUILDINGS,
        _ => &[],
    };
    catalogue
        .iter()
        .copied()
        .filter(|template| subtype.map_or(true, |subtype| template.kind == subtype.kind()))
        .collect()
}
