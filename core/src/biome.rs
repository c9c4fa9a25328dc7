//! Biome presets that drive terrain shape and walkability thresholds.

use serde::{Deserialize, Serialize};

/// Named environment preset recognised by the engine.
///
/// Unknown biome names resolve to [`Biome::Default`]; the original name is
/// kept by the world so presentation layers can still use it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Biome {
    /// Snow-covered lowlands with igloos and leafless trees.
    Arctic,
    /// Tall snowy terrain dominated by peaks.
    Mountain,
    /// Flat urban ground with houses, skyscrapers and street lamps.
    City,
    /// Rolling wooded hills.
    Forest,
    /// Dry dunes with sparse vegetation.
    Desert,
    /// Fallback rules used for unrecognised names.
    Default,
}

/// Height and slope thresholds governing terrain for a biome.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BiomeRules {
    /// Multiplier applied to normalized noise when generating heights.
    pub height_multiplier: f32,
    /// Lowest height that still counts as walkable.
    pub min_height: f32,
    /// Highest height that still counts as walkable.
    pub max_height: f32,
    /// Largest height difference to a cardinal neighbour that stays walkable.
    pub max_slope: f32,
    /// Whether the biome is winter-like, enabling peaks and leafless trees.
    pub winter: bool,
}

impl Biome {
    /// Every biome with dedicated rules, in declaration order.
    pub const ALL: [Biome; 6] = [
        Biome::Arctic,
        Biome::Mountain,
        Biome::City,
        Biome::Forest,
        Biome::Desert,
        Biome::Default,
    ];

    /// Resolves a free-form biome name, falling back to [`Biome::Default`].
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "arctic" | "snow" | "snowy" | "tundra" | "winter" => Self::Arctic,
            "mountain" | "mountains" | "alpine" => Self::Mountain,
            "city" | "urban" | "town" => Self::City,
            "forest" | "woods" | "jungle" => Self::Forest,
            "desert" | "dunes" => Self::Desert,
            _ => Self::Default,
        }
    }

    /// Canonical lowercase name of the biome.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Arctic => "arctic",
            Self::Mountain => "mountain",
            Self::City => "city",
            Self::Forest => "forest",
            Self::Desert => "desert",
            Self::Default => "default",
        }
    }

    /// Fixed terrain rules associated with the biome.
    #[must_use]
    pub const fn rules(self) -> BiomeRules {
        match self {
            Self::Arctic => BiomeRules {
                height_multiplier: 1.0,
                min_height: 0.05,
                max_height: 0.95,
                max_slope: 0.08,
                winter: true,
            },
            Self::Mountain => BiomeRules {
                height_multiplier: 1.6,
                min_height: 0.05,
                max_height: 1.3,
                max_slope: 0.12,
                winter: true,
            },
            Self::City => BiomeRules {
                height_multiplier: 0.3,
                min_height: 0.0,
                max_height: 0.4,
                max_slope: 0.03,
                winter: false,
            },
            Self::Forest | Self::Default => BiomeRules {
                height_multiplier: 0.8,
                min_height: 0.05,
                max_height: 0.85,
                max_slope: 0.06,
                winter: false,
            },
            Self::Desert => BiomeRules {
                height_multiplier: 0.6,
                min_height: 0.0,
                max_height: 0.7,
                max_slope: 0.05,
                winter: false,
            },
        }
    }

    /// Reports whether the biome is winter-like.
    #[must_use]
    pub const fn is_winter(self) -> bool {
        self.rules().winter
    }
}
