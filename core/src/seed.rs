//! Labelled random stream derivation.

use sha2::{Digest, Sha256};

/// Stream label feeding terrain noise and feature bumps.
pub const TERRAIN_STREAM: &str = "terrain";
/// Stream label feeding tree placement.
pub const TREE_STREAM: &str = "trees";
/// Stream label feeding rock placement.
pub const ROCK_STREAM: &str = "rocks";
/// Stream label feeding building placement.
pub const BUILDING_STREAM: &str = "buildings";
/// Stream label feeding street lamp placement.
pub const STREET_LAMP_STREAM: &str = "street_lamps";
/// Stream label feeding enemy placement.
pub const ENEMY_STREAM: &str = "enemies";

/// Derives an independent seed for the stream identified by `label`.
///
/// The seed is the first eight bytes, little endian, of
/// `SHA-256(seed_le || label)`, so streams stay stable when unrelated
/// streams draw more or fewer values.
#[must_use]
pub fn derive_stream_seed(seed: u64, label: &str) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(seed.to_le_bytes());
    hasher.update(label.as_bytes());
    let digest = hasher.finalize();
    let mut bytes = [0_u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(bytes)
}
