//! One-way seed derivation.
//!
//! Every part fed to the hash is length-prefixed, so `("ab", "c")` and
//! `("a", "bc")` never collide.

use serde::{Deserialize, Serialize};

/// Length of the audit pseudo-seed strings, in hex characters
pub const PSEUDO_SEED_LEN: usize = 32;

/// Sub-seeds of one persona × hook × seed triple
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationSeeds {
    pub persona: u64,
    pub hook: u64,
    pub combined: u64,
}

impl SimulationSeeds {
    pub fn derive(persona_id: &str, hook_id: &str, seed: u64) -> Self {
        let persona = hash_u64(&[persona_id.as_bytes(), &seed.to_le_bytes(), b"persona"]);
        let hook = hash_u64(&[hook_id.as_bytes(), &seed.to_le_bytes(), b"hook"]);
        let combined = hash_u64(&[
            &persona.to_le_bytes(),
            &hook.to_le_bytes(),
            &seed.to_le_bytes(),
            b"combined",
        ]);
        Self {
            persona,
            hook,
            combined,
        }
    }

    /// Fixed-length hex tag for an audit record
    pub fn pseudo_seed(&self, label: &str) -> String {
        let hash = hash_parts(&[&self.combined.to_le_bytes(), label.as_bytes()]);
        hash.to_hex().as_str()[..PSEUDO_SEED_LEN].to_string()
    }
}

/// blake3 over length-prefixed parts
pub fn hash_parts(parts: &[&[u8]]) -> blake3::Hash {
    let mut hasher = blake3::Hasher::new();
    for part in parts {
        hasher.update(&(part.len() as u64).to_le_bytes());
        hasher.update(part);
    }
    hasher.finalize()
}

/// First eight bytes of the digest, little-endian
pub fn hash_u64(parts: &[&[u8]]) -> u64 {
    leading_u64(hash_parts(parts).as_bytes())
}

pub(crate) fn leading_u64(bytes: &[u8; 32]) -> u64 {
    let mut word = [0u8; 8];
    word.copy_from_slice(&bytes[..8]);
    u64::from_le_bytes(word)
}
