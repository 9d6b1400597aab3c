//! The six interpretive lenses a simulated respondent can read a hook through.

use once_cell::sync::Lazy;

use crate::embedding::{normalize, Embedding, EMBEDDING_DIM};
use crate::rng::{SplitMix64, UnitRng};
use crate::seed::hash_u64;

pub const ANCHOR_COUNT: usize = 6;

/// A fixed reference vector with its scale and tilt bias
#[derive(Debug, Clone, PartialEq)]
pub struct AnchorDefinition {
    pub id: &'static str,
    pub lens: &'static str,
    /// Amplifies how strongly alignment with this lens moves the ratings
    pub scale: f64,
    /// Constant optimism (positive) or skepticism (negative) of the lens
    pub tilt: f64,
    pub vector: Embedding,
}

impl AnchorDefinition {
    fn new(id: &'static str, lens: &'static str, scale: f64, tilt: f64) -> Self {
        let mut rng = SplitMix64::new(hash_u64(&[b"slate-anchor", id.as_bytes()]));
        let mut vector = [0.0; EMBEDDING_DIM];
        for slot in vector.iter_mut() {
            *slot = 2.0 * rng.next_unit() - 1.0;
        }
        normalize(&mut vector);
        Self {
            id,
            lens,
            scale,
            tilt,
            vector,
        }
    }
}

pub static ANCHORS: Lazy<[AnchorDefinition; ANCHOR_COUNT]> = Lazy::new(|| {
    [
        AnchorDefinition::new("value", "Is this worth the money for what I need?", 1.10, 0.35),
        AnchorDefinition::new("urgency", "Does this solve something I have to fix now?", 0.95, 0.20),
        AnchorDefinition::new("trust", "Do I believe the claim and the people behind it?", 1.20, 0.10),
        AnchorDefinition::new("novelty", "Have I seen this a hundred times already?", 0.90, 0.25),
        AnchorDefinition::new("friction", "How much effort stands between me and the result?", 1.05, -0.40),
        AnchorDefinition::new("skeptic", "What is the catch?", 0.85, -0.30),
    ]
});
