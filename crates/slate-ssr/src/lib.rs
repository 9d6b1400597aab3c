//! Slate SSR: deterministic simulated survey responses
//!
//! Each persona × hook × seed triple maps to one reproducible rating
//! distribution over a 1-5 scale, read through six fixed anchors.
//!
//! # Example
//!
//! ```
//! use slate_ssr::{run_simulation, Device, HookRecord, PersonaRecord, PriceSensitivity};
//!
//! let persona = PersonaRecord {
//!     persona_id: "p-1".into(),
//!     name: "Studio owner".into(),
//!     jtbd: "fill the evening classes".into(),
//!     context: "two locations".into(),
//!     trigger: "new season".into(),
//!     blocker: "no time for ads".into(),
//!     price_sensitivity: PriceSensitivity::High,
//!     confidence_level: 0.6,
//!     evidence_refs: vec![],
//!     weight: 1.0,
//! };
//! let hook = HookRecord {
//!     hook_id: "h-1".into(),
//!     segment_id: "s-1".into(),
//!     device: Device::Square,
//!     hook_text: "Full classes without touching an ad dashboard".into(),
//!     proof_ref: "review-12".into(),
//!     novelty: 0.4,
//!     min_distance: 0.3,
//!     legal_risk: 0.0,
//! };
//!
//! let result = run_simulation(&persona, &hook, 1234, "sim").unwrap();
//! assert_eq!(result.anchor_distributions.len(), 6);
//! assert!((result.pmf.iter().sum::<f64>() - 1.0).abs() < 1e-5);
//! ```

pub mod anchors;
pub mod embedding;
pub mod pmf;
pub mod records;
pub mod rng;
pub mod seed;
pub mod simulation;

pub use anchors::{AnchorDefinition, ANCHORS, ANCHOR_COUNT};
pub use embedding::{EMBEDDING_DIM, EMBEDDING_MODEL};
pub use pmf::{Pmf, PMF_CEILING, PMF_FLOOR};
pub use records::{Device, HookRecord, PersonaRecord, PriceSensitivity};
pub use rng::{SplitMix64, UnitRng};
pub use seed::{SimulationSeeds, PSEUDO_SEED_LEN};
pub use simulation::{
    run_simulation, AnchorDistribution, ResponseRecord, SimulationEngine, SimulationError,
    SimulationMode, SimulationResult, REPORTING_THRESHOLD,
};
