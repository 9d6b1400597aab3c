//! Gate evaluation for simulated-response metrics
//!
//! Checks run in a fixed order and the first failing check decides the
//! reported reason. The fast-track tier only applies to content flagged for
//! accelerated release.

use serde::{Deserialize, Serialize};

use super::profile::GateThresholds;

/// Metrics of one persona × hook simulation, as seen by the gates
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SsrMetrics {
    pub relevance_mean: f64,
    pub ks: f64,
    pub entropy: f64,
    pub entropy_coverage_ratio: f64,
    pub bimodal_share: f64,
    pub separation: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purchase_intent_mean: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purchase_intent_high_mass: Option<f64>,
    #[serde(default)]
    pub fast_track: bool,
}

/// Identifies the check that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateCheck {
    RelevanceMean,
    Ks,
    Entropy,
    EntropyCoverage,
    BimodalShare,
    Separation,
    PurchaseIntentMean,
    PurchaseIntentHighMass,
    FastTrackEntropy,
    FastTrackMean,
    Novelty,
    HookDistance,
    Coverage,
}

/// Outcome of a gate: `ok`, or the first violated check with its reason
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateEvaluation {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check: Option<GateCheck>,
}

impl GateEvaluation {
    pub fn pass() -> Self {
        Self {
            ok: true,
            reason: None,
            check: None,
        }
    }

    pub fn fail(check: GateCheck, reason: impl Into<String>) -> Self {
        Self {
            ok: false,
            reason: Some(reason.into()),
            check: Some(check),
        }
    }
}

/// `value` must reach `min`. NaN never does.
pub(crate) fn below(value: f64, min: f64) -> bool {
    !(value >= min)
}

/// Evaluates simulated-response metrics against the thresholds
pub fn evaluate(metrics: &SsrMetrics, thresholds: &GateThresholds) -> GateEvaluation {
    let t = thresholds;

    if below(metrics.relevance_mean, t.relevance_mean_min) {
        return GateEvaluation::fail(
            GateCheck::RelevanceMean,
            format!(
                "Relevance mean {:.2} below {}",
                metrics.relevance_mean, t.relevance_mean_min
            ),
        );
    }

    if below(metrics.ks, t.ks_min) {
        return GateEvaluation::fail(
            GateCheck::Ks,
            format!("KS {:.2} below {}", metrics.ks, t.ks_min),
        );
    }

    if below(metrics.entropy, t.entropy_min) {
        return GateEvaluation::fail(
            GateCheck::Entropy,
            format!("Entropy {:.2} below {}", metrics.entropy, t.entropy_min),
        );
    }

    if below(metrics.entropy_coverage_ratio, t.entropy_coverage) {
        return GateEvaluation::fail(
            GateCheck::EntropyCoverage,
            format!(
                "Entropy coverage {:.2} below {}",
                metrics.entropy_coverage_ratio, t.entropy_coverage
            ),
        );
    }

    if below(metrics.bimodal_share, t.bimodal_share) {
        return GateEvaluation::fail(
            GateCheck::BimodalShare,
            format!(
                "Bimodal share {:.2} below {}",
                metrics.bimodal_share, t.bimodal_share
            ),
        );
    }

    if below(metrics.separation, t.separation_min) {
        return GateEvaluation::fail(
            GateCheck::Separation,
            format!(
                "Top-2 separation {:.2} below {}",
                metrics.separation, t.separation_min
            ),
        );
    }

    if let Some(mean) = metrics.purchase_intent_mean {
        if below(mean, t.purchase_intent_mean_min) {
            return GateEvaluation::fail(
                GateCheck::PurchaseIntentMean,
                format!("PI mean {:.2} below {}", mean, t.purchase_intent_mean_min),
            );
        }
    }

    if let Some(high_mass) = metrics.purchase_intent_high_mass {
        if below(high_mass, t.purchase_intent_high_mass) {
            return GateEvaluation::fail(
                GateCheck::PurchaseIntentHighMass,
                format!(
                    "PI high-mass {:.2} below {}",
                    high_mass, t.purchase_intent_high_mass
                ),
            );
        }
    }

    if metrics.fast_track {
        if !(metrics.entropy <= t.fast_track_entropy_max) {
            return GateEvaluation::fail(
                GateCheck::FastTrackEntropy,
                format!(
                    "Fast-track entropy {:.2} exceeds {}",
                    metrics.entropy, t.fast_track_entropy_max
                ),
            );
        }

        if let Some(mean) = metrics.purchase_intent_mean {
            if below(mean, t.fast_track_mean) {
                return GateEvaluation::fail(
                    GateCheck::FastTrackMean,
                    format!("Fast-track PI mean {:.2} below {}", mean, t.fast_track_mean),
                );
            }
        }
    }

    GateEvaluation::pass()
}

/// Gate evaluator bound to one set of thresholds
#[derive(Debug, Clone, Default)]
pub struct GateEvaluator {
    thresholds: GateThresholds,
}

impl GateEvaluator {
    pub fn new(thresholds: GateThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &GateThresholds {
        &self.thresholds
    }

    pub fn evaluate(&self, metrics: &SsrMetrics) -> GateEvaluation {
        evaluate(metrics, &self.thresholds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn passing() -> SsrMetrics {
        SsrMetrics {
            relevance_mean: 4.2,
            ks: 0.9,
            entropy: 1.75,
            entropy_coverage_ratio: 0.75,
            bimodal_share: 0.55,
            separation: 0.27,
            purchase_intent_mean: Some(4.2),
            purchase_intent_high_mass: Some(0.78),
            fast_track: false,
        }
    }

    #[test]
    fn test_passing_metrics() {
        let verdict = GateEvaluator::default().evaluate(&passing());
        assert_eq!(verdict, GateEvaluation::pass());
    }

    #[test]
    fn test_each_metric_below_threshold_flips_verdict() {
        let cases: [(GateCheck, fn(&mut SsrMetrics)); 8] = [
            (GateCheck::RelevanceMean, |m| m.relevance_mean = 3.5),
            (GateCheck::Ks, |m| m.ks = 0.8),
            (GateCheck::Entropy, |m| m.entropy = 1.1),
            (GateCheck::EntropyCoverage, |m| m.entropy_coverage_ratio = 0.6),
            (GateCheck::BimodalShare, |m| m.bimodal_share = 0.2),
            (GateCheck::Separation, |m| m.separation = 0.1),
            (GateCheck::PurchaseIntentMean, |m| m.purchase_intent_mean = Some(4.0)),
            (GateCheck::PurchaseIntentHighMass, |m| {
                m.purchase_intent_high_mass = Some(0.6)
            }),
        ];

        for (check, lower) in cases {
            let mut metrics = passing();
            lower(&mut metrics);
            let verdict = evaluate(&metrics, &GateThresholds::default());
            assert!(!verdict.ok, "{:?} should fail", check);
            assert_eq!(verdict.check, Some(check));
            assert!(verdict.reason.is_some());
        }
    }

    #[test]
    fn test_first_failing_check_wins() {
        let mut metrics = passing();
        metrics.separation = 0.0;
        metrics.ks = 0.1;

        let verdict = evaluate(&metrics, &GateThresholds::default());
        assert_eq!(verdict.check, Some(GateCheck::Ks));
        assert_eq!(verdict.reason.as_deref(), Some("KS 0.10 below 0.85"));
    }

    #[test]
    fn test_optional_purchase_intent_checks_are_skipped_when_absent() {
        let mut metrics = passing();
        metrics.purchase_intent_mean = None;
        metrics.purchase_intent_high_mass = None;
        assert!(evaluate(&metrics, &GateThresholds::default()).ok);
    }

    #[test]
    fn test_threshold_equality_passes() {
        let thresholds = GateThresholds::default();
        let mut metrics = passing();
        metrics.ks = thresholds.ks_min;
        assert!(evaluate(&metrics, &thresholds).ok);
    }

    #[test]
    fn test_nan_metric_fails() {
        let mut metrics = passing();
        metrics.entropy = f64::NAN;
        let verdict = evaluate(&metrics, &GateThresholds::default());
        assert_eq!(verdict.check, Some(GateCheck::Entropy));
    }
}
