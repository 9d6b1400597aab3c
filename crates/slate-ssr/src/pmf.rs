//! Five-point rating distributions and their summary statistics.

pub type Pmf = [f64; 5];

/// Minimum mass kept on every rating
pub const PMF_FLOOR: f64 = 0.01;

/// Maximum mass any single rating may take
pub const PMF_CEILING: f64 = 0.82;

/// Reference skew the KS-like score is measured against
pub const BASELINE: Pmf = [0.05, 0.10, 0.20, 0.30, 0.35];

/// Knots of the response curve. Weak content spreads across the scale,
/// typical content leans on 4 and 5, strong content piles onto 5 past the
/// ceiling.
pub const RESPONSE_WEAK: Pmf = [0.14, 0.22, 0.32, 0.20, 0.12];
pub const RESPONSE_TYPICAL: Pmf = [0.0295, 0.059, 0.1275, 0.255, 0.529];
pub const RESPONSE_STRONG: Pmf = [0.005, 0.005, 0.01, 0.02, 0.96];

/// Piecewise-linear walk from weak (`t = 0`) through typical (`t = 0.5`) to
/// strong (`t = 1`). `t` is clamped to `[0, 1]`; NaN reads as typical.
pub fn response_curve(t: f64) -> Pmf {
    let t = if t.is_nan() { 0.5 } else { t.clamp(0.0, 1.0) };
    let (from, to, u) = if t < 0.5 {
        (&RESPONSE_WEAK, &RESPONSE_TYPICAL, t / 0.5)
    } else {
        (&RESPONSE_TYPICAL, &RESPONSE_STRONG, (t - 0.5) / 0.5)
    };
    let mut out = [0.0; 5];
    for (slot, (a, b)) in out.iter_mut().zip(from.iter().zip(to)) {
        *slot = a + u * (b - a);
    }
    out
}

/// Clamps each rating to `[floor, ceiling]` and rescales the rest so the
/// total is 1. Ratings pushed back over the ceiling by the rescale are pinned
/// there and the remainder is spread again, so the result stays inside
/// `[floor, ceiling]`. Input with no mass above the floor becomes uniform.
pub fn clamp_and_renormalize(pmf: Pmf, floor: f64, ceiling: f64) -> Pmf {
    let clamped = pmf.map(|p| if p.is_nan() { floor } else { p.clamp(floor, ceiling) });
    let uniform = [1.0 / clamped.len() as f64; 5];
    let mut pinned = [false; 5];

    loop {
        let free = pinned.iter().filter(|is_pinned| !**is_pinned).count();
        let budget = 1.0 - ceiling * (clamped.len() - free) as f64 - floor * free as f64;
        if free == 0 || budget < 0.0 {
            return uniform;
        }
        let excess: f64 = clamped
            .iter()
            .zip(&pinned)
            .filter(|(_, is_pinned)| !**is_pinned)
            .map(|(p, _)| p - floor)
            .sum();
        if excess <= 0.0 && free == clamped.len() {
            return uniform;
        }

        let mut out = [0.0; 5];
        for (slot, (p, is_pinned)) in out.iter_mut().zip(clamped.iter().zip(&pinned)) {
            *slot = if *is_pinned {
                ceiling
            } else if excess > 0.0 {
                floor + (p - floor) * budget / excess
            } else {
                floor + budget / free as f64
            };
        }

        let mut settled = true;
        for (is_pinned, p) in pinned.iter_mut().zip(&out) {
            if !*is_pinned && *p > ceiling {
                *is_pinned = true;
                settled = false;
            }
        }
        if settled {
            return out;
        }
    }
}

/// Weighted sum of distributions; weights are expected to sum to 1
pub fn mix<'a>(parts: impl IntoIterator<Item = (f64, &'a Pmf)>) -> Pmf {
    let mut out = [0.0; 5];
    for (weight, pmf) in parts {
        for (slot, p) in out.iter_mut().zip(pmf) {
            *slot += weight * p;
        }
    }
    out
}

/// Expected rating on the 1-5 scale
pub fn mean(pmf: &Pmf) -> f64 {
    pmf.iter()
        .enumerate()
        .map(|(i, p)| (i + 1) as f64 * p)
        .sum()
}

/// Shannon entropy in bits
pub fn entropy(pmf: &Pmf) -> f64 {
    -pmf.iter()
        .filter(|p| **p > 0.0)
        .map(|p| p * p.log2())
        .sum::<f64>()
}

/// Entropy as a share of the 5-point maximum
pub fn entropy_coverage(pmf: &Pmf) -> f64 {
    entropy(pmf) / (pmf.len() as f64).log2()
}

/// `0.7 +` the largest CDF gap against [`BASELINE`], capped at 0.99
pub fn ks_score(pmf: &Pmf) -> f64 {
    let mut cdf = 0.0;
    let mut baseline = 0.0;
    let mut gap: f64 = 0.0;
    for (p, b) in pmf.iter().zip(BASELINE.iter()) {
        cdf += p;
        baseline += b;
        gap = gap.max((cdf - baseline).abs());
    }
    (0.7 + gap).min(0.99)
}

/// P(1) + P(5)
pub fn bimodal_share(pmf: &Pmf) -> f64 {
    pmf[0] + pmf[4]
}

/// Gap between the two largest masses
pub fn separation(pmf: &Pmf) -> f64 {
    let mut sorted = *pmf;
    sorted.sort_by(|a, b| b.total_cmp(a));
    sorted[0] - sorted[1]
}

/// P(4) + P(5)
pub fn top_two_box(pmf: &Pmf) -> f64 {
    pmf[3] + pmf[4]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn total(pmf: &Pmf) -> f64 {
        pmf.iter().sum()
    }

    #[test]
    fn test_curve_knots_are_distributions() {
        for knot in [RESPONSE_WEAK, RESPONSE_TYPICAL, RESPONSE_STRONG] {
            assert!((total(&knot) - 1.0).abs() < 1e-12);
        }
        let close = |a: Pmf, b: Pmf| a.iter().zip(&b).all(|(x, y)| (x - y).abs() < 1e-12);
        assert!(close(response_curve(0.0), RESPONSE_WEAK));
        assert!(close(response_curve(0.5), RESPONSE_TYPICAL));
        assert!(close(response_curve(1.0), RESPONSE_STRONG));
        assert!(close(response_curve(-3.0), RESPONSE_WEAK));
        assert!(close(response_curve(f64::NAN), RESPONSE_TYPICAL));
    }

    #[test]
    fn test_knot_statistics() {
        let weak = RESPONSE_WEAK;
        assert!((mean(&weak) - 2.94).abs() < 1e-9);
        assert!((separation(&weak) - 0.10).abs() < 1e-9);
        assert!((bimodal_share(&weak) - 0.26).abs() < 1e-9);

        let typical = RESPONSE_TYPICAL;
        assert!((mean(&typical) - 4.195).abs() < 1e-9);
        assert!(entropy(&typical) > 1.75 && entropy(&typical) < 1.77);
    }

    #[test]
    fn test_mean_rises_along_curve() {
        let means: Vec<f64> = (0..=20)
            .map(|i| mean(&clamp_and_renormalize(response_curve(i as f64 / 20.0), PMF_FLOOR, PMF_CEILING)))
            .collect();
        assert!(means.windows(2).all(|pair| pair[0] < pair[1]), "{:?}", means);
        assert!(means[0] < 3.0 && means[20] > 4.7);
    }

    #[test]
    fn test_strong_end_is_capped_at_ceiling() {
        let strong = clamp_and_renormalize(response_curve(1.0), PMF_FLOOR, PMF_CEILING);
        assert_eq!(strong[4], PMF_CEILING);
        assert!((total(&strong) - 1.0).abs() < 1e-12);
        assert!(strong.iter().all(|p| *p >= PMF_FLOOR && *p <= PMF_CEILING));
    }

    #[test]
    fn test_entropy_bounds() {
        assert_eq!(entropy(&[0.0, 0.0, 0.0, 0.0, 1.0]), 0.0);
        let uniform = [0.2; 5];
        assert!((entropy_coverage(&uniform) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_ks_score_is_capped() {
        assert_eq!(ks_score(&[1.0, 0.0, 0.0, 0.0, 0.0]), 0.99);
        assert!((ks_score(&BASELINE) - 0.7).abs() < 1e-12);
    }

    #[test]
    fn test_clamp_and_renormalize_keeps_floor_and_ceiling() {
        let pmf = clamp_and_renormalize([0.0, 0.0, 0.05, 0.05, 0.95], PMF_FLOOR, PMF_CEILING);
        assert!((total(&pmf) - 1.0).abs() < 1e-12);
        assert!(pmf.iter().all(|p| *p >= PMF_FLOOR - 1e-12));
        assert_eq!(pmf[4], PMF_CEILING);
        assert!((pmf[2] - 0.08).abs() < 1e-12);
    }

    #[test]
    fn test_clamp_and_renormalize_is_identity_inside_range() {
        let pmf = clamp_and_renormalize(RESPONSE_TYPICAL, PMF_FLOOR, PMF_CEILING);
        for (a, b) in pmf.iter().zip(RESPONSE_TYPICAL.iter()) {
            assert!((a - b).abs() < 1e-12);
        }
    }

    #[test]
    fn test_degenerate_input_becomes_uniform() {
        for degenerate in [[0.0; 5], [f64::NAN; 5]] {
            let pmf = clamp_and_renormalize(degenerate, PMF_FLOOR, PMF_CEILING);
            assert!(pmf.iter().all(|p| (p - 0.2).abs() < 1e-12));
        }
    }

    #[test]
    fn test_mix() {
        let mixed = mix([(0.5, &RESPONSE_WEAK), (0.5, &RESPONSE_STRONG)]);
        assert!((total(&mixed) - 1.0).abs() < 1e-12);
        assert!((mixed[4] - 0.54).abs() < 1e-12);
    }
}
