//! Spherical variogram estimation for ordinary kriging.
//!
//! The semivariance γ(h) measures spatial dissimilarity as a function of
//! separation distance h:
//! ```text
//! γ(h) = (1/2N(h)) Σ [z(xᵢ) - z(xⱼ)]²   over pairs whose distance falls in the lag bin
//! ```
//!
//! Reference:
//! Matheron, G. (1963). Principles of geostatistics. Economic Geology.
//! Cressie, N. (1993). Statistics for Spatial Data. Wiley.

use super::SamplePoint;

/// Lag bins used for the empirical variogram
pub const DEFAULT_LAGS: usize = 6;

/// Empirical variogram: semivariance values at discrete lag distances.
#[derive(Debug, Clone)]
pub struct EmpiricalVariogram {
    /// Lag distances (bin centers)
    pub lags: Vec<f64>,
    /// Semivariance values γ(h) at each lag, NaN for empty bins
    pub semivariance: Vec<f64>,
    /// Number of point pairs contributing to each lag bin
    pub pair_counts: Vec<usize>,
}

/// Spherical model: γ(h) = c₀ + c·[1.5(h/a) - 0.5(h/a)³] for h ≤ a; c₀+c beyond.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SphericalVariogram {
    /// Nugget (c₀)
    pub nugget: f64,
    /// Partial sill (c)
    pub partial_sill: f64,
    /// Range (a)
    pub range: f64,
}

impl SphericalVariogram {
    pub fn evaluate(&self, h: f64) -> f64 {
        if h < 1e-15 {
            return 0.0;
        }
        if h >= self.range {
            self.nugget + self.partial_sill
        } else {
            let hr = h / self.range;
            self.nugget + self.partial_sill * (1.5 * hr - 0.5 * hr * hr * hr)
        }
    }

    pub fn sill(&self) -> f64 {
        self.nugget + self.partial_sill
    }

    fn shape(h: f64, range: f64) -> f64 {
        if h >= range {
            1.0
        } else {
            let hr = h / range;
            1.5 * hr - 0.5 * hr * hr * hr
        }
    }
}

/// Empirical variogram with `n_lags` equal bins between the smallest and
/// the largest pairwise distance.
pub fn empirical_variogram(points: &[SamplePoint], n_lags: usize) -> EmpiricalVariogram {
    let n_lags = n_lags.max(1);
    let mut pairs = Vec::with_capacity(points.len() * points.len().saturating_sub(1) / 2);
    for (i, a) in points.iter().enumerate() {
        for b in &points[i + 1..] {
            let dz = a.value - b.value;
            pairs.push((a.dist(b.x, b.y), dz * dz));
        }
    }

    let (d_min, d_max) = pairs
        .iter()
        .fold((f64::INFINITY, 0.0_f64), |(lo, hi), &(d, _)| (lo.min(d), hi.max(d)));
    let d_min = if d_min.is_finite() { d_min } else { 0.0 };
    let width = ((d_max - d_min) / n_lags as f64).max(f64::MIN_POSITIVE);

    let lags: Vec<f64> = (0..n_lags).map(|k| d_min + (k as f64 + 0.5) * width).collect();
    let mut semivariance = vec![0.0_f64; n_lags];
    let mut pair_counts = vec![0_usize; n_lags];

    for &(d, sq_diff) in &pairs {
        let bin = (((d - d_min) / width) as usize).min(n_lags - 1);
        semivariance[bin] += sq_diff;
        pair_counts[bin] += 1;
    }

    for (sv, &cnt) in semivariance.iter_mut().zip(&pair_counts) {
        *sv = if cnt > 0 { *sv / (2.0 * cnt as f64) } else { f64::NAN };
    }

    EmpiricalVariogram {
        lags,
        semivariance,
        pair_counts,
    }
}

/// Fit a spherical model to the samples.
///
/// The range is searched over a grid; for each candidate the nugget and
/// partial sill follow from non-negative least squares on the empirical
/// bins. With fewer than three populated bins the model falls back to the
/// sample moments: no nugget, sill equal to the sample variance, range
/// half the largest pairwise distance.
pub fn fit_spherical(points: &[SamplePoint]) -> SphericalVariogram {
    let empirical = empirical_variogram(points, DEFAULT_LAGS);
    let valid: Vec<(f64, f64, f64)> = empirical
        .lags
        .iter()
        .zip(&empirical.semivariance)
        .zip(&empirical.pair_counts)
        .filter(|((_, sv), cnt)| sv.is_finite() && **cnt > 0)
        .map(|((&lag, &sv), &cnt)| (lag, sv, cnt as f64))
        .collect();

    let max_lag = empirical.lags.last().copied().unwrap_or(1.0).max(f64::MIN_POSITIVE);
    if valid.len() < 3 {
        return moments_fallback(points, max_lag);
    }

    let mut best: Option<(f64, SphericalVariogram)> = None;
    for step in 1..=40 {
        let range = max_lag * 2.0 * step as f64 / 40.0;
        let (nugget, partial_sill) = fit_linear(&valid, range);
        let model = SphericalVariogram {
            nugget,
            partial_sill,
            range,
        };
        let rss: f64 = valid
            .iter()
            .map(|&(h, sv, w)| {
                let r = sv - model.evaluate(h);
                w * r * r
            })
            .sum();
        if best.as_ref().is_none_or(|(b, _)| rss < *b) {
            best = Some((rss, model));
        }
    }

    match best {
        Some((_, model)) if model.sill() > 0.0 => model,
        _ => moments_fallback(points, max_lag),
    }
}

/// Weighted least squares for `sv ≈ nugget + psill * shape(h)`, both >= 0.
fn fit_linear(valid: &[(f64, f64, f64)], range: f64) -> (f64, f64) {
    let (mut sw, mut sx, mut sy, mut sxx, mut sxy) = (0.0, 0.0, 0.0, 0.0, 0.0);
    for &(h, sv, w) in valid {
        let x = SphericalVariogram::shape(h, range);
        sw += w;
        sx += w * x;
        sy += w * sv;
        sxx += w * x * x;
        sxy += w * x * sv;
    }

    let det = sw * sxx - sx * sx;
    if det.abs() > 1e-12 * sw * sxx.max(1.0) {
        let psill = (sw * sxy - sx * sy) / det;
        let nugget = (sy - psill * sx) / sw;
        if psill >= 0.0 && nugget >= 0.0 {
            return (nugget, psill);
        }
    }

    // Constrained: nugget 0, or all nugget
    let psill = if sxx > 0.0 { (sxy / sxx).max(0.0) } else { 0.0 };
    let rss_psill: f64 = valid
        .iter()
        .map(|&(h, sv, w)| w * (sv - psill * SphericalVariogram::shape(h, range)).powi(2))
        .sum();
    let nugget = (sy / sw).max(0.0);
    let rss_nugget: f64 = valid.iter().map(|&(_, sv, w)| w * (sv - nugget).powi(2)).sum();

    if rss_psill <= rss_nugget {
        (0.0, psill)
    } else {
        (nugget, 0.0)
    }
}

fn moments_fallback(points: &[SamplePoint], max_lag: f64) -> SphericalVariogram {
    let n = points.len().max(1) as f64;
    let mean = points.iter().map(|p| p.value).sum::<f64>() / n;
    let var = points.iter().map(|p| (p.value - mean).powi(2)).sum::<f64>() / n;
    SphericalVariogram {
        nugget: 0.0,
        partial_sill: if var > 0.0 { var } else { 1.0 },
        range: max_lag,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn lcg_points(n: usize, seed: u64) -> Vec<SamplePoint> {
        let mut rng = seed;
        let mut next = || {
            rng = rng.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            (rng >> 33) as f64 / (1u64 << 31) as f64
        };
        (0..n)
            .map(|_| {
                let x = next() * 100.0;
                let y = next() * 100.0;
                let value = 0.5 * x + 10.0 * (y / 20.0).sin() + next();
                SamplePoint::new(x, y, value)
            })
            .collect()
    }

    #[test]
    fn test_spherical_shape() {
        let v = SphericalVariogram {
            nugget: 1.0,
            partial_sill: 4.0,
            range: 10.0,
        };
        assert_relative_eq!(v.evaluate(0.0), 0.0);
        assert_relative_eq!(v.evaluate(10.0), 5.0);
        assert_relative_eq!(v.evaluate(50.0), 5.0);
        assert_relative_eq!(v.evaluate(5.0), 1.0 + 4.0 * (0.75 - 0.0625));
    }

    #[test]
    fn test_empirical_bins_cover_all_pairs() {
        let pts = lcg_points(30, 7);
        let ev = empirical_variogram(&pts, DEFAULT_LAGS);
        assert_eq!(ev.lags.len(), DEFAULT_LAGS);
        assert_eq!(ev.pair_counts.iter().sum::<usize>(), 30 * 29 / 2);
    }

    #[test]
    fn test_fit_is_non_negative() {
        let v = fit_spherical(&lcg_points(60, 42));
        assert!(v.nugget >= 0.0);
        assert!(v.partial_sill >= 0.0);
        assert!(v.range > 0.0);
        assert!(v.sill() > 0.0);
    }

    #[test]
    fn test_few_points_use_moments() {
        let pts = [SamplePoint::new(0.0, 0.0, 1.0), SamplePoint::new(10.0, 0.0, 3.0)];
        let v = fit_spherical(&pts);
        assert_relative_eq!(v.nugget, 0.0);
        assert_relative_eq!(v.partial_sill, 1.0);
    }
}
