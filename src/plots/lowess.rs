//! Locally weighted scatterplot smoothing

/// Default fraction of points in each local neighbourhood
pub const DEFAULT_SPAN: f64 = 2.0 / 3.0;

/// Most local fits computed for one smooth
pub const MAX_EVALUATIONS: usize = 200;

/// Smooth `y` against `x` with a local linear fit and tricube weights.
///
/// Each local fit uses the `ceil(span · n)` nearest neighbours in `x`, which
/// form a contiguous window of the sorted points. Inputs with more than
/// [`MAX_EVALUATIONS`] points are evaluated at evenly spaced sorted positions,
/// always including the smallest and largest `x`.
/// Returns `(x, ŷ)` pairs sorted by `x`.
pub fn lowess(x: &[f64], y: &[f64], span: f64) -> Vec<(f64, f64)> {
    let mut points: Vec<(f64, f64)> = x
        .iter()
        .copied()
        .zip(y.iter().copied())
        .filter(|(a, b)| a.is_finite() && b.is_finite())
        .collect();
    points.sort_by(|a, b| a.0.total_cmp(&b.0));

    let n = points.len();
    if n < 2 {
        return points;
    }

    let span = span.clamp(0.0, 1.0);
    let k = ((n as f64 * span).ceil() as usize).clamp(2, n);

    let mut targets: Vec<usize> = if n <= MAX_EVALUATIONS {
        (0..n).collect()
    } else {
        (0..MAX_EVALUATIONS)
            .map(|i| i * (n - 1) / (MAX_EVALUATIONS - 1))
            .collect()
    };
    targets.dedup();

    let mut lo = 0;
    targets
        .into_iter()
        .map(|t| {
            let x0 = points[t].0;
            // Targets ascend, so the window only ever slides right
            while lo + k < n && x0 - points[lo].0 > points[lo + k].0 - x0 {
                lo += 1;
            }
            (x0, local_linear(&points, x0, lo, k))
        })
        .collect()
}

/// Weighted least squares line through the window `points[lo..lo + k]`,
/// widened to points tied at the bandwidth, evaluated at `x0`
fn local_linear(points: &[(f64, f64)], x0: f64, lo: usize, k: usize) -> f64 {
    let hi = lo + k;
    let max_dist = (x0 - points[lo].0).max(points[hi - 1].0 - x0);

    let mut start = lo;
    while start > 0 && x0 - points[start - 1].0 <= max_dist {
        start -= 1;
    }
    let mut end = hi;
    while end < points.len() && points[end].0 - x0 <= max_dist {
        end += 1;
    }
    let window = &points[start..end];

    let weights: Vec<f64> = window
        .iter()
        .map(|(x, _)| {
            let d = (x - x0).abs();
            if max_dist <= 0.0 {
                if d == 0.0 {
                    1.0
                } else {
                    0.0
                }
            } else {
                // Points exactly at the bandwidth still get a sliver of weight
                tricube(d / (max_dist * 1.000_001))
            }
        })
        .collect();

    let sum_w: f64 = weights.iter().sum();
    let mean_x = window.iter().zip(&weights).map(|((x, _), w)| w * x).sum::<f64>() / sum_w;
    let mean_y = window.iter().zip(&weights).map(|((_, y), w)| w * y).sum::<f64>() / sum_w;

    let sxx: f64 = window
        .iter()
        .zip(&weights)
        .map(|((x, _), w)| w * (x - mean_x).powi(2))
        .sum();
    if sxx <= f64::EPSILON * sum_w {
        return mean_y;
    }
    let sxy: f64 = window
        .iter()
        .zip(&weights)
        .map(|((x, y), w)| w * (x - mean_x) * (y - mean_y))
        .sum();

    mean_y + sxy / sxx * (x0 - mean_x)
}

/// Tricube weight: (1 - u³)³ for u in [0, 1), 0 otherwise
fn tricube(u: f64) -> f64 {
    if (0.0..1.0).contains(&u) {
        (1.0 - u.powi(3)).powi(3)
    } else {
        0.0
    }
}
