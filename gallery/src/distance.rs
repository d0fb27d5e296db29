use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{GalleryError, check_dim};
use crate::linalg::dot_unchecked;

/// Dissimilarity measure between two equal-length vectors.
///
/// Lower values mean more similar. Every variant fails with
/// [`GalleryError::DimensionMismatch`] when the lengths differ.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    /// `sqrt(sum((a_i - b_i)^2))`
    #[default]
    Euclidean,
    /// `sum(|a_i - b_i|)`
    Manhattan,
    /// `max(|a_i - b_i|)`
    Chebyshev,
    /// `1 - a.b / (|a| |b|)`. Returns 1.0 (with a warning) when either
    /// vector has zero norm.
    Cosine,
    /// `1 - a.b`. Both inputs must already be unit length; this is not
    /// checked.
    NormalizedCosine,
}

impl Metric {
    /// All supported metrics.
    pub const ALL: [Metric; 5] = [
        Metric::Euclidean,
        Metric::Manhattan,
        Metric::Chebyshev,
        Metric::Cosine,
        Metric::NormalizedCosine,
    ];

    /// Computes the distance between `a` and `b`.
    pub fn distance(&self, a: &[f32], b: &[f32]) -> Result<f32, GalleryError> {
        check_dim(a.len(), b.len())?;
        let d = match self {
            Metric::Euclidean => a
                .iter()
                .zip(b)
                .map(|(x, y)| (x - y) * (x - y))
                .sum::<f32>()
                .sqrt(),
            Metric::Manhattan => a.iter().zip(b).map(|(x, y)| (x - y).abs()).sum(),
            Metric::Chebyshev => a
                .iter()
                .zip(b)
                .map(|(x, y)| (x - y).abs())
                .fold(0.0, f32::max),
            Metric::Cosine => cosine(a, b),
            Metric::NormalizedCosine => (1.0 - dot_unchecked(a, b)) as f32,
        };
        Ok(d)
    }

    /// Like [`Metric::distance`], but records the call on `counter` first.
    pub fn distance_counted(
        &self,
        a: &[f32],
        b: &[f32],
        counter: &DistanceCounter,
    ) -> Result<f32, GalleryError> {
        counter.record();
        self.distance(a, b)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Metric::Euclidean => "euclidean",
            Metric::Manhattan => "manhattan",
            Metric::Chebyshev => "chebyshev",
            Metric::Cosine => "cosine",
            Metric::NormalizedCosine => "normalized_cosine",
        }
    }
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let dot = dot_unchecked(a, b);
    let norm_a = dot_unchecked(a, a).sqrt();
    let norm_b = dot_unchecked(b, b).sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        warn!("gallery: zero-norm vector in cosine distance, returning maximum distance 1.0");
        return 1.0;
    }

    // Clamp to [-1, 1] to absorb floating point error.
    let similarity = (dot / (norm_a * norm_b)).clamp(-1.0, 1.0);
    (1.0 - similarity) as f32
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Metric {
    type Err = GalleryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Metric::ALL
            .into_iter()
            .find(|m| m.name() == s)
            .ok_or_else(|| GalleryError::UnknownMetric(s.to_string()))
    }
}

/// Counts distance evaluations for profiling.
///
/// Clones share the same count, so a counter can be handed to several
/// searchers (or threads) and read from one place. Increments are atomic.
#[derive(Debug, Clone, Default)]
pub struct DistanceCounter {
    calls: Arc<AtomicU64>,
}

impl DistanceCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one distance evaluation.
    pub fn record(&self) {
        self.calls.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns the number of recorded evaluations.
    pub fn get(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }

    /// Resets the count to zero.
    pub fn reset(&self) {
        self.calls.store(0, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linalg::l2_normalize;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-5
    }

    #[test]
    fn euclidean() {
        let d = Metric::Euclidean.distance(&[0.0, 0.0], &[3.0, 4.0]).unwrap();
        assert!(close(d, 5.0), "got {d}");
    }

    #[test]
    fn manhattan() {
        let d = Metric::Manhattan.distance(&[1.0, -1.0], &[3.0, 2.0]).unwrap();
        assert!(close(d, 5.0), "got {d}");
    }

    #[test]
    fn chebyshev() {
        let d = Metric::Chebyshev.distance(&[1.0, -1.0], &[3.0, 3.0]).unwrap();
        assert!(close(d, 4.0), "got {d}");
    }

    #[test]
    fn cosine_orthogonal_and_opposite() {
        let d = Metric::Cosine.distance(&[1.0, 0.0], &[0.0, 2.0]).unwrap();
        assert!(close(d, 1.0), "orthogonal: got {d}");
        let d = Metric::Cosine.distance(&[1.0, 0.0], &[-3.0, 0.0]).unwrap();
        assert!(close(d, 2.0), "opposite: got {d}");
    }

    #[test]
    fn cosine_zero_norm_is_max_distance() {
        let d = Metric::Cosine.distance(&[0.0, 0.0], &[1.0, 0.0]).unwrap();
        assert_eq!(d, 1.0);
        let d = Metric::Cosine.distance(&[1.0, 0.0], &[0.0, 0.0]).unwrap();
        assert_eq!(d, 1.0);
    }

    #[test]
    fn identity_is_zero() {
        let a = [0.3, -1.2, 4.5];
        for m in [Metric::Euclidean, Metric::Manhattan, Metric::Chebyshev] {
            assert_eq!(m.distance(&a, &a).unwrap(), 0.0, "{m}");
        }
    }

    #[test]
    fn symmetric() {
        let mut a = vec![0.3, -1.2, 4.5, 0.0];
        let mut b = vec![1.1, 0.2, -0.5, 2.0];
        l2_normalize(&mut a);
        l2_normalize(&mut b);
        for m in Metric::ALL {
            assert_eq!(
                m.distance(&a, &b).unwrap(),
                m.distance(&b, &a).unwrap(),
                "{m} should be symmetric"
            );
        }
    }

    #[test]
    fn normalized_cosine_agrees_with_cosine_on_unit_vectors() {
        let mut a = vec![1.0, 2.0, 3.0];
        let mut b = vec![-2.0, 0.5, 1.0];
        l2_normalize(&mut a);
        l2_normalize(&mut b);
        let c = Metric::Cosine.distance(&a, &b).unwrap();
        let n = Metric::NormalizedCosine.distance(&a, &b).unwrap();
        assert!(close(c, n), "cosine {c} vs normalized {n}");
    }

    #[test]
    fn dimension_mismatch() {
        for m in Metric::ALL {
            assert_eq!(
                m.distance(&[1.0, 2.0], &[1.0]),
                Err(GalleryError::DimensionMismatch { got: 1, want: 2 })
            );
        }
    }

    #[test]
    fn counter_counts_and_resets() {
        let counter = DistanceCounter::new();
        let shared = counter.clone();
        Metric::Euclidean
            .distance_counted(&[1.0], &[2.0], &counter)
            .unwrap();
        // Failed calls are still counted.
        assert!(
            Metric::Euclidean
                .distance_counted(&[1.0], &[2.0, 3.0], &counter)
                .is_err()
        );
        assert_eq!(shared.get(), 2);
        shared.reset();
        assert_eq!(counter.get(), 0);
    }

    #[test]
    fn parse_and_display() {
        for m in Metric::ALL {
            assert_eq!(m.to_string().parse::<Metric>().unwrap(), m);
        }
        assert_eq!(
            "hamming".parse::<Metric>(),
            Err(GalleryError::UnknownMetric("hamming".into()))
        );
    }

    #[test]
    fn serde_names() {
        let json = serde_json::to_string(&Metric::NormalizedCosine).unwrap();
        assert_eq!(json, "\"normalized_cosine\"");
        let m: Metric = serde_json::from_str("\"chebyshev\"").unwrap();
        assert_eq!(m, Metric::Chebyshev);
    }
}
