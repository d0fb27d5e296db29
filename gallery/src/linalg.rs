//! Vector algebra over feature-like slices.
//!
//! Everything here takes `&[f32]`, so it works on raw slices, `Vec<f32>` and
//! [`Feature`](crate::Feature) (through `as_slice`/`AsRef`). Reductions use
//! f64 intermediate precision.

use crate::error::{GalleryError, check_dim};

/// Euclidean (L2) norm.
pub fn norm(v: &[f32]) -> f32 {
    dot_unchecked(v, v).sqrt() as f32
}

/// Multiplies every component by `scalar`.
pub fn scalar_prod(v: &[f32], scalar: f32) -> Vec<f32> {
    v.iter().map(|x| x * scalar).collect()
}

/// Element-wise sum of two vectors.
pub fn vec_sum(a: &[f32], b: &[f32]) -> Result<Vec<f32>, GalleryError> {
    check_dim(a.len(), b.len())?;
    Ok(a.iter().zip(b).map(|(x, y)| x + y).collect())
}

/// Dot product of two vectors.
pub fn dot_prod(a: &[f32], b: &[f32]) -> Result<f32, GalleryError> {
    check_dim(a.len(), b.len())?;
    Ok(dot_unchecked(a, b) as f32)
}

/// Element-wise (Hadamard) product of two vectors.
pub fn pairwise_prod(a: &[f32], b: &[f32]) -> Result<Vec<f32>, GalleryError> {
    check_dim(a.len(), b.len())?;
    Ok(a.iter().zip(b).map(|(x, y)| x * y).collect())
}

/// Adds a constant to every component.
pub fn shift(v: &[f32], value: f32) -> Vec<f32> {
    v.iter().map(|x| x + value).collect()
}

/// Rescales `v` in place to unit length. The zero vector is left unchanged.
pub fn l2_normalize(v: &mut [f32]) {
    let norm = dot_unchecked(v, v).sqrt();
    if norm > 0.0 {
        let scale = (1.0 / norm) as f32;
        for x in v.iter_mut() {
            *x *= scale;
        }
    }
}

/// Dot product without a length check. Callers must guarantee equal lengths.
pub(crate) fn dot_unchecked(a: &[f32], b: &[f32]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(&x, &y)| (x as f64) * (y as f64))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn norm_basic() {
        assert!((norm(&[3.0, 4.0]) - 5.0).abs() < 1e-6);
        assert_eq!(norm(&[]), 0.0);
    }

    #[test]
    fn scalar_and_shift() {
        assert_eq!(scalar_prod(&[1.0, -2.0], 3.0), vec![3.0, -6.0]);
        assert_eq!(shift(&[1.0, -2.0], 0.5), vec![1.5, -1.5]);
    }

    #[test]
    fn sum_and_products() {
        assert_eq!(vec_sum(&[1.0, 2.0], &[3.0, 4.0]).unwrap(), vec![4.0, 6.0]);
        assert_eq!(dot_prod(&[1.0, 2.0], &[3.0, 4.0]).unwrap(), 11.0);
        assert_eq!(
            pairwise_prod(&[1.0, 2.0], &[3.0, 4.0]).unwrap(),
            vec![3.0, 8.0]
        );
    }

    #[test]
    fn mismatched_lengths() {
        let want = GalleryError::DimensionMismatch { got: 3, want: 2 };
        assert_eq!(vec_sum(&[1.0, 2.0], &[1.0, 2.0, 3.0]), Err(want.clone()));
        assert_eq!(dot_prod(&[1.0, 2.0], &[1.0, 2.0, 3.0]), Err(want.clone()));
        assert_eq!(pairwise_prod(&[1.0, 2.0], &[1.0, 2.0, 3.0]), Err(want));
    }

    #[test]
    fn l2_normalize_unit() {
        let mut v = [3.0, 4.0];
        l2_normalize(&mut v);
        assert!((norm(&v) - 1.0).abs() < 1e-6);
        assert!((v[0] - 0.6).abs() < 1e-6);
        assert!((v[1] - 0.8).abs() < 1e-6);
    }

    #[test]
    fn l2_normalize_zero() {
        let mut v = [0.0, 0.0, 0.0];
        l2_normalize(&mut v);
        assert_eq!(v, [0.0, 0.0, 0.0]);
    }
}
