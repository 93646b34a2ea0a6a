use crate::common::{FacegateError, Result};
use crate::core::features::FeatureVector;
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

/// Whitened principal-component transform fit over the full feature set.
/// Immutable once fit; always persisted and loaded together with the
/// classifier trained on its output space.
#[derive(Debug, Serialize, Deserialize)]
pub struct Pca {
    mean: Vec<f32>,
    /// Row-major principal axes, one row per retained component.
    components: Vec<Vec<f32>>,
    /// Per-component 1/sqrt(explained variance); zero for collapsed axes.
    whiten_scale: Vec<f32>,
}

impl Pca {
    /// Fit on `features`, keeping at most `n_components` axes (further capped
    /// by sample count and feature length).
    pub fn fit(features: &[FeatureVector], n_components: usize) -> Result<Self> {
        let n = features.len();
        if n < 2 {
            return Err(FacegateError::Model(format!(
                "PCA needs at least 2 samples, got {}",
                n
            )));
        }
        let d = features[0].len();
        let k = n_components.min(n - 1).min(d);
        if k == 0 {
            return Err(FacegateError::Model("PCA cannot keep 0 components".into()));
        }

        let mut mean = vec![0.0f64; d];
        for row in features {
            for (m, &v) in mean.iter_mut().zip(row.iter()) {
                *m += v as f64;
            }
        }
        for m in &mut mean {
            *m /= n as f64;
        }

        let centered = DMatrix::<f64>::from_fn(n, d, |i, j| features[i][j] as f64 - mean[j]);
        let svd = centered.svd(false, true);
        let v_t = svd
            .v_t
            .ok_or_else(|| FacegateError::Model("SVD did not produce right singular vectors".into()))?;

        let mut components = Vec::with_capacity(k);
        let mut whiten_scale = Vec::with_capacity(k);
        for i in 0..k {
            let axis: Vec<f32> = v_t.row(i).iter().map(|&v| v as f32).collect();
            let sigma = svd.singular_values[i];
            let explained = sigma * sigma / (n as f64 - 1.0);
            // A collapsed axis carries no signal; project it to zero instead
            // of amplifying numerical noise.
            let scale = if explained > 1e-9 {
                (1.0 / explained.sqrt()) as f32
            } else {
                0.0
            };
            components.push(axis);
            whiten_scale.push(scale);
        }

        Ok(Self {
            mean: mean.into_iter().map(|m| m as f32).collect(),
            components,
            whiten_scale,
        })
    }

    pub fn n_components(&self) -> usize {
        self.components.len()
    }

    pub fn feature_len(&self) -> usize {
        self.mean.len()
    }

    pub fn project(&self, x: &[f32]) -> Vec<f32> {
        self.components
            .iter()
            .zip(&self.whiten_scale)
            .map(|(axis, &scale)| {
                let dot: f32 = axis
                    .iter()
                    .zip(x.iter().zip(&self.mean))
                    .map(|(&a, (&v, &m))| a * (v - m))
                    .sum();
                dot * scale
            })
            .collect()
    }

    pub fn project_all(&self, xs: &[FeatureVector]) -> Vec<Vec<f32>> {
        xs.iter().map(|x| self.project(x)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_data() -> Vec<FeatureVector> {
        // Deterministic full-rank-ish cloud in 4 dimensions.
        (0..12)
            .map(|i| {
                let t = i as f32;
                vec![
                    t * 2.0 + (t * 7.0).sin(),
                    t - (t * 3.0).cos() * 4.0,
                    (t * t * 0.3) % 5.0,
                    (t * 11.0).sin() * 3.0,
                ]
            })
            .collect()
    }

    #[test]
    fn component_count_is_capped_by_samples() {
        let data = sample_data();
        let pca = Pca::fit(&data, 150).unwrap();
        assert_eq!(pca.n_components(), data.len() - 1);
    }

    #[test]
    fn whitened_projection_has_unit_variance() {
        let data = sample_data();
        let pca = Pca::fit(&data, 3).unwrap();
        let projected = pca.project_all(&data);

        for c in 0..pca.n_components() {
            let mean: f32 = projected.iter().map(|p| p[c]).sum::<f32>() / data.len() as f32;
            let var: f32 = projected
                .iter()
                .map(|p| (p[c] - mean) * (p[c] - mean))
                .sum::<f32>()
                / (data.len() as f32 - 1.0);
            assert!((var - 1.0).abs() < 1e-2, "component {} variance {}", c, var);
        }
    }

    #[test]
    fn projection_of_mean_is_origin() {
        let data = sample_data();
        let pca = Pca::fit(&data, 2).unwrap();
        let d = data[0].len();
        let mean: Vec<f32> = (0..d)
            .map(|j| data.iter().map(|r| r[j]).sum::<f32>() / data.len() as f32)
            .collect();
        for v in pca.project(&mean) {
            assert!(v.abs() < 1e-4);
        }
    }

    #[test]
    fn rejects_single_sample() {
        assert!(Pca::fit(&[vec![1.0, 2.0]], 1).is_err());
    }
}
