use crate::common::{FacegateError, Result};
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

/// RBF-kernel one-vs-rest regularized least-squares classifier with
/// probability output. For each class c the dual weights solve
/// (K + I/C) alpha_c = y_c over the training kernel matrix; per-class
/// decision values are mapped to probabilities with a softmax.
#[derive(Debug, Serialize, Deserialize)]
pub struct KernelSvc {
    classes: Vec<String>,
    /// Training inputs in transform space, one row per sample.
    support: Vec<Vec<f32>>,
    /// One dual weight vector per class, each of length support.len().
    alphas: Vec<Vec<f32>>,
    gamma: f32,
    c: f32,
}

fn rbf(a: &[f32], b: &[f32], gamma: f32) -> f64 {
    let dist_sq: f64 = a
        .iter()
        .zip(b)
        .map(|(&x, &y)| {
            let d = (x - y) as f64;
            d * d
        })
        .sum();
    (-(gamma as f64) * dist_sq).exp()
}

impl KernelSvc {
    pub fn fit(x: &[Vec<f32>], labels: &[String], c: f32, gamma: f32) -> Result<Self> {
        if x.is_empty() || x.len() != labels.len() {
            return Err(FacegateError::Model(format!(
                "Classifier input mismatch: {} samples, {} labels",
                x.len(),
                labels.len()
            )));
        }
        if c <= 0.0 {
            return Err(FacegateError::Model(format!("C must be positive, got {}", c)));
        }

        let mut classes: Vec<String> = labels.to_vec();
        classes.sort();
        classes.dedup();

        let n = x.len();
        let mut kernel = DMatrix::<f64>::from_fn(n, n, |i, j| rbf(&x[i], &x[j], gamma));
        let ridge = 1.0 / c as f64;
        for i in 0..n {
            kernel[(i, i)] += ridge;
        }

        let chol = kernel
            .cholesky()
            .ok_or_else(|| FacegateError::Model("Kernel matrix is not positive definite".into()))?;

        let mut alphas = Vec::with_capacity(classes.len());
        for class in &classes {
            let y = DVector::<f64>::from_fn(n, |i, _| if labels[i] == *class { 1.0 } else { -1.0 });
            let alpha = chol.solve(&y);
            alphas.push(alpha.iter().map(|&a| a as f32).collect());
        }

        Ok(Self {
            classes,
            support: x.to_vec(),
            alphas,
            gamma,
            c,
        })
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn c(&self) -> f32 {
        self.c
    }

    /// Per-class probabilities, ordered like `classes()`.
    pub fn predict_proba(&self, x: &[f32]) -> Vec<f32> {
        let k: Vec<f64> = self.support.iter().map(|s| rbf(s, x, self.gamma)).collect();

        let decisions: Vec<f64> = self
            .alphas
            .iter()
            .map(|alpha| alpha.iter().zip(&k).map(|(&a, &kv)| a as f64 * kv).sum())
            .collect();

        let max = decisions.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let exps: Vec<f64> = decisions.iter().map(|&d| (d - max).exp()).collect();
        let total: f64 = exps.iter().sum();
        exps.iter().map(|&e| (e / total) as f32).collect()
    }

    /// Arg-max class and its probability.
    pub fn predict(&self, x: &[f32]) -> (String, f32) {
        let probs = self.predict_proba(x);
        let (best, &proba) = probs
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(i, p)| (i, p))
            .unwrap_or((0, &0.0));
        (self.classes[best].clone(), proba)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cluster(center: f32, count: usize) -> Vec<Vec<f32>> {
        (0..count)
            .map(|i| vec![center + i as f32 * 0.1, center - i as f32 * 0.1])
            .collect()
    }

    fn two_cluster_data() -> (Vec<Vec<f32>>, Vec<String>) {
        let mut x = cluster(0.0, 5);
        x.extend(cluster(10.0, 5));
        let mut labels = vec!["alice_a".to_string(); 5];
        labels.extend(vec!["bob_b".to_string(); 5]);
        (x, labels)
    }

    #[test]
    fn separates_distant_clusters() {
        let (x, labels) = two_cluster_data();
        let svc = KernelSvc::fit(&x, &labels, 5.0, 0.5).unwrap();

        for (sample, label) in x.iter().zip(&labels) {
            let (pred, proba) = svc.predict(sample);
            assert_eq!(&pred, label);
            assert!(proba > 0.7, "confidence {} too low", proba);
        }
    }

    #[test]
    fn probabilities_sum_to_one() {
        let (x, labels) = two_cluster_data();
        let svc = KernelSvc::fit(&x, &labels, 3.0, 0.5).unwrap();
        let probs = svc.predict_proba(&[5.0, 5.0]);
        let total: f32 = probs.iter().sum();
        assert!((total - 1.0).abs() < 1e-5);
        assert_eq!(probs.len(), svc.classes().len());
    }

    #[test]
    fn classes_are_sorted_and_deduplicated() {
        let (x, labels) = two_cluster_data();
        let svc = KernelSvc::fit(&x, &labels, 1.0, 0.5).unwrap();
        assert_eq!(svc.classes(), &["alice_a".to_string(), "bob_b".to_string()]);
    }

    #[test]
    fn rejects_mismatched_lengths() {
        assert!(KernelSvc::fit(&[vec![0.0]], &[], 1.0, 0.5).is_err());
    }
}
