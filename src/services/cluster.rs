use serde::Deserialize;

use crate::{
    error::{AppError, AppResult},
    models::{ClusterLabel, NormalizedFeatureVector},
};

/// Assigns normalized vectors to one of a fixed set of fitted clusters
pub trait ClusterModel: Send + Sync {
    fn assign(&self, vector: &NormalizedFeatureVector) -> AppResult<ClusterLabel>;

    /// Number of clusters `K`; every label is below it
    fn cluster_count(&self) -> usize;

    /// Dimensionality the model was fitted on
    fn dimension(&self) -> usize;

    /// Column names the model was fitted on, when the artifact records them
    fn feature_names(&self) -> Option<&[String]> {
        None
    }
}

#[derive(Debug, Clone, Deserialize)]
struct KMeansSpec {
    centroids: Vec<Vec<f64>>,
    #[serde(default)]
    feature_names: Option<Vec<String>>,
}

/// Fitted k-means partition: nearest centroid under Euclidean distance
#[derive(Debug, Clone)]
pub struct KMeansModel {
    centroids: Vec<Vec<f64>>,
    feature_names: Option<Vec<String>>,
}

impl KMeansModel {
    pub fn new(centroids: Vec<Vec<f64>>, feature_names: Option<Vec<String>>) -> AppResult<Self> {
        let dimension = match centroids.first() {
            Some(first) if !first.is_empty() => first.len(),
            _ => {
                return Err(AppError::CorruptArtifact(
                    "k-means model has no centroids".to_string(),
                ))
            }
        };

        for (label, centroid) in centroids.iter().enumerate() {
            if centroid.len() != dimension {
                return Err(AppError::CorruptArtifact(format!(
                    "centroid {} has {} dimensions, centroid 0 has {}",
                    label,
                    centroid.len(),
                    dimension
                )));
            }
            if centroid.iter().any(|v| !v.is_finite()) {
                return Err(AppError::CorruptArtifact(format!(
                    "centroid {} contains a non-finite coordinate",
                    label
                )));
            }
        }

        if let Some(names) = &feature_names {
            if names.len() != dimension {
                return Err(AppError::CorruptArtifact(format!(
                    "k-means records {} feature names for {} dimensions",
                    names.len(),
                    dimension
                )));
            }
        }

        Ok(Self {
            centroids,
            feature_names,
        })
    }

    /// Parses the `k_means` component of a model bundle
    pub fn from_value(value: serde_json::Value) -> AppResult<Self> {
        let spec: KMeansSpec = serde_json::from_value(value)
            .map_err(|e| AppError::CorruptArtifact(format!("unreadable k-means model: {}", e)))?;
        Self::new(spec.centroids, spec.feature_names)
    }

    pub fn centroids(&self) -> &[Vec<f64>] {
        &self.centroids
    }
}

const OVERFLOW_GUARD: f64 = 1e100;

fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

impl ClusterModel for KMeansModel {
    fn assign(&self, vector: &NormalizedFeatureVector) -> AppResult<ClusterLabel> {
        let dimension = self.dimension();
        if vector.len() != dimension {
            return Err(AppError::DimensionMismatch {
                expected: dimension,
                actual: vector.len(),
            });
        }

        if vector.as_slice().iter().any(|v| !v.is_finite()) {
            return Err(AppError::InvalidArgument(
                "feature vector contains a non-finite value".to_string(),
            ));
        }

        // Squared distances overflow past ~1e154; one shared scale for every
        // centroid keeps their order
        let largest = self
            .centroids
            .iter()
            .flatten()
            .chain(vector.as_slice())
            .fold(0.0_f64, |acc, x| acc.max(x.abs()));
        let scale = if largest > OVERFLOW_GUARD { largest } else { 1.0 };
        let point: Vec<f64> = vector.as_slice().iter().map(|x| x / scale).collect();

        // Strict comparison keeps the lowest label on ties
        let mut best = 0;
        let mut best_distance = f64::INFINITY;
        for (label, centroid) in self.centroids.iter().enumerate() {
            let centroid: Vec<f64> = centroid.iter().map(|x| x / scale).collect();
            let distance = squared_distance(&point, &centroid);
            if distance < best_distance {
                best = label;
                best_distance = distance;
            }
        }

        Ok(ClusterLabel(best))
    }

    fn cluster_count(&self) -> usize {
        self.centroids.len()
    }

    fn dimension(&self) -> usize {
        self.centroids[0].len()
    }

    fn feature_names(&self) -> Option<&[String]> {
        self.feature_names.as_deref()
    }
}
