use std::path::Path;

use crate::{
    error::{AppError, AppResult},
    services::{
        cluster::{ClusterModel, KMeansModel},
        normalizer::{ColumnTransformer, FeatureTransform},
    },
};

/// Bundle member holding the fitted column transformer
pub const TRANSFORM_COMPONENT: &str = "column_transformer";

/// Bundle member holding the fitted k-means model
pub const MODEL_COMPONENT: &str = "k_means";

/// The two fitted components the serving core needs
#[derive(Debug, Clone)]
pub struct ModelBundle {
    pub transform: ColumnTransformer,
    pub model: KMeansModel,
}

impl ModelBundle {
    /// Reads a bundle from a JSON file, failing fast on anything suspicious
    pub fn load(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::CorruptArtifact(format!(
                "cannot read model bundle {}: {}",
                path.display(),
                e
            ))
        })?;

        let bundle = Self::from_json(&contents)?;

        tracing::info!(
            path = %path.display(),
            dimension = bundle.transform.dimension(),
            clusters = bundle.model.cluster_count(),
            "Loaded model bundle"
        );

        Ok(bundle)
    }

    pub fn from_json(contents: &str) -> AppResult<Self> {
        let value: serde_json::Value = serde_json::from_str(contents)
            .map_err(|e| AppError::CorruptArtifact(format!("model bundle is not JSON: {}", e)))?;
        Self::from_value(value)
    }

    pub fn from_value(value: serde_json::Value) -> AppResult<Self> {
        let serde_json::Value::Object(mut components) = value else {
            return Err(AppError::CorruptArtifact(
                "model bundle must be a JSON object".to_string(),
            ));
        };

        let transform = components
            .remove(TRANSFORM_COMPONENT)
            .ok_or_else(|| missing_component(TRANSFORM_COMPONENT))?;
        let model = components
            .remove(MODEL_COMPONENT)
            .ok_or_else(|| missing_component(MODEL_COMPONENT))?;

        let transform = ColumnTransformer::from_value(transform)?;
        let model = KMeansModel::from_value(model)?;
        check_compatible(&transform, &model)?;

        Ok(Self { transform, model })
    }
}

fn missing_component(name: &str) -> AppError {
    AppError::CorruptArtifact(format!("model bundle has no `{}` component", name))
}

/// Verifies the transform emits exactly what the cluster model was fitted on
pub fn check_compatible(
    transform: &dyn FeatureTransform,
    model: &dyn ClusterModel,
) -> AppResult<()> {
    if transform.dimension() != model.dimension() {
        return Err(AppError::CorruptArtifact(format!(
            "transform emits {} columns but the cluster model was fitted on {}",
            transform.dimension(),
            model.dimension()
        )));
    }

    if let Some(names) = model.feature_names() {
        if names != transform.output_columns() {
            return Err(AppError::CorruptArtifact(format!(
                "cluster model column order {:?} differs from transform output {:?}",
                names,
                transform.output_columns()
            )));
        }
    }

    Ok(())
}
