use serde::{Deserialize, Serialize};

use crate::{
    error::{AppError, AppResult},
    models::{CanonicalFeatureRow, NormalizedFeatureVector},
};

/// Applies a fitted per-column transform to canonical rows
///
/// Implementations never fit; they only replay parameters recorded at
/// training time, emitting columns in the order they were fit with.
pub trait FeatureTransform: Send + Sync {
    /// Produces the normalized vector for one canonical row
    fn apply(&self, row: &CanonicalFeatureRow) -> AppResult<NormalizedFeatureVector>;

    /// Names of the emitted columns, in emission order
    fn output_columns(&self) -> &[String];

    fn dimension(&self) -> usize {
        self.output_columns().len()
    }
}

/// How one input column is turned into output columns
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum ColumnRule {
    /// Emit the value unchanged
    Passthrough,
    /// Emit `(value - mean) / scale`
    Standardize { mean: f64, scale: f64 },
    /// Emit one indicator column per fitted category
    OneHot {
        categories: Vec<f64>,
        #[serde(default)]
        ignore_unknown: bool,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ColumnSpec {
    pub name: String,
    pub rule: ColumnRule,
}

#[derive(Debug, Clone, Deserialize)]
struct ColumnTransformerSpec {
    columns: Vec<ColumnSpec>,
}

/// Fitted column transformer, as exported alongside the k-means model
#[derive(Debug, Clone)]
pub struct ColumnTransformer {
    columns: Vec<ColumnSpec>,
    output_columns: Vec<String>,
}

impl ColumnTransformer {
    /// Builds a transformer from fitted column specs, validating parameters
    pub fn new(columns: Vec<ColumnSpec>) -> AppResult<Self> {
        if columns.is_empty() {
            return Err(AppError::CorruptArtifact(
                "column transformer has no columns".to_string(),
            ));
        }

        let mut output_columns = Vec::new();
        for spec in &columns {
            match &spec.rule {
                ColumnRule::Passthrough => output_columns.push(spec.name.clone()),
                ColumnRule::Standardize { mean, scale } => {
                    if !mean.is_finite() || !scale.is_finite() || *scale == 0.0 {
                        return Err(AppError::CorruptArtifact(format!(
                            "column `{}` has invalid scaling parameters (mean {}, scale {})",
                            spec.name, mean, scale
                        )));
                    }
                    output_columns.push(spec.name.clone());
                }
                ColumnRule::OneHot { categories, .. } => {
                    if categories.is_empty() {
                        return Err(AppError::CorruptArtifact(format!(
                            "column `{}` has no one-hot categories",
                            spec.name
                        )));
                    }
                    output_columns.extend(
                        categories
                            .iter()
                            .map(|category| format!("{}_{}", spec.name, category)),
                    );
                }
            }
        }

        Ok(Self {
            columns,
            output_columns,
        })
    }

    /// Parses the `column_transformer` component of a model bundle
    pub fn from_value(value: serde_json::Value) -> AppResult<Self> {
        let spec: ColumnTransformerSpec = serde_json::from_value(value).map_err(|e| {
            AppError::CorruptArtifact(format!("unreadable column transformer: {}", e))
        })?;
        Self::new(spec.columns)
    }

    pub fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }
}

impl FeatureTransform for ColumnTransformer {
    fn apply(&self, row: &CanonicalFeatureRow) -> AppResult<NormalizedFeatureVector> {
        let mut values = Vec::with_capacity(self.output_columns.len());

        for spec in &self.columns {
            let value = row.value(&spec.name).ok_or_else(|| {
                AppError::SchemaMismatch(format!(
                    "transform expects column `{}` which canonical rows do not carry",
                    spec.name
                ))
            })?;

            match &spec.rule {
                ColumnRule::Passthrough => values.push(value),
                ColumnRule::Standardize { mean, scale } => values.push((value - mean) / scale),
                ColumnRule::OneHot {
                    categories,
                    ignore_unknown,
                } => {
                    let hit = categories.iter().position(|c| *c == value);
                    if hit.is_none() && !ignore_unknown {
                        return Err(AppError::SchemaMismatch(format!(
                            "value {} of column `{}` is not among the fitted categories",
                            value, spec.name
                        )));
                    }
                    values.extend(
                        (0..categories.len()).map(|i| if Some(i) == hit { 1.0 } else { 0.0 }),
                    );
                }
            }
        }

        Ok(NormalizedFeatureVector::new(values))
    }

    fn output_columns(&self) -> &[String] {
        &self.output_columns
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::standard_transformer;
    use super::*;
    use crate::models::fixtures::raw_record;
    use crate::services::encoder::encode;

    fn spec(name: &str, rule: ColumnRule) -> ColumnSpec {
        ColumnSpec {
            name: name.to_string(),
            rule,
        }
    }

    #[test]
    fn test_standardizes_and_passes_through() {
        let transformer = standard_transformer();
        let row = encode(&raw_record("t"));
        let vector = transformer.apply(&row).unwrap();

        assert_eq!(vector.len(), 16);
        // tempo 120 with mean 120
        assert_eq!(vector.as_slice()[8], 0.0);
        // danceability 0.6 with mean 0.5, scale 0.25
        assert!((vector.as_slice()[0] - 0.4).abs() < 1e-12);
        // mode passes through
        assert_eq!(vector.as_slice()[12], 1.0);
    }

    #[test]
    fn test_emits_in_fitted_order() {
        let transformer = ColumnTransformer::new(vec![
            spec("mode", ColumnRule::Passthrough),
            spec("tempo", ColumnRule::Passthrough),
            spec("danceability", ColumnRule::Passthrough),
        ])
        .unwrap();
        let row = encode(&raw_record("t"));
        let vector = transformer.apply(&row).unwrap();

        assert_eq!(vector.as_slice(), &[1.0, 120.0, 0.6]);
        assert_eq!(
            transformer.output_columns(),
            &["mode".to_string(), "tempo".to_string(), "danceability".to_string()]
        );
    }

    #[test]
    fn test_unknown_column_is_schema_mismatch() {
        let transformer =
            ColumnTransformer::new(vec![spec("popularity", ColumnRule::Passthrough)]).unwrap();
        let row = encode(&raw_record("t"));
        assert!(matches!(
            transformer.apply(&row),
            Err(AppError::SchemaMismatch(_))
        ));
    }

    #[test]
    fn test_one_hot_expansion() {
        let transformer = ColumnTransformer::new(vec![spec(
            "mode",
            ColumnRule::OneHot {
                categories: vec![0.0, 1.0],
                ignore_unknown: false,
            },
        )])
        .unwrap();
        assert_eq!(transformer.output_columns(), &["mode_0", "mode_1"]);

        let row = encode(&raw_record("t"));
        assert_eq!(transformer.apply(&row).unwrap().as_slice(), &[0.0, 1.0]);
    }

    #[test]
    fn test_one_hot_unknown_category() {
        let strict = ColumnTransformer::new(vec![spec(
            "mode",
            ColumnRule::OneHot {
                categories: vec![0.0],
                ignore_unknown: false,
            },
        )])
        .unwrap();
        let lenient = ColumnTransformer::new(vec![spec(
            "mode",
            ColumnRule::OneHot {
                categories: vec![0.0],
                ignore_unknown: true,
            },
        )])
        .unwrap();
        let row = encode(&raw_record("t"));

        assert!(matches!(strict.apply(&row), Err(AppError::SchemaMismatch(_))));
        assert_eq!(lenient.apply(&row).unwrap().as_slice(), &[0.0]);
    }

    #[test]
    fn test_zero_scale_is_corrupt() {
        let result = ColumnTransformer::new(vec![spec(
            "tempo",
            ColumnRule::Standardize {
                mean: 1.0,
                scale: 0.0,
            },
        )]);
        assert!(matches!(result, Err(AppError::CorruptArtifact(_))));
    }

    #[test]
    fn test_from_value() {
        let value = serde_json::json!({
            "columns": [
                {"name": "tempo", "rule": {"standardize": {"mean": 100.0, "scale": 20.0}}},
                {"name": "explicit", "rule": "passthrough"},
                {"name": "mode", "rule": {"one_hot": {"categories": [0.0, 1.0]}}}
            ]
        });
        let transformer = ColumnTransformer::from_value(value).unwrap();
        assert_eq!(transformer.dimension(), 4);
        assert_eq!(
            transformer.columns()[0].rule,
            ColumnRule::Standardize {
                mean: 100.0,
                scale: 20.0
            }
        );
    }
}
