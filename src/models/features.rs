use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Column names of a [`CanonicalFeatureRow`], in their fixed order
pub const CANONICAL_COLUMNS: [&str; 16] = [
    "danceability",
    "energy",
    "loudness",
    "speechiness",
    "acousticness",
    "instrumentalness",
    "liveness",
    "valence",
    "tempo",
    "duration_ms",
    "year",
    "explicit",
    "mode",
    "key_sine",
    "key_cosine",
    "time_signature",
];

/// A track's features after derived-column expansion, before scaling
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct CanonicalFeatureRow {
    pub danceability: f64,
    pub energy: f64,
    pub loudness: f64,
    pub speechiness: f64,
    pub acousticness: f64,
    pub instrumentalness: f64,
    pub liveness: f64,
    pub valence: f64,
    pub tempo: f64,
    pub duration_ms: f64,
    pub year: f64,
    /// 1.0 when explicit
    pub explicit: f64,
    pub mode: f64,
    pub key_sine: f64,
    pub key_cosine: f64,
    /// 1.0 when the time signature is anything but 4
    pub time_signature: f64,
}

impl CanonicalFeatureRow {
    /// Looks a column up by name
    pub fn value(&self, column: &str) -> Option<f64> {
        let value = match column {
            "danceability" => self.danceability,
            "energy" => self.energy,
            "loudness" => self.loudness,
            "speechiness" => self.speechiness,
            "acousticness" => self.acousticness,
            "instrumentalness" => self.instrumentalness,
            "liveness" => self.liveness,
            "valence" => self.valence,
            "tempo" => self.tempo,
            "duration_ms" => self.duration_ms,
            "year" => self.year,
            "explicit" => self.explicit,
            "mode" => self.mode,
            "key_sine" => self.key_sine,
            "key_cosine" => self.key_cosine,
            "time_signature" => self.time_signature,
            _ => return None,
        };
        Some(value)
    }

    /// Values in [`CANONICAL_COLUMNS`] order
    pub fn values(&self) -> [f64; 16] {
        [
            self.danceability,
            self.energy,
            self.loudness,
            self.speechiness,
            self.acousticness,
            self.instrumentalness,
            self.liveness,
            self.valence,
            self.tempo,
            self.duration_ms,
            self.year,
            self.explicit,
            self.mode,
            self.key_sine,
            self.key_cosine,
            self.time_signature,
        ]
    }
}

/// Fixed-length numeric vector in the column order the transform was fit with
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct NormalizedFeatureVector(Vec<f64>);

impl NormalizedFeatureVector {
    pub fn new(values: Vec<f64>) -> Self {
        Self(values)
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> Vec<f64> {
        self.0
    }
}

/// Index of a fitted cluster, always below the model's cluster count
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClusterLabel(pub usize);

impl Display for ClusterLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Output of the preprocessing pipeline for one track
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PreprocessedTrack {
    pub vector: NormalizedFeatureVector,
    pub cluster: ClusterLabel,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row() -> CanonicalFeatureRow {
        CanonicalFeatureRow {
            danceability: 1.0,
            energy: 2.0,
            loudness: 3.0,
            speechiness: 4.0,
            acousticness: 5.0,
            instrumentalness: 6.0,
            liveness: 7.0,
            valence: 8.0,
            tempo: 9.0,
            duration_ms: 10.0,
            year: 11.0,
            explicit: 12.0,
            mode: 13.0,
            key_sine: 14.0,
            key_cosine: 15.0,
            time_signature: 16.0,
        }
    }

    #[test]
    fn test_values_follow_canonical_columns() {
        let row = row();
        for (column, value) in CANONICAL_COLUMNS.iter().zip(row.values()) {
            assert_eq!(row.value(column), Some(value), "column {}", column);
        }
    }

    #[test]
    fn test_unknown_column_is_none() {
        assert_eq!(row().value("popularity"), None);
    }

    #[test]
    fn test_cluster_label_serializes_as_integer() {
        assert_eq!(serde_json::to_string(&ClusterLabel(7)).unwrap(), "7");
    }
}
