use serde::{Deserialize, Serialize};

use super::{ClusterLabel, TrackMetadata};

/// Display fields of one recommended track
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecommendedTrack {
    pub name: String,
    pub album: String,
    pub artists: Vec<String>,
    pub track_number: u32,
}

impl From<&TrackMetadata> for RecommendedTrack {
    fn from(metadata: &TrackMetadata) -> Self {
        Self {
            name: metadata.name.clone(),
            album: metadata.album.clone(),
            artists: metadata.artists.clone(),
            track_number: metadata.track_number,
        }
    }
}

/// Ranked recommendations for one seed, most similar first
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Recommendations {
    /// Cluster the seed was assigned to
    pub cluster: ClusterLabel,
    pub tracks: Vec<RecommendedTrack>,
}
