mod features;
mod recommendation;
mod track;

pub use features::{
    CanonicalFeatureRow, ClusterLabel, NormalizedFeatureVector, PreprocessedTrack,
    CANONICAL_COLUMNS,
};
pub use recommendation::{RecommendedTrack, Recommendations};
#[cfg(test)]
pub(crate) use track::fixtures;
pub use track::{AudioDescriptors, RawTrackInput, RawTrackRecord, TrackMetadata, Truthy, YearValue};
