use std::sync::Arc;

use crate::{
    error::AppResult,
    models::{PreprocessedTrack, RawTrackInput, RawTrackRecord},
    services::{
        artifacts::{check_compatible, ModelBundle},
        cluster::ClusterModel,
        encoder::encode,
        normalizer::FeatureTransform,
    },
};

/// Encode, normalize and cluster a track
///
/// This is the only path from raw attributes to a `(vector, cluster)` pair.
/// Catalog construction and seed processing both go through it, otherwise
/// seeds and catalog entries stop being comparable.
#[derive(Clone)]
pub struct Preprocessor {
    transform: Arc<dyn FeatureTransform>,
    model: Arc<dyn ClusterModel>,
}

impl Preprocessor {
    pub fn new(
        transform: Arc<dyn FeatureTransform>,
        model: Arc<dyn ClusterModel>,
    ) -> AppResult<Self> {
        check_compatible(transform.as_ref(), model.as_ref())?;
        Ok(Self { transform, model })
    }

    pub fn from_bundle(bundle: ModelBundle) -> AppResult<Self> {
        Self::new(Arc::new(bundle.transform), Arc::new(bundle.model))
    }

    pub fn preprocess(&self, raw: &RawTrackRecord) -> AppResult<PreprocessedTrack> {
        let row = encode(raw);
        let vector = self.transform.apply(&row)?;
        let cluster = self.model.assign(&vector)?;
        Ok(PreprocessedTrack { vector, cluster })
    }

    /// Validates a collaborator record at the boundary, then preprocesses it
    pub fn preprocess_input(&self, input: RawTrackInput) -> AppResult<PreprocessedTrack> {
        let record = RawTrackRecord::try_from(input)?;
        self.preprocess(&record)
    }

    pub fn transform(&self) -> &dyn FeatureTransform {
        self.transform.as_ref()
    }

    pub fn model(&self) -> &dyn ClusterModel {
        self.model.as_ref()
    }
}
