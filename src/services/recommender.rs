use std::sync::Arc;

use crate::{
    db::Catalog,
    error::{AppError, AppResult},
    models::{
        NormalizedFeatureVector, PreprocessedTrack, RawTrackRecord, RecommendedTrack,
        Recommendations,
    },
    services::{
        pipeline::Preprocessor,
        providers::{TrackQuery, TrackSource},
        ranker::{check_top_k, rank},
    },
};

/// Policy knobs for the recommendation façade
#[derive(Debug, Clone, Copy, Default)]
pub struct RecommenderSettings {
    /// Keep the seed's own catalog entry among the candidates
    pub include_seed_track: bool,
}

/// Recommends catalog tracks similar to a seed
///
/// Holds the fitted pipeline, an immutable catalog snapshot and, optionally,
/// a track source for query-based lookups. All operations are read-only, so
/// a single instance can serve concurrent requests.
pub struct Recommender {
    preprocessor: Preprocessor,
    catalog: Arc<Catalog>,
    source: Option<Arc<dyn TrackSource>>,
    settings: RecommenderSettings,
}

impl Recommender {
    /// Fails with `SchemaMismatch` when the catalog was not built with the
    /// preprocessor's column order
    pub fn new(
        preprocessor: Preprocessor,
        catalog: Arc<Catalog>,
        settings: RecommenderSettings,
    ) -> AppResult<Self> {
        if catalog.columns() != preprocessor.transform().output_columns() {
            return Err(AppError::SchemaMismatch(format!(
                "catalog columns {:?} differ from transform output {:?}",
                catalog.columns(),
                preprocessor.transform().output_columns()
            )));
        }

        Ok(Self {
            preprocessor,
            catalog,
            source: None,
            settings,
        })
    }

    pub fn with_source(mut self, source: Arc<dyn TrackSource>) -> Self {
        self.source = Some(source);
        self
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn preprocess(&self, raw: &RawTrackRecord) -> AppResult<PreprocessedTrack> {
        self.preprocessor.preprocess(raw)
    }

    /// Recommends for a seed whose raw attributes are already known
    pub fn recommend_record(
        &self,
        raw: &RawTrackRecord,
        top_k: usize,
    ) -> AppResult<Recommendations> {
        check_top_k(top_k)?;
        let seed = self.preprocessor.preprocess(raw)?;
        let seed_id = Some(raw.metadata.id.as_str()).filter(|id| !id.is_empty());
        self.recommend_preprocessed(&seed, seed_id, top_k)
    }

    /// Recommends for an already normalized seed vector
    pub fn recommend_vector(
        &self,
        vector: NormalizedFeatureVector,
        top_k: usize,
    ) -> AppResult<Recommendations> {
        check_top_k(top_k)?;
        let squared_norm: f64 = vector.as_slice().iter().map(|x| x * x).sum();
        if !squared_norm.is_finite() {
            return Err(AppError::InvalidArgument(
                "seed vector magnitude is out of range".to_string(),
            ));
        }
        let cluster = self.preprocessor.model().assign(&vector)?;
        self.recommend_preprocessed(&PreprocessedTrack { vector, cluster }, None, top_k)
    }

    /// Looks the seed up through the track source, then recommends for it
    pub async fn recommend_for_track(
        &self,
        query: &TrackQuery,
        top_k: usize,
    ) -> AppResult<Recommendations> {
        check_top_k(top_k)?;

        let source = self.source.as_ref().ok_or_else(|| {
            AppError::SourceUnavailable("No track source is configured".to_string())
        })?;

        let input = source.find_track(query).await.map_err(|e| {
            tracing::warn!(error = %e, query = %query, source = source.name(), "Track lookup failed");
            match e {
                AppError::SourceUnavailable(_) => e,
                other => AppError::SourceUnavailable(other.to_string()),
            }
        })?;

        let raw = RawTrackRecord::try_from(input)?;
        self.recommend_record(&raw, top_k)
    }

    fn recommend_preprocessed(
        &self,
        seed: &PreprocessedTrack,
        seed_id: Option<&str>,
        top_k: usize,
    ) -> AppResult<Recommendations> {
        let exclude_id = if self.settings.include_seed_track {
            None
        } else {
            seed_id
        };

        let ranked = rank(
            seed.vector.as_slice(),
            seed.cluster,
            &self.catalog,
            top_k,
            exclude_id,
        )?;

        tracing::info!(
            seed_id = seed_id.unwrap_or("-"),
            cluster = %seed.cluster,
            candidates = self.catalog.cluster_size(seed.cluster),
            returned = ranked.len(),
            top_k,
            "Recommendations ranked"
        );

        Ok(Recommendations {
            cluster: seed.cluster,
            tracks: ranked
                .iter()
                .map(|candidate| RecommendedTrack::from(&candidate.entry.metadata))
                .collect(),
        })
    }
}
