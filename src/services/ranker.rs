use crate::{
    db::{Catalog, CatalogEntry},
    error::{AppError, AppResult},
    models::ClusterLabel,
};

/// A catalog entry with its similarity to the seed
#[derive(Debug, Clone, PartialEq)]
pub struct RankedCandidate<'a> {
    pub entry: &'a CatalogEntry,
    pub similarity: f64,
}

/// Cosine similarity, defined as 0 when either vector has zero norm
///
/// Each vector is divided by its largest magnitude first, so components
/// near `f64::MAX` neither overflow the norms nor turn the result into NaN.
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    let scale_a = max_abs(a);
    let scale_b = max_abs(b);
    if scale_a == 0.0 || scale_b == 0.0 || !scale_a.is_finite() || !scale_b.is_finite() {
        return 0.0;
    }

    let scaled = |v: &[f64], scale: f64| v.iter().map(move |x| x / scale).collect::<Vec<_>>();
    let a = scaled(a, scale_a);
    let b = scaled(b, scale_b);

    let dot: f64 = a.iter().zip(&b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f64>().sqrt();

    let similarity = dot / (norm_a * norm_b);
    if similarity.is_finite() {
        similarity.clamp(-1.0, 1.0)
    } else {
        0.0
    }
}

fn max_abs(v: &[f64]) -> f64 {
    v.iter().fold(0.0_f64, |acc, x| acc.max(x.abs()))
}

/// Rejects a zero result size before any work is done
pub fn check_top_k(top_k: usize) -> AppResult<()> {
    if top_k == 0 {
        return Err(AppError::InvalidArgument(
            "top_k must be positive".to_string(),
        ));
    }
    Ok(())
}

/// Ranks the seed's cluster-mates by cosine similarity
///
/// Only entries labelled `seed_cluster` are scored. Entries whose id equals
/// `exclude_id` are skipped. The result is sorted by descending similarity,
/// equal scores keep catalog order, and at most `top_k` entries are kept.
/// An empty cluster yields an empty result.
pub fn rank<'a>(
    seed_vector: &[f64],
    seed_cluster: ClusterLabel,
    catalog: &'a Catalog,
    top_k: usize,
    exclude_id: Option<&str>,
) -> AppResult<Vec<RankedCandidate<'a>>> {
    check_top_k(top_k)?;
    if seed_vector.len() != catalog.dimension() {
        return Err(AppError::DimensionMismatch {
            expected: catalog.dimension(),
            actual: seed_vector.len(),
        });
    }

    let mut candidates: Vec<RankedCandidate<'a>> = catalog
        .in_cluster(seed_cluster)
        .filter(|entry| exclude_id != Some(entry.metadata.id.as_str()))
        .map(|entry| RankedCandidate {
            entry,
            similarity: cosine_similarity(seed_vector, entry.vector.as_slice()),
        })
        .collect();

    // Stable sort: ties stay in catalog order
    candidates.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
    candidates.truncate(top_k);

    Ok(candidates)
}
