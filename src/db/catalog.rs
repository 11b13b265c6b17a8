use std::collections::HashMap;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use serde_json::{Map, Value};

use crate::{
    error::{AppError, AppResult},
    models::{ClusterLabel, NormalizedFeatureVector, RawTrackRecord, TrackMetadata},
    services::pipeline::Preprocessor,
};

/// One preprocessed track known to the system
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogEntry {
    pub metadata: TrackMetadata,
    pub vector: NormalizedFeatureVector,
    pub cluster: ClusterLabel,
}

/// Read-only snapshot of every known track
///
/// Built once at startup and shared behind an `Arc`; nothing mutates it.
/// Entries keep their file order, which is also the tie-break order when
/// ranking.
#[derive(Debug, Clone)]
pub struct Catalog {
    entries: Vec<CatalogEntry>,
    columns: Vec<String>,
    by_cluster: HashMap<ClusterLabel, Vec<usize>>,
}

impl Catalog {
    /// Creates a catalog from entries whose vectors follow `columns`
    pub fn new(entries: Vec<CatalogEntry>, columns: Vec<String>) -> AppResult<Self> {
        let mut by_cluster: HashMap<ClusterLabel, Vec<usize>> = HashMap::new();

        for (index, entry) in entries.iter().enumerate() {
            if entry.vector.len() != columns.len() {
                return Err(AppError::DimensionMismatch {
                    expected: columns.len(),
                    actual: entry.vector.len(),
                });
            }
            by_cluster.entry(entry.cluster).or_default().push(index);
        }

        Ok(Self {
            entries,
            columns,
            by_cluster,
        })
    }

    /// Loads a JSON Lines catalog, reading feature columns in the order the
    /// preprocessor's transform emits them
    pub fn load(path: impl AsRef<Path>, preprocessor: &Preprocessor) -> AppResult<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|e| {
            AppError::CorruptArtifact(format!("cannot open catalog {}: {}", path.display(), e))
        })?;

        let catalog = Self::from_reader(BufReader::new(file), preprocessor)?;

        tracing::info!(
            path = %path.display(),
            tracks = catalog.len(),
            clusters = catalog.by_cluster.len(),
            "Loaded catalog"
        );

        Ok(catalog)
    }

    pub fn from_reader<R: BufRead>(reader: R, preprocessor: &Preprocessor) -> AppResult<Self> {
        let columns = preprocessor.transform().output_columns().to_vec();
        let cluster_count = preprocessor.model().cluster_count();
        let mut entries = Vec::new();

        for (index, line) in reader.lines().enumerate() {
            let line_number = index + 1;
            let line = line.map_err(|e| {
                AppError::CorruptArtifact(format!("catalog line {}: {}", line_number, e))
            })?;
            if line.trim().is_empty() {
                continue;
            }

            let entry = parse_row(&line, &columns, cluster_count).map_err(|e| match e {
                AppError::SchemaMismatch(msg) => {
                    AppError::SchemaMismatch(format!("catalog line {}: {}", line_number, msg))
                }
                AppError::CorruptArtifact(msg) => {
                    AppError::CorruptArtifact(format!("catalog line {}: {}", line_number, msg))
                }
                other => other,
            })?;
            entries.push(entry);
        }

        Self::new(entries, columns)
    }

    /// Preprocesses raw records into a catalog, the way the offline batch does
    pub fn build(
        records: impl IntoIterator<Item = RawTrackRecord>,
        preprocessor: &Preprocessor,
    ) -> AppResult<Self> {
        let entries = records
            .into_iter()
            .map(|record| -> AppResult<CatalogEntry> {
                let preprocessed = preprocessor.preprocess(&record)?;
                Ok(CatalogEntry {
                    metadata: record.metadata,
                    vector: preprocessed.vector,
                    cluster: preprocessed.cluster,
                })
            })
            .collect::<AppResult<Vec<_>>>()?;

        Self::new(entries, preprocessor.transform().output_columns().to_vec())
    }

    /// Writes the catalog as JSON Lines, readable again by [`Catalog::load`]
    pub fn write_jsonl<W: Write>(&self, mut writer: W) -> AppResult<()> {
        for entry in &self.entries {
            let mut row = match serde_json::to_value(&entry.metadata) {
                Ok(Value::Object(map)) => map,
                Ok(_) => Map::new(),
                Err(e) => return Err(AppError::Internal(e.to_string())),
            };
            for (column, value) in self.columns.iter().zip(entry.vector.as_slice()) {
                row.insert(column.clone(), Value::from(*value));
            }
            row.insert("cluster".to_string(), Value::from(entry.cluster.0));

            writeln!(writer, "{}", Value::Object(row))
                .map_err(|e| AppError::Internal(format!("catalog write failed: {}", e)))?;
        }
        Ok(())
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    /// Entries assigned to `cluster`, in catalog order
    pub fn in_cluster(&self, cluster: ClusterLabel) -> impl Iterator<Item = &CatalogEntry> {
        self.by_cluster
            .get(&cluster)
            .map(|indices| indices.as_slice())
            .unwrap_or_default()
            .iter()
            .map(|&index| &self.entries[index])
    }

    /// Number of entries assigned to `cluster`
    pub fn cluster_size(&self, cluster: ClusterLabel) -> usize {
        self.by_cluster.get(&cluster).map_or(0, Vec::len)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn dimension(&self) -> usize {
        self.columns.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn parse_row(line: &str, columns: &[String], cluster_count: usize) -> AppResult<CatalogEntry> {
    let row: Map<String, Value> = serde_json::from_str(line)
        .map_err(|e| AppError::CorruptArtifact(format!("not a JSON object: {}", e)))?;

    let metadata: TrackMetadata = serde_json::from_value(Value::Object(row.clone()))
        .map_err(|e| AppError::CorruptArtifact(format!("bad track metadata: {}", e)))?;
    if metadata.id.is_empty() {
        return Err(AppError::CorruptArtifact("track id is empty".to_string()));
    }

    let values = columns
        .iter()
        .map(|column| match row.get(column) {
            Some(value) => value.as_f64().ok_or_else(|| {
                AppError::CorruptArtifact(format!("column `{}` is not numeric", column))
            }),
            None => Err(AppError::SchemaMismatch(format!(
                "track {} has no `{}` column",
                metadata.id, column
            ))),
        })
        .collect::<AppResult<Vec<_>>>()?;

    let cluster = row
        .get("cluster")
        .and_then(Value::as_u64)
        .and_then(|c| usize::try_from(c).ok())
        .filter(|c| *c < cluster_count)
        .ok_or_else(|| {
            AppError::CorruptArtifact(format!(
                "track {} has no cluster label in 0..{}",
                metadata.id, cluster_count
            ))
        })?;

    Ok(CatalogEntry {
        metadata,
        vector: NormalizedFeatureVector::new(values),
        cluster: ClusterLabel(cluster),
    })
}
