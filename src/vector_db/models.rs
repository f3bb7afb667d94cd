//! Data models for vector collections, indexes and search

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Auto-assigned primary key of a stored vector
pub type VectorId = u64;

/// Similarity function used for ranking
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum MetricType {
    /// Inner product, higher is more similar
    #[default]
    #[serde(rename = "IP")]
    Ip,
    /// Squared Euclidean distance, lower is more similar
    #[serde(rename = "L2")]
    L2,
    /// Cosine similarity, higher is more similar
    #[serde(rename = "COSINE")]
    Cosine,
}

impl MetricType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricType::Ip => "IP",
            MetricType::L2 => "L2",
            MetricType::Cosine => "COSINE",
        }
    }

    pub fn higher_is_better(&self) -> bool {
        !matches!(self, MetricType::L2)
    }

    /// Order two scores best-first under this metric
    pub fn compare(&self, a: f32, b: f32) -> Ordering {
        let ord = a.partial_cmp(&b).unwrap_or(Ordering::Equal);
        if self.higher_is_better() {
            ord.reverse()
        } else {
            ord
        }
    }
}

impl fmt::Display for MetricType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How vectors are organized for nearest-neighbor search
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum IndexType {
    /// Exhaustive scan
    #[default]
    #[serde(rename = "FLAT")]
    Flat,
    /// Inverted file over k-means partitions, exact scoring inside probed partitions
    #[serde(rename = "IVF_FLAT")]
    IvfFlat,
}

impl IndexType {
    pub fn as_str(&self) -> &'static str {
        match self {
            IndexType::Flat => "FLAT",
            IndexType::IvfFlat => "IVF_FLAT",
        }
    }
}

/// Index build parameters
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct IndexParams {
    /// Number of IVF partitions (ignored by FLAT)
    #[serde(default = "default_nlist")]
    pub nlist: usize,
}

fn default_nlist() -> usize { 128 }

impl Default for IndexParams {
    fn default() -> Self {
        Self { nlist: default_nlist() }
    }
}

/// Index description for a whole collection
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct IndexSpec {
    pub index_type: IndexType,
    #[serde(default)]
    pub metric_type: MetricType,
    #[serde(default)]
    pub params: IndexParams,
}

impl IndexSpec {
    pub fn flat(metric_type: MetricType) -> Self {
        Self {
            index_type: IndexType::Flat,
            metric_type,
            params: IndexParams::default(),
        }
    }

    pub fn ivf_flat(metric_type: MetricType, nlist: usize) -> Self {
        Self {
            index_type: IndexType::IvfFlat,
            metric_type,
            params: IndexParams { nlist },
        }
    }
}

/// Lifecycle state of a collection
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum CollectionState {
    Unindexed,
    Indexed,
    Loaded,
}

impl CollectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CollectionState::Unindexed => "unindexed",
            CollectionState::Indexed => "indexed",
            CollectionState::Loaded => "loaded",
        }
    }
}

/// Schema of a collection: auto-id primary key plus one embedding field
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CollectionSchema {
    /// Collection name
    pub name: String,

    /// Dimension of the embedding field
    pub dimension: usize,

    /// Free-form description
    #[serde(default)]
    pub description: String,
}

impl CollectionSchema {
    pub fn new(name: impl Into<String>, dimension: usize) -> Self {
        Self {
            name: name.into(),
            dimension,
            description: String::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// Handle to a schema-bound collection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collection {
    pub name: String,
    pub dimension: usize,
}

impl Collection {
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl From<&CollectionSchema> for Collection {
    fn from(schema: &CollectionSchema) -> Self {
        Self {
            name: schema.name.clone(),
            dimension: schema.dimension,
        }
    }
}

/// Snapshot of a collection as reported by the backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionInfo {
    pub schema: CollectionSchema,
    pub state: CollectionState,
    pub row_count: usize,
    pub index: Option<IndexSpec>,
}

/// Search parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchParams {
    /// Query vector
    pub vector: Vec<f32>,

    /// Maximum number of results
    pub limit: usize,

    /// IVF partitions to scan (backend default when unset)
    pub nprobe: Option<usize>,
}

impl SearchParams {
    pub fn new(vector: Vec<f32>, limit: usize) -> Self {
        Self {
            vector,
            limit,
            nprobe: None,
        }
    }

    pub fn with_nprobe(mut self, nprobe: usize) -> Self {
        self.nprobe = Some(nprobe);
        self
    }
}

/// One ranked match
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct SearchHit {
    /// Vector id
    pub id: VectorId,

    /// Raw score under the collection metric
    pub distance: f32,
}

/// Result of an insert
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InsertOutcome {
    /// Number of vectors inserted
    pub inserted: usize,

    /// Ids assigned, in input order
    pub ids: Vec<VectorId>,
}

/// Sort hits best-first under `metric`, ties broken by lower id
pub fn rank_hits(hits: &mut [SearchHit], metric: MetricType) {
    hits.sort_by(|a, b| {
        metric
            .compare(a.distance, b.distance)
            .then_with(|| a.id.cmp(&b.id))
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rank_hits_inner_product() {
        let mut hits = vec![
            SearchHit { id: 3, distance: 0.5 },
            SearchHit { id: 1, distance: 0.9 },
            SearchHit { id: 2, distance: 0.9 },
        ];
        rank_hits(&mut hits, MetricType::Ip);

        let ids: Vec<_> = hits.iter().map(|h| h.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_rank_hits_l2_prefers_smaller() {
        let mut hits = vec![
            SearchHit { id: 1, distance: 4.0 },
            SearchHit { id: 2, distance: 0.0 },
        ];
        rank_hits(&mut hits, MetricType::L2);

        assert_eq!(hits[0].id, 2);
    }

    #[test]
    fn test_index_spec_serde_names() {
        let spec = IndexSpec::ivf_flat(MetricType::Ip, 128);
        let json = serde_json::to_value(spec).unwrap();

        assert_eq!(json["index_type"], "IVF_FLAT");
        assert_eq!(json["metric_type"], "IP");
        assert_eq!(json["params"]["nlist"], 128);
    }
}
