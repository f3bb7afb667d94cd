//! Similarity metrics and in-process index structures

use super::models::{IndexSpec, IndexType, MetricType, VectorId};
use crate::error::{Result, VectorDbError};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use tracing::debug;

/// Lloyd iterations used to train IVF centroids
const KMEANS_ITERATIONS: usize = 10;

/// Default number of partitions probed per IVF search
pub const DEFAULT_NPROBE: usize = 10;

pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

pub fn l2_squared(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

pub fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let norm_a = dot(a, a).sqrt();
    let norm_b = dot(b, b).sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot(a, b) / (norm_a * norm_b)
}

/// Raw score of `b` against `a` under `metric`
pub fn score(metric: MetricType, a: &[f32], b: &[f32]) -> f32 {
    match metric {
        MetricType::Ip => dot(a, b),
        MetricType::L2 => l2_squared(a, b),
        MetricType::Cosine => cosine(a, b),
    }
}

/// Index over the rows of one collection. Rows themselves live in the collection.
#[derive(Debug, Clone)]
pub enum VectorIndex {
    Flat,
    IvfFlat {
        centroids: Vec<Vec<f32>>,
        lists: Vec<Vec<VectorId>>,
    },
}

impl VectorIndex {
    /// Build an index for `spec` over the given rows
    pub fn build(spec: &IndexSpec, rows: &BTreeMap<VectorId, Vec<f32>>) -> Result<Self> {
        match spec.index_type {
            IndexType::Flat => Ok(VectorIndex::Flat),
            IndexType::IvfFlat => {
                if spec.params.nlist == 0 {
                    return Err(VectorDbError::InvalidIndexParams(
                        "nlist must be greater than 0".to_string(),
                    )
                    .into());
                }

                let centroids = train_centroids(rows, spec.params.nlist);
                let mut lists = vec![Vec::new(); centroids.len()];
                for (id, vector) in rows {
                    lists[nearest_centroid(&centroids, vector)].push(*id);
                }

                debug!(
                    "Built IVF_FLAT index with {} partitions over {} rows",
                    centroids.len(),
                    rows.len()
                );
                Ok(VectorIndex::IvfFlat { centroids, lists })
            }
        }
    }

    /// Register a vector inserted after the index was built
    pub fn add(&mut self, id: VectorId, vector: &[f32]) {
        if let VectorIndex::IvfFlat { centroids, lists } = self {
            if centroids.is_empty() {
                // Index was built over an empty collection
                centroids.push(vector.to_vec());
                lists.push(Vec::new());
            }
            lists[nearest_centroid(centroids, vector)].push(id);
        }
    }

    pub fn remove(&mut self, id: VectorId) {
        if let VectorIndex::IvfFlat { lists, .. } = self {
            for list in lists.iter_mut() {
                list.retain(|existing| *existing != id);
            }
        }
    }

    /// Ids that must be scored for `query`
    pub fn candidates(
        &self,
        query: &[f32],
        nprobe: usize,
        rows: &BTreeMap<VectorId, Vec<f32>>,
    ) -> Vec<VectorId> {
        match self {
            VectorIndex::Flat => rows.keys().copied().collect(),
            VectorIndex::IvfFlat { centroids, lists } => {
                let mut order: Vec<(usize, f32)> = centroids
                    .iter()
                    .enumerate()
                    .map(|(i, c)| (i, l2_squared(c, query)))
                    .collect();
                order.sort_by(|a, b| {
                    a.1.partial_cmp(&b.1)
                        .unwrap_or(Ordering::Equal)
                        .then_with(|| a.0.cmp(&b.0))
                });

                order
                    .into_iter()
                    .take(nprobe.max(1))
                    .flat_map(|(i, _)| lists[i].iter().copied())
                    .collect()
            }
        }
    }
}

/// Index of the closest centroid, lowest index on ties
fn nearest_centroid(centroids: &[Vec<f32>], vector: &[f32]) -> usize {
    let mut best = 0;
    let mut best_distance = f32::INFINITY;
    for (i, centroid) in centroids.iter().enumerate() {
        let distance = l2_squared(centroid, vector);
        if distance < best_distance {
            best = i;
            best_distance = distance;
        }
    }
    best
}

/// Deterministic k-means: evenly spaced seeds in id order, then Lloyd iterations
fn train_centroids(rows: &BTreeMap<VectorId, Vec<f32>>, nlist: usize) -> Vec<Vec<f32>> {
    let vectors: Vec<&Vec<f32>> = rows.values().collect();
    let k = nlist.min(vectors.len());
    if k == 0 {
        return Vec::new();
    }

    let dimension = vectors[0].len();
    let mut centroids: Vec<Vec<f32>> = (0..k)
        .map(|i| vectors[i * vectors.len() / k].clone())
        .collect();
    let mut assignment = vec![usize::MAX; vectors.len()];

    for _ in 0..KMEANS_ITERATIONS {
        let mut changed = false;
        for (slot, vector) in vectors.iter().enumerate() {
            let nearest = nearest_centroid(&centroids, vector);
            if assignment[slot] != nearest {
                assignment[slot] = nearest;
                changed = true;
            }
        }

        if !changed {
            break;
        }

        let mut sums = vec![vec![0.0f32; dimension]; k];
        let mut counts = vec![0usize; k];
        for (slot, vector) in vectors.iter().enumerate() {
            let cluster = assignment[slot];
            counts[cluster] += 1;
            for (sum, value) in sums[cluster].iter_mut().zip(vector.iter()) {
                *sum += value;
            }
        }

        for (cluster, sum) in sums.into_iter().enumerate() {
            // Empty partitions keep their previous centroid
            if counts[cluster] > 0 {
                centroids[cluster] = sum
                    .into_iter()
                    .map(|s| s / counts[cluster] as f32)
                    .collect();
            }
        }
    }

    centroids
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(vectors: &[[f32; 2]]) -> BTreeMap<VectorId, Vec<f32>> {
        vectors
            .iter()
            .enumerate()
            .map(|(i, v)| (i as VectorId + 1, v.to_vec()))
            .collect()
    }

    #[test]
    fn test_metrics() {
        let a = [1.0, 0.0];
        let b = [0.0, 2.0];

        assert_eq!(score(MetricType::Ip, &a, &b), 0.0);
        assert_eq!(score(MetricType::L2, &a, &b), 5.0);
        assert_eq!(score(MetricType::Cosine, &a, &a), 1.0);
        assert_eq!(cosine(&a, &[0.0, 0.0]), 0.0);
    }

    #[test]
    fn test_ivf_partitions_separate_clusters() {
        let rows = rows(&[[0.0, 0.0], [0.1, 0.0], [10.0, 10.0], [10.1, 10.0]]);
        let spec = IndexSpec::ivf_flat(MetricType::L2, 2);
        let index = VectorIndex::build(&spec, &rows).unwrap();

        let near_origin = index.candidates(&[0.0, 0.1], 1, &rows);
        assert_eq!(near_origin, vec![1, 2]);

        let all = index.candidates(&[0.0, 0.1], 2, &rows);
        assert_eq!(all.len(), 4);
    }

    #[test]
    fn test_ivf_nlist_clamped_to_rows() {
        let rows = rows(&[[1.0, 1.0], [1.0, 1.0], [1.0, 1.0]]);
        let spec = IndexSpec::ivf_flat(MetricType::Ip, 128);

        match VectorIndex::build(&spec, &rows).unwrap() {
            VectorIndex::IvfFlat { centroids, lists } => {
                assert_eq!(centroids.len(), 3);
                // identical vectors all land in the first partition
                assert_eq!(lists[0].len(), 3);
            }
            VectorIndex::Flat => panic!("expected IVF index"),
        }
    }

    #[test]
    fn test_ivf_zero_nlist_rejected() {
        let spec = IndexSpec::ivf_flat(MetricType::Ip, 0);
        assert!(VectorIndex::build(&spec, &BTreeMap::new()).is_err());
    }

    #[test]
    fn test_add_to_empty_ivf_index() {
        let spec = IndexSpec::ivf_flat(MetricType::Ip, 4);
        let mut index = VectorIndex::build(&spec, &BTreeMap::new()).unwrap();
        index.add(7, &[1.0, 2.0]);

        let rows = rows(&[[1.0, 2.0]]);
        assert_eq!(index.candidates(&[1.0, 2.0], 1, &rows), vec![7]);
    }
}
