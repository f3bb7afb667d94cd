//! Query metrics and Prometheus export

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Snapshot of the answering counters
#[derive(Debug, Clone)]
pub struct AnsweringMetrics {
    pub total_queries: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub generation_failures: u64,
    pub cache_hit_rate: f64,
    pub uptime_secs: u64,
}

/// Latency histogram buckets (in milliseconds)
const LATENCY_BUCKETS: &[f64] = &[1.0, 5.0, 10.0, 25.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 2500.0, 5000.0];

/// Cumulative latency histogram
#[derive(Debug)]
pub struct Histogram {
    buckets: Vec<(f64, AtomicU64)>,
    sum_ms: AtomicU64,
    count: AtomicU64,
}

impl Histogram {
    fn new(buckets: &[f64]) -> Self {
        Self {
            buckets: buckets.iter().map(|&b| (b, AtomicU64::new(0))).collect(),
            sum_ms: AtomicU64::new(0),
            count: AtomicU64::new(0),
        }
    }

    fn observe(&self, duration: Duration) {
        let ms = duration.as_secs_f64() * 1000.0;
        self.sum_ms.fetch_add(ms.round() as u64, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);

        for (bucket, counter) in &self.buckets {
            if ms <= *bucket {
                counter.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    fn export_prometheus(&self, name: &str, help: &str) -> String {
        let mut output = String::new();
        output.push_str(&format!("# HELP {} {}\n", name, help));
        output.push_str(&format!("# TYPE {} histogram\n", name));

        for (bucket, counter) in &self.buckets {
            output.push_str(&format!(
                "{}_bucket{{le=\"{}\"}} {}\n",
                name,
                bucket,
                counter.load(Ordering::Relaxed)
            ));
        }

        let total = self.count();
        output.push_str(&format!("{}_bucket{{le=\"+Inf\"}} {}\n", name, total));
        output.push_str(&format!("{}_sum {}\n", name, self.sum_ms.load(Ordering::Relaxed)));
        output.push_str(&format!("{}_count {}\n", name, total));
        output
    }
}

/// Counters and latencies for the answering path
#[derive(Debug)]
pub struct MetricsCollector {
    start_time: Instant,
    total_queries: AtomicU64,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    generation_failures: AtomicU64,
    embedding_latency: Histogram,
    search_latency: Histogram,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            total_queries: AtomicU64::new(0),
            cache_hits: AtomicU64::new(0),
            cache_misses: AtomicU64::new(0),
            generation_failures: AtomicU64::new(0),
            embedding_latency: Histogram::new(LATENCY_BUCKETS),
            search_latency: Histogram::new(LATENCY_BUCKETS),
        }
    }

    pub fn record_query(&self) {
        self.total_queries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_generation_failure(&self) {
        self.generation_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_embedding_latency(&self, duration: Duration) {
        self.embedding_latency.observe(duration);
    }

    /// Latency of the stage that consumes the query embedding
    pub fn record_search_latency(&self, duration: Duration) {
        self.search_latency.observe(duration);
    }

    pub fn embedding_latency(&self) -> &Histogram {
        &self.embedding_latency
    }

    pub fn search_latency(&self) -> &Histogram {
        &self.search_latency
    }

    pub fn get_metrics(&self) -> AnsweringMetrics {
        let cache_hits = self.cache_hits.load(Ordering::Relaxed);
        let cache_misses = self.cache_misses.load(Ordering::Relaxed);
        let cache_total = cache_hits + cache_misses;

        AnsweringMetrics {
            total_queries: self.total_queries.load(Ordering::Relaxed),
            cache_hits,
            cache_misses,
            generation_failures: self.generation_failures.load(Ordering::Relaxed),
            cache_hit_rate: if cache_total > 0 {
                cache_hits as f64 / cache_total as f64
            } else {
                0.0
            },
            uptime_secs: self.start_time.elapsed().as_secs(),
        }
    }

    /// Export metrics in Prometheus text format
    pub fn export_prometheus(&self) -> String {
        let metrics = self.get_metrics();

        let mut output = format!(
            "# HELP coach_rag_queries_total Total number of queries\n\
             # TYPE coach_rag_queries_total counter\n\
             coach_rag_queries_total {}\n\
             \n\
             # HELP coach_rag_static_hits_total Queries answered from static answers\n\
             # TYPE coach_rag_static_hits_total counter\n\
             coach_rag_static_hits_total {}\n\
             \n\
             # HELP coach_rag_static_misses_total Queries that needed retrieval\n\
             # TYPE coach_rag_static_misses_total counter\n\
             coach_rag_static_misses_total {}\n\
             \n\
             # HELP coach_rag_generation_failures_total Failed generation calls\n\
             # TYPE coach_rag_generation_failures_total counter\n\
             coach_rag_generation_failures_total {}\n\
             \n\
             # HELP coach_rag_static_hit_rate Share of queries served from static answers\n\
             # TYPE coach_rag_static_hit_rate gauge\n\
             coach_rag_static_hit_rate {:.4}\n\
             \n\
             # HELP coach_rag_uptime_seconds Uptime in seconds\n\
             # TYPE coach_rag_uptime_seconds counter\n\
             coach_rag_uptime_seconds {}\n\
             \n",
            metrics.total_queries,
            metrics.cache_hits,
            metrics.cache_misses,
            metrics.generation_failures,
            metrics.cache_hit_rate,
            metrics.uptime_secs,
        );

        output.push_str(&self.embedding_latency.export_prometheus(
            "coach_rag_embedding_duration_ms",
            "Query embedding duration in milliseconds",
        ));
        output.push('\n');
        output.push_str(&self.search_latency.export_prometheus(
            "coach_rag_search_duration_ms",
            "Search and retrieval duration in milliseconds",
        ));

        output
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_collector() {
        let collector = MetricsCollector::new();

        collector.record_query();
        collector.record_query();
        collector.record_cache_hit();
        collector.record_cache_miss();
        collector.record_generation_failure();

        let metrics = collector.get_metrics();
        assert_eq!(metrics.total_queries, 2);
        assert_eq!(metrics.generation_failures, 1);
        assert_eq!(metrics.cache_hit_rate, 0.5);
    }

    #[test]
    fn test_prometheus_export() {
        let collector = MetricsCollector::new();
        collector.record_query();
        collector.record_embedding_latency(Duration::from_millis(20));

        let prometheus = collector.export_prometheus();

        assert!(prometheus.contains("coach_rag_queries_total 1"));
        assert!(prometheus.contains("coach_rag_embedding_duration_ms_bucket{le=\"25\"} 1"));
        assert!(prometheus.contains("coach_rag_embedding_duration_ms_bucket{le=\"10\"} 0"));
        assert!(prometheus.contains("coach_rag_search_duration_ms_count 0"));
    }
}
