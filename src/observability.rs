//! Observability hooks for the PDF artifact cache.
//!
//! Implement [`CacheMetrics`] to feed cache events into a monitoring system:
//!
//! ```ignore
//! use invoice_kit::observability::CacheMetrics;
//! use std::time::Duration;
//!
//! struct PrometheusMetrics;
//!
//! impl CacheMetrics for PrometheusMetrics {
//!     fn record_generated(&self, _key: &str, _duration: Duration, _bytes: usize) {
//!         // counter!("invoice_pdf_generated").inc();
//!     }
//! }
//!
//! // let cache = PdfCache::new(dir).with_metrics(Box::new(PrometheusMetrics));
//! ```
//!
//! The default trait methods log through the `log` crate; [`NoOpMetrics`]
//! (the cache default) discards everything.

use std::time::Duration;

/// Trait for cache metrics collection.
pub trait CacheMetrics: Send + Sync {
    /// Artifact already on disk.
    fn record_hit(&self, key: &str, duration: Duration) {
        debug!("PDF cache HIT: {} took {:?}", key, duration);
    }

    /// Artifact absent; generation follows.
    fn record_miss(&self, key: &str) {
        debug!("PDF cache MISS: {}", key);
    }

    /// Artifact rendered and written.
    fn record_generated(&self, key: &str, duration: Duration, bytes: usize) {
        info!(
            "PDF cache GENERATED: {} ({} bytes) took {:?}",
            key, bytes, duration
        );
    }

    /// Lookup or generation failed.
    fn record_error(&self, key: &str, error: &str) {
        warn!("PDF cache ERROR for {}: {}", key, error);
    }
}

/// Default metrics implementation (no-op).
#[derive(Clone, Default)]
pub struct NoOpMetrics;

impl CacheMetrics for NoOpMetrics {
    fn record_hit(&self, _key: &str, _duration: Duration) {}
    fn record_miss(&self, _key: &str) {}
    fn record_generated(&self, _key: &str, _duration: Duration, _bytes: usize) {}
    fn record_error(&self, _key: &str, _error: &str) {}
}

/// Metrics implementation that only logs (the trait defaults).
#[derive(Clone, Default)]
pub struct LogMetrics;

impl CacheMetrics for LogMetrics {}
