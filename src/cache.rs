//! Content-addressed PDF artifact cache.
//!
//! Artifacts live in a flat directory as `<key>.pdf`, where the key is derived
//! from the ordered line items (see [`crate::key`]). An artifact is rendered
//! once per key and never rewritten; there is no eviction.
//!
//! # Concurrency
//!
//! Generation is serialized per key with an async mutex held in a concurrent
//! map, so two requests racing on the same key render and write once. Other
//! keys proceed in parallel. Each writer renders into its own hidden temp
//! file in the cache directory and renames it into place, so readers only
//! ever see complete artifacts, even with several processes sharing the
//! directory.

use crate::document::PdfDocumentBuilder;
use crate::entity::ProductRecord;
use crate::error::{Error, Result};
use crate::guard::SafeName;
use crate::key::CacheKey;
use crate::observability::{CacheMetrics, NoOpMetrics};
use dashmap::DashMap;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::fs;
use tokio::sync::Mutex;

/// Reference to an artifact on disk.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CachedArtifact {
    pub key: CacheKey,
    pub path: PathBuf,
    /// True when this call rendered the artifact, false on a cache hit.
    pub generated: bool,
}

impl CachedArtifact {
    pub fn file_name(&self) -> String {
        self.key.file_name()
    }
}

/// PDF artifact cache backed by a storage directory.
///
/// # Example
///
/// ```no_run
/// use invoice_kit::cache::PdfCache;
/// use invoice_kit::entity::ProductRecord;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let cache = PdfCache::new("pdf-invoices");
///     cache.prepare().await?;
///
///     let items = vec![ProductRecord::new(1, "ItemA", 7)];
///     let artifact = cache.get_or_create(&items, 7).await?;
///     println!("{}", artifact.path.display());
///     Ok(())
/// }
/// ```
pub struct PdfCache {
    dir: PathBuf,
    builder: PdfDocumentBuilder,
    locks: DashMap<CacheKey, Arc<Mutex<()>>>,
    metrics: Box<dyn CacheMetrics>,
}

impl PdfCache {
    /// Create a cache over `dir`. Call [`PdfCache::prepare`] before use.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        PdfCache {
            dir: dir.into(),
            builder: PdfDocumentBuilder::new(),
            locks: DashMap::new(),
            metrics: Box::new(NoOpMetrics),
        }
    }

    /// Set the document builder used to fill misses.
    pub fn with_builder(mut self, builder: PdfDocumentBuilder) -> Self {
        self.builder = builder;
        self
    }

    /// Set custom metrics handler.
    pub fn with_metrics(mut self, metrics: Box<dyn CacheMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Create the storage directory if it is missing.
    pub async fn prepare(&self) -> Result<()> {
        fs::create_dir_all(&self.dir).await?;
        debug!("PDF cache directory ready at {}", self.dir.display());
        Ok(())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the artifact for `key`.
    pub fn path_for(&self, key: &CacheKey) -> PathBuf {
        self.dir.join(key.file_name())
    }

    /// Number of keys with a generation in progress or waiting.
    pub fn in_flight(&self) -> usize {
        self.locks.len()
    }

    /// Return the artifact for `entities`, rendering it on first request.
    ///
    /// An existing file is returned as-is, without regeneration or
    /// validation of its contents.
    ///
    /// # Errors
    ///
    /// - `Error::Generation`: the document could not be rendered
    /// - `Error::Storage`: the artifact could not be checked or written
    pub async fn get_or_create(
        &self,
        entities: &[ProductRecord],
        total_sum: i32,
    ) -> Result<CachedArtifact> {
        let timer = Instant::now();
        let key = CacheKey::from_entities(entities);
        let path = self.path_for(&key);

        debug!("» PDF cache lookup for key: {}", key);

        match self.lookup_or_fill(&key, &path, entities, total_sum, timer).await {
            Ok(generated) => Ok(CachedArtifact {
                key,
                path,
                generated,
            }),
            Err(e) => {
                error!("PDF cache failed for {}: {}", key, e);
                self.metrics.record_error(key.as_str(), &e.to_string());
                Err(e)
            }
        }
    }

    async fn lookup_or_fill(
        &self,
        key: &CacheKey,
        path: &Path,
        entities: &[ProductRecord],
        total_sum: i32,
        timer: Instant,
    ) -> Result<bool> {
        if fs::try_exists(path).await? {
            self.metrics.record_hit(key.as_str(), timer.elapsed());
            return Ok(false);
        }

        let lock = self.lock_for(key);
        let result = {
            let _guard = lock.lock().await;
            self.fill(key, path, entities, total_sum, timer).await
        };
        drop(lock);
        self.release_lock(key);

        result
    }

    /// Render and store the artifact. Caller holds the key's lock.
    async fn fill(
        &self,
        key: &CacheKey,
        path: &Path,
        entities: &[ProductRecord],
        total_sum: i32,
        timer: Instant,
    ) -> Result<bool> {
        // A request that held the lock before us may have written it.
        if fs::try_exists(path).await? {
            self.metrics.record_hit(key.as_str(), timer.elapsed());
            return Ok(false);
        }
        self.metrics.record_miss(key.as_str());

        let builder = self.builder.clone();
        let owned = entities.to_vec();
        let dir = self.dir.clone();
        let target = path.to_path_buf();
        let written = tokio::task::spawn_blocking(move || -> Result<usize> {
            let bytes = builder.render(&owned, total_sum)?;
            write_atomically(&dir, &target, &bytes)?;
            Ok(bytes.len())
        })
        .await??;

        self.metrics
            .record_generated(key.as_str(), timer.elapsed(), written);
        Ok(true)
    }

    fn lock_for(&self, key: &CacheKey) -> Arc<Mutex<()>> {
        Arc::clone(self.locks.entry(key.clone()).or_default().value())
    }

    /// Drop the key's lock entry once no other request holds it.
    fn release_lock(&self, key: &CacheKey) {
        self.locks
            .remove_if(key, |_, lock| Arc::strong_count(lock) == 1);
    }

    /// Read a stored artifact by its validated name.
    ///
    /// # Errors
    ///
    /// - `Error::ArtifactMissing`: no such artifact
    /// - `Error::Storage`: the file exists but could not be read
    pub async fn read(&self, name: &SafeName) -> Result<Vec<u8>> {
        let path = name.resolve_in(&self.dir);
        match fs::read(&path).await {
            Ok(bytes) => {
                debug!("✓ Served {} ({} bytes)", name, bytes.len());
                Ok(bytes)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("✗ Artifact {} not found", name);
                Err(Error::ArtifactMissing(name.to_string()))
            }
            Err(e) => {
                error!("Failed to read {}: {}", path.display(), e);
                Err(e.into())
            }
        }
    }
}

/// Write `bytes` to a hidden temp file unique to this writer, then rename it
/// onto `target`. The temp file is removed if anything fails first.
fn write_atomically(dir: &Path, target: &Path, bytes: &[u8]) -> Result<()> {
    let mut partial = tempfile::Builder::new()
        .prefix(".")
        .suffix(".partial")
        .tempfile_in(dir)?;
    partial.write_all(bytes)?;
    partial.persist(target).map_err(|e| e.error)?;
    Ok(())
}
