//! Content-addressed reuse of a loaded dataset
//!
//! The cache is keyed only by a SHA256 fingerprint of the source files.
//! There is no time-based expiry: an unchanged directory is never reloaded and
//! any byte change forces a reload.

use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

use super::{DatasetSource, RecoveryDataset};
use crate::error::Result;

/// Fingerprint of a set of source files
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DataVersion {
    pub hash: String,
    pub total_bytes: u64,
}

impl DataVersion {
    /// Hash file names and contents in order. Missing files contribute a
    /// marker, so creating an optional file changes the version too.
    pub fn from_files<P: AsRef<Path>>(paths: &[P]) -> Result<Self> {
        let mut hasher = Sha256::new();
        let mut total_bytes = 0u64;
        let mut buffer = [0; 8192];

        for path in paths {
            let path = path.as_ref();
            hasher.update(path.to_string_lossy().as_bytes());

            if !path.exists() {
                hasher.update(b"\0missing\0");
                continue;
            }

            let mut file = File::open(path)?;
            loop {
                let bytes_read = file.read(&mut buffer)?;
                if bytes_read == 0 {
                    break;
                }
                hasher.update(&buffer[..bytes_read]);
                total_bytes += bytes_read as u64;
            }
            hasher.update(b"\0");
        }

        Ok(Self {
            hash: format!("{:x}", hasher.finalize()),
            total_bytes,
        })
    }

    /// Abbreviated hash for log lines
    pub fn short(&self) -> &str {
        &self.hash[..12.min(self.hash.len())]
    }
}

/// Cache statistics
#[derive(Debug, Clone, Default)]
pub struct CacheMetrics {
    pub total_lookups: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
}

impl CacheMetrics {
    /// Hit rate as percentage
    pub fn hit_rate(&self) -> f64 {
        if self.total_lookups == 0 {
            return 0.0;
        }
        (self.cache_hits as f64 / self.total_lookups as f64) * 100.0
    }
}

/// Holds the most recently loaded dataset and its fingerprint
#[derive(Debug, Default)]
pub struct DatasetCache {
    entry: Option<(DataVersion, Arc<RecoveryDataset>)>,
    metrics: CacheMetrics,
}

impl DatasetCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached dataset when the source fingerprint is unchanged,
    /// otherwise load it afresh and replace the entry.
    pub fn get_or_load(&mut self, source: &dyn DatasetSource) -> Result<Arc<RecoveryDataset>> {
        let version = source.fingerprint()?;
        self.metrics.total_lookups += 1;

        if let Some((cached_version, dataset)) = &self.entry {
            if *cached_version == version {
                self.metrics.cache_hits += 1;
                debug!(version = %version.short(), "Dataset cache hit");
                return Ok(Arc::clone(dataset));
            }
        }

        self.metrics.cache_misses += 1;
        let dataset = Arc::new(source.load()?);
        info!(
            source = %source.describe(),
            version = %version.short(),
            bytes = version.total_bytes,
            "Loaded dataset"
        );
        self.entry = Some((version, Arc::clone(&dataset)));
        Ok(dataset)
    }

    pub fn current_version(&self) -> Option<&DataVersion> {
        self.entry.as_ref().map(|(version, _)| version)
    }

    pub fn invalidate(&mut self) {
        self.entry = None;
    }

    pub fn metrics(&self) -> &CacheMetrics {
        &self.metrics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    struct CountingSource {
        path: std::path::PathBuf,
        loads: AtomicUsize,
    }

    impl DatasetSource for CountingSource {
        fn load(&self) -> Result<RecoveryDataset> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            Ok(RecoveryDataset::default())
        }

        fn fingerprint(&self) -> Result<DataVersion> {
            DataVersion::from_files(&[&self.path])
        }

        fn describe(&self) -> String {
            self.path.display().to_string()
        }
    }

    #[test]
    fn test_fingerprint_tracks_content() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("biometric_daily.csv");

        let missing = DataVersion::from_files(&[&path]).unwrap();
        fs::write(&path, "athlete_id,date\n").unwrap();
        let first = DataVersion::from_files(&[&path]).unwrap();
        let again = DataVersion::from_files(&[&path]).unwrap();
        fs::write(&path, "athlete_id,date\nA1,2025-04-01\n").unwrap();
        let changed = DataVersion::from_files(&[&path]).unwrap();

        assert_ne!(missing, first);
        assert_eq!(first, again);
        assert_ne!(first, changed);
        assert_eq!(first.hash.len(), 64);
        assert_eq!(first.short().len(), 12);
    }

    #[test]
    fn test_cache_reloads_only_on_change() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("metrics_config.csv");
        fs::write(&path, "metric_name\n").unwrap();

        let source = CountingSource {
            path: path.clone(),
            loads: AtomicUsize::new(0),
        };
        let mut cache = DatasetCache::new();

        cache.get_or_load(&source).unwrap();
        cache.get_or_load(&source).unwrap();
        assert_eq!(source.loads.load(Ordering::SeqCst), 1);

        fs::write(&path, "metric_name,unit\n").unwrap();
        cache.get_or_load(&source).unwrap();
        assert_eq!(source.loads.load(Ordering::SeqCst), 2);

        cache.invalidate();
        cache.get_or_load(&source).unwrap();
        assert_eq!(source.loads.load(Ordering::SeqCst), 3);

        assert_eq!(cache.metrics().total_lookups, 4);
        assert_eq!(cache.metrics().cache_hits, 1);
        assert!((cache.metrics().hit_rate() - 25.0).abs() < 1e-9);
        assert!(cache.current_version().is_some());
    }
}
