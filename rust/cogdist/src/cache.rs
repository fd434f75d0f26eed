//! Memoization of bootstrap sample collections.
//!
//! A [`CacheKey`] is the SHA-256 digest of every argument that determines a
//! bootstrap run: statistic name, space matrix, both count vectors, number
//! of samples and the option bag. The random seed is not part
//! of the key, so a hit returns the realization stored by the first run.
//!
//! [`DiskCache`] keeps one JSON file per key and never evicts; entries
//! persist until [`DiskCache::clear`] or manual removal. Concurrent writers
//! of the same key race with last-writer-wins semantics. Each write goes
//! through a temp file in the cache directory, so a reader never sees a
//! partially written entry.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::bootstrap::SampleCollection;
use crate::error::{CogdistError, Result};
use crate::matrix::Matrix;
use crate::resample::CountVector;
use crate::statistic::StatOptions;

/// Bumped whenever the key material or the entry layout changes.
const SCHEMA_VERSION: &str = "2";

#[derive(Serialize)]
struct KeyMaterial<'a> {
    schema_version: &'a str,
    statistic: &'a str,
    space: &'a Matrix,
    counts: &'a CountVector,
    counts2: Option<&'a CountVector>,
    num_samples: usize,
    options: &'a StatOptions,
}

/// Content address of one bootstrap computation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    digest: String,
    statistic: String,
    num_samples: usize,
}

impl CacheKey {
    pub fn new(
        statistic: &str,
        space: &Matrix,
        counts: &CountVector,
        counts2: Option<&CountVector>,
        num_samples: usize,
        options: &StatOptions,
    ) -> Result<Self> {
        let material = KeyMaterial {
            schema_version: SCHEMA_VERSION,
            statistic,
            space,
            counts,
            counts2,
            num_samples,
            options,
        };
        let bytes = serde_json::to_vec(&material)?;
        let digest = format!("{:x}", Sha256::digest(&bytes));
        Ok(CacheKey {
            digest,
            statistic: statistic.to_string(),
            num_samples,
        })
    }

    /// Hex digest.
    pub fn digest(&self) -> &str {
        &self.digest
    }

    pub fn statistic(&self) -> &str {
        &self.statistic
    }

    pub fn num_samples(&self) -> usize {
        self.num_samples
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", &self.digest[..12.min(self.digest.len())])
    }
}

/// Storage for bootstrap sample collections.
pub trait SampleCache: Send + Sync {
    fn get(&self, key: &CacheKey) -> Result<Option<SampleCollection>>;

    fn put(&self, key: &CacheKey, samples: &SampleCollection) -> Result<()>;
}

// ---------------------------------------------------------------------------
// Disk cache
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
struct CacheEntry {
    schema_version: String,
    statistic: String,
    num_samples: usize,
    samples: StoredSamples,
}

/// Sample values as raw IEEE-754 bits. Decimal JSON numbers do not carry
/// NaN or infinities, and a hit must return exactly what the miss drew.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum StoredSamples {
    Scalars { bits: Vec<u64> },
    Vectors { rows: usize, cols: usize, bits: Vec<u64> },
}

impl StoredSamples {
    fn encode(samples: &SampleCollection) -> Self {
        let bits = samples.as_flat().iter().map(|x| x.to_bits()).collect();
        match samples {
            SampleCollection::Scalars(_) => StoredSamples::Scalars { bits },
            SampleCollection::Vectors(m) => StoredSamples::Vectors {
                rows: m.rows(),
                cols: m.cols(),
                bits,
            },
        }
    }

    /// Fails when a vector entry's shape does not match its buffer.
    fn decode(self) -> Result<SampleCollection> {
        let values = |bits: Vec<u64>| bits.into_iter().map(f64::from_bits).collect::<Vec<_>>();
        match self {
            StoredSamples::Scalars { bits } => Ok(SampleCollection::Scalars(values(bits))),
            StoredSamples::Vectors { rows, cols, bits } => {
                Matrix::new(rows, cols, values(bits)).map(SampleCollection::Vectors)
            }
        }
    }
}

/// Directory-backed cache, one `<digest>.json` file per entry.
#[derive(Debug, Clone)]
pub struct DiskCache {
    dir: PathBuf,
}

impl DiskCache {
    /// Default location, relative to the working directory.
    pub const DEFAULT_DIR: &'static str = ".cache";

    /// Cache rooted at `dir`. The directory is created on first write.
    pub fn new(dir: impl AsRef<Path>) -> Self {
        DiskCache {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_path(&self, key: &CacheKey) -> PathBuf {
        self.dir.join(format!("{}.json", key.digest()))
    }

    /// Number of entries on disk.
    pub fn len(&self) -> Result<usize> {
        Ok(self.entry_files()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Remove every entry. Returns the number removed.
    pub fn clear(&self) -> Result<usize> {
        let files = self.entry_files()?;
        for path in &files {
            fs::remove_file(path)?;
        }
        log::info!("Cleared {} cache entries from {}", files.len(), self.dir.display());
        Ok(files.len())
    }

    fn entry_files(&self) -> Result<Vec<PathBuf>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }
        let mut files = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().map_or(false, |ext| ext == "json") {
                files.push(path);
            }
        }
        Ok(files)
    }
}

impl Default for DiskCache {
    fn default() -> Self {
        DiskCache::new(Self::DEFAULT_DIR)
    }
}

impl SampleCache for DiskCache {
    fn get(&self, key: &CacheKey) -> Result<Option<SampleCollection>> {
        let path = self.entry_path(key);
        if !path.exists() {
            return Ok(None);
        }

        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) => {
                log::warn!("Failed to read {}: {}, recomputing", path.display(), e);
                return Ok(None);
            }
        };
        let entry = match serde_json::from_str::<CacheEntry>(&contents) {
            Ok(entry) => entry,
            Err(e) => {
                log::warn!("Failed to parse {}: {}, recomputing", path.display(), e);
                return Ok(None);
            }
        };
        if entry.schema_version != SCHEMA_VERSION || entry.statistic != key.statistic() {
            log::warn!(
                "Cache entry {} does not match its key (schema {}, statistic {}), recomputing",
                path.display(),
                entry.schema_version,
                entry.statistic
            );
            return Ok(None);
        }
        let samples = match entry.samples.decode() {
            Ok(samples) => samples,
            Err(e) => {
                log::warn!("Malformed samples in {}: {}, recomputing", path.display(), e);
                return Ok(None);
            }
        };
        if samples.len() != key.num_samples() {
            log::warn!(
                "Cache entry {} holds {} samples, expected {}, recomputing",
                path.display(),
                samples.len(),
                key.num_samples()
            );
            return Ok(None);
        }
        Ok(Some(samples))
    }

    fn put(&self, key: &CacheKey, samples: &SampleCollection) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let path = self.entry_path(key);
        let entry = CacheEntry {
            schema_version: SCHEMA_VERSION.to_string(),
            statistic: key.statistic().to_string(),
            num_samples: key.num_samples(),
            samples: StoredSamples::encode(samples),
        };

        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(&serde_json::to_vec(&entry)?)?;
        tmp.flush()?;
        tmp.persist(&path).map_err(|e| CogdistError::Cache {
            path: path.clone(),
            reason: e.error.to_string(),
        })?;

        log::debug!("Stored {} samples of '{}' at {}", key.num_samples(), key.statistic(), path.display());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// In-memory cache and pass-through
// ---------------------------------------------------------------------------

/// Process-local cache, mostly for tests and repeated in-process runs.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, SampleCollection>>,
    hits: AtomicUsize,
    misses: AtomicUsize,
}

impl MemoryCache {
    pub fn new() -> Self {
        MemoryCache::default()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> usize {
        self.misses.load(Ordering::Relaxed)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, SampleCollection>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl SampleCache for MemoryCache {
    fn get(&self, key: &CacheKey) -> Result<Option<SampleCollection>> {
        let found = self.lock().get(key.digest()).cloned();
        if found.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
        Ok(found)
    }

    fn put(&self, key: &CacheKey, samples: &SampleCollection) -> Result<()> {
        self.lock().insert(key.digest().to_string(), samples.clone());
        Ok(())
    }
}

/// Never stores anything; every run draws fresh replicates.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCache;

impl SampleCache for NoCache {
    fn get(&self, _key: &CacheKey) -> Result<Option<SampleCollection>> {
        Ok(None)
    }

    fn put(&self, _key: &CacheKey, _samples: &SampleCollection) -> Result<()> {
        Ok(())
    }
}
