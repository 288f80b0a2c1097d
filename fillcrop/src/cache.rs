//! Content-addressed memo of batch results.
//!
//! Sits in front of [`batch::process_all_with`](crate::batch::process_all_with) so a shell
//! that sees the same upload twice does not redo the work. The batch functions themselves
//! know nothing about it.

use lru::LruCache;
use parking_lot::Mutex;
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::Arc;

use crate::batch::{self, ProcessedResult};
use crate::config::ResizeConfig;
use crate::upload::UploadedFile;

/// Identifies an upload by what it contains and what it is called
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentKey {
    digest: blake3::Hash,
    filename: String,
}

impl ContentKey {
    pub fn of(upload: &UploadedFile) -> Self {
        Self {
            digest: blake3::hash(&upload.data),
            filename: upload.name.clone(),
        }
    }
}

pub struct ResultCache {
    entries: Mutex<LruCache<ContentKey, Arc<ProcessedResult>>>,
}

impl ResultCache {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// `None` when `capacity` is zero, i.e. caching is turned off
    pub fn with_capacity(capacity: usize) -> Option<Self> {
        NonZeroUsize::new(capacity).map(Self::new)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    pub fn get(&self, key: &ContentKey) -> Option<Arc<ProcessedResult>> {
        self.entries.lock().get(key).cloned()
    }

    /// Same contract as `batch::process_all_with`, but previously seen uploads are served
    /// from the cache and duplicates inside `uploads` are only processed once.
    pub fn process_all(
        &self,
        uploads: &[UploadedFile],
        config: &ResizeConfig,
    ) -> Vec<Arc<ProcessedResult>> {
        let keys: Vec<ContentKey> = uploads.par_iter().map(ContentKey::of).collect();

        let hits: Vec<Option<Arc<ProcessedResult>>> = {
            let mut entries = self.entries.lock();
            keys.iter().map(|key| entries.get(key).cloned()).collect()
        };

        // first position of every distinct missing key
        let mut pending: HashMap<&ContentKey, usize> = HashMap::new();
        let mut misses: Vec<&UploadedFile> = Vec::new();
        for ((key, hit), upload) in keys.iter().zip(&hits).zip(uploads) {
            if hit.is_none() {
                pending.entry(key).or_insert_with(|| {
                    misses.push(upload);
                    misses.len() - 1
                });
            }
        }

        log::debug!(
            "Result cache: {} hits, {} to process",
            uploads.len() - hits.iter().filter(|h| h.is_none()).count(),
            misses.len()
        );

        let fresh: Vec<Arc<ProcessedResult>> = batch::process_all_with(&misses, config)
            .into_iter()
            .map(Arc::new)
            .collect();

        {
            let mut entries = self.entries.lock();
            for (key, &pos) in &pending {
                let result = &fresh[pos];
                if is_cacheable(result) {
                    entries.put((*key).clone(), Arc::clone(result));
                }
            }
        }

        keys.iter()
            .zip(hits)
            .map(|(key, hit)| hit.unwrap_or_else(|| Arc::clone(&fresh[pending[key]])))
            .collect()
    }
}

/// Successes and undecodable inputs are stable; other failures may go away on retry
fn is_cacheable(result: &ProcessedResult) -> bool {
    match &result.outcome {
        Ok(_) => true,
        Err(e) => e.is_deterministic(),
    }
}
