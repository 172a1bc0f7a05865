//! Process-wide slot holding the most recent simulation result

use crate::types::{ElementType, VolumeShape};
use crate::volume::Volume;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::sync::Arc;
use uuid::Uuid;

/// A simulation result retained for slice and info requests
#[derive(Debug, Clone)]
pub struct CachedResult {
    pub volume: Arc<Volume>,
    pub shape: VolumeShape,
    pub dtype: ElementType,
    /// Identifier of the simulate cycle that produced the volume
    pub run_id: Uuid,
    pub computed_at: DateTime<Utc>,
}

impl CachedResult {
    pub fn new(volume: Arc<Volume>, run_id: Uuid) -> Self {
        Self {
            shape: volume.shape(),
            dtype: volume.element_type(),
            volume,
            run_id,
            computed_at: Utc::now(),
        }
    }
}

/// Which volume a reader was handed
#[derive(Debug, Clone)]
pub enum CacheEntry {
    Simulated(CachedResult),
    Fallback(Arc<Volume>),
}

impl CacheEntry {
    pub fn volume(&self) -> &Arc<Volume> {
        match self {
            CacheEntry::Simulated(result) => &result.volume,
            CacheEntry::Fallback(volume) => volume,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, CacheEntry::Fallback(_))
    }
}

/// Single shared result slot
///
/// Replacement swaps the whole entry under the write lock, so a reader sees
/// either the previous or the new result, never a mix.
#[derive(Debug)]
pub struct ResultCache {
    fallback: Arc<Volume>,
    current: RwLock<Option<CachedResult>>,
}

impl ResultCache {
    /// Create an empty cache backed by the given fallback volume
    pub fn new(fallback: Volume) -> Self {
        Self {
            fallback: Arc::new(fallback),
            current: RwLock::new(None),
        }
    }

    /// Unconditionally replace the cached result, returning the previous one
    pub fn set(&self, result: CachedResult) -> Option<CachedResult> {
        self.current.write().replace(result)
    }

    /// The cached volume, or the fallback if nothing was simulated yet
    pub fn get(&self) -> Arc<Volume> {
        Arc::clone(self.entry().volume())
    }

    /// The cached entry together with its provenance
    pub fn entry(&self) -> CacheEntry {
        match self.current.read().as_ref() {
            Some(result) => CacheEntry::Simulated(result.clone()),
            None => CacheEntry::Fallback(Arc::clone(&self.fallback)),
        }
    }

    /// The static fallback volume, independent of cache state
    pub fn fallback(&self) -> Arc<Volume> {
        Arc::clone(&self.fallback)
    }

    pub fn has_result(&self) -> bool {
        self.current.read().is_some()
    }
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::new(Volume::test_pattern())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array4;
    use std::thread;

    fn constant_volume(value: f32, dims: (usize, usize, usize, usize)) -> Arc<Volume> {
        Arc::new(Volume::from_array(Array4::from_elem(dims, value)).unwrap())
    }

    #[test]
    fn test_fallback_until_set() {
        let cache = ResultCache::default();
        assert!(!cache.has_result());
        assert!(cache.entry().is_fallback());
        assert_eq!(cache.get().shape().dims(), [2, 4, 64, 64]);

        let volume = constant_volume(1.0, (1, 2, 3, 4));
        let run_id = Uuid::new_v4();
        assert!(cache.set(CachedResult::new(Arc::clone(&volume), run_id)).is_none());

        assert!(cache.has_result());
        assert!(Arc::ptr_eq(&cache.get(), &volume));
        match cache.entry() {
            CacheEntry::Simulated(result) => {
                assert_eq!(result.run_id, run_id);
                assert_eq!(result.shape.dims(), [1, 2, 3, 4]);
                assert_eq!(result.dtype, ElementType::F32);
            }
            CacheEntry::Fallback(_) => panic!("expected simulated entry"),
        }
        // The fallback itself is untouched.
        assert_eq!(cache.fallback().shape().dims(), [2, 4, 64, 64]);
    }

    #[test]
    fn test_set_replaces_previous() {
        let cache = ResultCache::default();
        let first = CachedResult::new(constant_volume(1.0, (1, 1, 2, 2)), Uuid::new_v4());
        let first_id = first.run_id;
        cache.set(first);
        let previous = cache.set(CachedResult::new(constant_volume(2.0, (1, 1, 2, 2)), Uuid::new_v4()));
        assert_eq!(previous.map(|r| r.run_id), Some(first_id));
        assert!(cache.get().data().iter().all(|&v| v == 2.0));
    }

    #[test]
    fn test_readers_never_see_mixed_state() {
        let cache = Arc::new(ResultCache::default());
        let writer = {
            let cache = Arc::clone(&cache);
            thread::spawn(move || {
                for i in 0..200 {
                    let side = 1 + i % 7;
                    let volume = constant_volume(side as f32, (1, 1, side, side));
                    cache.set(CachedResult::new(volume, Uuid::new_v4()));
                }
            })
        };

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || {
                    for _ in 0..500 {
                        if let CacheEntry::Simulated(result) = cache.entry() {
                            let side = result.shape.height();
                            assert_eq!(result.volume.shape(), result.shape);
                            assert!(result.volume.data().iter().all(|&v| v == side as f32));
                        }
                    }
                })
            })
            .collect();

        writer.join().unwrap();
        for reader in readers {
            reader.join().unwrap();
        }
    }
}
