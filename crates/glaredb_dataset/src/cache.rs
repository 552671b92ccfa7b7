//! Caching of materialized plans.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::arrays::row::Row;
use crate::logical::operator::LogicalOperator;

/// How cached data should be stored.
///
/// The in-memory cache manager keeps everything in memory regardless of
/// level. The level is recorded so that it can be reported back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StorageLevel {
    /// Not cached.
    None,
    DiskOnly,
    MemoryOnly,
    #[default]
    MemoryAndDisk,
    OffHeap,
}

impl fmt::Display for StorageLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "NONE"),
            Self::DiskOnly => write!(f, "DISK_ONLY"),
            Self::MemoryOnly => write!(f, "MEMORY_ONLY"),
            Self::MemoryAndDisk => write!(f, "MEMORY_AND_DISK"),
            Self::OffHeap => write!(f, "OFF_HEAP"),
        }
    }
}

/// Rows of a cached plan, materialized the first time the plan is used.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedData {
    pub rows: Arc<Vec<Row>>,
    /// Number of partitions the rows were produced in.
    pub partitions: usize,
}

/// Result of looking up a plan in the cache.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheLookup {
    pub level: StorageLevel,
    /// Data if it's been materialized.
    pub data: Option<CachedData>,
}

/// Registry of cached plans.
///
/// Plans are matched structurally. Since analyzed plans carry attribute ids,
/// a plan only matches plans derived from the same analyzed dataset.
pub trait CacheManager: fmt::Debug + Sync + Send {
    /// Register a plan for caching. Caching a plan that's already cached is a
    /// no-op.
    fn cache_query(&self, plan: &Arc<LogicalOperator>, level: StorageLevel);

    /// Remove a plan from the cache, returning whether it was cached.
    ///
    /// When `blocking` is set, the call returns only once the cached data has
    /// been released.
    fn try_uncache_query(&self, plan: &LogicalOperator, blocking: bool) -> bool;

    fn lookup(&self, plan: &LogicalOperator) -> Option<CacheLookup>;

    /// Store materialized data for a cached plan. Ignored if the plan isn't
    /// cached.
    fn fill(&self, plan: &LogicalOperator, data: CachedData);

    /// Check if nothing is cached.
    fn is_empty(&self) -> bool;
}

#[derive(Debug)]
struct CacheEntry {
    plan: Arc<LogicalOperator>,
    level: StorageLevel,
    data: Option<CachedData>,
}

/// Cache manager holding everything in process memory.
#[derive(Debug, Default)]
pub struct MemoryCacheManager {
    entries: RwLock<Vec<CacheEntry>>,
}

impl MemoryCacheManager {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CacheManager for MemoryCacheManager {
    fn cache_query(&self, plan: &Arc<LogicalOperator>, level: StorageLevel) {
        let mut entries = self.entries.write();
        if entries.iter().any(|ent| ent.plan.as_ref() == plan.as_ref()) {
            warn!("asked to cache already cached data");
            return;
        }
        debug!(%level, "caching plan");
        entries.push(CacheEntry {
            plan: plan.clone(),
            level,
            data: None,
        });
    }

    fn try_uncache_query(&self, plan: &LogicalOperator, _blocking: bool) -> bool {
        // Removal drops the only reference held by the cache, nothing is
        // released asynchronously.
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|ent| ent.plan.as_ref() != plan);
        let removed = entries.len() != before;
        if removed {
            debug!("uncached plan");
        }
        removed
    }

    fn lookup(&self, plan: &LogicalOperator) -> Option<CacheLookup> {
        self.entries
            .read()
            .iter()
            .find(|ent| ent.plan.as_ref() == plan)
            .map(|ent| CacheLookup {
                level: ent.level,
                data: ent.data.clone(),
            })
    }

    fn fill(&self, plan: &LogicalOperator, data: CachedData) {
        let mut entries = self.entries.write();
        if let Some(ent) = entries.iter_mut().find(|ent| ent.plan.as_ref() == plan) {
            // First fill wins if two actions materialized concurrently.
            if ent.data.is_none() {
                ent.data = Some(data);
            }
        }
    }

    fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arrays::datatype::DataType;
    use crate::expr::attribute::Attribute;
    use crate::logical::logical_local::LogicalLocalRelation;
    use crate::logical::operator::Node;
    use crate::row;

    fn relation(rows: Vec<Row>) -> Arc<LogicalOperator> {
        Arc::new(LogicalOperator::LocalRelation(Node::new(
            LogicalLocalRelation {
                output: vec![Attribute::new("a", DataType::Int32, true)],
                rows: Arc::new(rows),
                partitions: 1,
            },
            Vec::new(),
        )))
    }

    #[test]
    fn cache_lookup_fill_uncache() {
        let cache = MemoryCacheManager::new();
        let plan = relation(vec![row![1]]);
        assert!(cache.is_empty());
        assert!(cache.lookup(&plan).is_none());

        cache.cache_query(&plan, StorageLevel::MemoryOnly);
        cache.cache_query(&plan, StorageLevel::DiskOnly);
        let found = cache.lookup(&plan).unwrap();
        assert_eq!(StorageLevel::MemoryOnly, found.level);
        assert_eq!(None, found.data);

        let data = CachedData {
            rows: Arc::new(vec![row![1]]),
            partitions: 1,
        };
        cache.fill(&plan, data.clone());
        assert_eq!(Some(data), cache.lookup(&plan).unwrap().data);

        assert!(cache.try_uncache_query(&plan, true));
        assert!(!cache.try_uncache_query(&plan, true));
        assert!(cache.is_empty());
    }

    #[test]
    fn fill_ignores_uncached() {
        let cache = MemoryCacheManager::new();
        let plan = relation(Vec::new());
        cache.fill(
            &plan,
            CachedData {
                rows: Arc::new(Vec::new()),
                partitions: 1,
            },
        );
        assert!(cache.lookup(&plan).is_none());
    }

    #[test]
    fn storage_level_display() {
        assert_eq!("MEMORY_AND_DISK", StorageLevel::default().to_string());
    }
}
