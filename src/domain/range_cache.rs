//! Single-entry cache for block range fetches

use super::record::BlockRecord;

/// Leading blocks fetched for a range card; the last block is always added
pub const RANGE_PREVIEW_LEAD: u64 = 3;

pub fn range_key(start: u64, end: u64) -> String {
    format!("{start}-{end}")
}

/// Remembers the last resolved range for one consumer.
///
/// A lookup only hits when the key matches and the cached boundary records
/// are exactly `start` and `end`. Storing under a different key replaces the
/// entry.
#[derive(Debug, Clone, Default)]
pub struct RangeCache {
    key: Option<String>,
    blocks: Vec<BlockRecord>,
}

impl RangeCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, start: u64, end: u64) -> Option<&[BlockRecord]> {
        if self.key.as_deref() != Some(range_key(start, end).as_str()) {
            return None;
        }
        let first = self.blocks.first()?;
        let last = self.blocks.last()?;
        (first.height == start && last.height == end).then_some(self.blocks.as_slice())
    }

    pub fn contains(&self, start: u64, end: u64) -> bool {
        self.get(start, end).is_some()
    }

    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    /// Point the cache at a new range, dropping data for any other key.
    /// Returns true if the key changed.
    pub fn retarget(&mut self, start: u64, end: u64) -> bool {
        let key = range_key(start, end);
        if self.key.as_deref() == Some(key.as_str()) {
            return false;
        }
        self.key = Some(key);
        self.blocks.clear();
        true
    }

    /// Store a resolved range. Discarded if the cache was retargeted to a
    /// different range since the fetch was issued.
    pub fn store(&mut self, start: u64, end: u64, blocks: Vec<BlockRecord>) -> bool {
        let key = range_key(start, end);
        match self.key.as_deref() {
            Some(current) if current != key => false,
            _ => {
                self.key = Some(key);
                self.blocks = blocks;
                true
            }
        }
    }

    pub fn blocks(&self) -> &[BlockRecord] {
        &self.blocks
    }

    pub fn clear(&mut self) {
        self.key = None;
        self.blocks.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(height: u64) -> BlockRecord {
        BlockRecord {
            height,
            hash: format!("B{height}"),
            app_hash: String::new(),
            timestamp: None,
            tx_count: 0,
            proposer: String::new(),
            tx_hashes: Vec::new(),
        }
    }

    fn blocks(start: u64, end: u64) -> Vec<BlockRecord> {
        (start..=end).map(block).collect()
    }

    #[test]
    fn hit_requires_matching_boundaries() {
        let mut cache = RangeCache::new();
        assert!(cache.get(1, 3).is_none());
        assert!(cache.store(1, 3, blocks(1, 3)));
        assert_eq!(cache.get(1, 3).map(<[BlockRecord]>::len), Some(3));
        assert_eq!(cache.key(), Some("1-3"));

        let mut partial = RangeCache::new();
        partial.store(1, 3, blocks(1, 2));
        assert!(!partial.contains(1, 3));
    }

    #[test]
    fn retarget_invalidates() {
        let mut cache = RangeCache::new();
        cache.store(1, 3, blocks(1, 3));
        assert!(!cache.retarget(1, 3));
        assert!(cache.contains(1, 3));
        assert!(cache.retarget(4, 6));
        assert!(!cache.contains(1, 3));
        assert!(cache.blocks().is_empty());
    }

    #[test]
    fn late_store_for_old_key_is_discarded() {
        let mut cache = RangeCache::new();
        cache.retarget(10, 12);
        assert!(!cache.store(1, 3, blocks(1, 3)));
        assert!(cache.store(10, 12, blocks(10, 12)));
        assert!(cache.contains(10, 12));
    }
}
