use std::ops::Range;
use log::{debug, trace};
use crate::block::{BlockId, CacheBlock};
use crate::config::{CacheConfig, ReplacementPolicyConfig};
use crate::error::ConfigError;
use crate::geometry::{DecomposedAddress, Geometry};
use crate::ghost::GhostLists;
use crate::replacement_policies::{AdaptiveReplacement, LeastFrequentlyUsed, LeastRecentlyUsed, ReplacementPolicy};

/// The kind of memory access a request performs
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Operation {
    Load,
    Store,
}

/// A line which has to be flushed because it was evicted
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct WriteBack {
    /// The block-aligned address the victim held
    pub address: u64,
    /// Whether the victim had been written to. Informational, every valid victim is written back
    pub dirty: bool,
}

/// The result of installing a missed line
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct InsertOutcome {
    /// The way the line was installed in
    pub way: usize,
    /// Present when the victim held a valid line
    pub write_back: Option<WriteBack>,
}

impl InsertOutcome {
    pub fn write_back_required(&self) -> bool {
        self.write_back.is_some()
    }

    pub fn evicted_address(&self) -> Option<u64> {
        self.write_back.map(|wb| wb.address)
    }
}

/// The result of a full request: a lookup and, on a miss, the insert that followed
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum RequestOutcome {
    Hit,
    Miss(InsertOutcome),
}

impl RequestOutcome {
    pub fn is_hit(&self) -> bool {
        matches!(self, RequestOutcome::Hit)
    }
}

/// A generic trait for caches
///
/// Requests are processed one at a time to completion. The timestamp is a logical clock supplied
/// by the caller, and must increase from one request to the next for recency to mean anything.
///
/// Addresses don't need to be aligned, the cache aligns them to its block size before indexing
pub trait CacheTrait {
    /// Looks a line up, returning true on a cache hit, and false otherwise
    ///
    /// A hit updates the line's timestamp, frequency and dirty bit, and lets the policy update
    /// its own state. A miss changes nothing.
    ///
    /// # Arguments
    ///
    /// * `address`: The address of the request
    /// * `operation`: Load or store, a store marks the line dirty
    /// * `timestamp`: The logical time of the request
    ///
    /// returns: bool
    fn access(&mut self, address: u64, operation: Operation, timestamp: u64) -> bool;

    /// Installs a line after a miss, evicting a victim from its set if the set is full
    ///
    /// Must only be called for a line which isn't resident
    ///
    /// returns: InsertOutcome, carrying the evicted address when a write-back is required
    fn insert(&mut self, address: u64, operation: Operation, timestamp: u64) -> InsertOutcome;

    /// Runs a full request, inserting the line if the lookup misses
    fn request(&mut self, address: u64, operation: Operation, timestamp: u64) -> RequestOutcome {
        if self.access(address, operation, timestamp) {
            RequestOutcome::Hit
        } else {
            RequestOutcome::Miss(self.insert(address, operation, timestamp))
        }
    }

    fn geometry(&self) -> &Geometry;

    /// The short name of the replacement policy
    fn policy_name(&self) -> &'static str;

    /// The blocks of a set, in way order
    fn set_blocks(&self, set: usize) -> &[CacheBlock];

    /// The ghost lists of a set, if the policy keeps them
    fn ghost_lists(&self, set: usize) -> Option<&GhostLists>;

    /// Gets the number of invalid blocks across the cache. Useful for analysing cache performance
    /// or debugging
    fn invalid_block_count(&self) -> usize;

    fn valid_block_count(&self, set: usize) -> usize {
        self.set_blocks(set).iter().filter(|block| block.valid).count()
    }
}

/// One associative set, a contiguous run of the block store
#[derive(Debug, Clone)]
struct Set {
    first: BlockId,
    num_ways: usize,
}

impl Set {
    #[inline]
    fn ways(&self) -> Range<BlockId> {
        self.first..self.first + self.num_ways
    }
}

/// A set-associative cache, parameterised by a replacement policy
///
/// Every block is allocated up front in a single store and addressed by index. Sets refer to
/// their blocks by index range, so nothing ever aliases the store, and blocks are only ever
/// invalidated and refilled, never freed.
///
/// We rely on monomorphisation so the policy calls inline into the lookup and insert paths
pub struct Cache<R: ReplacementPolicy> {
    geometry: Geometry,
    blocks: Vec<CacheBlock>,
    sets: Vec<Set>,
    replacement_policy: R,
}

impl<R: ReplacementPolicy> Cache<R> {
    pub fn new(geometry: Geometry, replacement_policy: R) -> Self {
        let num_ways = geometry.num_ways();
        let blocks = (0..geometry.num_blocks())
            .map(|id| CacheBlock::new(id / num_ways, id % num_ways))
            .collect();
        let sets = (0..geometry.num_sets())
            .map(|set| Set { first: set * num_ways, num_ways })
            .collect();
        debug!(
            "{} cache: {} blocks of {} bytes, {} sets of {} ways, set shift {}, tag shift {}",
            R::NAME,
            geometry.num_blocks(),
            geometry.block_size(),
            geometry.num_sets(),
            num_ways,
            geometry.set_shift(),
            geometry.tag_shift(),
        );
        Self {
            geometry,
            blocks,
            sets,
            replacement_policy,
        }
    }

    /// Gets a block by its slot
    pub fn block(&self, set: usize, way: usize) -> &CacheBlock {
        &self.blocks[self.sets[set].ways()][way]
    }

    pub fn policy(&self) -> &R {
        &self.replacement_policy
    }

    fn find_way(&self, set: usize, tag: u64) -> Option<usize> {
        self.blocks[self.sets[set].ways()].iter().position(|block| block.holds(tag))
    }
}

impl<R: ReplacementPolicy> CacheTrait for Cache<R> {
    fn access(&mut self, address: u64, operation: Operation, timestamp: u64) -> bool {
        let aligned = self.geometry.align(address);
        let DecomposedAddress { tag, set, .. } = self.geometry.decompose(aligned);
        match self.find_way(set, tag) {
            Some(way) => {
                let id = self.sets[set].first + way;
                self.blocks[id].touch(timestamp, operation == Operation::Store);
                self.replacement_policy.update_on_hit(set, aligned);
                true
            }
            None => false,
        }
    }

    fn insert(&mut self, address: u64, operation: Operation, timestamp: u64) -> InsertOutcome {
        let aligned = self.geometry.align(address);
        let DecomposedAddress { tag, set, .. } = self.geometry.decompose(aligned);
        debug_assert!(self.find_way(set, tag).is_none(), "inserting a resident line {aligned:#x}");
        self.replacement_policy.update_on_miss(set, aligned);

        let ways = self.sets[set].ways();
        let (way, write_back) = match self.blocks[ways.clone()].iter().position(|block| !block.valid) {
            // A free way, nothing to evict
            Some(way) => (way, None),
            None => {
                let way = self.replacement_policy.select_victim(set, &self.blocks[ways.clone()], &self.geometry);
                let victim = &mut self.blocks[ways.start + way];
                let write_back = WriteBack {
                    address: self.geometry.compose(victim.tag, victim.set_index),
                    dirty: victim.dirty,
                };
                trace!("set {set} way {way}: evicting {:#x} for {aligned:#x}", write_back.address);
                victim.invalidate();
                (way, Some(write_back))
            }
        };
        self.blocks[ways.start + way].install(tag, timestamp, operation == Operation::Store);
        InsertOutcome { way, write_back }
    }

    fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    fn policy_name(&self) -> &'static str {
        R::NAME
    }

    fn set_blocks(&self, set: usize) -> &[CacheBlock] {
        &self.blocks[self.sets[set].ways()]
    }

    fn ghost_lists(&self, set: usize) -> Option<&GhostLists> {
        self.replacement_policy.ghost_lists(set)
    }

    fn invalid_block_count(&self) -> usize {
        self.blocks.iter().filter(|block| !block.valid).count()
    }
}

/// Enum for the three policies provided by the library, chosen at runtime from a configuration
///
/// Trait objects would do the same job with less boilerplate, but dispatching through them for
/// every request of a trace is surprisingly slow, as it is completely opaque to the compiler
///
/// It's much faster to explicitly branch on all implementations, as the compiler can reason about
/// the concrete types, perform function inlining etc
pub enum GenericCache {
    LeastRecentlyUsed(Cache<LeastRecentlyUsed>),
    LeastFrequentlyUsed(Cache<LeastFrequentlyUsed>),
    AdaptiveReplacement(Cache<AdaptiveReplacement>),
}

impl From<Cache<LeastRecentlyUsed>> for GenericCache {
    fn from(value: Cache<LeastRecentlyUsed>) -> Self {
        Self::LeastRecentlyUsed(value)
    }
}

impl From<Cache<LeastFrequentlyUsed>> for GenericCache {
    fn from(value: Cache<LeastFrequentlyUsed>) -> Self {
        Self::LeastFrequentlyUsed(value)
    }
}

impl From<Cache<AdaptiveReplacement>> for GenericCache {
    fn from(value: Cache<AdaptiveReplacement>) -> Self {
        Self::AdaptiveReplacement(value)
    }
}

impl TryFrom<&CacheConfig> for GenericCache {
    type Error = ConfigError;

    /// Creates a new cache from a cache configuration, validating its geometry
    fn try_from(config: &CacheConfig) -> Result<Self, ConfigError> {
        let geometry = config.geometry()?;
        Ok(match config.replacement_policy {
            ReplacementPolicyConfig::LeastRecentlyUsed => {
                GenericCache::from(Cache::new(geometry, LeastRecentlyUsed))
            }
            ReplacementPolicyConfig::LeastFrequentlyUsed => {
                GenericCache::from(Cache::new(geometry, LeastFrequentlyUsed))
            }
            ReplacementPolicyConfig::AdaptiveReplacement => {
                GenericCache::from(Cache::new(geometry, AdaptiveReplacement::new(&geometry)))
            }
        })
    }
}

impl CacheTrait for GenericCache {
    fn access(&mut self, address: u64, operation: Operation, timestamp: u64) -> bool {
        match self {
            GenericCache::LeastRecentlyUsed(c) => c.access(address, operation, timestamp),
            GenericCache::LeastFrequentlyUsed(c) => c.access(address, operation, timestamp),
            GenericCache::AdaptiveReplacement(c) => c.access(address, operation, timestamp),
        }
    }

    fn insert(&mut self, address: u64, operation: Operation, timestamp: u64) -> InsertOutcome {
        match self {
            GenericCache::LeastRecentlyUsed(c) => c.insert(address, operation, timestamp),
            GenericCache::LeastFrequentlyUsed(c) => c.insert(address, operation, timestamp),
            GenericCache::AdaptiveReplacement(c) => c.insert(address, operation, timestamp),
        }
    }

    fn geometry(&self) -> &Geometry {
        match self {
            GenericCache::LeastRecentlyUsed(c) => c.geometry(),
            GenericCache::LeastFrequentlyUsed(c) => c.geometry(),
            GenericCache::AdaptiveReplacement(c) => c.geometry(),
        }
    }

    fn policy_name(&self) -> &'static str {
        match self {
            GenericCache::LeastRecentlyUsed(c) => c.policy_name(),
            GenericCache::LeastFrequentlyUsed(c) => c.policy_name(),
            GenericCache::AdaptiveReplacement(c) => c.policy_name(),
        }
    }

    fn set_blocks(&self, set: usize) -> &[CacheBlock] {
        match self {
            GenericCache::LeastRecentlyUsed(c) => c.set_blocks(set),
            GenericCache::LeastFrequentlyUsed(c) => c.set_blocks(set),
            GenericCache::AdaptiveReplacement(c) => c.set_blocks(set),
        }
    }

    fn ghost_lists(&self, set: usize) -> Option<&GhostLists> {
        match self {
            GenericCache::LeastRecentlyUsed(c) => c.ghost_lists(set),
            GenericCache::LeastFrequentlyUsed(c) => c.ghost_lists(set),
            GenericCache::AdaptiveReplacement(c) => c.ghost_lists(set),
        }
    }

    fn invalid_block_count(&self) -> usize {
        match self {
            GenericCache::LeastRecentlyUsed(c) => c.invalid_block_count(),
            GenericCache::LeastFrequentlyUsed(c) => c.invalid_block_count(),
            GenericCache::AdaptiveReplacement(c) => c.invalid_block_count(),
        }
    }
}
