use log::trace;
use crate::block::CacheBlock;
use crate::geometry::Geometry;
use crate::ghost::{GhostEntry, GhostLists};

/// A generic trait for implementing new replacement policies. Can be used to parameterise a Cache.
///
/// The cache owns the blocks and keeps their timestamps and frequencies up to date, a policy only
/// needs to keep whatever extra state it ranks lines by
pub trait ReplacementPolicy {
    /// Short name used in reports
    const NAME: &'static str;

    /// Updates the policy when a request hits a resident line
    ///
    /// Not applicable for some policies, a default which does nothing is provided
    ///
    /// # Arguments
    ///
    /// * `set`: The set the line lives in
    /// * `address`: The block-aligned address of the request
    ///
    /// returns: ()
    fn update_on_hit(&mut self, _set: usize, _address: u64) {}

    /// Updates the policy when a missed line is about to be inserted, before any victim is chosen
    ///
    /// This runs even when the set still has an invalid way to fill
    fn update_on_miss(&mut self, _set: usize, _address: u64) {}

    /// Chooses the way to evict from a full set
    ///
    /// Only called when every way is valid, so any index returned evicts a live line
    ///
    /// # Arguments
    ///
    /// * `set`: The set index
    /// * `ways`: The blocks of the set, in way order
    /// * `geometry`: The cache geometry, for policies which need to relate addresses to tags
    ///
    /// returns: usize, the way index of the victim
    fn select_victim(&mut self, set: usize, ways: &[CacheBlock], geometry: &Geometry) -> usize;

    /// The ghost lists of a set, for policies which keep them
    fn ghost_lists(&self, _set: usize) -> Option<&GhostLists> {
        None
    }
}

/// Finds the way with the smallest key, the lowest way index wins ties
#[inline]
fn least_by<F: Fn(&CacheBlock) -> u64>(ways: &[CacheBlock], key: F) -> usize {
    // Strict comparison keeps the first minimum
    let mut min_value = u64::MAX;
    let mut min_index = 0;
    let mut index = 0;
    while index < ways.len() {
        let value = key(&ways[index]);
        if value < min_value {
            min_value = value;
            min_index = index;
        }
        index += 1;
    }
    min_index
}

/// Least Recently Used replacement policy
///
/// Blocks already carry the logical time they were last touched, so this needs no state of its own
#[derive(Debug, Default)]
pub struct LeastRecentlyUsed;

impl ReplacementPolicy for LeastRecentlyUsed {
    const NAME: &'static str = "lru";

    fn select_victim(&mut self, _set: usize, ways: &[CacheBlock], _geometry: &Geometry) -> usize {
        least_by(ways, |block| block.last_touched)
    }
}

/// Least frequently used replacement policy
///
/// Frequencies restart at one whenever a line is installed, so a line's count only covers its
/// current residency
#[derive(Debug, Default)]
pub struct LeastFrequentlyUsed;

impl ReplacementPolicy for LeastFrequentlyUsed {
    const NAME: &'static str = "lfu";

    fn select_victim(&mut self, _set: usize, ways: &[CacheBlock], _geometry: &Geometry) -> usize {
        least_by(ways, |block| block.access_frequency)
    }
}

/// A simplified adaptive replacement policy
///
/// Each set keeps two ghost lists of addresses: `l1` for lines seen once and `l2` for lines seen
/// again while resident. Unlike full ARC there is no learned target size, the lists are trimmed
/// at fixed bounds: `l1` holds at most `num_ways` addresses, and both together at most
/// `2 * num_ways`.
///
/// When a full set misses, the address trimmed from a ghost list names the physical victim. The
/// lists and the physical contents can drift apart (a line evicted by the fallback keeps its ghost
/// entry), so if the trimmed address isn't resident the victim is picked by LRU instead.
#[derive(Debug)]
pub struct AdaptiveReplacement {
    sets: Vec<GhostLists>,
    num_ways: usize,
}

impl AdaptiveReplacement {
    pub fn new(geometry: &Geometry) -> Self {
        Self {
            sets: vec![GhostLists::default(); geometry.num_sets()],
            num_ways: geometry.num_ways(),
        }
    }

    /// Trims a ghost entry from the set, if either list has reached its bound
    fn evict_ghost(&mut self, set: usize) -> Option<GhostEntry> {
        let lists = &mut self.sets[set];
        if lists.l1.len() >= self.num_ways {
            lists.l1.pop_back()
        } else if lists.total_len() >= 2 * self.num_ways {
            lists.l2.pop_back()
        } else {
            None
        }
    }
}

impl ReplacementPolicy for AdaptiveReplacement {
    const NAME: &'static str = "arc";

    fn update_on_hit(&mut self, set: usize, address: u64) {
        let lists = &mut self.sets[set];
        // Seen again: promote to the front of l2, wherever it was
        match lists.l1.remove(address) {
            Some(entry) => lists.l2.push_front(entry),
            None => {
                if !lists.l2.move_to_front(address) {
                    lists.l2.push_front(GhostEntry::new(address));
                    if lists.total_len() > 2 * self.num_ways {
                        if let Some(dropped) = lists.l2.pop_back() {
                            trace!("set {set}: dropped ghost {:#x} from l2", dropped.address());
                        }
                    }
                }
            }
        }
    }

    fn update_on_miss(&mut self, set: usize, address: u64) {
        let lists = &mut self.sets[set];
        // A stale entry for a line evicted by the LRU fallback is reused rather than duplicated
        let entry = lists.take(address).unwrap_or_else(|| GhostEntry::new(address));
        lists.l1.push_front(entry);
    }

    fn select_victim(&mut self, set: usize, ways: &[CacheBlock], geometry: &Geometry) -> usize {
        if let Some(entry) = self.evict_ghost(set) {
            let tag = geometry.tag(entry.address());
            if let Some(way) = ways.iter().position(|block| block.holds(tag)) {
                return way;
            }
            trace!("set {set}: ghost {:#x} is not resident, falling back to lru", entry.address());
        }
        least_by(ways, |block| block.last_touched)
    }

    fn ghost_lists(&self, set: usize) -> Option<&GhostLists> {
        self.sets.get(set)
    }
}
