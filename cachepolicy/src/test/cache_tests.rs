use std::collections::HashSet;
use crate::block::{BlockState, UNSET};
use crate::cache::{Cache, CacheTrait, GenericCache, Operation, RequestOutcome, WriteBack};
use crate::config::{CacheConfig, ReplacementPolicyConfig};
use crate::error::ConfigError;
use crate::geometry::Geometry;
use crate::replacement_policies::{AdaptiveReplacement, LeastFrequentlyUsed, LeastRecentlyUsed, ReplacementPolicy};
use crate::util::mixed_trace;

use Operation::{Load, Store};

/// 16 byte lines, 1KiB, 2 ways: 64 blocks in 32 sets
fn small_geometry() -> Geometry {
    Geometry::new(16, 1024, 2).unwrap()
}

/// A single set, so every address conflicts
fn one_set(ways: u64) -> Geometry {
    Geometry::new(16, 16 * ways, ways).unwrap()
}

fn arc_cache(geometry: Geometry) -> Cache<AdaptiveReplacement> {
    Cache::new(geometry, AdaptiveReplacement::new(&geometry))
}

fn evicted(outcome: RequestOutcome) -> Option<u64> {
    match outcome {
        RequestOutcome::Hit => panic!("expected a miss"),
        RequestOutcome::Miss(insert) => insert.evicted_address(),
    }
}

fn ghost_contents<C: CacheTrait>(cache: &C, set: usize) -> (Vec<u64>, Vec<u64>) {
    let lists = cache.ghost_lists(set).expect("policy keeps ghost lists");
    (lists.l1.iter().collect(), lists.l2.iter().collect())
}

#[test]
fn geometry_derives_shifts_and_masks() {
    let geometry = small_geometry();
    assert_eq!(geometry.num_blocks(), 64);
    assert_eq!(geometry.num_sets(), 32);
    assert_eq!(geometry.set_shift(), 4);
    assert_eq!(geometry.tag_shift(), 9);
    let parts = geometry.decompose(0x400);
    assert_eq!((parts.tag, parts.set, parts.offset), (2, 0, 0));
    let parts = geometry.decompose(0x1234_5678);
    assert_eq!(parts.offset, 0x8);
    assert_eq!(parts.set, 0x7);
    assert_eq!(parts.tag, 0x1234_5678 >> 9);
}

#[test]
fn decomposition_round_trips_to_the_aligned_address() {
    let geometries = [
        small_geometry(),
        Geometry::new(64, 2048 * 1024, 16).unwrap(),
        Geometry::new(1, 1, 1).unwrap(),
        Geometry::new(32, 32 * 8, 8).unwrap(),
    ];
    let addresses = [0, 1, 0xf, 0x200, 0x7fff_ffff_ffff, u64::MAX, 0xdead_beef_cafe_f00d];
    for geometry in geometries {
        for address in addresses.iter().copied().chain(mixed_trace(500, 4096, 3, 7).iter().map(|r| r.address * 0x9e37)) {
            let parts = geometry.decompose(address);
            assert_eq!(geometry.compose(parts.tag, parts.set), geometry.align(address), "{geometry:?} {address:#x}");
            assert_eq!(geometry.align(address) | parts.offset, address);
        }
    }
}

#[test]
fn inconsistent_geometry_is_rejected() {
    assert!(matches!(Geometry::new(16, 1024, 3), Err(ConfigError::NotPowerOfTwo { field: "associativity", value: 3 })));
    assert!(matches!(Geometry::new(24, 1024, 2), Err(ConfigError::NotPowerOfTwo { field: "block_size", .. })));
    assert!(matches!(Geometry::new(16, 1000, 2), Err(ConfigError::NotPowerOfTwo { field: "cache_size", .. })));
    assert!(matches!(Geometry::new(0, 1024, 2), Err(ConfigError::NotPowerOfTwo { .. })));
    assert!(matches!(Geometry::new(2048, 1024, 1), Err(ConfigError::BlockLargerThanCache { .. })));
    assert!(matches!(Geometry::new(16, 64, 8), Err(ConfigError::AssociativityTooLarge { associativity: 8, num_blocks: 4 })));
    // Fully associative is fine
    assert_eq!(Geometry::new(16, 64, 4).unwrap().num_sets(), 1);
}

#[test]
fn new_cache_is_entirely_invalid() {
    let cache = Cache::new(small_geometry(), LeastRecentlyUsed);
    assert_eq!(cache.invalid_block_count(), 64);
    for set in 0..32 {
        for (way, block) in cache.set_blocks(set).iter().enumerate() {
            assert_eq!(block.state(), BlockState::Invalid);
            assert_eq!(block.tag, UNSET);
            assert_eq!((block.last_touched, block.access_frequency), (0, 0));
            assert_eq!((block.set_index, block.way_index), (set, way));
        }
    }
    assert!(cache.ghost_lists(0).is_none());
}

#[test]
fn lru_scenario_evicts_the_untouched_line() {
    let mut cache = Cache::new(small_geometry(), LeastRecentlyUsed);
    assert_eq!(evicted(cache.request(0x000, Load, 0)), None);
    assert_eq!(evicted(cache.request(0x200, Load, 1)), None);
    assert_eq!(cache.valid_block_count(0), 2);
    assert!(cache.request(0x000, Load, 2).is_hit());
    let outcome = cache.request(0x400, Load, 3);
    assert_eq!(
        outcome,
        RequestOutcome::Miss(crate::cache::InsertOutcome {
            way: 1,
            write_back: Some(WriteBack { address: 0x200, dirty: false }),
        })
    );
    assert_eq!(cache.block(0, 1).tag, 2);
    assert!(cache.access(0x000, Load, 4));
    assert!(!cache.access(0x200, Load, 5));
}

#[test]
fn lru_scenario_without_reuse_evicts_the_oldest() {
    let mut cache = Cache::new(small_geometry(), LeastRecentlyUsed);
    cache.request(0x000, Load, 0);
    cache.request(0x200, Load, 1);
    assert_eq!(evicted(cache.request(0x400, Load, 2)), Some(0x000));
}

#[test]
fn lru_evicts_least_recently_touched_of_k_plus_one() {
    for ways in [1u64, 2, 4, 8] {
        let geometry = Geometry::new(16, 16 * ways * 4, ways).unwrap();
        let mut cache = Cache::new(geometry, LeastRecentlyUsed);
        // Every address maps to set 1
        let stride = 1u64 << geometry.tag_shift();
        let address = |i: u64| i * stride + 16;
        for i in 0..ways {
            assert_eq!(evicted(cache.request(address(i), Load, i)), None);
        }
        // Touch all but the second in order, the second becomes the oldest
        let mut time = ways;
        for i in (0..ways).filter(|&i| i != 1 || ways == 1) {
            assert!(cache.request(address(i), Load, time).is_hit());
            time += 1;
        }
        let expected = if ways == 1 { address(0) } else { address(1) };
        assert_eq!(evicted(cache.request(address(ways), Load, time)), Some(expected), "{ways} ways");
    }
}

#[test]
fn lfu_protects_the_frequently_used_line() {
    let mut cache = Cache::new(one_set(2), LeastFrequentlyUsed);
    cache.request(0x00, Load, 0);
    cache.request(0x10, Load, 1);
    for time in 2..5 {
        assert!(cache.request(0x00, Load, time).is_hit());
    }
    assert_eq!(cache.block(0, 0).access_frequency, 4);
    assert_eq!(evicted(cache.request(0x20, Load, 5)), Some(0x10));
    // The newcomer starts again at one and goes first
    assert_eq!(cache.block(0, 1).access_frequency, 1);
    assert_eq!(evicted(cache.request(0x30, Load, 6)), Some(0x20));
    assert!(cache.access(0x00, Load, 7));
}

#[test]
fn lfu_ties_go_to_the_lowest_way() {
    let mut cache = Cache::new(one_set(4), LeastFrequentlyUsed);
    for (time, address) in [0x00, 0x10, 0x20, 0x30].into_iter().enumerate() {
        cache.request(address, Load, time as u64);
    }
    // Every way is on frequency one
    let outcome = cache.request(0x40, Load, 10);
    assert_eq!(evicted(outcome), Some(0x00));
    // Now raise ways 1 and 2, way 3 is the only frequency one
    cache.request(0x10, Load, 11);
    cache.request(0x20, Load, 12);
    cache.request(0x40, Load, 13);
    assert_eq!(evicted(cache.request(0x50, Load, 14)), Some(0x30));
}

#[test]
fn block_states_follow_loads_and_stores() {
    let mut cache = Cache::new(one_set(2), LeastRecentlyUsed);
    cache.request(0x00, Load, 0);
    assert_eq!(cache.block(0, 0).state(), BlockState::Clean);
    cache.request(0x10, Store, 1);
    assert_eq!(cache.block(0, 1).state(), BlockState::Dirty);
    cache.request(0x00, Store, 2);
    assert_eq!(cache.block(0, 0).state(), BlockState::Dirty);
    // A load hit doesn't clean the line
    cache.request(0x00, Load, 3);
    assert_eq!(cache.block(0, 0).state(), BlockState::Dirty);

    let outcome = cache.request(0x20, Load, 4);
    assert_eq!(
        outcome,
        RequestOutcome::Miss(crate::cache::InsertOutcome {
            way: 1,
            write_back: Some(WriteBack { address: 0x10, dirty: true }),
        })
    );
    let block = cache.block(0, 1);
    assert_eq!(block.state(), BlockState::Clean);
    assert_eq!((block.tag, block.last_touched, block.access_frequency), (2, 4, 1));
}

#[test]
fn clean_victims_still_require_a_write_back() {
    let mut cache = Cache::new(one_set(1), LeastRecentlyUsed);
    cache.request(0x00, Load, 0);
    match cache.request(0x10, Load, 1) {
        RequestOutcome::Miss(insert) => {
            assert!(insert.write_back_required());
            assert_eq!(insert.write_back, Some(WriteBack { address: 0x00, dirty: false }));
        }
        RequestOutcome::Hit => panic!("expected a miss"),
    }
}

#[test]
fn unaligned_requests_hit_their_line() {
    let mut cache = Cache::new(small_geometry(), LeastRecentlyUsed);
    assert!(!cache.access(0x205, Load, 0));
    cache.insert(0x205, Load, 0);
    assert!(cache.access(0x200, Load, 1));
    assert!(cache.access(0x20f, Store, 2));
    assert!(!cache.access(0x210, Load, 3));
    assert_eq!(evicted(cache.request(0x00, Load, 4)), None);
    // Write-back addresses come back aligned
    assert_eq!(evicted(cache.request(0x40b, Load, 5)), Some(0x200));
}

#[test]
fn sets_never_exceed_their_ways() {
    let geometry = Geometry::new(16, 512, 4).unwrap();
    let trace = mixed_trace(5000, 200, 16, 99);
    let mut caches: Vec<GenericCache> = vec![
        GenericCache::from(Cache::new(geometry, LeastRecentlyUsed)),
        GenericCache::from(Cache::new(geometry, LeastFrequentlyUsed)),
        GenericCache::from(arc_cache(geometry)),
    ];
    for cache in caches.iter_mut() {
        for (time, request) in trace.iter().enumerate() {
            cache.request(request.address, request.operation, time as u64);
            let set = geometry.set_index(request.address);
            // The requested line is always resident afterwards
            assert!(cache.access(request.address, Load, time as u64));
            let tags: Vec<u64> = cache.set_blocks(set).iter().filter(|b| b.valid).map(|b| b.tag).collect();
            assert!(tags.len() <= geometry.num_ways());
            let unique: HashSet<u64> = tags.iter().copied().collect();
            assert_eq!(unique.len(), tags.len(), "duplicate line in set {set}");
        }
        assert_eq!(cache.invalid_block_count(), 0, "{}", cache.policy_name());
    }
}

#[test]
fn arc_hits_promote_into_l2() {
    let mut cache = arc_cache(one_set(4));
    cache.request(0x00, Load, 0);
    cache.request(0x10, Load, 1);
    assert_eq!(ghost_contents(&cache, 0), (vec![0x10, 0x00], vec![]));
    cache.request(0x00, Load, 2);
    assert_eq!(ghost_contents(&cache, 0), (vec![0x10], vec![0x00]));
    cache.request(0x10, Load, 3);
    assert_eq!(ghost_contents(&cache, 0), (vec![], vec![0x10, 0x00]));
    // Already in l2, just moves up
    cache.request(0x00, Load, 4);
    assert_eq!(ghost_contents(&cache, 0), (vec![], vec![0x00, 0x10]));
}

#[test]
fn arc_hits_on_unlisted_lines_enter_l2_and_trim_it() {
    let (a, b, c) = (0x00, 0x10, 0x20);
    let mut cache = arc_cache(one_set(1));
    cache.request(a, Load, 0);
    assert!(matches!(cache.request(a, Load, 1), RequestOutcome::Hit));
    // b's own entry is the l1 tail that gets trimmed, so the fallback evicts a
    assert_eq!(evicted(cache.request(b, Load, 2)), Some(a));
    let lists = cache.policy().ghost_lists(0).unwrap();
    assert!(!lists.l1.contains(b) && !lists.l2.contains(b));
    assert_eq!(ghost_contents(&cache, 0), (vec![], vec![a]));

    // Resident but listed nowhere
    assert!(matches!(cache.request(b, Load, 3), RequestOutcome::Hit));
    assert_eq!(ghost_contents(&cache, 0), (vec![], vec![b, a]));

    assert_eq!(evicted(cache.request(c, Load, 4)), Some(b));
    assert_eq!(ghost_contents(&cache, 0), (vec![], vec![b, a]));
    // A third l2 entry exceeds twice the ways, the tail goes
    assert!(matches!(cache.request(c, Load, 5), RequestOutcome::Hit));
    assert_eq!(ghost_contents(&cache, 0), (vec![], vec![c, b]));
    assert_eq!(cache.policy().ghost_lists(0).map(|lists| lists.total_len()), Some(2));
}

#[test]
fn arc_victims_follow_the_ghost_lists() {
    let (a, b, c, d, e) = (0x00, 0x10, 0x20, 0x30, 0x40);
    let mut cache = arc_cache(one_set(2));
    cache.request(a, Load, 0);
    cache.request(b, Load, 1);
    cache.request(b, Load, 2);
    cache.request(a, Load, 3);
    assert_eq!(ghost_contents(&cache, 0), (vec![], vec![a, b]));

    // Lists below their bounds: plain LRU between a (3) and b (2)
    assert_eq!(evicted(cache.request(c, Load, 4)), Some(b));
    assert_eq!(ghost_contents(&cache, 0), (vec![c], vec![a, b]));

    // l1 reaches two entries, its tail c is the victim even though a is older
    assert_eq!(evicted(cache.request(d, Load, 5)), Some(c));
    assert_eq!(ghost_contents(&cache, 0), (vec![d], vec![a, b]));

    // Fill l2 so the combined bound trims it, its tail b is no longer resident
    cache.request(a, Load, 6);
    cache.request(d, Load, 7);
    assert_eq!(ghost_contents(&cache, 0), (vec![], vec![d, a, b]));
    assert_eq!(evicted(cache.request(e, Load, 8)), Some(a));
    assert_eq!(ghost_contents(&cache, 0), (vec![e], vec![d, a]));

    // a comes back after its eviction: the stale l2 entry moves to l1 rather than duplicating
    assert_eq!(evicted(cache.request(a, Load, 9)), Some(e));
    assert_eq!(ghost_contents(&cache, 0), (vec![a], vec![d]));
}

#[test]
fn lru_and_arc_diverge_on_the_same_requests() {
    let requests = [(0x00, 0), (0x10, 1), (0x10, 2), (0x00, 3), (0x20, 4)];
    let mut lru = Cache::new(one_set(2), LeastRecentlyUsed);
    let mut arc = arc_cache(one_set(2));
    for (address, time) in requests {
        lru.request(address, Load, time);
        arc.request(address, Load, time);
    }
    assert_eq!(evicted(lru.request(0x30, Load, 5)), Some(0x00));
    assert_eq!(evicted(arc.request(0x30, Load, 5)), Some(0x20));
}

#[test]
fn arc_ghost_lists_stay_bounded_and_disjoint() {
    for ways in [1u64, 2, 4, 8] {
        let geometry = Geometry::new(16, 16 * ways * 8, ways).unwrap();
        let mut cache = arc_cache(geometry);
        let trace = mixed_trace(4000, 96, 16, ways + 3);
        for (time, request) in trace.iter().enumerate() {
            cache.request(request.address, request.operation, time as u64);
            for set in 0..geometry.num_sets() {
                let lists = cache.ghost_lists(set).unwrap();
                assert!(lists.l1.len() <= geometry.num_ways(), "l1 overflow with {ways} ways");
                assert!(lists.total_len() <= 2 * geometry.num_ways(), "ghost overflow with {ways} ways");
                assert!(lists.l2.iter().all(|address| !lists.l1.contains(address)));
                // Every ghost address belongs to the set that lists it
                assert!(lists.l1.iter().chain(lists.l2.iter()).all(|address| geometry.set_index(address) == set));
            }
        }
    }
}

#[test]
fn generic_cache_is_built_from_configuration() {
    let mut config = CacheConfig {
        name: "test".to_string(),
        block_size: 16,
        cache_size: 1024,
        associativity: 2,
        replacement_policy: ReplacementPolicyConfig::AdaptiveReplacement,
    };
    let cache = GenericCache::try_from(&config).unwrap();
    assert_eq!(cache.policy_name(), "arc");
    assert!(cache.ghost_lists(31).is_some());
    assert_eq!(cache.geometry().tag_shift(), 9);

    config.replacement_policy = ReplacementPolicyConfig::LeastFrequentlyUsed;
    assert_eq!(GenericCache::try_from(&config).unwrap().policy_name(), "lfu");

    config.associativity = 128;
    assert!(GenericCache::try_from(&config).is_err());
}
