/// Tag held by a block which doesn't contain a line
pub const UNSET: u64 = u64::MAX;

/// Index of a block in the cache's block store
pub type BlockId = usize;

/// The coherence-free state of a single line
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum BlockState {
    Invalid,
    Clean,
    Dirty,
}

/// Metadata for one cache line
///
/// Every block is created with the cache and keeps its (set, way) slot forever, only the contents
/// are replaced
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct CacheBlock {
    pub tag: u64,
    pub valid: bool,
    pub dirty: bool,
    pub last_touched: u64,
    pub access_frequency: u64,
    pub set_index: usize,
    pub way_index: usize,
}

impl CacheBlock {
    pub fn new(set_index: usize, way_index: usize) -> Self {
        Self {
            tag: UNSET,
            valid: false,
            dirty: false,
            last_touched: 0,
            access_frequency: 0,
            set_index,
            way_index,
        }
    }

    pub fn state(&self) -> BlockState {
        match (self.valid, self.dirty) {
            (false, _) => BlockState::Invalid,
            (true, false) => BlockState::Clean,
            (true, true) => BlockState::Dirty,
        }
    }

    /// Whether this block currently holds the line with the given tag
    #[inline]
    pub fn holds(&self, tag: u64) -> bool {
        self.valid && self.tag == tag
    }

    /// Records a hit on this block
    #[inline]
    pub fn touch(&mut self, timestamp: u64, store: bool) {
        self.last_touched = timestamp;
        self.access_frequency += 1;
        if store {
            self.dirty = true;
        }
    }

    /// Returns the block to the invalid state, clearing all metadata but its slot
    pub fn invalidate(&mut self) {
        self.tag = UNSET;
        self.valid = false;
        self.dirty = false;
        self.last_touched = 0;
        self.access_frequency = 0;
    }

    /// Installs a new line, the block must be invalid
    pub fn install(&mut self, tag: u64, timestamp: u64, store: bool) {
        debug_assert!(!self.valid, "installing over a valid block");
        self.tag = tag;
        self.valid = true;
        self.last_touched = timestamp;
        self.access_frequency = 1;
        self.dirty = store;
    }
}
