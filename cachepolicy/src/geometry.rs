use crate::error::ConfigError;

/// An address split into the fields used to index the cache
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct DecomposedAddress {
    pub tag: u64,
    pub set: usize,
    pub offset: u64,
}

/// The fixed shape of a cache, and the shifts and masks derived from it
///
/// All three inputs must be powers of two, so every field of an address is a contiguous run of
/// bits:
///
/// ```text
///  63            tag_shift   set_shift        0
///  |     tag     |    set    |    offset     |
/// ```
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Geometry {
    block_size: u64,
    num_blocks: usize,
    num_sets: usize,
    num_ways: usize,
    set_shift: u32,
    tag_shift: u32,
    set_mask: u64,
    block_mask: u64,
}

impl Geometry {
    /// Validates a cache shape and derives its addressing constants
    ///
    /// # Arguments
    ///
    /// * `block_size`: Bytes per cache line
    /// * `cache_size`: Total capacity in bytes
    /// * `associativity`: Ways per set
    ///
    /// returns: Result<Geometry, ConfigError>
    ///
    /// # Examples
    ///
    /// ```
    /// use cachepolicy::geometry::Geometry;
    /// let geometry = Geometry::new(16, 1024, 2).unwrap();
    /// assert_eq!(geometry.num_sets(), 32);
    /// assert_eq!(geometry.tag_shift(), 9);
    /// assert!(Geometry::new(16, 1024, 3).is_err());
    /// ```
    pub fn new(block_size: u64, cache_size: u64, associativity: u64) -> Result<Self, ConfigError> {
        check_power_of_two("block_size", block_size)?;
        check_power_of_two("cache_size", cache_size)?;
        check_power_of_two("associativity", associativity)?;
        if block_size > cache_size {
            return Err(ConfigError::BlockLargerThanCache { block_size, cache_size });
        }
        let num_blocks = cache_size / block_size;
        // Both are powers of two, so divisibility is just an ordering check
        if associativity > num_blocks || num_blocks % associativity != 0 {
            return Err(ConfigError::AssociativityTooLarge { associativity, num_blocks });
        }
        let num_sets = num_blocks / associativity;
        let set_shift = block_size.trailing_zeros();
        Ok(Self {
            block_size,
            num_blocks: num_blocks as usize,
            num_sets: num_sets as usize,
            num_ways: associativity as usize,
            set_shift,
            tag_shift: set_shift + num_sets.trailing_zeros(),
            set_mask: num_sets - 1,
            block_mask: block_size - 1,
        })
    }

    pub fn block_size(&self) -> u64 {
        self.block_size
    }

    pub fn num_blocks(&self) -> usize {
        self.num_blocks
    }

    pub fn num_sets(&self) -> usize {
        self.num_sets
    }

    pub fn num_ways(&self) -> usize {
        self.num_ways
    }

    pub fn set_shift(&self) -> u32 {
        self.set_shift
    }

    pub fn tag_shift(&self) -> u32 {
        self.tag_shift
    }

    /// Clears the offset bits of an address
    #[inline]
    pub fn align(&self, address: u64) -> u64 {
        address & !self.block_mask
    }

    #[inline]
    pub fn tag(&self, address: u64) -> u64 {
        address >> self.tag_shift
    }

    #[inline]
    pub fn set_index(&self, address: u64) -> usize {
        ((address >> self.set_shift) & self.set_mask) as usize
    }

    /// Splits an address into tag, set index and block offset
    ///
    /// # Examples
    ///
    /// ```
    /// use cachepolicy::geometry::Geometry;
    /// let geometry = Geometry::new(16, 1024, 2).unwrap();
    /// let parts = geometry.decompose(0x20f);
    /// assert_eq!((parts.tag, parts.set, parts.offset), (1, 0, 0xf));
    /// ```
    #[inline]
    pub fn decompose(&self, address: u64) -> DecomposedAddress {
        DecomposedAddress {
            tag: self.tag(address),
            set: self.set_index(address),
            offset: address & self.block_mask,
        }
    }

    /// Rebuilds the block-aligned address a (tag, set) pair was decomposed from
    ///
    /// This is how a victim's write-back address is recovered from its stale tag
    #[inline]
    pub fn compose(&self, tag: u64, set: usize) -> u64 {
        (tag << self.tag_shift) | ((set as u64) << self.set_shift)
    }
}

fn check_power_of_two(field: &'static str, value: u64) -> Result<(), ConfigError> {
    if value.is_power_of_two() {
        Ok(())
    } else {
        Err(ConfigError::NotPowerOfTwo { field, value })
    }
}
