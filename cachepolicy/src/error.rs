use thiserror::Error;

/// Raised when a cache configuration cannot be turned into a consistent geometry
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{field} must be a non-zero power of two, got {value}")]
    NotPowerOfTwo { field: &'static str, value: u64 },
    #[error("block size {block_size} is larger than the cache size {cache_size}")]
    BlockLargerThanCache { block_size: u64, cache_size: u64 },
    #[error("associativity {associativity} does not evenly divide the {num_blocks} blocks of the cache")]
    AssociativityTooLarge { associativity: u64, num_blocks: u64 },
    #[error("the configuration does not list any caches")]
    NoCaches,
    #[error("couldn't parse the configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Raised while reading a trace
#[derive(Error, Debug)]
pub enum TraceError {
    #[error("couldn't read the trace: {0}")]
    Io(#[from] std::io::Error),
    #[error("line {line}: not valid UTF-8")]
    InvalidUtf8 { line: usize },
    #[error("line {line}: expected `[pc] <op> <address>`, got {content:?}")]
    Malformed { line: usize, content: String },
    #[error("line {line}: unknown operation {op:?}")]
    BadOperation { line: usize, op: String },
    #[error("line {line}: couldn't parse address {address:?}")]
    BadAddress { line: usize, address: String },
}
