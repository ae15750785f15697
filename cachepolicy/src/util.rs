use crate::cache::Operation;
use crate::trace::Request;

/// A deterministic xorshift generator, enough to scatter addresses for tests and benchmarks
struct XorShift(u64);

impl XorShift {
    fn next(&mut self) -> u64 {
        self.0 ^= self.0 << 13;
        self.0 ^= self.0 >> 7;
        self.0 ^= self.0 << 17;
        self.0
    }
}

/// Builds a synthetic trace with a hot working set and a cold streaming component
///
/// Roughly one request in four is a store. Addresses of the hot set are revisited throughout,
/// the cold ones are mostly seen once, which separates the policies' hit rates
///
/// # Arguments
///
/// * `length`: The number of requests
/// * `hot_lines`: The number of distinct lines in the hot set
/// * `line_size`: The stride between lines
/// * `seed`: Any non-zero seed
///
/// returns: Vec<Request>
pub fn mixed_trace(length: usize, hot_lines: u64, line_size: u64, seed: u64) -> Vec<Request> {
    let mut rng = XorShift(seed.max(1));
    let mut cold = 1u64 << 32;
    (0..length)
        .map(|_| {
            let roll = rng.next();
            let address = if roll % 3 == 0 {
                cold += line_size;
                cold
            } else {
                (roll >> 8) % hot_lines.max(1) * line_size
            };
            if roll % 4 == 0 {
                Request::store(address)
            } else {
                Request::load(address)
            }
        })
        .collect()
}

/// Renders requests in the text trace format
pub fn to_trace_text(requests: &[Request]) -> String {
    requests
        .iter()
        .map(|request| {
            let op = match request.operation {
                Operation::Load => 'L',
                Operation::Store => 'S',
            };
            format!("{op} {:#x}\n", request.address)
        })
        .collect()
}
