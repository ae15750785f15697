use std::io::BufRead;
use lazy_static::lazy_static;
use regex::Regex;
use crate::cache::Operation;
use crate::error::TraceError;

lazy_static! {
    // `[pc] <op> <address>`, fields separated by whitespace
    static ref REQUEST_LINE: Regex =
        Regex::new(r"^(?:(?P<pc>\S+)\s+)?(?P<op>[A-Za-z]+)\s+(?P<address>\S+)$").unwrap();
}

/// A single memory access from a trace
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Request {
    pub address: u64,
    pub operation: Operation,
}

impl Request {
    pub fn load(address: u64) -> Self {
        Self { address, operation: Operation::Load }
    }

    pub fn store(address: u64) -> Self {
        Self { address, operation: Operation::Store }
    }
}

/// Parses a number, hexadecimal with a `0x` prefix, decimal otherwise
///
/// # Examples
///
/// ```
/// use cachepolicy::trace::parse_number;
/// assert_eq!(parse_number("0x200"), Some(512));
/// assert_eq!(parse_number("512"), Some(512));
/// assert_eq!(parse_number("0xZZ"), None);
/// ```
pub fn parse_number(text: &str) -> Option<u64> {
    match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16).ok(),
        None => text.parse().ok(),
    }
}

fn parse_operation(op: &str) -> Option<Operation> {
    match op.to_ascii_uppercase().as_str() {
        "L" | "R" | "LOAD" => Some(Operation::Load),
        "S" | "W" | "STORE" => Some(Operation::Store),
        _ => None,
    }
}

/// Parses one line of a trace
///
/// Blank lines and `#` comments yield `Ok(None)`
///
/// # Arguments
///
/// * `line`: The line, without its terminator
/// * `line_number`: One-based line number, for error messages
///
/// returns: Result<Option<Request>, TraceError>
///
/// # Examples
///
/// ```
/// use cachepolicy::trace::{parse_request, Request};
/// assert_eq!(parse_request("S 0x400", 1).unwrap(), Some(Request::store(0x400)));
/// assert_eq!(parse_request("0x4005d0 L 0x7ffd1000", 2).unwrap(), Some(Request::load(0x7ffd1000)));
/// assert_eq!(parse_request("# comment", 3).unwrap(), None);
/// ```
pub fn parse_request(line: &str, line_number: usize) -> Result<Option<Request>, TraceError> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    let captures = REQUEST_LINE.captures(line).ok_or_else(|| TraceError::Malformed {
        line: line_number,
        content: line.to_string(),
    })?;
    let op = &captures["op"];
    let operation = parse_operation(op).ok_or_else(|| TraceError::BadOperation {
        line: line_number,
        op: op.to_string(),
    })?;
    let address_text = &captures["address"];
    let address = parse_number(address_text).ok_or_else(|| TraceError::BadAddress {
        line: line_number,
        address: address_text.to_string(),
    })?;
    Ok(Some(Request { address, operation }))
}

/// Reads requests from a trace in order, one line at a time
///
/// There is no look-ahead, each request is parsed as it is asked for
pub struct TraceReader<R: BufRead> {
    reader: R,
    buffer: Vec<u8>,
    line_number: usize,
}

impl<R: BufRead> TraceReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buffer: Vec::new(),
            line_number: 0,
        }
    }
}

impl<R: BufRead> Iterator for TraceReader<R> {
    type Item = Result<Request, TraceError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.buffer.clear();
            match self.reader.read_until(b'\n', &mut self.buffer) {
                Ok(0) => return None,
                Ok(_) => {}
                Err(e) => return Some(Err(e.into())),
            }
            // Counted before decoding, so a bad line doesn't shift the numbering of later ones
            self.line_number += 1;
            let line = match std::str::from_utf8(&self.buffer) {
                Ok(line) => line,
                Err(_) => return Some(Err(TraceError::InvalidUtf8 { line: self.line_number })),
            };
            match parse_request(line, self.line_number) {
                Ok(Some(request)) => return Some(Ok(request)),
                Ok(None) => continue,
                Err(e) => return Some(Err(e)),
            }
        }
    }
}
