//! Key extraction.
//!
//! Every extractor is a pure function of its input: invalid or missing
//! data yields no key, never an error. Keys outside a registered domain
//! are dropped here so the partitioner only ever sees valid members.

use crate::domain::{Hour, Month};
use regex::Regex;

/// Word tokens of a line: maximal runs of alphanumeric/underscore
/// characters. Shared by the IP reconstruction, the status extractor and
/// the word count pipeline.
pub fn word_tokens(line: &str) -> impl Iterator<Item = &str> {
    line.split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|t| !t.is_empty())
}

fn is_octet_token(token: &str) -> bool {
    (1..=3).contains(&token.len()) && token.bytes().all(|b| b.is_ascii_digit())
}

/// Reconstruct IPv4 addresses from token runs: consecutive octet-shaped
/// tokens (1-3 digits) joined with `.`, four at a time. Every completed
/// group of four emits; any other token resets the run. A line may yield
/// several addresses or none.
pub fn octet_run_ips(line: &str) -> Vec<String> {
    let mut keys = Vec::new();
    let mut run: Vec<&str> = Vec::with_capacity(4);
    for token in word_tokens(line) {
        if is_octet_token(token) {
            run.push(token);
            if run.len() == 4 {
                keys.push(run.join("."));
                run.clear();
            }
        } else {
            run.clear();
        }
    }
    keys
}

/// Pattern-based IPv4 extraction. When a line contains several candidate
/// addresses, the last one wins; callers depend on this tie-break.
pub struct Ipv4Pattern {
    re: Regex,
}

impl Ipv4Pattern {
    pub fn new() -> Self {
        Ipv4Pattern {
            re: Regex::new(r"[0-9]{1,3}\.[0-9]{1,3}\.[0-9]{1,3}\.[0-9]{1,3}").unwrap(),
        }
    }

    pub fn last_match<'a>(&self, line: &'a str) -> Option<&'a str> {
        self.re.find_iter(line).last().map(|m| m.as_str())
    }
}

impl Default for Ipv4Pattern {
    fn default() -> Self {
        Self::new()
    }
}

/// Month from a parsed timestamp `DD/Mon/YYYY:HH:MM:SS`.
pub fn month_of(timestamp: &str) -> Option<Month> {
    Month::from_token(timestamp.split('/').nth(1)?)
}

/// Hour from a parsed timestamp: the `HH` of the third `/`-segment
/// `YYYY:HH:MM:SS`, at fixed offset 5..7.
pub fn hour_of(timestamp: &str) -> Option<Hour> {
    let segment = timestamp.split('/').nth(2)?;
    Hour::from_token(segment.get(5..7)?)
}

/// The response code position: second-to-last word token of the raw line.
pub fn status_token(line: &str) -> Option<&str> {
    let tokens: Vec<&str> = word_tokens(line).collect();
    if tokens.len() < 2 {
        return None;
    }
    Some(tokens[tokens.len() - 2])
}
