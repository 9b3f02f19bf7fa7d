//! Fixed, bounded key domains used for partitioned pipelines.
//!
//! The partitioner and the sink routing share one table per domain: a key
//! carries its own bucket index and container name, so the two can never
//! drift apart. Values outside a domain are unrepresentable; extraction
//! returns `None` instead and the record is dropped before partitioning.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::Hash;

/// A key domain with a fixed number of buckets and a total, injective
/// mapping from members to bucket indices in `[0, SIZE)`.
pub trait BucketDomain: Copy + Eq + Ord + Hash + Send + 'static {
    const SIZE: usize;
    fn bucket(self) -> usize;
}

/// A bucket domain whose members additionally name a destination container
/// in the document store.
pub trait ContainerDomain: BucketDomain {
    fn container(self) -> &'static str;
    fn containers() -> &'static [&'static str];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Month {
    Jan,
    Feb,
    Mar,
    Apr,
    May,
    Jun,
    Jul,
    Aug,
    Sep,
    Oct,
    Nov,
    Dec,
}

const MONTH_TOKENS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

const MONTH_CONTAINERS: [&str; 12] = [
    "LOG_01", "LOG_02", "LOG_03", "LOG_04", "LOG_05", "LOG_06", "LOG_07", "LOG_08", "LOG_09",
    "LOG_10", "LOG_11", "LOG_12",
];

impl Month {
    pub const ALL: [Month; 12] = [
        Month::Jan,
        Month::Feb,
        Month::Mar,
        Month::Apr,
        Month::May,
        Month::Jun,
        Month::Jul,
        Month::Aug,
        Month::Sep,
        Month::Oct,
        Month::Nov,
        Month::Dec,
    ];

    /// Parse a three-letter English month abbreviation. Anything else,
    /// including other capitalizations, is outside the domain.
    pub fn from_token(token: &str) -> Option<Month> {
        MONTH_TOKENS
            .iter()
            .position(|t| *t == token)
            .map(|i| Month::ALL[i])
    }

    pub fn token(self) -> &'static str {
        MONTH_TOKENS[self.bucket()]
    }
}

impl BucketDomain for Month {
    const SIZE: usize = 12;

    fn bucket(self) -> usize {
        self as usize
    }
}

impl ContainerDomain for Month {
    fn container(self) -> &'static str {
        MONTH_CONTAINERS[self.bucket()]
    }

    fn containers() -> &'static [&'static str] {
        &MONTH_CONTAINERS
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// Hour of day, 00..=23. Constructed only through `from_token`, so a value
/// in hand is always a valid bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Hour(u8);

impl Hour {
    /// Parse a two-digit hour token `"00"`..`"23"`.
    pub fn from_token(token: &str) -> Option<Hour> {
        if token.len() != 2 || !token.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let value: u8 = token.parse().ok()?;
        if (value as usize) < Hour::SIZE {
            Some(Hour(value))
        } else {
            None
        }
    }
}

impl BucketDomain for Hour {
    const SIZE: usize = 24;

    fn bucket(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for Hour {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}", self.0)
    }
}
