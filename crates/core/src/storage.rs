//! Storage keys

use std::fmt::{self, Display};
use std::str::FromStr;

use borsh::{BorshDeserialize, BorshSerialize};
use thiserror::Error;

use crate::address::Address;
use crate::chain::{BlockHeight, Epoch};

/// The separator of storage key segments
pub const KEY_SEGMENT_SEPARATOR: char = '/';

#[allow(missing_docs)]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("The key is empty")]
    EmptyKey,
    #[error("Reserved separator found in key segment: {0}")]
    InvalidKeySeg(String),
}

/// Result for functions that may fail
pub type Result<T> = std::result::Result<T, Error>;

/// A storage key made of string segments
#[derive(
    Clone,
    Debug,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    BorshSerialize,
    BorshDeserialize,
)]
pub struct Key {
    /// The segments of the key
    pub segments: Vec<String>,
}

/// A type that can be used as a storage key segment
pub trait KeySeg {
    /// Convert to a raw segment string
    fn raw(&self) -> String;
}

impl KeySeg for String {
    fn raw(&self) -> String {
        self.clone()
    }
}

impl KeySeg for &str {
    fn raw(&self) -> String {
        self.to_string()
    }
}

impl KeySeg for Address {
    fn raw(&self) -> String {
        self.encode()
    }
}

impl KeySeg for u64 {
    fn raw(&self) -> String {
        // fixed width keeps the lexicographic order numeric
        format!("{self:020}")
    }
}

impl KeySeg for BlockHeight {
    fn raw(&self) -> String {
        self.0.raw()
    }
}

impl KeySeg for Epoch {
    fn raw(&self) -> String {
        self.0.raw()
    }
}

impl Key {
    /// Build a key with a single segment
    pub fn from_seg(seg: &impl KeySeg) -> Self {
        Self {
            segments: vec![seg.raw()],
        }
    }

    /// Returns a new key with the given segment appended
    pub fn push(&self, seg: &impl KeySeg) -> Self {
        let mut segments = self.segments.clone();
        segments.push(seg.raw());
        Self { segments }
    }

    /// Returns a new key with all the segments of `other` appended
    pub fn join(&self, other: &Key) -> Self {
        let mut segments = self.segments.clone();
        segments.extend(other.segments.iter().cloned());
        Self { segments }
    }

    /// Returns the number of segments
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Returns `true` if the key has no segments
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// The first segment
    pub fn first(&self) -> Option<&str> {
        self.segments.first().map(String::as_str)
    }

    /// The last segment
    pub fn last(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    /// Returns `true` if `self` is a segment-wise prefix of `key`
    pub fn is_prefix_of(&self, key: &Key) -> bool {
        key.segments.starts_with(&self.segments)
    }

    /// Parse a key from its string form, validating every segment
    pub fn parse(string: impl AsRef<str>) -> Result<Self> {
        let string = string.as_ref();
        if string.is_empty() {
            return Err(Error::EmptyKey);
        }
        Ok(Self {
            segments: string
                .split(KEY_SEGMENT_SEPARATOR)
                .map(str::to_string)
                .collect(),
        })
    }

    /// Returns a new key with the given segment appended, rejecting
    /// segments that contain the separator.
    pub fn push_checked(&self, seg: &impl KeySeg) -> Result<Self> {
        let raw = seg.raw();
        if raw.contains(KEY_SEGMENT_SEPARATOR) {
            return Err(Error::InvalidKeySeg(raw));
        }
        Ok(self.push(&raw))
    }
}

impl Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("/"))
    }
}

impl FromStr for Key {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
