//! Half-open key ranges and the end-key sentinel.
//!
//! A prefix scan is just a range: `[P, P + END_KEY_SUFFIX)` covers every key
//! starting with `P`, because keys are ordered byte-wise over their UTF-8
//! encoding and no stored key may contain the sentinel.

/// Reserved suffix that, appended to a prefix, sorts after every key
/// sharing that prefix.
///
/// It is `U+10FFFF`, the greatest Unicode scalar value (UTF-8 `F4 8F BF BF`).
/// Every other character encodes to a smaller first differing byte, so
/// `prefix + END_KEY_SUFFIX` is greater than `prefix + anything` a store
/// accepts. Stores reject keys that contain it.
pub const END_KEY_SUFFIX: &str = "\u{10FFFF}";

/// `[start, end)` over lexicographically ordered keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyRange {
    start: String,
    end: String,
}

impl KeyRange {
    pub fn new(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
        }
    }

    /// Every key beginning with `prefix`.
    ///
    /// An empty prefix produces the bare sentinel as upper bound, which
    /// selects nothing.
    pub fn prefix(prefix: &str) -> Self {
        Self::new(prefix, format!("{}{}", prefix, END_KEY_SUFFIX))
    }

    pub fn start(&self) -> &str {
        &self.start
    }

    pub fn end(&self) -> &str {
        &self.end
    }

    /// Whether the range selects nothing.
    ///
    /// Empty when the upper bound is empty, when it is the bare sentinel
    /// (sentinel with an empty prefix), or when `start >= end`. In
    /// particular `("", "")` is empty rather than "everything".
    pub fn is_empty(&self) -> bool {
        self.end.is_empty() || self.end == END_KEY_SUFFIX || self.start >= self.end
    }
}
