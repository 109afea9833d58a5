//! Key Namespacer
//!
//! Every key the console manages lives under a fixed isolation prefix so it
//! never collides with other tenants of the shared keyspace.
//!
//! ```text
//!   logical key          wire key
//!   "user:1"     ──►     "kvconsole_" ++ "user:1"
//! ```
//!
//! Range scans are half-open `[start, end)`. The end of a prefix range is the
//! prefix's byte-wise successor (last non-0xFF byte incremented, tail
//! dropped), so keys ending in 0xFF are never cut off.

/// A half-open range of wire keys. `end == None` means "to the end of the keyspace".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyRange {
    pub start: Vec<u8>,
    pub end: Option<Vec<u8>>,
}

impl KeyRange {
    /// Range covering every key that starts with `prefix`
    pub fn prefix(prefix: &[u8]) -> Self {
        Self {
            start: prefix.to_vec(),
            end: prefix_end(prefix),
        }
    }

    /// Same end, new start. Used to advance a scan cursor.
    pub fn starting_at(&self, start: Vec<u8>) -> Self {
        Self {
            start,
            end: self.end.clone(),
        }
    }

    pub fn end_bound(&self) -> Option<&[u8]> {
        self.end.as_deref()
    }

    pub fn contains(&self, key: &[u8]) -> bool {
        key >= self.start.as_slice() && self.end.as_deref().map_or(true, |end| key < end)
    }

    /// True when no key can fall in the range
    pub fn is_empty(&self) -> bool {
        matches!(&self.end, Some(end) if end.as_slice() <= self.start.as_slice())
    }
}

/// Smallest key greater than every key with the given prefix.
///
/// Returns `None` when no such key exists (empty prefix or all 0xFF bytes).
pub fn prefix_end(prefix: &[u8]) -> Option<Vec<u8>> {
    let mut end = prefix.to_vec();
    while let Some(last) = end.pop() {
        if last < 0xFF {
            end.push(last + 1);
            return Some(end);
        }
    }
    None
}

/// Smallest key strictly greater than `key`
pub fn successor(key: &[u8]) -> Vec<u8> {
    let mut next = Vec::with_capacity(key.len() + 1);
    next.extend_from_slice(key);
    next.push(0x00);
    next
}

/// Maps logical keys to wire keys and back
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyNamespace {
    prefix: Vec<u8>,
}

impl KeyNamespace {
    pub fn new(prefix: impl Into<Vec<u8>>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &[u8] {
        &self.prefix
    }

    /// Prepend the isolation prefix
    pub fn wrap(&self, key: &[u8]) -> Vec<u8> {
        let mut wire = Vec::with_capacity(self.prefix.len() + key.len());
        wire.extend_from_slice(&self.prefix);
        wire.extend_from_slice(key);
        wire
    }

    /// Strip the isolation prefix.
    ///
    /// Returns `None` for keys that do not carry the prefix; those are not
    /// managed keys and must never reach a caller.
    pub fn unwrap<'a>(&self, wire: &'a [u8]) -> Option<&'a [u8]> {
        wire.strip_prefix(self.prefix.as_slice())
    }

    /// Wire range for all managed keys starting with the logical `prefix`.
    /// An empty prefix covers the whole managed namespace.
    pub fn range(&self, prefix: &[u8]) -> KeyRange {
        KeyRange::prefix(&self.wrap(prefix))
    }

    /// Wire range for the whole managed namespace
    pub fn full_range(&self) -> KeyRange {
        self.range(&[])
    }
}
