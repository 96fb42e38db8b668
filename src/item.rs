//! Item encoding.
//!
//! Every record stored in a node is one self-contained buffer:
//!
//! ```text
//! [key_len: u32 LE][key bytes][value bytes]
//! ```
//!
//! Separator keys in internal nodes use the same layout with an empty value,
//! so key comparison never needs to know which node kind an item came from.

use std::fmt;

pub(crate) const LEN_PREFIX: usize = 4;

#[derive(Clone, PartialEq, Eq)]
pub(crate) struct Item(Vec<u8>);

impl Item {
    pub(crate) fn encode(key: &[u8], val: &[u8]) -> Self {
        debug_assert!(key.len() <= u32::MAX as usize);
        let mut buf = Vec::with_capacity(LEN_PREFIX + key.len() + val.len());
        buf.extend_from_slice(&(key.len() as u32).to_le_bytes());
        buf.extend_from_slice(key);
        buf.extend_from_slice(val);
        Self(buf)
    }

    /// Key-only item used as a routing key in internal nodes.
    #[inline]
    pub(crate) fn separator(key: &[u8]) -> Self {
        Self::encode(key, &[])
    }

    #[inline]
    fn key_len(&self) -> usize {
        let b = &self.0;
        u32::from_le_bytes([b[0], b[1], b[2], b[3]]) as usize
    }

    #[inline]
    pub(crate) fn key(&self) -> &[u8] {
        &self.0[LEN_PREFIX..LEN_PREFIX + self.key_len()]
    }

    #[inline]
    pub(crate) fn value(&self) -> &[u8] {
        &self.0[LEN_PREFIX + self.key_len()..]
    }

    #[inline]
    pub(crate) fn decode(&self) -> (&[u8], &[u8]) {
        self.0[LEN_PREFIX..].split_at(self.key_len())
    }

    /// Swap the value in place. The key bytes and, where it suffices, the
    /// buffer's allocation are kept.
    pub(crate) fn replace_value(&mut self, val: &[u8]) {
        let end = LEN_PREFIX + self.key_len();
        self.0.truncate(end);
        self.0.extend_from_slice(val);
    }

    pub(crate) fn to_separator(&self) -> Self {
        Self::separator(self.key())
    }

    /// Split into owned `(key, value)`, reusing the buffer for the key.
    pub(crate) fn into_parts(self) -> (Vec<u8>, Vec<u8>) {
        let end = LEN_PREFIX + self.key_len();
        let mut key = self.0;
        let val = key.split_off(end);
        key.drain(..LEN_PREFIX);
        (key, val)
    }

    #[cfg(test)]
    pub(crate) fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    #[cfg(test)]
    pub(crate) fn capacity(&self) -> usize {
        self.0.capacity()
    }
}

impl fmt::Debug for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (key, val) = self.decode();
        f.debug_struct("Item")
            .field("key", &String::from_utf8_lossy(key))
            .field("value", &String::from_utf8_lossy(val))
            .finish()
    }
}

/// Binary search over sorted, unique items.
///
/// Returns the index of the exact match, or the insertion point that keeps
/// `items` sorted, plus whether the match was exact.
#[inline]
pub(crate) fn find(items: &[Item], key: &[u8]) -> (usize, bool) {
    match items.binary_search_by(|item| item.key().cmp(key)) {
        Ok(i) => (i, true),
        Err(i) => (i, false),
    }
}
