//! Leaf nodes: sorted, unique key/value items.

use crate::cow::{CowContext, Owner};
use crate::item::{self, Item};
use crate::node::{Lookup, Removal};

#[derive(Debug)]
pub(crate) struct Leaf {
    pub(crate) owner: Owner,
    pub(crate) max: usize,
    pub(crate) items: Vec<Item>,
}

impl Leaf {
    pub(crate) const fn empty() -> Self {
        Self {
            owner: crate::cow::UNOWNED,
            max: 0,
            items: Vec::new(),
        }
    }

    pub(crate) fn with_capacity(owner: Owner, max: usize) -> Self {
        Self {
            owner,
            max,
            items: Vec::with_capacity(max),
        }
    }

    /// Copy into a shell from `cow`. Item bytes are duplicated so the fork
    /// never aliases the original's buffers.
    pub(crate) fn fork_for(&self, cow: &CowContext) -> Leaf {
        let mut leaf = cow.acquire_leaf(self.max);
        leaf.items.extend(self.items.iter().cloned());
        leaf
    }

    /// Move `[i, len)` into a new right sibling. The separator is a key-only
    /// copy of the right sibling's first key, since that item keeps its value.
    pub(crate) fn split(&mut self, cow: &CowContext, i: usize) -> (Item, Leaf) {
        let mut right = cow.acquire_leaf(self.max);
        right.items.extend(self.items.drain(i..));
        let sep = right.items[0].to_separator();
        (sep, right)
    }

    pub(crate) fn insert(&mut self, key: &[u8], val: &[u8]) -> bool {
        let (i, found) = item::find(&self.items, key);
        if found {
            self.items[i].replace_value(val);
        } else {
            self.items.insert(i, Item::encode(key, val));
        }
        !found
    }

    pub(crate) fn get(&self, target: Lookup<'_>) -> Option<&Item> {
        match target {
            Lookup::Min => self.items.first(),
            Lookup::Max => self.items.last(),
            Lookup::Key(key) => match item::find(&self.items, key) {
                (i, true) => Some(&self.items[i]),
                _ => None,
            },
        }
    }

    /// Remove the target item. Taking out the first item reports the leaf's
    /// new minimum so ancestors can repair their separators.
    pub(crate) fn remove(&mut self, target: Lookup<'_>) -> Removal {
        let i = match target {
            Lookup::Min if !self.items.is_empty() => 0,
            Lookup::Max if !self.items.is_empty() => self.items.len() - 1,
            Lookup::Key(key) => match item::find(&self.items, key) {
                (i, true) => i,
                _ => return Removal::default(),
            },
            _ => return Removal::default(),
        };
        let removed = self.items.remove(i);
        let new_min = match (i, self.items.first()) {
            (0, Some(first)) => Some(first.to_separator()),
            _ => None,
        };
        Removal {
            removed: Some(removed),
            new_min,
        }
    }
}
