//! The tree handle: root management, size bookkeeping and snapshots.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::cow::{CowContext, DEFAULT_POOL_SIZE};
use crate::error::{Error, Result};
use crate::inter::Inter;
use crate::item::Item;
use crate::iter::{Direction, Iter};
use crate::node::{Lookup, Node};

/// Default maximum number of items per node.
pub const DEFAULT_NODE_SIZE: usize = 64;

/// Configuration for a [`Tree`].
#[derive(Debug, Clone)]
pub struct Config {
    /// Maximum items per node. Must be at least 2.
    pub node_size: usize,
    /// Shells each freelist of the tree's fresh [`CowContext`] may hold.
    pub pool_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            node_size: DEFAULT_NODE_SIZE,
            pool_size: DEFAULT_POOL_SIZE,
        }
    }
}

/// An ordered byte-key/byte-value map with cheap copy-on-write snapshots.
///
/// [`clone_with`](Tree::clone_with) returns a handle sharing every node with
/// the original. Either handle may then be mutated independently: a shared
/// node is forked into the mutating handle's context the first time it is
/// touched, so each side only pays for the paths it actually changes.
pub struct Tree {
    root: Option<Arc<Node>>,
    len: usize,
    node_size: usize,
    cow: CowContext,
}

fn check_key(key: &[u8]) -> Result<()> {
    if key.is_empty() {
        return Err(Error::InvalidArgument("empty key"));
    }
    if key.len() > u32::MAX as usize {
        return Err(Error::InvalidArgument("key longer than u32::MAX bytes"));
    }
    Ok(())
}

impl Tree {
    pub fn new() -> Self {
        Self::build(DEFAULT_NODE_SIZE, CowContext::default())
    }

    pub fn with_config(config: Config) -> Result<Self> {
        Self::with_context(config.node_size, CowContext::new(config.pool_size))
    }

    /// Create a tree that allocates from (and stamps nodes with) `cow`.
    pub fn with_context(node_size: usize, cow: CowContext) -> Result<Self> {
        if node_size < 2 {
            return Err(Error::InvalidArgument("node size must be at least 2"));
        }
        Ok(Self::build(node_size, cow))
    }

    fn build(node_size: usize, cow: CowContext) -> Self {
        let root = Arc::new(Node::Leaf(cow.acquire_leaf(node_size)));
        Self {
            root: Some(root),
            len: 0,
            node_size,
            cow,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn node_size(&self) -> usize {
        self.node_size
    }

    #[cfg(test)]
    pub(crate) fn root(&self) -> Option<&Node> {
        self.root.as_deref()
    }

    /// The context this handle forks and allocates into.
    pub fn context(&self) -> &CowContext {
        &self.cow
    }

    /// Number of levels from the root down to the leaves; 0 after `reset`.
    pub fn height(&self) -> usize {
        let mut height = 0;
        let mut node = self.root.as_deref();
        while let Some(n) = node {
            height += 1;
            node = match n {
                Node::Inter(inter) => inter.children.first().map(|c| &**c),
                Node::Leaf(_) => None,
            };
        }
        height
    }

    /// Insert or update `key`. Returns `true` if the key was not present.
    pub fn insert(&mut self, key: &[u8], val: &[u8]) -> Result<bool> {
        check_key(key)?;
        if val.is_empty() {
            return Err(Error::InvalidArgument("empty value"));
        }

        let slot = self
            .root
            .get_or_insert_with(|| Arc::new(Node::Leaf(self.cow.acquire_leaf(self.node_size))));
        if self.cow.fork_if_foreign(slot)?.is_full() {
            self.grow_root()?;
        }

        let slot = self.root.as_mut().ok_or(Error::InvalidState("tree has no root"))?;
        let added = self.cow.fork_if_foreign(slot)?.insert(&self.cow, key, val)?;
        if added {
            self.len += 1;
        }
        Ok(added)
    }

    /// Push the full root down under a new internal root and split it.
    fn grow_root(&mut self) -> Result<()> {
        let old = self.root.take().ok_or(Error::InvalidState("tree has no root"))?;
        let mut root = self.cow.acquire_inter(self.node_size);
        root.children.push(old);
        root.maybe_split_child(&self.cow, 0)?;
        self.root = Some(Arc::new(Node::Inter(root)));
        debug!(height = self.height(), len = self.len, "root split");
        Ok(())
    }

    /// Replace an internal root that has a single child with that child,
    /// as many times as needed.
    fn collapse_root(&mut self) -> Result<()> {
        loop {
            let child = match self.root.as_deref() {
                Some(Node::Inter(Inter { items, children, .. })) if items.is_empty() => children
                    .first()
                    .cloned()
                    .ok_or(Error::InvalidState("internal node without children"))?,
                _ => return Ok(()),
            };
            if let Some(old) = self.root.replace(child) {
                self.cow.retire(old);
            }
            debug!(height = self.height(), len = self.len, "root collapsed");
        }
    }

    fn remove_target(&mut self, target: Lookup<'_>) -> Result<Option<Item>> {
        self.collapse_root()?;
        let Some(slot) = self.root.as_mut() else {
            return Ok(None);
        };
        let removal = self.cow.fork_if_foreign(slot)?.remove(&self.cow, target)?;
        self.collapse_root()?;
        if removal.removed.is_some() {
            self.len = self.len.saturating_sub(1);
        }
        Ok(removal.removed)
    }

    /// Remove `key`, returning its value if it was present.
    pub fn remove(&mut self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        check_key(key)?;
        let removed = self.remove_target(Lookup::Key(key))?;
        Ok(removed.map(|item| item.into_parts().1))
    }

    /// Remove and return the smallest entry.
    pub fn remove_min(&mut self) -> Result<(Vec<u8>, Vec<u8>)> {
        self.remove_target(Lookup::Min)?
            .map(Item::into_parts)
            .ok_or(Error::NotFound)
    }

    /// Remove and return the largest entry.
    pub fn remove_max(&mut self) -> Result<(Vec<u8>, Vec<u8>)> {
        self.remove_target(Lookup::Max)?
            .map(Item::into_parts)
            .ok_or(Error::NotFound)
    }

    /// Read the value at `target` without forking or mutating anything.
    pub fn get(&self, target: Lookup<'_>) -> Result<&[u8]> {
        if let Lookup::Key(key) = target {
            check_key(key)?;
        }
        let mut node = self.root.as_deref().ok_or(Error::NotFound)?;
        loop {
            match node {
                Node::Inter(inter) => node = &*inter.children[inter.route(target)],
                Node::Leaf(leaf) => {
                    return leaf.get(target).map(Item::value).ok_or(Error::NotFound);
                }
            }
        }
    }

    pub fn contains_key(&self, key: &[u8]) -> bool {
        self.get(Lookup::Key(key)).is_ok()
    }

    /// Snapshot this tree into a new handle that forks into `cow`.
    ///
    /// No node is copied here. Nodes are forked one at a time, by whichever
    /// handle mutates them first.
    pub fn clone_with(&self, cow: CowContext) -> Tree {
        debug!(len = self.len, "tree cloned");
        Tree {
            root: self.root.clone(),
            len: self.len,
            node_size: self.node_size,
            cow,
        }
    }

    /// Iterate from `start` towards `stop`.
    ///
    /// Without `start` the scan begins at the smallest (ascending) or largest
    /// (descending) key. Ascending scans yield keys `< stop` (`<= stop` when
    /// `inclusive`); descending scans yield keys `> stop` (`>= stop`). No
    /// `stop` means no bound. Empty slices count as absent.
    pub fn scan(
        &self,
        start: Option<&[u8]>,
        stop: Option<&[u8]>,
        direction: Direction,
        inclusive: bool,
    ) -> Iter<'_> {
        Iter::seek(self.root.as_deref(), start, stop, direction, inclusive)
    }

    /// Unbounded ascending iteration.
    pub fn iter(&self) -> Iter<'_> {
        self.scan(None, None, Direction::Ascending, false)
    }

    /// Drop the root. The tree reads as empty and the next insert starts
    /// over from a fresh leaf.
    pub fn reset(&mut self) {
        self.root = None;
        self.len = 0;
    }
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

/// Clones into a fresh [`CowContext`] with the same pool bound.
impl Clone for Tree {
    fn clone(&self) -> Self {
        self.clone_with(CowContext::new(self.cow.bound()))
    }
}

impl fmt::Debug for Tree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<'a> IntoIterator for &'a Tree {
    type Item = (&'a [u8], &'a [u8]);
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Iter<'a> {
        self.iter()
    }
}
