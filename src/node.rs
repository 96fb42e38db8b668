//! Node dispatch.
//!
//! A node is either a [`Leaf`] holding key/value items or an [`Inter`]nal
//! node holding separator keys and children. The enum tag is the only thing
//! checked on descent; everything else routes to the variant's own code.

use crate::cow::{CowContext, Owner};
use crate::error::{Error, Result};
use crate::inter::Inter;
use crate::item::Item;
use crate::leaf::Leaf;

/// Which item a lookup or removal targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup<'a> {
    /// The item with exactly this key.
    Key(&'a [u8]),
    /// The smallest key in the tree.
    Min,
    /// The largest key in the tree.
    Max,
}

/// Outcome of a removal below some node.
#[derive(Debug, Default)]
pub(crate) struct Removal {
    /// The removed item, if the target existed.
    pub(crate) removed: Option<Item>,
    /// Separator for the subtree's new minimum, when the removal changed it
    /// and no ancestor has absorbed the change yet.
    pub(crate) new_min: Option<Item>,
}

#[derive(Debug)]
pub(crate) enum Node {
    Leaf(Leaf),
    Inter(Inter),
}

impl Node {
    #[inline]
    pub(crate) fn owner(&self) -> Owner {
        match self {
            Node::Leaf(leaf) => leaf.owner,
            Node::Inter(inter) => inter.owner,
        }
    }

    #[inline]
    pub(crate) fn items(&self) -> &[Item] {
        match self {
            Node::Leaf(leaf) => &leaf.items,
            Node::Inter(inter) => &inter.items,
        }
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.items().len()
    }

    #[inline]
    pub(crate) fn is_leaf(&self) -> bool {
        matches!(self, Node::Leaf(_))
    }

    #[inline]
    pub(crate) fn is_full(&self) -> bool {
        match self {
            Node::Leaf(leaf) => leaf.items.len() >= leaf.max,
            Node::Inter(inter) => inter.items.len() >= inter.max,
        }
    }

    pub(crate) fn fork_for(&self, cow: &CowContext) -> Node {
        match self {
            Node::Leaf(leaf) => Node::Leaf(leaf.fork_for(cow)),
            Node::Inter(inter) => Node::Inter(inter.fork_for(cow)),
        }
    }

    /// Split at `i`, returning the promoted separator and the new right
    /// sibling. `self` keeps everything below `i`.
    pub(crate) fn split(&mut self, cow: &CowContext, i: usize) -> Result<(Item, Node)> {
        if i == 0 || i >= self.len() {
            return Err(Error::InvalidState("split index out of range"));
        }
        Ok(match self {
            Node::Leaf(leaf) => {
                let (sep, right) = leaf.split(cow, i);
                (sep, Node::Leaf(right))
            }
            Node::Inter(inter) => {
                let (sep, right) = inter.split(cow, i);
                (sep, Node::Inter(right))
            }
        })
    }

    /// Insert or update. Returns whether the key was new.
    ///
    /// The node must not be full; parents split children before descending.
    pub(crate) fn insert(&mut self, cow: &CowContext, key: &[u8], val: &[u8]) -> Result<bool> {
        match self {
            Node::Leaf(leaf) => Ok(leaf.insert(key, val)),
            Node::Inter(inter) => inter.insert(cow, key, val),
        }
    }

    pub(crate) fn remove(&mut self, cow: &CowContext, target: Lookup<'_>) -> Result<Removal> {
        match self {
            Node::Leaf(leaf) => Ok(leaf.remove(target)),
            Node::Inter(inter) => inter.remove(cow, target),
        }
    }
}
