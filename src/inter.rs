//! Internal nodes: separator keys plus one more child than keys.
//!
//! For every `i`, keys under `children[i]` are `< items[i]` and keys under
//! `children[i + 1]` are `>= items[i]`.
//!
//! Both insert and remove rebalance top-down: before descending into a
//! child, insert splits it if full and remove tops it up (steal or merge) if
//! it sits at or below half capacity. The recursive call therefore never has
//! to propagate a split or underflow back up.

use std::mem;
use std::sync::Arc;

use tracing::trace;

use crate::cow::{CowContext, Owner};
use crate::error::{Error, Result};
use crate::item::{self, Item};
use crate::node::{Lookup, Node, Removal};

#[derive(Debug)]
pub(crate) struct Inter {
    pub(crate) owner: Owner,
    pub(crate) max: usize,
    pub(crate) items: Vec<Item>,
    pub(crate) children: Vec<Arc<Node>>,
}

/// Mutable views of `children[i]` and `children[i + 1]`, forked as needed.
fn siblings_mut<'n>(
    cow: &CowContext,
    children: &'n mut [Arc<Node>],
    i: usize,
) -> Result<(&'n mut Node, &'n mut Node)> {
    let (head, tail) = children.split_at_mut(i + 1);
    let left = cow.fork_if_foreign(&mut head[i])?;
    let right = cow.fork_if_foreign(&mut tail[0])?;
    Ok((left, right))
}

const MIXED_SIBLINGS: Error = Error::InvalidState("sibling node kinds differ");
const EMPTY_SIBLING: Error = Error::InvalidState("cannot steal from an empty sibling");

impl Inter {
    pub(crate) fn with_capacity(owner: Owner, max: usize) -> Self {
        Self {
            owner,
            max,
            items: Vec::with_capacity(max),
            children: Vec::with_capacity(max + 1),
        }
    }

    /// Copy into a shell from `cow`. Separators are duplicated; children are
    /// shared and only forked once something mutates them.
    pub(crate) fn fork_for(&self, cow: &CowContext) -> Inter {
        let mut inter = cow.acquire_inter(self.max);
        inter.items.extend(self.items.iter().cloned());
        inter.children.extend(self.children.iter().cloned());
        inter
    }

    /// Index of the child whose subtree holds `target`.
    #[inline]
    pub(crate) fn route(&self, target: Lookup<'_>) -> usize {
        match target {
            Lookup::Min => 0,
            Lookup::Max => self.items.len(),
            Lookup::Key(key) => match item::find(&self.items, key) {
                (i, true) => i + 1,
                (i, false) => i,
            },
        }
    }

    /// Promote `items[i]`; items and children to its right move to a new
    /// sibling.
    pub(crate) fn split(&mut self, cow: &CowContext, i: usize) -> (Item, Inter) {
        let mut right = cow.acquire_inter(self.max);
        right.items.extend(self.items.drain(i + 1..));
        right.children.extend(self.children.drain(i + 1..));
        let sep = self.items.remove(i);
        (sep, right)
    }

    /// Split `children[i]` at its midpoint if it is full.
    pub(crate) fn maybe_split_child(&mut self, cow: &CowContext, i: usize) -> Result<bool> {
        if !self.children[i].is_full() {
            return Ok(false);
        }
        let child = cow.fork_if_foreign(&mut self.children[i])?;
        let (sep, right) = child.split(cow, self.max / 2)?;
        self.items.insert(i, sep);
        self.children.insert(i + 1, Arc::new(right));
        Ok(true)
    }

    /// Move the last item of `children[i - 1]` to the front of `children[i]`.
    pub(crate) fn steal_left(&mut self, cow: &CowContext, i: usize) -> Result<()> {
        let (left, right) = siblings_mut(cow, &mut self.children, i - 1)?;
        match (left, right) {
            (Node::Leaf(left), Node::Leaf(right)) => {
                let stolen = left.items.pop().ok_or(EMPTY_SIBLING)?;
                self.items[i - 1] = stolen.to_separator();
                right.items.insert(0, stolen);
            }
            (Node::Inter(left), Node::Inter(right)) => {
                let stolen = left.items.pop().ok_or(EMPTY_SIBLING)?;
                let child = left.children.pop().ok_or(EMPTY_SIBLING)?;
                let sep = mem::replace(&mut self.items[i - 1], stolen);
                right.items.insert(0, sep);
                right.children.insert(0, child);
            }
            _ => return Err(MIXED_SIBLINGS),
        }
        Ok(())
    }

    /// Move the first item of `children[i + 1]` to the end of `children[i]`.
    pub(crate) fn steal_right(&mut self, cow: &CowContext, i: usize) -> Result<()> {
        let (left, right) = siblings_mut(cow, &mut self.children, i)?;
        match (left, right) {
            (Node::Leaf(left), Node::Leaf(right)) => {
                if right.items.len() < 2 {
                    return Err(EMPTY_SIBLING);
                }
                let stolen = right.items.remove(0);
                self.items[i] = right.items[0].to_separator();
                left.items.push(stolen);
            }
            (Node::Inter(left), Node::Inter(right)) => {
                if right.items.is_empty() {
                    return Err(EMPTY_SIBLING);
                }
                let stolen = right.items.remove(0);
                let child = right.children.remove(0);
                let sep = mem::replace(&mut self.items[i], stolen);
                left.items.push(sep);
                left.children.push(child);
            }
            _ => return Err(MIXED_SIBLINGS),
        }
        Ok(())
    }

    /// Fold `children[i + 1]` into `children[i]` and retire the emptied
    /// sibling to the pool.
    pub(crate) fn merge_right(&mut self, cow: &CowContext, i: usize) -> Result<()> {
        if self.children[i].is_leaf() != self.children[i + 1].is_leaf() {
            return Err(MIXED_SIBLINGS);
        }
        let sep = self.items.remove(i);
        let mut right = cow.detach(self.children.remove(i + 1));
        let left = cow.fork_if_foreign(&mut self.children[i])?;
        match (left, &mut right) {
            (Node::Leaf(left), Node::Leaf(right)) => {
                left.items.append(&mut right.items);
            }
            (Node::Inter(left), Node::Inter(right)) => {
                left.items.push(sep);
                left.items.append(&mut right.items);
                left.children.append(&mut right.children);
            }
            _ => return Err(MIXED_SIBLINGS),
        }
        cow.release(right);
        Ok(())
    }

    fn merge_fits(&self, i: usize) -> bool {
        let (left, right) = (&self.children[i], &self.children[i + 1]);
        let sep = usize::from(!left.is_leaf());
        left.len() + sep + right.len() <= self.max
    }

    /// Top up `children[i]` before descending into it for a removal.
    ///
    /// Prefers stealing from a sibling above `min`, otherwise merges with a
    /// neighbour. Returns the index to descend into, which moves down by one
    /// when `i` was the last child and got merged into its left sibling.
    pub(crate) fn steal_remove(&mut self, cow: &CowContext, i: usize, min: usize) -> Result<usize> {
        if i > 0 && self.children[i - 1].len() > min {
            self.steal_left(cow, i)?;
            return Ok(i);
        }
        if i < self.items.len() && self.children[i + 1].len() > min {
            self.steal_right(cow, i)?;
            return Ok(i);
        }
        if self.items.is_empty() {
            // no siblings to borrow from
            return Ok(i);
        }

        let j = if i == self.items.len() { i - 1 } else { i };
        if self.merge_fits(j) {
            trace!(index = j, "merging siblings");
            self.merge_right(cow, j)?;
            return Ok(j);
        }

        // Two internal siblings at `min` plus their separator overflow an
        // even `max`; shift one entry over from the would-be partner instead.
        if j == i {
            self.steal_right(cow, i)?;
        } else {
            self.steal_left(cow, i)?;
        }
        Ok(i)
    }

    pub(crate) fn insert(&mut self, cow: &CowContext, key: &[u8], val: &[u8]) -> Result<bool> {
        let mut i = self.route(Lookup::Key(key));
        if self.maybe_split_child(cow, i)? && self.items[i].key() <= key {
            i += 1;
        }
        cow.fork_if_foreign(&mut self.children[i])?.insert(cow, key, val)
    }

    pub(crate) fn remove(&mut self, cow: &CowContext, target: Lookup<'_>) -> Result<Removal> {
        let mut i = self.route(target);
        let min = self.max / 2;
        if self.children[i].len() <= min {
            i = self.steal_remove(cow, i, min)?;
        }

        let mut removal = cow.fork_if_foreign(&mut self.children[i])?.remove(cow, target)?;

        // A new minimum under children[i] only bounds separator i - 1. Under
        // children[0] it is also this subtree's minimum, so it travels up.
        if i > 0 {
            if let Some(sep) = removal.new_min.take() {
                self.items[i - 1] = sep;
            }
        }
        Ok(removal)
    }
}
