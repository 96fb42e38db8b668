//! Copy-on-write context and node pool.
//!
//! A [`CowContext`] plays two roles:
//!
//! 1. **Ownership token.** Every node is stamped with the id of the context
//!    that created or last forked it. A tree only mutates a node in place when
//!    the stamp matches its own context and no other handle can still reach
//!    the node; anything else is forked first.
//! 2. **Shell pool.** Nodes retired by merges are cleared and parked on a
//!    bounded freelist (one per node kind) so later allocations can reuse
//!    their vector capacity. Past the bound, retired nodes are dropped.
//!
//! Freelists are the only state mutated through a shared reference, each
//! behind its own lock, so several trees may share one context across
//! threads.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::trace;

use crate::error::{Error, Result};
use crate::inter::Inter;
use crate::leaf::Leaf;
use crate::node::Node;

/// Owner stamp carried by every node.
pub(crate) type Owner = u64;

/// Stamp of shells parked on a freelist.
pub(crate) const UNOWNED: Owner = 0;

/// Default number of shells each freelist may hold.
pub const DEFAULT_POOL_SIZE: usize = 64;

static NEXT_OWNER: AtomicU64 = AtomicU64::new(UNOWNED + 1);

struct Pool {
    id: Owner,
    bound: usize,
    leaves: Mutex<Vec<Leaf>>,
    inters: Mutex<Vec<Inter>>,
}

/// Copy-on-write context: ownership token plus bounded node pool.
///
/// Cloning a `CowContext` yields another handle to the *same* context.
/// Use [`CowContext::new`] for an independent one.
#[derive(Clone)]
pub struct CowContext {
    pool: Arc<Pool>,
}

impl CowContext {
    /// Create a context whose freelists each hold at most `bound` shells.
    pub fn new(bound: usize) -> Self {
        Self {
            pool: Arc::new(Pool {
                id: NEXT_OWNER.fetch_add(1, Ordering::Relaxed),
                bound,
                leaves: Mutex::new(Vec::with_capacity(bound)),
                inters: Mutex::new(Vec::with_capacity(bound)),
            }),
        }
    }

    /// Maximum number of shells kept per node kind.
    #[inline]
    pub fn bound(&self) -> usize {
        self.pool.bound
    }

    /// Number of leaf shells currently parked for reuse.
    pub fn idle_leaves(&self) -> usize {
        self.pool.leaves.lock().len()
    }

    /// Number of internal-node shells currently parked for reuse.
    pub fn idle_inters(&self) -> usize {
        self.pool.inters.lock().len()
    }

    #[inline]
    pub(crate) fn owner(&self) -> Owner {
        self.pool.id
    }

    pub(crate) fn acquire_leaf(&self, max: usize) -> Leaf {
        let recycled = self.pool.leaves.lock().pop();
        match recycled {
            Some(mut leaf) => {
                // len is 0, so this only reallocates when the shell is too small
                leaf.items.reserve(max);
                leaf.owner = self.owner();
                leaf.max = max;
                leaf
            }
            None => Leaf::with_capacity(self.owner(), max),
        }
    }

    pub(crate) fn acquire_inter(&self, max: usize) -> Inter {
        let recycled = self.pool.inters.lock().pop();
        match recycled {
            Some(mut inter) => {
                inter.items.reserve(max);
                inter.children.reserve(max + 1);
                inter.owner = self.owner();
                inter.max = max;
                inter
            }
            None => Inter::with_capacity(self.owner(), max),
        }
    }

    /// Clear `node` and park it, or drop it if its freelist is full.
    ///
    /// The caller must hold the only reference to `node`.
    pub(crate) fn release(&self, node: Node) {
        match node {
            Node::Leaf(mut leaf) => {
                leaf.items.clear();
                leaf.owner = UNOWNED;
                let mut leaves = self.pool.leaves.lock();
                if leaves.len() < self.pool.bound {
                    leaves.push(leaf);
                } else {
                    trace!(bound = self.pool.bound, "leaf freelist full, dropping shell");
                }
            }
            Node::Inter(mut inter) => {
                inter.items.clear();
                inter.children.clear();
                inter.owner = UNOWNED;
                let mut inters = self.pool.inters.lock();
                if inters.len() < self.pool.bound {
                    inters.push(inter);
                } else {
                    trace!(bound = self.pool.bound, "inter freelist full, dropping shell");
                }
            }
        }
    }

    /// Return a mutable view of the node in `slot`, forking it into this
    /// context first unless it is stamped with this context and reachable
    /// only through `slot`.
    ///
    /// Forking copies the node's items and child references; the children
    /// themselves stay shared until they are forked in turn.
    pub(crate) fn fork_if_foreign<'n>(&self, slot: &'n mut Arc<Node>) -> Result<&'n mut Node> {
        if slot.owner() != self.owner() || Arc::get_mut(slot).is_none() {
            let forked = slot.fork_for(self);
            *slot = Arc::new(forked);
        }
        Arc::get_mut(slot).ok_or(Error::InvalidState("forked node is still aliased"))
    }

    /// Take exclusive ownership of a node that was unlinked from the tree,
    /// copying it if another handle still shares it.
    pub(crate) fn detach(&self, node: Arc<Node>) -> Node {
        if node.owner() == self.owner() {
            match Arc::try_unwrap(node) {
                Ok(node) => node,
                Err(shared) => shared.fork_for(self),
            }
        } else {
            node.fork_for(self)
        }
    }

    /// Recycle an unlinked node if this context exclusively owns it;
    /// otherwise just drop the reference.
    pub(crate) fn retire(&self, node: Arc<Node>) {
        if node.owner() != self.owner() {
            return;
        }
        if let Ok(node) = Arc::try_unwrap(node) {
            self.release(node);
        }
    }
}

impl Default for CowContext {
    fn default() -> Self {
        Self::new(DEFAULT_POOL_SIZE)
    }
}

impl fmt::Debug for CowContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CowContext")
            .field("id", &self.pool.id)
            .field("bound", &self.pool.bound)
            .field("idle_leaves", &self.idle_leaves())
            .field("idle_inters", &self.idle_inters())
            .finish()
    }
}
