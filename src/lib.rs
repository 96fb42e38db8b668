//! # cow-bptree
//!
//! An in-memory B+ tree over byte keys and values with copy-on-write
//! snapshots.
//!
//! Cloning a [`Tree`] shares every node with the original. Each handle forks
//! a node the first time it mutates it, so snapshots are O(1) and divergent
//! edits only copy the root-to-leaf paths they touch. Nodes retired by
//! merges go back to a bounded pool owned by the handle's [`CowContext`].
//!
//! ## Example
//!
//! ```rust
//! use cow_bptree::{Direction, Lookup, Tree};
//!
//! let mut tree = Tree::new();
//! tree.insert(b"hello", b"1").unwrap();
//! tree.insert(b"world", b"2").unwrap();
//!
//! let snapshot = tree.clone();
//! tree.remove(b"hello").unwrap();
//!
//! assert_eq!(tree.get(Lookup::Key(b"world")).unwrap(), b"2");
//! assert!(!tree.contains_key(b"hello"));
//! assert!(snapshot.contains_key(b"hello"));
//!
//! let keys: Vec<&[u8]> = snapshot
//!     .scan(None, None, Direction::Descending, false)
//!     .map(|(k, _)| k)
//!     .collect();
//! assert_eq!(keys, [&b"world"[..], &b"hello"[..]]);
//! ```

#![forbid(unsafe_code)]

mod cow;
mod error;
mod inter;
mod item;
mod iter;
mod leaf;
mod node;
mod tree;

pub use cow::{CowContext, DEFAULT_POOL_SIZE};
pub use error::{Error, Result};
pub use iter::{Ascend, Descend, Direction, Iter};
pub use node::Lookup;
pub use tree::{Config, Tree, DEFAULT_NODE_SIZE};

#[cfg(test)]
mod proptests;
