//! Range iteration.
//!
//! A cursor remembers the path from the root to its current leaf as
//! `(internal node, child index)` pairs. Moving past either end of the leaf
//! pops the path to the nearest ancestor with an unvisited neighbour child,
//! then walks down that child's outermost edge to the next leaf.

use smallvec::SmallVec;

use crate::inter::Inter;
use crate::item::{self, Item};
use crate::leaf::Leaf;
use crate::node::{Lookup, Node};

/// Scan order for [`Tree::scan`](crate::Tree::scan).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(test, derive(proptest_derive::Arbitrary))]
pub enum Direction {
    /// Increasing key order.
    #[default]
    Ascending,
    /// Decreasing key order.
    Descending,
}

static EMPTY_ROOT: Node = Node::Leaf(Leaf::empty());
static EMPTY_LEAF: Leaf = Leaf::empty();

type Path<'a> = SmallVec<[(&'a Inter, usize); 8]>;

struct Cursor<'a> {
    path: Path<'a>,
    leaf: &'a Leaf,
    pos: Option<usize>,
    stop: Option<Vec<u8>>,
    inclusive: bool,
}

impl<'a> Cursor<'a> {
    fn new(stop: Option<&[u8]>, inclusive: bool) -> Self {
        Self {
            path: SmallVec::new(),
            leaf: &EMPTY_LEAF,
            pos: None,
            stop: stop.filter(|s| !s.is_empty()).map(<[u8]>::to_vec),
            inclusive,
        }
    }

    /// Walk down from `node`, choosing a child with `pick` at every level.
    fn descend(&mut self, mut node: &'a Node, pick: impl Fn(&Inter) -> usize) {
        loop {
            match node {
                Node::Leaf(leaf) => {
                    self.leaf = leaf;
                    return;
                }
                Node::Inter(inter) => {
                    let i = pick(inter);
                    self.path.push((inter, i));
                    node = &*inter.children[i];
                }
            }
        }
    }

    #[inline]
    fn current(&self) -> Option<&'a Item> {
        let leaf = self.leaf;
        self.pos.and_then(|i| leaf.items.get(i))
    }

    #[inline]
    fn get(&self) -> Option<(&'a [u8], &'a [u8])> {
        self.current().map(Item::decode)
    }
}

/// Cursor moving through keys in increasing order.
pub struct Ascend<'a> {
    cursor: Cursor<'a>,
}

impl<'a> Ascend<'a> {
    pub(crate) fn seek(
        root: Option<&'a Node>,
        start: Option<&[u8]>,
        stop: Option<&[u8]>,
        inclusive: bool,
    ) -> Self {
        let mut it = Self {
            cursor: Cursor::new(stop, inclusive),
        };
        let target = match start.filter(|s| !s.is_empty()) {
            Some(key) => Lookup::Key(key),
            None => Lookup::Min,
        };
        it.cursor
            .descend(root.unwrap_or(&EMPTY_ROOT), |inter| inter.route(target));

        let i = match target {
            Lookup::Key(key) => item::find(&it.cursor.leaf.items, key).0,
            _ => 0,
        };
        if i < it.cursor.leaf.items.len() {
            it.cursor.pos = Some(i);
        } else {
            it.next_leaf();
        }
        it
    }

    /// Whether the cursor points at an item inside the stop bound.
    pub fn valid(&self) -> bool {
        match (self.cursor.current(), &self.cursor.stop) {
            (None, _) => false,
            (Some(_), None) => true,
            (Some(item), Some(stop)) if self.cursor.inclusive => item.key() <= stop.as_slice(),
            (Some(item), Some(stop)) => item.key() < stop.as_slice(),
        }
    }

    /// Step to the next larger key.
    pub fn advance(&mut self) {
        let Some(i) = self.cursor.pos else {
            return;
        };
        if i + 1 < self.cursor.leaf.items.len() {
            self.cursor.pos = Some(i + 1);
        } else {
            self.next_leaf();
        }
    }

    fn next_leaf(&mut self) {
        let c = &mut self.cursor;
        while let Some((inter, i)) = c.path.pop() {
            if i + 1 < inter.children.len() {
                c.path.push((inter, i + 1));
                c.descend(&inter.children[i + 1], |_| 0);
                if !c.leaf.items.is_empty() {
                    c.pos = Some(0);
                    return;
                }
            }
        }
        c.pos = None;
    }

    pub fn get(&self) -> Option<(&'a [u8], &'a [u8])> {
        self.cursor.get()
    }
}

/// Cursor moving through keys in decreasing order.
pub struct Descend<'a> {
    cursor: Cursor<'a>,
}

impl<'a> Descend<'a> {
    pub(crate) fn seek(
        root: Option<&'a Node>,
        start: Option<&[u8]>,
        stop: Option<&[u8]>,
        inclusive: bool,
    ) -> Self {
        let mut it = Self {
            cursor: Cursor::new(stop, inclusive),
        };
        let target = match start.filter(|s| !s.is_empty()) {
            Some(key) => Lookup::Key(key),
            None => Lookup::Max,
        };
        it.cursor
            .descend(root.unwrap_or(&EMPTY_ROOT), |inter| inter.route(target));

        // number of items at or below the start key
        let end = match target {
            Lookup::Key(key) => match item::find(&it.cursor.leaf.items, key) {
                (i, true) => i + 1,
                (i, false) => i,
            },
            _ => it.cursor.leaf.items.len(),
        };
        match end.checked_sub(1) {
            Some(i) => it.cursor.pos = Some(i),
            None => it.prev_leaf(),
        }
        it
    }

    /// Whether the cursor points at an item inside the stop bound.
    pub fn valid(&self) -> bool {
        match (self.cursor.current(), &self.cursor.stop) {
            (None, _) => false,
            (Some(_), None) => true,
            (Some(item), Some(stop)) if self.cursor.inclusive => item.key() >= stop.as_slice(),
            (Some(item), Some(stop)) => item.key() > stop.as_slice(),
        }
    }

    /// Step to the next smaller key.
    pub fn advance(&mut self) {
        match self.cursor.pos {
            None => {}
            Some(0) => self.prev_leaf(),
            Some(i) => self.cursor.pos = Some(i - 1),
        }
    }

    fn prev_leaf(&mut self) {
        let c = &mut self.cursor;
        while let Some((inter, i)) = c.path.pop() {
            if i > 0 {
                c.path.push((inter, i - 1));
                c.descend(&inter.children[i - 1], |n| n.children.len().saturating_sub(1));
                if let Some(last) = c.leaf.items.len().checked_sub(1) {
                    c.pos = Some(last);
                    return;
                }
            }
        }
        c.pos = None;
    }

    pub fn get(&self) -> Option<(&'a [u8], &'a [u8])> {
        self.cursor.get()
    }
}

/// Bounded range iterator returned by [`Tree::scan`](crate::Tree::scan).
///
/// Usable either as a cursor (`valid` / `advance` / `get`) or as a standard
/// [`Iterator`] over `(key, value)` pairs. It borrows the tree, so the
/// snapshot it reads cannot change underneath it. It is not restartable.
pub enum Iter<'a> {
    Ascend(Ascend<'a>),
    Descend(Descend<'a>),
}

impl<'a> Iter<'a> {
    pub(crate) fn seek(
        root: Option<&'a Node>,
        start: Option<&[u8]>,
        stop: Option<&[u8]>,
        direction: Direction,
        inclusive: bool,
    ) -> Self {
        match direction {
            Direction::Ascending => Iter::Ascend(Ascend::seek(root, start, stop, inclusive)),
            Direction::Descending => Iter::Descend(Descend::seek(root, start, stop, inclusive)),
        }
    }

    pub fn valid(&self) -> bool {
        match self {
            Iter::Ascend(it) => it.valid(),
            Iter::Descend(it) => it.valid(),
        }
    }

    pub fn advance(&mut self) {
        match self {
            Iter::Ascend(it) => it.advance(),
            Iter::Descend(it) => it.advance(),
        }
    }

    /// Current `(key, value)`, or `None` once the cursor ran off the tree.
    ///
    /// This does not apply the stop bound; check [`valid`](Self::valid).
    pub fn get(&self) -> Option<(&'a [u8], &'a [u8])> {
        match self {
            Iter::Ascend(it) => it.get(),
            Iter::Descend(it) => it.get(),
        }
    }

    pub fn key(&self) -> Option<&'a [u8]> {
        self.get().map(|(k, _)| k)
    }

    pub fn value(&self) -> Option<&'a [u8]> {
        self.get().map(|(_, v)| v)
    }
}

impl<'a> Iterator for Iter<'a> {
    type Item = (&'a [u8], &'a [u8]);

    fn next(&mut self) -> Option<Self::Item> {
        if !self.valid() {
            return None;
        }
        let kv = self.get();
        self.advance();
        kv
    }
}

impl std::iter::FusedIterator for Iter<'_> {}
