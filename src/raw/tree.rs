use core::borrow::Borrow;
use core::cmp::Ordering;

use smallvec::SmallVec;

use super::arena::BlockArena;
use super::handle::Handle;
use super::node::{InnerNode, LeafNode, MAX_INNER_KEYS, MAX_LEAF_ITEMS, Node, SearchResult};
use super::size::Size;

/// A position inside the tree: a leaf handle and an in-leaf index. The end
/// position is represented as `None` at the call sites that need one.
pub(crate) type Pos = (Handle, usize);

/// The B+tree engine backing all four public containers.
///
/// The struct itself plays the anchor role: it owns the real root, the ends of
/// the leaf chain, and the total element count. `None` everywhere plus
/// `len == 0` is the canonical empty state.
pub(crate) struct RawRankedTree<K, V> {
    /// Arena storing all tree nodes; every block fits either node variant.
    nodes: BlockArena<Node<K>>,
    /// Arena storing all values (separate from nodes for cache efficiency).
    values: BlockArena<V>,
    /// Handle to the root node, if the tree is non-empty.
    root: Option<Handle>,
    /// Total number of elements in the tree.
    len: usize,
    /// Handle to the first (leftmost) leaf, for forward iteration.
    first_leaf: Option<Handle>,
    /// Handle to the last (rightmost) leaf, for backward iteration.
    last_leaf: Option<Handle>,
}

/// One step of a root-to-leaf traversal.
struct PathElement {
    node: Handle,
    /// Index of the child we descended into.
    child_index: usize,
}

type Path = SmallVec<[PathElement; 16]>;

impl<K, V> RawRankedTree<K, V> {
    pub(crate) const fn new() -> Self {
        Self {
            nodes: BlockArena::new(),
            values: BlockArena::new(),
            root: None,
            len: 0,
            first_leaf: None,
            last_leaf: None,
        }
    }

    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            nodes: BlockArena::with_capacity(capacity.div_ceil(MAX_LEAF_ITEMS)),
            values: BlockArena::with_capacity(capacity),
            root: None,
            len: 0,
            first_leaf: None,
            last_leaf: None,
        }
    }

    pub(crate) const fn len(&self) -> usize {
        self.len
    }

    pub(crate) const fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub(crate) fn capacity(&self) -> usize {
        self.values.capacity()
    }

    /// Upper bound on the element count, imposed by the handle width.
    pub(crate) const fn max_len() -> usize {
        Size::MAX
    }

    pub(crate) fn clear(&mut self) {
        self.nodes.clear();
        self.values.clear();
        self.root = None;
        self.len = 0;
        self.first_leaf = None;
        self.last_leaf = None;
    }

    pub(crate) fn first_leaf(&self) -> Option<Handle> {
        self.first_leaf
    }

    pub(crate) fn last_leaf(&self) -> Option<Handle> {
        self.last_leaf
    }

    pub(crate) fn node(&self, handle: Handle) -> &Node<K> {
        self.nodes.get(handle)
    }

    /// Returns a reference to a node by handle from a raw pointer.
    ///
    /// # Safety
    /// - `ptr` must point to a valid, allocated `RawRankedTree<K, V>`.
    pub(crate) unsafe fn node_ptr<'a>(ptr: *const Self, handle: Handle) -> &'a Node<K> {
        // SAFETY: Only the `nodes` field is accessed, through addr_of, avoiding
        // aliasing with the `values` field.
        unsafe { BlockArena::get_ptr(core::ptr::addr_of!((*ptr).nodes), handle) }
    }

    pub(crate) fn value(&self, handle: Handle) -> &V {
        self.values.get(handle)
    }

    pub(crate) fn value_mut(&mut self, handle: Handle) -> &mut V {
        self.values.get_mut(handle)
    }

    /// Returns a mutable reference to a value by handle from a raw pointer.
    ///
    /// # Safety
    /// - `ptr` must point to a valid, allocated `RawRankedTree<K, V>`.
    /// - The caller must have logical exclusive access to the value at `handle`
    ///   and must not hold another reference into the values arena.
    pub(crate) unsafe fn value_mut_ptr<'a>(ptr: *mut Self, handle: Handle) -> &'a mut V {
        // SAFETY: Only the `values` field is accessed, avoiding aliasing with
        // the `nodes` field.
        unsafe { (*core::ptr::addr_of_mut!((*ptr).values)).get_mut(handle) }
    }

    /// Leaf-chain neighbor step for the mutable iterators, which must not
    /// create a reference to the whole tree while handed-out value references
    /// are live.
    ///
    /// # Safety
    /// - `ptr` must point to a valid, allocated `RawRankedTree<K, V>`; only
    ///   the nodes arena is read.
    pub(crate) unsafe fn step_pos_ptr(ptr: *const Self, pos: Pos, forward: bool) -> Option<Pos> {
        let (leaf, index) = pos;
        // SAFETY: Forwarded from the caller; only the `nodes` field is read.
        let node = unsafe { Self::node_ptr(ptr, leaf) }.as_leaf();
        if forward {
            if index + 1 < node.len() {
                Some((leaf, index + 1))
            } else {
                node.next().map(|next| (next, 0))
            }
        } else if index > 0 {
            Some((leaf, index - 1))
        } else {
            let prev = node.prev()?;
            // SAFETY: Same as above.
            let prev_len = unsafe { Self::node_ptr(ptr, prev) }.as_leaf().len();
            Some((prev, prev_len - 1))
        }
    }

    /// Position of the element at `rank`; `None` when `rank >= len`.
    ///
    /// Top-down descent subtracting cached child sizes. The child scan is
    /// linear: fan-out is small and the loop is branch-predictable.
    pub(crate) fn pos_at_rank(&self, rank: usize) -> Option<Pos> {
        if rank >= self.len {
            return None;
        }

        let mut current = self.root?;
        let mut remaining = rank;

        loop {
            match self.nodes.get(current) {
                Node::Inner(inner) => {
                    let mut index = 0;
                    loop {
                        debug_assert!(
                            index < inner.child_count(),
                            "`RawRankedTree::pos_at_rank()` - size cache out of sync!"
                        );
                        let child_size = inner.child_size(index).to_usize();
                        if remaining < child_size {
                            break;
                        }
                        remaining -= child_size;
                        index += 1;
                    }
                    current = inner.child(index);
                }
                Node::Leaf(_) => return Some((current, remaining)),
            }
        }
    }

    /// Number of elements strictly before the given position.
    ///
    /// Ascends the parent links, adding the cached sizes of every earlier
    /// sibling at each level.
    pub(crate) fn rank_of_pos(&self, leaf: Handle, index: usize) -> usize {
        let mut rank = index;
        let mut current = leaf;

        while let Some(parent) = self.nodes.get(current).parent() {
            let inner = self.nodes.get(parent).as_inner();
            let slot = inner.position_of_child(current);
            for earlier in 0..slot {
                rank += inner.child_size(earlier).to_usize();
            }
            current = parent;
        }

        rank
    }

    /// Moves a position by `offset` elements; `None` is the end position on
    /// both sides of the call. Steps of one use the leaf chain; longer jumps
    /// go through the rank of the position.
    pub(crate) fn advance_pos(&self, pos: Option<Pos>, offset: isize) -> Option<Pos> {
        match offset {
            0 => pos,
            1 => {
                let (leaf, index) = pos?;
                let node = self.nodes.get(leaf).as_leaf();
                if index + 1 < node.len() {
                    Some((leaf, index + 1))
                } else {
                    node.next().map(|next| (next, 0))
                }
            }
            -1 => match pos {
                Some((leaf, index)) => {
                    if index > 0 {
                        Some((leaf, index - 1))
                    } else {
                        let prev = self.nodes.get(leaf).as_leaf().prev()?;
                        Some((prev, self.nodes.get(prev).as_leaf().len() - 1))
                    }
                }
                None => self.last_pos(),
            },
            _ => {
                let rank = match pos {
                    Some((leaf, index)) => self.rank_of_pos(leaf, index),
                    None => self.len,
                };
                let target = rank.checked_add_signed(offset)?;
                self.pos_at_rank(target)
            }
        }
    }

    /// Position one element before `pos` (`None` meaning the end position).
    pub(crate) fn pos_before(&self, pos: Option<Pos>) -> Option<Pos> {
        self.advance_pos(pos, -1)
    }

    pub(crate) fn first_pos(&self) -> Option<Pos> {
        self.first_leaf.map(|leaf| (leaf, 0))
    }

    pub(crate) fn last_pos(&self) -> Option<Pos> {
        let last = self.last_leaf?;
        Some((last, self.nodes.get(last).as_leaf().len() - 1))
    }

    /// Drains all elements in order by walking the leaf chain; O(n), no
    /// rebalancing.
    pub(crate) fn drain_to_vec(&mut self) -> alloc::vec::Vec<(K, V)> {
        if self.len == 0 {
            return alloc::vec::Vec::new();
        }

        let mut result = alloc::vec::Vec::with_capacity(self.len);
        let mut current = self.first_leaf;

        while let Some(leaf_handle) = current {
            let leaf = self.nodes.get_mut(leaf_handle).as_leaf_mut();
            let next = leaf.next();
            let (keys, value_handles) = leaf.take_all();

            for (key, handle) in keys.into_iter().zip(value_handles) {
                let value = self.values.take(handle);
                result.push((key, value));
            }

            current = next;
        }

        self.nodes.clear();
        self.root = None;
        self.len = 0;
        self.first_leaf = None;
        self.last_leaf = None;

        result
    }
}

impl<K: Clone + Ord, V> RawRankedTree<K, V> {
    // ─── Search ──────────────────────────────────────────────────────────────

    /// Exact-match search; with duplicates present, lands on an unspecified
    /// one of the equal items.
    pub(crate) fn search<Q>(&self, key: &Q) -> Option<Pos>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        let mut current = self.root?;

        loop {
            match self.nodes.get(current) {
                Node::Inner(inner) => current = inner.child(inner.descend_lower(key)),
                Node::Leaf(leaf) => {
                    if let SearchResult::Found(index) = leaf.search(key) {
                        return Some((current, index));
                    }
                    return None;
                }
            }
        }
    }

    /// Position of the first element not less than `key`; `None` when every
    /// element is smaller.
    pub(crate) fn lower_bound_pos<Q>(&self, key: &Q) -> Option<Pos>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        let mut current = self.root?;

        loop {
            match self.nodes.get(current) {
                Node::Inner(inner) => current = inner.child(inner.descend_lower(key)),
                Node::Leaf(leaf) => {
                    let index = leaf.lower_bound_index(key);
                    if index < leaf.len() {
                        return Some((current, index));
                    }
                    return leaf.next().map(|next| (next, 0));
                }
            }
        }
    }

    /// Position of the first element strictly greater than `key`; `None` when
    /// no element is greater.
    pub(crate) fn upper_bound_pos<Q>(&self, key: &Q) -> Option<Pos>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        let mut current = self.root?;

        loop {
            match self.nodes.get(current) {
                Node::Inner(inner) => current = inner.child(inner.descend_upper(key)),
                Node::Leaf(leaf) => {
                    let index = leaf.upper_bound_index(key);
                    if index < leaf.len() {
                        return Some((current, index));
                    }
                    return leaf.next().map(|next| (next, 0));
                }
            }
        }
    }

    /// Position of the leftmost element equal to `key`.
    pub(crate) fn find_lowest<Q>(&self, key: &Q) -> Option<Pos>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        let (leaf, index) = self.lower_bound_pos(key)?;
        if self.nodes.get(leaf).as_leaf().key(index).borrow() == key {
            Some((leaf, index))
        } else {
            None
        }
    }

    pub(crate) fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        let (leaf, index) = self.search(key)?;
        let leaf = self.nodes.get(leaf).as_leaf();
        Some(self.values.get(leaf.value(index)))
    }

    pub(crate) fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        let (leaf, index) = self.search(key)?;
        let leaf = self.nodes.get(leaf).as_leaf();
        let value_handle = leaf.value(index);
        Some(self.values.get_mut(value_handle))
    }

    pub(crate) fn get_key_value<Q>(&self, key: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        let (leaf, index) = self.search(key)?;
        let leaf = self.nodes.get(leaf).as_leaf();
        Some((leaf.key(index), self.values.get(leaf.value(index))))
    }

    pub(crate) fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.search(key).is_some()
    }

    pub(crate) fn first_key_value(&self) -> Option<(&K, &V)> {
        let leaf = self.nodes.get(self.first_leaf?).as_leaf();
        Some((leaf.key(0), self.values.get(leaf.value(0))))
    }

    pub(crate) fn last_key_value(&self) -> Option<(&K, &V)> {
        let leaf = self.nodes.get(self.last_leaf?).as_leaf();
        let index = leaf.len() - 1;
        Some((leaf.key(index), self.values.get(leaf.value(index))))
    }

    // ─── Rank and positional access ──────────────────────────────────────────

    /// Resolves `RangeBounds` to inclusive front/back positions; `None` on
    /// either side means the range is empty from that side.
    pub(crate) fn range_endpoints<T, R>(&self, range: &R) -> (Option<Pos>, Option<Pos>)
    where
        T: ?Sized + Ord,
        K: Borrow<T>,
        R: core::ops::RangeBounds<T>,
    {
        let front = match range.start_bound() {
            core::ops::Bound::Unbounded => self.first_pos(),
            core::ops::Bound::Included(key) => self.lower_bound_pos(key),
            core::ops::Bound::Excluded(key) => self.upper_bound_pos(key),
        };
        let back = match range.end_bound() {
            core::ops::Bound::Unbounded => self.last_pos(),
            core::ops::Bound::Included(key) => self.pos_before(self.upper_bound_pos(key)),
            core::ops::Bound::Excluded(key) => self.pos_before(self.lower_bound_pos(key)),
        };
        (front, back)
    }

    /// Number of elements strictly less than `key`.
    pub(crate) fn rank_lower_bound<Q>(&self, key: &Q) -> usize
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        let Some(mut current) = self.root else { return 0 };
        let mut rank = 0;

        loop {
            match self.nodes.get(current) {
                Node::Inner(inner) => {
                    let slot = inner.descend_lower(key);
                    for earlier in 0..slot {
                        rank += inner.child_size(earlier).to_usize();
                    }
                    current = inner.child(slot);
                }
                Node::Leaf(leaf) => return rank + leaf.lower_bound_index(key),
            }
        }
    }

    /// Number of elements less than or equal to `key`.
    pub(crate) fn rank_upper_bound<Q>(&self, key: &Q) -> usize
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        let Some(mut current) = self.root else { return 0 };
        let mut rank = 0;

        loop {
            match self.nodes.get(current) {
                Node::Inner(inner) => {
                    let slot = inner.descend_upper(key);
                    for earlier in 0..slot {
                        rank += inner.child_size(earlier).to_usize();
                    }
                    current = inner.child(slot);
                }
                Node::Leaf(leaf) => return rank + leaf.upper_bound_index(key),
            }
        }
    }

    /// Number of elements equal to `key`.
    pub(crate) fn count_key<Q>(&self, key: &Q) -> usize
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.rank_upper_bound(key) - self.rank_lower_bound(key)
    }

    /// Number of elements with `min <= key <= max`; zero when `max < min`.
    pub(crate) fn count_range<Q>(&self, min: &Q, max: &Q) -> usize
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        if max < min {
            return 0;
        }
        self.rank_upper_bound(max) - self.rank_lower_bound(min)
    }

    pub(crate) fn get_by_rank(&self, rank: usize) -> Option<(&K, &V)> {
        let (leaf, index) = self.pos_at_rank(rank)?;
        let leaf = self.nodes.get(leaf).as_leaf();
        Some((leaf.key(index), self.values.get(leaf.value(index))))
    }

    pub(crate) fn get_by_rank_mut(&mut self, rank: usize) -> Option<(&K, &mut V)> {
        let (leaf, index) = self.pos_at_rank(rank)?;
        let leaf = self.nodes.get(leaf).as_leaf();
        let key = leaf.key(index);
        let value_handle = leaf.value(index);
        // The borrow checker sees `self` borrowed twice, but keys live in the
        // nodes arena and values in the values arena.
        //
        // SAFETY:
        // - `key` points into `self.nodes`, `value` into `self.values`; the
        //   arenas are disjoint allocations.
        // - Only `self.values` is mutated, so the key reference stays valid.
        let key_ptr = key as *const K;
        let value = self.values.get_mut(value_handle);
        Some((unsafe { &*key_ptr }, value))
    }

    /// Rank of the leftmost element equal to `key`, if present.
    pub(crate) fn rank_of<Q>(&self, key: &Q) -> Option<usize>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        let (leaf, index) = self.find_lowest(key)?;
        Some(self.rank_of_pos(leaf, index))
    }

    /// Resolves signed slice endpoints to a `begin..end` rank range.
    /// Negative `begin` counts from the end; `end <= 0` is relative to the
    /// end, so an `end` of zero means the whole tail.
    pub(crate) fn slice_bounds(&self, begin: isize, end: isize) -> Option<(usize, usize)> {
        #[allow(clippy::cast_possible_wrap)]
        let len = self.len as isize;
        let begin = if begin < 0 { (len + begin).max(0) } else { begin };
        let end = if end <= 0 { len + end } else { end.min(len) };
        if begin > end || begin >= len {
            return None;
        }
        #[allow(clippy::cast_sign_loss)]
        Some((begin as usize, end as usize))
    }

    // ─── Insert engine ───────────────────────────────────────────────────────

    /// Inserts into an empty tree: a single leaf that is also the root.
    fn insert_first(&mut self, key: K, value: V) {
        let value_handle = self.values.alloc(value);
        let mut leaf = LeafNode::new();
        leaf.push(key, value_handle);
        let leaf_handle = self.nodes.alloc(Node::Leaf(leaf));
        self.root = Some(leaf_handle);
        self.first_leaf = Some(leaf_handle);
        self.last_leaf = Some(leaf_handle);
        self.len = 1;
    }

    /// Unique-key insert. Replaces the value in place when the key is already
    /// present and returns the previous value.
    pub(crate) fn insert_unique(&mut self, key: K, value: V) -> Option<V> {
        let Some(root) = self.root else {
            self.insert_first(key, value);
            return None;
        };

        let mut path: Path = SmallVec::new();
        let mut current = root;

        loop {
            match self.nodes.get(current) {
                Node::Inner(inner) => {
                    let child_index = inner.descend_lower(&key);
                    path.push(PathElement {
                        node: current,
                        child_index,
                    });
                    current = inner.child(child_index);
                }
                Node::Leaf(_) => break,
            }
        }

        match self.nodes.get(current).as_leaf().search(&key) {
            SearchResult::Found(index) => Some(self.replace_value(current, index, value)),
            SearchResult::NotFound(index) => {
                self.insert_into_leaf(current, index, key, value, path);
                None
            }
        }
    }

    /// Multi-key insert; equal keys land after the existing ones.
    pub(crate) fn insert_multi(&mut self, key: K, value: V) {
        let Some(root) = self.root else {
            self.insert_first(key, value);
            return;
        };

        let mut path: Path = SmallVec::new();
        let mut current = root;

        loop {
            match self.nodes.get(current) {
                Node::Inner(inner) => {
                    let child_index = inner.descend_upper(&key);
                    path.push(PathElement {
                        node: current,
                        child_index,
                    });
                    current = inner.child(child_index);
                }
                Node::Leaf(_) => break,
            }
        }

        let index = self.nodes.get(current).as_leaf().upper_bound_index(&key);
        self.insert_into_leaf(current, index, key, value, path);
    }

    /// Hinted unique insert. `hint` is the rank the caller believes the key
    /// belongs at; an accurate hint skips the comparator descent.
    pub(crate) fn insert_hinted_unique(&mut self, hint: usize, key: K, value: V) -> Option<V> {
        if self.root.is_none() {
            self.insert_first(key, value);
            return None;
        }

        let pos = if hint >= self.len { None } else { self.pos_at_rank(hint) };
        let Some((leaf, index)) = pos else {
            // End hint: accepted when the key extends the maximum.
            let last = self.last_leaf.unwrap();
            let node = self.nodes.get(last).as_leaf();
            let last_index = node.len() - 1;
            return match key.cmp(node.key(last_index)) {
                Ordering::Greater => {
                    let at = last_index + 1;
                    self.insert_at_pos(last, at, key, value);
                    None
                }
                Ordering::Equal => Some(self.replace_value(last, last_index, value)),
                Ordering::Less => self.insert_unique(key, value),
            };
        };

        match key.cmp(self.nodes.get(leaf).as_leaf().key(index)) {
            Ordering::Equal => Some(self.replace_value(leaf, index, value)),
            Ordering::Greater => self.insert_unique(key, value),
            Ordering::Less => match self.pos_before(Some((leaf, index))) {
                // Begin hint with the key below the minimum.
                None => {
                    self.insert_at_pos(leaf, index, key, value);
                    None
                }
                Some((prev_leaf, prev_index)) => {
                    match key.cmp(self.nodes.get(prev_leaf).as_leaf().key(prev_index)) {
                        Ordering::Greater => {
                            self.insert_at_pos(leaf, index, key, value);
                            None
                        }
                        Ordering::Equal => Some(self.replace_value(prev_leaf, prev_index, value)),
                        Ordering::Less => self.insert_unique(key, value),
                    }
                }
            },
        }
    }

    /// Hinted multi insert. An accepted hint lands the new element directly
    /// before the hinted position, so equal keys keep the order the hints
    /// arrived in.
    pub(crate) fn insert_hinted_multi(&mut self, hint: usize, key: K, value: V) {
        if self.root.is_none() {
            self.insert_first(key, value);
            return;
        }

        let pos = if hint >= self.len { None } else { self.pos_at_rank(hint) };
        let Some((leaf, index)) = pos else {
            // End hint: accepted when nothing is greater than the key.
            let last = self.last_leaf.unwrap();
            let node = self.nodes.get(last).as_leaf();
            let last_index = node.len() - 1;
            if *node.key(last_index) <= key {
                self.insert_at_pos(last, last_index + 1, key, value);
            } else {
                self.insert_multi(key, value);
            }
            return;
        };

        if key > *self.nodes.get(leaf).as_leaf().key(index) {
            self.insert_multi(key, value);
            return;
        }
        match self.pos_before(Some((leaf, index))) {
            None => self.insert_at_pos(leaf, index, key, value),
            Some((prev_leaf, prev_index)) => {
                if *self.nodes.get(prev_leaf).as_leaf().key(prev_index) <= key {
                    self.insert_at_pos(leaf, index, key, value);
                } else {
                    self.insert_multi(key, value);
                }
            }
        }
    }

    fn replace_value(&mut self, leaf: Handle, index: usize, value: V) -> V {
        let value_handle = self.nodes.get(leaf).as_leaf().value(index);
        core::mem::replace(self.values.get_mut(value_handle), value)
    }

    /// Direct-position insert used by accepted hints; the path is rebuilt
    /// from the parent links instead of a comparator descent.
    fn insert_at_pos(&mut self, leaf: Handle, index: usize, key: K, value: V) {
        let path = self.path_to(leaf);
        self.insert_into_leaf(leaf, index, key, value, path);
    }

    fn insert_into_leaf(&mut self, leaf_handle: Handle, index: usize, key: K, value: V, mut path: Path) {
        let value_handle = self.values.alloc(value);
        let leaf = self.nodes.get_mut(leaf_handle).as_leaf_mut();
        leaf.insert(index, key, value_handle);
        self.len += 1;

        if self.nodes.get(leaf_handle).as_leaf().len() > MAX_LEAF_ITEMS {
            self.split_leaf_and_propagate(leaf_handle, &mut path);
        } else {
            self.increment_sizes_along_path(&path);
        }
    }

    /// Splits an overflowing leaf and hands the new sibling upward.
    fn split_leaf_and_propagate(&mut self, leaf_handle: Handle, path: &mut Path) {
        let leaf = self.nodes.get_mut(leaf_handle).as_leaf_mut();
        let (separator, mut right_leaf) = leaf.split();

        let left_size = Size::from_usize(leaf.len());
        let right_size = Size::from_usize(right_leaf.len());

        let old_next = leaf.next();
        right_leaf.set_prev(Some(leaf_handle));
        right_leaf.set_next(old_next);

        let right_handle = self.nodes.alloc(Node::Leaf(right_leaf));
        self.nodes.get_mut(leaf_handle).as_leaf_mut().set_next(Some(right_handle));
        if let Some(next) = old_next {
            self.nodes.get_mut(next).as_leaf_mut().set_prev(Some(right_handle));
        }
        if self.last_leaf == Some(leaf_handle) {
            self.last_leaf = Some(right_handle);
        }

        self.propagate_split(path, separator, right_handle, left_size, right_size);
    }

    /// Inserts a freshly split-off sibling into the parent, splitting inner
    /// nodes in turn and growing a new root when the split reaches the top.
    fn propagate_split(
        &mut self,
        path: &mut Path,
        mut separator: K,
        mut new_child: Handle,
        mut left_size: Size,
        mut right_size: Size,
    ) {
        while let Some(elem) = path.pop() {
            let parent = self.nodes.get_mut(elem.node).as_inner_mut();
            parent.set_child_size(elem.child_index, left_size);
            parent.insert_child(elem.child_index, separator, new_child, right_size);
            parent.update_size();
            self.nodes.get_mut(new_child).set_parent(Some(elem.node));

            let parent = self.nodes.get(elem.node).as_inner();
            if parent.key_count() <= MAX_INNER_KEYS {
                self.update_sizes_along_path(path);
                return;
            }

            let (median, right_inner) = self.nodes.get_mut(elem.node).as_inner_mut().split();
            left_size = self.nodes.get(elem.node).as_inner().size();
            right_size = right_inner.size();

            let right_handle = self.nodes.alloc(Node::Inner(right_inner));
            self.fix_child_parents(right_handle);

            separator = median;
            new_child = right_handle;
        }

        // The split outgrew the root.
        let old_root = self.root.unwrap();
        let old_root_size = Size::from_usize(self.nodes.get(old_root).subtree_size());

        let mut new_root = InnerNode::new();
        new_root.set_first_child(old_root, old_root_size);
        new_root.push_child(separator, new_child, right_size);
        new_root.update_size();

        let new_root_handle = self.nodes.alloc(Node::Inner(new_root));
        self.nodes.get_mut(old_root).set_parent(Some(new_root_handle));
        self.nodes.get_mut(new_child).set_parent(Some(new_root_handle));
        self.root = Some(new_root_handle);
    }

    // ─── Erase engine ────────────────────────────────────────────────────────

    /// Unique-key removal.
    pub(crate) fn remove_entry<Q>(&mut self, key: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        let root = self.root?;

        let mut path: Path = SmallVec::new();
        let mut current = root;

        loop {
            match self.nodes.get(current) {
                Node::Inner(inner) => {
                    let child_index = inner.descend_lower(key);
                    path.push(PathElement {
                        node: current,
                        child_index,
                    });
                    current = inner.child(child_index);
                }
                Node::Leaf(_) => break,
            }
        }

        let index = match self.nodes.get(current).as_leaf().search(key) {
            SearchResult::Found(index) => index,
            SearchResult::NotFound(_) => return None,
        };

        Some(self.erase_at_leaf(current, index, path))
    }

    pub(crate) fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.remove_entry(key).map(|(_, value)| value)
    }

    /// Multi-key removal: erases every element equal to `key`, one at a time,
    /// and returns how many were removed.
    pub(crate) fn remove_all<Q>(&mut self, key: &Q) -> usize
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        let mut count = 0;
        while let Some((leaf, index)) = self.find_lowest(key) {
            let path = self.path_to(leaf);
            self.erase_at_leaf(leaf, index, path);
            count += 1;
        }
        count
    }

    /// Positional removal by rank.
    pub(crate) fn remove_at(&mut self, rank: usize) -> Option<(K, V)> {
        let (leaf, index) = self.pos_at_rank(rank)?;
        let path = self.path_to(leaf);
        Some(self.erase_at_leaf(leaf, index, path))
    }

    /// Removes the rank range resolved from signed slice endpoints, erasing
    /// from the back so earlier ranks stay stable. Returns the removed count.
    pub(crate) fn remove_slice(&mut self, begin: isize, end: isize) -> usize {
        let Some((begin, end)) = self.slice_bounds(begin, end) else {
            return 0;
        };
        if begin == 0 && end == self.len {
            let removed = self.len;
            self.clear();
            return removed;
        }
        for rank in (begin..end).rev() {
            self.remove_at(rank);
        }
        end - begin
    }

    pub(crate) fn pop_first(&mut self) -> Option<(K, V)> {
        let leaf = self.first_leaf?;
        let path = self.path_to(leaf);
        Some(self.erase_at_leaf(leaf, 0, path))
    }

    pub(crate) fn pop_last(&mut self) -> Option<(K, V)> {
        let leaf = self.last_leaf?;
        let index = self.nodes.get(leaf).as_leaf().len() - 1;
        let path = self.path_to(leaf);
        Some(self.erase_at_leaf(leaf, index, path))
    }

    /// Positional removal at a known leaf slot.
    pub(crate) fn erase_pos(&mut self, leaf: Handle, index: usize) -> (K, V) {
        let path = self.path_to(leaf);
        self.erase_at_leaf(leaf, index, path)
    }

    /// Removes the element at a known position and restores every invariant:
    /// separator refresh, underflow rebalancing, size propagation, root
    /// shrink.
    fn erase_at_leaf(&mut self, leaf_handle: Handle, index: usize, mut path: Path) -> (K, V) {
        let (key, value_handle) = self.nodes.get_mut(leaf_handle).as_leaf_mut().remove(index);
        let value = self.values.take(value_handle);
        self.len -= 1;

        if self.len == 0 {
            // Collapse to the canonical empty state.
            self.nodes.clear();
            self.root = None;
            self.first_leaf = None;
            self.last_leaf = None;
            return (key, value);
        }

        // Removing the maximum leaves a stale separator in the first ancestor
        // for which this leaf is not the rightmost descendant.
        let leaf = self.nodes.get(leaf_handle).as_leaf();
        if index == leaf.len() && leaf.len() > 0 {
            let last = leaf.last_key().unwrap().clone();
            self.refresh_separator(&path, last);
        }

        let leaf = self.nodes.get(leaf_handle).as_leaf();
        if path.is_empty() || !leaf.is_underflowing() {
            self.update_sizes_along_path(&path);
            return (key, value);
        }

        self.rebalance_leaf(leaf_handle, &mut path);
        (key, value)
    }

    /// Rewrites the ancestor separator that tracked this leaf's old maximum.
    fn refresh_separator(&mut self, path: &Path, last_key: K) {
        for elem in path.iter().rev() {
            let inner = self.nodes.get_mut(elem.node).as_inner_mut();
            if elem.child_index < inner.key_count() {
                inner.set_key(elem.child_index, last_key);
                return;
            }
        }
    }

    /// Resolves a leaf underflow against its chain neighbors.
    ///
    /// Shifting is only possible between children of the same parent, so the
    /// neighbors' parents (read off their parent links) decide between
    /// borrowing and merging:
    /// - both neighbors few or absent: merge with the same-parent one;
    /// - one side ample: shift from it when it shares the parent, otherwise
    ///   merge with the few same-parent side;
    /// - both ample: shift from the larger same-parent neighbor.
    fn rebalance_leaf(&mut self, leaf_handle: Handle, path: &mut Path) {
        let elem = path.last().unwrap();
        let parent_handle = elem.node;
        let child_index = elem.child_index;

        let leaf = self.nodes.get(leaf_handle).as_leaf();
        let info = |handle: Option<Handle>| {
            handle.map(|h| {
                let node = self.nodes.get(h);
                let shares_parent = node.parent() == Some(parent_handle);
                let leaf = node.as_leaf();
                (h, shares_parent, leaf.is_few(), leaf.len())
            })
        };
        let left = info(leaf.prev());
        let right = info(leaf.next());

        let left_few = left.is_none_or(|(_, _, few, _)| few);
        let right_few = right.is_none_or(|(_, _, few, _)| few);

        if left_few && right_few {
            // No donor anywhere; merge with the sibling that shares the parent.
            self.merge_leaf_with_sibling(leaf_handle, parent_handle, child_index, path);
            return;
        }

        if left_few {
            let (right_handle, shares_parent, _, _) = right.unwrap();
            if shares_parent {
                self.shift_leaf_from_right(leaf_handle, right_handle, parent_handle, child_index);
                self.update_sizes_along_path(path);
            } else {
                self.merge_leaf_with_sibling(leaf_handle, parent_handle, child_index, path);
            }
            return;
        }

        if right_few {
            let (left_handle, shares_parent, _, _) = left.unwrap();
            if shares_parent {
                self.shift_leaf_from_left(leaf_handle, left_handle, parent_handle, child_index);
                self.update_sizes_along_path(path);
            } else {
                self.merge_leaf_with_sibling(leaf_handle, parent_handle, child_index, path);
            }
            return;
        }

        let (left_handle, left_shares, _, left_len) = left.unwrap();
        let (right_handle, right_shares, _, right_len) = right.unwrap();
        if left_shares && (!right_shares || left_len >= right_len) {
            self.shift_leaf_from_left(leaf_handle, left_handle, parent_handle, child_index);
        } else {
            self.shift_leaf_from_right(leaf_handle, right_handle, parent_handle, child_index);
        }
        self.update_sizes_along_path(path);
    }

    /// Merges an underflowing leaf with its same-parent neighbor, preferring
    /// the left one.
    fn merge_leaf_with_sibling(
        &mut self,
        leaf_handle: Handle,
        parent_handle: Handle,
        child_index: usize,
        path: &mut Path,
    ) {
        let parent = self.nodes.get(parent_handle).as_inner();
        if child_index > 0 {
            let partner = parent.child(child_index - 1);
            self.merge_leaves(partner, leaf_handle, path, child_index - 1);
        } else {
            let partner = parent.child(child_index + 1);
            self.merge_leaves(leaf_handle, partner, path, child_index);
        }
    }

    /// Moves a balancing share of items from the front of the right sibling.
    fn shift_leaf_from_right(
        &mut self,
        leaf_handle: Handle,
        right_handle: Handle,
        parent_handle: Handle,
        child_index: usize,
    ) {
        let taker_len = self.nodes.get(leaf_handle).as_leaf().len();
        let donor_len = self.nodes.get(right_handle).as_leaf().len();
        let move_count = ((donor_len - taker_len) / 2).max(1);

        let (keys, values) = self.nodes.get_mut(right_handle).as_leaf_mut().take_front(move_count);
        let leaf = self.nodes.get_mut(leaf_handle).as_leaf_mut();
        leaf.splice_back(keys, values);
        let new_last = leaf.last_key().unwrap().clone();
        let leaf_len = leaf.len();

        // The borrowed items raised this leaf's maximum; its separator is
        // local because a same-parent right sibling exists.
        let parent = self.nodes.get_mut(parent_handle).as_inner_mut();
        parent.set_key(child_index, new_last);
        parent.set_child_size(child_index, Size::from_usize(leaf_len));
        parent.set_child_size(child_index + 1, Size::from_usize(donor_len - move_count));
    }

    /// Moves a balancing share of items from the back of the left sibling.
    fn shift_leaf_from_left(
        &mut self,
        leaf_handle: Handle,
        left_handle: Handle,
        parent_handle: Handle,
        child_index: usize,
    ) {
        let taker_len = self.nodes.get(leaf_handle).as_leaf().len();
        let donor_len = self.nodes.get(left_handle).as_leaf().len();
        let move_count = ((donor_len - taker_len) / 2).max(1);

        let (keys, values) = self.nodes.get_mut(left_handle).as_leaf_mut().take_back(move_count);
        self.nodes.get_mut(leaf_handle).as_leaf_mut().splice_front(keys, values);
        let leaf_len = taker_len + move_count;

        let left_last = self.nodes.get(left_handle).as_leaf().last_key().unwrap().clone();
        let parent = self.nodes.get_mut(parent_handle).as_inner_mut();
        parent.set_key(child_index - 1, left_last);
        parent.set_child_size(child_index - 1, Size::from_usize(donor_len - move_count));
        parent.set_child_size(child_index, Size::from_usize(leaf_len));
    }

    /// Merges `right_handle` into `left_handle` and splices the leaf chain;
    /// the parent fix-up removes the vanished child's separator slot.
    fn merge_leaves(&mut self, left_handle: Handle, right_handle: Handle, path: &mut Path, separator_index: usize) {
        let right = match self.nodes.take(right_handle) {
            Node::Leaf(leaf) => leaf,
            Node::Inner(_) => panic!("`RawRankedTree::merge_leaves()` - expected a leaf!"),
        };

        let left = self.nodes.get_mut(left_handle).as_leaf_mut();
        left.merge_with_right(right);

        // The right leaf always has a predecessor (the left one), so only the
        // tail pointer and the successor's back link can need fixing.
        if let Some(next) = self.nodes.get(left_handle).as_leaf().next() {
            self.nodes.get_mut(next).as_leaf_mut().set_prev(Some(left_handle));
        }
        if self.last_leaf == Some(right_handle) {
            self.last_leaf = Some(left_handle);
        }

        self.fix_merge(path, separator_index, true);
    }

    /// Applies a child merge at the parent: drops the separator/child slot of
    /// the vanished node, re-syncs the surviving child's cached size (and its
    /// separator when the children are leaves), then handles the parent's own
    /// underflow, shrinking the root when the cascade reaches it.
    fn fix_merge(&mut self, path: &mut Path, separator_index: usize, children_are_leaves: bool) {
        let elem = path.pop().unwrap();
        let parent_handle = elem.node;

        let _ = self.nodes.get_mut(parent_handle).as_inner_mut().remove_child(separator_index);

        let merged_handle = self.nodes.get(parent_handle).as_inner().child(separator_index);
        let merged_size = self.nodes.get(merged_handle).subtree_size();
        let merged_last = if children_are_leaves {
            self.nodes.get(merged_handle).as_leaf().last_key().cloned()
        } else {
            None
        };

        let parent = self.nodes.get_mut(parent_handle).as_inner_mut();
        parent.set_child_size(separator_index, Size::from_usize(merged_size));
        if separator_index < parent.key_count()
            && let Some(last) = merged_last
        {
            parent.set_key(separator_index, last);
        }
        parent.update_size();

        if path.is_empty() {
            // The parent is the root; it may now hold a single child.
            let parent = self.nodes.get(parent_handle).as_inner();
            if parent.child_count() == 1 {
                let new_root = parent.child(0);
                self.nodes.free(parent_handle);
                self.nodes.get_mut(new_root).set_parent(None);
                self.root = Some(new_root);
            }
            return;
        }

        if self.nodes.get(parent_handle).as_inner().is_underflowing() {
            self.rebalance_inner(parent_handle, path);
        } else {
            self.update_sizes_along_path(path);
        }
    }

    /// Resolves an inner-node underflow against its same-parent neighbors:
    /// shift from an ample one (the larger when both qualify), else merge.
    fn rebalance_inner(&mut self, node_handle: Handle, path: &mut Path) {
        let elem = path.last().unwrap();
        let parent_handle = elem.node;
        let child_index = elem.child_index;
        let parent = self.nodes.get(parent_handle).as_inner();

        let left = (child_index > 0).then(|| parent.child(child_index - 1));
        let right = (child_index + 1 < parent.child_count()).then(|| parent.child(child_index + 1));

        let left_keys = left.map(|h| self.nodes.get(h).as_inner().key_count());
        let right_keys = right.map(|h| self.nodes.get(h).as_inner().key_count());
        let left_ample = left.is_some_and(|h| !self.nodes.get(h).as_inner().is_few());
        let right_ample = right.is_some_and(|h| !self.nodes.get(h).as_inner().is_few());

        if left_ample || right_ample {
            let from_left = left_ample && (!right_ample || left_keys >= right_keys);
            if from_left {
                self.shift_inner_from_left(node_handle, left.unwrap(), parent_handle, child_index);
            } else {
                self.shift_inner_from_right(node_handle, right.unwrap(), parent_handle, child_index);
            }
            self.update_sizes_along_path(path);
            return;
        }

        if let Some(left_handle) = left {
            self.merge_inner(left_handle, node_handle, path, child_index - 1);
        } else {
            self.merge_inner(node_handle, right.unwrap(), path, child_index);
        }
    }

    /// Rotates a balancing share of children from the right sibling through
    /// the parent separator.
    fn shift_inner_from_right(
        &mut self,
        node_handle: Handle,
        right_handle: Handle,
        parent_handle: Handle,
        child_index: usize,
    ) {
        let taker_keys = self.nodes.get(node_handle).as_inner().key_count();
        let donor_keys = self.nodes.get(right_handle).as_inner().key_count();
        let move_count = ((donor_keys - taker_keys) / 2).max(1);

        let old_separator = self.nodes.get(parent_handle).as_inner().key(child_index).clone();

        let (mut keys, children, sizes) = self.nodes.get_mut(right_handle).as_inner_mut().take_front(move_count);
        self.nodes.get_mut(right_handle).as_inner_mut().update_size();
        let new_separator = keys.pop().unwrap();
        keys.insert(0, old_separator);

        let moved: SmallVec<[Handle; 4]> = children.clone();
        self.nodes.get_mut(node_handle).as_inner_mut().splice_back(keys, children, sizes);
        for child in moved {
            self.nodes.get_mut(child).set_parent(Some(node_handle));
        }

        let node_size = self.nodes.get(node_handle).as_inner().size();
        let right_size = self.nodes.get(right_handle).as_inner().size();
        let parent = self.nodes.get_mut(parent_handle).as_inner_mut();
        parent.set_key(child_index, new_separator);
        parent.set_child_size(child_index, node_size);
        parent.set_child_size(child_index + 1, right_size);
    }

    /// Rotates a balancing share of children from the left sibling through
    /// the parent separator.
    fn shift_inner_from_left(
        &mut self,
        node_handle: Handle,
        left_handle: Handle,
        parent_handle: Handle,
        child_index: usize,
    ) {
        let taker_keys = self.nodes.get(node_handle).as_inner().key_count();
        let donor_keys = self.nodes.get(left_handle).as_inner().key_count();
        let move_count = ((donor_keys - taker_keys) / 2).max(1);

        let old_separator = self.nodes.get(parent_handle).as_inner().key(child_index - 1).clone();

        let (mut keys, children, sizes) = self.nodes.get_mut(left_handle).as_inner_mut().take_back(move_count);
        self.nodes.get_mut(left_handle).as_inner_mut().update_size();
        let new_separator = keys.remove(0);
        keys.push(old_separator);

        let moved: SmallVec<[Handle; 4]> = children.clone();
        self.nodes.get_mut(node_handle).as_inner_mut().splice_front(keys, children, sizes);
        for child in moved {
            self.nodes.get_mut(child).set_parent(Some(node_handle));
        }

        let node_size = self.nodes.get(node_handle).as_inner().size();
        let left_size = self.nodes.get(left_handle).as_inner().size();
        let parent = self.nodes.get_mut(parent_handle).as_inner_mut();
        parent.set_key(child_index - 1, new_separator);
        parent.set_child_size(child_index - 1, left_size);
        parent.set_child_size(child_index, node_size);
    }

    /// Merges two inner nodes around their parent separator.
    fn merge_inner(&mut self, left_handle: Handle, right_handle: Handle, path: &mut Path, separator_index: usize) {
        let parent_handle = path.last().unwrap().node;
        let separator = self.nodes.get(parent_handle).as_inner().key(separator_index).clone();

        let right = match self.nodes.take(right_handle) {
            Node::Inner(inner) => inner,
            Node::Leaf(_) => panic!("`RawRankedTree::merge_inner()` - expected an inner node!"),
        };

        self.nodes.get_mut(left_handle).as_inner_mut().merge_with_right(separator, right);
        self.fix_child_parents(left_handle);

        self.fix_merge(path, separator_index, false);
    }

    // ─── Shared maintenance ──────────────────────────────────────────────────

    /// Rebuilds the root-to-leaf path for `node` by walking its parent links.
    fn path_to(&self, node: Handle) -> Path {
        let mut path: Path = SmallVec::new();
        let mut current = node;

        while let Some(parent) = self.nodes.get(current).parent() {
            let child_index = self.nodes.get(parent).as_inner().position_of_child(current);
            path.push(PathElement {
                node: parent,
                child_index,
            });
            current = parent;
        }

        path.reverse();
        path
    }

    /// Points every child of `handle` back at it.
    fn fix_child_parents(&mut self, handle: Handle) {
        let count = self.nodes.get(handle).as_inner().child_count();
        for index in 0..count {
            let child = self.nodes.get(handle).as_inner().child(index);
            self.nodes.get_mut(child).set_parent(Some(handle));
        }
    }

    /// Recomputes the traversed child's cached size and the node total at
    /// every level of the path, innermost first.
    fn update_sizes_along_path(&mut self, path: &Path) {
        for elem in path.iter().rev() {
            let child = self.nodes.get(elem.node).as_inner().child(elem.child_index);
            let child_size = self.nodes.get(child).subtree_size();
            let parent = self.nodes.get_mut(elem.node).as_inner_mut();
            parent.set_child_size(elem.child_index, Size::from_usize(child_size));
            parent.update_size();
        }
    }

    /// Adds one to the traversed child's cached size and the node total at
    /// every level of the path; the cheap form for a split-free insert.
    fn increment_sizes_along_path(&mut self, path: &Path) {
        for elem in path.iter().rev() {
            let node = self.nodes.get_mut(elem.node).as_inner_mut();
            let new_size = node.size().to_usize() + 1;
            node.set_size(Size::from_usize(new_size));
            let child_size = node.child_size(elem.child_index).to_usize() + 1;
            node.set_child_size(elem.child_index, Size::from_usize(child_size));
        }
    }
}

impl<K: Clone, V: Clone> Clone for RawRankedTree<K, V> {
    fn clone(&self) -> Self {
        fn clone_node<K: Clone, V: Clone>(
            old_nodes: &BlockArena<Node<K>>,
            old_values: &BlockArena<V>,
            new_nodes: &mut BlockArena<Node<K>>,
            new_values: &mut BlockArena<V>,
            old_handle: Handle,
        ) -> Handle {
            match old_nodes.get(old_handle) {
                Node::Leaf(leaf) => {
                    let mut new_leaf = LeafNode::new();
                    for index in 0..leaf.len() {
                        let key = leaf.key(index).clone();
                        let value = old_values.get(leaf.value(index)).clone();
                        let value_handle = new_values.alloc(value);
                        new_leaf.push(key, value_handle);
                    }
                    // parent and prev/next links are fixed up afterwards
                    new_nodes.alloc(Node::Leaf(new_leaf))
                }
                Node::Inner(inner) => {
                    let mut new_inner = InnerNode::new();

                    let first = clone_node(old_nodes, old_values, new_nodes, new_values, inner.child(0));
                    new_inner.set_first_child(first, inner.child_size(0));

                    for index in 0..inner.key_count() {
                        let key = inner.key(index).clone();
                        let child =
                            clone_node(old_nodes, old_values, new_nodes, new_values, inner.child(index + 1));
                        new_inner.push_child(key, child, inner.child_size(index + 1));
                    }

                    new_inner.set_size(inner.size());
                    let handle = new_nodes.alloc(Node::Inner(new_inner));
                    for index in 0..new_nodes.get(handle).as_inner().child_count() {
                        let child = new_nodes.get(handle).as_inner().child(index);
                        new_nodes.get_mut(child).set_parent(Some(handle));
                    }
                    handle
                }
            }
        }

        fn collect_leaves<K>(nodes: &BlockArena<Node<K>>, root: Handle) -> alloc::vec::Vec<Handle> {
            let mut leaves = alloc::vec::Vec::new();
            let mut stack = alloc::vec![root];
            while let Some(handle) = stack.pop() {
                match nodes.get(handle) {
                    Node::Leaf(_) => leaves.push(handle),
                    Node::Inner(inner) => {
                        // Reverse push order makes the pop order left-to-right.
                        for index in (0..inner.child_count()).rev() {
                            stack.push(inner.child(index));
                        }
                    }
                }
            }
            leaves
        }

        let mut new_nodes: BlockArena<Node<K>> = BlockArena::with_capacity(self.nodes.capacity());
        let mut new_values: BlockArena<V> = BlockArena::with_capacity(self.values.capacity());

        let Some(root) = self.root else {
            return Self {
                nodes: new_nodes,
                values: new_values,
                root: None,
                len: 0,
                first_leaf: None,
                last_leaf: None,
            };
        };

        let new_root = clone_node(&self.nodes, &self.values, &mut new_nodes, &mut new_values, root);

        let leaves = collect_leaves(&new_nodes, new_root);
        for (index, &handle) in leaves.iter().enumerate() {
            let prev = (index > 0).then(|| leaves[index - 1]);
            let next = leaves.get(index + 1).copied();
            let leaf = new_nodes.get_mut(handle).as_leaf_mut();
            leaf.set_prev(prev);
            leaf.set_next(next);
        }

        Self {
            nodes: new_nodes,
            values: new_values,
            root: Some(new_root),
            len: self.len,
            first_leaf: leaves.first().copied(),
            last_leaf: leaves.last().copied(),
        }
    }
}

impl<K, V> Default for RawRankedTree<K, V> {
    fn default() -> Self {
        Self::new()
    }
}
