use core::borrow::Borrow;

use smallvec::SmallVec;

use super::handle::Handle;
use super::size::Size;

/// Nodes are allocated from fixed-size arena blocks; either variant must fit
/// in one block. Fan-out is derived from the block size, charging one
/// pointer-sized slot per key and one handle-plus-size slot per child. The
/// test block is small enough that every rebalancing path runs constantly.
#[cfg(test)]
pub(crate) const MEMORY_BLOCK_SIZE: usize = 96;
#[cfg(not(test))]
pub(crate) const MEMORY_BLOCK_SIZE: usize = 512;

const NODE_HEADER_BYTES: usize = 32;
const KEY_SLOT_BYTES: usize = 8;
const LINK_SLOT_BYTES: usize = 8;

pub(crate) const MAX_INNER_KEYS: usize =
    (MEMORY_BLOCK_SIZE - NODE_HEADER_BYTES) / (KEY_SLOT_BYTES + LINK_SLOT_BYTES);
pub(crate) const MAX_LEAF_ITEMS: usize =
    (MEMORY_BLOCK_SIZE - NODE_HEADER_BYTES) / (KEY_SLOT_BYTES + LINK_SLOT_BYTES);
pub(crate) const MIN_INNER_KEYS: usize = MAX_INNER_KEYS / 2;
pub(crate) const MIN_LEAF_ITEMS: usize = MAX_LEAF_ITEMS / 2;

#[allow(clippy::large_enum_variant)]
pub(crate) enum Node<K> {
    Inner(InnerNode<K>),
    Leaf(LeafNode<K>),
}

/// Inner node: separator keys and child handles, plus cached child subtree
/// sizes for positional descent. Separator `i` equals the maximum key in
/// `child[i]`'s subtree (not the conventional first-key-of-right-child).
pub(crate) struct InnerNode<K> {
    /// Parent inner node; `None` for the root.
    parent: Option<Handle>,
    /// Number of elements in the subtree rooted at this node.
    size: Size,
    // The +1 spare slot absorbs the transient overflow between an insertion
    // and the split that follows it.
    keys: SmallVec<[K; MAX_INNER_KEYS + 1]>,
    children: SmallVec<[Handle; MAX_INNER_KEYS + 2]>,
    child_sizes: SmallVec<[Size; MAX_INNER_KEYS + 2]>,
}

/// Leaf node: keys with parallel value handles, linked to neighbor leaves.
/// A leaf's subtree size is simply its fill.
pub(crate) struct LeafNode<K> {
    parent: Option<Handle>,
    prev: Option<Handle>,
    next: Option<Handle>,
    keys: SmallVec<[K; MAX_LEAF_ITEMS + 1]>,
    values: SmallVec<[Handle; MAX_LEAF_ITEMS + 1]>,
}

/// Result of an exact-match search in a leaf.
pub(crate) enum SearchResult {
    /// Key was found at the given index.
    Found(usize),
    /// Key was not found; index is where it would be inserted.
    NotFound(usize),
}

/// First index in `keys` whose key is not less than `key`.
#[inline]
fn lower_bound<K, Q>(keys: &[K], key: &Q) -> usize
where
    K: Borrow<Q>,
    Q: ?Sized + Ord,
{
    keys.partition_point(|k| k.borrow() < key)
}

/// First index in `keys` whose key is strictly greater than `key`.
#[inline]
fn upper_bound<K, Q>(keys: &[K], key: &Q) -> usize
where
    K: Borrow<Q>,
    Q: ?Sized + Ord,
{
    keys.partition_point(|k| k.borrow() <= key)
}

impl<K> Node<K> {
    pub(crate) fn parent(&self) -> Option<Handle> {
        match self {
            Node::Inner(inner) => inner.parent,
            Node::Leaf(leaf) => leaf.parent,
        }
    }

    pub(crate) fn set_parent(&mut self, parent: Option<Handle>) {
        match self {
            Node::Inner(inner) => inner.parent = parent,
            Node::Leaf(leaf) => leaf.parent = parent,
        }
    }

    /// Number of elements in the subtree rooted at this node.
    pub(crate) fn subtree_size(&self) -> usize {
        match self {
            Node::Inner(inner) => inner.size.to_usize(),
            Node::Leaf(leaf) => leaf.len(),
        }
    }

    pub(crate) fn as_leaf(&self) -> &LeafNode<K> {
        match self {
            Node::Leaf(leaf) => leaf,
            Node::Inner(_) => panic!("expected leaf node"),
        }
    }

    pub(crate) fn as_leaf_mut(&mut self) -> &mut LeafNode<K> {
        match self {
            Node::Leaf(leaf) => leaf,
            Node::Inner(_) => panic!("expected leaf node"),
        }
    }

    pub(crate) fn as_inner(&self) -> &InnerNode<K> {
        match self {
            Node::Inner(inner) => inner,
            Node::Leaf(_) => panic!("expected inner node"),
        }
    }

    pub(crate) fn as_inner_mut(&mut self) -> &mut InnerNode<K> {
        match self {
            Node::Inner(inner) => inner,
            Node::Leaf(_) => panic!("expected inner node"),
        }
    }
}

impl<K> InnerNode<K> {
    pub(crate) fn new() -> Self {
        Self {
            parent: None,
            size: Size::ZERO,
            keys: SmallVec::new(),
            children: SmallVec::new(),
            child_sizes: SmallVec::new(),
        }
    }

    pub(crate) fn key_count(&self) -> usize {
        self.keys.len()
    }

    pub(crate) fn child_count(&self) -> usize {
        self.children.len()
    }

    pub(crate) fn is_underflowing(&self) -> bool {
        self.keys.len() < MIN_INNER_KEYS
    }

    /// A "few" node cannot lend without underflowing itself.
    pub(crate) fn is_few(&self) -> bool {
        self.keys.len() <= MIN_INNER_KEYS
    }

    pub(crate) fn size(&self) -> Size {
        self.size
    }

    pub(crate) fn set_size(&mut self, size: Size) {
        self.size = size;
    }

    /// Recomputes the subtree size from the cached child sizes.
    pub(crate) fn update_size(&mut self) {
        let total: usize = self.child_sizes.iter().map(|s| s.to_usize()).sum();
        self.size = Size::from_usize(total);
    }

    #[inline]
    pub(crate) fn key(&self, index: usize) -> &K {
        &self.keys[index]
    }

    pub(crate) fn set_key(&mut self, index: usize, key: K) {
        self.keys[index] = key;
    }

    #[inline]
    pub(crate) fn child(&self, index: usize) -> Handle {
        self.children[index]
    }

    #[inline]
    pub(crate) fn child_size(&self, index: usize) -> Size {
        self.child_sizes[index]
    }

    pub(crate) fn set_child_size(&mut self, index: usize, size: Size) {
        self.child_sizes[index] = size;
    }

    /// Slot of `child` among this node's children.
    ///
    /// # Panics
    ///
    /// Panics when `child` is not a child of this node.
    pub(crate) fn position_of_child(&self, child: Handle) -> usize {
        self.children
            .iter()
            .position(|&c| c == child)
            .expect("`InnerNode::position_of_child()` - `child` is not a child of this node!")
    }

    /// Child slot to descend into so that equal keys are reached from the left.
    #[inline]
    pub(crate) fn descend_lower<Q>(&self, key: &Q) -> usize
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        lower_bound(&self.keys, key)
    }

    /// Child slot to descend into so that equal keys are passed on the right.
    #[inline]
    pub(crate) fn descend_upper<Q>(&self, key: &Q) -> usize
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        upper_bound(&self.keys, key)
    }

    /// Inserts a separator and the child to its right at `index`.
    pub(crate) fn insert_child(&mut self, index: usize, key: K, child: Handle, child_size: Size) {
        self.keys.insert(index, key);
        self.children.insert(index + 1, child);
        self.child_sizes.insert(index + 1, child_size);
    }

    /// Removes the separator at `index` and the child to its right.
    pub(crate) fn remove_child(&mut self, index: usize) -> (K, Handle, Size) {
        let key = self.keys.remove(index);
        let child = self.children.remove(index + 1);
        let size = self.child_sizes.remove(index + 1);
        (key, child, size)
    }

    pub(crate) fn push_child(&mut self, key: K, child: Handle, child_size: Size) {
        self.keys.push(key);
        self.children.push(child);
        self.child_sizes.push(child_size);
    }

    /// Sets the leftmost child (the one with no separator of its own).
    pub(crate) fn set_first_child(&mut self, child: Handle, child_size: Size) {
        if self.children.is_empty() {
            self.children.push(child);
            self.child_sizes.push(child_size);
        } else {
            self.children[0] = child;
            self.child_sizes[0] = child_size;
        }
    }

    /// Removes the last `count` children along with the last `count` keys.
    pub(crate) fn take_back(
        &mut self,
        count: usize,
    ) -> (SmallVec<[K; 4]>, SmallVec<[Handle; 4]>, SmallVec<[Size; 4]>) {
        let key_at = self.keys.len() - count;
        let child_at = self.children.len() - count;
        (
            self.keys.drain(key_at..).collect(),
            self.children.drain(child_at..).collect(),
            self.child_sizes.drain(child_at..).collect(),
        )
    }

    /// Removes the first `count` children along with the first `count` keys.
    pub(crate) fn take_front(
        &mut self,
        count: usize,
    ) -> (SmallVec<[K; 4]>, SmallVec<[Handle; 4]>, SmallVec<[Size; 4]>) {
        (
            self.keys.drain(..count).collect(),
            self.children.drain(..count).collect(),
            self.child_sizes.drain(..count).collect(),
        )
    }

    /// Splices `count` keys and children in front of the existing ones.
    pub(crate) fn splice_front(
        &mut self,
        keys: SmallVec<[K; 4]>,
        children: SmallVec<[Handle; 4]>,
        sizes: SmallVec<[Size; 4]>,
    ) {
        self.keys.insert_many(0, keys);
        self.children.insert_many(0, children);
        self.child_sizes.insert_many(0, sizes);
        self.update_size();
    }

    /// Appends `count` keys and children after the existing ones.
    pub(crate) fn splice_back(
        &mut self,
        keys: SmallVec<[K; 4]>,
        children: SmallVec<[Handle; 4]>,
        sizes: SmallVec<[Size; 4]>,
    ) {
        self.keys.extend(keys);
        self.children.extend(children);
        self.child_sizes.extend(sizes);
        self.update_size();
    }

    /// Splits at the midpoint. Returns the evicted median key and the new
    /// right node holding everything after it.
    pub(crate) fn split(&mut self) -> (K, InnerNode<K>) {
        let mid = self.keys.len() / 2;

        let mut right = InnerNode::new();
        right.keys = self.keys.drain(mid + 1..).collect();
        right.children = self.children.drain(mid + 1..).collect();
        right.child_sizes = self.child_sizes.drain(mid + 1..).collect();

        let median = self.keys.pop().unwrap();

        self.update_size();
        right.update_size();

        (median, right)
    }

    /// Absorbs a right sibling, pulling the parent separator down between the
    /// two key sequences.
    pub(crate) fn merge_with_right(&mut self, separator: K, mut right: InnerNode<K>) {
        self.keys.push(separator);
        self.keys.append(&mut right.keys);
        self.children.append(&mut right.children);
        self.child_sizes.append(&mut right.child_sizes);
        self.update_size();
    }
}

impl<K> LeafNode<K> {
    pub(crate) fn new() -> Self {
        Self {
            parent: None,
            prev: None,
            next: None,
            keys: SmallVec::new(),
            values: SmallVec::new(),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.keys.len()
    }

    pub(crate) fn is_underflowing(&self) -> bool {
        self.keys.len() < MIN_LEAF_ITEMS
    }

    /// A "few" leaf cannot lend without underflowing itself.
    pub(crate) fn is_few(&self) -> bool {
        self.keys.len() <= MIN_LEAF_ITEMS
    }

    pub(crate) fn prev(&self) -> Option<Handle> {
        self.prev
    }

    pub(crate) fn set_prev(&mut self, prev: Option<Handle>) {
        self.prev = prev;
    }

    pub(crate) fn next(&self) -> Option<Handle> {
        self.next
    }

    pub(crate) fn set_next(&mut self, next: Option<Handle>) {
        self.next = next;
    }

    #[inline]
    pub(crate) fn key(&self, index: usize) -> &K {
        &self.keys[index]
    }

    pub(crate) fn keys(&self) -> &[K] {
        &self.keys
    }

    #[inline]
    pub(crate) fn value(&self, index: usize) -> Handle {
        self.values[index]
    }

    pub(crate) fn last_key(&self) -> Option<&K> {
        self.keys.last()
    }

    /// Exact-match search; with duplicates present the index is one of the
    /// equal slots, unspecified which.
    #[inline]
    pub(crate) fn search<Q>(&self, key: &Q) -> SearchResult
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        match self.keys.binary_search_by(|k| k.borrow().cmp(key)) {
            Ok(index) => SearchResult::Found(index),
            Err(index) => SearchResult::NotFound(index),
        }
    }

    /// Index of the first item not less than `key`.
    #[inline]
    pub(crate) fn lower_bound_index<Q>(&self, key: &Q) -> usize
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        lower_bound(&self.keys, key)
    }

    /// Index of the first item strictly greater than `key`.
    #[inline]
    pub(crate) fn upper_bound_index<Q>(&self, key: &Q) -> usize
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        upper_bound(&self.keys, key)
    }

    pub(crate) fn insert(&mut self, index: usize, key: K, value: Handle) {
        self.keys.insert(index, key);
        self.values.insert(index, value);
    }

    pub(crate) fn remove(&mut self, index: usize) -> (K, Handle) {
        let key = self.keys.remove(index);
        let value = self.values.remove(index);
        (key, value)
    }

    pub(crate) fn push(&mut self, key: K, value: Handle) {
        self.keys.push(key);
        self.values.push(value);
    }

    /// Takes ownership of every item, leaving the leaf empty.
    pub(crate) fn take_all(
        &mut self,
    ) -> (SmallVec<[K; MAX_LEAF_ITEMS + 1]>, SmallVec<[Handle; MAX_LEAF_ITEMS + 1]>) {
        (core::mem::take(&mut self.keys), core::mem::take(&mut self.values))
    }

    /// Removes the first `count` items, preserving order.
    pub(crate) fn take_front(&mut self, count: usize) -> (SmallVec<[K; 4]>, SmallVec<[Handle; 4]>) {
        (self.keys.drain(..count).collect(), self.values.drain(..count).collect())
    }

    /// Removes the last `count` items, preserving order.
    pub(crate) fn take_back(&mut self, count: usize) -> (SmallVec<[K; 4]>, SmallVec<[Handle; 4]>) {
        let at = self.keys.len() - count;
        (self.keys.drain(at..).collect(), self.values.drain(at..).collect())
    }

    /// Splices items in front of the existing ones.
    pub(crate) fn splice_front(&mut self, keys: SmallVec<[K; 4]>, values: SmallVec<[Handle; 4]>) {
        self.keys.insert_many(0, keys);
        self.values.insert_many(0, values);
    }

    /// Appends items after the existing ones.
    pub(crate) fn splice_back(&mut self, keys: SmallVec<[K; 4]>, values: SmallVec<[Handle; 4]>) {
        self.keys.extend(keys);
        self.values.extend(values);
    }

    /// Splits at the midpoint. Returns the separator to hand upward (a clone
    /// of the left half's new maximum) and the new right leaf.
    pub(crate) fn split(&mut self) -> (K, LeafNode<K>)
    where
        K: Clone,
    {
        let mid = self.keys.len() / 2;

        let mut right = LeafNode::new();
        right.keys = self.keys.drain(mid..).collect();
        right.values = self.values.drain(mid..).collect();

        let separator = self.keys.last().unwrap().clone();

        (separator, right)
    }

    /// Absorbs a right sibling; chain splicing is the caller's business.
    pub(crate) fn merge_with_right(&mut self, mut right: LeafNode<K>) {
        self.keys.append(&mut right.keys);
        self.values.append(&mut right.values);
        self.next = right.next;
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn capacities_derive_from_block_size() {
        // The test block pins both fan-outs to 4 so deep trees are cheap to build.
        assert_eq!(MAX_INNER_KEYS, 4);
        assert_eq!(MAX_LEAF_ITEMS, 4);
        assert_eq!(MIN_INNER_KEYS, 2);
        assert_eq!(MIN_LEAF_ITEMS, 2);
    }

    #[test]
    fn leaf_bounds_handle_duplicates() {
        let mut leaf: LeafNode<i32> = LeafNode::new();
        for (i, key) in [1, 3, 3, 5].into_iter().enumerate() {
            leaf.push(key, Handle::from_index(i));
        }

        assert_eq!(leaf.lower_bound_index(&3), 1);
        assert_eq!(leaf.upper_bound_index(&3), 3);
        assert_eq!(leaf.lower_bound_index(&0), 0);
        assert_eq!(leaf.upper_bound_index(&5), 4);
        assert_eq!(leaf.lower_bound_index(&6), 4);
    }

    #[test]
    fn leaf_split_promotes_left_maximum() {
        let mut leaf: LeafNode<i32> = LeafNode::new();
        for i in 0..5 {
            leaf.push(i, Handle::from_index(i as usize));
        }

        let (separator, right) = leaf.split();
        assert_eq!(separator, 1);
        assert_eq!(leaf.keys(), &[0, 1]);
        assert_eq!(right.keys(), &[2, 3, 4]);
    }

    #[test]
    fn inner_descend_picks_sides_of_equal_separators() {
        let mut inner: InnerNode<i32> = InnerNode::new();
        inner.set_first_child(Handle::from_index(0), Size::from_usize(1));
        inner.push_child(10, Handle::from_index(1), Size::from_usize(1));
        inner.push_child(20, Handle::from_index(2), Size::from_usize(1));

        // Separator 10 is the max of child 0, so an equal key lives there...
        assert_eq!(inner.descend_lower(&10), 0);
        // ...but new duplicates of 10 append into child 1.
        assert_eq!(inner.descend_upper(&10), 1);
        assert_eq!(inner.descend_lower(&15), 1);
        assert_eq!(inner.descend_upper(&25), 2);
    }

    #[test]
    fn leaf_take_and_splice_preserve_order() {
        let mut a: LeafNode<i32> = LeafNode::new();
        let mut b: LeafNode<i32> = LeafNode::new();
        for i in 0..4 {
            a.push(i, Handle::from_index(i as usize));
        }
        b.push(10, Handle::from_index(10));

        let (keys, values) = a.take_back(2);
        b.splice_front(keys, values);
        assert_eq!(a.keys(), &[0, 1]);
        assert_eq!(b.keys(), &[2, 3, 10]);
    }
}
