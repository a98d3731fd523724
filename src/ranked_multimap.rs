use core::borrow::Borrow;
use core::fmt;
use core::ops::RangeBounds;

use crate::ranked_map::{
    Cursor, CursorMut, IntoIter, IntoKeys, IntoValues, Iter, IterMut, Keys, Range, RangeMut, Values,
    ValuesMut, validate_range_bounds,
};
use crate::raw::RawRankedTree;

/// An ordered multi-map based on a B+tree with subtree-size counts.
///
/// Unlike [`RankedMap`](crate::RankedMap), a `RankedMultiMap` stores every
/// inserted entry, including entries with equal keys. Equal keys sit next to
/// each other in iteration order; plain inserts append after the existing
/// equals, so insertion order among equal keys is preserved. All positional
/// operations (rank queries, rank-addressed access and removal, slices) work
/// exactly as on the unique containers and run in O(log n).
///
/// The iterator, range, and cursor types are shared with
/// [`ranked_map`](crate::ranked_map).
///
/// # Examples
///
/// ```
/// use ranked_btree::RankedMultiMap;
///
/// let mut events = RankedMultiMap::new();
/// events.insert(10, "open");
/// events.insert(12, "read");
/// events.insert(10, "retry");
///
/// assert_eq!(events.len(), 3);
/// assert_eq!(events.count(&10), 2);
///
/// // Equal keys keep their insertion order.
/// let at_ten: Vec<_> = events.get_all(&10).map(|(_, &v)| v).collect();
/// assert_eq!(at_ten, ["open", "retry"]);
///
/// // Remove every entry for a key at once.
/// assert_eq!(events.remove_all(&10), 2);
/// assert_eq!(events.len(), 1);
/// ```
pub struct RankedMultiMap<K, V> {
    raw: RawRankedTree<K, V>,
}

impl<K, V> RankedMultiMap<K, V> {
    /// Makes a new, empty `RankedMultiMap`.
    ///
    /// Does not allocate anything on its own.
    #[must_use]
    pub const fn new() -> RankedMultiMap<K, V> {
        RankedMultiMap {
            raw: RawRankedTree::new(),
        }
    }

    /// Makes an empty `RankedMultiMap` with room preallocated for at least
    /// `capacity` entries.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> RankedMultiMap<K, V> {
        RankedMultiMap {
            raw: RawRankedTree::with_capacity(capacity),
        }
    }

    /// Returns the number of entries the map can hold without reallocating.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.raw.capacity()
    }

    /// Returns the maximum number of entries the map can ever hold, a limit
    /// imposed by the width of the internal block handles.
    #[must_use]
    pub fn max_size(&self) -> usize {
        RawRankedTree::<K, V>::max_len()
    }

    /// Returns the number of entries in the map, counting duplicates.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.raw.len()
    }

    /// Returns `true` if the map contains no entries.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    /// Clears the map, removing all elements.
    pub fn clear(&mut self) {
        self.raw.clear();
    }

    /// Gets an iterator over the entries of the map, sorted by key.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter::over(&self.raw)
    }

    /// Gets a mutable iterator over the entries of the map, sorted by key.
    pub fn iter_mut(&mut self) -> IterMut<'_, K, V> {
        IterMut::over(&mut self.raw)
    }

    /// Gets an iterator over the keys of the map, in sorted order. Duplicate
    /// keys are yielded once per entry.
    pub fn keys(&self) -> Keys<'_, K, V> {
        Keys::over(&self.raw)
    }

    /// Gets an iterator over the values of the map, in order by key.
    pub fn values(&self) -> Values<'_, K, V> {
        Values::over(&self.raw)
    }

    /// Gets a mutable iterator over the values of the map, in order by key.
    pub fn values_mut(&mut self) -> ValuesMut<'_, K, V> {
        ValuesMut::over(&mut self.raw)
    }

    /// Creates a consuming iterator visiting all the keys, in sorted order.
    pub fn into_keys(mut self) -> IntoKeys<K, V> {
        IntoKeys::from_entries(self.raw.drain_to_vec())
    }

    /// Creates a consuming iterator visiting all the values, in order by key.
    pub fn into_values(mut self) -> IntoValues<K, V> {
        IntoValues::from_entries(self.raw.drain_to_vec())
    }
}

impl<K: Clone + Ord, V> RankedMultiMap<K, V> {
    /// Returns `true` if the map contains at least one entry for the key.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.raw.find_lowest(key).is_some()
    }

    /// Returns the number of entries for `key`, in O(log n).
    ///
    /// # Examples
    ///
    /// ```
    /// use ranked_btree::RankedMultiMap;
    ///
    /// let map = RankedMultiMap::from([(1, 'a'), (1, 'b'), (2, 'c')]);
    /// assert_eq!(map.count(&1), 2);
    /// assert_eq!(map.count(&3), 0);
    /// ```
    pub fn count<Q>(&self, key: &Q) -> usize
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.raw.count_key(key)
    }

    /// Returns a reference to the value of the first entry for `key` in
    /// iteration order, if any.
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        let (leaf, index) = self.raw.find_lowest(key)?;
        let leaf = self.raw.node(leaf).as_leaf();
        Some(self.raw.value(leaf.value(index)))
    }

    /// Constructs an iterator over every entry whose key equals `key`, in
    /// insertion order.
    pub fn get_all<Q>(&self, key: &Q) -> Range<'_, K, V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        let front = self.raw.lower_bound_pos(key);
        let back = self.raw.pos_before(self.raw.upper_bound_pos(key));
        Range::between(&self.raw, front, back)
    }

    /// Returns the first key-value pair in the map.
    #[must_use]
    pub fn first_key_value(&self) -> Option<(&K, &V)> {
        self.raw.first_key_value()
    }

    /// Returns the last key-value pair in the map.
    #[must_use]
    pub fn last_key_value(&self) -> Option<(&K, &V)> {
        self.raw.last_key_value()
    }

    /// Removes and returns the first entry in the map.
    pub fn pop_first(&mut self) -> Option<(K, V)> {
        self.raw.pop_first()
    }

    /// Removes and returns the last entry in the map.
    pub fn pop_last(&mut self) -> Option<(K, V)> {
        self.raw.pop_last()
    }

    /// Inserts a key-value pair into the map. Entries with equal keys are
    /// kept; the new entry lands after the existing ones.
    ///
    /// # Examples
    ///
    /// ```
    /// use ranked_btree::RankedMultiMap;
    ///
    /// let mut map = RankedMultiMap::new();
    /// map.insert(3, "first");
    /// map.insert(3, "second");
    /// assert_eq!(map.len(), 2);
    /// ```
    pub fn insert(&mut self, key: K, value: V) {
        self.raw.insert_multi(key, value);
    }

    /// Inserts a key-value pair using a rank hint.
    ///
    /// `hint` is the position the caller expects the new entry to land at.
    /// When the entries around `hint` bracket the key, the new entry is
    /// placed directly before the hinted position (so among equal keys an
    /// accurate hint controls the exact spot) and the comparator descent is
    /// skipped. An inaccurate hint falls back to a plain
    /// [`insert`](RankedMultiMap::insert).
    pub fn insert_hint(&mut self, hint: usize, key: K, value: V) {
        self.raw.insert_hinted_multi(hint, key, value);
    }

    /// Removes every entry for `key`, returning how many were removed.
    ///
    /// # Examples
    ///
    /// ```
    /// use ranked_btree::RankedMultiMap;
    ///
    /// let mut map = RankedMultiMap::from([(1, 'a'), (1, 'b'), (2, 'c')]);
    /// assert_eq!(map.remove_all(&1), 2);
    /// assert_eq!(map.remove_all(&1), 0);
    /// assert_eq!(map.len(), 1);
    /// ```
    pub fn remove_all<Q>(&mut self, key: &Q) -> usize
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.raw.remove_all(key)
    }

    /// Removes and returns the entry at position `rank` in sorted order, or
    /// `None` when `rank` is out of bounds.
    pub fn remove_at(&mut self, rank: usize) -> Option<(K, V)> {
        self.raw.remove_at(rank)
    }

    /// Removes the entries in the position range `begin..end` and returns
    /// how many were removed, with the index semantics of
    /// [`slice`](RankedMultiMap::slice).
    pub fn remove_slice(&mut self, begin: isize, end: isize) -> usize {
        self.raw.remove_slice(begin, end)
    }

    /// Constructs a double-ended iterator over a sub-range of entries in the
    /// map.
    ///
    /// # Panics
    ///
    /// Panics if range `start > end`, or if range `start == end` and both
    /// bounds are `Excluded`.
    pub fn range<T, R>(&self, range: R) -> Range<'_, K, V>
    where
        T: ?Sized + Ord,
        K: Borrow<T>,
        R: RangeBounds<T>,
    {
        validate_range_bounds(&range);
        let (front, back) = self.raw.range_endpoints(&range);
        Range::between(&self.raw, front, back)
    }

    /// Constructs a mutable double-ended iterator over a sub-range of entries
    /// in the map.
    ///
    /// # Panics
    ///
    /// Panics if range `start > end`, or if range `start == end` and both
    /// bounds are `Excluded`.
    pub fn range_mut<T, R>(&mut self, range: R) -> RangeMut<'_, K, V>
    where
        T: ?Sized + Ord,
        K: Borrow<T>,
        R: RangeBounds<T>,
    {
        validate_range_bounds(&range);
        let (front, back) = self.raw.range_endpoints(&range);
        RangeMut::between(&mut self.raw, front, back)
    }

    /// Constructs an iterator over the entries in the position range
    /// `begin..end`. Negative positions count from the end, and an `end` of
    /// zero means the end of the map.
    ///
    /// # Examples
    ///
    /// ```
    /// use ranked_btree::RankedMultiMap;
    ///
    /// let map = RankedMultiMap::from([(1, 'a'), (1, 'b'), (2, 'c'), (3, 'd')]);
    /// let middle: Vec<_> = map.slice(1, -1).map(|(&k, &v)| (k, v)).collect();
    /// assert_eq!(middle, [(1, 'b'), (2, 'c')]);
    /// ```
    pub fn slice(&self, begin: isize, end: isize) -> Range<'_, K, V> {
        let (front, back) = match self.raw.slice_bounds(begin, end) {
            Some((begin, end)) if begin < end => {
                (self.raw.pos_at_rank(begin), self.raw.pos_at_rank(end - 1))
            }
            _ => (None, None),
        };
        Range::between(&self.raw, front, back)
    }

    /// Constructs a mutable iterator over the entries in the position range
    /// `begin..end`, with the same index semantics as
    /// [`slice`](RankedMultiMap::slice).
    pub fn slice_mut(&mut self, begin: isize, end: isize) -> RangeMut<'_, K, V> {
        let (front, back) = match self.raw.slice_bounds(begin, end) {
            Some((begin, end)) if begin < end => {
                (self.raw.pos_at_rank(begin), self.raw.pos_at_rank(end - 1))
            }
            _ => (None, None),
        };
        RangeMut::between(&mut self.raw, front, back)
    }

    /// Returns the number of entries whose keys lie in `min..=max`, in
    /// O(log n). Returns zero when `max < min`.
    pub fn count_range<Q>(&self, min: &Q, max: &Q) -> usize
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.raw.count_range(min, max)
    }

    /// Returns the entry at position `rank` in sorted order.
    #[must_use]
    pub fn get_by_rank(&self, rank: usize) -> Option<(&K, &V)> {
        self.raw.get_by_rank(rank)
    }

    /// Returns the key and a mutable reference to the value at position
    /// `rank` in sorted order.
    #[must_use]
    pub fn get_by_rank_mut(&mut self, rank: usize) -> Option<(&K, &mut V)> {
        self.raw.get_by_rank_mut(rank)
    }

    /// Returns the number of entries whose keys are strictly less than `key`,
    /// which is also the position where new entries for `key` would begin.
    ///
    /// # Examples
    ///
    /// ```
    /// use ranked_btree::RankedMultiMap;
    ///
    /// let map = RankedMultiMap::from([(10, ()), (20, ()), (20, ()), (30, ())]);
    /// assert_eq!(map.rank(&20), 1);
    /// assert_eq!(map.rank(&25), 3);
    /// ```
    #[must_use]
    pub fn rank<Q>(&self, key: &Q) -> usize
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.raw.rank_lower_bound(key)
    }

    /// Returns the position of the first entry for `key`, or `None` if the
    /// key is not present.
    #[must_use]
    pub fn rank_of<Q>(&self, key: &Q) -> Option<usize>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.raw.rank_of(key)
    }

    /// A cursor at the entry with position `rank`, or at the end position
    /// when `rank >= len`.
    pub fn cursor_at(&self, rank: usize) -> Cursor<'_, K, V> {
        Cursor::over(&self.raw, self.raw.pos_at_rank(rank))
    }

    /// A cursor with mutable value access at the entry with position `rank`,
    /// or at the end position when `rank >= len`.
    pub fn cursor_mut_at(&mut self, rank: usize) -> CursorMut<'_, K, V> {
        let pos = self.raw.pos_at_rank(rank);
        CursorMut::over(&mut self.raw, pos)
    }

    /// A cursor at the first entry whose key is not less than `key`.
    pub fn lower_bound<Q>(&self, key: &Q) -> Cursor<'_, K, V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        Cursor::over(&self.raw, self.raw.lower_bound_pos(key))
    }

    /// A cursor at the first entry whose key is strictly greater than `key`.
    pub fn upper_bound<Q>(&self, key: &Q) -> Cursor<'_, K, V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        Cursor::over(&self.raw, self.raw.upper_bound_pos(key))
    }
}

impl<'a, K, V> IntoIterator for &'a RankedMultiMap<K, V> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Iter<'a, K, V> {
        self.iter()
    }
}

impl<'a, K, V> IntoIterator for &'a mut RankedMultiMap<K, V> {
    type Item = (&'a K, &'a mut V);
    type IntoIter = IterMut<'a, K, V>;

    fn into_iter(self) -> IterMut<'a, K, V> {
        self.iter_mut()
    }
}

impl<K, V> IntoIterator for RankedMultiMap<K, V> {
    type Item = (K, V);
    type IntoIter = IntoIter<K, V>;

    /// Gets an owning iterator over the entries of the map, sorted by key.
    fn into_iter(mut self) -> IntoIter<K, V> {
        IntoIter::from_entries(self.raw.drain_to_vec())
    }
}

impl<K: Clone + Ord, V> FromIterator<(K, V)> for RankedMultiMap<K, V> {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> RankedMultiMap<K, V> {
        let mut map = RankedMultiMap::new();
        map.extend(iter);
        map
    }
}

impl<K: Clone + Ord, V> Extend<(K, V)> for RankedMultiMap<K, V> {
    fn extend<T: IntoIterator<Item = (K, V)>>(&mut self, iter: T) {
        for (key, value) in iter {
            self.insert(key, value);
        }
    }
}

impl<K: Clone + Ord, V, const N: usize> From<[(K, V); N]> for RankedMultiMap<K, V> {
    fn from(arr: [(K, V); N]) -> Self {
        arr.into_iter().collect()
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for RankedMultiMap<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K: Clone, V: Clone> Clone for RankedMultiMap<K, V> {
    fn clone(&self) -> Self {
        RankedMultiMap {
            raw: self.raw.clone(),
        }
    }
}

impl<K, V> Default for RankedMultiMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: PartialEq, V: PartialEq> PartialEq for RankedMultiMap<K, V> {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().zip(other.iter()).all(|(a, b)| a == b)
    }
}

impl<K: Eq, V: Eq> Eq for RankedMultiMap<K, V> {}
