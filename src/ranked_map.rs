use core::borrow::Borrow;
use core::fmt;
use core::hash::{Hash, Hasher};
use core::iter::FusedIterator;
use core::marker::PhantomData;
use core::ops::{Bound, Index, RangeBounds};

use crate::raw::{Pos, RawRankedTree};

mod entry;
mod rank_ops;

pub use crate::Rank;
pub use entry::{Entry, OccupiedEntry, VacantEntry};

/// Validates that the start bound does not exceed the end bound.
///
/// # Panics
///
/// Panics if `start > end` or if `start == end` and both bounds are `Excluded`.
pub(crate) fn validate_range_bounds<T, R>(range: &R)
where
    T: ?Sized + Ord,
    R: RangeBounds<T>,
{
    if let (Bound::Included(start) | Bound::Excluded(start), Bound::Included(end) | Bound::Excluded(end)) =
        (range.start_bound(), range.end_bound())
    {
        let valid =
            if matches!(range.start_bound(), Bound::Excluded(_)) && matches!(range.end_bound(), Bound::Excluded(_)) {
                start < end
            } else {
                start <= end
            };
        assert!(valid, "range start is greater than range end in RankedMap");
    }
}

/// An ordered map based on a B+tree with subtree-size counts.
///
/// Given a key type with a [total order], an ordered map stores its entries in
/// key order. That means that keys must be of a type that implements the
/// [`Ord`] trait, such that two keys can always be compared to determine their
/// ordering. On top of the usual ordered-map interface, the size counts give
/// every entry a *rank*, its zero-based position in sorted order, and rank
/// lookups, rank-addressed removal, and position-addressed slices all run in
/// O(log n).
///
/// It is a logic error for a key to be modified in such a way that the key's
/// ordering relative to any other key, as determined by the [`Ord`] trait,
/// changes while it is in the map. This is normally only possible through
/// [`Cell`], [`RefCell`], global state, I/O, or unsafe code. The behavior
/// resulting from such a logic error is not specified, but will be
/// encapsulated to the `RankedMap` that observed the logic error and not
/// result in undefined behavior.
///
/// # Examples
///
/// ```
/// use ranked_btree::RankedMap;
///
/// let mut movie_reviews = RankedMap::new();
///
/// // Review some movies.
/// movie_reviews.insert("Office Space",       "Deals with real issues in the workplace.");
/// movie_reviews.insert("Pulp Fiction",       "Masterpiece.");
/// movie_reviews.insert("The Godfather",      "Very enjoyable.");
/// movie_reviews.insert("The Blues Brothers", "Eye lyked it a lot.");
///
/// // Check for a specific one.
/// if !movie_reviews.contains_key("Les Miserables") {
///     println!("We've got {} reviews, but Les Miserables ain't one.",
///              movie_reviews.len());
/// }
///
/// // Oops, this review has a lot of spelling mistakes. Let's delete it.
/// movie_reviews.remove("The Blues Brothers");
///
/// // The second review in alphabetical order, in O(log n).
/// let (title, _review) = movie_reviews.get_by_rank(1).unwrap();
/// assert_eq!(*title, "Pulp Fiction");
///
/// // Iterate over everything.
/// for (movie, review) in &movie_reviews {
///     println!("{movie}: \"{review}\"");
/// }
/// ```
///
/// A `RankedMap` with a known list of items can be initialized from an array:
///
/// ```
/// use ranked_btree::RankedMap;
///
/// let solar_distance = RankedMap::from([
///     ("Mercury", 0.4),
///     ("Venus", 0.7),
///     ("Earth", 1.0),
///     ("Mars", 1.5),
/// ]);
/// assert_eq!(solar_distance.rank(&"Mercury"), 2);
/// ```
///
/// [total order]: https://en.wikipedia.org/wiki/Total_order
/// [`Cell`]: core::cell::Cell
/// [`RefCell`]: core::cell::RefCell
pub struct RankedMap<K, V> {
    raw: RawRankedTree<K, V>,
}

/// An iterator over the entries of a `RankedMap`.
///
/// This `struct` is created by the [`iter`] method on [`RankedMap`]. See its
/// documentation for more.
///
/// [`iter`]: RankedMap::iter
#[must_use = "iterators are lazy and do nothing unless consumed"]
pub struct Iter<'a, K, V> {
    tree: *const RawRankedTree<K, V>,
    front: Option<Pos>,
    back: Option<Pos>,
    remaining: usize,
    _marker: PhantomData<&'a RawRankedTree<K, V>>,
}

// SAFETY: Iter behaves as &RawRankedTree<K, V>, so it is Send/Sync when the
// tree is Sync.
unsafe impl<K: Sync, V: Sync> Send for Iter<'_, K, V> {}
unsafe impl<K: Sync, V: Sync> Sync for Iter<'_, K, V> {}

/// A mutable iterator over the entries of a `RankedMap`.
///
/// This `struct` is created by the [`iter_mut`] method on [`RankedMap`]. See
/// its documentation for more.
///
/// [`iter_mut`]: RankedMap::iter_mut
#[must_use = "iterators are lazy and do nothing unless consumed"]
pub struct IterMut<'a, K: 'a, V: 'a> {
    tree: *mut RawRankedTree<K, V>,
    front: Option<Pos>,
    back: Option<Pos>,
    remaining: usize,
    _marker: PhantomData<&'a mut (K, V)>,
}

// SAFETY: IterMut behaves as &mut RawRankedTree<K, V>, so it is Send when K
// and V are Send. It is NOT Sync.
unsafe impl<K: Send, V: Send> Send for IterMut<'_, K, V> {}

/// An owning iterator over the entries of a `RankedMap`, sorted by key.
///
/// This `struct` is created by the [`into_iter`] method on [`RankedMap`]
/// (provided by the [`IntoIterator`] trait).
///
/// [`into_iter`]: IntoIterator::into_iter
pub struct IntoIter<K, V> {
    inner: alloc::vec::IntoIter<(K, V)>,
}

/// An iterator over the keys of a `RankedMap`.
///
/// This `struct` is created by the [`keys`] method on [`RankedMap`].
///
/// [`keys`]: RankedMap::keys
#[must_use = "iterators are lazy and do nothing unless consumed"]
pub struct Keys<'a, K, V> {
    inner: Iter<'a, K, V>,
}

/// An iterator over the values of a `RankedMap`.
///
/// This `struct` is created by the [`values`] method on [`RankedMap`].
///
/// [`values`]: RankedMap::values
#[must_use = "iterators are lazy and do nothing unless consumed"]
pub struct Values<'a, K, V> {
    inner: Iter<'a, K, V>,
}

/// A mutable iterator over the values of a `RankedMap`.
///
/// This `struct` is created by the [`values_mut`] method on [`RankedMap`].
///
/// [`values_mut`]: RankedMap::values_mut
#[must_use = "iterators are lazy and do nothing unless consumed"]
pub struct ValuesMut<'a, K, V> {
    inner: IterMut<'a, K, V>,
}

/// An owning iterator over the keys of a `RankedMap`.
///
/// This `struct` is created by the [`into_keys`] method on [`RankedMap`].
///
/// [`into_keys`]: RankedMap::into_keys
#[must_use = "iterators are lazy and do nothing unless consumed"]
pub struct IntoKeys<K, V> {
    inner: IntoIter<K, V>,
}

/// An owning iterator over the values of a `RankedMap`.
///
/// This `struct` is created by the [`into_values`] method on [`RankedMap`].
///
/// [`into_values`]: RankedMap::into_values
#[must_use = "iterators are lazy and do nothing unless consumed"]
pub struct IntoValues<K, V> {
    inner: IntoIter<K, V>,
}

/// An iterator over a sub-range of entries in a `RankedMap`, created by the
/// [`range`](RankedMap::range) or [`slice`](RankedMap::slice) methods.
#[must_use = "iterators are lazy and do nothing unless consumed"]
pub struct Range<'a, K: 'a, V: 'a> {
    tree: *const RawRankedTree<K, V>,
    front: Option<Pos>,
    back: Option<Pos>,
    remaining: usize,
    _marker: PhantomData<&'a RawRankedTree<K, V>>,
}

// SAFETY: Range behaves as &RawRankedTree<K, V>, so it is Send/Sync when the
// tree is Sync.
unsafe impl<K: Sync, V: Sync> Send for Range<'_, K, V> {}
unsafe impl<K: Sync, V: Sync> Sync for Range<'_, K, V> {}

/// A mutable iterator over a sub-range of entries in a `RankedMap`, created by
/// the [`range_mut`](RankedMap::range_mut) or [`slice_mut`](RankedMap::slice_mut)
/// methods.
#[must_use = "iterators are lazy and do nothing unless consumed"]
pub struct RangeMut<'a, K: 'a, V: 'a> {
    tree: *mut RawRankedTree<K, V>,
    front: Option<Pos>,
    back: Option<Pos>,
    remaining: usize,
    _marker: PhantomData<&'a mut (K, V)>,
}

// SAFETY: RangeMut behaves as &mut RawRankedTree<K, V>, so it is Send when K
// and V are Send. It is NOT Sync.
unsafe impl<K: Send, V: Send> Send for RangeMut<'_, K, V> {}

/// A read-only cursor into a `RankedMap`.
///
/// A cursor points either at an entry or at the end position just past the
/// last entry. It can step by one in either direction, jump by arbitrary
/// offsets, seek to a rank, and report the rank of its current position, all
/// in O(log n) or better. Cursors are plain borrows: any mutation of the map
/// first requires dropping them.
///
/// # Examples
///
/// ```
/// use ranked_btree::RankedMap;
///
/// let map = RankedMap::from([(1, 'a'), (2, 'b'), (3, 'c'), (4, 'd')]);
///
/// let mut cur = map.cursor_at(0);
/// assert_eq!(cur.key(), Some(&1));
/// cur.advance(3);
/// assert_eq!(cur.key_value(), Some((&4, &'d')));
/// cur.advance(1);
/// assert!(cur.is_end());
/// assert_eq!(cur.rank(), 4);
/// cur.move_prev();
/// assert_eq!(cur.key(), Some(&4));
/// ```
pub struct Cursor<'a, K, V> {
    tree: &'a RawRankedTree<K, V>,
    pos: Option<Pos>,
}

impl<K, V> Clone for Cursor<'_, K, V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K, V> Copy for Cursor<'_, K, V> {}

/// A cursor into a `RankedMap` with mutable access to values.
///
/// Behaves like [`Cursor`], but additionally hands out mutable references to
/// the value under it. Keys stay read-only; changing a key would break the
/// ordering invariants.
pub struct CursorMut<'a, K, V> {
    tree: &'a mut RawRankedTree<K, V>,
    pos: Option<Pos>,
}

impl<K, V> RankedMap<K, V> {
    /// Makes a new, empty `RankedMap`.
    ///
    /// Does not allocate anything on its own.
    ///
    /// # Examples
    ///
    /// ```
    /// use ranked_btree::RankedMap;
    ///
    /// let mut map = RankedMap::new();
    ///
    /// // entries can now be inserted into the empty map
    /// map.insert(1, "a");
    /// ```
    #[must_use]
    pub const fn new() -> RankedMap<K, V> {
        RankedMap {
            raw: RawRankedTree::new(),
        }
    }

    /// Makes an empty `RankedMap` with room preallocated for at least
    /// `capacity` entries.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> RankedMap<K, V> {
        RankedMap {
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

    /// Returns the number of entries in the map.
    ///
    /// # Examples
    ///
    /// ```
    /// use ranked_btree::RankedMap;
    ///
    /// let mut a = RankedMap::new();
    /// assert_eq!(a.len(), 0);
    /// a.insert(1, "a");
    /// assert_eq!(a.len(), 1);
    /// ```
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
    ///
    /// # Examples
    ///
    /// ```
    /// use ranked_btree::RankedMap;
    ///
    /// let mut a = RankedMap::new();
    /// a.insert(1, "a");
    /// a.clear();
    /// assert!(a.is_empty());
    /// ```
    pub fn clear(&mut self) {
        self.raw.clear();
    }
}

impl<K: Clone + Ord, V> RankedMap<K, V> {
    /// Returns a reference to the value corresponding to the key.
    ///
    /// The key may be any borrowed form of the map's key type, but the ordering
    /// on the borrowed form *must* match the ordering on the key type.
    ///
    /// # Examples
    ///
    /// ```
    /// use ranked_btree::RankedMap;
    ///
    /// let mut map = RankedMap::new();
    /// map.insert(1, "a");
    /// assert_eq!(map.get(&1), Some(&"a"));
    /// assert_eq!(map.get(&2), None);
    /// ```
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.raw.get(key)
    }

    /// Returns the key-value pair corresponding to the supplied key.
    ///
    /// The supplied key may be any borrowed form of the map's key type, but
    /// the ordering on the borrowed form *must* match the ordering on the key
    /// type.
    ///
    /// # Examples
    ///
    /// ```
    /// use ranked_btree::RankedMap;
    ///
    /// let mut map = RankedMap::new();
    /// map.insert(1, "a");
    /// assert_eq!(map.get_key_value(&1), Some((&1, &"a")));
    /// assert_eq!(map.get_key_value(&2), None);
    /// ```
    pub fn get_key_value<Q>(&self, key: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.raw.get_key_value(key)
    }

    /// Returns a mutable reference to the value corresponding to the key.
    ///
    /// # Examples
    ///
    /// ```
    /// use ranked_btree::RankedMap;
    ///
    /// let mut map = RankedMap::new();
    /// map.insert(1, "a");
    /// if let Some(x) = map.get_mut(&1) {
    ///     *x = "b";
    /// }
    /// assert_eq!(map[&1], "b");
    /// ```
    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.raw.get_mut(key)
    }

    /// Returns `true` if the map contains a value for the specified key.
    ///
    /// # Examples
    ///
    /// ```
    /// use ranked_btree::RankedMap;
    ///
    /// let mut map = RankedMap::new();
    /// map.insert(1, "a");
    /// assert!(map.contains_key(&1));
    /// assert!(!map.contains_key(&2));
    /// ```
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.raw.contains_key(key)
    }

    /// Returns the first key-value pair in the map. The key in this pair is
    /// the minimum key in the map.
    ///
    /// # Examples
    ///
    /// ```
    /// use ranked_btree::RankedMap;
    ///
    /// let mut map = RankedMap::new();
    /// assert_eq!(map.first_key_value(), None);
    /// map.insert(1, "b");
    /// map.insert(2, "a");
    /// assert_eq!(map.first_key_value(), Some((&1, &"b")));
    /// ```
    #[must_use]
    pub fn first_key_value(&self) -> Option<(&K, &V)> {
        self.raw.first_key_value()
    }

    /// Returns the first entry in the map for in-place manipulation.
    /// The key of this entry is the minimum key in the map.
    ///
    /// # Examples
    ///
    /// ```
    /// use ranked_btree::RankedMap;
    ///
    /// let mut map = RankedMap::new();
    /// map.insert(1, "a");
    /// map.insert(2, "b");
    /// if let Some(mut entry) = map.first_entry() {
    ///     if *entry.key() > 0 {
    ///         entry.insert("first");
    ///     }
    /// }
    /// assert_eq!(*map.get(&1).unwrap(), "first");
    /// assert_eq!(*map.get(&2).unwrap(), "b");
    /// ```
    pub fn first_entry(&mut self) -> Option<OccupiedEntry<'_, K, V>> {
        let (leaf, index) = self.raw.first_pos()?;
        let key = self.raw.node(leaf).as_leaf().key(index).clone();
        Some(OccupiedEntry {
            key,
            leaf,
            index,
            tree: &mut self.raw,
        })
    }

    /// Returns the last key-value pair in the map. The key in this pair is
    /// the maximum key in the map.
    ///
    /// # Examples
    ///
    /// ```
    /// use ranked_btree::RankedMap;
    ///
    /// let mut map = RankedMap::new();
    /// map.insert(1, "b");
    /// map.insert(2, "a");
    /// assert_eq!(map.last_key_value(), Some((&2, &"a")));
    /// ```
    #[must_use]
    pub fn last_key_value(&self) -> Option<(&K, &V)> {
        self.raw.last_key_value()
    }

    /// Returns the last entry in the map for in-place manipulation.
    /// The key of this entry is the maximum key in the map.
    ///
    /// # Examples
    ///
    /// ```
    /// use ranked_btree::RankedMap;
    ///
    /// let mut map = RankedMap::new();
    /// map.insert(1, "a");
    /// map.insert(2, "b");
    /// if let Some(mut entry) = map.last_entry() {
    ///     if *entry.key() > 0 {
    ///         entry.insert("last");
    ///     }
    /// }
    /// assert_eq!(*map.get(&1).unwrap(), "a");
    /// assert_eq!(*map.get(&2).unwrap(), "last");
    /// ```
    pub fn last_entry(&mut self) -> Option<OccupiedEntry<'_, K, V>> {
        let (leaf, index) = self.raw.last_pos()?;
        let key = self.raw.node(leaf).as_leaf().key(index).clone();
        Some(OccupiedEntry {
            key,
            leaf,
            index,
            tree: &mut self.raw,
        })
    }

    /// Removes and returns the first element in the map.
    ///
    /// # Examples
    ///
    /// ```
    /// use ranked_btree::RankedMap;
    ///
    /// let mut map = RankedMap::from([(1, "a"), (2, "b")]);
    /// assert_eq!(map.pop_first(), Some((1, "a")));
    /// assert_eq!(map.pop_first(), Some((2, "b")));
    /// assert_eq!(map.pop_first(), None);
    /// ```
    pub fn pop_first(&mut self) -> Option<(K, V)> {
        self.raw.pop_first()
    }

    /// Removes and returns the last element in the map.
    ///
    /// # Examples
    ///
    /// ```
    /// use ranked_btree::RankedMap;
    ///
    /// let mut map = RankedMap::from([(1, "a"), (2, "b")]);
    /// assert_eq!(map.pop_last(), Some((2, "b")));
    /// assert_eq!(map.pop_last(), Some((1, "a")));
    /// assert_eq!(map.pop_last(), None);
    /// ```
    pub fn pop_last(&mut self) -> Option<(K, V)> {
        self.raw.pop_last()
    }

    /// Inserts a key-value pair into the map.
    ///
    /// If the map did not have this key present, `None` is returned.
    ///
    /// If the map did have this key present, the value is updated, and the old
    /// value is returned. The key is not updated, though; this matters for
    /// types that can be `==` without being identical.
    ///
    /// # Examples
    ///
    /// ```
    /// use ranked_btree::RankedMap;
    ///
    /// let mut map = RankedMap::new();
    /// assert_eq!(map.insert(37, "a"), None);
    /// assert_eq!(map.is_empty(), false);
    ///
    /// map.insert(37, "b");
    /// assert_eq!(map.insert(37, "c"), Some("b"));
    /// assert_eq!(map[&37], "c");
    /// ```
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        self.raw.insert_unique(key, value)
    }

    /// Inserts a key-value pair using a rank hint.
    ///
    /// `hint` is the position the caller expects the new key to land at, for
    /// example the rank just produced by a neighboring insertion. When the
    /// entries around `hint` bracket the key, the insertion skips the
    /// comparator descent entirely; otherwise it falls back to a plain
    /// [`insert`](RankedMap::insert). The replacement semantics are identical
    /// to `insert`.
    ///
    /// # Examples
    ///
    /// ```
    /// use ranked_btree::RankedMap;
    ///
    /// let mut map = RankedMap::new();
    /// // Appending in order: the end hint is always accurate.
    /// for i in 0..100 {
    ///     map.insert_hint(map.len(), i, i * 2);
    /// }
    /// assert_eq!(map.len(), 100);
    /// assert_eq!(map.get(&40), Some(&80));
    /// ```
    pub fn insert_hint(&mut self, hint: usize, key: K, value: V) -> Option<V> {
        self.raw.insert_hinted_unique(hint, key, value)
    }

    /// Removes a key from the map, returning the value at the key if the key
    /// was previously in the map.
    ///
    /// # Examples
    ///
    /// ```
    /// use ranked_btree::RankedMap;
    ///
    /// let mut map = RankedMap::new();
    /// map.insert(1, "a");
    /// assert_eq!(map.remove(&1), Some("a"));
    /// assert_eq!(map.remove(&1), None);
    /// ```
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.raw.remove(key)
    }

    /// Removes a key from the map, returning the stored key and value if the
    /// key was previously in the map.
    ///
    /// # Examples
    ///
    /// ```
    /// use ranked_btree::RankedMap;
    ///
    /// let mut map = RankedMap::new();
    /// map.insert(1, "a");
    /// assert_eq!(map.remove_entry(&1), Some((1, "a")));
    /// assert_eq!(map.remove_entry(&1), None);
    /// ```
    pub fn remove_entry<Q>(&mut self, key: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.raw.remove_entry(key)
    }

    /// Removes and returns the entry at position `rank` in sorted order, or
    /// `None` when `rank` is out of bounds.
    ///
    /// # Examples
    ///
    /// ```
    /// use ranked_btree::RankedMap;
    ///
    /// let mut map = RankedMap::from([(10, "a"), (20, "b"), (30, "c")]);
    /// assert_eq!(map.remove_at(1), Some((20, "b")));
    /// assert_eq!(map.remove_at(5), None);
    /// assert_eq!(map.len(), 2);
    /// ```
    pub fn remove_at(&mut self, rank: usize) -> Option<(K, V)> {
        self.raw.remove_at(rank)
    }

    /// Removes the entries in the position range `begin..end` and returns how
    /// many were removed. Negative positions count from the end, and an `end`
    /// of zero means the end of the map, exactly as in
    /// [`slice`](RankedMap::slice).
    ///
    /// # Examples
    ///
    /// ```
    /// use ranked_btree::RankedMap;
    ///
    /// let mut map: RankedMap<i32, i32> = (0..10).map(|i| (i, i)).collect();
    /// // Drop everything but the three smallest and the single largest entry.
    /// assert_eq!(map.remove_slice(3, -1), 6);
    /// let keys: Vec<i32> = map.keys().copied().collect();
    /// assert_eq!(keys, [0, 1, 2, 9]);
    /// ```
    pub fn remove_slice(&mut self, begin: isize, end: isize) -> usize {
        self.raw.remove_slice(begin, end)
    }

    /// Retains only the elements specified by the predicate.
    ///
    /// In other words, remove all pairs `(k, v)` for which `f(&k, &mut v)`
    /// returns `false`. The elements are visited in ascending key order.
    ///
    /// # Examples
    ///
    /// ```
    /// use ranked_btree::RankedMap;
    ///
    /// let mut map: RankedMap<i32, i32> = (0..8).map(|x| (x, x * 10)).collect();
    /// // Keep only the elements with even-numbered keys.
    /// map.retain(|&k, _| k % 2 == 0);
    /// assert!(map.into_iter().eq(vec![(0, 0), (2, 20), (4, 40), (6, 60)]));
    /// ```
    pub fn retain<F>(&mut self, mut f: F)
    where
        F: FnMut(&K, &mut V) -> bool,
    {
        let doomed: alloc::vec::Vec<K> = self
            .iter_mut()
            .filter_map(|(k, v)| if f(k, v) { None } else { Some(k.clone()) })
            .collect();

        for key in doomed {
            self.raw.remove(&key);
        }
    }

    /// Moves all elements from `other` into `self`, leaving `other` empty.
    ///
    /// If a key from `other` is already present in `self`, the respective
    /// value from `self` will be overwritten with the respective value from
    /// `other`.
    ///
    /// # Examples
    ///
    /// ```
    /// use ranked_btree::RankedMap;
    ///
    /// let mut a = RankedMap::from([(1, "a"), (2, "b"), (3, "c")]);
    /// let mut b = RankedMap::from([(3, "d"), (4, "e")]);
    ///
    /// a.append(&mut b);
    ///
    /// assert_eq!(a.len(), 4);
    /// assert_eq!(b.len(), 0);
    /// assert_eq!(a[&3], "d");
    /// ```
    pub fn append(&mut self, other: &mut Self) {
        if other.is_empty() {
            return;
        }
        if self.is_empty() {
            core::mem::swap(&mut self.raw, &mut other.raw);
            return;
        }

        // Drain the other tree in O(n) via its leaf chain, then insert.
        for (key, value) in other.raw.drain_to_vec() {
            self.raw.insert_unique(key, value);
        }
    }

    /// Gets the given key's corresponding entry in the map for in-place
    /// manipulation.
    ///
    /// # Examples
    ///
    /// ```
    /// use ranked_btree::RankedMap;
    ///
    /// let mut count: RankedMap<&str, usize> = RankedMap::new();
    ///
    /// // count the number of occurrences of letters in the vec
    /// for x in ["a", "b", "a", "c", "a", "b"] {
    ///     count.entry(x).and_modify(|curr| *curr += 1).or_insert(1);
    /// }
    ///
    /// assert_eq!(count["a"], 3);
    /// assert_eq!(count["b"], 2);
    /// assert_eq!(count["c"], 1);
    /// ```
    pub fn entry(&mut self, key: K) -> Entry<'_, K, V> {
        if let Some((leaf, index)) = self.raw.search(&key) {
            Entry::Occupied(OccupiedEntry {
                key,
                leaf,
                index,
                tree: &mut self.raw,
            })
        } else {
            Entry::Vacant(VacantEntry {
                key,
                tree: &mut self.raw,
            })
        }
    }

    /// Constructs a double-ended iterator over a sub-range of elements in the
    /// map. The simplest way is to use the range syntax `min..max`, thus
    /// `range(min..max)` will yield elements from min (inclusive) to max
    /// (exclusive).
    ///
    /// # Panics
    ///
    /// Panics if range `start > end`, or if range `start == end` and both
    /// bounds are `Excluded`.
    ///
    /// # Examples
    ///
    /// ```
    /// use ranked_btree::RankedMap;
    ///
    /// let mut map = RankedMap::new();
    /// map.insert(3, "a");
    /// map.insert(5, "b");
    /// map.insert(8, "c");
    /// for (&key, &value) in map.range(4..=8) {
    ///     println!("{key}: {value}");
    /// }
    /// assert_eq!(map.range(4..).next(), Some((&5, &"b")));
    /// ```
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

    /// Constructs a mutable double-ended iterator over a sub-range of elements
    /// in the map.
    ///
    /// # Panics
    ///
    /// Panics if range `start > end`, or if range `start == end` and both
    /// bounds are `Excluded`.
    ///
    /// # Examples
    ///
    /// ```
    /// use ranked_btree::RankedMap;
    ///
    /// let mut map: RankedMap<&str, i32> =
    ///     [("Alice", 0), ("Bob", 0), ("Carol", 0), ("Cheryl", 0)].into();
    /// for (_, balance) in map.range_mut("B".."Cheryl") {
    ///     *balance += 100;
    /// }
    /// assert_eq!(map[&"Alice"], 0);
    /// assert_eq!(map[&"Bob"], 100);
    /// assert_eq!(map[&"Carol"], 100);
    /// assert_eq!(map[&"Cheryl"], 0);
    /// ```
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
    /// `begin..end`.
    ///
    /// Negative positions count from the end (`-1` is the last entry), and an
    /// `end` of zero means the end of the map. Inverted or out-of-range
    /// endpoints yield an empty iterator.
    ///
    /// # Examples
    ///
    /// ```
    /// use ranked_btree::RankedMap;
    ///
    /// let map = RankedMap::from([(10, ()), (20, ()), (30, ()), (40, ()), (50, ())]);
    ///
    /// let inner: Vec<i32> = map.slice(1, -1).map(|(&k, _)| k).collect();
    /// assert_eq!(inner, [20, 30, 40]);
    ///
    /// let tail: Vec<i32> = map.slice(-3, 0).map(|(&k, _)| k).collect();
    /// assert_eq!(tail, [30, 40, 50]);
    /// ```
    pub fn slice(&self, begin: isize, end: isize) -> Range<'_, K, V> {
        match self.raw.slice_bounds(begin, end) {
            Some((begin, end)) if begin < end => {
                let front = self.raw.pos_at_rank(begin);
                let back = self.raw.pos_at_rank(end - 1);
                Range::between(&self.raw, front, back)
            }
            _ => Range::between(&self.raw, None, None),
        }
    }

    /// Constructs a mutable iterator over the entries in the position range
    /// `begin..end`, with the same index semantics as
    /// [`slice`](RankedMap::slice).
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
    ///
    /// # Examples
    ///
    /// ```
    /// use ranked_btree::RankedMap;
    ///
    /// let map: RankedMap<i32, i32> = (0..100).map(|i| (i, i)).collect();
    /// assert_eq!(map.count_range(&10, &19), 10);
    /// assert_eq!(map.count_range(&90, &200), 10);
    /// assert_eq!(map.count_range(&5, &0), 0);
    /// ```
    pub fn count_range<Q>(&self, min: &Q, max: &Q) -> usize
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.raw.count_range(min, max)
    }

    /// A cursor at the entry with position `rank`, or at the end position
    /// when `rank >= len`.
    pub fn cursor_at(&self, rank: usize) -> Cursor<'_, K, V> {
        Cursor {
            tree: &self.raw,
            pos: self.raw.pos_at_rank(rank),
        }
    }

    /// A cursor with mutable value access at the entry with position `rank`,
    /// or at the end position when `rank >= len`.
    ///
    /// # Examples
    ///
    /// ```
    /// use ranked_btree::RankedMap;
    ///
    /// let mut map = RankedMap::from([(1, 10), (2, 20)]);
    /// let mut cur = map.cursor_mut_at(1);
    /// *cur.value_mut().unwrap() += 5;
    /// assert_eq!(map[&2], 25);
    /// ```
    pub fn cursor_mut_at(&mut self, rank: usize) -> CursorMut<'_, K, V> {
        let pos = self.raw.pos_at_rank(rank);
        CursorMut {
            tree: &mut self.raw,
            pos,
        }
    }

    /// A cursor at the first entry whose key is not less than `key`; at the
    /// end position when every key is smaller.
    ///
    /// # Examples
    ///
    /// ```
    /// use ranked_btree::RankedMap;
    ///
    /// let map = RankedMap::from([(10, "a"), (20, "b")]);
    /// assert_eq!(map.lower_bound(&15).key(), Some(&20));
    /// assert_eq!(map.lower_bound(&20).key(), Some(&20));
    /// assert!(map.lower_bound(&25).is_end());
    /// ```
    pub fn lower_bound<Q>(&self, key: &Q) -> Cursor<'_, K, V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        Cursor {
            tree: &self.raw,
            pos: self.raw.lower_bound_pos(key),
        }
    }

    /// A cursor at the first entry whose key is strictly greater than `key`;
    /// at the end position when no key is greater.
    ///
    /// # Examples
    ///
    /// ```
    /// use ranked_btree::RankedMap;
    ///
    /// let map = RankedMap::from([(10, "a"), (20, "b")]);
    /// assert_eq!(map.upper_bound(&10).key(), Some(&20));
    /// assert!(map.upper_bound(&20).is_end());
    /// ```
    pub fn upper_bound<Q>(&self, key: &Q) -> Cursor<'_, K, V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        Cursor {
            tree: &self.raw,
            pos: self.raw.upper_bound_pos(key),
        }
    }

}

impl<K, V> RankedMap<K, V> {
    /// Gets an iterator over the entries of the map, sorted by key.
    ///
    /// # Examples
    ///
    /// ```
    /// use ranked_btree::RankedMap;
    ///
    /// let map = RankedMap::from([(3, "c"), (1, "a"), (2, "b")]);
    ///
    /// let (first_key, first_value) = map.iter().next().unwrap();
    /// assert_eq!((*first_key, *first_value), (1, "a"));
    /// ```
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter::over(&self.raw)
    }

    /// Gets a mutable iterator over the entries of the map, sorted by key.
    ///
    /// # Examples
    ///
    /// ```
    /// use ranked_btree::RankedMap;
    ///
    /// let mut map = RankedMap::from([("a", 1), ("b", 2)]);
    /// for (_, value) in map.iter_mut() {
    ///     *value *= 10;
    /// }
    /// assert_eq!(map[&"a"], 10);
    /// assert_eq!(map[&"b"], 20);
    /// ```
    pub fn iter_mut(&mut self) -> IterMut<'_, K, V> {
        IterMut::over(&mut self.raw)
    }

    /// Gets an iterator over the keys of the map, in sorted order.
    ///
    /// # Examples
    ///
    /// ```
    /// use ranked_btree::RankedMap;
    ///
    /// let map = RankedMap::from([(2, "b"), (1, "a")]);
    /// let keys: Vec<_> = map.keys().copied().collect();
    /// assert_eq!(keys, [1, 2]);
    /// ```
    pub fn keys(&self) -> Keys<'_, K, V> {
        Keys { inner: self.iter() }
    }

    /// Gets an iterator over the values of the map, in order by key.
    ///
    /// # Examples
    ///
    /// ```
    /// use ranked_btree::RankedMap;
    ///
    /// let map = RankedMap::from([(1, "hello"), (2, "goodbye")]);
    /// let values: Vec<_> = map.values().copied().collect();
    /// assert_eq!(values, ["hello", "goodbye"]);
    /// ```
    pub fn values(&self) -> Values<'_, K, V> {
        Values { inner: self.iter() }
    }

    /// Gets a mutable iterator over the values of the map, in order by key.
    ///
    /// # Examples
    ///
    /// ```
    /// use ranked_btree::RankedMap;
    ///
    /// let mut map = RankedMap::from([("a", 1), ("b", 2)]);
    /// for value in map.values_mut() {
    ///     *value += 10;
    /// }
    /// assert_eq!(map[&"a"], 11);
    /// ```
    pub fn values_mut(&mut self) -> ValuesMut<'_, K, V> {
        ValuesMut {
            inner: self.iter_mut(),
        }
    }

    /// Creates a consuming iterator visiting all the keys, in sorted order.
    pub fn into_keys(mut self) -> IntoKeys<K, V> {
        IntoKeys::from_entries(self.raw.drain_to_vec())
    }

    /// Creates a consuming iterator visiting all the values, in order by key.
    pub fn into_values(mut self) -> IntoValues<K, V> {
        IntoValues::from_entries(self.raw.drain_to_vec())
    }

    pub(crate) fn raw(&self) -> &RawRankedTree<K, V> {
        &self.raw
    }

    pub(crate) fn raw_mut(&mut self) -> &mut RawRankedTree<K, V> {
        &mut self.raw
    }
}

// ─── Cursors ─────────────────────────────────────────────────────────────────

impl<'a, K, V> Cursor<'a, K, V> {
    /// The key under the cursor, or `None` at the end position.
    #[must_use]
    pub fn key(&self) -> Option<&'a K> {
        let (leaf, index) = self.pos?;
        Some(self.tree.node(leaf).as_leaf().key(index))
    }

    /// The value under the cursor, or `None` at the end position.
    #[must_use]
    pub fn value(&self) -> Option<&'a V> {
        let (leaf, index) = self.pos?;
        Some(self.tree.value(self.tree.node(leaf).as_leaf().value(index)))
    }

    /// The entry under the cursor, or `None` at the end position.
    #[must_use]
    pub fn key_value(&self) -> Option<(&'a K, &'a V)> {
        let (leaf, index) = self.pos?;
        let leaf = self.tree.node(leaf).as_leaf();
        Some((leaf.key(index), self.tree.value(leaf.value(index))))
    }

    /// Whether the cursor sits at the end position.
    #[must_use]
    pub fn is_end(&self) -> bool {
        self.pos.is_none()
    }

    /// The number of entries strictly before the cursor; the end position has
    /// rank `len`.
    #[must_use]
    pub fn rank(&self) -> usize {
        match self.pos {
            Some((leaf, index)) => self.tree.rank_of_pos(leaf, index),
            None => self.tree.len(),
        }
    }

    /// Steps to the next entry; from the last entry the cursor moves to the
    /// end position, where it stays.
    pub fn move_next(&mut self) {
        self.pos = self.tree.advance_pos(self.pos, 1);
    }

    /// Steps to the previous entry; from the first entry the cursor moves to
    /// the end position, from the end position to the last entry.
    pub fn move_prev(&mut self) {
        self.pos = self.tree.advance_pos(self.pos, -1);
    }

    /// Jumps by `offset` entries in either direction; positions outside the
    /// map land on the end position.
    pub fn advance(&mut self, offset: isize) {
        self.pos = self.tree.advance_pos(self.pos, offset);
    }

    /// Jumps to the entry at `rank`, or to the end position when
    /// `rank >= len`.
    pub fn seek(&mut self, rank: usize) {
        self.pos = self.tree.pos_at_rank(rank);
    }

    /// Signed rank difference `self - other`. Only meaningful for cursors
    /// into the same map.
    #[must_use]
    #[allow(clippy::cast_possible_wrap)]
    pub fn distance(&self, other: &Cursor<'_, K, V>) -> isize {
        self.rank() as isize - other.rank() as isize
    }
}

impl<K, V> PartialEq for Cursor<'_, K, V> {
    fn eq(&self, other: &Self) -> bool {
        core::ptr::eq(self.tree, other.tree) && self.pos == other.pos
    }
}

impl<K: fmt::Debug, V> fmt::Debug for Cursor<'_, K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cursor").field("key", &self.key()).finish()
    }
}

impl<K, V> CursorMut<'_, K, V> {
    /// The key under the cursor, or `None` at the end position.
    #[must_use]
    pub fn key(&self) -> Option<&K> {
        let (leaf, index) = self.pos?;
        Some(self.tree.node(leaf).as_leaf().key(index))
    }

    /// The value under the cursor, or `None` at the end position.
    #[must_use]
    pub fn value(&self) -> Option<&V> {
        let (leaf, index) = self.pos?;
        Some(self.tree.value(self.tree.node(leaf).as_leaf().value(index)))
    }

    /// Mutable access to the value under the cursor.
    #[must_use]
    pub fn value_mut(&mut self) -> Option<&mut V> {
        let (leaf, index) = self.pos?;
        let handle = self.tree.node(leaf).as_leaf().value(index);
        Some(self.tree.value_mut(handle))
    }

    /// Whether the cursor sits at the end position.
    #[must_use]
    pub fn is_end(&self) -> bool {
        self.pos.is_none()
    }

    /// The number of entries strictly before the cursor; the end position has
    /// rank `len`.
    #[must_use]
    pub fn rank(&self) -> usize {
        match self.pos {
            Some((leaf, index)) => self.tree.rank_of_pos(leaf, index),
            None => self.tree.len(),
        }
    }

    /// Steps to the next entry; from the last entry the cursor moves to the
    /// end position, where it stays.
    pub fn move_next(&mut self) {
        self.pos = self.tree.advance_pos(self.pos, 1);
    }

    /// Steps to the previous entry; from the first entry the cursor moves to
    /// the end position, from the end position to the last entry.
    pub fn move_prev(&mut self) {
        self.pos = self.tree.advance_pos(self.pos, -1);
    }

    /// Jumps by `offset` entries in either direction; positions outside the
    /// map land on the end position.
    pub fn advance(&mut self, offset: isize) {
        self.pos = self.tree.advance_pos(self.pos, offset);
    }

    /// Jumps to the entry at `rank`, or to the end position when
    /// `rank >= len`.
    pub fn seek(&mut self, rank: usize) {
        self.pos = self.tree.pos_at_rank(rank);
    }
}

impl<K: fmt::Debug, V> fmt::Debug for CursorMut<'_, K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CursorMut").field("key", &self.key()).finish()
    }
}

// ─── Iterator plumbing ───────────────────────────────────────────────────────

fn range_len<K, V>(raw: &RawRankedTree<K, V>, front: Option<Pos>, back: Option<Pos>) -> usize {
    match (front, back) {
        (Some((front_leaf, front_index)), Some((back_leaf, back_index))) => {
            let front_rank = raw.rank_of_pos(front_leaf, front_index);
            let back_rank = raw.rank_of_pos(back_leaf, back_index);
            if front_rank > back_rank { 0 } else { back_rank - front_rank + 1 }
        }
        _ => 0,
    }
}

impl<'a, K, V> Iter<'a, K, V> {
    pub(crate) fn over(raw: &'a RawRankedTree<K, V>) -> Self {
        Iter {
            tree: core::ptr::from_ref(raw),
            front: raw.first_pos(),
            back: raw.last_pos(),
            remaining: raw.len(),
            _marker: PhantomData,
        }
    }
}

impl<'a, K, V> IterMut<'a, K, V> {
    pub(crate) fn over(raw: &'a mut RawRankedTree<K, V>) -> Self {
        let front = raw.first_pos();
        let back = raw.last_pos();
        let remaining = raw.len();
        IterMut {
            tree: core::ptr::from_mut(raw),
            front,
            back,
            remaining,
            _marker: PhantomData,
        }
    }
}

impl<'a, K, V> Keys<'a, K, V> {
    pub(crate) fn over(raw: &'a RawRankedTree<K, V>) -> Self {
        Keys {
            inner: Iter::over(raw),
        }
    }
}

impl<'a, K, V> Values<'a, K, V> {
    pub(crate) fn over(raw: &'a RawRankedTree<K, V>) -> Self {
        Values {
            inner: Iter::over(raw),
        }
    }
}

impl<'a, K, V> ValuesMut<'a, K, V> {
    pub(crate) fn over(raw: &'a mut RawRankedTree<K, V>) -> Self {
        ValuesMut {
            inner: IterMut::over(raw),
        }
    }
}

impl<'a, K, V> Range<'a, K, V> {
    pub(crate) fn between(raw: &'a RawRankedTree<K, V>, front: Option<Pos>, back: Option<Pos>) -> Self {
        Range {
            tree: core::ptr::from_ref(raw),
            front,
            back,
            remaining: range_len(raw, front, back),
            _marker: PhantomData,
        }
    }
}

impl<'a, K, V> RangeMut<'a, K, V> {
    pub(crate) fn between(raw: &'a mut RawRankedTree<K, V>, front: Option<Pos>, back: Option<Pos>) -> Self {
        let remaining = range_len(raw, front, back);
        RangeMut {
            tree: core::ptr::from_mut(raw),
            front,
            back,
            remaining,
            _marker: PhantomData,
        }
    }
}

impl<K, V> IntoIter<K, V> {
    pub(crate) fn from_entries(entries: alloc::vec::Vec<(K, V)>) -> Self {
        IntoIter {
            inner: entries.into_iter(),
        }
    }
}

impl<K, V> IntoKeys<K, V> {
    pub(crate) fn from_entries(entries: alloc::vec::Vec<(K, V)>) -> Self {
        IntoKeys {
            inner: IntoIter::from_entries(entries),
        }
    }
}

impl<K, V> IntoValues<K, V> {
    pub(crate) fn from_entries(entries: alloc::vec::Vec<(K, V)>) -> Self {
        IntoValues {
            inner: IntoIter::from_entries(entries),
        }
    }
}

impl<'a, K, V> Cursor<'a, K, V> {
    pub(crate) fn over(raw: &'a RawRankedTree<K, V>, pos: Option<Pos>) -> Self {
        Cursor { tree: raw, pos }
    }
}

impl<'a, K, V> CursorMut<'a, K, V> {
    pub(crate) fn over(raw: &'a mut RawRankedTree<K, V>, pos: Option<Pos>) -> Self {
        CursorMut { tree: raw, pos }
    }
}

/// Forward step shared by the borrowing iterators; returns the yielded
/// position.
fn step_front<K, V>(tree: &RawRankedTree<K, V>, front: &mut Option<Pos>) -> Pos {
    let pos = front.expect("iterator front out of sync with remaining count");
    *front = tree.advance_pos(Some(pos), 1);
    pos
}

/// Backward step shared by the borrowing iterators; returns the yielded
/// position.
fn step_back<K, V>(tree: &RawRankedTree<K, V>, back: &mut Option<Pos>) -> Pos {
    let pos = back.expect("iterator back out of sync with remaining count");
    *back = tree.advance_pos(Some(pos), -1);
    pos
}

impl<'a, K: 'a, V: 'a> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }

        // SAFETY: When remaining > 0, self.tree is a valid pointer obtained
        // from a live reference in iter()/range().
        let tree = unsafe { &*self.tree };
        let (leaf, index) = step_front(tree, &mut self.front);
        self.remaining -= 1;

        let leaf = tree.node(leaf).as_leaf();
        Some((leaf.key(index), tree.value(leaf.value(index))))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<'a, K: 'a, V: 'a> DoubleEndedIterator for Iter<'a, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }

        // SAFETY: When remaining > 0, self.tree is a valid pointer.
        let tree = unsafe { &*self.tree };
        let (leaf, index) = step_back(tree, &mut self.back);
        self.remaining -= 1;

        let leaf = tree.node(leaf).as_leaf();
        Some((leaf.key(index), tree.value(leaf.value(index))))
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {
    fn len(&self) -> usize {
        self.remaining
    }
}

impl<K, V> FusedIterator for Iter<'_, K, V> {}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for Iter<'_, K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Iter").field("remaining", &self.remaining).finish()
    }
}

impl<'a, K: 'a, V: 'a> Default for Iter<'a, K, V> {
    /// Creates an empty `ranked_map::Iter`.
    ///
    /// ```
    /// # use ranked_btree::ranked_map;
    /// let iter: ranked_map::Iter<'_, u8, u8> = Default::default();
    /// assert_eq!(iter.len(), 0);
    /// ```
    fn default() -> Self {
        Iter {
            // SAFETY: the pointer is never dereferenced while remaining == 0.
            tree: core::ptr::NonNull::dangling().as_ptr(),
            front: None,
            back: None,
            remaining: 0,
            _marker: PhantomData,
        }
    }
}

impl<K, V> Clone for Iter<'_, K, V> {
    fn clone(&self) -> Self {
        Iter {
            tree: self.tree,
            front: self.front,
            back: self.back,
            remaining: self.remaining,
            _marker: PhantomData,
        }
    }
}

impl<'a, K, V> Iterator for IterMut<'a, K, V> {
    type Item = (&'a K, &'a mut V);

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let (leaf, index) = self.front.expect("iterator front out of sync with remaining count");

        // SAFETY: We have exclusive access to the tree through the raw
        // pointer, traverse in order, and never visit an element twice. Keys
        // live in the nodes arena and values in the values arena, which are
        // accessed through separate raw-pointer projections; no reference to
        // the whole tree is created while handed-out values are live.
        unsafe {
            self.front = RawRankedTree::step_pos_ptr(self.tree, (leaf, index), true);
            self.remaining -= 1;

            let leaf = RawRankedTree::node_ptr(self.tree, leaf).as_leaf();
            let value = RawRankedTree::value_mut_ptr(self.tree, leaf.value(index));
            Some((leaf.key(index), value))
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> DoubleEndedIterator for IterMut<'_, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let (leaf, index) = self.back.expect("iterator back out of sync with remaining count");

        // SAFETY: Same as in next(); elements are visited at most once.
        unsafe {
            self.back = RawRankedTree::step_pos_ptr(self.tree, (leaf, index), false);
            self.remaining -= 1;

            let leaf = RawRankedTree::node_ptr(self.tree, leaf).as_leaf();
            let value = RawRankedTree::value_mut_ptr(self.tree, leaf.value(index));
            Some((leaf.key(index), value))
        }
    }
}

impl<K, V> ExactSizeIterator for IterMut<'_, K, V> {
    fn len(&self) -> usize {
        self.remaining
    }
}

impl<K, V> FusedIterator for IterMut<'_, K, V> {}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for IterMut<'_, K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IterMut").field("remaining", &self.remaining).finish()
    }
}

impl<'a, K: 'a, V: 'a> Default for IterMut<'a, K, V> {
    /// Creates an empty `ranked_map::IterMut`.
    ///
    /// ```
    /// # use ranked_btree::ranked_map;
    /// let iter: ranked_map::IterMut<'_, u8, u8> = Default::default();
    /// assert_eq!(iter.len(), 0);
    /// ```
    fn default() -> Self {
        IterMut {
            tree: core::ptr::null_mut(),
            front: None,
            back: None,
            remaining: 0,
            _marker: PhantomData,
        }
    }
}

impl<K, V> Iterator for IntoIter<K, V> {
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> DoubleEndedIterator for IntoIter<K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back()
    }
}

impl<K, V> ExactSizeIterator for IntoIter<K, V> {
    fn len(&self) -> usize {
        self.inner.len()
    }
}

impl<K, V> FusedIterator for IntoIter<K, V> {}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for IntoIter<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IntoIter").field("len", &self.inner.len()).finish()
    }
}

impl<K, V> Default for IntoIter<K, V> {
    fn default() -> Self {
        IntoIter {
            inner: alloc::vec::Vec::new().into_iter(),
        }
    }
}

impl<'a, K, V> Iterator for Keys<'a, K, V> {
    type Item = &'a K;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(k, _)| k)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> DoubleEndedIterator for Keys<'_, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back().map(|(k, _)| k)
    }
}

impl<K, V> ExactSizeIterator for Keys<'_, K, V> {
    fn len(&self) -> usize {
        self.inner.len()
    }
}

impl<K, V> FusedIterator for Keys<'_, K, V> {}

impl<K: fmt::Debug, V> fmt::Debug for Keys<'_, K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Keys").field("remaining", &self.inner.remaining).finish()
    }
}

impl<K, V> Clone for Keys<'_, K, V> {
    fn clone(&self) -> Self {
        Keys {
            inner: self.inner.clone(),
        }
    }
}

impl<'a, K, V> Iterator for Values<'a, K, V> {
    type Item = &'a V;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(_, v)| v)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> DoubleEndedIterator for Values<'_, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back().map(|(_, v)| v)
    }
}

impl<K, V> ExactSizeIterator for Values<'_, K, V> {
    fn len(&self) -> usize {
        self.inner.len()
    }
}

impl<K, V> FusedIterator for Values<'_, K, V> {}

impl<K, V> Clone for Values<'_, K, V> {
    fn clone(&self) -> Self {
        Values {
            inner: self.inner.clone(),
        }
    }
}

impl<K, V: fmt::Debug> fmt::Debug for Values<'_, K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Values").field("remaining", &self.inner.remaining).finish()
    }
}

impl<'a, K, V> Iterator for ValuesMut<'a, K, V> {
    type Item = &'a mut V;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(_, v)| v)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> DoubleEndedIterator for ValuesMut<'_, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back().map(|(_, v)| v)
    }
}

impl<K, V> ExactSizeIterator for ValuesMut<'_, K, V> {
    fn len(&self) -> usize {
        self.inner.len()
    }
}

impl<K, V> FusedIterator for ValuesMut<'_, K, V> {}

impl<K, V: fmt::Debug> fmt::Debug for ValuesMut<'_, K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValuesMut").field("remaining", &self.inner.remaining).finish()
    }
}

impl<K, V> Iterator for IntoKeys<K, V> {
    type Item = K;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(k, _)| k)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> DoubleEndedIterator for IntoKeys<K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back().map(|(k, _)| k)
    }
}

impl<K, V> ExactSizeIterator for IntoKeys<K, V> {
    fn len(&self) -> usize {
        self.inner.len()
    }
}

impl<K, V> FusedIterator for IntoKeys<K, V> {}

impl<K: fmt::Debug, V> fmt::Debug for IntoKeys<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IntoKeys").field("len", &self.inner.len()).finish()
    }
}

impl<K, V> Iterator for IntoValues<K, V> {
    type Item = V;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(_, v)| v)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> DoubleEndedIterator for IntoValues<K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back().map(|(_, v)| v)
    }
}

impl<K, V> ExactSizeIterator for IntoValues<K, V> {
    fn len(&self) -> usize {
        self.inner.len()
    }
}

impl<K, V> FusedIterator for IntoValues<K, V> {}

impl<K, V: fmt::Debug> fmt::Debug for IntoValues<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IntoValues").field("len", &self.inner.len()).finish()
    }
}

impl<'a, K: 'a, V: 'a> Iterator for Range<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }

        // SAFETY: When remaining > 0, self.tree is a valid pointer.
        let tree = unsafe { &*self.tree };
        let (leaf, index) = step_front(tree, &mut self.front);
        self.remaining -= 1;

        let leaf = tree.node(leaf).as_leaf();
        Some((leaf.key(index), tree.value(leaf.value(index))))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> DoubleEndedIterator for Range<'_, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }

        // SAFETY: When remaining > 0, self.tree is a valid pointer.
        let tree = unsafe { &*self.tree };
        let (leaf, index) = step_back(tree, &mut self.back);
        self.remaining -= 1;

        let leaf = tree.node(leaf).as_leaf();
        Some((leaf.key(index), tree.value(leaf.value(index))))
    }
}

impl<K, V> ExactSizeIterator for Range<'_, K, V> {
    fn len(&self) -> usize {
        self.remaining
    }
}

impl<K, V> FusedIterator for Range<'_, K, V> {}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for Range<'_, K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Range").field("remaining", &self.remaining).finish()
    }
}

impl<K, V> Clone for Range<'_, K, V> {
    fn clone(&self) -> Self {
        Range {
            tree: self.tree,
            front: self.front,
            back: self.back,
            remaining: self.remaining,
            _marker: PhantomData,
        }
    }
}

impl<'a, K: 'a, V: 'a> Default for Range<'a, K, V> {
    /// Creates an empty `ranked_map::Range`.
    ///
    /// ```
    /// # use ranked_btree::ranked_map;
    /// let range: ranked_map::Range<'_, u8, u8> = Default::default();
    /// assert_eq!(range.count(), 0);
    /// ```
    fn default() -> Self {
        Range {
            // SAFETY: the pointer is never dereferenced while remaining == 0.
            tree: core::ptr::NonNull::dangling().as_ptr(),
            front: None,
            back: None,
            remaining: 0,
            _marker: PhantomData,
        }
    }
}

impl<'a, K, V> Iterator for RangeMut<'a, K, V> {
    type Item = (&'a K, &'a mut V);

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let (leaf, index) = self.front.expect("iterator front out of sync with remaining count");

        // SAFETY: Exclusive access through the raw pointer; each element is
        // visited at most once; keys and values live in disjoint arenas and no
        // whole-tree reference is created.
        unsafe {
            self.front = RawRankedTree::step_pos_ptr(self.tree, (leaf, index), true);
            self.remaining -= 1;

            let leaf = RawRankedTree::node_ptr(self.tree, leaf).as_leaf();
            let value = RawRankedTree::value_mut_ptr(self.tree, leaf.value(index));
            Some((leaf.key(index), value))
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> DoubleEndedIterator for RangeMut<'_, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let (leaf, index) = self.back.expect("iterator back out of sync with remaining count");

        // SAFETY: Same as in next().
        unsafe {
            self.back = RawRankedTree::step_pos_ptr(self.tree, (leaf, index), false);
            self.remaining -= 1;

            let leaf = RawRankedTree::node_ptr(self.tree, leaf).as_leaf();
            let value = RawRankedTree::value_mut_ptr(self.tree, leaf.value(index));
            Some((leaf.key(index), value))
        }
    }
}

impl<K, V> ExactSizeIterator for RangeMut<'_, K, V> {
    fn len(&self) -> usize {
        self.remaining
    }
}

impl<K, V> FusedIterator for RangeMut<'_, K, V> {}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for RangeMut<'_, K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RangeMut").field("remaining", &self.remaining).finish()
    }
}

impl<K, V> Default for RangeMut<'_, K, V> {
    fn default() -> Self {
        RangeMut {
            tree: core::ptr::null_mut(),
            front: None,
            back: None,
            remaining: 0,
            _marker: PhantomData,
        }
    }
}

// ─── Trait implementations on the map itself ─────────────────────────────────

impl<'a, K, V> IntoIterator for &'a RankedMap<K, V> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Iter<'a, K, V> {
        self.iter()
    }
}

impl<'a, K, V> IntoIterator for &'a mut RankedMap<K, V> {
    type Item = (&'a K, &'a mut V);
    type IntoIter = IterMut<'a, K, V>;

    fn into_iter(self) -> IterMut<'a, K, V> {
        self.iter_mut()
    }
}

impl<K, V> IntoIterator for RankedMap<K, V> {
    type Item = (K, V);
    type IntoIter = IntoIter<K, V>;

    /// Gets an owning iterator over the entries of the map, sorted by key.
    fn into_iter(mut self) -> IntoIter<K, V> {
        IntoIter::from_entries(self.raw.drain_to_vec())
    }
}

impl<K: Clone + Ord, V> FromIterator<(K, V)> for RankedMap<K, V> {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> RankedMap<K, V> {
        let mut map = RankedMap::new();
        map.extend(iter);
        map
    }
}

impl<K: Clone + Ord, V> Extend<(K, V)> for RankedMap<K, V> {
    fn extend<T: IntoIterator<Item = (K, V)>>(&mut self, iter: T) {
        for (key, value) in iter {
            self.insert(key, value);
        }
    }
}

impl<'a, K: Clone + Ord + Copy, V: Copy> Extend<(&'a K, &'a V)> for RankedMap<K, V> {
    fn extend<T: IntoIterator<Item = (&'a K, &'a V)>>(&mut self, iter: T) {
        self.extend(iter.into_iter().map(|(&k, &v)| (k, v)));
    }
}

impl<K: Clone + Ord, V, const N: usize> From<[(K, V); N]> for RankedMap<K, V> {
    fn from(arr: [(K, V); N]) -> Self {
        arr.into_iter().collect()
    }
}

impl<K, Q, V> Index<&Q> for RankedMap<K, V>
where
    K: Borrow<Q> + Clone + Ord,
    Q: ?Sized + Ord,
{
    type Output = V;

    fn index(&self, key: &Q) -> &V {
        self.get(key).expect("no entry found for key")
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for RankedMap<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K: Clone, V: Clone> Clone for RankedMap<K, V> {
    fn clone(&self) -> Self {
        RankedMap {
            raw: self.raw.clone(),
        }
    }
}

impl<K, V> Default for RankedMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: PartialEq, V: PartialEq> PartialEq for RankedMap<K, V> {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().zip(other.iter()).all(|(a, b)| a == b)
    }
}

impl<K: Eq, V: Eq> Eq for RankedMap<K, V> {}

impl<K: PartialOrd, V: PartialOrd> PartialOrd for RankedMap<K, V> {
    fn partial_cmp(&self, other: &Self) -> Option<core::cmp::Ordering> {
        self.iter().partial_cmp(other.iter())
    }
}

impl<K: Ord, V: Ord> Ord for RankedMap<K, V> {
    fn cmp(&self, other: &Self) -> core::cmp::Ordering {
        self.iter().cmp(other.iter())
    }
}

impl<K: Hash, V: Hash> Hash for RankedMap<K, V> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_usize(self.len());
        for entry in self {
            entry.hash(state);
        }
    }
}
