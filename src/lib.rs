//! Ranked B+tree collections for Rust.
//!
//! This crate provides ordered associative containers built on a B+tree whose
//! internal nodes cache subtree element counts. On top of the usual ordered-map
//! operations, every container supports O(log n) *positional* access:
//!
//! - [`get_by_rank`](RankedMap::get_by_rank) - the element at a given sorted position
//! - [`rank`](RankedMap::rank) - the number of elements strictly below a key
//! - [`slice`](RankedMap::slice) - a sub-range addressed by (possibly negative) positions
//! - [`cursor_at`](RankedMap::cursor_at) - a cursor that can step, seek, and jump by offsets
//!
//! Four flavors share one tree engine:
//!
//! - [`RankedMap`] - unique keys, key to value
//! - [`RankedSet`] - unique keys only
//! - [`RankedMultiMap`] - duplicate keys allowed, key to value
//! - [`RankedMultiSet`] - duplicate keys allowed, keys only
//!
//! # Example
//!
//! ```
//! use ranked_btree::RankedMap;
//!
//! let mut scores = RankedMap::new();
//! scores.insert("Alice", 100);
//! scores.insert("Bob", 85);
//! scores.insert("Carol", 92);
//!
//! // Standard ordered-map operations.
//! assert_eq!(scores.get(&"Bob"), Some(&85));
//! assert_eq!(scores.len(), 3);
//!
//! // Positional operations, all O(log n).
//! let (name, score) = scores.get_by_rank(1).unwrap();
//! assert_eq!((*name, *score), ("Bob", 85));
//! assert_eq!(scores.rank(&"Carol"), 2);
//!
//! // Cursors step and jump in both directions.
//! let mut cur = scores.cursor_at(0);
//! cur.advance(2);
//! assert_eq!(cur.key(), Some(&"Carol"));
//! ```
//!
//! # Implementation
//!
//! All elements live in leaves that form a doubly-linked chain, so ordered
//! iteration never re-descends the tree. Internal nodes store separator keys
//! (each separator is the *maximum* key of the child to its left) together with
//! cached child subtree sizes; positional lookups descend by subtracting child
//! sizes, and a position's rank is recovered by walking parent links back to
//! the root. Nodes are allocated from a slot arena whose fixed-size blocks hold
//! either node variant, and are addressed by niche-optimized handles instead of
//! pointers, which keeps the containers trivially movable and swappable.
//!
//! The crate is `no_std` compatible and only requires `alloc`.

#![no_std]
// These forbid rules and lint groups are meant to be very restrictive.
// NOTE: A small amount of unsafe is required for the mutable iterators; every
// block carries a SAFETY comment.
#![forbid(keyword_idents)]
#![forbid(non_ascii_idents)]
#![forbid(unreachable_pub)]
#![warn(clippy::all)]
#![warn(clippy::cargo)]
#![warn(clippy::pedantic)]
// Enable coverage attributes for nightly builds.
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

extern crate alloc;

mod rank;
mod raw;

pub mod ranked_map;
pub mod ranked_multimap;
pub mod ranked_multiset;
pub mod ranked_set;

pub use rank::Rank;
pub use ranked_map::RankedMap;
pub use ranked_multimap::RankedMultiMap;
pub use ranked_multiset::RankedMultiSet;
pub use ranked_set::RankedSet;
