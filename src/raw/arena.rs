use alloc::vec::Vec;

use super::handle::Handle;

/// Fixed-size-block allocator for tree nodes and values.
///
/// Every slot is one block; blocks holding `Node` are sized so either node
/// variant fits. Freed blocks go on a free list and are handed out again
/// before the slot vector grows, so handles stay dense under churn.
#[derive(Clone)]
pub(crate) struct BlockArena<T> {
    blocks: Vec<Option<T>>,
    free: Vec<Handle>,
}

impl<T> BlockArena<T> {
    pub(crate) const fn new() -> Self {
        Self {
            blocks: Vec::new(),
            free: Vec::new(),
        }
    }

    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            blocks: Vec::with_capacity(capacity),
            free: Vec::new(),
        }
    }

    pub(crate) fn capacity(&self) -> usize {
        self.blocks.capacity()
    }

    pub(crate) const fn len(&self) -> usize {
        self.blocks.len().saturating_sub(self.free.len())
    }

    /// Allocates a block, preferring the free list.
    ///
    /// # Panics
    ///
    /// Panics when the arena already holds `Handle::MAX` blocks. The check
    /// runs before any slot is touched, so a failed allocation leaves the
    /// arena unchanged.
    pub(crate) fn alloc(&mut self, element: T) -> Handle {
        if let Some(handle) = self.free.pop() {
            self.blocks[handle.to_index()] = Some(element);
            return handle;
        }
        assert!(
            self.blocks.len() < Handle::MAX,
            "`BlockArena::alloc()` - arena is at maximum capacity ({})",
            Handle::MAX
        );
        self.blocks.push(Some(element));
        Handle::from_index(self.blocks.len() - 1)
    }

    #[inline]
    pub(crate) fn get(&self, handle: Handle) -> &T {
        self.blocks[handle.to_index()].as_ref().expect("`BlockArena::get()` - `handle` is invalid!")
    }

    /// Returns a reference to an element by handle from a raw pointer.
    ///
    /// # Safety
    /// - `ptr` must point to a valid, allocated `BlockArena<T>`.
    #[inline]
    pub(crate) unsafe fn get_ptr<'a>(ptr: *const Self, handle: Handle) -> &'a T {
        // SAFETY: Caller guarantees ptr is valid. Only the blocks field is read;
        // the explicit reference is intentional to index into the Vec.
        unsafe {
            (&(*ptr).blocks)[handle.to_index()].as_ref().expect("`BlockArena::get_ptr()` - `handle` is invalid!")
        }
    }

    #[inline]
    pub(crate) fn get_mut(&mut self, handle: Handle) -> &mut T {
        self.blocks[handle.to_index()].as_mut().expect("`BlockArena::get_mut()` - `handle` is invalid!")
    }

    /// Moves the element out and recycles its block.
    pub(crate) fn take(&mut self, handle: Handle) -> T {
        let element =
            self.blocks[handle.to_index()].take().expect("`BlockArena::take()` - `handle` is invalid!");
        self.free.push(handle);
        element
    }

    pub(crate) fn free(&mut self, handle: Handle) {
        drop(self.take(handle));
    }

    pub(crate) fn clear(&mut self) {
        self.blocks.clear();
        self.free.clear();
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[derive(Clone, Debug)]
    enum Op {
        Alloc(u32),
        Mutate(usize, u32),
        Take(usize),
        Free(usize),
        Clear,
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            20 => any::<u32>().prop_map(Op::Alloc),
            6 => (any::<usize>(), any::<u32>()).prop_map(|(slot, value)| Op::Mutate(slot, value)),
            5 => any::<usize>().prop_map(Op::Take),
            5 => any::<usize>().prop_map(Op::Free),
            1 => Just(Op::Clear),
        ]
    }

    proptest! {
        /// Replays random alloc/take/free traffic against a shadow list of live
        /// (handle, value) pairs; handle reuse must never alias a live element.
        #[test]
        fn arena_matches_shadow_model(ops in prop::collection::vec(op_strategy(), 0..256)) {
            let mut live: Vec<(Handle, u32)> = Vec::new();
            let mut arena: BlockArena<u32> = BlockArena::new();

            for op in ops {
                match op {
                    Op::Alloc(value) => {
                        live.push((arena.alloc(value), value));
                    }
                    Op::Mutate(slot, value) => {
                        if live.is_empty() {
                            continue;
                        }
                        let slot = slot % live.len();
                        *arena.get_mut(live[slot].0) = value;
                        live[slot].1 = value;
                    }
                    Op::Take(slot) => {
                        if live.is_empty() {
                            continue;
                        }
                        let slot = slot % live.len();
                        let taken = arena.take(live[slot].0);
                        let (_, expected) = live.swap_remove(slot);
                        prop_assert_eq!(taken, expected);
                    }
                    Op::Free(slot) => {
                        if live.is_empty() {
                            continue;
                        }
                        let slot = slot % live.len();
                        arena.free(live[slot].0);
                        live.swap_remove(slot);
                    }
                    Op::Clear => {
                        arena.clear();
                        live.clear();
                    }
                }

                prop_assert_eq!(arena.len(), live.len());
                for &(handle, value) in &live {
                    prop_assert_eq!(*arena.get(handle), value);
                }
            }
        }
    }

    #[test]
    fn with_capacity_preallocates() {
        let arena: BlockArena<u8> = BlockArena::with_capacity(16);
        assert!(arena.capacity() >= 16);
        assert_eq!(arena.len(), 0);
    }

    #[test]
    fn freed_blocks_are_reused() {
        let mut arena: BlockArena<u32> = BlockArena::new();
        let a = arena.alloc(1);
        let b = arena.alloc(2);
        arena.free(a);
        let c = arena.alloc(3);
        assert_eq!(c, a);
        assert_eq!(*arena.get(b), 2);
        assert_eq!(*arena.get(c), 3);
    }
}
