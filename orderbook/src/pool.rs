//! Pre-allocated slab pool with an embedded singly-linked free list.
//!
//! The matching engine runs on a single cooperative thread (spec's
//! concurrency model), so the pool needs no atomics: it is a plain `Vec<T>`
//! sized at construction, never reallocated, with free slots threaded
//! through a `next_free` field supplied by the caller's `Slot` trait.

/// A slot storable in a [`Pool`]. `next_free`/`set_next_free` let the pool
/// thread the free list through the slot's own storage instead of keeping a
/// parallel free-list array, mirroring the C++ pool's reuse of a single
/// intrusive link field for both live and free state.
pub trait Slot: Default {
    /// Read the free-list successor, `None` at the list tail.
    fn next_free(&self) -> Option<u32>;
    /// Overwrite the free-list successor.
    fn set_next_free(&mut self, next: Option<u32>);
}

/// Fixed-capacity slab allocator. `allocate` never allocates after
/// construction; it only ever fails by returning `None` when the free list
/// is empty, which callers surface as `CoreError::PoolExhausted`.
#[derive(Debug)]
pub struct Pool<T> {
    slots: Vec<T>,
    free_head: Option<u32>,
    allocated: u32,
}

impl<T: Slot> Pool<T> {
    /// Build a pool with `capacity` pre-allocated, linked-free slots.
    #[must_use]
    pub fn new(capacity: u32) -> Self {
        let mut slots = Vec::with_capacity(capacity as usize);
        for i in 0..capacity {
            let mut slot = T::default();
            let next = if i + 1 < capacity { Some(i + 1) } else { None };
            slot.set_next_free(next);
            slots.push(slot);
        }
        let free_head = if capacity == 0 { None } else { Some(0) };
        Self {
            slots,
            free_head,
            allocated: 0,
        }
    }

    /// Total slot capacity.
    #[must_use]
    pub fn capacity(&self) -> u32 {
        self.slots.len() as u32
    }

    /// Number of slots currently in use.
    #[must_use]
    pub fn allocated(&self) -> u32 {
        self.allocated
    }

    /// Number of free slots remaining.
    #[must_use]
    pub fn free_count(&self) -> u32 {
        self.capacity() - self.allocated
    }

    /// Pop a slot off the free list and overwrite it with `value`, returning
    /// its index. `None` if the pool is exhausted.
    pub fn allocate(&mut self, value: T) -> Option<u32> {
        let index = self.free_head?;
        self.free_head = self.slots[index as usize].next_free();
        self.slots[index as usize] = value;
        self.allocated += 1;
        Some(index)
    }

    /// Return a slot to the free list, resetting it to `T::default()`.
    pub fn deallocate(&mut self, index: u32) {
        let mut slot = T::default();
        slot.set_next_free(self.free_head);
        self.slots[index as usize] = slot;
        self.free_head = Some(index);
        self.allocated = self.allocated.saturating_sub(1);
    }

    /// Borrow a live slot.
    #[must_use]
    pub fn get(&self, index: u32) -> &T {
        &self.slots[index as usize]
    }

    /// Mutably borrow a live slot.
    #[must_use]
    pub fn get_mut(&mut self, index: u32) -> &mut T {
        &mut self.slots[index as usize]
    }
}
