//! # Slot Allocator
//!
//! Fixed-capacity index pool backing every GPU instance buffer.

/// Fixed-capacity pool of `u32` slot indices.
///
/// `acquire` pops the free list, `release` pushes back. The in-use set is
/// tracked in a bitfield so that the free list and the in-use set stay
/// disjoint even if a caller releases the same index twice.
///
/// # Thread Safety
///
/// Not thread-safe. Each buffer owns its allocator.
#[derive(Debug, Clone)]
pub struct SlotAllocator {
    /// Free indices. The top of the stack is handed out next.
    free_list: Vec<u32>,
    /// One bit per slot, set while the slot is in use.
    in_use: Vec<u64>,
    /// Total capacity.
    capacity: u32,
}

impl SlotAllocator {
    /// Creates an allocator with `capacity` slots, all free.
    ///
    /// A zero capacity is allowed; such an allocator is always exhausted.
    #[must_use]
    pub fn new(capacity: u32) -> Self {
        // Reversed so the lowest index is popped first.
        let free_list: Vec<u32> = (0..capacity).rev().collect();
        let words = (capacity as usize).div_ceil(64);

        Self {
            free_list,
            in_use: vec![0; words],
            capacity,
        }
    }

    /// Returns the total capacity.
    #[inline]
    #[must_use]
    pub const fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Returns the number of slots currently handed out.
    #[inline]
    #[must_use]
    pub fn allocated_count(&self) -> u32 {
        self.capacity - self.free_count()
    }

    /// Returns the number of free slots.
    #[inline]
    #[must_use]
    pub fn free_count(&self) -> u32 {
        // free_list.len() <= capacity, which is a u32.
        u32::try_from(self.free_list.len()).unwrap_or(u32::MAX)
    }

    /// True when no slot is available.
    #[inline]
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.free_list.is_empty()
    }

    /// Takes a free slot.
    ///
    /// Returns `None` when the allocator is exhausted. That is not an error;
    /// the caller renders nothing for the entity this tick.
    pub fn acquire(&mut self) -> Option<u32> {
        let index = self.free_list.pop()?;
        self.set_bit(index, true);
        Some(index)
    }

    /// Returns a slot to the free list.
    ///
    /// The caller is expected to have written an invisible transform for the
    /// slot first. Returns `false` (and does nothing) if the index is out of
    /// range or not currently in use.
    pub fn release(&mut self, index: u32) -> bool {
        if !self.is_in_use(index) {
            return false;
        }
        self.set_bit(index, false);
        self.free_list.push(index);
        true
    }

    /// Whether `index` is currently handed out.
    #[inline]
    #[must_use]
    pub fn is_in_use(&self, index: u32) -> bool {
        if index >= self.capacity {
            return false;
        }
        let (word, bit) = Self::locate(index);
        self.in_use[word] & (1 << bit) != 0
    }

    /// Releases every slot.
    pub fn clear(&mut self) {
        self.in_use.iter_mut().for_each(|word| *word = 0);
        self.free_list.clear();
        self.free_list.extend((0..self.capacity).rev());
    }

    /// Iterates over in-use indices in ascending order.
    pub fn iter_in_use(&self) -> impl Iterator<Item = u32> + '_ {
        (0..self.capacity).filter(move |&index| self.is_in_use(index))
    }

    #[inline]
    const fn locate(index: u32) -> (usize, u32) {
        ((index / 64) as usize, index % 64)
    }

    fn set_bit(&mut self, index: u32, value: bool) {
        let (word, bit) = Self::locate(index);
        if value {
            self.in_use[word] |= 1 << bit;
        } else {
            self.in_use[word] &= !(1 << bit);
        }
    }
}
