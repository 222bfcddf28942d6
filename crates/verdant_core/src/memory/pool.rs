//! # Object Pool
//!
//! Fixed-capacity storage for owned objects that are checked in and out.

/// A pool of owned objects with a hard capacity.
///
/// Values live in pre-allocated slots; handles are plain indices. The
/// detailed renderer pool keeps its active handles here, so the pool's
/// capacity is the hard cap on simultaneously active detailed renderers.
///
/// # Example
///
/// ```rust
/// use verdant_core::PoolAllocator;
///
/// let mut pool: PoolAllocator<&str> = PoolAllocator::new(1);
/// let handle = pool.allocate("mesh").unwrap();
/// assert!(pool.allocate("other").is_err());
/// assert_eq!(pool.free(handle), Some("mesh"));
/// ```
pub struct PoolAllocator<T> {
    /// One entry per slot; `None` while free.
    slots: Box<[Option<T>]>,
    /// Free slot indices, lowest on top.
    vacant: Vec<usize>,
}

/// Slot of an object checked into a [`PoolAllocator`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PoolHandle {
    index: usize,
}

impl PoolHandle {
    /// Raw slot index.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.index
    }
}

impl<T> PoolAllocator<T> {
    /// Reserves `capacity` empty slots.
    ///
    /// A zero capacity is allowed and rejects every allocation.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: std::iter::repeat_with(|| None).take(capacity).collect(),
            vacant: (0..capacity).rev().collect(),
        }
    }

    /// Slot count.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Occupied slots.
    #[inline]
    #[must_use]
    pub fn allocated_count(&self) -> usize {
        self.capacity() - self.vacant.len()
    }

    /// Vacant slots.
    #[inline]
    #[must_use]
    pub fn free_count(&self) -> usize {
        self.vacant.len()
    }

    /// True when every slot is occupied.
    #[inline]
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.vacant.is_empty()
    }

    /// Stores `value` in a free slot.
    ///
    /// # Errors
    ///
    /// Gives the value back when the pool is full so the caller can recycle
    /// it instead of losing it.
    pub fn allocate(&mut self, value: T) -> Result<PoolHandle, T> {
        match self.vacant.pop() {
            Some(index) => {
                self.slots[index] = Some(value);
                Ok(PoolHandle { index })
            }
            None => Err(value),
        }
    }

    /// Removes and returns the object behind `handle`.
    ///
    /// Returns `None` for a handle that is out of range or already freed.
    pub fn free(&mut self, handle: PoolHandle) -> Option<T> {
        let value = self.slots.get_mut(handle.index).and_then(Option::take)?;
        self.vacant.push(handle.index);
        Some(value)
    }

    /// Object behind `handle`, if occupied.
    #[inline]
    #[must_use]
    pub fn get(&self, handle: PoolHandle) -> Option<&T> {
        self.slots.get(handle.index).and_then(Option::as_ref)
    }

    /// Mutable object behind `handle`, if occupied.
    #[inline]
    pub fn get_mut(&mut self, handle: PoolHandle) -> Option<&mut T> {
        self.slots.get_mut(handle.index).and_then(Option::as_mut)
    }

    /// Occupied slots in index order.
    pub fn iter(&self) -> impl Iterator<Item = (PoolHandle, &T)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(index, value)| Some((PoolHandle { index }, value.as_ref()?)))
    }

    /// Occupied slots in index order, mutably.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (PoolHandle, &mut T)> {
        self.slots
            .iter_mut()
            .enumerate()
            .filter_map(|(index, value)| Some((PoolHandle { index }, value.as_mut()?)))
    }
}
