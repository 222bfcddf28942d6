//! Fixed-capacity CPU staging for one GPU instance buffer.
//!
//! Slots are written in place. Writes widen a single dirty range which the
//! flush phase hands to the uploader once per frame.

use std::ops::Range;

use super::instance_data::ProxyInstance;

/// Staging copy of a GPU instance buffer.
///
/// Allocated once at full capacity; every slot starts hidden.
pub struct InstanceBuffer {
    /// Debug label, also used for the GPU buffer.
    label: &'static str,
    /// CPU-side contents, one entry per slot.
    staging: Box<[ProxyInstance]>,
    /// Slots written since the last flush.
    dirty: Option<Range<u32>>,
}

impl InstanceBuffer {
    /// Creates a buffer with `capacity` hidden slots.
    #[must_use]
    pub fn new(label: &'static str, capacity: u32) -> Self {
        Self {
            label,
            staging: vec![ProxyInstance::HIDDEN; capacity as usize].into_boxed_slice(),
            dirty: None,
        }
    }

    /// Debug label.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        self.label
    }

    /// Number of slots.
    #[must_use]
    pub fn capacity(&self) -> u32 {
        u32::try_from(self.staging.len()).unwrap_or(u32::MAX)
    }

    /// Size of the whole buffer in bytes.
    #[must_use]
    pub fn byte_size(&self) -> u64 {
        (self.staging.len() * ProxyInstance::SIZE) as u64
    }

    /// Writes one slot. Returns `false` if `slot` is out of range.
    #[inline]
    pub fn write(&mut self, slot: u32, instance: ProxyInstance) -> bool {
        let Some(cell) = self.staging.get_mut(slot as usize) else {
            return false;
        };
        *cell = instance;
        self.mark_dirty(slot);
        true
    }

    /// Writes the hidden instance into a slot.
    #[inline]
    pub fn hide(&mut self, slot: u32) -> bool {
        self.write(slot, ProxyInstance::HIDDEN)
    }

    /// Reads one slot.
    #[must_use]
    pub fn get(&self, slot: u32) -> Option<&ProxyInstance> {
        self.staging.get(slot as usize)
    }

    /// Whether anything was written since the last flush.
    #[must_use]
    pub const fn is_dirty(&self) -> bool {
        self.dirty.is_some()
    }

    /// Current dirty slot range, if any.
    #[must_use]
    pub fn dirty_range(&self) -> Option<Range<u32>> {
        self.dirty.clone()
    }

    /// Clears and returns the dirty slot range.
    pub fn take_dirty(&mut self) -> Option<Range<u32>> {
        self.dirty.take()
    }

    /// Bytes for a slot range, with the byte offset of its first slot.
    #[must_use]
    pub fn bytes_for(&self, slots: Range<u32>) -> (u64, &[u8]) {
        let len = self.staging.len();
        let start = (slots.start as usize).min(len);
        let end = (slots.end as usize).clamp(start, len);
        let offset = (start * ProxyInstance::SIZE) as u64;
        (offset, bytemuck::cast_slice(&self.staging[start..end]))
    }

    fn mark_dirty(&mut self, slot: u32) {
        self.dirty = Some(match self.dirty.take() {
            Some(range) => range.start.min(slot)..range.end.max(slot + 1),
            None => slot..slot + 1,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn visible() -> ProxyInstance {
        ProxyInstance {
            position_scale: [1.0, 1.0, 1.0, 1.0],
            ..ProxyInstance::HIDDEN
        }
    }

    #[test]
    fn test_starts_hidden_and_clean() {
        let buffer = InstanceBuffer::new("test", 8);
        assert!(!buffer.is_dirty());
        assert!(buffer.get(7).unwrap().is_hidden());
        assert_eq!(buffer.byte_size(), 8 * 48);
    }

    #[test]
    fn test_dirty_range_widens() {
        let mut buffer = InstanceBuffer::new("test", 16);
        buffer.write(5, visible());
        buffer.write(2, visible());
        buffer.hide(9);
        assert_eq!(buffer.take_dirty(), Some(2..10));
        assert!(!buffer.is_dirty());
    }

    #[test]
    fn test_out_of_range_write_ignored() {
        let mut buffer = InstanceBuffer::new("test", 4);
        assert!(!buffer.write(4, visible()));
        assert!(!buffer.is_dirty());
    }

    #[test]
    fn test_bytes_for_range() {
        let mut buffer = InstanceBuffer::new("test", 4);
        buffer.write(2, visible());
        let range = buffer.take_dirty().unwrap();
        let (offset, bytes) = buffer.bytes_for(range);
        assert_eq!(offset, 2 * 48);
        assert_eq!(bytes.len(), 48);
    }
}
