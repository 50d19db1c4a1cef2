use std::cell::UnsafeCell;

/// Fixed set of reusable frame buffers shared by the capture and render
/// threads.
///
/// The pool does no synchronization of its own. Who may touch which slot is
/// decided entirely by the index hand-off in [`crate::core::pipeline`]; the
/// channel's release/acquire pair is what makes a producer's writes visible to
/// the consumer.
pub struct FrameSlotPool<F> {
    slots: Box<[UnsafeCell<F>]>,
}

// Slots are only reached through `slot_at`, whose callers uphold the
// single-writer-per-slot rule.
unsafe impl<F: Send> Sync for FrameSlotPool<F> {}
unsafe impl<F: Send> Send for FrameSlotPool<F> {}

impl<F> FrameSlotPool<F> {
    /// Allocates `size` slots up front; the pool never grows or shrinks.
    pub fn new(size: usize, mut make: impl FnMut(usize) -> F) -> Self {
        let slots = (0..size)
            .map(|index| UnsafeCell::new(make(index)))
            .collect::<Vec<_>>()
            .into_boxed_slice();
        Self { slots }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Constant-time access to slot `index`.
    ///
    /// # Safety
    ///
    /// `index < self.len()`, and for as long as the returned reference lives no
    /// other reference to the same slot may exist on any thread.
    #[allow(clippy::mut_from_ref)]
    pub unsafe fn slot_at(&self, index: usize) -> &mut F {
        debug_assert!(index < self.slots.len());
        &mut *self.slots.get_unchecked(index).get()
    }

    /// Consumes the pool and returns the frames, in slot order.
    #[allow(dead_code)]
    pub fn into_frames(self) -> Vec<F> {
        self.slots
            .into_vec()
            .into_iter()
            .map(UnsafeCell::into_inner)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slots_are_built_in_order() {
        let pool = FrameSlotPool::new(4, |i| vec![i as u8; 3]);
        assert_eq!(pool.len(), 4);
        let frames = pool.into_frames();
        assert_eq!(frames[0], vec![0, 0, 0]);
        assert_eq!(frames[3], vec![3, 3, 3]);
    }

    #[test]
    fn test_slot_writes_persist() {
        let pool = FrameSlotPool::new(3, |_| 0u32);
        unsafe {
            *pool.slot_at(1) = 42;
            assert_eq!(*pool.slot_at(1), 42);
            assert_eq!(*pool.slot_at(0), 0);
        }
    }
}
