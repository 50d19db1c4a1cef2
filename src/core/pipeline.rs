use anyhow::{bail, Result};
use std::sync::Arc;

use super::frame_pool::FrameSlotPool;
use super::index_channel::{IndexChannel, IndexConsumer, IndexProducer};
use super::shutdown::ShutdownSignal;
use super::spin::SpinPolicy;
use crate::shared::constants;

/// Next write position, round-robin over `size` slots.
#[inline]
pub fn next_slot(current: usize, size: usize) -> usize {
    (current + 1) % size
}

/// Pool, index channel and shutdown flag for one run, split into the half the
/// capture thread owns and the half the render thread owns.
///
/// Slot ownership follows the channel: a slot whose index sits in the channel
/// (including the head the consumer is currently reading) belongs to the
/// consumer, every other slot belongs to the producer. Because the channel
/// capacity equals the pool size, "channel full" means exactly "the producer's
/// cursor slot is still owned by the consumer".
pub struct FramePipeline<F> {
    pub capture: CaptureSide<F>,
    pub render: RenderSide<F>,
}

impl<F: Send> FramePipeline<F> {
    /// Allocates `pool_size` slots plus one producer-private scratch frame,
    /// all built with `make_frame`.
    pub fn new(
        pool_size: usize,
        mut make_frame: impl FnMut() -> F,
        shutdown: ShutdownSignal,
    ) -> Result<Self> {
        if pool_size < constants::MIN_POOL_SIZE {
            bail!(
                "Pool size must be at least {} (got {})",
                constants::MIN_POOL_SIZE,
                pool_size
            );
        }

        let pool = Arc::new(FrameSlotPool::new(pool_size, |_| make_frame()));
        let (tx, rx) = IndexChannel::with_capacity(pool_size);

        Ok(Self {
            capture: CaptureSide {
                pool: Arc::clone(&pool),
                tx,
                cursor: 0,
                scratch: make_frame(),
                shutdown: shutdown.clone(),
            },
            render: RenderSide {
                pool,
                rx,
                shutdown,
            },
        })
    }
}

/// Producer half: write cursor, channel sender and the scratch frame used to
/// drain the source when every slot is taken.
pub struct CaptureSide<F> {
    pool: Arc<FrameSlotPool<F>>,
    tx: IndexProducer,
    cursor: usize,
    scratch: F,
    shutdown: ShutdownSignal,
}

impl<F> CaptureSide<F> {
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn pool_size(&self) -> usize {
        self.pool.len()
    }

    pub fn shutdown(&self) -> &ShutdownSignal {
        &self.shutdown
    }

    /// The slot under the cursor, or `None` while the consumer still owns it.
    pub fn writable_slot(&mut self) -> Option<&mut F> {
        if self.tx.is_full() {
            return None;
        }
        // Not full: the cursor slot's index is not in the channel, so the
        // consumer has popped it (or never saw it) and holds no reference.
        // `&mut self` keeps this the only producer-side reference.
        Some(unsafe { self.pool.slot_at(self.cursor) })
    }

    /// Frame that is never published; captures written here are dropped.
    pub fn scratch(&mut self) -> &mut F {
        &mut self.scratch
    }

    /// Hands the cursor slot to the consumer and advances the cursor. On a full
    /// channel nothing changes and the rejected index is returned.
    pub fn publish(&mut self) -> Result<usize, usize> {
        let index = self.cursor;
        self.tx.try_push(index)?;
        self.cursor = next_slot(self.cursor, self.tx.capacity());
        Ok(index)
    }

    /// Waits until the cursor slot is free again. Returns `false` if shutdown
    /// was requested first.
    pub fn wait_writable(&mut self, spin: SpinPolicy) -> bool {
        let wait = spin.waiter();
        loop {
            if self.shutdown.is_requested() {
                return false;
            }
            if !self.tx.is_full() {
                return true;
            }
            wait.spin();
        }
    }
}

/// Consumer half: channel receiver plus read access to published slots.
pub struct RenderSide<F> {
    pool: Arc<FrameSlotPool<F>>,
    rx: IndexConsumer,
    shutdown: ShutdownSignal,
}

/// Result of looking at the channel head.
pub enum Ready<'a, F> {
    Frame(ReadySlot<'a, F>),
    /// An index outside the pool was queued; it has already been popped.
    OutOfRange(usize),
}

/// Exclusive access to the frame at the channel head. Dropping it pops the
/// index and returns the slot to the producer.
pub struct ReadySlot<'a, F> {
    index: usize,
    frame: &'a mut F,
    rx: &'a mut IndexConsumer,
}

impl<'a, F> ReadySlot<'a, F> {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn frame(&self) -> &F {
        &*self.frame
    }

    pub fn frame_mut(&mut self) -> &mut F {
        &mut *self.frame
    }
}

impl<'a, F> Drop for ReadySlot<'a, F> {
    fn drop(&mut self) {
        self.rx.pop();
    }
}

impl<F> RenderSide<F> {
    #[cfg(test)]
    pub(crate) fn from_parts(
        pool: Arc<FrameSlotPool<F>>,
        rx: IndexConsumer,
        shutdown: ShutdownSignal,
    ) -> Self {
        Self { pool, rx, shutdown }
    }

    pub fn pool_size(&self) -> usize {
        self.pool.len()
    }

    pub fn shutdown(&self) -> &ShutdownSignal {
        &self.shutdown
    }

    pub fn queued(&self) -> usize {
        self.rx.len()
    }

    pub fn peek_front(&mut self) -> Option<usize> {
        self.rx.peek_front()
    }

    /// Takes the channel head if there is one.
    pub fn poll_ready(&mut self) -> Option<Ready<'_, F>> {
        let index = self.rx.peek_front()?;
        if index >= self.pool.len() {
            self.rx.pop();
            return Some(Ready::OutOfRange(index));
        }
        // The acquire in `peek_front` made the producer's writes visible, and
        // the producer will not touch this slot until the guard pops it.
        let frame = unsafe { self.pool.slot_at(index) };
        Some(Ready::Frame(ReadySlot {
            index,
            frame,
            rx: &mut self.rx,
        }))
    }

    /// Spins until an index is queued. Returns `false` if shutdown was
    /// requested first, checked on every spin.
    pub fn wait_ready(&mut self, spin: SpinPolicy) -> bool {
        let wait = spin.waiter();
        loop {
            if self.shutdown.is_requested() {
                return false;
            }
            if self.rx.peek_front().is_some() {
                return true;
            }
            wait.spin();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pipeline(size: usize) -> FramePipeline<u64> {
        FramePipeline::new(size, || 0u64, ShutdownSignal::new()).unwrap()
    }

    #[test]
    fn test_rejects_tiny_pool() {
        assert!(FramePipeline::new(1, || 0u8, ShutdownSignal::new()).is_err());
        assert!(FramePipeline::new(0, || 0u8, ShutdownSignal::new()).is_err());
    }

    #[test]
    fn test_cursor_wraps_after_pool_size_publishes() {
        for size in 2..=5 {
            let FramePipeline { mut capture, .. } = pipeline(size);
            for expected in 0..size {
                assert!(capture.writable_slot().is_some());
                assert_eq!(capture.publish(), Ok(expected));
            }
            assert_eq!(capture.cursor(), 0);
            // Every slot is now queued, slot 0 included.
            assert!(capture.writable_slot().is_none());
            assert_eq!(capture.publish(), Err(0));
            assert_eq!(capture.cursor(), 0);
        }
    }

    #[test]
    fn test_slot_returns_to_producer_only_after_guard_drops() {
        let FramePipeline {
            mut capture,
            mut render,
        } = pipeline(2);

        *capture.writable_slot().unwrap() = 11;
        capture.publish().unwrap();
        *capture.writable_slot().unwrap() = 22;
        capture.publish().unwrap();

        {
            let Some(Ready::Frame(slot)) = render.poll_ready() else {
                panic!("expected a frame");
            };
            assert_eq!(slot.index(), 0);
            assert_eq!(*slot.frame(), 11);
            // Still queued while the consumer reads it.
            assert!(capture.writable_slot().is_none());
        }

        let slot = capture.writable_slot().expect("slot 0 released");
        *slot = 33;
        capture.publish().unwrap();

        let Some(Ready::Frame(slot)) = render.poll_ready() else {
            panic!("expected a frame");
        };
        assert_eq!((slot.index(), *slot.frame()), (1, 22));
    }

    #[test]
    fn test_out_of_range_index_is_popped() {
        let pool = Arc::new(FrameSlotPool::new(2, |_| 0u8));
        let (mut tx, rx) = IndexChannel::with_capacity(2);
        let mut render = RenderSide::from_parts(pool, rx, ShutdownSignal::new());

        tx.try_push(9).unwrap();
        tx.try_push(1).unwrap();
        assert!(matches!(render.poll_ready(), Some(Ready::OutOfRange(9))));
        assert_eq!(render.queued(), 1);
        assert!(matches!(render.poll_ready(), Some(Ready::Frame(ref s)) if s.index() == 1));
    }

    #[test]
    fn test_wait_ready_gives_up_on_shutdown() {
        let FramePipeline { mut render, .. } = pipeline(3);
        render
            .shutdown()
            .request(crate::core::shutdown::ShutdownReason::Interrupt);
        assert!(!render.wait_ready(SpinPolicy::Busy));
    }
}
