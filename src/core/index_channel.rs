use crossbeam::utils::CachePadded;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Lock-free single-producer/single-consumer ring of slot indices.
///
/// `head` and `tail` are free-running counters; the ring holds
/// `head - tail` entries and the entry for counter `c` lives in
/// `entries[c % capacity]`. Each side keeps a private copy of its own
/// counter and a cached copy of the other side's, so the shared atomics are
/// only re-read when the cache says full (producer) or empty (consumer).
struct Ring {
    entries: Box<[AtomicUsize]>,
    head: CachePadded<AtomicUsize>,
    tail: CachePadded<AtomicUsize>,
}

impl Ring {
    fn capacity(&self) -> usize {
        self.entries.len()
    }

    fn len(&self) -> usize {
        let tail = self.tail.load(Ordering::Acquire);
        let head = self.head.load(Ordering::Acquire);
        head.wrapping_sub(tail)
    }
}

pub struct IndexChannel;

impl IndexChannel {
    /// Creates a channel holding up to `capacity` indices and returns its two
    /// ends. Each end is `Send` but not `Clone`, so exactly one thread can push
    /// and exactly one can peek/pop.
    pub fn with_capacity(capacity: usize) -> (IndexProducer, IndexConsumer) {
        assert!(capacity > 0, "index channel capacity must be non-zero");
        let ring = Arc::new(Ring {
            entries: (0..capacity).map(|_| AtomicUsize::new(0)).collect(),
            head: CachePadded::new(AtomicUsize::new(0)),
            tail: CachePadded::new(AtomicUsize::new(0)),
        });
        (
            IndexProducer {
                ring: Arc::clone(&ring),
                head: 0,
                cached_tail: 0,
            },
            IndexConsumer {
                ring,
                tail: 0,
                cached_head: 0,
            },
        )
    }
}

pub struct IndexProducer {
    ring: Arc<Ring>,
    head: usize,
    cached_tail: usize,
}

impl IndexProducer {
    /// Appends `value` without blocking. A full channel hands the value back.
    pub fn try_push(&mut self, value: usize) -> Result<(), usize> {
        if self.is_full() {
            return Err(value);
        }
        let capacity = self.ring.capacity();
        self.ring.entries[self.head % capacity].store(value, Ordering::Relaxed);
        self.head = self.head.wrapping_add(1);
        // Publishes the entry and every write made before it.
        self.ring.head.store(self.head, Ordering::Release);
        Ok(())
    }

    /// True when every position is taken by an entry the consumer has not
    /// popped yet. Observing `false` also acquires the consumer's pops, so
    /// anything the consumer did before popping happens-before this returns.
    pub fn is_full(&mut self) -> bool {
        let capacity = self.ring.capacity();
        if self.head.wrapping_sub(self.cached_tail) < capacity {
            return false;
        }
        self.cached_tail = self.ring.tail.load(Ordering::Acquire);
        self.head.wrapping_sub(self.cached_tail) >= capacity
    }

    #[allow(dead_code)]
    pub fn len(&self) -> usize {
        self.ring.len()
    }

    pub fn capacity(&self) -> usize {
        self.ring.capacity()
    }
}

pub struct IndexConsumer {
    ring: Arc<Ring>,
    tail: usize,
    cached_head: usize,
}

impl IndexConsumer {
    /// Returns the oldest index without removing it.
    pub fn peek_front(&mut self) -> Option<usize> {
        if self.tail == self.cached_head {
            self.cached_head = self.ring.head.load(Ordering::Acquire);
            if self.tail == self.cached_head {
                return None;
            }
        }
        let capacity = self.ring.capacity();
        Some(self.ring.entries[self.tail % capacity].load(Ordering::Relaxed))
    }

    /// Removes the oldest index. Popping an empty channel does nothing and
    /// returns `false`.
    pub fn pop(&mut self) -> bool {
        if self.peek_front().is_none() {
            return false;
        }
        self.tail = self.tail.wrapping_add(1);
        // Hands the position (and the slot it named) back to the producer.
        self.ring.tail.store(self.tail, Ordering::Release);
        true
    }

    pub fn len(&self) -> usize {
        self.ring.len()
    }

    pub fn is_empty(&mut self) -> bool {
        self.peek_front().is_none()
    }

    #[allow(dead_code)]
    pub fn capacity(&self) -> usize {
        self.ring.capacity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::thread;

    #[test]
    fn test_push_until_full_then_reject() {
        let (mut tx, mut rx) = IndexChannel::with_capacity(3);
        assert_eq!(tx.try_push(7), Ok(()));
        assert_eq!(tx.try_push(8), Ok(()));
        assert_eq!(tx.try_push(9), Ok(()));
        assert!(tx.is_full());
        assert_eq!(tx.try_push(10), Err(10));
        assert_eq!(rx.len(), 3);

        assert_eq!(rx.peek_front(), Some(7));
        assert!(rx.pop());
        assert!(!tx.is_full());
        assert_eq!(tx.try_push(10), Ok(()));
        assert_eq!(rx.peek_front(), Some(8));
    }

    #[test]
    fn test_peek_does_not_consume() {
        let (mut tx, mut rx) = IndexChannel::with_capacity(2);
        assert_eq!(rx.peek_front(), None);
        tx.try_push(1).unwrap();
        assert_eq!(rx.peek_front(), Some(1));
        assert_eq!(rx.peek_front(), Some(1));
        assert_eq!(rx.len(), 1);
    }

    #[test]
    fn test_pop_on_empty_is_noop() {
        let (mut tx, mut rx) = IndexChannel::with_capacity(2);
        assert!(!rx.pop());
        assert!(rx.is_empty());
        tx.try_push(5).unwrap();
        assert!(rx.pop());
        assert!(!rx.pop());
        assert_eq!(rx.len(), 0);
    }

    #[test]
    fn test_fifo_matches_model_for_mixed_operations() {
        // Deterministic LCG drives a push/pop mix checked against a VecDeque.
        for capacity in 2..=6 {
            let (mut tx, mut rx) = IndexChannel::with_capacity(capacity);
            let mut model = VecDeque::new();
            let mut state: u64 = 0x2545_F491_4F6C_DD1D ^ capacity as u64;
            let mut next_value = 0usize;

            for _ in 0..5_000 {
                state = state
                    .wrapping_mul(6364136223846793005)
                    .wrapping_add(1442695040888963407);
                let push = (state >> 33) % 3 != 0;

                if push && model.len() < capacity {
                    assert_eq!(tx.try_push(next_value), Ok(()));
                    model.push_back(next_value);
                    next_value += 1;
                } else if push {
                    assert_eq!(tx.try_push(next_value), Err(next_value));
                } else if let Some(expected) = model.pop_front() {
                    assert_eq!(rx.peek_front(), Some(expected));
                    assert!(rx.pop());
                } else {
                    assert_eq!(rx.peek_front(), None);
                }
                assert_eq!(rx.len(), model.len());
            }
        }
    }

    #[test]
    fn test_cross_thread_order_preserved() {
        const COUNT: usize = 200_000;
        let (mut tx, mut rx) = IndexChannel::with_capacity(4);

        let producer = thread::spawn(move || {
            let mut value = 0;
            while value < COUNT {
                if tx.try_push(value).is_ok() {
                    value += 1;
                } else {
                    std::hint::spin_loop();
                }
            }
        });

        let mut expected = 0;
        while expected < COUNT {
            match rx.peek_front() {
                Some(value) => {
                    assert_eq!(value, expected);
                    assert!(rx.pop());
                    expected += 1;
                }
                None => std::hint::spin_loop(),
            }
        }
        producer.join().unwrap();
        assert!(rx.is_empty());
    }
}
