//! Single-producer/single-consumer ring buffer for the feed-ingest-thread
//! to trading-thread crossing (spec §5: "a single-producer / single-consumer
//! ring buffer of fixed-size packets (power-of-two capacity, head/tail on
//! separate cache lines to avoid false sharing)").
//!
//! This is not shared memory — both ends live in the same process, one on
//! the feed-ingest thread, one on the pinned trading thread. Grounded in
//! `services/execution-router/src/memory/ring_buffer.rs`'s lock-free SPSC
//! design, adapted to a const-generic capacity and a clearer empty/full
//! distinction (the teacher reserves one slot to disambiguate full from
//! empty; kept here for the same reason).

use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Fixed-capacity SPSC ring buffer. `N` should be a power of two; capacity
/// usable at any time is `N - 1` (one slot distinguishes full from empty).
///
/// `head` (consumer-owned) and `tail` (producer-owned) are kept on separate
/// cache lines via `repr(align(64))` padding to avoid false sharing between
/// the feed-ingest thread and the trading thread.
#[repr(C, align(64))]
pub struct SpscRingBuffer<T, const N: usize> {
    buffer: [UnsafeCell<MaybeUninit<T>>; N],
    head: AtomicUsize,
    _head_pad: [u8; 56],
    tail: AtomicUsize,
    _tail_pad: [u8; 56],
}

// SAFETY: `T: Send` is sufficient because the buffer enforces single-producer/
// single-consumer access via the head/tail protocol below; no two threads
// ever touch the same slot concurrently.
unsafe impl<T: Send, const N: usize> Send for SpscRingBuffer<T, N> {}
// SAFETY: see above; `&SpscRingBuffer` is shared only to let producer and
// consumer each hold their own reference, never to alias a slot.
unsafe impl<T: Send, const N: usize> Sync for SpscRingBuffer<T, N> {}

impl<T, const N: usize> SpscRingBuffer<T, N> {
    /// Build an empty ring buffer. All storage is inline; no heap allocation.
    #[must_use]
    pub fn new() -> Self {
        assert!(N.is_power_of_two(), "SpscRingBuffer capacity must be a power of two");
        Self {
            // SAFETY: `MaybeUninit<T>` requires no initialization.
            buffer: std::array::from_fn(|_| UnsafeCell::new(MaybeUninit::uninit())),
            head: AtomicUsize::new(0),
            _head_pad: [0; 56],
            tail: AtomicUsize::new(0),
            _tail_pad: [0; 56],
        }
    }

    /// Push a packet from the producer (feed-ingest) thread. Returns `false`
    /// without blocking if the buffer is full — the hot path never blocks
    /// (spec §5).
    pub fn push(&self, value: T) -> bool {
        let tail = self.tail.load(Ordering::Relaxed);
        let next_tail = (tail + 1) % N;
        if next_tail == self.head.load(Ordering::Acquire) {
            return false;
        }
        // SAFETY: only the producer writes this slot, and it is not the slot
        // the consumer is currently reading (checked above against `head`).
        unsafe {
            (*self.buffer[tail].get()).write(value);
        }
        self.tail.store(next_tail, Ordering::Release);
        true
    }

    /// Pop a packet on the consumer (trading) thread. `None` if empty.
    pub fn pop(&self) -> Option<T> {
        let head = self.head.load(Ordering::Relaxed);
        if head == self.tail.load(Ordering::Acquire) {
            return None;
        }
        // SAFETY: only the consumer reads this slot, and `Release` on `tail`
        // in `push` happens-before this `Acquire` load, so the write above is
        // visible.
        let value = unsafe { (*self.buffer[head].get()).assume_init_read() };
        self.head.store((head + 1) % N, Ordering::Release);
        Some(value)
    }

    /// True if no packets are queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.head.load(Ordering::Relaxed) == self.tail.load(Ordering::Acquire)
    }

    /// Usable capacity (`N - 1`).
    #[must_use]
    pub const fn capacity(&self) -> usize {
        N - 1
    }
}

impl<T, const N: usize> Default for SpscRingBuffer<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_pop_round_trips_in_order() {
        let rb = SpscRingBuffer::<u32, 4>::new();
        assert!(rb.is_empty());
        assert_eq!(rb.capacity(), 3);
        assert!(rb.push(1));
        assert!(rb.push(2));
        assert!(rb.push(3));
        assert!(!rb.push(4), "ring is full with one slot held back");
        assert_eq!(rb.pop(), Some(1));
        assert_eq!(rb.pop(), Some(2));
        assert_eq!(rb.pop(), Some(3));
        assert_eq!(rb.pop(), None);
    }

    #[test]
    fn wraps_around_capacity_repeatedly() {
        let rb = SpscRingBuffer::<u32, 4>::new();
        for round in 0..5u32 {
            for i in 0..3 {
                assert!(rb.push(round * 10 + i));
            }
            for i in 0..3 {
                assert_eq!(rb.pop(), Some(round * 10 + i));
            }
        }
    }

    #[test]
    fn cross_thread_producer_consumer_preserves_order() {
        use std::sync::Arc;
        use std::thread;

        let rb = Arc::new(SpscRingBuffer::<u32, 1024>::new());
        let count = 20_000u32;

        let producer_rb = Arc::clone(&rb);
        let producer = thread::spawn(move || {
            for i in 0..count {
                while !producer_rb.push(i) {
                    thread::yield_now();
                }
            }
        });

        let consumer = thread::spawn(move || {
            let mut received = Vec::with_capacity(count as usize);
            while received.len() < count as usize {
                match rb.pop() {
                    Some(v) => received.push(v),
                    None => thread::yield_now(),
                }
            }
            received
        });

        producer.join().unwrap();
        let received = consumer.join().unwrap();
        for (i, v) in received.iter().enumerate() {
            assert_eq!(*v, i as u32);
        }
    }
}
