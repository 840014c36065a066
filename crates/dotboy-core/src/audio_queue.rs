use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

/// Single-producer / single-consumer queue of mono `f32` samples.
///
/// The emulator thread pushes, the audio callback pops, and neither side
/// ever blocks: an overrun drops the newest sample, an underrun surfaces
/// as `None` so the callback can substitute silence.
///
/// Samples are stored bit-cast in `AtomicU32` slots, so the queue needs
/// no `unsafe`. A slot's contents are published by the release store of
/// `head` and consumed under the matching acquire load; a slot is only
/// reused once `tail` has moved past it.
struct Shared {
    slots: Box<[AtomicU32]>,
    /// Next slot the producer will write.
    head: AtomicUsize,
    /// Next slot the consumer will read.
    tail: AtomicUsize,
}

impl Shared {
    #[inline]
    fn advance(&self, idx: usize) -> usize {
        let next = idx + 1;
        if next == self.slots.len() { 0 } else { next }
    }

    fn len(&self) -> usize {
        let head = self.head.load(Ordering::Acquire);
        let tail = self.tail.load(Ordering::Acquire);
        if head >= tail {
            head - tail
        } else {
            head + self.slots.len() - tail
        }
    }
}

#[derive(Clone)]
pub struct AudioProducer {
    shared: Arc<Shared>,
}

#[derive(Clone)]
pub struct AudioConsumer {
    shared: Arc<Shared>,
}

/// Create a queue holding up to `capacity` samples.
pub fn audio_queue(capacity: usize) -> (AudioProducer, AudioConsumer) {
    // One slot stays vacant so head == tail always means empty.
    let slots = (0..capacity.max(1) + 1).map(|_| AtomicU32::new(0)).collect();
    let shared = Arc::new(Shared {
        slots,
        head: AtomicUsize::new(0),
        tail: AtomicUsize::new(0),
    });

    (
        AudioProducer {
            shared: Arc::clone(&shared),
        },
        AudioConsumer { shared },
    )
}

impl AudioProducer {
    /// Enqueue one sample. Returns false (dropping the sample) when the
    /// consumer has fallen behind and the queue is full.
    #[inline]
    pub fn push(&self, sample: f32) -> bool {
        let head = self.shared.head.load(Ordering::Relaxed);
        let next = self.shared.advance(head);
        if next == self.shared.tail.load(Ordering::Acquire) {
            return false;
        }

        self.shared.slots[head].store(sample.to_bits(), Ordering::Relaxed);
        self.shared.head.store(next, Ordering::Release);
        true
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.shared.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.shared.slots.len() - 1
    }
}

impl AudioConsumer {
    /// Dequeue the oldest sample, or None when the queue has drained.
    #[inline]
    pub fn pop(&self) -> Option<f32> {
        let tail = self.shared.tail.load(Ordering::Relaxed);
        if tail == self.shared.head.load(Ordering::Acquire) {
            return None;
        }

        let bits = self.shared.slots[tail].load(Ordering::Relaxed);
        self.shared.tail.store(self.shared.advance(tail), Ordering::Release);
        Some(f32::from_bits(bits))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.shared.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.shared.slots.len() - 1
    }
}
