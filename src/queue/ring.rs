//! Fixed-capacity FIFO ring buffer.

use std::fmt;

/// Errors reported by [`BoundedQueue`].
///
/// Inside a [`WorkerPool`](crate::pool::WorkerPool) `Empty` is unreachable:
/// workers only pop after seeing a non-empty queue under the pool mutex.
/// Seeing one there means the locking discipline is broken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RingError {
    /// The requested capacity is too small
    #[error("ring buffer capacity must be greater than 1, got {capacity}")]
    InvalidCapacity {
        /// Requested capacity
        capacity: usize,
    },

    /// `push_back` on a full queue
    #[error("ring buffer is full ({capacity} entries)")]
    Full {
        /// Capacity of the queue
        capacity: usize,
    },

    /// `pop_front` on an empty queue
    #[error("ring buffer is empty")]
    Empty,
}

/// Returned by [`BoundedQueue::push_back`] when the queue is full.
///
/// Hands the rejected item back to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PushError<T> {
    item: T,
    capacity: usize,
}

impl<T> PushError<T> {
    /// Capacity of the queue that rejected the item.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Recovers the rejected item.
    pub fn into_inner(self) -> T {
        self.item
    }
}

impl<T> fmt::Display for PushError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ring buffer is full ({} entries)", self.capacity)
    }
}

impl<T: fmt::Debug> std::error::Error for PushError<T> {}

impl<T> From<PushError<T>> for RingError {
    fn from(err: PushError<T>) -> Self {
        RingError::Full {
            capacity: err.capacity,
        }
    }
}

/// A bounded FIFO queue backed by a fixed array of slots.
///
/// `front` and `back` are `None` exactly when the queue is empty. Neither
/// operation allocates after construction and both run in constant time.
///
/// The queue does no locking of its own.
///
/// # Example
///
/// ```rust
/// use ring_pool::queue::{BoundedQueue, RingError};
///
/// let mut queue = BoundedQueue::new(2).unwrap();
/// queue.push_back("a").unwrap();
/// queue.push_back("b").unwrap();
///
/// let rejected = queue.push_back("c").unwrap_err();
/// assert_eq!(RingError::from(rejected), RingError::Full { capacity: 2 });
///
/// assert_eq!(queue.pop_front(), Ok("a"));
/// assert_eq!(queue.pop_front(), Ok("b"));
/// assert_eq!(queue.pop_front(), Err(RingError::Empty));
/// ```
pub struct BoundedQueue<T> {
    slots: Box<[Option<T>]>,
    front: Option<usize>,
    back: Option<usize>,
    count: usize,
}

impl<T> BoundedQueue<T> {
    /// Creates an empty queue holding at most `capacity` items.
    ///
    /// # Errors
    ///
    /// Returns [`RingError::InvalidCapacity`] if `capacity < 2`.
    pub fn new(capacity: usize) -> Result<Self, RingError> {
        if capacity < 2 {
            return Err(RingError::InvalidCapacity { capacity });
        }
        let slots = std::iter::repeat_with(|| None).take(capacity).collect();
        Ok(Self {
            slots,
            front: None,
            back: None,
            count: 0,
        })
    }

    /// Maximum number of items.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of items currently queued.
    pub fn len(&self) -> usize {
        self.count
    }

    /// Returns true when no items are queued.
    pub fn is_empty(&self) -> bool {
        debug_assert!(self.count <= self.capacity());
        let empty = self.count == 0;
        debug_assert!(!empty || (self.front.is_none() && self.back.is_none()));
        empty
    }

    /// Returns true when `len() == capacity()`.
    pub fn is_full(&self) -> bool {
        self.count == self.capacity()
    }

    /// Appends an item at the back.
    ///
    /// # Errors
    ///
    /// Returns a [`PushError`] holding `item` without touching the queue if
    /// it is full.
    pub fn push_back(&mut self, item: T) -> Result<(), PushError<T>> {
        if self.is_full() {
            return Err(PushError {
                item,
                capacity: self.capacity(),
            });
        }

        let back = match self.back {
            None => {
                self.front = Some(0);
                0
            }
            Some(back) => (back + 1) % self.capacity(),
        };
        debug_assert!(self.slots[back].is_none());

        self.slots[back] = Some(item);
        self.back = Some(back);
        self.count += 1;
        Ok(())
    }

    /// Removes and returns the item at the front.
    ///
    /// # Errors
    ///
    /// Returns [`RingError::Empty`] without touching the queue if it is empty.
    pub fn pop_front(&mut self) -> Result<T, RingError> {
        let front = self.front.ok_or(RingError::Empty)?;
        let item = self.slots[front].take().ok_or(RingError::Empty)?;

        self.count -= 1;
        if self.count == 0 {
            self.front = None;
            self.back = None;
        } else {
            self.front = Some((front + 1) % self.capacity());
        }
        Ok(item)
    }

    /// Pops every queued item in FIFO order.
    pub fn drain(&mut self) -> Drain<'_, T> {
        Drain { queue: self }
    }
}

impl<T> fmt::Debug for BoundedQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundedQueue")
            .field("capacity", &self.capacity())
            .field("len", &self.count)
            .field("front", &self.front)
            .field("back", &self.back)
            .finish()
    }
}

/// Iterator returned by [`BoundedQueue::drain`].
pub struct Drain<'a, T> {
    queue: &'a mut BoundedQueue<T>,
}

impl<T> Iterator for Drain<'_, T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.queue.pop_front().ok()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.queue.len(), Some(self.queue.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;
    use std::collections::VecDeque;

    #[test]
    fn test_new_rejects_small_capacity() {
        assert_eq!(
            BoundedQueue::<u32>::new(0).unwrap_err(),
            RingError::InvalidCapacity { capacity: 0 }
        );
        assert_eq!(
            BoundedQueue::<u32>::new(1).unwrap_err(),
            RingError::InvalidCapacity { capacity: 1 }
        );
        assert!(BoundedQueue::<u32>::new(2).is_ok());
    }

    #[test]
    fn test_empty_and_full() {
        let mut queue = BoundedQueue::new(3).unwrap();
        assert!(queue.is_empty());
        assert!(!queue.is_full());

        for i in 0..3 {
            queue.push_back(i).unwrap();
        }
        assert!(queue.is_full());
        assert!(!queue.is_empty());
        assert_eq!(queue.len(), 3);
    }

    #[test]
    fn test_push_on_full_does_not_mutate() {
        let mut queue = BoundedQueue::new(2).unwrap();
        queue.push_back(1).unwrap();
        queue.push_back(2).unwrap();

        let rejected = queue.push_back(3).unwrap_err();
        assert_eq!(rejected.capacity(), 2);
        assert_eq!(rejected.into_inner(), 3);
        assert_eq!(
            RingError::from(queue.push_back(4).unwrap_err()),
            RingError::Full { capacity: 2 }
        );
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.pop_front(), Ok(1));
        assert_eq!(queue.pop_front(), Ok(2));
    }

    #[test]
    fn test_pop_on_empty_does_not_mutate() {
        let mut queue: BoundedQueue<u8> = BoundedQueue::new(4).unwrap();
        assert_eq!(queue.pop_front(), Err(RingError::Empty));
        assert_eq!(queue.pop_front(), Err(RingError::Empty));
        assert!(queue.is_empty());

        queue.push_back(7).unwrap();
        assert_eq!(queue.pop_front(), Ok(7));
    }

    #[test]
    fn test_indices_reset_when_emptied() {
        let mut queue = BoundedQueue::new(4).unwrap();
        queue.push_back('a').unwrap();
        queue.push_back('b').unwrap();
        queue.pop_front().unwrap();
        queue.pop_front().unwrap();

        assert_eq!(queue.front, None);
        assert_eq!(queue.back, None);

        // Next push restarts at slot 0
        queue.push_back('c').unwrap();
        assert_eq!(queue.front, Some(0));
        assert_eq!(queue.back, Some(0));
    }

    #[test]
    fn test_wraps_around() {
        let mut queue = BoundedQueue::new(3).unwrap();
        queue.push_back(1).unwrap();
        queue.push_back(2).unwrap();
        queue.push_back(3).unwrap();
        assert_eq!(queue.pop_front(), Ok(1));
        queue.push_back(4).unwrap();

        assert_eq!(queue.back, Some(0));
        assert_eq!(queue.front, Some(1));
        assert_eq!(queue.drain().collect::<Vec<_>>(), vec![2, 3, 4]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_random_sequence_matches_vecdeque() {
        let mut rng = rand::thread_rng();
        let capacity = 5;
        let mut queue = BoundedQueue::new(capacity).unwrap();
        let mut model = VecDeque::new();

        for step in 0..10_000u32 {
            if rng.gen_bool(0.55) {
                let pushed = queue.push_back(step);
                if model.len() == capacity {
                    assert_eq!(pushed.map_err(PushError::into_inner), Err(step));
                } else {
                    assert!(pushed.is_ok());
                    model.push_back(step);
                }
            } else {
                assert_eq!(queue.pop_front().ok(), model.pop_front());
            }
            assert_eq!(queue.len(), model.len());
            assert!(queue.len() <= capacity);
        }
    }
}
