//! Bounded job storage.
//!
//! [`BoundedQueue`] is the fixed-capacity ring buffer every
//! [`WorkerPool`](crate::pool::WorkerPool) keeps its pending jobs in. It is
//! public so it can be reused on its own; it does no synchronization.

mod ring;

pub use ring::{BoundedQueue, Drain, PushError, RingError};
