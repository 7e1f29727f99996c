//! Accept loop feeding connections into a worker pool.
//!
//! [`serve`] pulls connection handles from an [`Acceptor`] and submits each
//! one to a [`WorkerPool`] whose transform handles the connection. A full
//! queue is never fatal: the connection is dropped (closing it) or retried,
//! per [`OverflowPolicy`].
//!
//! # Example
//!
//! ```rust,no_run
//! use ring_pool::prelude::*;
//! use std::io::Write;
//! use std::net::{TcpListener, TcpStream};
//!
//! # fn main() -> Result<()> {
//! let pool = WorkerPool::new(16, 4096, |mut stream: TcpStream| {
//!     let _ = stream.write_all(b"HTTP/1.1 204 No Content\r\n\r\n");
//! })?;
//!
//! let listener = TcpListener::bind("127.0.0.1:8080").map_err(PoolError::Accept)?;
//! let stats = serve(listener, &pool, OverflowPolicy::Drop)?;
//! println!("dropped {} connections", stats.dropped);
//! # Ok(())
//! # }
//! ```

use crate::core::{PoolError, Result};
use crate::pool::WorkerPool;
use serde::Serialize;
use std::io;
use std::net::{TcpListener, TcpStream};
use std::thread;
use std::time::Duration;

/// Largest backoff multiplier (`2^10`) used by [`OverflowPolicy::Retry`].
const MAX_BACKOFF_SHIFT: u32 = 10;

/// A source of connection handles.
pub trait Acceptor {
    /// Handle passed to the pool's transform
    type Conn: Send + 'static;

    /// Block until the next connection arrives.
    ///
    /// Returns `Ok(None)` once the acceptor is exhausted and the loop should
    /// end.
    fn accept(&mut self) -> io::Result<Option<Self::Conn>>;
}

impl<T: Acceptor + ?Sized> Acceptor for &mut T {
    type Conn = T::Conn;

    fn accept(&mut self) -> io::Result<Option<Self::Conn>> {
        (**self).accept()
    }
}

impl Acceptor for TcpListener {
    type Conn = TcpStream;

    fn accept(&mut self) -> io::Result<Option<TcpStream>> {
        TcpListener::accept(self).map(|(stream, _)| Some(stream))
    }
}

#[cfg(unix)]
impl Acceptor for std::os::unix::net::UnixListener {
    type Conn = std::os::unix::net::UnixStream;

    fn accept(&mut self) -> io::Result<Option<Self::Conn>> {
        std::os::unix::net::UnixListener::accept(self).map(|(stream, _)| Some(stream))
    }
}

/// What [`serve`] does with a connection the pool has no room for.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OverflowPolicy {
    /// Drop the connection immediately
    #[default]
    Drop,
    /// Resubmit up to `attempts` more times, sleeping between attempts, then
    /// drop.
    ///
    /// The sleep doubles after each attempt, starting at `backoff`, and is
    /// jittered by ±50%.
    Retry {
        /// Resubmissions before giving up
        attempts: u32,
        /// Initial sleep between attempts
        backoff: Duration,
    },
}

/// Counters for one run of [`serve`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ServeStats {
    /// Connections returned by the acceptor
    pub accepted: u64,
    /// Connections handed to the pool
    pub submitted: u64,
    /// Connections closed without being handled
    pub dropped: u64,
    /// Resubmissions after a full queue
    pub retries: u64,
}

/// Accept connections until the acceptor is exhausted, submitting each to
/// `pool`.
///
/// `ErrorKind::Interrupted` from the acceptor is retried. The loop also ends,
/// returning the counters so far, when the pool starts shutting down.
///
/// # Errors
///
/// Returns [`PoolError::Accept`] for any other accept error.
pub fn serve<C, R>(
    mut acceptor: C,
    pool: &WorkerPool<C::Conn, R>,
    policy: OverflowPolicy,
) -> Result<ServeStats>
where
    C: Acceptor,
    R: Send + 'static,
{
    let mut stats = ServeStats::default();

    loop {
        let conn = match acceptor.accept() {
            Ok(Some(conn)) => conn,
            Ok(None) => break,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                log::error!("accept failed after {} connections: {}", stats.accepted, e);
                return Err(PoolError::Accept(e));
            }
        };
        stats.accepted += 1;

        match dispatch(pool, conn, policy, &mut stats) {
            Ok(()) => {}
            Err(e @ PoolError::ShuttingDown { .. }) => {
                stats.dropped += 1;
                log::debug!("accept loop ending: {}", e);
                break;
            }
            Err(e) => return Err(e),
        }
    }

    log::debug!(
        "accept loop finished: {} accepted, {} dropped",
        stats.accepted,
        stats.dropped
    );
    Ok(stats)
}

/// Submit one connection, applying `policy` while the queue is full.
fn dispatch<T, R>(
    pool: &WorkerPool<T, R>,
    mut conn: T,
    policy: OverflowPolicy,
    stats: &mut ServeStats,
) -> Result<()>
where
    T: Send + 'static,
    R: Send + 'static,
{
    let mut attempt = 0;
    loop {
        let rejected = match pool.try_submit(conn, None, None) {
            Ok(()) => {
                stats.submitted += 1;
                return Ok(());
            }
            Err(rejected) => rejected,
        };

        let (returned, error) = rejected.into_parts();
        if !error.is_backpressure() {
            return Err(error);
        }

        match policy {
            OverflowPolicy::Retry { attempts, backoff } if attempt < attempts => {
                thread::sleep(retry_delay(backoff, attempt));
                attempt += 1;
                stats.retries += 1;
                conn = returned;
            }
            _ => {
                stats.dropped += 1;
                log::warn!(
                    "dropping connection: {} ({} retries)",
                    error,
                    attempt
                );
                #[cfg(feature = "tracing")]
                crate::tracing::metrics::record_connection_dropped(attempt);
                return Ok(());
            }
        }
    }
}

fn retry_delay(backoff: Duration, attempt: u32) -> Duration {
    let scaled = backoff.saturating_mul(1 << attempt.min(MAX_BACKOFF_SHIFT));
    scaled.mul_f64(0.5 + fastrand::f64())
}
