//! Integration tests for the accept loop

use ring_pool::prelude::*;
use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

/// Hands out a fixed list of connection IDs, then reports exhaustion.
struct ListAcceptor(VecDeque<u32>);

impl Acceptor for ListAcceptor {
    type Conn = u32;

    fn accept(&mut self) -> io::Result<Option<u32>> {
        Ok(self.0.pop_front())
    }
}

/// Accepts a fixed number of TCP connections, then stops.
struct Limited {
    listener: TcpListener,
    remaining: usize,
}

impl Acceptor for Limited {
    type Conn = TcpStream;

    fn accept(&mut self) -> io::Result<Option<TcpStream>> {
        if self.remaining == 0 {
            return Ok(None);
        }
        self.remaining -= 1;
        Acceptor::accept(&mut self.listener)
    }
}

/// One-worker pool parked on connection 0; returns the release sender and a
/// log of handled connection IDs.
fn parked_pool(capacity: usize) -> (WorkerPool<u32, ()>, mpsc::Sender<()>, Arc<Mutex<Vec<u32>>>) {
    let (release_tx, release_rx) = mpsc::channel::<()>();
    let (started_tx, started_rx) = mpsc::channel::<()>();
    let release_rx = Mutex::new(release_rx);
    let started_tx = Mutex::new(started_tx);
    let handled = Arc::new(Mutex::new(Vec::new()));
    let handled_clone = Arc::clone(&handled);

    let pool = WorkerPool::new(1, capacity, move |conn: u32| {
        if conn == 0 {
            let _ = started_tx.lock().unwrap().send(());
            let _ = release_rx.lock().unwrap().recv();
        }
        handled_clone.lock().unwrap().push(conn);
    })
    .expect("Failed to create pool");

    pool.execute(0).expect("Failed to submit parking job");
    started_rx
        .recv_timeout(Duration::from_secs(5))
        .expect("Worker should pick up the parking job");
    (pool, release_tx, handled)
}

#[test]
fn test_drop_policy_drops_only_when_full() {
    let (pool, release, handled) = parked_pool(2);

    let acceptor = ListAcceptor((1..=5).collect());
    let stats = serve(acceptor, &pool, OverflowPolicy::Drop).expect("Serve failed");

    assert_eq!(
        stats,
        ServeStats {
            accepted: 5,
            submitted: 2,
            dropped: 3,
            retries: 0,
        }
    );

    let _ = release.send(());
    pool.shutdown().expect("Failed to shutdown pool");
    assert_eq!(*handled.lock().unwrap(), vec![0, 1, 2]);
}

#[test]
fn test_retry_policy_resubmits_after_capacity_frees() {
    let (pool, release, handled) = parked_pool(2);

    let releaser = thread::spawn(move || {
        thread::sleep(Duration::from_millis(30));
        let _ = release.send(());
    });

    let policy = OverflowPolicy::Retry {
        attempts: 20,
        backoff: Duration::from_millis(2),
    };
    let acceptor = ListAcceptor((1..=3).collect());
    let stats = serve(acceptor, &pool, policy).expect("Serve failed");
    releaser.join().unwrap();

    assert_eq!(stats.accepted, 3);
    assert_eq!(stats.submitted, 3);
    assert_eq!(stats.dropped, 0);
    assert!(stats.retries > 0);

    pool.shutdown().expect("Failed to shutdown pool");
    assert_eq!(*handled.lock().unwrap(), vec![0, 1, 2, 3]);
}

#[test]
fn test_retry_policy_gives_up() {
    let (pool, release, _handled) = parked_pool(2);

    let policy = OverflowPolicy::Retry {
        attempts: 3,
        backoff: Duration::from_millis(1),
    };
    let acceptor = ListAcceptor((1..=3).collect());
    let stats = serve(acceptor, &pool, policy).expect("Serve failed");

    assert_eq!(stats.submitted, 2);
    assert_eq!(stats.dropped, 1);
    assert_eq!(stats.retries, 3);

    let _ = release.send(());
}

#[test]
fn test_tcp_listener_acceptor() {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind");
    let addr = listener.local_addr().unwrap();

    let pool = WorkerPool::new(4, 64, |mut stream: TcpStream| {
        let mut request = [0u8; 4];
        stream.read_exact(&mut request)?;
        request.reverse();
        stream.write_all(&request)
    })
    .expect("Failed to create pool");

    let clients: Vec<_> = (0..4u8)
        .map(|i| {
            thread::spawn(move || {
                let mut stream = TcpStream::connect(addr).expect("Failed to connect");
                stream.write_all(&[i, 1, 2, 3]).unwrap();
                let mut reply = [0u8; 4];
                stream.read_exact(&mut reply).unwrap();
                reply
            })
        })
        .collect();

    let acceptor = Limited {
        listener,
        remaining: 4,
    };
    let stats = serve(acceptor, &pool, OverflowPolicy::Drop).expect("Serve failed");
    assert_eq!(stats.accepted, 4);
    assert_eq!(stats.submitted, 4);

    for (i, client) in clients.into_iter().enumerate() {
        assert_eq!(client.join().unwrap(), [3, 2, 1, i as u8]);
    }
    pool.shutdown().expect("Failed to shutdown pool");
}
