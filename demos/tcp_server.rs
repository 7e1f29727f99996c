//! Minimal pool-backed TCP server
//!
//! Every accepted connection is handed to the pool; a worker reads the
//! request head and answers with a fixed HTTP response. When the queue is
//! full the connection is closed immediately.
//!
//! ```text
//! cargo run --example tcp_server -- 127.0.0.1:8080 128 16384
//! ```

use ring_pool::prelude::*;
use std::env;
use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};

const DEFAULT_ADDR: &str = "127.0.0.1:8080";
const DEFAULT_WORKERS: usize = 128;
const DEFAULT_CAPACITY: usize = 16_384;

fn handle(stream: TcpStream) -> std::io::Result<usize> {
    let mut reader = BufReader::new(&stream);
    let mut head_len = 0;
    let mut line = String::new();
    loop {
        line.clear();
        let read = reader.read_line(&mut line)?;
        head_len += read;
        if read == 0 || line == "\r\n" || line == "\n" {
            break;
        }
    }

    let body = "hello from ring_pool\n";
    let mut stream = &stream;
    write!(
        stream,
        "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        body.len(),
        body
    )?;
    Ok(head_len)
}

fn main() -> Result<()> {
    env_logger::init();

    let mut args = env::args().skip(1);
    let addr = args.next().unwrap_or_else(|| DEFAULT_ADDR.to_string());
    let workers = args
        .next()
        .and_then(|s| s.parse().ok())
        .unwrap_or(DEFAULT_WORKERS);
    let capacity = args
        .next()
        .and_then(|s| s.parse().ok())
        .unwrap_or(DEFAULT_CAPACITY);

    let config = WorkerPoolConfig::new(workers, capacity).with_thread_name_prefix("http");
    let pool = WorkerPool::with_config(config, |stream: TcpStream| {
        if let Err(e) = handle(stream) {
            log::warn!("request failed: {}", e);
        }
    })?;

    let listener = TcpListener::bind(&addr).map_err(PoolError::Accept)?;
    log::info!("listening on {} with {} workers", addr, workers);

    let stats = serve(listener, &pool, OverflowPolicy::Drop)?;
    log::info!("accept loop ended: {:?}", stats);
    pool.shutdown()
}
