//! Row-parallel matrix multiplication
//!
//! Multiplies two random N x N matrices with one job per row of the product,
//! then sums every entry of the product.
//!
//! ```text
//! cargo run --release --example matrix_mult -- 1000 8
//! ```

use rand::Rng;
use ring_pool::prelude::*;
use std::env;
use std::process;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Row-major square matrix
struct Matrix {
    n: usize,
    data: Vec<f64>,
}

impl Matrix {
    fn random(n: usize) -> Self {
        let mut rng = rand::thread_rng();
        Self {
            n,
            data: (0..n * n).map(|_| rng.gen()).collect(),
        }
    }

    fn row(&self, i: usize) -> &[f64] {
        &self.data[i * self.n..(i + 1) * self.n]
    }
}

/// Computes row `i` of `A * B` and the sum of its entries.
fn mult_row(a: &Matrix, b: &Matrix, i: usize) -> (Vec<f64>, f64) {
    let row_a = a.row(i);
    let row_c: Vec<f64> = (0..b.n)
        .map(|j| (0..a.n).map(|k| row_a[k] * b.data[k * b.n + j]).sum())
        .collect();
    let sum = row_c.iter().sum();
    (row_c, sum)
}

fn parse_args() -> Option<(usize, usize)> {
    let mut args = env::args().skip(1);
    let n = args.next()?.parse().ok().filter(|&n| n > 0)?;
    let threads = args.next()?.parse().ok().filter(|&t| t > 0)?;
    Some((n, threads))
}

fn main() -> Result<()> {
    env_logger::init();

    let Some((n, threads)) = parse_args() else {
        eprintln!("Params: MatrixSize NThreads");
        process::exit(1);
    };

    let a = Matrix::random(n);
    let b = Matrix::random(n);
    let inputs = Arc::new((a, b));

    let started = Instant::now();
    let config = WorkerPoolConfig::new(threads, n.max(2)).with_thread_name_prefix("matmul");
    let pool = {
        let inputs = Arc::clone(&inputs);
        WorkerPool::with_config(config, move |i: usize| mult_row(&inputs.0, &inputs.1, i))?
    };

    // One job per row of C
    let jobs: Vec<_> = (0..n)
        .map(|i| -> Result<_> {
            let status = StatusHandle::new();
            let result = pool.submit_with_result(i, Some(status.clone()))?;
            Ok((status, result))
        })
        .collect::<Result<_>>()?;

    // Poll the statuses the way a progress display would
    loop {
        let completed = jobs
            .iter()
            .filter(|(status, _)| status.get() == JobStatus::Completed)
            .count();
        if completed == n {
            break;
        }
        if jobs
            .iter()
            .any(|(status, _)| status.get() == JobStatus::Failed)
        {
            // The result handle carries the panic message
            break;
        }
        std::thread::sleep(Duration::from_millis(1));
    }

    let mut c = Vec::with_capacity(n * n);
    let mut total = 0.0;
    for (_, result) in jobs {
        let (row, sum) = result.wait()?;
        c.extend_from_slice(&row);
        total += sum;
    }

    let elapsed = started.elapsed();
    pool.shutdown()?;

    println!("N={}, TotalSum={}", n, total);
    println!(
        "{} rows on {} threads in {:.1?} (avg queue wait {:.0}us)",
        c.len() / n,
        threads,
        elapsed,
        pool.stats().avg_queue_wait_us
    );
    Ok(())
}
