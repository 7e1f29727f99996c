//! Property-based tests for ring_pool using proptest

use proptest::prelude::*;
use ring_pool::prelude::*;
use ring_pool::queue::{BoundedQueue, RingError};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Clone, Debug)]
enum Op {
    Push(u16),
    Pop,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![any::<u16>().prop_map(Op::Push), Just(Op::Pop)]
}

// ============================================================================
// BoundedQueue Tests
// ============================================================================

proptest! {
    /// Any push/pop sequence behaves like a capped VecDeque
    #[test]
    fn test_queue_matches_model(
        capacity in 2usize..16,
        ops in prop::collection::vec(op_strategy(), 0..200)
    ) {
        let mut queue = BoundedQueue::new(capacity).unwrap();
        let mut model = VecDeque::new();

        for op in ops {
            match op {
                Op::Push(v) => {
                    let result = queue.push_back(v);
                    if model.len() == capacity {
                        let rejected = result.unwrap_err();
                        prop_assert_eq!(rejected.into_inner(), v);
                    } else {
                        prop_assert!(result.is_ok());
                        model.push_back(v);
                    }
                }
                Op::Pop => match model.pop_front() {
                    Some(expected) => prop_assert_eq!(queue.pop_front(), Ok(expected)),
                    None => prop_assert_eq!(queue.pop_front(), Err(RingError::Empty)),
                },
            }

            prop_assert_eq!(queue.len(), model.len());
            prop_assert!(queue.len() <= capacity);
            prop_assert_eq!(queue.is_full(), model.len() == capacity);
            prop_assert_eq!(queue.is_empty(), model.is_empty());
        }

        let rest: Vec<_> = queue.drain().collect();
        prop_assert_eq!(rest, model.into_iter().collect::<Vec<_>>());
    }

    /// Capacities below 2 are rejected
    #[test]
    fn test_queue_small_capacity(capacity in 0usize..2) {
        prop_assert_eq!(
            BoundedQueue::<u8>::new(capacity).unwrap_err(),
            RingError::InvalidCapacity { capacity }
        );
    }
}

// ============================================================================
// WorkerPoolConfig Tests
// ============================================================================

proptest! {
    /// Any positive pool size and capacity above 1 validates
    #[test]
    fn test_config_valid(
        pool_size in 1usize..64,
        capacity in 2usize..100_000,
        prefix in "[a-z]{3,10}"
    ) {
        let config = WorkerPoolConfig::new(pool_size, capacity)
            .with_thread_name_prefix(&prefix);
        prop_assert!(config.validate().is_ok());
    }

    /// JSON round trip keeps every field
    #[test]
    fn test_config_json_round_trip(
        pool_size in 1usize..64,
        capacity in 2usize..100_000,
        abandon in any::<bool>()
    ) {
        let policy = if abandon { ShutdownPolicy::Abandon } else { ShutdownPolicy::Drain };
        let config = WorkerPoolConfig::new(pool_size, capacity).with_shutdown_policy(policy);
        let json = serde_json::to_string(&config).unwrap();
        prop_assert_eq!(WorkerPoolConfig::from_json(&json).unwrap(), config);
    }
}

// ============================================================================
// Job Execution Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Every accepted job's result handle holds its own output
    #[test]
    fn test_results_match_inputs(
        pool_size in 1usize..8,
        values in prop::collection::vec(any::<i32>(), 1..64)
    ) {
        let pool = WorkerPool::new(pool_size, 64, |x: i32| i64::from(x) * 2).unwrap();

        let handles: Vec<_> = values
            .iter()
            .map(|&x| pool.submit_with_result(x, None).unwrap())
            .collect();

        for (x, handle) in values.iter().zip(handles) {
            prop_assert_eq!(handle.wait().unwrap(), i64::from(*x) * 2);
        }
        pool.shutdown().unwrap();
    }

    /// Accepted plus rejected submissions account for every attempt, and
    /// every accepted job runs before shutdown returns
    #[test]
    fn test_no_job_lost(
        pool_size in 1usize..4,
        capacity in 2usize..16,
        submit_count in 1usize..100
    ) {
        let handled = Arc::new(AtomicUsize::new(0));
        let handled_clone = Arc::clone(&handled);
        let pool = WorkerPool::new(pool_size, capacity, move |_: usize| {
            handled_clone.fetch_add(1, Ordering::SeqCst);
        }).unwrap();

        let mut accepted = 0;
        let mut rejected = 0;
        for i in 0..submit_count {
            match pool.execute(i) {
                Ok(()) => accepted += 1,
                Err(PoolError::CapacityExceeded { .. }) => rejected += 1,
                Err(e) => panic!("Unexpected error: {:?}", e),
            }
        }

        pool.shutdown().unwrap();

        prop_assert_eq!(accepted + rejected, submit_count);
        prop_assert_eq!(handled.load(Ordering::SeqCst), accepted);
        let stats = pool.stats();
        prop_assert_eq!(stats.jobs_submitted as usize, accepted);
        prop_assert_eq!(stats.jobs_rejected as usize, rejected);
    }

    /// Workers survive any number of panicking transforms
    #[test]
    fn test_panic_isolation(
        panic_count in 1usize..10,
        success_count in 1usize..10
    ) {
        let pool = WorkerPool::new(2, 32, |fail: bool| {
            if fail {
                panic!("Intentional panic for testing");
            }
        }).unwrap();

        let failed: Vec<_> = (0..panic_count)
            .map(|_| pool.submit_with_result(true, None).unwrap())
            .collect();
        let succeeded: Vec<_> = (0..success_count)
            .map(|_| pool.submit_with_result(false, None).unwrap())
            .collect();

        for handle in failed {
            let is_transform_failure =
                matches!(handle.wait(), Err(PoolError::TransformFailure { .. }));
            prop_assert!(is_transform_failure);
        }
        for handle in succeeded {
            prop_assert!(handle.wait().is_ok());
        }
        pool.shutdown().unwrap();
    }

    /// Shutdown is always safe, and repeatable
    #[test]
    fn test_double_shutdown_safe(pool_size in 1usize..4, jobs in 0usize..8) {
        let pool = WorkerPool::new(pool_size, 8, |x: usize| x).unwrap();
        for x in 0..jobs {
            pool.execute(x).unwrap();
        }
        prop_assert!(pool.shutdown().is_ok());
        prop_assert!(pool.shutdown().is_ok());
        let is_shutting_down = matches!(pool.execute(0), Err(PoolError::ShuttingDown { .. }));
        prop_assert!(is_shutting_down);
    }
}
