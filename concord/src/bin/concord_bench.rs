//! Throughput benchmark for the queue, sharded map, and hash ring.
//!
//! Usage:
//!     cargo run --release --bin concord_bench
//!
//! Environment variables:
//!     CONCORD_THREADS=4          Worker threads per benchmark (default: 4)
//!     CONCORD_ITERATIONS=1000000 Operations per thread (default: 1 << 20)
//!     PIN_CPUS=1                 Pin worker N to core N (default: off)

use std::env;
use std::hint;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Instant;

use concord::atomic::Uint64;
use concord::{HashRing, Queue, ShardedMap};

/// Benchmark parameters read from the environment.
#[derive(Debug, Clone, Copy)]
struct BenchConfig {
    threads: usize,
    iterations: u64,
    pin_cpus: bool,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            threads: 4,
            iterations: 1 << 20,
            pin_cpus: false,
        }
    }
}

impl BenchConfig {
    fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            threads: env::var("CONCORD_THREADS")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|&n| n > 0)
                .unwrap_or(defaults.threads),
            iterations: env::var("CONCORD_ITERATIONS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.iterations),
            pin_cpus: env::var("PIN_CPUS").is_ok_and(|s| s == "1"),
        }
    }
}

fn pin_to_cpu(config: BenchConfig, worker: usize) {
    if config.pin_cpus {
        core_affinity::set_for_current(core_affinity::CoreId { id: worker });
    }
}

/// Runs `work(worker)` on every configured thread after a common start signal
/// and returns total operations per millisecond.
fn run_parallel<F>(config: BenchConfig, work: F) -> u128
where
    F: Fn(usize) + Send + Sync + 'static,
{
    let work = Arc::new(work);
    let go = Arc::new(AtomicBool::new(false));

    let handles: Vec<_> = (0..config.threads)
        .map(|worker| {
            let work = Arc::clone(&work);
            let go = Arc::clone(&go);
            thread::spawn(move || {
                pin_to_cpu(config, worker);
                while !go.load(Ordering::Acquire) {
                    hint::spin_loop();
                }
                work(worker);
            })
        })
        .collect();

    let start = Instant::now();
    go.store(true, Ordering::Release);
    for h in handles {
        h.join().expect("benchmark worker panicked");
    }
    let elapsed = start.elapsed();

    let total_ops = u128::from(config.iterations) * config.threads as u128;
    total_ops * 1_000_000 / elapsed.as_nanos().max(1)
}

fn bench_queue(config: BenchConfig) {
    let queue = Arc::new(Queue::new());
    let iterations = config.iterations;

    let q = Arc::clone(&queue);
    let ops = run_parallel(config, move |worker| {
        for i in 0..iterations {
            if worker % 2 == 0 {
                q.push(i);
            } else {
                let _ = q.pop();
            }
        }
    });

    println!("queue push/pop:   {ops} ops/ms (residual len {})", queue.len());
}

fn bench_map(config: BenchConfig) {
    let map = Arc::new(ShardedMap::new());
    let counter = Arc::new(Uint64::default());
    let iterations = config.iterations;

    let m = Arc::clone(&map);
    let ops = run_parallel(config, move |_| {
        for _ in 0..iterations {
            let key = counter.incr(1);
            m.set(key, key);
            let _ = m.get(&(key / 2));
        }
    });

    println!("map set+get:      {ops} ops/ms (len {})", map.len());
}

fn bench_ring(config: BenchConfig) {
    let hosts: Vec<String> = (1..=9).map(|i| format!("192.168.1.135:355{i}")).collect();
    let ring = Arc::new(HashRing::new(hosts));
    let iterations = config.iterations;

    let r = Arc::clone(&ring);
    let ops = run_parallel(config, move |worker| {
        for i in 0..iterations {
            let key = format!("{worker}-{i}");
            hint::black_box(r.get(key.as_str()).expect("ring has servers"));
        }
    });

    println!("ring get:         {ops} ops/ms ({} servers)", ring.len());
}

fn main() {
    concord::init_tracing();

    let config = BenchConfig::from_env();
    println!(
        "threads={} iterations={} pin_cpus={}",
        config.threads, config.iterations, config.pin_cpus
    );

    bench_queue(config);
    bench_map(config);
    bench_ring(config);
}
