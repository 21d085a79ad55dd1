use core::hint::black_box;
use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use linkflake::{
    IdGenStatus, LockSnowflakeGenerator, NodeIdentity, SnowflakeGenerator, SystemClock, TimeSource,
};
use std::{
    sync::{Arc, Barrier},
    thread::scope,
    time::Instant,
};

struct FixedMockTime {
    millis: u64,
}

impl TimeSource for FixedMockTime {
    fn current_millis(&self) -> u64 {
        self.millis
    }
}

// Number of IDs generated per benchmark iteration. Exactly one millisecond's
// worth, so a fixed clock never exhausts the sequence.
const TOTAL_IDS: usize = 4096;

fn fixed_generator() -> LockSnowflakeGenerator<FixedMockTime> {
    let node = NodeIdentity::new(1, 1).expect("valid node");
    LockSnowflakeGenerator::with_node(node, FixedMockTime { millis: 1 })
}

fn system_generator() -> LockSnowflakeGenerator<SystemClock> {
    let node = NodeIdentity::new(1, 1).expect("valid node");
    LockSnowflakeGenerator::with_node(node, SystemClock::default())
}

/// Benchmarks the hot path where every poll is `Ready`.
fn bench_poll(c: &mut Criterion) {
    let mut group = c.benchmark_group("lock/poll/fixed");
    group.throughput(Throughput::Elements(TOTAL_IDS as u64));

    group.bench_function(format!("elems/{TOTAL_IDS}"), |b| {
        b.iter_custom(|iters| {
            let start = Instant::now();

            for _ in 0..iters {
                let generator = fixed_generator();
                for _ in 0..TOTAL_IDS {
                    match generator.try_poll_id() {
                        Ok(IdGenStatus::Ready { id }) => {
                            black_box(id);
                        }
                        other => unreachable!("{other:?}"),
                    }
                }
            }

            start.elapsed()
        });
    });

    group.finish();
}

/// Benchmarks blocking generation against the wall clock, including
/// sequence-exhaustion waits.
fn bench_next_id<G>(c: &mut Criterion, group_name: &str, generator_factory: impl Fn() -> G)
where
    G: SnowflakeGenerator,
{
    let mut group = c.benchmark_group(group_name);
    group.throughput(Throughput::Elements(TOTAL_IDS as u64));

    group.bench_function(format!("elems/{TOTAL_IDS}"), |b| {
        b.iter_custom(|iters| {
            let start = Instant::now();

            for _ in 0..iters {
                let generator = generator_factory();
                for _ in 0..TOTAL_IDS {
                    black_box(generator.next_id().expect("id"));
                }
            }

            start.elapsed()
        });
    });

    group.finish();
}

/// Benchmarks a shared generator across threads.
fn bench_next_id_contended<G>(c: &mut Criterion, group_name: &str, generator_fn: impl Fn() -> G)
where
    G: SnowflakeGenerator + Send + Sync,
{
    let mut group = c.benchmark_group(group_name);

    for thread_count in [1, 2, 4, 8, 16] {
        let ids_per_thread = TOTAL_IDS / thread_count;

        group.throughput(Throughput::Elements(TOTAL_IDS as u64));
        group.bench_function(format!("elems/{TOTAL_IDS}/threads/{thread_count}"), |b| {
            b.iter_custom(|iters| {
                let start = Instant::now();

                for _ in 0..iters {
                    let generator = Arc::new(generator_fn());
                    let barrier = Arc::new(Barrier::new(thread_count + 1));
                    scope(|s| {
                        for _ in 0..thread_count {
                            let generator = Arc::clone(&generator);
                            let barrier = Arc::clone(&barrier);
                            s.spawn(move || {
                                barrier.wait();
                                for _ in 0..ids_per_thread {
                                    black_box(generator.next_id().expect("id"));
                                }
                            });
                        }
                        barrier.wait();
                    });
                }

                start.elapsed()
            });
        });
    }

    group.finish();
}

fn benchmark_lock_fixed(c: &mut Criterion) {
    bench_next_id(c, "lock/next_id/fixed", fixed_generator);
}

fn benchmark_lock_system(c: &mut Criterion) {
    bench_next_id(c, "lock/next_id/system_clock", system_generator);
}

fn benchmark_lock_contended_fixed(c: &mut Criterion) {
    bench_next_id_contended(c, "lock/contended/fixed", fixed_generator);
}

fn benchmark_lock_contended_system(c: &mut Criterion) {
    bench_next_id_contended(c, "lock/contended/system_clock", system_generator);
}

criterion_group!(
    benches,
    bench_poll,
    benchmark_lock_fixed,
    benchmark_lock_system,
    benchmark_lock_contended_fixed,
    benchmark_lock_contended_system,
);
criterion_main!(benches);
