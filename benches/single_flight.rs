use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use memolock::Coordinator;
use tokio::runtime::Runtime;

#[path = "../tests/support/mod.rs"]
mod support;
use support::FakeStore;

fn bench_contention(c: &mut Criterion) {
    let rt = Runtime::new().expect("tokio runtime");
    let mut group = c.benchmark_group("single_flight_contention");

    for &callers in &[2_usize, 16, 64] {
        group.bench_with_input(BenchmarkId::from_parameter(callers), &callers, |b, &callers| {
            b.iter(|| {
                rt.block_on(async {
                    let store = Arc::new(FakeStore::new());
                    let coordinator = Arc::new(Coordinator::new(store, "bench").await.unwrap());
                    let computed = Arc::new(AtomicUsize::new(0));

                    let mut handles = Vec::with_capacity(callers);
                    for _ in 0..callers {
                        let coordinator = coordinator.clone();
                        let computed = computed.clone();
                        handles.push(tokio::spawn(async move {
                            coordinator
                                .get_resource("hot", Duration::from_secs(5), || {
                                    let computed = computed.clone();
                                    async move {
                                        computed.fetch_add(1, Ordering::SeqCst);
                                        Ok::<_, std::convert::Infallible>((
                                            "value".to_string(),
                                            Duration::from_secs(60),
                                        ))
                                    }
                                })
                                .await
                        }));
                    }
                    for handle in handles {
                        handle.await.unwrap().unwrap();
                    }
                    coordinator.close();
                });
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_contention);
criterion_main!(benches);
