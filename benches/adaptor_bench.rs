use commchain::{Adaptor, AdaptorConfig, ElementKind, Fan};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::thread;

fn config(no_copy: bool, active: bool) -> AdaptorConfig {
    AdaptorConfig::uniform(Fan::OneToN, 2, ElementKind::F32, 1024)
        .with_buffer_size(16)
        .with_n_frames(4)
        .with_no_copy_push(no_copy)
        .with_no_copy_pull(no_copy)
        .with_active_waiting(active)
}

fn bench_push_pull(c: &mut Criterion) {
    for (label, no_copy) in [("copy", false), ("no_copy", true)] {
        let mut adaptor = Adaptor::new(config(no_copy, false)).unwrap();
        c.bench_function(&format!("push_pull_{}", label), |b| {
            b.iter(|| {
                black_box(adaptor.push().unwrap());
                black_box(adaptor.pull().unwrap());
            })
        });
    }
}

fn bench_cross_thread(c: &mut Criterion) {
    // One batch = 1000 pushes on this thread, 1000 pulls on another.
    for (label, active) in [("passive", false), ("active", true)] {
        let mut producer = Adaptor::new(config(true, active)).unwrap();
        c.bench_function(&format!("cross_thread_1000_{}", label), |b| {
            b.iter(|| {
                let mut consumer = producer.lane(0).unwrap();
                thread::scope(|s| {
                    s.spawn(move || {
                        for _ in 0..1000 {
                            black_box(consumer.pull().unwrap());
                        }
                    });
                    for _ in 0..1000 {
                        black_box(producer.push().unwrap());
                    }
                });
            })
        });
    }
}

criterion_group!(benches, bench_push_pull, bench_cross_thread);
criterion_main!(benches);
