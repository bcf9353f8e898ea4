//! Benchmarks for WAL append and replay throughput.

use bytes::Bytes;
use criterion::{criterion_group, criterion_main, BatchSize, Criterion, Throughput};
use tempfile::TempDir;
use vecwal::{record_size, LogRecord, MutationType, WalBuffer, WalOptionsBuilder};

/// A 128-dimension f32 vector insert, the common payload shape.
fn vector_insert(id: i64) -> LogRecord {
    let dim = 128;
    let mut data = Vec::with_capacity(dim * 4);
    for i in 0..dim {
        data.extend_from_slice(&((id as f32) + i as f32).to_le_bytes());
    }
    LogRecord::insert("bench", "p0", vec![id], Bytes::from(data))
}

fn open_wal(dir: &TempDir) -> WalBuffer {
    let options = WalOptionsBuilder::new(dir.path())
        .buffer_size(8 * 1024 * 1024)
        .build()
        .unwrap();
    let mut wal = WalBuffer::new(&options).unwrap();
    wal.init(0, 0).unwrap();
    wal
}

fn bench_append(c: &mut Criterion) {
    let record_bytes = record_size(&vector_insert(0)) as u64;

    let mut group = c.benchmark_group("append");
    group.throughput(Throughput::Bytes(record_bytes));
    group.bench_function("vector_insert_512b", |b| {
        let dir = TempDir::new().unwrap();
        let wal = open_wal(&dir);
        let mut id = 0i64;
        b.iter(|| {
            let mut record = vector_insert(id);
            id += 1;
            wal.append(&mut record).unwrap()
        });
    });
    group.finish();
}

fn bench_replay(c: &mut Criterion) {
    const NUM_RECORDS: i64 = 2_000;
    let record_bytes = record_size(&vector_insert(0)) as u64;

    let dir = TempDir::new().unwrap();
    let end = {
        let wal = open_wal(&dir);
        let mut end = 0;
        for id in 0..NUM_RECORDS {
            end = wal.append(&mut vector_insert(id)).unwrap();
        }
        end
    };

    let mut group = c.benchmark_group("replay");
    group.throughput(Throughput::Bytes(record_bytes * NUM_RECORDS as u64));
    group.bench_function("full_recovery", |b| {
        b.iter_batched(
            || {
                let options = WalOptionsBuilder::new(dir.path())
                    .buffer_size(8 * 1024 * 1024)
                    .build()
                    .unwrap();
                let mut wal = WalBuffer::new(&options).unwrap();
                wal.init(0, end).unwrap();
                wal
            },
            |wal| {
                let mut out = LogRecord::default();
                let mut count = 0;
                loop {
                    wal.next(end, &mut out).unwrap();
                    if out.mutation == MutationType::None {
                        break;
                    }
                    count += 1;
                }
                assert_eq!(count, NUM_RECORDS);
            },
            BatchSize::LargeInput,
        );
    });
    group.finish();
}

criterion_group!(benches, bench_append, bench_replay);
criterion_main!(benches);
