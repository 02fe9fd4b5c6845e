use std::time::Duration;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use sqlkv::{ClientConfig, ConnectionProvider, Record, workload::build_key};

const SAMPLE_SIZE: usize = 20;
const WARM_UP: Duration = Duration::from_millis(300);
const MEASURE: Duration = Duration::from_millis(500);

fn bench_ops() -> u64 {
    if cfg!(feature = "bench-ci") { 500 } else { 5_000 }
}

/// Alternating insert and read of the same key: every read forces the
/// pending batch out, so batching degrades to one row per round trip.
fn bench_interleaved(c: &mut Criterion) {
    let mut group = c.benchmark_group("read_after_write");
    group.sample_size(SAMPLE_SIZE);
    group.warm_up_time(WARM_UP);
    group.measurement_time(MEASURE);
    let ops = bench_ops();
    for batch_size in [0u32, 10] {
        group.bench_function(BenchmarkId::from_parameter(format!("batch_{batch_size}")), |b| {
            b.iter(|| {
                let config = ClientConfig {
                    batch_size,
                    ..ClientConfig::default()
                };
                let client = ConnectionProvider::new(config).client().expect("client");
                let mut values = Record::new();
                values.insert("field0".to_string(), "value".to_string());
                let mut row = Record::new();
                for idx in 0..ops {
                    let key = build_key(idx);
                    let _ = client.insert(client.table(), &key, &values);
                    row.clear();
                    let _ = client.read(client.table(), &key, None, &mut row);
                }
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_interleaved);
criterion_main!(benches);
