//! Benchmarks for packing and traversal
//!
//! Compares pack and traversal cost across level formats for the same
//! coordinate stream.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use fibra_core::{DataType, Format, Value};
use fibra_sparse::{Packer, Tensor, Traversal};
use std::hint::black_box;

/// Pseudo-random coordinates of a square matrix, reproducible across runs
fn random_records(n: usize, nnz: usize) -> Vec<(Vec<usize>, Value)> {
    let mut seed = 12345u64;
    let mut next = move || {
        seed = seed.wrapping_mul(1103515245).wrapping_add(12345);
        seed
    };
    (0..nnz)
        .map(|_| {
            let i = (next() % n as u64) as usize;
            let j = (next() % n as u64) as usize;
            let v = (next() % 10000) as f64 / 10000.0;
            (vec![i, j], Value::Float64(v))
        })
        .collect()
}

fn formats() -> Vec<(&'static str, Format)> {
    vec![
        ("csr", Format::csr()),
        ("csc", Format::csc()),
        ("dcsr", Format::dcsr()),
    ]
}

/// Benchmark packing an unordered record stream
fn bench_pack(c: &mut Criterion) {
    let mut group = c.benchmark_group("pack");

    for size in [100, 1000].iter() {
        for density in [0.01, 0.05].iter() {
            let nnz = ((size * size) as f64 * density) as usize;
            let records = random_records(*size, nnz);
            let dims = [*size, *size];
            group.throughput(Throughput::Elements(nnz as u64));

            for (name, format) in formats() {
                group.bench_with_input(
                    BenchmarkId::new(name, format!("{}x{}_d{}", size, size, density)),
                    &records,
                    |b, records| {
                        b.iter(|| {
                            let storage = Packer::new(&dims, &format, DataType::Float64)
                                .pack(records.iter().map(|(c, v)| (c.as_slice(), *v)))
                                .expect("pack failed");
                            black_box(storage)
                        });
                    },
                );
            }
        }
    }

    group.finish();
}

/// Benchmark traversing packed storage
fn bench_traverse(c: &mut Criterion) {
    let mut group = c.benchmark_group("traverse");

    for size in [100, 1000].iter() {
        let nnz = size * size / 20;
        let records = random_records(*size, nnz);

        for (name, format) in formats() {
            let tensor = Tensor::new("A", DataType::Float64, &[*size, *size], format.clone())
                .expect("tensor creation failed");
            for (coord, value) in &records {
                tensor.insert_value(coord, *value).expect("insert failed");
            }
            tensor.pack().expect("pack failed");
            let storage = tensor.storage().expect("not packed");
            group.throughput(Throughput::Elements(storage.index().size() as u64));

            group.bench_function(BenchmarkId::new(name, size), |b| {
                b.iter(|| {
                    let sum: f64 = Traversal::new(&storage, &format)
                        .expect("traversal failed")
                        .typed::<f64>()
                        .expect("wrong kind")
                        .map(|(_, v)| v)
                        .sum();
                    black_box(sum)
                });
            });
        }
    }

    group.finish();
}

criterion_group!(benches, bench_pack, bench_traverse);
criterion_main!(benches);
