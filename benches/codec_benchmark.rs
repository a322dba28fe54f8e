//! Criterion benchmarks for the three pipeline stages.

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use graycrypt::{compress, decrypt, encrypt_with_salt_source, Image, Salt};

const KEY: &[u8] = b"benchmark key of thirty-two byte";
const SALT: Salt = [7u8; 16];

/// Deterministic pattern with enough local structure to compress.
fn generate_pattern_image(width: usize, height: usize) -> Vec<u8> {
    let mut data = vec![0u8; width * height];
    for y in 0..height {
        for x in 0..width {
            data[y * width + x] = (((x * 7 + y * 13) ^ (x * y)) % 256) as u8;
        }
    }
    data
}

fn benchmark_pipeline(c: &mut Criterion) {
    let sizes: &[(usize, usize, &str)] = &[
        (64, 64, "64x64"),
        (256, 256, "256x256"),
        (512, 512, "512x512"),
    ];

    let mut group = c.benchmark_group("encrypt");
    for &(width, height, label) in sizes {
        let img = Image::from_gray(generate_pattern_image(width, height), width, height).unwrap();
        group.throughput(Throughput::Bytes((width * height) as u64));
        group.bench_function(label, |b| {
            b.iter(|| encrypt_with_salt_source(black_box(&img), KEY, || SALT).unwrap())
        });
    }
    group.finish();

    let mut group = c.benchmark_group("compress");
    for &(width, height, label) in sizes {
        let img = Image::from_gray(generate_pattern_image(width, height), width, height).unwrap();
        let enc = encrypt_with_salt_source(&img, KEY, || SALT).unwrap();
        group.throughput(Throughput::Bytes((width * height) as u64));
        group.bench_function(label, |b| {
            b.iter(|| compress(black_box(&enc), 4).unwrap())
        });
    }
    group.finish();

    let mut group = c.benchmark_group("decrypt");
    for &(width, height, label) in sizes {
        let img = Image::from_gray(generate_pattern_image(width, height), width, height).unwrap();
        let enc = encrypt_with_salt_source(&img, KEY, || SALT).unwrap();
        let comp = compress(&enc, 4).unwrap();
        group.throughput(Throughput::Bytes((width * height) as u64));
        group.bench_function(label, |b| {
            b.iter(|| decrypt(black_box(&comp), KEY).unwrap())
        });
    }
    group.finish();
}

criterion_group!(benches, benchmark_pipeline);
criterion_main!(benches);
