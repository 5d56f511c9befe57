use std::hint::black_box;

use chafa_core::batch::{self, BatchInfo};
use chafa_core::color::Color8;
use chafa_core::palette::pnn::{self, Quality};
use chafa_core::symbols::SymbolMap;
use criterion::{criterion_group, criterion_main, Criterion, Throughput};

fn make_noisy_pixels(n: usize) -> Vec<Color8> {
    (0..n)
        .map(|i| {
            let r = (i * 37 % 256) as u8;
            let g = (i * 59 % 256) as u8;
            let b = (i * 83 % 256) as u8;
            Color8::opaque(r, g, b)
        })
        .collect()
}

fn bench_pnn_quantizer(c: &mut Criterion) {
    let pixels = make_noisy_pixels(64 * 64);
    let mut group = c.benchmark_group("pnn_quantizer");
    group.throughput(Throughput::Elements(pixels.len() as u64));
    group.bench_function("build_dynamic_palette_240", |b| {
        b.iter(|| pnn::build_dynamic_palette(black_box(&pixels), 240, 128, Quality(0.5)));
    });
    group.finish();
}

fn bench_batch_scheduler(c: &mut Criterion) {
    let n_rows = 4096u32;
    let mut group = c.benchmark_group("batch_scheduler");
    group.throughput(Throughput::Elements(n_rows as u64));
    group.bench_function("process_batches_row_sum", |b| {
        b.iter(|| {
            let mut totals = vec![0u64; n_rows as usize];
            batch::process_batches(
                n_rows,
                batch::n_actual_threads(),
                16,
                |batch: BatchInfo| (batch.first_row..batch.first_row + batch.n_rows).map(|row| row as u64 * row as u64).collect::<Vec<_>>(),
                |batch: BatchInfo, results: Vec<u64>| {
                    for (i, v) in results.into_iter().enumerate() {
                        totals[batch.first_row as usize + i] = v;
                    }
                },
            );
            black_box(totals);
        });
    });
    group.finish();
}

fn bench_symbol_hamming_search(c: &mut Criterion) {
    let prepared = SymbolMap::default().prepare();
    let targets: Vec<u64> = (0u64..256).map(|i| i.wrapping_mul(0x9e3779b97f4a7c15)).collect();
    let mut group = c.benchmark_group("symbol_hamming_search");
    group.throughput(Throughput::Elements(targets.len() as u64));
    group.bench_function("find_candidates_k8", |b| {
        b.iter(|| {
            for &t in &targets {
                black_box(prepared.find_candidates(black_box(t), 8));
            }
        });
    });
    group.finish();
}

criterion_group!(name = hot_loops; config = Criterion::default(); targets = bench_pnn_quantizer, bench_batch_scheduler, bench_symbol_hamming_search);
criterion_main!(hot_loops);
