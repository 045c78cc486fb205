//! Benchmarks for the Lumen hot paths that run on every invocation.
//!
//! Run with: cargo bench -p lumen-core

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use image::DynamicImage;
use lumen_core::pipeline::naming::unique_name;
use lumen_core::pipeline::{
    DecodedImage, EncodeOptions, FileDiscovery, Hasher, RasterCodec, ThumbnailGenerator,
};
use lumen_core::Config;
use std::path::Path;

fn benchmark_unique_name(c: &mut Criterion) {
    let root = Path::new("/work/site");
    let path = Path::new("./docs/guides/../images/Hero Shot (final).png");

    c.bench_function("unique_name", |b| {
        b.iter(|| unique_name(black_box(path), black_box(root)))
    });
}

fn benchmark_content_hash(c: &mut Criterion) {
    let data: Vec<u8> = (0..1_000_000u32).map(|i| (i % 251) as u8).collect();

    c.bench_function("content_hash_1mb", |b| {
        b.iter(|| Hasher::content_hash_from_bytes(black_box(&data)))
    });
}

fn benchmark_scan(c: &mut Criterion) {
    let dir = tempfile::tempdir().unwrap();
    for section in 0..20 {
        let section_dir = dir.path().join(format!("docs/section-{section}"));
        std::fs::create_dir_all(&section_dir).unwrap();
        for i in 0..25 {
            std::fs::write(section_dir.join(format!("image-{i}.png")), b"").unwrap();
            std::fs::write(section_dir.join(format!("page-{i}.md")), b"").unwrap();
        }
    }
    let config = Config::default();
    let paths = config.resolve(dir.path());
    let discovery = FileDiscovery::new(&config, &paths).unwrap();

    c.bench_function("scan_500_images", |b| {
        b.iter(|| discovery.discover(black_box(&paths.images_base)))
    });
}

fn benchmark_thumbnail(c: &mut Criterion) {
    let image = DecodedImage::new(DynamicImage::new_rgb8(1920, 1080));
    let generator = ThumbnailGenerator::new(20);
    let options = EncodeOptions::from_config(&Config::default());

    c.bench_function("thumbnail_20px", |b| {
        b.iter(|| generator.generate(&RasterCodec, black_box(&image), &options))
    });
}

criterion_group!(
    benches,
    benchmark_unique_name,
    benchmark_content_hash,
    benchmark_scan,
    benchmark_thumbnail,
);
criterion_main!(benches);
