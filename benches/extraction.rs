use criterion::{Criterion, black_box, criterion_group, criterion_main};
use dominant_colors::{ColorExtractor, ExtractorConfig, NullSink};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use std::io::Cursor;
use std::sync::Arc;

fn photo_like(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        Rgb([
            (x * 255 / width) as u8,
            (y * 255 / height) as u8,
            ((x ^ y) & 0xff) as u8,
        ])
    });
    let mut buf = Vec::new();
    DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .unwrap();
    buf
}

fn benchmark_extraction(c: &mut Criterion) {
    let extractor = ColorExtractor::new(ExtractorConfig::default(), Arc::new(NullSink));
    let frame = photo_like(640, 480);
    let upload = photo_like(1920, 1080);

    c.bench_function("extract_frame_640x480_k3", |b| {
        b.iter(|| extractor.extract(black_box(&frame), 3).unwrap())
    });
    c.bench_function("extract_upload_1920x1080_k5", |b| {
        b.iter(|| extractor.extract(black_box(&upload), 5).unwrap())
    });
}

criterion_group!(benches, benchmark_extraction);
criterion_main!(benches);
