use biodata_export::capture::{CaptureTarget, MemoryCapturer};
use biodata_export::download::MemorySink;
use biodata_export::pdf::{plan_pages, PageGeometry};
use biodata_export::rendering::crop::{crop_to_content, BackgroundMatcher};
use biodata_export::rendering::raster::{ensure_within_limit, MAX_BLOB_PIXELS};
use biodata_export::{Bitmap, ExportConfig, Exporter, ImageMime, PlatformProfile, Rgb};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use image::{Rgba, RgbaImage};

fn preview(width: u32, height: u32) -> Bitmap {
    let mut img = RgbaImage::from_pixel(width, height, Rgba([255, 255, 255, 255]));
    for y in height / 8..height * 7 / 8 {
        for x in width / 10..width * 9 / 10 {
            img.put_pixel(x, y, Rgba([(x % 200) as u8, (y % 200) as u8, 90, 255]));
        }
    }
    Bitmap::from_image(img)
}

fn bench_crop(c: &mut Criterion) {
    // A4-ish preview at 2x density
    let bmp = preview(1588, 2246);
    let matcher = BackgroundMatcher::new(Rgb::WHITE);
    c.bench_function("crop_to_content_a4_2x", |b| {
        b.iter(|| crop_to_content(black_box(bmp.clone()), &matcher))
    });
}

fn bench_guard(c: &mut Criterion) {
    let bmp = preview(2400, 3400);
    c.bench_function("ensure_within_blob_ceiling", |b| {
        b.iter(|| ensure_within_limit(black_box(bmp.clone()), MAX_BLOB_PIXELS))
    });
}

fn bench_paginate(c: &mut Criterion) {
    c.bench_function("plan_pages_tall", |b| {
        b.iter(|| plan_pages(black_box(1588), black_box(9000), PageGeometry::a4()).unwrap())
    });
}

fn bench_export_pdf(c: &mut Criterion) {
    let mut capturer = MemoryCapturer::new();
    capturer.mount("#preview", preview(794, 1123));
    let config = ExportConfig { profile: PlatformProfile::mobile(), ..Default::default() };
    let exporter = Exporter::new(capturer, MemorySink::new(), config);
    let target = CaptureTarget::new("#preview");
    c.bench_function("render_pdf_a4_1x", |b| b.iter(|| exporter.render_pdf(Some(&target)).unwrap()));
    c.bench_function("render_png_a4_1x", |b| {
        b.iter(|| exporter.render_image(Some(&target), ImageMime::Png).unwrap())
    });
}

criterion_group!(benches, bench_crop, bench_guard, bench_paginate, bench_export_pdf);
criterion_main!(benches);
