use criterion::{criterion_group, criterion_main, Criterion};
use imgfind::image::transform::{concat, rotate};
use imgfind::{Direction, ImageBuffer, MatchConfig, MatchRequest, Matcher, MaxLevel};
use std::hint::black_box;

fn make_image(width: usize, height: usize) -> Vec<u8> {
    let mut data = Vec::with_capacity(width * height);
    for y in 0..height {
        for x in 0..width {
            let value = ((x * 13) ^ (y * 7) ^ (x * y)) & 0xFF;
            data.push(value as u8);
        }
    }
    data
}

fn extract_patch(
    image: &[u8],
    img_width: usize,
    x0: usize,
    y0: usize,
    width: usize,
    height: usize,
) -> Vec<u8> {
    let mut out = Vec::with_capacity(width * height);
    for y in 0..height {
        let row = (y0 + y) * img_width;
        out.extend_from_slice(&image[row + x0..row + x0 + width]);
    }
    out
}

fn bench_matcher(c: &mut Criterion) {
    let img_width = 720;
    let img_height = 1280;
    let image = make_image(img_width, img_height);
    let tpl_width = 96;
    let tpl_height = 64;
    let tpl = extract_patch(&image, img_width, 300, 900, tpl_width, tpl_height);

    let request = |max_level: MaxLevel| {
        MatchRequest::new(
            ImageBuffer::from_gray(image.clone(), img_width as u32, img_height as u32).unwrap(),
            ImageBuffer::from_gray(tpl.clone(), tpl_width as u32, tpl_height as u32).unwrap(),
        )
        .with_max_level(max_level)
    };

    let matcher = Matcher::new();
    c.bench_function("find_auto_level", |b| {
        b.iter(|| black_box(matcher.find(black_box(request(MaxLevel::Auto))).unwrap()))
    });
    c.bench_function("find_level_1", |b| {
        b.iter(|| black_box(matcher.find(black_box(request(MaxLevel::Fixed(1)))).unwrap()))
    });

    let parallel = Matcher::new().with_config(MatchConfig {
        parallel: true,
        ..MatchConfig::default()
    });
    c.bench_function("find_auto_level_parallel", |b| {
        b.iter(|| black_box(parallel.find(black_box(request(MaxLevel::Auto))).unwrap()))
    });
}

fn bench_transforms(c: &mut Criterion) {
    let frame = || ImageBuffer::filled(720, 1280, [30, 60, 90, 255]).unwrap();
    c.bench_function("rotate_frame_30deg", |b| {
        b.iter(|| black_box(rotate(frame(), 360.0, 640.0, 30.0).unwrap()))
    });
    c.bench_function("concat_frames", |b| {
        b.iter(|| black_box(concat(frame(), frame(), Direction::End).unwrap()))
    });
}

criterion_group!(benches, bench_matcher, bench_transforms);
criterion_main!(benches);
