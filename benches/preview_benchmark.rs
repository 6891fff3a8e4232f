//! Performance benchmarks for PDF Preview
//!
//! Run with: `cargo bench`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use image::RgbaImage;
use pdf_preview::{
    fit_scale, ContainerSize, DocumentHandle, DocumentService, PageHandle, PageSize,
    PreviewController, TargetSurface,
};
use pdf_preview::preview::DEFAULT_MAX_SCALE;
use std::sync::Arc;

/// Single blank page of a fixed size, painted without any decoding
struct BlankService(PageSize);

struct BlankDocument(PageSize);

struct BlankPage(PageSize);

impl DocumentService for BlankService {
    fn open<'a>(&'a self, _locator: &'a str) -> BoxFuture<'a, pdf_preview::Result<Box<dyn DocumentHandle>>> {
        let size = self.0;
        async move { Ok(Box::new(BlankDocument(size)) as Box<dyn DocumentHandle>) }.boxed()
    }
}

impl DocumentHandle for BlankDocument {
    fn page_count(&self) -> u32 {
        1
    }

    fn page(&self, _number: u32) -> BoxFuture<'_, pdf_preview::Result<Box<dyn PageHandle>>> {
        let size = self.0;
        async move { Ok(Box::new(BlankPage(size)) as Box<dyn PageHandle>) }.boxed()
    }
}

impl PageHandle for BlankPage {
    fn number(&self) -> u32 {
        1
    }

    fn measure(&self, scale: f32) -> PageSize {
        self.0.scaled(scale)
    }

    fn paint(&self, scale: f32) -> BoxFuture<'_, pdf_preview::Result<RgbaImage>> {
        let (width, height) = self.measure(scale).to_pixels();
        async move { Ok(RgbaImage::new(width, height)) }.boxed()
    }
}

/// Benchmark the fit-scale computation across container shapes
fn bench_fit_scale(c: &mut Criterion) {
    let page = PageSize::new(612.0, 792.0);
    let containers = [
        ContainerSize::new(320, 480),
        ContainerSize::new(1280, 720),
        ContainerSize::new(3840, 2160),
    ];

    c.bench_function("fit_scale", |b| {
        b.iter(|| {
            for container in containers {
                black_box(fit_scale(black_box(container), page, DEFAULT_MAX_SCALE));
            }
        });
    });
}

/// Benchmark the render pipeline overhead (state, scaling, surface commit)
fn bench_render_pipeline(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().expect("Failed to build runtime");
    let mut group = c.benchmark_group("render_pipeline");

    for (name, container) in [
        ("phone", ContainerSize::new(360, 640)),
        ("desktop", ContainerSize::new(1280, 1000)),
    ] {
        let preview = PreviewController::new(
            ["bench.pdf"],
            Arc::new(BlankService(PageSize::new(612.0, 792.0))),
        );
        preview.bind_surface(TargetSurface::shared(container));

        group.bench_with_input(BenchmarkId::from_parameter(name), &preview, |b, preview| {
            b.to_async(&runtime).iter(|| preview.render());
        });
    }

    group.finish();
}

criterion_group!(benches, bench_fit_scale, bench_render_pipeline);
criterion_main!(benches);
