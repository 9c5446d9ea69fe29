use std::hint::black_box;
use std::sync::Arc;

use criterion::{Criterion, Throughput, criterion_group, criterion_main};

use tui_cliplist::{
    ClipItem, FilterPipeline, FilterState, HeightModel, ListKind, TypeFilter, WindowCalculator,
};

fn items(count: usize) -> Vec<Arc<ClipItem>> {
    (0..count)
        .map(|i| {
            let item = match i % 5 {
                0 => ClipItem::image(format!("i{i}"), format!("asset{i}")),
                1 => ClipItem::text(format!("i{i}"), format!("see https://example.com/{i}")),
                2 => ClipItem::rich_text(format!("i{i}"), "", format!("<p>entry <b>{i}</b></p>")),
                _ => ClipItem::text(format!("i{i}"), format!("plain entry {i}\nwith a second line")),
            };
            Arc::new(item)
        })
        .collect()
}

fn heights(count: usize) -> HeightModel {
    let mut heights = HeightModel::new(count, 2);
    for pos in (0..count).step_by(3) {
        heights.set_height(pos, 1 + u32::try_from(pos % 4).unwrap_or(0));
    }
    heights
}

fn bench_window(c: &mut Criterion) {
    let mut group = c.benchmark_group("window.compute");
    for count in [1_000usize, 10_000, 100_000] {
        let heights = heights(count);
        let total = heights.total();
        group.throughput(Throughput::Elements(64));
        group.bench_function(count.to_string(), |b| {
            let mut calc = WindowCalculator::new(3);
            b.iter(|| {
                let mut acc = 0usize;
                for step in 0..64u32 {
                    let scroll_top = total / 64 * step;
                    let window = calc.compute(black_box(&heights), scroll_top, 40);
                    acc = acc.wrapping_add(window.len());
                }
                black_box(acc)
            });
        });
    }
    group.finish();
}

fn bench_filter(c: &mut Criterion) {
    let mut group = c.benchmark_group("filter.apply");
    let data = items(10_000);
    for (case_id, state) in [
        ("all", FilterState::default()),
        ("links", FilterState::new(TypeFilter::Link, "")),
        ("search", FilterState::new(TypeFilter::All, "entry 99")),
    ] {
        group.throughput(Throughput::Elements(data.len() as u64));
        group.bench_function(case_id, |b| {
            b.iter(|| {
                let view = FilterPipeline::apply_state(black_box(&data), &state, &ListKind::History);
                black_box(view.len())
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_window, bench_filter);
criterion_main!(benches);
