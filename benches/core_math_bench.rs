use std::hint::black_box;
use std::rc::Rc;

use criterion::{Criterion, criterion_group, criterion_main};
use plotweave::component::{AnchorContext, Component, Label, Plot, PlotKind, into_handle};
use plotweave::core::{
    BindingKey, ComponentId, DataScale, Domainer, LinearScale, Point, QuantitativeScale,
    ScaleTransform, StackDatum, StackOrder, SurfaceId, compute_stack_extent,
    compute_stack_offsets,
};
use plotweave::layout::{LayoutNode, Table};
use plotweave::render::{MonospaceMeasurer, RenderQueue};
use serde_json::{Value, json};

fn bench_domainer_1k_extents(c: &mut Criterion) {
    let mut domainer: Domainer<f64> = Domainer::new().with_nice(10);
    domainer.add_padding_exception("baseline", 0.0);
    let extents: Vec<(f64, f64)> = (0..1_000)
        .map(|i| {
            let base = f64::from(i) * 0.5;
            (base, base + 25.0)
        })
        .collect();

    c.bench_function("domainer_1k_extents", |b| {
        b.iter(|| domainer.compute_domain(black_box(&extents), ScaleTransform::Linear))
    });
}

fn bench_scale_extent_from_10k_values(c: &mut Criterion) {
    let scale = LinearScale::new(QuantitativeScale::linear());
    let key = BindingKey::new(ComponentId::next(), "y");
    let values: Vec<Value> = (0..10_000).map(|i| json!(f64::from(i) * 0.25 - 500.0)).collect();

    c.bench_function("scale_extent_from_10k_values", |b| {
        b.iter(|| scale.update_extent_from_values(&key, black_box(&values)))
    });
}

fn bench_stack_offsets_20x500(c: &mut Criterion) {
    let series: Vec<Vec<StackDatum>> = (0..20)
        .map(|dataset| {
            (0..500)
                .map(|key| {
                    let sign = if (dataset + key) % 3 == 0 { -1.0 } else { 1.0 };
                    StackDatum::new(format!("k{key}"), sign * f64::from(key % 17 + 1))
                })
                .collect()
        })
        .collect();

    c.bench_function("stack_offsets_20x500", |b| {
        b.iter(|| {
            let offsets = compute_stack_offsets(black_box(&series), StackOrder::BottomUp);
            compute_stack_extent(&series, &offsets, None)
        })
    });
}

fn bench_table_layout_8x8(c: &mut Criterion) {
    let rows = (0..8)
        .map(|row| {
            (0..8)
                .map(|col| {
                    if row == 0 {
                        Some(into_handle(Label::new(format!("column {col}"))))
                    } else {
                        Some(into_handle(Plot::new(PlotKind::Scatter)))
                    }
                })
                .collect()
        })
        .collect();
    let mut table = Table::new(rows);
    let context = AnchorContext {
        surface: SurfaceId::new(1),
        queue: RenderQueue::new(),
        measurer: Rc::new(MonospaceMeasurer::default()),
    };
    table.anchor(&context).expect("anchor");

    c.bench_function("table_layout_8x8", |b| {
        b.iter(|| {
            table
                .compute_layout(Point::ORIGIN, black_box(1_600.0), black_box(900.0))
                .expect("layout fits")
        })
    });
}

criterion_group!(
    benches,
    bench_domainer_1k_extents,
    bench_scale_extent_from_10k_values,
    bench_stack_offsets_20x500,
    bench_table_layout_8x8
);
criterion_main!(benches);
