//! Reconciliation benchmarks
//!
//! These benchmarks measure mounting a keyed list, re-rendering it in
//! reverse order, and flushing a batch of state updates.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use serde_json::json;

use trellis_core::{
    Component, ComponentCx, ComponentType, Element, HookResult, MemoryAdapter, Node, Renderer,
    State,
};

fn list(len: usize, reversed: bool) -> Element {
    let mut keys: Vec<usize> = (0..len).collect();
    if reversed {
        keys.reverse();
    }
    Element::host("ul")
        .children(keys.into_iter().map(|key| {
            Node::from(
                Element::host("li")
                    .key(key.to_string())
                    .prop("index", key)
                    .child(key.to_string()),
            )
        }))
        .build()
}

/// Benchmark mounting a fresh keyed list
fn bench_mount(c: &mut Criterion) {
    let mut group = c.benchmark_group("mount_list");

    for len in [10, 100, 1000] {
        group.throughput(Throughput::Elements(len as u64));
        group.bench_with_input(BenchmarkId::from_parameter(len), &len, |b, &len| {
            b.iter(|| {
                let adapter = MemoryAdapter::new();
                let container = adapter.create_container();
                let renderer = Renderer::new(adapter);
                black_box(renderer.render(list(len, false), container).ok());
            });
        });
    }

    group.finish();
}

/// Benchmark reversing a mounted keyed list
fn bench_reverse(c: &mut Criterion) {
    let mut group = c.benchmark_group("reverse_list");

    for len in [10, 100, 1000] {
        let adapter = MemoryAdapter::new();
        let container = adapter.create_container();
        let renderer = Renderer::new(adapter);
        let forward = list(len, false);
        let backward = list(len, true);
        renderer.render(forward.clone(), container).ok();

        group.throughput(Throughput::Elements(len as u64));
        group.bench_with_input(BenchmarkId::from_parameter(len), &len, |b, _| {
            let mut flipped = false;
            b.iter(|| {
                flipped = !flipped;
                let next = if flipped { &backward } else { &forward };
                black_box(renderer.render(next.clone(), container).ok());
            });
        });
    }

    group.finish();
}

struct Counter;

impl Component for Counter {
    fn initial_state(&mut self, _cx: &ComponentCx) -> State {
        [("count".to_owned(), json!(0))].into_iter().collect()
    }

    fn render(&mut self, cx: &ComponentCx) -> HookResult<Option<Element>> {
        let count = cx.state_value("count").unwrap_or_default();
        Ok(Some(Element::host("span").child(count.to_string()).build()))
    }
}

/// Benchmark folding many state updates into one flush
fn bench_batched_updates(c: &mut Criterion) {
    let adapter = MemoryAdapter::new();
    let container = adapter.create_container();
    let renderer = Renderer::new(adapter);
    let counter = ComponentType::new("Counter", || Counter);
    let Ok(instance) = renderer.render(Element::component(&counter), container) else {
        return;
    };

    c.bench_function("batched_set_state_x100", |b| {
        b.iter(|| {
            let result = renderer.batched_updates(|| {
                for n in 0..100 {
                    instance
                        .set_state([("count".to_owned(), json!(n))].into_iter().collect())
                        .ok();
                }
            });
            black_box(result.ok());
        });
    });
}

criterion_group!(benches, bench_mount, bench_reverse, bench_batched_updates);
criterion_main!(benches);
