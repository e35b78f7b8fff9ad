//! Benchmarks for building and executing a balanced adder tree.

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};

use pipeline_core::{Constant, InputRefs, NodeId, NodeRegistry, Process};

struct Add;

impl Process for Add {
    type Inputs = (i64, i64);
    type Outputs = (i64,);

    fn process(&self, (a, b): InputRefs<'_, Self>) -> Self::Outputs {
        (a + b,)
    }
}

/// Build a tree over `leaves` constant leaves and return its root.
fn build_tree(leaves: usize) -> (NodeRegistry, NodeId) {
    let mut registry = NodeRegistry::with_capacity(leaves * 2);
    let mut layer: Vec<NodeId> = (0..leaves)
        .map(|_| registry.register(Constant::new(1_i64)).1)
        .collect();

    while layer.len() > 1 {
        layer = layer
            .chunks(2)
            .map(|pair| {
                let (_, id) = registry.register(Add);
                registry
                    .connect(id, pair[0], 0, 0)
                    .expect("tree edges are acyclic");
                registry
                    .connect(id, pair[1], 1, 0)
                    .expect("tree edges are acyclic");
                id
            })
            .collect();
    }
    (registry, layer[0])
}

fn bench_execute(c: &mut Criterion) {
    let mut group = c.benchmark_group("execute");

    for leaves in [1024, 16384] {
        group.bench_function(format!("cold/{leaves}"), |b| {
            b.iter_batched(
                || build_tree(leaves),
                |(registry, root)| {
                    black_box(registry.execute(root).expect("tree is fully connected"));
                    registry
                },
                BatchSize::LargeInput,
            )
        });

        let (registry, root) = build_tree(leaves);
        registry.execute(root).expect("tree is fully connected");
        group.bench_function(format!("cached/{leaves}"), |b| {
            b.iter(|| black_box(registry.execute(root).expect("tree is fully connected")))
        });
    }

    group.finish();
}

fn bench_invalidate(c: &mut Criterion) {
    let (registry, root) = build_tree(16384);
    registry.execute(root).expect("tree is fully connected");
    let leaf = registry
        .ids()
        .next()
        .expect("tree has leaves");
    let leaf = registry
        .get_as::<Constant<i64>>(leaf)
        .expect("first node is a leaf");

    c.bench_function("invalidate_leaf_and_execute", |b| {
        b.iter(|| {
            leaf.update(|constant| constant.set_value(1));
            black_box(registry.execute(root).expect("tree is fully connected"))
        })
    });
}

criterion_group!(benches, bench_execute, bench_invalidate);
criterion_main!(benches);
