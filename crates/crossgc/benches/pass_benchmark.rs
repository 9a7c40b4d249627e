//! Full-pass benchmark over a synthetic snapshot.

use criterion::{criterion_group, criterion_main, BatchSize, Criterion};

use crossgc::testing::MockHost;
use crossgc::{
    CapabilityCache, Component, CrossReference, HostObjectGateway, ManagedId, ObjectNode,
    ReferenceControlBlock, Snapshot,
};

const COMPONENTS: usize = 100;
const MEMBERS_PER_COMPONENT: usize = 3;

fn build_input() -> (MockHost, CapabilityCache, Snapshot) {
    let mut host = MockHost::new();
    host.initialize().expect("mock host initialization");
    let class = host.conventional_class();

    let mut nodes = Vec::new();
    let mut components = Vec::new();
    for component in 0..COMPONENTS {
        let mut members = Vec::new();
        for _ in 0..MEMBERS_PER_COMPONENT {
            let handle = host.new_peer(class);
            if component % 2 == 0 {
                host.retain(handle);
            }
            members.push(nodes.len());
            nodes.push(ObjectNode::new(
                ManagedId::new(nodes.len() as u64 + 1),
                ReferenceControlBlock::new_global(handle),
            ));
        }
        components.push(Component::new(members));
    }
    let cross_references = (1..COMPONENTS)
        .map(|destination| CrossReference::new(destination - 1, destination))
        .collect();

    let snapshot = Snapshot::new(nodes, components, cross_references);
    (host, CapabilityCache::new(), snapshot)
}

fn bench_pass(c: &mut Criterion) {
    c.bench_function("bridge_pass_100x3", |b| {
        b.iter_batched(
            build_input,
            |(mut host, mut capabilities, snapshot)| {
                crossgc::run_pass(&mut host, &mut capabilities, &snapshot)
            },
            BatchSize::SmallInput,
        );
    });
}

criterion_group!(benches, bench_pass);
criterion_main!(benches);
