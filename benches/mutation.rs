// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Tessera-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Tessera and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion, Throughput};

use tessera::format::mermaid::parse_flowchart;
use tessera::history::{HistoryManager, HistorySnapshot, HISTORY_LIMIT};
use tessera::model::{NodeId, NodeStyle};
use tessera::ops::{apply_graph_ops, apply_style, update_label, GraphOp, LabelPolicy};
use tessera::render::{FlowchartSvgRenderer, Renderer};

mod fixtures;
mod profiler;

use fixtures::{FlowchartShape, LARGE_LONG_LABELS, MEDIUM_DENSE, SMALL};

// Benchmark identity (keep stable):
// - Groups in this file: `mutation.text`, `mutation.graph`, `render.flowchart`.
// - Case IDs (`small`, `medium_dense`, `large_long_labels`) must stay stable so results remain
//   comparable over time.
const CASES: [(&str, FlowchartShape); 3] =
    [("small", SMALL), ("medium_dense", MEDIUM_DENSE), ("large_long_labels", LARGE_LONG_LABELS)];

fn bench_text_mutation(c: &mut Criterion) {
    let mut group = c.benchmark_group("mutation.text");
    let policy = LabelPolicy::default();
    let style = NodeStyle { fill: Some("#bbf".to_owned()), stroke: Some("#333".to_owned()), ..NodeStyle::default() };

    for (case, shape) in CASES {
        let source = fixtures::flowchart_source(shape);
        let node_id = fixtures::middle_node(shape);
        group.throughput(Throughput::Bytes(source.as_str().len() as u64));

        group.bench_function(format!("relabel/{case}"), |b| {
            b.iter(|| {
                let out = update_label(black_box(&source), &node_id, "Auth & Identity Service", &policy)
                    .expect("update_label");
                black_box(out.as_str().len())
            })
        });

        group.bench_function(format!("style/{case}"), |b| {
            b.iter(|| {
                let out = apply_style(black_box(&source), &node_id, &style).expect("apply_style");
                black_box(out.as_str().len())
            })
        });
    }
    group.finish();
}

fn bench_graph_history(c: &mut Criterion) {
    let mut group = c.benchmark_group("mutation.graph");

    for (case, shape) in CASES {
        let graph = parse_flowchart(fixtures::flowchart_source(shape).as_str()).expect("parse");
        let victims = (0..shape.nodes)
            .step_by(5)
            .take(HISTORY_LIMIT)
            .map(|idx| NodeId::new(format!("n{idx}")).expect("node id"))
            .collect::<Vec<_>>();
        group.throughput(Throughput::Elements(victims.len() as u64));

        group.bench_function(format!("delete_then_undo_all/{case}"), |b| {
            b.iter_batched(
                || (graph.clone(), HistoryManager::new(HISTORY_LIMIT)),
                |(mut graph, mut history)| {
                    for node_id in &victims {
                        let before = HistorySnapshot::capture(&graph);
                        apply_graph_ops(&mut graph, &[GraphOp::RemoveNode { node_id: node_id.clone() }])
                            .expect("remove");
                        history.push(before);
                    }
                    while let Some(previous) = history.undo(HistorySnapshot::capture(&graph)) {
                        previous.restore_into(&mut graph);
                    }
                    black_box(fixtures::checksum_graph(&graph))
                },
                BatchSize::SmallInput,
            )
        });
    }
    group.finish();
}

fn bench_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("render.flowchart");
    let renderer = FlowchartSvgRenderer::default();

    for (case, shape) in CASES {
        let source = fixtures::flowchart_source(shape);
        group.throughput(Throughput::Elements(shape.nodes as u64));
        group.bench_function(case, |b| {
            b.iter(|| {
                let rendered = renderer.render(black_box(&source), 1).expect("render");
                black_box(rendered.svg.len())
            })
        });
    }
    group.finish();
}

criterion_group! {
    name = benches;
    config = profiler::criterion();
    targets = bench_text_mutation, bench_graph_history, bench_render
}
criterion_main!(benches);
