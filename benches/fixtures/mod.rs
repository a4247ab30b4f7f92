// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Tessera-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Tessera and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

#![allow(dead_code)]

// Shared deterministic benchmark fixtures (no RNG).

use std::fmt::Write as _;

use tessera::model::{DiagramSource, GraphState};

#[derive(Debug, Clone, Copy)]
pub struct FlowchartShape {
    pub nodes: usize,
    /// Extra edges per node on top of the spine `n{i} --> n{i+1}`.
    pub fan_out: usize,
    pub label_len: usize,
}

pub const SMALL: FlowchartShape = FlowchartShape { nodes: 12, fan_out: 1, label_len: 16 };
pub const MEDIUM_DENSE: FlowchartShape = FlowchartShape { nodes: 120, fan_out: 3, label_len: 24 };
pub const LARGE_LONG_LABELS: FlowchartShape = FlowchartShape { nodes: 600, fan_out: 2, label_len: 120 };

fn ascii_repeat_to_len(prefix: &str, fill: char, target_len: usize) -> String {
    if prefix.len() >= target_len {
        return prefix[..target_len].to_owned();
    }

    let mut out = String::with_capacity(target_len);
    out.push_str(prefix);
    while out.len() < target_len {
        out.push(fill);
    }
    out
}

/// A flowchart with declared nodes, a spine of edges and a few style rules.
pub fn flowchart_source(shape: FlowchartShape) -> DiagramSource {
    let mut text = String::from("flowchart TD\n");
    for idx in 0..shape.nodes {
        let label = ascii_repeat_to_len(&format!("Service {idx} "), 'x', shape.label_len);
        let _ = writeln!(text, "    n{idx}[\"{label}\"]");
    }
    for idx in 0..shape.nodes.saturating_sub(1) {
        let _ = writeln!(text, "    n{idx} --> n{}", idx + 1);
        for hop in 2..(2 + shape.fan_out) {
            let to = (idx + hop * 7) % shape.nodes;
            if to != idx {
                let _ = writeln!(text, "    n{idx} -.-> n{to}");
            }
        }
    }
    for idx in (0..shape.nodes).step_by(10) {
        let _ = writeln!(text, "    classDef tessera_n{idx} fill:#f9f");
        let _ = writeln!(text, "    class n{idx} tessera_n{idx}");
    }
    DiagramSource::new(text)
}

/// Node id in the middle of the document, so lookups cannot stop early.
pub fn middle_node(shape: FlowchartShape) -> String {
    format!("n{}", shape.nodes / 2)
}

pub fn checksum_graph(graph: &GraphState) -> u64 {
    let mut acc = 0u64;
    for node in graph.nodes() {
        acc = acc.wrapping_mul(131).wrapping_add(node.id.as_str().len() as u64);
        acc = acc.wrapping_mul(131).wrapping_add(node.label.len() as u64);
    }
    for edge in graph.edges() {
        acc = acc.wrapping_mul(131).wrapping_add(edge.from.as_str().len() as u64);
        acc = acc.wrapping_mul(131).wrapping_add(edge.to.as_str().len() as u64);
    }
    acc
}
