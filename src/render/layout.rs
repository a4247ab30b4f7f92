// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Tessera-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Tessera and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::collections::{BTreeSet, HashMap};

use crate::model::{FlowDirection, GraphState, NodeShape};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutOptions {
    pub char_width: f64,
    pub node_height: f64,
    pub min_node_width: f64,
    pub label_padding: f64,
    pub rank_gap: f64,
    pub node_gap: f64,
    pub margin: f64,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            char_width: 8.0,
            node_height: 44.0,
            min_node_width: 80.0,
            label_padding: 16.0,
            rank_gap: 60.0,
            node_gap: 40.0,
            margin: 16.0,
        }
    }
}

/// Placement of one node; `x`/`y` are the centre.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeBox {
    pub rank: usize,
    pub order: usize,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Boxes are indexed like `GraphState::nodes()`.
#[derive(Debug, Clone, PartialEq)]
pub struct FlowLayout {
    pub boxes: Vec<NodeBox>,
    pub ranks: Vec<Vec<usize>>,
    pub width: f64,
    pub height: f64,
}

/// Deterministic topological order. When only cycles remain, the earliest declared node is
/// taken next, which turns its incoming edges into back edges.
fn topo_order(count: usize, outgoing: &[Vec<usize>]) -> Vec<usize> {
    let mut indegree = vec![0usize; count];
    for tos in outgoing {
        for &to in tos {
            indegree[to] += 1;
        }
    }

    let mut ready = (0..count).filter(|&idx| indegree[idx] == 0).collect::<BTreeSet<_>>();
    let mut placed = vec![false; count];
    let mut order = Vec::with_capacity(count);

    while order.len() < count {
        let next = match ready.pop_first() {
            Some(next) => next,
            None => match (0..count).find(|&idx| !placed[idx]) {
                Some(next) => next,
                None => break,
            },
        };
        if placed[next] {
            continue;
        }
        placed[next] = true;
        order.push(next);
        for &to in &outgoing[next] {
            indegree[to] = indegree[to].saturating_sub(1);
            if indegree[to] == 0 && !placed[to] {
                ready.insert(to);
            }
        }
    }
    order
}

fn barycenter(preds: &[usize], positions: &HashMap<usize, usize>) -> Option<(usize, usize)> {
    let (sum, count) = preds
        .iter()
        .filter_map(|pred| positions.get(pred).copied())
        .fold((0usize, 0usize), |(sum, count), pos| (sum + pos, count + 1));
    (count > 0).then_some((sum, count))
}

fn node_size(label: &str, shape: NodeShape, options: &LayoutOptions) -> (f64, f64) {
    let text = label.chars().count() as f64 * options.char_width + 2.0 * options.label_padding;
    let width = text.max(options.min_node_width);
    match shape {
        NodeShape::Circle | NodeShape::DoubleCircle => {
            let side = width.max(options.node_height);
            (side, side)
        }
        NodeShape::Diamond | NodeShape::Hexagon => (width + options.node_height, options.node_height * 1.5),
        _ => (width, options.node_height),
    }
}

/// Longest-path layering with one barycenter sweep.
pub fn layout_graph(graph: &GraphState, options: &LayoutOptions) -> FlowLayout {
    let nodes = graph.nodes();
    let count = nodes.len();
    let index = nodes
        .iter()
        .enumerate()
        .map(|(idx, node)| (node.id.as_str(), idx))
        .collect::<HashMap<_, _>>();

    let mut outgoing = vec![Vec::<usize>::new(); count];
    for edge in graph.edges() {
        let (Some(&from), Some(&to)) = (index.get(edge.from.as_str()), index.get(edge.to.as_str()))
        else {
            continue;
        };
        if from != to && !outgoing[from].contains(&to) {
            outgoing[from].push(to);
        }
    }

    let order = topo_order(count, &outgoing);
    let mut position = vec![0usize; count];
    for (pos, &idx) in order.iter().enumerate() {
        position[idx] = pos;
    }

    let mut rank = vec![0usize; count];
    let mut predecessors = vec![Vec::<usize>::new(); count];
    for &from in &order {
        for &to in &outgoing[from] {
            if position[from] < position[to] {
                rank[to] = rank[to].max(rank[from] + 1);
                predecessors[to].push(from);
            }
        }
    }

    let rank_count = rank.iter().copied().max().map_or(0, |max| max + 1);
    let mut ranks = vec![Vec::<usize>::new(); rank_count];
    for idx in 0..count {
        ranks[rank[idx]].push(idx);
    }
    for layer in 1..ranks.len() {
        let positions = ranks[layer - 1]
            .iter()
            .enumerate()
            .map(|(pos, &idx)| (idx, pos))
            .collect::<HashMap<_, _>>();
        ranks[layer].sort_by(|&a, &b| {
            match (barycenter(&predecessors[a], &positions), barycenter(&predecessors[b], &positions)) {
                (None, None) => a.cmp(&b),
                (Some(_), None) => std::cmp::Ordering::Less,
                (None, Some(_)) => std::cmp::Ordering::Greater,
                (Some((sum_a, count_a)), Some((sum_b, count_b))) => (sum_a * count_b)
                    .cmp(&(sum_b * count_a))
                    .then_with(|| a.cmp(&b)),
            }
        });
    }

    let sizes = nodes
        .iter()
        .map(|node| node_size(&node.label, node.shape, options))
        .collect::<Vec<_>>();
    let horizontal = graph.direction().is_horizontal();
    // (along the flow, across the flow)
    let extent = |idx: usize| {
        let (w, h) = sizes[idx];
        if horizontal {
            (w, h)
        } else {
            (h, w)
        }
    };

    let rank_depth = ranks
        .iter()
        .map(|members| members.iter().map(|&idx| extent(idx).0).fold(0.0, f64::max))
        .collect::<Vec<_>>();
    let rank_breadth = ranks
        .iter()
        .map(|members| {
            let sum = members.iter().map(|&idx| extent(idx).1).sum::<f64>();
            sum + options.node_gap * members.len().saturating_sub(1) as f64
        })
        .collect::<Vec<_>>();
    let breadth = rank_breadth.iter().copied().fold(0.0, f64::max);
    let depth = rank_depth.iter().sum::<f64>() + options.rank_gap * rank_count.saturating_sub(1) as f64;

    let mut boxes = vec![
        NodeBox { rank: 0, order: 0, x: 0.0, y: 0.0, width: 0.0, height: 0.0 };
        count
    ];
    let mut along = options.margin;
    for (rank_idx, members) in ranks.iter().enumerate() {
        let center_along = along + rank_depth[rank_idx] / 2.0;
        let mut across = options.margin + (breadth - rank_breadth[rank_idx]) / 2.0;
        for (order_idx, &idx) in members.iter().enumerate() {
            let (_, cross) = extent(idx);
            let center_across = across + cross / 2.0;
            across += cross + options.node_gap;

            let flow = match graph.direction() {
                FlowDirection::TopDown | FlowDirection::LeftRight => center_along,
                FlowDirection::BottomUp | FlowDirection::RightLeft => {
                    2.0 * options.margin + depth - center_along
                }
            };
            let (x, y) = if horizontal { (flow, center_across) } else { (center_across, flow) };
            let (width, height) = sizes[idx];
            boxes[idx] = NodeBox { rank: rank_idx, order: order_idx, x, y, width, height };
        }
        along += rank_depth[rank_idx] + options.rank_gap;
    }

    let (width, height) = if horizontal { (depth, breadth) } else { (breadth, depth) };
    FlowLayout {
        boxes,
        ranks,
        width: width + 2.0 * options.margin,
        height: height + 2.0 * options.margin,
    }
}

#[cfg(test)]
mod tests {
    use super::{layout_graph, LayoutOptions};
    use crate::format::mermaid::parse_flowchart;

    #[test]
    fn chain_gets_one_rank_per_step() {
        let graph = parse_flowchart("flowchart TD\n  A --> B --> C\n  A --> C\n").expect("parse");
        let layout = layout_graph(&graph, &LayoutOptions::default());
        let ranks = layout.boxes.iter().map(|b| b.rank).collect::<Vec<_>>();
        assert_eq!(ranks, vec![0, 1, 2]);
        assert!(layout.boxes[0].y < layout.boxes[1].y && layout.boxes[1].y < layout.boxes[2].y);
    }

    #[test]
    fn cycles_are_broken_instead_of_rejected() {
        let graph = parse_flowchart("flowchart LR\n  A --> B --> C --> A\n").expect("parse");
        let layout = layout_graph(&graph, &LayoutOptions::default());
        assert_eq!(layout.ranks.len(), 3);
        assert!(layout.boxes[0].x < layout.boxes[2].x);
    }

    #[test]
    fn bottom_up_flips_the_flow_axis() {
        let graph = parse_flowchart("flowchart BT\n  A --> B\n").expect("parse");
        let layout = layout_graph(&graph, &LayoutOptions::default());
        assert!(layout.boxes[0].y > layout.boxes[1].y);
    }

    #[test]
    fn siblings_share_a_rank_and_fit_the_canvas() {
        let graph = parse_flowchart("flowchart TD\n  A --> B & C\n").expect("parse");
        let layout = layout_graph(&graph, &LayoutOptions::default());
        assert_eq!(layout.ranks, vec![vec![0], vec![1, 2]]);
        for node in &layout.boxes {
            assert!(node.x - node.width / 2.0 >= 0.0);
            assert!(node.x + node.width / 2.0 <= layout.width);
            assert!(node.y + node.height / 2.0 <= layout.height);
        }
    }

    #[test]
    fn empty_graph_has_margin_only_extent() {
        let graph = parse_flowchart("flowchart TD\n").expect("parse");
        let layout = layout_graph(&graph, &LayoutOptions::default());
        assert!(layout.boxes.is_empty());
        assert_eq!(layout.width, 32.0);
    }
}
