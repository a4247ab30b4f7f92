// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Tessera-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Tessera and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! SVG output for flowcharts.
//!
//! Element ids follow Mermaid's conventions so the interaction layer treats this output and a
//! Mermaid-rendered SVG the same way: nodes are `g.node#flowchart-<id>-<n>`, edges are
//! `path#L-<from>-<to>-<n>` and subgraphs are `g.cluster`.

use std::collections::HashMap;

use svg::node::element as svg_element;
use svg::node::element::path::Data;
use svg::Document;

use crate::format::mermaid::statement::{unquote, Keyword, StatementKind};
use crate::format::mermaid::{parse_flowchart, scan};
use crate::model::{DiagramSource, GraphState, NodeShape};

use super::layout::{layout_graph, FlowLayout, LayoutOptions, NodeBox};
use super::{RenderError, RenderedDiagram, Renderer};

const CLUSTER_PADDING: f64 = 12.0;

#[derive(Debug, Clone, PartialEq)]
struct Cluster {
    id: String,
    title: String,
    members: Vec<String>,
}

/// `subgraph` blocks and the node ids first mentioned inside them.
fn read_clusters(source: &str) -> Vec<Cluster> {
    let doc = scan(source);
    let mut clusters = Vec::<Cluster>::new();
    let mut open = Vec::<usize>::new();
    let mut assigned = Vec::<&str>::new();

    for statement in doc.statements() {
        match &statement.kind {
            StatementKind::Keyword(Keyword::Subgraph) => {
                let rest = statement.text["subgraph".len()..].trim();
                let (id, title) = match rest.find('[') {
                    Some(open_at) if rest.ends_with(']') => (
                        rest[..open_at].trim(),
                        unquote(rest[open_at + 1..rest.len() - 1].trim()),
                    ),
                    _ => (rest, unquote(rest)),
                };
                clusters.push(Cluster {
                    id: id.to_owned(),
                    title: title.to_owned(),
                    members: Vec::new(),
                });
                open.push(clusters.len() - 1);
            }
            StatementKind::Keyword(Keyword::End) => {
                open.pop();
            }
            StatementKind::Chain(chain) => {
                let Some(&current) = open.last() else {
                    continue;
                };
                for occurrence in chain.groups.iter().flatten() {
                    if !assigned.contains(&occurrence.node_id) {
                        assigned.push(occurrence.node_id);
                        clusters[current].members.push(occurrence.node_id.to_owned());
                    }
                }
            }
            _ => {}
        }
    }
    clusters
}

fn style_attr(node: &crate::model::GraphNode) -> Option<String> {
    let style = node.style.as_ref()?;
    let css = style
        .properties()
        .map(|(property, value)| format!("{property}:{}", value.trim()))
        .collect::<Vec<_>>()
        .join(";");
    (!css.is_empty()).then_some(css)
}

fn polygon_points(points: &[(f64, f64)]) -> String {
    points.iter().map(|(x, y)| format!("{x},{y}")).collect::<Vec<_>>().join(" ")
}

fn styled<T: svg::Node>(mut element: T, style: Option<&str>) -> Box<dyn svg::Node> {
    if let Some(css) = style {
        element.assign("style", css);
    }
    Box::new(element)
}

/// Shape outline centred on the origin; the enclosing group is translated into place.
fn shape_element(shape: NodeShape, w: f64, h: f64, style: Option<&str>) -> Box<dyn svg::Node> {
    let (hw, hh) = (w / 2.0, h / 2.0);
    let rect = |rx: f64| {
        styled(
            svg_element::Rectangle::new()
                .set("class", "basic label-container")
                .set("x", -hw)
                .set("y", -hh)
                .set("width", w)
                .set("height", h)
                .set("rx", rx)
                .set("ry", rx),
            style,
        )
    };
    let polygon = |points: &[(f64, f64)]| {
        styled(
            svg_element::Polygon::new()
                .set("class", "label-container")
                .set("points", polygon_points(points)),
            style,
        )
    };

    match shape {
        NodeShape::Rect | NodeShape::Subroutine => rect(0.0),
        NodeShape::Round => rect(5.0),
        NodeShape::Stadium => rect(hh),
        NodeShape::Circle | NodeShape::DoubleCircle => styled(
            svg_element::Circle::new()
                .set("class", "label-container")
                .set("r", hw)
                .set("cx", 0.0)
                .set("cy", 0.0),
            style,
        ),
        NodeShape::Cylinder => {
            let ry = (h * 0.1).max(4.0);
            let (top, bottom) = (-hh + ry, hh - ry);
            let d = format!(
                "M {l} {top} A {hw} {ry} 0 0 0 {hw} {top} A {hw} {ry} 0 0 0 {l} {top} \
                 L {l} {bottom} A {hw} {ry} 0 0 0 {hw} {bottom} L {hw} {top}",
                l = -hw,
            );
            styled(svg_element::Path::new().set("class", "label-container").set("d", d), style)
        }
        NodeShape::Diamond => polygon(&[(0.0, -hh), (hw, 0.0), (0.0, hh), (-hw, 0.0)]),
        NodeShape::Hexagon => {
            let inset = hh / 2.0;
            polygon(&[
                (-hw + inset, -hh),
                (hw - inset, -hh),
                (hw, 0.0),
                (hw - inset, hh),
                (-hw + inset, hh),
                (-hw, 0.0),
            ])
        }
        NodeShape::Asymmetric => {
            polygon(&[(-hw, -hh), (hw, -hh), (hw, hh), (-hw, hh), (-hw + hh / 2.0, 0.0)])
        }
        NodeShape::Parallelogram => {
            polygon(&[(-hw + hh, -hh), (hw, -hh), (hw - hh, hh), (-hw, hh)])
        }
        NodeShape::ParallelogramAlt => {
            polygon(&[(-hw, -hh), (hw - hh, -hh), (hw, hh), (-hw + hh, hh)])
        }
        NodeShape::Trapezoid => polygon(&[(-hw + hh, -hh), (hw - hh, -hh), (hw, hh), (-hw, hh)]),
        NodeShape::TrapezoidAlt => polygon(&[(-hw, -hh), (hw, -hh), (hw - hh, hh), (-hw + hh, hh)]),
    }
}

/// Where the straight line from `from` towards `to` leaves the box of `from`.
fn border_point(from: &NodeBox, to: &NodeBox) -> (f64, f64) {
    let (dx, dy) = (to.x - from.x, to.y - from.y);
    if dx == 0.0 && dy == 0.0 {
        return (from.x, from.y);
    }
    let sx = if dx == 0.0 { f64::INFINITY } else { (from.width / 2.0) / dx.abs() };
    let sy = if dy == 0.0 { f64::INFINITY } else { (from.height / 2.0) / dy.abs() };
    let scale = sx.min(sy).min(1.0);
    (from.x + dx * scale, from.y + dy * scale)
}

fn arrow_marker() -> svg_element::Marker {
    svg_element::Marker::new()
        .set("id", "flowchart-pointEnd")
        .set("class", "marker flowchart")
        .set("viewBox", "0 0 10 10")
        .set("refX", 10)
        .set("refY", 5)
        .set("markerWidth", 8)
        .set("markerHeight", 8)
        .set("orient", "auto")
        .add(svg_element::Path::new().set("d", "M 0 0 L 10 5 L 0 10 z"))
}

fn edge_style(connector: Option<&str>) -> (&'static str, bool) {
    let connector = connector.unwrap_or("-->");
    let class = if connector.contains('.') {
        "flowchart-link edge-pattern-dotted"
    } else if connector.contains('=') {
        "flowchart-link edge-thickness-thick"
    } else {
        "flowchart-link edge-pattern-solid"
    };
    let arrow = connector.ends_with('>');
    (class, arrow)
}

/// Build the SVG document for an already parsed graph.
pub fn graph_to_svg(graph: &GraphState, source: &str, layout: &FlowLayout, render_id: u64) -> String {
    let nodes = graph.nodes();
    let index = nodes
        .iter()
        .enumerate()
        .map(|(idx, node)| (node.id.as_str(), idx))
        .collect::<HashMap<_, _>>();

    let mut clusters_group = svg_element::Group::new().set("class", "clusters");
    for cluster in read_clusters(source) {
        let member_boxes = cluster
            .members
            .iter()
            .filter_map(|member| index.get(member.as_str()).map(|&idx| &layout.boxes[idx]))
            .collect::<Vec<_>>();
        let Some(first) = member_boxes.first() else {
            continue;
        };
        let init = (
            first.x - first.width / 2.0,
            first.y - first.height / 2.0,
            first.x + first.width / 2.0,
            first.y + first.height / 2.0,
        );
        let (x0, y0, x1, y1) = member_boxes.iter().fold(init, |(x0, y0, x1, y1), b| {
            (
                x0.min(b.x - b.width / 2.0),
                y0.min(b.y - b.height / 2.0),
                x1.max(b.x + b.width / 2.0),
                y1.max(b.y + b.height / 2.0),
            )
        });
        let group = svg_element::Group::new()
            .set("class", "cluster")
            .set("id", cluster.id.clone())
            .add(
                svg_element::Rectangle::new()
                    .set("x", x0 - CLUSTER_PADDING)
                    .set("y", y0 - CLUSTER_PADDING)
                    .set("width", x1 - x0 + 2.0 * CLUSTER_PADDING)
                    .set("height", y1 - y0 + 2.0 * CLUSTER_PADDING),
            )
            .add(
                svg_element::Text::new("")
                    .set("class", "cluster-label")
                    .set("x", x0 - CLUSTER_PADDING + 4.0)
                    .set("y", y0 - CLUSTER_PADDING + 12.0)
                    .add(svg::node::Text::new(cluster.title)),
            );
        clusters_group = clusters_group.add(group);
    }

    let mut edge_paths = svg_element::Group::new().set("class", "edgePaths");
    let mut edge_labels = svg_element::Group::new().set("class", "edgeLabels");
    let mut pair_counter = HashMap::<(&str, &str), usize>::new();
    for edge in graph.edges() {
        let (Some(&from), Some(&to)) = (index.get(edge.from.as_str()), index.get(edge.to.as_str()))
        else {
            continue;
        };
        let counter = pair_counter.entry((edge.from.as_str(), edge.to.as_str())).or_default();
        let dom_id = format!("L-{}-{}-{}", edge.from, edge.to, counter);
        *counter += 1;

        let (a, b) = (&layout.boxes[from], &layout.boxes[to]);
        let start = border_point(a, b);
        let end = border_point(b, a);
        let (class, arrow) = edge_style(edge.connector.as_deref());
        let mut path = svg_element::Path::new()
            .set("id", dom_id)
            .set("class", class)
            .set("d", Data::new().move_to(start).line_to(end));
        if arrow {
            path = path.set("marker-end", "url(#flowchart-pointEnd)");
        }
        edge_paths = edge_paths.add(path);

        if let Some(label) = edge.label.as_deref().filter(|label| !label.is_empty()) {
            edge_labels = edge_labels.add(
                svg_element::Group::new().set("class", "edgeLabel").add(
                    svg_element::Text::new("")
                        .set("x", (start.0 + end.0) / 2.0)
                        .set("y", (start.1 + end.1) / 2.0)
                        .set("text-anchor", "middle")
                        .add(svg::node::Text::new(label)),
                ),
            );
        }
    }

    let mut node_group = svg_element::Group::new().set("class", "nodes");
    for (idx, node) in nodes.iter().enumerate() {
        let placed = &layout.boxes[idx];
        let mut group = svg_element::Group::new()
            .set("class", "node default")
            .set("id", format!("flowchart-{}-{idx}", node.id))
            .set("transform", format!("translate({}, {})", placed.x, placed.y));
        let css = style_attr(node);
        group = group.add(shape_element(node.shape, placed.width, placed.height, css.as_deref()));
        group = group.add(
            svg_element::Group::new().set("class", "label").add(
                svg_element::Text::new("")
                    .set("text-anchor", "middle")
                    .set("dominant-baseline", "central")
                    .add(svg::node::Text::new(node.label.clone())),
            ),
        );
        node_group = node_group.add(group);
    }

    let root = svg_element::Group::new()
        .set("class", "root")
        .add(clusters_group)
        .add(edge_paths)
        .add(edge_labels)
        .add(node_group);

    Document::new()
        .set("id", format!("tessera-{render_id}"))
        .set("class", "flowchart")
        .set("viewBox", format!("0 0 {} {}", layout.width, layout.height))
        .set("width", layout.width)
        .set("height", layout.height)
        .add(svg_element::Definitions::new().add(arrow_marker()))
        .add(root)
        .to_string()
}

/// Renders Mermaid flowcharts with a rank layout.
#[derive(Debug, Clone, Default)]
pub struct FlowchartSvgRenderer {
    options: LayoutOptions,
}

impl FlowchartSvgRenderer {
    pub fn new(options: LayoutOptions) -> Self {
        Self { options }
    }
}

impl Renderer for FlowchartSvgRenderer {
    fn render(&self, source: &DiagramSource, render_id: u64) -> Result<RenderedDiagram, RenderError> {
        if source.is_blank() {
            return Err(RenderError::EmptyDocument);
        }
        let doc = scan(source.as_str());
        if let Some(header) = doc.header().filter(|header| !header.is_flowchart()) {
            return Err(RenderError::UnsupportedDiagram { header: header.keyword.to_owned() });
        }

        let graph = parse_flowchart(source.as_str())
            .map_err(|err| RenderError::Syntax { message: err.to_string() })?;
        let layout = layout_graph(&graph, &self.options);
        let svg = graph_to_svg(&graph, source.as_str(), &layout, render_id);
        let node_ids = graph.nodes().iter().map(|node| node.id.as_str().to_owned()).collect();
        Ok(RenderedDiagram { svg, render_id, node_ids })
    }
}
