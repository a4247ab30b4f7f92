// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Tessera-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Tessera and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::ids::{EdgeId, NodeId};
use super::style::NodeStyle;

/// Node/edge graph used while the session is in graph mode.
///
/// Nodes and edges are kept in insertion order so that exports and history restores are stable.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GraphState {
    nodes: Vec<GraphNode>,
    edges: Vec<GraphEdge>,
    #[serde(default)]
    direction: FlowDirection,
}

impl GraphState {
    pub fn new(direction: FlowDirection) -> Self {
        Self { nodes: Vec::new(), edges: Vec::new(), direction }
    }

    pub fn from_parts(nodes: Vec<GraphNode>, edges: Vec<GraphEdge>, direction: FlowDirection) -> Self {
        Self { nodes, edges, direction }
    }

    pub fn nodes(&self) -> &[GraphNode] {
        &self.nodes
    }

    pub fn nodes_mut(&mut self) -> &mut Vec<GraphNode> {
        &mut self.nodes
    }

    pub fn edges(&self) -> &[GraphEdge] {
        &self.edges
    }

    pub fn edges_mut(&mut self) -> &mut Vec<GraphEdge> {
        &mut self.edges
    }

    pub fn direction(&self) -> FlowDirection {
        self.direction
    }

    pub fn set_direction(&mut self, direction: FlowDirection) {
        self.direction = direction;
    }

    pub fn node(&self, node_id: &str) -> Option<&GraphNode> {
        self.nodes.iter().find(|node| node.id.as_str() == node_id)
    }

    pub fn node_mut(&mut self, node_id: &str) -> Option<&mut GraphNode> {
        self.nodes.iter_mut().find(|node| node.id.as_str() == node_id)
    }

    pub fn edge(&self, edge_id: &str) -> Option<&GraphEdge> {
        self.edges.iter().find(|edge| edge.id.as_str() == edge_id)
    }

    pub fn contains_node(&self, node_id: &str) -> bool {
        self.node(node_id).is_some()
    }

    /// Replace nodes and edges wholesale, keeping the layout direction.
    pub fn replace_contents(&mut self, nodes: Vec<GraphNode>, edges: Vec<GraphEdge>) {
        self.nodes = nodes;
        self.edges = edges;
    }

    pub fn into_parts(self) -> (Vec<GraphNode>, Vec<GraphEdge>) {
        (self.nodes, self.edges)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: NodeId,
    pub label: String,
    #[serde(default)]
    pub shape: NodeShape,
    #[serde(default)]
    pub position: Point,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<NodeStyle>,
}

impl GraphNode {
    pub fn new(id: NodeId, label: impl Into<String>) -> Self {
        Self {
            id,
            label: label.into(),
            shape: NodeShape::default(),
            position: Point::default(),
            style: None,
        }
    }

    pub fn with_shape(mut self, shape: NodeShape) -> Self {
        self.shape = shape;
        self
    }

    pub fn with_position(mut self, position: Point) -> Self {
        self.position = position;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub id: EdgeId,
    pub from: NodeId,
    pub to: NodeId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Mermaid connector (`-->`, `-.->`, `==>`, ...). `None` means the default arrow.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connector: Option<String>,
}

impl GraphEdge {
    pub fn new(id: EdgeId, from: NodeId, to: NodeId) -> Self {
        Self { id, from, to, label: None, connector: None }
    }

    pub fn with_label(mut self, label: Option<String>) -> Self {
        self.label = label;
        self
    }

    pub fn touches(&self, node_id: &str) -> bool {
        self.from.as_str() == node_id || self.to.as_str() == node_id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Flowchart node shapes and their Mermaid delimiters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeShape {
    #[default]
    Rect,
    Round,
    Stadium,
    Subroutine,
    Cylinder,
    Circle,
    DoubleCircle,
    Asymmetric,
    Diamond,
    Hexagon,
    Parallelogram,
    ParallelogramAlt,
    Trapezoid,
    TrapezoidAlt,
}

impl NodeShape {
    pub const ALL: [NodeShape; 14] = [
        Self::Rect,
        Self::Round,
        Self::Stadium,
        Self::Subroutine,
        Self::Cylinder,
        Self::Circle,
        Self::DoubleCircle,
        Self::Asymmetric,
        Self::Diamond,
        Self::Hexagon,
        Self::Parallelogram,
        Self::ParallelogramAlt,
        Self::Trapezoid,
        Self::TrapezoidAlt,
    ];

    pub fn delimiters(self) -> (&'static str, &'static str) {
        match self {
            Self::Rect => ("[", "]"),
            Self::Round => ("(", ")"),
            Self::Stadium => ("([", "])"),
            Self::Subroutine => ("[[", "]]"),
            Self::Cylinder => ("[(", ")]"),
            Self::Circle => ("((", "))"),
            Self::DoubleCircle => ("(((", ")))"),
            Self::Asymmetric => (">", "]"),
            Self::Diamond => ("{", "}"),
            Self::Hexagon => ("{{", "}}"),
            Self::Parallelogram => ("[/", "/]"),
            Self::ParallelogramAlt => ("[\\", "\\]"),
            Self::Trapezoid => ("[/", "\\]"),
            Self::TrapezoidAlt => ("[\\", "/]"),
        }
    }

    pub fn open(self) -> &'static str {
        self.delimiters().0
    }

    pub fn close(self) -> &'static str {
        self.delimiters().1
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Rect => "rect",
            Self::Round => "round",
            Self::Stadium => "stadium",
            Self::Subroutine => "subroutine",
            Self::Cylinder => "cylinder",
            Self::Circle => "circle",
            Self::DoubleCircle => "double_circle",
            Self::Asymmetric => "asymmetric",
            Self::Diamond => "diamond",
            Self::Hexagon => "hexagon",
            Self::Parallelogram => "parallelogram",
            Self::ParallelogramAlt => "parallelogram_alt",
            Self::Trapezoid => "trapezoid",
            Self::TrapezoidAlt => "trapezoid_alt",
        }
    }
}

impl fmt::Display for NodeShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FlowDirection {
    #[default]
    #[serde(rename = "TB", alias = "TD")]
    TopDown,
    #[serde(rename = "BT")]
    BottomUp,
    #[serde(rename = "LR")]
    LeftRight,
    #[serde(rename = "RL")]
    RightLeft,
}

impl FlowDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TopDown => "TB",
            Self::BottomUp => "BT",
            Self::LeftRight => "LR",
            Self::RightLeft => "RL",
        }
    }

    pub fn is_horizontal(self) -> bool {
        matches!(self, Self::LeftRight | Self::RightLeft)
    }
}

impl fmt::Display for FlowDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownDirection(pub String);

impl fmt::Display for UnknownDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown flowchart direction: {} (expected TD/TB/LR/RL/BT)", self.0)
    }
}

impl std::error::Error for UnknownDirection {}

impl FromStr for FlowDirection {
    type Err = UnknownDirection;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "TD" | "TB" => Ok(Self::TopDown),
            "BT" => Ok(Self::BottomUp),
            "LR" => Ok(Self::LeftRight),
            "RL" => Ok(Self::RightLeft),
            other => Err(UnknownDirection(other.to_owned())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: &str) -> GraphNode {
        GraphNode::new(NodeId::new(id).expect("node id"), id)
    }

    #[test]
    fn lookups_find_nodes_and_edges_by_id() {
        let mut graph = GraphState::new(FlowDirection::LeftRight);
        graph.nodes_mut().push(node("A"));
        graph.nodes_mut().push(node("B"));
        graph.edges_mut().push(GraphEdge::new(
            EdgeId::new("e0").expect("edge id"),
            NodeId::new("A").expect("node id"),
            NodeId::new("B").expect("node id"),
        ));

        assert!(graph.contains_node("B"));
        assert!(!graph.contains_node("C"));
        assert!(graph.edge("e0").expect("edge").touches("A"));
        graph.node_mut("A").expect("node").label = "Alpha".to_owned();
        assert_eq!(graph.node("A").expect("node").label, "Alpha");
    }

    #[test]
    fn direction_parses_mermaid_spellings() {
        assert_eq!("TD".parse::<FlowDirection>(), Ok(FlowDirection::TopDown));
        assert_eq!("TB".parse::<FlowDirection>(), Ok(FlowDirection::TopDown));
        assert_eq!("RL".parse::<FlowDirection>(), Ok(FlowDirection::RightLeft));
        assert!("XY".parse::<FlowDirection>().is_err());
    }

    #[test]
    fn every_shape_has_balanced_delimiters() {
        for shape in NodeShape::ALL {
            let (open, close) = shape.delimiters();
            assert!(!open.is_empty() && !close.is_empty(), "{shape}");
        }
    }
}
