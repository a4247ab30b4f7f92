// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Tessera-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Tessera and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Graph-mode mutations.
//!
//! Ops are applied to a copy of the graph and committed only when every op succeeded, so a
//! failing batch leaves the graph exactly as it was.

use std::collections::HashSet;

use thiserror::Error;

use crate::model::{EdgeId, GraphEdge, GraphNode, GraphState, NodeId, NodeShape, NodeStyle, Point};

#[derive(Debug, Clone, PartialEq)]
pub enum GraphOp {
    AddNode { node: GraphNode },
    /// Removes the node and every edge that touches it.
    RemoveNode { node_id: NodeId },
    UpdateNode { node_id: NodeId, patch: NodePatch },
    MoveNode { node_id: NodeId, position: Point },
    AddEdge { edge: GraphEdge },
    RemoveEdge { edge_id: EdgeId },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodePatch {
    pub label: Option<String>,
    pub shape: Option<NodeShape>,
    /// `Some(None)` clears the style.
    pub style: Option<Option<NodeStyle>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ElementRef {
    Node(NodeId),
    Edge(EdgeId),
}

/// Elements touched by one batch of ops, each listed once under its net effect.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GraphDelta {
    pub added: Vec<ElementRef>,
    pub removed: Vec<ElementRef>,
    pub updated: Vec<ElementRef>,
}

impl GraphDelta {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.updated.is_empty()
    }
}

#[derive(Debug, Default)]
struct DeltaBuilder {
    added: HashSet<ElementRef>,
    removed: HashSet<ElementRef>,
    updated: HashSet<ElementRef>,
}

impl DeltaBuilder {
    fn record_added(&mut self, element: ElementRef) {
        // Re-adding something removed earlier in the batch nets out to an update.
        if self.removed.remove(&element) {
            self.updated.insert(element);
            return;
        }
        self.added.insert(element);
    }

    fn record_removed(&mut self, element: ElementRef) {
        self.updated.remove(&element);
        if self.added.remove(&element) {
            return;
        }
        self.removed.insert(element);
    }

    fn record_updated(&mut self, element: ElementRef) {
        if self.added.contains(&element) || self.removed.contains(&element) {
            return;
        }
        self.updated.insert(element);
    }

    fn finish(self) -> GraphDelta {
        let sorted = |set: HashSet<ElementRef>| {
            let mut items = set.into_iter().collect::<Vec<_>>();
            items.sort();
            items
        };
        GraphDelta {
            added: sorted(self.added),
            removed: sorted(self.removed),
            updated: sorted(self.updated),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphOpError {
    #[error("node not found (id={node_id})")]
    NodeNotFound { node_id: NodeId },
    #[error("edge not found (id={edge_id})")]
    EdgeNotFound { edge_id: EdgeId },
    #[error("node already exists (id={node_id})")]
    DuplicateNode { node_id: NodeId },
    #[error("edge already exists (id={edge_id})")]
    DuplicateEdge { edge_id: EdgeId },
    #[error("edge {edge_id} references missing node {node_id}")]
    EdgeEndpointMissing { edge_id: EdgeId, node_id: NodeId },
}

/// Apply `ops` in order. Either all of them take effect or none do.
pub fn apply_graph_ops(graph: &mut GraphState, ops: &[GraphOp]) -> Result<GraphDelta, GraphOpError> {
    if ops.is_empty() {
        return Ok(GraphDelta::default());
    }

    let mut next = graph.clone();
    let mut delta = DeltaBuilder::default();
    for op in ops {
        apply_graph_op(&mut next, op, &mut delta)?;
    }

    *graph = next;
    Ok(delta.finish())
}

fn apply_graph_op(
    graph: &mut GraphState,
    op: &GraphOp,
    delta: &mut DeltaBuilder,
) -> Result<(), GraphOpError> {
    match op {
        GraphOp::AddNode { node } => {
            if graph.contains_node(node.id.as_str()) {
                return Err(GraphOpError::DuplicateNode { node_id: node.id.clone() });
            }
            graph.nodes_mut().push(node.clone());
            delta.record_added(ElementRef::Node(node.id.clone()));
            Ok(())
        }
        GraphOp::RemoveNode { node_id } => {
            let Some(index) = graph.nodes().iter().position(|node| &node.id == node_id) else {
                return Err(GraphOpError::NodeNotFound { node_id: node_id.clone() });
            };
            graph.nodes_mut().remove(index);

            let removed_edges = graph
                .edges()
                .iter()
                .filter(|edge| edge.touches(node_id.as_str()))
                .map(|edge| edge.id.clone())
                .collect::<Vec<_>>();
            graph.edges_mut().retain(|edge| !edge.touches(node_id.as_str()));
            for edge_id in removed_edges {
                delta.record_removed(ElementRef::Edge(edge_id));
            }
            delta.record_removed(ElementRef::Node(node_id.clone()));
            Ok(())
        }
        GraphOp::UpdateNode { node_id, patch } => {
            let Some(node) = graph.node_mut(node_id.as_str()) else {
                return Err(GraphOpError::NodeNotFound { node_id: node_id.clone() });
            };
            if let Some(label) = &patch.label {
                node.label = label.clone();
            }
            if let Some(shape) = patch.shape {
                node.shape = shape;
            }
            if let Some(style) = &patch.style {
                node.style = style.clone().filter(|style| !style.is_empty());
            }
            delta.record_updated(ElementRef::Node(node_id.clone()));
            Ok(())
        }
        GraphOp::MoveNode { node_id, position } => {
            let Some(node) = graph.node_mut(node_id.as_str()) else {
                return Err(GraphOpError::NodeNotFound { node_id: node_id.clone() });
            };
            node.position = *position;
            delta.record_updated(ElementRef::Node(node_id.clone()));
            Ok(())
        }
        GraphOp::AddEdge { edge } => {
            if graph.edge(edge.id.as_str()).is_some() {
                return Err(GraphOpError::DuplicateEdge { edge_id: edge.id.clone() });
            }
            for endpoint in [&edge.from, &edge.to] {
                if !graph.contains_node(endpoint.as_str()) {
                    return Err(GraphOpError::EdgeEndpointMissing {
                        edge_id: edge.id.clone(),
                        node_id: endpoint.clone(),
                    });
                }
            }
            graph.edges_mut().push(edge.clone());
            delta.record_added(ElementRef::Edge(edge.id.clone()));
            Ok(())
        }
        GraphOp::RemoveEdge { edge_id } => {
            let before = graph.edges().len();
            graph.edges_mut().retain(|edge| &edge.id != edge_id);
            if graph.edges().len() == before {
                return Err(GraphOpError::EdgeNotFound { edge_id: edge_id.clone() });
            }
            delta.record_removed(ElementRef::Edge(edge_id.clone()));
            Ok(())
        }
    }
}
