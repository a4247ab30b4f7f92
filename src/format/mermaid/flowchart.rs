// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Tessera-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Tessera and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::collections::BTreeMap;

use thiserror::Error;

use super::ident::validate_mermaid_ident;
pub use super::ident::MermaidIdentError;
use super::label::{decode_entities, sanitize_label};
use super::statement::{
    is_edge_op_char, is_probable_edge_operator, scan, Keyword, NodeOccurrence, Statement,
    StatementKind,
};

use crate::model::{
    EdgeId, FlowDirection, GraphEdge, GraphNode, GraphState, IdAllocator, NodeId, NodeShape,
    NodeStyle,
};

/// Prefix of the per-node style classes written by [`crate::ops::apply_style`].
pub const STYLE_CLASS_PREFIX: &str = "tessera_";

pub fn style_class_name(node_id: &str) -> String {
    format!("{STYLE_CLASS_PREFIX}{node_id}")
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MermaidFlowchartParseError {
    #[error("expected 'flowchart' or 'graph' as the first statement")]
    MissingHeader,
    #[error("invalid flowchart direction on line {line_no}: {direction} (expected TD/TB/LR/RL/BT)")]
    InvalidDirection { line_no: usize, direction: String },
    #[error("unsupported Mermaid syntax on line {line_no} ({reason}): {line}")]
    UnsupportedSyntax { line_no: usize, line: String, reason: &'static str },
    #[error("invalid node id on line {line_no}: {name} ({reason})")]
    InvalidNodeId { line_no: usize, name: String, reason: MermaidIdentError },
    #[error(
        "conflicting label for node '{mermaid_id}' on line {line_no}: '{existing_label}' vs '{new_label}'"
    )]
    ConflictingNodeLabel {
        line_no: usize,
        mermaid_id: String,
        existing_label: String,
        new_label: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MermaidFlowchartExportError {
    #[error("edge {edge_id} references missing node id: {node_id}")]
    MissingNode { edge_id: EdgeId, node_id: NodeId },
    #[error("cannot export node id as Mermaid identifier: {node_id} ({reason})")]
    InvalidNodeId { node_id: NodeId, reason: MermaidIdentError },
    #[error("cannot export edge {edge_id}: unsupported connector {connector:?}")]
    InvalidConnector { edge_id: EdgeId, connector: String },
}

/// Split `keyword target body...` into `(target, body)`.
fn keyword_args(text: &str) -> Option<(&str, &str)> {
    let rest = text.trim_start();
    let rest = rest[rest.find(char::is_whitespace)?..].trim_start();
    let split = rest.find(char::is_whitespace)?;
    Some((&rest[..split], rest[split..].trim()))
}

#[derive(Default)]
struct StyleRules {
    class_defs: BTreeMap<String, NodeStyle>,
    node_classes: BTreeMap<String, Vec<String>>,
    inline: BTreeMap<String, NodeStyle>,
}

impl StyleRules {
    fn read(&mut self, keyword: Keyword, statement: &Statement<'_>) {
        let Some((target, body)) = keyword_args(statement.text) else {
            return;
        };
        match keyword {
            Keyword::ClassDef => {
                for name in target.split(',') {
                    self.class_defs
                        .insert(name.trim().to_owned(), NodeStyle::parse_class_def_body(body));
                }
            }
            Keyword::Class => {
                for node in target.split(',') {
                    self.node_classes
                        .entry(node.trim().to_owned())
                        .or_default()
                        .extend(body.split(',').map(|name| name.trim().to_owned()));
                }
            }
            Keyword::Style => {
                let style = NodeStyle::parse_class_def_body(body);
                let entry = self.inline.entry(target.trim().to_owned()).or_default();
                *entry = entry.merged_with(&style);
            }
            _ => {}
        }
    }

    fn style_for(&self, node_id: &str) -> Option<NodeStyle> {
        let mut style = NodeStyle::default();
        for class in self.node_classes.get(node_id).into_iter().flatten() {
            if let Some(class_style) = self.class_defs.get(class) {
                style = style.merged_with(class_style);
            }
        }
        if let Some(inline) = self.inline.get(node_id) {
            style = style.merged_with(inline);
        }
        (!style.is_empty()).then_some(style)
    }
}

fn ensure_node(
    graph: &mut GraphState,
    occurrence: &NodeOccurrence<'_>,
    line_no: usize,
) -> Result<NodeId, MermaidFlowchartParseError> {
    let mermaid_id = occurrence.node_id;
    validate_mermaid_ident(mermaid_id).map_err(|reason| MermaidFlowchartParseError::InvalidNodeId {
        line_no,
        name: mermaid_id.to_owned(),
        reason,
    })?;
    let node_id = NodeId::new(mermaid_id).map_err(|_| MermaidFlowchartParseError::InvalidNodeId {
        line_no,
        name: mermaid_id.to_owned(),
        reason: MermaidIdentError::ContainsSlash,
    })?;

    let explicit = occurrence
        .shape
        .as_ref()
        .map(|shape| (decode_entities(shape.label()).into_owned(), shape.shape));

    let Some(existing) = graph.node_mut(mermaid_id) else {
        let (label, shape) = explicit.unwrap_or_else(|| (mermaid_id.to_owned(), NodeShape::Rect));
        graph.nodes_mut().push(GraphNode::new(node_id.clone(), label).with_shape(shape));
        return Ok(node_id);
    };

    if let Some((label, shape)) = explicit {
        if existing.label == label || existing.label == mermaid_id {
            // Implicit (id-only) nodes are upgraded by their first labelled declaration.
            existing.label = label;
            existing.shape = shape;
        } else {
            return Err(MermaidFlowchartParseError::ConflictingNodeLabel {
                line_no,
                mermaid_id: mermaid_id.to_owned(),
                existing_label: existing.label.clone(),
                new_label: label,
            });
        }
    }

    Ok(node_id)
}

/// Parse a Mermaid `flowchart` into the graph used by graph mode.
///
/// Supported:
/// - `flowchart`/`graph` header with optional direction (`TD`, `TB`, `LR`, `RL`, `BT`)
/// - comments, front matter, `;`-separated statements
/// - every node shape the statement scanner knows, quoted or bare labels (entities decoded)
/// - edges, chains, `&` groups and edge labels
/// - `classDef`/`class`/`style` rules, folded into each node's [`NodeStyle`]
///
/// `subgraph`/`end`, `click`, `linkStyle` and accessibility statements are accepted and dropped.
/// Anything else is rejected with the offending line.
pub fn parse_flowchart(input: &str) -> Result<GraphState, MermaidFlowchartParseError> {
    let doc = scan(input);
    let header = doc.header().ok_or(MermaidFlowchartParseError::MissingHeader)?;
    if !header.is_flowchart() {
        return Err(MermaidFlowchartParseError::MissingHeader);
    }

    let direction = match header.direction {
        None => FlowDirection::default(),
        Some(direction) => {
            direction.parse().map_err(|_| MermaidFlowchartParseError::InvalidDirection {
                line_no: header.line + 1,
                direction: direction.to_owned(),
            })?
        }
    };

    let mut graph = GraphState::new(direction);
    let mut styles = StyleRules::default();
    let mut ids = IdAllocator::default();

    for statement in doc.statements() {
        let line_no = statement.line + 1;
        let chain = match &statement.kind {
            StatementKind::Keyword(keyword) => {
                styles.read(*keyword, statement);
                continue;
            }
            StatementKind::Unparsed { reason } => {
                return Err(MermaidFlowchartParseError::UnsupportedSyntax {
                    line_no,
                    line: statement.text.to_owned(),
                    reason,
                });
            }
            StatementKind::Chain(chain) => chain,
        };

        let mut group_ids = Vec::with_capacity(chain.groups.len());
        for group in &chain.groups {
            let mut node_ids = Vec::with_capacity(group.len());
            for occurrence in group {
                node_ids.push(ensure_node(&mut graph, occurrence, line_no)?);
            }
            group_ids.push(node_ids);
        }

        for (link, pair) in chain.links.iter().zip(group_ids.windows(2)) {
            let (sources, targets) = if link.reverse { (&pair[1], &pair[0]) } else { (&pair[0], &pair[1]) };
            for from in sources {
                for to in targets {
                    let mut edge = GraphEdge::new(ids.next_edge_id(), from.clone(), to.clone())
                        .with_label(link.label.map(|label| decode_entities(label).into_owned()));
                    edge.connector = (link.connector != "-->").then(|| link.connector.clone());
                    graph.edges_mut().push(edge);
                }
            }
        }
    }

    for node in graph.nodes_mut() {
        node.style = styles.style_for(node.id.as_str());
    }

    Ok(graph)
}

fn validate_export_connector(op: &str) -> bool {
    !op.is_empty() && op.chars().all(is_edge_op_char) && is_probable_edge_operator(op)
}

/// Export the graph as Mermaid `flowchart` text.
///
/// Nodes are emitted in graph order with quoted, sanitised labels, then edges, then one
/// `classDef`/`class` pair per styled node.
pub fn export_flowchart(graph: &GraphState) -> Result<String, MermaidFlowchartExportError> {
    let mut out = String::new();
    out.push_str("flowchart ");
    out.push_str(graph.direction().as_str());
    out.push('\n');

    for node in graph.nodes() {
        validate_mermaid_ident(node.id.as_str()).map_err(|reason| {
            MermaidFlowchartExportError::InvalidNodeId { node_id: node.id.clone(), reason }
        })?;
        let (open, close) = node.shape.delimiters();
        out.push_str("    ");
        out.push_str(node.id.as_str());
        out.push_str(open);
        out.push('"');
        out.push_str(&sanitize_label(&node.label));
        out.push('"');
        out.push_str(close);
        out.push('\n');
    }

    for edge in graph.edges() {
        for endpoint in [&edge.from, &edge.to] {
            if !graph.contains_node(endpoint.as_str()) {
                return Err(MermaidFlowchartExportError::MissingNode {
                    edge_id: edge.id.clone(),
                    node_id: endpoint.clone(),
                });
            }
        }
        let connector = edge.connector.as_deref().unwrap_or("-->");
        if !validate_export_connector(connector) {
            return Err(MermaidFlowchartExportError::InvalidConnector {
                edge_id: edge.id.clone(),
                connector: connector.to_owned(),
            });
        }

        out.push_str("    ");
        out.push_str(edge.from.as_str());
        out.push(' ');
        out.push_str(connector);
        if let Some(label) = edge.label.as_deref().map(sanitize_label).filter(|l| !l.is_empty()) {
            out.push('|');
            out.push_str(&label);
            out.push('|');
        }
        out.push(' ');
        out.push_str(edge.to.as_str());
        out.push('\n');
    }

    for node in graph.nodes() {
        let Some(style) = node.style.as_ref().filter(|style| !style.is_empty()) else {
            continue;
        };
        let class_name = style_class_name(node.id.as_str());
        out.push_str(&format!("    classDef {class_name} {}\n", style.to_class_def_body()));
        out.push_str(&format!("    class {} {class_name}\n", node.id));
    }

    Ok(out)
}
