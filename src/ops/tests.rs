// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Tessera-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Tessera and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use proptest::prelude::*;
use rstest::rstest;

use crate::error::{MutationError, ParseError, ValidationError};
use crate::format::mermaid::{sanitize_label, scan};
use crate::model::{
    DiagramSource, EdgeId, FlowDirection, GraphEdge, GraphNode, GraphState, NodeId, NodeStyle,
    Point,
};

use super::{
    apply_entity_edit, apply_graph_ops, apply_style, declared_labels, node_ids, update_label,
    ElementRef, EntityEdit, GraphOp, GraphOpError, LabelPolicy, NodePatch,
};

const AUTH: &str = "flowchart TD\n    A[\"Auth Service\"] --> B[Database]\n    B --> C\n";

fn source(text: &str) -> DiagramSource {
    DiagramSource::new(text)
}

fn node_id(value: &str) -> NodeId {
    NodeId::new(value).expect("node id")
}

fn edge_id(value: &str) -> EdgeId {
    EdgeId::new(value).expect("edge id")
}

fn fill(value: &str) -> NodeStyle {
    NodeStyle { fill: Some(value.to_owned()), ..NodeStyle::default() }
}

#[test]
fn update_label_rewrites_only_the_payload() {
    let out = update_label(&source(AUTH), "A", "Auth & Identity Service", &LabelPolicy::default())
        .expect("update");
    assert_eq!(
        out.as_str(),
        "flowchart TD\n    A[\"Auth & Identity Service\"] --> B[Database]\n    B --> C\n"
    );
    assert_eq!(out.as_str().matches("Auth & Identity Service").count(), 1);
}

#[rstest]
#[case("B", "Primary DB", "B[\"Primary DB\"]")]
#[case("A", "say \"hi\"", "A[\"say #quot;hi#quot;\"]")]
#[case("A", "x --> y", "A[\"x --#gt; y\"]")]
#[case("A", "multi\nline\tlabel", "A[\"multi line label\"]")]
fn update_label_writes_quoted_sanitized_payload(
    #[case] id: &str,
    #[case] label: &str,
    #[case] expected: &str,
) {
    let out = update_label(&source(AUTH), id, label, &LabelPolicy::default()).expect("update");
    assert!(out.as_str().contains(expected), "{expected} missing from {out}");
}

#[test]
fn update_label_keeps_shape_delimiters() {
    let text = "flowchart LR\n  C((Cache)) --> D{Decide?}\n";
    let out = update_label(&source(text), "C", "Hot Cache", &LabelPolicy::default())
        .expect("update");
    assert_eq!(out.as_str(), "flowchart LR\n  C((\"Hot Cache\")) --> D{Decide?}\n");

    let out = update_label(&out, "D", "Retry?", &LabelPolicy::default()).expect("update");
    assert_eq!(out.as_str(), "flowchart LR\n  C((\"Hot Cache\")) --> D{\"Retry?\"}\n");
}

#[test]
fn update_label_promotes_a_bare_reference() {
    let out = update_label(&source(AUTH), "C", "Cache", &LabelPolicy::default()).expect("update");
    assert_eq!(
        out.as_str(),
        "flowchart TD\n    A[\"Auth Service\"] --> B[Database]\n    B --> C[\"Cache\"]\n"
    );
}

#[test]
fn update_label_reports_unknown_node() {
    let err = update_label(&source(AUTH), "Z", "Nope", &LabelPolicy::default())
        .expect_err("unknown node");
    assert_eq!(err, MutationError::Parse(ParseError::NodeNotFound { node_id: "Z".to_owned() }));
}

#[test]
fn update_label_does_not_match_id_prefixes() {
    let text = "flowchart TD\n  AB[Other] --> A[Target]\n";
    let out = update_label(&source(text), "A", "Changed", &LabelPolicy::default()).expect("update");
    assert_eq!(out.as_str(), "flowchart TD\n  AB[Other] --> A[\"Changed\"]\n");
}

#[test]
fn update_label_rejects_duplicate_declarations() {
    let text = "flowchart TD\n  A[One]\n  A[Two]\n";
    let err = update_label(&source(text), "A", "Three", &LabelPolicy::default())
        .expect_err("ambiguous");
    assert_eq!(
        err,
        MutationError::Parse(ParseError::AmbiguousNode { node_id: "A".to_owned(), count: 2 })
    );
}

#[rstest]
#[case("", ValidationError::EmptyLabel)]
#[case("   \n\t", ValidationError::EmptyLabel)]
#[case("abcdef", ValidationError::LabelTooLong { len: 6, max: 5 })]
#[case("[[]]", ValidationError::LabelTooLong { len: 16, max: 5 })]
fn update_label_validates_before_touching_source(
    #[case] label: &str,
    #[case] expected: ValidationError,
) {
    let policy = LabelPolicy { max_len: 5 };
    let err = update_label(&source(AUTH), "A", label, &policy).expect_err("invalid label");
    assert_eq!(err, MutationError::Validation(expected));
}

#[test]
fn update_label_leaves_non_flowchart_sources_alone() {
    let text = "sequenceDiagram\n  Alice->>Bob: hi\n";
    let err = update_label(&source(text), "Alice", "Carol", &LabelPolicy::default())
        .expect_err("no flowchart nodes");
    assert!(matches!(err, MutationError::Parse(ParseError::NodeNotFound { .. })));
}

/// One declaration per node, a spine of edges and a class rule.
fn flowchart_with_labels(labels: &[String]) -> String {
    let mut text = String::from("flowchart TD\n");
    for (idx, label) in labels.iter().enumerate() {
        text.push_str(&format!("    n{idx}[\"{label}\"]\n"));
    }
    for idx in 1..labels.len() {
        text.push_str(&format!("    n{} --> n{idx}\n", idx - 1));
    }
    text.push_str("    classDef hot fill:#f96\n    class n0 hot\n");
    text
}

proptest! {
    #[test]
    fn update_label_changes_exactly_one_statement(
        labels in prop::collection::vec("[A-Za-z][A-Za-z0-9 ]{0,12}", 2..7),
        label in "[a-z &#;\"<>\\[\\](){}|]{0,30}[a-z]",
        pick in any::<prop::sample::Index>(),
    ) {
        let target = format!("n{}", pick.index(labels.len()));
        let before = flowchart_with_labels(&labels);
        let after = update_label(&source(&before), &target, &label, &LabelPolicy::default())
            .expect("update");

        let old_doc = scan(&before);
        let new_doc = scan(after.as_str());
        prop_assert_eq!(old_doc.statements().len(), new_doc.statements().len());
        let changed = old_doc
            .statements()
            .iter()
            .zip(new_doc.statements())
            .filter(|(old, new)| old.text != new.text)
            .map(|(old, _)| old.text)
            .collect::<Vec<_>>();
        prop_assert_eq!(changed.len(), 1);
        let prefix = format!("{target}[");
        prop_assert!(changed[0].starts_with(&prefix));

        let declared = new_doc.declarations_of(&target).collect::<Vec<_>>();
        prop_assert_eq!(declared.len(), 1);
        let shape = declared[0].shape.as_ref().expect("declaration keeps its shape");
        prop_assert_eq!(shape.label(), sanitize_label(&label));
    }

    #[test]
    fn update_label_twice_equals_once(
        labels in prop::collection::vec("[A-Za-z][A-Za-z0-9 ]{0,12}", 2..7),
        label in "[a-z &#;\"<>\\[\\](){}|]{0,30}[a-z]",
        pick in any::<prop::sample::Index>(),
    ) {
        let target = format!("n{}", pick.index(labels.len()));
        let policy = LabelPolicy::default();
        let once = update_label(&source(&flowchart_with_labels(&labels)), &target, &label, &policy)
            .expect("update");
        let twice = update_label(&once, &target, &label, &policy).expect("update again");
        prop_assert_eq!(twice.as_str(), once.as_str());
    }
}

#[test]
fn apply_style_appends_class_rule_with_matching_indent() {
    let out = apply_style(&source(AUTH), "A", &fill("#f9f")).expect("style");
    assert_eq!(
        out.as_str(),
        format!("{AUTH}    classDef tessera_A fill:#f9f\n    class A tessera_A\n")
    );
}

#[test]
fn apply_style_replaces_existing_rule_in_place() {
    let once = apply_style(&source(AUTH), "A", &fill("#f9f")).expect("style");
    let style = NodeStyle {
        stroke: Some("#333".to_owned()),
        stroke_width: Some("2px".to_owned()),
        ..NodeStyle::default()
    };
    let twice = apply_style(&once, "A", &style).expect("restyle");

    assert_eq!(
        twice.as_str(),
        format!("{AUTH}    classDef tessera_A stroke:#333,stroke-width:2px\n    class A tessera_A\n")
    );
    assert_eq!(twice.as_str().matches("class A tessera_A").count(), 1);
}

#[test]
fn apply_style_with_empty_style_removes_the_rule() {
    let styled = apply_style(&source(AUTH), "A", &fill("#f9f")).expect("style");
    let cleared = apply_style(&styled, "A", &NodeStyle::default()).expect("clear");
    assert_eq!(cleared.as_str(), AUTH);
}

#[test]
fn apply_style_handles_missing_trailing_newline() {
    let text = "flowchart LR\nA-->B";
    let style = NodeStyle { color: Some("#fff".to_owned()), ..NodeStyle::default() };
    let out = apply_style(&source(text), "B", &style).expect("style");
    assert_eq!(out.as_str(), "flowchart LR\nA-->B\nclassDef tessera_B color:#fff\nclass B tessera_B\n");
}

#[test]
fn apply_style_rejects_unsafe_values() {
    let err = apply_style(&source(AUTH), "A", &fill("red;")).expect_err("invalid");
    assert_eq!(
        err,
        MutationError::Validation(ValidationError::InvalidStyle {
            property: "fill",
            value: "red;".to_owned(),
        })
    );
}

#[test]
fn apply_style_requires_a_known_node() {
    let err = apply_style(&source(AUTH), "Q", &fill("#fff")).expect_err("unknown");
    assert_eq!(err, MutationError::Parse(ParseError::NodeNotFound { node_id: "Q".to_owned() }));
}

#[test]
fn styled_source_still_parses_as_a_flowchart() {
    let out = apply_style(&source(AUTH), "B", &fill("#eef")).expect("style");
    let graph = crate::format::mermaid::parse_flowchart(out.as_str()).expect("parse");
    let b = graph.node("B").expect("B");
    assert_eq!(b.style.as_ref().and_then(|style| style.fill.as_deref()), Some("#eef"));
}

#[test]
fn apply_entity_edit_applies_label_then_style() {
    let edit = EntityEdit { label: Some("Gateway".to_owned()), style: Some(fill("#0f0")) };
    let out = apply_entity_edit(&source(AUTH), "A", &edit, &LabelPolicy::default()).expect("edit");
    assert!(out.as_str().contains("A[\"Gateway\"]"));
    assert!(out.as_str().contains("classDef tessera_A fill:#0f0"));
    assert!(EntityEdit::default().is_empty());
}

#[test]
fn declared_labels_are_decoded() {
    let text = "flowchart TD\n  A[\"say #quot;hi#quot;\"] --> B\n  B[Store] --> A\n";
    assert_eq!(
        declared_labels(&source(text)),
        vec![
            ("A".to_owned(), "say \"hi\"".to_owned()),
            ("B".to_owned(), "Store".to_owned()),
        ]
    );
    assert_eq!(node_ids(&source(text)), vec!["A".to_owned(), "B".to_owned()]);
}

fn three_node_graph() -> GraphState {
    let nodes = ["a", "b", "c"]
        .into_iter()
        .map(|id| GraphNode::new(node_id(id), id.to_uppercase()))
        .collect();
    let edges = vec![
        GraphEdge::new(edge_id("e0"), node_id("a"), node_id("b")),
        GraphEdge::new(edge_id("e1"), node_id("b"), node_id("c")),
    ];
    GraphState::from_parts(nodes, edges, FlowDirection::TopDown)
}

#[test]
fn remove_node_cascades_to_touching_edges() {
    let mut graph = three_node_graph();
    let delta = apply_graph_ops(&mut graph, &[GraphOp::RemoveNode { node_id: node_id("b") }])
        .expect("apply");

    assert_eq!(graph.nodes().len(), 2);
    assert!(graph.edges().is_empty());
    assert_eq!(
        delta.removed,
        vec![
            ElementRef::Node(node_id("b")),
            ElementRef::Edge(edge_id("e0")),
            ElementRef::Edge(edge_id("e1")),
        ]
    );
}

#[test]
fn failing_batch_leaves_graph_untouched() {
    let mut graph = three_node_graph();
    let before = graph.clone();
    let err = apply_graph_ops(
        &mut graph,
        &[
            GraphOp::RemoveNode { node_id: node_id("a") },
            GraphOp::RemoveEdge { edge_id: edge_id("missing") },
        ],
    )
    .expect_err("missing edge");

    assert_eq!(err, GraphOpError::EdgeNotFound { edge_id: edge_id("missing") });
    assert_eq!(graph, before);
}

#[test]
fn add_edge_requires_both_endpoints() {
    let mut graph = three_node_graph();
    let edge = GraphEdge::new(edge_id("e9"), node_id("a"), node_id("zz"));
    let err = apply_graph_ops(&mut graph, &[GraphOp::AddEdge { edge }]).expect_err("endpoint");
    assert_eq!(
        err,
        GraphOpError::EdgeEndpointMissing { edge_id: edge_id("e9"), node_id: node_id("zz") }
    );
}

#[test]
fn duplicate_ids_are_rejected() {
    let mut graph = three_node_graph();
    let err = apply_graph_ops(&mut graph, &[GraphOp::AddNode { node: GraphNode::new(node_id("a"), "A") }])
        .expect_err("duplicate");
    assert_eq!(err, GraphOpError::DuplicateNode { node_id: node_id("a") });
}

#[test]
fn delta_nets_out_changes_within_a_batch() {
    let mut graph = three_node_graph();
    let delta = apply_graph_ops(
        &mut graph,
        &[
            GraphOp::AddNode { node: GraphNode::new(node_id("d"), "D") },
            GraphOp::MoveNode { node_id: node_id("d"), position: Point { x: 4.0, y: 2.0 } },
            GraphOp::RemoveNode { node_id: node_id("d") },
            GraphOp::UpdateNode {
                node_id: node_id("a"),
                patch: NodePatch { label: Some("Alpha".to_owned()), ..NodePatch::default() },
            },
        ],
    )
    .expect("apply");

    assert!(delta.added.is_empty());
    assert!(delta.removed.is_empty());
    assert_eq!(delta.updated, vec![ElementRef::Node(node_id("a"))]);
    assert_eq!(graph.node("a").map(|node| node.label.as_str()), Some("Alpha"));
    assert!(!graph.contains_node("d"));
}

#[test]
fn update_node_can_clear_style() {
    let mut graph = three_node_graph();
    let set = NodePatch { style: Some(Some(fill("#abc"))), ..NodePatch::default() };
    apply_graph_ops(&mut graph, &[GraphOp::UpdateNode { node_id: node_id("c"), patch: set }])
        .expect("style");
    assert!(graph.node("c").and_then(|node| node.style.as_ref()).is_some());

    let clear = NodePatch { style: Some(None), ..NodePatch::default() };
    apply_graph_ops(&mut graph, &[GraphOp::UpdateNode { node_id: node_id("c"), patch: clear }])
        .expect("clear");
    assert!(graph.node("c").and_then(|node| node.style.as_ref()).is_none());
}

#[test]
fn display_label_collapses_whitespace_without_escaping() {
    let policy = LabelPolicy::default();
    assert_eq!(policy.display_label("  Auth &\n \"Co\" ").expect("label"), "Auth & \"Co\"");
    assert_eq!(policy.display_label(" "), Err(ValidationError::EmptyLabel));
}
