// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Tessera-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Tessera and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Click wiring for rendered diagrams.
//!
//! Each render gets a fresh [`HandlerScope`]. Attaching a new scope bumps a shared generation
//! counter, so handlers of a replaced render stop firing immediately, even if the host still
//! holds on to them.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

pub type ClickCallback = Box<dyn FnMut(&NodeClick) + Send>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClickEvent {
    pub ctrl: bool,
    pub meta: bool,
    pub shift: bool,
    pub double: bool,
}

impl ClickEvent {
    pub fn plain() -> Self {
        Self::default()
    }

    pub fn with_ctrl() -> Self {
        Self { ctrl: true, ..Self::default() }
    }

    /// Ctrl-click and cmd-click add to (or remove from) the current selection.
    pub fn toggles_selection(&self) -> bool {
        self.ctrl || self.meta
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeClick {
    pub node_id: String,
    /// Visible text of the shape; used when the source has no label for `node_id`.
    pub label: String,
    pub event: ClickEvent,
}

/// Map a rendered shape id back to its DSL node id.
///
/// `flowchart-A-3` and `flowchart-A` both map to `A`; ids with dashes keep them
/// (`flowchart-api-gw-0` maps to `api-gw`). Edge and cluster ids map to `None`; only the prefix
/// segment decides that, so nodes such as `Ledger` or `dbCluster` stay clickable.
pub fn node_id_from_dom_id(dom_id: &str) -> Option<String> {
    if dom_id.starts_with("L-") || dom_id.starts_with("L_") {
        return None;
    }
    let parts = dom_id.split('-').collect::<Vec<_>>();
    let prefix = parts[0].to_ascii_lowercase();
    if ["subgraph", "cluster", "edge"].iter().any(|marker| prefix.starts_with(marker)) {
        return None;
    }

    let id = match parts.as_slice() {
        [] | [_] => return None,
        [_, id] => (*id).to_owned(),
        [_, middle @ .., last] if last.chars().all(|ch| ch.is_ascii_digit()) && !last.is_empty() => {
            middle.join("-")
        }
        [_, rest @ ..] => rest.join("-"),
    };
    (!id.is_empty()).then_some(id)
}

#[derive(Debug, Clone)]
struct WiredShape {
    node_id: String,
    label: String,
}

/// Hands out [`HandlerScope`]s, one per render.
#[derive(Debug, Default)]
pub struct SvgInteractionMapper {
    generation: Arc<AtomicU64>,
}

impl SvgInteractionMapper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Wire every `g.node` shape of `svg` whose id maps to one of `known_nodes` (any mapped id
    /// when `known_nodes` is empty). Older scopes are invalidated before this returns.
    pub fn attach(&mut self, svg: &str, known_nodes: &[String], callback: ClickCallback) -> HandlerScope {
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        let shapes = match roxmltree::Document::parse(svg) {
            Ok(document) => collect_shapes(&document, known_nodes),
            Err(err) => {
                tracing::warn!(error = %err, "rendered svg is not well-formed, no shapes wired");
                BTreeMap::new()
            }
        };
        tracing::debug!(generation, wired = shapes.len(), "interaction handlers attached");
        HandlerScope {
            shared: Arc::clone(&self.generation),
            generation,
            armed: true,
            shapes,
            callback,
        }
    }

    /// Disarm every scope handed out so far.
    pub fn detach_all(&mut self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
    }
}

fn collect_shapes(document: &roxmltree::Document<'_>, known_nodes: &[String]) -> BTreeMap<String, WiredShape> {
    let mut shapes = BTreeMap::new();
    let candidates = document.descendants().filter(|node| {
        node.has_tag_name("g")
            && node
                .attribute("class")
                .is_some_and(|class| class.split_whitespace().any(|token| token == "node"))
    });
    for shape in candidates {
        let Some(dom_id) = shape.attribute("id") else {
            continue;
        };
        let Some(node_id) = node_id_from_dom_id(dom_id) else {
            continue;
        };
        if !known_nodes.is_empty() && !known_nodes.iter().any(|known| *known == node_id) {
            tracing::debug!(dom_id, node_id, "shape does not map to a known node");
            continue;
        }
        let label = shape
            .descendants()
            .filter(|node| node.is_text())
            .filter_map(|node| node.text())
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        shapes.insert(dom_id.to_owned(), WiredShape { node_id, label });
    }
    shapes
}

/// Click handlers of one render. Disarmed by [`HandlerScope::detach`], by drop, or by the next
/// [`SvgInteractionMapper::attach`].
pub struct HandlerScope {
    shared: Arc<AtomicU64>,
    generation: u64,
    armed: bool,
    shapes: BTreeMap<String, WiredShape>,
    callback: ClickCallback,
}

impl std::fmt::Debug for HandlerScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerScope")
            .field("generation", &self.generation)
            .field("armed", &self.armed)
            .field("shapes", &self.shapes.len())
            .finish_non_exhaustive()
    }
}

impl HandlerScope {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_active(&self) -> bool {
        self.armed && self.shared.load(Ordering::Acquire) == self.generation
    }

    pub fn wired_count(&self) -> usize {
        self.shapes.len()
    }

    /// Deliver a click on the shape with DOM id `dom_id`. Returns whether the callback ran.
    pub fn click(&mut self, dom_id: &str, event: ClickEvent) -> bool {
        if !self.is_active() {
            tracing::debug!(dom_id, generation = self.generation, "click on stale handlers ignored");
            return false;
        }
        let Some(shape) = self.shapes.get(dom_id) else {
            return false;
        };
        let click = NodeClick { node_id: shape.node_id.clone(), label: shape.label.clone(), event };
        (self.callback)(&click);
        true
    }

    /// DOM ids drawn for `node_id`, for highlighting the selection.
    pub fn highlight_ids(&self, node_id: &str) -> Vec<String> {
        self.shapes
            .iter()
            .filter(|(_, shape)| shape.node_id == node_id)
            .map(|(dom_id, _)| dom_id.clone())
            .collect()
    }

    pub fn detach(&mut self) {
        if self.armed {
            tracing::debug!(generation = self.generation, "interaction handlers detached");
        }
        self.armed = false;
        self.shapes.clear();
    }
}

impl Drop for HandlerScope {
    fn drop(&mut self) {
        self.detach();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use rstest::rstest;

    use super::{node_id_from_dom_id, ClickCallback, ClickEvent, NodeClick, SvgInteractionMapper};
    use crate::model::DiagramSource;
    use crate::render::{FlowchartSvgRenderer, Renderer};

    fn recorder() -> (Arc<Mutex<Vec<NodeClick>>>, ClickCallback) {
        let clicks = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&clicks);
        let callback: ClickCallback = Box::new(move |click: &NodeClick| {
            sink.lock().expect("lock").push(click.clone());
        });
        (clicks, callback)
    }

    fn rendered(source: &str) -> String {
        FlowchartSvgRenderer::default()
            .render(&DiagramSource::new(source), 0)
            .expect("render")
            .svg
    }

    #[rstest]
    #[case("flowchart-A-3", Some("A"))]
    #[case("flowchart-A", Some("A"))]
    #[case("flowchart-api-gw-12", Some("api-gw"))]
    #[case("flowchart-api-gw", Some("api-gw"))]
    #[case("L-A-B-0", None)]
    #[case("L_A_B_0", None)]
    #[case("subGraph0", None)]
    #[case("cluster-payments", None)]
    #[case("edge-A-B-0", None)]
    #[case("flowchart-Ledger-2", Some("Ledger"))]
    #[case("flowchart-knowledgeBase-0", Some("knowledgeBase"))]
    #[case("flowchart-dbCluster-1", Some("dbCluster"))]
    #[case("flowchart-HedgeFund-4", Some("HedgeFund"))]
    #[case("flowchart-subgraphView-0", Some("subgraphView"))]
    #[case("standalone", None)]
    fn dom_ids_map_to_node_ids(#[case] dom_id: &str, #[case] expected: Option<&str>) {
        assert_eq!(node_id_from_dom_id(dom_id).as_deref(), expected);
    }

    #[test]
    fn click_reports_node_id_label_and_modifiers() {
        let svg = rendered("flowchart TD\n  A[\"Auth Service\"] --> B[Database]\n");
        let (clicks, callback) = recorder();
        let mut mapper = SvgInteractionMapper::new();
        let mut scope = mapper.attach(&svg, &["A".to_owned(), "B".to_owned()], callback);

        assert_eq!(scope.wired_count(), 2);
        assert!(scope.click("flowchart-A-0", ClickEvent::with_ctrl()));
        assert!(!scope.click("L-A-B-0", ClickEvent::plain()));

        let clicks = clicks.lock().expect("lock");
        assert_eq!(clicks.len(), 1);
        assert_eq!(clicks[0].node_id, "A");
        assert_eq!(clicks[0].label, "Auth Service");
        assert!(clicks[0].event.toggles_selection());
    }

    #[test]
    fn nodes_named_like_edges_or_clusters_are_wired() {
        let svg = rendered("flowchart TD\n  Ledger[\"Ledger\"] --> A[Api]\n  A --> dbCluster\n");
        let (clicks, callback) = recorder();
        let mut mapper = SvgInteractionMapper::new();
        let known = ["Ledger".to_owned(), "A".to_owned(), "dbCluster".to_owned()];
        let mut scope = mapper.attach(&svg, &known, callback);

        assert_eq!(scope.wired_count(), 3);
        assert!(scope.click("flowchart-Ledger-0", ClickEvent::plain()));
        assert!(scope.click("flowchart-dbCluster-2", ClickEvent::plain()));
        assert!(!scope.click("L-Ledger-A-0", ClickEvent::plain()));

        let clicks = clicks.lock().expect("lock");
        let ids = clicks.iter().map(|click| click.node_id.as_str()).collect::<Vec<_>>();
        assert_eq!(ids, ["Ledger", "dbCluster"]);
        assert_eq!(clicks[0].label, "Ledger");
    }

    #[test]
    fn reattach_disarms_previous_scope() {
        let svg = rendered("flowchart TD\n  A --> B\n");
        let (clicks, callback) = recorder();
        let (_, second_callback) = recorder();
        let mut mapper = SvgInteractionMapper::new();

        let mut stale = mapper.attach(&svg, &[], callback);
        let fresh = mapper.attach(&svg, &[], second_callback);

        assert!(!stale.is_active());
        assert!(fresh.is_active());
        assert!(!stale.click("flowchart-A-0", ClickEvent::plain()));
        assert!(clicks.lock().expect("lock").is_empty());
    }

    #[test]
    fn detach_is_synchronous_and_final() {
        let svg = rendered("flowchart TD\n  A --> B\n");
        let (clicks, callback) = recorder();
        let mut mapper = SvgInteractionMapper::new();
        let mut scope = mapper.attach(&svg, &[], callback);

        scope.detach();
        assert!(!scope.click("flowchart-B-1", ClickEvent::plain()));
        assert!(clicks.lock().expect("lock").is_empty());
        assert!(scope.highlight_ids("B").is_empty());
    }

    #[test]
    fn unknown_shapes_are_left_unwired() {
        let svg = rendered("flowchart TD\n  A --> B\n");
        let (_, callback) = recorder();
        let mut mapper = SvgInteractionMapper::new();
        let scope = mapper.attach(&svg, &["A".to_owned()], callback);

        assert_eq!(scope.highlight_ids("A"), vec!["flowchart-A-0".to_owned()]);
        assert!(scope.highlight_ids("B").is_empty());
    }

    #[test]
    fn malformed_svg_yields_an_empty_scope() {
        let (_, callback) = recorder();
        let mut mapper = SvgInteractionMapper::new();
        let scope = mapper.attach("<svg><g class=\"node\"", &[], callback);
        assert_eq!(scope.wired_count(), 0);
    }
}
