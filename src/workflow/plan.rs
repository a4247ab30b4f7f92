// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Tessera-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Tessera and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Structural plans returned by the plan endpoint.
//!
//! The plan's fields depend on the diagram kind. Each kind gets its own typed shape; a plan that
//! does not fit its kind's shape is kept as [`StructuralPlan::Opaque`] and still round-trips to
//! the generate-from-plan endpoint untouched.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ParseError;
use crate::model::DiagramKind;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanComponent {
    pub name: String,
    #[serde(rename = "type", skip_serializing_if = "String::is_empty")]
    pub kind: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub tech: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanLink {
    pub from: String,
    pub to: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub label: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NamedItem {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(alias = "label")]
    pub name: String,
}

impl NamedItem {
    fn display(&self) -> &str {
        if self.name.is_empty() {
            &self.id
        } else {
            &self.name
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchitecturePlan {
    pub components: Vec<PlanComponent>,
}

/// Layers in the order they are presented.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HldLayers {
    pub presentation: Vec<PlanComponent>,
    pub application: Vec<PlanComponent>,
    pub business: Vec<PlanComponent>,
    pub data: Vec<PlanComponent>,
    pub external: Vec<PlanComponent>,
    pub infrastructure: Vec<PlanComponent>,
}

impl HldLayers {
    fn iter(&self) -> impl Iterator<Item = (&'static str, &[PlanComponent])> {
        [
            ("Presentation", self.presentation.as_slice()),
            ("Application", self.application.as_slice()),
            ("Business", self.business.as_slice()),
            ("Data", self.data.as_slice()),
            ("External", self.external.as_slice()),
            ("Infrastructure", self.infrastructure.as_slice()),
        ]
        .into_iter()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HldPlan {
    pub layers: HldLayers,
    pub flows: Vec<PlanLink>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LldModule {
    pub name: String,
    pub classes: Vec<NamedItem>,
    pub interfaces: Vec<NamedItem>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LldPlan {
    pub modules: Vec<LldModule>,
    pub dependencies: Vec<PlanLink>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MindNode {
    pub id: String,
    pub label: String,
    pub parent_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MindtreePlan {
    pub root_id: String,
    pub nodes: Vec<MindNode>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassSpec {
    pub name: String,
    pub attributes: Vec<String>,
    pub methods: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassPlan {
    pub classes: Vec<ClassSpec>,
    pub relationships: Vec<PlanLink>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SequencePlan {
    pub participants: Vec<NamedItem>,
    pub messages: Vec<PlanLink>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UsecasePlan {
    pub actors: Vec<NamedItem>,
    pub use_cases: Vec<NamedItem>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActivityPlan {
    pub nodes: Vec<NamedItem>,
    pub edges: Vec<PlanLink>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatePlan {
    pub states: Vec<NamedItem>,
    pub transitions: Vec<PlanLink>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComponentPlan {
    pub components: Vec<NamedItem>,
    pub dependencies: Vec<PlanLink>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeploymentPlan {
    pub nodes: Vec<NamedItem>,
    pub artifacts: Vec<NamedItem>,
    pub connections: Vec<PlanLink>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StructuralPlan {
    Architecture(ArchitecturePlan),
    Hld(HldPlan),
    Lld(LldPlan),
    Mindtree(MindtreePlan),
    Class(ClassPlan),
    Sequence(SequencePlan),
    Usecase(UsecasePlan),
    Activity(ActivityPlan),
    State(StatePlan),
    Component(ComponentPlan),
    Deployment(DeploymentPlan),
    /// A JSON object that does not match its kind's shape.
    Opaque(Value),
}

const PLAN_READY: &str = "Diagram plan ready";

fn typed<T: DeserializeOwned>(value: &Value, wrap: fn(T) -> StructuralPlan) -> StructuralPlan {
    match serde_json::from_value::<T>(value.clone()) {
        Ok(plan) => wrap(plan),
        Err(err) => {
            tracing::debug!(error = %err, "plan does not match its kind, keeping it opaque");
            StructuralPlan::Opaque(value.clone())
        }
    }
}

impl StructuralPlan {
    /// Read the plan for `kind`. Anything but a JSON object is rejected.
    pub fn from_value(kind: DiagramKind, value: &Value) -> Result<Self, ParseError> {
        if !value.is_object() {
            return Err(ParseError::UnsupportedPlan { kind: kind.as_str().to_owned() });
        }
        Ok(match kind {
            DiagramKind::Architecture => typed(value, Self::Architecture),
            DiagramKind::Hld => typed(value, Self::Hld),
            DiagramKind::Lld => typed(value, Self::Lld),
            DiagramKind::Mindtree => typed(value, Self::Mindtree),
            DiagramKind::Class => typed(value, Self::Class),
            DiagramKind::Sequence => typed(value, Self::Sequence),
            DiagramKind::Usecase => typed(value, Self::Usecase),
            DiagramKind::Activity => typed(value, Self::Activity),
            DiagramKind::State => typed(value, Self::State),
            DiagramKind::Component => typed(value, Self::Component),
            DiagramKind::Deployment => typed(value, Self::Deployment),
        })
    }

    /// Human-readable summary for the chat panel.
    pub fn summary(&self) -> String {
        let mut lines = Vec::<String>::new();
        match self {
            Self::Architecture(plan) => {
                if !plan.components.is_empty() {
                    lines.push("Architecture components:".to_owned());
                    for component in &plan.components {
                        lines.push(bullet(&component.name, &component.kind, " (", ")"));
                    }
                }
            }
            Self::Hld(plan) => {
                for (layer, items) in plan.layers.iter().filter(|(_, items)| !items.is_empty()) {
                    lines.push(format!("{layer} layer:"));
                    for item in items {
                        lines.push(bullet(&item.name, &item.tech, " — ", ""));
                    }
                    lines.push(String::new());
                }
                push_links(&mut lines, "Data flows:", &plan.flows, true);
            }
            Self::Lld(plan) => {
                for module in &plan.modules {
                    let classes = joined(&module.classes);
                    lines.push(format!("{}: {classes}", module.name));
                }
                if !plan.dependencies.is_empty() {
                    lines.push(String::new());
                }
                push_links(&mut lines, "Dependencies:", &plan.dependencies, false);
            }
            Self::Mindtree(plan) => {
                if !plan.nodes.is_empty() {
                    lines.push("Mind tree structure:".to_owned());
                    for node in &plan.nodes {
                        let depth = mind_depth(plan, node);
                        lines.push(format!("{}• {}", "  ".repeat(depth), node.label));
                    }
                }
            }
            Self::Class(plan) => {
                for class in &plan.classes {
                    lines.push(format!("  • {}", class.name));
                }
            }
            Self::Sequence(plan) => {
                push_names(&mut lines, "Participants", &plan.participants);
                if !plan.messages.is_empty() {
                    lines.push(format!("Messages: {} step(s)", plan.messages.len()));
                }
            }
            Self::Usecase(plan) => {
                push_names(&mut lines, "Actors", &plan.actors);
                push_names(&mut lines, "Use cases", &plan.use_cases);
            }
            Self::Activity(plan) => {
                push_names(&mut lines, "Steps", &plan.nodes);
                push_links(&mut lines, "Transitions:", &plan.edges, true);
            }
            Self::State(plan) => {
                push_names(&mut lines, "States", &plan.states);
                push_links(&mut lines, "Transitions:", &plan.transitions, true);
            }
            Self::Component(plan) => {
                push_names(&mut lines, "Components", &plan.components);
                push_links(&mut lines, "Dependencies:", &plan.dependencies, true);
            }
            Self::Deployment(plan) => {
                push_names(&mut lines, "Nodes", &plan.nodes);
                push_names(&mut lines, "Artifacts", &plan.artifacts);
                push_links(&mut lines, "Connections:", &plan.connections, true);
            }
            Self::Opaque(_) => {}
        }

        let text = lines.join("\n");
        let text = text.trim();
        if text.is_empty() {
            PLAN_READY.to_owned()
        } else {
            text.to_owned()
        }
    }
}

fn bullet(name: &str, detail: &str, open: &str, close: &str) -> String {
    if detail.is_empty() {
        format!("  • {name}")
    } else {
        format!("  • {name}{open}{detail}{close}")
    }
}

fn joined(items: &[NamedItem]) -> String {
    items.iter().map(NamedItem::display).collect::<Vec<_>>().join(", ")
}

fn push_names(lines: &mut Vec<String>, title: &str, items: &[NamedItem]) {
    if !items.is_empty() {
        lines.push(format!("{title}: {}", joined(items)));
    }
}

fn push_links(lines: &mut Vec<String>, title: &str, links: &[PlanLink], with_labels: bool) {
    let links = links.iter().filter(|link| !link.from.is_empty() && !link.to.is_empty());
    let mut rendered = links
        .map(|link| {
            if with_labels && !link.label.is_empty() {
                format!("  {} → {} ({})", link.from, link.to, link.label)
            } else {
                format!("  {} → {}", link.from, link.to)
            }
        })
        .peekable();
    if rendered.peek().is_some() {
        lines.push(title.to_owned());
        lines.extend(rendered);
    }
}

fn mind_depth(plan: &MindtreePlan, node: &MindNode) -> usize {
    let mut depth = 0;
    let mut parent = node.parent_id.as_str();
    // Bounded by the node count so a parent cycle cannot loop forever.
    while !parent.is_empty() && depth < plan.nodes.len() {
        depth += 1;
        parent = plan
            .nodes
            .iter()
            .find(|candidate| candidate.id == parent)
            .map_or("", |candidate| candidate.parent_id.as_str());
    }
    depth
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use serde_json::json;

    use super::StructuralPlan;
    use crate::error::ParseError;
    use crate::model::DiagramKind;

    #[test]
    fn architecture_summary_lists_components() {
        let plan = StructuralPlan::from_value(
            DiagramKind::Architecture,
            &json!({"components": [
                {"name": "Payment Service", "type": "server"},
                {"name": "Queue", "type": "queue"},
                {"name": "Ledger"}
            ]}),
        )
        .expect("plan");
        assert_eq!(
            plan.summary(),
            "Architecture components:\n  • Payment Service (server)\n  • Queue (queue)\n  • Ledger"
        );
    }

    #[test]
    fn hld_summary_lists_layers_then_flows() {
        let plan = StructuralPlan::from_value(
            DiagramKind::Hld,
            &json!({
                "type": "hld",
                "layers": {
                    "data": [{"name": "Database", "type": "database", "tech": "PostgreSQL"}],
                    "presentation": [{"name": "Web App", "type": "webapp", "tech": "React"}],
                    "external": []
                },
                "flows": [{"from": "presentation", "to": "data", "label": "SQL"}]
            }),
        )
        .expect("plan");
        assert_eq!(
            plan.summary(),
            "Presentation layer:\n  • Web App — React\n\nData layer:\n  • Database — PostgreSQL\n\n\
             Data flows:\n  presentation → data (SQL)"
        );
    }

    #[test]
    fn mindtree_indents_by_depth() {
        let plan = StructuralPlan::from_value(
            DiagramKind::Mindtree,
            &json!({"rootId": "root", "nodes": [
                {"id": "root", "label": "System", "parentId": ""},
                {"id": "n2", "label": "Backend", "parentId": "root"},
                {"id": "n3", "label": "Database", "parentId": "n2"}
            ]}),
        )
        .expect("plan");
        assert_eq!(
            plan.summary(),
            "Mind tree structure:\n• System\n  • Backend\n    • Database"
        );
    }

    #[rstest]
    #[case(
        DiagramKind::Sequence,
        json!({"participants": [{"id": "U", "name": "User"}, {"id": "A"}],
               "messages": [{"from": "U", "to": "A", "label": "req"}]}),
        "Participants: User, A\nMessages: 1 step(s)"
    )]
    #[case(
        DiagramKind::Usecase,
        json!({"actors": [{"name": "User"}], "useCases": [{"name": "Login"}, {"name": "Logout"}]}),
        "Actors: User\nUse cases: Login, Logout"
    )]
    #[case(
        DiagramKind::Class,
        json!({"classes": [{"name": "User", "methods": ["login()"]}]}),
        "• User"
    )]
    #[case(
        DiagramKind::Lld,
        json!({"modules": [{"name": "billing", "classes": [{"name": "Invoice"}]}],
               "dependencies": [{"from": "billing", "to": "core", "type": "uses"}]}),
        "billing: Invoice\n\nDependencies:\n  billing → core"
    )]
    fn uml_summaries(#[case] kind: DiagramKind, #[case] value: serde_json::Value, #[case] expected: &str) {
        let plan = StructuralPlan::from_value(kind, &value).expect("plan");
        assert_eq!(plan.summary(), expected);
    }

    #[test]
    fn mismatched_shape_falls_back_to_opaque() {
        let value = json!({"components": "not a list"});
        let plan = StructuralPlan::from_value(DiagramKind::Architecture, &value).expect("plan");
        assert_eq!(plan, StructuralPlan::Opaque(value));
        assert_eq!(plan.summary(), "Diagram plan ready");
    }

    #[test]
    fn empty_plan_reads_as_ready() {
        let plan = StructuralPlan::from_value(DiagramKind::State, &json!({})).expect("plan");
        assert_eq!(plan.summary(), "Diagram plan ready");
    }

    #[test]
    fn non_object_plans_are_rejected() {
        let err = StructuralPlan::from_value(DiagramKind::Hld, &json!([1, 2])).expect_err("array");
        assert_eq!(err, ParseError::UnsupportedPlan { kind: "hld".to_owned() });
    }
}
