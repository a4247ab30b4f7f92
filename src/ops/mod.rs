// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Tessera-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Tessera and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Mutation operations.
//!
//! Text mutations ([`update_label`], [`apply_style`]) are pure functions from one Mermaid source
//! to the next: they splice exactly the bytes that change and fail with a typed error instead of
//! guessing. Graph-mode mutations live in [`graph`] and produce a minimal delta.

use std::ops::Range;

use crate::error::{MutationError, ParseError, ValidationError};
use crate::format::mermaid::statement::{Keyword, NodeOccurrence, ScannedDocument, Statement};
use crate::format::mermaid::{decode_entities, sanitize_label, scan, style_class_name};
use crate::model::{DiagramSource, NodeStyle};

pub mod graph;

pub use graph::{apply_graph_ops, ElementRef, GraphDelta, GraphOp, GraphOpError, NodePatch};

/// Default upper bound for a sanitised label, in characters.
pub const DEFAULT_LABEL_MAX_LEN: usize = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LabelPolicy {
    pub max_len: usize,
}

impl Default for LabelPolicy {
    fn default() -> Self {
        Self { max_len: DEFAULT_LABEL_MAX_LEN }
    }
}

impl LabelPolicy {
    /// Sanitise `raw` and check it against the policy.
    pub fn sanitize(&self, raw: &str) -> Result<String, ValidationError> {
        if raw.trim().is_empty() {
            return Err(ValidationError::EmptyLabel);
        }
        let sanitized = sanitize_label(raw);
        let len = sanitized.chars().count();
        if len > self.max_len {
            return Err(ValidationError::LabelTooLong { len, max: self.max_len });
        }
        Ok(sanitized)
    }

    /// Display form of a label for graph mode: validated, whitespace collapsed, not escaped.
    pub fn display_label(&self, raw: &str) -> Result<String, ValidationError> {
        self.sanitize(raw)?;
        Ok(raw.split_whitespace().collect::<Vec<_>>().join(" "))
    }
}

/// Attribute changes requested for one node from the entity editor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntityEdit {
    pub label: Option<String>,
    pub style: Option<NodeStyle>,
}

impl EntityEdit {
    pub fn label(label: impl Into<String>) -> Self {
        Self { label: Some(label.into()), style: None }
    }

    pub fn style(style: NodeStyle) -> Self {
        Self { label: None, style: Some(style) }
    }

    pub fn is_empty(&self) -> bool {
        self.label.is_none() && self.style.is_none()
    }
}

enum Target<'d, 'a> {
    Declaration(&'d NodeOccurrence<'a>),
    Reference(&'d NodeOccurrence<'a>),
}

/// Find the one place that defines `node_id`.
///
/// A single labelled declaration wins. Without one, the first bare reference (`A` in `A --> B`)
/// is used so that it can be promoted to a declaration. Two or more labelled declarations are
/// reported as ambiguous.
fn locate<'d, 'a>(
    doc: &'d ScannedDocument<'a>,
    node_id: &'d str,
) -> Result<Target<'d, 'a>, ParseError> {
    let mut declarations = doc.declarations_of(node_id);
    match (declarations.next(), declarations.count()) {
        (Some(declaration), 0) => Ok(Target::Declaration(declaration)),
        (Some(_), more) => {
            Err(ParseError::AmbiguousNode { node_id: node_id.to_owned(), count: more + 1 })
        }
        (None, _) => doc
            .references_of(node_id)
            .next()
            .map(Target::Reference)
            .ok_or_else(|| ParseError::NodeNotFound { node_id: node_id.to_owned() }),
    }
}

fn splice(source: &str, mut edits: Vec<(Range<usize>, String)>) -> String {
    edits.sort_by(|a, b| b.0.start.cmp(&a.0.start).then(b.0.end.cmp(&a.0.end)));
    let mut out = source.to_owned();
    for (range, replacement) in edits {
        out.replace_range(range, &replacement);
    }
    out
}

/// Replace the label of `node_id` with `new_label`, leaving every other byte untouched.
///
/// The payload is written as `"<sanitised label>"` inside the node's existing delimiters.
pub fn update_label(
    source: &DiagramSource,
    node_id: &str,
    new_label: &str,
    policy: &LabelPolicy,
) -> Result<DiagramSource, MutationError> {
    let sanitized = policy.sanitize(new_label)?;
    let text = source.as_str();
    let doc = scan(text);

    let edit = match locate(&doc, node_id)? {
        Target::Declaration(occurrence) => {
            let payload = occurrence
                .shape
                .as_ref()
                .map(|shape| shape.payload.clone())
                .ok_or_else(|| ParseError::NodeNotFound { node_id: node_id.to_owned() })?;
            (payload, format!("\"{sanitized}\""))
        }
        Target::Reference(occurrence) => {
            let at = occurrence.id_span.end;
            (at..at, format!("[\"{sanitized}\"]"))
        }
    };

    tracing::debug!(node_id, label_len = sanitized.len(), "label updated");
    Ok(DiagramSource::new(splice(text, vec![edit])))
}

fn is_rule_for(statement: &Statement<'_>, keyword: Keyword, target: &str, body: Option<&str>) -> bool {
    let mut words = statement.text.split_whitespace();
    let matches_keyword = match keyword {
        Keyword::ClassDef => words.next() == Some("classDef"),
        Keyword::Class => words.next() == Some("class"),
        _ => false,
    };
    matches_keyword
        && words.next() == Some(target)
        && body.map_or(true, |body| words.next() == Some(body) && words.next().is_none())
}

/// Byte range that removes `statement` together with its line, or with its `;` separator when
/// it shares the line with other statements.
fn removal_range(text: &str, statement: &Statement<'_>) -> Range<usize> {
    let line = &text[statement.line_span.clone()];
    if line.trim() == statement.text {
        let mut end = statement.line_span.end;
        if text[end..].starts_with("\r\n") {
            end += 2;
        } else if text[end..].starts_with('\n') {
            end += 1;
        }
        return statement.line_span.start..end;
    }
    let mut end = statement.span.end;
    let after = &text[end..statement.line_span.end];
    let trimmed = after.trim_start();
    if trimmed.starts_with(';') {
        end += after.len() - trimmed.len() + 1;
    }
    statement.span.start..end
}

/// Create, replace or remove the dedicated style rule for `node_id`.
///
/// The rule is a `classDef tessera_<id> ...` line plus a `class <id> tessera_<id>` line. Existing
/// rules are replaced in place; new ones are appended at the end of the document. An empty
/// style removes both lines.
pub fn apply_style(
    source: &DiagramSource,
    node_id: &str,
    style: &NodeStyle,
) -> Result<DiagramSource, MutationError> {
    let text = source.as_str();
    let doc = scan(text);
    locate(&doc, node_id)?;
    style.validate()?;

    let class_name = style_class_name(node_id);
    let class_defs: Vec<&Statement<'_>> = doc
        .keyword_statements(Keyword::ClassDef)
        .filter(|statement| is_rule_for(statement, Keyword::ClassDef, &class_name, None))
        .collect();
    let applications: Vec<&Statement<'_>> = doc
        .keyword_statements(Keyword::Class)
        .filter(|statement| is_rule_for(statement, Keyword::Class, node_id, Some(&class_name)))
        .collect();

    let mut edits = Vec::<(Range<usize>, String)>::new();

    if style.is_empty() {
        for statement in class_defs.iter().chain(applications.iter()) {
            edits.push((removal_range(text, statement), String::new()));
        }
        tracing::debug!(node_id, removed = edits.len(), "style rule removed");
        return Ok(DiagramSource::new(splice(text, edits)));
    }

    let class_def = format!("classDef {class_name} {}", style.to_class_def_body());
    let application = format!("class {node_id} {class_name}");

    let mut appended = Vec::<String>::new();
    match class_defs.split_first() {
        Some((first, rest)) => {
            edits.push((first.span.clone(), class_def));
            for duplicate in rest {
                edits.push((removal_range(text, duplicate), String::new()));
            }
        }
        None => appended.push(class_def),
    }
    if applications.is_empty() {
        appended.push(application);
    }

    if !appended.is_empty() {
        let indent = doc.statements().last().map(|statement| statement.indent(text)).unwrap_or("");
        let mut tail = String::new();
        if !text.is_empty() && !text.ends_with('\n') {
            tail.push('\n');
        }
        for line in appended {
            tail.push_str(indent);
            tail.push_str(&line);
            tail.push('\n');
        }
        edits.push((text.len()..text.len(), tail));
    }

    tracing::debug!(node_id, class = %class_name, "style rule upserted");
    Ok(DiagramSource::new(splice(text, edits)))
}

/// Apply the label change first, then the style change.
pub fn apply_entity_edit(
    source: &DiagramSource,
    node_id: &str,
    edit: &EntityEdit,
    policy: &LabelPolicy,
) -> Result<DiagramSource, MutationError> {
    let mut current = source.clone();
    if let Some(label) = edit.label.as_deref() {
        current = update_label(&current, node_id, label, policy)?;
    }
    if let Some(style) = edit.style.as_ref() {
        current = apply_style(&current, node_id, style)?;
    }
    Ok(current)
}

/// `(node id, decoded label)` for every labelled declaration, first declaration per id.
pub fn declared_labels(source: &DiagramSource) -> Vec<(String, String)> {
    let doc = scan(source.as_str());
    let mut labels = Vec::<(String, String)>::new();
    for occurrence in doc.occurrences() {
        let Some(shape) = occurrence.shape.as_ref() else {
            continue;
        };
        if labels.iter().any(|(id, _)| id == occurrence.node_id) {
            continue;
        }
        labels.push((occurrence.node_id.to_owned(), decode_entities(shape.label()).into_owned()));
    }
    labels
}

/// Node ids in order of first appearance.
pub fn node_ids(source: &DiagramSource) -> Vec<String> {
    scan(source.as_str()).node_ids().into_iter().map(str::to_owned).collect()
}

#[cfg(test)]
mod tests;
