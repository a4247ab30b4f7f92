// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Tessera-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Tessera and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Span-preserving statement scanner for Mermaid flowcharts.
//!
//! The scanner does not build a model; it records *where* every node occurrence, shape delimiter
//! and label payload sits in the original text so that edits can splice exactly one region and
//! leave every other byte alone. [`super::flowchart::parse_flowchart`] builds the graph model on
//! top of the same scan.
//!
//! Handled:
//! - optional `---` front matter, `%%` comments and `%%{init}%%` directives
//! - `flowchart`/`graph` header with optional direction, also `graph TD;` on one line
//! - statements separated by newlines or `;` (outside quotes, shapes and `|edge labels|`)
//! - node shapes `[ ]`, `( )`, `([ ])`, `[[ ]]`, `[( )]`, `(( ))`, `((( )))`, `> ]`, `{ }`,
//!   `{{ }}`, `[/ /]`, `[\ \]`, `[/ \]`, `[\ /]`, with quoted or bare payloads
//! - `A & B --> C` groups, chains, `-->|label|` and `-- label -->` edge text, `:::class` suffixes
//! - keyword statements (`classDef`, `class`, `style`, `linkStyle`, `click`, `subgraph`, `end`,
//!   `direction`, `accTitle`, `accDescr`) are classified but not interpreted

use std::ops::Range;

use super::ident::is_ident_char;
use crate::model::NodeShape;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header<'a> {
    pub keyword: &'a str,
    pub direction: Option<&'a str>,
    pub line: usize,
}

impl Header<'_> {
    pub fn is_flowchart(&self) -> bool {
        matches!(self.keyword, "flowchart" | "graph" | "flowchart-elk")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement<'a> {
    /// Zero-based line index.
    pub line: usize,
    /// Byte range of the whole source line the statement sits on (without the line break).
    pub line_span: Range<usize>,
    /// Byte range of the trimmed statement text.
    pub span: Range<usize>,
    pub text: &'a str,
    pub kind: StatementKind<'a>,
}

impl Statement<'_> {
    /// The whitespace the statement's line starts with.
    pub fn indent<'s>(&self, source: &'s str) -> &'s str {
        let line = &source[self.line_span.clone()];
        &line[..line.len() - line.trim_start().len()]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatementKind<'a> {
    Keyword(Keyword),
    Chain(Chain<'a>),
    Unparsed { reason: &'static str },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    ClassDef,
    Class,
    Style,
    LinkStyle,
    Click,
    Subgraph,
    End,
    Direction,
    Accessibility,
}

impl Keyword {
    fn from_word(word: &str) -> Option<Self> {
        Some(match word {
            "classDef" => Self::ClassDef,
            "class" => Self::Class,
            "style" => Self::Style,
            "linkStyle" => Self::LinkStyle,
            "click" => Self::Click,
            "subgraph" => Self::Subgraph,
            "end" => Self::End,
            "direction" => Self::Direction,
            "accTitle" | "accTitle:" | "accDescr" | "accDescr:" => Self::Accessibility,
            _ => return None,
        })
    }
}

/// `group (link group)*`, where a group is one or more nodes joined by `&`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Chain<'a> {
    pub groups: Vec<Vec<NodeOccurrence<'a>>>,
    pub links: Vec<Link<'a>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeOccurrence<'a> {
    pub node_id: &'a str,
    pub id_span: Range<usize>,
    pub shape: Option<ShapeSpan<'a>>,
}

impl NodeOccurrence<'_> {
    pub fn is_declaration(&self) -> bool {
        self.shape.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShapeSpan<'a> {
    pub shape: NodeShape,
    pub open: Range<usize>,
    pub payload: Range<usize>,
    pub close: Range<usize>,
    pub raw_payload: &'a str,
}

impl<'a> ShapeSpan<'a> {
    /// Payload text without surrounding whitespace or quotes; still entity-encoded.
    pub fn label(&self) -> &'a str {
        unquote(self.raw_payload.trim())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link<'a> {
    /// Connector with any leading `<` folded away (`<--` becomes `-->` with `reverse` set).
    pub connector: String,
    pub label: Option<&'a str>,
    pub reverse: bool,
}

/// Strip one pair of surrounding double quotes (and markdown backticks inside them).
pub fn unquote(text: &str) -> &str {
    let inner = text
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .unwrap_or(text);
    inner
        .strip_prefix('`')
        .and_then(|rest| rest.strip_suffix('`'))
        .unwrap_or(inner)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedDocument<'a> {
    source: &'a str,
    header: Option<Header<'a>>,
    statements: Vec<Statement<'a>>,
}

impl<'a> ScannedDocument<'a> {
    pub fn source(&self) -> &'a str {
        self.source
    }

    pub fn header(&self) -> Option<&Header<'a>> {
        self.header.as_ref()
    }

    pub fn is_flowchart(&self) -> bool {
        self.header.as_ref().is_some_and(Header::is_flowchart)
    }

    pub fn statements(&self) -> &[Statement<'a>] {
        &self.statements
    }

    pub fn occurrences(&self) -> impl Iterator<Item = &NodeOccurrence<'a>> {
        self.statements.iter().flat_map(|statement| match &statement.kind {
            StatementKind::Chain(chain) => chain.groups.iter().flatten().collect::<Vec<_>>(),
            _ => Vec::new(),
        })
    }

    pub fn declarations_of<'s>(
        &'s self,
        node_id: &'s str,
    ) -> impl Iterator<Item = &'s NodeOccurrence<'a>> + 's {
        self.occurrences().filter(move |occ| occ.node_id == node_id && occ.is_declaration())
    }

    pub fn references_of<'s>(
        &'s self,
        node_id: &'s str,
    ) -> impl Iterator<Item = &'s NodeOccurrence<'a>> + 's {
        self.occurrences().filter(move |occ| occ.node_id == node_id && !occ.is_declaration())
    }

    /// Node ids in order of first appearance.
    pub fn node_ids(&self) -> Vec<&'a str> {
        let mut seen = Vec::<&'a str>::new();
        for occurrence in self.occurrences() {
            if !seen.contains(&occurrence.node_id) {
                seen.push(occurrence.node_id);
            }
        }
        seen
    }

    pub fn keyword_statements(&self, keyword: Keyword) -> impl Iterator<Item = &Statement<'a>> {
        self.statements
            .iter()
            .filter(move |statement| statement.kind == StatementKind::Keyword(keyword))
    }
}

/// Scan `source` into statements with absolute byte spans.
pub fn scan(source: &str) -> ScannedDocument<'_> {
    let mut header: Option<Header<'_>> = None;
    let mut statements = Vec::new();
    let mut in_front_matter = false;
    let mut seen_content = false;

    for (line_index, line_start, line) in lines_with_offsets(source) {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if !seen_content && trimmed == "---" {
            in_front_matter = true;
            seen_content = true;
            continue;
        }
        seen_content = true;
        if in_front_matter {
            if trimmed == "---" {
                in_front_matter = false;
            }
            continue;
        }
        if trimmed.starts_with("%%") {
            continue;
        }

        let line_span = line_start..line_start + line.len();
        for segment in split_statements(line, line_start) {
            let text = &source[segment.clone()];
            let leading = text.len() - text.trim_start().len();
            let text = text.trim();
            if text.is_empty() || text.starts_with("%%") {
                continue;
            }
            let span = segment.start + leading..segment.start + leading + text.len();

            let Some(current) = header.as_ref() else {
                let mut words = text.split_whitespace();
                let keyword = words.next().unwrap_or_default();
                header = Some(Header { keyword, direction: words.next(), line: line_index });
                continue;
            };
            if !current.is_flowchart() {
                return ScannedDocument { source, header, statements };
            }

            let kind = classify(text, span.start);
            statements.push(Statement {
                line: line_index,
                line_span: line_span.clone(),
                span,
                text,
                kind,
            });
        }
    }

    ScannedDocument { source, header, statements }
}

fn lines_with_offsets(source: &str) -> impl Iterator<Item = (usize, usize, &str)> {
    let mut offset = 0usize;
    source.split_inclusive('\n').enumerate().map(move |(index, raw)| {
        let start = offset;
        offset += raw.len();
        (index, start, raw.trim_end_matches(['\n', '\r']))
    })
}

/// Split one line on `;` that sit outside quotes, shapes and `|edge labels|`.
fn split_statements(line: &str, base: usize) -> Vec<Range<usize>> {
    let mut segments = Vec::new();
    let mut start = 0usize;
    let mut in_quote = false;
    let mut in_pipe = false;
    let mut depth = 0usize;

    for (idx, ch) in line.char_indices() {
        if in_quote {
            if ch == '"' {
                in_quote = false;
            }
            continue;
        }
        match ch {
            '"' => in_quote = true,
            '[' | '(' | '{' => depth += 1,
            ']' | ')' | '}' => depth = depth.saturating_sub(1),
            '|' if depth == 0 => in_pipe = !in_pipe,
            ';' if depth == 0 && !in_pipe => {
                segments.push(base + start..base + idx);
                start = idx + 1;
            }
            _ => {}
        }
    }
    segments.push(base + start..base + line.len());
    segments
}

fn classify(text: &str, base: usize) -> StatementKind<'_> {
    let first_word = text.split_whitespace().next().unwrap_or_default();
    if let Some(keyword) = Keyword::from_word(first_word) {
        return StatementKind::Keyword(keyword);
    }
    match parse_chain(text, base) {
        Ok(chain) => StatementKind::Chain(chain),
        Err(reason) => StatementKind::Unparsed { reason },
    }
}

pub(crate) fn is_edge_op_start_char(ch: char) -> bool {
    matches!(ch, '<' | '-' | '=' | '.')
}

pub(crate) fn is_edge_op_char(ch: char) -> bool {
    matches!(ch, '<' | '>' | '-' | '=' | '.' | 'o' | 'x')
}

pub(crate) fn is_probable_edge_operator(op: &str) -> bool {
    op.chars().filter(|ch| matches!(ch, '-' | '=' | '.')).count() >= 2
}

/// Length of the edge operator at the start of `text`.
///
/// A trailing `o`/`x` that runs straight into an identifier belongs to the identifier
/// (`-->xray` is `-->` followed by `xray`).
fn edge_operator_len(text: &str) -> usize {
    let mut len = text.find(|ch: char| !is_edge_op_char(ch)).unwrap_or(text.len());
    let continues_ident = |len: usize| text[len..].starts_with(is_ident_char);
    while len > 0 && text[..len].ends_with(['o', 'x']) && continues_ident(len) {
        len -= 1;
    }
    len
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EdgeDirection {
    Forward,
    Reverse,
}

fn edge_direction(op: &str) -> EdgeDirection {
    let has_left = op.contains('<');
    let has_right = op.contains('>');
    if has_left && !has_right {
        EdgeDirection::Reverse
    } else {
        EdgeDirection::Forward
    }
}

fn normalize_edge_operator(op: &str, direction: EdgeDirection) -> String {
    let op = op.trim();
    match direction {
        EdgeDirection::Forward => op.to_owned(),
        EdgeDirection::Reverse => {
            let mut normalized: String = op.chars().filter(|ch| *ch != '<').collect();
            match normalized.chars().last() {
                Some(decoration @ ('o' | 'x')) => {
                    normalized.pop();
                    normalized.push('>');
                    normalized.push(decoration);
                }
                _ => normalized.push('>'),
            }
            normalized
        }
    }
}

struct Cursor<'a> {
    text: &'a str,
    base: usize,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn rest(&self) -> &'a str {
        &self.text[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self, bytes: usize) {
        self.pos = (self.pos + bytes).min(self.text.len());
    }

    fn skip_ws(&mut self) {
        let rest = self.rest();
        self.bump(rest.len() - rest.trim_start().len());
    }

    fn at_end(&self) -> bool {
        self.pos >= self.text.len()
    }

    fn abs(&self, pos: usize) -> usize {
        self.base + pos
    }
}

fn parse_chain(text: &str, base: usize) -> Result<Chain<'_>, &'static str> {
    let mut cursor = Cursor { text, base, pos: 0 };
    let mut chain = Chain::default();
    chain.groups.push(parse_group(&mut cursor)?);
    loop {
        cursor.skip_ws();
        if cursor.at_end() {
            return Ok(chain);
        }
        chain.links.push(parse_link(&mut cursor)?);
        chain.groups.push(parse_group(&mut cursor)?);
    }
}

fn parse_group<'a>(cursor: &mut Cursor<'a>) -> Result<Vec<NodeOccurrence<'a>>, &'static str> {
    let mut group = Vec::new();
    loop {
        cursor.skip_ws();
        group.push(parse_node(cursor)?);
        cursor.skip_ws();
        if cursor.peek() != Some('&') {
            return Ok(group);
        }
        cursor.bump(1);
    }
}

fn ident_len(text: &str) -> usize {
    text.find(|ch: char| !is_ident_char(ch)).unwrap_or(text.len())
}

fn parse_node<'a>(cursor: &mut Cursor<'a>) -> Result<NodeOccurrence<'a>, &'static str> {
    let start = cursor.pos;
    let len = ident_len(cursor.rest());
    if len == 0 {
        return Err("expected a node id");
    }
    cursor.bump(len);
    let node_id = &cursor.text[start..cursor.pos];
    let shape = parse_shape(cursor)?;

    if cursor.rest().starts_with(":::") {
        cursor.bump(3);
        let class_len = ident_len(cursor.rest());
        if class_len == 0 {
            return Err("expected a class name after ':::'");
        }
        cursor.bump(class_len);
    }

    Ok(NodeOccurrence { node_id, id_span: cursor.abs(start)..cursor.abs(start + len), shape })
}

const SHAPE_OPENERS: [(&str, &[NodeShape]); 12] = [
    ("(((", &[NodeShape::DoubleCircle]),
    ("((", &[NodeShape::Circle]),
    ("([", &[NodeShape::Stadium]),
    ("[[", &[NodeShape::Subroutine]),
    ("[(", &[NodeShape::Cylinder]),
    ("[/", &[NodeShape::Parallelogram, NodeShape::Trapezoid]),
    ("[\\", &[NodeShape::ParallelogramAlt, NodeShape::TrapezoidAlt]),
    ("{{", &[NodeShape::Hexagon]),
    ("[", &[NodeShape::Rect]),
    ("(", &[NodeShape::Round]),
    ("{", &[NodeShape::Diamond]),
    (">", &[NodeShape::Asymmetric]),
];

/// Offset of the first closing delimiter of any candidate shape, skipping quoted text.
fn find_close(text: &str, candidates: &[NodeShape]) -> Option<(usize, NodeShape)> {
    let mut in_quote = false;
    for (idx, ch) in text.char_indices() {
        if ch == '"' {
            in_quote = !in_quote;
            continue;
        }
        if in_quote {
            continue;
        }
        if let Some(shape) = candidates.iter().find(|shape| text[idx..].starts_with(shape.close())) {
            return Some((idx, *shape));
        }
    }
    None
}

fn parse_shape<'a>(cursor: &mut Cursor<'a>) -> Result<Option<ShapeSpan<'a>>, &'static str> {
    let rest = cursor.rest();
    // Longest opener first; a compound opener that never closes falls back to its one-char form
    // (`A[/api/users]` is a rectangle).
    for (opener, candidates) in SHAPE_OPENERS.iter() {
        if !rest.starts_with(opener) {
            continue;
        }
        let after_open = &rest[opener.len()..];
        let Some((close_offset, shape)) = find_close(after_open, candidates) else {
            continue;
        };

        let open_start = cursor.pos;
        let payload_start = open_start + opener.len();
        let payload_end = payload_start + close_offset;
        let close_end = payload_end + shape.close().len();
        cursor.pos = close_end;
        return Ok(Some(ShapeSpan {
            shape,
            open: cursor.abs(open_start)..cursor.abs(payload_start),
            payload: cursor.abs(payload_start)..cursor.abs(payload_end),
            close: cursor.abs(payload_end)..cursor.abs(close_end),
            raw_payload: &cursor.text[payload_start..payload_end],
        }));
    }

    if rest.starts_with(['[', '(', '{', '>']) {
        return Err("unterminated node shape");
    }
    Ok(None)
}

/// Find the operator closing an inline edge text (`-- text -->`, `-. text .->`, `== text ==>`).
fn find_text_link_close(text: &str, opener: &str) -> Option<(usize, usize)> {
    let needle = match opener {
        "-." => ".-",
        other => other,
    };
    let mut in_quote = false;
    for (idx, ch) in text.char_indices() {
        if ch == '"' {
            in_quote = !in_quote;
            continue;
        }
        if in_quote || !text[idx..].starts_with(needle) {
            continue;
        }
        let len = edge_operator_len(&text[idx..]);
        if is_probable_edge_operator(&text[idx..idx + len]) {
            return Some((idx, len));
        }
    }
    None
}

fn parse_link<'a>(cursor: &mut Cursor<'a>) -> Result<Link<'a>, &'static str> {
    let rest = cursor.rest();
    if !rest.starts_with(is_edge_op_start_char) {
        return Err("expected an edge operator or '&'");
    }
    let len = edge_operator_len(rest);
    let op = &rest[..len];
    if !is_probable_edge_operator(op) {
        return Err("expected an edge operator");
    }
    cursor.bump(len);

    let mut label: Option<&'a str> = None;
    let connector = if matches!(op, "--" | "==" | "-.") {
        let text = cursor.rest();
        let (close_at, close_len) =
            find_text_link_close(text, op).ok_or("edge text is missing its closing arrow")?;
        let closing = &text[close_at..close_at + close_len];
        label = Some(unquote(text[..close_at].trim()));
        cursor.bump(close_at + close_len);
        if op == "-." {
            format!("-{closing}")
        } else {
            closing.to_owned()
        }
    } else {
        op.to_owned()
    };

    cursor.skip_ws();
    if cursor.peek() == Some('|') {
        cursor.bump(1);
        let rest = cursor.rest();
        let end = rest.find('|').ok_or("unterminated edge label")?;
        label = Some(unquote(rest[..end].trim()));
        cursor.bump(end + 1);
    }

    let direction = edge_direction(&connector);
    Ok(Link {
        connector: normalize_edge_operator(&connector, direction),
        label: label.filter(|label| !label.is_empty()),
        reverse: direction == EdgeDirection::Reverse,
    })
}
