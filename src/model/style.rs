// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Tessera-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Tessera and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Visual attributes a user can set on a single node.
///
/// Serialised into a Mermaid `classDef` body (`fill:#f9f,stroke:#333,stroke-width:2px`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeStyle {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fill: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stroke: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stroke_width: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_weight: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stroke_dasharray: Option<String>,
}

impl NodeStyle {
    pub fn is_empty(&self) -> bool {
        self.properties().next().is_none()
    }

    /// `(css property, value)` pairs in a fixed order.
    pub fn properties(&self) -> impl Iterator<Item = (&'static str, &str)> {
        [
            ("fill", self.fill.as_deref()),
            ("stroke", self.stroke.as_deref()),
            ("stroke-width", self.stroke_width.as_deref()),
            ("color", self.color.as_deref()),
            ("font-weight", self.font_weight.as_deref()),
            ("stroke-dasharray", self.stroke_dasharray.as_deref()),
        ]
        .into_iter()
        .filter_map(|(property, value)| value.map(|value| (property, value)))
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        for (property, value) in self.properties() {
            let trimmed = value.trim();
            if trimmed.is_empty()
                || trimmed.chars().any(|ch| matches!(ch, ',' | ';' | ':' | '\n' | '\r'))
            {
                return Err(ValidationError::InvalidStyle { property, value: value.to_owned() });
            }
        }
        Ok(())
    }

    pub fn to_class_def_body(&self) -> String {
        let mut body = String::new();
        for (property, value) in self.properties() {
            if !body.is_empty() {
                body.push(',');
            }
            body.push_str(property);
            body.push(':');
            body.push_str(value.trim());
        }
        body
    }

    /// Read a `classDef` body back. Unknown properties are dropped.
    pub fn parse_class_def_body(body: &str) -> Self {
        let mut style = Self::default();
        for declaration in body.split(',') {
            let Some((property, value)) = declaration.split_once(':') else {
                continue;
            };
            let value = value.trim().trim_end_matches(';').trim();
            if value.is_empty() {
                continue;
            }
            let slot = match property.trim() {
                "fill" => &mut style.fill,
                "stroke" => &mut style.stroke,
                "stroke-width" => &mut style.stroke_width,
                "color" => &mut style.color,
                "font-weight" => &mut style.font_weight,
                "stroke-dasharray" => &mut style.stroke_dasharray,
                _ => continue,
            };
            *slot = Some(value.to_owned());
        }
        style
    }

    /// Layer `other` on top of `self`; properties set in `other` win.
    pub fn merged_with(&self, other: &NodeStyle) -> NodeStyle {
        NodeStyle {
            fill: other.fill.clone().or_else(|| self.fill.clone()),
            stroke: other.stroke.clone().or_else(|| self.stroke.clone()),
            stroke_width: other.stroke_width.clone().or_else(|| self.stroke_width.clone()),
            color: other.color.clone().or_else(|| self.color.clone()),
            font_weight: other.font_weight.clone().or_else(|| self.font_weight.clone()),
            stroke_dasharray: other
                .stroke_dasharray
                .clone()
                .or_else(|| self.stroke_dasharray.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::NodeStyle;
    use crate::error::ValidationError;

    #[test]
    fn class_def_body_round_trips_known_properties() {
        let style = NodeStyle {
            fill: Some("#f9f".to_owned()),
            stroke_width: Some("2px".to_owned()),
            ..NodeStyle::default()
        };
        let body = style.to_class_def_body();
        assert_eq!(body, "fill:#f9f,stroke-width:2px");
        assert_eq!(NodeStyle::parse_class_def_body(&format!("{body},opacity:0.5")), style);
    }

    #[test]
    fn rejects_values_that_would_break_the_rule() {
        let style = NodeStyle { stroke: Some("red;fill:blue".to_owned()), ..NodeStyle::default() };
        assert_eq!(
            style.validate(),
            Err(ValidationError::InvalidStyle {
                property: "stroke",
                value: "red;fill:blue".to_owned()
            })
        );
    }

    #[test]
    fn merge_prefers_incoming_values() {
        let base = NodeStyle {
            fill: Some("#fff".to_owned()),
            color: Some("#000".to_owned()),
            ..NodeStyle::default()
        };
        let patch = NodeStyle { fill: Some("#f00".to_owned()), ..NodeStyle::default() };
        let merged = base.merged_with(&patch);
        assert_eq!(merged.fill.as_deref(), Some("#f00"));
        assert_eq!(merged.color.as_deref(), Some("#000"));
    }
}
