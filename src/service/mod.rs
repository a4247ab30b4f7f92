// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Tessera-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Tessera and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Boundary to the external diagram generation service.
//!
//! The service is an opaque collaborator: it turns prompts into Mermaid source (or into a
//! structural plan first). This module owns the wire shapes and their normalisation; the
//! transport lives behind [`GenerationService`] so sessions can run against a scripted double.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::NetworkError;
use crate::model::{DiagramKind, DiagramVersion};

pub mod http;

pub use http::HttpGenerationService;

/// How much code the service may embed into generated nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetailLevel {
    #[default]
    Small,
    Complete,
}

impl DetailLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Small => "small",
            Self::Complete => "complete",
        }
    }
}

impl fmt::Display for DetailLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DetailLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "small" => Ok(Self::Small),
            "complete" => Ok(Self::Complete),
            other => Err(format!("unknown detail level: {other}")),
        }
    }
}

/// Body of `generate` and `plan`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub prompt: String,
    pub diagram_type: DiagramKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub code_detail_level: DetailLevel,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateFromPlanRequest {
    pub diagram_plan: Value,
    pub diagram_type: DiagramKind,
    pub code_detail_level: DetailLevel,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateRequest {
    pub prompt: String,
    pub current_mermaid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

/// One call to the service, kept whole so it can be replayed verbatim by a retry.
#[derive(Debug, Clone, PartialEq)]
pub enum GenerationRequest {
    Generate(GenerateRequest),
    Plan(GenerateRequest),
    FromPlan(GenerateFromPlanRequest),
    Update(UpdateRequest),
}

impl GenerationRequest {
    /// Path relative to the service base URL.
    pub fn endpoint(&self) -> &'static str {
        match self {
            Self::Generate(_) => "api/v1/generate",
            Self::Plan(_) => "api/v1/plan",
            Self::FromPlan(_) => "api/v1/generate-from-plan",
            Self::Update(_) => "api/v1/update",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Generate(_) => "generate",
            Self::Plan(_) => "plan",
            Self::FromPlan(_) => "generate_from_plan",
            Self::Update(_) => "update",
        }
    }

    pub fn diagram_kind(&self) -> Option<DiagramKind> {
        match self {
            Self::Generate(request) | Self::Plan(request) => Some(request.diagram_type),
            Self::FromPlan(request) => Some(request.diagram_type),
            Self::Update(_) => None,
        }
    }

    pub fn body(&self) -> Result<Value, serde_json::Error> {
        match self {
            Self::Generate(request) | Self::Plan(request) => serde_json::to_value(request),
            Self::FromPlan(request) => serde_json::to_value(request),
            Self::Update(request) => serde_json::to_value(request),
        }
    }
}

/// Diagram response as sent by the service. Every field is optional on the wire.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationResponse {
    #[serde(alias = "source")]
    pub mermaid: Option<String>,
    pub versions: Vec<DiagramVersion>,
    #[serde(rename = "selectedVersion")]
    pub selected_version: Option<usize>,
    pub explanation: Option<String>,
    pub plan_summary: Option<String>,
    pub diagram_plan: Option<Value>,
}

/// A usable diagram: at least one version with non-blank code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagramOutcome {
    pub versions: Vec<DiagramVersion>,
    /// Always a valid index into `versions`.
    pub selected: usize,
    pub explanation: Option<String>,
}

impl GenerationResponse {
    /// Normalise into a [`DiagramOutcome`].
    ///
    /// Versions with blank code are dropped; a response without versions falls back to its
    /// top-level `mermaid`/`source` field.
    pub fn into_outcome(self) -> Result<DiagramOutcome, NetworkError> {
        let mut versions = self
            .versions
            .into_iter()
            .filter(|version| !version.code.trim().is_empty())
            .collect::<Vec<_>>();
        if versions.is_empty() {
            match self.mermaid.filter(|code| !code.trim().is_empty()) {
                Some(code) => versions.push(DiagramVersion::new(code)),
                None => {
                    return Err(NetworkError::InvalidResponseShape {
                        reason: "response carries neither versions nor mermaid source".to_owned(),
                    })
                }
            }
        }
        let selected = self.selected_version.filter(|&index| index < versions.len()).unwrap_or(0);
        let explanation = self.explanation.filter(|text| !text.trim().is_empty());
        Ok(DiagramOutcome { versions, selected, explanation })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanResponse {
    pub diagram_plan: Value,
    #[serde(default)]
    pub plan_summary: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ServiceReply {
    Diagram(DiagramOutcome),
    Plan(PlanResponse),
}

#[async_trait]
pub trait GenerationService: Send + Sync {
    async fn generate(&self, request: &GenerateRequest) -> Result<GenerationResponse, NetworkError>;

    async fn plan(&self, request: &GenerateRequest) -> Result<PlanResponse, NetworkError>;

    async fn generate_from_plan(
        &self,
        request: &GenerateFromPlanRequest,
    ) -> Result<GenerationResponse, NetworkError>;

    async fn update(&self, request: &UpdateRequest) -> Result<GenerationResponse, NetworkError>;
}

/// Send `request` to the matching endpoint and normalise the answer.
pub async fn dispatch(
    service: &dyn GenerationService,
    request: &GenerationRequest,
) -> Result<ServiceReply, NetworkError> {
    tracing::info!(request = request.name(), kind = ?request.diagram_kind(), "generation request issued");
    let reply = match request {
        GenerationRequest::Generate(body) => {
            service.generate(body).await?.into_outcome().map(ServiceReply::Diagram)
        }
        GenerationRequest::Plan(body) => {
            let plan = service.plan(body).await?;
            if plan.diagram_plan.is_null() {
                Err(NetworkError::InvalidResponseShape { reason: "plan response has no diagram_plan".to_owned() })
            } else {
                Ok(ServiceReply::Plan(plan))
            }
        }
        GenerationRequest::FromPlan(body) => {
            service.generate_from_plan(body).await?.into_outcome().map(ServiceReply::Diagram)
        }
        GenerationRequest::Update(body) => {
            service.update(body).await?.into_outcome().map(ServiceReply::Diagram)
        }
    };
    match &reply {
        Ok(_) => tracing::info!(request = request.name(), "generation request resolved"),
        Err(err) => tracing::warn!(request = request.name(), error = %err, "generation request failed"),
    }
    reply
}

/// Pull the first usable message out of an error body.
///
/// Accepts `{"detail": "message"}` and validation lists `{"detail": [{"loc", "msg", "type"}]}`.
pub fn parse_error_detail(body: &str) -> Option<String> {
    let value = serde_json::from_str::<Value>(body).ok()?;
    match value.get("detail")? {
        Value::String(message) => Some(message.trim().to_owned()).filter(|message| !message.is_empty()),
        Value::Array(items) => items.iter().find_map(|item| {
            let message = item.get("msg")?.as_str()?.trim();
            if message.is_empty() {
                return None;
            }
            let location = item
                .get("loc")
                .and_then(Value::as_array)
                .map(|loc| {
                    loc.iter()
                        .filter_map(|part| match part {
                            Value::String(part) if part != "body" => Some(part.clone()),
                            Value::Number(index) => Some(index.to_string()),
                            _ => None,
                        })
                        .collect::<Vec<_>>()
                        .join(".")
                })
                .filter(|location| !location.is_empty());
            Some(match location {
                Some(location) => format!("{location}: {message}"),
                None => message.to_owned(),
            })
        }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use serde_json::json;

    use super::{
        parse_error_detail, DetailLevel, GenerateRequest, GenerationRequest, GenerationResponse,
        UpdateRequest,
    };
    use crate::error::NetworkError;
    use crate::model::DiagramKind;

    #[test]
    fn generate_body_matches_wire_format() {
        let request = GenerationRequest::Generate(GenerateRequest {
            prompt: "payments".to_owned(),
            diagram_type: DiagramKind::Hld,
            model: None,
            code_detail_level: DetailLevel::Complete,
        });
        assert_eq!(request.endpoint(), "api/v1/generate");
        assert_eq!(
            request.body().expect("body"),
            json!({"prompt": "payments", "diagram_type": "hld", "code_detail_level": "complete"})
        );

        let update = GenerationRequest::Update(UpdateRequest {
            prompt: "add a cache".to_owned(),
            current_mermaid: "flowchart TD\n  A\n".to_owned(),
            model: Some("fast".to_owned()),
        });
        assert_eq!(update.endpoint(), "api/v1/update");
        assert_eq!(update.body().expect("body")["model"], "fast");
    }

    #[test]
    fn versions_win_over_top_level_source() {
        let response: GenerationResponse = serde_json::from_value(json!({
            "mermaid": "flowchart TD\n  X\n",
            "versions": [
                {"code": "flowchart TD\n  A\n", "layout": "Hierarchical", "direction": "TB", "description": ""},
                {"code": "flowchart LR\n  A\n", "layout": "Horizontal", "direction": "LR", "description": ""}
            ],
            "selectedVersion": 1,
            "explanation": "Two layouts"
        }))
        .expect("deserialize");
        let outcome = response.into_outcome().expect("outcome");
        assert_eq!(outcome.versions.len(), 2);
        assert_eq!(outcome.selected, 1);
        assert_eq!(outcome.explanation.as_deref(), Some("Two layouts"));
    }

    #[test]
    fn source_alias_becomes_a_single_version() {
        let response: GenerationResponse =
            serde_json::from_value(json!({"source": "flowchart TD\n  A\n", "selectedVersion": 4}))
                .expect("deserialize");
        let outcome = response.into_outcome().expect("outcome");
        assert_eq!(outcome.versions.len(), 1);
        assert_eq!(outcome.versions[0].code, "flowchart TD\n  A\n");
        assert_eq!(outcome.selected, 0);
    }

    #[test]
    fn empty_response_is_an_invalid_shape() {
        let response: GenerationResponse =
            serde_json::from_value(json!({"mermaid": "  ", "versions": [{"code": ""}]})).expect("deserialize");
        assert!(matches!(response.into_outcome(), Err(NetworkError::InvalidResponseShape { .. })));
    }

    #[rstest]
    #[case(r#"{"detail": "Diagram generation failed. Please try again."}"#, Some("Diagram generation failed. Please try again."))]
    #[case(r#"{"detail": [{"loc": ["body", "prompt"], "msg": "field required", "type": "value_error.missing"}]}"#, Some("prompt: field required"))]
    #[case(r#"{"detail": [{"loc": [], "msg": ""}, {"msg": "bad type"}]}"#, Some("bad type"))]
    #[case(r#"{"detail": 42}"#, None)]
    #[case("<html>Bad Gateway</html>", None)]
    fn error_details_are_extracted(#[case] body: &str, #[case] expected: Option<&str>) {
        assert_eq!(parse_error_detail(body).as_deref(), expected);
    }

    #[test]
    fn detail_level_parses_case_insensitively() {
        assert_eq!("Complete".parse::<DetailLevel>(), Ok(DetailLevel::Complete));
        assert!("huge".parse::<DetailLevel>().is_err());
    }
}
