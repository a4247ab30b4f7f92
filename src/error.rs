// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Tessera-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Tessera and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Error families shared across the crate.
//!
//! Each family maps onto one way a user-facing operation can fail. Callers decide how a failure
//! is surfaced (inline next to the edited shape, or as a toast with a retry action); see
//! [`SessionError::surface`].

use thiserror::Error;

use crate::format::mermaid::{MermaidFlowchartExportError, MermaidFlowchartParseError};
use crate::model::EditorMode;
use crate::ops::GraphOpError;
use crate::render::RenderError;
use crate::store::StoreError;

/// The document could not be resolved to a single editable node declaration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("node '{node_id}' does not appear in the diagram")]
    NodeNotFound { node_id: String },
    #[error("node '{node_id}' is declared {count} times; edit the text directly to disambiguate")]
    AmbiguousNode { node_id: String, count: usize },
    #[error("structural plan for '{kind}' is not a JSON object")]
    UnsupportedPlan { kind: String },
}

/// User input was rejected before touching any state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("label must not be empty")]
    EmptyLabel,
    #[error("label is {len} characters long (limit {max})")]
    LabelTooLong { len: usize, max: usize },
    #[error("invalid value for style property '{property}': {value:?}")]
    InvalidStyle { property: &'static str, value: String },
    #[error("prompt must not be empty")]
    EmptyPrompt,
    #[error("'{value}' is not a valid id")]
    InvalidId { value: String },
}

/// The generation service could not be reached or answered with something unusable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NetworkError {
    #[error("{message}")]
    RequestFailed { status: Option<u16>, message: String },
    #[error("generation service returned an unexpected response: {reason}")]
    InvalidResponseShape { reason: String },
}

impl NetworkError {
    /// Text shown in the toast that carries the retry action.
    pub fn user_message(&self) -> String {
        match self {
            Self::RequestFailed { status: Some(status), message } if message.is_empty() => {
                format!("Request failed with status {status}")
            }
            Self::RequestFailed { message, .. } => message.clone(),
            Self::InvalidResponseShape { .. } => {
                "The generation service returned an unexpected response".to_owned()
            }
        }
    }
}

/// The operation is not valid in the session's current state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    #[error("there is no pending plan to confirm or cancel")]
    NoPendingPlan,
    #[error("nothing to undo or redo")]
    HistoryEmpty,
    #[error("operation requires {expected} mode")]
    WrongMode { expected: EditorMode },
    #[error("unknown conversation turn: {turn_id}")]
    UnknownTurn { turn_id: String },
    #[error("turn {turn_id} was not written by the user")]
    NotAUserTurn { turn_id: String },
    #[error("a plan is still being prepared")]
    PlanNotReady,
    #[error("no diagram is installed")]
    NoDiagram,
    #[error("no request has been submitted yet")]
    NothingToRetry,
    #[error("no node is selected")]
    NothingSelected,
}

/// Failure of a pure DSL mutation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MutationError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Umbrella error returned by [`crate::session::DiagramSessionController`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SessionError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Network(#[from] NetworkError),
    #[error(transparent)]
    State(#[from] StateError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error(transparent)]
    Graph(#[from] GraphOpError),
    #[error("cannot open the diagram in graph mode: {0}")]
    Flowchart(#[from] MermaidFlowchartParseError),
    #[error("cannot write the graph back to text: {0}")]
    Export(#[from] MermaidFlowchartExportError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<MutationError> for SessionError {
    fn from(err: MutationError) -> Self {
        match err {
            MutationError::Parse(err) => Self::Parse(err),
            MutationError::Validation(err) => Self::Validation(err),
        }
    }
}

/// Where the host should display an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Surface {
    /// Next to the shape or field being edited.
    Inline,
    /// A transient notification carrying a retry action.
    ToastWithRetry,
    /// A transient notification.
    Toast,
}

impl SessionError {
    pub fn surface(&self) -> Surface {
        match self {
            Self::Parse(_) | Self::Validation(_) => Surface::Inline,
            Self::Network(_) => Surface::ToastWithRetry,
            _ => Surface::Toast,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mutation_errors_keep_their_family() {
        let err: SessionError = MutationError::from(ValidationError::EmptyLabel).into();
        assert_eq!(err, SessionError::Validation(ValidationError::EmptyLabel));
        assert_eq!(err.surface(), Surface::Inline);
    }

    #[test]
    fn network_errors_surface_with_retry() {
        let err = SessionError::from(NetworkError::RequestFailed {
            status: Some(502),
            message: String::new(),
        });
        assert_eq!(err.surface(), Surface::ToastWithRetry);
        let SessionError::Network(network) = err else {
            panic!("expected network error");
        };
        assert_eq!(network.user_message(), "Request failed with status 502");
    }
}
