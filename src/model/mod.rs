// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Tessera-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Tessera and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Core data model.
//!
//! A session holds Mermaid source (text mode) or a node/edge graph (graph mode), the layout
//! versions returned by the generation service, and the chat log that produced them.

pub mod conversation;
pub mod graph;
pub mod ids;
pub mod kind;
pub mod source;
pub mod style;
pub mod version;

pub use conversation::{ConversationLog, ConversationTurn, Role, PERSISTED_TURN_LIMIT};
pub use graph::{FlowDirection, GraphEdge, GraphNode, GraphState, NodeShape, Point};
pub use ids::{EdgeId, Id, IdAllocator, IdError, NodeId, TurnId, UserId};
pub use kind::DiagramKind;
pub use source::{DiagramSource, EditorMode};
pub use style::NodeStyle;
pub use version::{DiagramVersion, VersionSet};
