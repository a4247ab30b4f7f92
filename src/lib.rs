// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Tessera-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Tessera and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Tessera: Mermaid-backed diagram sessions.
//!
//! The Mermaid source is the single source of truth. Text-mode edits rewrite exactly the
//! statements they target ([`ops`]); graph mode edits a parsed [`model::GraphState`] with undo
//! ([`history`]); [`render`] turns source into SVG and maps clicks back to node ids; and
//! [`session::DiagramSessionController`] ties these to the generation service, layout versions,
//! the plan-first workflow and the per-user chat log.

pub mod config;
pub mod error;
pub mod format;
pub mod history;
pub mod model;
pub mod ops;
pub mod render;
pub mod service;
pub mod session;
pub mod store;
pub mod workflow;
