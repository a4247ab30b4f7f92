// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Tessera-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Tessera and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Mermaid flowchart scanning, label escaping, parsing and exporting.

pub mod flowchart;
mod ident;
pub mod label;
pub mod statement;

pub use flowchart::{
    export_flowchart, parse_flowchart, style_class_name, MermaidFlowchartExportError,
    MermaidFlowchartParseError, STYLE_CLASS_PREFIX,
};
pub use ident::MermaidIdentError;
pub use label::{decode_entities, sanitize_label};
pub use statement::{scan, ScannedDocument};
