// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Tessera-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Tessera and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Diagram text formats.
//!
//! Mermaid flowcharts are the only source format; the scanner, label escaping and the graph
//! parser/exporter live under [`mermaid`].

pub mod mermaid;
