// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Tessera-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Tessera and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Diagram families the generation service can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagramKind {
    #[default]
    Architecture,
    Hld,
    Lld,
    Mindtree,
    Class,
    Sequence,
    Usecase,
    Activity,
    State,
    Component,
    Deployment,
}

impl DiagramKind {
    pub const ALL: [DiagramKind; 11] = [
        Self::Architecture,
        Self::Hld,
        Self::Lld,
        Self::Mindtree,
        Self::Class,
        Self::Sequence,
        Self::Usecase,
        Self::Activity,
        Self::State,
        Self::Component,
        Self::Deployment,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Architecture => "architecture",
            Self::Hld => "hld",
            Self::Lld => "lld",
            Self::Mindtree => "mindtree",
            Self::Class => "class",
            Self::Sequence => "sequence",
            Self::Usecase => "usecase",
            Self::Activity => "activity",
            Self::State => "state",
            Self::Component => "component",
            Self::Deployment => "deployment",
        }
    }
}

impl fmt::Display for DiagramKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownDiagramKind(pub String);

impl fmt::Display for UnknownDiagramKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown diagram type: {}", self.0)
    }
}

impl std::error::Error for UnknownDiagramKind {}

impl FromStr for DiagramKind {
    type Err = UnknownDiagramKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == wanted)
            .ok_or_else(|| UnknownDiagramKind(s.to_owned()))
    }
}
