// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Tessera-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Tessera and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use serde::{Deserialize, Serialize};

/// One layout alternative of the same logical diagram.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagramVersion {
    pub code: String,
    pub layout: String,
    pub direction: String,
    pub description: String,
}

impl DiagramVersion {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            layout: "Default".to_owned(),
            direction: "TB".to_owned(),
            description: String::new(),
        }
    }
}

/// Ordered layout versions plus the index of the one currently shown.
///
/// The selected index is always in bounds while the set is non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VersionSet {
    versions: Vec<DiagramVersion>,
    selected: usize,
}

impl VersionSet {
    pub fn new(versions: Vec<DiagramVersion>) -> Self {
        Self { versions, selected: 0 }
    }

    pub fn versions(&self) -> &[DiagramVersion] {
        &self.versions
    }

    pub fn selected_index(&self) -> usize {
        self.selected
    }

    pub fn len(&self) -> usize {
        self.versions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    pub fn active(&self) -> Option<&DiagramVersion> {
        self.versions.get(self.selected)
    }

    /// Install a fresh list; selection always resets to the first version.
    pub fn replace(&mut self, versions: Vec<DiagramVersion>) {
        self.versions = versions;
        self.selected = 0;
    }

    /// Select version `index`. Out-of-range indices leave the selection unchanged.
    pub fn select(&mut self, index: usize) -> bool {
        if index >= self.versions.len() {
            return false;
        }
        self.selected = index;
        true
    }

    /// Keep the active version in step with edits made to the installed source.
    pub fn set_active_code(&mut self, code: impl Into<String>) {
        if let Some(active) = self.versions.get_mut(self.selected) {
            active.code = code.into();
        }
    }

    pub fn clear(&mut self) {
        self.versions.clear();
        self.selected = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::{DiagramVersion, VersionSet};

    fn three_versions() -> VersionSet {
        VersionSet::new(vec![
            DiagramVersion::new("flowchart TB\nA"),
            DiagramVersion::new("flowchart LR\nA"),
            DiagramVersion::new("flowchart BT\nA"),
        ])
    }

    #[test]
    fn select_out_of_range_is_a_no_op() {
        let mut versions = three_versions();
        assert!(versions.select(2));
        assert!(!versions.select(3));
        assert_eq!(versions.selected_index(), 2);
        assert_eq!(versions.active().expect("active").code, "flowchart BT\nA");
    }

    #[test]
    fn replace_resets_selection() {
        let mut versions = three_versions();
        versions.select(1);
        versions.replace(vec![DiagramVersion::new("flowchart TB\nB")]);
        assert_eq!(versions.selected_index(), 0);
        assert_eq!(versions.len(), 1);
    }

    #[test]
    fn active_code_follows_edits() {
        let mut versions = three_versions();
        versions.select(1);
        versions.set_active_code("flowchart LR\nA[\"Alpha\"]");
        assert_eq!(versions.versions()[1].code, "flowchart LR\nA[\"Alpha\"]");
        assert_eq!(versions.versions()[0].code, "flowchart TB\nA");
    }
}
