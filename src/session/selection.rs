// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Tessera-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Tessera and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::collections::BTreeSet;

use crate::model::NodeStyle;
use crate::ops::EntityEdit;
use crate::render::NodeClick;

/// Transient editor state: which nodes are selected and what the user typed so far.
///
/// Discarded on save and on cancel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntitySelection {
    primary: Option<String>,
    selected: BTreeSet<String>,
    /// Label currently shown for `primary`, for prefilling the editor.
    current_label: Option<String>,
    pending: EntityEdit,
}

impl EntitySelection {
    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    pub fn primary(&self) -> Option<&str> {
        self.primary.as_deref()
    }

    pub fn selected(&self) -> impl Iterator<Item = &str> {
        self.selected.iter().map(String::as_str)
    }

    pub fn contains(&self, node_id: &str) -> bool {
        self.selected.contains(node_id)
    }

    pub fn current_label(&self) -> Option<&str> {
        self.current_label.as_deref()
    }

    pub fn pending(&self) -> &EntityEdit {
        &self.pending
    }

    /// Apply a click. Ctrl/cmd toggles membership; a plain click replaces the selection.
    ///
    /// `current_label` is the label found in the source, if any; the shape's visible text is used
    /// otherwise. Pending edits are dropped whenever the primary node changes.
    pub fn apply_click(&mut self, click: &NodeClick, current_label: Option<String>) {
        let label = current_label.or_else(|| Some(click.label.clone()).filter(|label| !label.is_empty()));

        if click.event.toggles_selection() {
            if self.selected.remove(&click.node_id) {
                if self.primary.as_deref() == Some(click.node_id.as_str()) {
                    self.primary = self.selected.iter().next_back().cloned();
                    self.current_label = None;
                    self.pending = EntityEdit::default();
                }
                return;
            }
            self.selected.insert(click.node_id.clone());
        } else {
            self.selected.clear();
            self.selected.insert(click.node_id.clone());
        }

        if self.primary.as_deref() != Some(click.node_id.as_str()) {
            self.pending = EntityEdit::default();
        }
        self.primary = Some(click.node_id.clone());
        self.current_label = label;
    }

    pub fn set_label(&mut self, label: impl Into<String>) {
        self.pending.label = Some(label.into());
    }

    pub fn set_style(&mut self, style: NodeStyle) {
        self.pending.style = Some(style);
    }

    /// Take the pending edit and the selection it applies to, leaving the selection empty.
    pub fn take(&mut self) -> (Option<String>, Vec<String>, EntityEdit) {
        let taken = std::mem::take(self);
        (taken.primary, taken.selected.into_iter().collect(), taken.pending)
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
