// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Tessera-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Tessera and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Undo/redo for graph mode.
//!
//! Snapshots are owned copies of the node and edge lists. Both stacks are bounded; once full the
//! oldest entry is dropped.

use std::collections::VecDeque;

use crate::error::StateError;
use crate::model::{GraphEdge, GraphNode, GraphState};

pub const HISTORY_LIMIT: usize = 50;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct HistorySnapshot {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

impl HistorySnapshot {
    pub fn capture(graph: &GraphState) -> Self {
        Self { nodes: graph.nodes().to_vec(), edges: graph.edges().to_vec() }
    }

    pub fn restore_into(self, graph: &mut GraphState) {
        graph.replace_contents(self.nodes, self.edges);
    }
}

#[derive(Debug, Clone)]
pub struct HistoryManager {
    past: VecDeque<HistorySnapshot>,
    future: VecDeque<HistorySnapshot>,
    limit: usize,
    suppress_next: bool,
}

impl Default for HistoryManager {
    fn default() -> Self {
        Self::new(HISTORY_LIMIT)
    }
}

impl HistoryManager {
    /// A zero limit is raised to one.
    pub fn new(limit: usize) -> Self {
        Self {
            past: VecDeque::new(),
            future: VecDeque::new(),
            limit: limit.max(1),
            suppress_next: false,
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn past_len(&self) -> usize {
        self.past.len()
    }

    pub fn future_len(&self) -> usize {
        self.future.len()
    }

    pub fn can_undo(&self) -> bool {
        !self.past.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.future.is_empty()
    }

    /// Swallow exactly one upcoming [`push`](Self::push).
    ///
    /// Called right after a snapshot has been installed programmatically, so the change
    /// notification that follows does not record the restore as a new edit.
    pub fn suppress_next_push(&mut self) {
        self.suppress_next = true;
    }

    /// Record the state before an edit. Returns `false` when the push was suppressed.
    pub fn push(&mut self, snapshot: HistorySnapshot) -> bool {
        if std::mem::take(&mut self.suppress_next) {
            tracing::trace!("history push suppressed");
            return false;
        }
        self.future.clear();
        push_bounded(&mut self.past, snapshot, self.limit, "past");
        true
    }

    /// Step back. `current` is the live state, which becomes the next redo target.
    pub fn undo(&mut self, current: HistorySnapshot) -> Option<HistorySnapshot> {
        let previous = self.past.pop_back()?;
        push_bounded(&mut self.future, current, self.limit, "future");
        Some(previous)
    }

    pub fn redo(&mut self, current: HistorySnapshot) -> Option<HistorySnapshot> {
        let next = self.future.pop_back()?;
        push_bounded(&mut self.past, current, self.limit, "past");
        Some(next)
    }

    pub fn try_undo(&mut self, current: HistorySnapshot) -> Result<HistorySnapshot, StateError> {
        self.undo(current).ok_or(StateError::HistoryEmpty)
    }

    pub fn try_redo(&mut self, current: HistorySnapshot) -> Result<HistorySnapshot, StateError> {
        self.redo(current).ok_or(StateError::HistoryEmpty)
    }

    pub fn clear(&mut self) {
        self.past.clear();
        self.future.clear();
        self.suppress_next = false;
    }
}

fn push_bounded(
    stack: &mut VecDeque<HistorySnapshot>,
    snapshot: HistorySnapshot,
    limit: usize,
    which: &'static str,
) {
    stack.push_back(snapshot);
    while stack.len() > limit {
        stack.pop_front();
        tracing::debug!(stack = which, limit, "history evicted oldest snapshot");
    }
}
