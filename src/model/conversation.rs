// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Tessera-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Tessera and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::TurnId;
use super::kind::DiagramKind;
use crate::error::StateError;

/// Maximum number of turns kept in persisted storage.
pub const PERSISTED_TURN_LIMIT: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub id: TurnId,
    pub role: Role,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagram_kind: Option<DiagramKind>,
}

/// Chat history of a session. Append-only, apart from editing a past user turn.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConversationLog {
    turns: Vec<ConversationTurn>,
}

impl ConversationLog {
    pub fn from_turns(turns: Vec<ConversationTurn>) -> Self {
        Self { turns }
    }

    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn append(
        &mut self,
        role: Role,
        text: impl Into<String>,
        diagram_kind: Option<DiagramKind>,
    ) -> &ConversationTurn {
        let id = TurnId::random();
        let index = self.turns.len();
        self.turns.push(ConversationTurn {
            id,
            role,
            text: text.into(),
            timestamp: Utc::now(),
            diagram_kind,
        });
        &self.turns[index]
    }

    pub fn turn(&self, turn_id: &str) -> Option<&ConversationTurn> {
        self.turns.iter().find(|turn| turn.id.as_str() == turn_id)
    }

    /// Replace the text of a user turn and drop every turn that followed it.
    ///
    /// Returns the number of turns removed.
    pub fn edit_user_turn(&mut self, turn_id: &str, text: impl Into<String>) -> Result<usize, StateError> {
        let index = self
            .turns
            .iter()
            .position(|turn| turn.id.as_str() == turn_id)
            .ok_or_else(|| StateError::UnknownTurn { turn_id: turn_id.to_owned() })?;
        if self.turns[index].role != Role::User {
            return Err(StateError::NotAUserTurn { turn_id: turn_id.to_owned() });
        }

        let removed = self.turns.len() - index - 1;
        self.turns.truncate(index + 1);
        let turn = &mut self.turns[index];
        turn.text = text.into();
        turn.timestamp = Utc::now();
        Ok(removed)
    }

    /// Whether `turn_id` is the earliest user turn in the log.
    pub fn is_first_user_turn(&self, turn_id: &str) -> bool {
        self.turns
            .iter()
            .find(|turn| turn.role == Role::User)
            .is_some_and(|turn| turn.id.as_str() == turn_id)
    }

    /// The most recent turns that fit in persisted storage.
    pub fn persisted_tail(&self) -> &[ConversationTurn] {
        let start = self.turns.len().saturating_sub(PERSISTED_TURN_LIMIT);
        &self.turns[start..]
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }
}
