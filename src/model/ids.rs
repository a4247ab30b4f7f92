// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Tessera-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Tessera and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::borrow::Borrow;
use std::fmt;
use std::marker::PhantomData;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// A typed identifier for session entities (nodes, edges, conversation turns, identities).
///
/// Ids double as storage key segments, so they must be non-empty and free of `/`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Id<T> {
    value: String,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Id<T> {
    pub fn new(value: impl Into<String>) -> Result<Self, IdError> {
        let value = value.into();
        validate_id_segment(&value)?;
        Ok(Self { value, _marker: PhantomData })
    }

    /// A fresh random (UUID v4) id.
    pub fn random() -> Self {
        Self { value: uuid::Uuid::new_v4().to_string(), _marker: PhantomData }
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }

    pub fn into_string(self) -> String {
        self.value
    }
}

impl<T> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

impl<T> AsRef<str> for Id<T> {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl<T> Borrow<str> for Id<T> {
    fn borrow(&self) -> &str {
        self.as_str()
    }
}

impl<T> FromStr for Id<T> {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.to_owned())
    }
}

impl<T> TryFrom<String> for Id<T> {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl<T> Serialize for Id<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.value)
    }
}

impl<'de, T> Deserialize<'de> for Id<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Self::new(value).map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdError {
    #[error("id must not be empty")]
    Empty,
    #[error("id must not contain '/'")]
    ContainsSlash,
}

fn validate_id_segment(value: &str) -> Result<(), IdError> {
    if value.is_empty() {
        return Err(IdError::Empty);
    }
    if value.contains('/') {
        return Err(IdError::ContainsSlash);
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeIdTag {}
pub type NodeId = Id<NodeIdTag>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EdgeIdTag {}
pub type EdgeId = Id<EdgeIdTag>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TurnIdTag {}
pub type TurnId = Id<TurnIdTag>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum UserIdTag {}
pub type UserId = Id<UserIdTag>;

/// Hands out fresh node and edge ids for one session.
///
/// The counters only ever move forward, so an id freed by a deletion (and possibly brought back
/// by undo) is never handed to a different entity.
#[derive(Debug, Clone, Default)]
pub struct IdAllocator {
    next_node: u64,
    next_edge: u64,
}

impl IdAllocator {
    /// Skip past every id already present so fresh ids never collide with parsed ones.
    pub fn observe<'a>(
        &mut self,
        node_ids: impl IntoIterator<Item = &'a NodeId>,
        edge_ids: impl IntoIterator<Item = &'a EdgeId>,
    ) {
        for node_id in node_ids {
            if let Some(n) = numeric_suffix(node_id.as_str(), "n") {
                self.next_node = self.next_node.max(n + 1);
            }
        }
        for edge_id in edge_ids {
            if let Some(n) = numeric_suffix(edge_id.as_str(), "e") {
                self.next_edge = self.next_edge.max(n + 1);
            }
        }
    }

    pub fn next_node_id(&mut self) -> NodeId {
        let id = format!("n{}", self.next_node);
        self.next_node += 1;
        Id { value: id, _marker: PhantomData }
    }

    pub fn next_edge_id(&mut self) -> EdgeId {
        let id = format!("e{}", self.next_edge);
        self.next_edge += 1;
        Id { value: id, _marker: PhantomData }
    }
}

fn numeric_suffix(value: &str, prefix: &str) -> Option<u64> {
    value.strip_prefix(prefix)?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::{EdgeId, Id, IdAllocator, IdError, NodeId};

    #[test]
    fn id_rejects_empty() {
        let result: Result<Id<()>, _> = Id::new("");
        assert_eq!(result, Err(IdError::Empty));
    }

    #[test]
    fn id_rejects_slash() {
        let result: Result<Id<()>, _> = Id::new("a/b");
        assert_eq!(result, Err(IdError::ContainsSlash));
    }

    #[test]
    fn id_serde_goes_through_validation() {
        let id: NodeId = serde_json::from_str("\"A\"").expect("deserialize");
        assert_eq!(serde_json::to_string(&id).expect("serialize"), "\"A\"");
        assert!(serde_json::from_str::<NodeId>("\"\"").is_err());
    }

    #[test]
    fn allocator_skips_observed_ids_and_never_reuses() {
        let existing = [NodeId::new("n4").expect("id"), NodeId::new("Auth").expect("id")];
        let edges = [EdgeId::new("e0").expect("id")];
        let mut ids = IdAllocator::default();
        ids.observe(existing.iter(), edges.iter());

        assert_eq!(ids.next_node_id().as_str(), "n5");
        assert_eq!(ids.next_node_id().as_str(), "n6");
        assert_eq!(ids.next_edge_id().as_str(), "e1");

        ids.observe(existing.iter(), edges.iter());
        assert_eq!(ids.next_node_id().as_str(), "n7");
    }
}
