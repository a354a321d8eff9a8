//! Vertex and edge identifiers for the organizational hierarchy graph.
//!
//! A [`Vertex`] is the canonical string form of an external node identifier (job positions are
//! identified by UUIDs). The reserved [`Vertex::NIL`] sentinel stands for "no parent" when it is an
//! edge endpoint and for "unrestricted authority" when it is claimed as an ancestor.

use std::{
    borrow::Cow,
    fmt::{Display, Formatter},
    str::FromStr,
};

use uuid::Uuid;

use crate::error::HierarchyError;

/// Separates the components of a cache key. Never valid inside a vertex.
pub const KEY_SEPARATOR: char = ':';

/// Canonical string form of the sentinel vertex.
pub const NIL_VERTEX: &str = "00000000";

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Vertex(Cow<'static, str>);

impl Vertex {
    pub const NIL: Vertex = Vertex(Cow::Borrowed(NIL_VERTEX));

    pub fn new<S: Into<String>>(id: S) -> Result<Self, HierarchyError> {
        let id = id.into();
        if id.is_empty() {
            return Err(HierarchyError::InvalidVertex(
                "vertex identifier cannot be empty".to_string(),
            ));
        }
        if id.contains(KEY_SEPARATOR) {
            return Err(HierarchyError::InvalidVertex(format!(
                "vertex identifier '{id}' contains the reserved separator '{KEY_SEPARATOR}'"
            )));
        }
        Ok(Vertex(Cow::Owned(id)))
    }

    pub fn is_nil(&self) -> bool {
        self.0 == NIL_VERTEX
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parse the vertex back into the domain identifier it was created from. The sentinel maps to
    /// the nil UUID.
    pub fn to_uuid(&self) -> Result<Uuid, HierarchyError> {
        if self.is_nil() {
            return Ok(Uuid::nil());
        }
        Uuid::parse_str(self.as_str())
            .map_err(|e| HierarchyError::InvalidVertex(format!("invalid uuid {self}: {e}")))
    }
}

impl AsRef<str> for Vertex {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl From<Uuid> for Vertex {
    fn from(id: Uuid) -> Self {
        if id.is_nil() {
            Vertex::NIL
        } else {
            Vertex(Cow::Owned(
                id.hyphenated()
                    .encode_lower(&mut Uuid::encode_buffer())
                    .to_string(),
            ))
        }
    }
}

impl TryFrom<&str> for Vertex {
    type Error = HierarchyError;

    fn try_from(string: &str) -> Result<Self, Self::Error> {
        Vertex::new(string)
    }
}

impl TryFrom<String> for Vertex {
    type Error = HierarchyError;

    fn try_from(string: String) -> Result<Self, Self::Error> {
        Vertex::new(string)
    }
}

impl FromStr for Vertex {
    type Err = HierarchyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Vertex::new(s)
    }
}

impl Display for Vertex {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A directed relation: `start` is the parent of `end`. As a cache key it reads "is `end`
/// reachable from `start`".
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Edge {
    pub start: Vertex,
    pub end: Vertex,
}

impl Edge {
    /// "No edge". Every mutation path treats it as a no-op.
    pub const NIL: Edge = Edge {
        start: Vertex::NIL,
        end: Vertex::NIL,
    };

    pub fn new(start: Vertex, end: Vertex) -> Self {
        Edge { start, end }
    }

    pub fn is_nil(&self) -> bool {
        *self == Edge::NIL
    }

    /// `start:end`, the separator-joined form used to build storage keys.
    pub fn key(&self) -> String {
        format!("{}{KEY_SEPARATOR}{}", self.start, self.end)
    }
}

impl Display for Edge {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} -> {}", self.start, self.end)
    }
}

/// A persisted `(node, parent)` pair as returned by an edge source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeEdge {
    pub node: Vertex,
    pub parent: Option<Vertex>,
}

impl NodeEdge {
    pub fn new(node: Vertex, parent: Option<Vertex>) -> Self {
        NodeEdge { node, parent }
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// The graph edge `parent -> node`, or [`Edge::NIL`] for a root.
    pub fn into_edge(self) -> Edge {
        match self.parent {
            Some(parent) => Edge::new(parent, self.node),
            None => Edge::NIL,
        }
    }
}
