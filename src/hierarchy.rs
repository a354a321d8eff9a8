//! Domain-level queries over the organizational hierarchy.
//!
//! [`HierarchyTree`] is what the authorization layer talks to. It adds one policy on top of
//! [`DynamicGraph`]: the [`Vertex::NIL`] sentinel, claimed as an ancestor, stands for unrestricted
//! (administrative) authority and is an ancestor of everything.

use std::sync::Arc;

use uuid::Uuid;

use crate::{error::HierarchyError, graph::DynamicGraph, vertex::Vertex};

#[derive(Debug, Clone)]
pub struct HierarchyTree {
    graph: Arc<DynamicGraph>,
}

impl HierarchyTree {
    pub fn new(graph: Arc<DynamicGraph>) -> Self {
        HierarchyTree { graph }
    }

    pub fn graph(&self) -> &Arc<DynamicGraph> {
        &self.graph
    }

    /// Whether `ancestor` is `node` or one of its (transitive) parents. Always true for the
    /// sentinel, without consulting the graph.
    pub fn is_ancestor(&self, ancestor: &Vertex, node: &Vertex) -> Result<bool, HierarchyError> {
        if ancestor.is_nil() {
            return Ok(true);
        }
        self.graph.has_path(ancestor, node)
    }

    /// `node` and all of its descendants.
    pub fn get_nested_childs(&self, node: &Vertex) -> Result<Vec<Vertex>, HierarchyError> {
        Ok(self.graph.get_all_nested_children(node))
    }

    /// [`HierarchyTree::get_nested_childs`] as domain identifiers, with the sentinel left out.
    pub fn nested_child_ids(&self, node: &Vertex) -> Result<Vec<Uuid>, HierarchyError> {
        self.get_nested_childs(node)?
            .iter()
            .filter(|vertex| !vertex.is_nil())
            .map(Vertex::to_uuid)
            .collect()
    }

    /// True when no vertex lists `node` as a direct child.
    pub fn is_source_vertex(&self, node: &Vertex) -> Result<bool, HierarchyError> {
        Ok(self.graph.get_parents(node).is_empty())
    }
}
