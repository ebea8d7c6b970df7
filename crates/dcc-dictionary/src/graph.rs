//! File-type dependency graph.
//!
//! Nodes are [`FileType`] indices; edges run from a child type to each type
//! it references. The graph is stored as adjacency lists indexed by file
//! type, so it can be copied, serialized and inspected freely.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use dcc_model::{FileType, RelationKind};

/// A child → parent edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub parent: FileType,
    pub kind: RelationKind,
    /// Every parent tuple must be referenced through this edge.
    pub bidirectional: bool,
}

impl Edge {
    /// Surjectivity is only enforced for mandatory relations.
    pub fn is_surjective(&self) -> bool {
        self.bidirectional && self.kind == RelationKind::Mandatory
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyGraph {
    parents: Vec<Vec<Edge>>,
    children: Vec<Vec<FileType>>,
}

impl DependencyGraph {
    pub fn with_nodes(count: usize) -> Self {
        Self {
            parents: vec![Vec::new(); count],
            children: vec![Vec::new(); count],
        }
    }

    pub fn node_count(&self) -> usize {
        self.parents.len()
    }

    pub fn add_edge(&mut self, child: FileType, edge: Edge) {
        self.parents[child.index()].push(edge);
        let children = &mut self.children[edge.parent.index()];
        if let Err(position) = children.binary_search(&child) {
            children.insert(position, child);
        }
    }

    /// Outgoing edges of `child`, in declaration order.
    pub fn edges(&self, child: FileType) -> &[Edge] {
        &self.parents[child.index()]
    }

    /// Distinct parent types of `child`, in declaration order.
    pub fn parents(&self, child: FileType) -> Vec<FileType> {
        let mut parents: Vec<FileType> = Vec::new();
        for edge in self.edges(child) {
            if !parents.contains(&edge.parent) {
                parents.push(edge.parent);
            }
        }
        parents
    }

    /// Distinct child types of `parent`, in index order.
    pub fn children(&self, parent: FileType) -> &[FileType] {
        &self.children[parent.index()]
    }

    pub fn has_children(&self, parent: FileType) -> bool {
        !self.children[parent.index()].is_empty()
    }

    /// Parents `child` must cover completely.
    pub fn surjective_parents(&self, child: FileType) -> Vec<FileType> {
        let mut parents: Vec<FileType> = Vec::new();
        for edge in self.edges(child).iter().filter(|edge| edge.is_surjective()) {
            if !parents.contains(&edge.parent) {
                parents.push(edge.parent);
            }
        }
        parents
    }

    /// Children whose rows must cover every tuple of `parent`.
    pub fn surjective_children(&self, parent: FileType) -> Vec<FileType> {
        self.children(parent)
            .iter()
            .copied()
            .filter(|child| self.surjective_parents(*child).contains(&parent))
            .collect()
    }

    /// Kahn's algorithm: repeatedly emit a node whose parents have all been
    /// emitted. Ties are broken by index, so the order is deterministic.
    ///
    /// On failure returns one dependency cycle, listed parent first and
    /// closed by repeating its first node.
    pub fn topological_order(&self) -> Result<Vec<FileType>, Vec<FileType>> {
        let count = self.node_count();
        let mut in_degree: Vec<usize> = (0..count)
            .map(|index| self.parents(file_type(index)).len())
            .collect();

        let mut queue: VecDeque<FileType> = (0..count)
            .filter(|&index| in_degree[index] == 0)
            .map(file_type)
            .collect();
        let mut order = Vec::with_capacity(count);
        while let Some(node) = queue.pop_front() {
            order.push(node);
            for &child in self.children(node) {
                let degree = &mut in_degree[child.index()];
                *degree -= 1;
                if *degree == 0 {
                    queue.push_back(child);
                }
            }
        }

        if order.len() == count {
            return Ok(order);
        }
        Err(self.find_cycle(&in_degree))
    }

    /// Walk parent edges among unprocessed nodes until one repeats.
    ///
    /// Every unprocessed node still has an unprocessed parent, so the walk
    /// cannot dead-end.
    fn find_cycle(&self, in_degree: &[usize]) -> Vec<FileType> {
        let Some(start) = (0..in_degree.len()).find(|&index| in_degree[index] > 0) else {
            return Vec::new();
        };
        let mut path = vec![file_type(start)];
        loop {
            let current = path[path.len() - 1];
            let Some(next) = self
                .parents(current)
                .into_iter()
                .find(|parent| in_degree[parent.index()] > 0)
            else {
                return path;
            };
            if let Some(position) = path.iter().position(|node| *node == next) {
                let mut cycle = path.split_off(position);
                cycle.push(next);
                cycle.reverse();
                return cycle;
            }
            path.push(next);
        }
    }
}

fn file_type(index: usize) -> FileType {
    FileType::from_index(index as u16)
}
