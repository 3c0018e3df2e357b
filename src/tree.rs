//! Tree building for hierarchical tables
//!
//! A flat list of rows, each optionally naming a parent id, is reshaped into a
//! forest. The forest is rebuilt from scratch whenever the source list changes.

use std::collections::HashMap;

use serde::Serialize;
use tracing::warn;

use crate::{
    row::{Hierarchical, Row},
    table::ExpandState,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TreeNode<R> {
    #[serde(flatten)]
    pub row: R,
    pub children: Vec<TreeNode<R>>,
}

impl<R> TreeNode<R> {
    /// Number of nodes in this subtree, including itself.
    pub fn size(&self) -> usize {
        self.iter().count()
    }

    /// Depth-first pre-order walk.
    pub fn iter(&self) -> Iter<'_, R> {
        Iter { stack: vec![self] }
    }
}

// Chains can be arbitrarily deep, so children are released from a flat stack
// instead of by the recursive drop glue.
impl<R> Drop for TreeNode<R> {
    fn drop(&mut self) {
        let mut stack = std::mem::take(&mut self.children);
        while let Some(mut node) = stack.pop() {
            stack.append(&mut node.children);
        }
    }
}

pub struct Iter<'a, R> {
    stack: Vec<&'a TreeNode<R>>,
}

impl<'a, R> Iterator for Iter<'a, R> {
    type Item = &'a TreeNode<R>;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}

pub fn forest_size<R>(forest: &[TreeNode<R>]) -> usize {
    forest.iter().map(TreeNode::size).sum()
}

/// Marks every row reachable from `root` and appends them in pre-order.
fn walk(root: usize, children: &[Vec<usize>], visited: &mut [bool], order: &mut Vec<usize>) {
    let mut stack = vec![root];
    visited[root] = true;
    while let Some(index) = stack.pop() {
        order.push(index);
        for &child in children[index].iter().rev() {
            if !visited[child] {
                visited[child] = true;
                stack.push(child);
            }
        }
    }
}

/// Build a forest from rows that reference their parent by id.
///
/// Roots and siblings keep their input order. A row whose parent id is missing
/// from the list, or equal to its own id, becomes a root. Rows that can only be
/// reached through a parent cycle are promoted to roots in input order, so every
/// input row appears exactly once.
pub fn build_forest<R: Hierarchical>(rows: Vec<R>) -> Vec<TreeNode<R>> {
    let parents: Vec<Option<usize>> = {
        let mut index = HashMap::with_capacity(rows.len());
        for (i, row) in rows.iter().enumerate() {
            index.entry(row.id()).or_insert(i);
        }
        rows.iter()
            .enumerate()
            .map(|(i, row)| {
                let parent = row.parent_id().filter(|parent| *parent != row.id())?;
                index.get(parent).copied().filter(|&p| p != i)
            })
            .collect()
    };

    let mut children = vec![Vec::new(); rows.len()];
    let mut roots = Vec::new();
    for (i, parent) in parents.iter().enumerate() {
        match parent {
            Some(parent) => children[*parent].push(i),
            None => roots.push(i),
        }
    }

    let mut visited = vec![false; rows.len()];
    let mut order = Vec::with_capacity(rows.len());
    for &root in &roots {
        walk(root, &children, &mut visited, &mut order);
    }
    let mut is_root = vec![false; rows.len()];
    for &root in &roots {
        is_root[root] = true;
    }
    for i in 0..rows.len() {
        if !visited[i] {
            warn!(id = %rows[i].id(), "row is part of a parent cycle, placing it at the root");
            is_root[i] = true;
            roots.push(i);
            walk(i, &children, &mut visited, &mut order);
        }
    }

    // Children come after their parent in `order`, so walking it backwards
    // finishes every subtree before the node that owns it.
    let mut slots = rows.into_iter().map(Some).collect::<Vec<_>>();
    let mut built: Vec<Option<TreeNode<R>>> = (0..slots.len()).map(|_| None).collect();
    for &index in order.iter().rev() {
        let Some(row) = slots[index].take() else {
            continue;
        };
        let children = children[index]
            .iter()
            .filter(|&&child| !is_root[child])
            .filter_map(|&child| built[child].take())
            .collect();
        built[index] = Some(TreeNode { row, children });
    }
    roots
        .into_iter()
        .filter_map(|root| built[root].take())
        .collect()
}

/// A tree row as it appears on screen.
#[derive(Debug, Clone, PartialEq)]
pub struct VisibleNode<'a, R> {
    pub depth: usize,
    pub row: &'a R,
    pub has_children: bool,
}

/// Rows to display, descending only into expanded nodes.
pub fn flatten_visible<'a, R: Row>(
    forest: &'a [TreeNode<R>],
    expanded: &ExpandState,
) -> Vec<VisibleNode<'a, R>> {
    let mut out = Vec::new();
    let mut stack = forest
        .iter()
        .rev()
        .map(|root| (root, 0))
        .collect::<Vec<_>>();
    while let Some((node, depth)) = stack.pop() {
        out.push(VisibleNode {
            depth,
            row: &node.row,
            has_children: !node.children.is_empty(),
        });
        if expanded.is_expanded(node.row.id()) {
            stack.extend(node.children.iter().rev().map(|child| (child, depth + 1)));
        }
    }
    out
}
