// treekem
// Copyright (C) 2020 The treekem authors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program. If not, see http://www.gnu.org/licenses/.

//! Index algebra over a left-balanced binary tree. Nodes are numbered
//! in-order: even indices are leaves, odd indices are parents.

use crate::messages::{LeafCount, NodeIndex};
use std::cmp::Ordering;

pub fn log2(x: usize) -> usize {
    if x == 0 {
        return 0;
    }
    let mut k = 0;
    while (x >> k) > 0 {
        k += 1
    }
    k - 1
}

/// Height of a node above the leaf level: the number of trailing ones in
/// its index.
pub fn level(index: NodeIndex) -> usize {
    let x = index.as_usize();
    if (x & 0x01) == 0 {
        return 0;
    }
    let mut k = 0;
    while ((x >> k) & 0x01) == 1 {
        k += 1;
    }
    k
}

pub fn node_width(size: LeafCount) -> usize {
    let n = size.as_usize();
    if n == 0 {
        0
    } else {
        2 * (n - 1) + 1
    }
}

pub fn root(size: LeafCount) -> NodeIndex {
    let w = node_width(size);
    NodeIndex::from((1usize << log2(w)) - 1)
}

pub fn left(index: NodeIndex) -> NodeIndex {
    let x = index.as_usize();
    let k = level(index);
    if k == 0 {
        return index;
    }
    NodeIndex::from(x ^ (0x01 << (k - 1)))
}

pub fn right(index: NodeIndex, size: LeafCount) -> NodeIndex {
    let x = index.as_usize();
    let k = level(index);
    if k == 0 {
        return index;
    }
    let mut r = x ^ (0x03 << (k - 1));
    while r >= node_width(size) {
        r = left(NodeIndex::from(r)).as_usize();
    }
    NodeIndex::from(r)
}

fn parent_step(x: usize) -> usize {
    let k = level(NodeIndex::from(x));
    let b = (x >> (k + 1)) & 0x01;
    (x | (1 << k)) ^ (b << (k + 1))
}

/// The root is its own parent (sentinel).
pub fn parent(index: NodeIndex, size: LeafCount) -> NodeIndex {
    if index == root(size) {
        return index;
    }
    let mut p = parent_step(index.as_usize());
    while p >= node_width(size) {
        p = parent_step(p)
    }
    NodeIndex::from(p)
}

pub fn sibling(index: NodeIndex, size: LeafCount) -> NodeIndex {
    let p = parent(index, size);
    match index.cmp(&p) {
        Ordering::Less => right(p, size),
        Ordering::Greater => left(p),
        Ordering::Equal => p,
    }
}

// Ordered from leaf to root
// Excludes the node itself, includes the root
pub fn direct_path(index: NodeIndex, size: LeafCount) -> Vec<NodeIndex> {
    let r = root(size);
    if index == r {
        return vec![];
    }
    let mut d = vec![];
    let mut p = parent(index, size);
    loop {
        d.push(p);
        if p == r {
            break;
        }
        p = parent(p, size);
    }
    d
}

// Ordered from leaf to root
// The sibling of the node, then the sibling of each direct-path node below
// the root; same length as the direct path
pub fn copath(index: NodeIndex, size: LeafCount) -> Vec<NodeIndex> {
    if index == root(size) {
        return vec![];
    }
    let mut d = vec![index];
    let mut dp = direct_path(index, size);
    dp.pop();
    d.append(&mut dp);
    d.iter().map(|&i| sibling(i, size)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn n(i: usize) -> NodeIndex {
        NodeIndex::from(i)
    }

    #[test]
    fn test_node_width_and_root() {
        assert_eq!(node_width(LeafCount::from(0usize)), 0);
        let widths = [1usize, 3, 5, 7, 9, 11];
        let roots = [0usize, 1, 3, 3, 7, 7];
        for (i, (&w, &r)) in widths.iter().zip(roots.iter()).enumerate() {
            let size = LeafCount::from(i + 1);
            assert_eq!(node_width(size), w);
            assert_eq!(root(size), n(r));
        }
    }

    #[test]
    fn test_level() {
        assert_eq!(level(n(0)), 0);
        assert_eq!(level(n(1)), 1);
        assert_eq!(level(n(2)), 0);
        assert_eq!(level(n(3)), 2);
        assert_eq!(level(n(7)), 3);
    }

    #[test]
    fn test_children() {
        let size = LeafCount::from(4usize);
        assert_eq!(left(n(1)), n(0));
        assert_eq!(right(n(1), size), n(2));
        assert_eq!(left(n(3)), n(1));
        assert_eq!(right(n(3), size), n(5));
        assert_eq!(left(n(5)), n(4));
        assert_eq!(right(n(5), size), n(6));
        // Truncated tree: the right child of the root steps down.
        assert_eq!(right(n(3), LeafCount::from(3usize)), n(4));
    }

    #[test]
    fn test_parent_and_sibling() {
        let size = LeafCount::from(4usize);
        assert_eq!(parent(n(0), size), n(1));
        assert_eq!(parent(n(2), size), n(1));
        assert_eq!(parent(n(1), size), n(3));
        assert_eq!(parent(n(5), size), n(3));
        assert_eq!(parent(n(3), size), n(3));
        assert_eq!(sibling(n(0), size), n(2));
        assert_eq!(sibling(n(1), size), n(5));
        assert_eq!(sibling(n(3), size), n(3));

        let size = LeafCount::from(3usize);
        assert_eq!(parent(n(4), size), n(3));
        assert_eq!(sibling(n(4), size), n(1));
    }

    #[test]
    fn test_direct_path_and_copath() {
        // A single leaf is the root and has no path.
        let size = LeafCount::from(1usize);
        assert!(direct_path(n(0), size).is_empty());
        assert!(copath(n(0), size).is_empty());

        let size = LeafCount::from(2usize);
        assert_eq!(direct_path(n(0), size), vec![n(1)]);
        assert_eq!(copath(n(0), size), vec![n(2)]);

        let size = LeafCount::from(3usize);
        assert_eq!(direct_path(n(0), size), vec![n(1), n(3)]);
        assert_eq!(copath(n(0), size), vec![n(2), n(4)]);
        assert_eq!(direct_path(n(4), size), vec![n(3)]);
        assert_eq!(copath(n(4), size), vec![n(1)]);

        let size = LeafCount::from(4usize);
        assert_eq!(direct_path(n(6), size), vec![n(5), n(3)]);
        assert_eq!(copath(n(6), size), vec![n(4), n(1)]);

        for leaf in 0..4 {
            let index = n(2 * leaf);
            assert_eq!(
                direct_path(index, size).len(),
                copath(index, size).len()
            );
        }
    }
}
