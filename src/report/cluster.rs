// src/report/cluster.rs
//! Single-linkage clustering of a distance matrix.
//!
//! Pairs are merged in order of increasing distance; a union-find tracks
//! the clusters and each root keeps its members in leaf order, so the final
//! concatenation puts close clients next to each other (the order a heatmap
//! with a dendrogram would use).

use crate::similarity::Comparison;

pub struct UnionFind {
    parent: Vec<usize>,
    rank: Vec<usize>,
}

// Indices passed to find/union are < n by construction.
#[allow(clippy::indexing_slicing)]
impl UnionFind {
    #[must_use]
    pub fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
            rank: vec![0; n],
        }
    }

    pub fn find(&mut self, x: usize) -> usize {
        let mut root = x;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        let mut node = x;
        while self.parent[node] != root {
            let next = self.parent[node];
            self.parent[node] = root;
            node = next;
        }
        root
    }

    /// Joins the sets of `x` and `y`; returns the surviving root, or `None`
    /// if they were already joined.
    pub fn union(&mut self, x: usize, y: usize) -> Option<usize> {
        let rx = self.find(x);
        let ry = self.find(y);
        if rx == ry {
            return None;
        }
        let root = match self.rank[rx].cmp(&self.rank[ry]) {
            std::cmp::Ordering::Less => {
                self.parent[rx] = ry;
                ry
            }
            std::cmp::Ordering::Greater => {
                self.parent[ry] = rx;
                rx
            }
            std::cmp::Ordering::Equal => {
                self.parent[ry] = rx;
                self.rank[rx] += 1;
                rx
            }
        };
        Some(root)
    }
}

/// One agglomeration step.
#[derive(Debug, Clone, PartialEq)]
pub struct Merge {
    /// Smallest leaf index of each side.
    pub left: usize,
    pub right: usize,
    pub distance: f64,
    /// Leaves in the merged cluster.
    pub size: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Linkage {
    /// Leaf order for rendering.
    pub order: Vec<usize>,
    pub merges: Vec<Merge>,
}

/// Single linkage over cells in `[0, 1]`; sentinel cells never link.
#[must_use]
#[allow(clippy::indexing_slicing)]
pub fn single_linkage(cmp: &Comparison) -> Linkage {
    let n = cmp.n;
    let mut edges: Vec<(f64, usize, usize)> = (0..n)
        .flat_map(|i| (i + 1..n).map(move |j| (i, j)))
        .filter_map(|(i, j)| {
            cmp.get(i, j)
                .filter(|d| (0.0..=1.0).contains(d))
                .map(|d| (d, i, j))
        })
        .collect();
    edges.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)).then(a.2.cmp(&b.2)));

    let mut uf = UnionFind::new(n);
    let mut members: Vec<Vec<usize>> = (0..n).map(|i| vec![i]).collect();
    let mut merges = Vec::new();
    for (distance, i, j) in edges {
        let (ri, rj) = (uf.find(i), uf.find(j));
        let Some(root) = uf.union(ri, rj) else {
            continue;
        };
        let (first, second) = if members[ri][0] <= members[rj][0] {
            (ri, rj)
        } else {
            (rj, ri)
        };
        let left = members[first][0];
        let right = members[second].iter().min().copied().unwrap_or(left);
        let mut joined = std::mem::take(&mut members[first]);
        joined.extend(std::mem::take(&mut members[second]));
        merges.push(Merge {
            left,
            right,
            distance,
            size: joined.len(),
        });
        members[root] = joined;
    }

    let mut clusters: Vec<Vec<usize>> = members.into_iter().filter(|m| !m.is_empty()).collect();
    clusters.sort_by_key(|m| m.iter().min().copied().unwrap_or(usize::MAX));
    Linkage {
        order: clusters.into_iter().flatten().collect(),
        merges,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matrix(n: usize, cells: &[(usize, usize, f64)]) -> Comparison {
        let mut c = Comparison::new(n, "f", "m", None);
        for i in 0..n {
            c.set_pair(i, i, 0.0);
        }
        for &(i, j, d) in cells {
            c.set_pair(i, j, d);
        }
        c
    }

    #[test]
    fn union_find_joins_once() {
        let mut uf = UnionFind::new(4);
        assert!(uf.union(0, 1).is_some());
        assert!(uf.union(1, 0).is_none());
        uf.union(2, 3);
        assert_ne!(uf.find(0), uf.find(2));
        uf.union(1, 3);
        assert_eq!(uf.find(0), uf.find(2));
    }

    #[test]
    fn close_pairs_end_up_adjacent() {
        // 0-2 and 1-3 are close; the two groups are far apart.
        let c = matrix(
            4,
            &[
                (0, 2, 0.1),
                (1, 3, 0.2),
                (0, 1, 0.9),
                (0, 3, 0.9),
                (1, 2, 0.9),
                (2, 3, 0.8),
            ],
        );
        let linkage = single_linkage(&c);
        assert_eq!(linkage.order, vec![0, 2, 1, 3]);
        assert_eq!(linkage.merges.len(), 3);
        assert!((linkage.merges[2].distance - 0.8).abs() < 1e-12);
        assert_eq!(linkage.merges[2].size, 4);
    }

    #[test]
    fn sentinels_leave_singletons() {
        let c = matrix(3, &[(0, 1, 0.3), (0, 2, 4.0), (1, 2, 2.0)]);
        let linkage = single_linkage(&c);
        assert_eq!(linkage.order, vec![0, 1, 2]);
        assert_eq!(linkage.merges.len(), 1);
    }
}
