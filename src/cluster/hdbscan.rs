//! Hierarchical DBSCAN.
//!
//! Pipeline
//! - Core distance of every point: distance to its `min_samples`-th nearest
//!   neighbour, the point itself not counted (the `hdbscan` package
//!   convention; scikit-learn's `HDBSCAN` counts the point itself).
//! - Minimum spanning tree of the mutual-reachability graph
//!   `max(core(a), core(b), |a − b|)`, built with Prim's algorithm.
//! - Single-linkage hierarchy from the sorted MST edges.
//! - Condensed tree: splits where both sides keep at least
//!   `min_cluster_size` points create new clusters; smaller sides are points
//!   falling out of the parent at `λ = 1 / distance`.
//! - Cluster selection by excess of mass (or leaves), with an optional
//!   `cluster_selection_epsilon` merge of clusters born below that scale.
//!
//! Memory is linear in the number of points. Core distances use an R-tree;
//! the dense Prim step is quadratic in time, which stays cheap for the
//! per-scene cross sections this runs on.

use super::labels::relabel_by_first_appearance;
use super::DensityClusterer;
use crate::types::NOISE;
use log::debug;
use rstar::{Point, RTree};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeSet, VecDeque};

/// Distances below this are treated as this value so that `λ` stays finite
/// for duplicate points.
const MIN_DISTANCE: f64 = 1e-12;

/// How flat clusters are extracted from the condensed tree.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClusterSelectionMethod {
    /// Excess of mass: keep the most persistent clusters.
    #[default]
    Eom,
    /// Keep the leaves of the cluster tree.
    Leaf,
}

/// HDBSCAN parameters (the coarse "major-group" profile by default).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Hdbscan {
    /// Smallest group of points considered a cluster.
    pub min_cluster_size: usize,
    /// Neighbour rank (point itself excluded) defining the core distance.
    pub min_samples: usize,
    /// Clusters born at a distance scale below this are merged upwards.
    pub cluster_selection_epsilon: f64,
    pub selection_method: ClusterSelectionMethod,
    /// Allow the root of the tree to be returned as the single cluster.
    pub allow_single_cluster: bool,
}

impl Default for Hdbscan {
    fn default() -> Self {
        Self {
            min_cluster_size: 20,
            min_samples: 10,
            cluster_selection_epsilon: 0.0,
            selection_method: ClusterSelectionMethod::Eom,
            allow_single_cluster: false,
        }
    }
}

impl DensityClusterer for Hdbscan {
    fn fit_predict(&self, points: &[[f64; 2]]) -> Vec<i32> {
        self.cluster_points(points)
    }
}

impl Hdbscan {
    /// Cluster points of any dimension supported by `rstar`.
    pub fn cluster_points<P>(&self, points: &[P]) -> Vec<i32>
    where
        P: Point<Scalar = f64>,
    {
        let n = points.len();
        let min_cluster_size = self.min_cluster_size.max(2);
        if n < min_cluster_size {
            debug!(
                "Hdbscan: {} points below min_cluster_size {}, all noise",
                n, min_cluster_size
            );
            return vec![NOISE; n];
        }
        // Rank counts the query point, which is its own first neighbour.
        let core = core_distances(points, self.min_samples.clamp(1, n - 1) + 1);
        let mst = mutual_reachability_mst(points, &core);
        let hierarchy = single_linkage(n, mst);
        let tree = CondensedTree::build(&hierarchy, n, min_cluster_size);
        let selected = self.select_clusters(&tree);
        debug!(
            "Hdbscan: n={} condensed_clusters={} selected={}",
            n,
            tree.cluster_count(),
            selected.len()
        );
        let mut labels = self.label_points(&tree, &selected);
        relabel_by_first_appearance(&mut labels);
        labels
    }

    fn select_clusters(&self, tree: &CondensedTree) -> BTreeSet<usize> {
        let root = tree.root();
        let eps = self.cluster_selection_epsilon;
        let has_cluster_tree = tree.cluster_count() > 1;

        let base: BTreeSet<usize> = match self.selection_method {
            ClusterSelectionMethod::Eom => self.excess_of_mass(tree),
            ClusterSelectionMethod::Leaf => {
                let leaves = tree.leaf_clusters();
                if leaves.is_empty() && self.allow_single_cluster {
                    BTreeSet::from([root])
                } else {
                    leaves
                }
            }
        };

        if eps != 0.0 && has_cluster_tree {
            if self.allow_single_cluster && base.contains(&root) {
                return BTreeSet::from([root]);
            }
            return self.epsilon_search(tree, &base);
        }
        base
    }

    fn excess_of_mass(&self, tree: &CondensedTree) -> BTreeSet<usize> {
        let root = tree.root();
        let mut stability = tree.stability();
        let mut is_cluster = vec![false; tree.cluster_count()];
        let candidates: Vec<usize> = (root..root + tree.cluster_count())
            .rev()
            .filter(|&c| c != root || self.allow_single_cluster)
            .collect();
        for &c in &candidates {
            is_cluster[c - root] = true;
        }
        // Descending ids visit children before their parents.
        for &node in &candidates {
            let subtree: f64 = tree.cluster_children[node - root]
                .iter()
                .map(|&child| stability[child - root])
                .sum();
            if subtree > stability[node - root] {
                is_cluster[node - root] = false;
                stability[node - root] = subtree;
            } else {
                for sub in tree.cluster_descendants(node) {
                    if sub != node {
                        is_cluster[sub - root] = false;
                    }
                }
            }
        }
        (0..tree.cluster_count())
            .filter(|&k| is_cluster[k])
            .map(|k| k + root)
            .collect()
    }

    fn epsilon_search(&self, tree: &CondensedTree, leaves: &BTreeSet<usize>) -> BTreeSet<usize> {
        let root = tree.root();
        let eps = self.cluster_selection_epsilon;
        let mut selected = BTreeSet::new();
        let mut processed = BTreeSet::new();
        for &leaf in leaves {
            let birth_eps = 1.0 / tree.birth_lambda(leaf);
            if birth_eps >= eps {
                selected.insert(leaf);
                continue;
            }
            if processed.contains(&leaf) {
                continue;
            }
            // Walk upwards until a cluster born above the epsilon scale.
            let mut node = leaf;
            let chosen = loop {
                let parent = match tree.cluster_parent(node) {
                    Some(p) => p,
                    None => break node,
                };
                if parent == root {
                    break if self.allow_single_cluster { root } else { node };
                }
                if 1.0 / tree.birth_lambda(parent) > eps {
                    break parent;
                }
                node = parent;
            };
            selected.insert(chosen);
            for sub in tree.cluster_descendants(chosen) {
                if sub != chosen {
                    processed.insert(sub);
                }
            }
        }
        selected
    }

    fn label_points(&self, tree: &CondensedTree, selected: &BTreeSet<usize>) -> Vec<i32> {
        let root = tree.root();
        let label_of = |cluster: usize| -> Option<i32> {
            selected
                .iter()
                .position(|&c| c == cluster)
                .map(|rank| rank as i32)
        };
        let root_threshold = if self.cluster_selection_epsilon != 0.0 {
            1.0 / self.cluster_selection_epsilon
        } else {
            tree.max_lambda_from(root)
        };

        (0..tree.points)
            .map(|i| {
                let (mut cluster, lambda) = tree.point_parent[i];
                while cluster != root && !selected.contains(&cluster) {
                    cluster = match tree.cluster_parent(cluster) {
                        Some(p) => p,
                        None => root,
                    };
                }
                if cluster == root {
                    let single = selected.len() == 1 && selected.contains(&root);
                    if single && lambda >= root_threshold {
                        return 0;
                    }
                    return NOISE;
                }
                label_of(cluster).unwrap_or(NOISE)
            })
            .collect()
    }
}

fn distance<P: Point<Scalar = f64>>(a: &P, b: &P) -> f64 {
    (0..P::DIMENSIONS)
        .map(|k| {
            let d = a.nth(k) - b.nth(k);
            d * d
        })
        .sum::<f64>()
        .sqrt()
}

fn core_distances<P: Point<Scalar = f64>>(points: &[P], k: usize) -> Vec<f64> {
    let tree = RTree::bulk_load(points.to_vec());
    points
        .iter()
        .map(|p| {
            tree.nearest_neighbor_iter(p)
                .take(k)
                .last()
                .map(|q| distance(p, q))
                .unwrap_or(0.0)
        })
        .collect()
}

struct MstEdge {
    a: usize,
    b: usize,
    weight: f64,
}

fn mutual_reachability_mst<P: Point<Scalar = f64>>(points: &[P], core: &[f64]) -> Vec<MstEdge> {
    let n = points.len();
    let mut in_tree = vec![false; n];
    let mut best = vec![f64::INFINITY; n];
    let mut best_from = vec![0usize; n];
    let mut edges = Vec::with_capacity(n.saturating_sub(1));
    let mut current = 0usize;
    in_tree[current] = true;

    for _ in 1..n {
        let mut next = None;
        let mut next_weight = f64::INFINITY;
        for j in 0..n {
            if in_tree[j] {
                continue;
            }
            let d = distance(&points[current], &points[j])
                .max(core[current])
                .max(core[j]);
            if d < best[j] {
                best[j] = d;
                best_from[j] = current;
            }
            if best[j] < next_weight || next.is_none() {
                next_weight = best[j];
                next = Some(j);
            }
        }
        let Some(j) = next else {
            break;
        };
        edges.push(MstEdge {
            a: best_from[j],
            b: j,
            weight: next_weight,
        });
        in_tree[j] = true;
        current = j;
    }
    edges.sort_by(|x, y| x.weight.partial_cmp(&y.weight).unwrap_or(Ordering::Equal));
    edges
}

/// One merge of the single-linkage dendrogram. Node `n + row` is the merge
/// of `left` and `right`.
struct Merge {
    left: usize,
    right: usize,
    distance: f64,
    size: usize,
}

fn single_linkage(n: usize, edges: Vec<MstEdge>) -> Vec<Merge> {
    let total = 2 * n - 1;
    let mut parent: Vec<usize> = (0..total).collect();
    let mut size = vec![1usize; total];
    let mut next = n;
    let mut merges = Vec::with_capacity(n - 1);

    let find = |parent: &mut Vec<usize>, mut x: usize| {
        let mut root = x;
        while parent[root] != root {
            root = parent[root];
        }
        while parent[x] != root {
            let up = parent[x];
            parent[x] = root;
            x = up;
        }
        root
    };

    for edge in edges {
        let a = find(&mut parent, edge.a);
        let b = find(&mut parent, edge.b);
        let merged = size[a] + size[b];
        merges.push(Merge {
            left: a,
            right: b,
            distance: edge.weight,
            size: merged,
        });
        parent[a] = next;
        parent[b] = next;
        size[next] = merged;
        next += 1;
    }
    merges
}

/// Condensed cluster tree. Cluster ids start at `points` (the root).
struct CondensedTree {
    points: usize,
    /// `(parent cluster, λ)` at which each point fell out.
    point_parent: Vec<(usize, f64)>,
    /// Cluster-to-cluster edges: `(parent, child, λ, child size)`.
    cluster_edges: Vec<(usize, usize, f64, usize)>,
    /// Point fall-out edges: `(parent, λ)` per point, in emission order.
    point_edges: Vec<(usize, f64)>,
    cluster_children: Vec<Vec<usize>>,
    next_label: usize,
}

impl CondensedTree {
    fn build(merges: &[Merge], n: usize, min_cluster_size: usize) -> Self {
        let total = 2 * n - 1;
        let root_node = total - 1;
        let node_size = |node: usize| if node < n { 1 } else { merges[node - n].size };
        let children = |node: usize| {
            let m = &merges[node - n];
            (m.left, m.right)
        };
        let subtree_leaves = |start: usize| -> Vec<usize> {
            let mut out = Vec::new();
            let mut stack = vec![start];
            while let Some(node) = stack.pop() {
                if node < n {
                    out.push(node);
                } else {
                    let (l, r) = children(node);
                    stack.push(l);
                    stack.push(r);
                }
            }
            out
        };

        let mut relabel = vec![0usize; total];
        relabel[root_node] = n;
        let mut next_label = n + 1;
        let mut ignore = vec![false; total];
        let mut point_parent = vec![(n, 0.0); n];
        let mut point_edges = Vec::with_capacity(n);
        let mut cluster_edges = Vec::new();

        let mut queue = VecDeque::from([root_node]);
        while let Some(node) = queue.pop_front() {
            if node < n || ignore[node] {
                continue;
            }
            let (left, right) = children(node);
            queue.push_back(left);
            queue.push_back(right);

            let lambda = 1.0 / merges[node - n].distance.max(MIN_DISTANCE);
            let parent = relabel[node];
            let left_big = node_size(left) >= min_cluster_size;
            let right_big = node_size(right) >= min_cluster_size;

            let mut fall_out = |side: usize, ignore: &mut Vec<bool>| {
                for leaf in subtree_leaves(side) {
                    point_parent[leaf] = (parent, lambda);
                    point_edges.push((parent, lambda));
                }
                mark_subtree(side, n, merges, ignore);
            };

            match (left_big, right_big) {
                (true, true) => {
                    for side in [left, right] {
                        relabel[side] = next_label;
                        cluster_edges.push((parent, next_label, lambda, node_size(side)));
                        next_label += 1;
                    }
                }
                (false, false) => {
                    fall_out(left, &mut ignore);
                    fall_out(right, &mut ignore);
                }
                (false, true) => {
                    relabel[right] = parent;
                    fall_out(left, &mut ignore);
                }
                (true, false) => {
                    relabel[left] = parent;
                    fall_out(right, &mut ignore);
                }
            }
        }

        let mut cluster_children = vec![Vec::new(); next_label - n];
        for &(p, c, _, _) in &cluster_edges {
            cluster_children[p - n].push(c);
        }
        Self {
            points: n,
            point_parent,
            cluster_edges,
            point_edges,
            cluster_children,
            next_label,
        }
    }

    fn root(&self) -> usize {
        self.points
    }

    fn cluster_count(&self) -> usize {
        self.next_label - self.points
    }

    fn cluster_parent(&self, cluster: usize) -> Option<usize> {
        self.cluster_edges
            .iter()
            .find(|e| e.1 == cluster)
            .map(|e| e.0)
    }

    /// λ at which a cluster split off its parent; `0` for the root.
    fn birth_lambda(&self, cluster: usize) -> f64 {
        self.cluster_edges
            .iter()
            .find(|e| e.1 == cluster)
            .map(|e| e.2)
            .unwrap_or(0.0)
    }

    /// Largest λ of any edge leaving `cluster`.
    fn max_lambda_from(&self, cluster: usize) -> f64 {
        self.point_edges
            .iter()
            .filter(|e| e.0 == cluster)
            .map(|e| e.1)
            .chain(
                self.cluster_edges
                    .iter()
                    .filter(|e| e.0 == cluster)
                    .map(|e| e.2),
            )
            .fold(0.0, f64::max)
    }

    /// Σ (λ − λ_birth(parent)) · size over all edges leaving each cluster.
    fn stability(&self) -> Vec<f64> {
        let root = self.root();
        let mut births = vec![0.0; self.cluster_count()];
        for &(_, c, lambda, _) in &self.cluster_edges {
            births[c - root] = lambda;
        }
        let mut stability = vec![0.0; self.cluster_count()];
        for &(p, lambda) in &self.point_edges {
            stability[p - root] += lambda - births[p - root];
        }
        for &(p, _, lambda, size) in &self.cluster_edges {
            stability[p - root] += (lambda - births[p - root]) * size as f64;
        }
        stability
    }

    /// Clusters (excluding the root) without cluster children.
    fn leaf_clusters(&self) -> BTreeSet<usize> {
        let root = self.root();
        if self.cluster_count() <= 1 {
            return BTreeSet::new();
        }
        (root + 1..self.next_label)
            .filter(|&c| self.cluster_children[c - root].is_empty())
            .collect()
    }

    /// `cluster` and every cluster below it.
    fn cluster_descendants(&self, cluster: usize) -> Vec<usize> {
        let root = self.root();
        let mut out = vec![cluster];
        let mut idx = 0;
        while idx < out.len() {
            let c = out[idx];
            out.extend(self.cluster_children[c - root].iter().copied());
            idx += 1;
        }
        out
    }
}

fn mark_subtree(start: usize, n: usize, merges: &[Merge], ignore: &mut [bool]) {
    let mut stack = vec![start];
    while let Some(node) = stack.pop() {
        ignore[node] = true;
        if node >= n {
            let m = &merges[node - n];
            stack.push(m.left);
            stack.push(m.right);
        }
    }
}
