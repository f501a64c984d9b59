//! Bounded transitive closure over parent/child relations.
//!
//! Tags, studios and groups form trees (tags and groups may in practice
//! contain cycles). The resolver walks them breadth-first, one edge lookup
//! per level for all roots together, and keeps a separate closure for
//! every root so callers can ask "matches under each root" as well as
//! "matches under any root".

use std::collections::{BTreeMap, BTreeSet, HashMap};

use marquee_core::Depth;

use crate::clause::{id_args, placeholders};
use crate::config::{HierarchyRelation, PlaceholderStyle};
use crate::error::QueryError;
use crate::executor::{Executor, rebind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Follow child -> parent edges.
    Ancestors,
    /// Follow parent -> child edges.
    Descendants,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HierarchyEdge {
    pub parent: i64,
    pub child: i64,
}

impl HierarchyEdge {
    pub fn new(parent: i64, child: i64) -> Self {
        Self { parent, child }
    }
}

/// Supplies the edges leaving a set of nodes.
pub trait EdgeSource {
    /// `(from, to)` for every edge leaving a node in `frontier` in
    /// `direction`.
    fn neighbours(
        &self,
        direction: Direction,
        frontier: &[i64],
    ) -> Result<Vec<(i64, i64)>, QueryError>;
}

/// Preloaded edges.
#[derive(Debug, Clone, Default)]
pub struct EdgeList(Vec<HierarchyEdge>);

impl EdgeList {
    pub fn new(edges: Vec<HierarchyEdge>) -> Self {
        Self(edges)
    }
}

impl EdgeSource for EdgeList {
    fn neighbours(
        &self,
        direction: Direction,
        frontier: &[i64],
    ) -> Result<Vec<(i64, i64)>, QueryError> {
        let wanted: BTreeSet<i64> = frontier.iter().copied().collect();
        Ok(self
            .0
            .iter()
            .map(|e| match direction {
                Direction::Descendants => (e.parent, e.child),
                Direction::Ancestors => (e.child, e.parent),
            })
            .filter(|(from, _)| wanted.contains(from))
            .collect())
    }
}

/// Edges read level by level from a relation table.
pub struct SqlEdges<'a> {
    executor: &'a dyn Executor,
    relation: &'a HierarchyRelation,
    style: PlaceholderStyle,
}

impl<'a> SqlEdges<'a> {
    pub fn new(
        executor: &'a dyn Executor,
        relation: &'a HierarchyRelation,
        style: PlaceholderStyle,
    ) -> Self {
        Self {
            executor,
            relation,
            style,
        }
    }
}

impl EdgeSource for SqlEdges<'_> {
    fn neighbours(
        &self,
        direction: Direction,
        frontier: &[i64],
    ) -> Result<Vec<(i64, i64)>, QueryError> {
        if frontier.is_empty() {
            return Ok(Vec::new());
        }
        let (from, to) = match direction {
            Direction::Descendants => (&self.relation.parent, &self.relation.child),
            Direction::Ancestors => (&self.relation.child, &self.relation.parent),
        };
        let sql = format!(
            "SELECT {from}, {to} FROM {} WHERE {from} IN ({}) AND {to} IS NOT NULL",
            self.relation.table,
            placeholders(frontier.len())
        );
        self.executor
            .query_pairs(&rebind(&sql, self.style), &id_args(frontier))
    }
}

// ── Closure ─────────────────────────────────────────────────────────────────

/// Resolved ids, kept per requested root.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Closure {
    per_root: BTreeMap<i64, BTreeSet<i64>>,
}

impl Closure {
    /// Each root mapped to itself.
    pub fn exact(roots: &[i64]) -> Self {
        Self {
            per_root: roots.iter().map(|&r| (r, BTreeSet::from([r]))).collect(),
        }
    }

    /// Every resolved id, ascending.
    pub fn ids(&self) -> Vec<i64> {
        let all: BTreeSet<i64> = self.per_root.values().flatten().copied().collect();
        all.into_iter().collect()
    }

    pub fn for_root(&self, root: i64) -> Option<&BTreeSet<i64>> {
        self.per_root.get(&root)
    }

    pub fn roots(&self) -> impl Iterator<Item = i64> + '_ {
        self.per_root.keys().copied()
    }

    /// `(root, ids)` pairs in root order.
    pub fn iter(&self) -> impl Iterator<Item = (i64, &BTreeSet<i64>)> + '_ {
        self.per_root.iter().map(|(root, ids)| (*root, ids))
    }

    /// No traversal happened: each root resolved to itself only.
    pub fn is_trivial(&self) -> bool {
        self.per_root
            .iter()
            .all(|(root, ids)| ids.len() == 1 && ids.contains(root))
    }

    pub fn is_empty(&self) -> bool {
        self.per_root.values().all(BTreeSet::is_empty)
    }
}

// ── Resolver ────────────────────────────────────────────────────────────────

pub struct HierarchyResolver<'a, S: EdgeSource + ?Sized> {
    source: &'a S,
}

impl<'a, S: EdgeSource + ?Sized> HierarchyResolver<'a, S> {
    pub fn new(source: &'a S) -> Self {
        Self { source }
    }

    /// Each root plus every node within `depth` hops of it.
    pub fn resolve(
        &self,
        direction: Direction,
        roots: &[i64],
        depth: Depth,
    ) -> Result<Closure, QueryError> {
        let mut per_root: BTreeMap<i64, BTreeSet<i64>> = BTreeMap::new();
        let mut frontiers: BTreeMap<i64, Vec<i64>> = BTreeMap::new();
        for &root in roots {
            per_root.entry(root).or_default().insert(root);
            frontiers.insert(root, vec![root]);
        }

        let mut hops = 0;
        while depth.allows(hops) {
            let level: BTreeSet<i64> = frontiers.values().flatten().copied().collect();
            if level.is_empty() {
                break;
            }
            let level: Vec<i64> = level.into_iter().collect();

            let mut adjacency: HashMap<i64, Vec<i64>> = HashMap::new();
            for (from, to) in self.source.neighbours(direction, &level)? {
                adjacency.entry(from).or_default().push(to);
            }

            for (root, frontier) in frontiers.iter_mut() {
                let Some(seen) = per_root.get_mut(root) else {
                    continue;
                };
                let mut next = Vec::new();
                for node in frontier.iter() {
                    for &to in adjacency.get(node).into_iter().flatten() {
                        if seen.insert(to) {
                            next.push(to);
                        }
                    }
                }
                *frontier = next;
            }
            hops += 1;
        }

        let closure = Closure { per_root };
        log::debug!(
            "resolved {} root(s) {direction:?} to {} id(s) in {hops} hop(s)",
            roots.len(),
            closure.ids().len()
        );
        Ok(closure)
    }

    /// Nodes reachable from each root in 1 to `depth + 1` hops. A root is
    /// only included when a cycle leads back to it.
    pub fn strict_closure(
        &self,
        direction: Direction,
        roots: &[i64],
        depth: Depth,
    ) -> Result<Closure, QueryError> {
        let first_hop = self.source.neighbours(direction, roots)?;
        let starts: Vec<i64> = first_hop
            .iter()
            .map(|(_, to)| *to)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let inner = self.resolve(direction, &starts, depth)?;

        let mut per_root: BTreeMap<i64, BTreeSet<i64>> =
            roots.iter().map(|&root| (root, BTreeSet::new())).collect();
        for (from, to) in first_hop {
            if let (Some(ids), Some(reached)) = (per_root.get_mut(&from), inner.for_root(to)) {
                ids.extend(reached);
            }
        }
        Ok(Closure { per_root })
    }
}
