//! The dependency graph (component F).
//!
//! Item *X* has predecessor *Y* iff some requirement of *X* is satisfied by
//! some provide of *Y* — derived from the validated path map (E), not from
//! item identity alone. Uses an arena/index representation: items are
//! referred to by position in the caller's slice, predecessor sets as
//! `HashSet<usize>`, with a reverse index kept alongside so emission never
//! goes quadratic (§9).

use std::collections::{HashSet, VecDeque};

use crate::error::CompilerError;
use crate::validator::ValidatedMap;

/// The predecessor relation over a set of additive items, ready for
/// topological emission.
#[derive(Debug)]
pub struct DependencyGraph {
    count: usize,
    item_to_predecessors: Vec<HashSet<usize>>,
    predecessor_to_items: Vec<Vec<usize>>,
}

impl DependencyGraph {
    /// Derive the predecessor relation for `count` additive items (indices
    /// `0..count`, matching the slice passed to [`crate::validator::validate`])
    /// from the validated path map.
    ///
    /// `requirements_by_item` gives each item's own `requires()` again (by
    /// index) so the graph doesn't need to re-walk the whole map per item.
    pub fn build(count: usize, requirements_by_item: &[Vec<imgc_schema::Requirement>], map: &ValidatedMap) -> Self {
        let mut item_to_predecessors: Vec<HashSet<usize>> = vec![HashSet::new(); count];
        let mut predecessor_to_items: Vec<Vec<usize>> = vec![Vec::new(); count];

        for (idx, reqs) in requirements_by_item.iter().enumerate() {
            for req in reqs {
                let Some(claims) = map.get(req.path().as_str()) else {
                    continue;
                };
                let Some(claim) = &claims.provide else {
                    continue;
                };
                let Some(owner) = claim.owner else {
                    continue; // satisfied by the seed (parent-layer) state: no edge
                };
                if owner == idx {
                    continue;
                }
                if item_to_predecessors[idx].insert(owner) {
                    predecessor_to_items[owner].push(idx);
                }
            }
        }

        Self {
            count,
            item_to_predecessors,
            predecessor_to_items,
        }
    }

    /// Emit a topological order over the items, per `gen_dependency_order_items`.
    ///
    /// Tie-breaking among ready items is by ascending index — any
    /// deterministic rule is valid per the design notes; this one is chosen
    /// because it is simple and keeps test fixtures reproducible.
    ///
    /// # Errors
    /// Returns [`CompilerError::Cycle`] if any item still has unresolved
    /// predecessors once the ready set is exhausted.
    pub fn topological_order(mut self, from_targets: &[String]) -> Result<Vec<usize>, CompilerError> {
        let mut ready: VecDeque<usize> = (0..self.count)
            .filter(|&i| self.item_to_predecessors[i].is_empty())
            .collect();
        let mut order = Vec::with_capacity(self.count);
        let mut emitted = vec![false; self.count];

        while let Some(item) = ready.pop_front() {
            order.push(item);
            emitted[item] = true;
            for &dependent in &self.predecessor_to_items[item] {
                self.item_to_predecessors[dependent].remove(&item);
                if self.item_to_predecessors[dependent].is_empty() {
                    let pos = ready
                        .iter()
                        .position(|&r| r > dependent)
                        .unwrap_or(ready.len());
                    ready.insert(pos, dependent);
                }
            }
        }

        if order.len() != self.count {
            let remaining: Vec<String> = (0..self.count)
                .filter(|&i| !emitted[i])
                .map(|i| from_targets[i].clone())
                .collect();
            return Err(CompilerError::Cycle { targets: remaining });
        }

        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validator::{validate, AdditiveClaims, SeedProvide};
    use imgc_schema::{normalize_image_relative, Provide, Requirement};

    fn p(s: &str) -> imgc_schema::NormalizedPath {
        normalize_image_relative(s).unwrap()
    }

    #[test]
    fn linear_chain_emits_in_dependency_order() {
        // root("") -> a/b/c (mkdir) -> {a/d/e (mkdir), a/b/c/F (copy)}
        // a/d/e -> a/d/e/G (copy)
        let items = vec![
            AdditiveClaims {
                from_target: "mkdir1".to_string(),
                provides: vec![Provide::Directory(p("a/b/c"))],
                requires: vec![Requirement::Directory(p(""))],
            },
            AdditiveClaims {
                from_target: "mkdir2".to_string(),
                provides: vec![Provide::Directory(p("a/d/e"))],
                requires: vec![Requirement::Directory(p("a/b/c"))],
            },
            AdditiveClaims {
                from_target: "copy1".to_string(),
                provides: vec![Provide::File(p("a/b/c/F"))],
                requires: vec![Requirement::Directory(p("a/b/c"))],
            },
            AdditiveClaims {
                from_target: "copy2".to_string(),
                provides: vec![Provide::File(p("a/d/e/G"))],
                requires: vec![Requirement::Directory(p("a/d/e"))],
            },
        ];
        let seed = vec![SeedProvide {
            provide: Provide::Directory(p("")),
        }];
        let requires: Vec<_> = items.iter().map(|i| i.requires.clone()).collect();
        let map = validate(&items, &seed).unwrap();
        let from_targets: Vec<String> = items.iter().map(|i| i.from_target.clone()).collect();
        let graph = DependencyGraph::build(items.len(), &requires, &map);
        let order = graph.topological_order(&from_targets).unwrap();

        let pos = |name: &str| order.iter().position(|&i| from_targets[i] == name).unwrap();
        assert!(pos("mkdir1") < pos("mkdir2"));
        assert!(pos("mkdir1") < pos("copy1"));
        assert!(pos("mkdir2") < pos("copy2"));
    }

    #[test]
    fn cycle_is_detected() {
        // a requires b's path, b requires a's path: neither is ever ready.
        let items = vec![
            AdditiveClaims {
                from_target: "a".to_string(),
                provides: vec![Provide::Directory(p("a"))],
                requires: vec![Requirement::Directory(p("b"))],
            },
            AdditiveClaims {
                from_target: "b".to_string(),
                provides: vec![Provide::Directory(p("b"))],
                requires: vec![Requirement::Directory(p("a"))],
            },
        ];
        let requires: Vec<_> = items.iter().map(|i| i.requires.clone()).collect();
        let map = validate(&items, &[]).unwrap();
        let from_targets: Vec<String> = items.iter().map(|i| i.from_target.clone()).collect();
        let graph = DependencyGraph::build(items.len(), &requires, &map);
        let err = graph.topological_order(&from_targets).unwrap_err();
        assert!(matches!(err, CompilerError::Cycle { .. }));
    }
}
