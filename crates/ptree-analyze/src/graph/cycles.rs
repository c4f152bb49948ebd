//! Cycle detection over `contains` edges.
//!
//! A well-formed product tree has no cycles. Two complementary views are
//! offered:
//!
//! - [`detect_cycles`]: concrete cycle paths found by a depth-first walk
//!   with a recursion stack. Each back-edge to a node on the current stack
//!   yields one path, `[start, ..., last, start]`.
//! - [`cycle_components`]: strongly connected components with more than one
//!   member (or a self-loop), via Tarjan's algorithm. Every node that sits
//!   on any cycle appears in exactly one component.

#![allow(clippy::module_name_repetitions)]

use std::collections::HashSet;

use petgraph::algo::tarjan_scc;
use petgraph::graph::NodeIndex;

use crate::graph::build::TreeGraph;

/// Find cycle paths by iterative DFS.
///
/// Every unvisited node (in snapshot order) starts a walk. A node is marked
/// visited when first reached and is never a walk root again. When an edge
/// leads to a node on the current recursion stack, the stack slice from that
/// node is recorded as a cycle and the edge is not followed. Terminates on
/// any finite graph.
#[must_use]
pub fn detect_cycles(graph: &TreeGraph) -> Vec<Vec<String>> {
    let mut visited: HashSet<NodeIndex> = HashSet::new();
    let mut on_stack: HashSet<NodeIndex> = HashSet::new();
    let mut cycles = Vec::new();

    for start in graph.indices() {
        if visited.contains(&start) {
            continue;
        }
        // Frames are (node, children, next child position).
        let mut stack: Vec<(NodeIndex, Vec<NodeIndex>, usize)> = Vec::new();
        visited.insert(start);
        on_stack.insert(start);
        stack.push((start, graph.children(start), 0));

        while let Some((node, children, cursor)) = stack.last_mut() {
            let Some(&next) = children.get(*cursor) else {
                on_stack.remove(node);
                stack.pop();
                continue;
            };
            *cursor += 1;

            if on_stack.contains(&next) {
                let from = stack.iter().position(|(n, _, _)| *n == next).unwrap_or(0);
                let mut path: Vec<String> = stack[from..]
                    .iter()
                    .map(|(n, _, _)| graph.node_id(*n).to_string())
                    .collect();
                path.push(graph.node_id(next).to_string());
                cycles.push(path);
            } else if visited.insert(next) {
                on_stack.insert(next);
                let grandchildren = graph.children(next);
                stack.push((next, grandchildren, 0));
            }
        }
    }

    if !cycles.is_empty() {
        tracing::warn!(count = cycles.len(), "cycles detected in product tree");
    }
    cycles
}

/// Nodes involved in cycles, grouped by strongly connected component.
///
/// Each group is sorted; groups are sorted by their first member.
#[must_use]
pub fn cycle_components(graph: &TreeGraph) -> Vec<Vec<String>> {
    let g = &graph.graph;
    let mut components: Vec<Vec<String>> = tarjan_scc(g)
        .into_iter()
        .filter(|component| {
            component.len() > 1
                || component
                    .first()
                    .is_some_and(|node| g.find_edge(*node, *node).is_some())
        })
        .map(|component| {
            let mut ids: Vec<String> = component
                .into_iter()
                .map(|idx| graph.node_id(idx).to_string())
                .collect();
            ids.sort_unstable();
            ids
        })
        .collect();
    components.sort_unstable();
    components
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::build::tests::snapshot;

    fn graph(ids: &[&str], edges: &[(&str, &str)]) -> TreeGraph {
        TreeGraph::from_snapshot(&snapshot(ids, edges))
    }

    #[test]
    fn forest_has_no_cycles() {
        let g = graph(&["a", "b", "c", "d"], &[("a", "b"), ("a", "c"), ("c", "d")]);
        assert!(detect_cycles(&g).is_empty());
        assert!(cycle_components(&g).is_empty());
    }

    #[test]
    fn three_node_cycle_reported_once() {
        let g = graph(&["a", "b", "c"], &[("a", "b"), ("b", "c"), ("c", "a")]);
        let cycles = detect_cycles(&g);
        assert_eq!(cycles, vec![vec!["a", "b", "c", "a"]]);
        assert_eq!(cycle_components(&g), vec![vec!["a", "b", "c"]]);
    }

    #[test]
    fn self_loop_is_a_cycle() {
        let g = graph(&["a", "b"], &[("a", "b"), ("b", "b")]);
        assert_eq!(detect_cycles(&g), vec![vec!["b", "b"]]);
        assert_eq!(cycle_components(&g), vec![vec!["b"]]);
    }

    #[test]
    fn cycle_reached_from_a_root_starts_at_reentry_node() {
        let g = graph(
            &["r", "x", "y", "z"],
            &[("r", "x"), ("x", "y"), ("y", "z"), ("z", "x")],
        );
        assert_eq!(detect_cycles(&g), vec![vec!["x", "y", "z", "x"]]);
    }

    #[test]
    fn diamond_is_not_a_cycle() {
        let g = graph(
            &["a", "b", "c", "d"],
            &[("a", "b"), ("a", "c"), ("b", "d"), ("c", "d")],
        );
        assert!(detect_cycles(&g).is_empty());
    }

    #[test]
    fn two_disjoint_cycles() {
        let g = graph(
            &["a", "b", "c", "d"],
            &[("a", "b"), ("b", "a"), ("c", "d"), ("d", "c")],
        );
        assert_eq!(
            detect_cycles(&g),
            vec![vec!["a", "b", "a"], vec!["c", "d", "c"]]
        );
        assert_eq!(cycle_components(&g).len(), 2);
    }

    #[test]
    fn deep_chain_does_not_overflow() {
        let ids: Vec<String> = (0..20_000).map(|i| format!("n{i}")).collect();
        let id_refs: Vec<&str> = ids.iter().map(String::as_str).collect();
        let mut edges: Vec<(&str, &str)> = id_refs.windows(2).map(|w| (w[0], w[1])).collect();
        edges.push((id_refs[id_refs.len() - 1], id_refs[0]));
        let g = graph(&id_refs, &edges);
        let cycles = detect_cycles(&g);
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].len(), 20_001);
    }
}
