//! Property-based tests for graph compilation
//!
//! Random DAGs are generated by only drawing edges from a lower to a higher
//! node index. Adding one edge in the other direction along an existing path
//! must always be rejected as a cycle.

use kestrel_core::graph::{compile, lane_for, Edge, GraphError, TaskNode};
use proptest::prelude::*;
use std::collections::BTreeSet;

fn task_name(i: usize) -> String {
    format!("t{}", i)
}

/// A node count and a set of forward edges `(from, to)` with `from < to`.
fn arb_dag() -> impl Strategy<Value = (usize, BTreeSet<(usize, usize)>)> {
    (2usize..12).prop_flat_map(|n| {
        let pairs = proptest::collection::btree_set(
            (0..n, 0..n).prop_filter_map("forward only", |(a, b)| {
                if a < b {
                    Some((a, b))
                } else {
                    None
                }
            }),
            0..(n * 2),
        );
        (Just(n), pairs)
    })
}

fn build(n: usize, edges: &BTreeSet<(usize, usize)>) -> (Vec<TaskNode>, Vec<Edge>) {
    let nodes = (0..n).map(|i| TaskNode::new(task_name(i))).collect();
    let edges = edges
        .iter()
        .map(|(a, b)| Edge::new(task_name(*a), task_name(*b)))
        .collect();
    (nodes, edges)
}

proptest! {
    #[test]
    fn test_acyclic_graphs_compile_in_dependency_order((n, edges) in arb_dag()) {
        let (nodes, edge_list) = build(n, &edges);
        let graph = compile(nodes, edge_list).expect("forward edges never form a cycle");

        let order = graph.topological_order();
        prop_assert_eq!(order.len(), n);
        let position = |name: &str| order.iter().position(|o| *o == name);
        for (a, b) in &edges {
            let from = position(&task_name(*a));
            let to = position(&task_name(*b));
            prop_assert!(from < to, "t{} must precede t{} in {:?}", a, b, order);
        }
    }

    #[test]
    fn test_back_edge_is_reported_as_cycle((n, mut edges) in arb_dag()) {
        // Chain every node so that the back edge closes a cycle.
        for i in 0..n - 1 {
            edges.insert((i, i + 1));
        }
        let (nodes, mut edge_list) = build(n, &edges);
        edge_list.push(Edge::new(task_name(n - 1), task_name(0)));

        match compile(nodes, edge_list) {
            Err(GraphError::CycleDetected { cycle }) => {
                prop_assert!(cycle.len() >= 3, "{:?}", cycle);
                prop_assert_eq!(cycle.first(), cycle.last());
                for name in &cycle {
                    prop_assert!(name.starts_with('t'), "unexpected node {}", name);
                }
            }
            other => prop_assert!(false, "expected cycle, got {:?}", other.map(|g| g.fingerprint())),
        }
    }

    #[test]
    fn test_fingerprint_is_stable_across_compiles((n, edges) in arb_dag()) {
        let (nodes, edge_list) = build(n, &edges);
        let first = compile(nodes, edge_list).expect("acyclic");
        let (nodes, edge_list) = build(n, &edges);
        let second = compile(nodes, edge_list).expect("acyclic");
        prop_assert_eq!(first.fingerprint(), second.fingerprint());
    }

    #[test]
    fn test_lanes_rotate_through_every_bucket(buckets in 1u32..16, start in 0u64..1_000) {
        let lanes: BTreeSet<u32> = (start..start + u64::from(buckets))
            .map(|seq| lane_for(seq, buckets))
            .collect();
        prop_assert_eq!(lanes.len() as u32, buckets);
        prop_assert!(lanes.iter().all(|lane| *lane < buckets));
    }
}
