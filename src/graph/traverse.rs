//! Guarded breadth-first traversal
//!
//! Shared by the ego-subgraph extractor and the variant resolver. The input
//! data may contain cycles; the visited set is the only thing that stops a
//! walk.

use std::collections::{HashSet, VecDeque};
use std::hash::Hash;

/// Breadth-first walk from `starts`.
///
/// Returns every reached item with its depth, in discovery order. Start items
/// are depth 0. Items deeper than `max_depth` are not visited and their
/// neighbours are never asked for. Each item is expanded at most once.
pub fn guarded_bfs<T, I, F>(starts: I, max_depth: Option<usize>, mut neighbors: F) -> Vec<(T, usize)>
where
    T: Clone + Eq + Hash,
    I: IntoIterator<Item = T>,
    F: FnMut(&T) -> Vec<T>,
{
    let mut visited = HashSet::new();
    let mut queue = VecDeque::new();
    let mut result = Vec::new();

    for start in starts {
        if visited.insert(start.clone()) {
            queue.push_back((start, 0usize));
        }
    }

    while let Some((item, depth)) = queue.pop_front() {
        let expand = max_depth.map_or(true, |max| depth < max);
        if expand {
            for next in neighbors(&item) {
                if visited.insert(next.clone()) {
                    queue.push_back((next, depth + 1));
                }
            }
        }
        result.push((item, depth));
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn chain() -> HashMap<&'static str, Vec<&'static str>> {
        HashMap::from([
            ("a", vec!["b"]),
            ("b", vec!["c", "a"]),
            ("c", vec!["d"]),
            ("d", vec!["a"]),
        ])
    }

    #[test]
    fn test_cycle_terminates() {
        let graph = chain();
        let reached = guarded_bfs(["a"], None, |n| graph.get(n).cloned().unwrap_or_default());
        let ids: Vec<_> = reached.iter().map(|(n, _)| *n).collect();
        assert_eq!(ids, vec!["a", "b", "c", "d"]);
        assert_eq!(reached[3], ("d", 3));
    }

    #[test]
    fn test_depth_limit() {
        let graph = chain();
        let reached = guarded_bfs(["a"], Some(1), |n| graph.get(n).cloned().unwrap_or_default());
        assert_eq!(reached, vec![("a", 0), ("b", 1)]);
    }

    #[test]
    fn test_duplicate_starts_visited_once() {
        let reached = guarded_bfs(["x", "x", "y"], Some(0), |_| vec!["z"]);
        assert_eq!(reached, vec![("x", 0), ("y", 0)]);
    }
}
