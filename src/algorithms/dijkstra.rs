//! Centralised shortest paths over the current link set.
//!
//! The routing table converges towards these distances; the simulator uses
//! them as the reference when verifying a converged table.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BinaryHeap};

use crate::types::{Cost, RouterId};

pub type Adjacency = BTreeMap<RouterId, Vec<(RouterId, Cost)>>;

#[derive(Debug, Clone, Default)]
pub struct ShortestPaths {
    pub source: RouterId,
    pub distances: BTreeMap<RouterId, Cost>,
    previous: BTreeMap<RouterId, RouterId>,
}

impl ShortestPaths {
    pub fn distance(&self, destination: RouterId) -> Option<Cost> {
        self.distances.get(&destination).copied()
    }

    /// Router sequence from the source to `destination`, both included.
    pub fn path_to(&self, destination: RouterId) -> Option<Vec<RouterId>> {
        if !self.distances.contains_key(&destination) {
            return None;
        }

        let mut path = vec![destination];
        let mut current = destination;
        while let Some(&prev) = self.previous.get(&current) {
            path.push(prev);
            current = prev;
        }
        path.reverse();
        Some(path)
    }
}

#[derive(Debug, PartialEq, Eq)]
struct State {
    cost: Cost,
    router: RouterId,
}

impl Ord for State {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering for min-heap
        other
            .cost
            .cmp(&self.cost)
            .then_with(|| other.router.cmp(&self.router))
    }
}

impl PartialOrd for State {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

pub fn shortest_paths(adjacency: &Adjacency, source: RouterId) -> ShortestPaths {
    let mut distances: BTreeMap<RouterId, Cost> = BTreeMap::new();
    let mut previous: BTreeMap<RouterId, RouterId> = BTreeMap::new();
    let mut heap = BinaryHeap::new();

    distances.insert(source, 0);
    heap.push(State {
        cost: 0,
        router: source,
    });

    while let Some(State { cost, router }) = heap.pop() {
        // Skip if we've already found a better path
        if cost > distances.get(&router).copied().unwrap_or(Cost::MAX) {
            continue;
        }

        for &(neighbour, link_cost) in adjacency.get(&router).into_iter().flatten() {
            let new_cost = cost.saturating_add(link_cost);

            if new_cost < distances.get(&neighbour).copied().unwrap_or(Cost::MAX) {
                distances.insert(neighbour, new_cost);
                previous.insert(neighbour, router);
                heap.push(State {
                    cost: new_cost,
                    router: neighbour,
                });
            }
        }
    }

    distances.remove(&source);
    ShortestPaths {
        source,
        distances,
        previous,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn undirected(edges: &[(RouterId, RouterId, Cost)]) -> Adjacency {
        let mut adjacency = Adjacency::new();
        for &(a, b, w) in edges {
            adjacency.entry(a).or_default().push((b, w));
            adjacency.entry(b).or_default().push((a, w));
        }
        adjacency
    }

    #[test]
    fn finds_cheaper_multi_hop_path() {
        let adjacency = undirected(&[(1, 2, 2), (2, 3, 3), (1, 3, 10)]);

        let paths = shortest_paths(&adjacency, 1);

        assert_eq!(paths.distance(3), Some(5));
        assert_eq!(paths.path_to(3), Some(vec![1, 2, 3]));
        assert_eq!(paths.distance(1), None);
    }

    #[test]
    fn unreachable_routers_have_no_distance() {
        let adjacency = undirected(&[(1, 2, 1), (3, 4, 1)]);

        let paths = shortest_paths(&adjacency, 1);

        assert_eq!(paths.distance(2), Some(1));
        assert_eq!(paths.distance(4), None);
        assert_eq!(paths.path_to(4), None);
    }
}
