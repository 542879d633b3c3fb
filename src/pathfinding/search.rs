//! Dijkstra reachability and A* shortest paths over a movement graph
//!
//! Both searches keep their bookkeeping local to the call, so a graph can
//! be queried any number of times.
//!
//! Ties: the open set pops the lowest cost first and, among equal costs,
//! the lowest coordinate (`HexCoord` ordering). A tile's predecessor is only
//! replaced on a strictly cheaper route, so the first route found at a given
//! cost is the one kept.

use std::cmp::Reverse;
use std::collections::{BTreeSet, BinaryHeap};

use ahash::{AHashMap, AHashSet};
use ordered_float::OrderedFloat;

use crate::map::hex::HexCoord;
use crate::pathfinding::graph::MovementGraph;

type OpenEntry = Reverse<(OrderedFloat<f32>, HexCoord)>;

/// Cost of the cheapest route from `source` to every vertex within `max_cost`
pub fn shortest_distances(
    graph: &MovementGraph,
    source: HexCoord,
    max_cost: f32,
) -> AHashMap<HexCoord, f32> {
    let mut dist: AHashMap<HexCoord, f32> = AHashMap::new();
    if !graph.contains(source) {
        return dist;
    }

    let mut settled: AHashSet<HexCoord> = AHashSet::new();
    let mut open: BinaryHeap<OpenEntry> = BinaryHeap::new();
    dist.insert(source, 0.0);
    open.push(Reverse((OrderedFloat(0.0), source)));

    while let Some(Reverse((OrderedFloat(cost), current))) = open.pop() {
        if !settled.insert(current) {
            continue;
        }

        for edge in graph.edges_from(current) {
            let tentative = cost + edge.cost;
            if tentative > max_cost {
                continue;
            }
            let known = dist.get(&edge.to).copied().unwrap_or(f32::INFINITY);
            if tentative < known {
                dist.insert(edge.to, tentative);
                open.push(Reverse((OrderedFloat(tentative), edge.to)));
            }
        }
    }

    dist
}

/// Every vertex whose cheapest route from `source` costs at most `max_cost`
///
/// `source` is included at cost 0 whenever it is a vertex of the graph.
pub fn reachable(graph: &MovementGraph, source: HexCoord, max_cost: f32) -> BTreeSet<HexCoord> {
    shortest_distances(graph, source, max_cost)
        .into_keys()
        .collect()
}

/// Cheapest route from `source` to `destination`, both inclusive
///
/// Returns an empty path if either endpoint is missing from the graph or
/// the destination cannot be reached.
pub fn shortest_path(
    graph: &MovementGraph,
    source: HexCoord,
    destination: HexCoord,
) -> Vec<HexCoord> {
    if !graph.contains(source) || !graph.contains(destination) {
        return Vec::new();
    }
    if source == destination {
        return vec![source];
    }

    // Every step costs at least the cheapest edge and a route needs at least
    // `distance` steps, so this never overestimates
    let scale = graph.min_edge_cost();
    let heuristic = |coord: HexCoord| coord.distance(&destination) as f32 * scale;

    let mut came_from: AHashMap<HexCoord, HexCoord> = AHashMap::new();
    let mut g_scores: AHashMap<HexCoord, f32> = AHashMap::new();
    let mut closed: AHashSet<HexCoord> = AHashSet::new();
    let mut open: BinaryHeap<OpenEntry> = BinaryHeap::new();

    g_scores.insert(source, 0.0);
    open.push(Reverse((OrderedFloat(heuristic(source)), source)));

    while let Some(Reverse((_, current))) = open.pop() {
        if current == destination {
            return reconstruct_path(&came_from, current);
        }
        if !closed.insert(current) {
            continue;
        }

        let current_g = g_scores.get(&current).copied().unwrap_or(f32::INFINITY);

        for edge in graph.edges_from(current) {
            if closed.contains(&edge.to) {
                continue;
            }
            let tentative_g = current_g + edge.cost;
            let neighbor_g = g_scores.get(&edge.to).copied().unwrap_or(f32::INFINITY);

            if tentative_g < neighbor_g {
                came_from.insert(edge.to, current);
                g_scores.insert(edge.to, tentative_g);
                open.push(Reverse((
                    OrderedFloat(tentative_g + heuristic(edge.to)),
                    edge.to,
                )));
            }
        }
    }

    Vec::new()
}

/// Reconstruct path from came_from map
fn reconstruct_path(
    came_from: &AHashMap<HexCoord, HexCoord>,
    mut current: HexCoord,
) -> Vec<HexCoord> {
    let mut path = vec![current];
    while let Some(&prev) = came_from.get(&current) {
        path.push(prev);
        current = prev;
    }
    path.reverse();
    path
}

/// Sum of edge costs along a path; `None` if some step is not an edge
pub fn path_cost(graph: &MovementGraph, path: &[HexCoord]) -> Option<f32> {
    path.windows(2)
        .map(|step| graph.edge_cost(step[0], step[1]))
        .sum()
}
