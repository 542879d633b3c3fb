//! Movement graphs and the searches that run over them

pub mod graph;
pub mod search;

pub use graph::{build_graph, Edge, MovementGraph};
pub use search::{path_cost, reachable, shortest_distances, shortest_path};
