//! Point-to-point shortest path search
//!
//! Label-setting Dijkstra over profile travel times. Both endpoints lie part
//! way along an edge, so the search is seeded with the two partial edges
//! leaving the source point and finishes through the two partial edges
//! entering the target point.

use std::cmp::{Ordering, Reverse};
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::Instant;

use priority_queue::PriorityQueue;
use rustc_hash::FxHashMap;
use tracing::debug;
use wayfarer_common::{Error, Result};

use crate::graph::{EdgeId, GraphStore, NodeId};
use crate::profile::ProfileTable;
use crate::resolve::RouterPoint;

/// Settlements between deadline checks
const DEADLINE_CHECK_INTERVAL: u64 = 64;

/// Shared flag a caller flips to abort running queries
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, AtomicOrdering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(AtomicOrdering::Relaxed)
    }
}

#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    pub deadline: Option<Instant>,
    pub cancel: Option<CancelToken>,
}

impl QueryOptions {
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }
}

/// Part of an edge travelled by a path, as fractions in the edge's own
/// direction
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathLeg {
    pub edge: EdgeId,
    pub from_frac: f64,
    pub to_frac: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Path {
    pub legs: Vec<PathLeg>,
    /// Total travel time in seconds
    pub cost_s: f64,
}

/// Queue priority: cost first, lower node id on ties
#[derive(Debug, Clone, Copy, PartialEq)]
struct SearchKey {
    cost: f64,
    node: NodeId,
}

impl Eq for SearchKey {}

impl Ord for SearchKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.cost
            .total_cmp(&other.cost)
            .then_with(|| self.node.cmp(&other.node))
    }
}

impl PartialOrd for SearchKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Debug, Clone, Copy)]
enum Parent {
    /// Reached directly from the source point
    Seed(PathLeg),
    Edge(EdgeId),
}

/// Where the best path so far ends
#[derive(Debug, Clone, Copy)]
enum Finish {
    /// Both points on one segment, no node in between
    Direct(PathLeg),
    Via { node: NodeId, leg: PathLeg },
}

/// Cheapest path from `from` to `to` for the profile behind `table`.
///
/// `Ok(None)` means the target is unreachable.
pub fn shortest_path(
    graph: &GraphStore,
    table: &ProfileTable,
    from: &RouterPoint,
    to: &RouterPoint,
    options: &QueryOptions,
) -> Result<Option<Path>> {
    let weight = |edge: EdgeId| -> Option<f64> {
        let cost = graph.edge_cost(table, edge);
        cost.traversable.then_some(cost.weight_s)
    };

    // Every direction a point's segment can be travelled, with the point's
    // offset along that direction
    let directions = |p: &RouterPoint| -> Vec<(EdgeId, f64, f64)> {
        let mut out = Vec::with_capacity(2);
        if let Some(w) = weight(p.edge) {
            out.push((p.edge, p.offset, w));
        }
        if let Some(twin) = graph.twin(p.edge) {
            if let Some(w) = weight(twin) {
                out.push((twin, 1.0 - p.offset, w));
            }
        }
        out
    };

    let source_dirs = directions(from);
    let target_dirs = directions(to);

    let mut best = f64::INFINITY;
    let mut finish: Option<Finish> = None;

    // Same segment, travelling towards the target
    let same_slot = graph.edge(from.edge).geometry.slot == graph.edge(to.edge).geometry.slot;
    if same_slot {
        for &(edge, s_off, w) in &source_dirs {
            let Some(&(_, t_off, _)) = target_dirs.iter().find(|(e, _, _)| *e == edge) else {
                continue;
            };
            if s_off <= t_off {
                let cost = (t_off - s_off) * w;
                if cost < best {
                    best = cost;
                    finish = Some(Finish::Direct(PathLeg {
                        edge,
                        from_frac: s_off,
                        to_frac: t_off,
                    }));
                }
            }
        }
    }

    // Target entries: reach the edge's tail, then travel up to the point
    let targets: Vec<(NodeId, f64, PathLeg)> = target_dirs
        .iter()
        .map(|&(edge, t_off, w)| {
            (
                graph.edge(edge).from,
                t_off * w,
                PathLeg {
                    edge,
                    from_frac: 0.0,
                    to_frac: t_off,
                },
            )
        })
        .collect();

    let mut dist: FxHashMap<NodeId, f64> = FxHashMap::default();
    let mut parent: FxHashMap<NodeId, Parent> = FxHashMap::default();
    let mut queue: PriorityQueue<NodeId, Reverse<SearchKey>> = PriorityQueue::new();

    for &(edge, s_off, w) in &source_dirs {
        let head = graph.edge(edge).to;
        let cost = (1.0 - s_off) * w;
        if cost < dist.get(&head).copied().unwrap_or(f64::INFINITY) {
            dist.insert(head, cost);
            parent.insert(
                head,
                Parent::Seed(PathLeg {
                    edge,
                    from_frac: s_off,
                    to_frac: 1.0,
                }),
            );
            queue.push_increase(head, Reverse(SearchKey { cost, node: head }));
        }
    }

    let mut settled: u64 = 0;
    while let Some((node, Reverse(key))) = queue.pop() {
        if let Some(token) = &options.cancel {
            if token.is_cancelled() {
                return Err(Error::Cancelled);
            }
        }
        if let Some(deadline) = options.deadline {
            if settled % DEADLINE_CHECK_INTERVAL == 0 && Instant::now() >= deadline {
                return Err(Error::DeadlineExceeded);
            }
        }
        settled += 1;

        if key.cost >= best {
            break;
        }

        for &(target_node, extra, leg) in &targets {
            if target_node == node && key.cost + extra < best {
                best = key.cost + extra;
                finish = Some(Finish::Via { node, leg });
            }
        }

        for (edge_id, edge) in graph.out_edges(node) {
            let Some(w) = weight(edge_id) else {
                continue;
            };
            let next = key.cost + w;
            if next < dist.get(&edge.to).copied().unwrap_or(f64::INFINITY) {
                dist.insert(edge.to, next);
                parent.insert(edge.to, Parent::Edge(edge_id));
                queue.push_increase(edge.to, Reverse(SearchKey { cost: next, node: edge.to }));
            }
        }
    }

    debug!(
        profile = %table.profile(),
        settled,
        reached = dist.len(),
        cost_s = best,
        "search finished"
    );

    let Some(finish) = finish else {
        return Ok(None);
    };

    let legs = match finish {
        Finish::Direct(leg) => vec![leg],
        Finish::Via { node, leg } => {
            let mut legs = vec![leg];
            let mut current = node;
            // Parents form a tree rooted at the seeds; bounded by node count
            for _ in 0..=graph.node_count() {
                match parent.get(&current) {
                    Some(Parent::Edge(e)) => {
                        legs.push(PathLeg {
                            edge: *e,
                            from_frac: 0.0,
                            to_frac: 1.0,
                        });
                        current = graph.edge(*e).from;
                    }
                    Some(Parent::Seed(seed)) => {
                        legs.push(*seed);
                        break;
                    }
                    None => break,
                }
            }
            legs.reverse();
            legs
        }
    };

    Ok(Some(Path { legs, cost_s: best }))
}
