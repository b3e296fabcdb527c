//! Immutable road network
//!
//! Nodes sorted by source id, directed edges in compressed-sparse-row order
//! (grouped by tail node), polyline geometry pooled per way segment and shared
//! by the two directions of a bidirectional segment.

use crate::geo::{polyline_length, project_onto_polyline, Coordinate, FixedCoord, Projection};
use crate::profile::{Direction, EdgeCost, Profile, ProfileTable};
use crate::spatial::SpatialIndex;
use crate::tags::{TagDictionary, TagHandle};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeId(pub u32);

impl NodeId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl EdgeId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Node {
    /// Identifier in the source data
    pub source_id: i64,
    pub coord: FixedCoord,
}

/// Slot in the geometry pool; `reversed` edges read it back to front
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeometryRef {
    pub slot: u32,
    pub reversed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Edge {
    pub from: NodeId,
    pub to: NodeId,
    pub tags: TagHandle,
    pub length_m: f64,
    pub geometry: GeometryRef,
    /// Opposite direction over the same segment, if any profile can use it
    pub twin: Option<EdgeId>,
    /// Source way this segment was split from
    pub way_id: i64,
    /// No enabled profile can travel the segment the other way
    pub oneway: bool,
}

impl Edge {
    /// Travel direction relative to the source way's node order
    pub fn direction(&self) -> Direction {
        if self.geometry.reversed {
            Direction::Backward
        } else {
            Direction::Forward
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct GeometrySlot {
    pub offset: u32,
    pub len: u32,
}

/// Counters collected while building
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
pub struct BuildStats {
    pub records_seen: u64,
    pub ways_seen: u64,
    pub ways_retained: u64,
    /// Ways dropped because they reference a node missing from the input
    pub ways_dangling: u64,
    /// Ways without a routable tag or usable by no enabled profile
    pub ways_unroutable: u64,
    pub nodes: u64,
    pub edges: u64,
    pub tag_sets: u64,
}

/// A candidate edge near a query coordinate
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeMatch {
    /// Edge in the direction the geometry slot is stored
    pub edge: EdgeId,
    pub projection: Projection,
}

#[derive(Debug)]
pub struct GraphStore {
    pub(crate) nodes: Vec<Node>,
    pub(crate) first_out: Vec<u32>,
    pub(crate) edges: Vec<Edge>,
    pub(crate) slots: Vec<GeometrySlot>,
    pub(crate) points: Vec<FixedCoord>,
    pub(crate) tags: TagDictionary,
    pub(crate) tables: Vec<ProfileTable>,
    pub(crate) spatial: SpatialIndex,
    pub(crate) stats: BuildStats,
}

impl GraphStore {
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn node_coordinate(&self, id: NodeId) -> Coordinate {
        self.nodes[id.index()].coord.to_coordinate()
    }

    pub fn node_by_source_id(&self, source_id: i64) -> Option<NodeId> {
        self.nodes
            .binary_search_by_key(&source_id, |n| n.source_id)
            .ok()
            .map(|i| NodeId(i as u32))
    }

    /// Outgoing edges of `node`, sorted by head node
    pub fn edges_from(&self, node: NodeId) -> &[Edge] {
        let range = self.out_range(node);
        &self.edges[range.start as usize..range.end as usize]
    }

    /// Outgoing edges of `node` with their ids
    pub fn out_edges(&self, node: NodeId) -> impl Iterator<Item = (EdgeId, &Edge)> + '_ {
        self.out_range(node).map(move |i| (EdgeId(i), &self.edges[i as usize]))
    }

    fn out_range(&self, node: NodeId) -> std::ops::Range<u32> {
        let i = node.index();
        self.first_out[i]..self.first_out[i + 1]
    }

    pub fn edge(&self, id: EdgeId) -> &Edge {
        &self.edges[id.index()]
    }

    pub fn twin(&self, id: EdgeId) -> Option<EdgeId> {
        self.edges[id.index()].twin
    }

    /// Polyline of an edge in its own travel direction, both endpoints
    /// included
    pub fn edge_geometry(&self, id: EdgeId) -> Vec<Coordinate> {
        let geometry = self.edges[id.index()].geometry;
        let mut coords: Vec<Coordinate> = self
            .slot_points(geometry.slot)
            .iter()
            .map(|p| p.to_coordinate())
            .collect();
        if geometry.reversed {
            coords.reverse();
        }
        coords
    }

    pub(crate) fn slot_points(&self, slot: u32) -> &[FixedCoord] {
        let s = self.slots[slot as usize];
        &self.points[s.offset as usize..(s.offset + s.len) as usize]
    }

    pub fn tags(&self) -> &TagDictionary {
        &self.tags
    }

    /// Profiles the graph was built for
    pub fn profiles(&self) -> Vec<Profile> {
        self.tables.iter().map(|t| t.profile()).collect()
    }

    pub fn profile_table(&self, profile: Profile) -> Option<&ProfileTable> {
        self.tables.iter().find(|t| t.profile() == profile)
    }

    /// Cost of traversing an entire edge
    pub fn edge_cost(&self, table: &ProfileTable, id: EdgeId) -> EdgeCost {
        let edge = &self.edges[id.index()];
        table.cost(edge.tags, edge.length_m, edge.direction())
    }

    pub fn stats(&self) -> &BuildStats {
        &self.stats
    }

    /// Edges within `radius_m` of `coordinate` with their perpendicular
    /// projections, ordered by (distance, edge id)
    pub fn nearest_edges(&self, coordinate: Coordinate, radius_m: f64) -> Vec<EdgeMatch> {
        let mut matches: Vec<EdgeMatch> = self
            .spatial
            .candidates(coordinate, radius_m)
            .into_iter()
            .filter_map(|edge| {
                let geometry = self.edge_geometry(edge);
                let projection = project_onto_polyline(coordinate, &geometry)?;
                (projection.distance_m <= radius_m).then_some(EdgeMatch { edge, projection })
            })
            .collect();

        matches.sort_by(|a, b| {
            a.projection
                .distance_m
                .total_cmp(&b.projection.distance_m)
                .then_with(|| a.edge.cmp(&b.edge))
        });
        matches
    }

    /// Length recomputed from the stored geometry
    pub fn measured_length(&self, id: EdgeId) -> f64 {
        polyline_length(&self.edge_geometry(id))
    }
}
