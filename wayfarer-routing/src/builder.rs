//! Network builder
//!
//! Turns a tagged record stream into a [`GraphStore`]:
//!
//! 1. Filter ways to the routable ones (`highway=*` or `route=ferry`, at
//!    least two refs, usable by some enabled profile)
//! 2. Collect node coordinates, in one or two passes over the source
//! 3. Drop ways with dangling node references
//! 4. Split ways at decision nodes, emit directed edges per the enabled
//!    profiles' oneway semantics, and lay them out in CSR order

use rayon::prelude::*;
use tracing::{debug, info, warn};
use wayfarer_common::BuildError;

use crate::config::{BuildStrategy, EngineConfig};
use crate::geo::{polyline_length, Coordinate, FixedCoord};
use crate::graph::{BuildStats, Edge, EdgeId, GeometryRef, GeometrySlot, GraphStore, Node, NodeId};
use crate::profile::{Profile, ProfileTable, TagLookup};
use crate::records::{Record, RecordSource, WayRecord};
use crate::spatial::{SegmentEntry, SpatialIndex};
use crate::tags::{TagDictionary, TagHandle};

const NOT_A_NODE: u32 = u32::MAX;

/// `count` as a stored 32-bit id, staying clear of [`NOT_A_NODE`]
fn to_id(count: usize, what: &'static str) -> Result<u32, BuildError> {
    u32::try_from(count)
        .ok()
        .filter(|&id| id < NOT_A_NODE)
        .ok_or(BuildError::TooLarge { what, count })
}

pub struct NetworkBuilder {
    profiles: Vec<Profile>,
    strategy: BuildStrategy,
}

/// One way between two decision nodes
struct Segment {
    from: NodeId,
    to: NodeId,
    slot: u32,
    tags: TagHandle,
    way_id: i64,
    forward: bool,
    backward: bool,
}

impl NetworkBuilder {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            profiles: config.enabled_profiles(),
            strategy: config.build.strategy,
        }
    }

    pub fn build(&self, source: &mut dyn RecordSource) -> Result<GraphStore, BuildError> {
        if self.profiles.is_empty() {
            return Err(BuildError::NoProfiles);
        }

        let mut stats = BuildStats::default();

        let (ways, nodes) = match self.strategy {
            BuildStrategy::TwoPass => self.read_two_pass(source, &mut stats)?,
            BuildStrategy::Buffered => self.read_buffered(source, &mut stats)?,
        };
        info!(
            records = stats.records_seen,
            ways_seen = stats.ways_seen,
            ways_kept = ways.len(),
            nodes = nodes.len(),
            strategy = ?self.strategy,
            "read map data"
        );

        let ways = drop_dangling(ways, &nodes, &mut stats);
        if stats.ways_dangling > 0 {
            warn!(
                dropped = stats.ways_dangling,
                "dropped ways referencing unknown nodes"
            );
        }
        stats.ways_retained = ways.len() as u64;

        let graph = self.assemble(&ways, &nodes, stats)?;
        info!(
            nodes = graph.stats.nodes,
            edges = graph.stats.edges,
            tag_sets = graph.stats.tag_sets,
            "network built"
        );
        Ok(graph)
    }

    /// Pass 1 keeps routable ways, pass 2 only the nodes they reference
    fn read_two_pass(
        &self,
        source: &mut dyn RecordSource,
        stats: &mut BuildStats,
    ) -> Result<(Vec<WayRecord>, Vec<(i64, FixedCoord)>), BuildError> {
        let mut ways = Vec::new();
        source.read(&mut |record| {
            stats.records_seen += 1;
            if let Record::Way(way) = record {
                self.admit_way(way, &mut ways, stats);
            }
        })?;

        let mut needed: Vec<i64> = ways.iter().flat_map(|w| w.refs.iter().copied()).collect();
        needed.par_sort_unstable();
        needed.dedup();
        debug!(needed = needed.len(), "pass 1 complete");

        let mut nodes = Vec::with_capacity(needed.len());
        source.read(&mut |record| {
            if let Record::Node(node) = record {
                if needed.binary_search(&node.id).is_ok() {
                    push_node(&mut nodes, node.id, node.lat, node.lon);
                }
            }
        })?;

        Ok((ways, sort_nodes(nodes)))
    }

    fn read_buffered(
        &self,
        source: &mut dyn RecordSource,
        stats: &mut BuildStats,
    ) -> Result<(Vec<WayRecord>, Vec<(i64, FixedCoord)>), BuildError> {
        let mut ways = Vec::new();
        let mut nodes = Vec::new();
        source.read(&mut |record| {
            stats.records_seen += 1;
            match record {
                Record::Node(node) => push_node(&mut nodes, node.id, node.lat, node.lon),
                Record::Way(way) => self.admit_way(way, &mut ways, stats),
                Record::Relation(_) => {}
            }
        })?;
        Ok((ways, sort_nodes(nodes)))
    }

    fn admit_way(&self, mut way: WayRecord, ways: &mut Vec<WayRecord>, stats: &mut BuildStats) {
        stats.ways_seen += 1;
        way.refs.dedup();
        if way.refs.len() >= 2 && self.is_routable(&way) {
            ways.push(way);
        } else {
            stats.ways_unroutable += 1;
        }
    }

    fn is_routable(&self, way: &WayRecord) -> bool {
        let tags = TagLookup::raw(&way.tags);
        if !tags.has("highway") && tags.get_str("route") != Some("ferry") {
            return false;
        }
        self.profiles
            .iter()
            .any(|p| p.process_way(&tags).is_traversable())
    }

    fn assemble(
        &self,
        ways: &[WayRecord],
        nodes: &[(i64, FixedCoord)],
        mut stats: BuildStats,
    ) -> Result<GraphStore, BuildError> {
        let node_pos = |id: i64| nodes.binary_search_by_key(&id, |&(nid, _)| nid).ok();

        // Decision nodes: way endpoints and nodes shared by several refs
        let mut ref_count = vec![0u32; nodes.len()];
        let mut is_endpoint = vec![false; nodes.len()];
        for way in ways {
            for &r in &way.refs {
                if let Some(i) = node_pos(r) {
                    ref_count[i] = ref_count[i].saturating_add(1);
                }
            }
            for r in [way.refs[0], way.refs[way.refs.len() - 1]] {
                if let Some(i) = node_pos(r) {
                    is_endpoint[i] = true;
                }
            }
        }

        // Node ids follow ascending source ids
        let mut node_ids = vec![NOT_A_NODE; nodes.len()];
        let mut graph_nodes = Vec::new();
        for (i, &(source_id, coord)) in nodes.iter().enumerate() {
            if is_endpoint[i] || ref_count[i] > 1 {
                node_ids[i] = to_id(graph_nodes.len(), "graph nodes")?;
                graph_nodes.push(Node { source_id, coord });
            }
        }

        let mut tags = TagDictionary::new();
        let way_tags: Vec<TagHandle> = ways
            .iter()
            .map(|w| tags.intern(w.tags.iter().map(|(k, v)| (k.as_str(), v.as_str()))))
            .collect();
        let tables: Vec<ProfileTable> = self
            .profiles
            .iter()
            .map(|&p| ProfileTable::build(p, &tags))
            .collect();

        // Split ways into segments and pool their geometry
        let mut slots = Vec::new();
        let mut points = Vec::new();
        let mut segments = Vec::new();
        for (way, &handle) in ways.iter().zip(&way_tags) {
            let forward = tables.iter().any(|t| t.attrs(handle).access_fwd);
            let backward = tables.iter().any(|t| t.attrs(handle).access_rev);

            let mut start = 0usize;
            for (k, &r) in way.refs.iter().enumerate().skip(1) {
                let Some(pos) = node_pos(r) else { continue };
                if node_ids[pos] == NOT_A_NODE {
                    continue;
                }

                let offset = to_id(points.len(), "geometry points")?;
                points.extend(
                    way.refs[start..=k]
                        .iter()
                        .filter_map(|&id| node_pos(id).map(|i| nodes[i].1)),
                );
                let end = to_id(points.len(), "geometry points")?;
                let slot = to_id(slots.len(), "geometry slots")?;
                slots.push(GeometrySlot {
                    offset,
                    len: end - offset,
                });

                let from = node_pos(way.refs[start]).map_or(NOT_A_NODE, |i| node_ids[i]);
                segments.push(Segment {
                    from: NodeId(from),
                    to: NodeId(node_ids[pos]),
                    slot,
                    tags: handle,
                    way_id: way.id,
                    forward,
                    backward,
                });
                start = k;
            }
        }

        let lengths: Vec<f64> = slots
            .par_iter()
            .map(|s| {
                let coords: Vec<Coordinate> = points[s.offset as usize..(s.offset + s.len) as usize]
                    .iter()
                    .map(|p| p.to_coordinate())
                    .collect();
                polyline_length(&coords)
            })
            .collect();

        let mut edges = Vec::with_capacity(segments.len() * 2);
        for seg in &segments {
            let length_m = lengths[seg.slot as usize];
            let oneway = !(seg.forward && seg.backward);
            if seg.forward {
                edges.push(Edge {
                    from: seg.from,
                    to: seg.to,
                    tags: seg.tags,
                    length_m,
                    geometry: GeometryRef { slot: seg.slot, reversed: false },
                    twin: None,
                    way_id: seg.way_id,
                    oneway,
                });
            }
            if seg.backward {
                edges.push(Edge {
                    from: seg.to,
                    to: seg.from,
                    tags: seg.tags,
                    length_m,
                    geometry: GeometryRef { slot: seg.slot, reversed: true },
                    twin: None,
                    way_id: seg.way_id,
                    oneway,
                });
            }
        }

        if edges.is_empty() {
            return Err(BuildError::NoUsableEdges {
                ways_seen: stats.ways_seen,
                ways_dropped: stats.ways_dangling,
            });
        }

        to_id(edges.len(), "edges")?;
        edges.sort_by_key(|e| (e.from, e.to, e.geometry.slot, e.geometry.reversed));

        // Link twins through their shared slot
        let mut slot_edges: Vec<[Option<u32>; 2]> = vec![[None, None]; slots.len()];
        for (i, e) in edges.iter().enumerate() {
            slot_edges[e.geometry.slot as usize][e.geometry.reversed as usize] = Some(i as u32);
        }
        for pair in &slot_edges {
            if let [Some(f), Some(b)] = *pair {
                edges[f as usize].twin = Some(EdgeId(b));
                edges[b as usize].twin = Some(EdgeId(f));
            }
        }

        let mut first_out = vec![0u32; graph_nodes.len() + 1];
        for e in &edges {
            first_out[e.from.index() + 1] += 1;
        }
        for i in 1..first_out.len() {
            first_out[i] += first_out[i - 1];
        }

        // Index each slot once, under the edge that reads it in stored order
        let mut entries = Vec::with_capacity(points.len());
        for (slot, pair) in slots.iter().zip(&slot_edges) {
            let Some(edge) = pair[0].or(pair[1]).map(EdgeId) else {
                continue;
            };
            let coords = &points[slot.offset as usize..(slot.offset + slot.len) as usize];
            for w in coords.windows(2) {
                let a = w[0].to_coordinate();
                let b = w[1].to_coordinate();
                entries.push(SegmentEntry {
                    a: [a.lon, a.lat],
                    b: [b.lon, b.lat],
                    edge,
                });
            }
        }
        let spatial = SpatialIndex::build(entries);
        debug!(entries = spatial.len(), "spatial index loaded");

        stats.nodes = graph_nodes.len() as u64;
        stats.edges = edges.len() as u64;
        stats.tag_sets = tags.len() as u64;

        Ok(GraphStore {
            nodes: graph_nodes,
            first_out,
            edges,
            slots,
            points,
            tags,
            tables,
            spatial,
            stats,
        })
    }
}

/// Build a graph for `config` from `source`
pub fn build_network(
    source: &mut dyn RecordSource,
    config: &EngineConfig,
) -> Result<GraphStore, BuildError> {
    NetworkBuilder::new(config).build(source)
}

fn push_node(nodes: &mut Vec<(i64, FixedCoord)>, id: i64, lat: f64, lon: f64) {
    // Out-of-range coordinates are treated as missing nodes
    if Coordinate::new(lat, lon).is_valid() {
        nodes.push((id, FixedCoord::from_degrees(lat, lon)));
    }
}

/// Sort by id; a repeated id keeps its first occurrence
fn sort_nodes(mut nodes: Vec<(i64, FixedCoord)>) -> Vec<(i64, FixedCoord)> {
    nodes.sort_by_key(|&(id, _)| id);
    nodes.dedup_by_key(|&mut (id, _)| id);
    nodes
}

/// Sort ways by id and drop those with a node missing from `nodes`
fn drop_dangling(
    mut ways: Vec<WayRecord>,
    nodes: &[(i64, FixedCoord)],
    stats: &mut BuildStats,
) -> Vec<WayRecord> {
    ways.sort_by_key(|w| w.id);
    ways.dedup_by_key(|w| w.id);

    let before = ways.len();
    ways.retain(|w| {
        w.refs
            .iter()
            .all(|r| nodes.binary_search_by_key(r, |&(id, _)| id).is_ok())
    });
    stats.ways_dangling = (before - ways.len()) as u64;
    ways
}
