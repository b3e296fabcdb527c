//! OSM PBF record source

use std::path::{Path, PathBuf};

use osmpbf::{Element, ElementReader, RelMemberType};
use tracing::debug;
use wayfarer_common::BuildError;
use wayfarer_routing::records::{
    MemberKind, NodeRecord, Record, RecordSource, RelationMember, RelationRecord, Tags, WayRecord,
};

/// Reads records from a `.osm.pbf` file.
///
/// The file is reopened on every [`RecordSource::read`], so a two-pass build
/// streams it twice instead of holding it in memory.
#[derive(Debug, Clone)]
pub struct PbfSource {
    path: PathBuf,
}

impl PbfSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn unreadable(&self, e: osmpbf::Error) -> BuildError {
        BuildError::UnreadableInput(format!("{}: {e}", self.path.display()))
    }
}

impl RecordSource for PbfSource {
    fn read(&mut self, sink: &mut dyn FnMut(Record)) -> Result<(), BuildError> {
        debug!(path = %self.path.display(), "reading PBF");
        let reader = ElementReader::from_path(&self.path).map_err(|e| self.unreadable(e))?;

        reader
            .for_each(|element| sink(convert(element)))
            .map_err(|e| self.unreadable(e))
    }
}

fn owned_tags<'a>(tags: impl Iterator<Item = (&'a str, &'a str)>) -> Tags {
    tags.map(|(k, v)| (k.to_string(), v.to_string())).collect()
}

fn convert(element: Element<'_>) -> Record {
    match element {
        Element::Node(node) => Record::Node(NodeRecord {
            id: node.id(),
            lat: node.lat(),
            lon: node.lon(),
            tags: owned_tags(node.tags()),
        }),
        Element::DenseNode(node) => Record::Node(NodeRecord {
            id: node.id(),
            lat: node.lat(),
            lon: node.lon(),
            tags: owned_tags(node.tags()),
        }),
        Element::Way(way) => Record::Way(WayRecord {
            id: way.id(),
            refs: way.refs().collect(),
            tags: owned_tags(way.tags()),
        }),
        Element::Relation(relation) => Record::Relation(RelationRecord {
            id: relation.id(),
            members: relation
                .members()
                .map(|m| RelationMember {
                    kind: match m.member_type {
                        RelMemberType::Node => MemberKind::Node,
                        RelMemberType::Way => MemberKind::Way,
                        RelMemberType::Relation => MemberKind::Relation,
                    },
                    id: m.member_id,
                    // Undecodable roles are left empty
                    role: m.role().map(str::to_string).unwrap_or_default(),
                })
                .collect(),
            tags: owned_tags(relation.tags()),
        }),
    }
}
