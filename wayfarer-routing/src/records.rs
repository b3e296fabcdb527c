//! Tagged map records consumed by the network builder

use wayfarer_common::BuildError;

pub type Tags = Vec<(String, String)>;

#[derive(Debug, Clone, PartialEq)]
pub struct NodeRecord {
    pub id: i64,
    pub lat: f64,
    pub lon: f64,
    pub tags: Tags,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WayRecord {
    pub id: i64,
    /// Ordered node references
    pub refs: Vec<i64>,
    pub tags: Tags,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberKind {
    Node,
    Way,
    Relation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RelationMember {
    pub kind: MemberKind,
    pub id: i64,
    pub role: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RelationRecord {
    pub id: i64,
    pub members: Vec<RelationMember>,
    pub tags: Tags,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    Node(NodeRecord),
    Way(WayRecord),
    Relation(RelationRecord),
}

/// An ordered stream of map records.
///
/// `read` may be called more than once; every call must replay the same
/// records in the same order.
pub trait RecordSource {
    fn read(&mut self, sink: &mut dyn FnMut(Record)) -> Result<(), BuildError>;
}

/// In-memory record source
#[derive(Debug, Clone, Default)]
pub struct VecSource {
    records: Vec<Record>,
}

impl VecSource {
    pub fn new(records: Vec<Record>) -> Self {
        Self { records }
    }

    pub fn node(&mut self, id: i64, lat: f64, lon: f64) -> &mut Self {
        self.records.push(Record::Node(NodeRecord {
            id,
            lat,
            lon,
            tags: Vec::new(),
        }));
        self
    }

    pub fn way(&mut self, id: i64, refs: &[i64], tags: &[(&str, &str)]) -> &mut Self {
        self.records.push(Record::Way(WayRecord {
            id,
            refs: refs.to_vec(),
            tags: tags
                .iter()
                .map(|&(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }));
        self
    }

    pub fn push(&mut self, record: Record) -> &mut Self {
        self.records.push(record);
        self
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl RecordSource for VecSource {
    fn read(&mut self, sink: &mut dyn FnMut(Record)) -> Result<(), BuildError> {
        for record in &self.records {
            sink(record.clone());
        }
        Ok(())
    }
}
