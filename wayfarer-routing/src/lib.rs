//! Wayfarer routing engine
//!
//! Builds an immutable, vehicle-aware road network from a stream of tagged
//! map records, then answers two kinds of query concurrently:
//!
//! - point resolution: the nearest point on an edge a profile can use
//! - route calculation: the fastest path between two resolved points, with
//!   geometry, totals and turn-by-turn instructions
//!
//! ```no_run
//! use wayfarer_routing::{Engine, EngineConfig, Profile, RouteOutcome, VecSource};
//!
//! let mut source = VecSource::default();
//! source
//!     .node(1, 55.9500, -3.1900)
//!     .node(2, 55.9510, -3.1900)
//!     .way(10, &[1, 2], &[("highway", "residential")]);
//!
//! let engine = Engine::build(&mut source, EngineConfig::default())?;
//! match engine.calculate_route(Profile::Car, 55.9501, -3.1900, 55.9509, -3.1900)? {
//!     RouteOutcome::Found(route) => println!("{:.0} m", route.total_distance),
//!     other => println!("{other:?}"),
//! }
//! # Ok::<(), wayfarer_routing::Error>(())
//! ```

pub mod builder;
pub mod config;
pub mod engine;
pub mod gate;
pub mod geo;
pub mod graph;
pub mod instructions;
pub mod profile;
pub mod records;
pub mod resolve;
pub mod route;
pub mod search;
pub mod spatial;
pub mod tags;

pub use builder::{build_network, NetworkBuilder};
pub use config::{BuildConfig, BuildStrategy, EngineConfig, InstructionConfig, ResolverConfig};
pub use engine::{Endpoint, Engine, InstructionSummary, RouteOutcome, RouteSummary};
pub use gate::{EngineGate, GateStatus};
pub use geo::Coordinate;
pub use graph::{BuildStats, Edge, EdgeId, GraphStore, Node, NodeId};
pub use instructions::{
    Heading, Instruction, LanguageFormatter, Maneuver, SimpleEnglishFormatter, TurnDirection,
};
pub use profile::{Direction, EdgeCost, Profile, ProfileTable};
pub use records::{NodeRecord, Record, RecordSource, RelationRecord, VecSource, WayRecord};
pub use resolve::RouterPoint;
pub use route::{Route, RouteEntry, RouteLeg};
pub use search::{CancelToken, Path, PathLeg, QueryOptions};
pub use tags::{TagDictionary, TagHandle, TagSet};
pub use wayfarer_common::{BuildError, Error, Result};
