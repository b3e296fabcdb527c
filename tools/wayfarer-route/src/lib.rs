//! Command line and HTTP front end for the wayfarer routing engine

pub mod options;
pub mod pbf;
pub mod server;

pub use options::{parse_coordinate, EngineArgs};
pub use pbf::PbfSource;
pub use server::{build_router, run_server, AppState};
