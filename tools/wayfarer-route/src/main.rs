use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use wayfarer_route::{parse_coordinate, run_server, AppState, EngineArgs, PbfSource};
use wayfarer_routing::{Coordinate, Endpoint, Engine, EngineConfig, Profile, RouteOutcome};

#[derive(Parser)]
#[command(name = "wayfarer-route")]
#[command(about = "Vehicle-aware routing over OpenStreetMap data", long_about = None)]
struct Cli {
    #[command(flatten)]
    engine: EngineArgs,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the network and print its statistics
    Build {
        /// Input PBF file
        input: PathBuf,
    },
    /// Snap a coordinate onto the network
    Resolve {
        /// Input PBF file
        input: PathBuf,
        #[arg(long, default_value = "car")]
        profile: Profile,
        /// Coordinate (lat,lon)
        #[arg(long, value_parser = parse_coordinate)]
        at: Coordinate,
    },
    /// Find a route between two coordinates
    Route {
        /// Input PBF file
        input: PathBuf,
        #[arg(long, default_value = "car")]
        profile: Profile,
        /// Start coordinate (lat,lon)
        #[arg(long, value_parser = parse_coordinate)]
        from: Coordinate,
        /// End coordinate (lat,lon)
        #[arg(long, value_parser = parse_coordinate)]
        to: Coordinate,
        /// Print the route as a GeoJSON Feature
        #[arg(long)]
        geojson: bool,
    },
    /// Start the HTTP API server with OpenAPI docs
    Serve {
        /// Input PBF file
        input: PathBuf,
        /// Address to bind
        #[arg(long, default_value = "0.0.0.0")]
        host: IpAddr,
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,
        /// Per-request search deadline in milliseconds
        #[arg(long, default_value = "5000")]
        timeout_ms: u64,
    },
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    // Logs go to stderr; stdout carries command output
    if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry.with(fmt::layer().with_writer(std::io::stderr)).init();
    }
}

fn load_engine(input: &Path, config: EngineConfig) -> wayfarer_routing::Result<Engine> {
    Engine::build(&mut PbfSource::new(input), config)
}

fn build_engine(input: &Path, config: EngineConfig) -> Result<Engine> {
    load_engine(input, config).with_context(|| format!("building network from {}", input.display()))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let config = cli.engine.engine_config().context("loading engine configuration")?;

    match cli.command {
        Commands::Build { input } => {
            let start = Instant::now();
            let engine = build_engine(&input, config)?;
            info!(elapsed_s = start.elapsed().as_secs_f64(), "build finished");

            let report = serde_json::json!({
                "profiles": engine.profiles(),
                "stats": engine.graph().stats(),
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Resolve { input, profile, at } => {
            let engine = build_engine(&input, config)?;
            match engine.resolve_point(profile, at.lat, at.lon)? {
                Some(point) => println!("{}", serde_json::to_string(&point)?),
                None => bail!(
                    "no {profile} road within {} m of {},{}",
                    engine.config().resolver.max_radius_m,
                    at.lat,
                    at.lon
                ),
            }
        }
        Commands::Route {
            input,
            profile,
            from,
            to,
            geojson,
        } => {
            let engine = build_engine(&input, config)?;

            let start = Instant::now();
            let outcome = engine.calculate_route(profile, from.lat, from.lon, to.lat, to.lon)?;
            info!(elapsed_ms = start.elapsed().as_millis() as u64, "query finished");

            let summary = match outcome {
                RouteOutcome::Found(summary) => summary,
                RouteOutcome::Unresolved(Endpoint::Start) => {
                    bail!("no {profile} road near the start point")
                }
                RouteOutcome::Unresolved(Endpoint::End) => {
                    bail!("no {profile} road near the end point")
                }
                RouteOutcome::NotFound => bail!("no {profile} route between the points"),
            };

            if geojson {
                println!("{}", serde_json::to_string_pretty(&summary.to_geojson())?);
            } else {
                println!("Distance: {:.0}m", summary.total_distance);
                println!("Time: {:.1} minutes", summary.total_time / 60.0);
                for instruction in &summary.instructions {
                    println!(
                        "  {:>7.0}m  {}",
                        distance_at(&summary.geometry, instruction.entry),
                        instruction.text
                    );
                }
            }
        }
        Commands::Serve {
            input,
            host,
            port,
            timeout_ms,
        } => {
            let loader = Arc::new(move || load_engine(&input, config.clone()));
            let state = AppState::new(loader, Duration::from_millis(timeout_ms));
            run_server(state, SocketAddr::new(host, port)).await?;
        }
    }

    Ok(())
}

/// Meters along `geometry` up to entry `index`
fn distance_at(geometry: &[Coordinate], index: usize) -> f64 {
    let end = (index + 1).min(geometry.len());
    geometry[..end]
        .windows(2)
        .map(|p| wayfarer_routing::geo::haversine_distance(p[0], p[1]))
        .sum()
}
