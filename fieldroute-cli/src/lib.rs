//! Command-line interface for the fieldroute distance engine.
#![forbid(unsafe_code)]

use std::io::Write;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde::Serialize;
use thiserror::Error;

use fieldroute_core::{
    Coordinate, DistanceError, Objective, ProviderId, RouteError, SelectionStrategy, TravelMode,
};
use fieldroute_store::StoreError;

mod distance;
mod engine;
mod matrix;
mod optimize;

pub(crate) const ARG_FROM: &str = "from";
pub(crate) const ARG_TO: &str = "to";
pub(crate) const ARG_ORIGINS: &str = "origins";
pub(crate) const ARG_DESTINATIONS: &str = "destinations";
pub(crate) const ARG_START: &str = "start";
pub(crate) const ARG_STOP: &str = "stop";

pub(crate) const ENV_DISTANCE_FROM: &str = "FIELDROUTE_CMDS_DISTANCE_FROM";
pub(crate) const ENV_DISTANCE_TO: &str = "FIELDROUTE_CMDS_DISTANCE_TO";
pub(crate) const ENV_MATRIX_ORIGINS: &str = "FIELDROUTE_CMDS_MATRIX_ORIGINS";
pub(crate) const ENV_MATRIX_DESTINATIONS: &str = "FIELDROUTE_CMDS_MATRIX_DESTINATIONS";
pub(crate) const ENV_OPTIMIZE_START: &str = "FIELDROUTE_CMDS_OPTIMIZE_START";
pub(crate) const ENV_OPTIMIZE_STOP: &str = "FIELDROUTE_CMDS_OPTIMIZE_STOP";

/// Run the fieldroute CLI with the current process arguments and
/// environment.
///
/// # Errors
///
/// Returns [`CliError`] for argument, configuration, or engine failures.
pub fn run() -> Result<(), CliError> {
    let cli = Cli::try_parse().map_err(CliError::ArgumentParsing)?;
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(CliError::Runtime)?;
    let mut stdout = std::io::stdout().lock();
    match cli.command {
        Command::Distance(args) => runtime.block_on(distance::run(args, &mut stdout)),
        Command::Matrix(args) => runtime.block_on(matrix::run(args, &mut stdout)),
        Command::Optimize(args) => runtime.block_on(optimize::run(args, &mut stdout)),
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "fieldroute",
    about = "Distance and route planning over road routing, commercial matrix, and geometric providers",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Resolve the distance between two coordinates.
    Distance(distance::DistanceArgs),
    /// Resolve a full origins x destinations matrix.
    Matrix(matrix::MatrixArgs),
    /// Order stops into an efficient visiting route.
    Optimize(optimize::OptimizeArgs),
}

/// Errors emitted by the fieldroute CLI.
#[derive(Debug, Error)]
pub enum CliError {
    /// Provided arguments failed Clap validation.
    #[error(transparent)]
    ArgumentParsing(#[from] clap::Error),
    /// Configuration layering failed (files, env, CLI).
    #[error("failed to load configuration: {0}")]
    Configuration(#[from] Arc<ortho_config::OrthoError>),
    /// A required option is missing after configuration merging.
    #[error("missing {field} (set --{field} or {env})")]
    MissingArgument {
        /// Flag name of the missing option.
        field: &'static str,
        /// Environment variable that could also supply it.
        env: &'static str,
    },
    /// A coordinate argument could not be parsed.
    #[error("invalid coordinate {value:?}: {reason}")]
    InvalidCoordinate {
        /// The argument as given.
        value: String,
        /// Why it was rejected.
        reason: String,
    },
    /// An enumerated option received an unknown value.
    #[error("invalid {field} {value:?} (expected one of: {allowed})")]
    InvalidChoice {
        /// Flag name of the option.
        field: &'static str,
        /// The argument as given.
        value: String,
        /// Accepted values.
        allowed: &'static str,
    },
    /// Constructing a provider adapter failed.
    #[error("failed to build the {provider} provider: {source}")]
    BuildProvider {
        /// Which provider could not be built.
        provider: ProviderId,
        /// The adapter-level failure.
        #[source]
        source: DistanceError,
    },
    /// Opening the durable cache/quota database failed.
    #[error(transparent)]
    OpenStore(#[from] StoreError),
    /// The distance engine exhausted every provider.
    #[error("distance resolution failed: {source}")]
    Distance {
        /// The engine-level failure.
        #[source]
        source: DistanceError,
    },
    /// Route optimisation failed.
    #[error("route optimisation failed: {source}")]
    Optimize {
        /// The optimizer-level failure.
        #[source]
        source: RouteError,
    },
    /// Serialising JSON output failed.
    #[error("failed to serialise output: {0}")]
    Serialize(#[source] serde_json::Error),
    /// Writing to the output stream failed.
    #[error("failed to write output: {0}")]
    WriteOutput(#[source] std::io::Error),
    /// Building the async runtime failed.
    #[error("failed to start the async runtime: {0}")]
    Runtime(#[source] std::io::Error),
}

/// Parse a `LAT,LNG` argument into a validated [`Coordinate`].
pub(crate) fn parse_coordinate(value: &str) -> Result<Coordinate, CliError> {
    let invalid = |reason: String| CliError::InvalidCoordinate {
        value: value.to_owned(),
        reason,
    };
    let (lat, lng) = value
        .split_once(',')
        .ok_or_else(|| invalid("expected LAT,LNG".to_owned()))?;
    let lat: f64 = lat
        .trim()
        .parse()
        .map_err(|err| invalid(format!("latitude: {err}")))?;
    let lng: f64 = lng
        .trim()
        .parse()
        .map_err(|err| invalid(format!("longitude: {err}")))?;
    Coordinate::new(lat, lng).map_err(|err| invalid(err.to_string()))
}

pub(crate) fn parse_mode(value: &str) -> Result<TravelMode, CliError> {
    match value {
        "driving" => Ok(TravelMode::Driving),
        "walking" => Ok(TravelMode::Walking),
        "bicycling" => Ok(TravelMode::Bicycling),
        other => Err(CliError::InvalidChoice {
            field: "mode",
            value: other.to_owned(),
            allowed: "driving, walking, bicycling",
        }),
    }
}

pub(crate) fn parse_strategy(value: &str) -> Result<SelectionStrategy, CliError> {
    match value {
        "cost-optimized" => Ok(SelectionStrategy::CostOptimized),
        "quality-optimized" => Ok(SelectionStrategy::QualityOptimized),
        other => Err(CliError::InvalidChoice {
            field: "strategy",
            value: other.to_owned(),
            allowed: "cost-optimized, quality-optimized",
        }),
    }
}

pub(crate) fn parse_objective(value: &str) -> Result<Objective, CliError> {
    match value {
        "shortest" => Ok(Objective::Shortest),
        "fastest" => Ok(Objective::Fastest),
        other => Err(CliError::InvalidChoice {
            field: "objective",
            value: other.to_owned(),
            allowed: "shortest, fastest",
        }),
    }
}

/// Write a pretty-printed JSON payload followed by a newline.
pub(crate) fn write_json<T: Serialize>(
    writer: &mut dyn Write,
    value: &T,
) -> Result<(), CliError> {
    let payload = serde_json::to_string_pretty(value).map_err(CliError::Serialize)?;
    writer
        .write_all(payload.as_bytes())
        .map_err(CliError::WriteOutput)?;
    writer.write_all(b"\n").map_err(CliError::WriteOutput)
}
