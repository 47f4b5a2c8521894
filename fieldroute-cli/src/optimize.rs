//! `optimize` subcommand.

use std::io::Write;
use std::path::PathBuf;

use clap::Parser;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};

use fieldroute_core::{Coordinate, Objective, RouteOptions, RouteSolution, RouteStop};
use fieldroute_solver::RouteOptimizer;

use crate::engine::{EngineSettings, build_service};
use crate::{
    ARG_START, ARG_STOP, CliError, ENV_OPTIMIZE_START, ENV_OPTIMIZE_STOP, parse_coordinate,
    parse_objective, write_json,
};

/// CLI arguments for the `optimize` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Order stops into an efficient visiting route from a \
                 starting point. Five or fewer stops are solved exactly; \
                 larger sets use greedy nearest-neighbour.",
    about = "Order stops into an efficient visiting route"
)]
#[ortho_config(prefix = "FIELDROUTE")]
pub(crate) struct OptimizeArgs {
    /// Starting point as LAT,LNG.
    #[arg(long = ARG_START, value_name = "LAT,LNG")]
    #[serde(default)]
    start: Option<String>,
    /// A stop to visit, as LAT,LNG; repeat for each stop.
    #[arg(long = ARG_STOP, value_name = "LAT,LNG")]
    #[serde(default)]
    stop: Vec<String>,
    /// Close the tour back at the starting point.
    #[arg(long)]
    #[serde(default)]
    return_to_start: bool,
    /// Optional distinct end point as LAT,LNG.
    #[arg(long, value_name = "LAT,LNG")]
    #[serde(default)]
    end: Option<String>,
    /// What to minimise: shortest or fastest.
    #[arg(long, value_name = "objective")]
    #[serde(default)]
    objective: Option<String>,
    /// Provider ordering: cost-optimized or quality-optimized.
    #[arg(long, value_name = "strategy")]
    #[serde(default)]
    strategy: Option<String>,
    /// Base URL of the OSRM instance.
    #[arg(long, value_name = "url")]
    #[serde(default)]
    osrm_url: Option<String>,
    /// Base URL of the commercial matrix API.
    #[arg(long, value_name = "url")]
    #[serde(default)]
    matrix_api_url: Option<String>,
    /// Credential for the commercial matrix API.
    #[arg(long, value_name = "key")]
    #[serde(default)]
    matrix_api_key: Option<String>,
    /// SQLite file persisting cache entries and quota counters.
    #[arg(long, value_name = "path")]
    #[serde(default)]
    cache_db: Option<PathBuf>,
    /// Emit JSON instead of human-readable text.
    #[arg(long)]
    #[serde(default)]
    json: bool,
}

/// Resolved `optimize` command configuration.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct OptimizeConfig {
    start: Coordinate,
    stops: Vec<RouteStop>,
    route: RouteOptions,
    engine: EngineSettings,
    json: bool,
}

impl TryFrom<OptimizeArgs> for OptimizeConfig {
    type Error = CliError;

    fn try_from(args: OptimizeArgs) -> Result<Self, Self::Error> {
        let start = args.start.ok_or(CliError::MissingArgument {
            field: ARG_START,
            env: ENV_OPTIMIZE_START,
        })?;
        if args.stop.is_empty() {
            return Err(CliError::MissingArgument {
                field: ARG_STOP,
                env: ENV_OPTIMIZE_STOP,
            });
        }
        let stops = args
            .stop
            .iter()
            .enumerate()
            .map(|(index, value)| {
                let location = parse_coordinate(value)?;
                Ok(RouteStop::new(format!("stop-{}", index + 1), location))
            })
            .collect::<Result<Vec<_>, CliError>>()?;
        let objective = args
            .objective
            .as_deref()
            .map(parse_objective)
            .transpose()?
            .unwrap_or(Objective::Shortest);
        let mut route = RouteOptions::default().with_objective(objective);
        if args.return_to_start {
            route = route.round_trip();
        } else if let Some(end) = args.end.as_deref() {
            route = route.ending_at(parse_coordinate(end)?);
        }
        let engine = EngineSettings::resolve(
            args.osrm_url,
            args.matrix_api_url,
            args.matrix_api_key,
            args.cache_db,
            args.strategy,
        )?;
        Ok(Self {
            start: parse_coordinate(&start)?,
            stops,
            route,
            engine,
            json: args.json,
        })
    }
}

pub(crate) async fn run(args: OptimizeArgs, writer: &mut dyn Write) -> Result<(), CliError> {
    let merged = args.load_and_merge().map_err(CliError::Configuration)?;
    let config = OptimizeConfig::try_from(merged)?;
    let service = build_service(&config.engine)?;
    let optimizer = RouteOptimizer::new(service);
    let solution = optimizer
        .optimize(&config.stops, config.start, &config.route)
        .await
        .map_err(|source| CliError::Optimize { source })?;
    render(&solution, config.json, writer)
}

fn render(solution: &RouteSolution, json: bool, writer: &mut dyn Write) -> Result<(), CliError> {
    if json {
        return write_json(writer, solution);
    }
    writeln!(writer, "{}", solution.summary).map_err(CliError::WriteOutput)?;
    for (index, stop) in solution.stops.iter().enumerate() {
        writeln!(writer, "{}. {} at {}", index + 1, stop.reference, stop.location)
            .map_err(CliError::WriteOutput)?;
    }
    if let Some(last) = solution.segments.last()
        && last.is_return
    {
        writeln!(writer, "return to {}", last.to).map_err(CliError::WriteOutput)?;
    }
    Ok(())
}
