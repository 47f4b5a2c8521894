//! `matrix` subcommand.

use std::io::Write;
use std::path::PathBuf;

use clap::Parser;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};

use fieldroute_core::{Coordinate, DistanceMatrix, DistanceOptions, MatrixCell, TravelMode};

use crate::engine::{EngineSettings, build_service};
use crate::{
    ARG_DESTINATIONS, ARG_ORIGINS, CliError, ENV_MATRIX_DESTINATIONS, ENV_MATRIX_ORIGINS,
    parse_coordinate, parse_mode, write_json,
};

/// CLI arguments for the `matrix` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Resolve a full origins x destinations matrix. Requests \
                 larger than the active provider's caps are chunked into \
                 sub-grids and stitched back together; cached pairs are \
                 served without a provider call.",
    about = "Resolve an origins x destinations distance matrix"
)]
#[ortho_config(prefix = "FIELDROUTE")]
pub(crate) struct MatrixArgs {
    /// Origins as LAT,LNG pairs separated by semicolons.
    #[arg(long = ARG_ORIGINS, value_name = "LAT,LNG;...", value_delimiter = ';')]
    #[serde(default)]
    origins: Vec<String>,
    /// Destinations as LAT,LNG pairs separated by semicolons.
    #[arg(long = ARG_DESTINATIONS, value_name = "LAT,LNG;...", value_delimiter = ';')]
    #[serde(default)]
    destinations: Vec<String>,
    /// Travel mode: driving, walking, or bicycling.
    #[arg(long, value_name = "mode")]
    #[serde(default)]
    mode: Option<String>,
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

/// Resolved `matrix` command configuration.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct MatrixConfig {
    origins: Vec<Coordinate>,
    destinations: Vec<Coordinate>,
    mode: TravelMode,
    engine: EngineSettings,
    json: bool,
}

impl TryFrom<MatrixArgs> for MatrixConfig {
    type Error = CliError;

    fn try_from(args: MatrixArgs) -> Result<Self, Self::Error> {
        if args.origins.is_empty() {
            return Err(CliError::MissingArgument {
                field: ARG_ORIGINS,
                env: ENV_MATRIX_ORIGINS,
            });
        }
        if args.destinations.is_empty() {
            return Err(CliError::MissingArgument {
                field: ARG_DESTINATIONS,
                env: ENV_MATRIX_DESTINATIONS,
            });
        }
        let origins = args
            .origins
            .iter()
            .map(|value| parse_coordinate(value))
            .collect::<Result<Vec<_>, _>>()?;
        let destinations = args
            .destinations
            .iter()
            .map(|value| parse_coordinate(value))
            .collect::<Result<Vec<_>, _>>()?;
        let mode = args.mode.as_deref().map(parse_mode).transpose()?.unwrap_or_default();
        let engine = EngineSettings::resolve(
            args.osrm_url,
            args.matrix_api_url,
            args.matrix_api_key,
            args.cache_db,
            args.strategy,
        )?;
        Ok(Self {
            origins,
            destinations,
            mode,
            engine,
            json: args.json,
        })
    }
}

pub(crate) async fn run(args: MatrixArgs, writer: &mut dyn Write) -> Result<(), CliError> {
    let merged = args.load_and_merge().map_err(CliError::Configuration)?;
    let config = MatrixConfig::try_from(merged)?;
    let service = build_service(&config.engine)?;
    let options = DistanceOptions::default().with_mode(config.mode);
    let matrix = service
        .matrix_with_cache(&config.origins, &config.destinations, &options)
        .await;
    render(&matrix, config.json, writer)
}

fn render(matrix: &DistanceMatrix, json: bool, writer: &mut dyn Write) -> Result<(), CliError> {
    if json {
        return write_json(writer, matrix);
    }
    for (origin, row) in matrix.origins.iter().zip(&matrix.cells) {
        for (destination, cell) in matrix.destinations.iter().zip(row) {
            let outcome = match cell {
                MatrixCell::Ok(result) => {
                    format!("{} ({})", result.distance_text(), result.duration_text())
                }
                MatrixCell::Unreachable => "unreachable".to_owned(),
                MatrixCell::Failed(reason) => format!("failed: {reason}"),
            };
            writeln!(writer, "{origin} -> {destination}: {outcome}")
                .map_err(CliError::WriteOutput)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use fieldroute_core::{DistanceResult, ProviderId};

    fn coordinate(lat: f64, lng: f64) -> Coordinate {
        Coordinate::new(lat, lng).expect("valid test coordinate")
    }

    #[test]
    fn empty_origins_are_reported_with_their_flag() {
        let args = MatrixArgs {
            destinations: vec!["52.0,21.0".to_owned()],
            ..MatrixArgs::default()
        };
        assert!(matches!(
            MatrixConfig::try_from(args),
            Err(CliError::MissingArgument { field: "origins", .. })
        ));
    }

    #[test]
    fn every_cell_outcome_renders_distinctly() {
        let mut matrix = DistanceMatrix::empty(
            vec![coordinate(50.0, 19.0)],
            vec![
                coordinate(52.0, 21.0),
                coordinate(53.0, 22.0),
                coordinate(54.0, 23.0),
            ],
        );
        matrix.set_cell(
            0,
            0,
            MatrixCell::Ok(DistanceResult::new(1_500.0, 120.0, ProviderId::OsrmRouting, 0)),
        );
        matrix.set_cell(0, 1, MatrixCell::Unreachable);
        matrix.set_cell(0, 2, MatrixCell::Failed("outage".to_owned()));

        let mut output = Vec::new();
        render(&matrix, false, &mut output).expect("render succeeds");
        let text = String::from_utf8(output).expect("utf8 output");
        assert!(text.contains("1.5 km"));
        assert!(text.contains("unreachable"));
        assert!(text.contains("failed: outage"));
    }
}
