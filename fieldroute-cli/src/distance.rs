//! `distance` subcommand.

use std::io::Write;
use std::path::PathBuf;

use clap::Parser;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};

use fieldroute_core::{Coordinate, DistanceOptions, DistanceResult, DistanceSource, TravelMode};

use crate::engine::{EngineSettings, build_service};
use crate::{
    ARG_FROM, ARG_TO, CliError, ENV_DISTANCE_FROM, ENV_DISTANCE_TO, parse_coordinate, parse_mode,
    write_json,
};

/// CLI arguments for the `distance` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Resolve the road distance and travel time between two \
                 coordinates, consulting the cache first and falling back \
                 across providers.",
    about = "Resolve the distance between two coordinates"
)]
#[ortho_config(prefix = "FIELDROUTE")]
pub(crate) struct DistanceArgs {
    /// Origin as LAT,LNG.
    #[arg(long = ARG_FROM, value_name = "LAT,LNG")]
    #[serde(default)]
    from: Option<String>,
    /// Destination as LAT,LNG.
    #[arg(long = ARG_TO, value_name = "LAT,LNG")]
    #[serde(default)]
    to: Option<String>,
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

/// Resolved `distance` command configuration.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct DistanceConfig {
    from: Coordinate,
    to: Coordinate,
    mode: TravelMode,
    engine: EngineSettings,
    json: bool,
}

impl TryFrom<DistanceArgs> for DistanceConfig {
    type Error = CliError;

    fn try_from(args: DistanceArgs) -> Result<Self, Self::Error> {
        let from = args.from.ok_or(CliError::MissingArgument {
            field: ARG_FROM,
            env: ENV_DISTANCE_FROM,
        })?;
        let to = args.to.ok_or(CliError::MissingArgument {
            field: ARG_TO,
            env: ENV_DISTANCE_TO,
        })?;
        let mode = args.mode.as_deref().map(parse_mode).transpose()?.unwrap_or_default();
        let engine = EngineSettings::resolve(
            args.osrm_url,
            args.matrix_api_url,
            args.matrix_api_key,
            args.cache_db,
            args.strategy,
        )?;
        Ok(Self {
            from: parse_coordinate(&from)?,
            to: parse_coordinate(&to)?,
            mode,
            engine,
            json: args.json,
        })
    }
}

pub(crate) async fn run(args: DistanceArgs, writer: &mut dyn Write) -> Result<(), CliError> {
    let merged = args.load_and_merge().map_err(CliError::Configuration)?;
    let config = DistanceConfig::try_from(merged)?;
    let service = build_service(&config.engine)?;
    let options = DistanceOptions::default().with_mode(config.mode);
    let result = service
        .distance(config.from, config.to, &options)
        .await
        .map_err(|source| CliError::Distance { source })?;
    render(&result, config.json, writer)
}

fn render(result: &DistanceResult, json: bool, writer: &mut dyn Write) -> Result<(), CliError> {
    if json {
        return write_json(writer, result);
    }
    writeln!(
        writer,
        "{} ({}) via {}",
        result.distance_text(),
        result.duration_text(),
        result.provider
    )
    .map_err(CliError::WriteOutput)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fieldroute_core::ProviderId;

    #[test]
    fn missing_origin_is_reported_with_its_flag() {
        let args = DistanceArgs {
            to: Some("52.0,21.0".to_owned()),
            ..DistanceArgs::default()
        };
        assert!(matches!(
            DistanceConfig::try_from(args),
            Err(CliError::MissingArgument { field: "from", .. })
        ));
    }

    #[test]
    fn human_output_names_the_provider() {
        let result = DistanceResult::new(253_400.0, 9_960.0, ProviderId::OsrmRouting, 0);
        let mut output = Vec::new();
        render(&result, false, &mut output).expect("render succeeds");
        let text = String::from_utf8(output).expect("utf8 output");
        assert!(text.contains("253.4 km"));
        assert!(text.contains("osrm-routing"));
    }

    #[test]
    fn json_output_is_machine_readable() {
        let result = DistanceResult::new(1_000.0, 60.0, ProviderId::Approximation, 0);
        let mut output = Vec::new();
        render(&result, true, &mut output).expect("render succeeds");
        let decoded: DistanceResult =
            serde_json::from_slice(&output).expect("valid JSON payload");
        assert_eq!(decoded, result);
    }
}
