// tradeval entry point.
//
// 1. Parse the command line
// 2. Load config (thresholds, fallback slots, log filter)
// 3. Initialize tracing (stderr; stdout carries only JSON)
// 4. Read and normalize the trade request
// 5. Run the requested command and print its JSON

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing::{debug, info};

use tradeval_core::config::{self, Config};
use tradeval_core::evaluate::{resolve_slots, score_population};
use tradeval_core::import::load_pool;
use tradeval_core::league::extract_categories;
use tradeval_core::roster::split_roster;
use tradeval_core::{
    evaluate_trade, PreparedRequest, SlotLabel, SlotRequirements, TradeEvaluation,
};

#[derive(Parser)]
#[command(name = "tradeval")]
#[command(about = "Evaluate fantasy hockey trades against each team's best lineup")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate a proposed trade and print the verdict
    Evaluate {
        /// Trade request JSON (league settings, rosters, free agents, traded keys)
        #[arg(short, long)]
        input: PathBuf,

        /// Extra free agents from a CSV export
        #[arg(long)]
        free_agents: Option<PathBuf>,

        /// Lowest impact either side may take
        #[arg(long, allow_hyphen_values = true)]
        loss_tol: Option<f64>,

        /// Impact at least one side must reach
        #[arg(long, allow_hyphen_values = true)]
        gain_min: Option<f64>,

        /// Largest allowed gap between the two impacts
        #[arg(long)]
        imbalance_max: Option<f64>,

        /// Pretty-print the JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Print one team's valued starters and bench
    Lineup {
        /// Trade request JSON
        #[arg(short, long)]
        input: PathBuf,

        /// Which roster to show
        #[arg(long, value_enum)]
        team: Team,

        /// Extra free agents from a CSV export (changes the valuation population)
        #[arg(long)]
        free_agents: Option<PathBuf>,

        /// Pretty-print the JSON output
        #[arg(long)]
        pretty: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Team {
    A,
    B,
}

// ---------------------------------------------------------------------------
// Output shapes
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct EvaluateResponse<'a> {
    #[serde(flatten)]
    evaluation: &'a TradeEvaluation,
    evaluated_at: String,
}

#[derive(Serialize)]
struct LineupEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    slot: Option<SlotLabel>,
    player_key: String,
    name: String,
    value: f64,
}

#[derive(Serialize)]
struct LineupResponse {
    team: &'static str,
    slots: SlotRequirements,
    starters: Vec<LineupEntry>,
    bench: Vec<LineupEntry>,
    starting_value: f64,
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = config::load_config().context("failed to load configuration")?;
    init_tracing(&config.logging.filter)?;
    match &config.source {
        Some(path) => debug!("config loaded from {}", path.display()),
        None => debug!("using built-in configuration"),
    }

    match cli.command {
        Commands::Evaluate {
            input,
            free_agents,
            loss_tol,
            gain_min,
            imbalance_max,
            pretty,
        } => {
            let thresholds = config
                .thresholds
                .with_overrides(loss_tol, gain_min, imbalance_max);
            config::validate_thresholds(&thresholds).context("invalid threshold override")?;

            let request = load_request(&input, free_agents.as_deref())?;
            let inputs = request.inputs(Some(&config.fallback_slots));
            let evaluation =
                evaluate_trade(&inputs, &thresholds).context("trade could not be evaluated")?;

            let response = EvaluateResponse {
                evaluation: &evaluation,
                evaluated_at: chrono::Utc::now().to_rfc3339(),
            };
            print_json(&response, pretty)
        }
        Commands::Lineup {
            input,
            team,
            free_agents,
            pretty,
        } => {
            let request = load_request(&input, free_agents.as_deref())?;
            let response = build_lineup(&request, team, &config)?;
            print_json(&response, pretty)
        }
    }
}

fn load_request(input: &Path, free_agents: Option<&Path>) -> anyhow::Result<PreparedRequest> {
    let mut request = PreparedRequest::load(input)?;

    if let Some(path) = free_agents {
        let pool = load_pool(path).context("failed to load free-agent CSV")?;
        info!("loaded {} free agents from {}", pool.len(), path.display());
        request.free_agents.extend(pool);
    }

    Ok(request)
}

fn build_lineup(
    request: &PreparedRequest,
    team: Team,
    config: &Config,
) -> anyhow::Result<LineupResponse> {
    let settings = request
        .league_settings
        .as_ref()
        .filter(|s| !s.is_null())
        .context("trade request has no league settings")?;
    let (label, roster_a, roster_b) = match team {
        Team::A => ("A", &request.team_a, &request.team_b),
        Team::B => ("B", &request.team_b, &request.team_a),
    };
    let roster = roster_a
        .as_deref()
        .with_context(|| format!("trade request has no roster for team {label}"))?;
    let other = roster_b.as_deref().unwrap_or_default();

    let slots = resolve_slots(settings, Some(&config.fallback_slots));
    let valued = score_population(
        &extract_categories(settings),
        roster,
        other,
        &request.free_agents,
    );
    let split = split_roster(&valued.team_a, &slots);

    Ok(LineupResponse {
        team: label,
        starting_value: split.starting_value(),
        starters: split
            .starters
            .iter()
            .map(|a| LineupEntry {
                slot: Some(a.slot.clone()),
                player_key: a.player.player_key.clone(),
                name: a.player.name.clone(),
                value: a.player.value,
            })
            .collect(),
        bench: split
            .bench
            .iter()
            .map(|p| LineupEntry {
                slot: None,
                player_key: p.player_key.clone(),
                name: p.name.clone(),
                value: p.value,
            })
            .collect(),
        slots,
    })
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> anyhow::Result<()> {
    let text = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{text}");
    Ok(())
}

/// Initialize tracing to stderr. `RUST_LOG` wins over the configured filter.
fn init_tracing(filter: &str) -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture(name: &str) -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("../tradeval-core/tests/fixtures")
            .join(name)
    }

    #[test]
    fn parses_evaluate_with_negative_override() {
        let cli = Cli::try_parse_from([
            "tradeval",
            "evaluate",
            "--input",
            "req.json",
            "--loss-tol",
            "-0.5",
            "--pretty",
        ])
        .unwrap();
        match cli.command {
            Commands::Evaluate {
                input,
                loss_tol,
                gain_min,
                pretty,
                ..
            } => {
                assert_eq!(input, PathBuf::from("req.json"));
                assert_eq!(loss_tol, Some(-0.5));
                assert_eq!(gain_min, None);
                assert!(pretty);
            }
            _ => panic!("expected evaluate"),
        }
    }

    #[test]
    fn lineup_requires_team() {
        assert!(Cli::try_parse_from(["tradeval", "lineup", "--input", "req.json"]).is_err());
        let cli =
            Cli::try_parse_from(["tradeval", "lineup", "-i", "req.json", "--team", "b"]).unwrap();
        assert!(matches!(cli.command, Commands::Lineup { team: Team::B, .. }));
    }

    #[test]
    fn lineup_for_fixture_team() {
        let request = load_request(&fixture("trade_approve.json"), None).unwrap();
        let lineup = build_lineup(&request, Team::B, &Config::default()).unwrap();

        assert_eq!(lineup.team, "B");
        assert_eq!(lineup.starters.len(), 7);
        assert_eq!(lineup.bench.len(), 1);
        assert_eq!(lineup.bench[0].player_key, "nhl.p.2007");
        assert!((lineup.starting_value - 6.1238).abs() < 1e-6);
    }

    #[test]
    fn csv_free_agents_are_appended() {
        let request = load_request(
            &fixture("trade_approve.json"),
            Some(fixture("free_agents.csv").as_path()),
        )
        .unwrap();
        assert_eq!(request.free_agents.len(), 8);
    }

    #[test]
    fn response_carries_timestamp_next_to_evaluation() {
        let request = load_request(&fixture("trade_review.json"), None).unwrap();
        let config = Config::default();
        let evaluation = evaluate_trade(
            &request.inputs(Some(&config.fallback_slots)),
            &config.thresholds,
        )
        .unwrap();
        let response = EvaluateResponse {
            evaluation: &evaluation,
            evaluated_at: chrono::Utc::now().to_rfc3339(),
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["verdict"]["status"], "REVIEW");
        assert!(json["evaluated_at"].as_str().is_some_and(|s| s.contains('T')));
    }
}
