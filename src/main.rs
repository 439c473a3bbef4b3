// Grid agent entry point
//
// Usage:
//   grid-agent [AGENT_ID] [MODE] [--config <path>] [--seed <n>]
//
// Connects to the game server as AGENT_ID and plays MODE until the game ends.

use log::{error, info, warn};
use std::env;
use std::process;

use grid_agent::config::Config;
use grid_agent::debug_logger::DebugLogger;
use grid_agent::engine::Strategy;
use grid_agent::session::Session;
use grid_agent::types::Direction;

fn print_usage() {
    eprintln!("Grid Agent");
    eprintln!();
    eprintln!("USAGE:");
    eprintln!("  grid-agent [AGENT_ID] [MODE] [OPTIONS]");
    eprintln!();
    eprintln!("MODES:");
    eprintln!("  up | down | left | right    Always move in that direction");
    eprintln!("  random                      Random direction every tick");
    eprintln!("  mirror                      Repeat the opponent's last move");
    eprintln!("  survive                     Move to any safe neighbor");
    eprintln!("  apple                       Path toward the nearest apple");
    eprintln!("  timeout[-<direction>]       Random (or fixed) with a growing send delay");
    eprintln!();
    eprintln!("OPTIONS:");
    eprintln!("  --config <path>         Path to Agent.toml (default: Agent.toml)");
    eprintln!("  --seed <N>              Session seed for random choices (default: random)");
    eprintln!("  --help                  Show this help message");
}

/// Parses the mode, falling back to the configured default like the server's
/// reference clients do
fn resolve_strategy(mode: Option<&str>, config: &Config) -> Strategy {
    let default = || {
        config
            .agent
            .default_mode
            .parse::<Strategy>()
            .unwrap_or(Strategy::Fixed(Direction::Up))
    };

    match mode {
        Some(mode) => mode.parse::<Strategy>().unwrap_or_else(|e| {
            warn!("{}, using default: {}", e, config.agent.default_mode);
            default()
        }),
        None => {
            warn!("Mode not provided, using default: {}", config.agent.default_mode);
            default()
        }
    }
}

#[tokio::main]
async fn main() {
    // We default to 'info' level logging. But if the `RUST_LOG` environment variable is set,
    // we keep that value instead.
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info");
    }

    env_logger::init();

    let args: Vec<String> = env::args().skip(1).collect();

    if args.contains(&"--help".to_string()) {
        print_usage();
        process::exit(0);
    }

    let mut config_path: Option<String> = None;
    let mut seed: Option<u64> = None;
    let mut positional = Vec::new();

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--config" => {
                if i + 1 >= args.len() {
                    eprintln!("Error: --config requires an argument");
                    process::exit(1);
                }
                config_path = Some(args[i + 1].clone());
                i += 1;
            }
            "--seed" => {
                let Some(value) = args.get(i + 1) else {
                    eprintln!("Error: --seed requires an argument");
                    process::exit(1);
                };
                seed = Some(value.parse().unwrap_or_else(|e| {
                    eprintln!("Error: Invalid seed '{}': {}", value, e);
                    process::exit(1);
                }));
                i += 1;
            }
            other if other.starts_with("--") => {
                eprintln!("Error: Unknown option '{}'", other);
                print_usage();
                process::exit(1);
            }
            other => positional.push(other.to_string()),
        }
        i += 1;
    }

    let config = match config_path {
        Some(path) => Config::from_file(&path).unwrap_or_else(|e| {
            eprintln!("Warning: Could not load config from '{}': {}", path, e);
            eprintln!("Using default configuration");
            Config::default_hardcoded()
        }),
        None => Config::load_or_default(),
    };

    let agent_id = positional
        .first()
        .cloned()
        .unwrap_or_else(|| config.agent.default_id.clone());
    let strategy = resolve_strategy(positional.get(1).map(String::as_str), &config);

    info!("Starting agent with ID: {}, Mode: {}", agent_id, strategy);

    let debug_logger = DebugLogger::new(config.debug.enabled, &config.debug.log_file_path).await;
    let mut session = Session::new(&agent_id, strategy, &config, debug_logger);
    if let Some(seed) = seed {
        session = session.with_seed(seed);
    }
    info!("Session seed: {}", session.seed());
    let url = config.connection.url_for(&agent_id);

    match session.run(&url).await {
        Ok(summary) => {
            info!(
                "Session ended after {} ticks, {} moves sent (winner: {})",
                summary.ticks,
                summary.moves_sent,
                summary.winner.as_deref().unwrap_or("none")
            );
        }
        Err(e) => {
            error!("Session failed: {}", e);
            process::exit(1);
        }
    }
}
