// Standalone replay tool for analyzing grid agent debug logs
//
// Usage:
//   cargo run --bin replay -- <log_file> [options]
//
// Options:
//   --all                  Replay all ticks
//   --ticks <t1,t2>        Replay specific ticks (comma-separated)
//   --validate             Run validation mode with expected moves
//   --seed <n>             Override the seed recorded in the log
//   --verbose              Show detailed output for each tick
//   --config <path>        Path to Agent.toml (default: Agent.toml)

use std::env;
use std::process;

use grid_agent::config::Config;
use grid_agent::replay::ReplayEngine;
use grid_agent::types::Direction;

fn print_usage() {
    eprintln!("Grid Agent Replay Tool");
    eprintln!();
    eprintln!("USAGE:");
    eprintln!("  replay <log_file> [OPTIONS]");
    eprintln!();
    eprintln!("OPTIONS:");
    eprintln!("  --all                   Replay all ticks in the log");
    eprintln!("  --ticks <T1,T2,...>     Replay specific ticks (comma-separated)");
    eprintln!("  --validate <T:M,...>    Validate expected moves (format: tick:move,...)");
    eprintln!("  --seed <N>              Override the seed recorded in the log");
    eprintln!("  --verbose               Show detailed output for each tick");
    eprintln!("  --config <path>         Path to Agent.toml (default: Agent.toml)");
    eprintln!("  --help                  Show this help message");
    eprintln!();
    eprintln!("EXAMPLES:");
    eprintln!("  # Replay all ticks");
    eprintln!("  replay agent_debug.jsonl --all");
    eprintln!();
    eprintln!("  # Replay specific ticks");
    eprintln!("  replay agent_debug.jsonl --ticks 5,10,15");
    eprintln!();
    eprintln!("  # Validate expected moves");
    eprintln!("  replay agent_debug.jsonl --validate 5:up,10:right|down");
}

fn parse_ticks(s: &str) -> Result<Vec<u64>, String> {
    s.split(',')
        .map(|t| {
            t.trim()
                .parse::<u64>()
                .map_err(|e| format!("Invalid tick number '{}': {}", t, e))
        })
        .collect()
}

fn parse_expected_moves(s: &str) -> Result<Vec<(u64, Vec<Direction>)>, String> {
    s.split(',')
        .map(|pair| {
            let parts: Vec<&str> = pair.trim().split(':').collect();
            if parts.len() != 2 {
                return Err(format!("Invalid format '{}'. Expected 'tick:move'", pair));
            }

            let tick = parts[0]
                .parse::<u64>()
                .map_err(|e| format!("Invalid tick number '{}': {}", parts[0], e))?;

            // Support multiple acceptable moves separated by '|'
            let moves: Result<Vec<Direction>, String> =
                parts[1].split('|').map(|m| m.parse::<Direction>()).collect();

            Ok((tick, moves?))
        })
        .collect()
}

/// Value following a flag, or exit with an error
fn flag_value(args: &[String], i: usize, flag: &str) -> String {
    match args.get(i + 1) {
        Some(value) => value.clone(),
        None => {
            eprintln!("Error: {} requires an argument", flag);
            process::exit(1);
        }
    }
}

enum Mode {
    All,
    Ticks(String),
    Validate(String),
}

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 || args.contains(&"--help".to_string()) {
        print_usage();
        process::exit(if args.contains(&"--help".to_string()) {
            0
        } else {
            1
        });
    }

    let log_file = &args[1];
    let mut config_path = "Agent.toml".to_string();
    let mut verbose = false;
    let mut seed = None;
    let mut mode = None;

    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            "--all" => {
                mode = Some(Mode::All);
            }
            "--ticks" => {
                mode = Some(Mode::Ticks(flag_value(&args, i, "--ticks")));
                i += 1;
            }
            "--validate" => {
                mode = Some(Mode::Validate(flag_value(&args, i, "--validate")));
                i += 1;
            }
            "--seed" => {
                let value = flag_value(&args, i, "--seed");
                seed = Some(value.parse::<u64>().unwrap_or_else(|e| {
                    eprintln!("Error: Invalid seed '{}': {}", value, e);
                    process::exit(1);
                }));
                i += 1;
            }
            "--config" => {
                config_path = flag_value(&args, i, "--config");
                i += 1;
            }
            "--verbose" => {
                verbose = true;
            }
            _ => {
                eprintln!("Error: Unknown option '{}'", args[i]);
                print_usage();
                process::exit(1);
            }
        }
        i += 1;
    }

    let Some(mode) = mode else {
        eprintln!("Error: Must specify --all, --ticks, or --validate");
        print_usage();
        process::exit(1);
    };

    let config = Config::from_file(&config_path).unwrap_or_else(|e| {
        eprintln!("Warning: Could not load config from '{}': {}", config_path, e);
        eprintln!("Using default configuration");
        Config::default_hardcoded()
    });

    println!("Loaded configuration from: {}", config_path);
    println!("Replay log file: {}", log_file);
    println!();

    let engine = ReplayEngine::new(config, verbose, seed);

    let entries = match engine.load_log_file(log_file) {
        Ok(entries) => entries,
        Err(e) => {
            eprintln!("Error loading log file: {}", e);
            process::exit(1);
        }
    };

    if entries.is_empty() {
        eprintln!("Error: Log file is empty");
        process::exit(1);
    }

    println!("Loaded {} log entries\n", entries.len());

    match mode {
        Mode::All => {
            println!("Replaying all {} ticks...\n", entries.len());
            match engine.replay_all(&entries) {
                Ok(results) => engine.print_report(&results),
                Err(e) => {
                    eprintln!("Error during replay: {}", e);
                    process::exit(1);
                }
            }
        }
        Mode::Ticks(arg) => {
            let ticks = match parse_ticks(&arg) {
                Ok(t) => t,
                Err(e) => {
                    eprintln!("Error parsing ticks: {}", e);
                    process::exit(1);
                }
            };

            println!("Replaying {} specific tick(s)...\n", ticks.len());
            match engine.replay_ticks(&entries, &ticks) {
                Ok(results) => engine.print_report(&results),
                Err(e) => {
                    eprintln!("Error during replay: {}", e);
                    process::exit(1);
                }
            }
        }
        Mode::Validate(arg) => {
            let expected_moves = match parse_expected_moves(&arg) {
                Ok(m) => m,
                Err(e) => {
                    eprintln!("Error parsing expected moves: {}", e);
                    process::exit(1);
                }
            };

            println!("Validating {} expected move(s)...\n", expected_moves.len());
            match engine.validate_expected_moves(&entries, &expected_moves) {
                Ok(()) => println!("✓ All expected moves validated successfully!"),
                Err(e) => {
                    eprintln!("✗ Validation failed: {}", e);
                    process::exit(1);
                }
            }
        }
    }
}
