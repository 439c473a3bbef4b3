// Replay module for analyzing logged ticks and debugging decision-making
//
// This module provides functionality to:
// 1. Parse JSONL debug logs
// 2. Replay the decision engine on historical snapshots
// 3. Compare logged vs replayed moves
// 4. Generate analysis reports
//
// Every tick is replayed with `StdRng::seed_from_u64(seed + tick)`, the same
// source the session drew from, using the seed recorded in the log entry unless
// an override is given.

use log::{info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::time::Instant;

use crate::config::Config;
use crate::debug_logger::DebugLogEntry;
use crate::engine::{DecisionEngine, DecisionReason, Strategy, TickContext};
use crate::grid::Bearings;
use crate::opponent::OpponentTracker;
use crate::types::Direction;

/// Log lines are exactly what the debug logger writes
pub type LogEntry = DebugLogEntry;

/// Result of replaying a single tick
#[derive(Debug, Clone)]
pub struct ReplayResult {
    pub tick: u64,
    pub original_move: Direction,
    pub replayed_move: Direction,
    pub matches: bool,
    pub reason: DecisionReason,
    pub computation_time_us: u128,
}

/// Statistics for a complete replay session
#[derive(Debug, Default)]
pub struct ReplayStats {
    pub total_ticks: usize,
    pub matches: usize,
    pub mismatches: usize,
    pub match_rate: f64,
}

/// Replay engine for analyzing debug logs
pub struct ReplayEngine {
    config: Config,
    verbose: bool,
    seed_override: Option<u64>,
}

impl ReplayEngine {
    /// Creates a new replay engine
    ///
    /// # Arguments
    /// * `seed_override` - base seed to use instead of each entry's logged seed;
    ///   tick `t` is replayed with `seed + t`
    pub fn new(config: Config, verbose: bool, seed_override: Option<u64>) -> Self {
        ReplayEngine {
            config,
            verbose,
            seed_override,
        }
    }

    /// Loads all log entries from a JSONL file, ordered by tick
    pub fn load_log_file<P: AsRef<Path>>(&self, log_path: P) -> Result<Vec<LogEntry>, String> {
        let file =
            File::open(log_path.as_ref()).map_err(|e| format!("Failed to open log file: {}", e))?;

        let reader = BufReader::new(file);
        let mut entries = Vec::new();

        for (line_num, line) in reader.lines().enumerate() {
            let line = line.map_err(|e| format!("Failed to read line {}: {}", line_num + 1, e))?;

            if line.trim().is_empty() {
                continue;
            }

            let entry: LogEntry = serde_json::from_str(&line)
                .map_err(|e| format!("Failed to parse JSON on line {}: {}", line_num + 1, e))?;

            entries.push(entry);
        }

        entries.sort_by_key(|e| e.tick);
        info!("Loaded {} log entries", entries.len());
        Ok(entries)
    }

    /// Rebuilds the opponent tracker as it stood after each logged tick
    ///
    /// Mirror decisions depend on every earlier snapshot, so this pass is
    /// sequential in tick order; the decisions themselves can then be replayed
    /// in parallel. The result is indexed like `entries`, whatever their order.
    pub fn opponent_history(&self, entries: &[LogEntry]) -> Vec<OpponentTracker> {
        let mut order: Vec<usize> = (0..entries.len()).collect();
        order.sort_by_key(|&i| entries[i].tick);

        let mut history = vec![OpponentTracker::new(); entries.len()];
        let mut tracker = OpponentTracker::new();
        for i in order {
            let bearings = Bearings::locate(
                &entries[i].snapshot,
                &entries[i].agent,
                self.config.agent.opponent_id.as_deref(),
            );
            tracker.observe(bearings.opponent_head);
            history[i] = tracker.clone();
        }
        history
    }

    /// Replays a single log entry against the given opponent state
    pub fn replay_entry(
        &self,
        entry: &LogEntry,
        tracker: &OpponentTracker,
    ) -> Result<ReplayResult, String> {
        let original_move = entry.chosen_move.parse::<Direction>()?;
        let strategy = entry.mode.parse::<Strategy>()?;
        let engine = DecisionEngine::new(strategy, self.config.agent.mirror_default_direction);

        let start_time = Instant::now();
        let bearings = Bearings::locate(
            &entry.snapshot,
            &entry.agent,
            self.config.agent.opponent_id.as_deref(),
        );
        let ctx = TickContext {
            grid: bearings.grid.as_ref(),
            head: bearings.head,
            opponent: tracker,
        };
        let seed = self.seed_override.unwrap_or(entry.seed);
        let mut rng = StdRng::seed_from_u64(seed.wrapping_add(entry.tick));
        let decision = engine.decide(&ctx, &mut rng);
        let computation_time_us = start_time.elapsed().as_micros();

        let result = ReplayResult {
            tick: entry.tick,
            original_move,
            replayed_move: decision.direction,
            matches: original_move == decision.direction,
            reason: decision.reason,
            computation_time_us,
        };

        if self.verbose {
            if result.matches {
                info!(
                    "Tick {}: ✓ MATCH - {} ({:?}, {}us)",
                    result.tick, result.replayed_move, result.reason, computation_time_us
                );
            } else {
                warn!(
                    "Tick {}: ✗ MISMATCH - Original: {}, Replayed: {} ({:?}, {}us)",
                    result.tick,
                    result.original_move,
                    result.replayed_move,
                    result.reason,
                    computation_time_us
                );
            }
        }

        Ok(result)
    }

    /// Replays all entries in a log file
    pub fn replay_all(&self, entries: &[LogEntry]) -> Result<Vec<ReplayResult>, String> {
        let history = self.opponent_history(entries);

        let results: Vec<Result<ReplayResult, String>> = entries
            .par_iter()
            .zip(history.par_iter())
            .map(|(entry, tracker)| self.replay_entry(entry, tracker))
            .collect();

        Ok(results
            .into_iter()
            .zip(entries)
            .filter_map(|(result, entry)| match result {
                Ok(result) => Some(result),
                Err(e) => {
                    warn!("Failed to replay tick {}: {}", entry.tick, e);
                    None
                }
            })
            .collect())
    }

    /// Replays specific ticks from a log file
    pub fn replay_ticks(
        &self,
        entries: &[LogEntry],
        tick_numbers: &[u64],
    ) -> Result<Vec<ReplayResult>, String> {
        let history = self.opponent_history(entries);
        let mut results = Vec::new();

        for tick in tick_numbers {
            let idx = entries
                .iter()
                .position(|e| e.tick == *tick)
                .ok_or_else(|| format!("Tick {} not found in log file", tick))?;

            match self.replay_entry(&entries[idx], &history[idx]) {
                Ok(result) => results.push(result),
                Err(e) => {
                    warn!("Failed to replay tick {}: {}", tick, e);
                }
            }
        }

        Ok(results)
    }

    /// Generates statistics from replay results
    pub fn generate_stats(&self, results: &[ReplayResult]) -> ReplayStats {
        let total_ticks = results.len();
        let matches = results.iter().filter(|r| r.matches).count();
        let mismatches = total_ticks - matches;
        let match_rate = if total_ticks > 0 {
            (matches as f64 / total_ticks as f64) * 100.0
        } else {
            0.0
        };

        ReplayStats {
            total_ticks,
            matches,
            mismatches,
            match_rate,
        }
    }

    /// Prints a detailed report of replay results
    pub fn print_report(&self, results: &[ReplayResult]) {
        let stats = self.generate_stats(results);

        println!("\n═══════════════════════════════════════════════════════════");
        println!("                    REPLAY REPORT");
        println!("═══════════════════════════════════════════════════════════");
        println!("Total Ticks:    {}", stats.total_ticks);
        println!("Matches:        {} ({:.1}%)", stats.matches, stats.match_rate);
        println!("Mismatches:     {}", stats.mismatches);
        println!("═══════════════════════════════════════════════════════════\n");

        if !results.is_empty() {
            let avg_time: f64 = results
                .iter()
                .map(|r| r.computation_time_us as f64)
                .sum::<f64>()
                / results.len() as f64;
            println!("Average Decision Time:      {:.1}us\n", avg_time);
        }

        let mismatches: Vec<_> = results.iter().filter(|r| !r.matches).collect();
        if !mismatches.is_empty() {
            println!("═══════════════════════════════════════════════════════════");
            println!("                  DETAILED MISMATCHES");
            println!("═══════════════════════════════════════════════════════════");

            for result in mismatches {
                println!(
                    "Tick {}: {} → {} ({:?})",
                    result.tick, result.original_move, result.replayed_move, result.reason
                );
            }
            println!();
        }
    }

    /// Validates that specific expected moves were made
    pub fn validate_expected_moves(
        &self,
        entries: &[LogEntry],
        expected_moves: &[(u64, Vec<Direction>)], // (tick, acceptable_moves)
    ) -> Result<(), String> {
        for (tick, acceptable) in expected_moves {
            let entry = entries
                .iter()
                .find(|e| e.tick == *tick)
                .ok_or_else(|| format!("Tick {} not found in log", tick))?;

            let actual_move = entry.chosen_move.parse::<Direction>()?;

            if !acceptable.contains(&actual_move) {
                return Err(format!(
                    "Tick {}: Expected one of {:?}, but got {}",
                    tick,
                    acceptable.iter().map(|d| d.as_str()).collect::<Vec<_>>(),
                    actual_move
                ));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CellDescriptor, Snapshot};

    fn entry(
        tick: u64,
        mode: &str,
        chosen: &str,
        map: Vec<Vec<Option<CellDescriptor>>>,
    ) -> LogEntry {
        LogEntry {
            tick,
            agent: "k".to_string(),
            mode: mode.to_string(),
            seed: 0,
            chosen_move: chosen.to_string(),
            snapshot: Snapshot {
                map: Some(map),
                ..Snapshot::default()
            },
            timestamp: "2026-01-01T00:00:00+00:00".to_string(),
        }
    }

    fn head(owner: &str) -> Option<CellDescriptor> {
        Some(CellDescriptor {
            kind: "snake-head".to_string(),
            player: Some(owner.to_string()),
        })
    }

    /// 3x3 board with our head in the corner and the opponent head at `at`
    fn mirror_entry(tick: u64, chosen: &str, at: (usize, usize)) -> LogEntry {
        let mut map = vec![vec![None; 3]; 3];
        map[0][0] = head("k");
        map[at.0][at.1] = head("l");
        entry(tick, "mirror", chosen, map)
    }

    fn engine() -> ReplayEngine {
        ReplayEngine::new(Config::default_hardcoded(), false, None)
    }

    #[test]
    fn test_generate_stats() {
        let engine = engine();
        let entries = vec![
            entry(1, "up", "up", vec![vec![head("k"), None]]),
            entry(2, "up", "left", vec![vec![head("k"), None]]),
        ];
        let results = engine.replay_all(&entries).unwrap();
        let stats = engine.generate_stats(&results);
        assert_eq!(stats.total_ticks, 2);
        assert_eq!(stats.matches, 1);
        assert_eq!(stats.mismatches, 1);
        assert!((stats.match_rate - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_opponent_history_follows_tick_order() {
        let engine = engine();
        let entries = vec![
            mirror_entry(1, "right", (0, 2)),
            mirror_entry(2, "down", (1, 2)),
        ];
        let history = engine.opponent_history(&entries);
        assert_eq!(history[0].last_direction(), None);
        assert_eq!(history[1].last_direction(), Some(Direction::Down));

        let results = engine.replay_all(&entries).unwrap();
        assert!(results.iter().all(|r| r.matches));
    }

    #[test]
    fn test_out_of_order_lines_replay_in_tick_order() {
        let engine = engine();
        // Opponent walks (0,2) -> (1,2) -> (2,2); ticks 2 and 3 written swapped
        let entries = vec![
            mirror_entry(1, "right", (0, 2)),
            mirror_entry(3, "down", (2, 2)),
            mirror_entry(2, "down", (1, 2)),
        ];

        let history = engine.opponent_history(&entries);
        assert_eq!(history[1].last_head(), Some(crate::types::Position::new(2, 2)));
        assert_eq!(history[2].last_head(), Some(crate::types::Position::new(1, 2)));

        let results = engine.replay_all(&entries).unwrap();
        assert_eq!(results.len(), 3);
        for result in &results {
            assert!(result.matches, "tick {} replayed {}", result.tick, result.replayed_move);
        }
    }

    #[test]
    fn test_load_log_file_sorts_by_tick() {
        let path = std::env::temp_dir().join(format!(
            "grid_agent_replay_order_{}.jsonl",
            std::process::id()
        ));
        let lines: Vec<String> = [3, 1, 2]
            .into_iter()
            .map(|tick| serde_json::to_string(&mirror_entry(tick, "right", (0, 2))).unwrap())
            .collect();
        std::fs::write(&path, lines.join("\n")).unwrap();

        let entries = engine().load_log_file(&path).unwrap();
        let ticks: Vec<u64> = entries.iter().map(|e| e.tick).collect();
        assert_eq!(ticks, vec![1, 2, 3]);

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_logged_seed_is_used_unless_overridden() {
        let mut entries: Vec<LogEntry> = (1..=20)
            .map(|tick| entry(tick, "random", "up", vec![vec![head("k"), None]]))
            .collect();
        for e in &mut entries {
            e.seed = 42;
        }

        let logged = engine().replay_all(&entries).unwrap();
        let forced = ReplayEngine::new(Config::default_hardcoded(), false, Some(42))
            .replay_all(&entries)
            .unwrap();
        let moves = |r: &[ReplayResult]| r.iter().map(|r| r.replayed_move).collect::<Vec<_>>();
        assert_eq!(moves(&logged), moves(&forced));

        let expected: Vec<Direction> = (1..=20u64)
            .map(|tick| {
                let mut rng = StdRng::seed_from_u64(42 + tick);
                crate::safety::SafetyPolicy::random_direction(&mut rng)
            })
            .collect();
        assert_eq!(moves(&logged), expected);
    }

    #[test]
    fn test_unknown_mode_is_skipped() {
        let entries = vec![entry(1, "dance", "up", vec![vec![head("k")]])];
        assert!(engine().replay_all(&entries).unwrap().is_empty());
    }
}
