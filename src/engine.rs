// Per-tick decision engine
//
// Turns one located snapshot into exactly one direction. Every strategy ends
// in a direction: when a strategy has nothing to say it falls through to the
// evasive choice, which itself falls back to a random direction.

use log::debug;
use rand::Rng;
use std::fmt;
use std::str::FromStr;

use crate::grid::Grid;
use crate::opponent::OpponentTracker;
use crate::pathfinder::PathFinder;
use crate::safety::{SafetyChoice, SafetyPolicy};
use crate::types::{Direction, Position};

/// Move selection strategy, chosen once per session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Always the same direction, whatever the board says
    Fixed(Direction),
    /// Uniformly random direction every tick
    Random,
    /// Repeat the opponent's last inferred move
    Mirror,
    /// First safe neighbor in random order
    Evade,
    /// Shortest path toward the nearest apple
    SeekGoal,
    /// Fixed (`Some`) or random (`None`) with a send delay that grows every tick
    EscalatingDelay(Option<Direction>),
}

impl Strategy {
    /// Whether the session should grow its pacing delay after each move
    pub fn escalates_pacing(&self) -> bool {
        matches!(self, Strategy::EscalatingDelay(_))
    }

    /// Mode string as accepted on the command line
    pub fn mode_name(&self) -> String {
        match self {
            Strategy::Fixed(dir) => dir.as_str().to_string(),
            Strategy::Random => "random".to_string(),
            Strategy::Mirror => "mirror".to_string(),
            Strategy::Evade => "survive".to_string(),
            Strategy::SeekGoal => "apple".to_string(),
            Strategy::EscalatingDelay(None) => "timeout".to_string(),
            Strategy::EscalatingDelay(Some(dir)) => format!("timeout-{}", dir.as_str()),
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.mode_name())
    }
}

impl FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mode = s.trim().to_lowercase();
        match mode.as_str() {
            "random" => Ok(Strategy::Random),
            "mirror" => Ok(Strategy::Mirror),
            "survive" | "evade" => Ok(Strategy::Evade),
            "apple" | "seek" => Ok(Strategy::SeekGoal),
            "timeout" => Ok(Strategy::EscalatingDelay(None)),
            _ => {
                if let Some(dir) = mode.strip_prefix("timeout-") {
                    return dir
                        .parse::<Direction>()
                        .map(|d| Strategy::EscalatingDelay(Some(d)))
                        .map_err(|_| format!("Invalid mode: {}", s));
                }
                mode.parse::<Direction>()
                    .map(Strategy::Fixed)
                    .map_err(|_| format!("Invalid mode: {}", s))
            }
        }
    }
}

/// Why a direction was chosen, for logs and replay reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionReason {
    Configured,
    Random,
    Mirrored,
    /// Mirror strategy before any opponent move was inferred
    MirrorDefault,
    /// First step of the shortest path to a goal
    Route { distance: usize },
    /// A safe neighbor picked by the evasive policy
    Evaded,
    /// No safe neighbor, or no usable board; random direction
    Cornered,
}

/// One tick's output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub direction: Direction,
    pub reason: DecisionReason,
}

/// Inputs of one decision; borrowed for the duration of the tick
#[derive(Debug, Clone, Copy)]
pub struct TickContext<'a> {
    /// `None` when the snapshot was malformed
    pub grid: Option<&'a Grid>,
    /// Our head, if it was found on the map
    pub head: Option<Position>,
    pub opponent: &'a OpponentTracker,
}

/// Decision engine with the session's strategy
///
/// Holds configuration only; the opponent state it reads is owned by the session.
#[derive(Debug, Clone)]
pub struct DecisionEngine {
    strategy: Strategy,
    mirror_default: Direction,
}

impl DecisionEngine {
    /// Creates a new engine
    ///
    /// # Arguments
    /// * `strategy` - move selection strategy for the whole session
    /// * `mirror_default` - direction the mirror strategy uses before the
    ///   opponent's first inferred move
    pub fn new(strategy: Strategy, mirror_default: Direction) -> Self {
        DecisionEngine {
            strategy,
            mirror_default,
        }
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    /// Chooses this tick's direction. Never fails.
    pub fn decide<R: Rng>(&self, ctx: &TickContext<'_>, rng: &mut R) -> Decision {
        match self.strategy {
            Strategy::Fixed(direction) | Strategy::EscalatingDelay(Some(direction)) => Decision {
                direction,
                reason: DecisionReason::Configured,
            },
            Strategy::Random | Strategy::EscalatingDelay(None) => Decision {
                direction: SafetyPolicy::random_direction(rng),
                reason: DecisionReason::Random,
            },
            Strategy::Mirror => match ctx.opponent.last_direction() {
                Some(direction) => Decision {
                    direction,
                    reason: DecisionReason::Mirrored,
                },
                None => Decision {
                    direction: self.mirror_default,
                    reason: DecisionReason::MirrorDefault,
                },
            },
            Strategy::Evade => Self::evade(ctx, rng),
            Strategy::SeekGoal => Self::seek_goal(ctx, rng),
        }
    }

    fn evade<R: Rng>(ctx: &TickContext<'_>, rng: &mut R) -> Decision {
        match SafetyPolicy::evasive_choice(ctx.grid, ctx.head, rng) {
            SafetyChoice::Safe(direction) => Decision {
                direction,
                reason: DecisionReason::Evaded,
            },
            SafetyChoice::Fallback(direction) => Decision {
                direction,
                reason: DecisionReason::Cornered,
            },
        }
    }

    /// Path toward the nearest goal, re-validating the first step against the
    /// current board before committing to it
    fn seek_goal<R: Rng>(ctx: &TickContext<'_>, rng: &mut R) -> Decision {
        let (Some(grid), Some(head)) = (ctx.grid, ctx.head) else {
            return Self::evade(ctx, rng);
        };

        match PathFinder::nearest_goal(grid, head) {
            Some(route) if SafetyPolicy::is_safe(grid, head, route.first_step) => {
                debug!(
                    "Route to goal at {}: {} moves, first {} ({} goals on board)",
                    route.goal,
                    route.distance,
                    route.first_step,
                    grid.goal_count()
                );
                Decision {
                    direction: route.first_step,
                    reason: DecisionReason::Route {
                        distance: route.distance,
                    },
                }
            }
            Some(route) => {
                debug!("First step {} toward {} is unsafe, evading", route.first_step, route.goal);
                Self::evade(ctx, rng)
            }
            None => Self::evade(ctx, rng),
        }
    }
}
