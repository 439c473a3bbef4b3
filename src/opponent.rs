// Opponent move inference from successive head positions
//
// The state belongs to one session and is advanced exactly once per snapshot.

use crate::types::{Direction, Position};

/// What we remember about the opponent between ticks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OpponentState {
    /// No head seen yet this session
    #[default]
    Uninitialized,
    Tracking {
        last_head: Position,
        /// Last direction inferred from a unit head delta
        last_direction: Option<Direction>,
    },
}

impl OpponentState {
    /// Advances the state with this tick's head position (if the head was found)
    ///
    /// A delta that is not a single unit step keeps the previously inferred
    /// direction; the stored head is replaced whenever a head was seen.
    pub fn observe(self, head: Option<Position>) -> OpponentState {
        let Some(head) = head else {
            return self;
        };

        match self {
            OpponentState::Uninitialized => OpponentState::Tracking {
                last_head: head,
                last_direction: None,
            },
            OpponentState::Tracking {
                last_head,
                last_direction,
            } => {
                let inferred = Direction::from_delta(head.x - last_head.x, head.y - last_head.y);
                OpponentState::Tracking {
                    last_head: head,
                    last_direction: inferred.or(last_direction),
                }
            }
        }
    }

    pub fn last_direction(&self) -> Option<Direction> {
        match self {
            OpponentState::Uninitialized => None,
            OpponentState::Tracking { last_direction, .. } => *last_direction,
        }
    }

    pub fn last_head(&self) -> Option<Position> {
        match self {
            OpponentState::Uninitialized => None,
            OpponentState::Tracking { last_head, .. } => Some(*last_head),
        }
    }
}

/// Owner of the per-session opponent state
#[derive(Debug, Clone, Default)]
pub struct OpponentTracker {
    state: OpponentState,
}

impl OpponentTracker {
    pub fn new() -> Self {
        OpponentTracker::default()
    }

    /// Feeds one tick's opponent head and returns the current inferred direction
    pub fn observe(&mut self, head: Option<Position>) -> Option<Direction> {
        self.state = self.state.observe(head);
        self.state.last_direction()
    }

    pub fn state(&self) -> OpponentState {
        self.state
    }

    pub fn last_direction(&self) -> Option<Direction> {
        self.state.last_direction()
    }

    pub fn last_head(&self) -> Option<Position> {
        self.state.last_head()
    }
}
