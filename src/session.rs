// One agent session per WebSocket connection
//
// The session owns everything that lives longer than a tick: the opponent
// state, the pacing delay and the session seed. Each tick draws from its own
// `StdRng` seeded with `seed + tick`, so a logged tick can be replayed alone.
// Ticks strictly alternate receive, decide, send; there is never more than one
// snapshot in flight.

use futures_util::{Sink, SinkExt, StreamExt};
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::{Duration, Instant};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::error::ProtocolError;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};

use crate::config::{Config, PacingConfig};
use crate::debug_logger::DebugLogger;
use crate::engine::{Decision, DecisionEngine, Strategy, TickContext};
use crate::grid::Bearings;
use crate::opponent::OpponentTracker;
use crate::types::{MoveCommand, ServerMessage, Snapshot, CONNECTED_MESSAGE};

/// Pre-send delay, optionally growing after every move
#[derive(Debug, Clone)]
pub struct Pacer {
    delay: Duration,
    increment: Duration,
    escalating: bool,
}

impl Pacer {
    pub fn new(config: &PacingConfig, escalating: bool) -> Self {
        Pacer {
            delay: config.base_delay(),
            increment: config.increment(),
            escalating,
        }
    }

    /// Delay to apply before the next send; escalates afterwards if enabled
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.delay;
        if self.escalating {
            self.delay += self.increment;
        }
        delay
    }

    pub fn current(&self) -> Duration {
        self.delay
    }
}

/// Result of handling one inbound frame
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// Server registered us under this name
    Joined { name: String },
    /// Any other server notice
    Notice(String),
    /// Send this move after waiting `delay`
    Move {
        command: MoveCommand,
        delay: Duration,
        decision: Decision,
    },
    /// Terminal snapshot; no further moves will be produced
    GameOver { winner: String },
    /// Nothing to do (undecodable frame, or the game is already over)
    Ignored,
}

/// Totals reported when a session ends
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    pub ticks: u64,
    pub moves_sent: u64,
    pub winner: Option<String>,
}

pub struct Session {
    agent_id: String,
    /// Identifier our cells carry on the map; the server-assigned name once known
    player: String,
    opponent_id: Option<String>,
    engine: DecisionEngine,
    tracker: OpponentTracker,
    pacer: Pacer,
    seed: u64,
    debug_logger: DebugLogger,
    tick: u64,
    moves_sent: u64,
    winner: Option<String>,
    finished: bool,
}

impl Session {
    /// Creates a new session
    ///
    /// # Arguments
    /// * `agent_id` - id used in the connection URL and in every move
    /// * `strategy` - move selection strategy for the whole session
    /// * `config` - agent and pacing configuration
    /// * `debug_logger` - per-tick JSONL logger (may be disabled)
    pub fn new(
        agent_id: &str,
        strategy: Strategy,
        config: &Config,
        debug_logger: DebugLogger,
    ) -> Self {
        Session {
            agent_id: agent_id.to_string(),
            player: agent_id.to_string(),
            opponent_id: config.agent.opponent_id.clone(),
            engine: DecisionEngine::new(strategy, config.agent.mirror_default_direction),
            tracker: OpponentTracker::new(),
            pacer: Pacer::new(&config.pacing, strategy.escalates_pacing()),
            seed: StdRng::from_os_rng().random(),
            debug_logger,
            tick: 0,
            moves_sent: 0,
            winner: None,
            finished: false,
        }
    }

    /// Replaces the session seed (random by default)
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn player(&self) -> &str {
        &self.player
    }

    pub fn tracker(&self) -> &OpponentTracker {
        &self.tracker
    }

    pub fn pacer(&self) -> &Pacer {
        &self.pacer
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            ticks: self.tick,
            moves_sent: self.moves_sent,
            winner: self.winner.clone(),
        }
    }

    /// Handles one text frame from the server
    pub fn handle_text(&mut self, text: &str) -> SessionEvent {
        if self.finished {
            return SessionEvent::Ignored;
        }

        match ServerMessage::decode(text) {
            Ok(ServerMessage::Notice(notice)) => {
                if notice.message == CONNECTED_MESSAGE {
                    if let Some(name) = notice.name.filter(|n| !n.is_empty()) {
                        self.player = name;
                    }
                    SessionEvent::Joined {
                        name: self.player.clone(),
                    }
                } else {
                    SessionEvent::Notice(notice.message)
                }
            }
            Ok(ServerMessage::Snapshot(snapshot)) => self.handle_snapshot(snapshot),
            Err(e) => {
                warn!("Skipping frame: {}", e);
                SessionEvent::Ignored
            }
        }
    }

    /// Runs one tick on a decoded snapshot
    pub fn handle_snapshot(&mut self, snapshot: Snapshot) -> SessionEvent {
        if self.finished {
            return SessionEvent::Ignored;
        }

        if snapshot.is_over() {
            let winner = snapshot.winner_label().unwrap_or_default();
            self.finished = true;
            self.winner = Some(winner.clone());
            return SessionEvent::GameOver { winner };
        }

        self.tick += 1;
        let start_time = Instant::now();

        let bearings = Bearings::locate(&snapshot, &self.player, self.opponent_id.as_deref());
        self.tracker.observe(bearings.opponent_head);

        let ctx = TickContext {
            grid: bearings.grid.as_ref(),
            head: bearings.head,
            opponent: &self.tracker,
        };
        let mut rng = StdRng::seed_from_u64(self.seed.wrapping_add(self.tick));
        let decision = self.engine.decide(&ctx, &mut rng);
        let delay = self.pacer.next_delay();

        info!(
            "Tick {}: {} chose {} ({:?}, {}us, delay {}ms)",
            self.tick,
            self.engine.strategy(),
            decision.direction,
            decision.reason,
            start_time.elapsed().as_micros(),
            delay.as_millis()
        );

        let mode = self.engine.strategy().mode_name();
        self.debug_logger.log_move(
            self.tick,
            &self.player,
            &mode,
            self.seed,
            snapshot,
            decision.direction,
        );

        SessionEvent::Move {
            command: MoveCommand {
                player_id: self.agent_id.clone(),
                direction: decision.direction,
            },
            delay,
            decision,
        }
    }

    /// Connects to `url` and plays until the game ends or the server hangs up
    pub async fn run(mut self, url: &str) -> Result<SessionSummary, String> {
        let (ws_stream, _) = connect_async(url)
            .await
            .map_err(|e| format!("Failed to connect to {}: {}", url, e))?;
        info!("Connected to WebSocket server at {}", url);

        let (mut sink, mut stream) = ws_stream.split();

        while let Some(frame) = stream.next().await {
            let frame = match frame {
                Ok(frame) => frame,
                Err(WsError::ConnectionClosed)
                | Err(WsError::AlreadyClosed)
                | Err(WsError::Protocol(ProtocolError::ResetWithoutClosingHandshake)) => {
                    info!("Disconnected from WebSocket server");
                    break;
                }
                Err(e) => return Err(format!("WebSocket receive failed: {}", e)),
            };

            let text = match &frame {
                Message::Text(_) | Message::Binary(_) => match frame.to_text() {
                    Ok(text) => text.to_string(),
                    Err(e) => {
                        warn!("Skipping non UTF-8 frame: {}", e);
                        continue;
                    }
                },
                Message::Close(_) => {
                    info!("Disconnected from WebSocket by server");
                    break;
                }
                _ => continue,
            };

            match self.handle_text(&text) {
                SessionEvent::Move { command, delay, .. } => {
                    self.send_move(&mut sink, &command, delay).await?;
                }
                SessionEvent::Joined { name } => {
                    info!("Agent connected with name '{}' and id '{}'", name, self.agent_id);
                }
                SessionEvent::Notice(message) => info!("Server notice: {}", message),
                SessionEvent::GameOver { winner } => {
                    info!("Game over! Winner: {}", winner);
                    break;
                }
                SessionEvent::Ignored => {}
            }
        }

        if let Err(e) = sink.close().await {
            debug!("Closing WebSocket: {}", e);
        }
        self.debug_logger.flush().await;

        Ok(self.summary())
    }

    /// Waits out the pacing delay, then sends the move
    async fn send_move<S>(
        &mut self,
        sink: &mut S,
        command: &MoveCommand,
        delay: Duration,
    ) -> Result<(), String>
    where
        S: Sink<Message, Error = WsError> + Unpin,
    {
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let payload = serde_json::to_string(command)
            .map_err(|e| format!("Failed to encode move: {}", e))?;
        sink.send(Message::Text(payload.into()))
            .await
            .map_err(|e| format!("Failed to send move: {}", e))?;

        self.moves_sent += 1;
        debug!("Sent move: {}", command.direction);
        Ok(())
    }
}
