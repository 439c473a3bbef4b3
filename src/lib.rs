// Library exports for the grid agent
// This allows the replay tool and integration tests to use the core decision logic

pub mod config;
pub mod debug_logger;
pub mod engine;
pub mod grid;
pub mod opponent;
pub mod pathfinder;
pub mod replay;
pub mod safety;
pub mod session;
pub mod types;
