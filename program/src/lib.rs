// Prize Draw Engine
// A time-boxed prize draw: participants queue up and take turns claiming a
// random remaining prize slot while a round is open.

// Core modules
pub mod clock;
pub mod config;
pub mod error;
pub mod state;
pub mod utils;

// Draw modules
pub mod engine;
pub mod instruction;
pub mod processor;
pub mod queue;
pub mod round;
pub mod scheduler;
pub mod tokens;

// Collaborator seams
pub mod artifacts;
pub mod observer;
pub mod randomness;
pub mod storage;

pub use crate::config::Config;
pub use crate::engine::{DrawEngine, EngineBuilder, Retrieval, TurnOutcome};
pub use crate::error::DrawError;
pub use crate::scheduler::Sweeper;
