//! Walk-forward pairs simulation.
//!
//! The engine consumes closes aligned to the common date axis and, for each
//! date and each pair in enumeration order:
//!
//! 1. Checks the trailing history covers the lookback
//! 2. Fits the hedge ratio and tests the spread on the trailing window
//! 3. Scores today's spread against the window baseline
//! 4. Asks the signal generator for an action and applies it
//!
//! After every date one equity sample is recorded.

pub mod accounting;
pub mod config;
pub mod events;
pub mod loop_runner;
pub mod state;

pub use accounting::{close_position, Settlement};
pub use config::{CapitalAllocation, EngineConfig, EngineError};
pub use events::{
    EngineEvent, EngineObserver, NullObserver, RecordingObserver, SkipReason, TracingObserver,
};
pub use loop_runner::{run_simulation, SimulationEngine};
pub use state::{EngineState, RunStats, SimulationResult};
