//! World simulation engine.
//!
//! This module implements the toroidal grid where prey and predators move,
//! eat, starve and breed, one randomly ordered tick at a time.

pub mod grid;
pub mod agent;
pub mod population;
pub mod behavior;
pub mod scheduler;
pub mod simulation;

pub use grid::Grid;
pub use agent::{Agent, AgentState};
pub use population::Population;
pub use behavior::StepOutcome;
pub use scheduler::Scheduler;
pub use simulation::{Simulation, TickReport};
