//! Simulation driver, run output and synthetic input

pub mod driver;
pub mod output;
pub mod synthetic;

pub use driver::{phase_set_name, PhaseState, PreparedNodes, Simulation, ISLAND_NODES, SOURCE_NODES};
pub use output::{SimulationOutput, SimulationStats};
pub use synthetic::{generate_feed, SyntheticParams};
