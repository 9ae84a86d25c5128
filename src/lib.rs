//! Green Archipelago - phased land-use consolidation simulation

pub mod allocation;
pub mod core;
pub mod nodes;
pub mod phase;
pub mod prepare;
pub mod scoring;
pub mod simulation;
pub mod spatial;
pub mod store;
