//! Palette-pins host simulator library: the pieces `main` wires to tokio.

pub mod simulator;

pub use simulator::Simulator;
