//! Build and solve the LP relaxation of a capacitated facility-location problem with vehicle costs.
//!
//! The pipeline is [`input::load`] (read an instance file), [`formulation::formulate`] (build the
//! LP) and [`solver::solve`] (hand it to `HiGHS`).
#![warn(missing_docs)]
pub mod cli;
pub mod formulation;
pub mod input;
pub mod instance;
pub mod log;
pub mod settings;
pub mod solver;

#[cfg(test)]
mod fixture;
