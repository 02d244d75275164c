//! Genetic search over nurse rosters.
//!
//! A generic generational GA ([`GaRunner`] over the [`GaProblem`] and
//! [`Individual`] traits) plus the rostering encoding that plugs into it.
//!
//! # Encoding
//!
//! [`RosterChromosome`] is a flat slot table: one entry per
//! (date, ward, shift), each holding the nurse indices assigned there.
//! [`RosterProblem`] indexes the request once (eligible pools, hard
//! blocks, week buckets, per-nurse limits) so operators and evaluators
//! work on plain indices.
//!
//! # Submodules
//!
//! - [`operators`]: date-cut crossover, point mutations, repair
//!
//! # Reference
//! - Burke et al. (2004), "The State of the Art of Nurse Rostering"
//! - Aickelin & Dowsland (2004), "An indirect genetic algorithm for a nurse-scheduling problem"

mod chromosome;
mod factory;
mod fitness;
pub mod operators;
mod problem;
mod runner;
mod types;

pub use chromosome::RosterChromosome;
pub use factory::{IndividualFactory, WorkloadTracker};
pub use fitness::{fairness_score, FitnessEvaluator, FitnessReport, RosterFitness, SubScores};
pub use problem::{week_start_of, RosterProblem, SlotInfo};
pub use runner::{GaConfig, GaResult, GaRunner, GenerationStats, TerminationReason};
pub use types::{Fitness, GaProblem, Individual};
