//! Core trait definitions for the GA engine.
//!
//! [`Individual`] and [`GaProblem`] form the contract between the
//! generational loop in [`GaRunner`](super::GaRunner) and a concrete
//! problem encoding.

use rand::Rng;

use crate::error::Result;

/// Fitness values. **Higher is better** (maximization).
///
/// Must be comparable and cheaply copyable. Incomparable values
/// (e.g. NaN scores) are treated as equal by the runner.
pub trait Fitness: PartialOrd + Copy + Send + Sync + std::fmt::Debug + 'static {
    /// Scalar view for logging and statistics.
    fn to_f64(self) -> f64;

    /// Whether this fitness satisfies the success threshold.
    fn reaches(self, threshold: f64) -> bool {
        self.to_f64() >= threshold
    }
}

impl Fitness for f64 {
    fn to_f64(self) -> f64 {
        self
    }
}

/// A candidate solution in the population.
///
/// Individuals carry their own evaluation. `None` means the individual
/// changed since it was last evaluated.
pub trait Individual: Clone + Send + Sync {
    /// The fitness type.
    type Fitness: Fitness;

    /// Current fitness, if evaluated.
    fn fitness(&self) -> Option<Self::Fitness>;

    /// Drops the stored evaluation after a structural change.
    fn invalidate(&mut self);
}

/// Defines a GA optimization problem.
///
/// 1. **Initialization**: create random individuals
/// 2. **Evaluation**: compute and store fitness (fallible; an error aborts the run)
/// 3. **Crossover**: recombine two parents
/// 4. **Mutation**: perturb an individual
/// 5. **Repair**: restore hard constraints after variation
///
/// `GaProblem` must be `Send + Sync` because the runner may evaluate the
/// population in parallel with rayon.
pub trait GaProblem: Send + Sync {
    /// The individual type for this problem.
    type Individual: Individual;

    /// Creates a random individual.
    fn create_individual<R: Rng>(&self, rng: &mut R) -> Self::Individual;

    /// Evaluates an individual and stores the result on it.
    fn evaluate(&self, individual: &mut Self::Individual) -> Result<()>;

    /// Produces offspring from two parents. Must return at least one child.
    ///
    /// The default implementation clones both parents.
    fn crossover<R: Rng>(
        &self,
        parent1: &Self::Individual,
        parent2: &Self::Individual,
        _rng: &mut R,
    ) -> Vec<Self::Individual> {
        vec![parent1.clone(), parent2.clone()]
    }

    /// Mutates an individual in place. Returns `true` if it changed.
    fn mutate<R: Rng>(&self, _individual: &mut Self::Individual, _rng: &mut R) -> bool {
        false
    }

    /// Repairs hard-constraint breaches. Returns `true` if it changed.
    fn repair<R: Rng>(&self, _individual: &mut Self::Individual, _rng: &mut R) -> bool {
        false
    }

    /// Called at the end of each generation with the current best fitness.
    fn on_generation(&self, _generation: usize, _best: <Self::Individual as Individual>::Fitness) {}
}
