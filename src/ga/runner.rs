//! Generational GA loop.
//!
//! # Algorithm
//!
//! 1. Seed `population_size` individuals and evaluate them.
//! 2. Sort best-first and record [`GenerationStats`].
//! 3. Stop on success threshold, generation cap, time limit or stagnation.
//! 4. Otherwise carry the elites, then fill the rest of the next
//!    generation: tournament-select two parents, recombine with
//!    probability `crossover_rate`, mutate each child with probability
//!    `mutation_rate`, optionally repair.
//! 5. Evaluate the offspring and go to 2.
//!
//! All randomness comes from one `ChaCha8Rng`. Evaluation is the only
//! parallel step and consumes no randomness, so parallel and sequential
//! runs with the same seed are identical.
//!
//! # Reference
//! - Goldberg (1989), "Genetic Algorithms in Search, Optimization and Machine Learning"
//! - Eiben & Smith (2015), "Introduction to Evolutionary Computing", Ch. 3-5

use std::cmp::Ordering;
use std::time::{Duration, Instant};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::types::{Fitness, GaProblem, Individual};
use crate::config::SchedulerSettings;
use crate::error::{Result, RosterError};

/// GA parameters.
#[derive(Debug, Clone)]
pub struct GaConfig {
    pub population_size: usize,
    pub max_generations: usize,
    pub crossover_rate: f64,
    pub mutation_rate: f64,
    pub elite_count: usize,
    pub tournament_size: usize,
    pub success_threshold: f64,
    pub seed: Option<u64>,
    pub time_limit: Option<Duration>,
    pub stagnation_generations: Option<usize>,
    pub parallel: bool,
    pub repair: bool,
}

impl Default for GaConfig {
    fn default() -> Self {
        Self::from(&SchedulerSettings::default())
    }
}

impl From<&SchedulerSettings> for GaConfig {
    fn from(settings: &SchedulerSettings) -> Self {
        Self {
            population_size: settings.population_size,
            max_generations: settings.max_generations,
            crossover_rate: settings.crossover_rate,
            mutation_rate: settings.mutation_rate,
            elite_count: settings.elite_count(),
            tournament_size: settings.tournament_size,
            success_threshold: settings.success_threshold,
            seed: settings.seed,
            time_limit: settings.time_limit(),
            stagnation_generations: settings.stagnation_generations,
            parallel: settings.parallel,
            repair: settings.repair,
        }
    }
}

impl GaConfig {
    pub fn with_population_size(mut self, size: usize) -> Self {
        self.population_size = size;
        self
    }

    pub fn with_max_generations(mut self, generations: usize) -> Self {
        self.max_generations = generations;
        self
    }

    pub fn with_crossover_rate(mut self, rate: f64) -> Self {
        self.crossover_rate = rate;
        self
    }

    pub fn with_mutation_rate(mut self, rate: f64) -> Self {
        self.mutation_rate = rate;
        self
    }

    pub fn with_elite_count(mut self, count: usize) -> Self {
        self.elite_count = count;
        self
    }

    pub fn with_tournament_size(mut self, size: usize) -> Self {
        self.tournament_size = size;
        self
    }

    pub fn with_success_threshold(mut self, threshold: f64) -> Self {
        self.success_threshold = threshold;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_time_limit(mut self, limit: Duration) -> Self {
        self.time_limit = Some(limit);
        self
    }

    pub fn with_stagnation_generations(mut self, generations: usize) -> Self {
        self.stagnation_generations = Some(generations);
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn with_repair(mut self, repair: bool) -> Self {
        self.repair = repair;
        self
    }
}

/// Why the run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    /// Best individual reached the success threshold.
    Converged,
    GenerationLimit,
    TimeLimit,
    /// No improvement for the configured number of generations.
    Stagnated,
}

/// Per-generation convergence record.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenerationStats {
    pub generation: usize,
    pub best_fitness: f64,
    pub average_fitness: f64,
}

/// Outcome of a GA run.
#[derive(Debug, Clone)]
pub struct GaResult<I: Individual> {
    /// Best individual seen, evaluated.
    pub best: I,
    pub best_fitness: I::Fitness,
    /// Generations evolved after the initial population.
    pub generations: usize,
    /// One entry per evaluated generation, starting with the initial population.
    pub history: Vec<GenerationStats>,
    pub elapsed: Duration,
    pub termination: TerminationReason,
}

/// Runs the generational loop for any [`GaProblem`].
pub struct GaRunner;

impl GaRunner {
    /// Runs the GA to termination.
    ///
    /// # Errors
    /// Propagates the first evaluation error; returns
    /// [`RosterError::Internal`] for an empty population.
    pub fn run<P: GaProblem>(problem: &P, config: &GaConfig) -> Result<GaResult<P::Individual>> {
        let start = Instant::now();
        let size = config.population_size;
        if size == 0 {
            return Err(RosterError::Internal("population size is zero".into()));
        }
        let mut rng = match config.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_os_rng(),
        };

        let mut population: Vec<P::Individual> =
            (0..size).map(|_| problem.create_individual(&mut rng)).collect();
        evaluate_all(problem, &mut population, config.parallel)?;
        sort_best_first(&mut population);
        debug!(event = "population_seeded", population = size);

        let mut best = population[0].clone();
        let mut best_fitness = fitness_of(&best)?;
        let mut history = vec![stats(0, &population)];
        let mut generation = 0;
        let mut stagnant = 0;
        let elite_count = config.elite_count.min(size);

        let termination = loop {
            if best_fitness.reaches(config.success_threshold) {
                break TerminationReason::Converged;
            }
            if generation >= config.max_generations {
                break TerminationReason::GenerationLimit;
            }
            if config.time_limit.is_some_and(|limit| start.elapsed() >= limit) {
                break TerminationReason::TimeLimit;
            }
            if config.stagnation_generations.is_some_and(|limit| stagnant >= limit) {
                break TerminationReason::Stagnated;
            }
            generation += 1;

            let mut next: Vec<P::Individual> = population[..elite_count].to_vec();
            while next.len() < size {
                let parent1 = tournament(&population, config.tournament_size, &mut rng);
                let parent2 = tournament(&population, config.tournament_size, &mut rng);
                let children = if rng.random_bool(config.crossover_rate) {
                    problem.crossover(parent1, parent2, &mut rng)
                } else {
                    vec![parent1.clone(), parent2.clone()]
                };
                for mut child in children {
                    if next.len() >= size {
                        break;
                    }
                    if rng.random_bool(config.mutation_rate) {
                        problem.mutate(&mut child, &mut rng);
                    }
                    if config.repair {
                        problem.repair(&mut child, &mut rng);
                    }
                    next.push(child);
                }
            }

            evaluate_all(problem, &mut next, config.parallel)?;
            sort_best_first(&mut next);
            population = next;

            let leader = fitness_of(&population[0])?;
            if leader > best_fitness {
                best = population[0].clone();
                best_fitness = leader;
                stagnant = 0;
            } else {
                stagnant += 1;
            }

            let record = stats(generation, &population);
            debug!(
                event = "generation",
                generation,
                best = record.best_fitness,
                average = record.average_fitness,
            );
            history.push(record);
            problem.on_generation(generation, best_fitness);
        };

        Ok(GaResult {
            best,
            best_fitness,
            generations: generation,
            history,
            elapsed: start.elapsed(),
            termination,
        })
    }
}

fn evaluate_all<P: GaProblem>(
    problem: &P,
    population: &mut [P::Individual],
    parallel: bool,
) -> Result<()> {
    if parallel {
        population
            .par_iter_mut()
            .filter(|ind| ind.fitness().is_none())
            .try_for_each(|ind| problem.evaluate(ind))
    } else {
        population
            .iter_mut()
            .filter(|ind| ind.fitness().is_none())
            .try_for_each(|ind| problem.evaluate(ind))
    }
}

fn fitness_of<I: Individual>(individual: &I) -> Result<I::Fitness> {
    individual
        .fitness()
        .ok_or_else(|| RosterError::Internal("individual left unevaluated".into()))
}

/// Unevaluated individuals rank last; incomparable fitness counts as equal.
fn compare<I: Individual>(a: &I, b: &I) -> Ordering {
    match (a.fitness(), b.fitness()) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => Ordering::Equal,
    }
}

fn sort_best_first<I: Individual>(population: &mut [I]) {
    population.sort_by(|a, b| compare(b, a));
}

/// Tournament on a best-first population: the lowest drawn index wins.
fn tournament<'p, I, R: Rng>(population: &'p [I], size: usize, rng: &mut R) -> &'p I {
    let winner = (0..size.max(1))
        .map(|_| rng.random_range(0..population.len()))
        .min()
        .unwrap_or(0);
    &population[winner]
}

fn stats<I: Individual>(generation: usize, population: &[I]) -> GenerationStats {
    let scores: Vec<f64> = population
        .iter()
        .filter_map(|ind| ind.fitness().map(Fitness::to_f64))
        .collect();
    let average_fitness = if scores.is_empty() {
        0.0
    } else {
        scores.iter().sum::<f64>() / scores.len() as f64
    };
    GenerationStats {
        generation,
        best_fitness: scores.first().copied().unwrap_or(0.0),
        average_fitness,
    }
}
