//! Run settings.
//!
//! [`SchedulerSettings`] drives one optimization run: search parameters,
//! fitness weights, toggles, and the [`EvaluatorPolicy`] that collects
//! every default the evaluator would otherwise assume silently.
//!
//! Settings can be built in code or loaded from TOML:
//!
//! ```
//! use u_roster::config::SchedulerSettings;
//!
//! let settings = SchedulerSettings::from_toml_str(r#"
//!     population_size = 60
//!     max_generations = 150
//!     seed = 7
//!
//!     [weights]
//!     coverage = 0.5
//!     fairness = 0.2
//!     preferences = 0.1
//!     constraints = 0.1
//!     qualifications = 0.1
//!
//!     [policy]
//!     qualification_policy = "all"
//!     week_start = "Sun"
//! "#).unwrap();
//!
//! assert_eq!(settings.population_size, 60);
//! assert_eq!(settings.seed, Some(7));
//! assert!(settings.validate().is_ok());
//! ```

use std::path::Path;
use std::time::Duration;

use chrono::Weekday;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::models::{Nurse, Severity};

/// Settings for one optimization run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerSettings {
    /// Individuals per generation.
    pub population_size: usize,
    /// Generation cap.
    pub max_generations: usize,
    /// Probability that two parents are recombined.
    pub crossover_rate: f64,
    /// Probability that an offspring is mutated.
    pub mutation_rate: f64,
    /// Fraction of the population copied unchanged into the next generation.
    pub elite_rate: f64,
    /// Individuals drawn per tournament.
    pub tournament_size: usize,
    /// Stop once the best feasible fitness reaches this value (0..1).
    pub success_threshold: f64,
    /// RNG seed. `None` seeds from OS entropy.
    pub seed: Option<u64>,
    /// Wall-clock limit in seconds.
    pub time_limit_secs: Option<u64>,
    /// Stop after this many generations without improvement.
    pub stagnation_generations: Option<usize>,
    /// Evaluate fitness across the population in parallel.
    pub parallel: bool,
    /// Run the repair pass on every offspring.
    pub repair: bool,
    /// Treat weekday availability as a hard filter.
    pub enforce_availability: bool,
    /// Allow weekly overtime up to each nurse's overtime limit.
    pub allow_overtime: bool,
    /// Sub-score weights.
    pub weights: FitnessWeights,
    /// Evaluator defaults and policies.
    pub policy: EvaluatorPolicy,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            population_size: 100,
            max_generations: 200,
            crossover_rate: 0.8,
            mutation_rate: 0.2,
            elite_rate: 0.1,
            tournament_size: 5,
            success_threshold: 0.95,
            seed: None,
            time_limit_secs: None,
            stagnation_generations: None,
            parallel: true,
            repair: true,
            enforce_availability: true,
            allow_overtime: false,
            weights: FitnessWeights::default(),
            policy: EvaluatorPolicy::default(),
        }
    }
}

impl SchedulerSettings {
    /// Creates default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads settings from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Parses settings from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

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

    pub fn with_elite_rate(mut self, rate: f64) -> Self {
        self.elite_rate = rate;
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

    pub fn with_time_limit_secs(mut self, secs: u64) -> Self {
        self.time_limit_secs = Some(secs);
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

    pub fn with_enforce_availability(mut self, enforce: bool) -> Self {
        self.enforce_availability = enforce;
        self
    }

    pub fn with_allow_overtime(mut self, allow: bool) -> Self {
        self.allow_overtime = allow;
        self
    }

    pub fn with_weights(mut self, weights: FitnessWeights) -> Self {
        self.weights = weights;
        self
    }

    pub fn with_policy(mut self, policy: EvaluatorPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Wall-clock limit, if any.
    pub fn time_limit(&self) -> Option<Duration> {
        self.time_limit_secs.map(Duration::from_secs)
    }

    /// Number of elites carried per generation.
    pub fn elite_count(&self) -> usize {
        ((self.population_size as f64 * self.elite_rate).round() as usize).min(self.population_size)
    }

    /// Checks ranges and weights.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.population_size == 0 {
            return Err(ConfigError::Invalid("population_size must be at least 1".into()));
        }
        if self.tournament_size == 0 {
            return Err(ConfigError::Invalid("tournament_size must be at least 1".into()));
        }
        for (name, rate) in [
            ("crossover_rate", self.crossover_rate),
            ("mutation_rate", self.mutation_rate),
            ("elite_rate", self.elite_rate),
            ("success_threshold", self.success_threshold),
        ] {
            if !(0.0..=1.0).contains(&rate) {
                return Err(ConfigError::Invalid(format!(
                    "{name} must be within [0, 1], got {rate}"
                )));
            }
        }
        self.weights.validate()?;
        self.policy.validate()
    }
}

/// Weights of the five fitness sub-scores.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FitnessWeights {
    pub coverage: f64,
    pub fairness: f64,
    pub preferences: f64,
    pub constraints: f64,
    pub qualifications: f64,
}

impl Default for FitnessWeights {
    fn default() -> Self {
        Self {
            coverage: 0.30,
            fairness: 0.25,
            preferences: 0.20,
            constraints: 0.15,
            qualifications: 0.10,
        }
    }
}

impl FitnessWeights {
    /// Sum of all weights.
    pub fn total(&self) -> f64 {
        self.coverage + self.fairness + self.preferences + self.constraints + self.qualifications
    }

    /// Weights must be non-negative and not all zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let all = [
            self.coverage,
            self.fairness,
            self.preferences,
            self.constraints,
            self.qualifications,
        ];
        if all.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(ConfigError::Invalid(
                "fitness weights must be finite and non-negative".into(),
            ));
        }
        if self.total() <= 0.0 {
            return Err(ConfigError::Invalid("fitness weights must not all be zero".into()));
        }
        Ok(())
    }
}

/// How a nurse's qualifications are matched against a ward's requirements.
///
/// Applied identically by the eligibility filter and the qualification sub-score.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualificationPolicy {
    /// At least one required qualification.
    #[default]
    Any,
    /// Every required qualification.
    All,
}

/// Evaluator defaults and policy choices.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluatorPolicy {
    /// Nurses without availability data for a weekday count as available.
    pub assume_available_without_data: bool,
    /// Assignments on days without stated preferences count as satisfied.
    pub neutral_without_preferences: bool,
    /// Qualification matching rule.
    pub qualification_policy: QualificationPolicy,
    /// Fill starved slots with nurses that would breach soft limits.
    pub allow_constraint_override_on_starvation: bool,
    /// First weekday of each weekly-hours bucket.
    pub week_start: Weekday,
    /// Check rest time between consecutive shifts.
    pub check_rest_period: bool,
    pub default_max_consecutive_nights: u32,
    pub default_max_weekly_hours: u32,
    pub default_max_overtime_hours: u32,
    pub default_min_rest_hours: u32,
    pub default_max_consecutive_days: u32,
    pub default_min_days_off_per_week: u32,
    /// Violation mass at which the constraint sub-score reaches zero.
    /// `None` derives it from the number of required slots.
    pub expected_max_violations: Option<f64>,
    /// Variance scale of the fairness sub-score (hours²).
    pub fairness_variance_scale: f64,
    pub critical_weight: f64,
    pub high_weight: f64,
    pub medium_weight: f64,
    pub low_weight: f64,
}

impl Default for EvaluatorPolicy {
    fn default() -> Self {
        Self {
            assume_available_without_data: true,
            neutral_without_preferences: true,
            qualification_policy: QualificationPolicy::Any,
            allow_constraint_override_on_starvation: true,
            week_start: Weekday::Mon,
            check_rest_period: true,
            default_max_consecutive_nights: 3,
            default_max_weekly_hours: 40,
            default_max_overtime_hours: 8,
            default_min_rest_hours: 11,
            default_max_consecutive_days: 6,
            default_min_days_off_per_week: 1,
            expected_max_violations: None,
            fairness_variance_scale: 64.0,
            critical_weight: 10.0,
            high_weight: 3.0,
            medium_weight: 1.0,
            low_weight: 0.5,
        }
    }
}

impl EvaluatorPolicy {
    /// Weight of one violation of the given severity in the constraint sub-score.
    pub fn severity_weight(&self, severity: Severity) -> f64 {
        match severity {
            Severity::Critical => self.critical_weight,
            Severity::High => self.high_weight,
            Severity::Medium => self.medium_weight,
            Severity::Low => self.low_weight,
        }
    }

    /// Resolves a nurse's working limits against the defaults.
    pub fn limits_for(&self, nurse: &Nurse, allow_overtime: bool) -> NurseLimits {
        let c = &nurse.constraints;
        let max_weekly_hours = c.max_weekly_hours.unwrap_or(self.default_max_weekly_hours);
        let max_overtime_hours = c.max_overtime_hours.unwrap_or(self.default_max_overtime_hours);
        NurseLimits {
            max_consecutive_nights: c
                .max_consecutive_nights
                .unwrap_or(self.default_max_consecutive_nights),
            max_weekly_hours,
            weekly_hour_ceiling: if allow_overtime {
                max_weekly_hours + max_overtime_hours
            } else {
                max_weekly_hours
            },
            min_rest_hours: c.min_rest_hours.unwrap_or(self.default_min_rest_hours),
            max_consecutive_days: c
                .max_consecutive_days
                .unwrap_or(self.default_max_consecutive_days),
            min_days_off_per_week: c
                .min_days_off_per_week
                .unwrap_or(self.default_min_days_off_per_week),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.fairness_variance_scale.is_finite() && self.fairness_variance_scale > 0.0) {
            return Err(ConfigError::Invalid("fairness_variance_scale must be positive".into()));
        }
        if let Some(max) = self.expected_max_violations {
            if !(max.is_finite() && max > 0.0) {
                return Err(ConfigError::Invalid("expected_max_violations must be positive".into()));
            }
        }
        if self.default_min_days_off_per_week > 7 {
            return Err(ConfigError::Invalid(
                "default_min_days_off_per_week cannot exceed 7".into(),
            ));
        }
        Ok(())
    }
}

/// A nurse's working limits after applying policy defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NurseLimits {
    pub max_consecutive_nights: u32,
    pub max_weekly_hours: u32,
    /// Hours per week above which a violation is raised.
    pub weekly_hour_ceiling: u32,
    pub min_rest_hours: u32,
    pub max_consecutive_days: u32,
    pub min_days_off_per_week: u32,
}
