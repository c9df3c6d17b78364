//! # Closed loop simulation
//!
//! Runs a control law against the [`FingerPlant`] model to tune gains, generate training data for
//! the [`LinearPolicy`](crate::learner::LinearPolicy) and check tracking performance offline.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

pub mod metrics;
mod plant;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::debug;
use serde::{Deserialize, Serialize};

use crate::law::ControlLaw;

pub use plant::{FingerPlant, PlantParams};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Upper bound on the number of steps in one run, keeps the record buffer to a sane size.
pub const MAX_STEPS: usize = 1_000_000;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// The outcome of a single simulation step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimulationRecord {
    /// Simulation time at the start of the step, seconds
    pub t: f64,

    /// Target position, radians
    pub target: f64,

    /// Position after the step, radians
    pub theta: f64,

    /// Velocity after the step, radians/second
    pub omega: f64,

    /// Torque demanded by the law (before the plant's own limit)
    pub torque: f64,

    /// Tracking error after the step, radians
    pub error: f64,
}

/// A target which steps from one value to another at a given time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StepTarget {
    /// Time at which the step happens, seconds
    pub step_time_s: f64,

    /// Target before the step, radians
    pub before_rad: f64,

    /// Target from the step onwards, radians
    pub after_rad: f64,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Errors which can occur while setting up a simulation.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum SimError {
    #[error("The simulation duration must be positive and finite, found {0} s")]
    NonPositiveDuration(f64),

    #[error("A {duration_s} s simulation needs more than the maximum of {max} steps")]
    TooManySteps { duration_s: f64, max: usize },

    #[error("Invalid plant parameter {0}: {1}")]
    InvalidPlant(&'static str, f64),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl StepTarget {
    /// Get the target at time `t_s`.
    pub fn at(&self, t_s: f64) -> f64 {
        if t_s < self.step_time_s {
            self.before_rad
        } else {
            self.after_rad
        }
    }
}

impl Default for StepTarget {
    fn default() -> Self {
        Self {
            step_time_s: 0.2,
            before_rad: 0.0,
            after_rad: 0.8,
        }
    }
}

// ------------------------------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Simulate `law` driving `plant` towards `target_fn(t)` for `duration_s` seconds.
///
/// The plant's time step is also the law's `dt`. At least one step is always run.
pub fn simulate<L, T>(
    law: &mut L,
    target_fn: T,
    duration_s: f64,
    plant: &mut FingerPlant,
) -> Result<Vec<SimulationRecord>, SimError>
where
    L: ControlLaw + ?Sized,
    T: Fn(f64) -> f64,
{
    if !(duration_s > 0.0) || !duration_s.is_finite() {
        return Err(SimError::NonPositiveDuration(duration_s));
    }

    let dt_s = plant.params().dt_s;
    let steps_f = duration_s / dt_s;
    if !(steps_f < MAX_STEPS as f64) {
        return Err(SimError::TooManySteps {
            duration_s,
            max: MAX_STEPS,
        });
    }
    let num_steps = (steps_f as usize).max(1);

    debug!("Simulating {} steps of {} s", num_steps, dt_s);

    let mut records = Vec::with_capacity(num_steps);

    for step in 0..num_steps {
        let t = step as f64 * dt_s;
        let target = target_fn(t);

        let torque = law.compute(target, plant.state(), dt_s);
        let state = plant.step(torque);

        records.push(SimulationRecord {
            t,
            target,
            theta: state.position_rad,
            omega: state.velocity_rads,
            torque,
            error: target - state.position_rad,
        });
    }

    Ok(records)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        law::{PdLaw, PidLaw},
        learner::{LinearPolicy, TrainingSample},
    };

    fn reference_pid() -> PidLaw {
        PidLaw::new(3.8, 1.6, 0.12)
    }

    #[test]
    fn test_pid_tracking_converges() {
        let mut plant = FingerPlant::new(PlantParams::default()).unwrap();
        let step = StepTarget::default();

        let records = simulate(&mut reference_pid(), |t| step.at(t), 4.0, &mut plant).unwrap();

        assert_eq!(records.len(), 400);
        assert!(records.last().unwrap().error.abs() < 0.08);
        assert!(metrics::rmse(&records).unwrap() < 0.35);
    }

    #[test]
    fn test_linear_policy_learns_from_pid() {
        let step = StepTarget::default();

        let mut reference_plant = FingerPlant::new(PlantParams::default()).unwrap();
        let reference_records =
            simulate(&mut reference_pid(), |t| step.at(t), 4.0, &mut reference_plant).unwrap();

        let samples: Vec<TrainingSample> = reference_records
            .iter()
            .map(TrainingSample::from_record)
            .collect();

        let mut policy = LinearPolicy::new(2.0).unwrap();
        policy.fit(&samples, 0.003, 220).unwrap();

        let mut student_plant = FingerPlant::new(PlantParams::default()).unwrap();
        let student_records =
            simulate(&mut policy, |t| step.at(t), 4.0, &mut student_plant).unwrap();

        assert!(metrics::rmse(&student_records).unwrap() < 0.45);
    }

    #[test]
    fn test_records() {
        let mut plant = FingerPlant::new(PlantParams::default()).unwrap();
        let records = simulate(&mut PdLaw::default(), |_| 1.0, 0.055, &mut plant).unwrap();

        assert_eq!(records.len(), 5);
        assert_eq!(records[0].t, 0.0);
        assert_eq!(records[0].torque, 3.5);
        for r in records.iter() {
            assert_eq!(r.error, r.target - r.theta);
        }

        // Shorter than one step still runs one step
        let mut plant = FingerPlant::new(PlantParams::default()).unwrap();
        let records = simulate(&mut PdLaw::default(), |_| 1.0, 0.001, &mut plant).unwrap();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn test_bad_duration() {
        let mut plant = FingerPlant::new(PlantParams::default()).unwrap();

        assert_eq!(
            simulate(&mut PdLaw::default(), |_| 1.0, 0.0, &mut plant),
            Err(SimError::NonPositiveDuration(0.0))
        );
        assert!(simulate(&mut PdLaw::default(), |_| 1.0, f64::NAN, &mut plant).is_err());
        assert_eq!(
            simulate(&mut PdLaw::default(), |_| 1.0, f64::INFINITY, &mut plant),
            Err(SimError::NonPositiveDuration(f64::INFINITY))
        );

        // Finite but far too long
        assert_eq!(
            simulate(&mut PdLaw::default(), |_| 1.0, 1e12, &mut plant),
            Err(SimError::TooManySteps {
                duration_s: 1e12,
                max: MAX_STEPS
            })
        );
    }

    #[test]
    fn test_step_target() {
        let step = StepTarget::default();
        assert_eq!(step.at(0.0), 0.0);
        assert_eq!(step.at(0.19), 0.0);
        assert_eq!(step.at(0.2), 0.8);
        assert_eq!(step.at(3.0), 0.8);
    }
}
