//! # Learned linear policy
//!
//! A three-weight policy `torque = w0 + w1 * error + w2 * velocity`, fitted by stochastic gradient
//! descent to samples recorded from another controller. It implements [`ControlLaw`] so a trained
//! policy can be dropped into the control loop or the simulator in place of a hand-tuned law.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::debug;
use serde::{Deserialize, Serialize};

use crate::{
    law::{ControlLaw, LawError},
    sim::SimulationRecord,
    state_est::JointState,
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// One training example: the state a reference law saw and the torque it chose.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrainingSample {
    pub error: f64,
    pub velocity: f64,
    pub target_torque: f64,
}

/// Linear policy on the position error and velocity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearPolicy {
    pub w0: f64,
    pub w1: f64,
    pub w2: f64,

    /// Maximum magnitude of the output
    output_limit: f64,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Errors which can occur while fitting a policy.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum LearnError {
    #[error("Training data cannot be empty")]
    NoData,

    #[error("The learning rate must be positive and finite, found {0}")]
    InvalidLearningRate(f64),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl TrainingSample {
    /// Build a sample from a simulation record.
    pub fn from_record(record: &SimulationRecord) -> Self {
        Self {
            error: record.error,
            velocity: record.omega,
            target_torque: record.torque,
        }
    }
}

impl LinearPolicy {
    /// A new, untrained policy (all weights zero).
    pub fn new(output_limit: f64) -> Result<Self, LawError> {
        Self::with_weights(0.0, 0.0, 0.0, output_limit)
    }

    /// A policy with known weights.
    pub fn with_weights(w0: f64, w1: f64, w2: f64, output_limit: f64) -> Result<Self, LawError> {
        if !(output_limit > 0.0) {
            return Err(LawError::NonPositiveLimit {
                name: "output",
                value: output_limit,
            });
        }

        Ok(Self {
            w0,
            w1,
            w2,
            output_limit,
        })
    }

    /// Evaluate the policy.
    pub fn predict(&self, error: f64, velocity: f64) -> f64 {
        self.raw(error, velocity)
            .clamp(-self.output_limit, self.output_limit)
    }

    /// Fit the weights to `data`, visiting every sample once per epoch.
    ///
    /// The unclamped output is fitted, so samples where the reference law was saturated pull the weights
    /// towards the saturation value.
    pub fn fit(&mut self, data: &[TrainingSample], lr: f64, epochs: usize) -> Result<(), LearnError> {
        if data.is_empty() {
            return Err(LearnError::NoData);
        }
        if !(lr > 0.0) || !lr.is_finite() {
            return Err(LearnError::InvalidLearningRate(lr));
        }

        for _ in 0..epochs {
            for sample in data {
                let diff = self.raw(sample.error, sample.velocity) - sample.target_torque;

                self.w0 -= 2.0 * lr * diff;
                self.w1 -= 2.0 * lr * diff * sample.error;
                self.w2 -= 2.0 * lr * diff * sample.velocity;
            }
        }

        debug!(
            "Fitted linear policy on {} samples: w0 = {:.4}, w1 = {:.4}, w2 = {:.4}",
            data.len(), self.w0, self.w1, self.w2
        );

        Ok(())
    }

    fn raw(&self, error: f64, velocity: f64) -> f64 {
        self.w0 + self.w1 * error + self.w2 * velocity
    }
}

impl ControlLaw for LinearPolicy {
    fn compute(&mut self, target_rad: f64, state: JointState, _dt_s: f64) -> f64 {
        self.predict(target_rad - state.position_rad, state.velocity_rads)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_untrained_outputs_zero() {
        let mut policy = LinearPolicy::new(2.0).unwrap();
        assert_eq!(policy.compute(1.0, JointState::new(0.0, 3.0), 0.01), 0.0);
    }

    #[test]
    fn test_predict_is_clamped() {
        let policy = LinearPolicy::with_weights(0.5, 10.0, -1.0, 2.0).unwrap();

        assert_eq!(policy.predict(0.1, 0.0), 1.5);
        assert_eq!(policy.predict(1.0, 0.0), 2.0);
        assert_eq!(policy.predict(-1.0, 0.0), -2.0);
        assert!(policy.predict(f64::NAN, 0.0).is_nan());
    }

    #[test]
    fn test_fit_recovers_linear_law() {
        // Samples from torque = 0.2 + 1.5 * error - 0.3 * velocity
        let mut data = Vec::new();
        for i in 0..20 {
            for j in 0..5 {
                let error = -1.0 + 0.1 * i as f64;
                let velocity = -1.0 + 0.5 * j as f64;
                data.push(TrainingSample {
                    error,
                    velocity,
                    target_torque: 0.2 + 1.5 * error - 0.3 * velocity,
                });
            }
        }

        let mut policy = LinearPolicy::new(10.0).unwrap();
        policy.fit(&data, 0.01, 500).unwrap();

        assert!((policy.w0 - 0.2).abs() < 1e-3, "w0 = {}", policy.w0);
        assert!((policy.w1 - 1.5).abs() < 1e-3, "w1 = {}", policy.w1);
        assert!((policy.w2 + 0.3).abs() < 1e-3, "w2 = {}", policy.w2);
    }

    #[test]
    fn test_fit_errors() {
        let mut policy = LinearPolicy::new(2.0).unwrap();
        assert_eq!(policy.fit(&[], 0.01, 10), Err(LearnError::NoData));

        let sample = TrainingSample {
            error: 1.0,
            velocity: 0.0,
            target_torque: 1.0,
        };
        assert_eq!(
            policy.fit(&[sample], 0.0, 10),
            Err(LearnError::InvalidLearningRate(0.0))
        );

        assert!(LinearPolicy::new(0.0).is_err());
    }
}
