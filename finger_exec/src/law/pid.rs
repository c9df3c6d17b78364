//! # PID law

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::Serialize;

use super::{ControlLaw, LawError};
use crate::state_est::JointState;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Default limit on the magnitude of the integral accumulator.
pub const DEFAULT_INTEGRAL_LIMIT: f64 = 1.0;

/// Default limit on the magnitude of the output.
pub const DEFAULT_OUTPUT_LIMIT: f64 = 2.0;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A PID controller on the position error.
///
/// The derivative term is taken from the change in error between ticks rather than the measured
/// velocity, and the integral is clamped to stop it winding up while the output is saturated.
#[derive(Debug, Clone, Serialize)]
pub struct PidLaw {
    /// Proportional gain
    k_p: f64,

    /// Integral gain
    k_i: f64,

    /// Dervative gain
    k_d: f64,

    /// Maximum magnitude of the integral accumulation
    integral_limit: f64,

    /// Maximum magnitude of the output
    output_limit: f64,

    /// The integral accumulation
    integral: f64,

    /// Error on the previous tick
    last_error: f64,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl PidLaw {
    /// Create a new controller with the given gains and the default limits.
    pub fn new(k_p: f64, k_i: f64, k_d: f64) -> Self {
        Self {
            k_p,
            k_i,
            k_d,
            integral_limit: DEFAULT_INTEGRAL_LIMIT,
            output_limit: DEFAULT_OUTPUT_LIMIT,
            integral: 0.0,
            last_error: 0.0,
        }
    }

    /// Set the integral and output limits.
    pub fn with_limits(mut self, integral_limit: f64, output_limit: f64) -> Result<Self, LawError> {
        if !(integral_limit > 0.0) {
            return Err(LawError::NonPositiveLimit {
                name: "integral",
                value: integral_limit,
            });
        }
        if !(output_limit > 0.0) {
            return Err(LawError::NonPositiveLimit {
                name: "output",
                value: output_limit,
            });
        }

        self.integral_limit = integral_limit;
        self.output_limit = output_limit;

        Ok(self)
    }

    /// Current value of the integral accumulator.
    pub fn integral(&self) -> f64 {
        self.integral
    }
}

impl ControlLaw for PidLaw {
    fn compute(&mut self, target_rad: f64, state: JointState, dt_s: f64) -> f64 {
        let error = target_rad - state.position_rad;

        // Without a positive time step there's no meaningful derivative
        let deriv = if dt_s > 0.0 {
            (error - self.last_error) / dt_s
        } else {
            0.0
        };

        // A non-finite error still produces an output for this tick, but mustn't poison the
        // accumulated state for the following ones
        let integral = (self.integral + error * dt_s)
            .clamp(-self.integral_limit, self.integral_limit);
        if error.is_finite() && integral.is_finite() {
            self.integral = integral;
            self.last_error = error;
        }

        let out = self.k_p * error + self.k_i * integral + self.k_d * deriv;

        out.clamp(-self.output_limit, self.output_limit)
    }

    fn reset(&mut self) {
        self.integral = 0.0;
        self.last_error = 0.0;
    }
}
