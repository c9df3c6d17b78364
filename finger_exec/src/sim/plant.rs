//! # Finger plant model
//!
//! Single degree of freedom rotational joint with viscous damping and a return spring:
//!
//! `I * theta_ddot + b * theta_dot + k * theta = torque`
//!
//! integrated with semi-implicit Euler at a fixed time step.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use super::SimError;
use crate::state_est::JointState;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Physical parameters of the finger.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlantParams {
    /// Rotational inertia about the joint.
    ///
    /// Units: kg m^2
    pub inertia: f64,

    /// Viscous damping coefficient.
    ///
    /// Units: N m s/rad
    pub damping: f64,

    /// Return spring stiffness.
    ///
    /// Units: N m/rad
    pub stiffness: f64,

    /// Integration time step.
    ///
    /// Units: seconds
    pub dt_s: f64,

    /// The actuator can't deliver more than this torque, larger demands are clamped.
    ///
    /// Units: N m
    pub torque_limit: f64,
}

/// The simulated finger.
#[derive(Debug, Clone)]
pub struct FingerPlant {
    params: PlantParams,
    state: JointState,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for PlantParams {
    fn default() -> Self {
        Self {
            inertia: 0.05,
            damping: 0.12,
            stiffness: 0.65,
            dt_s: 0.01,
            torque_limit: 2.0,
        }
    }
}

impl FingerPlant {
    /// Create a new plant at rest at zero.
    pub fn new(params: PlantParams) -> Result<Self, SimError> {
        if !(params.inertia > 0.0) {
            return Err(SimError::InvalidPlant("inertia", params.inertia));
        }
        if !(params.dt_s > 0.0) {
            return Err(SimError::InvalidPlant("dt_s", params.dt_s));
        }
        if !(params.torque_limit > 0.0) {
            return Err(SimError::InvalidPlant("torque_limit", params.torque_limit));
        }

        Ok(Self {
            params,
            state: JointState::default(),
        })
    }

    /// Put the finger back into the given state.
    pub fn reset(&mut self, state: JointState) {
        self.state = state;
    }

    /// Current state of the finger.
    pub fn state(&self) -> JointState {
        self.state
    }

    pub fn params(&self) -> &PlantParams {
        &self.params
    }

    /// Advance the plant by one time step under the given torque, returning the new state.
    pub fn step(&mut self, torque: f64) -> JointState {
        let p = &self.params;
        let torque = torque.clamp(-p.torque_limit, p.torque_limit);

        let accel_rads2 = (torque
            - p.damping * self.state.velocity_rads
            - p.stiffness * self.state.position_rad)
            / p.inertia;

        self.state.velocity_rads += accel_rads2 * p.dt_s;
        self.state.position_rad += self.state.velocity_rads * p.dt_s;

        self.state
    }
}
