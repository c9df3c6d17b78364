//! # Joint state estimation
//!
//! The control loop reads the joint's position and velocity through a [`StateEstimator`] before
//! every tick. No estimator that fuses real sensor data exists yet: the exec runs with a
//! [`FixedState`], which keeps the joint frozen at its initial state. A sensor integration
//! plugs in here by implementing the trait.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Estimated state of the finger joint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct JointState {
    /// Joint position.
    ///
    /// Units: radians
    pub position_rad: f64,

    /// Joint velocity.
    ///
    /// Units: radians/second
    pub velocity_rads: f64,
}

/// An estimator which always reports the same state.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedState(pub JointState);

/// An estimator backed by a closure.
pub struct FnEstimator<F>(pub F);

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// Source of the joint state used by the control loop.
///
/// `estimate` is called from the loop's timer thread once per tick, so it must return quickly
/// and must not panic.
pub trait StateEstimator: Send {
    /// Get the current estimate of the joint state.
    fn estimate(&mut self) -> JointState;
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl JointState {
    pub fn new(position_rad: f64, velocity_rads: f64) -> Self {
        Self {
            position_rad,
            velocity_rads,
        }
    }
}

impl StateEstimator for FixedState {
    fn estimate(&mut self) -> JointState {
        self.0
    }
}

impl<F> StateEstimator for FnEstimator<F>
where
    F: FnMut() -> JointState + Send,
{
    fn estimate(&mut self) -> JointState {
        (self.0)()
    }
}

impl<E: StateEstimator + ?Sized> StateEstimator for Box<E> {
    fn estimate(&mut self) -> JointState {
        (**self).estimate()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_fixed_state() {
        let mut est = FixedState::default();
        assert_eq!(est.estimate(), JointState::new(0.0, 0.0));
        assert_eq!(est.estimate(), JointState::new(0.0, 0.0));

        let mut est = FixedState(JointState::new(0.3, -1.0));
        assert_eq!(est.estimate(), JointState::new(0.3, -1.0));
    }

    #[test]
    fn test_fn_estimator() {
        let mut position = 0.0;
        let mut est: Box<dyn StateEstimator> = Box::new(FnEstimator(move || {
            position += 0.5;
            JointState::new(position, 0.0)
        }));

        assert_eq!(est.estimate().position_rad, 0.5);
        assert_eq!(est.estimate().position_rad, 1.0);
    }
}
