//! # Control laws
//!
//! A control law maps the current target and joint state to an effort command. The control loop
//! owns exactly one law and calls it once per tick; everything specific to how the finger is
//! driven lives behind the [`ControlLaw`] trait so that gains or the whole law can be replaced
//! without touching the loop's timing.
//!
//! Laws must not panic. Non-finite inputs are expected to propagate into a non-finite command,
//! which the actuator side is responsible for rejecting.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod params;
mod pid;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use crate::state_est::JointState;

pub use params::LawParams;
pub use pid::PidLaw;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Default proportional gain of the PD law.
pub const DEFAULT_K_P: f64 = 3.5;

/// Default derivative gain of the PD law.
pub const DEFAULT_K_D: f64 = 0.1;

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// A control law for the finger joint.
pub trait ControlLaw: Send {
    /// Compute the effort command for this tick.
    ///
    /// - `target_rad`: the current setpoint
    /// - `state`: the current joint state estimate
    /// - `dt_s`: time elapsed since the previous tick, in seconds
    fn compute(&mut self, target_rad: f64, state: JointState, dt_s: f64) -> f64;

    /// Clear any internal state (integrators, previous errors).
    fn reset(&mut self) {}
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Proportional-derivative law on the position error and the measured velocity:
///
/// `command = k_p * (target - position) - k_d * velocity`
///
/// The output is not limited, wrap it in a [`Saturated`] for that.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PdLaw {
    /// Proportional gain
    pub k_p: f64,

    /// Derivative gain, acting on the measured velocity
    pub k_d: f64,
}

/// A law defined by a closure taking `(target, position, velocity)`.
pub struct FnLaw<F>(pub F);

/// Limits the output of another law to `[min, max]`.
///
/// A `NaN` command from the inner law is passed through rather than clamped.
#[derive(Debug, Clone)]
pub struct Saturated<L> {
    inner: L,
    min: f64,
    max: f64,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Errors which can occur when building a control law.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum LawError {
    #[error("Invalid output limits: min ({min}) must not be greater than max ({max}), and neither may be NaN")]
    InvalidLimits { min: f64, max: f64 },

    #[error("The {name} limit must be positive, found {value}")]
    NonPositiveLimit { name: &'static str, value: f64 },
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl PdLaw {
    pub fn new(k_p: f64, k_d: f64) -> Self {
        Self { k_p, k_d }
    }
}

impl Default for PdLaw {
    fn default() -> Self {
        Self::new(DEFAULT_K_P, DEFAULT_K_D)
    }
}

impl ControlLaw for PdLaw {
    fn compute(&mut self, target_rad: f64, state: JointState, _dt_s: f64) -> f64 {
        let error_rad = target_rad - state.position_rad;

        self.k_p * error_rad - self.k_d * state.velocity_rads
    }
}

impl<F> ControlLaw for FnLaw<F>
where
    F: FnMut(f64, f64, f64) -> f64 + Send,
{
    fn compute(&mut self, target_rad: f64, state: JointState, _dt_s: f64) -> f64 {
        (self.0)(target_rad, state.position_rad, state.velocity_rads)
    }
}

impl<L: ControlLaw> Saturated<L> {
    /// Limit the output of `inner` to `[min, max]`.
    pub fn new(inner: L, min: f64, max: f64) -> Result<Self, LawError> {
        if min.is_nan() || max.is_nan() || min > max {
            return Err(LawError::InvalidLimits { min, max });
        }

        Ok(Self { inner, min, max })
    }

    /// Limit the output of `inner` to `[-limit, limit]`.
    pub fn symmetric(inner: L, limit: f64) -> Result<Self, LawError> {
        if !(limit > 0.0) {
            return Err(LawError::NonPositiveLimit {
                name: "output",
                value: limit,
            });
        }

        Self::new(inner, -limit, limit)
    }

    /// Get a reference to the wrapped law.
    pub fn inner(&self) -> &L {
        &self.inner
    }
}

impl<L: ControlLaw> ControlLaw for Saturated<L> {
    fn compute(&mut self, target_rad: f64, state: JointState, dt_s: f64) -> f64 {
        // clamp leaves NaN untouched
        self.inner
            .compute(target_rad, state, dt_s)
            .clamp(self.min, self.max)
    }

    fn reset(&mut self) {
        self.inner.reset()
    }
}

impl<L: ControlLaw + ?Sized> ControlLaw for Box<L> {
    fn compute(&mut self, target_rad: f64, state: JointState, dt_s: f64) -> f64 {
        (**self).compute(target_rad, state, dt_s)
    }

    fn reset(&mut self) {
        (**self).reset()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const DT: f64 = 0.01;

    fn state(position_rad: f64, velocity_rads: f64) -> JointState {
        JointState::new(position_rad, velocity_rads)
    }

    #[test]
    fn test_pd_matches_law_exactly() {
        let values = [-3.0, -0.7, 0.0, 0.1, 1.0, 2.5, 1e6];
        let gains = [(3.5, 0.1), (0.0, 0.0), (10.0, 2.0), (-1.0, 0.5)];

        for &(k_p, k_d) in gains.iter() {
            let mut law = PdLaw::new(k_p, k_d);
            for &target in values.iter() {
                for &position in values.iter() {
                    for &velocity in values.iter() {
                        assert_eq!(
                            law.compute(target, state(position, velocity), DT),
                            k_p * (target - position) - k_d * velocity
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn test_pd_scenarios() {
        let mut law = PdLaw::default();

        assert_eq!(law.compute(1.0, state(0.0, 0.0), DT), 3.5);
        assert_eq!(law.compute(0.0, state(0.0, 2.0), DT), -0.2);
        assert_eq!(law.compute(0.0, state(0.0, 0.0), DT), 0.0);
    }

    #[test]
    fn test_pd_has_no_hidden_state() {
        let mut law = PdLaw::default();

        let first = law.compute(0.4, state(0.1, -0.3), DT);
        law.compute(100.0, state(-5.0, 7.0), 1.0);
        assert_eq!(law.compute(0.4, state(0.1, -0.3), 0.5), first);
    }

    #[test]
    fn test_pd_propagates_nan() {
        let mut law = PdLaw::default();

        assert!(law.compute(f64::NAN, state(0.0, 0.0), DT).is_nan());
        assert!(law.compute(1.0, state(f64::NAN, 0.0), DT).is_nan());
        assert!(law.compute(1.0, state(0.0, f64::INFINITY), DT).is_infinite());
    }

    #[test]
    fn test_fn_law() {
        let mut law = FnLaw(|target: f64, position: f64, velocity: f64| {
            2.0 * (target - position) + velocity
        });

        assert_eq!(law.compute(1.0, state(0.5, 0.25), DT), 1.25);
    }

    #[test]
    fn test_saturated() {
        let mut law = Saturated::symmetric(PdLaw::default(), 2.0).unwrap();

        assert_eq!(law.compute(1.0, state(0.0, 0.0), DT), 2.0);
        assert_eq!(law.compute(-1.0, state(0.0, 0.0), DT), -2.0);
        assert_eq!(law.compute(0.0, state(0.0, 2.0), DT), -0.2);
        assert!(law.compute(f64::NAN, state(0.0, 0.0), DT).is_nan());
        assert_eq!(law.inner(), &PdLaw::default());

        let mut law = Saturated::new(PdLaw::default(), 0.0, 1.0).unwrap();
        assert_eq!(law.compute(-1.0, state(0.0, 0.0), DT), 0.0);
    }

    #[test]
    fn test_saturated_rejects_bad_limits() {
        assert_eq!(
            Saturated::new(PdLaw::default(), 1.0, -1.0).err(),
            Some(LawError::InvalidLimits { min: 1.0, max: -1.0 })
        );
        assert!(Saturated::new(PdLaw::default(), f64::NAN, 1.0).is_err());
        assert!(Saturated::symmetric(PdLaw::default(), 0.0).is_err());
        assert!(Saturated::symmetric(PdLaw::default(), f64::NAN).is_err());
    }

    #[test]
    fn test_boxed_law() {
        let mut law: Box<dyn ControlLaw> = Box::new(PdLaw::new(1.0, 0.0));
        assert_eq!(law.compute(2.0, state(0.5, 0.0), DT), 1.5);
    }
}
