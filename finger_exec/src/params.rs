//! # Finger Executable Parameters

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::net::NetParams;
use serde::Deserialize;

use crate::{law::LawParams, state_est::JointState};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct FingerExecParams {
    /// Period of the control loop.
    ///
    /// Units: seconds
    #[serde(default = "default_cycle_period_s")]
    pub cycle_period_s: f64,

    /// Endpoints of the target and command topics
    #[serde(flatten)]
    pub net: NetParams,

    /// The control law to run
    #[serde(default)]
    pub law: LawParams,

    /// Actuator rating, if given the law's output is clamped to `[-output_limit, output_limit]`
    #[serde(default)]
    pub output_limit: Option<f64>,

    /// Joint state reported to the law until a state estimator is available
    #[serde(default)]
    pub initial_state: JointState,
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn default_cycle_period_s() -> f64 {
    0.01
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_minimal_params() {
        let params: FingerExecParams = util::params::from_str(
            r#"
            target_endpoint = "tcp://localhost:5010"
            command_endpoint = "tcp://*:5011"
            "#,
        )
        .unwrap();

        assert_eq!(params.cycle_period_s, 0.01);
        assert_eq!(params.net.target_endpoint, "tcp://localhost:5010");
        assert_eq!(params.net.command_endpoint, "tcp://*:5011");
        assert_eq!(params.law, LawParams::default());
        assert_eq!(params.output_limit, None);
        assert_eq!(params.initial_state, JointState::default());
    }

    #[test]
    fn test_full_params() {
        let params: FingerExecParams = util::params::from_str(
            r#"
            cycle_period_s = 0.005
            target_endpoint = "tcp://localhost:5010"
            command_endpoint = "tcp://*:5011"
            output_limit = 2.0

            [law]
            type = "pid"
            k_p = 3.8
            k_i = 1.6
            k_d = 0.12

            [initial_state]
            position_rad = 0.1
            velocity_rads = 0.0
            "#,
        )
        .unwrap();

        assert_eq!(params.cycle_period_s, 0.005);
        assert_eq!(params.output_limit, Some(2.0));
        assert_eq!(params.initial_state, JointState::new(0.1, 0.0));
        assert!(matches!(params.law, LawParams::Pid { .. }));
    }

    #[test]
    fn test_missing_endpoints() {
        assert!(util::params::from_str::<FingerExecParams>("cycle_period_s = 0.01").is_err());
    }
}
