//! Control law selection parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

use super::{ControlLaw, LawError, PdLaw, PidLaw, Saturated, DEFAULT_K_D, DEFAULT_K_P};
use super::pid::{DEFAULT_INTEGRAL_LIMIT, DEFAULT_OUTPUT_LIMIT};
use crate::learner::LinearPolicy;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Which control law to run and its gains.
///
/// In a parameter file this is a table with a `type` key, for instance:
///
/// ```toml
/// [law]
/// type = "pd"
/// k_p = 3.5
/// k_d = 0.1
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LawParams {
    /// Proportional-derivative law, see [`PdLaw`]
    Pd {
        k_p: f64,
        k_d: f64,
    },

    /// PID law, see [`PidLaw`]
    Pid {
        k_p: f64,
        k_i: f64,
        k_d: f64,

        #[serde(default = "default_integral_limit")]
        integral_limit: f64,

        #[serde(default = "default_output_limit")]
        output_limit: f64,
    },

    /// Linear policy with fixed weights, see [`LinearPolicy`]
    Linear {
        w0: f64,
        w1: f64,
        w2: f64,

        #[serde(default = "default_output_limit")]
        output_limit: f64,
    },
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl LawParams {
    /// Build the law described by these parameters.
    ///
    /// If `output_limit` is given the law's output is additionally clamped to
    /// `[-output_limit, output_limit]`.
    pub fn build(
        &self,
        output_limit: Option<f64>
    ) -> Result<Box<dyn ControlLaw>, LawError> {
        let law: Box<dyn ControlLaw> = match *self {
            LawParams::Pd { k_p, k_d } => Box::new(PdLaw::new(k_p, k_d)),
            LawParams::Pid { k_p, k_i, k_d, integral_limit, output_limit } => Box::new(
                PidLaw::new(k_p, k_i, k_d).with_limits(integral_limit, output_limit)?
            ),
            LawParams::Linear { w0, w1, w2, output_limit } => Box::new(
                LinearPolicy::with_weights(w0, w1, w2, output_limit)?
            ),
        };

        match output_limit {
            Some(l) => Ok(Box::new(Saturated::symmetric(law, l)?)),
            None => Ok(law)
        }
    }
}

impl Default for LawParams {
    fn default() -> Self {
        LawParams::Pd {
            k_p: DEFAULT_K_P,
            k_d: DEFAULT_K_D,
        }
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

fn default_integral_limit() -> f64 {
    DEFAULT_INTEGRAL_LIMIT
}

fn default_output_limit() -> f64 {
    DEFAULT_OUTPUT_LIMIT
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::state_est::JointState;

    #[derive(Deserialize)]
    struct Wrapper {
        law: LawParams,
    }

    fn parse(s: &str) -> LawParams {
        util::params::from_str::<Wrapper>(s).unwrap().law
    }

    #[test]
    fn test_parse_law_params() {
        assert_eq!(
            parse("[law]\ntype = \"pd\"\nk_p = 3.5\nk_d = 0.1\n"),
            LawParams::default()
        );

        assert_eq!(
            parse("[law]\ntype = \"pid\"\nk_p = 3.8\nk_i = 1.6\nk_d = 0.12\n"),
            LawParams::Pid {
                k_p: 3.8,
                k_i: 1.6,
                k_d: 0.12,
                integral_limit: 1.0,
                output_limit: 2.0
            }
        );

        assert_eq!(
            parse("[law]\ntype = \"linear\"\nw0 = 0.0\nw1 = 2.0\nw2 = -0.1\noutput_limit = 1.5\n"),
            LawParams::Linear {
                w0: 0.0,
                w1: 2.0,
                w2: -0.1,
                output_limit: 1.5
            }
        );

        assert!(util::params::from_str::<Wrapper>("[law]\ntype = \"lqr\"\n").is_err());
    }

    #[test]
    fn test_build() {
        let state = JointState::new(0.0, 2.0);

        let mut law = LawParams::default().build(None).unwrap();
        assert_eq!(law.compute(0.0, state, 0.01), -0.2);

        // Large error saturates at the extra output limit
        let mut law = LawParams::default().build(Some(1.0)).unwrap();
        assert_eq!(law.compute(10.0, JointState::default(), 0.01), 1.0);

        assert!(LawParams::default().build(Some(-1.0)).is_err());
        assert!(LawParams::Pid {
            k_p: 1.0,
            k_i: 0.0,
            k_d: 0.0,
            integral_limit: -1.0,
            output_limit: 1.0
        }
        .build(None)
        .is_err());
    }
}
