//! # Finger library.
//!
//! Control of a single finger joint: the executable holds a target position received over the
//! network, runs a fixed rate control loop towards it and publishes the resulting effort
//! commands. The same control laws can be exercised offline against a plant model.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Command publisher - sends effort commands on the `command` topic
pub mod cmd_pub;

/// Control loop - ticks the control law at a fixed period
pub mod ctrl_loop;

/// Control laws - map target and joint state to an effort command
pub mod law;

/// Learned linear policy trained from another law's behaviour
pub mod learner;

/// Parameters for the finger executable
pub mod params;

/// Setpoint register - latest target shared between the subscriber and the loop
pub mod setpoint;

/// Closed loop simulation against a plant model
pub mod sim;

/// Command sinks - where the loop's commands go
pub mod sink;

/// Joint state estimation
pub mod state_est;

/// Target subscriber - receives targets on the `target` topic
pub mod target_sub;
