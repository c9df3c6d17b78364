//! # Finger Simulation Executable
//!
//! Offline tuning aid. Runs a PID law on the plant model against a step target, trains a linear
//! policy on the PID's behaviour, runs the trained policy on the same step and reports tracking
//! metrics for both. Traces and the trained weights are saved in the session directory.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

// External
use color_eyre::{eyre::WrapErr, Result};
use log::info;
use serde::Deserialize;
use structopt::StructOpt;

// Internal
use finger_lib::{
    law::{ControlLaw, PidLaw},
    learner::{LinearPolicy, TrainingSample},
    sim::{self, metrics, FingerPlant, PlantParams, SimulationRecord, StepTarget},
};
use util::{
    logger::{logger_init, LevelFilter},
    session::Session,
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, StructOpt)]
#[structopt(name = "finger_sim", about = "Simulate and train finger control laws")]
struct Opt {
    /// Parameter file, relative to the params directory
    #[structopt(short, long, default_value = "finger_sim.toml")]
    params: String,
}

#[derive(Debug, Deserialize)]
struct FingerSimParams {
    #[serde(default)]
    plant: PlantParams,

    pid: PidGains,

    #[serde(default)]
    step: StepTarget,

    /// Length of each run, seconds
    duration_s: f64,

    learner: LearnerParams,

    /// Error tolerance used for the settle time, radians
    settle_tolerance_rad: f64,
}

#[derive(Debug, Deserialize)]
struct PidGains {
    k_p: f64,
    k_i: f64,
    k_d: f64,
}

#[derive(Debug, Deserialize)]
struct LearnerParams {
    learning_rate: f64,
    epochs: usize,
    output_limit: f64,
}

// ------------------------------------------------------------------------------------------------
// MAIN
// ------------------------------------------------------------------------------------------------

fn main() -> Result<()> {
    color_eyre::install()?;

    let opt = Opt::from_args();

    // ---- EARLY INITIALISATION ----

    let session = Session::new("finger_sim", "sessions")
        .wrap_err("Failed to create the session")?;

    logger_init(LevelFilter::Info, &session)
        .wrap_err("Failed to initialise logging")?;

    info!("Finger Simulation Executable\n");
    info!("Session directory: {:?}\n", session.session_root);

    let params: FingerSimParams = util::params::load(&opt.params)
        .wrap_err("Could not load finger_sim params")?;

    let step = params.step;

    // ---- PID RUN ----

    let mut pid = PidLaw::new(params.pid.k_p, params.pid.k_i, params.pid.k_d);

    let pid_records = run(&mut pid, &params, &step).wrap_err("PID simulation failed")?;
    report("PID", &pid_records, params.settle_tolerance_rad)?;

    // ---- TRAINING ----

    let samples: Vec<TrainingSample> = pid_records
        .iter()
        .map(TrainingSample::from_record)
        .collect();

    let mut policy = LinearPolicy::new(params.learner.output_limit)
        .wrap_err("Invalid policy output limit")?;
    policy
        .fit(&samples, params.learner.learning_rate, params.learner.epochs)
        .wrap_err("Could not fit the linear policy")?;

    info!(
        "Trained policy: torque = {:.4} + {:.4} * error + {:.4} * velocity",
        policy.w0, policy.w1, policy.w2
    );

    // ---- POLICY RUN ----

    let policy_records = run(&mut policy, &params, &step)
        .wrap_err("Policy simulation failed")?;
    report("Policy", &policy_records, params.settle_tolerance_rad)?;

    // ---- SAVE ----

    session.save("pid_trace.json", pid_records);
    session.save("policy_trace.json", policy_records);
    session.save("policy.json", policy);

    session.exit();

    Ok(())
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Run `law` on a fresh plant.
fn run<L: ControlLaw>(
    law: &mut L,
    params: &FingerSimParams,
    step: &StepTarget
) -> Result<Vec<SimulationRecord>> {
    let mut plant = FingerPlant::new(params.plant)
        .wrap_err("Invalid plant parameters")?;

    Ok(sim::simulate(law, |t| step.at(t), params.duration_s, &mut plant)?)
}

fn report(name: &str, records: &[SimulationRecord], tolerance: f64) -> Result<()> {
    let rmse = metrics::rmse(records)?;
    let max_err = metrics::max_abs_error(records)?;

    info!("{}: RMSE {:.4} rad, max error {:.4} rad", name, rmse, max_err);

    match metrics::settle_time(records, tolerance) {
        Some(t) => info!("{}: settled within {} rad at {:.2} s", name, tolerance, t),
        None => info!("{}: did not settle within {} rad", name, tolerance),
    }

    Ok(())
}
