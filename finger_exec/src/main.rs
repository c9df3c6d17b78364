//! # Finger Control Executable
//!
//! Holds the finger joint on the most recently received target:
//!
//! - Targets arrive on the `target` topic and are written into the setpoint register
//! - The control loop ticks at a fixed period, computing one effort command per tick
//! - Commands are published on the `command` topic
//!
//! The executable runs until Ctrl-C is pressed, or for `--run-for-s` seconds if given.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

// External
use color_eyre::{eyre::WrapErr, Result};
use log::{info, warn};
use std::{
    sync::{mpsc, Arc},
    time::Duration,
};
use structopt::StructOpt;

// Internal
use comms_if::net::zmq;
use finger_lib::{
    cmd_pub::CommandPublisher,
    ctrl_loop::{self, ControlLoop},
    params::FingerExecParams,
    setpoint::SetpointRegister,
    state_est::FixedState,
    target_sub::TargetSubscriber,
};
use util::{
    host,
    logger::{logger_init, LevelFilter},
    session::Session,
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, StructOpt)]
#[structopt(name = "finger_exec", about = "Finger joint control executable")]
struct Opt {
    /// Parameter file, relative to the params directory
    #[structopt(short, long, default_value = "finger_exec.toml")]
    params: String,

    /// Stop after this many seconds instead of waiting for Ctrl-C
    #[structopt(long)]
    run_for_s: Option<f64>,
}

// ------------------------------------------------------------------------------------------------
// MAIN
// ------------------------------------------------------------------------------------------------

fn main() -> Result<()> {
    color_eyre::install()?;

    let opt = Opt::from_args();

    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new("finger_exec", "sessions")
        .wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(LevelFilter::Debug, &session)
        .wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("Finger Control Executable\n");
    info!(
        "Running on: {:#?}",
        host::get_uname().wrap_err("Failed to get host information")?
    );
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD PARAMETERS ----

    let params: FingerExecParams = util::params::load(&opt.params)
        .wrap_err("Could not load finger_exec params")?;

    let period = ctrl_loop::period_from_secs(params.cycle_period_s)
        .wrap_err("Invalid cycle period")?;

    let law = params.law.build(params.output_limit)
        .wrap_err("Could not build the control law")?;

    info!("Parameters loaded, law: {:?}", params.law);

    // ---- INITIALISE NETWORK ----

    let zmq_ctx = zmq::Context::new();
    let setpoint = Arc::new(SetpointRegister::default());

    let target_sub = TargetSubscriber::new(
        &zmq_ctx,
        &params.net.target_endpoint,
        setpoint.clone()
    ).wrap_err("Failed to initialise the TargetSubscriber")?;

    let cmd_pub = CommandPublisher::new(&zmq_ctx, &params.net.command_endpoint)
        .wrap_err("Failed to initialise the CommandPublisher")?;

    info!("Network initialised");

    // ---- START LOOP ----

    let running = ControlLoop::new(
        setpoint,
        law,
        FixedState(params.initial_state),
        cmd_pub,
        period
    )
    .wrap_err("Failed to create the control loop")?
    .start()
    .wrap_err("Failed to start the control loop")?;

    // ---- WAIT FOR SHUTDOWN ----

    let (stop_tx, stop_rx) = mpsc::channel();
    ctrlc::set_handler(move || {
        let _ = stop_tx.send(());
    }).wrap_err("Failed to set the Ctrl-C handler")?;

    match opt.run_for_s {
        Some(s) => {
            let run_for = Duration::try_from_secs_f64(s)
                .wrap_err("Invalid run duration")?;
            info!("Running for {:?}", run_for);

            if stop_rx.recv_timeout(run_for).is_ok() {
                info!("Ctrl-C received");
            }
        },
        None => {
            info!("Running until Ctrl-C");

            if stop_rx.recv().is_err() {
                warn!("Ctrl-C handler dropped, shutting down");
            }
        }
    }

    // ---- SHUTDOWN ----

    info!("Shutting down");

    let stopped = running.stop().wrap_err("Failed to stop the control loop")?;
    info!(
        "Loop executed {} ticks with {} overruns, {} commands could not be sent",
        stopped.stats().ticks(),
        stopped.stats().overruns(),
        stopped.sink().num_send_errors()
    );
    if !stopped.sink().connected() {
        warn!("No command subscriber was connected at shutdown");
    }

    target_sub.stop().wrap_err("Failed to stop the TargetSubscriber")?;

    session.exit();

    Ok(())
}
