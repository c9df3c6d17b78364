//! Publish target positions for the finger, useful for driving `finger_exec` by hand.
//!
//! Alternates between the given targets, holding each one for `--hold-s` seconds.

use comms_if::{
    eqpt::finger::FingerMsg,
    net::{MonitoredSocket, SocketOptions},
};
use std::time::{Duration, Instant};
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
#[structopt(name = "target_pub", about = "Publish finger target positions")]
struct Opt {
    /// Endpoint to bind the publisher to
    #[structopt(short, long, default_value = "tcp://*:5010")]
    endpoint: String,

    /// How long to hold each target for, in seconds
    #[structopt(long, default_value = "2.0")]
    hold_s: f64,

    /// Publishing rate in Hz
    #[structopt(long, default_value = "50.0")]
    rate_hz: f64,

    /// Targets to cycle through, in radians
    #[structopt(required = true, allow_hyphen_values = true)]
    targets: Vec<f64>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let opt = Opt::from_args();

    if opt.rate_hz <= 0.0 || opt.hold_s <= 0.0 {
        return Err("rate and hold time must be positive".into());
    }

    let ctx = zmq::Context::new();

    let socket = MonitoredSocket::new(
        &ctx,
        zmq::PUB,
        SocketOptions {
            bind: true,
            block_on_first_connect: false,
            ..Default::default()
        },
        &opt.endpoint,
    )?;

    println!("Target publisher open on {}", opt.endpoint);

    let period = Duration::from_secs_f64(1.0 / opt.rate_hz);
    let hold = Duration::from_secs_f64(opt.hold_s);

    for target in opt.targets.iter().cycle() {
        println!("Target: {}", target);

        let frame = FingerMsg::target(*target).to_frame();
        let hold_start = Instant::now();

        while hold_start.elapsed() < hold {
            if let Err(e) = socket.send(frame.as_str(), 0) {
                println!("Failed to send target: {}", e);
            }
            std::thread::sleep(period);
        }
    }

    Ok(())
}
