//! Print the commands published by `finger_exec`.

use comms_if::{
    eqpt::finger::{FingerMsg, FingerTopic, COMMAND_TOPIC},
    net::{MonitoredSocket, SocketOptions},
};
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
#[structopt(name = "command_sub", about = "Print finger effort commands")]
struct Opt {
    /// Endpoint of the command publisher
    #[structopt(short, long, default_value = "tcp://localhost:5011")]
    endpoint: String,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let opt = Opt::from_args();

    let ctx = zmq::Context::new();

    let socket = MonitoredSocket::new(
        &ctx,
        zmq::SUB,
        SocketOptions::default(),
        &opt.endpoint,
    )?;

    socket.set_subscribe(COMMAND_TOPIC.as_bytes())?;

    loop {
        let msg = socket.recv_msg(0)?;

        match FingerMsg::from_bytes(&msg).and_then(|m| m.expect_topic(FingerTopic::Command)) {
            Ok(command) => println!("Command: {:+.6}", command),
            Err(e) => println!("Bad message: {}", e),
        }
    }
}
