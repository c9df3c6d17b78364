//! # Command sinks
//!
//! Every command computed by the control loop is handed to exactly one [`CommandSink`]. In the
//! exec this is the [`CommandPublisher`](crate::cmd_pub::CommandPublisher); tests and the
//! simulator use the in-memory sinks defined here.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::warn;
use std::sync::mpsc;

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// Destination for the loop's effort commands.
///
/// `emit` is called from the loop's timer thread so must not block for long. Sinks report their
/// own failures, the loop carries on regardless.
pub trait CommandSink: Send {
    fn emit(&mut self, command: f64);
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A sink backed by a closure.
pub struct FnSink<F>(pub F);

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl CommandSink for Vec<f64> {
    fn emit(&mut self, command: f64) {
        self.push(command);
    }
}

impl CommandSink for mpsc::Sender<f64> {
    fn emit(&mut self, command: f64) {
        if self.send(command).is_err() {
            warn!("Command receiver has hung up, dropping command {}", command);
        }
    }
}

impl<F> CommandSink for FnSink<F>
where
    F: FnMut(f64) + Send,
{
    fn emit(&mut self, command: f64) {
        (self.0)(command)
    }
}

impl<S: CommandSink + ?Sized> CommandSink for Box<S> {
    fn emit(&mut self, command: f64) {
        (**self).emit(command)
    }
}
