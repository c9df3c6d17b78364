//! # Setpoint register
//!
//! Holds the latest target position for the joint. The target subscriber writes it whenever a new
//! target arrives and the control loop reads it once per tick. The two sides run on different
//! threads with no ordering between them, so the value is exchanged through a single atomic word
//! (the bit pattern of the `f64`). A read can never observe half of a write.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::sync::atomic::{AtomicU64, Ordering};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// The most recently received target position, in radians.
///
/// No validation is performed: `NaN`, infinities and out of range values are stored as-is and
/// handed to the control law unchanged.
#[derive(Debug)]
pub struct SetpointRegister {
    bits: AtomicU64,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl SetpointRegister {
    /// Create a new register holding `initial`.
    pub fn new(initial: f64) -> Self {
        Self {
            bits: AtomicU64::new(initial.to_bits()),
        }
    }

    /// Replace the held target, last write wins.
    pub fn set(&self, target: f64) {
        self.bits.store(target.to_bits(), Ordering::Release);
    }

    /// Get the held target. Never blocks.
    pub fn get(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::Acquire))
    }
}

impl Default for SetpointRegister {
    fn default() -> Self {
        Self::new(0.0)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_default_is_zero() {
        assert_eq!(SetpointRegister::default().get(), 0.0);
    }

    #[test]
    fn test_get_is_idempotent() {
        let reg = SetpointRegister::new(0.25);
        reg.set(1.5);

        for _ in 0..10 {
            assert_eq!(reg.get(), 1.5);
        }
    }

    #[test]
    fn test_last_write_wins() {
        let reg = SetpointRegister::default();
        reg.set(1.0);
        reg.set(-2.0);
        assert_eq!(reg.get(), -2.0);

        // A rapid burst of distinct values followed by a single read
        for i in 0..1000 {
            reg.set(i as f64 * 0.001);
        }
        assert_eq!(reg.get(), 999.0 * 0.001);
    }

    #[test]
    fn test_values_stored_as_is() {
        let reg = SetpointRegister::default();

        reg.set(f64::NAN);
        assert!(reg.get().is_nan());

        reg.set(f64::NEG_INFINITY);
        assert_eq!(reg.get(), f64::NEG_INFINITY);

        reg.set(-0.0);
        assert!(reg.get().is_sign_negative());

        reg.set(1e300);
        assert_eq!(reg.get(), 1e300);
    }

    #[test]
    fn test_concurrent_reads_are_never_torn() {
        // Two values whose bit patterns differ in both halves of the word
        const A: f64 = 1.0;
        const B: f64 = -123456.789;

        let reg = Arc::new(SetpointRegister::new(A));

        let writer = {
            let reg = reg.clone();
            thread::spawn(move || {
                for i in 0..100_000 {
                    reg.set(if i % 2 == 0 { B } else { A });
                }
            })
        };

        for _ in 0..100_000 {
            let v = reg.get();
            assert!(v == A || v == B, "Torn read: {}", v);
        }

        writer.join().unwrap();
    }
}
